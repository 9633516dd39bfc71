//! Authentication pipeline: the backend contract and the ordered chain
//! that drives it.

pub mod ext_process;
pub mod ldap;
pub mod oauth;
pub mod plugin;
pub mod static_users;

use async_trait::async_trait;
use portcullis_acl::Labels;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

pub use ext_process::{ExtProcessAuth, ExtProcessAuthConfig};
pub use ldap::{LdapAuth, LdapAuthConfig};
pub use oauth::OauthAuthenticator;
pub use plugin::{PluginAuth, PluginAuthnConfig};
pub use static_users::{Requirements, StaticUsersAuth};

pub const DEFAULT_BACKEND_TIMEOUT: Duration = Duration::from_secs(10);

/// A secret that must never appear in logs or serialized output.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct PasswordString(String);

impl PasswordString {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for PasswordString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("***")
    }
}

impl fmt::Display for PasswordString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("***")
    }
}

impl Serialize for PasswordString {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str("***")
    }
}

#[derive(Debug, Error)]
pub enum AuthnError {
    /// This backend has no opinion about the user; try the next one.
    #[error("no match")]
    NoMatch,
    /// Definitive credential rejection; the chain stops.
    #[error("wrong password")]
    WrongPass,
    /// Transport or backend failure; surfaced as a server error so an
    /// outage never falls through to a weaker backend.
    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn authenticate(
        &self,
        user: &str,
        password: &PasswordString,
    ) -> Result<Labels, AuthnError>;

    /// Release held resources. Called once at shutdown.
    async fn stop(&self);

    fn name(&self) -> &'static str;

    fn timeout(&self) -> Duration {
        DEFAULT_BACKEND_TIMEOUT
    }
}

/// Ordered chain of authenticators.
pub struct AuthnChain {
    backends: Vec<Arc<dyn Authenticator>>,
}

impl AuthnChain {
    pub fn new(backends: Vec<Arc<dyn Authenticator>>) -> Self {
        Self { backends }
    }

    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }

    /// First backend to authenticate wins; `NoMatch` falls through; a
    /// wrong password or backend failure stops the chain immediately.
    pub async fn authenticate(
        &self,
        user: &str,
        password: &PasswordString,
    ) -> Result<Labels, AuthnError> {
        for backend in &self.backends {
            let outcome =
                match tokio::time::timeout(backend.timeout(), backend.authenticate(user, password))
                    .await
                {
                    Ok(outcome) => outcome,
                    Err(_) => Err(AuthnError::Backend(anyhow::anyhow!(
                        "authenticator {} timed out",
                        backend.name()
                    ))),
                };
            match outcome {
                Ok(labels) => {
                    tracing::info!(backend = backend.name(), user, "authentication succeeded");
                    return Ok(labels);
                }
                Err(AuthnError::NoMatch) => continue,
                Err(AuthnError::WrongPass) => {
                    tracing::info!(backend = backend.name(), user, "credentials rejected");
                    return Err(AuthnError::WrongPass);
                }
                Err(AuthnError::Backend(err)) => {
                    tracing::error!(
                        backend = backend.name(),
                        error = ?err,
                        "authenticator failed"
                    );
                    return Err(AuthnError::Backend(err));
                }
            }
        }
        Err(AuthnError::NoMatch)
    }

    pub async fn stop(&self) {
        for backend in &self.backends {
            backend.stop().await;
        }
    }
}
