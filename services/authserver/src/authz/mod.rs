//! Authorization pipeline: the backend contract and the union-of-grants
//! driver.

pub mod acl_static;
pub mod casbin_authz;
pub mod ext_http;
pub mod plugin;

use async_trait::async_trait;
use portcullis_acl::AuthzRequest;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

pub use acl_static::StaticAclAuthorizer;
pub use casbin_authz::{CasbinAuthorizer, CasbinAuthzConfig};
pub use ext_http::{ExtHttpAuthorizer, ExtHttpAuthzConfig};
pub use plugin::{PluginAuthz, PluginAuthzConfig};

pub const DEFAULT_BACKEND_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum AuthzError {
    /// No policy in this backend applies; it contributes nothing.
    #[error("no match")]
    NoMatch,
    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

#[async_trait]
pub trait Authorizer: Send + Sync {
    /// Actions this backend grants for the scope in `req`. The grant may
    /// exceed the requested set; the driver intersects.
    async fn authorize(&self, req: &AuthzRequest) -> Result<Vec<String>, AuthzError>;

    async fn stop(&self);

    fn name(&self) -> &'static str;

    fn timeout(&self) -> Duration {
        DEFAULT_BACKEND_TIMEOUT
    }
}

/// Ordered chain of authorizers. Grants union across backends; the final
/// result is the intersection with the requested actions, in request
/// order. All backends abstaining denies the scope.
pub struct AuthzChain {
    backends: Vec<Arc<dyn Authorizer>>,
}

impl AuthzChain {
    pub fn new(backends: Vec<Arc<dyn Authorizer>>) -> Self {
        Self { backends }
    }

    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }

    pub async fn authorize(&self, req: &AuthzRequest) -> Result<Vec<String>, AuthzError> {
        let mut granted: Vec<String> = Vec::new();
        for backend in &self.backends {
            let outcome =
                match tokio::time::timeout(backend.timeout(), backend.authorize(req)).await {
                    Ok(outcome) => outcome,
                    Err(_) => Err(AuthzError::Backend(anyhow::anyhow!(
                        "authorizer {} timed out",
                        backend.name()
                    ))),
                };
            match outcome {
                Ok(actions) => {
                    for action in actions {
                        if !granted.iter().any(|a| a == &action) {
                            granted.push(action);
                        }
                    }
                }
                Err(AuthzError::NoMatch) => continue,
                Err(AuthzError::Backend(err)) => {
                    tracing::error!(
                        backend = backend.name(),
                        error = ?err,
                        "authorizer failed"
                    );
                    return Err(AuthzError::Backend(err));
                }
            }
        }
        Ok(req
            .actions
            .iter()
            .filter(|action| granted.iter().any(|granted| granted == *action))
            .cloned()
            .collect())
    }

    pub async fn stop(&self) {
        for backend in &self.backends {
            backend.stop().await;
        }
    }
}
