//! OAuth-family authenticators.
//!
//! These are split-phase. The browser flow exchanges an authorization
//! code for a provider access token, stores it in the token database, and
//! hands the user a generated database password (DP). The docker login
//! flow then authenticates `user:DP` against the stored record without
//! contacting the provider, revalidating the provider token only when the
//! record's deadline has passed.

pub mod github;
pub mod gitlab;
pub mod google;
pub mod oidc;

use super::{Authenticator, AuthnError, PasswordString};
use crate::clock::Clock;
use crate::tokendb::{
    DbValue, FileTokenDb, RedisTokenDb, RedisTokenDbConfig, TokenDb, TokenDbError,
};
use anyhow::{anyhow, Context};
use async_trait::async_trait;
use portcullis_acl::Labels;
use std::path::PathBuf;
use std::time::Duration;

pub use github::{GithubAuthConfig, GithubProvider};
pub use gitlab::{GitlabAuthConfig, GitlabProvider};
pub use google::{GoogleAuthConfig, GoogleProvider};
pub use oidc::{OidcAuthConfig, OidcProvider};

pub const DEFAULT_REVALIDATE_AFTER: Duration = Duration::from_secs(3600);
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// What a code exchange yields.
#[derive(Debug, Clone)]
pub struct ProviderToken {
    pub token_type: String,
    pub access_token: String,
    pub refresh_token: Option<String>,
}

/// One upstream identity provider.
#[async_trait]
pub trait Provider: Send + Sync {
    fn name(&self) -> &'static str;

    /// Where to send the browser to start the flow, when the provider
    /// supports a server-composed URL.
    fn login_url(&self) -> Option<String>;

    async fn exchange_code(&self, code: &str) -> anyhow::Result<ProviderToken>;

    /// Resolve the access token to the upstream username. Also used to
    /// revalidate stored tokens.
    async fn fetch_user(&self, access_token: &str) -> anyhow::Result<String>;

    /// Harvest labels for the authenticated user (teams, groups, email).
    async fn fetch_labels(&self, access_token: &str) -> anyhow::Result<Labels>;
}

pub struct OauthAuthenticator {
    provider: Box<dyn Provider>,
    db: Box<dyn TokenDb>,
    revalidate_after: Duration,
    clock: Clock,
    timeout: Duration,
}

impl OauthAuthenticator {
    pub fn new(
        provider: Box<dyn Provider>,
        db: Box<dyn TokenDb>,
        revalidate_after: Duration,
        clock: Clock,
        timeout: Duration,
    ) -> Self {
        Self {
            provider,
            db,
            revalidate_after,
            clock,
            timeout,
        }
    }

    pub fn login_url(&self) -> Option<String> {
        self.provider.login_url()
    }

    /// Browser flow: exchange the code, store the provider token, return
    /// `(username, database password)`.
    pub async fn handle_callback(&self, code: &str) -> anyhow::Result<(String, String)> {
        let token = self.provider.exchange_code(code).await?;
        let user = self.provider.fetch_user(&token.access_token).await?;
        let labels = self.provider.fetch_labels(&token.access_token).await?;
        tracing::info!(provider = self.provider.name(), user = %user, "new provider token");

        let value = DbValue {
            token_type: token.token_type,
            access_token: token.access_token,
            refresh_token: token.refresh_token,
            valid_until: (self.clock)() + self.revalidate_after.as_secs() as i64,
            labels,
        };
        let dp = self
            .db
            .store_token(&user, value, true)
            .await
            .map_err(db_backend_error)?
            .ok_or_else(|| anyhow!("token db did not return a database password"))?;
        Ok((user, dp))
    }

    /// The stored token is past its deadline: confirm it still identifies
    /// the same user upstream, then push the deadline out.
    async fn revalidate(&self, user: &str) -> Result<(), AuthnError> {
        let mut value = self
            .db
            .get_value(user)
            .await
            .map_err(db_backend_error)?
            .ok_or_else(|| anyhow!("no stored token for {user}, please sign in again"))?;

        let token_user = self
            .provider
            .fetch_user(&value.access_token)
            .await
            .with_context(|| format!("revalidate {} token", self.provider.name()))?;
        if token_user != user {
            return Err(AuthnError::Backend(anyhow!(
                "stored token belongs to {token_user}, not {user}"
            )));
        }

        value.valid_until = (self.clock)() + self.revalidate_after.as_secs() as i64;
        self.db
            .store_token(user, value, false)
            .await
            .map_err(db_backend_error)?;
        tracing::debug!(provider = self.provider.name(), user, "token revalidated");
        Ok(())
    }
}

fn db_backend_error(err: TokenDbError) -> anyhow::Error {
    anyhow!(err)
}

#[async_trait]
impl Authenticator for OauthAuthenticator {
    async fn authenticate(
        &self,
        user: &str,
        password: &PasswordString,
    ) -> Result<Labels, AuthnError> {
        match self.db.validate_token(user, password, (self.clock)()).await {
            Ok(()) => {}
            Err(TokenDbError::Expired) => self.revalidate(user).await?,
            Err(TokenDbError::NoMatch) => return Err(AuthnError::NoMatch),
            Err(TokenDbError::WrongPass) => return Err(AuthnError::WrongPass),
            Err(TokenDbError::Backend(err)) => return Err(AuthnError::Backend(err)),
        }

        let value = self
            .db
            .get_value(user)
            .await
            .map_err(db_backend_error)?
            .ok_or_else(|| anyhow!("stored token vanished for {user}"))?;
        Ok(value.labels)
    }

    async fn stop(&self) {
        self.db.close().await;
    }

    fn name(&self) -> &'static str {
        self.provider.name()
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }
}

/// Open the token database a provider section selected. Redis wins over
/// the embedded file store when both are present.
pub(crate) async fn open_token_db(
    file: &Option<PathBuf>,
    redis: &Option<RedisTokenDbConfig>,
) -> anyhow::Result<Box<dyn TokenDb>> {
    if let Some(redis) = redis {
        let db = RedisTokenDb::connect(redis).await?;
        return Ok(Box::new(db));
    }
    if let Some(path) = file {
        let db = FileTokenDb::open(path.clone()).await?;
        return Ok(Box::new(db));
    }
    Err(anyhow!("no token db configured"))
}
