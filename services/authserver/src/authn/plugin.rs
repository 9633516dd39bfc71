//! Plugin authenticator: a resident subprocess answering credential
//! checks over the shared line-JSON transport.

use super::{Authenticator, AuthnError, PasswordString, DEFAULT_BACKEND_TIMEOUT};
use crate::plugin::PluginClient;
use async_trait::async_trait;
use portcullis_acl::Labels;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct PluginAuthnConfig {
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl PluginAuthnConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.command.is_empty() {
            return Err("plugin_authn.command is required".to_string());
        }
        Ok(())
    }
}

#[derive(Serialize)]
struct AuthnCall<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct AuthnReply {
    ok: bool,
    #[serde(default)]
    labels: Labels,
    #[serde(default)]
    reason: Option<String>,
}

pub struct PluginAuth {
    client: PluginClient,
    timeout: Duration,
}

impl PluginAuth {
    pub async fn spawn(config: &PluginAuthnConfig) -> anyhow::Result<Self> {
        let client = PluginClient::spawn(&config.command, &config.args).await?;
        Ok(Self {
            client,
            timeout: config
                .timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_BACKEND_TIMEOUT),
        })
    }
}

#[async_trait]
impl Authenticator for PluginAuth {
    async fn authenticate(
        &self,
        user: &str,
        password: &PasswordString,
    ) -> Result<Labels, AuthnError> {
        let reply: AuthnReply = self
            .client
            .call(&AuthnCall {
                username: user,
                password: password.expose(),
            })
            .await?;
        if reply.ok {
            return Ok(reply.labels);
        }
        match reply.reason.as_deref() {
            Some("no_match") => Err(AuthnError::NoMatch),
            Some("wrong_password") | None => Err(AuthnError::WrongPass),
            Some(other) => Err(AuthnError::Backend(anyhow::anyhow!(
                "plugin refused: {other}"
            ))),
        }
    }

    async fn stop(&self) {
        self.client.stop().await;
    }

    fn name(&self) -> &'static str {
        "plugin"
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }
}
