//! Plugin authorizer over the shared line-JSON subprocess transport.

use super::{Authorizer, AuthzError, DEFAULT_BACKEND_TIMEOUT};
use crate::plugin::PluginClient;
use async_trait::async_trait;
use portcullis_acl::AuthzRequest;
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct PluginAuthzConfig {
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl PluginAuthzConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.command.is_empty() {
            return Err("plugin_authz.command is required".to_string());
        }
        Ok(())
    }
}

#[derive(Deserialize)]
struct AuthzReply {
    ok: bool,
    #[serde(default)]
    actions: Vec<String>,
    #[serde(default)]
    reason: Option<String>,
}

pub struct PluginAuthz {
    client: PluginClient,
    timeout: Duration,
}

impl PluginAuthz {
    pub async fn spawn(config: &PluginAuthzConfig) -> anyhow::Result<Self> {
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
impl Authorizer for PluginAuthz {
    async fn authorize(&self, req: &AuthzRequest) -> Result<Vec<String>, AuthzError> {
        let reply: AuthzReply = self.client.call(req).await?;
        if reply.ok {
            return Ok(reply.actions);
        }
        match reply.reason.as_deref() {
            Some("no_match") | None => Err(AuthzError::NoMatch),
            Some(other) => Err(AuthzError::Backend(anyhow::anyhow!(
                "plugin refused: {other}"
            ))),
        }
    }

    async fn stop(&self) {
        self.client.stop().await;
    }

    fn name(&self) -> &'static str {
        "plugin_authz"
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }
}
