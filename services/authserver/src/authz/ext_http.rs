//! External HTTP authorizer: POSTs the authorization request as JSON and
//! expects the granted actions back.

use super::{Authorizer, AuthzError, DEFAULT_BACKEND_TIMEOUT};
use anyhow::Context;
use async_trait::async_trait;
use portcullis_acl::AuthzRequest;
use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct ExtHttpAuthzConfig {
    pub url: String,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl ExtHttpAuthzConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.url.is_empty() {
            return Err("ext_authz.url is required".to_string());
        }
        Ok(())
    }

    fn timeout(&self) -> Duration {
        self.timeout_secs
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_BACKEND_TIMEOUT)
    }
}

#[derive(Deserialize)]
struct GrantResponse {
    #[serde(default)]
    actions: Vec<String>,
}

pub struct ExtHttpAuthorizer {
    url: String,
    timeout: Duration,
    client: reqwest::Client,
}

impl ExtHttpAuthorizer {
    pub fn new(config: &ExtHttpAuthzConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .context("build ext authz http client")?;
        Ok(Self {
            url: config.url.clone(),
            timeout: config.timeout(),
            client,
        })
    }
}

#[async_trait]
impl Authorizer for ExtHttpAuthorizer {
    async fn authorize(&self, req: &AuthzRequest) -> Result<Vec<String>, AuthzError> {
        let response = self
            .client
            .post(&self.url)
            .json(req)
            .send()
            .await
            .with_context(|| format!("post {}", self.url))?;
        match response.status() {
            StatusCode::OK => {
                let grant: GrantResponse =
                    response.json().await.context("parse authz response")?;
                Ok(grant.actions)
            }
            StatusCode::FORBIDDEN => Err(AuthzError::NoMatch),
            status => Err(AuthzError::Backend(anyhow::anyhow!(
                "authz backend returned {status}"
            ))),
        }
    }

    async fn stop(&self) {}

    fn name(&self) -> &'static str {
        "ext_authz"
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }
}
