//! Gitlab OAuth provider. The account name is the Gitlab username.

use super::{Provider, ProviderToken, DEFAULT_HTTP_TIMEOUT};
use crate::tokendb::RedisTokenDbConfig;
use anyhow::{anyhow, Context};
use async_trait::async_trait;
use portcullis_acl::Labels;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_WEB_URI: &str = "https://gitlab.com";

#[derive(Debug, Clone, Deserialize)]
pub struct GitlabAuthConfig {
    pub client_id: String,
    #[serde(default)]
    pub client_secret: Option<String>,
    #[serde(default)]
    pub client_secret_file: Option<PathBuf>,
    #[serde(default)]
    pub gitlab_web_uri: Option<String>,
    pub redirect_url: String,
    #[serde(default)]
    pub token_db: Option<PathBuf>,
    #[serde(default)]
    pub redis_token_db: Option<RedisTokenDbConfig>,
    #[serde(default)]
    pub http_timeout_secs: Option<u64>,
    #[serde(default)]
    pub revalidate_after_secs: Option<u64>,
}

impl GitlabAuthConfig {
    pub fn http_timeout(&self) -> Duration {
        self.http_timeout_secs
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_HTTP_TIMEOUT)
    }
}

pub struct GitlabProvider {
    client_id: String,
    client_secret: String,
    web_uri: String,
    redirect_url: String,
    client: reqwest::Client,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    token_type: Option<String>,
    #[serde(default)]
    refresh_token: Option<String>,
}

#[derive(Deserialize)]
struct GitlabUser {
    username: String,
}

impl GitlabProvider {
    pub fn new(config: &GitlabAuthConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.http_timeout())
            .build()
            .context("build gitlab http client")?;
        Ok(Self {
            client_id: config.client_id.clone(),
            client_secret: config
                .client_secret
                .clone()
                .ok_or_else(|| anyhow!("gitlab_auth.client_secret missing"))?,
            web_uri: config
                .gitlab_web_uri
                .clone()
                .unwrap_or_else(|| DEFAULT_WEB_URI.to_string()),
            redirect_url: config.redirect_url.clone(),
            client,
        })
    }
}

#[async_trait]
impl Provider for GitlabProvider {
    fn name(&self) -> &'static str {
        "gitlab"
    }

    fn login_url(&self) -> Option<String> {
        Some(format!(
            "{}/oauth/authorize?client_id={}&response_type=code&scope=read_user&redirect_uri={}",
            self.web_uri, self.client_id, self.redirect_url
        ))
    }

    async fn exchange_code(&self, code: &str) -> anyhow::Result<ProviderToken> {
        let response: TokenResponse = self
            .client
            .post(format!("{}/oauth/token", self.web_uri))
            .form(&[
                ("code", code),
                ("client_id", &self.client_id),
                ("client_secret", &self.client_secret),
                ("redirect_uri", &self.redirect_url),
                ("grant_type", "authorization_code"),
            ])
            .send()
            .await
            .context("code exchange request")?
            .error_for_status()
            .context("code exchange")?
            .json()
            .await
            .context("parse code exchange response")?;
        Ok(ProviderToken {
            token_type: response.token_type.unwrap_or_else(|| "Bearer".to_string()),
            access_token: response.access_token,
            refresh_token: response.refresh_token,
        })
    }

    async fn fetch_user(&self, access_token: &str) -> anyhow::Result<String> {
        let user: GitlabUser = self
            .client
            .get(format!("{}/api/v4/user", self.web_uri))
            .bearer_auth(access_token)
            .send()
            .await
            .context("fetch user")?
            .error_for_status()
            .context("fetch user")?
            .json()
            .await
            .context("parse user")?;
        Ok(user.username)
    }

    async fn fetch_labels(&self, _access_token: &str) -> anyhow::Result<Labels> {
        Ok(Labels::new())
    }
}
