//! Google OAuth provider. The account name is the verified email address.

use super::{Provider, ProviderToken, DEFAULT_HTTP_TIMEOUT};
use crate::tokendb::RedisTokenDbConfig;
use anyhow::{anyhow, bail, Context};
use async_trait::async_trait;
use portcullis_acl::Labels;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

const AUTH_ENDPOINT: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const TOKEN_ENDPOINT: &str = "https://oauth2.googleapis.com/token";
const USERINFO_ENDPOINT: &str = "https://openidconnect.googleapis.com/v1/userinfo";

#[derive(Debug, Clone, Deserialize)]
pub struct GoogleAuthConfig {
    pub client_id: String,
    #[serde(default)]
    pub client_secret: Option<String>,
    #[serde(default)]
    pub client_secret_file: Option<PathBuf>,
    pub redirect_url: String,
    /// Restrict sign-in to one hosted domain.
    #[serde(default)]
    pub domain: Option<String>,
    #[serde(default)]
    pub token_db: Option<PathBuf>,
    #[serde(default)]
    pub redis_token_db: Option<RedisTokenDbConfig>,
    #[serde(default)]
    pub http_timeout_secs: Option<u64>,
    #[serde(default)]
    pub revalidate_after_secs: Option<u64>,
}

impl GoogleAuthConfig {
    pub fn http_timeout(&self) -> Duration {
        self.http_timeout_secs
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_HTTP_TIMEOUT)
    }
}

pub struct GoogleProvider {
    client_id: String,
    client_secret: String,
    redirect_url: String,
    domain: Option<String>,
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
struct UserInfo {
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    email_verified: bool,
    #[serde(default)]
    hd: Option<String>,
}

impl GoogleProvider {
    pub fn new(config: &GoogleAuthConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.http_timeout())
            .build()
            .context("build google http client")?;
        Ok(Self {
            client_id: config.client_id.clone(),
            client_secret: config
                .client_secret
                .clone()
                .ok_or_else(|| anyhow!("google_auth.client_secret missing"))?,
            redirect_url: config.redirect_url.clone(),
            domain: config.domain.clone(),
            client,
        })
    }

    async fn userinfo(&self, access_token: &str) -> anyhow::Result<UserInfo> {
        self.client
            .get(USERINFO_ENDPOINT)
            .bearer_auth(access_token)
            .send()
            .await
            .context("fetch userinfo")?
            .error_for_status()
            .context("fetch userinfo")?
            .json()
            .await
            .context("parse userinfo")
    }
}

#[async_trait]
impl Provider for GoogleProvider {
    fn name(&self) -> &'static str {
        "google"
    }

    fn login_url(&self) -> Option<String> {
        Some(format!(
            "{AUTH_ENDPOINT}?client_id={}&response_type=code&scope=openid%20email&redirect_uri={}",
            self.client_id, self.redirect_url
        ))
    }

    async fn exchange_code(&self, code: &str) -> anyhow::Result<ProviderToken> {
        let response: TokenResponse = self
            .client
            .post(TOKEN_ENDPOINT)
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
        let info = self.userinfo(access_token).await?;
        let email = info
            .email
            .ok_or_else(|| anyhow!("userinfo response had no email"))?;
        if !info.email_verified {
            bail!("email {email} is not verified");
        }
        if let Some(domain) = &self.domain {
            if info.hd.as_deref() != Some(domain.as_str()) {
                bail!("account {email} does not belong to domain {domain}");
            }
        }
        Ok(email)
    }

    async fn fetch_labels(&self, access_token: &str) -> anyhow::Result<Labels> {
        let info = self.userinfo(access_token).await?;
        let mut labels = Labels::new();
        if let Some(hd) = info.hd {
            labels.insert("hd".to_string(), vec![hd]);
        }
        Ok(labels)
    }
}
