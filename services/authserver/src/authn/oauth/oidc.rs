//! Generic OIDC provider: explicit endpoints, the account name comes from
//! a configurable userinfo claim.

use super::{Provider, ProviderToken, DEFAULT_HTTP_TIMEOUT};
use crate::tokendb::RedisTokenDbConfig;
use anyhow::{anyhow, Context};
use async_trait::async_trait;
use portcullis_acl::Labels;
use serde::Deserialize;
use serde_json::Value;
use std::path::PathBuf;
use std::time::Duration;

fn default_user_claim() -> String {
    "email".to_string()
}

fn default_scopes() -> Vec<String> {
    vec!["openid".to_string(), "email".to_string()]
}

#[derive(Debug, Clone, Deserialize)]
pub struct OidcAuthConfig {
    pub issuer: String,
    #[serde(default)]
    pub authorization_endpoint: Option<String>,
    pub token_endpoint: String,
    pub userinfo_endpoint: String,
    pub client_id: String,
    #[serde(default)]
    pub client_secret: Option<String>,
    #[serde(default)]
    pub client_secret_file: Option<PathBuf>,
    pub redirect_url: String,
    /// Userinfo claim whose value becomes the account name.
    #[serde(default = "default_user_claim")]
    pub user_claim: String,
    /// Userinfo claims harvested into labels of the same name.
    #[serde(default)]
    pub label_claims: Vec<String>,
    #[serde(default = "default_scopes")]
    pub scopes: Vec<String>,
    #[serde(default)]
    pub token_db: Option<PathBuf>,
    #[serde(default)]
    pub redis_token_db: Option<RedisTokenDbConfig>,
    #[serde(default)]
    pub http_timeout_secs: Option<u64>,
    #[serde(default)]
    pub revalidate_after_secs: Option<u64>,
}

impl OidcAuthConfig {
    pub fn http_timeout(&self) -> Duration {
        self.http_timeout_secs
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_HTTP_TIMEOUT)
    }
}

pub struct OidcProvider {
    config: OidcAuthConfig,
    client_secret: String,
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

impl OidcProvider {
    pub fn new(config: &OidcAuthConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.http_timeout())
            .build()
            .context("build oidc http client")?;
        Ok(Self {
            client_secret: config
                .client_secret
                .clone()
                .ok_or_else(|| anyhow!("oidc_auth.client_secret missing"))?,
            config: config.clone(),
            client,
        })
    }

    async fn userinfo(&self, access_token: &str) -> anyhow::Result<Value> {
        self.client
            .get(&self.config.userinfo_endpoint)
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

fn claim_values(claims: &Value, claim: &str) -> Vec<String> {
    match claims.get(claim) {
        Some(Value::String(value)) => vec![value.clone()],
        Some(Value::Array(values)) => values
            .iter()
            .filter_map(|value| value.as_str().map(str::to_string))
            .collect(),
        _ => Vec::new(),
    }
}

#[async_trait]
impl Provider for OidcProvider {
    fn name(&self) -> &'static str {
        "oidc"
    }

    fn login_url(&self) -> Option<String> {
        let endpoint = self.config.authorization_endpoint.as_ref()?;
        Some(format!(
            "{endpoint}?client_id={}&response_type=code&scope={}&redirect_uri={}",
            self.config.client_id,
            self.config.scopes.join("%20"),
            self.config.redirect_url
        ))
    }

    async fn exchange_code(&self, code: &str) -> anyhow::Result<ProviderToken> {
        let response: TokenResponse = self
            .client
            .post(&self.config.token_endpoint)
            .form(&[
                ("code", code),
                ("client_id", &self.config.client_id),
                ("client_secret", &self.client_secret),
                ("redirect_uri", &self.config.redirect_url),
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
        let claims = self.userinfo(access_token).await?;
        claims
            .get(&self.config.user_claim)
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| {
                anyhow!(
                    "userinfo response is missing the {} claim",
                    self.config.user_claim
                )
            })
    }

    async fn fetch_labels(&self, access_token: &str) -> anyhow::Result<Labels> {
        if self.config.label_claims.is_empty() {
            return Ok(Labels::new());
        }
        let claims = self.userinfo(access_token).await?;
        let mut labels = Labels::new();
        for claim in &self.config.label_claims {
            let values = claim_values(&claims, claim);
            if !values.is_empty() {
                labels.insert(claim.clone(), values);
            }
        }
        Ok(labels)
    }
}
