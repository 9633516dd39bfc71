//! GitHub OAuth provider.
//!
//! Besides the code exchange and user lookup this provider can require
//! organization membership and harvests the user's team slugs (including
//! each team's parent) into the `teams` label, walking the paginated team
//! listing via the `Link` response header.

use super::{Provider, ProviderToken, DEFAULT_HTTP_TIMEOUT};
use crate::tokendb::RedisTokenDbConfig;
use anyhow::{anyhow, bail, Context};
use async_trait::async_trait;
use portcullis_acl::Labels;
use reqwest::header::{ACCEPT, AUTHORIZATION, LINK};
use reqwest::StatusCode;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_WEB_URI: &str = "https://github.com";
const DEFAULT_API_URI: &str = "https://api.github.com";

#[derive(Debug, Clone, Deserialize)]
pub struct GithubAuthConfig {
    pub client_id: String,
    #[serde(default)]
    pub client_secret: Option<String>,
    #[serde(default)]
    pub client_secret_file: Option<PathBuf>,
    /// Require membership in this organization and scope team harvesting
    /// to it.
    #[serde(default)]
    pub organization: Option<String>,
    #[serde(default)]
    pub github_web_uri: Option<String>,
    #[serde(default)]
    pub github_api_uri: Option<String>,
    #[serde(default)]
    pub token_db: Option<PathBuf>,
    #[serde(default)]
    pub redis_token_db: Option<RedisTokenDbConfig>,
    #[serde(default)]
    pub http_timeout_secs: Option<u64>,
    #[serde(default)]
    pub revalidate_after_secs: Option<u64>,
}

impl GithubAuthConfig {
    pub fn http_timeout(&self) -> Duration {
        self.http_timeout_secs
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_HTTP_TIMEOUT)
    }
}

pub struct GithubProvider {
    client_id: String,
    client_secret: String,
    organization: Option<String>,
    web_uri: String,
    api_uri: String,
    client: reqwest::Client,
}

#[derive(Deserialize)]
struct CodeToTokenResponse {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    token_type: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
}

#[derive(Deserialize)]
struct TokenUser {
    login: String,
}

#[derive(Deserialize)]
struct Team {
    slug: String,
    #[serde(default)]
    organization: Option<OrganizationRef>,
    #[serde(default)]
    parent: Option<ParentTeamRef>,
}

#[derive(Deserialize)]
struct OrganizationRef {
    login: String,
}

#[derive(Deserialize)]
struct ParentTeamRef {
    slug: String,
}

impl GithubProvider {
    pub fn new(config: &GithubAuthConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.http_timeout())
            .build()
            .context("build github http client")?;
        Ok(Self {
            client_id: config.client_id.clone(),
            client_secret: config
                .client_secret
                .clone()
                .ok_or_else(|| anyhow!("github_auth.client_secret missing"))?,
            organization: config.organization.clone(),
            web_uri: config
                .github_web_uri
                .clone()
                .unwrap_or_else(|| DEFAULT_WEB_URI.to_string()),
            api_uri: config
                .github_api_uri
                .clone()
                .unwrap_or_else(|| DEFAULT_API_URI.to_string()),
            client,
        })
    }

    async fn check_organization(&self, token: &str, user: &str) -> anyhow::Result<()> {
        let Some(organization) = &self.organization else {
            return Ok(());
        };
        let url = format!("{}/orgs/{organization}/members/{user}", self.api_uri);
        let response = self
            .client
            .get(&url)
            .header(AUTHORIZATION, format!("token {token}"))
            .send()
            .await
            .context("organization membership lookup")?;
        match response.status() {
            StatusCode::NO_CONTENT => Ok(()),
            StatusCode::NOT_FOUND => {
                bail!("user {user} is not a member of organization {organization}")
            }
            StatusCode::FOUND => bail!(
                "token is not allowed to read membership of organization {organization}"
            ),
            status => bail!("unexpected membership status {status} for {organization}"),
        }
    }

    async fn fetch_teams(&self, token: &str) -> anyhow::Result<Vec<String>> {
        let Some(organization) = &self.organization else {
            return Ok(Vec::new());
        };

        let mut teams: Vec<String> = Vec::new();
        let mut url = format!("{}/user/teams?per_page=100", self.api_uri);
        loop {
            let response = self
                .client
                .get(&url)
                .header(AUTHORIZATION, format!("token {token}"))
                .header(ACCEPT, "application/vnd.github+json")
                .send()
                .await
                .with_context(|| format!("fetch teams page {url}"))?
                .error_for_status()
                .context("fetch teams")?;

            let link_lines: Vec<String> = response
                .headers()
                .get_all(LINK)
                .iter()
                .filter_map(|value| value.to_str().ok().map(str::to_string))
                .collect();
            let next = parse_link_header(&link_lines).next;

            let page: Vec<Team> = response.json().await.context("parse teams page")?;
            for team in page {
                let belongs = team
                    .organization
                    .as_ref()
                    .is_some_and(|org| &org.login == organization);
                if !belongs {
                    continue;
                }
                if !teams.contains(&team.slug) {
                    teams.push(team.slug);
                }
                if let Some(parent) = team.parent {
                    if !teams.contains(&parent.slug) {
                        teams.push(parent.slug);
                    }
                }
            }

            match next {
                Some(next_url) => url = next_url,
                None => break,
            }
        }
        Ok(teams)
    }
}

#[async_trait]
impl Provider for GithubProvider {
    fn name(&self) -> &'static str {
        "github"
    }

    fn login_url(&self) -> Option<String> {
        Some(format!(
            "{}/login/oauth/authorize?client_id={}&scope=read:org",
            self.web_uri, self.client_id
        ))
    }

    async fn exchange_code(&self, code: &str) -> anyhow::Result<ProviderToken> {
        let response: CodeToTokenResponse = self
            .client
            .post(format!("{}/login/oauth/access_token", self.web_uri))
            .form(&[
                ("code", code),
                ("client_id", &self.client_id),
                ("client_secret", &self.client_secret),
            ])
            .header(ACCEPT, "application/json")
            .send()
            .await
            .context("code exchange request")?
            .json()
            .await
            .context("parse code exchange response")?;

        if response.error.is_some() || response.error_description.is_some() {
            bail!(
                "github refused the code: {}: {}",
                response.error.unwrap_or_default(),
                response.error_description.unwrap_or_default()
            );
        }
        let access_token = response
            .access_token
            .ok_or_else(|| anyhow!("code exchange response had no access_token"))?;
        Ok(ProviderToken {
            token_type: response.token_type.unwrap_or_else(|| "token".to_string()),
            access_token,
            refresh_token: None,
        })
    }

    async fn fetch_user(&self, access_token: &str) -> anyhow::Result<String> {
        let user: TokenUser = self
            .client
            .get(format!("{}/user", self.api_uri))
            .header(AUTHORIZATION, format!("token {access_token}"))
            .header(ACCEPT, "application/json")
            .send()
            .await
            .context("fetch user")?
            .error_for_status()
            .context("fetch user")?
            .json()
            .await
            .context("parse user")?;
        self.check_organization(access_token, &user.login).await?;
        Ok(user.login)
    }

    async fn fetch_labels(&self, access_token: &str) -> anyhow::Result<Labels> {
        let teams = self.fetch_teams(access_token).await?;
        let mut labels = Labels::new();
        labels.insert("teams".to_string(), teams);
        Ok(labels)
    }
}

#[derive(Debug, Default, PartialEq, Eq)]
pub(crate) struct LinkHeader {
    pub first: Option<String>,
    pub last: Option<String>,
    pub next: Option<String>,
    pub prev: Option<String>,
}

/// Parse GitHub pagination links. Each header line is a comma-separated
/// list of `<uri>; rel="…"` items; the URI is enclosed in angle brackets.
pub(crate) fn parse_link_header(lines: &[String]) -> LinkHeader {
    let mut header = LinkHeader::default();
    for line in lines {
        for item in line.split(',') {
            let mut parts = item.split(';');
            let Some(uri) = parts.next() else {
                continue;
            };
            let uri = uri
                .trim()
                .trim_start_matches('<')
                .trim_end_matches('>')
                .to_string();
            for param in parts {
                let Some(rel) = param.trim().strip_prefix("rel=") else {
                    continue;
                };
                match rel.trim_matches('"') {
                    "first" => header.first = Some(uri.clone()),
                    "last" => header.last = Some(uri.clone()),
                    "next" => header.next = Some(uri.clone()),
                    "prev" => header.prev = Some(uri.clone()),
                    _ => {}
                }
            }
        }
    }
    header
}
