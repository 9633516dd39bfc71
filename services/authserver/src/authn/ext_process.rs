//! External-process authenticator.
//!
//! Spawns the configured command per request and writes the credentials
//! as one JSON line on stdin. The exit code encodes the verdict:
//! 0 = authenticated (stdout may carry `{"labels": {...}}`),
//! 1 = wrong password, 2 = no match, anything else = backend failure.

use super::{Authenticator, AuthnError, PasswordString, DEFAULT_BACKEND_TIMEOUT};
use anyhow::Context;
use async_trait::async_trait;
use portcullis_acl::Labels;
use serde::{Deserialize, Serialize};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

#[derive(Debug, Clone, Deserialize)]
pub struct ExtProcessAuthConfig {
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl ExtProcessAuthConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.command.is_empty() {
            return Err("ext_auth.command is required".to_string());
        }
        Ok(())
    }
}

#[derive(Serialize)]
struct CredentialPayload<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Default, Deserialize)]
struct Verdict {
    #[serde(default)]
    labels: Labels,
}

pub struct ExtProcessAuth {
    config: ExtProcessAuthConfig,
}

impl ExtProcessAuth {
    pub fn new(config: ExtProcessAuthConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Authenticator for ExtProcessAuth {
    async fn authenticate(
        &self,
        user: &str,
        password: &PasswordString,
    ) -> Result<Labels, AuthnError> {
        let mut child = Command::new(&self.config.command)
            .args(&self.config.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .with_context(|| format!("spawn {}", self.config.command))?;

        let payload = serde_json::to_vec(&CredentialPayload {
            username: user,
            password: password.expose(),
        })
        .context("encode credentials")?;
        {
            let mut stdin = child
                .stdin
                .take()
                .ok_or_else(|| anyhow::anyhow!("child stdin unavailable"))?;
            stdin.write_all(&payload).await.context("write credentials")?;
            stdin.write_all(b"\n").await.context("write credentials")?;
            // Dropping stdin closes the pipe so the child sees EOF.
        }

        let output = child.wait_with_output().await.context("wait for verdict")?;
        match output.status.code() {
            Some(0) => {
                if output.stdout.iter().all(u8::is_ascii_whitespace) {
                    return Ok(Labels::new());
                }
                let verdict: Verdict =
                    serde_json::from_slice(&output.stdout).context("parse verdict")?;
                Ok(verdict.labels)
            }
            Some(1) => Err(AuthnError::WrongPass),
            Some(2) => Err(AuthnError::NoMatch),
            Some(code) => Err(AuthnError::Backend(anyhow::anyhow!(
                "{} exited with status {code}",
                self.config.command
            ))),
            None => Err(AuthnError::Backend(anyhow::anyhow!(
                "{} was killed by a signal",
                self.config.command
            ))),
        }
    }

    async fn stop(&self) {}

    fn name(&self) -> &'static str {
        "ext"
    }

    fn timeout(&self) -> Duration {
        self.config
            .timeout_secs
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_BACKEND_TIMEOUT)
    }
}
