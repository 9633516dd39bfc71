//! LDAP bind authenticator.
//!
//! Binds as the requesting user; success is authentication. Labels come
//! from configured `label key -> directory attribute` mappings read from
//! the user's entry after the bind.

use super::{Authenticator, AuthnError, PasswordString, DEFAULT_BACKEND_TIMEOUT};
use anyhow::Context;
use async_trait::async_trait;
use ldap3::{LdapConnAsync, Scope, SearchEntry};
use portcullis_acl::Labels;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

// LDAP result codes, RFC 4511.
const RC_INVALID_CREDENTIALS: u32 = 49;
const RC_NO_SUCH_OBJECT: u32 = 32;

fn default_filter() -> String {
    "(uid=${account})".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct LdapAuthConfig {
    /// `ldap://` or `ldaps://` URL.
    pub addr: String,
    /// Bind DN template; `${account}` is replaced with the username.
    pub bind_dn: String,
    /// Search base for attribute harvesting.
    #[serde(default)]
    pub base: String,
    /// Search filter template, `${account}` replaced.
    #[serde(default = "default_filter")]
    pub filter: String,
    /// label key -> directory attribute.
    #[serde(default)]
    pub labels: HashMap<String, String>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

pub struct LdapAuth {
    config: LdapAuthConfig,
}

impl LdapAuth {
    pub fn new(config: LdapAuthConfig) -> Self {
        Self { config }
    }
}

/// Expand `${account}` in a DN or filter template.
fn render_template(template: &str, account: &str) -> String {
    template.replace("${account}", account)
}

/// Map a bind result code onto the error taxonomy: invalid credentials
/// are a definitive rejection, a missing entry means this backend has no
/// opinion, and anything else is a directory failure.
fn classify_bind_rc(rc: u32, text: &str) -> Result<(), AuthnError> {
    match rc {
        0 => Ok(()),
        RC_INVALID_CREDENTIALS => Err(AuthnError::WrongPass),
        RC_NO_SUCH_OBJECT => Err(AuthnError::NoMatch),
        rc => Err(AuthnError::Backend(anyhow::anyhow!(
            "ldap bind failed with result code {rc}: {text}"
        ))),
    }
}

#[async_trait]
impl Authenticator for LdapAuth {
    async fn authenticate(
        &self,
        user: &str,
        password: &PasswordString,
    ) -> Result<Labels, AuthnError> {
        // An empty password would be an unauthenticated bind, which every
        // server "accepts"; refuse it outright.
        if password.is_empty() {
            return Err(AuthnError::NoMatch);
        }

        let (conn, mut ldap) = LdapConnAsync::new(&self.config.addr)
            .await
            .with_context(|| format!("connect {}", self.config.addr))?;
        ldap3::drive!(conn);

        let bind_dn = render_template(&self.config.bind_dn, user);
        let bind = ldap
            .simple_bind(&bind_dn, password.expose())
            .await
            .context("ldap bind")?;
        classify_bind_rc(bind.rc, &bind.text)?;

        let mut labels = Labels::new();
        if !self.config.labels.is_empty() {
            let filter = render_template(&self.config.filter, user);
            let attributes: Vec<&str> =
                self.config.labels.values().map(String::as_str).collect();
            let (entries, _) = ldap
                .search(&self.config.base, Scope::Subtree, &filter, attributes)
                .await
                .context("ldap search")?
                .success()
                .context("ldap search result")?;
            if let Some(entry) = entries.into_iter().next() {
                let entry = SearchEntry::construct(entry);
                for (label, attribute) in &self.config.labels {
                    if let Some(values) = entry.attrs.get(attribute) {
                        labels.insert(label.clone(), values.clone());
                    }
                }
            }
        }

        let _ = ldap.unbind().await;
        Ok(labels)
    }

    async fn stop(&self) {}

    fn name(&self) -> &'static str {
        "ldap"
    }

    fn timeout(&self) -> Duration {
        self.config
            .timeout_secs
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_BACKEND_TIMEOUT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn templates_expand_the_account() {
        assert_eq!(
            render_template("uid=${account},ou=people,dc=example,dc=com", "alice"),
            "uid=alice,ou=people,dc=example,dc=com"
        );
        assert_eq!(render_template("(uid=${account})", "alice"), "(uid=alice)");
        // No token: the template passes through untouched.
        assert_eq!(
            render_template("cn=service,dc=example,dc=com", "alice"),
            "cn=service,dc=example,dc=com"
        );
    }

    #[test]
    fn successful_bind_rc_is_ok() {
        assert!(classify_bind_rc(0, "").is_ok());
    }

    #[test]
    fn invalid_credentials_rc_is_wrong_pass() {
        assert!(matches!(
            classify_bind_rc(RC_INVALID_CREDENTIALS, "invalid credentials"),
            Err(AuthnError::WrongPass)
        ));
    }

    #[test]
    fn missing_entry_rc_is_no_match() {
        assert!(matches!(
            classify_bind_rc(RC_NO_SUCH_OBJECT, "no such object"),
            Err(AuthnError::NoMatch)
        ));
    }

    #[test]
    fn other_rcs_are_backend_failures() {
        // 53 = unwillingToPerform, 80 = other.
        for rc in [53, 80] {
            let err = classify_bind_rc(rc, "server unhappy").expect_err("failure");
            match err {
                AuthnError::Backend(err) => {
                    let message = err.to_string();
                    assert!(message.contains(&rc.to_string()), "got {message}");
                    assert!(message.contains("server unhappy"), "got {message}");
                }
                other => panic!("expected backend error, got {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn empty_password_is_refused_without_a_connection() {
        // The guard fires before any network dial, so an unreachable
        // address never comes into play.
        let auth = LdapAuth::new(LdapAuthConfig {
            addr: "ldap://127.0.0.1:1".to_string(),
            bind_dn: "uid=${account},dc=example,dc=com".to_string(),
            base: String::new(),
            filter: default_filter(),
            labels: HashMap::new(),
            timeout_secs: None,
        });
        assert!(matches!(
            auth.authenticate("alice", &PasswordString::new("")).await,
            Err(AuthnError::NoMatch)
        ));
    }
}
