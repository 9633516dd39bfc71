//! Configuration loading and validation.
//!
//! The config file is YAML or JSON, decided by extension. Environment
//! variables of the form `<PREFIX>_A_B_C=<value>` override the config key
//! `a.b.c`, with the value parsed in the file's format, so `AUTH_TOKEN_
//! EXPIRATION=300` arrives as a number and quoted values as strings.

use crate::authn::oauth::{GithubAuthConfig, GitlabAuthConfig, GoogleAuthConfig, OidcAuthConfig};
use crate::authn::{ExtProcessAuthConfig, LdapAuthConfig, PluginAuthnConfig, Requirements};
use crate::authz::{CasbinAuthzConfig, ExtHttpAuthzConfig, PluginAuthzConfig};
use portcullis_acl::{Acl, Entry};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("unsupported config type {0:?}, expected yaml, yml or json")]
    UnsupportedFormat(String),
    #[error("could not parse config: {0}")]
    Parse(String),
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConfigFormat {
    Yaml,
    Json,
}

impl ConfigFormat {
    fn from_path(path: &Path) -> Result<Self, ConfigError> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("yaml") | Some("yml") => Ok(Self::Yaml),
            Some("json") => Ok(Self::Json),
            other => Err(ConfigError::UnsupportedFormat(
                other.unwrap_or_default().to_string(),
            )),
        }
    }

    fn parse_value(&self, raw: &str) -> Result<serde_json::Value, ConfigError> {
        match self {
            Self::Yaml => serde_yaml::from_str(raw).map_err(|err| ConfigError::Parse(err.to_string())),
            Self::Json => serde_json::from_str(raw).map_err(|err| ConfigError::Parse(err.to_string())),
        }
    }
}

fn default_net() -> String {
    "tcp".to_string()
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LetsEncryptConfig {
    #[serde(default)]
    pub host: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub cachedir: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default)]
    pub addr: String,
    #[serde(default = "default_net")]
    pub net: String,
    #[serde(default)]
    pub path_prefix: String,
    #[serde(default)]
    pub real_ip_header: Option<String>,
    /// Which hop of `real_ip_header` to trust: positive counts from the
    /// right, negative from the left, 0 means the transport peer.
    #[serde(default)]
    pub real_ip_pos: i32,
    #[serde(default)]
    pub certificate: Option<PathBuf>,
    #[serde(default)]
    pub key: Option<PathBuf>,
    #[serde(default)]
    pub hsts: bool,
    #[serde(default)]
    pub tls_min_version: Option<String>,
    #[serde(default)]
    pub tls_curve_preferences: Vec<String>,
    #[serde(default)]
    pub tls_cipher_suites: Option<Vec<String>>,
    #[serde(default)]
    pub letsencrypt: LetsEncryptConfig,
    /// Prometheus endpoint bind address; metrics are disabled when unset.
    #[serde(default)]
    pub metrics_addr: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TokenConfig {
    #[serde(default)]
    pub issuer: String,
    #[serde(default)]
    pub certificate: Option<PathBuf>,
    #[serde(default)]
    pub key: Option<PathBuf>,
    /// Token lifetime in seconds.
    #[serde(default)]
    pub expiration: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub token: TokenConfig,
    #[serde(default)]
    pub users: Option<HashMap<String, Requirements>>,
    #[serde(default)]
    pub github_auth: Option<GithubAuthConfig>,
    #[serde(default)]
    pub google_auth: Option<GoogleAuthConfig>,
    #[serde(default)]
    pub gitlab_auth: Option<GitlabAuthConfig>,
    #[serde(default)]
    pub oidc_auth: Option<OidcAuthConfig>,
    #[serde(default)]
    pub ldap_auth: Option<LdapAuthConfig>,
    #[serde(default)]
    pub ext_auth: Option<ExtProcessAuthConfig>,
    #[serde(default)]
    pub plugin_authn: Option<PluginAuthnConfig>,
    #[serde(default)]
    pub acl: Option<Vec<Entry>>,
    #[serde(default)]
    pub ext_authz: Option<ExtHttpAuthzConfig>,
    #[serde(default)]
    pub plugin_authz: Option<PluginAuthzConfig>,
    #[serde(default)]
    pub casbin_authz: Option<CasbinAuthzConfig>,
}

impl Config {
    /// The keypair the token minter signs with: the token keypair when
    /// configured, otherwise the server keypair.
    pub fn token_keypair(&self) -> Option<(&Path, &Path)> {
        match (&self.token.certificate, &self.token.key) {
            (Some(cert), Some(key)) => Some((cert, key)),
            _ => match (&self.server.certificate, &self.server.key) {
                (Some(cert), Some(key)) => Some((cert, key)),
                _ => None,
            },
        }
    }

    fn has_authn(&self) -> bool {
        self.users.is_some()
            || self.github_auth.is_some()
            || self.google_auth.is_some()
            || self.gitlab_auth.is_some()
            || self.oidc_auth.is_some()
            || self.ldap_auth.is_some()
            || self.ext_auth.is_some()
            || self.plugin_authn.is_some()
    }

    fn has_authz(&self) -> bool {
        self.acl.is_some()
            || self.ext_authz.is_some()
            || self.plugin_authz.is_some()
            || self.casbin_authz.is_some()
    }

    pub fn validate(&mut self) -> Result<(), ConfigError> {
        let invalid = |message: String| ConfigError::Invalid(message);

        if self.server.addr.is_empty() {
            return Err(invalid("server.addr is required".to_string()));
        }
        if self.server.net != "tcp" && self.server.net != "unix" {
            return Err(invalid("server.net must be tcp or unix".to_string()));
        }
        if !self.server.path_prefix.is_empty() && !self.server.path_prefix.starts_with('/') {
            return Err(invalid(
                "server.path_prefix must be an absolute path".to_string(),
            ));
        }
        if matches!(self.server.tls_min_version.as_deref(), Some("TLS13"))
            && self.server.tls_cipher_suites.is_some()
        {
            return Err(invalid(
                "TLS 1.3 ciphersuites are not configurable".to_string(),
            ));
        }
        if self.token.issuer.is_empty() {
            return Err(invalid("token.issuer is required".to_string()));
        }
        if self.token.expiration <= 0 {
            return Err(invalid(format!(
                "token.expiration must be positive, got {}",
                self.token.expiration
            )));
        }

        if !self.has_authn() {
            return Err(invalid(
                "no auth methods are configured, this is probably a mistake; \
                 use an empty user map if you really want to deny everyone"
                    .to_string(),
            ));
        }

        if let Some(github) = &mut self.github_auth {
            resolve_client_secret(
                &mut github.client_secret,
                &github.client_secret_file,
                "github_auth",
            )?;
            validate_oauth_section(
                "github_auth",
                &github.client_id,
                &github.client_secret,
                github.token_db.is_some(),
                github.redis_token_db.as_ref(),
            )?;
        }
        if let Some(google) = &mut self.google_auth {
            resolve_client_secret(
                &mut google.client_secret,
                &google.client_secret_file,
                "google_auth",
            )?;
            validate_oauth_section(
                "google_auth",
                &google.client_id,
                &google.client_secret,
                google.token_db.is_some(),
                google.redis_token_db.as_ref(),
            )?;
        }
        if let Some(gitlab) = &mut self.gitlab_auth {
            resolve_client_secret(
                &mut gitlab.client_secret,
                &gitlab.client_secret_file,
                "gitlab_auth",
            )?;
            validate_oauth_section(
                "gitlab_auth",
                &gitlab.client_id,
                &gitlab.client_secret,
                gitlab.token_db.is_some(),
                gitlab.redis_token_db.as_ref(),
            )?;
        }
        if let Some(oidc) = &mut self.oidc_auth {
            resolve_client_secret(
                &mut oidc.client_secret,
                &oidc.client_secret_file,
                "oidc_auth",
            )?;
            if oidc.issuer.is_empty() {
                return Err(invalid("oidc_auth.issuer is required".to_string()));
            }
            validate_oauth_section(
                "oidc_auth",
                &oidc.client_id,
                &oidc.client_secret,
                oidc.token_db.is_some(),
                oidc.redis_token_db.as_ref(),
            )?;
        }
        if let Some(ext) = &self.ext_auth {
            ext.validate().map_err(invalid)?;
        }
        if let Some(plugin) = &self.plugin_authn {
            plugin.validate().map_err(invalid)?;
        }

        if !self.has_authz() {
            return Err(invalid(
                "ACL is empty, this is probably a mistake; \
                 use an empty list if you really want to deny all actions"
                    .to_string(),
            ));
        }
        if let Some(entries) = &self.acl {
            Acl::compile(entries).map_err(|err| invalid(format!("invalid ACL: {err}")))?;
        }
        if let Some(ext) = &self.ext_authz {
            ext.validate().map_err(invalid)?;
        }
        if let Some(plugin) = &self.plugin_authz {
            plugin.validate().map_err(invalid)?;
        }
        if let Some(casbin) = &self.casbin_authz {
            casbin.validate().map_err(invalid)?;
        }

        let server_pair = keypair_state("server", &self.server.certificate, &self.server.key)?;
        let token_pair = keypair_state("token", &self.token.certificate, &self.token.key)?;
        if !server_pair && !token_pair {
            return Err(invalid(
                "failed to load token cert and key: none provided".to_string(),
            ));
        }

        if !server_pair && !self.server.letsencrypt.email.is_empty() {
            let cachedir = &self.server.letsencrypt.cachedir;
            if cachedir.is_empty() {
                return Err(invalid(
                    "server.letsencrypt.cachedir is required".to_string(),
                ));
            }
            // Losing obtained certificates is expensive, so the cache
            // directory must already exist.
            if !Path::new(cachedir).is_dir() {
                return Err(invalid(format!(
                    "server.letsencrypt.cachedir ({cachedir}) does not exist or is not a directory"
                )));
            }
        }

        Ok(())
    }
}

fn resolve_client_secret(
    secret: &mut Option<String>,
    secret_file: &Option<PathBuf>,
    section: &str,
) -> Result<(), ConfigError> {
    if let Some(path) = secret_file {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        *secret = Some(contents.trim().to_string());
    }
    if secret.as_deref().is_some_and(|s| s.is_empty()) {
        return Err(ConfigError::Invalid(format!(
            "{section}.client_secret is empty"
        )));
    }
    Ok(())
}

fn validate_oauth_section(
    section: &str,
    client_id: &str,
    client_secret: &Option<String>,
    has_file_db: bool,
    redis_db: Option<&crate::tokendb::RedisTokenDbConfig>,
) -> Result<(), ConfigError> {
    if client_id.is_empty() || client_secret.is_none() {
        return Err(ConfigError::Invalid(format!(
            "{section}.{{client_id,client_secret}} are required"
        )));
    }
    if let Some(redis) = redis_db {
        redis.validate(section).map_err(ConfigError::Invalid)?;
    }
    if !has_file_db && redis_db.is_none() {
        return Err(ConfigError::Invalid(format!(
            "{section} needs a token db (token_db or redis_token_db)"
        )));
    }
    Ok(())
}

fn keypair_state(
    section: &str,
    certificate: &Option<PathBuf>,
    key: &Option<PathBuf>,
) -> Result<bool, ConfigError> {
    match (certificate, key) {
        (Some(_), Some(_)) => Ok(true),
        (None, None) => Ok(false),
        _ => Err(ConfigError::Invalid(format!(
            "failed to load {section} cert and key: both were not provided"
        ))),
    }
}

/// Load, apply environment overrides, validate.
pub fn load(path: &Path, env_prefix: &str) -> Result<Config, ConfigError> {
    load_with_vars(path, env_prefix, std::env::vars())
}

fn load_with_vars(
    path: &Path,
    env_prefix: &str,
    vars: impl Iterator<Item = (String, String)>,
) -> Result<Config, ConfigError> {
    let format = ConfigFormat::from_path(path)?;
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let mut tree: serde_json::Value = match format {
        ConfigFormat::Yaml => {
            serde_yaml::from_str(&contents).map_err(|err| ConfigError::Parse(err.to_string()))?
        }
        ConfigFormat::Json => {
            serde_json::from_str(&contents).map_err(|err| ConfigError::Parse(err.to_string()))?
        }
    };

    apply_env_overrides(&mut tree, env_prefix, format, vars)?;

    let mut config: Config =
        serde_json::from_value(tree).map_err(|err| ConfigError::Parse(err.to_string()))?;
    config.validate()?;
    Ok(config)
}

/// `<PREFIX>_A_B_C=<value>` sets key `a.b.c`. Every underscore after the
/// prefix separates one level, so keys that themselves contain
/// underscores cannot be addressed this way.
fn apply_env_overrides(
    tree: &mut serde_json::Value,
    env_prefix: &str,
    format: ConfigFormat,
    vars: impl Iterator<Item = (String, String)>,
) -> Result<(), ConfigError> {
    let prefix = format!("{env_prefix}_");
    for (key, raw) in vars {
        let Some(rest) = key.strip_prefix(&prefix) else {
            continue;
        };
        if rest.is_empty() {
            continue;
        }
        let segments: Vec<String> = rest.to_lowercase().split('_').map(str::to_string).collect();
        let value = format
            .parse_value(&raw)
            .map_err(|_| ConfigError::Parse(format!("could not parse env var {key}")))?;
        set_path(tree, &segments, value);
    }
    Ok(())
}

fn set_path(tree: &mut serde_json::Value, segments: &[String], value: serde_json::Value) {
    let Some((last, parents)) = segments.split_last() else {
        return;
    };
    let mut node = tree;
    for segment in parents {
        if !node.is_object() {
            *node = serde_json::Value::Object(serde_json::Map::new());
        }
        node = node
            .as_object_mut()
            .expect("object ensured above")
            .entry(segment.clone())
            .or_insert_with(|| serde_json::Value::Object(serde_json::Map::new()));
    }
    if !node.is_object() {
        *node = serde_json::Value::Object(serde_json::Map::new());
    }
    node.as_object_mut()
        .expect("object ensured above")
        .insert(last.clone(), value);
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const RSA_CERT: &str = include_str!("../testdata/rsa_cert.pem");
    const RSA_KEY: &str = include_str!("../testdata/rsa_key.pem");

    struct Fixture {
        dir: TempDir,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = TempDir::new().expect("tempdir");
            std::fs::write(dir.path().join("cert.pem"), RSA_CERT).unwrap();
            std::fs::write(dir.path().join("key.pem"), RSA_KEY).unwrap();
            Self { dir }
        }

        fn write(&self, name: &str, contents: &str) -> PathBuf {
            let path = self.dir.path().join(name);
            std::fs::write(&path, contents).unwrap();
            path
        }

        fn minimal_yaml(&self) -> String {
            format!(
                r#"
server:
  addr: ":5001"
token:
  issuer: "Acme auth server"
  expiration: 900
  certificate: "{cert}"
  key: "{key}"
users:
  "admin":
    password: "$2y$05$hash"
acl:
  - match: {{}}
    actions: ["pull"]
"#,
                cert = self.dir.path().join("cert.pem").display(),
                key = self.dir.path().join("key.pem").display(),
            )
        }

        fn load(&self, name: &str, contents: &str) -> Result<Config, ConfigError> {
            let path = self.write(name, contents);
            load_with_vars(&path, "AUTHTEST", std::iter::empty())
        }

        fn load_env(
            &self,
            name: &str,
            contents: &str,
            vars: &[(&str, &str)],
        ) -> Result<Config, ConfigError> {
            let path = self.write(name, contents);
            load_with_vars(
                &path,
                "AUTHTEST",
                vars.iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect::<Vec<_>>()
                    .into_iter(),
            )
        }
    }

    #[test]
    fn minimal_yaml_loads_with_defaults() {
        let fixture = Fixture::new();
        let config = fixture
            .load("config.yml", &fixture.minimal_yaml())
            .expect("config");
        assert_eq!(config.server.addr, ":5001");
        assert_eq!(config.server.net, "tcp");
        assert_eq!(config.token.expiration, 900);
        assert!(config.token_keypair().is_some());
    }

    #[test]
    fn json_config_is_supported() {
        let fixture = Fixture::new();
        let cert = fixture.dir.path().join("cert.pem");
        let key = fixture.dir.path().join("key.pem");
        let contents = serde_json::json!({
            "server": {"addr": ":5001"},
            "token": {
                "issuer": "Acme auth server",
                "expiration": 900,
                "certificate": cert,
                "key": key
            },
            "users": {},
            "acl": [{"match": {}, "actions": ["pull"]}]
        })
        .to_string();
        let config = fixture.load("config.json", &contents).expect("config");
        assert_eq!(config.token.issuer, "Acme auth server");
    }

    #[test]
    fn unknown_extension_is_rejected() {
        let fixture = Fixture::new();
        let err = fixture.load("config.toml", "whatever").expect_err("format");
        assert!(matches!(err, ConfigError::UnsupportedFormat(_)));
    }

    #[test]
    fn env_overrides_win_over_the_file() {
        let fixture = Fixture::new();
        let config = fixture
            .load_env(
                "config.yml",
                &fixture.minimal_yaml(),
                &[
                    ("AUTHTEST_TOKEN_EXPIRATION", "600"),
                    ("AUTHTEST_TOKEN_ISSUER", "Overridden issuer"),
                    ("OTHER_TOKEN_EXPIRATION", "123"),
                ],
            )
            .expect("config");
        assert_eq!(config.token.expiration, 600);
        assert_eq!(config.token.issuer, "Overridden issuer");
    }

    #[test]
    fn env_override_creates_missing_sections() {
        let fixture = Fixture::new();
        let config = fixture
            .load_env(
                "config.yml",
                &fixture.minimal_yaml(),
                &[("AUTHTEST_SERVER_HSTS", "true")],
            )
            .expect("config");
        assert!(config.server.hsts);
    }

    #[test]
    fn missing_addr_fails_validation() {
        let fixture = Fixture::new();
        let contents = fixture.minimal_yaml().replace("addr: \":5001\"", "addr: \"\"");
        let err = fixture.load("config.yml", &contents).expect_err("invalid");
        assert!(err.to_string().contains("server.addr"));
    }

    #[test]
    fn bad_net_fails_validation() {
        let fixture = Fixture::new();
        let contents = fixture
            .minimal_yaml()
            .replace("addr: \":5001\"", "addr: \":5001\"\n  net: \"udp\"");
        let err = fixture.load("config.yml", &contents).expect_err("invalid");
        assert!(err.to_string().contains("server.net"));
    }

    #[test]
    fn relative_path_prefix_fails_validation() {
        let fixture = Fixture::new();
        let contents = fixture
            .minimal_yaml()
            .replace("addr: \":5001\"", "addr: \":5001\"\n  path_prefix: \"auth\"");
        let err = fixture.load("config.yml", &contents).expect_err("invalid");
        assert!(err.to_string().contains("path_prefix"));
    }

    #[test]
    fn non_positive_expiration_fails_validation() {
        let fixture = Fixture::new();
        let contents = fixture.minimal_yaml().replace("expiration: 900", "expiration: 0");
        let err = fixture.load("config.yml", &contents).expect_err("invalid");
        assert!(err.to_string().contains("expiration"));
    }

    #[test]
    fn some_authenticator_is_required() {
        let fixture = Fixture::new();
        let contents = fixture
            .minimal_yaml()
            .replace("users:\n  \"admin\":\n    password: \"$2y$05$hash\"\n", "");
        let err = fixture.load("config.yml", &contents).expect_err("invalid");
        assert!(err.to_string().contains("no auth methods"));
    }

    #[test]
    fn some_authorizer_is_required() {
        let fixture = Fixture::new();
        let contents = fixture
            .minimal_yaml()
            .replace("acl:\n  - match: {}\n    actions: [\"pull\"]\n", "");
        let err = fixture.load("config.yml", &contents).expect_err("invalid");
        assert!(err.to_string().contains("ACL is empty"));
    }

    #[test]
    fn bad_acl_regex_fails_at_load() {
        let fixture = Fixture::new();
        let contents = fixture.minimal_yaml().replace(
            "- match: {}",
            "- match: {account: \"/ab(/\"}",
        );
        let err = fixture.load("config.yml", &contents).expect_err("invalid");
        assert!(err.to_string().contains("invalid ACL"));
    }

    #[test]
    fn partial_keypair_fails_validation() {
        let fixture = Fixture::new();
        let contents = fixture.minimal_yaml().replace(
            &format!("  key: \"{}\"\n", fixture.dir.path().join("key.pem").display()),
            "",
        );
        let err = fixture.load("config.yml", &contents).expect_err("invalid");
        assert!(err.to_string().contains("both were not provided"));
    }

    #[test]
    fn missing_keypair_fails_validation() {
        let fixture = Fixture::new();
        let contents = fixture
            .minimal_yaml()
            .replace(
                &format!(
                    "  certificate: \"{}\"\n",
                    fixture.dir.path().join("cert.pem").display()
                ),
                "",
            )
            .replace(
                &format!("  key: \"{}\"\n", fixture.dir.path().join("key.pem").display()),
                "",
            );
        let err = fixture.load("config.yml", &contents).expect_err("invalid");
        assert!(err.to_string().contains("none provided"));
    }

    #[test]
    fn github_without_token_db_fails_validation() {
        let fixture = Fixture::new();
        let contents = format!(
            "{}github_auth:\n  client_id: \"id\"\n  client_secret: \"secret\"\n",
            fixture.minimal_yaml()
        );
        let err = fixture.load("config.yml", &contents).expect_err("invalid");
        assert!(err.to_string().contains("token db"));
    }

    #[test]
    fn partial_redis_token_db_fails_even_with_file_db() {
        let fixture = Fixture::new();
        let contents = format!(
            "{}github_auth:\n  client_id: \"id\"\n  client_secret: \"secret\"\n  \
             token_db: \"/tmp/tokens.json\"\n  redis_token_db: {{}}\n",
            fixture.minimal_yaml()
        );
        let err = fixture.load("config.yml", &contents).expect_err("invalid");
        assert!(err.to_string().contains("redis_token_db"));
    }

    #[test]
    fn client_secret_file_is_resolved() {
        let fixture = Fixture::new();
        let secret_path = fixture.write("secret.txt", "  hunter2\n");
        let contents = format!(
            "{}github_auth:\n  client_id: \"id\"\n  client_secret_file: \"{}\"\n  \
             token_db: \"/tmp/tokens.json\"\n",
            fixture.minimal_yaml(),
            secret_path.display()
        );
        let config = fixture.load("config.yml", &contents).expect("config");
        assert_eq!(
            config.github_auth.unwrap().client_secret.as_deref(),
            Some("hunter2")
        );
    }

    #[test]
    fn letsencrypt_without_cachedir_fails_validation() {
        // The token keypair stays configured, so only the letsencrypt
        // check can fail here.
        let fixture = Fixture::new();
        let contents = fixture.minimal_yaml().replace(
            "server:\n  addr: \":5001\"",
            "server:\n  addr: \":5001\"\n  letsencrypt:\n    email: \"ops@example.com\"",
        );
        let err = fixture.load("config.yml", &contents).expect_err("invalid");
        assert!(err.to_string().contains("cachedir"));
    }

    #[test]
    fn letsencrypt_cachedir_must_exist() {
        let fixture = Fixture::new();
        let contents = fixture.minimal_yaml().replace(
            "server:\n  addr: \":5001\"",
            "server:\n  addr: \":5001\"\n  letsencrypt:\n    email: \"ops@example.com\"\n    cachedir: \"/does/not/exist\"",
        );
        let err = fixture.load("config.yml", &contents).expect_err("invalid");
        assert!(err.to_string().contains("does not exist"));
    }
}
