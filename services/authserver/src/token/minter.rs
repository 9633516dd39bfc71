//! Claim construction and JWS signing for registry bearer tokens.

use crate::token::keys::SigningKey;
use base64::Engine;
use jsonwebtoken::Header;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Tokens become valid slightly in the past to absorb clock skew between
/// this service and the registry.
const NOT_BEFORE_LEEWAY_SECS: i64 = 10;

/// One granted scope as it appears in the `access` claim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessEntry {
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
    pub actions: Vec<String>,
}

/// The claim set of an issued token, per the Docker distribution token
/// specification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub iss: String,
    pub sub: String,
    pub aud: String,
    pub exp: i64,
    pub nbf: i64,
    pub iat: i64,
    pub jti: String,
    pub access: Vec<AccessEntry>,
}

pub struct TokenMinter {
    issuer: String,
    expiration: Duration,
    key: Arc<SigningKey>,
}

impl TokenMinter {
    pub fn new(issuer: String, expiration: Duration, key: Arc<SigningKey>) -> Self {
        Self {
            issuer,
            expiration,
            key,
        }
    }

    pub fn expiration(&self) -> Duration {
        self.expiration
    }

    /// Sign a token for `subject` against `audience` carrying the granted
    /// access entries. Wall-clock time; tests use [`mint_at`].
    ///
    /// [`mint_at`]: TokenMinter::mint_at
    pub fn mint(
        &self,
        subject: &str,
        audience: &str,
        access: Vec<AccessEntry>,
    ) -> Result<String, jsonwebtoken::errors::Error> {
        self.mint_at(subject, audience, access, now_epoch_seconds())
    }

    pub fn mint_at(
        &self,
        subject: &str,
        audience: &str,
        access: Vec<AccessEntry>,
        now: i64,
    ) -> Result<String, jsonwebtoken::errors::Error> {
        let claims = Claims {
            iss: self.issuer.clone(),
            sub: subject.to_string(),
            aud: audience.to_string(),
            exp: now + self.expiration.as_secs() as i64,
            nbf: now - NOT_BEFORE_LEEWAY_SECS,
            iat: now,
            jti: new_jti(),
            access,
        };

        let mut header = Header::new(self.key.algorithm());
        header.kid = Some(self.key.key_id().to_string());
        jsonwebtoken::encode(&header, &claims, self.key.encoding_key())
    }

    pub fn key(&self) -> &SigningKey {
        &self.key
    }
}

/// Fresh 16 random bytes, base64url without padding.
fn new_jti() -> String {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

fn now_epoch_seconds() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_else(|_| Duration::from_secs(0))
        .as_secs() as i64
}
