//! Persistent storage for OAuth-exchanged provider tokens.
//!
//! Each record belongs to one upstream user and carries the provider
//! access token, its revalidation deadline, the labels harvested at login
//! time, and the bcrypt hash of the database password handed back to the
//! user for `docker login`.

pub mod file;
pub mod redis;

use crate::authn::PasswordString;
use async_trait::async_trait;
use portcullis_acl::Labels;
use rand::distributions::Alphanumeric;
use rand::{thread_rng, Rng};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use self::file::FileTokenDb;
pub use self::redis::{RedisTokenDb, RedisTokenDbConfig};

/// Database passwords are random alphanumerics of this length; only their
/// bcrypt hash is persisted.
const DP_LENGTH: usize = 32;

#[derive(Debug, Error)]
pub enum TokenDbError {
    #[error("token is past its revalidation deadline")]
    Expired,
    #[error("wrong password")]
    WrongPass,
    #[error("no stored token")]
    NoMatch,
    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

/// The stored value for one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DbValue {
    pub token_type: String,
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// Seconds since the Unix epoch.
    pub valid_until: i64,
    #[serde(default)]
    pub labels: Labels,
}

/// On-disk / on-wire record: the value plus the DP hash that guards it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct StoredRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dp_hash: Option<String>,
    pub value: DbValue,
}

#[async_trait]
pub trait TokenDb: Send + Sync {
    async fn get_value(&self, user: &str) -> Result<Option<DbValue>, TokenDbError>;

    /// Store the value for `user`. With `generate_dp` a fresh database
    /// password is generated, its bcrypt hash persisted, and the cleartext
    /// returned exactly once; otherwise the existing hash is kept.
    async fn store_token(
        &self,
        user: &str,
        value: DbValue,
        generate_dp: bool,
    ) -> Result<Option<String>, TokenDbError>;

    /// Check `dp` against the stored hash, then the revalidation deadline.
    async fn validate_token(
        &self,
        user: &str,
        dp: &PasswordString,
        now: i64,
    ) -> Result<(), TokenDbError>;

    async fn delete_token(&self, user: &str) -> Result<(), TokenDbError>;

    async fn close(&self);
}

pub(crate) fn generate_dp() -> String {
    thread_rng()
        .sample_iter(&Alphanumeric)
        .take(DP_LENGTH)
        .map(char::from)
        .collect()
}

pub(crate) fn hash_dp(dp: &str) -> Result<String, TokenDbError> {
    bcrypt::hash(dp, bcrypt::DEFAULT_COST).map_err(|err| TokenDbError::Backend(err.into()))
}

/// Credential check first, deadline second, so an attacker cannot probe
/// whether an expired record exists.
pub(crate) fn check_record(
    record: &StoredRecord,
    dp: &PasswordString,
    now: i64,
) -> Result<(), TokenDbError> {
    let Some(hash) = record.dp_hash.as_deref() else {
        return Err(TokenDbError::WrongPass);
    };
    match bcrypt::verify(dp.expose(), hash) {
        Ok(true) => {}
        Ok(false) => return Err(TokenDbError::WrongPass),
        Err(err) => return Err(TokenDbError::Backend(err.into())),
    }
    if now > record.value.valid_until {
        return Err(TokenDbError::Expired);
    }
    Ok(())
}
