//! Embedded file-backed token database.
//!
//! One JSON document maps username to stored record. All mutation happens
//! under a write lock and lands on disk through a write-to-temp + rename,
//! so a database password rotation is atomic: either the old hash is still
//! on disk or the new one is, never a torn mix.

use super::{check_record, generate_dp, hash_dp, DbValue, StoredRecord, TokenDb, TokenDbError};
use crate::authn::PasswordString;
use anyhow::Context;
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use tokio::sync::RwLock;

pub struct FileTokenDb {
    path: PathBuf,
    records: RwLock<HashMap<String, StoredRecord>>,
}

impl FileTokenDb {
    pub async fn open(path: PathBuf) -> anyhow::Result<Self> {
        let records = match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .with_context(|| format!("parse token db {}", path.display()))?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(err) => {
                return Err(err).with_context(|| format!("read token db {}", path.display()))
            }
        };
        Ok(Self {
            path,
            records: RwLock::new(records),
        })
    }

    async fn persist(&self, records: &HashMap<String, StoredRecord>) -> Result<(), TokenDbError> {
        let bytes = serde_json::to_vec_pretty(records)
            .map_err(|err| TokenDbError::Backend(err.into()))?;
        let tmp = self.path.with_extension("tmp");
        tokio::fs::write(&tmp, &bytes)
            .await
            .map_err(|err| TokenDbError::Backend(err.into()))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|err| TokenDbError::Backend(err.into()))?;
        Ok(())
    }
}

#[async_trait]
impl TokenDb for FileTokenDb {
    async fn get_value(&self, user: &str) -> Result<Option<DbValue>, TokenDbError> {
        let records = self.records.read().await;
        Ok(records.get(user).map(|record| record.value.clone()))
    }

    async fn store_token(
        &self,
        user: &str,
        value: DbValue,
        generate: bool,
    ) -> Result<Option<String>, TokenDbError> {
        let mut records = self.records.write().await;
        let dp = if generate { Some(generate_dp()) } else { None };
        let dp_hash = match &dp {
            Some(dp) => Some(hash_dp(dp)?),
            None => records.get(user).and_then(|record| record.dp_hash.clone()),
        };
        records.insert(user.to_string(), StoredRecord { dp_hash, value });
        self.persist(&records).await?;
        Ok(dp)
    }

    async fn validate_token(
        &self,
        user: &str,
        dp: &PasswordString,
        now: i64,
    ) -> Result<(), TokenDbError> {
        let records = self.records.read().await;
        let record = records.get(user).ok_or(TokenDbError::NoMatch)?;
        check_record(record, dp, now)
    }

    async fn delete_token(&self, user: &str) -> Result<(), TokenDbError> {
        let mut records = self.records.write().await;
        if records.remove(user).is_none() {
            return Err(TokenDbError::NoMatch);
        }
        self.persist(&records).await
    }

    async fn close(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use portcullis_acl::Labels;
    use tempfile::TempDir;

    fn value(valid_until: i64) -> DbValue {
        let mut labels = Labels::new();
        labels.insert("teams".to_string(), vec!["eng".to_string()]);
        DbValue {
            token_type: "bearer".to_string(),
            access_token: "gho_abc".to_string(),
            refresh_token: None,
            valid_until,
            labels,
        }
    }

    async fn open(dir: &TempDir) -> FileTokenDb {
        FileTokenDb::open(dir.path().join("tokens.json"))
            .await
            .expect("open")
    }

    #[tokio::test]
    async fn store_then_get_round_trips() {
        let dir = TempDir::new().unwrap();
        let db = open(&dir).await;
        let stored = value(100);
        let dp = db.store_token("alice", stored.clone(), false).await.expect("store");
        assert!(dp.is_none());
        assert_eq!(db.get_value("alice").await.expect("get"), Some(stored));
        assert_eq!(db.get_value("bob").await.expect("get"), None);
    }

    #[tokio::test]
    async fn generated_dp_validates_and_rotates() {
        let dir = TempDir::new().unwrap();
        let db = open(&dir).await;
        let dp1 = db
            .store_token("alice", value(1_000), true)
            .await
            .expect("store")
            .expect("dp");

        let good = PasswordString::new(dp1.clone());
        db.validate_token("alice", &good, 500).await.expect("valid");

        let bad = PasswordString::new("nope");
        assert!(matches!(
            db.validate_token("alice", &bad, 500).await,
            Err(TokenDbError::WrongPass)
        ));

        // Rotation: exactly one DP validates at any instant.
        let dp2 = db
            .store_token("alice", value(1_000), true)
            .await
            .expect("store")
            .expect("dp");
        assert_ne!(dp1, dp2);
        assert!(matches!(
            db.validate_token("alice", &good, 500).await,
            Err(TokenDbError::WrongPass)
        ));
        db.validate_token("alice", &PasswordString::new(dp2), 500)
            .await
            .expect("new dp valid");
    }

    #[tokio::test]
    async fn storing_without_generate_keeps_the_dp() {
        let dir = TempDir::new().unwrap();
        let db = open(&dir).await;
        let dp = db
            .store_token("alice", value(1_000), true)
            .await
            .expect("store")
            .expect("dp");
        db.store_token("alice", value(2_000), false).await.expect("update");
        db.validate_token("alice", &PasswordString::new(dp), 1_500)
            .await
            .expect("dp survives value update");
    }

    #[tokio::test]
    async fn expiry_is_reported_after_credentials_pass() {
        let dir = TempDir::new().unwrap();
        let db = open(&dir).await;
        let dp = db
            .store_token("alice", value(100), true)
            .await
            .expect("store")
            .expect("dp");
        assert!(matches!(
            db.validate_token("alice", &PasswordString::new(dp), 200).await,
            Err(TokenDbError::Expired)
        ));
        // Wrong credentials stay WrongPass even when the record is expired.
        assert!(matches!(
            db.validate_token("alice", &PasswordString::new("nope"), 200).await,
            Err(TokenDbError::WrongPass)
        ));
    }

    #[tokio::test]
    async fn unknown_user_is_no_match() {
        let dir = TempDir::new().unwrap();
        let db = open(&dir).await;
        assert!(matches!(
            db.validate_token("ghost", &PasswordString::new("x"), 0).await,
            Err(TokenDbError::NoMatch)
        ));
        assert!(matches!(
            db.delete_token("ghost").await,
            Err(TokenDbError::NoMatch)
        ));
    }

    #[tokio::test]
    async fn records_survive_reopen() {
        let dir = TempDir::new().unwrap();
        let dp;
        {
            let db = open(&dir).await;
            dp = db
                .store_token("alice", value(1_000), true)
                .await
                .expect("store")
                .expect("dp");
        }
        let db = open(&dir).await;
        db.validate_token("alice", &PasswordString::new(dp), 500)
            .await
            .expect("persisted dp still validates");
    }
}
