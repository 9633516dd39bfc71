//! Redis-backed token database, single node or cluster.

use super::{check_record, generate_dp, hash_dp, DbValue, StoredRecord, TokenDb, TokenDbError};
use crate::authn::PasswordString;
use anyhow::{anyhow, Context};
use async_trait::async_trait;
use redis::AsyncCommands;
use serde::Deserialize;
use tokio::sync::Mutex;

const KEY_PREFIX: &str = "token/";

#[derive(Debug, Clone, Deserialize)]
pub struct RedisTokenDbConfig {
    /// URL for a single node, e.g. `redis://localhost:6379`.
    #[serde(default)]
    pub addr: Option<String>,
    /// Node URLs for a cluster deployment.
    #[serde(default)]
    pub cluster_addrs: Option<Vec<String>>,
}

impl RedisTokenDbConfig {
    /// A table with neither form configured is a configuration error,
    /// even when a different token db kind ends up selected.
    pub fn validate(&self, section: &str) -> Result<(), String> {
        if self.addr.is_none() && self.cluster_addrs.as_ref().is_none_or(|addrs| addrs.is_empty()) {
            return Err(format!(
                "{section}.redis_token_db needs either addr or cluster_addrs"
            ));
        }
        Ok(())
    }
}

enum Connection {
    Single(redis::aio::ConnectionManager),
    Cluster(redis::cluster_async::ClusterConnection),
}

pub struct RedisTokenDb {
    connection: Mutex<Connection>,
    /// Serializes read-modify-write stores so a DP hash read under one
    /// store cannot interleave with another store's write.
    store_lock: Mutex<()>,
}

impl RedisTokenDb {
    pub async fn connect(config: &RedisTokenDbConfig) -> anyhow::Result<Self> {
        let connection = if let Some(addrs) = config.cluster_addrs.as_ref().filter(|a| !a.is_empty())
        {
            let client = redis::cluster::ClusterClient::new(addrs.clone())
                .context("build redis cluster client")?;
            Connection::Cluster(
                client
                    .get_async_connection()
                    .await
                    .context("connect redis cluster")?,
            )
        } else if let Some(addr) = &config.addr {
            let client = redis::Client::open(addr.as_str()).context("open redis client")?;
            Connection::Single(
                client
                    .get_connection_manager()
                    .await
                    .context("connect redis")?,
            )
        } else {
            return Err(anyhow!("redis_token_db needs either addr or cluster_addrs"));
        };
        Ok(Self {
            connection: Mutex::new(connection),
            store_lock: Mutex::new(()),
        })
    }

    async fn get_record(&self, user: &str) -> Result<Option<StoredRecord>, TokenDbError> {
        let key = format!("{KEY_PREFIX}{user}");
        let raw: Option<String> = {
            let mut guard = self.connection.lock().await;
            match &mut *guard {
                Connection::Single(conn) => conn
                    .get(&key)
                    .await
                    .map_err(|err| TokenDbError::Backend(err.into()))?,
                Connection::Cluster(conn) => conn
                    .get(&key)
                    .await
                    .map_err(|err| TokenDbError::Backend(err.into()))?,
            }
        };
        raw.map(|raw| serde_json::from_str(&raw).map_err(|err| TokenDbError::Backend(err.into())))
            .transpose()
    }

    async fn put_record(&self, user: &str, record: &StoredRecord) -> Result<(), TokenDbError> {
        let key = format!("{KEY_PREFIX}{user}");
        let raw = serde_json::to_string(record).map_err(|err| TokenDbError::Backend(err.into()))?;
        let mut guard = self.connection.lock().await;
        match &mut *guard {
            Connection::Single(conn) => conn
                .set::<_, _, ()>(&key, raw)
                .await
                .map_err(|err| TokenDbError::Backend(err.into())),
            Connection::Cluster(conn) => conn
                .set::<_, _, ()>(&key, raw)
                .await
                .map_err(|err| TokenDbError::Backend(err.into())),
        }
    }
}

#[async_trait]
impl TokenDb for RedisTokenDb {
    async fn get_value(&self, user: &str) -> Result<Option<DbValue>, TokenDbError> {
        Ok(self.get_record(user).await?.map(|record| record.value))
    }

    async fn store_token(
        &self,
        user: &str,
        value: DbValue,
        generate: bool,
    ) -> Result<Option<String>, TokenDbError> {
        // Last-writer-wins on the full record; the store lock keeps the
        // hash read and the write from interleaving with another store.
        let _store = self.store_lock.lock().await;
        let dp = if generate { Some(generate_dp()) } else { None };
        let dp_hash = match &dp {
            Some(dp) => Some(hash_dp(dp)?),
            None => self
                .get_record(user)
                .await?
                .and_then(|record| record.dp_hash),
        };
        self.put_record(user, &StoredRecord { dp_hash, value }).await?;
        Ok(dp)
    }

    async fn validate_token(
        &self,
        user: &str,
        dp: &PasswordString,
        now: i64,
    ) -> Result<(), TokenDbError> {
        let record = self.get_record(user).await?.ok_or(TokenDbError::NoMatch)?;
        check_record(&record, dp, now)
    }

    async fn delete_token(&self, user: &str) -> Result<(), TokenDbError> {
        let key = format!("{KEY_PREFIX}{user}");
        let removed: i64 = {
            let mut guard = self.connection.lock().await;
            match &mut *guard {
                Connection::Single(conn) => conn
                    .del(&key)
                    .await
                    .map_err(|err| TokenDbError::Backend(err.into()))?,
                Connection::Cluster(conn) => conn
                    .del(&key)
                    .await
                    .map_err(|err| TokenDbError::Backend(err.into()))?,
            }
        };
        if removed == 0 {
            return Err(TokenDbError::NoMatch);
        }
        Ok(())
    }

    async fn close(&self) {}
}
