//! Casbin-backed authorizer.
//!
//! The model is embedded and fixed; deployments supply only the policy
//! CSV. Requests are evaluated per action as
//! `(account, "type:name", action)`.

use super::{Authorizer, AuthzError};
use anyhow::Context;
use async_trait::async_trait;
use casbin::{CoreApi, DefaultModel, Enforcer, FileAdapter};
use portcullis_acl::AuthzRequest;
use serde::Deserialize;
use std::path::PathBuf;
use tokio::sync::RwLock;

const MODEL_CONF: &str = include_str!("model.conf");

#[derive(Debug, Clone, Deserialize)]
pub struct CasbinAuthzConfig {
    /// Path to the policy CSV (`p, sub, obj, act` lines).
    pub policy: PathBuf,
}

impl CasbinAuthzConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.policy.as_os_str().is_empty() {
            return Err("casbin_authz.policy is required".to_string());
        }
        Ok(())
    }
}

pub struct CasbinAuthorizer {
    enforcer: RwLock<Enforcer>,
}

impl CasbinAuthorizer {
    pub async fn new(config: &CasbinAuthzConfig) -> anyhow::Result<Self> {
        let model = DefaultModel::from_str(MODEL_CONF)
            .await
            .context("parse casbin model")?;
        let adapter = FileAdapter::new(config.policy.clone());
        let enforcer = Enforcer::new(model, adapter)
            .await
            .context("load casbin policy")?;
        Ok(Self {
            enforcer: RwLock::new(enforcer),
        })
    }
}

#[async_trait]
impl Authorizer for CasbinAuthorizer {
    async fn authorize(&self, req: &AuthzRequest) -> Result<Vec<String>, AuthzError> {
        let object = format!("{}:{}", req.kind, req.name);
        let enforcer = self.enforcer.read().await;
        let mut granted = Vec::new();
        for action in &req.actions {
            let allowed = enforcer
                .enforce((req.account.as_str(), object.as_str(), action.as_str()))
                .map_err(|err| AuthzError::Backend(err.into()))?;
            if allowed {
                granted.push(action.clone());
            }
        }
        if granted.is_empty() {
            return Err(AuthzError::NoMatch);
        }
        Ok(granted)
    }

    async fn stop(&self) {}

    fn name(&self) -> &'static str {
        "casbin"
    }
}
