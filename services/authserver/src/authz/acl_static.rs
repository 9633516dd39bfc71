//! In-process authorizer over the configured ACL.

use super::{Authorizer, AuthzError};
use async_trait::async_trait;
use portcullis_acl::{Acl, AclError, AuthzRequest, Entry};

pub struct StaticAclAuthorizer {
    acl: Acl,
}

impl StaticAclAuthorizer {
    pub fn new(entries: &[Entry]) -> Result<Self, AclError> {
        Ok(Self {
            acl: Acl::compile(entries)?,
        })
    }
}

#[async_trait]
impl Authorizer for StaticAclAuthorizer {
    async fn authorize(&self, req: &AuthzRequest) -> Result<Vec<String>, AuthzError> {
        if !self.acl.matches(req) {
            return Err(AuthzError::NoMatch);
        }
        Ok(self.acl.granted_actions(req))
    }

    async fn stop(&self) {}

    fn name(&self) -> &'static str {
        "static_acl"
    }
}
