//! Static user map with bcrypt-hashed passwords.

use super::{Authenticator, AuthnError, PasswordString};
use async_trait::async_trait;
use portcullis_acl::Labels;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// What a user has to present and what they get: a bcrypt hash to match
/// and labels handed to authorization. A missing hash means any password
/// is accepted for that user (including the empty one — anonymous
/// entries).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Requirements {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<PasswordString>,
    #[serde(default)]
    pub labels: Labels,
}

pub struct StaticUsersAuth {
    users: HashMap<String, Requirements>,
}

impl StaticUsersAuth {
    pub fn new(users: HashMap<String, Requirements>) -> Self {
        Self { users }
    }
}

#[async_trait]
impl Authenticator for StaticUsersAuth {
    async fn authenticate(
        &self,
        user: &str,
        password: &PasswordString,
    ) -> Result<Labels, AuthnError> {
        let Some(requirements) = self.users.get(user) else {
            return Err(AuthnError::NoMatch);
        };
        if let Some(hash) = &requirements.password {
            if !bcrypt::verify(password.expose(), hash.expose()).unwrap_or(false) {
                return Err(AuthnError::WrongPass);
            }
        }
        Ok(requirements.labels.clone())
    }

    async fn stop(&self) {}

    fn name(&self) -> &'static str {
        "static"
    }
}
