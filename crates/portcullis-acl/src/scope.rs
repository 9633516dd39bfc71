use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Identity labels: key to ordered list of values.
///
/// Authenticators populate these (teams, groups, email); ACL match
/// conditions consume them.
pub type Labels = HashMap<String, Vec<String>>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ScopeParseError {
    #[error("malformed scope {0:?}, expected type:name:actions")]
    Malformed(String),
}

/// A parsed `type:name:actions` scope from a token request.
///
/// The name may itself contain colons (`repository:host:5000/img:pull`),
/// so the type is everything before the first colon and the actions are
/// everything after the last one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scope {
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
    pub actions: Vec<String>,
}

impl Scope {
    pub fn new(kind: &str, name: &str, actions: &[&str]) -> Self {
        Self {
            kind: kind.to_string(),
            name: name.to_string(),
            actions: actions.iter().map(|a| a.to_string()).collect(),
        }
    }
}

impl FromStr for Scope {
    type Err = ScopeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || ScopeParseError::Malformed(s.to_string());
        let (kind, rest) = s.split_once(':').ok_or_else(malformed)?;
        let (name, actions_raw) = rest.rsplit_once(':').ok_or_else(malformed)?;
        if kind.is_empty() || name.is_empty() {
            return Err(malformed());
        }
        // Duplicates collapse; first occurrence wins so the request order
        // is preserved.
        let mut actions = Vec::new();
        for action in actions_raw.split(',') {
            if action.is_empty() {
                continue;
            }
            if !actions.iter().any(|a| a == action) {
                actions.push(action.to_string());
            }
        }
        Ok(Scope {
            kind: kind.to_string(),
            name: name.to_string(),
            actions,
        })
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.kind, self.name, self.actions.join(","))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_repository_scope() {
        let scope: Scope = "repository:library/alpine:pull,push".parse().expect("scope");
        assert_eq!(scope.kind, "repository");
        assert_eq!(scope.name, "library/alpine");
        assert_eq!(scope.actions, vec!["pull", "push"]);
    }

    #[test]
    fn name_may_contain_colons() {
        let scope: Scope = "repository:registry.local:5000/foo:pull".parse().expect("scope");
        assert_eq!(scope.name, "registry.local:5000/foo");
        assert_eq!(scope.actions, vec!["pull"]);
    }

    #[test]
    fn registry_catalog_scope() {
        let scope: Scope = "registry:catalog:*".parse().expect("scope");
        assert_eq!(scope.kind, "registry");
        assert_eq!(scope.name, "catalog");
        assert_eq!(scope.actions, vec!["*"]);
    }

    #[test]
    fn duplicate_actions_collapse_preserving_order() {
        let scope: Scope = "repository:a:push,pull,push".parse().expect("scope");
        assert_eq!(scope.actions, vec!["push", "pull"]);
    }

    #[test]
    fn empty_action_list_is_allowed() {
        let scope: Scope = "repository:a:".parse().expect("scope");
        assert!(scope.actions.is_empty());
    }

    #[test]
    fn rejects_missing_parts() {
        assert!("repository".parse::<Scope>().is_err());
        assert!("repository:name".parse::<Scope>().is_err());
        assert!(":name:pull".parse::<Scope>().is_err());
    }

    #[test]
    fn display_round_trips() {
        let scope: Scope = "repository:library/alpine:pull,push".parse().expect("scope");
        assert_eq!(scope.to_string(), "repository:library/alpine:pull,push");
    }
}
