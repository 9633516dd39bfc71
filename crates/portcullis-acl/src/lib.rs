//! Authorization vocabulary for the portcullis auth server.
//!
//! This crate holds the pieces every authorizer backend has to agree on:
//! the parsed form of a Docker registry scope, the string-pattern grammar
//! used by ACL match conditions, and the ACL entry evaluator itself.
//! Patterns are compiled when an ACL is loaded, not on the request path.

pub mod entry;
pub mod pattern;
pub mod scope;

pub use entry::{Acl, AuthzRequest, Entry, MatchConditions};
pub use pattern::{Pattern, PatternError, SubstitutionContext};
pub use scope::{Labels, Scope, ScopeParseError};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AclError {
    #[error("entry {index}: {source}")]
    BadPattern {
        index: usize,
        #[source]
        source: PatternError,
    },
    #[error("entry {index}: invalid ip condition {ip:?}")]
    BadIp { index: usize, ip: String },
    #[error("entry {index}: empty action list")]
    EmptyActions { index: usize },
}
