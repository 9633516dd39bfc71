//! Docker registry v2 token issuance service.
//!
//! The service authenticates a client through an ordered chain of
//! authenticator backends, decides per requested scope which actions the
//! authorizer chain grants, and signs a bearer token in the format the
//! registry's token middleware expects.

pub mod api;
pub mod app;
pub mod authn;
pub mod authz;
pub mod clock;
pub mod config;
pub mod observability;
pub mod plugin;
pub mod token;
pub mod tokendb;
