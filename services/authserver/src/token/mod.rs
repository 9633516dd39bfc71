//! Token minting: key material and the Docker-distribution claim set.

pub mod keys;
pub mod minter;

pub use keys::{KeyError, SigningKey};
pub use minter::{AccessEntry, Claims, TokenMinter};
