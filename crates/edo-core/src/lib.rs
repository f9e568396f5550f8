//! Core of the EDO document submission pipeline.
//!
//! Resolves trading-party identities, infers metadata from filenames, builds
//! the wire payload for the remote document-exchange service and drives
//! single and batch submissions. The network exchange itself is delegated to
//! a [`transport::Transport`] implementation; this crate has no HTTP client.

pub mod config;
pub mod error;
pub mod filename;
pub mod party;
pub mod payload;
pub mod session;
pub mod submit;
pub mod transport;
pub mod wire;

pub use config::{EdoConfig, EdoEndpoints};
pub use error::{Error, Result};

#[cfg(test)]
mod tests;
