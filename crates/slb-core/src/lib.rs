//! Core of the Slack tool bridge.
//!
//! Everything here is transport-agnostic: the Slack Web API sits behind the
//! [`ports::SlackApi`] port (implemented in `slb-web`) and the MCP stdio loop lives
//! in the `slb` binary.

pub mod config;
pub mod credential;
pub mod domain;
pub mod errors;
pub mod formatting;
pub mod logging;
pub mod ports;
pub mod rate_gate;
pub mod remote;
pub mod tools;
pub mod utils;

#[cfg(test)]
pub(crate) mod testing;

pub use errors::{Error, RemoteError, Result};
