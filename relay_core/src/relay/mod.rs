//! Connection supervision and per-connection protocol dispatch.
//!
//! This module provides:
//! - The TCP accept loop (`RelayServer`)
//! - One dispatcher task per client, plus a writer task owning the socket's write half
//! - Chunk-reference streaming for file requests

pub mod constants;
pub mod dispatcher;
pub mod server;
pub mod state;

// Re-export public API
pub use constants::DEFAULT_PORT;
pub use dispatcher::Dispatcher;
pub use server::{RelayServer, serve_connection};
pub use state::RelayState;
