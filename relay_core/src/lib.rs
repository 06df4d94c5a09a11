//! # CAS chat relay
//!
//! A multi-client relay server. Clients hold one TCP connection each and send
//! length-prefixed frames. A frame is either free-form chat text, relayed to
//! every other client, or a JSON control request:
//!
//! - `LIST_PEERS`: addresses of the connected clients
//! - `LIST_FILES`: files known to the content-addressed store's index
//! - `REQUEST_FILE`: the file's chunk references, one `FILE_CHUNK` each, closed
//!   by a single `FILE_END` carrying the outcome
//!
//! The store itself (chunking, hashing, writing the index) lives elsewhere; the
//! relay only reads it.

pub mod broadcast;
pub mod client;
pub mod config;
pub mod error;
pub mod index;
pub mod protocol;
pub mod registry;
pub mod relay;

pub use broadcast::Broadcaster;
pub use client::RelayClient;
pub use config::RelayConfig;
pub use error::{IndexError, RegistryError};
pub use index::{FileIndex, FileIndexEntry};
pub use protocol::{FileSummary, PeerInfo, Request, Response, ServerFrame, TransferStatus};
pub use registry::{ClientRegistry, Connection, ConnectionId};
pub use relay::RelayServer;
