//! Relay wire protocol.
//!
//! A frame is either chat text, relayed verbatim, or a JSON object tagged by
//! its `type` field. Frames are length-prefixed, see [`codec`].

pub mod codec;
pub mod messages;

pub use codec::RelayCodec;
pub use messages::{
    FileSummary, Frame, Inbound, PeerInfo, Request, Response, ServerFrame, TransferStatus,
};
