use bytes::Bytes;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::mpsc::error::TrySendError;

use crate::protocol::Frame;
use crate::registry::ClientRegistry;

/// Fans chat text out to every registered connection
#[derive(Debug, Clone)]
pub struct Broadcaster {
    registry: Arc<ClientRegistry>,
}

impl Broadcaster {
    pub fn new(registry: Arc<ClientRegistry>) -> Self {
        Self { registry }
    }

    /// Deliver `payload` to every member whose address is not `exclude`.
    ///
    /// Works on a registry snapshot, so no send ever holds the registry lock.
    /// Never waits on a recipient: one whose outbox is full misses this
    /// message, one whose writer is gone is skipped. Returns the number of
    /// successful deliveries.
    pub async fn broadcast(&self, payload: Bytes, exclude: Option<SocketAddr>) -> usize {
        let mut delivered = 0;

        for member in self.registry.snapshot().await {
            if Some(member.addr) == exclude {
                continue;
            }

            match member.try_send(Frame::Chat(payload.clone())) {
                Ok(()) => delivered += 1,
                Err(TrySendError::Full(_)) => {
                    tracing::warn!(
                        "Dropping message for {} ({}): outbox full",
                        member.addr,
                        member.id
                    );
                }
                Err(TrySendError::Closed(_)) => {
                    tracing::warn!(
                        "Failed to send to {} ({}): connection is closing",
                        member.addr,
                        member.id
                    );
                }
            }
        }

        delivered
    }
}
