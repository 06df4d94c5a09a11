//! State shared by every connection task

use std::sync::Arc;

use crate::broadcast::Broadcaster;
use crate::config::RelayConfig;
use crate::index::FileIndex;
use crate::protocol::RelayCodec;
use crate::registry::ClientRegistry;

pub struct RelayState {
    pub registry: Arc<ClientRegistry>,
    pub broadcaster: Broadcaster,
    pub index: FileIndex,
    pub outbound_queue: usize,
    pub max_frame_len: usize,
}

impl RelayState {
    pub fn new(config: &RelayConfig) -> Self {
        let registry = Arc::new(ClientRegistry::new());
        Self {
            broadcaster: Broadcaster::new(registry.clone()),
            registry,
            index: FileIndex::new(config.storage_dir.clone(), &config.index_file),
            outbound_queue: config.outbound_queue.max(1),
            max_frame_len: config.max_frame_len,
        }
    }

    pub fn codec(&self) -> RelayCodec {
        RelayCodec::server(self.max_frame_len)
    }
}
