/// Default listen address (all interfaces)
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default TCP port for the relay
pub const DEFAULT_PORT: u16 = 9000;

/// Default content-addressed store location, relative to the working directory
pub const DEFAULT_STORAGE_DIR: &str = "storage/hashed_files";

/// Index file written by the storage subsystem inside the store directory
pub const DEFAULT_INDEX_FILE: &str = "cas_index.json";

/// Maximum payload of a frame sent by a client (64KB)
pub const MAX_FRAME_LEN: usize = 64 * 1024;

/// Maximum payload of a server response; `FILE_LIST` grows with the index (16MB)
pub const MAX_RESPONSE_LEN: usize = 16 * 1024 * 1024;

/// Frames buffered per connection before senders wait
pub const OUTBOUND_QUEUE_CAPACITY: usize = 256;

/// Pause after the process runs out of file descriptors while accepting
pub const ACCEPT_BACKOFF_MS: u64 = 100;
