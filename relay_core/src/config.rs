use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use crate::relay::constants::{
    DEFAULT_HOST, DEFAULT_INDEX_FILE, DEFAULT_PORT, DEFAULT_STORAGE_DIR, MAX_FRAME_LEN,
    OUTBOUND_QUEUE_CAPACITY,
};

const APP_QUALIFIER: &str = "com";
const APP_ORGANIZATION: &str = "cas";
const APP_NAME: &str = "cas_relay";
const CONFIG_FILE: &str = "config.json";

/// Env var pointing at a directory holding `config.json` (used by tests and deployments)
pub const CONFIG_DIR_ENV: &str = "RELAY_CONFIG_DIR";
pub const HOST_ENV: &str = "RELAY_HOST";
pub const PORT_ENV: &str = "RELAY_PORT";
pub const STORAGE_DIR_ENV: &str = "RELAY_STORAGE_DIR";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    pub host: String,
    pub port: u16,
    /// Directory of the content-addressed store: holds the index and one file per chunk
    pub storage_dir: PathBuf,
    pub index_file: String,
    /// Frames queued per connection before senders wait
    pub outbound_queue: usize,
    /// Largest frame a client may send
    pub max_frame_len: usize,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            storage_dir: PathBuf::from(DEFAULT_STORAGE_DIR),
            index_file: DEFAULT_INDEX_FILE.to_string(),
            outbound_queue: OUTBOUND_QUEUE_CAPACITY,
            max_frame_len: MAX_FRAME_LEN,
        }
    }
}

impl RelayConfig {
    /// Get the config file path
    fn get_config_path() -> Option<PathBuf> {
        if let Ok(dir) = std::env::var(CONFIG_DIR_ENV) {
            return Some(PathBuf::from(dir).join(CONFIG_FILE));
        }

        ProjectDirs::from(APP_QUALIFIER, APP_ORGANIZATION, APP_NAME)
            .map(|dirs| dirs.config_dir().join(CONFIG_FILE))
    }

    /// Load config from disk (or defaults), then apply `RELAY_*` environment overrides
    pub fn load() -> Self {
        let mut config = Self::load_file();
        config.apply_overrides(|key| std::env::var(key).ok());
        config
    }

    fn load_file() -> Self {
        let path = match Self::get_config_path() {
            Some(p) => p,
            None => return Self::default(),
        };

        match fs::read_to_string(&path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                tracing::warn!("Ignoring invalid config {}: {}", path.display(), e);
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    /// Apply overrides from a key lookup (normally the process environment)
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup(HOST_ENV).filter(|h| !h.trim().is_empty()) {
            self.host = host.trim().to_string();
        }

        if let Some(port) = lookup(PORT_ENV) {
            match port.trim().parse::<u16>() {
                Ok(port) => self.port = port,
                Err(e) => tracing::warn!("Ignoring {}={:?}: {}", PORT_ENV, port, e),
            }
        }

        if let Some(dir) = lookup(STORAGE_DIR_ENV).filter(|d| !d.trim().is_empty()) {
            self.storage_dir = PathBuf::from(dir);
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn index_path(&self) -> PathBuf {
        self.storage_dir.join(&self.index_file)
    }
}
