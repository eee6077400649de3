//! Client configuration

use std::path::PathBuf;

/// Client configuration for connecting to mesa-cloud
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// API root including the version prefix (e.g. "http://localhost:5000/api/v1")
    pub base_url: String,

    /// Request timeout in seconds
    pub timeout: u64,

    /// Directory for persisted client state (remember-me token, cart)
    pub data_dir: PathBuf,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: 30,
            data_dir: PathBuf::from(".mesa"),
        }
    }

    /// Set the request timeout
    pub fn with_timeout(mut self, seconds: u64) -> Self {
        self.timeout = seconds;
        self
    }

    /// Set the persistence directory
    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = dir.into();
        self
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new("http://localhost:5000/api/v1")
    }
}
