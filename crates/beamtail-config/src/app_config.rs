//! Application configuration
//!
//! Configuration loaded from .beamtail.toml file.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::listen::ListenAddr;
use crate::paths;

/// Application configuration loaded from .beamtail.toml
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AppConfig {
    /// Where beams connect: `unix:<path>` or `tcp:<host:port>`
    #[serde(default = "default_listen")]
    pub listen: String,

    /// Deadline for a beam to send its handshake line
    #[serde(default = "default_handshake_timeout_ms")]
    pub handshake_timeout_ms: u64,

    /// Capacity of the message queue between sessions and the consumer
    #[serde(default = "default_message_queue_capacity")]
    pub message_queue_capacity: usize,

    /// Number of records kept in memory
    #[serde(default = "default_store_capacity")]
    pub store_capacity: usize,

    /// Color each label in the rendered prefix
    #[serde(default = "default_color_labels")]
    pub color_labels: bool,

    /// Text between the label and the payload
    #[serde(default = "default_label_separator")]
    pub label_separator: String,
}

fn default_listen() -> String {
    format!("unix:{}", paths::default_socket_path().display())
}

fn default_handshake_timeout_ms() -> u64 {
    3000
}

fn default_message_queue_capacity() -> usize {
    10_000
}

fn default_store_capacity() -> usize {
    100_000
}

fn default_color_labels() -> bool {
    true
}

fn default_label_separator() -> String {
    " | ".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            handshake_timeout_ms: default_handshake_timeout_ms(),
            message_queue_capacity: default_message_queue_capacity(),
            store_capacity: default_store_capacity(),
            color_labels: default_color_labels(),
            label_separator: default_label_separator(),
        }
    }
}

impl AppConfig {
    /// Load config from CWD first, then home directory, or use defaults
    pub fn load() -> Self {
        if let Some(content) = crate::load_config_file() {
            match toml::from_str(&content) {
                Ok(config) => {
                    log::info!("Loaded app config from file");
                    return config;
                }
                Err(e) => {
                    log::warn!("Failed to parse config file: {}", e);
                }
            }
        }

        log::debug!("Using default app config");
        Self::default()
    }

    /// Parsed listen address
    pub fn listen_addr(&self) -> Result<ListenAddr> {
        self.listen
            .parse()
            .with_context(|| format!("Invalid listen address in config: {}", self.listen))
    }

    pub fn handshake_timeout(&self) -> Duration {
        Duration::from_millis(self.handshake_timeout_ms)
    }
}
