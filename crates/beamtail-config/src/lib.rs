//! Configuration and path management for beamtail
//!
//! This crate provides:
//! - Directory utilities for cache and runtime files
//! - Configuration file loading (TOML)
//! - Application configuration (AppConfig)
//! - Listen address parsing (UNIX socket or TCP)

pub mod app_config;
pub mod config_file;
pub mod listen;
pub mod paths;

pub use app_config::AppConfig;
pub use config_file::load_config_file;
pub use listen::ListenAddr;
pub use paths::{cache_dir, runtime_dir};
