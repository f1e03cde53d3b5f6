//! Cache and runtime directory paths
//!
//! Uses XDG directories via `dirs` crate with fallbacks.
//!
//! Platform-specific locations:
//! - Linux: `~/.cache/beamtail/`, `$XDG_RUNTIME_DIR/`
//! - macOS: `~/Library/Caches/beamtail/`, the system temp dir

use anyhow::{Context, Result};
use std::path::PathBuf;

const APP_NAME: &str = "beamtail";

/// Default socket file name inside the runtime directory
pub const SOCKET_FILE: &str = "beamtail.sock";

/// Get the application cache directory, creating it if needed
/// Returns ~/.cache/beamtail/ on Linux, ~/Library/Caches/beamtail/ on macOS
pub fn cache_dir() -> Result<PathBuf> {
    let base = dirs::cache_dir().context("Could not determine cache directory")?;
    let dir = base.join(APP_NAME);
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create cache directory {}", dir.display()))?;
    Ok(dir)
}

/// Get the directory for sockets and other per-session files
///
/// Falls back to the system temp dir where no runtime dir exists.
pub fn runtime_dir() -> PathBuf {
    dirs::runtime_dir().unwrap_or_else(std::env::temp_dir)
}

/// Default path of the ingestion socket
pub fn default_socket_path() -> PathBuf {
    runtime_dir().join(SOCKET_FILE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_dir_exists() {
        let dir = cache_dir().unwrap();
        assert!(dir.exists());
        assert!(dir.ends_with(APP_NAME));
    }

    #[test]
    fn test_default_socket_path() {
        let path = default_socket_path();
        assert!(path.ends_with(SOCKET_FILE));
        assert!(path.starts_with(runtime_dir()));
    }
}
