//! Listen address parsing
//!
//! Addresses are written as `unix:<path>` or `tcp:<host:port>`.
//! A value without a scheme is taken as a UNIX socket path.

use anyhow::{bail, Result};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Where the ingestion server listens for beams
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListenAddr {
    /// UNIX domain socket at the given path
    Unix(PathBuf),
    /// TCP socket address, e.g. `127.0.0.1:7878`
    Tcp(String),
}

impl FromStr for ListenAddr {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.is_empty() {
            bail!("listen address is empty");
        }

        if let Some(path) = s.strip_prefix("unix:") {
            if path.is_empty() {
                bail!("unix listen address has no path");
            }
            return Ok(Self::Unix(PathBuf::from(path)));
        }

        if let Some(addr) = s.strip_prefix("tcp:") {
            // host:port, the port must be numeric
            match addr.rsplit_once(':') {
                Some((host, port)) if !host.is_empty() && port.parse::<u16>().is_ok() => {
                    return Ok(Self::Tcp(addr.to_string()));
                }
                _ => bail!("invalid tcp listen address '{}', expected host:port", addr),
            }
        }

        if s.contains("://") {
            bail!("unsupported listen address '{}'", s);
        }

        Ok(Self::Unix(PathBuf::from(s)))
    }
}

impl fmt::Display for ListenAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unix(path) => write!(f, "unix:{}", path.display()),
            Self::Tcp(addr) => write!(f, "tcp:{}", addr),
        }
    }
}
