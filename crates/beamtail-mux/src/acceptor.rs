//! Listening socket and accept loop
//!
//! The acceptor owns the listener and spawns one [`Session`] task per
//! connection. Triggering [`Shutdown`] stops the loop and closes the
//! listener; sessions already running are left alone and end when their
//! beam disconnects.

use std::io;
use std::net::SocketAddr;
#[cfg(unix)]
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use beamtail_config::ListenAddr;
use tokio::net::{TcpListener, TcpStream};
#[cfg(unix)]
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::watch;

use crate::bus::BusSender;
use crate::error::{MuxError, Result};
use crate::registry::LabelRegistry;
use crate::session::Session;

/// Process-wide stop signal for the accept loop
#[derive(Debug, Clone)]
pub struct Shutdown {
    tx: Arc<watch::Sender<bool>>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Ask every acceptor watching this handle to stop
    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_triggered(&self) -> bool {
        *self.tx.borrow()
    }

    fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

/// Removes the socket file when the listener goes away
#[cfg(unix)]
#[derive(Debug)]
struct SocketFileGuard {
    path: PathBuf,
}

#[cfg(unix)]
impl Drop for SocketFileGuard {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            log::warn!("Failed to remove socket {}: {}", self.path.display(), e);
        }
    }
}

#[derive(Debug)]
enum Listener {
    // field order matters: the listener closes before the file is removed
    #[cfg(unix)]
    Unix {
        listener: UnixListener,
        guard: SocketFileGuard,
    },
    Tcp(TcpListener),
}

enum Connection {
    #[cfg(unix)]
    Unix(UnixStream),
    Tcp(TcpStream, SocketAddr),
}

impl Connection {
    fn describe(&self, id: u64) -> String {
        match self {
            #[cfg(unix)]
            Self::Unix(_) => format!("unix#{}", id),
            Self::Tcp(_, addr) => format!("tcp {}", addr),
        }
    }
}

impl Listener {
    async fn bind(addr: &ListenAddr) -> io::Result<Self> {
        match addr {
            #[cfg(unix)]
            ListenAddr::Unix(path) => {
                prepare_socket_path(path)?;
                let listener = UnixListener::bind(path)?;
                Ok(Self::Unix {
                    listener,
                    guard: SocketFileGuard { path: path.clone() },
                })
            }
            #[cfg(not(unix))]
            ListenAddr::Unix(_) => Err(io::Error::new(
                io::ErrorKind::Unsupported,
                "UNIX sockets are not available on this platform",
            )),
            ListenAddr::Tcp(addr) => Ok(Self::Tcp(TcpListener::bind(addr.as_str()).await?)),
        }
    }

    async fn accept(&self) -> io::Result<Connection> {
        match self {
            #[cfg(unix)]
            Self::Unix { listener, .. } => {
                let (stream, _addr) = listener.accept().await?;
                Ok(Connection::Unix(stream))
            }
            Self::Tcp(listener) => {
                let (stream, addr) = listener.accept().await?;
                Ok(Connection::Tcp(stream, addr))
            }
        }
    }

    fn local_addr(&self) -> io::Result<ListenAddr> {
        match self {
            #[cfg(unix)]
            Self::Unix { guard, .. } => Ok(ListenAddr::Unix(guard.path.clone())),
            Self::Tcp(listener) => Ok(ListenAddr::Tcp(listener.local_addr()?.to_string())),
        }
    }
}

/// Create the parent directory and clear a stale socket file
///
/// Only a socket nobody is listening on is removed. A regular file, or a
/// socket another process still accepts on, fails the bind.
#[cfg(unix)]
fn prepare_socket_path(path: &Path) -> io::Result<()> {
    use std::os::unix::fs::FileTypeExt;

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let metadata = match std::fs::symlink_metadata(path) {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e),
    };
    if !metadata.file_type().is_socket() {
        return Err(io::Error::new(
            io::ErrorKind::AlreadyExists,
            format!("{} exists and is not a socket", path.display()),
        ));
    }
    if std::os::unix::net::UnixStream::connect(path).is_ok() {
        return Err(io::Error::new(
            io::ErrorKind::AddrInUse,
            format!("{} is in use by another listener", path.display()),
        ));
    }

    log::debug!("Removing stale socket {}", path.display());
    std::fs::remove_file(path)
}

/// Accepts beam connections and hands each to its own session
pub struct Acceptor {
    listener: Listener,
    registry: Arc<LabelRegistry>,
    bus: BusSender,
    handshake_timeout: Duration,
}

impl Acceptor {
    /// Bind the listening socket
    ///
    /// Failure here is the one fatal error of the multiplexer.
    pub async fn bind(
        addr: &ListenAddr,
        registry: Arc<LabelRegistry>,
        bus: BusSender,
        handshake_timeout: Duration,
    ) -> Result<Self> {
        let listener = Listener::bind(addr).await.map_err(|source| MuxError::Bind {
            addr: addr.to_string(),
            source,
        })?;

        log::info!("Listening for beams on {}", addr);

        Ok(Self {
            listener,
            registry,
            bus,
            handshake_timeout,
        })
    }

    /// Address actually bound, with the real port for `tcp:host:0`
    pub fn local_addr(&self) -> io::Result<ListenAddr> {
        self.listener.local_addr()
    }

    /// Accept connections until `shutdown` is triggered
    ///
    /// Accept failures are reported on the error stream and the loop goes
    /// on. The listener is closed when this returns.
    pub async fn run(self, shutdown: Shutdown) {
        let mut stop = shutdown.subscribe();
        let mut next_id: u64 = 0;

        loop {
            tokio::select! {
                _ = stop.wait_for(|stopped| *stopped) => {
                    log::info!("Shutdown requested, closing listener");
                    break;
                }
                accepted = self.listener.accept() => match accepted {
                    Ok(connection) => {
                        next_id += 1;
                        self.spawn_session(connection, next_id);
                    }
                    Err(e) => {
                        log::error!("Failed to accept connection: {}", e);
                        self.bus.error(MuxError::Accept(e));
                    }
                },
            }
        }

        log::info!("Accept loop stopped after {} connections", next_id);
    }

    fn spawn_session(&self, connection: Connection, id: u64) {
        let peer = connection.describe(id);
        log::debug!("Accepted connection from {}", peer);

        let registry = Arc::clone(&self.registry);
        let bus = self.bus.clone();
        let timeout = self.handshake_timeout;

        match connection {
            #[cfg(unix)]
            Connection::Unix(stream) => {
                tokio::spawn(Session::new(stream, peer, registry, bus, timeout).run());
            }
            Connection::Tcp(stream, _) => {
                tokio::spawn(Session::new(stream, peer, registry, bus, timeout).run());
            }
        }
    }
}
