// ============================================
// File: crates/meshwire-transport/src/tcp.rs
// ============================================
//! # TCP Transport
//!
//! ## Creation Reason
//! Nodes talk over TCP: the listener accepts peers on the published
//! port, outbound peers are dialed from configuration.
//!
//! ## Main Functionality
//! - `TcpAcceptor`: Listener bound with `SO_REUSEADDR`
//! - `connect`: Dial a peer with `TCP_NODELAY`
//!
//! ## Design Choices
//! - Uses socket2 to set options before `bind`
//! - Atomic shutdown flag for coordinated cleanup
//!
//! ## ⚠️ Important Note for Next Developer
//! - Consider firewall rules when binding to public addresses
//!
//! ## Last Modified
//! v0.1.0 - Initial TCP transport

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};

use socket2::{Domain, Protocol, Socket, Type};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info};

use crate::error::{Result, TransportError};

/// Backlog passed to `listen`.
const LISTEN_BACKLOG: i32 = 1024;

// ============================================
// TcpAcceptor
// ============================================

/// TCP listener accepting peer connections.
///
/// # Example
/// ```ignore
/// use meshwire_transport::TcpAcceptor;
///
/// let acceptor = TcpAcceptor::bind("0.0.0.0:4242").await?;
/// let (stream, peer) = acceptor.accept().await?;
/// ```
pub struct TcpAcceptor {
    listener: TcpListener,
    local_addr: SocketAddr,
    shutdown: AtomicBool,
}

impl TcpAcceptor {
    /// Creates a listener bound to the specified address.
    ///
    /// # Errors
    /// - `InvalidAddress`: If `addr` does not parse
    /// - `AddressInUse` / `BindFailed`: If binding fails
    pub async fn bind(addr: impl AsRef<str>) -> Result<Self> {
        let addr_str = addr.as_ref();
        let socket_addr: SocketAddr = addr_str.parse().map_err(|_| TransportError::InvalidAddress {
            addr: addr_str.to_string(),
        })?;

        Self::bind_addr(socket_addr).await
    }

    /// Creates a listener bound to the specified socket address.
    ///
    /// # Errors
    /// Returns error if binding fails.
    pub async fn bind_addr(addr: SocketAddr) -> Result<Self> {
        info!("Binding TCP acceptor to {}", addr);

        let domain = if addr.is_ipv4() {
            Domain::IPV4
        } else {
            Domain::IPV6
        };

        let socket = Socket::new(domain, Type::STREAM, Some(Protocol::TCP))
            .map_err(|e| TransportError::io("creating TCP socket", e))?;

        socket
            .set_reuse_address(true)
            .map_err(|e| TransportError::io("setting SO_REUSEADDR", e))?;

        socket
            .set_nonblocking(true)
            .map_err(|e| TransportError::io("setting non-blocking", e))?;

        socket.bind(&addr.into()).map_err(|e| {
            if e.kind() == std::io::ErrorKind::AddrInUse {
                TransportError::AddressInUse { addr }
            } else {
                TransportError::bind_failed(addr, e.to_string())
            }
        })?;

        socket
            .listen(LISTEN_BACKLOG)
            .map_err(|e| TransportError::bind_failed(addr, e.to_string()))?;

        let std_listener: std::net::TcpListener = socket.into();
        let listener = TcpListener::from_std(std_listener)
            .map_err(|e| TransportError::io("converting to Tokio listener", e))?;

        let local_addr = listener
            .local_addr()
            .map_err(|e| TransportError::io("getting local address", e))?;

        info!("TCP acceptor bound to {}", local_addr);

        Ok(Self {
            listener,
            local_addr,
            shutdown: AtomicBool::new(false),
        })
    }

    /// Returns the address the listener is bound to.
    #[must_use]
    pub const fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Accepts the next peer connection.
    ///
    /// # Errors
    /// `ShuttingDown` after [`TcpAcceptor::shutdown`], otherwise I/O errors.
    pub async fn accept(&self) -> Result<(TcpStream, SocketAddr)> {
        if self.is_shutdown() {
            return Err(TransportError::ShuttingDown);
        }

        let (stream, peer) = self
            .listener
            .accept()
            .await
            .map_err(|e| TransportError::io("accepting connection", e))?;

        stream
            .set_nodelay(true)
            .map_err(|e| TransportError::io("setting TCP_NODELAY", e))?;

        debug!("Accepted connection from {}", peer);
        Ok((stream, peer))
    }

    /// Marks the acceptor as shut down; further accepts fail.
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Release);
    }

    /// Checks if the acceptor has been shut down.
    #[must_use]
    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::Acquire)
    }
}

impl std::fmt::Debug for TcpAcceptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TcpAcceptor")
            .field("local_addr", &self.local_addr)
            .field("shutdown", &self.is_shutdown())
            .finish()
    }
}

// ============================================
// Outbound Connections
// ============================================

/// Dials a peer.
///
/// # Errors
/// Returns `ConnectFailed` if the peer cannot be reached.
pub async fn connect(addr: SocketAddr) -> Result<TcpStream> {
    let stream = TcpStream::connect(addr)
        .await
        .map_err(|e| TransportError::connect_failed(addr, e.to_string()))?;

    stream
        .set_nodelay(true)
        .map_err(|e| TransportError::io("setting TCP_NODELAY", e))?;

    debug!("Connected to {}", addr);
    Ok(stream)
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_bind_and_local_addr() {
        let acceptor = TcpAcceptor::bind("127.0.0.1:0").await.unwrap();
        let addr = acceptor.local_addr();

        assert_eq!(addr.ip(), std::net::Ipv4Addr::LOCALHOST);
        assert!(addr.port() > 0);
    }

    #[tokio::test]
    async fn test_accept_and_connect() {
        let acceptor = TcpAcceptor::bind("127.0.0.1:0").await.unwrap();
        let addr = acceptor.local_addr();

        let (client, accepted) = tokio::join!(connect(addr), acceptor.accept());
        let client = client.unwrap();
        let (_stream, peer) = accepted.unwrap();

        assert_eq!(peer, client.local_addr().unwrap());
    }

    #[tokio::test]
    async fn test_shutdown() {
        let acceptor = TcpAcceptor::bind("127.0.0.1:0").await.unwrap();
        acceptor.shutdown();

        assert!(acceptor.is_shutdown());
        assert!(matches!(acceptor.accept().await, Err(TransportError::ShuttingDown)));
    }

    #[tokio::test]
    async fn test_invalid_address() {
        let result = TcpAcceptor::bind("not-an-address").await;
        assert!(matches!(result, Err(TransportError::InvalidAddress { .. })));
    }

    #[tokio::test]
    async fn test_connect_refused() {
        // Bind then drop to get a port nothing listens on
        let addr = TcpAcceptor::bind("127.0.0.1:0").await.unwrap().local_addr();
        let result = connect(addr).await;
        assert!(matches!(result, Err(TransportError::ConnectFailed { .. })));
    }
}
