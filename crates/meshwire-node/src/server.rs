// ============================================
// File: crates/meshwire-node/src/server.rs
// ============================================
//! # Node Runner
//!
//! ## Creation Reason
//! The engine is synchronous and owns no sockets. `Node` wires it to
//! tokio: it accepts and dials TCP connections, feeds received chunks to
//! the engine and drives the heartbeat timer.
//!
//! ## Main Functionality
//! - `Node`: Lifecycle (`bind`, `serve`, `run`, `shutdown`)
//! - One read task per connection driving the receive state machine
//! - One write task per connection fed by `ChannelTransport`
//! - Heartbeat ticker calling `Instance::handle_heartbeat`
//!
//! ## Node Architecture
//! ```text
//! ┌───────────────────────────────────────────────────────────┐
//! │                          Node                             │
//! ├───────────────────────────────────────────────────────────┤
//! │                                                           │
//! │  ┌─────────────┐  ┌───────────────┐  ┌────────────────┐   │
//! │  │ Accept Task │  │ Dial (peers)  │  │ Heartbeat Task │   │
//! │  └──────┬──────┘  └───────┬───────┘  └───────┬────────┘   │
//! │         └────────┬────────┘                  │            │
//! │                  ▼                           │            │
//! │   per connection: read task ──┐              │            │
//! │                               ▼              ▼            │
//! │                  Mutex<Instance<ChannelTransport, ..>>    │
//! │                               │                           │
//! │                               ▼                           │
//! │   per connection: write task ◄── mpsc ◄── flush           │
//! │                                                           │
//! └───────────────────────────────────────────────────────────┘
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - The engine lock is never held across an `.await`
//! - The accepting side sends the server handshake; the dialing side
//!   answers with a client handshake from inside the engine
//!
//! ## Last Modified
//! v0.1.0 - Initial node runner

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::net::tcp::OwnedReadHalf;
use tokio::net::TcpStream;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use meshwire_common::types::{ConnectionHandle, NodeId};
use meshwire_core::protocol::{ConnectionState, Header, HEADER_SIZE};
use meshwire_transport::{
    connect, write_loop, ChannelTransport, FrameReader, NewDataMsg, TcpAcceptor, TransportError,
};

use crate::config::NodeConfig;
use crate::engine::Instance;
use crate::error::{NodeError, Result};
use crate::handlers::LocalRuntime;

/// Engine type run by the node binary.
pub type NodeEngine = Instance<ChannelTransport, LocalRuntime>;

// ============================================
// Shared State
// ============================================

struct Shared {
    engine: Mutex<NodeEngine>,
    next_handle: AtomicU64,
    max_payload_len: usize,
    shutdown: AtomicBool,
    shutdown_tx: broadcast::Sender<()>,
}

impl Shared {
    /// Registers `stream` with the engine and spawns its read and write
    /// tasks. `accept_port` is set for accepted connections.
    fn spawn_connection(
        self: &Arc<Self>,
        stream: TcpStream,
        peer: SocketAddr,
        accept_port: Option<u16>,
    ) -> ConnectionHandle {
        let handle = ConnectionHandle::new(self.next_handle.fetch_add(1, Ordering::Relaxed));
        let (reader, writer) = stream.into_split();

        let rx = {
            let mut engine = self.engine.lock();
            let rx = engine.routing_mut().transport_mut().register(handle);
            if let Some(port) = accept_port {
                if let Err(e) = engine.write_server_handshake(handle, Some(port)) {
                    warn!(handle = %handle, error = %e, "Failed to write server handshake");
                }
            }
            rx
        };
        info!(
            handle = %handle,
            peer = %peer,
            accepted = accept_port.is_some(),
            "Connection opened"
        );

        let shared = Arc::clone(self);
        let mut shutdown_rx = self.shutdown_tx.subscribe();
        tokio::spawn(async move {
            let writer_task = tokio::spawn(write_loop(writer, rx));

            tokio::select! {
                _ = shutdown_rx.recv() => {
                    debug!(handle = %handle, "Connection task received shutdown signal");
                }
                result = shared.read_loop(handle, reader) => {
                    if let Err(e) = result {
                        debug!(handle = %handle, error = %e, "Read loop ended with error");
                    }
                }
            }

            {
                let mut engine = shared.engine.lock();
                engine.handle_connection_lost(handle);
                // Dropping the sender lets the writer drain and exit
                engine.routing_mut().transport_mut().unregister(handle);
            }

            match writer_task.await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => debug!(handle = %handle, error = %e, "Writer ended with error"),
                Err(e) => warn!(handle = %handle, error = %e, "Writer task failed"),
            }
            info!(handle = %handle, peer = %peer, "Connection closed");
        });

        handle
    }

    /// Reads exactly what the engine asks for until it closes the
    /// connection or the peer goes away.
    async fn read_loop(&self, handle: ConnectionHandle, reader: OwnedReadHalf) -> Result<()> {
        let mut frames = FrameReader::new(reader, self.max_payload_len.max(HEADER_SIZE));
        let mut hdr = Header::default();
        let mut state = ConnectionState::AwaitHeader;

        while let Some(len) = state.next_read_len(&hdr) {
            let Some(chunk) = frames.read_chunk(len).await? else {
                debug!(handle = %handle, "Peer closed connection");
                return Ok(());
            };
            let is_payload = state == ConnectionState::AwaitPayload;
            state = self
                .engine
                .lock()
                .handle(&NewDataMsg::new(handle, &chunk), &mut hdr, is_payload);
        }

        debug!(handle = %handle, "Engine closed connection");
        Ok(())
    }
}

// ============================================
// Node
// ============================================

/// A meshwire node.
///
/// # Lifecycle
/// 1. Create with `Node::new(config, node_id)`
/// 2. Start with `node.run().await` (or `bind` + `serve`)
/// 3. Stop via `shutdown()` or Ctrl+C
pub struct Node {
    config: NodeConfig,
    this_node: NodeId,
    shared: Arc<Shared>,
}

impl Node {
    /// Creates a node with identity `this_node`.
    ///
    /// # Errors
    /// `InvalidThisNode` if `this_node` is `NodeId::NONE`.
    pub fn new(config: NodeConfig, this_node: NodeId) -> Result<Self> {
        let engine = Instance::new(
            this_node,
            config.middleman.app_identifier.clone(),
            ChannelTransport::new(),
            LocalRuntime::new(),
        )?;
        let (shutdown_tx, _) = broadcast::channel(1);

        Ok(Self {
            shared: Arc::new(Shared {
                engine: Mutex::new(engine),
                next_handle: AtomicU64::new(1),
                max_payload_len: config.middleman.max_payload_len,
                shutdown: AtomicBool::new(false),
                shutdown_tx,
            }),
            config,
            this_node,
        })
    }

    #[must_use]
    pub const fn this_node(&self) -> &NodeId {
        &self.this_node
    }

    /// Runs `f` with the engine locked.
    pub fn with_engine<R>(&self, f: impl FnOnce(&mut NodeEngine) -> R) -> R {
        f(&mut self.shared.engine.lock())
    }

    /// Binds the listener and serves until shutdown.
    ///
    /// # Errors
    /// Returns `StartupFailed` if the listener cannot be bound.
    pub async fn run(&self) -> Result<()> {
        let acceptor = self.bind().await?;
        self.serve(acceptor).await
    }

    /// Binds the configured listen address.
    ///
    /// # Errors
    /// Returns `StartupFailed` if binding fails.
    pub async fn bind(&self) -> Result<TcpAcceptor> {
        TcpAcceptor::bind_addr(self.config.network.listen_addr)
            .await
            .map_err(|e| NodeError::startup_failed(format!("TCP bind failed: {e}")))
    }

    /// Accepts connections on `acceptor`, dials configured peers and runs
    /// heartbeats until shutdown.
    ///
    /// # Errors
    /// Currently always returns `Ok` once shut down.
    pub async fn serve(&self, acceptor: TcpAcceptor) -> Result<()> {
        info!(
            node = %self.this_node,
            addr = %acceptor.local_addr(),
            "Starting meshwire node v{}",
            env!("CARGO_PKG_VERSION")
        );
        let mut shutdown_rx = self.shared.shutdown_tx.subscribe();
        let acceptor = Arc::new(acceptor);

        let mut tasks = vec![("accept", self.spawn_accept_task(Arc::clone(&acceptor)))];
        if let Some(period) = self.config.heartbeat_interval() {
            tasks.push(("heartbeat", self.spawn_heartbeat_task(period)));
        }

        for &peer in &self.config.network.peers {
            if let Err(e) = self.connect_peer(peer).await {
                warn!(peer = %peer, error = %e, "Failed to dial peer");
            }
        }

        info!("Node started successfully");

        if !self.shared.shutdown.load(Ordering::SeqCst) {
            tokio::select! {
                result = tokio::signal::ctrl_c() => match result {
                    Ok(()) => info!("Received shutdown signal"),
                    Err(e) => {
                        warn!(error = %e, "Ctrl+C handler unavailable, waiting for shutdown()");
                        let _ = shutdown_rx.recv().await;
                    }
                },
                _ = shutdown_rx.recv() => info!("Shutdown requested"),
            }
        }

        info!("Shutting down node...");
        self.shutdown();
        acceptor.shutdown();

        for (name, task) in tasks {
            match tokio::time::timeout(Duration::from_secs(5), task).await {
                Ok(Ok(())) => debug!("Task '{}' completed", name),
                Ok(Err(e)) => warn!("Task '{}' failed: {}", name, e),
                Err(_) => warn!("Task '{}' timed out during shutdown", name),
            }
        }

        info!("Node shutdown complete");
        Ok(())
    }

    /// Dials `addr`; the handshake completes once the peer's server
    /// handshake arrives.
    ///
    /// # Errors
    /// Returns the transport error if the peer cannot be reached.
    pub async fn connect_peer(&self, addr: SocketAddr) -> Result<ConnectionHandle> {
        let stream = connect(addr).await?;
        Ok(self.shared.spawn_connection(stream, addr, None))
    }

    /// Triggers shutdown programmatically.
    pub fn shutdown(&self) {
        self.shared.shutdown.store(true, Ordering::SeqCst);
        let _ = self.shared.shutdown_tx.send(());
    }

    fn spawn_accept_task(&self, acceptor: Arc<TcpAcceptor>) -> JoinHandle<()> {
        let shared = Arc::clone(&self.shared);
        let port = acceptor.local_addr().port();
        let mut shutdown_rx = self.shared.shutdown_tx.subscribe();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = shutdown_rx.recv() => {
                        debug!("Accept task received shutdown signal");
                        break;
                    }
                    result = acceptor.accept() => match result {
                        Ok((stream, peer)) => {
                            shared.spawn_connection(stream, peer, Some(port));
                        }
                        Err(TransportError::ShuttingDown) => break,
                        Err(e) => warn!(error = %e, "Accept failed"),
                    }
                }
            }
            debug!("Accept task exiting");
        })
    }

    fn spawn_heartbeat_task(&self, period: Duration) -> JoinHandle<()> {
        let shared = Arc::clone(&self.shared);
        let mut shutdown_rx = self.shared.shutdown_tx.subscribe();

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);

            loop {
                tokio::select! {
                    _ = shutdown_rx.recv() => {
                        debug!("Heartbeat task received shutdown signal");
                        break;
                    }
                    _ = ticker.tick() => {
                        let mut engine = shared.engine.lock();
                        engine.handle_heartbeat();
                        debug!(peers = engine.routing().direct_count(), "Heartbeat sent");
                    }
                }
            }
            debug!("Heartbeat task exiting");
        })
    }
}

impl std::fmt::Debug for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Node")
            .field("this_node", &self.this_node)
            .field("listen_addr", &self.config.network.listen_addr)
            .finish()
    }
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use meshwire_common::types::{ActorAddr, ActorId, MessageId};

    use super::*;

    fn local_config() -> NodeConfig {
        let mut config = NodeConfig::default();
        config.network.listen_addr = "127.0.0.1:0".parse().unwrap();
        config
    }

    async fn wait_until(mut cond: impl FnMut() -> bool) {
        for _ in 0..300 {
            if cond() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("condition not reached");
    }

    #[test]
    fn test_new_rejects_none_node() {
        assert!(matches!(
            Node::new(local_config(), NodeId::NONE),
            Err(NodeError::InvalidThisNode)
        ));
    }

    #[tokio::test]
    async fn test_nodes_handshake_and_dispatch() {
        let a_id = NodeId::new([1; 20], 1);
        let b_id = NodeId::new([2; 20], 2);
        let a = Arc::new(Node::new(local_config(), a_id).unwrap());
        let b = Node::new(local_config(), b_id).unwrap();

        let acceptor = a.bind().await.unwrap();
        let addr = acceptor.local_addr();
        let server = tokio::spawn({
            let a = Arc::clone(&a);
            async move { a.serve(acceptor).await }
        });

        b.connect_peer(addr).await.unwrap();
        wait_until(|| {
            a.with_engine(|e| e.lookup(&b_id).is_some())
                && b.with_engine(|e| e.lookup(&a_id).is_some())
        })
        .await;
        assert_eq!(b.with_engine(|e| e.callee().peer_count()), 1);

        b.with_engine(|e| {
            e.dispatch(
                None,
                Vec::new(),
                ActorAddr::new(a_id, ActorId::new(1)),
                MessageId::new(1),
                Bytes::from_static(b"hello"),
            )
        })
        .unwrap();
        // client handshake + dispatch
        wait_until(|| a.with_engine(|e| e.callee().delivered()) == 2).await;

        b.shutdown();
        wait_until(|| a.with_engine(|e| e.lookup(&b_id).is_none())).await;

        a.shutdown();
        server.await.unwrap().unwrap();
    }
}
