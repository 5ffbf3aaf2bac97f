//! Sync transport: WebSocket accept loop and per-peer session management.
//!
//! This module is responsible for:
//!
//! 1. Binding a TCP listener on the configured address (default port 8080).
//! 2. Accepting incoming connections from handsets and upgrading each to a
//!    WebSocket session.
//! 3. Tracking the set of currently connected peers.
//! 4. Decoding each inbound text frame into an [`Envelope`] and forwarding
//!    it to the engine over a channel.
//! 5. Broadcasting outbound text payloads to every connected peer.
//! 6. Shutting down promptly when [`SyncTransport::stop`] is called.
//!
//! # Concurrency
//!
//! Each peer session runs in its own Tokio task.  The accept loop never
//! blocks on a session: it accepts a connection, spawns its task, and moves
//! on.  Broadcast only enqueues into each peer's bounded outbound queue, so
//! one slow peer never stalls accept, other peers' reads, or the caller.
//!
//! # Protocol permissiveness
//!
//! Frames that fail to decode (invalid JSON, non-object top level) are
//! logged and discarded; the connection stays open and no error frame goes
//! back to the peer.  The protocol is fire-and-forget with no
//! acknowledgment frame defined.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use thiserror::Error;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, RwLock};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_tungstenite::{
    accept_async,
    tungstenite::{Error as WsError, Message as WsMessage},
};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use phonelink_core::{decode_frame, Envelope};

/// How long the accept loop waits before re-checking the running flag.
const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Bound of each peer's outbound frame queue.  Broadcast drops frames for a
/// peer whose queue is full rather than waiting on it.
const OUTBOUND_QUEUE_DEPTH: usize = 32;

/// Errors produced by the sync transport.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The TCP listener could not be bound (port in use, no permission).
    /// Fatal to `start`; the transport stays stopped.
    #[error("failed to bind sync listener on {addr}: {source}")]
    BindFailed {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },
}

/// Bookkeeping for one connected peer.
struct PeerHandle {
    /// Sender side of the peer's outbound frame queue.
    outbound: mpsc::Sender<String>,
    /// The peer's session task, aborted on transport shutdown.
    task: JoinHandle<()>,
}

/// The set of currently connected peers, keyed by per-connection UUID.
type Peers = Arc<RwLock<HashMap<Uuid, PeerHandle>>>;

/// Connection-oriented server multiplexing handset sync sessions.
///
/// Created by [`SyncTransport::start`], which binds the listener and spawns
/// the accept loop.  Decoded envelopes flow out through the channel given
/// at start; the owner consumes them at its own pace (the channel bound
/// provides backpressure per connection without stalling accept).
pub struct SyncTransport {
    local_addr: SocketAddr,
    running: Arc<AtomicBool>,
    peers: Peers,
    accept_task: JoinHandle<()>,
}

impl SyncTransport {
    /// Binds `bind_addr` and starts accepting peer connections.
    ///
    /// Decoded envelopes are sent to `envelope_tx` in per-connection
    /// receipt order; no ordering holds across connections.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::BindFailed`] when the listener cannot be
    /// bound.  This is the transport's only fatal error; everything after
    /// bind degrades per-connection.
    pub async fn start(
        bind_addr: SocketAddr,
        envelope_tx: mpsc::Sender<Envelope>,
    ) -> Result<Self, TransportError> {
        let listener = TcpListener::bind(bind_addr)
            .await
            .map_err(|source| TransportError::BindFailed {
                addr: bind_addr,
                source,
            })?;
        let local_addr = listener
            .local_addr()
            .map_err(|source| TransportError::BindFailed {
                addr: bind_addr,
                source,
            })?;

        info!("sync transport listening on {local_addr}");

        let running = Arc::new(AtomicBool::new(true));
        let peers: Peers = Arc::new(RwLock::new(HashMap::new()));

        let accept_task = tokio::spawn(accept_loop(
            listener,
            Arc::clone(&running),
            Arc::clone(&peers),
            envelope_tx,
        ));

        Ok(Self {
            local_addr,
            running,
            peers,
            accept_task,
        })
    }

    /// The address the listener actually bound (resolves port 0).
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Number of peers currently in the connected set.
    pub async fn connected_peers(&self) -> usize {
        self.peers.read().await.len()
    }

    /// Sends `text` verbatim to every currently connected peer.
    ///
    /// Best-effort: a peer whose outbound queue is full or whose session
    /// already ended simply misses the frame.  Nothing is retried and no
    /// peer is removed here; removal only happens when a session closes.
    pub async fn broadcast(&self, text: &str) {
        let peers = self.peers.read().await;
        for (peer_id, handle) in peers.iter() {
            if let Err(e) = handle.outbound.try_send(text.to_owned()) {
                debug!("peer {peer_id}: dropping broadcast frame: {e}");
            }
        }
    }

    /// Stops the accept loop, closes every peer connection, and releases
    /// the listening port.
    ///
    /// Prompt by construction: the accept task and every session task are
    /// aborted and awaited, so by the time this returns the port can be
    /// re-bound immediately.
    pub async fn stop(self) {
        self.running.store(false, Ordering::Relaxed);

        self.accept_task.abort();
        let _ = self.accept_task.await;

        let mut peers = self.peers.write().await;
        for (peer_id, handle) in peers.drain() {
            handle.task.abort();
            let _ = handle.task.await;
            debug!("peer {peer_id}: connection closed by transport shutdown");
        }

        info!("sync transport stopped");
    }
}

// ── Accept loop ───────────────────────────────────────────────────────────────

/// Accepts connections until the running flag clears.
///
/// Uses a short timeout on `accept()` so the loop can periodically check
/// the flag even when no handsets are connecting.
async fn accept_loop(
    listener: TcpListener,
    running: Arc<AtomicBool>,
    peers: Peers,
    envelope_tx: mpsc::Sender<Envelope>,
) {
    loop {
        if !running.load(Ordering::Relaxed) {
            info!("shutdown flag set; stopping accept loop");
            break;
        }

        match timeout(ACCEPT_POLL_INTERVAL, listener.accept()).await {
            Ok(Ok((stream, peer_addr))) => {
                let peer_id = Uuid::new_v4();
                info!("new peer connection from {peer_addr} (peer {peer_id})");

                let (outbound_tx, outbound_rx) = mpsc::channel(OUTBOUND_QUEUE_DEPTH);
                let task = tokio::spawn(handle_peer_session(
                    stream,
                    peer_addr,
                    peer_id,
                    outbound_rx,
                    envelope_tx.clone(),
                    Arc::clone(&peers),
                ));

                peers.write().await.insert(
                    peer_id,
                    PeerHandle {
                        outbound: outbound_tx,
                        task,
                    },
                );
            }
            Ok(Err(e)) => {
                // Transient accept error (e.g. out of file descriptors).
                // Log it and continue rather than taking the transport down.
                error!("accept error: {e}");
            }
            Err(_) => {
                // Timeout: no new connection; loop back to check the flag.
            }
        }
    }
}

// ── Per-peer session ──────────────────────────────────────────────────────────

/// Runs the complete lifecycle of a single peer session.
///
/// Completes the WebSocket handshake, then services the connection until
/// either side closes it: inbound text frames are decoded and forwarded to
/// the engine, outbound frames from the broadcast queue are written to the
/// socket.  On exit the peer removes itself from the connected set.
async fn handle_peer_session(
    raw_stream: TcpStream,
    peer_addr: SocketAddr,
    peer_id: Uuid,
    mut outbound_rx: mpsc::Receiver<String>,
    envelope_tx: mpsc::Sender<Envelope>,
    peers: Peers,
) {
    // `accept_async` reads the HTTP Upgrade request and sends the
    // "101 Switching Protocols" response; afterwards the stream speaks
    // WebSocket frames.
    let mut ws_stream = match accept_async(raw_stream).await {
        Ok(ws) => ws,
        Err(e) => {
            warn!("peer {peer_id}: WebSocket handshake failed with {peer_addr}: {e}");
            peers.write().await.remove(&peer_id);
            return;
        }
    };

    info!("peer {peer_id}: session established with {peer_addr}");

    loop {
        tokio::select! {
            frame = ws_stream.next() => {
                match frame {
                    Some(Ok(WsMessage::Text(raw))) => {
                        match decode_frame(&raw) {
                            Ok(envelope) => {
                                debug!("peer {peer_id}: received '{}' envelope", envelope.kind());
                                // Receiver gone means the engine stopped;
                                // nothing left to deliver to.
                                if envelope_tx.send(envelope).await.is_err() {
                                    break;
                                }
                            }
                            Err(e) => {
                                // Malformed frame: discard, keep the
                                // connection open, send nothing back.
                                debug!("peer {peer_id}: discarding frame: {e}");
                            }
                        }
                    }
                    Some(Ok(WsMessage::Binary(_))) => {
                        // The sync protocol is text-only.
                        warn!("peer {peer_id}: unexpected binary frame (ignored)");
                    }
                    Some(Ok(WsMessage::Ping(_) | WsMessage::Pong(_))) => {
                        // Protocol-level keepalive; tungstenite replies to
                        // pings automatically on the next write.
                    }
                    Some(Ok(WsMessage::Close(_))) => {
                        debug!("peer {peer_id}: Close frame received");
                        break;
                    }
                    Some(Ok(WsMessage::Frame(_))) => {
                        debug!("peer {peer_id}: raw frame (ignored)");
                    }
                    Some(Err(WsError::ConnectionClosed | WsError::Protocol(_))) => {
                        debug!("peer {peer_id}: connection closed");
                        break;
                    }
                    Some(Err(e)) => {
                        // Observed and logged; the session ends only because
                        // the underlying stream is no longer usable.
                        warn!("peer {peer_id}: transport error: {e}");
                        break;
                    }
                    None => {
                        debug!("peer {peer_id}: stream ended");
                        break;
                    }
                }
            }
            outbound = outbound_rx.recv() => {
                match outbound {
                    Some(text) => {
                        if let Err(e) = ws_stream.send(WsMessage::Text(text)).await {
                            debug!("peer {peer_id}: send failed ({e}); closing session");
                            break;
                        }
                    }
                    // Queue sender dropped: transport is shutting down.
                    None => break,
                }
            }
        }
    }

    peers.write().await.remove(&peer_id);
    info!("peer {peer_id}: closed connection to {peer_addr}");
}

// ── Tests ─────────────────────────────────────────────────────────────────────
