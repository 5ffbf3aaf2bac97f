//! SyncEngine: owns the mirrored device state and drives the dispatch loop.
//!
//! The engine wires the pieces together:
//!
//! ```text
//! SyncTransport ──(mpsc: Envelope)──► dispatch task ──► DeviceState
//!                                                         │
//!                                          (watch channels: snapshots)
//!                                                         ▼
//!                                                   UI subscribers
//! ```
//!
//! A single dispatch task drains the envelope channel and applies each
//! envelope under the state write lock, so mutations are serialized no
//! matter how many peer connections feed the channel.  After every applied
//! envelope a full snapshot is published on a `watch` channel; subscribers
//! always observe a consistent state, never a half-applied update.
//!
//! The pairing flow also lives here: `request_pairing_image` resolves the
//! tablet's LAN address (falling back to the `0.0.0.0` sentinel), renders
//! it as a QR bitmap, and publishes the image for the UI to display.

use std::net::SocketAddr;
use std::sync::Arc;

use image::GrayImage;
use tokio::sync::{mpsc, watch, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use phonelink_core::{DeviceState, Envelope};

use crate::domain::config::ServerConfig;
use crate::infrastructure::address::{resolve_local_ipv4, FALLBACK_ADDRESS};
use crate::infrastructure::qr::render_pairing_code;
use crate::infrastructure::ws_server::{SyncTransport, TransportError};

/// Bound of the transport → engine envelope channel.
const ENVELOPE_QUEUE_DEPTH: usize = 256;

/// The observable signal set handed to the UI collaborator.
///
/// The engine publishes; it never reads anything back from the UI.
pub struct StateSignals {
    /// Full mirrored snapshot: link status, battery, signal label, feeds.
    pub device_state: watch::Receiver<DeviceState>,
    /// The current pairing bitmap, absent until first rendered.
    pub pairing_image: watch::Receiver<Option<GrayImage>>,
    /// The single latest recoverable error message, absent until one occurs.
    pub last_error: watch::Receiver<Option<String>>,
}

/// The pairing and synchronization engine.
///
/// Owns the [`DeviceState`], the transport, and the dispatch task.  One
/// instance exists per running app; the mirrored state lives exactly as
/// long as the engine and is never persisted.
pub struct SyncEngine {
    config: ServerConfig,
    state: Arc<RwLock<DeviceState>>,
    state_tx: Arc<watch::Sender<DeviceState>>,
    image_tx: watch::Sender<Option<GrayImage>>,
    error_tx: watch::Sender<Option<String>>,
    transport: Option<SyncTransport>,
    dispatch_task: Option<JoinHandle<()>>,
}

impl SyncEngine {
    /// Creates a stopped engine with default zero-valued state.
    pub fn new(config: ServerConfig) -> Self {
        let (state_tx, _) = watch::channel(DeviceState::new());
        let (image_tx, _) = watch::channel(None);
        let (error_tx, _) = watch::channel(None);

        Self {
            config,
            state: Arc::new(RwLock::new(DeviceState::new())),
            state_tx: Arc::new(state_tx),
            image_tx,
            error_tx,
            transport: None,
            dispatch_task: None,
        }
    }

    /// Returns a fresh set of UI signal receivers.
    pub fn subscribe(&self) -> StateSignals {
        StateSignals {
            device_state: self.state_tx.subscribe(),
            pairing_image: self.image_tx.subscribe(),
            last_error: self.error_tx.subscribe(),
        }
    }

    /// Binds the transport, starts the dispatch loop, and publishes the
    /// pairing image.
    ///
    /// Calling `start` on an already started engine is a logged no-op;
    /// callers must `stop` before restarting.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] when the listener cannot be bound.  The
    /// failure is also recorded on the `last_error` signal and the engine
    /// remains stopped.
    pub async fn start(&mut self) -> Result<(), TransportError> {
        if self.transport.is_some() {
            warn!("sync engine already started; ignoring start()");
            return Ok(());
        }

        let (envelope_tx, mut envelope_rx) = mpsc::channel(ENVELOPE_QUEUE_DEPTH);

        let transport = match SyncTransport::start(self.config.listen_addr(), envelope_tx).await {
            Ok(transport) => transport,
            Err(e) => {
                self.report_error(format!("failed to start sync server: {e}"));
                return Err(e);
            }
        };

        let state = Arc::clone(&self.state);
        let state_tx = Arc::clone(&self.state_tx);
        let dispatch_task = tokio::spawn(async move {
            while let Some(envelope) = envelope_rx.recv().await {
                let mut guard = state.write().await;
                apply_envelope(&mut guard, envelope);
                // Publish a complete snapshot while still holding the lock,
                // so subscribers can never observe reordered updates.
                state_tx.send_replace(guard.clone());
            }
            debug!("dispatch loop drained; all transport senders gone");
        });

        info!("sync engine started on {}", transport.local_addr());
        self.transport = Some(transport);
        self.dispatch_task = Some(dispatch_task);

        // Publish the pairing image now that the server is reachable.
        self.request_pairing_image(None);

        Ok(())
    }

    /// Stops the transport and drains the dispatch loop.
    ///
    /// Safe to call on a never-started or already-stopped engine.  Any
    /// envelope already in the queue is fully applied before this returns;
    /// none is left half-applied.
    pub async fn stop(&mut self) {
        if let Some(transport) = self.transport.take() {
            transport.stop().await;
        }
        // With the transport gone every envelope sender is dropped, so the
        // dispatch task finishes once the queue is empty.
        if let Some(task) = self.dispatch_task.take() {
            let _ = task.await;
        }
        info!("sync engine stopped");
    }

    /// Renders and publishes the pairing image.
    ///
    /// When `address` is absent the tablet's own LAN address is resolved; a
    /// resolution failure is recorded on `last_error` and the sentinel
    /// address is encoded instead.  A rendering failure is recorded and no
    /// image is published.
    pub fn request_pairing_image(&self, address: Option<&str>) {
        let address = match address {
            Some(address) => address.to_owned(),
            None => match resolve_local_ipv4() {
                Ok(address) => address,
                Err(e) => {
                    self.report_error(format!("failed to resolve pairing address: {e}"));
                    FALLBACK_ADDRESS.to_owned()
                }
            },
        };

        match render_pairing_code(&address, self.config.pairing_code_size) {
            Ok(image) => {
                info!("pairing image ready for {address}");
                self.image_tx.send_replace(Some(image));
            }
            Err(e) => {
                self.report_error(format!("failed to render pairing code: {e}"));
            }
        }
    }

    /// Returns a consistent snapshot of the mirrored state.
    pub async fn current_state(&self) -> DeviceState {
        self.state.read().await.clone()
    }

    /// The bound listener address while started (resolves port 0 in tests).
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.transport.as_ref().map(SyncTransport::local_addr)
    }

    /// Number of peers currently connected to the transport.
    pub async fn connected_peers(&self) -> usize {
        match &self.transport {
            Some(transport) => transport.connected_peers().await,
            None => 0,
        }
    }

    /// Records a recoverable failure as the single latest error value.
    fn report_error(&self, message: String) {
        warn!("{message}");
        self.error_tx.send_replace(Some(message));
    }
}

// ── Dispatch rules ────────────────────────────────────────────────────────────

/// Applies one envelope to the mirrored state.
///
/// Update rules per kind:
///
/// | kind           | effect                                                |
/// |----------------|-------------------------------------------------------|
/// | `notification` | prepend the notification to the feed                  |
/// | `device_info`  | set `battery_level` when a battery reading is present |
/// | `sms_sync`     | accepted; message-list updates not applied yet        |
/// | anything else  | no-op                                                 |
///
/// Every dispatched envelope marks the link active, whatever its kind;
/// `connected` never reverts while the engine runs.
fn apply_envelope(state: &mut DeviceState, envelope: Envelope) {
    match envelope {
        Envelope::Notification(notification) => {
            debug!(
                "notification received: '{}' at {}",
                notification.title, notification.timestamp
            );
            state.push_notification(notification);
        }
        Envelope::DeviceInfo(update) => {
            if let Some(level) = update.battery_level {
                state.battery_level = level;
            }
        }
        Envelope::SmsSync => {
            // TODO: apply synced messages to `state.messages` once the
            // handset side finalizes the sms_sync payload shape.
        }
        Envelope::Unhandled { kind } => {
            debug!("no update rule for envelope kind {kind:?}");
        }
    }

    state.connected = true;
}

// ── Tests ─────────────────────────────────────────────────────────────────────
