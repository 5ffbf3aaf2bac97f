//! PhoneLink tablet — entry point.
//!
//! This binary runs the tablet-side pairing and synchronization engine: a
//! WebSocket server the handset connects to over the LAN, plus the QR
//! pairing image that tells the handset where to connect.
//!
//! # Usage
//!
//! ```text
//! phonelink-tablet [OPTIONS]
//!
//! Options:
//!   --port <PORT>      Sync listener port [default: 8080]
//!   --bind <ADDR>      Bind address [default: 0.0.0.0]
//!   --qr-size <PX>     Pairing image edge length in pixels [default: 512]
//!   --qr-out <PATH>    Write the pairing image to this PNG file
//! ```
//!
//! # Environment variable overrides
//!
//! CLI args take precedence when both are present.
//!
//! | Variable            | Default   | Description                     |
//! |---------------------|-----------|---------------------------------|
//! | `PHONELINK_PORT`    | `8080`    | Sync listener port              |
//! | `PHONELINK_BIND`    | `0.0.0.0` | Bind address                    |
//! | `PHONELINK_QR_SIZE` | `512`     | Pairing image size (pixels)     |
//!
//! Without a graphical shell this process is headless: it logs every state
//! change the UI would render, and `--qr-out` saves the pairing image so it
//! can be displayed (or scanned straight off another screen).

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use phonelink_tablet::application::StateSignals;
use phonelink_tablet::domain::ServerConfig;
use phonelink_tablet::SyncEngine;

// ── CLI argument definitions ──────────────────────────────────────────────────

/// PhoneLink tablet-side sync server.
///
/// Accepts WebSocket connections from the paired handset and mirrors its
/// live state (notifications, battery, messages) into memory.
#[derive(Debug, Parser)]
#[command(
    name = "phonelink-tablet",
    about = "Tablet-side pairing and synchronization engine for PhoneLink",
    version
)]
struct Cli {
    /// TCP port for the sync server to listen on.
    ///
    /// The pairing QR encodes only the IP address; the handset appends
    /// this well-known port itself.
    #[arg(long, default_value_t = 8080, env = "PHONELINK_PORT")]
    port: u16,

    /// IP address to bind the sync server to.
    ///
    /// Use `0.0.0.0` to accept connections from any network interface
    /// (required for LAN pairing), or `127.0.0.1` for local-only testing.
    #[arg(long, default_value = "0.0.0.0", env = "PHONELINK_BIND")]
    bind: String,

    /// Edge length of the square pairing image, in pixels.
    #[arg(long, default_value_t = 512, env = "PHONELINK_QR_SIZE")]
    qr_size: u32,

    /// Optional path to write the pairing image as a PNG file.
    #[arg(long)]
    qr_out: Option<PathBuf>,
}

impl Cli {
    /// Converts the parsed CLI arguments into a [`ServerConfig`].
    ///
    /// # Errors
    ///
    /// Returns an error if `--bind` is not a valid IP address.
    fn into_server_config(self) -> anyhow::Result<ServerConfig> {
        let bind_address: IpAddr = self
            .bind
            .parse()
            .with_context(|| format!("invalid bind address: '{}'", self.bind))?;

        Ok(ServerConfig {
            bind_address,
            port: self.port,
            pairing_code_size: self.qr_size,
        })
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Log level comes from RUST_LOG, defaulting to `info`.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let qr_out = cli.qr_out.clone();
    let config = cli.into_server_config()?;
    let listen_addr: SocketAddr = config.listen_addr();

    info!("PhoneLink tablet starting — listening on {listen_addr}");

    let mut engine = SyncEngine::new(config);
    let mut signals = engine.subscribe();

    engine
        .start()
        .await
        .with_context(|| format!("failed to start sync server on {listen_addr}"))?;

    // `start` already published the first pairing image; surface it now so
    // the user has something to scan before any state change arrives.
    publish_pairing_image(&mut signals, qr_out.as_deref());

    // Mirror the UI collaborator: render every published signal change as a
    // log line until Ctrl+C.
    loop {
        tokio::select! {
            signal = tokio::signal::ctrl_c() => {
                match signal {
                    Ok(()) => info!("received Ctrl+C — initiating graceful shutdown"),
                    Err(e) => warn!("failed to listen for Ctrl+C signal: {e}"),
                }
                break;
            }
            changed = signals.device_state.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = signals.device_state.borrow_and_update().clone();
                info!(
                    connected = state.connected,
                    battery = state.battery_level,
                    signal = %state.network_signal,
                    notifications = state.notifications.len(),
                    messages = state.messages.len(),
                    "device state updated"
                );
            }
            changed = signals.pairing_image.changed() => {
                if changed.is_err() {
                    break;
                }
                publish_pairing_image(&mut signals, qr_out.as_deref());
            }
            changed = signals.last_error.changed() => {
                if changed.is_err() {
                    break;
                }
                if let Some(message) = signals.last_error.borrow_and_update().clone() {
                    warn!("sync error: {message}");
                }
            }
        }
    }

    engine.stop().await;
    info!("PhoneLink tablet stopped");
    Ok(())
}

/// Logs the current pairing image and writes it to `qr_out` when set.
fn publish_pairing_image(signals: &mut StateSignals, qr_out: Option<&std::path::Path>) {
    let image = signals.pairing_image.borrow_and_update().clone();
    let Some(image) = image else {
        return;
    };

    let (width, height) = image.dimensions();
    info!("pairing image updated ({width}x{height})");

    if let Some(path) = qr_out {
        match image.save(path) {
            Ok(()) => info!("pairing image written to {}", path.display()),
            Err(e) => warn!("failed to write pairing image to {}: {e}", path.display()),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
