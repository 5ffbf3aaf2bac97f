//! phonelink-tablet library crate.
//!
//! This crate provides the tablet-side pairing and synchronization engine
//! for PhoneLink: it accepts WebSocket connections from the handset,
//! decodes JSON sync envelopes, and maintains the mirrored device state the
//! UI renders.
//!
//! # Architecture (clean architecture)
//!
//! ```text
//! Handset (JSON over WebSocket)
//!         ↕
//! [phonelink-tablet]
//!   ├── domain/           Pure types: ServerConfig
//!   ├── application/      SyncEngine: envelope dispatch, state publication
//!   └── infrastructure/
//!         ├── ws_server/  WebSocket accept loop + peer set (tokio-tungstenite)
//!         ├── address/    Local IPv4 resolution (if-addrs)
//!         └── qr/         Pairing code rasterization (qrcode + image)
//!         ↕
//! UI consumer (watch-channel subscribers, out of scope here)
//! ```
//!
//! # Layer rules
//!
//! - `domain` has no external dependencies (no I/O, no async, no frameworks).
//! - `application` depends on `domain` and `phonelink-core`, plus the
//!   infrastructure seams it drives.
//! - `infrastructure` depends on `tokio`, `tungstenite`, and the pairing
//!   crates; nothing above it reaches the network directly.

/// Domain layer: pure configuration types (no I/O).
pub mod domain;

/// Application layer: the synchronization engine.
pub mod application;

/// Infrastructure layer: WebSocket transport, address resolution, QR rasterizer.
pub mod infrastructure;

// Re-export the main entry points at the crate root.
pub use application::sync_engine::{StateSignals, SyncEngine};
pub use domain::config::ServerConfig;
pub use infrastructure::ws_server::{SyncTransport, TransportError};
