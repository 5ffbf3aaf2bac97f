//! Infrastructure layer: WebSocket transport, address resolution, and the
//! pairing code rasterizer.

pub mod address;
pub mod qr;
pub mod ws_server;

pub use ws_server::{SyncTransport, TransportError};
