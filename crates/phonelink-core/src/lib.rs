//! # phonelink-core
//!
//! Shared library for PhoneLink containing the sync wire protocol and the
//! mirrored device-state model.
//!
//! PhoneLink mirrors the live state of a handheld device (notifications,
//! battery, network signal, text messages) onto a companion tablet over the
//! local network.  The handset connects to a WebSocket server on the tablet
//! and streams JSON envelopes; the tablet applies each envelope to an
//! in-memory [`DeviceState`] that the UI renders.
//!
//! This crate is the shared foundation.  It defines:
//!
//! - **`protocol`** – The wire format.  Every inbound frame is a UTF-8 JSON
//!   object `{"type": <string>, "data": <object>}`; [`decode_frame`] turns a
//!   raw text frame into a typed [`Envelope`] with all field defaulting
//!   resolved up front.
//!
//! - **`domain`** – Pure entities with no I/O dependencies: [`DeviceState`]
//!   and the feed item types ([`Notification`], [`Message`], [`CallLog`]).
//!
//! This crate has zero dependencies on sockets, async runtimes, or UI
//! frameworks; everything in it can be unit-tested in isolation.

pub mod domain;
pub mod protocol;

// Re-export the most-used types at the crate root so callers can write
// `phonelink_core::Envelope` instead of `phonelink_core::protocol::envelope::Envelope`.
pub use domain::state::{CallLog, DeviceState, Message, Notification};
pub use protocol::codec::{decode_frame, DecodeError};
pub use protocol::envelope::{DeviceInfoUpdate, Envelope};
