//! Protocol module containing the envelope types and the frame codec.

pub mod codec;
pub mod envelope;

pub use codec::{decode_frame, DecodeError};
pub use envelope::{DeviceInfoUpdate, Envelope};
