//! Application layer: envelope dispatch and state publication.

pub mod sync_engine;

pub use sync_engine::{StateSignals, SyncEngine};
