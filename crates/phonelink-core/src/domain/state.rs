//! Mirrored device-state model.
//!
//! [`DeviceState`] is the tablet's in-memory snapshot of the remote handset:
//! link status, battery, network signal label, and the notification and
//! message feeds.  One instance exists per running sync engine; it is created
//! with default values at engine start, mutated only by the engine's dispatch
//! loop, and discarded on shutdown.  There is no durability; a restart
//! begins from an empty snapshot.
//!
//! The notification feed is ordered newest-first and grows without bound for
//! the lifetime of the process; entries are never removed or mutated once
//! inserted.  Notification identity (for list diffing on the consumer side)
//! is the `timestamp` string only.

use serde::{Deserialize, Serialize};

/// Default label shown before the handset has reported any signal reading.
pub const UNKNOWN_SIGNAL: &str = "Unknown";

/// A single notification mirrored from the handset.
///
/// Missing string fields on the wire decode to empty strings; a missing
/// `packageName` stays `None`.  Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    /// Notification title (may be empty).
    pub title: String,
    /// Notification body text (may be empty).
    pub body: String,
    /// Originating app package, when the handset reported one.
    pub package_name: Option<String>,
    /// Handset-side timestamp string.  Doubles as the identity key for
    /// list diffing; two notifications sharing a timestamp are
    /// indistinguishable to consumers.
    pub timestamp: String,
}

/// A text message mirrored from the handset.
///
/// Declared for the `sms_sync` path; the current dispatch rule for that
/// envelope accepts but does not yet apply message data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Sender or recipient address.
    pub address: String,
    /// Message body.
    pub body: String,
    /// Handset-side date string.
    pub date: String,
}

/// A call-log entry mirrored from the handset.
///
/// Declared shape for a future sync path; nothing populates it yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallLog {
    /// Remote phone number.
    pub number: String,
    /// Call direction/kind label as reported by the handset
    /// (e.g. `"incoming"`, `"outgoing"`, `"missed"`).
    pub kind: String,
    /// Handset-side date string.
    pub date: String,
    /// Call duration in seconds.
    pub duration: u64,
}

/// The mirrored snapshot of the remote handset's status and feeds.
///
/// All mutation goes through the sync engine's dispatch loop, which holds
/// exclusive access while applying an envelope; readers observe complete
/// snapshots, never a half-applied update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceState {
    /// `true` once any envelope has been dispatched.  Never reverts to
    /// `false` while the engine runs, even after every peer disconnects;
    /// the flag latches for the lifetime of the engine.
    pub connected: bool,
    /// Battery percentage, 0–100.  The producing side clamps the range;
    /// the engine stores what it receives.
    pub battery_level: u8,
    /// Human-readable signal label.  Stays at [`UNKNOWN_SIGNAL`] until a
    /// dispatch rule updates it; no current envelope kind does.
    pub network_signal: String,
    /// Notification feed, newest first.  Unbounded.
    pub notifications: Vec<Notification>,
    /// Message feed.  Stays empty until the `sms_sync` rule is implemented.
    pub messages: Vec<Message>,
}

impl Default for DeviceState {
    fn default() -> Self {
        Self {
            connected: false,
            battery_level: 0,
            network_signal: UNKNOWN_SIGNAL.to_string(),
            notifications: Vec::new(),
            messages: Vec::new(),
        }
    }
}

impl DeviceState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Prepends a notification to the feed (newest-first ordering).
    pub fn push_notification(&mut self, notification: Notification) {
        self.notifications.insert(0, notification);
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn make_notification(timestamp: &str) -> Notification {
        Notification {
            title: "title".to_string(),
            body: "body".to_string(),
            package_name: None,
            timestamp: timestamp.to_string(),
        }
    }

    #[test]
    fn test_default_state_is_disconnected_with_empty_feeds() {
        let state = DeviceState::new();
        assert!(!state.connected);
        assert_eq!(state.battery_level, 0);
        assert_eq!(state.network_signal, UNKNOWN_SIGNAL);
        assert!(state.notifications.is_empty());
        assert!(state.messages.is_empty());
    }

    #[test]
    fn test_push_notification_prepends() {
        // Arrange
        let mut state = DeviceState::new();

        // Act: insert two notifications in arrival order
        state.push_notification(make_notification("t1"));
        state.push_notification(make_notification("t2"));

        // Assert: the most recent insertion comes first
        assert_eq!(state.notifications[0].timestamp, "t2");
        assert_eq!(state.notifications[1].timestamp, "t1");
    }

    #[test]
    fn test_push_notification_preserves_prior_entries() {
        let mut state = DeviceState::new();
        for i in 0..5 {
            state.push_notification(make_notification(&format!("t{i}")));
        }
        assert_eq!(state.notifications.len(), 5);
        // Prior entries keep their relative order behind the newest one.
        let stamps: Vec<&str> = state
            .notifications
            .iter()
            .map(|n| n.timestamp.as_str())
            .collect();
        assert_eq!(stamps, vec!["t4", "t3", "t2", "t1", "t0"]);
    }

    #[test]
    fn test_device_state_round_trips_through_json() {
        let mut state = DeviceState::new();
        state.connected = true;
        state.battery_level = 87;
        state.push_notification(make_notification("t1"));

        let json = serde_json::to_string(&state).unwrap();
        let decoded: DeviceState = serde_json::from_str(&json).unwrap();
        assert_eq!(state, decoded);
    }
}
