//! Typed envelope representation of the sync protocol.
//!
//! On the wire every message is a JSON object with a string `type` selecting
//! the dispatch branch and an opaque `data` object interpreted per type:
//!
//! ```json
//! {"type":"notification","data":{"title":"Hi","body":"Test","timestamp":"t1"}}
//! {"type":"device_info","data":{"battery":{"level":42}}}
//! ```
//!
//! Rather than passing an untyped map through the system, decoding happens
//! once, here, and produces an [`Envelope`] variant with all field defaulting
//! already resolved.  The protocol is deliberately permissive: within a
//! recognized envelope, a missing or mistyped field degrades to a default
//! value instead of rejecting the whole frame; partial data is preferred
//! over dropped data.

use serde_json::{Map, Value};
use tracing::trace;

use crate::domain::state::Notification;

/// Recognized envelope kind strings.
pub const KIND_NOTIFICATION: &str = "notification";
pub const KIND_DEVICE_INFO: &str = "device_info";
pub const KIND_SMS_SYNC: &str = "sms_sync";

/// Decoded payload of a `device_info` envelope.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DeviceInfoUpdate {
    /// New battery percentage, or `None` when the frame carried no
    /// `battery` object.  A `battery` object with a missing or mistyped
    /// `level` decodes to `Some(0)`.
    pub battery_level: Option<u8>,
}

/// One decoded sync frame, ready for dispatch.
///
/// Dispatching any variant marks the link active; only the first three carry
/// an update rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Envelope {
    /// A `notification` frame with a usable `data` object.
    Notification(Notification),
    /// A `device_info` frame.
    DeviceInfo(DeviceInfoUpdate),
    /// An `sms_sync` frame.  The payload is accepted but not yet applied;
    /// this variant reserves the dispatch branch for message-list updates.
    SmsSync,
    /// A frame with an unrecognized `type`, a missing `type`, or a
    /// recognized `type` whose `data` payload was absent or not an object.
    /// Dispatching one only marks the link active.
    Unhandled {
        /// The `type` value carried by the frame (empty when absent).
        kind: String,
    },
}

impl Envelope {
    /// Builds an envelope from a decoded top-level JSON object.
    ///
    /// The caller (the frame codec) guarantees `object` is the top-level
    /// mapping; anything else was already discarded.  This function cannot
    /// fail: unusable shapes degrade to [`Envelope::Unhandled`].
    pub fn from_object(object: &Map<String, Value>) -> Envelope {
        let kind = object.get("type").and_then(Value::as_str).unwrap_or("");
        let data = object.get("data").and_then(Value::as_object);

        match (kind, data) {
            (KIND_NOTIFICATION, Some(data)) => {
                Envelope::Notification(decode_notification(data))
            }
            (KIND_DEVICE_INFO, Some(data)) => Envelope::DeviceInfo(decode_device_info(data)),
            (KIND_SMS_SYNC, Some(_)) => Envelope::SmsSync,
            _ => {
                trace!("no decoder for envelope kind {kind:?}");
                Envelope::Unhandled {
                    kind: kind.to_string(),
                }
            }
        }
    }

    /// Returns the kind string this envelope was dispatched under.
    pub fn kind(&self) -> &str {
        match self {
            Envelope::Notification(_) => KIND_NOTIFICATION,
            Envelope::DeviceInfo(_) => KIND_DEVICE_INFO,
            Envelope::SmsSync => KIND_SMS_SYNC,
            Envelope::Unhandled { kind } => kind,
        }
    }
}

/// Decodes a `notification` payload, defaulting missing string fields to
/// empty strings and keeping a missing `packageName` absent.
fn decode_notification(data: &Map<String, Value>) -> Notification {
    Notification {
        title: string_field(data, "title"),
        body: string_field(data, "body"),
        package_name: data
            .get("packageName")
            .and_then(Value::as_str)
            .map(str::to_owned),
        timestamp: string_field(data, "timestamp"),
    }
}

/// Decodes a `device_info` payload.
///
/// The battery level is only read when a `battery` object is present; a
/// present object with a missing or mistyped `level` yields level 0.
fn decode_device_info(data: &Map<String, Value>) -> DeviceInfoUpdate {
    let battery_level = data.get("battery").and_then(Value::as_object).map(|b| {
        b.get("level")
            .and_then(Value::as_u64)
            .and_then(|level| u8::try_from(level).ok())
            .unwrap_or(0)
    });
    DeviceInfoUpdate { battery_level }
}

/// Reads a string field, substituting an empty string when absent or mistyped.
fn string_field(data: &Map<String, Value>, key: &str) -> String {
    data.get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_owned()
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn object_from(json: &str) -> Map<String, Value> {
        serde_json::from_str::<Value>(json)
            .unwrap()
            .as_object()
            .unwrap()
            .clone()
    }

    #[test]
    fn test_notification_decodes_all_fields() {
        let obj = object_from(
            r#"{"type":"notification","data":{"title":"Hi","body":"Test","packageName":"com.example.mail","timestamp":"t1"}}"#,
        );
        let envelope = Envelope::from_object(&obj);
        assert_eq!(
            envelope,
            Envelope::Notification(Notification {
                title: "Hi".to_string(),
                body: "Test".to_string(),
                package_name: Some("com.example.mail".to_string()),
                timestamp: "t1".to_string(),
            })
        );
    }

    #[test]
    fn test_notification_missing_fields_default_to_empty() {
        // Arrange: only the title is present
        let obj = object_from(r#"{"type":"notification","data":{"title":"Bye"}}"#);

        // Act
        let envelope = Envelope::from_object(&obj);

        // Assert: body and timestamp default to "", packageName stays absent
        match envelope {
            Envelope::Notification(n) => {
                assert_eq!(n.title, "Bye");
                assert_eq!(n.body, "");
                assert_eq!(n.package_name, None);
                assert_eq!(n.timestamp, "");
            }
            other => panic!("expected Notification, got {other:?}"),
        }
    }

    #[test]
    fn test_notification_mistyped_field_defaults_to_empty() {
        // `title` is a number; the frame is still accepted with "" substituted.
        let obj = object_from(r#"{"type":"notification","data":{"title":7,"timestamp":"t1"}}"#);
        match Envelope::from_object(&obj) {
            Envelope::Notification(n) => {
                assert_eq!(n.title, "");
                assert_eq!(n.timestamp, "t1");
            }
            other => panic!("expected Notification, got {other:?}"),
        }
    }

    #[test]
    fn test_notification_without_data_is_unhandled() {
        let obj = object_from(r#"{"type":"notification"}"#);
        assert_eq!(
            Envelope::from_object(&obj),
            Envelope::Unhandled {
                kind: "notification".to_string()
            }
        );
    }

    #[test]
    fn test_notification_with_non_object_data_is_unhandled() {
        let obj = object_from(r#"{"type":"notification","data":[1,2,3]}"#);
        assert!(matches!(
            Envelope::from_object(&obj),
            Envelope::Unhandled { .. }
        ));
    }

    #[test]
    fn test_device_info_battery_level_is_read() {
        let obj = object_from(r#"{"type":"device_info","data":{"battery":{"level":42}}}"#);
        assert_eq!(
            Envelope::from_object(&obj),
            Envelope::DeviceInfo(DeviceInfoUpdate {
                battery_level: Some(42)
            })
        );
    }

    #[test]
    fn test_device_info_without_battery_is_noop_update() {
        let obj = object_from(r#"{"type":"device_info","data":{"uptime":120}}"#);
        assert_eq!(
            Envelope::from_object(&obj),
            Envelope::DeviceInfo(DeviceInfoUpdate {
                battery_level: None
            })
        );
    }

    #[test]
    fn test_device_info_mistyped_level_defaults_to_zero() {
        let obj = object_from(r#"{"type":"device_info","data":{"battery":{"level":"full"}}}"#);
        assert_eq!(
            Envelope::from_object(&obj),
            Envelope::DeviceInfo(DeviceInfoUpdate {
                battery_level: Some(0)
            })
        );
    }

    #[test]
    fn test_device_info_out_of_range_level_defaults_to_zero() {
        let obj = object_from(r#"{"type":"device_info","data":{"battery":{"level":300}}}"#);
        assert_eq!(
            Envelope::from_object(&obj),
            Envelope::DeviceInfo(DeviceInfoUpdate {
                battery_level: Some(0)
            })
        );
    }

    #[test]
    fn test_sms_sync_with_data_is_accepted() {
        let obj = object_from(r#"{"type":"sms_sync","data":{"messages":[]}}"#);
        assert_eq!(Envelope::from_object(&obj), Envelope::SmsSync);
    }

    #[test]
    fn test_unknown_kind_is_unhandled() {
        let obj = object_from(r#"{"type":"call_log","data":{}}"#);
        assert_eq!(
            Envelope::from_object(&obj),
            Envelope::Unhandled {
                kind: "call_log".to_string()
            }
        );
    }

    #[test]
    fn test_missing_type_is_unhandled_with_empty_kind() {
        let obj = object_from(r#"{"data":{"title":"Hi"}}"#);
        assert_eq!(
            Envelope::from_object(&obj),
            Envelope::Unhandled {
                kind: String::new()
            }
        );
    }

    #[test]
    fn test_kind_reports_dispatch_branch() {
        let obj = object_from(r#"{"type":"device_info","data":{}}"#);
        assert_eq!(Envelope::from_object(&obj).kind(), "device_info");
    }
}
