//! Frame codec: raw text frames in, typed envelopes out.
//!
//! Wire format: every frame is a UTF-8 JSON **object**.  Anything else
//! (invalid JSON, or a top-level array/string/number) is a decode failure
//! the transport logs and discards without closing the connection (the
//! protocol is fire-and-forget; no error frame is sent back).  Shape
//! problems *inside* a valid object never fail here: they degrade to
//! defaults during [`Envelope`] construction.

use thiserror::Error;

use crate::protocol::envelope::Envelope;

/// Errors that can occur while decoding a raw text frame.
///
/// Both variants are recoverable at the transport layer: the frame is
/// dropped and the peer connection stays open.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The frame was not valid JSON.
    #[error("frame is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    /// The frame parsed, but the top-level value was not an object.
    #[error("top-level JSON value is not an object")]
    NotAnObject,
}

/// Decodes one raw text frame into a typed [`Envelope`].
///
/// # Errors
///
/// Returns [`DecodeError`] when `raw` is not valid JSON or its top-level
/// value is not an object.  A well-formed object always decodes; unusable
/// shapes inside it degrade to [`Envelope::Unhandled`].
///
/// # Examples
///
/// ```rust
/// use phonelink_core::decode_frame;
///
/// let envelope = decode_frame(r#"{"type":"device_info","data":{"battery":{"level":42}}}"#).unwrap();
/// assert_eq!(envelope.kind(), "device_info");
///
/// assert!(decode_frame("not-json").is_err());
/// ```
pub fn decode_frame(raw: &str) -> Result<Envelope, DecodeError> {
    let value: serde_json::Value = serde_json::from_str(raw)?;
    let object = value.as_object().ok_or(DecodeError::NotAnObject)?;
    Ok(Envelope::from_object(object))
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_frame_accepts_notification_envelope() {
        let envelope = decode_frame(
            r#"{"type":"notification","data":{"title":"Hi","body":"Test","timestamp":"t1"}}"#,
        )
        .unwrap();
        assert!(matches!(envelope, Envelope::Notification(_)));
    }

    #[test]
    fn test_decode_frame_rejects_invalid_json() {
        let result = decode_frame("not-json");
        assert!(matches!(result, Err(DecodeError::InvalidJson(_))));
    }

    #[test]
    fn test_decode_frame_rejects_truncated_json() {
        let result = decode_frame(r#"{"type":"notification","#);
        assert!(matches!(result, Err(DecodeError::InvalidJson(_))));
    }

    #[test]
    fn test_decode_frame_rejects_top_level_array() {
        let result = decode_frame(r#"[{"type":"notification"}]"#);
        assert!(matches!(result, Err(DecodeError::NotAnObject)));
    }

    #[test]
    fn test_decode_frame_rejects_top_level_string() {
        let result = decode_frame(r#""notification""#);
        assert!(matches!(result, Err(DecodeError::NotAnObject)));
    }

    #[test]
    fn test_decode_frame_rejects_top_level_number() {
        let result = decode_frame("42");
        assert!(matches!(result, Err(DecodeError::NotAnObject)));
    }

    #[test]
    fn test_decode_frame_accepts_object_with_unknown_kind() {
        // A well-formed object always decodes, even with no usable payload.
        let envelope = decode_frame(r#"{"type":"wallpaper_sync","data":{}}"#).unwrap();
        assert_eq!(
            envelope,
            Envelope::Unhandled {
                kind: "wallpaper_sync".to_string()
            }
        );
    }

    #[test]
    fn test_decode_frame_accepts_empty_object() {
        let envelope = decode_frame("{}").unwrap();
        assert_eq!(
            envelope,
            Envelope::Unhandled {
                kind: String::new()
            }
        );
    }
}
