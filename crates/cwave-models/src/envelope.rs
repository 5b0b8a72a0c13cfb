//! Upload notification envelope.
//!
//! Messages arrive through two nested JSON layers: the queue delivery carries
//! a string body holding the notification wrapper, whose `Message` field holds
//! the serialized application payload. Both layers must parse and the payload
//! must name a file, otherwise the message is unprocessable.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while decoding an upload notification.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("Invalid notification wrapper: {0}")]
    Notification(#[source] serde_json::Error),

    #[error("Invalid upload payload: {0}")]
    Payload(#[source] serde_json::Error),

    #[error("Upload payload has an empty file name")]
    MissingFileName,
}

/// The notification wrapper delivered inside the queue message body.
///
/// Transport metadata fields (`Type`, `TopicArn`, ...) may be present and are
/// ignored; only the serialized payload matters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    #[serde(rename = "Message")]
    pub message: String,
}

/// The innermost application payload: which object was uploaded, and where.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadEvent {
    /// Bucket the object was uploaded to. Informational: the worker's
    /// configured input bucket wins on mismatch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bucket_name: Option<String>,
    /// Object key of the uploaded audio clip.
    pub file_name: String,
}

impl UploadEvent {
    /// Create an event for a freshly uploaded object.
    pub fn new(bucket_name: impl Into<String>, file_name: impl Into<String>) -> Self {
        Self {
            bucket_name: Some(bucket_name.into()),
            file_name: file_name.into(),
        }
    }

    /// Reject payloads that cannot be processed.
    pub fn validate(&self) -> Result<(), DecodeError> {
        if self.file_name.is_empty() {
            return Err(DecodeError::MissingFileName);
        }
        Ok(())
    }
}

/// Decode a queue message body into the upload event it carries.
///
/// Parses the notification wrapper, then the payload serialized in its
/// `Message` field. A failure at either layer marks the message unprocessable.
pub fn decode_envelope(body: &str) -> Result<UploadEvent, DecodeError> {
    let notification: Notification =
        serde_json::from_str(body).map_err(DecodeError::Notification)?;

    let event: UploadEvent =
        serde_json::from_str(&notification.message).map_err(DecodeError::Payload)?;

    event.validate()?;
    Ok(event)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wrap(inner: &str) -> String {
        serde_json::to_string(&Notification {
            message: inner.to_string(),
        })
        .unwrap()
    }

    #[test]
    fn test_decode_valid_envelope() {
        let body = wrap(r#"{"bucket_name": "my-audio-bucket", "file_name": "audio_1700000000000.webm"}"#);

        let event = decode_envelope(&body).unwrap();
        assert_eq!(event.bucket_name.as_deref(), Some("my-audio-bucket"));
        assert_eq!(event.file_name, "audio_1700000000000.webm");
    }

    #[test]
    fn test_decode_ignores_transport_metadata() {
        let body = r#"{
            "Type": "Notification",
            "TopicArn": "arn:aws:sns:us-east-1:000000000000:upload-topic",
            "Message": "{\"bucket_name\": \"b\", \"file_name\": \"clip.webm\"}"
        }"#;

        let event = decode_envelope(body).unwrap();
        assert_eq!(event.file_name, "clip.webm");
    }

    #[test]
    fn test_decode_missing_bucket_name() {
        let body = wrap(r#"{"file_name": "clip.webm"}"#);

        let event = decode_envelope(&body).unwrap();
        assert_eq!(event.bucket_name, None);
        assert_eq!(event.file_name, "clip.webm");
    }

    #[test]
    fn test_decode_malformed_wrapper() {
        let err = decode_envelope("not json at all").unwrap_err();
        assert!(matches!(err, DecodeError::Notification(_)));
    }

    #[test]
    fn test_decode_wrapper_without_message() {
        let err = decode_envelope(r#"{"Type": "Notification"}"#).unwrap_err();
        assert!(matches!(err, DecodeError::Notification(_)));
    }

    #[test]
    fn test_decode_malformed_payload() {
        let body = wrap("{truncated");
        let err = decode_envelope(&body).unwrap_err();
        assert!(matches!(err, DecodeError::Payload(_)));
    }

    #[test]
    fn test_decode_empty_file_name() {
        let body = wrap(r#"{"bucket_name": "b", "file_name": ""}"#);
        let err = decode_envelope(&body).unwrap_err();
        assert!(matches!(err, DecodeError::MissingFileName));
    }

    #[test]
    fn test_event_round_trip() {
        let event = UploadEvent::new("my-audio-bucket", "audio_1700000000000.webm");
        let json = serde_json::to_string(&event).unwrap();
        let parsed: UploadEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, event);
    }
}
