//! Shared data models for the ClearWave backend.
//!
//! This crate provides Serde-serializable types for:
//! - The upload notification envelope and its decoding
//! - Output key derivation for processed audio
//! - Content type constants

pub mod envelope;
pub mod key;
pub mod media_type;

// Re-export common types
pub use envelope::{decode_envelope, DecodeError, Notification, UploadEvent};
pub use key::{base_name, OutputKeyPolicy};
pub use media_type::{CONTENT_TYPE_WAV, CONTENT_TYPE_WEBM};
