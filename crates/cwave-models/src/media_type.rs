//! Content type constants for audio objects.

/// Content type of uploaded input clips.
pub const CONTENT_TYPE_WEBM: &str = "audio/webm";

/// Content type of processed output waveforms.
pub const CONTENT_TYPE_WAV: &str = "audio/wav";
