//! Output key derivation for processed audio objects.

/// Naming policy for processed output objects.
///
/// The output key is the input key's base name plus a fixed suffix and the
/// waveform extension. The suffix is configurable so deployments that want
/// `name.wav` instead of `name_processed.wav` can set it to the empty string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputKeyPolicy {
    /// Suffix appended to the base name, before the extension.
    pub suffix: String,
    /// Extension of the output object, without the leading dot.
    pub extension: String,
}

impl Default for OutputKeyPolicy {
    fn default() -> Self {
        Self {
            suffix: "_processed".to_string(),
            extension: "wav".to_string(),
        }
    }
}

impl OutputKeyPolicy {
    pub fn new(suffix: impl Into<String>, extension: impl Into<String>) -> Self {
        Self {
            suffix: suffix.into(),
            extension: extension.into(),
        }
    }

    /// Derive the output key for an input key.
    pub fn derive(&self, input_key: &str) -> String {
        format!("{}{}.{}", base_name(input_key), self.suffix, self.extension)
    }
}

/// Strip the final extension from an object key.
///
/// Only the last path segment is inspected, so a dot in a prefix directory
/// never truncates the key. A name with no extension separator is its own
/// base, and a leading-dot name like `.hidden` has no extension to strip.
pub fn base_name(key: &str) -> &str {
    let segment_start = key.rfind('/').map(|i| i + 1).unwrap_or(0);
    let segment = &key[segment_start..];

    match segment.rfind('.') {
        Some(dot) if dot > 0 => &key[..segment_start + dot],
        _ => key,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_name_single_extension() {
        assert_eq!(base_name("audio_1700000000000.webm"), "audio_1700000000000");
    }

    #[test]
    fn test_base_name_no_separator() {
        assert_eq!(base_name("rawcapture"), "rawcapture");
    }

    #[test]
    fn test_base_name_multiple_separators() {
        assert_eq!(base_name("take.2.final.webm"), "take.2.final");
    }

    #[test]
    fn test_base_name_hidden_file() {
        assert_eq!(base_name(".env"), ".env");
    }

    #[test]
    fn test_base_name_dotted_prefix() {
        assert_eq!(base_name("uploads.v2/capture"), "uploads.v2/capture");
        assert_eq!(base_name("uploads.v2/capture.webm"), "uploads.v2/capture");
    }

    #[test]
    fn test_derive_default_policy() {
        let policy = OutputKeyPolicy::default();
        assert_eq!(
            policy.derive("audio_1700000000000.webm"),
            "audio_1700000000000_processed.wav"
        );
    }

    #[test]
    fn test_derive_bare_suffix() {
        let policy = OutputKeyPolicy::new("", "wav");
        assert_eq!(policy.derive("audio_1700000000000.webm"), "audio_1700000000000.wav");
    }

    #[test]
    fn test_derive_is_total() {
        let policy = OutputKeyPolicy::default();
        assert_eq!(policy.derive("noext"), "noext_processed.wav");
        assert_eq!(policy.derive("a.b.c"), "a.b_processed.wav");
    }

    #[test]
    fn test_derive_stable_over_own_base() {
        // Deriving from "base + ext" gives the same result whatever the
        // original extension was.
        let policy = OutputKeyPolicy::default();
        let key = "take.2.final.webm";
        let rebuilt = format!("{}.ogg", base_name(key));
        assert_eq!(policy.derive(key), policy.derive(&rebuilt));
    }
}
