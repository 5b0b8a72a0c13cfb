//! Transcoding to the canonical waveform format.

use std::path::Path;

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::MediaResult;

/// The canonical waveform format all inputs are normalized to before noise
/// reduction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaveformSpec {
    /// Channel count.
    pub channels: u16,
    /// Sample rate in Hz.
    pub sample_rate: u32,
}

impl Default for WaveformSpec {
    fn default() -> Self {
        Self {
            channels: 1,
            sample_rate: 16_000,
        }
    }
}

/// Transcode an audio file into a PCM WAV matching `spec`.
///
/// The input container/codec is whatever the client uploaded; FFmpeg probes
/// it. Output is 16-bit PCM.
pub async fn transcode_to_wav(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    spec: &WaveformSpec,
    runner: &FfmpegRunner,
) -> MediaResult<()> {
    let cmd = FfmpegCommand::new(input, output)
        .no_video()
        .audio_codec("pcm_s16le")
        .channels(spec.channels)
        .sample_rate(spec.sample_rate)
        .format("wav");

    runner.run(&cmd).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_spec_is_mono_16k() {
        let spec = WaveformSpec::default();
        assert_eq!(spec.channels, 1);
        assert_eq!(spec.sample_rate, 16_000);
    }
}
