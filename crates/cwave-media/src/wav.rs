//! WAV sample I/O.

use std::path::Path;

use crate::error::{MediaError, MediaResult};

/// Read a mono 16-bit PCM WAV file into normalized f32 samples.
///
/// Returns the samples in [-1.0, 1.0] and the file's sample rate. The
/// transcode stage guarantees mono input; anything else is rejected rather
/// than silently downmixed.
pub fn read_wav_mono(path: impl AsRef<Path>) -> MediaResult<(Vec<f32>, u32)> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(MediaError::FileNotFound(path.to_path_buf()));
    }

    let mut reader = hound::WavReader::open(path)?;
    let spec = reader.spec();

    if spec.channels != 1 {
        return Err(MediaError::invalid_audio(format!(
            "expected mono input, got {} channels",
            spec.channels
        )));
    }

    let samples = match spec.sample_format {
        hound::SampleFormat::Int => {
            let max_val = (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|sample| sample as f32 / max_val))
                .collect::<Result<Vec<f32>, _>>()?
        }
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<Result<Vec<f32>, _>>()?,
    };

    Ok((samples, spec.sample_rate))
}

/// Write normalized f32 samples as a mono 16-bit PCM WAV file.
pub fn write_wav_mono(
    path: impl AsRef<Path>,
    samples: &[f32],
    sample_rate: u32,
) -> MediaResult<()> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut writer = hound::WavWriter::create(path, spec)?;
    for &sample in samples {
        let clamped = (sample.clamp(-1.0, 1.0) * i16::MAX as f32).round() as i16;
        writer.write_sample(clamped)?;
    }
    writer.finalize()?;

    Ok(())
}
