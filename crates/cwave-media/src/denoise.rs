//! Noise reduction.
//!
//! The pipeline treats noise reduction as an opaque transform: same-length,
//! same-rate samples in and out. [`SpectralGate`] is the default
//! implementation: short-time Fourier analysis, a per-bin noise floor
//! estimated from the quietest frames, spectral subtraction, and overlap-add
//! resynthesis.

use std::path::Path;

use rustfft::{num_complex::Complex, FftPlanner};
use tracing::debug;

use crate::error::{MediaError, MediaResult};
use crate::wav::{read_wav_mono, write_wav_mono};

/// A noise reduction transform over normalized mono samples.
///
/// Implementations must return exactly as many samples as they were given,
/// at the same sample rate.
pub trait Denoiser: Send + Sync {
    fn denoise(&self, samples: &[f32], sample_rate: u32) -> Vec<f32>;
}

/// Spectral gating noise reducer.
///
/// Frames the signal with a periodic Hann window at 50% overlap, estimates a
/// stationary noise profile per frequency bin from the quietest frames, and
/// attenuates bins that do not rise above the scaled profile.
#[derive(Debug, Clone)]
pub struct SpectralGate {
    /// STFT frame size in samples. Must be a power of two.
    pub frame_size: usize,
    /// Over-subtraction factor applied to the noise profile.
    pub over_subtraction: f32,
    /// Minimum gain; keeps residual noise from sounding hollow.
    pub gain_floor: f32,
    /// Fraction of the quietest frames used for the noise profile.
    pub noise_frame_fraction: f32,
}

impl Default for SpectralGate {
    fn default() -> Self {
        Self {
            frame_size: 512,
            over_subtraction: 1.5,
            gain_floor: 0.05,
            noise_frame_fraction: 0.1,
        }
    }
}

impl Denoiser for SpectralGate {
    fn denoise(&self, samples: &[f32], _sample_rate: u32) -> Vec<f32> {
        let n = self.frame_size;
        let hop = n / 2;

        // Too short to estimate a profile; pass through.
        if samples.len() < n {
            return samples.to_vec();
        }

        let window: Vec<f32> = (0..n)
            .map(|i| 0.5 * (1.0 - (2.0 * std::f32::consts::PI * i as f32 / n as f32).cos()))
            .collect();

        let mut planner = FftPlanner::<f32>::new();
        let fft = planner.plan_fft_forward(n);
        let ifft = planner.plan_fft_inverse(n);

        // Frame count that covers the whole signal; the tail frame reads
        // zero padding.
        let n_frames = (samples.len() - n).div_ceil(hop) + 1;
        let padded_len = (n_frames - 1) * hop + n;
        let mut padded = samples.to_vec();
        padded.resize(padded_len, 0.0);

        // Analysis pass: windowed spectra and per-frame energy.
        let mut spectra: Vec<Vec<Complex<f32>>> = Vec::with_capacity(n_frames);
        let mut energies: Vec<(usize, f32)> = Vec::with_capacity(n_frames);

        for frame_idx in 0..n_frames {
            let start = frame_idx * hop;
            let mut buffer: Vec<Complex<f32>> = (0..n)
                .map(|i| Complex::new(padded[start + i] * window[i], 0.0))
                .collect();
            fft.process(&mut buffer);

            let energy: f32 = buffer.iter().map(|c| c.norm_sqr()).sum();
            energies.push((frame_idx, energy));
            spectra.push(buffer);
        }

        // Noise profile: mean magnitude per bin over the quietest frames.
        let profile_frames = ((n_frames as f32 * self.noise_frame_fraction) as usize).max(1);
        energies.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));

        let mut noise_profile = vec![0.0f32; n];
        for &(frame_idx, _) in energies.iter().take(profile_frames) {
            for (bin, value) in spectra[frame_idx].iter().enumerate() {
                noise_profile[bin] += value.norm();
            }
        }
        for value in noise_profile.iter_mut() {
            *value /= profile_frames as f32;
        }

        // Subtraction pass with overlap-add resynthesis.
        let mut output = vec![0.0f32; padded_len];
        let mut norm = vec![0.0f32; padded_len];

        for (frame_idx, spectrum) in spectra.iter_mut().enumerate() {
            for (bin, value) in spectrum.iter_mut().enumerate() {
                let magnitude = value.norm();
                let threshold = self.over_subtraction * noise_profile[bin];
                let gain = if magnitude > threshold {
                    ((magnitude - threshold) / magnitude).max(self.gain_floor)
                } else {
                    self.gain_floor
                };
                *value *= gain;
            }

            ifft.process(spectrum);

            let start = frame_idx * hop;
            for i in 0..n {
                // Inverse FFT is unnormalized; synthesis window matches analysis.
                output[start + i] += spectrum[i].re / n as f32 * window[i];
                norm[start + i] += window[i] * window[i];
            }
        }

        for (value, weight) in output.iter_mut().zip(norm.iter()) {
            if *weight > f32::EPSILON {
                *value /= *weight;
            }
        }
        output.truncate(samples.len());

        debug!(
            "Spectral gate: {} frames, {} profile frames",
            n_frames, profile_frames
        );

        output
    }
}

/// Denoise a mono WAV file into a new WAV file at the same sample rate.
pub fn denoise_wav_file(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    denoiser: &dyn Denoiser,
) -> MediaResult<()> {
    let (samples, sample_rate) = read_wav_mono(&input)?;

    let denoised = denoiser.denoise(&samples, sample_rate);
    if denoised.len() != samples.len() {
        return Err(MediaError::invalid_audio(format!(
            "denoiser changed sample count: {} -> {}",
            samples.len(),
            denoised.len()
        )));
    }

    write_wav_mono(&output, &denoised, sample_rate)?;
    Ok(())
}
