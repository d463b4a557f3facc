//! Log-magnitude short-time Fourier transform.

use super::fft::FftPlan;
use super::{normalize, Cancelled, Spectrogram};

/// Added to each magnitude before the logarithm.
pub const LOG_EPSILON: f32 = 1e-6;

const PROGRESS_STEPS: usize = 20;

/// Spectrogram of `samples` with no progress reporting.
///
/// Returns an empty spectrogram when `fft_size` is not a power of two or
/// `hop_size` is zero.
pub fn spectrogram(samples: &[f32], sample_rate: u32, fft_size: usize, hop_size: usize) -> Spectrogram {
    compute_spectrogram(samples, sample_rate, fft_size, hop_size, &mut |_| true)
        .unwrap_or_else(|Cancelled| empty(sample_rate, hop_size))
}

/// Windowed FFT frames, `hop_size` apart, each reduced to `fft_size / 2`
/// log-magnitude bins and normalized over the whole spectrogram.
///
/// Frame count is `floor((N - fft_size) / hop_size) + 1`, or zero when the
/// input is shorter than one frame. `progress` receives the fraction done
/// and returns `false` to stop.
pub fn compute_spectrogram(
    samples: &[f32],
    sample_rate: u32,
    fft_size: usize,
    hop_size: usize,
    progress: &mut dyn FnMut(f32) -> bool,
) -> Result<Spectrogram, Cancelled> {
    let plan = match FftPlan::new(fft_size) {
        Some(plan) if hop_size > 0 => plan,
        _ => return Ok(empty(sample_rate, hop_size)),
    };
    if samples.len() < fft_size {
        return Ok(Spectrogram {
            num_bins: fft_size / 2,
            ..empty(sample_rate, hop_size)
        });
    }

    let num_frames = (samples.len() - fft_size) / hop_size + 1;
    let num_bins = fft_size / 2;
    let step = (num_frames / PROGRESS_STEPS).max(1);

    let mut magnitudes = vec![0.0f32; num_frames * num_bins];
    let mut re = vec![0.0f32; fft_size];
    let mut im = vec![0.0f32; fft_size];

    for (frame, out) in magnitudes.chunks_exact_mut(num_bins).enumerate() {
        let start = frame * hop_size;
        plan.magnitudes(&samples[start..start + fft_size], &mut re, &mut im, out);
        for m in out.iter_mut() {
            *m = log_magnitude(*m);
        }

        if (frame + 1) % step == 0 && !progress((frame + 1) as f32 / num_frames as f32) {
            return Err(Cancelled);
        }
    }

    normalize(&mut magnitudes);
    Ok(Spectrogram {
        magnitudes,
        num_frames,
        num_bins,
        frames_per_second: frames_per_second(sample_rate, hop_size),
    })
}

/// `log10(m + LOG_EPSILON) - log10(LOG_EPSILON)`, clamped at zero.
///
/// Evaluated as `log10(1 + m / LOG_EPSILON)` so silence is exactly zero.
fn log_magnitude(m: f32) -> f32 {
    (1.0 + m / LOG_EPSILON).log10().max(0.0)
}

fn frames_per_second(sample_rate: u32, hop_size: usize) -> f64 {
    if hop_size == 0 {
        0.0
    } else {
        sample_rate as f64 / hop_size as f64
    }
}

fn empty(sample_rate: u32, hop_size: usize) -> Spectrogram {
    Spectrogram {
        magnitudes: Vec::new(),
        num_frames: 0,
        num_bins: 0,
        frames_per_second: frames_per_second(sample_rate, hop_size),
    }
}
