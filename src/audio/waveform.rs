//! Peak amplitude per time bucket.

use super::{normalize, Cancelled, Waveform};

/// Progress is reported this many times over one extraction.
const PROGRESS_STEPS: usize = 20;

/// Waveform of `samples` with no progress reporting.
pub fn waveform(samples: &[f32], sample_rate: u32, buckets_per_second: u32) -> Waveform {
    compute_waveform(samples, sample_rate, buckets_per_second, &mut |_| true)
        .unwrap_or_else(|Cancelled| Waveform {
            peaks: Vec::new(),
            buckets_per_second,
        })
}

/// Max absolute sample of each bucket, normalized so the loudest is 1.
///
/// Bucket `b` covers samples `[b * rate / bps, (b + 1) * rate / bps)`; the
/// last bucket may be partial. `progress` receives the fraction done and
/// returns `false` to stop.
pub fn compute_waveform(
    samples: &[f32],
    sample_rate: u32,
    buckets_per_second: u32,
    progress: &mut dyn FnMut(f32) -> bool,
) -> Result<Waveform, Cancelled> {
    if sample_rate == 0 || buckets_per_second == 0 || samples.is_empty() {
        return Ok(Waveform {
            peaks: Vec::new(),
            buckets_per_second,
        });
    }

    let rate = sample_rate as u64;
    let bps = buckets_per_second as u64;
    let n = samples.len() as u64;
    let num_buckets = ((n * bps + rate - 1) / rate) as usize;
    let step = (num_buckets / PROGRESS_STEPS).max(1);

    let mut peaks = Vec::with_capacity(num_buckets);
    for b in 0..num_buckets {
        let start = (b as u64 * rate / bps) as usize;
        let end = (((b as u64 + 1) * rate / bps) as usize).min(samples.len());
        let peak = samples[start.min(end)..end]
            .iter()
            .fold(0.0f32, |acc, s| acc.max(s.abs()));
        peaks.push(peak);

        if (b + 1) % step == 0 && !progress((b + 1) as f32 / num_buckets as f32) {
            return Err(Cancelled);
        }
    }

    normalize(&mut peaks);
    Ok(Waveform {
        peaks,
        buckets_per_second,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_bucket_per_tenth_second() {
        // 1 kHz for half a second: a loud first half and a quiet second half.
        let mut samples = vec![0.8f32; 250];
        samples.extend(vec![-0.2f32; 250]);
        let wave = waveform(&samples, 1000, 10);

        assert_eq!(wave.peaks.len(), 5);
        assert_eq!(wave.peaks[0], 1.0);
        assert_eq!(wave.peaks[1], 1.0);
        // Bucket 2 spans samples 200..300, crossing the change.
        assert_eq!(wave.peaks[2], 1.0);
        assert!((wave.peaks[3] - 0.25).abs() < 1e-6);
        assert!((wave.peaks[4] - 0.25).abs() < 1e-6);
    }

    #[test]
    fn partial_last_bucket() {
        let samples = vec![0.5f32; 1050];
        let wave = waveform(&samples, 1000, 10);
        assert_eq!(wave.peaks.len(), 11);
        assert_eq!(wave.peaks[10], 1.0);
    }

    #[test]
    fn silence_stays_zero() {
        let wave = waveform(&[0.0; 300], 100, 10);
        assert_eq!(wave.peaks, vec![0.0; 30]);
    }

    #[test]
    fn empty_input() {
        assert!(waveform(&[], 44100, 100).peaks.is_empty());
        assert!(waveform(&[0.1], 0, 100).peaks.is_empty());
    }

    #[test]
    fn progress_reaches_one_and_can_cancel() {
        let samples = vec![0.3f32; 44100];
        let mut seen = Vec::new();
        compute_waveform(&samples, 44100, 100, &mut |p| {
            seen.push(p);
            true
        })
        .unwrap();
        assert_eq!(seen.last().copied(), Some(1.0));
        assert!(seen.windows(2).all(|w| w[0] < w[1]));

        let result = compute_waveform(&samples, 44100, 100, &mut |p| p < 0.5);
        assert_eq!(result, Err(Cancelled));
    }
}
