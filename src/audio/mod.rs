//! # Audio Feature Module
//!
//! Waveform peaks and spectrograms shown under the timing editor for visual
//! alignment. Features are display data only; nothing here feeds back into
//! line or syllable timing.
//!
//! ## Sub-modules
//! - `decode` - WAV loading and downmix to mono PCM (hound)
//! - `waveform` - Peak amplitude per time bucket
//! - `fft` - Hanning window and radix-2 FFT
//! - `spectrogram` - Log-magnitude STFT
//! - `worker` - Background extraction thread with progress and cancellation
//! - `cache` - Per-source feature cache driven by the worker
//!
//! ## Data flow
//! ```text
//! AudioInput (file | PCM) ──▶ FeatureWorker thread ──▶ WorkerMessage
//!                                   │                     │ Progress
//!                                   │                     │ Done(Waveform | Spectrogram)
//!                                   │                     └ Failed
//!                                   ▼
//!                             FeatureCache ──▶ slice(start, end) per line
//! ```
//!
//! Buffers move between threads by message; the worker and the editor never
//! share mutable memory. Each request has its own cancellation flag.

mod cache;
mod decode;
mod fft;
mod spectrogram;
mod waveform;
mod worker;

pub use cache::{FeatureCache, FeatureEntry, LineFeatures};
pub use decode::{decode_wav, downmix};
pub use fft::{hanning_window, FftPlan};
pub use spectrogram::{compute_spectrogram, spectrogram, LOG_EPSILON};
pub use waveform::{compute_waveform, waveform};
pub use worker::{
    AudioInput, FeatureRequest, FeatureResult, FeatureWorker, RequestHandle, WorkerMessage,
};

use crate::config::EngineConfig;
use serde::{Deserialize, Serialize};

/// The extraction stopped because its request was cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cancelled;

/// Mono PCM samples in `[-1, 1]`.
#[derive(Debug, Clone, PartialEq)]
pub struct PcmAudio {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl PcmAudio {
    pub fn duration(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate as f64
    }
}

/// Which feature to extract, with its parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum FeatureKind {
    Waveform { buckets_per_second: u32 },
    Spectrogram { fft_size: usize, hop_size: usize },
}

impl FeatureKind {
    pub fn waveform_for(config: &EngineConfig) -> Self {
        FeatureKind::Waveform {
            buckets_per_second: config.waveform_buckets_per_second,
        }
    }

    pub fn spectrogram_for(config: &EngineConfig) -> Self {
        FeatureKind::Spectrogram {
            fft_size: config.fft_size,
            hop_size: config.hop_size,
        }
    }
}

/// Peak amplitude per time bucket, normalized to `[0, 1]`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Waveform {
    pub peaks: Vec<f32>,
    pub buckets_per_second: u32,
}

impl Waveform {
    pub fn duration(&self) -> f64 {
        self.peaks.len() as f64 / self.buckets_per_second.max(1) as f64
    }

    /// Bucket range covering absolute times `[start, end)`.
    pub fn bucket_range(&self, start: f64, end: f64) -> std::ops::Range<usize> {
        time_range(start, end, self.buckets_per_second as f64, self.peaks.len())
    }

    /// Peaks covering `[start, end)`, without recomputation.
    pub fn slice(&self, start: f64, end: f64) -> &[f32] {
        &self.peaks[self.bucket_range(start, end)]
    }
}

/// Log-magnitude spectrogram normalized to `[0, 1]`.
///
/// `magnitudes` is frame-major: frame `f`, bin `b` is at `f * num_bins + b`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Spectrogram {
    pub magnitudes: Vec<f32>,
    pub num_frames: usize,
    pub num_bins: usize,
    pub frames_per_second: f64,
}

impl Spectrogram {
    pub fn frame(&self, index: usize) -> Option<&[f32]> {
        if index >= self.num_frames {
            return None;
        }
        let start = index * self.num_bins;
        self.magnitudes.get(start..start + self.num_bins)
    }

    /// Frame range covering absolute times `[start, end)`.
    pub fn frame_range(&self, start: f64, end: f64) -> std::ops::Range<usize> {
        time_range(start, end, self.frames_per_second, self.num_frames)
    }

    /// Frames covering `[start, end)`, without recomputation.
    pub fn slice(&self, start: f64, end: f64) -> SpectrogramSlice<'_> {
        let frames = self.frame_range(start, end);
        SpectrogramSlice {
            first_frame: frames.start,
            num_frames: frames.len(),
            num_bins: self.num_bins,
            magnitudes: &self.magnitudes[frames.start * self.num_bins..frames.end * self.num_bins],
        }
    }
}

/// A borrowed run of spectrogram frames.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpectrogramSlice<'a> {
    pub first_frame: usize,
    pub num_frames: usize,
    pub num_bins: usize,
    pub magnitudes: &'a [f32],
}

fn time_range(start: f64, end: f64, per_second: f64, len: usize) -> std::ops::Range<usize> {
    if !(end > start) || per_second <= 0.0 {
        return 0..0;
    }
    let first = (start * per_second).floor().max(0.0) as usize;
    let last = (end * per_second).ceil().max(0.0) as usize;
    first.min(len)..last.min(len)
}

/// Scale `values` so the largest becomes 1. All-zero input stays zero.
pub(crate) fn normalize(values: &mut [f32]) {
    let max = values.iter().copied().fold(0.0f32, f32::max);
    if max > 0.0 {
        for v in values.iter_mut() {
            *v /= max;
        }
    }
}
