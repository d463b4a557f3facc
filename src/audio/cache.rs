//! Feature cache for the current audio source.
//!
//! Features are requested lazily the first time a view asks for them and
//! stay until the cache is cleared or the source changes. Switching source
//! cancels everything still in flight; messages that arrive afterwards for
//! those requests are dropped.

use super::worker::{
    AudioInput, FeatureRequest, FeatureResult, FeatureWorker, RequestHandle, WorkerMessage,
};
use super::{FeatureKind, Spectrogram, SpectrogramSlice, Waveform};
use crate::config::EngineConfig;
use crate::model::Line;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq)]
pub enum FeatureEntry {
    Pending { progress: f32 },
    Ready(FeatureResult),
    Failed(String),
}

impl FeatureEntry {
    pub fn is_pending(&self) -> bool {
        matches!(self, FeatureEntry::Pending { .. })
    }
}

/// Both features sliced to one line's time range.
#[derive(Debug, Clone, Copy, Default)]
pub struct LineFeatures<'a> {
    pub waveform: Option<&'a [f32]>,
    pub spectrogram: Option<SpectrogramSlice<'a>>,
}

pub struct FeatureCache {
    worker: FeatureWorker,
    source_id: Option<String>,
    entries: HashMap<FeatureKind, FeatureEntry>,
    in_flight: HashMap<u64, (FeatureKind, RequestHandle)>,
}

impl FeatureCache {
    pub fn new(worker: FeatureWorker) -> Self {
        Self {
            worker,
            source_id: None,
            entries: HashMap::new(),
            in_flight: HashMap::new(),
        }
    }

    pub fn source_id(&self) -> Option<&str> {
        self.source_id.as_deref()
    }

    /// Make `source_id` the current source. Returns true when it changed,
    /// in which case every cached feature is evicted.
    pub fn set_source(&mut self, source_id: &str) -> bool {
        if self.source_id.as_deref() == Some(source_id) {
            return false;
        }
        debug!(from = ?self.source_id, to = source_id, "audio source changed");
        self.clear();
        self.source_id = Some(source_id.to_string());
        true
    }

    /// Cancel in-flight work and forget every feature.
    pub fn clear(&mut self) {
        for (_, (_, handle)) in self.in_flight.drain() {
            handle.cancel();
        }
        self.entries.clear();
    }

    /// Current state of `kind` for `source_id`, submitting a request the
    /// first time it is asked for.
    ///
    /// `input` is only called when a request is actually submitted.
    pub fn request(
        &mut self,
        source_id: &str,
        kind: FeatureKind,
        input: impl FnOnce() -> AudioInput,
    ) -> &FeatureEntry {
        self.set_source(source_id);
        if !self.entries.contains_key(&kind) {
            let handle = self.worker.submit(FeatureRequest {
                source_id: source_id.to_string(),
                input: input(),
                kind,
            });
            self.in_flight.insert(handle.id, (kind, handle));
            self.entries
                .insert(kind, FeatureEntry::Pending { progress: 0.0 });
        }
        &self.entries[&kind]
    }

    pub fn entry(&self, kind: FeatureKind) -> Option<&FeatureEntry> {
        self.entries.get(&kind)
    }

    pub fn waveform(&self, buckets_per_second: u32) -> Option<&Waveform> {
        match self.entries.get(&FeatureKind::Waveform { buckets_per_second }) {
            Some(FeatureEntry::Ready(FeatureResult::Waveform(waveform))) => Some(waveform),
            _ => None,
        }
    }

    pub fn spectrogram(&self, fft_size: usize, hop_size: usize) -> Option<&Spectrogram> {
        match self
            .entries
            .get(&FeatureKind::Spectrogram { fft_size, hop_size })
        {
            Some(FeatureEntry::Ready(FeatureResult::Spectrogram(spectrogram))) => Some(spectrogram),
            _ => None,
        }
    }

    /// Apply every message the worker has sent so far. Returns how many
    /// were applied; stale messages are not counted.
    pub fn poll(&mut self) -> usize {
        let messages = self.worker.drain();
        messages
            .into_iter()
            .map(|message| self.apply(message))
            .filter(|&applied| applied)
            .count()
    }

    /// Block until `kind` is no longer pending or `timeout` passes.
    pub fn wait(&mut self, kind: FeatureKind, timeout: Duration) -> Option<&FeatureEntry> {
        let deadline = Instant::now() + timeout;
        while self.entries.get(&kind).map_or(false, FeatureEntry::is_pending) {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            match self.worker.recv_timeout(remaining) {
                Some(message) => {
                    self.apply(message);
                }
                None => break,
            }
        }
        self.entries.get(&kind)
    }

    fn apply(&mut self, message: WorkerMessage) -> bool {
        let id = message.id();
        let Some((kind, _)) = self.in_flight.get(&id) else {
            debug!(id, "dropping stale feature message");
            return false;
        };
        let kind = *kind;
        if message.is_final() {
            self.in_flight.remove(&id);
        }

        let entry = match message {
            WorkerMessage::Progress { fraction, .. } => FeatureEntry::Pending { progress: fraction },
            WorkerMessage::Done { result, .. } => FeatureEntry::Ready(result),
            WorkerMessage::Failed { error, .. } => {
                warn!(id, %error, "feature extraction failed");
                FeatureEntry::Failed(error)
            }
            WorkerMessage::Cancelled { .. } => {
                self.entries.remove(&kind);
                return true;
            }
        };
        self.entries.insert(kind, entry);
        true
    }

    /// Slices of the ready features covering `line`, using the feature
    /// parameters from `config`.
    pub fn line_features(&self, line: &Line, config: &EngineConfig) -> LineFeatures<'_> {
        LineFeatures {
            waveform: self
                .waveform(config.waveform_buckets_per_second)
                .map(|w| w.slice(line.start_time, line.end_time)),
            spectrogram: self
                .spectrogram(config.fft_size, config.hop_size)
                .map(|s| s.slice(line.start_time, line.end_time)),
        }
    }
}
