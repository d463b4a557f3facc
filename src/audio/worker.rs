//! Background feature extraction.
//!
//! One thread per [`FeatureWorker`] takes jobs off a channel and sends
//! [`WorkerMessage`]s back: progress while it runs, then exactly one of
//! done, failed or cancelled. Every request gets an id and a cancellation
//! flag. A cancelled job stops at its next progress check.

use super::fft::FftPlan;
use super::{
    compute_spectrogram, compute_waveform, decode_wav, Cancelled, FeatureKind, PcmAudio,
    Spectrogram, Waveform,
};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Where the worker gets samples from.
#[derive(Debug, Clone)]
pub enum AudioInput {
    /// A WAV file, decoded on the worker thread.
    File(PathBuf),
    /// Samples already in memory.
    Pcm(PcmAudio),
}

#[derive(Debug, Clone)]
pub struct FeatureRequest {
    pub source_id: String,
    pub input: AudioInput,
    pub kind: FeatureKind,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FeatureResult {
    Waveform(Waveform),
    Spectrogram(Spectrogram),
}

#[derive(Debug, Clone, PartialEq)]
pub enum WorkerMessage {
    Progress {
        id: u64,
        source_id: String,
        fraction: f32,
    },
    Done {
        id: u64,
        source_id: String,
        result: FeatureResult,
    },
    Failed {
        id: u64,
        source_id: String,
        error: String,
    },
    Cancelled {
        id: u64,
        source_id: String,
    },
}

impl WorkerMessage {
    pub fn id(&self) -> u64 {
        match self {
            WorkerMessage::Progress { id, .. }
            | WorkerMessage::Done { id, .. }
            | WorkerMessage::Failed { id, .. }
            | WorkerMessage::Cancelled { id, .. } => *id,
        }
    }

    /// True for the last message a request will ever produce.
    pub fn is_final(&self) -> bool {
        !matches!(self, WorkerMessage::Progress { .. })
    }
}

/// Identifies a submitted request and lets the caller cancel it.
#[derive(Debug, Clone)]
pub struct RequestHandle {
    pub id: u64,
    cancel: Arc<AtomicBool>,
}

impl RequestHandle {
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::Relaxed)
    }
}

struct Job {
    id: u64,
    request: FeatureRequest,
    cancel: Arc<AtomicBool>,
}

pub struct FeatureWorker {
    jobs: Option<Sender<Job>>,
    messages: Receiver<WorkerMessage>,
    next_id: u64,
    shutdown: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl FeatureWorker {
    /// Start the worker thread.
    pub fn spawn() -> std::io::Result<Self> {
        let (job_tx, job_rx) = mpsc::channel::<Job>();
        let (msg_tx, msg_rx) = mpsc::channel();
        let shutdown = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&shutdown);
        let thread = thread::Builder::new()
            .name("kara-features".to_string())
            .spawn(move || run(job_rx, msg_tx, flag))?;

        Ok(Self {
            jobs: Some(job_tx),
            messages: msg_rx,
            next_id: 1,
            shutdown,
            thread: Some(thread),
        })
    }

    /// Queue a request. Results arrive through [`FeatureWorker::try_recv`]
    /// and friends, tagged with the handle's id.
    pub fn submit(&mut self, request: FeatureRequest) -> RequestHandle {
        let id = self.next_id;
        self.next_id += 1;
        let cancel = Arc::new(AtomicBool::new(false));
        let handle = RequestHandle {
            id,
            cancel: Arc::clone(&cancel),
        };

        debug!(id, source = %request.source_id, kind = ?request.kind, "queueing feature request");
        let sent = self
            .jobs
            .as_ref()
            .map(|jobs| jobs.send(Job { id, request, cancel }).is_ok())
            .unwrap_or(false);
        if !sent {
            warn!(id, "feature worker is gone; request dropped");
            handle.cancel();
        }
        handle
    }

    pub fn try_recv(&self) -> Option<WorkerMessage> {
        self.messages.try_recv().ok()
    }

    /// Wait up to `timeout` for the next message.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<WorkerMessage> {
        match self.messages.recv_timeout(timeout) {
            Ok(message) => Some(message),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }

    /// Every message available right now.
    pub fn drain(&self) -> Vec<WorkerMessage> {
        self.messages.try_iter().collect()
    }
}

impl Drop for FeatureWorker {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
        self.jobs.take();
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                warn!("feature worker panicked");
            }
        }
    }
}

fn run(jobs: Receiver<Job>, out: Sender<WorkerMessage>, shutdown: Arc<AtomicBool>) {
    for job in jobs {
        if shutdown.load(Ordering::Relaxed) {
            break;
        }
        let message = process(job, &out, &shutdown);
        if out.send(message).is_err() {
            break;
        }
    }
    debug!("feature worker stopped");
}

fn process(job: Job, out: &Sender<WorkerMessage>, shutdown: &AtomicBool) -> WorkerMessage {
    let Job {
        id,
        request,
        cancel,
    } = job;
    let FeatureRequest {
        source_id,
        input,
        kind,
    } = request;
    let stopped = || cancel.load(Ordering::Relaxed) || shutdown.load(Ordering::Relaxed);

    if stopped() {
        return WorkerMessage::Cancelled { id, source_id };
    }
    if let Err(error) = check_kind(kind) {
        warn!(id, source = %source_id, %error, "rejected feature request");
        return WorkerMessage::Failed {
            id,
            source_id,
            error,
        };
    }

    let pcm = match input {
        AudioInput::Pcm(pcm) => pcm,
        AudioInput::File(path) => match decode_wav(&path) {
            Ok(pcm) => pcm,
            Err(e) => {
                warn!(id, source = %source_id, error = %e, "audio decode failed");
                return WorkerMessage::Failed {
                    id,
                    source_id,
                    error: e.to_string(),
                };
            }
        },
    };

    let mut progress = |fraction: f32| {
        if stopped() {
            return false;
        }
        // The receiver may have gone away; the job still finishes.
        let _ = out.send(WorkerMessage::Progress {
            id,
            source_id: source_id.clone(),
            fraction,
        });
        true
    };

    let result = match kind {
        FeatureKind::Waveform { buckets_per_second } => {
            compute_waveform(&pcm.samples, pcm.sample_rate, buckets_per_second, &mut progress)
                .map(FeatureResult::Waveform)
        }
        FeatureKind::Spectrogram { fft_size, hop_size } => {
            compute_spectrogram(&pcm.samples, pcm.sample_rate, fft_size, hop_size, &mut progress)
                .map(FeatureResult::Spectrogram)
        }
    };

    match result {
        Ok(result) => {
            info!(id, source = %source_id, kind = ?kind, "feature extraction finished");
            WorkerMessage::Done {
                id,
                source_id,
                result,
            }
        }
        Err(Cancelled) => {
            debug!(id, source = %source_id, "feature extraction cancelled");
            WorkerMessage::Cancelled { id, source_id }
        }
    }
}

fn check_kind(kind: FeatureKind) -> Result<(), String> {
    match kind {
        FeatureKind::Waveform {
            buckets_per_second: 0,
        } => Err("buckets per second must be positive".to_string()),
        FeatureKind::Spectrogram { fft_size, .. } if FftPlan::new(fft_size).is_none() => {
            Err(format!("fft size {} is not a power of two", fft_size))
        }
        FeatureKind::Spectrogram { hop_size: 0, .. } => {
            Err("hop size must be positive".to_string())
        }
        _ => Ok(()),
    }
}
