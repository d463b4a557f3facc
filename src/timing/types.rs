//! Timing state machine type definitions

use serde::Serialize;

/// Live marking state for one line.
///
/// The session is a plain value: each operation takes the current session and
/// returns the next one. Callers decide how long it lives.
///
/// # Fields
/// - `line_index`: which line the session belongs to
/// - `marking_index`: the character the next closing mark will time
/// - `mark_start_time`: absolute time of the open boundary, `None` when idle
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkingSession {
    pub line_index: usize,
    pub marking_index: usize,
    pub mark_start_time: Option<f64>,
}

impl MarkingSession {
    pub fn new(line_index: usize) -> Self {
        Self {
            line_index,
            marking_index: 0,
            mark_start_time: None,
        }
    }

    pub fn state(&self) -> MarkState {
        match self.mark_start_time {
            Some(since) => MarkState::Recording { since },
            None => MarkState::Idle,
        }
    }

    pub fn is_recording(&self) -> bool {
        self.mark_start_time.is_some()
    }

    /// Same line, back to the first character with no open boundary.
    pub fn reset(self) -> Self {
        Self::new(self.line_index)
    }
}

/// Whether a syllable boundary is open.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MarkState {
    Idle,
    Recording { since: f64 },
}

/// One report from the transport.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransportTick {
    /// Current playback position in seconds.
    pub time: f64,
    pub playing: bool,
}

/// What the host should do after a state machine step.
///
/// The engine never drives the transport itself; it only asks.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Effect {
    None,
    /// Move the transport without changing play state.
    Seek { time: f64 },
    /// Move the transport and keep playing, issued as one request.
    SeekAndPlay { time: f64 },
    Pause,
    /// Line `from` finished during playback. The host writes back its edits
    /// and shows line `to` without seeking.
    AdvanceLine { from: usize, to: usize },
    /// The transport was moved into line `to`. No seek is needed.
    SwitchLine { from: usize, to: usize },
}

/// Entry in the editor's transition log.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Transition {
    /// The user picked a line.
    Manual { to: usize },
    /// Playback ran past the end of `from`.
    Auto { from: usize, to: usize },
    /// The transport position moved into another line.
    Scrub { from: usize, to: usize },
    /// Loop mode replayed the line.
    Loop { line: usize },
}

/// Which edge of a syllable a drag moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragHandle {
    Start,
    End,
}

/// A pointer press classified by how long it was held.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gesture {
    Tap,
    Hold,
}
