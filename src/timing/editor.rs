//! Line-level editor driven by the transport.
//!
//! `TimingEditor` owns the marking session for the current line and reacts to
//! transport ticks. Each tick returns one [`Effect`] for the host to carry out
//! and, when the current line changes, appends to a transition log. The editor
//! also remembers the previous tick and whether the transport has reached the
//! line it auto-advanced to, so it can tell a scrub from its own playback.

use super::drag::BlockDrag;
use super::marking;
use super::types::{Effect, MarkingSession, Transition, TransportTick};
use crate::config::EngineConfig;
use crate::locator::LineLocator;
use crate::model::Line;
use std::time::Duration;
use tracing::{debug, info};

/// Transition log entries kept before the oldest are dropped.
const LOG_CAPACITY: usize = 64;

#[derive(Debug, Clone)]
pub struct TimingEditor {
    session: MarkingSession,
    loop_mode: bool,
    scrub_tolerance: f64,
    hold_threshold: Duration,
    log: Vec<Transition>,
    /// Time of the previous tick on the current line.
    last_time: Option<f64>,
    /// Set by an auto-advance until the transport reaches the new line.
    advance_pending: bool,
}

impl Default for TimingEditor {
    fn default() -> Self {
        Self::new(&EngineConfig::default())
    }
}

impl TimingEditor {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            session: MarkingSession::new(0),
            loop_mode: config.loop_mode,
            scrub_tolerance: config.scrub_tolerance,
            hold_threshold: config.hold_threshold,
            log: Vec::new(),
            last_time: None,
            advance_pending: false,
        }
    }

    pub fn session(&self) -> MarkingSession {
        self.session
    }

    pub fn line_index(&self) -> usize {
        self.session.line_index
    }

    pub fn loop_mode(&self) -> bool {
        self.loop_mode
    }

    pub fn set_loop_mode(&mut self, on: bool) {
        self.loop_mode = on;
    }

    pub fn transitions(&self) -> &[Transition] {
        &self.log
    }

    fn record(&mut self, transition: Transition) {
        if self.log.len() == LOG_CAPACITY {
            self.log.remove(0);
        }
        let auto = matches!(transition, Transition::Auto { .. });
        self.advance_pending = auto;
        if !auto {
            self.last_time = None;
        }
        self.log.push(transition);
    }

    /// Enter line `index` by user choice, seeking to its start.
    pub fn select_line(&mut self, lines: &[Line], index: usize) -> Effect {
        let Some(line) = lines.get(index) else {
            return Effect::None;
        };
        self.session = MarkingSession::new(index);
        self.record(Transition::Manual { to: index });
        Effect::Seek {
            time: line.start_time,
        }
    }

    pub fn mark(&mut self, lines: &mut [Line], t: f64) {
        if let Some(line) = lines.get_mut(self.session.line_index) {
            self.session = marking::mark(line, self.session, t);
        }
    }

    pub fn undo_mark(&mut self, lines: &mut [Line]) {
        if let Some(line) = lines.get_mut(self.session.line_index) {
            self.session = marking::undo_mark(line, self.session);
        }
    }

    pub fn auto_split(&mut self, lines: &mut [Line]) {
        if let Some(line) = lines.get_mut(self.session.line_index) {
            self.session = marking::auto_split(line, self.session);
        }
    }

    /// Start a block drag on syllable `index` of the current line.
    ///
    /// Returns `None` for a press shorter than the configured hold threshold.
    pub fn begin_block_drag(
        &self,
        lines: &[Line],
        index: usize,
        pointer: f64,
        held: Duration,
    ) -> Option<BlockDrag> {
        let line = lines.get(self.session.line_index)?;
        BlockDrag::begin(line, index, pointer, held, self.hold_threshold)
    }

    pub fn restart_line(&mut self, lines: &[Line]) -> Effect {
        match lines.get(self.session.line_index) {
            Some(line) => {
                let (session, effect) = marking::restart_line(line, self.session);
                self.session = session;
                effect
            }
            None => Effect::None,
        }
    }

    /// React to one transport report.
    ///
    /// Playback that runs from inside the current line to or past its end
    /// loops, advances to the next line, or pauses after the last one, however
    /// far the tick overshoots. Any other position more than the scrub
    /// tolerance outside the line switches to the line that contains it.
    pub fn tick(&mut self, lines: &[Line], tick: TransportTick) -> Effect {
        let index = self.session.line_index;
        let Some(line) = lines.get(index) else {
            return Effect::None;
        };
        let t = tick.time;
        let previous = self.last_time.replace(t);
        if self.advance_pending && t >= line.start_time {
            self.advance_pending = false;
        }

        let ran_off_end = tick.playing
            && t >= line.end_time
            && previous.is_some_and(|p| p >= line.start_time && p < line.end_time);
        let drifted = t < line.start_time - self.scrub_tolerance
            || t > line.end_time + self.scrub_tolerance;
        // Before the new line starts, playback is still in the tail of the
        // line that was just left.
        let in_advance_tail = self.advance_pending && t < line.start_time;
        if drifted && !ran_off_end && !in_advance_tail {
            if let Some(to) = LineLocator::new(lines).active_line_index(t) {
                if to != index {
                    debug!(from = index, to, time = t, "scrub resync");
                    self.session = MarkingSession::new(to);
                    self.record(Transition::Scrub { from: index, to });
                    return Effect::SwitchLine { from: index, to };
                }
            }
        }

        if !tick.playing || t < line.end_time {
            return Effect::None;
        }

        if self.loop_mode {
            self.session = self.session.reset();
            self.record(Transition::Loop { line: index });
            return Effect::SeekAndPlay {
                time: line.start_time,
            };
        }

        let next = index + 1;
        if next < lines.len() {
            info!(from = index, to = next, "advancing to next line");
            self.session = MarkingSession::new(next);
            self.record(Transition::Auto {
                from: index,
                to: next,
            });
            return Effect::AdvanceLine {
                from: index,
                to: next,
            };
        }

        Effect::Pause
    }
}
