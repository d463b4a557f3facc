//! Drag editing of syllable boundaries.
//!
//! Edge drags move one boundary and keep the other fixed. Block drags move the
//! whole syllable and keep its duration. Both are clamped against the
//! neighbouring syllables and the line, so a drag can never create an overlap
//! or a syllable shorter than [`MIN_SYLLABLE_DURATION`].
//!
//! Syllable indices refer to the line's syllables in `char_start` order.

use super::types::{DragHandle, Gesture};
use crate::model::{Line, MIN_SYLLABLE_DURATION};
use std::time::Duration;

/// Free room around syllable `i`: end of the previous syllable and start of
/// the next one, relative to the line start.
fn neighbour_bounds(line: &Line, i: usize) -> (f64, f64) {
    let syllables = line.syllables();
    let lower = i
        .checked_sub(1)
        .and_then(|p| syllables.get(p))
        .map(|s| s.end_offset())
        .unwrap_or(0.0);
    let upper = syllables
        .get(i + 1)
        .map(|s| s.start_offset)
        .unwrap_or_else(|| line.duration());
    (lower, upper)
}

fn sort_syllables(line: &mut Line) {
    if let Some(syllables) = line.syllables.as_mut() {
        syllables.sort_by_key(|s| s.char_start);
    }
}

/// Move one edge of syllable `index` to absolute time `t`.
///
/// Returns whether the syllable changed.
pub fn drag_edge(line: &mut Line, index: usize, handle: DragHandle, t: f64) -> bool {
    sort_syllables(line);
    if index >= line.syllables().len() {
        return false;
    }

    let (lower, upper) = neighbour_bounds(line, index);
    let target = t - line.start_time;
    let syllable = &mut line.syllables_mut()[index];
    let before = syllable.clone();

    match handle {
        DragHandle::Start => {
            let end = syllable.end_offset();
            let latest = end - MIN_SYLLABLE_DURATION;
            if lower > latest {
                return false;
            }
            let offset = target.clamp(lower, latest);
            syllable.start_offset = offset;
            syllable.duration = end - offset;
        }
        DragHandle::End => {
            let earliest = syllable.start_offset + MIN_SYLLABLE_DURATION;
            if earliest > upper {
                return false;
            }
            let end = target.clamp(earliest, upper);
            syllable.duration = end - syllable.start_offset;
        }
    }

    *syllable != before
}

/// Move syllable `index` so it starts at absolute time `start`, keeping its
/// duration.
///
/// Returns whether the syllable changed.
pub fn drag_block(line: &mut Line, index: usize, start: f64) -> bool {
    sort_syllables(line);
    if index >= line.syllables().len() {
        return false;
    }

    let (lower, upper) = neighbour_bounds(line, index);
    let target = start - line.start_time;
    let syllable = &mut line.syllables_mut()[index];
    let latest = upper - syllable.duration;
    if lower > latest {
        return false;
    }

    let offset = target.clamp(lower, latest);
    let changed = offset != syllable.start_offset;
    syllable.start_offset = offset;
    changed
}

/// Classify a press by how long it was held.
pub fn classify_press(held: Duration, threshold: Duration) -> Gesture {
    if held >= threshold {
        Gesture::Hold
    } else {
        Gesture::Tap
    }
}

/// An in-progress block drag.
///
/// Remembers where inside the syllable the pointer grabbed it so the syllable
/// follows the pointer without jumping.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlockDrag {
    pub index: usize,
    grab_offset: f64,
}

impl BlockDrag {
    /// Begin dragging syllable `index`, grabbed at absolute time `pointer`.
    ///
    /// Only a hold starts a block drag; a tap returns `None`.
    pub fn begin(
        line: &Line,
        index: usize,
        pointer: f64,
        held: Duration,
        threshold: Duration,
    ) -> Option<Self> {
        if classify_press(held, threshold) != Gesture::Hold {
            return None;
        }
        let mut sorted: Vec<_> = line.syllables().iter().collect();
        sorted.sort_by_key(|s| s.char_start);
        let syllable = sorted.get(index)?;
        Some(Self {
            index,
            grab_offset: pointer - syllable.absolute_start(line),
        })
    }

    /// Follow the pointer to absolute time `pointer`.
    pub fn update(&self, line: &mut Line, pointer: f64) -> bool {
        drag_block(line, self.index, pointer - self.grab_offset)
    }
}
