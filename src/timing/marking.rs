//! Tap-to-mark recording, undo, auto-split and restart.
//!
//! Every function here takes the line being edited and the current session,
//! applies the whole edit, and returns the next session. Requests that make no
//! sense (nothing left to mark, nothing to undo) return the session unchanged.

use super::types::{Effect, MarkingSession};
use crate::derive;
use crate::model::{insert_sorted, Line, Syllable, MIN_SYLLABLE_DURATION};

/// Record a boundary at playback time `t`.
///
/// From idle this opens a boundary. While recording it closes a syllable for
/// character `marking_index` spanning the open boundary to `t`, then opens the
/// next boundary at the syllable's end. Closing the last character goes idle.
pub fn mark(line: &mut Line, session: MarkingSession, t: f64) -> MarkingSession {
    let len = line.char_count();
    if session.marking_index >= len {
        return session;
    }

    let Some(start) = session.mark_start_time else {
        return MarkingSession {
            mark_start_time: Some(t),
            ..session
        };
    };

    let index = session.marking_index;
    let syllable = close_syllable(line, index, start, t);
    let end_time = syllable.absolute_end(line);
    let end_offset = syllable.end_offset();

    let syllables = line.syllables_mut();
    // Later syllables from an earlier take that the new one runs into are stale.
    syllables.retain(|s| {
        let claims_index = s.char_start <= index && index < s.char_end;
        let stale = s.char_start > index && s.start_offset < end_offset;
        !claims_index && !stale
    });
    insert_sorted(syllables, syllable);

    let marking_index = index + 1;
    MarkingSession {
        line_index: session.line_index,
        marking_index,
        mark_start_time: (marking_index < len).then_some(end_time),
    }
}

/// Build the syllable for character `index` between absolute `start` and `t`,
/// clamped to the end of the previous character's syllable and to the line.
///
/// The syllable never ends so late that the characters after it could not
/// each still get the minimum duration.
fn close_syllable(line: &Line, index: usize, start: f64, t: f64) -> Syllable {
    let line_duration = line.duration().max(0.0);
    let lower = index
        .checked_sub(1)
        .and_then(|prev| line.syllable_index_for_char(prev))
        .map(|i| line.syllables()[i].end_offset())
        .unwrap_or(0.0)
        .min(line_duration);

    let after = line.char_count().saturating_sub(index + 1) as f64;
    let ceiling = (line_duration - after * MIN_SYLLABLE_DURATION)
        .max(lower + MIN_SYLLABLE_DURATION)
        .min(line_duration);

    let offset = (start - line.start_time).clamp(lower, (ceiling - MIN_SYLLABLE_DURATION).max(lower));
    let end = (t - line.start_time)
        .max(offset + MIN_SYLLABLE_DURATION)
        .min(ceiling)
        .max(offset);

    Syllable::new(
        line.char_slice(index, index + 1),
        offset,
        end - offset,
        index,
        index + 1,
    )
}

/// Drop the most recently marked syllable and go idle.
pub fn undo_mark(line: &mut Line, session: MarkingSession) -> MarkingSession {
    if session.marking_index == 0 {
        return session;
    }
    let index = session.marking_index - 1;
    if let Some(i) = line.syllable_index_for_char(index) {
        line.syllables_mut().remove(i);
    }
    MarkingSession {
        line_index: session.line_index,
        marking_index: index,
        mark_start_time: None,
    }
}

/// Replace the line's syllables with an even split and mark it complete.
pub fn auto_split(line: &mut Line, session: MarkingSession) -> MarkingSession {
    line.syllables = Some(derive::auto_split(line));
    MarkingSession {
        line_index: session.line_index,
        marking_index: line.char_count(),
        mark_start_time: None,
    }
}

/// Start marking the line over from its first character.
///
/// Existing syllables are kept; they are replaced one by one as the line is
/// marked again. The returned effect seeks the transport to the line start.
pub fn restart_line(line: &Line, session: MarkingSession) -> (MarkingSession, Effect) {
    (
        session.reset(),
        Effect::Seek {
            time: line.start_time,
        },
    )
}
