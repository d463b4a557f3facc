//! # Derivation Algorithms
//!
//! Pure functions that create or reshape syllables and that derive
//! per-character timing from them. Nothing here mutates a line unless the
//! function name says so (`split_at_char`, `merge_range`).
//!
//! ## Character timing
//! A character covered by a syllable gets an even share of that syllable's
//! duration. A character no syllable covers gets its slot in an even split of
//! the whole line. Character timing is always recomputed, so it cannot go stale
//! after an edit.

use crate::model::{insert_sorted, Line, Syllable, MIN_SYLLABLE_DURATION, TIME_EPSILON};
use serde::Serialize;

/// Absolute time span of one character.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CharSpan {
    pub start: f64,
    pub end: f64,
}

/// The character being sung at a given time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CharProgress {
    pub index: usize,
    /// Fraction of the character already elapsed, in `[0, 1]`.
    pub progress: f64,
}

/// Split the line duration evenly, one syllable per character.
///
/// Calling this twice on the same line gives identical results.
pub fn auto_split(line: &Line) -> Vec<Syllable> {
    let chars: Vec<char> = line.text.chars().collect();
    let duration = line.duration();
    if chars.is_empty() || duration <= 0.0 {
        return Vec::new();
    }

    let per_char = duration / chars.len() as f64;
    chars
        .iter()
        .enumerate()
        .map(|(i, c)| Syllable::new(c.to_string(), i as f64 * per_char, per_char, i, i + 1))
        .collect()
}

/// Split a syllable before its `k`-th character.
///
/// Durations are shared in proportion to character count. Returns `None` when
/// `k` is not strictly inside the syllable or either half would be shorter
/// than the minimum syllable duration.
pub fn split(syllable: &Syllable, k: usize) -> Option<(Syllable, Syllable)> {
    let chars: Vec<char> = syllable.text.chars().collect();
    let len = chars.len();
    if k == 0 || k >= len {
        return None;
    }

    let first_duration = syllable.duration * k as f64 / len as f64;
    let second_duration = syllable.duration * (len - k) as f64 / len as f64;
    if first_duration + TIME_EPSILON < MIN_SYLLABLE_DURATION
        || second_duration + TIME_EPSILON < MIN_SYLLABLE_DURATION
    {
        return None;
    }

    let first = Syllable::new(
        chars[..k].iter().collect::<String>(),
        syllable.start_offset,
        first_duration,
        syllable.char_start,
        syllable.char_start + k,
    );
    let second = Syllable::new(
        chars[k..].iter().collect::<String>(),
        first.start_offset + first.duration,
        second_duration,
        syllable.char_start + k,
        syllable.char_end,
    );
    Some((first, second))
}

/// Merge a contiguous run of syllables into one.
///
/// The merged syllable starts where the first one starts and ends where the
/// last one ends, so pauses between members become part of its duration.
/// Returns `None` for an empty run or one with a hole in its character range.
pub fn merge(run: &[Syllable]) -> Option<Syllable> {
    let first = run.first()?;
    let last = run.last()?;
    if run.windows(2).any(|w| w[0].char_end != w[1].char_start) {
        return None;
    }

    let text: String = run.iter().map(|s| s.text.as_str()).collect();
    let end = run
        .iter()
        .map(Syllable::end_offset)
        .fold(last.end_offset(), f64::max);
    Some(Syllable::new(
        text,
        first.start_offset,
        end - first.start_offset,
        first.char_start,
        last.char_end,
    ))
}

/// Split the syllable covering `char_index` so a new syllable starts there.
///
/// Returns whether the line changed.
pub fn split_at_char(line: &mut Line, char_index: usize) -> bool {
    let Some(i) = line.syllable_index_for_char(char_index) else {
        return false;
    };
    let syllable = &line.syllables()[i];
    let Some((first, second)) = split(syllable, char_index - syllable.char_start) else {
        return false;
    };

    let syllables = line.syllables_mut();
    syllables.remove(i);
    insert_sorted(syllables, first);
    insert_sorted(syllables, second);
    true
}

/// Merge syllables `first..=last` (positions in `char_start` order).
///
/// Returns whether the line changed.
pub fn merge_range(line: &mut Line, first: usize, last: usize) -> bool {
    if first >= last || last >= line.syllables().len() {
        return false;
    }
    let syllables = line.syllables_mut();
    syllables.sort_by_key(|s| s.char_start);
    let Some(merged) = merge(&syllables[first..=last]) else {
        return false;
    };
    syllables.splice(first..=last, std::iter::once(merged));
    true
}

/// Absolute span of every character of the line.
pub fn char_spans(line: &Line) -> Vec<CharSpan> {
    char_spans_with(line, line.syllables.as_deref())
}

fn char_spans_with(line: &Line, syllables: Option<&[Syllable]>) -> Vec<CharSpan> {
    let len = line.char_count();
    if len == 0 {
        return Vec::new();
    }

    let slot = line.duration() / len as f64;
    let mut spans: Vec<CharSpan> = (0..len)
        .map(|i| CharSpan {
            start: line.start_time + i as f64 * slot,
            end: line.start_time + (i + 1) as f64 * slot,
        })
        .collect();

    for syllable in syllables.unwrap_or(&[]) {
        let count = syllable.char_len();
        if count == 0 {
            continue;
        }
        let per_char = syllable.duration / count as f64;
        let base = line.start_time + syllable.start_offset;
        for (i, index) in (syllable.char_start..syllable.char_end.min(len)).enumerate() {
            spans[index] = CharSpan {
                start: base + i as f64 * per_char,
                end: base + (i + 1) as f64 * per_char,
            };
        }
    }

    spans
}

/// Which character is active at time `t`, and how far through it.
///
/// Returns `None` outside `[start_time, end_time)` and before the first
/// character starts. During a pause the last finished character is reported
/// with progress `1.0`.
pub fn char_progress(line: &Line, syllables: Option<&[Syllable]>, t: f64) -> Option<CharProgress> {
    if !line.contains(t) {
        return None;
    }
    let spans = char_spans_with(line, syllables);

    if let Some(index) = spans.iter().position(|s| t >= s.start && t < s.end) {
        let span = spans[index];
        let width = span.end - span.start;
        let progress = if width > 0.0 {
            ((t - span.start) / width).clamp(0.0, 1.0)
        } else {
            1.0
        };
        return Some(CharProgress { index, progress });
    }

    spans
        .iter()
        .enumerate()
        .filter(|(_, s)| s.end <= t)
        .map(|(index, _)| index)
        .max()
        .map(|index| CharProgress {
            index,
            progress: 1.0,
        })
}

/// Fraction of the line's characters already sung at `t`, in `[0, 1]`.
pub fn line_fill(line: &Line, t: f64) -> f64 {
    let len = line.char_count();
    if len == 0 || t < line.start_time {
        return 0.0;
    }
    if t >= line.end_time {
        return 1.0;
    }
    match char_progress(line, line.syllables.as_deref(), t) {
        Some(CharProgress { index, progress }) => (index as f64 + progress) / len as f64,
        None => 0.0,
    }
}
