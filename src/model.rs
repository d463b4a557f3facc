//! # Interval Model
//!
//! Data types for the karaoke time model.
//!
//! ## Type Hierarchy
//! ```text
//! Line (text, start_time, end_time)
//!   ├── syllables: Option<Vec<Syllable>>
//!   │     └── Syllable (text, start_offset, duration, char_start..char_end)
//!   └── char_customizations: Option<BTreeMap<char index, JSON object>>
//! ```
//!
//! ## Key Concepts
//!
//! ### Code point indexing
//! `Line::text` is indexed by code point, never by byte, so `char_start` and
//! `char_end` stay meaningful for CJK and other multi-byte scripts.
//!
//! ### Relative syllable time
//! `Syllable::start_offset` is relative to `Line::start_time`. Absolute time of
//! a syllable is `line.start_time + syllable.start_offset`.
//!
//! ### Derived characters
//! Character timing is never stored. See `derive` for the functions that
//! compute it from syllables (or from an even split of the line when no
//! syllable covers a character).

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Shortest duration any syllable may have, in seconds.
pub const MIN_SYLLABLE_DURATION: f64 = 0.05;

/// Tolerance used when comparing floating point times.
pub const TIME_EPSILON: f64 = 1e-9;

/// One displayed lyric sentence with its overall time span.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Line {
    pub text: String,
    pub start_time: f64,
    pub end_time: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub syllables: Option<Vec<Syllable>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub char_customizations: Option<BTreeMap<usize, serde_json::Value>>,
}

impl Line {
    pub fn new(text: impl Into<String>, start_time: f64, end_time: f64) -> Self {
        Self {
            text: text.into(),
            start_time,
            end_time,
            syllables: None,
            char_customizations: None,
        }
    }

    pub fn with_syllables(mut self, syllables: Vec<Syllable>) -> Self {
        self.syllables = Some(syllables);
        self
    }

    pub fn duration(&self) -> f64 {
        self.end_time - self.start_time
    }

    /// Number of code points in the text.
    pub fn char_count(&self) -> usize {
        self.text.chars().count()
    }

    /// Text of the code point range `[start, end)`.
    pub fn char_slice(&self, start: usize, end: usize) -> String {
        self.text
            .chars()
            .skip(start)
            .take(end.saturating_sub(start))
            .collect()
    }

    /// Syllables, treating "absent" and "empty" the same.
    pub fn syllables(&self) -> &[Syllable] {
        self.syllables.as_deref().unwrap_or(&[])
    }

    pub fn has_syllables(&self) -> bool {
        !self.syllables().is_empty()
    }

    /// Mutable syllable vector, created on demand.
    pub fn syllables_mut(&mut self) -> &mut Vec<Syllable> {
        self.syllables.get_or_insert_with(Vec::new)
    }

    /// Whether `t` is inside `[start_time, end_time)`.
    pub fn contains(&self, t: f64) -> bool {
        t >= self.start_time && t < self.end_time
    }

    /// Index into `syllables()` of the syllable claiming character `index`.
    pub fn syllable_index_for_char(&self, index: usize) -> Option<usize> {
        self.syllables()
            .iter()
            .position(|s| s.char_start <= index && index < s.char_end)
    }
}

/// A sub-span of a line's text with its own timing.
///
/// # Fields
/// - `text`: the code points `char_start..char_end` of the line text
/// - `start_offset`: seconds from the line start
/// - `duration`: seconds, at least [`MIN_SYLLABLE_DURATION`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Syllable {
    pub text: String,
    pub duration: f64,
    pub start_offset: f64,
    pub char_start: usize,
    pub char_end: usize,
}

impl Syllable {
    pub fn new(
        text: impl Into<String>,
        start_offset: f64,
        duration: f64,
        char_start: usize,
        char_end: usize,
    ) -> Self {
        Self {
            text: text.into(),
            duration,
            start_offset,
            char_start,
            char_end,
        }
    }

    /// End of the syllable relative to the line start.
    pub fn end_offset(&self) -> f64 {
        self.start_offset + self.duration
    }

    pub fn char_len(&self) -> usize {
        self.char_end.saturating_sub(self.char_start)
    }

    pub fn absolute_start(&self, line: &Line) -> f64 {
        line.start_time + self.start_offset
    }

    pub fn absolute_end(&self, line: &Line) -> f64 {
        line.start_time + self.end_offset()
    }
}

/// Insert `syllable` keeping the vector sorted by `char_start`.
pub(crate) fn insert_sorted(syllables: &mut Vec<Syllable>, syllable: Syllable) {
    let at = syllables.partition_point(|s| s.char_start < syllable.char_start);
    syllables.insert(at, syllable);
}
