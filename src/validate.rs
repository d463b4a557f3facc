//! # Interval Validation
//!
//! Checks a line and its syllables against the interval model. Validation
//! only reports; it never repairs data.
//!
//! ## Rules
//!
//! ### Line span
//! - `start_time < end_time`
//!
//! ### Syllable ranges
//! - `char_start < char_end <= text length` (code points)
//! - syllable text equals the line text slice it claims
//! - no character is claimed by two syllables
//!
//! ### Syllable timing
//! - `duration >= 0.05`, `start_offset >= 0`
//! - `start_offset + duration <= line duration`
//! - sorted by `char_start`, start offsets never decrease and syllables never
//!   overlap in time (gaps are allowed)
//!
//! ### Customizations
//! - every `char_customizations` key is a valid character index
//!
//! ## Entry Points
//! - `validate_line(&Line) -> Vec<Violation>`
//! - `validate_lines(&[Line]) -> Vec<LineViolation>`
//! - `validate(&[Line]) -> Result<(), KaraError>`

use crate::error::KaraError;
use crate::model::{Line, Syllable, MIN_SYLLABLE_DURATION, TIME_EPSILON};
use thiserror::Error;

/// A single broken invariant.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Violation {
    #[error("line span is empty or inverted ({start} >= {end})")]
    EmptySpan { start: f64, end: f64 },

    #[error("syllable {syllable} has an empty character range {char_start}..{char_end}")]
    EmptyCharRange {
        syllable: usize,
        char_start: usize,
        char_end: usize,
    },

    #[error("syllable {syllable} ends at character {char_end} but the text has {len}")]
    CharRangeOutOfBounds {
        syllable: usize,
        char_end: usize,
        len: usize,
    },

    #[error("syllable {syllable} text '{found}' does not match line text '{expected}'")]
    TextMismatch {
        syllable: usize,
        expected: String,
        found: String,
    },

    #[error("syllable {syllable} duration {duration} is below the minimum")]
    DurationTooShort { syllable: usize, duration: f64 },

    #[error("syllable {syllable} has negative start offset {start_offset}")]
    NegativeOffset { syllable: usize, start_offset: f64 },

    #[error("syllable {syllable} ends at {end} past the line duration {line_duration}")]
    PastLineEnd {
        syllable: usize,
        end: f64,
        line_duration: f64,
    },

    #[error("character {index} is claimed by syllables {first} and {second}")]
    CharClaimedTwice {
        index: usize,
        first: usize,
        second: usize,
    },

    #[error("syllable {syllable} starts before the syllable preceding it")]
    OffsetsOutOfOrder { syllable: usize },

    #[error("syllable {syllable} overlaps the preceding syllable in time")]
    TimeOverlap { syllable: usize },

    #[error("character customization key {index} is outside the text")]
    CustomizationOutOfRange { index: usize },
}

/// A violation tagged with the index of the line it was found in.
#[derive(Debug, Clone, PartialEq)]
pub struct LineViolation {
    pub line: usize,
    pub violation: Violation,
}

/// Collect every violation on a single line.
///
/// Syllable indices in the result refer to the order after sorting by
/// `char_start`.
pub fn validate_line(line: &Line) -> Vec<Violation> {
    let mut violations = Vec::new();
    let line_duration = line.duration();

    if line_duration <= 0.0 {
        violations.push(Violation::EmptySpan {
            start: line.start_time,
            end: line.end_time,
        });
    }

    let len = line.char_count();
    let mut sorted: Vec<&Syllable> = line.syllables().iter().collect();
    sorted.sort_by_key(|s| s.char_start);

    for (i, syllable) in sorted.iter().enumerate() {
        check_syllable(line, i, syllable, len, line_duration, &mut violations);
    }

    // Furthest character and time reached by any earlier syllable, so a long
    // syllable is checked against every later one, not just its neighbour.
    let mut char_reach: Option<(usize, usize)> = None;
    let mut time_reach = f64::NEG_INFINITY;
    let mut latest_start = f64::NEG_INFINITY;
    for (i, syllable) in sorted.iter().enumerate() {
        if let Some((reach, owner)) = char_reach {
            if syllable.char_start < reach {
                violations.push(Violation::CharClaimedTwice {
                    index: syllable.char_start,
                    first: owner,
                    second: i,
                });
            }
        }
        if syllable.start_offset + TIME_EPSILON < latest_start {
            violations.push(Violation::OffsetsOutOfOrder { syllable: i });
        } else if syllable.start_offset + TIME_EPSILON < time_reach {
            violations.push(Violation::TimeOverlap { syllable: i });
        }

        if char_reach.map_or(true, |(reach, _)| syllable.char_end > reach) {
            char_reach = Some((syllable.char_end, i));
        }
        time_reach = time_reach.max(syllable.end_offset());
        latest_start = latest_start.max(syllable.start_offset);
    }

    if let Some(customizations) = &line.char_customizations {
        for &index in customizations.keys() {
            if index >= len {
                violations.push(Violation::CustomizationOutOfRange { index });
            }
        }
    }

    violations
}

fn check_syllable(
    line: &Line,
    i: usize,
    syllable: &Syllable,
    len: usize,
    line_duration: f64,
    violations: &mut Vec<Violation>,
) {
    if syllable.char_start >= syllable.char_end {
        violations.push(Violation::EmptyCharRange {
            syllable: i,
            char_start: syllable.char_start,
            char_end: syllable.char_end,
        });
    } else if syllable.char_end > len {
        violations.push(Violation::CharRangeOutOfBounds {
            syllable: i,
            char_end: syllable.char_end,
            len,
        });
    } else {
        let expected = line.char_slice(syllable.char_start, syllable.char_end);
        if expected != syllable.text {
            violations.push(Violation::TextMismatch {
                syllable: i,
                expected,
                found: syllable.text.clone(),
            });
        }
    }

    if syllable.duration + TIME_EPSILON < MIN_SYLLABLE_DURATION {
        violations.push(Violation::DurationTooShort {
            syllable: i,
            duration: syllable.duration,
        });
    }
    if syllable.start_offset < -TIME_EPSILON {
        violations.push(Violation::NegativeOffset {
            syllable: i,
            start_offset: syllable.start_offset,
        });
    }
    if syllable.end_offset() > line_duration + TIME_EPSILON {
        violations.push(Violation::PastLineEnd {
            syllable: i,
            end: syllable.end_offset(),
            line_duration,
        });
    }
}

/// Collect violations across many lines.
pub fn validate_lines(lines: &[Line]) -> Vec<LineViolation> {
    lines
        .iter()
        .enumerate()
        .flat_map(|(line, l)| {
            validate_line(l)
                .into_iter()
                .map(move |violation| LineViolation { line, violation })
        })
        .collect()
}

/// Fail on the first violation found.
pub fn validate(lines: &[Line]) -> Result<(), KaraError> {
    match validate_lines(lines).into_iter().next() {
        Some(LineViolation { line, violation }) => Err(KaraError::Validation {
            line,
            message: violation.to_string(),
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn two_syllable_line() -> Line {
        Line::new("Hi", 0.0, 2.0).with_syllables(vec![
            Syllable::new("H", 0.5, 0.7, 0, 1),
            Syllable::new("i", 1.2, 0.8, 1, 2),
        ])
    }

    #[test]
    fn valid_line_has_no_violations() {
        assert!(validate_line(&two_syllable_line()).is_empty());
        assert!(validate(&[two_syllable_line()]).is_ok());
    }

    #[test]
    fn line_without_syllables_is_valid() {
        assert!(validate_line(&Line::new("hello", 1.0, 3.0)).is_empty());
    }

    #[test]
    fn inverted_span_is_reported() {
        let violations = validate_line(&Line::new("a", 2.0, 1.0));
        assert!(matches!(violations[0], Violation::EmptySpan { .. }));
    }

    #[test]
    fn overlap_and_mismatch_are_reported_without_repair() {
        let mut line = two_syllable_line();
        {
            let syllables = line.syllables_mut();
            syllables[1].start_offset = 1.0;
            syllables[1].text = "x".to_string();
        }
        let before = line.clone();
        let violations = validate_line(&line);
        assert!(violations.contains(&Violation::TimeOverlap { syllable: 1 }));
        assert!(violations
            .iter()
            .any(|v| matches!(v, Violation::TextMismatch { syllable: 1, .. })));
        assert_eq!(line, before);
    }

    #[test]
    fn char_claimed_twice_is_reported() {
        let line = Line::new("abc", 0.0, 3.0).with_syllables(vec![
            Syllable::new("ab", 0.0, 1.0, 0, 2),
            Syllable::new("bc", 1.0, 1.0, 1, 3),
        ]);
        let violations = validate_line(&line);
        assert!(violations.contains(&Violation::CharClaimedTwice {
            index: 1,
            first: 0,
            second: 1
        }));
    }

    #[test]
    fn long_syllable_is_checked_against_all_later_ones() {
        let line = Line::new("abcde", 0.0, 5.0).with_syllables(vec![
            Syllable::new("abcde", 0.0, 3.0, 0, 5),
            Syllable::new("b", 1.0, 0.5, 1, 2),
            Syllable::new("d", 2.0, 0.5, 3, 4),
        ]);
        let violations = validate_line(&line);
        assert!(violations.contains(&Violation::CharClaimedTwice {
            index: 3,
            first: 0,
            second: 2
        }));
        assert!(violations.contains(&Violation::TimeOverlap { syllable: 2 }));
    }

    #[test]
    fn short_and_overlong_syllables_are_reported() {
        let line = Line::new("ab", 0.0, 1.0).with_syllables(vec![
            Syllable::new("a", 0.0, 0.01, 0, 1),
            Syllable::new("b", 0.5, 0.9, 1, 2),
        ]);
        let violations = validate_line(&line);
        assert!(violations
            .iter()
            .any(|v| matches!(v, Violation::DurationTooShort { syllable: 0, .. })));
        assert!(violations
            .iter()
            .any(|v| matches!(v, Violation::PastLineEnd { syllable: 1, .. })));
    }

    #[test]
    fn customization_keys_must_be_in_range() {
        let mut line = Line::new("ab", 0.0, 1.0);
        let mut map = std::collections::BTreeMap::new();
        map.insert(1, json!({"color": "red"}));
        map.insert(5, json!({"color": "blue"}));
        line.char_customizations = Some(map);
        assert_eq!(
            validate_line(&line),
            vec![Violation::CustomizationOutOfRange { index: 5 }]
        );
    }

    #[test]
    fn strict_gate_names_the_line() {
        let lines = vec![two_syllable_line(), Line::new("x", 5.0, 5.0)];
        match validate(&lines) {
            Err(KaraError::Validation { line, .. }) => assert_eq!(line, 1),
            other => panic!("expected validation error, got {:?}", other),
        }
    }
}
