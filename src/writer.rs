//! Encoder from syllables back to tagged lyric text.
//!
//! Each syllable becomes one duration tag followed by its literal text. Silence
//! before a syllable (between the previous syllable's end and this syllable's
//! start, or before the first one) becomes a separate pause tag.
//!
//! Every syllable boundary is rounded to hundredths of a second at its absolute
//! position and durations are the differences between rounded boundaries, so
//! rounding error never accumulates along a line.

use crate::derive::auto_split;
use crate::lexer::TagKind;
use crate::model::{Line, Syllable};
use std::fmt::Write;

fn to_centis(seconds: f64) -> u64 {
    (seconds * 100.0).round().max(0.0) as u64
}

fn push_tag(out: &mut String, kind: TagKind, centis: u64) {
    let _ = write!(out, "{{\\{}{}}}", kind.as_str(), centis);
}

/// Encode syllables with `\k` tags.
///
/// # Example
/// ```
/// use kara::{encode, Syllable};
///
/// let syllables = vec![
///     Syllable::new("H", 0.5, 0.7, 0, 1),
///     Syllable::new("i", 1.2, 0.8, 1, 2),
/// ];
/// assert_eq!(encode(&syllables), r"{\k50}{\k70}H{\k80}i");
/// ```
pub fn encode(syllables: &[Syllable]) -> String {
    encode_with(syllables, TagKind::K)
}

/// Encode syllables with the given tag spelling.
pub fn encode_with(syllables: &[Syllable], kind: TagKind) -> String {
    let mut sorted: Vec<&Syllable> = syllables.iter().collect();
    sorted.sort_by_key(|s| s.char_start);

    let mut out = String::new();
    let mut cursor = 0u64;
    for syllable in sorted {
        let start = to_centis(syllable.start_offset);
        if start > cursor {
            push_tag(&mut out, kind, start - cursor);
            cursor = start;
        }
        let end = to_centis(syllable.end_offset()).max(cursor);
        push_tag(&mut out, kind, end - cursor);
        out.push_str(&syllable.text);
        cursor = end;
    }
    out
}

/// Encode a whole line.
///
/// A line without syllables is auto-split first. Characters that no syllable
/// covers are written as zero-length syllables so the text survives a
/// decode without shifting the timing of the rest of the line.
pub fn encode_line(line: &Line, kind: TagKind) -> String {
    if !line.has_syllables() {
        return encode_with(&auto_split(line), kind);
    }

    let chars: Vec<char> = line.text.chars().collect();
    let mut sorted: Vec<&Syllable> = line.syllables().iter().collect();
    sorted.sort_by_key(|s| s.char_start);

    let mut filled: Vec<Syllable> = Vec::with_capacity(sorted.len());
    let mut next_char = 0usize;
    let mut last_end = 0.0f64;
    for syllable in sorted {
        if syllable.char_start > next_char {
            filled.push(gap_syllable(&chars, next_char, syllable.char_start, last_end));
        }
        filled.push(syllable.clone());
        next_char = next_char.max(syllable.char_end);
        last_end = last_end.max(syllable.end_offset());
    }
    if next_char < chars.len() {
        filled.push(gap_syllable(&chars, next_char, chars.len(), last_end));
    }

    encode_with(&filled, kind)
}

fn gap_syllable(chars: &[char], start: usize, end: usize, at: f64) -> Syllable {
    let text: String = chars[start..end].iter().collect();
    Syllable::new(text, at, 0.0, start, end)
}
