//! Decoder from tagged lyric text to syllables.
//!
//! The parser walks the lexer's token stream with two pieces of state: the
//! running time offset and the duration waiting for the next text run.
//!
//! - A tag followed by another tag (or the end of input) is a pause. Its value
//!   moves the running offset forward and creates no syllable.
//! - A tag followed by text supplies that text's duration.
//! - Text becomes one syllable at the running offset, using the pending
//!   duration (0.1s when none was given), then moves the offset forward.
//!
//! Input with no duration tags at all carries no timing; decoding returns
//! `None` and the caller decides whether to auto-split.

use crate::error::KaraError;
use crate::lexer::{tokenize, LocatedToken, Token};
use crate::model::{Line, Syllable};
use tracing::{debug, warn};

/// Duration given to a text run that no tag timed.
pub const DEFAULT_TEXT_DURATION: f64 = 0.1;

/// Plain text and syllables recovered from a tagged source.
#[derive(Debug, Clone, PartialEq)]
pub struct TaggedText {
    pub text: String,
    pub syllables: Option<Vec<Syllable>>,
}

/// Parser state: whether a tag value is waiting for its text.
#[derive(Debug, Clone, Copy, PartialEq)]
enum State {
    Ready,
    Pending(f64),
}

/// Parser over a tagged-text token stream
pub struct Parser {
    tokens: Vec<LocatedToken>,
    position: usize,
    default_duration: f64,
}

impl Parser {
    pub fn new(tokens: Vec<LocatedToken>) -> Self {
        Self {
            tokens,
            position: 0,
            default_duration: DEFAULT_TEXT_DURATION,
        }
    }

    pub fn with_default_duration(mut self, seconds: f64) -> Self {
        self.default_duration = seconds;
        self
    }

    fn advance(&mut self) -> Option<&LocatedToken> {
        let token = self.tokens.get(self.position);
        self.position += 1;
        token
    }

    fn next_is_text(&self) -> bool {
        matches!(
            self.tokens.get(self.position),
            Some(LocatedToken {
                token: Token::Text(_),
                ..
            })
        )
    }

    pub fn parse(mut self) -> TaggedText {
        let has_tags = self
            .tokens
            .iter()
            .any(|t| matches!(t.token, Token::Tag { .. }));

        let mut text = String::new();
        let mut syllables = Vec::new();
        let mut char_cursor = 0usize;
        let mut offset = 0.0f64;
        let mut state = State::Ready;

        while let Some(located) = self.advance().cloned() {
            match located.token {
                Token::Tag { .. } => {
                    let seconds = located.token.seconds().unwrap_or(0.0);
                    state = if self.next_is_text() {
                        State::Pending(seconds)
                    } else {
                        offset += seconds;
                        State::Ready
                    };
                }
                Token::Text(run) => {
                    let duration = match state {
                        State::Pending(d) => d,
                        State::Ready => self.default_duration,
                    };
                    let len = run.chars().count();
                    syllables.push(Syllable::new(
                        run.clone(),
                        offset,
                        duration,
                        char_cursor,
                        char_cursor + len,
                    ));
                    text.push_str(&run);
                    char_cursor += len;
                    offset += duration;
                    state = State::Ready;
                }
            }
        }

        TaggedText {
            text,
            syllables: has_tags.then_some(syllables),
        }
    }
}

/// Decode tagged text into plain text and syllables.
///
/// `syllables` is `None` when the source contains no duration tags.
///
/// # Example
/// ```
/// let decoded = kara::decode(r"{\kf130}{\kf10}阳{\kf29}{\kf12}光").unwrap();
/// assert_eq!(decoded.text, "阳光");
/// let syllables = decoded.syllables.unwrap();
/// assert!((syllables[1].start_offset - 1.69).abs() < 1e-9);
/// ```
pub fn decode(source: &str) -> Result<TaggedText, KaraError> {
    let tokens = tokenize(source)?;
    Ok(Parser::new(tokens).parse())
}

/// Decode with a custom duration for untimed text runs.
pub fn decode_with_default(source: &str, default_duration: f64) -> Result<TaggedText, KaraError> {
    let tokens = tokenize(source)?;
    Ok(Parser::new(tokens)
        .with_default_duration(default_duration)
        .parse())
}

/// Build a line from tagged source.
///
/// Malformed tag syntax does not fail the line: the problem is logged once
/// and the line comes back with its braces stripped and no syllable data.
pub fn decode_line(source: &str, start_time: f64, end_time: f64) -> Line {
    match decode(source) {
        Ok(TaggedText { text, syllables }) => {
            debug!(
                syllables = syllables.as_ref().map(|s| s.len()).unwrap_or(0),
                "decoded tagged line"
            );
            Line {
                syllables,
                ..Line::new(text, start_time, end_time)
            }
        }
        Err(e) => {
            warn!("falling back to untimed line: {}", e);
            Line::new(strip_braces(source), start_time, end_time)
        }
    }
}

/// Remove everything that looks like a brace group, including an unclosed
/// trailing one.
fn strip_braces(source: &str) -> String {
    let mut out = String::new();
    let mut depth = 0usize;
    for c in source.chars() {
        match c {
            '{' => depth += 1,
            '}' if depth > 0 => depth -= 1,
            _ if depth == 0 => out.push(c),
            _ => {}
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_decode_pauses_accumulate_into_offset() {
        let decoded = decode(r"{\kf130}{\kf10}阳{\kf29}{\kf12}光").unwrap();
        let syllables = decoded.syllables.unwrap();
        assert_eq!(syllables.len(), 2);

        assert_eq!(syllables[0].text, "阳");
        assert!(approx(syllables[0].start_offset, 1.30));
        assert!(approx(syllables[0].duration, 0.10));
        assert_eq!((syllables[0].char_start, syllables[0].char_end), (0, 1));

        assert_eq!(syllables[1].text, "光");
        assert!(approx(syllables[1].start_offset, 1.69));
        assert!(approx(syllables[1].duration, 0.12));
        assert_eq!((syllables[1].char_start, syllables[1].char_end), (1, 2));
    }

    #[test]
    fn test_decode_multi_char_runs() {
        let decoded = decode(r"{\k50}Hel{\k25}lo").unwrap();
        assert_eq!(decoded.text, "Hello");
        let syllables = decoded.syllables.unwrap();
        assert_eq!((syllables[0].char_start, syllables[0].char_end), (0, 3));
        assert_eq!((syllables[1].char_start, syllables[1].char_end), (3, 5));
        assert!(approx(syllables[1].start_offset, 0.5));
    }

    #[test]
    fn test_untimed_text_uses_default_duration() {
        let decoded = decode(r"ab{\k30}c").unwrap();
        let syllables = decoded.syllables.unwrap();
        assert!(approx(syllables[0].duration, DEFAULT_TEXT_DURATION));
        assert!(approx(syllables[1].start_offset, 0.1));
        assert!(approx(syllables[1].duration, 0.3));
    }

    #[test]
    fn test_custom_default_duration() {
        let decoded = decode_with_default(r"ab{\k30}c", 0.25).unwrap();
        assert!(approx(decoded.syllables.unwrap()[0].duration, 0.25));
    }

    #[test]
    fn test_trailing_tag_is_a_pause() {
        let decoded = decode(r"{\k10}a{\k40}").unwrap();
        assert_eq!(decoded.syllables.unwrap().len(), 1);
    }

    #[test]
    fn test_no_tags_means_no_syllables() {
        let decoded = decode(r"plain {\b1}text").unwrap();
        assert_eq!(decoded.text, "plain text");
        assert_eq!(decoded.syllables, None);
    }

    #[test]
    fn test_decode_line_degrades_on_bad_syntax() {
        let line = decode_line(r"{\k10}ab{\k20", 1.0, 2.0);
        assert_eq!(line.text, "ab");
        assert!(line.syllables.is_none());
        assert_eq!(line.start_time, 1.0);
    }
}
