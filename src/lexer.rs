//! Lexer for the karaoke tag micro-syntax.
//!
//! Source text interleaves duration tags with literal lyric runs:
//!
//! ```text
//! {\k25}Hel{\kf30}lo {\K12}world
//! ```
//!
//! A brace group whose whole body is one duration tag (`\k<N>`, `\kf<N>` or
//! `\K<N>`, N in hundredths of a second) becomes a [`Token::Tag`]. Every other
//! brace group is an unrelated inline override and is dropped; literal text on
//! both sides of a dropped group is merged into one [`Token::Text`].

use crate::error::KaraError;
use serde::{Deserialize, Serialize};

/// Which duration tag spelling was used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TagKind {
    /// `\k` - instant highlight
    #[default]
    #[serde(rename = "k")]
    K,
    /// `\kf` - sweeping fill
    #[serde(rename = "kf")]
    Kf,
    /// `\K` - sweeping fill (legacy spelling)
    #[serde(rename = "K")]
    UpperK,
}

impl TagKind {
    pub fn as_str(self) -> &'static str {
        match self {
            TagKind::K => "k",
            TagKind::Kf => "kf",
            TagKind::UpperK => "K",
        }
    }
}

/// Token types for tagged lyric text
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// A duration tag, value in hundredths of a second.
    Tag { kind: TagKind, centis: u32 },
    /// A literal run of lyric text.
    Text(String),
}

impl Token {
    /// Tag value in seconds, `None` for text.
    pub fn seconds(&self) -> Option<f64> {
        match self {
            Token::Tag { centis, .. } => Some(*centis as f64 / 100.0),
            Token::Text(_) => None,
        }
    }
}

/// A token with its position (code point index) in the source
#[derive(Debug, Clone, PartialEq)]
pub struct LocatedToken {
    pub token: Token,
    pub position: usize,
}

/// Lexer for tagged lyric text
pub struct Lexer<'a> {
    chars: std::iter::Peekable<std::str::Chars<'a>>,
    position: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            chars: input.chars().peekable(),
            position: 0,
        }
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.chars.next()?;
        self.position += 1;
        Some(c)
    }

    fn peek(&mut self) -> Option<&char> {
        self.chars.peek()
    }

    pub fn tokenize(&mut self) -> Result<Vec<LocatedToken>, KaraError> {
        let mut tokens: Vec<LocatedToken> = Vec::new();

        while let Some(&c) = self.peek() {
            let position = self.position;

            if c == '{' {
                self.advance();
                let body = self.read_group_body(position)?;
                if let Some(token) = parse_duration_tag(&body, position)? {
                    tokens.push(LocatedToken { token, position });
                }
                continue;
            }

            let text = self.read_text();
            match tokens.last_mut() {
                // Text split by a dropped override group joins back up.
                Some(LocatedToken {
                    token: Token::Text(prev),
                    ..
                }) => prev.push_str(&text),
                _ => tokens.push(LocatedToken {
                    token: Token::Text(text),
                    position,
                }),
            }
        }

        Ok(tokens)
    }

    fn read_group_body(&mut self, open_position: usize) -> Result<String, KaraError> {
        let mut body = String::new();
        loop {
            match self.advance() {
                Some('}') => return Ok(body),
                Some(c) => body.push(c),
                None => {
                    return Err(KaraError::ParseError {
                        position: open_position,
                        message: "Unterminated tag group, expected '}'".to_string(),
                    })
                }
            }
        }
    }

    fn read_text(&mut self) -> String {
        let mut text = String::new();
        while let Some(&c) = self.peek() {
            if c == '{' {
                break;
            }
            text.push(c);
            self.advance();
        }
        text
    }
}

/// Recognize a brace group body as a duration tag.
///
/// Returns `Ok(None)` for any group that is not exactly one duration tag.
fn parse_duration_tag(body: &str, position: usize) -> Result<Option<Token>, KaraError> {
    let body = body.trim();
    let Some(rest) = body.strip_prefix('\\') else {
        return Ok(None);
    };

    let (kind, digits) = if let Some(d) = rest.strip_prefix("kf") {
        (TagKind::Kf, d)
    } else if let Some(d) = rest.strip_prefix('k') {
        (TagKind::K, d)
    } else if let Some(d) = rest.strip_prefix('K') {
        (TagKind::UpperK, d)
    } else {
        return Ok(None);
    };

    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Ok(None);
    }

    let centis = digits.parse::<u32>().map_err(|_| KaraError::ParseError {
        position,
        message: format!("Tag value '{}' is too large", digits),
    })?;

    Ok(Some(Token::Tag { kind, centis }))
}

/// Tokenize a tagged source string.
pub fn tokenize(source: &str) -> Result<Vec<LocatedToken>, KaraError> {
    Lexer::new(source).tokenize()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<Token> {
        tokenize(source).unwrap().into_iter().map(|t| t.token).collect()
    }

    #[test]
    fn test_lex_all_tag_spellings() {
        assert_eq!(
            kinds(r"{\k10}a{\kf20}b{\K30}c"),
            vec![
                Token::Tag { kind: TagKind::K, centis: 10 },
                Token::Text("a".to_string()),
                Token::Tag { kind: TagKind::Kf, centis: 20 },
                Token::Text("b".to_string()),
                Token::Tag { kind: TagKind::UpperK, centis: 30 },
                Token::Text("c".to_string()),
            ]
        );
    }

    #[test]
    fn test_unrelated_groups_are_stripped_and_text_merged() {
        assert_eq!(
            kinds(r"{\k50}Hel{\b1}lo{\ko20}"),
            vec![
                Token::Tag { kind: TagKind::K, centis: 50 },
                Token::Text("Hello".to_string()),
            ]
        );
    }

    #[test]
    fn test_combined_override_group_is_not_a_duration_tag() {
        assert_eq!(kinds(r"{\k20\b1}x"), vec![Token::Text("x".to_string())]);
        assert_eq!(kinds(r"{\k}x"), vec![Token::Text("x".to_string())]);
    }

    #[test]
    fn test_positions_count_code_points() {
        let tokens = tokenize(r"阳光{\k5}").unwrap();
        assert_eq!(tokens[0].position, 0);
        assert_eq!(tokens[1].position, 2);
        assert_eq!(tokens[1].token.seconds(), Some(0.05));
    }

    #[test]
    fn test_unterminated_group_is_an_error() {
        match tokenize(r"ab{\k10") {
            Err(KaraError::ParseError { position, .. }) => assert_eq!(position, 2),
            other => panic!("expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_oversized_value_is_an_error() {
        assert!(tokenize(r"{\k99999999999}a").is_err());
    }

    #[test]
    fn test_plain_text_is_one_token() {
        assert_eq!(kinds("plain"), vec![Token::Text("plain".to_string())]);
        assert!(kinds("").is_empty());
    }
}
