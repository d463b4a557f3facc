pub mod audio;
pub mod config;
pub mod derive;
pub mod error;
pub mod lexer;
pub mod locator;
pub mod model;
pub mod parser;
pub mod timing;
pub mod validate;
pub mod writer;

pub use config::EngineConfig;
pub use error::*;
pub use lexer::TagKind;
pub use locator::{active_line_index, LineLocator};
pub use model::{Line, Syllable, MIN_SYLLABLE_DURATION};
pub use parser::{decode, decode_line, TaggedText};
pub use validate::validate;
pub use writer::{encode, encode_line, encode_with};

/// Decode a tagged line and check it against the interval model.
/// This is the main entry point for loading timed lyrics.
pub fn load_line(source: &str, start_time: f64, end_time: f64) -> Result<Line, KaraError> {
    let TaggedText { text, syllables } = decode(source)?;
    let line = Line {
        syllables,
        ..Line::new(text, start_time, end_time)
    };
    validate(std::slice::from_ref(&line))?;
    Ok(line)
}

/// Decode without validation (useful for sources with zero-length tags)
pub fn load_line_unchecked(source: &str, start_time: f64, end_time: f64) -> Result<Line, KaraError> {
    let TaggedText { text, syllables } = decode(source)?;
    Ok(Line {
        syllables,
        ..Line::new(text, start_time, end_time)
    })
}
