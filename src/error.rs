//! # Error Types
//!
//! This module defines all error types for the kara timing engine.
//!
//! Errors carry enough location information (character position in a tagged
//! source, line index, audio source identity) to point the user at the
//! offending input.
//!
//! ## Error Types
//! - `ParseError` - Malformed karaoke tag syntax, with the character position
//! - `ConfigError` - Invalid YAML engine configuration
//! - `Validation` - A line or syllable violates the interval model
//! - `Audio` - Audio could not be decoded or analysed
//! - `Io` - Reading a file failed
//! - `Json` - A line document could not be read or written as JSON
//!
//! Interactive edits never produce errors: out-of-range marks, undos and drags
//! are clamped or ignored instead.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum KaraError {
    /// Malformed tag syntax.
    ///
    /// `position` is the code point index into the tagged source.
    ///
    /// # Example
    /// ```
    /// # use kara::KaraError;
    /// let err = KaraError::ParseError {
    ///     position: 4,
    ///     message: "Unterminated tag group".to_string(),
    /// };
    /// assert_eq!(err.to_string(), "Parse error at position 4: Unterminated tag group");
    /// ```
    #[error("Parse error at position {position}: {message}")]
    ParseError { position: usize, message: String },

    /// Invalid engine configuration.
    #[error("Invalid config: {0}")]
    ConfigError(String),

    /// A line violates the interval model.
    #[error("Validation error at line {line}: {message}")]
    Validation { line: usize, message: String },

    /// Audio decoding or feature extraction failed for a source.
    #[error("Audio error for '{source_id}': {message}")]
    Audio { source_id: String, message: String },

    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl KaraError {
    pub(crate) fn audio(source_id: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Self::Audio {
            source_id: source_id.into(),
            message: message.to_string(),
        }
    }
}
