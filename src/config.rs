//! Engine configuration.
//!
//! Configuration is written as YAML with kebab-case keys. Every key is
//! optional; missing keys take the defaults below.
//!
//! ```yaml
//! default-tag-duration: 0.1     # seconds given to untimed text runs
//! hold-threshold-ms: 200        # press length that turns a tap into a block drag
//! scrub-tolerance: 0.2          # seconds outside the line before resyncing
//! loop-mode: false              # replay the current line instead of advancing
//! tag-kind: kf                  # k | kf | K, used when encoding
//! waveform-buckets-per-second: 100
//! fft-size: 512                 # power of two
//! hop-size: 128
//! ```

use crate::error::KaraError;
use crate::lexer::TagKind;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Raw configuration for YAML deserialization
#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct RawConfig {
    default_tag_duration: Option<f64>,
    hold_threshold_ms: Option<u64>,
    scrub_tolerance: Option<f64>,
    loop_mode: Option<bool>,
    tag_kind: Option<TagKind>,
    waveform_buckets_per_second: Option<u32>,
    fft_size: Option<usize>,
    hop_size: Option<usize>,
}

/// Validated engine settings.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub default_tag_duration: f64,
    pub hold_threshold: Duration,
    pub scrub_tolerance: f64,
    pub loop_mode: bool,
    pub tag_kind: TagKind,
    pub waveform_buckets_per_second: u32,
    pub fft_size: usize,
    pub hop_size: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_tag_duration: 0.1,
            hold_threshold: Duration::from_millis(200),
            scrub_tolerance: 0.2,
            loop_mode: false,
            tag_kind: TagKind::K,
            waveform_buckets_per_second: 100,
            fft_size: 512,
            hop_size: 128,
        }
    }
}

impl EngineConfig {
    /// Parse YAML configuration text.
    pub fn from_yaml(content: &str) -> Result<Self, KaraError> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let raw: RawConfig =
            serde_yaml::from_str(content).map_err(|e| KaraError::ConfigError(e.to_string()))?;

        let defaults = Self::default();

        let config = Self {
            default_tag_duration: raw
                .default_tag_duration
                .unwrap_or(defaults.default_tag_duration),
            hold_threshold: raw
                .hold_threshold_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.hold_threshold),
            scrub_tolerance: raw.scrub_tolerance.unwrap_or(defaults.scrub_tolerance),
            loop_mode: raw.loop_mode.unwrap_or(defaults.loop_mode),
            tag_kind: raw.tag_kind.unwrap_or(defaults.tag_kind),
            waveform_buckets_per_second: raw
                .waveform_buckets_per_second
                .unwrap_or(defaults.waveform_buckets_per_second),
            fft_size: raw.fft_size.unwrap_or(defaults.fft_size),
            hop_size: raw.hop_size.unwrap_or(defaults.hop_size),
        };
        config.check()?;
        Ok(config)
    }

    /// Read and parse a YAML configuration file.
    pub fn load(path: &Path) -> Result<Self, KaraError> {
        let content = std::fs::read_to_string(path).map_err(|source| KaraError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&content)
    }

    fn check(&self) -> Result<(), KaraError> {
        if !(self.default_tag_duration > 0.0) {
            return Err(KaraError::ConfigError(format!(
                "default-tag-duration must be positive, got {}",
                self.default_tag_duration
            )));
        }
        if self.scrub_tolerance < 0.0 {
            return Err(KaraError::ConfigError(format!(
                "scrub-tolerance cannot be negative, got {}",
                self.scrub_tolerance
            )));
        }
        if self.waveform_buckets_per_second == 0 {
            return Err(KaraError::ConfigError(
                "waveform-buckets-per-second must be at least 1".to_string(),
            ));
        }
        if self.fft_size < 2 || !self.fft_size.is_power_of_two() {
            return Err(KaraError::ConfigError(format!(
                "fft-size must be a power of two, got {}",
                self.fft_size
            )));
        }
        if self.hop_size == 0 {
            return Err(KaraError::ConfigError("hop-size must be at least 1".to_string()));
        }
        Ok(())
    }
}
