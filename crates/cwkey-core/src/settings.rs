//! Validated audio and keyer configuration.

use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigError;

pub const DEFAULT_SAMPLE_RATE_HZ: f64 = 48_000.0;
pub const DEFAULT_TONE_FREQ_HZ: f64 = 700.0;
pub const DEFAULT_GAIN: f32 = 0.01;
pub const MAX_GAIN: f32 = 0.2;
pub const DEFAULT_WPM: f64 = 20.0;

/// Straight key or iambic paddle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeyerMode {
    #[default]
    Straight,
    Iambic,
}

impl FromStr for KeyerMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "straight" => Ok(KeyerMode::Straight),
            "iambic" => Ok(KeyerMode::Iambic),
            _ => Err(ConfigError::UnknownMode(s.to_string())),
        }
    }
}

impl std::fmt::Display for KeyerMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            KeyerMode::Straight => write!(f, "Straight"),
            KeyerMode::Iambic => write!(f, "Iambic"),
        }
    }
}

/// Render-path configuration. Only changed while the stream is stopped.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AudioConfig {
    pub sample_rate_hz: f64,
    pub tone_freq_hz: f64,
    pub gain: f32,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate_hz: DEFAULT_SAMPLE_RATE_HZ,
            tone_freq_hz: DEFAULT_TONE_FREQ_HZ,
            gain: DEFAULT_GAIN,
        }
    }
}

impl AudioConfig {
    /// Build a config, validating every field.
    pub fn new(sample_rate_hz: f64, tone_freq_hz: f64, gain: f32) -> Result<Self, ConfigError> {
        Ok(Self {
            sample_rate_hz: validate_sample_rate(sample_rate_hz)?,
            tone_freq_hz: validate_frequency(tone_freq_hz)?,
            gain: validate_gain(gain)?,
        })
    }
}

/// Keyer configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KeyerConfig {
    pub mode: KeyerMode,
    pub wpm: f64,
}

impl Default for KeyerConfig {
    fn default() -> Self {
        Self {
            mode: KeyerMode::Straight,
            wpm: DEFAULT_WPM,
        }
    }
}

impl KeyerConfig {
    /// Dit duration, PARIS timing: 1.2 / WPM seconds, rounded to the microsecond.
    pub fn dit_duration(&self) -> Duration {
        dit_duration(self.wpm)
    }
}

pub fn dit_duration(wpm: f64) -> Duration {
    Duration::from_micros(dit_micros(wpm).max(1))
}

fn dit_micros(wpm: f64) -> u64 {
    (1_200_000.0 / wpm).round() as u64
}

fn positive(value: f64) -> bool {
    value.is_finite() && value > 0.0
}

pub fn validate_frequency(hz: f64) -> Result<f64, ConfigError> {
    if positive(hz) {
        Ok(hz)
    } else {
        Err(ConfigError::InvalidFrequency(hz))
    }
}

/// Speed must be positive and slow enough that a dit lasts at least 1 µs.
pub fn validate_wpm(wpm: f64) -> Result<f64, ConfigError> {
    if positive(wpm) && dit_micros(wpm) > 0 {
        Ok(wpm)
    } else {
        Err(ConfigError::InvalidWpm(wpm))
    }
}

pub fn validate_gain(gain: f32) -> Result<f32, ConfigError> {
    if (0.0..=MAX_GAIN).contains(&gain) {
        Ok(gain)
    } else {
        Err(ConfigError::InvalidGain(gain))
    }
}

pub fn validate_sample_rate(hz: f64) -> Result<f64, ConfigError> {
    if positive(hz) {
        Ok(hz)
    } else {
        Err(ConfigError::InvalidSampleRate(hz))
    }
}
