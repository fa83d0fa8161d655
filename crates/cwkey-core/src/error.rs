/// Rejected configuration input. The previous value is always retained.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    InvalidFrequency(f64),
    InvalidWpm(f64),
    InvalidGain(f32),
    InvalidSampleRate(f64),
    UnknownMode(String),
    NoDeviceSelected,
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::InvalidFrequency(v) => {
                write!(f, "tone frequency must be a positive number (got {})", v)
            }
            ConfigError::InvalidWpm(v) => write!(f, "speed must be a positive number (got {})", v),
            ConfigError::InvalidGain(v) => {
                write!(f, "output level should be between 0.0 and 0.2 (got {})", v)
            }
            ConfigError::InvalidSampleRate(v) => {
                write!(f, "sample rate must be a positive number (got {})", v)
            }
            ConfigError::UnknownMode(mode) => {
                write!(f, "unknown keyer mode {:?} (expected straight or iambic)", mode)
            }
            ConfigError::NoDeviceSelected => write!(f, "no audio device selected"),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Failure of an audio device or serial port collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceError {
    NoDeviceSelected,
    InvalidSampleRate,
    UnsupportedFormat(String),
    AudioOpen(String),
    AudioStart(String),
    AudioStop(String),
    SerialOpen { port: String, reason: String },
    ControlLine(String),
}

impl std::fmt::Display for DeviceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeviceError::NoDeviceSelected => write!(f, "no audio device selected"),
            DeviceError::InvalidSampleRate => write!(f, "sample rate must be positive"),
            DeviceError::UnsupportedFormat(fmt) => {
                write!(f, "unsupported sample format {} (expected f32)", fmt)
            }
            DeviceError::AudioOpen(reason) => write!(f, "could not open audio device: {}", reason),
            DeviceError::AudioStart(reason) => {
                write!(f, "could not start audio stream: {}", reason)
            }
            DeviceError::AudioStop(reason) => write!(f, "could not stop audio stream: {}", reason),
            DeviceError::SerialOpen { port, reason } => {
                write!(f, "could not open serial port {}: {}", port, reason)
            }
            DeviceError::ControlLine(reason) => {
                write!(f, "could not drive PTT control line: {}", reason)
            }
        }
    }
}

impl std::error::Error for DeviceError {}
