pub mod error;
pub mod gate;
pub mod keyer;
mod oscillator;
pub mod ptt;
pub mod render;
pub mod scheduler;
pub mod settings;
pub mod station;

pub use error::{ConfigError, DeviceError};
pub use gate::{GateInputs, ToneGate};
pub use keyer::{Element, KeyerEngine, KeyerState, KeyerTimer, Paddle};
pub use oscillator::ToneOscillator;
pub use ptt::{ControlLine, PttController, PttError, SerialBackend, PTT_BAUD};
pub use render::{AudioBackend, AudioStream, SidetoneOutput, SidetoneRenderer};
pub use scheduler::Scheduler;
pub use settings::{AudioConfig, KeyerConfig, KeyerMode};
pub use station::{Advisory, ApplyReport, ApplyRequest, Station, Status};
