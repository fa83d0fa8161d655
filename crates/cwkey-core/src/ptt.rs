//! PTT (Push-To-Talk) control.
//!
//! Maps the logical PTT flag onto a serial control line and feeds the same
//! flag into the tone gate. Control-line faults are logged and swallowed so
//! sidetone practice keeps working when the radio path fails.

use std::sync::Arc;

use crate::error::DeviceError;
use crate::gate::ToneGate;

/// Baud rate used when opening the PTT serial port.
pub const PTT_BAUD: u32 = 9600;

/// A boolean control line driving the transmitter's PTT input.
pub trait ControlLine {
    fn set_control_line(&mut self, active: bool) -> Result<(), DeviceError>;
}

/// Opens serial ports for PTT control.
pub trait SerialBackend {
    type Line: ControlLine + 'static;

    /// Open `port` at [`PTT_BAUD`] with the control line inactive.
    fn open(&self, port: &str) -> Result<Self::Line, DeviceError>;
}

/// Reason a PTT toggle was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PttError {
    /// Bypass (speaker practice) is on; there is no transmitter to key.
    Bypassed,
    /// No serial port is open.
    NoSerialLine,
}

impl std::fmt::Display for PttError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PttError::Bypassed => write!(
                f,
                "PTT is disabled in practice mode; turn bypass off to key the radio"
            ),
            PttError::NoSerialLine => write!(
                f,
                "no serial port open; select a PTT port and apply settings"
            ),
        }
    }
}

impl std::error::Error for PttError {}

pub struct PttController {
    gate: Arc<ToneGate>,
    line: Option<Box<dyn ControlLine>>,
    port: Option<String>,
}

impl PttController {
    pub fn new(gate: Arc<ToneGate>) -> Self {
        Self {
            gate,
            line: None,
            port: None,
        }
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.gate.ptt_active()
    }

    pub fn has_line(&self) -> bool {
        self.line.is_some()
    }

    /// Name of the attached serial port, if any.
    pub fn port(&self) -> Option<&str> {
        self.port.as_deref()
    }

    /// Set PTT, drive the control line and recompute the gate.
    pub fn set_ptt(&mut self, active: bool) {
        if let Some(line) = self.line.as_mut() {
            if let Err(err) = line.set_control_line(active) {
                tracing::warn!(%err, active, "PTT control line write failed");
            }
        }
        self.gate.set_ptt_active(active);
        tracing::info!(active, "PTT");
    }

    /// Flip PTT. Refused under bypass or without a serial line.
    pub fn toggle(&mut self) -> Result<bool, PttError> {
        if self.gate.bypass() {
            return Err(PttError::Bypassed);
        }
        if self.line.is_none() {
            return Err(PttError::NoSerialLine);
        }
        let active = !self.is_active();
        self.set_ptt(active);
        Ok(active)
    }

    /// Take ownership of an opened control line, releasing any previous one.
    pub fn attach(&mut self, port: impl Into<String>, line: Box<dyn ControlLine>) {
        self.detach();
        let port = port.into();
        tracing::info!(%port, "PTT serial port attached");
        self.line = Some(line);
        self.port = Some(port);
    }

    /// Release the control line, forcing it inactive first. PTT drops with it.
    pub fn detach(&mut self) {
        if let Some(mut line) = self.line.take() {
            if let Err(err) = line.set_control_line(false) {
                tracing::warn!(%err, "could not release PTT control line");
            }
            drop(line);
            tracing::info!(port = self.port.as_deref().unwrap_or(""), "PTT serial port closed");
        }
        self.port = None;
        self.gate.set_ptt_active(false);
    }
}
