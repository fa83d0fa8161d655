//! The keying station: one owned context for everything the event loop drives.
//!
//! Ownership is split three ways:
//! - render domain: oscillator phase, inside the stream's [`SidetoneRenderer`]
//! - cooperative domain: keyer, scheduler, PTT controller, this struct
//! - shared: the [`ToneGate`], written here and read lock-free by the renderer
//!
//! [`SidetoneRenderer`]: crate::render::SidetoneRenderer

use std::sync::Arc;
use std::time::Duration;

use crate::error::{ConfigError, DeviceError};
use crate::gate::ToneGate;
use crate::keyer::{KeyerEngine, KeyerTimer, Paddle};
use crate::ptt::{PttController, PttError, SerialBackend};
use crate::render::{AudioBackend, SidetoneOutput};
use crate::scheduler::Scheduler;
use crate::settings::{validate_frequency, validate_gain, AudioConfig, KeyerConfig, KeyerMode};

/// Non-fatal problem surfaced to the operator.
#[derive(Debug, Clone, PartialEq)]
pub enum Advisory {
    Config(ConfigError),
    Device(DeviceError),
}

impl std::fmt::Display for Advisory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Advisory::Config(err) => write!(f, "{}", err),
            Advisory::Device(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for Advisory {}

impl From<ConfigError> for Advisory {
    fn from(err: ConfigError) -> Self {
        Advisory::Config(err)
    }
}

impl From<DeviceError> for Advisory {
    fn from(err: DeviceError) -> Self {
        Advisory::Device(err)
    }
}

/// Operator-facing status line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Idle,
    Transmitting,
    Practice,
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Status::Idle => write!(f, "Idle"),
            Status::Transmitting => write!(f, "Transmitting CW"),
            Status::Practice => write!(f, "Practice mode - speakers"),
        }
    }
}

/// Everything the "apply settings" action carries.
pub struct ApplyRequest<D> {
    pub tone_freq_hz: f64,
    pub wpm: f64,
    pub gain: f32,
    pub mode: KeyerMode,
    pub device: Option<D>,
    pub port: Option<String>,
}

/// Outcome of [`Station::apply`]: every field that was rejected or failed.
#[derive(Debug, Default)]
pub struct ApplyReport {
    pub advisories: Vec<Advisory>,
}

impl ApplyReport {
    pub fn is_clean(&self) -> bool {
        self.advisories.is_empty()
    }

    fn note(&mut self, advisory: impl Into<Advisory>) {
        let advisory = advisory.into();
        tracing::warn!(%advisory, "setting not applied");
        self.advisories.push(advisory);
    }
}

pub struct Station<A: AudioBackend, S: SerialBackend> {
    gate: Arc<ToneGate>,
    keyer: KeyerEngine,
    scheduler: Scheduler<KeyerTimer>,
    ptt: PttController,
    output: SidetoneOutput<A>,
    serial: S,
}

impl<A: AudioBackend, S: SerialBackend> Station<A, S> {
    pub fn new(audio: A, serial: S, audio_config: AudioConfig, keyer_config: KeyerConfig) -> Self {
        let gate = Arc::new(ToneGate::new());
        Self {
            keyer: KeyerEngine::new(keyer_config, Arc::clone(&gate)),
            scheduler: Scheduler::new(),
            ptt: PttController::new(Arc::clone(&gate)),
            output: SidetoneOutput::new(audio, Arc::clone(&gate), audio_config),
            serial,
            gate,
        }
    }

    pub fn gate(&self) -> &Arc<ToneGate> {
        &self.gate
    }

    pub fn keyer(&self) -> &KeyerEngine {
        &self.keyer
    }

    pub fn ptt(&self) -> &PttController {
        &self.ptt
    }

    pub fn output(&self) -> &SidetoneOutput<A> {
        &self.output
    }

    pub fn audio_config(&self) -> &AudioConfig {
        self.output.config()
    }

    pub fn status(&self) -> Status {
        if self.gate.bypass() {
            Status::Practice
        } else if self.gate.ptt_active() {
            Status::Transmitting
        } else {
            Status::Idle
        }
    }

    // --- Input edges ---

    pub fn on_key_change(&mut self, paddle: Paddle, pressed: bool) {
        self.keyer.on_paddle(paddle, pressed, &mut self.scheduler);
    }

    pub fn toggle_ptt(&mut self) -> Result<bool, PttError> {
        let result = self.ptt.toggle();
        if let Err(err) = &result {
            tracing::warn!(%err, "PTT toggle refused");
        }
        result
    }

    /// Switch speaker-practice bypass. PTT is always dropped on a change.
    pub fn set_bypass(&mut self, bypass: bool) {
        self.gate.set_bypass(bypass);
        self.ptt.set_ptt(false);
        tracing::info!(bypass, "bypass changed");
    }

    // --- Configuration changes ---

    pub fn set_mode(&mut self, mode: KeyerMode) {
        self.keyer.set_mode(mode);
    }

    pub fn set_wpm(&mut self, wpm: f64) -> Result<(), ConfigError> {
        self.keyer.set_wpm(wpm)
    }

    /// Change the tone frequency, restarting a running stream.
    pub fn set_frequency(&mut self, tone_freq_hz: f64) -> Result<(), Advisory> {
        let tone_freq_hz = validate_frequency(tone_freq_hz)?;
        self.reconfigure(AudioConfig {
            tone_freq_hz,
            ..*self.output.config()
        })
    }

    /// Change the output gain, restarting a running stream.
    pub fn set_gain(&mut self, gain: f32) -> Result<(), Advisory> {
        let gain = validate_gain(gain)?;
        self.reconfigure(AudioConfig {
            gain,
            ..*self.output.config()
        })
    }

    fn reconfigure(&mut self, config: AudioConfig) -> Result<(), Advisory> {
        let was_running = self.output.is_running();
        self.output.stop()?;
        self.output.set_config(config);
        if was_running {
            self.output.start()?;
        }
        Ok(())
    }

    /// Select the output device, adopting its preferred sample rate.
    ///
    /// A running stream is stopped first and reopened on the new device.
    pub fn select_device(&mut self, device: Option<A::Device>) -> Result<(), DeviceError> {
        let was_running = self.output.is_running();
        self.output.stop()?;

        if let Some(rate) = device
            .as_ref()
            .and_then(|d| self.output.backend().default_sample_rate(d))
            .filter(|rate| rate.is_finite() && *rate > 0.0)
        {
            let config = AudioConfig {
                sample_rate_hz: rate,
                ..*self.output.config()
            };
            self.output.set_config(config);
        }
        self.output.select_device(device);

        if was_running && self.output.device().is_some() {
            self.output.start()?;
        }
        Ok(())
    }

    pub fn set_block_size(&mut self, block_size: Option<u32>) {
        self.output.set_block_size(block_size);
    }

    pub fn start_audio(&mut self) -> Result<(), DeviceError> {
        self.output.start()
    }

    pub fn stop_audio(&mut self) -> Result<(), DeviceError> {
        self.output.stop()
    }

    /// Open the PTT serial port, replacing any open one.
    pub fn open_ptt_port(&mut self, port: &str) -> Result<(), DeviceError> {
        self.ptt.detach();
        let line = self.serial.open(port)?;
        self.ptt.attach(port, Box::new(line));
        Ok(())
    }

    pub fn close_ptt_port(&mut self) {
        self.ptt.detach();
    }

    /// Apply a full settings form.
    ///
    /// Audio is stopped first. Each field is validated on its own and a
    /// rejected field keeps its previous value. The serial port is re-opened
    /// unless bypass is on, and audio restarts if a device is selected.
    pub fn apply(&mut self, request: ApplyRequest<A::Device>) -> ApplyReport {
        let mut report = ApplyReport::default();

        if let Err(err) = self.output.stop() {
            report.note(err);
        }

        let mut config = *self.output.config();
        match validate_frequency(request.tone_freq_hz) {
            Ok(hz) => config.tone_freq_hz = hz,
            Err(err) => report.note(err),
        }
        match validate_gain(request.gain) {
            Ok(gain) => config.gain = gain,
            Err(err) => report.note(err),
        }
        self.output.set_config(config);

        if let Err(err) = self.keyer.set_wpm(request.wpm) {
            report.note(err);
        }
        self.keyer.set_mode(request.mode);

        let has_device = request.device.is_some();
        if let Err(err) = self.select_device(request.device) {
            report.note(err);
        }

        self.ptt.detach();
        if !self.gate.bypass() {
            if let Some(port) = request.port.as_deref().filter(|p| !p.is_empty()) {
                if let Err(err) = self.open_ptt_port(port) {
                    report.note(err);
                }
            }
        }

        if has_device {
            if let Err(err) = self.output.start() {
                report.note(err);
            }
        } else {
            report.note(ConfigError::NoDeviceSelected);
        }

        report
    }

    // --- Scheduler driving ---

    pub fn next_deadline(&self) -> Option<Duration> {
        self.scheduler.next_deadline()
    }

    /// Set the clock to `now` and fire every timer that is due.
    ///
    /// Timers scheduled by handlers are relative to `now`.
    pub fn advance(&mut self, now: Duration) {
        self.scheduler.set_now(now);
        while let Some(timer) = self.scheduler.pop_due() {
            self.keyer.on_timer(timer, &mut self.scheduler);
        }
    }

    /// Step through every deadline up to `until`, firing each timer exactly
    /// at its deadline. Used to drive a virtual clock.
    pub fn run_until(&mut self, until: Duration) {
        while let Some(deadline) = self.scheduler.next_deadline().filter(|d| *d <= until) {
            self.advance(deadline);
        }
        self.scheduler.set_now(until);
    }

    /// Drop PTT, stop audio and release the serial port.
    pub fn shutdown(&mut self) {
        self.ptt.set_ptt(false);
        if let Err(err) = self.output.stop() {
            tracing::warn!(%err, "error stopping audio during shutdown");
        }
        self.ptt.detach();
    }
}
