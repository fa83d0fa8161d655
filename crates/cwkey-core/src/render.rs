use std::sync::Arc;

use crate::error::DeviceError;
use crate::gate::ToneGate;
use crate::oscillator::ToneOscillator;
use crate::settings::AudioConfig;

/// Fills output blocks with the gated sidetone.
///
/// Owned by the audio callback. Reads the gate once per block and never
/// allocates, blocks, or logs.
pub struct SidetoneRenderer {
    osc: ToneOscillator,
    gate: Arc<ToneGate>,
    gain: f32,
}

impl SidetoneRenderer {
    /// Create a renderer for the given audio config reading from `gate`.
    pub fn new(config: &AudioConfig, gate: Arc<ToneGate>) -> Self {
        Self {
            osc: ToneOscillator::new(config.sample_rate_hz, config.tone_freq_hz),
            gate,
            gain: config.gain,
        }
    }

    /// Render a block of mono samples.
    ///
    /// While the gate is closed the oscillator phase is frozen, so the tone
    /// resumes where it left off when the gate reopens.
    pub fn render(&mut self, out: &mut [f32]) {
        if !self.gate.is_audible() {
            out.fill(0.0);
            return;
        }
        for sample in out.iter_mut() {
            *sample = self.osc.next() as f32 * self.gain;
        }
    }

    /// Render interleaved frames, copying the mono tone into every channel.
    pub fn render_interleaved(&mut self, data: &mut [f32], channels: usize) {
        if channels <= 1 {
            self.render(data);
            return;
        }
        if !self.gate.is_audible() {
            data.fill(0.0);
            return;
        }
        for frame in data.chunks_mut(channels) {
            let value = self.osc.next() as f32 * self.gain;
            frame.fill(value);
        }
    }

    pub fn phase(&self) -> f64 {
        self.osc.phase()
    }
}

/// A started or stopped output stream. Dropping it closes the device.
pub trait AudioStream {
    fn start(&mut self) -> Result<(), DeviceError>;
    fn stop(&mut self) -> Result<(), DeviceError>;
}

/// Audio subsystem able to open an output stream that pulls from a renderer.
pub trait AudioBackend {
    type Device: Clone;
    type Stream: AudioStream;

    /// The device's preferred sample rate, if it reports one.
    fn default_sample_rate(&self, device: &Self::Device) -> Option<f64>;

    /// Open (but do not start) a mono stream on `device`.
    fn open(
        &self,
        device: &Self::Device,
        config: &AudioConfig,
        block_size: Option<u32>,
        renderer: SidetoneRenderer,
    ) -> Result<Self::Stream, DeviceError>;
}

/// Start/stop lifecycle of the sidetone stream.
pub struct SidetoneOutput<B: AudioBackend> {
    backend: B,
    gate: Arc<ToneGate>,
    device: Option<B::Device>,
    config: AudioConfig,
    block_size: Option<u32>,
    stream: Option<B::Stream>,
}

impl<B: AudioBackend> SidetoneOutput<B> {
    pub fn new(backend: B, gate: Arc<ToneGate>, config: AudioConfig) -> Self {
        Self {
            backend,
            gate,
            device: None,
            config,
            block_size: None,
            stream: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.stream.is_some()
    }

    pub fn config(&self) -> &AudioConfig {
        &self.config
    }

    pub fn device(&self) -> Option<&B::Device> {
        self.device.as_ref()
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn select_device(&mut self, device: Option<B::Device>) {
        self.device = device;
    }

    pub fn set_block_size(&mut self, block_size: Option<u32>) {
        self.block_size = block_size;
    }

    /// Replace the audio config. The caller stops the stream first; a running
    /// stream keeps rendering with the config it was opened with.
    pub fn set_config(&mut self, config: AudioConfig) {
        if self.is_running() {
            tracing::warn!("audio config changed while stream running; takes effect on restart");
        }
        self.config = config;
    }

    /// Open and start the stream. A second start without a stop is a no-op.
    pub fn start(&mut self) -> Result<(), DeviceError> {
        if self.stream.is_some() {
            return Ok(());
        }
        let device = self.device.as_ref().ok_or(DeviceError::NoDeviceSelected)?;
        let rate = self.config.sample_rate_hz;
        if !rate.is_finite() || rate <= 0.0 {
            return Err(DeviceError::InvalidSampleRate);
        }

        let renderer = SidetoneRenderer::new(&self.config, Arc::clone(&self.gate));
        let mut stream = self
            .backend
            .open(device, &self.config, self.block_size, renderer)?;
        // On failure the opened stream is dropped here, leaving nothing half-started.
        stream.start()?;

        tracing::info!(
            sample_rate_hz = self.config.sample_rate_hz,
            tone_freq_hz = self.config.tone_freq_hz,
            gain = self.config.gain,
            "sidetone stream started"
        );
        self.stream = Some(stream);
        Ok(())
    }

    /// Stop and release the stream. Stopping a stopped output is a no-op.
    pub fn stop(&mut self) -> Result<(), DeviceError> {
        match self.stream.take() {
            Some(mut stream) => {
                let result = stream.stop();
                drop(stream);
                tracing::info!("sidetone stream stopped");
                result
            }
            None => Ok(()),
        }
    }
}
