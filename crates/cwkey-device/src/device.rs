use std::sync::Arc;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cwkey_core::{AudioBackend, AudioConfig, AudioStream, DeviceError, SidetoneRenderer};
use regex::Regex;

/// An output device with at least one channel.
#[derive(Clone)]
pub struct OutputDevice {
    index: usize,
    name: String,
    device: Arc<cpal::Device>,
}

impl OutputDevice {
    /// Display label, `"<index>: <name>"`.
    pub fn label(&self) -> String {
        format!("{}: {}", self.index, self.name)
    }
}

/// Enumerate output devices of the default host, in host order.
pub fn list_output_devices() -> Vec<OutputDevice> {
    let host = cpal::default_host();
    let devices = match host.output_devices() {
        Ok(devices) => devices,
        Err(err) => {
            tracing::warn!(%err, "could not enumerate output devices");
            return Vec::new();
        }
    };

    devices
        .enumerate()
        .filter(|(_, dev)| {
            dev.default_output_config()
                .map(|cfg| cfg.channels() > 0)
                .unwrap_or(false)
        })
        .map(|(index, device)| OutputDevice {
            index,
            name: device.name().unwrap_or_else(|_| "<unknown>".to_string()),
            device: Arc::new(device),
        })
        .collect()
}

/// Pick an output device by name pattern, or the host default.
pub fn find_output_device(
    device_regex: Option<&str>,
) -> Result<OutputDevice, Box<dyn std::error::Error>> {
    if let Some(pattern) = device_regex {
        let re = Regex::new(pattern)?;
        return list_output_devices()
            .into_iter()
            .find(|dev| re.is_match(&dev.name))
            .ok_or_else(|| "no output device matched regex".into());
    }

    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or("no default output device available")?;
    let name = device.name().unwrap_or_else(|_| "<unknown>".to_string());
    let index = list_output_devices()
        .iter()
        .position(|dev| dev.name == name)
        .unwrap_or(0);
    Ok(OutputDevice {
        index,
        name,
        device: Arc::new(device),
    })
}

/// cpal-backed sidetone output.
#[derive(Clone, Copy, Default)]
pub struct CpalBackend;

pub struct CpalStream {
    stream: cpal::Stream,
}

impl AudioStream for CpalStream {
    fn start(&mut self) -> Result<(), DeviceError> {
        self.stream
            .play()
            .map_err(|err| DeviceError::AudioStart(err.to_string()))
    }

    fn stop(&mut self) -> Result<(), DeviceError> {
        self.stream
            .pause()
            .map_err(|err| DeviceError::AudioStop(err.to_string()))
    }
}

impl AudioBackend for CpalBackend {
    type Device = OutputDevice;
    type Stream = CpalStream;

    fn default_sample_rate(&self, device: &OutputDevice) -> Option<f64> {
        device
            .device
            .default_output_config()
            .ok()
            .map(|cfg| cfg.sample_rate().0 as f64)
    }

    fn open(
        &self,
        device: &OutputDevice,
        config: &AudioConfig,
        block_size: Option<u32>,
        mut renderer: SidetoneRenderer,
    ) -> Result<CpalStream, DeviceError> {
        let rate = config.sample_rate_hz.round() as u32;
        let supported = select_config(&device.device, rate)?;
        let sample_format = supported.sample_format();

        let buffer_size = match (block_size, supported.buffer_size()) {
            (Some(frames), cpal::SupportedBufferSize::Range { min, max })
                if (*min..=*max).contains(&frames) =>
            {
                cpal::BufferSize::Fixed(frames)
            }
            (Some(frames), _) => {
                tracing::warn!(frames, "block size not supported by device; using default");
                cpal::BufferSize::Default
            }
            (None, _) => cpal::BufferSize::Default,
        };

        let mut stream_config: cpal::StreamConfig = supported.config();
        stream_config.buffer_size = buffer_size;
        let channels = stream_config.channels as usize;

        let err_fn = |err: cpal::StreamError| tracing::error!(%err, "audio stream error");

        let stream = match sample_format {
            cpal::SampleFormat::F32 => device
                .device
                .build_output_stream(
                    &stream_config,
                    move |data: &mut [f32], _| renderer.render_interleaved(data, channels),
                    err_fn,
                    None,
                )
                .map_err(|err| DeviceError::AudioOpen(err.to_string()))?,
            other => return Err(DeviceError::UnsupportedFormat(format!("{:?}", other))),
        };

        tracing::info!(
            device = %device.label(),
            sample_rate = rate,
            channels,
            buffer_size = ?stream_config.buffer_size,
            "audio output opened"
        );
        Ok(CpalStream { stream })
    }
}

// Prefer an f32 mono config at the requested rate, then any f32 config at that rate.
fn select_config(
    device: &cpal::Device,
    rate: u32,
) -> Result<cpal::SupportedStreamConfig, DeviceError> {
    let default_config = device
        .default_output_config()
        .map_err(|err| DeviceError::AudioOpen(err.to_string()))?;

    let candidates: Vec<cpal::SupportedStreamConfigRange> = match device.supported_output_configs() {
        Ok(configs) => configs
            .filter(|cfg| {
                cfg.sample_format() == cpal::SampleFormat::F32
                    && cfg.min_sample_rate().0 <= rate
                    && cfg.max_sample_rate().0 >= rate
            })
            .collect(),
        Err(_) => Vec::new(),
    };

    let best = candidates
        .iter()
        .find(|cfg| cfg.channels() == 1)
        .or_else(|| candidates.first());

    match best {
        Some(range) => Ok(range.clone().with_sample_rate(cpal::SampleRate(rate))),
        None if default_config.sample_rate().0 == rate => Ok(default_config),
        None => Err(DeviceError::AudioOpen(format!(
            "device does not support f32 output at {} Hz",
            rate
        ))),
    }
}
