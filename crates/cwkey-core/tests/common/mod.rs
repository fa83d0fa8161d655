//! In-memory audio and serial backends for station tests.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use cwkey_core::{
    AudioBackend, AudioConfig, AudioStream, ControlLine, DeviceError, KeyerConfig, KeyerMode,
    SerialBackend, SidetoneRenderer, Station,
};

pub type Log = Arc<Mutex<Vec<String>>>;

#[derive(Clone, Default)]
pub struct MockAudio {
    pub log: Log,
    pub fail_open: bool,
    pub fail_start: bool,
    pub device_rate: Option<f64>,
    /// Renderer of the most recently opened stream.
    pub renderer: Arc<Mutex<Option<SidetoneRenderer>>>,
    pub opened_with: Arc<Mutex<Vec<AudioConfig>>>,
}

pub struct MockStream {
    log: Log,
    fail_start: bool,
}

impl AudioStream for MockStream {
    fn start(&mut self) -> Result<(), DeviceError> {
        if self.fail_start {
            return Err(DeviceError::AudioStart("stream refused".into()));
        }
        self.log.lock().unwrap().push("start".into());
        Ok(())
    }

    fn stop(&mut self) -> Result<(), DeviceError> {
        self.log.lock().unwrap().push("stop".into());
        Ok(())
    }
}

impl Drop for MockStream {
    fn drop(&mut self) {
        self.log.lock().unwrap().push("close".into());
    }
}

impl AudioBackend for MockAudio {
    type Device = usize;
    type Stream = MockStream;

    fn default_sample_rate(&self, _device: &usize) -> Option<f64> {
        self.device_rate
    }

    fn open(
        &self,
        device: &usize,
        config: &AudioConfig,
        _block_size: Option<u32>,
        renderer: SidetoneRenderer,
    ) -> Result<MockStream, DeviceError> {
        if self.fail_open {
            return Err(DeviceError::AudioOpen(format!("device {} busy", device)));
        }
        self.log.lock().unwrap().push(format!("open {}", device));
        self.opened_with.lock().unwrap().push(*config);
        *self.renderer.lock().unwrap() = Some(renderer);
        Ok(MockStream {
            log: Arc::clone(&self.log),
            fail_start: self.fail_start,
        })
    }
}

impl MockAudio {
    pub fn events(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }

    /// Render one block through the current stream's renderer.
    pub fn render(&self, frames: usize) -> Vec<f32> {
        let mut out = vec![0.0f32; frames];
        if let Some(renderer) = self.renderer.lock().unwrap().as_mut() {
            renderer.render(&mut out);
        }
        out
    }
}

#[derive(Clone, Default)]
pub struct MockSerial {
    pub lines: Log,
    pub writes: Arc<Mutex<Vec<(String, bool)>>>,
    pub fail_open: bool,
}

pub struct MockLine {
    port: String,
    writes: Arc<Mutex<Vec<(String, bool)>>>,
}

impl ControlLine for MockLine {
    fn set_control_line(&mut self, active: bool) -> Result<(), DeviceError> {
        self.writes.lock().unwrap().push((self.port.clone(), active));
        Ok(())
    }
}

impl SerialBackend for MockSerial {
    type Line = MockLine;

    fn open(&self, port: &str) -> Result<MockLine, DeviceError> {
        if self.fail_open {
            return Err(DeviceError::SerialOpen {
                port: port.to_string(),
                reason: "no such device".into(),
            });
        }
        self.lines.lock().unwrap().push(port.to_string());
        let mut line = MockLine {
            port: port.to_string(),
            writes: Arc::clone(&self.writes),
        };
        line.set_control_line(false)?;
        Ok(line)
    }
}

impl MockSerial {
    pub fn writes(&self) -> Vec<(String, bool)> {
        self.writes.lock().unwrap().clone()
    }
}

pub type TestStation = Station<MockAudio, MockSerial>;

pub fn station(mode: KeyerMode, wpm: f64) -> (TestStation, MockAudio, MockSerial) {
    let audio = MockAudio::default();
    let serial = MockSerial::default();
    let station = Station::new(
        audio.clone(),
        serial.clone(),
        AudioConfig::default(),
        KeyerConfig { mode, wpm },
    );
    (station, audio, serial)
}

pub fn ms(millis: u64) -> Duration {
    Duration::from_millis(millis)
}

/// Step the station's virtual clock to `until`, recording every change of the
/// keyer's tone request as `(time, requested)`.
pub fn trace_tone(station: &mut TestStation, until: Duration) -> Vec<(Duration, bool)> {
    let mut edges = Vec::new();
    let mut last = station.gate().tone_request();
    while let Some(deadline) = station.next_deadline().filter(|d| *d <= until) {
        station.advance(deadline);
        let now = station.gate().tone_request();
        if now != last {
            edges.push((deadline, now));
            last = now;
        }
    }
    station.run_until(until);
    edges
}
