use std::f64::consts::TAU;

/// Phase-accumulating sine oscillator.
///
/// The phase is carried in double precision and wrapped into `[0, 2π)` after
/// every sample, so the waveform depends only on how many samples have been
/// produced and never on how they were split into blocks.
#[derive(Debug, Clone)]
pub struct ToneOscillator {
    phase: f64,
    phase_inc: f64,
}

impl ToneOscillator {
    /// Create an oscillator for the given sample rate and tone frequency, starting at phase 0.
    ///
    /// The increment is reduced into `[0, 2π)`, so tones above the sample rate
    /// alias instead of pushing the phase out of range.
    pub fn new(sample_rate_hz: f64, tone_freq_hz: f64) -> Self {
        Self {
            phase: 0.0,
            phase_inc: (TAU * tone_freq_hz / sample_rate_hz).rem_euclid(TAU),
        }
    }

    /// Produce one sample and advance the phase.
    #[inline]
    pub fn next(&mut self) -> f64 {
        let value = self.phase.sin();
        self.advance(1);
        value
    }

    /// Advance the phase by `samples` without producing output.
    pub fn advance(&mut self, samples: usize) {
        if samples == 0 {
            return;
        }
        if samples == 1 {
            self.phase += self.phase_inc;
            if self.phase >= TAU {
                self.phase -= TAU;
            }
            return;
        }
        self.phase = (self.phase + self.phase_inc * samples as f64) % TAU;
    }

    /// Current phase in radians, in `[0, 2π)`.
    pub fn phase(&self) -> f64 {
        self.phase
    }

    /// Per-sample phase increment `2π·f/SR`, reduced modulo 2π.
    pub fn phase_increment(&self) -> f64 {
        self.phase_inc
    }
}
