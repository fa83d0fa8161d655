//! Tone gate shared between the keyer and the render callback.
//!
//! The three gate inputs and the derived `audible` flag live in a single
//! atomic byte. Writers (keyer, PTT controller, configuration) run on the
//! cooperative event loop; the render callback reads the whole state with one
//! load, so it can never observe a torn combination of inputs.

use std::sync::atomic::{AtomicU8, Ordering};

const TONE_REQUEST: u8 = 1 << 0;
const PTT_ACTIVE: u8 = 1 << 1;
const BYPASS: u8 = 1 << 2;
const AUDIBLE: u8 = 1 << 3;

/// Consistent snapshot of the gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GateInputs {
    pub tone_request: bool,
    pub ptt_active: bool,
    pub bypass: bool,
}

impl GateInputs {
    /// `bypass ? tone_request : tone_request && ptt_active`
    #[inline]
    pub fn audible(self) -> bool {
        if self.bypass {
            self.tone_request
        } else {
            self.tone_request && self.ptt_active
        }
    }

    fn pack(self) -> u8 {
        let mut bits = 0;
        if self.tone_request {
            bits |= TONE_REQUEST;
        }
        if self.ptt_active {
            bits |= PTT_ACTIVE;
        }
        if self.bypass {
            bits |= BYPASS;
        }
        if self.audible() {
            bits |= AUDIBLE;
        }
        bits
    }

    fn unpack(bits: u8) -> Self {
        Self {
            tone_request: bits & TONE_REQUEST != 0,
            ptt_active: bits & PTT_ACTIVE != 0,
            bypass: bits & BYPASS != 0,
        }
    }
}

/// Lock-free gate combining keyer request, PTT and bypass.
#[derive(Debug, Default)]
pub struct ToneGate {
    bits: AtomicU8,
}

impl ToneGate {
    pub const fn new() -> Self {
        Self {
            bits: AtomicU8::new(0),
        }
    }

    /// Whether the oscillator should be audible right now (single load).
    #[inline]
    pub fn is_audible(&self) -> bool {
        self.bits.load(Ordering::Acquire) & AUDIBLE != 0
    }

    #[inline]
    pub fn inputs(&self) -> GateInputs {
        GateInputs::unpack(self.bits.load(Ordering::Acquire))
    }

    pub fn tone_request(&self) -> bool {
        self.inputs().tone_request
    }

    pub fn ptt_active(&self) -> bool {
        self.inputs().ptt_active
    }

    pub fn bypass(&self) -> bool {
        self.inputs().bypass
    }

    pub fn set_tone_request(&self, active: bool) {
        self.update(|inputs| inputs.tone_request = active);
    }

    pub fn set_ptt_active(&self, active: bool) {
        self.update(|inputs| inputs.ptt_active = active);
    }

    pub fn set_bypass(&self, bypass: bool) {
        self.update(|inputs| inputs.bypass = bypass);
    }

    // Inputs and the derived flag are published together in one store.
    fn update(&self, mutate: impl Fn(&mut GateInputs)) {
        let _ = self
            .bits
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |bits| {
                let mut inputs = GateInputs::unpack(bits);
                mutate(&mut inputs);
                Some(inputs.pack())
            });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn audible_truth_table() {
        for bits in 0..8u8 {
            let tone_request = bits & 1 != 0;
            let ptt_active = bits & 2 != 0;
            let bypass = bits & 4 != 0;

            let gate = ToneGate::new();
            gate.set_tone_request(tone_request);
            gate.set_ptt_active(ptt_active);
            gate.set_bypass(bypass);

            let expected = if bypass {
                tone_request
            } else {
                tone_request && ptt_active
            };
            assert_eq!(gate.is_audible(), expected, "inputs {bits:03b}");
            assert_eq!(
                gate.inputs(),
                GateInputs {
                    tone_request,
                    ptt_active,
                    bypass
                }
            );
        }
    }

    #[test]
    fn recomputed_on_every_write() {
        let gate = ToneGate::new();
        gate.set_tone_request(true);
        assert!(!gate.is_audible());

        gate.set_bypass(true);
        assert!(gate.is_audible());

        gate.set_bypass(false);
        assert!(!gate.is_audible());

        gate.set_ptt_active(true);
        assert!(gate.is_audible());

        gate.set_tone_request(false);
        assert!(!gate.is_audible());
    }

    #[test]
    fn starts_closed() {
        let gate = ToneGate::default();
        assert!(!gate.is_audible());
        assert_eq!(
            gate.inputs(),
            GateInputs {
                tone_request: false,
                ptt_active: false,
                bypass: false
            }
        );
    }
}
