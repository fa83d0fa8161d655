//! Straight-key and iambic keyer state machine.
//!
//! Runs on the cooperative event loop. Every transition happens inside a
//! paddle-edge handler or a timer handler, one at a time, and the only output
//! is the tone request written to the shared [`ToneGate`].
//!
//! # Iambic timing
//!
//! - Dit: 1 unit, Dah: 3 units, inter-element gap: 1 unit
//! - Unit (dit length) = 1.2 / WPM seconds, frozen when an element starts
//! - Squeezing both paddles alternates from the last element sent
//!
//! There is no dit/dah memory: a paddle only counts if it is still held when
//! the gap after the current element ends.

use std::sync::Arc;
use std::time::Duration;

use crate::error::ConfigError;
use crate::gate::ToneGate;
use crate::scheduler::Scheduler;
use crate::settings::{validate_wpm, KeyerConfig, KeyerMode};

/// Which contact changed on the key or paddle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Paddle {
    Dit,
    Dah,
}

/// Keying element type.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Element {
    Dit,
    Dah,
}

impl Element {
    #[inline]
    pub fn opposite(self) -> Self {
        match self {
            Element::Dit => Element::Dah,
            Element::Dah => Element::Dit,
        }
    }

    /// Tone duration of this element for a given dit length.
    #[inline]
    pub fn duration(self, dit: Duration) -> Duration {
        match self {
            Element::Dit => dit,
            Element::Dah => dit * 3,
        }
    }
}

/// Iambic FSM state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyerState {
    Idle,
    Sending(Element),
    Gap,
}

/// Timer events scheduled by the keyer.
///
/// Each carries the epoch it was scheduled in; a mode change starts a new
/// epoch so timers left over from the previous one fire as no-ops.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyerTimer {
    ElementEnd { epoch: u64 },
    GapEnd { epoch: u64 },
}

pub struct KeyerEngine {
    config: KeyerConfig,
    gate: Arc<ToneGate>,

    state: KeyerState,
    last_element: Element,
    // Dit length captured when the current element started.
    element_dit: Duration,
    epoch: u64,

    dit_held: bool,
    dah_held: bool,
    key_down: bool,
}

impl KeyerEngine {
    pub fn new(config: KeyerConfig, gate: Arc<ToneGate>) -> Self {
        Self {
            element_dit: config.dit_duration(),
            config,
            gate,
            state: KeyerState::Idle,
            last_element: Element::Dah,
            epoch: 0,
            dit_held: false,
            dah_held: false,
            key_down: false,
        }
    }

    pub fn config(&self) -> &KeyerConfig {
        &self.config
    }

    pub fn mode(&self) -> KeyerMode {
        self.config.mode
    }

    pub fn state(&self) -> KeyerState {
        self.state
    }

    pub fn last_element(&self) -> Element {
        self.last_element
    }

    pub fn paddles(&self) -> (bool, bool) {
        (self.dit_held, self.dah_held)
    }

    /// Straight key closure.
    pub fn is_key_down(&self) -> bool {
        self.key_down
    }

    /// Switch between straight and iambic keying.
    ///
    /// Any element in flight is abandoned: the tone request drops, paddle and
    /// key state are cleared and outstanding timers become stale.
    pub fn set_mode(&mut self, mode: KeyerMode) {
        if mode == self.config.mode {
            return;
        }
        self.config.mode = mode;
        self.epoch += 1;
        self.state = KeyerState::Idle;
        self.dit_held = false;
        self.dah_held = false;
        self.key_down = false;
        self.gate.set_tone_request(false);
        tracing::info!(%mode, "keyer mode changed");
    }

    /// Change speed. Applies to elements started after the change.
    pub fn set_wpm(&mut self, wpm: f64) -> Result<(), ConfigError> {
        self.config.wpm = validate_wpm(wpm)?;
        tracing::debug!(wpm, "keyer speed changed");
        Ok(())
    }

    /// Key or paddle edge from the input layer.
    pub fn on_paddle(
        &mut self,
        paddle: Paddle,
        pressed: bool,
        sched: &mut Scheduler<KeyerTimer>,
    ) {
        match self.config.mode {
            KeyerMode::Straight => {
                self.key_down = pressed;
                self.gate.set_tone_request(pressed);
            }
            KeyerMode::Iambic => {
                match paddle {
                    Paddle::Dit => self.dit_held = pressed,
                    Paddle::Dah => self.dah_held = pressed,
                }
                if pressed && self.state == KeyerState::Idle {
                    self.start_next_element(sched);
                }
            }
        }
    }

    /// Timer handler. Stale timers are ignored.
    pub fn on_timer(&mut self, timer: KeyerTimer, sched: &mut Scheduler<KeyerTimer>) {
        if self.config.mode != KeyerMode::Iambic {
            return;
        }
        match timer {
            KeyerTimer::ElementEnd { epoch } => {
                if epoch != self.epoch || !matches!(self.state, KeyerState::Sending(_)) {
                    return;
                }
                self.gate.set_tone_request(false);
                self.state = KeyerState::Gap;
                sched.schedule(self.element_dit, KeyerTimer::GapEnd { epoch });
            }
            KeyerTimer::GapEnd { epoch } => {
                if epoch != self.epoch || self.state != KeyerState::Gap {
                    return;
                }
                self.state = KeyerState::Idle;
                self.start_next_element(sched);
            }
        }
    }

    fn choose_element(&self) -> Option<Element> {
        match (self.dit_held, self.dah_held) {
            (true, false) => Some(Element::Dit),
            (false, true) => Some(Element::Dah),
            (true, true) => Some(self.last_element.opposite()),
            (false, false) => None,
        }
    }

    fn start_next_element(&mut self, sched: &mut Scheduler<KeyerTimer>) {
        let Some(element) = self.choose_element() else {
            self.state = KeyerState::Idle;
            return;
        };

        // Single-paddle elements also update alternation memory.
        self.last_element = element;
        self.state = KeyerState::Sending(element);
        self.element_dit = self.config.dit_duration();

        self.gate.set_tone_request(true);
        sched.schedule(
            element.duration(self.element_dit),
            KeyerTimer::ElementEnd { epoch: self.epoch },
        );
        tracing::debug!(?element, dit_us = self.element_dit.as_micros() as u64, "element started");
    }
}
