//! Terminal key input driving the station's event loop.
//!
//! `[` / left Ctrl is the dit contact, `]` / right Ctrl the dah contact.
//! Key releases need a terminal that speaks the keyboard enhancement
//! protocol; elsewhere every press is treated as a tap.

use std::io::{self, Write};
use std::time::{Duration, Instant};

use crossterm::event::{
    self, Event, KeyCode, KeyEvent, KeyEventKind, KeyboardEnhancementFlags, ModifierKeyCode,
    PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags,
};
use crossterm::execute;
use crossterm::terminal::{disable_raw_mode, enable_raw_mode, supports_keyboard_enhancement};
use cwkey_core::{AudioBackend, KeyerMode, Paddle, SerialBackend, Station};

const IDLE_POLL: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq)]
enum Action {
    Paddle(Paddle, bool),
    TogglePtt,
    ToggleMode,
    ToggleBypass,
    Faster,
    Slower,
    Quit,
}

fn map_key(key: &KeyEvent) -> Option<Action> {
    let paddle = match key.code {
        KeyCode::Char('[') | KeyCode::Modifier(ModifierKeyCode::LeftControl) => Some(Paddle::Dit),
        KeyCode::Char(']') | KeyCode::Modifier(ModifierKeyCode::RightControl) => Some(Paddle::Dah),
        _ => None,
    };
    if let Some(paddle) = paddle {
        return match key.kind {
            KeyEventKind::Press => Some(Action::Paddle(paddle, true)),
            KeyEventKind::Release => Some(Action::Paddle(paddle, false)),
            KeyEventKind::Repeat => None,
        };
    }

    if key.kind != KeyEventKind::Press {
        return None;
    }
    match key.code {
        KeyCode::Char(' ') => Some(Action::TogglePtt),
        KeyCode::Char('m') => Some(Action::ToggleMode),
        KeyCode::Char('b') => Some(Action::ToggleBypass),
        KeyCode::Char('+') | KeyCode::Char('=') => Some(Action::Faster),
        KeyCode::Char('-') => Some(Action::Slower),
        KeyCode::Char('q') | KeyCode::Esc => Some(Action::Quit),
        _ => None,
    }
}

/// Restores the terminal on drop, whichever way [`run`] exits.
struct RawModeGuard {
    enhanced: bool,
}

impl RawModeGuard {
    fn enable() -> io::Result<Self> {
        enable_raw_mode()?;
        Ok(Self { enhanced: false })
    }

    fn push_enhancement(&mut self) -> io::Result<()> {
        execute!(
            io::stdout(),
            PushKeyboardEnhancementFlags(
                KeyboardEnhancementFlags::DISAMBIGUATE_ESCAPE_CODES
                    | KeyboardEnhancementFlags::REPORT_EVENT_TYPES
                    | KeyboardEnhancementFlags::REPORT_ALL_KEYS_AS_ESCAPE_CODES
            )
        )?;
        self.enhanced = true;
        Ok(())
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        if self.enhanced {
            let _ = execute!(io::stdout(), PopKeyboardEnhancementFlags);
        }
        let _ = disable_raw_mode();
    }
}

pub fn run<A: AudioBackend, S: SerialBackend>(
    station: &mut Station<A, S>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut guard = RawModeGuard::enable()?;
    let enhanced = supports_keyboard_enhancement().unwrap_or(false);
    if enhanced {
        guard.push_enhancement()?;
    } else {
        tracing::warn!("terminal does not report key releases; paddle presses act as taps");
    }

    event_loop(station, !enhanced)
}

fn event_loop<A: AudioBackend, S: SerialBackend>(
    station: &mut Station<A, S>,
    taps: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let epoch = Instant::now();
    print_status(station)?;

    loop {
        station.advance(epoch.elapsed());

        let timeout = station
            .next_deadline()
            .map(|deadline| deadline.saturating_sub(epoch.elapsed()))
            .map_or(IDLE_POLL, |wait| wait.min(IDLE_POLL));
        if !event::poll(timeout)? {
            continue;
        }
        let Event::Key(key) = event::read()? else {
            continue;
        };
        station.advance(epoch.elapsed());

        match map_key(&key) {
            Some(Action::Paddle(paddle, pressed)) => {
                station.on_key_change(paddle, pressed);
                if taps && pressed {
                    station.on_key_change(paddle, false);
                }
            }
            Some(Action::TogglePtt) => {
                if let Err(err) = station.toggle_ptt() {
                    write!(io::stdout(), "{}\r\n", err)?;
                }
                print_status(station)?;
            }
            Some(Action::ToggleMode) => {
                let mode = match station.keyer().mode() {
                    KeyerMode::Straight => KeyerMode::Iambic,
                    KeyerMode::Iambic => KeyerMode::Straight,
                };
                station.set_mode(mode);
                print_status(station)?;
            }
            Some(Action::ToggleBypass) => {
                let bypass = !station.gate().bypass();
                station.set_bypass(bypass);
                print_status(station)?;
            }
            Some(action @ (Action::Faster | Action::Slower)) => {
                let step = if action == Action::Faster { 1.0 } else { -1.0 };
                let wpm = station.keyer().config().wpm + step;
                if let Err(err) = station.set_wpm(wpm) {
                    write!(io::stdout(), "{}\r\n", err)?;
                }
                print_status(station)?;
            }
            Some(Action::Quit) => break,
            None => {}
        }
    }
    Ok(())
}

fn print_status<A: AudioBackend, S: SerialBackend>(station: &Station<A, S>) -> io::Result<()> {
    let config = station.keyer().config();
    let mut stdout = io::stdout();
    write!(
        stdout,
        "{} | {} {:.0} WPM | {:.0} Hz\r\n",
        station.status(),
        config.mode,
        config.wpm,
        station.audio_config().tone_freq_hz
    )?;
    stdout.flush()
}
