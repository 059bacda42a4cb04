use std::collections::HashMap;
use std::io;
use std::time::{Duration, Instant};

use crossterm::event::{
    self, DisableFocusChange, EnableFocusChange, Event, KeyCode, KeyEvent, KeyEventKind,
    KeyModifiers, KeyboardEnhancementFlags, PopKeyboardEnhancementFlags,
    PushKeyboardEnhancementFlags,
};
use crossterm::{execute, terminal};
use treacherous::{InputSample, InputSource, Keys};

/// Without release events a key counts as held this long after its last
/// press or auto-repeat. Must outlast the usual keyboard repeat delay.
const HOLD_WINDOW: Duration = Duration::from_millis(550);

/// Horizontal "mouse" movement per tick while an arrow key is held.
const TURN_STEP: i32 = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Control {
    Forward,
    Left,
    Back,
    Right,
    TurnLeft,
    TurnRight,
    Fire,
}

impl Control {
    fn from_key(code: KeyCode) -> Option<Self> {
        match code {
            KeyCode::Char('w') | KeyCode::Char('W') => Some(Control::Forward),
            KeyCode::Char('a') | KeyCode::Char('A') => Some(Control::Left),
            KeyCode::Char('s') | KeyCode::Char('S') => Some(Control::Back),
            KeyCode::Char('d') | KeyCode::Char('D') => Some(Control::Right),
            KeyCode::Left => Some(Control::TurnLeft),
            KeyCode::Right => Some(Control::TurnRight),
            KeyCode::Char(' ') => Some(Control::Fire),
            _ => None,
        }
    }
}

/// Keyboard state reconstructed from terminal events.
#[derive(Debug)]
pub struct KeyState {
    pressed: HashMap<Control, Instant>,
    reports_releases: bool,
    focused: bool,
    quit: bool,
}

impl KeyState {
    pub fn new(reports_releases: bool) -> Self {
        Self {
            pressed: HashMap::new(),
            reports_releases,
            focused: true,
            quit: false,
        }
    }

    pub fn quit_requested(&self) -> bool {
        self.quit
    }

    pub fn handle_event(&mut self, event: Event, now: Instant) {
        match event {
            Event::Key(key) => self.handle_key(key, now),
            Event::FocusGained => self.focused = true,
            Event::FocusLost => {
                self.focused = false;
                self.pressed.clear();
            }
            _ => {}
        }
    }

    fn handle_key(&mut self, key: KeyEvent, now: Instant) {
        if key.kind != KeyEventKind::Release {
            let ctrl_c = key.modifiers.contains(KeyModifiers::CONTROL)
                && key.code == KeyCode::Char('c');
            if ctrl_c || matches!(key.code, KeyCode::Esc | KeyCode::Char('q')) {
                self.quit = true;
                return;
            }
        }

        let Some(control) = Control::from_key(key.code) else {
            return;
        };
        match key.kind {
            KeyEventKind::Press | KeyEventKind::Repeat => {
                self.pressed.insert(control, now);
            }
            KeyEventKind::Release => {
                self.pressed.remove(&control);
            }
        }
    }

    fn is_held(&self, control: Control, now: Instant) -> bool {
        match self.pressed.get(&control) {
            Some(_) if self.reports_releases => true,
            Some(&last) => now.saturating_duration_since(last) < HOLD_WINDOW,
            None => false,
        }
    }

    pub fn sample(&self, now: Instant) -> InputSample {
        let mut keys = Keys::empty();
        keys.set(Keys::W, self.is_held(Control::Forward, now));
        keys.set(Keys::A, self.is_held(Control::Left, now));
        keys.set(Keys::S, self.is_held(Control::Back, now));
        keys.set(Keys::D, self.is_held(Control::Right, now));

        let mut mouse_dx = 0;
        if self.is_held(Control::TurnLeft, now) {
            mouse_dx -= TURN_STEP;
        }
        if self.is_held(Control::TurnRight, now) {
            mouse_dx += TURN_STEP;
        }

        InputSample {
            keys,
            mouse_dx,
            fire: self.is_held(Control::Fire, now),
            focused: self.focused,
        }
    }
}

/// Raw-mode terminal keyboard. Restores the terminal when dropped.
pub struct TerminalInput {
    state: KeyState,
    enhanced: bool,
    raw: bool,
}

impl TerminalInput {
    pub fn new() -> io::Result<Self> {
        terminal::enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnableFocusChange)?;

        let enhanced = terminal::supports_keyboard_enhancement().unwrap_or(false);
        if enhanced {
            execute!(
                stdout,
                PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::REPORT_EVENT_TYPES)
            )?;
        } else {
            log::info!(
                "Terminal does not report key releases, holding keys for {:?}",
                HOLD_WINDOW
            );
        }

        Ok(Self {
            state: KeyState::new(enhanced),
            enhanced,
            raw: true,
        })
    }

    pub fn quit_requested(&self) -> bool {
        self.state.quit_requested()
    }

    fn pump(&mut self) -> io::Result<()> {
        while event::poll(Duration::ZERO)? {
            let event = event::read()?;
            self.state.handle_event(event, Instant::now());
        }
        Ok(())
    }

    pub fn restore(&mut self) -> io::Result<()> {
        if !self.raw {
            return Ok(());
        }
        let mut stdout = io::stdout();
        if self.enhanced {
            execute!(stdout, PopKeyboardEnhancementFlags)?;
            self.enhanced = false;
        }
        execute!(stdout, DisableFocusChange)?;
        terminal::disable_raw_mode()?;
        self.raw = false;
        Ok(())
    }
}

impl InputSource for TerminalInput {
    fn sample(&mut self) -> InputSample {
        if let Err(e) = self.pump() {
            log::warn!("Failed to read terminal input: {}", e);
        }
        self.state.sample(Instant::now())
    }
}

impl Drop for TerminalInput {
    fn drop(&mut self) {
        let _ = self.restore();
    }
}
