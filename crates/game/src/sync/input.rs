use crate::net::{InputSnapshot, Keys};

/// Raw local input for one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputSample {
    pub keys: Keys,
    pub mouse_dx: i32,
    pub fire: bool,
    pub focused: bool,
}

impl Default for InputSample {
    fn default() -> Self {
        Self {
            keys: Keys::empty(),
            mouse_dx: 0,
            fire: false,
            focused: true,
        }
    }
}

impl InputSample {
    /// What gets forwarded to the server. Nothing is forwarded while the
    /// window is unfocused.
    pub fn snapshot(&self) -> InputSnapshot {
        if self.focused {
            InputSnapshot::new(self.keys, self.mouse_dx)
        } else {
            InputSnapshot::default()
        }
    }
}

/// Supplies one input sample per tick.
pub trait InputSource {
    fn sample(&mut self) -> InputSample;
}
