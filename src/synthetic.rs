//! High-level synthetic input through `enigo`.
//!
//! Works for ordinary desktop applications but not for games that read raw
//! input; only used when the scan-code backend is not preferred.

use crate::action::MouseButton;
use crate::backend::{InputBackend, CLICK_SETTLE};
use crate::error::{CastError, Result};
use crate::keys;
use enigo::{Button, Direction, Enigo, Key, Keyboard, Mouse, Settings};
use parking_lot::Mutex;
use std::thread;
use tracing::warn;

pub struct SyntheticBackend {
    enigo: Mutex<Enigo>,
}

impl SyntheticBackend {
    pub fn new() -> Result<Self> {
        let enigo = Enigo::new(&Settings::default())
            .map_err(|e| CastError::unavailable(format!("synthetic input: {e}")))?;
        Ok(Self {
            enigo: Mutex::new(enigo),
        })
    }

    fn key(name: &str) -> Option<Key> {
        let key = match keys::normalize(name).as_str() {
            "space" => Key::Space,
            "enter" => Key::Return,
            "escape" => Key::Escape,
            "tab" => Key::Tab,
            "backspace" => Key::Backspace,
            "shift" => Key::Shift,
            "ctrl" => Key::Control,
            "alt" => Key::Alt,
            "capslock" => Key::CapsLock,
            "up" => Key::UpArrow,
            "down" => Key::DownArrow,
            "left" => Key::LeftArrow,
            "right" => Key::RightArrow,
            "insert" => Key::Insert,
            "delete" => Key::Delete,
            "home" => Key::Home,
            "end" => Key::End,
            "pageup" => Key::PageUp,
            "pagedown" => Key::PageDown,
            "f1" => Key::F1,
            "f2" => Key::F2,
            "f3" => Key::F3,
            "f4" => Key::F4,
            "f5" => Key::F5,
            "f6" => Key::F6,
            "f7" => Key::F7,
            "f8" => Key::F8,
            "f9" => Key::F9,
            "f10" => Key::F10,
            "f11" => Key::F11,
            "f12" => Key::F12,
            "numpad0" => Key::Numpad0,
            "numpad1" => Key::Numpad1,
            "numpad2" => Key::Numpad2,
            "numpad3" => Key::Numpad3,
            "numpad4" => Key::Numpad4,
            "numpad5" => Key::Numpad5,
            "numpad6" => Key::Numpad6,
            "numpad7" => Key::Numpad7,
            "numpad8" => Key::Numpad8,
            "numpad9" => Key::Numpad9,
            other => return keys::printable_char(other).map(Key::Unicode),
        };
        Some(key)
    }

    fn send_key(&self, name: &str, direction: Direction) -> bool {
        let Some(key) = Self::key(name) else {
            warn!(key = name, "key not supported by synthetic backend");
            return false;
        };
        self.enigo.lock().key(key, direction).is_ok()
    }

    fn send_button(&self, button: Button, direction: Direction) -> bool {
        self.enigo.lock().button(button, direction).is_ok()
    }
}

impl InputBackend for SyntheticBackend {
    fn name(&self) -> &'static str {
        "synthetic"
    }

    fn available(&self) -> bool {
        true
    }

    fn press(&self, key: &str) -> bool {
        self.send_key(key, Direction::Press)
    }

    fn release(&self, key: &str) -> bool {
        self.send_key(key, Direction::Release)
    }

    fn click(&self, button: MouseButton) -> bool {
        let button = match button {
            MouseButton::Left => Button::Left,
            MouseButton::Right => Button::Right,
            MouseButton::Middle => Button::Middle,
        };
        if !self.send_button(button, Direction::Press) {
            return false;
        }
        thread::sleep(CLICK_SETTLE);
        self.send_button(button, Direction::Release)
    }
}
