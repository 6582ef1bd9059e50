//! Scan-code input injection through `SendInput`.
//!
//! Games that read the keyboard through DirectInput ignore synthetic events
//! carrying only a virtual-key code, so every key goes out as a hardware scan
//! code with `KEYEVENTF_SCANCODE`.

use crate::action::MouseButton;
use crate::backend::{InputBackend, CLICK_SETTLE};
use crate::keys::{self, ScanCode};
use std::mem;
use std::thread;
use tracing::{trace, warn};
use winapi::ctypes::c_int;
use winapi::shared::minwindef::{DWORD, UINT, WORD};
use winapi::um::winuser::{
    MapVirtualKeyW, SendInput, VkKeyScanW, INPUT, INPUT_KEYBOARD, INPUT_MOUSE, KEYBDINPUT,
    KEYEVENTF_EXTENDEDKEY, KEYEVENTF_KEYUP, KEYEVENTF_SCANCODE, MAPVK_VK_TO_VSC,
    MOUSEEVENTF_LEFTDOWN, MOUSEEVENTF_LEFTUP, MOUSEEVENTF_MIDDLEDOWN, MOUSEEVENTF_MIDDLEUP,
    MOUSEEVENTF_RIGHTDOWN, MOUSEEVENTF_RIGHTUP, MOUSEINPUT,
};

/// Low-level backend compatible with DirectX game clients.
#[derive(Debug, Clone, Copy, Default)]
pub struct DirectInputBackend;

impl DirectInputBackend {
    pub fn new() -> Self {
        Self
    }

    /// Table lookup first; single characters fall back to the active keyboard layout.
    fn resolve(key: &str) -> Option<ScanCode> {
        if let Some(code) = keys::scan_code(key) {
            return Some(code);
        }

        let c = keys::printable_char(key.trim())?;
        let mut buf = [0u16; 2];
        let encoded = c.encode_utf16(&mut buf);
        if encoded.len() != 1 {
            return None;
        }

        let packed = unsafe { VkKeyScanW(encoded[0]) };
        if packed == -1 {
            return None;
        }

        let vk = (packed & 0xFF) as UINT;
        let code = unsafe { MapVirtualKeyW(vk, MAPVK_VK_TO_VSC) };
        if code == 0 {
            return None;
        }

        Some(ScanCode {
            code: code as u16,
            extended: false,
        })
    }

    fn send_key(&self, key: &str, up: bool) -> bool {
        let Some(scan) = Self::resolve(key) else {
            warn!(key, "no scan code for key");
            return false;
        };

        let mut flags = KEYEVENTF_SCANCODE;
        if scan.extended {
            flags |= KEYEVENTF_EXTENDEDKEY;
        }
        if up {
            flags |= KEYEVENTF_KEYUP;
        }

        let mut input: INPUT = unsafe { mem::zeroed() };
        input.type_ = INPUT_KEYBOARD;
        unsafe {
            *input.u.ki_mut() = KEYBDINPUT {
                wVk: 0,
                wScan: scan.code as WORD,
                dwFlags: flags,
                time: 0,
                dwExtraInfo: 0,
            };
        }

        trace!(key, scan = scan.code, up, "scan-code key event");
        send(&mut input)
    }

    fn send_mouse(flags: DWORD) -> bool {
        let mut input: INPUT = unsafe { mem::zeroed() };
        input.type_ = INPUT_MOUSE;
        unsafe {
            *input.u.mi_mut() = MOUSEINPUT {
                dx: 0,
                dy: 0,
                mouseData: 0,
                dwFlags: flags,
                time: 0,
                dwExtraInfo: 0,
            };
        }
        send(&mut input)
    }
}

fn send(input: &mut INPUT) -> bool {
    let sent = unsafe { SendInput(1, input, mem::size_of::<INPUT>() as c_int) };
    sent == 1
}

impl InputBackend for DirectInputBackend {
    fn name(&self) -> &'static str {
        "direct-input"
    }

    fn available(&self) -> bool {
        true
    }

    fn press(&self, key: &str) -> bool {
        self.send_key(key, false)
    }

    fn release(&self, key: &str) -> bool {
        self.send_key(key, true)
    }

    fn click(&self, button: MouseButton) -> bool {
        let (down, up) = match button {
            MouseButton::Left => (MOUSEEVENTF_LEFTDOWN, MOUSEEVENTF_LEFTUP),
            MouseButton::Right => (MOUSEEVENTF_RIGHTDOWN, MOUSEEVENTF_RIGHTUP),
            MouseButton::Middle => (MOUSEEVENTF_MIDDLEDOWN, MOUSEEVENTF_MIDDLEUP),
        };

        if !Self::send_mouse(down) {
            return false;
        }
        thread::sleep(CLICK_SETTLE);
        Self::send_mouse(up)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_uses_table_first() {
        assert_eq!(DirectInputBackend::resolve("q"), keys::scan_code("q"));
        assert!(DirectInputBackend::resolve("up").is_some_and(|sc| sc.extended));
        assert_eq!(DirectInputBackend::resolve("invalid_key_xyz"), None);
        assert_eq!(DirectInputBackend::resolve(""), None);
    }

    #[test]
    #[ignore = "injects real keystrokes into the focused window"]
    fn test_press_release_every_table_key() {
        let backend = DirectInputBackend::new();
        for key in keys::KEY_NAMES {
            assert!(backend.press(key), "press {key}");
            assert!(backend.release(key), "release {key}");
        }
    }
}
