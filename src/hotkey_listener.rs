//! Key listening through registered global hotkeys.
//!
//! Used where no passive keyboard hook exists. Only the bound keys are
//! observed, and the OS hands them to us instead of the focused window, so
//! the engine keeps the registered set as small as its current state allows.
//!
//! The hotkey manager lives on the listener thread; rebinding sends the new
//! set over a channel and the thread re-registers between events.

use crate::error::{CastError, Result};
use crate::listener::{KeyEvent, KeyHandler, KeyListener};
use global_hotkey::hotkey::{Code, HotKey, Modifiers};
use global_hotkey::{GlobalHotKeyEvent, GlobalHotKeyManager, HotKeyState};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, info, warn};

const POLL_INTERVAL: Duration = Duration::from_millis(10);

struct Worker {
    rebind: Sender<Vec<String>>,
    running: Arc<AtomicBool>,
    thread: JoinHandle<()>,
}

#[derive(Default)]
pub struct HotkeyListener {
    worker: Mutex<Option<Worker>>,
}

impl HotkeyListener {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Registered hotkeys, owned by the listener thread.
struct Registry {
    manager: GlobalHotKeyManager,
    registered: Vec<HotKey>,
    bindings: HashMap<u32, String>,
}

impl Registry {
    fn register_all(&mut self, bindings: &[String]) {
        for hotkey in self.registered.drain(..) {
            if let Err(e) = self.manager.unregister(hotkey) {
                debug!("failed to unregister hotkey: {}", e);
            }
        }
        self.bindings.clear();

        for binding in bindings {
            let hotkey = match parse_hotkey(binding) {
                Ok(hotkey) => hotkey,
                Err(e) => {
                    warn!(binding = %binding, "skipping binding: {}", e);
                    continue;
                }
            };
            if let Err(e) = self.manager.register(hotkey) {
                warn!(binding = %binding, "failed to register hotkey: {}", e);
                continue;
            }
            self.bindings.insert(hotkey.id(), binding.clone());
            self.registered.push(hotkey);
        }

        info!(count = self.bindings.len(), "global hotkeys registered");
    }

    fn unregister_all(&mut self) {
        for hotkey in self.registered.drain(..) {
            let _ = self.manager.unregister(hotkey);
        }
        self.bindings.clear();
    }
}

fn listen(
    handler: Arc<dyn KeyHandler>,
    initial: Vec<String>,
    rebind: Receiver<Vec<String>>,
    running: Arc<AtomicBool>,
    ready: Sender<Result<()>>,
) {
    let manager = match GlobalHotKeyManager::new() {
        Ok(manager) => manager,
        Err(e) => {
            let _ = ready.send(Err(CastError::unavailable(format!("global hotkeys: {e}"))));
            return;
        }
    };
    let mut registry = Registry {
        manager,
        registered: Vec::new(),
        bindings: HashMap::new(),
    };
    registry.register_all(&initial);
    let _ = ready.send(Ok(()));

    let events = GlobalHotKeyEvent::receiver();
    while running.load(Ordering::SeqCst) {
        // Only the latest requested set matters.
        if let Some(bindings) = rebind.try_iter().last() {
            registry.register_all(&bindings);
        }

        let Ok(event) = events.recv_timeout(POLL_INTERVAL) else {
            continue;
        };
        if event.state != HotKeyState::Pressed {
            continue;
        }
        if let Some(binding) = registry.bindings.get(&event.id).cloned() {
            handler.on_key(&KeyEvent::named(binding));
        }
    }

    registry.unregister_all();
    debug!("global hotkey listener exited");
}

impl KeyListener for HotkeyListener {
    fn available(&self) -> bool {
        true
    }

    fn consumes_keys(&self) -> bool {
        true
    }

    fn attach(&self, handler: Arc<dyn KeyHandler>, bindings: &[String]) -> Result<()> {
        let mut worker = self.worker.lock();
        if worker.is_some() {
            return Ok(());
        }

        let (rebind_tx, rebind_rx) = mpsc::channel();
        let (ready_tx, ready_rx) = mpsc::channel();
        let running = Arc::new(AtomicBool::new(true));
        let thread_running = Arc::clone(&running);
        let initial = bindings.to_vec();

        let thread = thread::Builder::new()
            .name("quickcast-hotkeys".into())
            .spawn(move || listen(handler, initial, rebind_rx, thread_running, ready_tx))?;

        match ready_rx.recv() {
            Ok(Ok(())) => {
                *worker = Some(Worker {
                    rebind: rebind_tx,
                    running,
                    thread,
                });
                Ok(())
            }
            Ok(Err(e)) => {
                let _ = thread.join();
                Err(e)
            }
            Err(_) => {
                let _ = thread.join();
                Err(CastError::unavailable("global hotkey thread exited"))
            }
        }
    }

    fn rebind(&self, bindings: &[String]) -> Result<()> {
        if let Some(worker) = self.worker.lock().as_ref() {
            worker
                .rebind
                .send(bindings.to_vec())
                .map_err(|_| CastError::hotkey("listener thread has exited"))?;
        }
        Ok(())
    }

    fn detach(&self) {
        // Taken out before joining: the handler may call back into `rebind`.
        let worker = self.worker.lock().take();
        if let Some(worker) = worker {
            worker.running.store(false, Ordering::SeqCst);
            let _ = worker.thread.join();
        }
    }

    fn is_attached(&self) -> bool {
        self.worker.lock().is_some()
    }
}

impl Drop for HotkeyListener {
    fn drop(&mut self) {
        self.detach();
    }
}

/// Parse a binding such as `"f9"`, `"q"` or `"ctrl+alt+r"`.
pub fn parse_hotkey(hotkey_str: &str) -> Result<HotKey> {
    let binding = hotkey_str.to_lowercase();
    let parts: Vec<&str> = binding.split('+').map(|s| s.trim()).collect();

    if parts.iter().all(|p| p.is_empty()) {
        return Err(CastError::hotkey("empty hotkey string"));
    }

    let mut modifiers = Modifiers::empty();
    let mut key_code = None;

    for part in &parts {
        match *part {
            "ctrl" | "control" => modifiers |= Modifiers::CONTROL,
            "alt" => modifiers |= Modifiers::ALT,
            "shift" => modifiers |= Modifiers::SHIFT,
            "meta" | "cmd" | "super" => modifiers |= Modifiers::SUPER,
            key => {
                if key_code.is_some() {
                    return Err(CastError::hotkey(format!(
                        "multiple keys specified in hotkey: {hotkey_str}"
                    )));
                }
                key_code = Some(parse_key_code(key)?);
            }
        }
    }

    let code = key_code
        .ok_or_else(|| CastError::hotkey(format!("no key specified in hotkey: {hotkey_str}")))?;

    let modifiers = (!modifiers.is_empty()).then_some(modifiers);
    Ok(HotKey::new(modifiers, code))
}

fn parse_key_code(key: &str) -> Result<Code> {
    let code = match crate::keys::normalize(key).as_str() {
        // Letters
        "a" => Code::KeyA,
        "b" => Code::KeyB,
        "c" => Code::KeyC,
        "d" => Code::KeyD,
        "e" => Code::KeyE,
        "f" => Code::KeyF,
        "g" => Code::KeyG,
        "h" => Code::KeyH,
        "i" => Code::KeyI,
        "j" => Code::KeyJ,
        "k" => Code::KeyK,
        "l" => Code::KeyL,
        "m" => Code::KeyM,
        "n" => Code::KeyN,
        "o" => Code::KeyO,
        "p" => Code::KeyP,
        "q" => Code::KeyQ,
        "r" => Code::KeyR,
        "s" => Code::KeyS,
        "t" => Code::KeyT,
        "u" => Code::KeyU,
        "v" => Code::KeyV,
        "w" => Code::KeyW,
        "x" => Code::KeyX,
        "y" => Code::KeyY,
        "z" => Code::KeyZ,

        // Numbers
        "0" => Code::Digit0,
        "1" => Code::Digit1,
        "2" => Code::Digit2,
        "3" => Code::Digit3,
        "4" => Code::Digit4,
        "5" => Code::Digit5,
        "6" => Code::Digit6,
        "7" => Code::Digit7,
        "8" => Code::Digit8,
        "9" => Code::Digit9,

        // Function keys
        "f1" => Code::F1,
        "f2" => Code::F2,
        "f3" => Code::F3,
        "f4" => Code::F4,
        "f5" => Code::F5,
        "f6" => Code::F6,
        "f7" => Code::F7,
        "f8" => Code::F8,
        "f9" => Code::F9,
        "f10" => Code::F10,
        "f11" => Code::F11,
        "f12" => Code::F12,

        // Numpad
        "numpad0" => Code::Numpad0,
        "numpad1" => Code::Numpad1,
        "numpad2" => Code::Numpad2,
        "numpad3" => Code::Numpad3,
        "numpad4" => Code::Numpad4,
        "numpad5" => Code::Numpad5,
        "numpad6" => Code::Numpad6,
        "numpad7" => Code::Numpad7,
        "numpad8" => Code::Numpad8,
        "numpad9" => Code::Numpad9,

        // Special keys
        "space" => Code::Space,
        "enter" => Code::Enter,
        "tab" => Code::Tab,
        "escape" => Code::Escape,
        "backspace" => Code::Backspace,
        "capslock" => Code::CapsLock,
        "delete" => Code::Delete,
        "insert" => Code::Insert,
        "home" => Code::Home,
        "end" => Code::End,
        "pageup" => Code::PageUp,
        "pagedown" => Code::PageDown,

        // Arrow keys
        "up" => Code::ArrowUp,
        "down" => Code::ArrowDown,
        "left" => Code::ArrowLeft,
        "right" => Code::ArrowRight,

        // Punctuation
        "-" => Code::Minus,
        "=" => Code::Equal,
        "," => Code::Comma,
        "." => Code::Period,
        "/" => Code::Slash,
        ";" => Code::Semicolon,
        "'" => Code::Quote,
        "[" => Code::BracketLeft,
        "]" => Code::BracketRight,
        "\\" => Code::Backslash,
        "`" => Code::Backquote,

        _ => return Err(CastError::invalid_key(key, "not supported as a global hotkey")),
    };

    Ok(code)
}
