//! Windows low-level keyboard hook.
//!
//! `SetWindowsHookExW(WH_KEYBOARD_LL)` observes every key-down without
//! consuming it, so the game still receives the key. The hook procedure cannot
//! capture state, so the active handler lives in a process-wide slot; only one
//! [`HookListener`] can be attached at a time.

use crate::error::{CastError, Result};
use crate::keys;
use crate::listener::{KeyEvent, KeyHandler, KeyListener};
use std::mem;
use std::ptr;
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use tracing::{debug, info, warn};
use winapi::ctypes::c_int;
use winapi::shared::minwindef::{DWORD, LPARAM, LRESULT, UINT, WPARAM};
use winapi::um::processthreadsapi::GetCurrentThreadId;
use winapi::um::winuser::{
    CallNextHookEx, GetAsyncKeyState, GetMessageW, MapVirtualKeyW, PostThreadMessageW,
    SetWindowsHookExW, UnhookWindowsHookEx, HC_ACTION, KBDLLHOOKSTRUCT, LLKHF_INJECTED,
    MAPVK_VK_TO_CHAR, MSG, VK_CONTROL, VK_LWIN, VK_MENU, VK_RWIN, VK_SHIFT, WH_KEYBOARD_LL,
    WM_KEYDOWN, WM_QUIT, WM_SYSKEYDOWN,
};

/// Handler for the installed hook.
static HANDLER: Mutex<Option<Arc<dyn KeyHandler>>> = Mutex::new(None);

fn is_down(vk: c_int) -> bool {
    (unsafe { GetAsyncKeyState(vk) } as u16) & 0x8000 != 0
}

/// Modifiers currently held, as key names.
fn held_modifiers() -> Vec<&'static str> {
    let mut held = Vec::new();
    if is_down(VK_CONTROL) {
        held.push("ctrl");
    }
    if is_down(VK_MENU) {
        held.push("alt");
    }
    if is_down(VK_SHIFT) {
        held.push("shift");
    }
    if is_down(VK_LWIN) || is_down(VK_RWIN) {
        held.push("meta");
    }
    held
}

fn key_event(vk: DWORD) -> Option<KeyEvent> {
    let event = match keys::name_for_virtual_key(vk) {
        Some(name) => KeyEvent::named(name),
        None => {
            // High bit flags a dead key
            let mapped = unsafe { MapVirtualKeyW(vk, MAPVK_VK_TO_CHAR) } & 0x7FFF;
            match char::from_u32(mapped) {
                Some(c) if c != '\0' => KeyEvent::char(c),
                _ => return None,
            }
        }
    };
    Some(event.with_modifiers(held_modifiers()))
}

unsafe extern "system" fn keyboard_proc(code: c_int, wparam: WPARAM, lparam: LPARAM) -> LRESULT {
    if code == HC_ACTION {
        let msg = wparam as UINT;
        if msg == WM_KEYDOWN || msg == WM_SYSKEYDOWN {
            let info = unsafe { &*(lparam as *const KBDLLHOOKSTRUCT) };
            // Our own SendInput output must not re-trigger bindings
            if info.flags & LLKHF_INJECTED == 0 {
                if let Some(event) = key_event(info.vkCode) {
                    let handler = HANDLER.lock().ok().and_then(|slot| slot.clone());
                    if let Some(handler) = handler {
                        handler.on_key(&event);
                    }
                }
            }
        }
    }

    unsafe { CallNextHookEx(ptr::null_mut(), code, wparam, lparam) }
}

#[derive(Default)]
struct HookThread {
    thread_id: Option<DWORD>,
    thread: Option<JoinHandle<()>>,
}

/// Passive keyboard listener backed by a low-level hook on its own thread.
#[derive(Default)]
pub struct HookListener {
    state: parking_lot::Mutex<HookThread>,
}

impl HookListener {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyListener for HookListener {
    fn available(&self) -> bool {
        true
    }

    fn attach(&self, handler: Arc<dyn KeyHandler>, _bindings: &[String]) -> Result<()> {
        let mut state = self.state.lock();
        if state.thread.is_some() {
            return Ok(());
        }

        if let Ok(mut slot) = HANDLER.lock() {
            *slot = Some(handler);
        }

        let (ready_tx, ready_rx) = mpsc::channel();
        let thread = thread::Builder::new()
            .name("quickcast-hook".into())
            .spawn(move || {
                let hook = unsafe {
                    SetWindowsHookExW(WH_KEYBOARD_LL, Some(keyboard_proc), ptr::null_mut(), 0)
                };
                if hook.is_null() {
                    let _ = ready_tx.send(None);
                    return;
                }
                let _ = ready_tx.send(Some(unsafe { GetCurrentThreadId() }));

                // Low-level hooks are serviced from this thread's message loop.
                let mut msg: MSG = unsafe { mem::zeroed() };
                while unsafe { GetMessageW(&mut msg, ptr::null_mut(), 0, 0) } > 0 {}

                unsafe { UnhookWindowsHookEx(hook) };
                debug!("keyboard hook removed");
            })?;

        match ready_rx.recv() {
            Ok(Some(thread_id)) => {
                state.thread_id = Some(thread_id);
                state.thread = Some(thread);
                info!("keyboard hook installed");
                Ok(())
            }
            _ => {
                let _ = thread.join();
                if let Ok(mut slot) = HANDLER.lock() {
                    *slot = None;
                }
                Err(CastError::unavailable("SetWindowsHookExW failed"))
            }
        }
    }

    fn detach(&self) {
        let (thread_id, thread) = {
            let mut state = self.state.lock();
            (state.thread_id.take(), state.thread.take())
        };
        if let Some(thread_id) = thread_id {
            let posted = unsafe { PostThreadMessageW(thread_id, WM_QUIT, 0, 0) };
            if posted == 0 {
                warn!(thread_id, "failed to post quit to hook thread");
            }
        }
        if let Some(thread) = thread {
            let _ = thread.join();
        }
        if let Ok(mut slot) = HANDLER.lock() {
            *slot = None;
        }
    }

    fn is_attached(&self) -> bool {
        self.state.lock().thread.is_some()
    }
}

impl Drop for HookListener {
    fn drop(&mut self) {
        self.detach();
    }
}
