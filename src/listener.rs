//! Global keyboard listening.
//!
//! A [`KeyListener`] is an owned subscription: the engine attaches it with a
//! [`KeyHandler`] and detaches it on stop. The handler runs on the listener's
//! own thread and must return quickly.

use crate::error::Result;
use crate::keys;
use std::sync::Arc;

/// A captured key-down event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyEvent {
    character: Option<char>,
    name: String,
    modifiers: Vec<&'static str>,
}

impl KeyEvent {
    /// An event for a key that produced a printable character.
    pub fn char(c: char) -> Self {
        Self {
            character: Some(c),
            name: String::new(),
            modifiers: Vec::new(),
        }
    }

    /// An event for a key known by name (`"f9"`, `"escape"`, `"ctrl+shift+p"`).
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            character: None,
            name: name.into(),
            modifiers: Vec::new(),
        }
    }

    /// Record the modifiers held while the key went down. Unknown names are
    /// dropped.
    pub fn with_modifiers<'a, I>(mut self, modifiers: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        self.modifiers = modifiers.into_iter().filter_map(keys::modifier).collect();
        self
    }

    /// Case-insensitive identifier used to match bindings.
    ///
    /// The key part is the printable character when there is one, the
    /// normalized key name otherwise; held modifiers are prefixed in canonical
    /// order, as in `"ctrl+shift+p"`.
    pub fn identifier(&self) -> String {
        let (mut held, key) = match self.character {
            Some(c) if !c.is_control() => (Vec::new(), keys::normalize(&c.to_string())),
            _ => keys::parse_chord(&self.name),
        };
        if key.is_empty() {
            return key;
        }

        held.extend(self.modifiers.iter().copied());
        // A modifier key is not held "in addition to" itself.
        let own = keys::modifier(&key);
        keys::MODIFIERS
            .iter()
            .copied()
            .filter(|m| held.contains(m) && Some(*m) != own)
            .chain(std::iter::once(key.as_str()))
            .collect::<Vec<_>>()
            .join("+")
    }
}

/// Receives key events from a listener.
pub trait KeyHandler: Send + Sync {
    fn on_key(&self, event: &KeyEvent);
}

impl<F> KeyHandler for F
where
    F: Fn(&KeyEvent) + Send + Sync,
{
    fn on_key(&self, event: &KeyEvent) {
        self(event);
    }
}

/// A source of global key-down events.
///
/// Shared between the engine and its key handler, so every method takes
/// `&self`. `rebind` may be called from inside the handler.
pub trait KeyListener: Send + Sync {
    /// Whether listening is possible at all on this platform.
    fn available(&self) -> bool;

    /// Whether bound keys are swallowed instead of reaching the focused window.
    fn consumes_keys(&self) -> bool {
        false
    }

    /// Start delivering key events to `handler`.
    ///
    /// `bindings` lists every key the engine reacts to; listeners that can
    /// only observe registered keys use it, passive hooks ignore it.
    fn attach(&self, handler: Arc<dyn KeyHandler>, bindings: &[String]) -> Result<()>;

    /// Replace the set of bound keys while attached.
    fn rebind(&self, _bindings: &[String]) -> Result<()> {
        Ok(())
    }

    /// Stop delivering events. Safe to call when not attached.
    fn detach(&self);

    fn is_attached(&self) -> bool;
}

/// The best listener for this platform: a low-level keyboard hook on Windows,
/// registered global hotkeys elsewhere.
pub fn platform_listener() -> Box<dyn KeyListener> {
    #[cfg(windows)]
    {
        Box::new(crate::hook::HookListener::new())
    }

    #[cfg(not(windows))]
    {
        Box::new(crate::hotkey_listener::HotkeyListener::new())
    }
}
