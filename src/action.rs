//! Macro actions and macro definitions.

use crate::config::duration_format;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Mouse buttons a backend can click.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MouseButton {
    #[default]
    Left,
    Right,
    /// Backends support it; macros normally stick to left and right.
    Middle,
}

impl fmt::Display for MouseButton {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Left => "left",
            Self::Right => "right",
            Self::Middle => "middle",
        };
        f.write_str(name)
    }
}

/// A single step of a macro.
///
/// Serialized with a `type` tag, e.g. `{"type": "key_hold", "key": "q", "duration": "250ms"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    /// Tap a key.
    KeyPress { key: String },

    /// Hold a key down for `duration`, then release it.
    KeyHold {
        key: String,
        #[serde(with = "duration_format", default = "default_hold")]
        duration: Duration,
    },

    /// Click a mouse button at the current cursor position.
    MouseClick {
        #[serde(default)]
        button: MouseButton,
    },

    /// Wait without touching any input.
    Delay {
        #[serde(with = "duration_format", default = "default_delay")]
        duration: Duration,
    },

    /// Press every key in order, then release them in reverse order.
    Combo { keys: Vec<String> },
}

fn default_hold() -> Duration {
    Duration::from_millis(100)
}

fn default_delay() -> Duration {
    Duration::from_millis(100)
}

impl Action {
    pub fn key_press(key: impl Into<String>) -> Self {
        Self::KeyPress { key: key.into() }
    }

    pub fn key_hold(key: impl Into<String>, duration: Duration) -> Self {
        Self::KeyHold {
            key: key.into(),
            duration,
        }
    }

    pub fn mouse_click(button: MouseButton) -> Self {
        Self::MouseClick { button }
    }

    pub fn delay(duration: Duration) -> Self {
        Self::Delay { duration }
    }

    pub fn combo<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Combo {
            keys: keys.into_iter().map(Into::into).collect(),
        }
    }

    /// Every key name this action touches.
    pub fn keys(&self) -> Vec<&str> {
        match self {
            Self::KeyPress { key } | Self::KeyHold { key, .. } => vec![key.as_str()],
            Self::Combo { keys } => keys.iter().map(String::as_str).collect(),
            Self::MouseClick { .. } | Self::Delay { .. } => Vec::new(),
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::KeyPress { key } => write!(f, "press {key}"),
            Self::KeyHold { key, duration } => write!(f, "hold {key} for {duration:?}"),
            Self::MouseClick { button } => write!(f, "click {button}"),
            Self::Delay { duration } => write!(f, "wait {duration:?}"),
            Self::Combo { keys } => write!(f, "combo {}", keys.join("+")),
        }
    }
}

/// A named, hotkey-triggered sequence of actions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Macro {
    pub name: String,
    pub hotkey: String,
    #[serde(default)]
    pub actions: Vec<Action>,
}

impl Macro {
    pub fn new(name: impl Into<String>, hotkey: impl Into<String>, actions: Vec<Action>) -> Self {
        Self {
            name: name.into(),
            hotkey: hotkey.into(),
            actions,
        }
    }
}
