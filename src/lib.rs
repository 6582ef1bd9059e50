//! # QuickCast
//!
//! A hotkey-driven input automation engine for games that read raw input.
//!
//! ## Features
//!
//! - Quick-cast: a skill hotkey followed by a left click at the cursor
//! - Auto-cast: unattended periodic taps of a set of hotkeys
//! - Macros: named, hotkey-triggered action sequences (press, hold, click, delay, combo)
//! - Global toggle hotkey that suspends everything without detaching the listener
//! - Scan-code injection for DirectInput games, with a high-level fallback
//! - JSON settings file
//!
//! ## Example
//!
//! ```no_run
//! use quickcast::{Action, Engine, SettingsStore};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> quickcast::Result<()> {
//!     let store = SettingsStore::open("quickcast.json")?;
//!     let mut engine = Engine::new(store)?;
//!
//!     engine.add_macro(
//!         "burst",
//!         "x",
//!         vec![
//!             Action::key_press("q"),
//!             Action::delay(Duration::from_millis(50)),
//!             Action::key_press("w"),
//!         ],
//!     )?;
//!     engine.start()?;
//!
//!     tokio::signal::ctrl_c().await?;
//!     engine.stop();
//!     Ok(())
//! }
//! ```

pub mod action;
pub mod auto_cast;
pub mod backend;
pub mod config;
#[cfg(windows)]
pub mod direct_input;
pub mod engine;
pub mod error;
#[cfg(windows)]
pub mod hook;
pub mod hotkey_listener;
pub mod keys;
pub mod listener;
pub mod macro_runner;
pub mod resolver;
pub mod sequencer;
#[cfg(windows)]
pub mod synthetic;

pub use action::{Action, Macro, MouseButton};
pub use backend::{BackendSelector, FallbackBackend, InputBackend};
pub use config::{AutoCastSkill, Settings, SettingsStore};
pub use engine::{Engine, EngineStatus};
pub use error::{CastError, Result};
pub use listener::{KeyEvent, KeyHandler, KeyListener};
