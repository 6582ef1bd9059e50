//! The engine controller.
//!
//! Owns the settings, the key listener subscription, the backend selection,
//! the auto-cast scheduler and the macro runner, and routes key events
//! between them.
//!
//! `running` means the listener is attached; `enabled` means bindings may fire.
//! The global toggle flips `enabled` only, so a disabled engine still hears
//! the toggle hotkey and can be re-enabled from the keyboard. With a listener
//! that swallows bound keys, a disabled engine binds the toggle hotkey alone.

use crate::action::{Action, Macro, MouseButton};
use crate::auto_cast::{AutoCastScheduler, AutoCastSource};
use crate::backend::{BackendSelector, InputBackend, TAP_HOLD};
use crate::config::{AutoCastSkill, Settings, SettingsStore};
use crate::error::{CastError, Result};
use crate::listener::{self, KeyEvent, KeyHandler, KeyListener};
use crate::macro_runner::MacroRunner;
use crate::keys;
use crate::resolver::{self, Dispatch};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tracing::{debug, info, warn};

/// Snapshot of the engine for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineStatus {
    pub running: bool,
    pub enabled: bool,
    pub auto_cast_active: bool,
    /// Name of the backend new sequences will use.
    pub backend: &'static str,
    pub low_level_active: bool,
    pub running_macros: Vec<String>,
}

/// State shared with the listener callback and background tasks.
struct Shared {
    store: RwLock<SettingsStore>,
    running: AtomicBool,
    enabled: AtomicBool,
    replay_keys: AtomicBool,
    listener: Box<dyn KeyListener>,
    backends: BackendSelector,
    auto_cast: AutoCastScheduler,
    macros: Arc<MacroRunner>,
    runtime: Handle,
}

impl Shared {
    fn is_live(&self) -> bool {
        self.running.load(Ordering::SeqCst) && self.enabled.load(Ordering::SeqCst)
    }

    fn set_enabled(self: &Arc<Self>, enabled: bool) -> bool {
        if !self.running.load(Ordering::SeqCst) {
            return false;
        }

        self.enabled.store(enabled, Ordering::SeqCst);
        self.rebind();
        if enabled {
            self.start_auto_cast();
        } else {
            self.auto_cast.stop();
        }
        info!(enabled, "engine {}", if enabled { "enabled" } else { "disabled" });
        enabled
    }

    fn toggle(self: &Arc<Self>) -> bool {
        if !self.running.load(Ordering::SeqCst) {
            return false;
        }
        let enabled = !self.enabled.load(Ordering::SeqCst);
        self.set_enabled(enabled)
    }

    /// Keys the listener should hold for the given `enabled` state.
    ///
    /// A key-consuming listener gets the toggle hotkey alone while disabled,
    /// and no quick-cast slots when the active backend cannot replay them.
    fn active_bindings(&self, enabled: bool) -> Vec<String> {
        let store = self.store.read();
        let settings = store.settings();
        if !self.listener.consumes_keys() {
            settings.bindings()
        } else if !enabled {
            vec![settings.toggle_binding()]
        } else if self.backends.active().available() {
            settings.bindings()
        } else {
            settings.bindings_without_quick_cast()
        }
    }

    fn rebind(&self) {
        if !self.listener.is_attached() {
            return;
        }
        let bindings = self.active_bindings(self.enabled.load(Ordering::SeqCst));
        debug!(?bindings, "rebinding keys");
        if let Err(e) = self.listener.rebind(&bindings) {
            warn!("failed to update key bindings: {}", e);
        }
    }

    /// Start the sweep if the engine is live and auto-cast is configured on.
    fn start_auto_cast(self: &Arc<Self>) {
        if !self.is_live() || !self.store.read().settings().auto_cast.enabled {
            return;
        }
        let source: Arc<dyn AutoCastSource> = Arc::clone(self) as Arc<dyn AutoCastSource>;
        self.auto_cast.start(&self.runtime, source);
    }

    fn handle_key(self: &Arc<Self>, event: &KeyEvent) {
        if !self.running.load(Ordering::SeqCst) {
            return;
        }

        let identifier = event.identifier();
        let dispatch = resolver::resolve(self.store.read().settings(), &identifier);
        let Some(dispatch) = dispatch else {
            return;
        };

        if dispatch == Dispatch::Toggle {
            self.toggle();
            return;
        }
        if !self.enabled.load(Ordering::SeqCst) {
            debug!(key = %identifier, "engine disabled, key ignored");
            return;
        }

        match dispatch {
            Dispatch::QuickCast { slot, hotkey } => self.quick_cast(slot, hotkey),
            Dispatch::Macro(m) => self.run_macro(m),
            Dispatch::Toggle => {}
        }
    }

    fn quick_cast(&self, slot: String, hotkey: String) {
        let backend = self.backends.active();
        let replay = self.replay_keys.load(Ordering::SeqCst);
        debug!(slot = %slot, hotkey = %hotkey, backend = backend.name(), "quick-cast");

        self.runtime.spawn_blocking(move || {
            // The listener swallowed the key, so the game never saw it.
            if replay && !backend.tap(&keys::parse_chord(&hotkey).1, TAP_HOLD) {
                warn!(hotkey = %hotkey, "quick-cast key replay failed");
            }
            if !backend.click(MouseButton::Left) {
                warn!(slot = %slot, "quick-cast click failed");
            }
        });
    }

    fn run_macro(self: &Arc<Self>, m: Macro) {
        let shared = Arc::clone(self);
        self.macros.execute(
            &self.runtime,
            m,
            self.backends.active(),
            move || shared.is_live(),
        );
    }
}

impl AutoCastSource for Shared {
    fn snapshot(&self) -> (Vec<AutoCastSkill>, Duration) {
        let store = self.store.read();
        let auto_cast = &store.settings().auto_cast;
        (auto_cast.skills.clone(), auto_cast.interval)
    }

    fn active(&self) -> bool {
        self.is_live()
    }

    fn backend(&self) -> Arc<dyn InputBackend> {
        self.backends.active()
    }
}

/// Hotkey-driven quick-cast, auto-cast and macro engine.
///
/// Must be created inside a tokio runtime; background work is spawned on it.
/// Dropping the engine stops it.
pub struct Engine {
    shared: Arc<Shared>,
}

impl Engine {
    /// An engine with the platform listener and backends, low-level preferred.
    pub fn new(store: SettingsStore) -> Result<Self> {
        Self::build(store, listener::platform_listener(), BackendSelector::platform())
    }

    /// An engine built from explicit parts, low-level backend preferred.
    pub fn with_parts(
        store: SettingsStore,
        listener: Box<dyn KeyListener>,
        low_level: Arc<dyn InputBackend>,
        high_level: Arc<dyn InputBackend>,
    ) -> Result<Self> {
        Self::build(
            store,
            listener,
            BackendSelector::new(low_level, high_level, true),
        )
    }

    fn build(
        store: SettingsStore,
        listener: Box<dyn KeyListener>,
        backends: BackendSelector,
    ) -> Result<Self> {
        let runtime = Handle::try_current()
            .map_err(|e| CastError::unavailable(format!("no tokio runtime: {e}")))?;
        info!(backend = backends.active().name(), "engine created");

        Ok(Self {
            shared: Arc::new(Shared {
                store: RwLock::new(store),
                running: AtomicBool::new(false),
                enabled: AtomicBool::new(false),
                replay_keys: AtomicBool::new(false),
                listener,
                backends,
                auto_cast: AutoCastScheduler::new(),
                macros: Arc::new(MacroRunner::new()),
                runtime,
            }),
        })
    }

    /// Attach the listener and enable the engine. A no-op while running.
    ///
    /// Fails with [`CastError::Unavailable`] when the listener cannot attach;
    /// the engine then stays stopped.
    pub fn start(&mut self) -> Result<()> {
        if self.is_running() {
            return Ok(());
        }
        let listener = &self.shared.listener;
        if !listener.available() {
            return Err(CastError::unavailable(
                "keyboard listening is not supported on this platform",
            ));
        }

        let bindings = self.shared.active_bindings(true);
        let shared = Arc::clone(&self.shared);
        let handler: Arc<dyn KeyHandler> = Arc::new(move |event: &KeyEvent| shared.handle_key(event));
        listener.attach(handler, &bindings)?;

        self.shared
            .replay_keys
            .store(listener.consumes_keys(), Ordering::SeqCst);
        self.shared.running.store(true, Ordering::SeqCst);
        self.shared.enabled.store(true, Ordering::SeqCst);
        self.shared.start_auto_cast();

        info!(bindings = bindings.len(), "engine started");
        Ok(())
    }

    /// Detach the listener, stop auto-cast and forget in-flight macros.
    ///
    /// Macro runs already on the blocking pool are not waited for; they see
    /// the engine disabled before their next action and end there.
    pub fn stop(&mut self) {
        let was_running = self.shared.running.swap(false, Ordering::SeqCst);
        self.shared.enabled.store(false, Ordering::SeqCst);
        self.shared.auto_cast.stop();
        self.shared.listener.detach();
        self.shared.macros.clear();
        if was_running {
            info!("engine stopped");
        }
    }

    /// Flip `enabled` while running. Returns the new value; `false` when stopped.
    pub fn toggle(&self) -> bool {
        self.shared.toggle()
    }

    /// Enable or disable dispatch without touching the listener. Returns the
    /// resulting `enabled` value; always `false` when stopped.
    pub fn set_enabled(&self, enabled: bool) -> bool {
        self.shared.set_enabled(enabled)
    }

    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::SeqCst)
    }

    pub fn is_enabled(&self) -> bool {
        self.shared.enabled.load(Ordering::SeqCst)
    }

    /// Feed a key event as if the listener had captured it.
    pub fn handle_key(&self, event: &KeyEvent) {
        self.shared.handle_key(event);
    }

    pub fn set_quick_cast_enabled(&self, enabled: bool) {
        self.shared
            .store
            .write()
            .settings_mut()
            .set_quick_cast_enabled(enabled);
        self.shared.rebind();
    }

    pub fn set_quick_cast_hotkey(&self, slot: &str, hotkey: &str) -> Result<()> {
        self.shared
            .store
            .write()
            .settings_mut()
            .set_quick_cast_hotkey(slot, hotkey)?;
        self.shared.rebind();
        Ok(())
    }

    pub fn set_global_hotkey(&self, hotkey: &str) -> Result<()> {
        self.shared
            .store
            .write()
            .settings_mut()
            .set_global_hotkey(hotkey)?;
        self.shared.rebind();
        Ok(())
    }

    /// Turn auto-cast on or off. Takes effect immediately while the engine is
    /// running and enabled.
    pub fn set_auto_cast_enabled(&self, enabled: bool) {
        self.shared
            .store
            .write()
            .settings_mut()
            .set_auto_cast_enabled(enabled);
        if enabled {
            self.shared.start_auto_cast();
        } else {
            self.shared.auto_cast.stop();
        }
    }

    pub fn set_auto_cast_interval(&self, interval: Duration) -> Result<()> {
        self.shared
            .store
            .write()
            .settings_mut()
            .set_auto_cast_interval(interval)
    }

    /// Prefer the low-level backend (`true`) or the high-level one. Returns the
    /// name of the backend now active.
    pub fn set_backend_preference(&self, prefer_low_level: bool) -> &'static str {
        let name = self.shared.backends.set_preference(prefer_low_level);
        self.shared.rebind();
        name
    }

    /// Add an auto-cast entry. Picked up at the start of the next sweep.
    pub fn add_auto_cast_skill(&self, hotkey: &str, interval: Option<Duration>) -> Result<()> {
        self.shared
            .store
            .write()
            .settings_mut()
            .add_auto_cast_skill(AutoCastSkill::new(hotkey, interval))
    }

    /// Remove the auto-cast entry bound to `hotkey`. `false` when there is none.
    pub fn remove_auto_cast_skill(&self, hotkey: &str) -> bool {
        self.shared
            .store
            .write()
            .settings_mut()
            .remove_auto_cast_skill(hotkey)
    }

    pub fn add_macro(&self, name: &str, hotkey: &str, actions: Vec<Action>) -> Result<()> {
        self.shared
            .store
            .write()
            .settings_mut()
            .add_macro(Macro::new(name, hotkey, actions))?;
        self.shared.rebind();
        Ok(())
    }

    pub fn remove_macro(&self, name: &str) -> bool {
        let removed = self.shared.store.write().settings_mut().remove_macro(name);
        if removed {
            self.shared.rebind();
        }
        removed
    }

    pub fn save_settings(&self) -> Result<()> {
        self.shared.store.read().save()
    }

    /// Re-read the settings file. On failure the current settings are kept.
    pub fn reload_settings(&self) -> Result<()> {
        self.shared.store.write().load()?;
        self.shared.rebind();

        self.shared.auto_cast.stop();
        self.shared.start_auto_cast();
        Ok(())
    }

    /// A copy of the current settings.
    pub fn settings(&self) -> Settings {
        self.shared.store.read().settings().clone()
    }

    pub fn running_macros(&self) -> Vec<String> {
        self.shared.macros.running()
    }

    pub fn status(&self) -> EngineStatus {
        EngineStatus {
            running: self.is_running(),
            enabled: self.is_enabled(),
            auto_cast_active: self.shared.auto_cast.is_active(),
            backend: self.shared.backends.active().name(),
            low_level_active: self.shared.backends.low_level_active(),
            running_macros: self.running_macros(),
        }
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.stop();
    }
}
