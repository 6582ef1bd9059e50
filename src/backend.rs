//! Input injection backends.
//!
//! Every backend implements the same small capability set. The engine holds a
//! [`BackendSelector`] that resolves which backend is active once, when the
//! preference changes, instead of re-checking platform support on every call.

use crate::action::MouseButton;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::info;

/// How long a tapped key stays down.
pub const TAP_HOLD: Duration = Duration::from_millis(10);

/// Pause between mouse button down and up.
pub const CLICK_SETTLE: Duration = Duration::from_millis(10);

/// Something that can synthesize keyboard and mouse input.
///
/// Calls are fire-and-forget OS operations and report `false` when the key
/// cannot be resolved or the backend is unavailable. Implementations do not
/// serialize concurrent callers.
pub trait InputBackend: Send + Sync {
    /// Short name for logs and status output.
    fn name(&self) -> &'static str;

    /// Whether this backend can inject input on the current platform.
    fn available(&self) -> bool;

    fn press(&self, key: &str) -> bool;

    fn release(&self, key: &str) -> bool;

    /// Press, hold for `hold`, release. Each half runs exactly once; a failed
    /// press skips the release.
    fn tap(&self, key: &str, hold: Duration) -> bool {
        if !self.press(key) {
            return false;
        }
        thread::sleep(hold);
        self.release(key)
    }

    fn click(&self, button: MouseButton) -> bool;
}

/// Backend for platforms without input injection. Does nothing, reports failure.
#[derive(Debug, Clone, Copy, Default)]
pub struct FallbackBackend;

impl InputBackend for FallbackBackend {
    fn name(&self) -> &'static str {
        "fallback"
    }

    fn available(&self) -> bool {
        false
    }

    fn press(&self, _key: &str) -> bool {
        false
    }

    fn release(&self, _key: &str) -> bool {
        false
    }

    fn tap(&self, _key: &str, _hold: Duration) -> bool {
        false
    }

    fn click(&self, _button: MouseButton) -> bool {
        false
    }
}

/// The scan-code backend on Windows, [`FallbackBackend`] elsewhere.
pub fn low_level() -> Arc<dyn InputBackend> {
    #[cfg(windows)]
    {
        Arc::new(crate::direct_input::DirectInputBackend::new())
    }

    #[cfg(not(windows))]
    {
        Arc::new(FallbackBackend)
    }
}

/// The high-level synthetic-event backend when it can be created, [`FallbackBackend`] otherwise.
pub fn high_level() -> Arc<dyn InputBackend> {
    #[cfg(windows)]
    {
        match crate::synthetic::SyntheticBackend::new() {
            Ok(backend) => return Arc::new(backend),
            Err(e) => tracing::warn!("high-level input backend unavailable: {}", e),
        }
    }

    Arc::new(FallbackBackend)
}

/// Holds both backends and the one currently in use.
pub struct BackendSelector {
    low_level: Arc<dyn InputBackend>,
    high_level: Arc<dyn InputBackend>,
    prefer_low_level: AtomicBool,
    active: RwLock<Arc<dyn InputBackend>>,
}

impl BackendSelector {
    pub fn new(
        low_level: Arc<dyn InputBackend>,
        high_level: Arc<dyn InputBackend>,
        prefer_low_level: bool,
    ) -> Self {
        let active = Self::resolve(&low_level, &high_level, prefer_low_level);
        Self {
            low_level,
            high_level,
            prefer_low_level: AtomicBool::new(prefer_low_level),
            active: RwLock::new(active),
        }
    }

    /// Platform backends, low-level preferred.
    pub fn platform() -> Self {
        Self::new(low_level(), high_level(), true)
    }

    fn resolve(
        low_level: &Arc<dyn InputBackend>,
        high_level: &Arc<dyn InputBackend>,
        prefer_low_level: bool,
    ) -> Arc<dyn InputBackend> {
        if prefer_low_level && low_level.available() {
            Arc::clone(low_level)
        } else {
            Arc::clone(high_level)
        }
    }

    /// Change the preference and re-resolve. Sequences already running keep
    /// the backend they started with.
    pub fn set_preference(&self, prefer_low_level: bool) -> &'static str {
        self.prefer_low_level
            .store(prefer_low_level, Ordering::SeqCst);
        let resolved = Self::resolve(&self.low_level, &self.high_level, prefer_low_level);
        let name = resolved.name();
        *self.active.write() = resolved;
        info!(backend = name, prefer_low_level, "input backend selected");
        name
    }

    pub fn prefers_low_level(&self) -> bool {
        self.prefer_low_level.load(Ordering::SeqCst)
    }

    /// Whether the low-level backend is both preferred and available.
    pub fn low_level_active(&self) -> bool {
        self.prefers_low_level() && self.low_level.available()
    }

    pub fn active(&self) -> Arc<dyn InputBackend> {
        Arc::clone(&self.active.read())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::KEY_NAMES;

    struct Named(&'static str, bool);

    impl InputBackend for Named {
        fn name(&self) -> &'static str {
            self.0
        }
        fn available(&self) -> bool {
            self.1
        }
        fn press(&self, _key: &str) -> bool {
            self.1
        }
        fn release(&self, _key: &str) -> bool {
            self.1
        }
        fn click(&self, _button: MouseButton) -> bool {
            self.1
        }
    }

    #[test]
    fn test_fallback_reports_failure_for_every_key() {
        let backend = FallbackBackend;
        assert!(!backend.available());
        for key in KEY_NAMES {
            assert!(!backend.press(key));
            assert!(!backend.release(key));
            assert!(!backend.tap(key, TAP_HOLD));
        }
        assert!(!backend.click(MouseButton::Left));
        assert!(!backend.click(MouseButton::Right));
    }

    #[test]
    fn test_selector_prefers_available_low_level() {
        let selector = BackendSelector::new(
            Arc::new(Named("low", true)),
            Arc::new(Named("high", true)),
            true,
        );
        assert_eq!(selector.active().name(), "low");
        assert!(selector.low_level_active());

        assert_eq!(selector.set_preference(false), "high");
        assert_eq!(selector.active().name(), "high");
        assert!(!selector.low_level_active());
    }

    #[test]
    fn test_selector_skips_unavailable_low_level() {
        let selector = BackendSelector::new(
            Arc::new(FallbackBackend),
            Arc::new(Named("high", true)),
            true,
        );
        assert_eq!(selector.active().name(), "high");
        assert!(selector.prefers_low_level());
        assert!(!selector.low_level_active());
    }

    #[test]
    fn test_platform_low_level_availability() {
        let backend = low_level();
        assert_eq!(backend.available(), cfg!(windows));
    }
}
