//! Maps a captured key identifier to the binding it triggers.

use crate::action::Macro;
use crate::config::Settings;
use crate::keys;

/// What a key event resolved to. At most one per event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    Toggle,
    QuickCast { slot: String, hotkey: String },
    Macro(Macro),
}

/// Resolve `identifier` against the settings.
///
/// Order is fixed and the first match wins: the global toggle, then quick-cast
/// slots in slot-id order (only while quick-cast is enabled), then macros in
/// definition order.
pub fn resolve(settings: &Settings, identifier: &str) -> Option<Dispatch> {
    if identifier.is_empty() {
        return None;
    }

    if keys::matches(&settings.global_hotkey, identifier) {
        return Some(Dispatch::Toggle);
    }

    if settings.quick_cast.enabled {
        let hit = settings
            .quick_cast
            .hotkeys
            .iter()
            .find(|(_, hotkey)| keys::matches(hotkey, identifier));
        if let Some((slot, hotkey)) = hit {
            return Some(Dispatch::QuickCast {
                slot: slot.clone(),
                hotkey: hotkey.clone(),
            });
        }
    }

    settings
        .macros
        .iter()
        .find(|m| keys::matches(&m.hotkey, identifier))
        .cloned()
        .map(Dispatch::Macro)
}
