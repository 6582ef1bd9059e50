//! Settings snapshot, its mutation API and JSON persistence.
//!
//! ```json
//! {
//!   "quick_cast": { "enabled": true, "hotkeys": { "skill_1": "q" } },
//!   "auto_cast": {
//!     "enabled": false,
//!     "interval": "100ms",
//!     "skills": [{ "hotkey": "w", "interval": "2s" }]
//!   },
//!   "macros": [
//!     { "name": "burst", "hotkey": "x", "actions": [{ "type": "key_press", "key": "q" }] }
//!   ],
//!   "global_hotkey": "f9"
//! }
//! ```

use crate::action::Macro;
use crate::error::{CastError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// Default location of the settings file.
pub const DEFAULT_SETTINGS_FILE: &str = "quickcast.json";

/// Complete engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub quick_cast: QuickCastSettings,

    #[serde(default)]
    pub auto_cast: AutoCastSettings,

    #[serde(default)]
    pub macros: Vec<Macro>,

    #[serde(default = "default_global_hotkey")]
    pub global_hotkey: String,
}

/// Quick-cast: a skill hotkey immediately followed by a click at the cursor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuickCastSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Skill slot id to hotkey. Sorted by slot id, which fixes resolution order.
    #[serde(default = "default_skill_hotkeys")]
    pub hotkeys: BTreeMap<String, String>,
}

/// Auto-cast: unattended periodic taps of a set of hotkeys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutoCastSettings {
    #[serde(default)]
    pub enabled: bool,

    /// Pause after each full sweep, and per entry when the entry has no interval.
    #[serde(with = "duration_format", default = "default_auto_cast_interval")]
    pub interval: Duration,

    #[serde(default)]
    pub skills: Vec<AutoCastSkill>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutoCastSkill {
    pub hotkey: String,

    #[serde(
        with = "optional_duration",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub interval: Option<Duration>,
}

impl AutoCastSkill {
    pub fn new(hotkey: impl Into<String>, interval: Option<Duration>) -> Self {
        Self {
            hotkey: hotkey.into(),
            interval,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_global_hotkey() -> String {
    "f9".to_string()
}

fn default_auto_cast_interval() -> Duration {
    Duration::from_millis(100)
}

fn default_skill_hotkeys() -> BTreeMap<String, String> {
    ["q", "w", "e", "r", "d", "f"]
        .iter()
        .enumerate()
        .map(|(i, key)| (format!("skill_{}", i + 1), (*key).to_string()))
        .collect()
}

impl Default for QuickCastSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            hotkeys: default_skill_hotkeys(),
        }
    }
}

impl Default for AutoCastSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            interval: default_auto_cast_interval(),
            skills: Vec::new(),
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            quick_cast: QuickCastSettings::default(),
            auto_cast: AutoCastSettings::default(),
            macros: Vec::new(),
            global_hotkey: default_global_hotkey(),
        }
    }
}

impl Settings {
    /// Parse settings from a JSON string and validate them.
    pub fn from_json(json: &str) -> Result<Self> {
        let settings: Self = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn from_file(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| CastError::config_load(path, e.to_string()))?;
        Self::from_json(&content).map_err(|e| CastError::config_load(path, e.to_string()))
    }

    pub fn save_to_file(&self, path: &str) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        if let Some(parent) = Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .map_err(|e| CastError::config_save(path, e.to_string()))?;
            }
        }
        fs::write(path, json).map_err(|e| CastError::config_save(path, e.to_string()))
    }

    pub fn validate(&self) -> Result<()> {
        if self.global_hotkey.trim().is_empty() {
            return Err(CastError::config_validation(
                "global hotkey cannot be empty",
            ));
        }

        if self.auto_cast.interval.is_zero() {
            return Err(CastError::config_validation(
                "auto-cast interval must be greater than zero",
            ));
        }

        for (slot, hotkey) in &self.quick_cast.hotkeys {
            if hotkey.trim().is_empty() {
                return Err(CastError::config_validation(format!(
                    "quick-cast slot '{slot}' has an empty hotkey"
                )));
            }
        }

        let mut seen = HashSet::new();
        for skill in &self.auto_cast.skills {
            if skill.hotkey.trim().is_empty() {
                return Err(CastError::config_validation(
                    "auto-cast entry has an empty hotkey",
                ));
            }
            if !seen.insert(crate::keys::canonical(&skill.hotkey)) {
                return Err(CastError::duplicate_auto_cast(&skill.hotkey));
            }
        }

        let mut names = HashSet::new();
        for m in &self.macros {
            if m.name.trim().is_empty() {
                return Err(CastError::config_validation("macro name cannot be empty"));
            }
            if m.hotkey.trim().is_empty() {
                return Err(CastError::config_validation(format!(
                    "macro '{}' has an empty hotkey",
                    m.name
                )));
            }
            if !names.insert(m.name.as_str()) {
                return Err(CastError::duplicate_macro(&m.name));
            }
        }

        Ok(())
    }

    pub fn set_quick_cast_enabled(&mut self, enabled: bool) {
        self.quick_cast.enabled = enabled;
    }

    pub fn set_quick_cast_hotkey(
        &mut self,
        slot: impl Into<String>,
        hotkey: impl Into<String>,
    ) -> Result<()> {
        let (slot, hotkey) = (slot.into(), hotkey.into());
        if hotkey.trim().is_empty() {
            return Err(CastError::config_validation(format!(
                "quick-cast slot '{slot}' has an empty hotkey"
            )));
        }
        self.quick_cast.hotkeys.insert(slot, hotkey);
        Ok(())
    }

    pub fn set_auto_cast_enabled(&mut self, enabled: bool) {
        self.auto_cast.enabled = enabled;
    }

    pub fn set_auto_cast_interval(&mut self, interval: Duration) -> Result<()> {
        if interval.is_zero() {
            return Err(CastError::config_validation(
                "auto-cast interval must be greater than zero",
            ));
        }
        self.auto_cast.interval = interval;
        Ok(())
    }

    /// Append an auto-cast entry. Rejects an empty or already registered hotkey.
    pub fn add_auto_cast_skill(&mut self, skill: AutoCastSkill) -> Result<()> {
        if skill.hotkey.trim().is_empty() {
            return Err(CastError::config_validation(
                "auto-cast entry has an empty hotkey",
            ));
        }
        if self
            .auto_cast
            .skills
            .iter()
            .any(|s| crate::keys::canonical(&s.hotkey) == crate::keys::canonical(&skill.hotkey))
        {
            return Err(CastError::duplicate_auto_cast(skill.hotkey));
        }
        self.auto_cast.skills.push(skill);
        Ok(())
    }

    /// Remove the auto-cast entry bound to `hotkey`. Returns `false` when none exists.
    pub fn remove_auto_cast_skill(&mut self, hotkey: &str) -> bool {
        match self
            .auto_cast
            .skills
            .iter()
            .position(|s| crate::keys::matches(&s.hotkey, hotkey))
        {
            Some(index) => {
                self.auto_cast.skills.remove(index);
                true
            }
            None => false,
        }
    }

    /// Append a macro. Names are unique; a duplicate is rejected, never overwritten.
    pub fn add_macro(&mut self, m: Macro) -> Result<()> {
        if m.name.trim().is_empty() {
            return Err(CastError::config_validation("macro name cannot be empty"));
        }
        if m.hotkey.trim().is_empty() {
            return Err(CastError::config_validation(format!(
                "macro '{}' has an empty hotkey",
                m.name
            )));
        }
        if self.find_macro(&m.name).is_some() {
            return Err(CastError::duplicate_macro(m.name));
        }
        self.macros.push(m);
        Ok(())
    }

    pub fn remove_macro(&mut self, name: &str) -> bool {
        match self.macros.iter().position(|m| m.name == name) {
            Some(index) => {
                self.macros.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn find_macro(&self, name: &str) -> Option<&Macro> {
        self.macros.iter().find(|m| m.name == name)
    }

    pub fn set_global_hotkey(&mut self, hotkey: impl Into<String>) -> Result<()> {
        let hotkey = hotkey.into();
        if hotkey.trim().is_empty() {
            return Err(CastError::config_validation(
                "global hotkey cannot be empty",
            ));
        }
        self.global_hotkey = hotkey;
        Ok(())
    }

    /// Every key that has to reach the engine: toggle, quick-cast slots while
    /// quick-cast is enabled, macro triggers.
    ///
    /// Deduplicated by canonical binding, in resolution order.
    pub fn bindings(&self) -> Vec<String> {
        self.collect_bindings(self.quick_cast.enabled)
    }

    /// [`bindings`](Self::bindings) without the quick-cast slots.
    pub fn bindings_without_quick_cast(&self) -> Vec<String> {
        self.collect_bindings(false)
    }

    /// Canonical form of the global toggle hotkey.
    pub fn toggle_binding(&self) -> String {
        crate::keys::canonical(&self.global_hotkey)
    }

    /// Trigger bindings whose key part is not a recognized key name: the
    /// toggle, every quick-cast slot and every macro trigger.
    pub fn unknown_bindings(&self) -> Vec<&str> {
        let mut unknown = Vec::new();
        let triggers = std::iter::once(&self.global_hotkey)
            .chain(self.quick_cast.hotkeys.values())
            .chain(self.macros.iter().map(|m| &m.hotkey));
        for binding in triggers {
            let (_, key) = crate::keys::parse_chord(binding);
            if !crate::keys::is_known(&key) && !unknown.contains(&binding.as_str()) {
                unknown.push(binding.as_str());
            }
        }
        unknown
    }

    /// Keys that cannot be injected: action keys and auto-cast hotkeys.
    pub fn unknown_action_keys(&self) -> Vec<&str> {
        let mut unknown = Vec::new();
        let action_keys = self
            .macros
            .iter()
            .flat_map(|m| m.actions.iter().flat_map(|a| a.keys()));
        let auto_cast_keys = self.auto_cast.skills.iter().map(|s| s.hotkey.as_str());
        for key in action_keys.chain(auto_cast_keys) {
            if !crate::keys::is_known(key) && !unknown.contains(&key) {
                unknown.push(key);
            }
        }
        unknown
    }

    fn collect_bindings(&self, quick_cast: bool) -> Vec<String> {
        let mut seen = HashSet::new();
        let slots = self.quick_cast.hotkeys.values().filter(|_| quick_cast);
        std::iter::once(&self.global_hotkey)
            .chain(slots)
            .chain(self.macros.iter().map(|m| &m.hotkey))
            .map(|key| crate::keys::canonical(key))
            .filter(|key| !key.is_empty() && seen.insert(key.clone()))
            .collect()
    }
}

/// A [`Settings`] value paired with the file it is loaded from and saved to.
#[derive(Debug, Clone)]
pub struct SettingsStore {
    path: PathBuf,
    settings: Settings,
}

impl SettingsStore {
    /// A store holding default settings; nothing is read from disk.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            settings: Settings::default(),
        }
    }

    /// A store that starts from the file at `path` when it exists, defaults otherwise.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let mut store = Self::new(path);
        if store.path.exists() {
            store.load()?;
        } else {
            debug!(path = %store.path.display(), "settings file missing, using defaults");
        }
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut Settings {
        &mut self.settings
    }

    /// Replace the in-memory settings with the file contents.
    ///
    /// The file is parsed and validated in full before anything is replaced;
    /// on failure the current settings stay as they were.
    pub fn load(&mut self) -> Result<()> {
        let path = self.path.to_string_lossy().into_owned();
        let loaded = Settings::from_file(&path)?;
        self.settings = loaded;
        info!(path = %path, "settings loaded");
        Ok(())
    }

    pub fn save(&self) -> Result<()> {
        let path = self.path.to_string_lossy().into_owned();
        self.settings.save_to_file(&path)?;
        info!(path = %path, "settings saved");
        Ok(())
    }
}

/// Parse a duration such as `"250ms"`, `"2s"`, `"5m"`, `"1h"` or a bare
/// millisecond count like `"1000"`. Case-insensitive, surrounding whitespace
/// ignored.
pub fn parse_duration(value: &str) -> Result<Duration> {
    let text = value.trim().to_lowercase();
    if text.is_empty() {
        return Err(CastError::invalid_duration(value, "empty duration"));
    }

    let split = text
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(text.len());
    let (digits, unit) = text.split_at(split);

    if digits.is_empty() {
        return Err(CastError::invalid_duration(
            value,
            "expected a non-negative whole number",
        ));
    }

    let amount: u64 = digits
        .parse()
        .map_err(|e: std::num::ParseIntError| CastError::invalid_duration(value, e.to_string()))?;

    match unit.trim() {
        "" | "ms" => Ok(Duration::from_millis(amount)),
        "s" => Ok(Duration::from_secs(amount)),
        "m" => Ok(Duration::from_secs(amount.saturating_mul(60))),
        "h" => Ok(Duration::from_secs(amount.saturating_mul(3600))),
        other => Err(CastError::invalid_duration(
            value,
            format!("unknown unit '{other}'"),
        )),
    }
}

/// Render a duration in the largest unit that represents it exactly.
pub fn format_duration(duration: Duration) -> String {
    let ms = duration.as_millis();
    if ms > 0 && ms % 60_000 == 0 {
        format!("{}m", ms / 60_000)
    } else if ms > 0 && ms % 1000 == 0 {
        format!("{}s", ms / 1000)
    } else {
        format!("{ms}ms")
    }
}

/// Serde adapter writing durations as strings and reading strings or milliseconds.
pub mod duration_format {
    use super::{format_duration, parse_duration};
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Millis(u64),
        Text(String),
    }

    pub fn serialize<S: Serializer>(
        duration: &Duration,
        serializer: S,
    ) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&format_duration(*duration))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> std::result::Result<Duration, D::Error> {
        match Raw::deserialize(deserializer)? {
            Raw::Millis(ms) => Ok(Duration::from_millis(ms)),
            Raw::Text(text) => parse_duration(&text).map_err(serde::de::Error::custom),
        }
    }
}

/// [`duration_format`] for optional fields.
pub mod optional_duration {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    #[derive(Deserialize)]
    struct Wrapper(#[serde(with = "super::duration_format")] Duration);

    pub fn serialize<S: Serializer>(
        duration: &Option<Duration>,
        serializer: S,
    ) -> std::result::Result<S::Ok, S::Error> {
        match duration {
            Some(d) => super::duration_format::serialize(d, serializer),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> std::result::Result<Option<Duration>, D::Error> {
        Ok(Option::<Wrapper>::deserialize(deserializer)?.map(|Wrapper(d)| d))
    }
}
