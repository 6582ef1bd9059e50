//! Custom error types for quickcast.
//!
//! This module provides structured error types using `thiserror` for better
//! error handling and more informative error messages.

use std::io;
use thiserror::Error;

/// Main error type for quickcast operations.
#[derive(Error, Debug)]
pub enum CastError {
    /// A platform capability (key listener, input injection, runtime) is missing.
    #[error("unavailable: {0}")]
    Unavailable(String),

    /// The specified key cannot be resolved to a scan or virtual-key code.
    #[error("invalid key '{key}': {reason}")]
    InvalidKey { key: String, reason: String },

    /// A macro with the same name is already registered.
    #[error("macro '{0}' already exists")]
    DuplicateMacro(String),

    /// An auto-cast entry with the same hotkey is already registered.
    #[error("auto-cast entry for '{0}' already exists")]
    DuplicateAutoCast(String),

    /// Configuration validation error.
    #[error("configuration error: {0}")]
    ConfigValidation(String),

    /// Error reading or parsing the settings file.
    #[error("failed to load settings from '{path}': {reason}")]
    ConfigLoad { path: String, reason: String },

    /// Error writing the settings file.
    #[error("failed to save settings to '{path}': {reason}")]
    ConfigSave { path: String, reason: String },

    /// Error parsing duration string.
    #[error("invalid duration '{value}': {reason}")]
    InvalidDuration { value: String, reason: String },

    /// Error registering or handling a global hotkey.
    #[error("hotkey error: {0}")]
    Hotkey(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for quickcast operations.
pub type Result<T> = std::result::Result<T, CastError>;

impl CastError {
    /// Create a new Unavailable error.
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable(message.into())
    }

    /// Create a new InvalidKey error.
    pub fn invalid_key(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidKey {
            key: key.into(),
            reason: reason.into(),
        }
    }

    /// Create a new DuplicateMacro error.
    pub fn duplicate_macro(name: impl Into<String>) -> Self {
        Self::DuplicateMacro(name.into())
    }

    /// Create a new DuplicateAutoCast error.
    pub fn duplicate_auto_cast(hotkey: impl Into<String>) -> Self {
        Self::DuplicateAutoCast(hotkey.into())
    }

    /// Create a new ConfigValidation error.
    pub fn config_validation(message: impl Into<String>) -> Self {
        Self::ConfigValidation(message.into())
    }

    /// Create a new ConfigLoad error.
    pub fn config_load(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ConfigLoad {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a new ConfigSave error.
    pub fn config_save(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ConfigSave {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a new InvalidDuration error.
    pub fn invalid_duration(value: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidDuration {
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// Create a new Hotkey error.
    pub fn hotkey(message: impl Into<String>) -> Self {
        Self::Hotkey(message.into())
    }
}
