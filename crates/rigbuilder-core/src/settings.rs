//! Application settings loaded from TOML

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("TOML error: {0}")]
    TomlError(#[from] toml::de::Error),
    #[error("Invalid shortcut {0:?}")]
    InvalidShortcut(String),
}

/// Top-level settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub storage: StorageSettings,
    #[serde(default)]
    pub model: ModelSettings,
    #[serde(default)]
    pub capture: CaptureSettings,
    #[serde(default)]
    pub admin: AdminSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageSettings {
    /// Storage key of the configuration document
    #[serde(default = "default_config_key")]
    pub config_key: String,
    /// Storage key of the cart snapshot
    #[serde(default = "default_cart_key")]
    pub cart_key: String,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            config_key: default_config_key(),
            cart_key: default_cart_key(),
        }
    }
}

fn default_config_key() -> String {
    "pcConfig".to_string()
}

fn default_cart_key() -> String {
    "pcCart".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSettings {
    /// glTF asset path, relative to the asset root
    #[serde(default = "default_model_path")]
    pub path: String,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            path: default_model_path(),
        }
    }
}

fn default_model_path() -> String {
    "models/PC.glb".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptureSettings {
    /// Wait after the last visibility change before reading the canvas
    #[serde(default = "default_settle_delay")]
    pub settle_delay_ms: u64,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            settle_delay_ms: default_settle_delay(),
        }
    }
}

fn default_settle_delay() -> u64 {
    150
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AdminSettings {
    /// Keyboard shortcut that opens the admin view
    #[serde(default)]
    pub shortcut: Shortcut,
}

/// Modifier + letter/digit chord, written like `Ctrl+Shift+A`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Shortcut {
    pub ctrl: bool,
    pub shift: bool,
    pub alt: bool,
    /// Uppercase ASCII letter or digit
    pub key: char,
}

impl Default for Shortcut {
    fn default() -> Self {
        Self {
            ctrl: true,
            shift: true,
            alt: false,
            key: 'A',
        }
    }
}

impl Shortcut {
    pub fn parse(raw: &str) -> Result<Self, SettingsError> {
        let invalid = || SettingsError::InvalidShortcut(raw.to_string());
        let mut shortcut = Shortcut {
            ctrl: false,
            shift: false,
            alt: false,
            key: ' ',
        };
        let mut key = None;
        for token in raw.split('+').map(str::trim) {
            match token.to_lowercase().as_str() {
                "ctrl" | "control" | "cmd" => shortcut.ctrl = true,
                "shift" => shortcut.shift = true,
                "alt" | "option" => shortcut.alt = true,
                _ => {
                    let mut chars = token.chars();
                    match (chars.next(), chars.next(), key) {
                        (Some(c), None, None) if c.is_ascii_alphanumeric() => {
                            key = Some(c.to_ascii_uppercase())
                        }
                        _ => return Err(invalid()),
                    }
                }
            }
        }
        shortcut.key = key.ok_or_else(invalid)?;
        Ok(shortcut)
    }
}

impl TryFrom<String> for Shortcut {
    type Error = SettingsError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Shortcut> for String {
    fn from(shortcut: Shortcut) -> Self {
        shortcut.to_string()
    }
}

impl fmt::Display for Shortcut {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.ctrl {
            write!(f, "Ctrl+")?;
        }
        if self.shift {
            write!(f, "Shift+")?;
        }
        if self.alt {
            write!(f, "Alt+")?;
        }
        write!(f, "{}", self.key)
    }
}

impl Settings {
    pub fn from_toml_str(content: &str) -> Result<Self, SettingsError> {
        Ok(toml::from_str(content)?)
    }

    /// Parse embedded settings, falling back to defaults on error
    pub fn from_toml_or_default(content: &str) -> Self {
        match Self::from_toml_str(content) {
            Ok(settings) => settings,
            Err(e) => {
                tracing::warn!("Invalid settings, using defaults: {}", e);
                Self::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::from_toml_str("").unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.storage.config_key, "pcConfig");
        assert_eq!(settings.storage.cart_key, "pcCart");
        assert_eq!(settings.model.path, "models/PC.glb");
        assert_eq!(settings.capture.settle_delay_ms, 150);
        assert_eq!(settings.admin.shortcut.to_string(), "Ctrl+Shift+A");
    }

    #[test]
    fn test_partial_override() {
        let settings = Settings::from_toml_str(
            r#"
            [storage]
            cart_key = "cart"

            [admin]
            shortcut = "alt+k"
            "#,
        )
        .unwrap();
        assert_eq!(settings.storage.config_key, "pcConfig");
        assert_eq!(settings.storage.cart_key, "cart");
        assert_eq!(
            settings.admin.shortcut,
            Shortcut {
                ctrl: false,
                shift: false,
                alt: true,
                key: 'K',
            }
        );
    }

    #[test]
    fn test_shortcut_parse_errors() {
        for raw in ["", "Ctrl+Shift", "Ctrl+AB", "Ctrl+A+B", "Ctrl+?"] {
            assert!(Shortcut::parse(raw).is_err(), "{raw:?}");
        }
        assert!(Settings::from_toml_str("[admin]\nshortcut = \"Ctrl+\"").is_err());
    }

    #[test]
    fn test_invalid_toml_falls_back() {
        let settings = Settings::from_toml_or_default("[capture]\nsettle_delay_ms = \"soon\"");
        assert_eq!(settings, Settings::default());
    }
}
