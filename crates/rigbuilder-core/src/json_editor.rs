//! Raw JSON editing of the configuration document

use crate::config::{ConfigData, ConfigError};

/// Editable text buffer plus the error from the last failed apply
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JsonEditor {
    pub text: String,
    error: Option<String>,
}

impl JsonEditor {
    pub fn new(config: &ConfigData) -> Self {
        let mut editor = Self::default();
        editor.load(config);
        editor
    }

    /// Replace the buffer with the pretty-printed configuration
    pub fn load(&mut self, config: &ConfigData) {
        match config.to_json_pretty() {
            Ok(text) => {
                self.text = text;
                self.error = None;
            }
            Err(e) => {
                tracing::error!("Failed to serialize configuration: {}", e);
                self.error = Some(e.to_string());
            }
        }
    }

    /// Parse and validate the buffer.
    ///
    /// On failure the error is kept for display and the caller's
    /// configuration is not touched.
    pub fn apply(&mut self) -> Result<ConfigData, ConfigError> {
        match ConfigData::from_json(&self.text) {
            Ok(config) => {
                self.error = None;
                Ok(config)
            }
            Err(e) => {
                tracing::warn!("Rejected edited configuration: {}", e);
                self.error = Some(e.to_string());
                Err(e)
            }
        }
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}
