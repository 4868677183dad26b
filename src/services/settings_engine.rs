// Bookmark sync settings engine
// Manages application settings: loading, saving, updating individual values, and resetting to defaults.
// Settings are stored as a JSON file at the platform-specific config path.

use std::fs;
use std::path::Path;

use crate::platform;
use crate::types::errors::SettingsError;
use crate::types::settings::SyncSettings;

/// Trait defining the settings engine interface.
pub trait SettingsEngineTrait {
    fn load(&mut self) -> Result<SyncSettings, SettingsError>;
    fn save(&self) -> Result<(), SettingsError>;
    fn get_settings(&self) -> &SyncSettings;
    fn set_value(&mut self, key: &str, value: serde_json::Value) -> Result<(), SettingsError>;
    fn reset(&mut self) -> Result<(), SettingsError>;
    fn get_config_path(&self) -> &str;
}

/// Settings engine implementation that persists settings as JSON on disk.
pub struct SettingsEngine {
    config_path: String,
    settings: SyncSettings,
}

impl SettingsEngine {
    /// Creates a new SettingsEngine.
    ///
    /// If `path_override` is `Some`, uses that path for the config file.
    /// Otherwise, uses the platform-specific config directory with `settings.json`.
    pub fn new(path_override: Option<String>) -> Self {
        let config_path = match path_override {
            Some(p) => p,
            None => platform::get_config_dir()
                .join("settings.json")
                .to_string_lossy()
                .to_string(),
        };

        Self {
            config_path,
            settings: SyncSettings::default(),
        }
    }

    /// Starts from `settings` instead of the defaults. Nothing is written until a change.
    pub fn with_settings(mut self, settings: SyncSettings) -> Self {
        self.settings = settings;
        self
    }
}

impl SettingsEngineTrait for SettingsEngine {
    /// Loads settings from the JSON config file.
    ///
    /// If the file does not exist, returns default settings.
    /// If the file exists but is malformed, returns a serialization error.
    fn load(&mut self) -> Result<SyncSettings, SettingsError> {
        let path = Path::new(&self.config_path);

        if !path.exists() {
            tracing::debug!(path = %self.config_path, "no settings file, using defaults");
            self.settings = SyncSettings::default();
            return Ok(self.settings.clone());
        }

        let content = fs::read_to_string(path)
            .map_err(|e| SettingsError::IoError(format!("Failed to read config file: {}", e)))?;

        let settings: SyncSettings = serde_json::from_str(&content).map_err(|e| {
            SettingsError::SerializationError(format!("Failed to parse config file: {}", e))
        })?;

        self.settings = settings;
        Ok(self.settings.clone())
    }

    /// Saves the current settings to the JSON config file.
    ///
    /// Creates parent directories if they don't exist.
    fn save(&self) -> Result<(), SettingsError> {
        let path = Path::new(&self.config_path);

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                SettingsError::IoError(format!("Failed to create config directory: {}", e))
            })?;
        }

        let json = serde_json::to_string_pretty(&self.settings).map_err(|e| {
            SettingsError::SerializationError(format!("Failed to serialize settings: {}", e))
        })?;

        fs::write(path, json)
            .map_err(|e| SettingsError::IoError(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    fn get_settings(&self) -> &SyncSettings {
        &self.settings
    }

    /// Updates one setting by dot-separated key and saves.
    ///
    /// The key must name an existing field, except under `auth.accounts`
    /// where a new provider entry may be added. The whole document is
    /// re-validated before anything is written.
    ///
    /// # Examples
    /// - `"sync.refetch_debounce_ms"` → `settings.sync.refetch_debounce_ms`
    /// - `"auth.accounts.github"` → the account used for GitHub sign-in
    fn set_value(&mut self, key: &str, value: serde_json::Value) -> Result<(), SettingsError> {
        let (section, field) = match key.rsplit_once('.') {
            Some((section, field)) => (Some(section), field),
            None => (None, key),
        };
        if field.is_empty() {
            return Err(SettingsError::InvalidKey(format!("Malformed key '{}'", key)));
        }
        let not_found = || SettingsError::InvalidKey(format!("Key '{}' not found in settings", key));

        let mut document = serde_json::to_value(&self.settings).map_err(|e| {
            SettingsError::SerializationError(format!("Failed to serialize settings: {}", e))
        })?;

        let pointer = section
            .map(|s| format!("/{}", s.replace('.', "/")))
            .unwrap_or_default();
        let parent = document
            .pointer_mut(&pointer)
            .and_then(serde_json::Value::as_object_mut)
            .ok_or_else(not_found)?;
        if !parent.contains_key(field) && section != Some("auth.accounts") {
            return Err(not_found());
        }
        parent.insert(field.to_string(), value);

        self.settings = serde_json::from_value(document).map_err(|e| {
            SettingsError::InvalidValue(format!("Invalid value for key '{}': {}", key, e))
        })?;
        tracing::debug!(key, "setting updated");
        self.save()
    }

    /// Resets all settings to defaults and saves to disk.
    fn reset(&mut self) -> Result<(), SettingsError> {
        self.settings = SyncSettings::default();
        self.save()?;
        Ok(())
    }

    fn get_config_path(&self) -> &str {
        &self.config_path
    }
}
