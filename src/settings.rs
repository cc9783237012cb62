/*!
 * Persistent user settings
 *
 * Settings live in a JSON document using the same camelCase keys the
 * settings form edits. Every update is validated, written back and then
 * announced to subscribers so views can refresh.
 */

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{PromptError, Result};
use crate::formatter::OutputFormat;
use crate::matcher::IgnoreRules;
use crate::{bail, ensure};

/// Application directory under the platform config dir
const APP_DIR: &str = "promptfs";

/// Settings file name
const SETTINGS_FILE: &str = "settings.json";

/// Recognized options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    /// Show entries whose name starts with a dot
    pub include_hidden: bool,
    /// Apply ignore patterns to folder names too
    pub include_directories: bool,
    /// Show files that .gitignore rules would hide
    #[serde(alias = "ignoreGitignore")]
    pub override_gitignore: bool,
    /// User ignore patterns
    pub ignore_patterns: Vec<String>,
    /// Prompt layout
    pub output_format: OutputFormat,
    /// Prefix prompts with the project-structure diagram
    pub include_tree_structure: bool,
    /// Score threshold handed to the fuzzy file search
    pub fuzzy_search_threshold: f64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            include_hidden: false,
            include_directories: true,
            override_gitignore: false,
            ignore_patterns: Vec::new(),
            output_format: OutputFormat::ClaudeXml,
            include_tree_structure: false,
            fuzzy_search_threshold: 0.6,
        }
    }
}

impl Settings {
    /// Filtering rules derived from these settings
    pub fn ignore_rules(&self) -> IgnoreRules {
        IgnoreRules {
            patterns: self.ignore_patterns.clone(),
            include_hidden: self.include_hidden,
            apply_filters_to_directories: self.include_directories,
            respect_gitignore: !self.override_gitignore,
        }
    }

    fn validate(&self) -> Result<()> {
        ensure!(
            (0.0..=1.0).contains(&self.fuzzy_search_threshold),
            Settings,
            "fuzzySearchThreshold must be between 0 and 1, got {}",
            self.fuzzy_search_threshold
        );
        Ok(())
    }
}

/// Callback run after settings change
pub type SettingsListener = Box<dyn Fn(&Settings) + Send + Sync>;

/// Settings with optional file persistence
pub struct SettingsStore {
    path: Option<PathBuf>,
    settings: Settings,
    listeners: Vec<SettingsListener>,
}

impl SettingsStore {
    /// Default settings file location
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_DIR).join(SETTINGS_FILE))
    }

    /// A store that is never written to disk
    pub fn in_memory(settings: Settings) -> Self {
        Self {
            path: None,
            settings,
            listeners: Vec::new(),
        }
    }

    /// Load settings from `path`, falling back to defaults when it does not exist
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let settings = if path.exists() {
            let content = fs::read_to_string(&path)?;
            let settings: Settings = serde_json::from_str(&content)?;
            settings.validate()?;
            debug!("Loaded settings from {}", path.display());
            settings
        } else {
            debug!("No settings at {}, using defaults", path.display());
            Settings::default()
        };

        Ok(Self {
            path: Some(path),
            settings,
            listeners: Vec::new(),
        })
    }

    /// Current settings
    pub fn get(&self) -> &Settings {
        &self.settings
    }

    /// Backing file, if any
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Run `listener` after each successful update
    pub fn subscribe(&mut self, listener: SettingsListener) {
        self.listeners.push(listener);
    }

    /// Set one option by its camelCase key
    ///
    /// The previous settings are kept when the key is unknown, the value has
    /// the wrong type or the settings file cannot be written.
    pub fn update(&mut self, key: &str, value: Value) -> Result<()> {
        let key = canonical_key(key);
        let mut document = serde_json::to_value(&self.settings)?;

        let Some(fields) = document.as_object_mut() else {
            bail!(Settings, "settings are not a JSON object");
        };
        if !fields.contains_key(key) {
            bail!(Settings, "unknown setting '{}'", key);
        }
        fields.insert(key.to_string(), value);

        let updated: Settings = serde_json::from_value(document)
            .map_err(|e| PromptError::Settings(format!("invalid value for '{}': {}", key, e)))?;
        updated.validate()?;

        self.write(&updated)?;
        self.settings = updated;
        info!("Updated setting {}", key);

        for listener in &self.listeners {
            listener(&self.settings);
        }
        Ok(())
    }

    /// Set one option from command-line text
    ///
    /// The text is read as JSON when it parses, otherwise as a plain string.
    pub fn update_from_str(&mut self, key: &str, raw: &str) -> Result<()> {
        let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
        self.update(key, value)
    }

    /// Write settings to the backing file
    pub fn save(&self) -> Result<()> {
        self.write(&self.settings)
    }

    fn write(&self, settings: &Settings) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(settings)?)?;
        Ok(())
    }
}

fn canonical_key(key: &str) -> &str {
    match key {
        "ignoreGitignore" => "overrideGitignore",
        other => other,
    }
}
