use crate::error::TaggerError;
use crate::models::ConfigsModel;
use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::fs;

/// Prefix of environment variables that override settings (`DOCTAGGER_EXTENSION`, ...)
pub const ENV_PREFIX: &str = "DOCTAGGER";

/// Application settings.
///
/// Layered from built-in defaults, an optional YAML settings file and
/// `DOCTAGGER_*` environment variables, later layers winning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Source file extension processed when the target is a directory
    pub extension: String,
    pub log_dir: String,
    pub log_prefix: String,
    pub debug: bool,
    /// Run everything but write nothing back
    pub dry_run: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            extension: "java".to_string(),
            log_dir: "logs".to_string(),
            log_prefix: "doctagger".to_string(),
            debug: false,
            dry_run: false,
        }
    }
}

/// Loads and saves tag definitions and application settings.
#[derive(Debug, Clone, Default)]
pub struct ConfigManager {
    settings_path: Option<Utf8PathBuf>,
}

impl ConfigManager {
    /// `settings_path` is optional; a missing file falls back to defaults.
    pub fn new(settings_path: Option<Utf8PathBuf>) -> Self {
        Self { settings_path }
    }

    /// Load a tag definition document.
    ///
    /// The rule order of the document is kept exactly. Any failure is a
    /// fatal [`TaggerError::ConfigurationLoad`].
    pub fn load_definition(&self, path: &Utf8Path) -> Result<ConfigsModel, TaggerError> {
        let file_contents = fs::read_to_string(path).map_err(|e| TaggerError::ConfigurationLoad {
            path: path.to_owned(),
            reason: e.to_string(),
        })?;

        let model: ConfigsModel =
            serde_yaml_ng::from_str(&file_contents).map_err(|e| TaggerError::ConfigurationLoad {
                path: path.to_owned(),
                reason: e.to_string(),
            })?;

        tracing::info!("Loaded {} tag rule(s) from {}", model.len(), path);
        Ok(model)
    }

    /// Save a tag definition document.
    pub fn save_definition(&self, path: &Utf8Path, model: &ConfigsModel) -> Result<()> {
        let yaml_string =
            serde_yaml_ng::to_string(model).context("Failed to serialize tag definition to YAML")?;

        if let Some(parent) = path.parent()
            && !parent.as_str().is_empty()
            && !parent.exists()
        {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create definition directory: {}", parent))?;
        }

        fs::write(path, yaml_string)
            .with_context(|| format!("Failed to write tag definition: {}", path))?;

        tracing::info!("Saved {} tag rule(s) to {}", model.len(), path);
        Ok(())
    }

    /// Load application settings.
    pub fn load_settings(&self) -> Result<Settings> {
        let defaults = Settings::default();
        let mut builder = Config::builder()
            .set_default("extension", defaults.extension)?
            .set_default("log_dir", defaults.log_dir)?
            .set_default("log_prefix", defaults.log_prefix)?
            .set_default("debug", defaults.debug)?
            .set_default("dry_run", defaults.dry_run)?;

        if let Some(path) = &self.settings_path {
            if path.exists() {
                tracing::info!("Loading settings from {}", path);
            } else {
                tracing::warn!("Settings file not found at {}, using defaults", path);
            }
            builder = builder.add_source(File::new(path.as_str(), FileFormat::Yaml).required(false));
        }

        let settings: Settings = builder
            .add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()
            .context("Failed to build settings")?
            .try_deserialize()
            .context("Failed to parse settings")?;

        tracing::debug!(?settings, "Settings resolved");
        Ok(settings)
    }

    /// Save application settings as YAML to the configured settings path.
    pub fn save_settings(&self, settings: &Settings) -> Result<()> {
        let Some(path) = &self.settings_path else {
            anyhow::bail!("No settings path configured");
        };
        let yaml_string =
            serde_yaml_ng::to_string(settings).context("Failed to serialize settings to YAML")?;

        fs::write(path, yaml_string).with_context(|| format!("Failed to write settings: {}", path))?;

        tracing::info!("Saved settings to {}", path);
        Ok(())
    }
}
