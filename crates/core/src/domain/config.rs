//! Configuration and preset management for ChopShop
//!
//! This module provides:
//! - The TOML configuration shape (application settings, effect parameters, chain order)
//! - A preset store keyed by name
//! - The main config file manager with factory-default fallback

use crate::domain::audio::{ProcessSpec, DEFAULT_BPM, MAX_CHANNELS};
use crate::domain::chain::ChainConfiguration;
use crate::domain::params::{EffectParameters, StutterRate, TriggerMode};
use crate::domain::processor::ProcessorState;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use tracing::{debug, error, info, instrument, warn};

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Largest block size accepted from configuration
pub const MAX_BLOCK_SIZE: usize = 16384;

/// Errors that can occur during configuration operations
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Preset not found: {0}")]
    PresetNotFound(String),
}

/// Application-level settings used by offline hosts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Block size in frames
    pub block_size: usize,

    /// Sample rate assumed when none comes from the audio source
    pub sample_rate: u32,

    /// Tempo used when no host tempo is supplied
    pub default_bpm: f64,

    /// Preset directory
    pub preset_dir: PathBuf,

    /// Channel count assumed when none comes from the audio source
    pub channels: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            block_size: 512,
            sample_rate: 48000,
            default_bpm: DEFAULT_BPM,
            preset_dir: PathBuf::from("presets"),
            channels: 2,
        }
    }
}

impl AppConfig {
    /// Reject values no session could run with
    pub fn validate(&self) -> Result<()> {
        if self.block_size == 0 || self.block_size > MAX_BLOCK_SIZE {
            return Err(ConfigError::Invalid(format!(
                "block_size must be in 1..={} (got {})",
                MAX_BLOCK_SIZE, self.block_size
            )));
        }
        if self.sample_rate == 0 {
            return Err(ConfigError::Invalid("sample_rate must be non-zero".to_string()));
        }
        if self.channels == 0 || self.channels > MAX_CHANNELS {
            return Err(ConfigError::Invalid(format!(
                "channels must be in 1..={} (got {})",
                MAX_CHANNELS, self.channels
            )));
        }
        Ok(())
    }

    /// Session spec for these settings
    pub fn process_spec(&self) -> ProcessSpec {
        ProcessSpec::new(self.sample_rate, self.block_size, self.channels)
    }

    /// Configured tempo, or the 120 BPM fallback when it is unusable
    pub fn tempo(&self) -> f64 {
        if self.default_bpm.is_finite() && self.default_bpm > 0.0 {
            self.default_bpm
        } else {
            DEFAULT_BPM
        }
    }
}

/// Root configuration / preset file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ChopShopConfig {
    /// Textual stage order, e.g. `"0,1,2,3"`
    #[serde(default)]
    pub chain_order: ChainConfiguration,

    #[serde(default)]
    pub app: AppConfig,

    #[serde(default)]
    pub parameters: EffectParameters,
}

impl ChopShopConfig {
    /// Load configuration from TOML file
    ///
    /// Parameter values are clamped into range; application settings that
    /// cannot work are rejected.
    #[instrument(skip(path))]
    pub async fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!(path = %path.display(), "Loading configuration");

        let contents = fs::read_to_string(path).await?;
        let config = Self::from_toml(&contents)?;

        debug!("Configuration loaded successfully");
        Ok(config)
    }

    /// Save configuration to TOML file
    #[instrument(skip(self, path))]
    pub async fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        info!(path = %path.display(), "Saving configuration");

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        fs::write(path, self.to_toml()?).await?;

        debug!("Configuration saved successfully");
        Ok(())
    }

    /// Parse and sanitize TOML text
    pub fn from_toml(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)?;
        config.app.validate()?;

        let sanitized = config.sanitized();
        if sanitized.parameters != config.parameters {
            warn!("Out-of-range parameters clamped");
        }
        Ok(sanitized)
    }

    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Copy with parameters clamped into range
    pub fn sanitized(&self) -> Self {
        Self {
            parameters: self.parameters.sanitized(),
            ..self.clone()
        }
    }

    /// Processor state carried by this config
    pub fn processor_state(&self) -> ProcessorState {
        ProcessorState {
            parameters: self.parameters,
            chain_order: self.chain_order.to_string(),
        }
    }

    /// Replace parameters and chain order from processor state
    pub fn set_processor_state(&mut self, state: &ProcessorState) {
        self.parameters = state.parameters.sanitized();
        self.chain_order = ChainConfiguration::parse_lenient(&state.chain_order);
    }

    /// Factory default configuration
    pub fn factory_default() -> Self {
        Self::default()
    }
}

/// Built-in presets shipped with the application
pub fn factory_presets() -> Vec<(&'static str, ChopShopConfig)> {
    let preset = |parameters: EffectParameters, chain: &str| ChopShopConfig {
        app: AppConfig::default(),
        parameters,
        chain_order: ChainConfiguration::parse_lenient(chain),
    };

    vec![
        ("init", preset(EffectParameters::default(), "0,1,2,3")),
        (
            "tape-stop",
            preset(
                EffectParameters {
                    stutter_rate: StutterRate::Quarter,
                    pitch_semitones: -12.0,
                    speed_percent: 50.0,
                    link: true,
                    ..Default::default()
                },
                "0,1,2,3",
            ),
        ),
        (
            "glitch-32",
            preset(
                EffectParameters {
                    stutter_rate: StutterRate::ThirtySecond,
                    trigger_mode: TriggerMode::Threshold,
                    threshold_db: -18.0,
                    mix: 0.8,
                    ..Default::default()
                },
                "0,1,2,3",
            ),
        ),
        (
            "reverse-octave",
            preset(
                EffectParameters {
                    stutter_rate: StutterRate::Sixteenth,
                    pitch_semitones: 12.0,
                    reverse: true,
                    trigger_mode: TriggerMode::Midi,
                    ..Default::default()
                },
                "0,3,1,2",
            ),
        ),
    ]
}

/// Look up one factory preset by name
pub fn factory_preset(name: &str) -> Option<ChopShopConfig> {
    factory_presets()
        .into_iter()
        .find(|(preset, _)| *preset == name)
        .map(|(_, config)| config)
}

/// Named presets stored as `<dir>/<name>.toml`
pub struct PresetManager {
    preset_dir: PathBuf,
}

impl PresetManager {
    /// Create a new preset manager
    pub fn new(preset_dir: PathBuf) -> Self {
        Self { preset_dir }
    }

    /// `<config dir>/chopshop/presets`
    pub fn default_preset_dir() -> Result<PathBuf> {
        ConfigManager::default_config_dir().map(|dir| dir.join("presets"))
    }

    pub fn preset_dir(&self) -> &Path {
        &self.preset_dir
    }

    fn preset_path(&self, name: &str) -> Result<PathBuf> {
        let valid = !name.is_empty()
            && !name.starts_with('.')
            && name
                .chars()
                .all(|c| c.is_alphanumeric() || matches!(c, '-' | '_' | ' ' | '.'));
        if !valid {
            return Err(ConfigError::Invalid(format!("invalid preset name '{}'", name)));
        }
        Ok(self.preset_dir.join(format!("{}.toml", name)))
    }

    /// List all available presets
    #[instrument(skip(self))]
    pub async fn list_presets(&self) -> Result<Vec<String>> {
        let mut presets = Vec::new();

        if !self.preset_dir.exists() {
            return Ok(presets);
        }

        let mut entries = fs::read_dir(&self.preset_dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().map(|e| e == "toml").unwrap_or(false) {
                if let Some(name) = path.file_stem().and_then(|n| n.to_str()) {
                    presets.push(name.to_string());
                }
            }
        }

        presets.sort();
        debug!(count = presets.len(), "Listed presets");
        Ok(presets)
    }

    /// Load a preset by name
    #[instrument(skip(self))]
    pub async fn load_preset(&self, name: &str) -> Result<ChopShopConfig> {
        let path = self.preset_path(name)?;

        if !path.exists() {
            return Err(ConfigError::PresetNotFound(name.to_string()));
        }

        ChopShopConfig::load_from_file(&path).await
    }

    /// Save a preset by name
    #[instrument(skip(self, config))]
    pub async fn save_preset(&self, name: &str, config: &ChopShopConfig) -> Result<()> {
        let path = self.preset_path(name)?;
        config.save_to_file(&path).await
    }

    /// Delete a preset by name
    #[instrument(skip(self))]
    pub async fn delete_preset(&self, name: &str) -> Result<()> {
        let path = self.preset_path(name)?;

        if !path.exists() {
            return Err(ConfigError::PresetNotFound(name.to_string()));
        }

        fs::remove_file(&path).await?;
        info!(name, "Preset deleted");
        Ok(())
    }

    /// Check if a preset exists
    pub async fn preset_exists(&self, name: &str) -> bool {
        self.preset_path(name).map(|p| p.exists()).unwrap_or(false)
    }

    /// Write every factory preset that is not already on disk
    #[instrument(skip(self))]
    pub async fn install_factory_presets(&self) -> Result<usize> {
        let mut installed = 0;
        for (name, config) in factory_presets() {
            if !self.preset_exists(name).await {
                self.save_preset(name, &config).await?;
                installed += 1;
            }
        }
        info!(installed, "Factory presets installed");
        Ok(installed)
    }
}

/// The main config file at `<config dir>/chopshop/config.toml`
pub struct ConfigManager {
    config_dir: PathBuf,
    config_path: PathBuf,
}

impl ConfigManager {
    pub fn new(config_dir: PathBuf) -> Self {
        let config_path = config_dir.join("config.toml");
        Self {
            config_dir,
            config_path,
        }
    }

    /// `~/.config/chopshop` on Linux, the platform equivalent elsewhere
    pub fn default_config_dir() -> Result<PathBuf> {
        dirs::config_dir()
            .map(|p| p.join("chopshop"))
            .ok_or_else(|| ConfigError::Invalid("Could not determine config directory".to_string()))
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Load the config, falling back to factory defaults
    ///
    /// A missing file is created from defaults. A corrupt file is copied
    /// aside as `config.toml.corrupt` and defaults are returned.
    #[instrument(skip(self))]
    pub async fn load(&self) -> ChopShopConfig {
        if !self.config_path.exists() {
            info!(
                path = %self.config_path.display(),
                "Config file not found, creating factory default"
            );

            let config = ChopShopConfig::factory_default();
            if let Err(e) = self.save(&config).await {
                error!(
                    path = %self.config_path.display(),
                    error = %e,
                    "Failed to save factory default config"
                );
            }
            return config;
        }

        match ChopShopConfig::load_from_file(&self.config_path).await {
            Ok(config) => config,
            Err(e) => {
                error!(
                    path = %self.config_path.display(),
                    error = %e,
                    "Failed to load config, using factory default"
                );

                let backup_path = self.config_path.with_extension("toml.corrupt");
                if let Err(copy_err) = fs::copy(&self.config_path, &backup_path).await {
                    error!(
                        path = %backup_path.display(),
                        error = %copy_err,
                        "Failed to backup corrupt config"
                    );
                }

                ChopShopConfig::factory_default()
            }
        }
    }

    #[instrument(skip(self, config))]
    pub async fn save(&self, config: &ChopShopConfig) -> Result<()> {
        fs::create_dir_all(&self.config_dir).await?;
        config.save_to_file(&self.config_path).await
    }

    /// Delete the config file if present
    #[instrument(skip(self))]
    pub async fn clear(&self) -> Result<()> {
        if self.config_path.exists() {
            fs::remove_file(&self.config_path).await?;
            info!(path = %self.config_path.display(), "Configuration cleared");
        }
        Ok(())
    }

    pub fn exists(&self) -> bool {
        self.config_path.exists()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::chain::EffectStage;
    use tempfile::TempDir;

    #[test]
    fn test_config_serialization() {
        let mut config = ChopShopConfig::factory_default();
        config.parameters.stutter_rate = StutterRate::Sixteenth;
        config.parameters.trigger_mode = TriggerMode::Threshold;
        config.chain_order = ChainConfiguration::parse_lenient("3,2,1,0");

        let toml_str = config.to_toml().unwrap();
        assert!(toml_str.contains("stutter_rate = \"1/16\""));
        assert!(toml_str.contains("trigger_mode = \"threshold\""));
        assert!(toml_str.contains("chain_order = \"3,2,1,0\""));

        let parsed = ChopShopConfig::from_toml(&toml_str).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config = ChopShopConfig::from_toml("[parameters]\npitch_semitones = 5.0\n").unwrap();
        assert_eq!(config.parameters.pitch_semitones, 5.0);
        assert_eq!(config.parameters.speed_percent, 100.0);
        assert_eq!(config.app, AppConfig::default());
        assert_eq!(config.chain_order, ChainConfiguration::default());
    }

    #[test]
    fn test_out_of_range_values_clamped() {
        let text = "chain_order = \"2,x,0\"\n[parameters]\nspeed_percent = 900.0\nthreshold_db = -80.0\n";
        let config = ChopShopConfig::from_toml(text).unwrap();
        assert_eq!(config.parameters.speed_percent, 200.0);
        assert_eq!(config.parameters.threshold_db, -60.0);
        assert_eq!(config.chain_order.to_string(), "2,1,0,3");
    }

    #[test]
    fn test_invalid_app_rejected() {
        let err = ChopShopConfig::from_toml("[app]\nblock_size = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let err = ChopShopConfig::from_toml("[parameters]\nstutter_rate = \"1/3\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::TomlParse(_)));
    }

    #[test]
    fn test_processor_state_conversion() {
        let mut config = ChopShopConfig::default();
        let state = ProcessorState {
            parameters: EffectParameters {
                mix: 0.3,
                ..Default::default()
            },
            chain_order: "1,0".to_string(),
        };

        config.set_processor_state(&state);
        assert_eq!(config.chain_order.stages()[0], EffectStage::PitchShift);
        assert_eq!(config.processor_state().chain_order, "1,0,2,3");
        assert_eq!(config.processor_state().parameters.mix, 0.3);
    }

    #[test]
    fn test_factory_presets_are_sane() {
        let presets = factory_presets();
        assert!(presets.iter().any(|(name, _)| *name == "init"));
        for (_, config) in &presets {
            assert!(config.parameters.is_sanitized());
            assert!(config.app.validate().is_ok());
        }
        assert!(factory_preset("tape-stop").unwrap().parameters.link);
        assert!(factory_preset("missing").is_none());
    }

    #[tokio::test]
    async fn test_preset_manager() {
        let temp_dir = TempDir::new().unwrap();
        let manager = PresetManager::new(temp_dir.path().to_path_buf());
        let config = factory_preset("glitch-32").unwrap();

        manager.save_preset("test_preset", &config).await.unwrap();
        assert!(manager.preset_exists("test_preset").await);

        let presets = manager.list_presets().await.unwrap();
        assert_eq!(presets, vec!["test_preset"]);

        let loaded = manager.load_preset("test_preset").await.unwrap();
        assert_eq!(loaded, config);

        manager.delete_preset("test_preset").await.unwrap();
        assert!(!manager.preset_exists("test_preset").await);
    }

    #[tokio::test]
    async fn test_missing_preset() {
        let temp_dir = TempDir::new().unwrap();
        let manager = PresetManager::new(temp_dir.path().join("nowhere"));

        assert!(manager.list_presets().await.unwrap().is_empty());
        assert!(matches!(
            manager.load_preset("ghost").await,
            Err(ConfigError::PresetNotFound(_))
        ));
        assert!(matches!(
            manager.delete_preset("ghost").await,
            Err(ConfigError::PresetNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_preset_names_cannot_escape_dir() {
        let temp_dir = TempDir::new().unwrap();
        let manager = PresetManager::new(temp_dir.path().to_path_buf());
        let config = ChopShopConfig::default();

        assert!(matches!(
            manager.save_preset("../evil", &config).await,
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            manager.save_preset("", &config).await,
            Err(ConfigError::Invalid(_))
        ));
    }

    #[tokio::test]
    async fn test_install_factory_presets() {
        let temp_dir = TempDir::new().unwrap();
        let manager = PresetManager::new(temp_dir.path().to_path_buf());

        let installed = manager.install_factory_presets().await.unwrap();
        assert_eq!(installed, factory_presets().len());
        assert_eq!(manager.install_factory_presets().await.unwrap(), 0);

        let loaded = manager.load_preset("reverse-octave").await.unwrap();
        assert_eq!(loaded.chain_order.to_string(), "0,3,1,2");
    }

    #[tokio::test]
    async fn test_save_and_load_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("nested").join("config.toml");

        let config = factory_preset("tape-stop").unwrap();
        config.save_to_file(&config_path).await.unwrap();
        assert!(config_path.exists());

        let loaded = ChopShopConfig::load_from_file(&config_path).await.unwrap();
        assert_eq!(loaded, config);
    }

    #[tokio::test]
    async fn test_config_manager_creates_default() {
        let temp_dir = TempDir::new().unwrap();
        let manager = ConfigManager::new(temp_dir.path().join("chopshop"));

        assert!(!manager.exists());
        let config = manager.load().await;
        assert_eq!(config, ChopShopConfig::factory_default());
        assert!(manager.exists());

        manager.clear().await.unwrap();
        assert!(!manager.exists());
    }

    #[tokio::test]
    async fn test_config_manager_backs_up_corrupt_file() {
        let temp_dir = TempDir::new().unwrap();
        let manager = ConfigManager::new(temp_dir.path().to_path_buf());
        tokio::fs::write(manager.config_path(), "this is [not toml").await.unwrap();

        let config = manager.load().await;
        assert_eq!(config, ChopShopConfig::factory_default());
        assert!(temp_dir.path().join("config.toml.corrupt").exists());
    }
}
