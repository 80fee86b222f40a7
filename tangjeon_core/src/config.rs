//! Configuration file support for Tangjeon.
//!
//! Configuration is loaded from `$XDG_CONFIG_HOME/tangjeon/config.toml`.

use crate::matcher::DEFAULT_SUFFIXES;
use crate::types::PrescriptionInputs;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application configuration
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub data: DataConfig,

    #[serde(default)]
    pub dispensing: DispensingConfig,

    #[serde(default)]
    pub matching: MatchingConfig,

    #[serde(default)]
    pub decoction: DecoctionConfig,
}

/// Locations of the template catalog and herb table exports
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct DataConfig {
    #[serde(default)]
    pub catalog_path: Option<PathBuf>,

    #[serde(default)]
    pub herb_order_path: Option<PathBuf>,
}

/// Default dispensing inputs when the caller gives none
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DispensingConfig {
    #[serde(default = "default_total_doses")]
    pub total_doses: f64,

    #[serde(default = "default_days")]
    pub days: u32,

    #[serde(default = "default_doses_per_day")]
    pub doses_per_day: u32,

    #[serde(default = "default_pack_volume_ml")]
    pub pack_volume_ml: u32,
}

impl Default for DispensingConfig {
    fn default() -> Self {
        Self {
            total_doses: default_total_doses(),
            days: default_days(),
            doses_per_day: default_doses_per_day(),
            pack_volume_ml: default_pack_volume_ml(),
        }
    }
}

impl DispensingConfig {
    /// Inputs for `formula` using these defaults
    pub fn inputs_for(&self, formula: impl Into<String>) -> PrescriptionInputs {
        PrescriptionInputs {
            formula: formula.into(),
            total_doses: self.total_doses,
            days: self.days,
            doses_per_day: self.doses_per_day,
            pack_volume_ml: self.pack_volume_ml,
            adjustment: String::new(),
        }
    }
}

/// Template name matching
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MatchingConfig {
    /// Formula-type suffixes tried when a name has no exact match
    #[serde(default = "default_suffixes")]
    pub suffixes: Vec<String>,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            suffixes: default_suffixes(),
        }
    }
}

/// Decoction arithmetic constants
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DecoctionConfig {
    /// Per-dose total above which a lower dose count is suggested
    #[serde(default = "default_target_grams_per_dose")]
    pub target_grams_per_dose: f64,

    /// Water absorbed per gram of herbs (ml)
    #[serde(default = "default_herb_water_factor")]
    pub herb_water_factor: f64,

    /// Fixed water lost to evaporation (ml)
    #[serde(default = "default_base_water_ml")]
    pub base_water_ml: f64,
}

impl Default for DecoctionConfig {
    fn default() -> Self {
        Self {
            target_grams_per_dose: default_target_grams_per_dose(),
            herb_water_factor: default_herb_water_factor(),
            base_water_ml: default_base_water_ml(),
        }
    }
}

// Default value functions
fn default_total_doses() -> f64 {
    15.0
}

fn default_days() -> u32 {
    15
}

fn default_doses_per_day() -> u32 {
    2
}

fn default_pack_volume_ml() -> u32 {
    100
}

fn default_suffixes() -> Vec<String> {
    DEFAULT_SUFFIXES.iter().map(|s| s.to_string()).collect()
}

fn default_target_grams_per_dose() -> f64 {
    100.0
}

fn default_herb_water_factor() -> f64 {
    1.2
}

fn default_base_water_ml() -> f64 {
    300.0
}

impl Config {
    /// Load configuration from the standard config path
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path();
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            tracing::info!("No config file found at {:?}, using defaults", config_path);
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        tracing::info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        let base = dirs::config_dir().unwrap_or_else(|| PathBuf::from(".config"));
        base.join("tangjeon").join("config.toml")
    }

    /// Save the current configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, contents)?;
        tracing::info!("Saved config to {:?}", path);
        Ok(())
    }

    /// Reject values the arithmetic cannot use
    pub fn validate(&self) -> Result<()> {
        if !self.dispensing.total_doses.is_finite() || self.dispensing.total_doses < 0.0 {
            return Err(Error::Config(format!(
                "dispensing.total_doses must be a non-negative number, got {}",
                self.dispensing.total_doses
            )));
        }
        let target = self.decoction.target_grams_per_dose;
        if !target.is_finite() || target <= 0.0 {
            return Err(Error::Config(format!(
                "decoction.target_grams_per_dose must be positive, got {}",
                self.decoction.target_grams_per_dose
            )));
        }
        if self.matching.suffixes.iter().any(|s| s.trim().is_empty()) {
            return Err(Error::Config(
                "matching.suffixes must not contain empty entries".into(),
            ));
        }
        Ok(())
    }
}
