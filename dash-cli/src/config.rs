//! Application configuration (dash.toml)

use anyhow::{Context, Result};
use dash_decoder::view::{CockpitViewDetector, ReferencePixel, DEFAULT_COLOR_TOLERANCE};
use dash_decoder::{Calibration, CropBox};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Calibration file, relative to the config file
    #[serde(default = "default_calibration")]
    pub calibration: PathBuf,
    /// Decode tick interval in milliseconds
    #[serde(default = "default_loop_ms")]
    pub loop_ms: u64,
    /// Run the gear poller while the cockpit view is shown
    #[serde(default)]
    pub hshifter: bool,
    #[serde(default)]
    pub cockpit: CockpitConfig,
    /// Locked content area; auto-detected per frame when absent
    pub crop: Option<CropBox>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CockpitConfig {
    #[serde(default = "default_tolerance")]
    pub tolerance: u8,
    #[serde(default)]
    pub pixels: Vec<ReferencePixel>,
}

impl Default for CockpitConfig {
    fn default() -> Self {
        Self {
            tolerance: default_tolerance(),
            pixels: Vec::new(),
        }
    }
}

fn default_calibration() -> PathBuf {
    PathBuf::from("calibration.toml")
}

fn default_loop_ms() -> u64 {
    33
}

fn default_tolerance() -> u8 {
    DEFAULT_COLOR_TOLERANCE
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            calibration: default_calibration(),
            loop_ms: default_loop_ms(),
            hshifter: false,
            cockpit: CockpitConfig::default(),
            crop: None,
        }
    }
}

impl AppConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.loop_ms)
    }

    pub fn view_detector(&self) -> CockpitViewDetector {
        CockpitViewDetector::new(self.cockpit.pixels.clone()).with_tolerance(self.cockpit.tolerance)
    }

    /// Load the calibration, preferring `override_path` over the configured one
    pub fn load_calibration(&self, override_path: Option<&Path>) -> Result<Calibration> {
        let path = override_path.unwrap_or(&self.calibration);
        log::info!("Loading calibration from: {:?}", path);
        Calibration::load(path).with_context(|| format!("Failed to load calibration: {:?}", path))
    }
}

/// Load configuration from a TOML file
///
/// A relative calibration path is resolved against the config file's directory.
pub fn load_config(path: &Path) -> Result<AppConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let mut config: AppConfig = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    if config.calibration.is_relative() {
        if let Some(dir) = path.parent() {
            config.calibration = dir.join(&config.calibration);
        }
    }

    if config.loop_ms == 0 {
        anyhow::bail!("loop_ms must be greater than zero in {:?}", path);
    }

    Ok(config)
}

/// Load `path` if it exists, otherwise fall back to defaults
pub fn load_or_default(path: &Path) -> Result<AppConfig> {
    if path.exists() {
        load_config(path)
    } else {
        log::debug!("No config at {:?}, using defaults", path);
        Ok(AppConfig::default())
    }
}
