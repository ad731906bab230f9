//! Waveform settings
//!
//! User preferences for the waveform view, stored as YAML at
//! `~/.config/mesh/waveform.yaml`. Every section is `#[serde(default)]` so
//! older or partial files keep working.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::types::{Orientation, WaveformOptions, WaveformWidgetType};

/// Waveform settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WaveformSettings {
    /// Display type and layout
    pub display: DisplaySettings,
    /// Per-band visual gain
    pub gain: VisualGain,
}

impl WaveformSettings {
    /// Options requested by the user (before the capability gate)
    pub fn options(&self) -> WaveformOptions {
        let mut options = WaveformOptions::empty();
        options.set(WaveformOptions::SPLIT_STEREO_SIGNAL, self.display.split_stereo);
        options.set(WaveformOptions::HIGH_DETAIL, self.display.high_detail);
        options
    }
}

/// Display settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplaySettings {
    /// Requested waveform type
    pub widget_type: WaveformWidgetType,
    /// Sample per physical pixel on capable GPUs
    pub high_detail: bool,
    /// Left channel on top, right channel on the bottom
    pub split_stereo: bool,
    /// Visual samples per device-independent pixel
    pub default_zoom: f64,
    /// Play marker position as a fraction of the view length
    pub play_marker_position: f64,
    /// Seconds before the end of the track at which the warning starts
    pub end_of_track_warning_seconds: f64,
    pub orientation: Orientation,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            widget_type: WaveformWidgetType::Rgb,
            high_detail: false,
            split_stereo: false,
            default_zoom: 2.0,
            play_marker_position: 0.5,
            end_of_track_warning_seconds: 30.0,
            orientation: Orientation::Horizontal,
        }
    }
}

/// Visual gain applied to amplitudes before drawing
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VisualGain {
    pub all: f32,
    pub low: f32,
    pub mid: f32,
    pub high: f32,
}

impl Default for VisualGain {
    fn default() -> Self {
        Self {
            all: 1.0,
            low: 1.0,
            mid: 1.0,
            high: 1.0,
        }
    }
}

/// Default settings file path (~/.config/mesh/waveform.yaml)
pub fn default_settings_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")))
        .join("mesh")
        .join("waveform.yaml")
}

/// Load settings from a YAML file
///
/// Returns default settings if the file doesn't exist or can't be parsed.
pub fn load_settings(path: &Path) -> WaveformSettings {
    log::info!("load_settings: Loading from {:?}", path);

    if !path.exists() {
        log::info!("load_settings: Settings file doesn't exist, using defaults");
        return WaveformSettings::default();
    }

    match std::fs::read_to_string(path) {
        Ok(contents) => match serde_yaml::from_str::<WaveformSettings>(&contents) {
            Ok(settings) => {
                log::info!(
                    "load_settings: Loaded settings - type: {}, high detail: {}, split stereo: {}",
                    settings.display.widget_type,
                    settings.display.high_detail,
                    settings.display.split_stereo
                );
                settings
            }
            Err(e) => {
                log::warn!("load_settings: Failed to parse settings: {}, using defaults", e);
                WaveformSettings::default()
            }
        },
        Err(e) => {
            log::warn!(
                "load_settings: Failed to read settings file: {}, using defaults",
                e
            );
            WaveformSettings::default()
        }
    }
}

/// Save settings to a YAML file
///
/// Creates parent directories if they don't exist.
pub fn save_settings(settings: &WaveformSettings, path: &Path) -> Result<()> {
    log::info!("save_settings: Saving to {:?}", path);

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create settings directory: {:?}", parent))?;
    }

    let yaml =
        serde_yaml::to_string(settings).context("Failed to serialize settings to YAML")?;

    std::fs::write(path, yaml)
        .with_context(|| format!("Failed to write settings file: {:?}", path))?;

    log::info!("save_settings: Settings saved successfully");
    Ok(())
}
