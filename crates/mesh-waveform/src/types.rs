//! Waveform display types, options and position sources

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

/// Requested waveform display type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaveformWidgetType {
    /// No waveform, background only
    Empty,
    /// Single-color envelope
    Simple,
    /// Low/mid/high bands as separate envelopes
    Filtered,
    /// Hue/saturation/value coloring
    Hsv,
    /// Frame timing test pattern (no signal renderer in this view)
    VSyncTest,
    /// Colors mixed from the frequency bands
    #[default]
    Rgb,
    /// Bands stacked outward from the center
    Stacked,
}

impl WaveformWidgetType {
    /// Every defined type, in declaration order
    pub const ALL: [WaveformWidgetType; 7] = [
        WaveformWidgetType::Empty,
        WaveformWidgetType::Simple,
        WaveformWidgetType::Filtered,
        WaveformWidgetType::Hsv,
        WaveformWidgetType::VSyncTest,
        WaveformWidgetType::Rgb,
        WaveformWidgetType::Stacked,
    ];

    /// Human-readable name for settings UIs
    pub fn display_name(self) -> &'static str {
        match self {
            WaveformWidgetType::Empty => "Empty",
            WaveformWidgetType::Simple => "Simple",
            WaveformWidgetType::Filtered => "Filtered",
            WaveformWidgetType::Hsv => "HSV",
            WaveformWidgetType::VSyncTest => "VSync Test",
            WaveformWidgetType::Rgb => "RGB",
            WaveformWidgetType::Stacked => "Stacked",
        }
    }
}

impl std::fmt::Display for WaveformWidgetType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

bitflags! {
    /// Optional signal renderer features
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct WaveformOptions: u8 {
        /// Left channel on the top half, right channel on the bottom half
        const SPLIT_STEREO_SIGNAL = 0b01;
        /// Sample the waveform per physical pixel (textured renderer)
        const HIGH_DETAIL = 0b10;
        const ALL_COMBINED = Self::SPLIT_STEREO_SIGNAL.bits() | Self::HIGH_DETAIL.bits();
    }
}

/// Which playback position a renderer follows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PositionSource {
    /// The audible play position
    Play,
    /// The ghost position kept while slip mode is active
    Slip,
}

impl PositionSource {
    pub fn index(self) -> usize {
        match self {
            PositionSource::Play => 0,
            PositionSource::Slip => 1,
        }
    }
}

/// Direction the waveform scrolls along
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    /// Time runs left to right
    #[default]
    Horizontal,
    /// Time runs top to bottom
    Vertical,
}

/// Widget family of a waveform implementation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WidgetCategory {
    /// Every layer drawn with shaders through the render graph
    AllShader,
}

/// Static capabilities a waveform widget family requires
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WidgetVars {
    pub use_gl: bool,
    pub use_gles: bool,
    pub use_glsl: bool,
    pub category: WidgetCategory,
}
