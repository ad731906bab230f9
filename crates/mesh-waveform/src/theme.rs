//! Theme constants for the waveform view
//!
//! Default colors used when the skin does not override them, plus the
//! stem and cue palettes shared with the rest of mesh.

use iced::Color;

/// Stem colors (Vocals, Drums, Bass, Other)
///
/// Used by the stem overlay for stem tracks.
pub const STEM_COLORS: [Color; 4] = [
    Color::from_rgb(0.2, 0.8, 0.4),   // Vocals - Green (#33CC66)
    Color::from_rgb(0.8, 0.2, 0.2),   // Drums - Dark Red (#CC3333)
    Color::from_rgb(0.9, 0.38, 0.3),  // Bass - Orange-Red (#E6604D)
    Color::from_rgb(0.0, 0.8, 0.8),   // Other - Cyan (#00CCCC)
];

/// Cue point colors (8 hot cue slots)
///
/// Default colors of the hot cue marks. Matches CDJ-style color coding.
pub const CUE_COLORS: [Color; 8] = [
    Color::from_rgb(1.0, 0.3, 0.3), // Red
    Color::from_rgb(1.0, 0.6, 0.0), // Orange
    Color::from_rgb(1.0, 1.0, 0.0), // Yellow
    Color::from_rgb(0.3, 1.0, 0.3), // Green
    Color::from_rgb(0.0, 0.8, 0.8), // Cyan
    Color::from_rgb(0.3, 0.3, 1.0), // Blue
    Color::from_rgb(0.8, 0.3, 0.8), // Purple
    Color::from_rgb(1.0, 0.5, 0.8), // Pink
];

/// Stem names (full)
pub const STEM_NAMES: [&str; 4] = ["Vocals", "Drums", "Bass", "Other"];

/// Default skin colors
pub mod defaults {
    use iced::Color;

    pub const BACKGROUND: Color = Color::from_rgb(0.0, 0.0, 0.0);
    pub const SIGNAL: Color = Color::from_rgb(0.3, 0.7, 0.9);

    // RGB signal: band colors mixed per column
    pub const RGB_LOW: Color = Color::from_rgb(1.0, 0.0, 0.0);
    pub const RGB_MID: Color = Color::from_rgb(0.0, 1.0, 0.0);
    pub const RGB_HIGH: Color = Color::from_rgb(0.0, 0.0, 1.0);

    // Filtered signal: one envelope per band
    pub const FILTERED_LOW: Color = Color::from_rgb(0.9, 0.38, 0.3);
    pub const FILTERED_MID: Color = Color::from_rgb(0.2, 0.8, 0.4);
    pub const FILTERED_HIGH: Color = Color::from_rgb(0.0, 0.8, 0.8);

    pub const BEAT: Color = Color::from_rgba(0.75, 0.75, 0.75, 0.6);
    pub const BAR: Color = Color::from_rgba(1.0, 1.0, 1.0, 0.9);
    pub const PLAY_POSITION: Color = Color::from_rgb(1.0, 1.0, 1.0);
    pub const MAIN_CUE: Color = Color::from_rgb(1.0, 0.5, 0.0);
    pub const LOOP: Color = Color::from_rgba(0.3, 1.0, 0.3, 0.25);
    pub const LOOP_DISABLED: Color = Color::from_rgba(0.5, 0.5, 0.5, 0.2);
    pub const END_OF_TRACK: Color = Color::from_rgb8(200, 25, 20);

    /// Light gray slip border (224, 224, 224)
    pub const SLIP_BORDER: Color = Color::from_rgb8(224, 224, 224);
}

/// Convert a color to the straight-alpha array used by vertices
#[inline]
pub fn rgba(color: Color) -> [f32; 4] {
    [color.r, color.g, color.b, color.a]
}

/// Same color with a new alpha
#[inline]
pub fn with_alpha(color: Color, alpha: f32) -> [f32; 4] {
    [color.r, color.g, color.b, alpha]
}
