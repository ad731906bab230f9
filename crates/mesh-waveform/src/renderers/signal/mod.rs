//! Signal renderers
//!
//! The primary waveform layer. All variants walk the visible window column
//! by column: each column aggregates the visual samples it covers (peak per
//! band and channel) and draws a bar around the lane center. With split
//! stereo the top half shows the left channel and the bottom half the right.
//!
//! Regular renderers use one column per device-independent pixel. The
//! textured variants use one per physical pixel.

mod filtered;
mod hsv;
mod rgb;
mod simple;
mod textured;

pub use filtered::FilteredRenderer;
pub use hsv::HsvRenderer;
pub use rgb::RgbRenderer;
pub use simple::SimpleRenderer;
pub use textured::{TexturedRenderer, TexturedStyle};

use std::ops::Range;

use iced::Color;
use mesh_rendergraph::{BlendMode, GeometryBuilder};

use super::{push_span, Layer};
use crate::settings::VisualGain;
use crate::skin::{SkinContext, SkinNode};
use crate::theme::{defaults, rgba};
use crate::track::{TrackWaveform, WaveformSample};
use crate::types::PositionSource;
use crate::view::WaveformFrame;

/// Vertex reservation of a signal layer (up to 3 bands over 2048 columns)
const SIGNAL_CAPACITY: usize = 6 * 3 * 2048;

pub(crate) fn signal_layer(label: &'static str) -> Layer {
    Layer::new(label, SIGNAL_CAPACITY, BlendMode::Alpha)
}

/// One column of the visible window
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Column {
    /// Length coordinate of the column's leading edge
    pub along: f32,
    pub width: f32,
    /// Visual samples aggregated into this column
    pub range: Range<isize>,
}

/// Columns covering the view length, `per_pixel` columns per device-independent pixel
pub(crate) fn columns(
    frame: &WaveformFrame,
    source: PositionSource,
    per_pixel: f32,
) -> impl Iterator<Item = Column> {
    let per_pixel = if per_pixel > 0.0 { per_pixel } else { 1.0 };
    let count = (frame.length * per_pixel).ceil().max(0.0) as usize;
    let first = frame.first_visual_index(source);
    let step = frame.zoom / per_pixel as f64;
    let width = 1.0 / per_pixel;

    (0..count).map(move |i| {
        let start = (first + i as f64 * step).floor() as isize;
        let end = (first + (i + 1) as f64 * step).floor() as isize;
        Column {
            along: i as f32 * width,
            width,
            range: start..end,
        }
    })
}

/// Per-frame inputs common to every signal variant
pub(crate) struct SignalPass<'a> {
    pub frame: &'a WaveformFrame,
    pub track: &'a TrackWaveform,
    pub source: PositionSource,
    /// Breadth band of the position source
    pub lane: (f32, f32),
}

impl<'a> SignalPass<'a> {
    /// Inputs for one frame, or `None` when the signal layer has nothing to draw
    pub fn new(frame: &'a WaveformFrame, source: PositionSource) -> Option<Self> {
        if frame.should_only_draw_background() {
            return None;
        }
        let track = frame.track()?;
        if stems_drawn_separately(track) {
            return None;
        }
        let lane = frame.lane(source)?;
        Some(Self {
            frame,
            track,
            source,
            lane,
        })
    }

    pub fn center(&self) -> f32 {
        (self.lane.0 + self.lane.1) / 2.0
    }

    pub fn half(&self) -> f32 {
        (self.lane.1 - self.lane.0) / 2.0
    }

    pub fn gain(&self) -> VisualGain {
        self.frame.gain
    }

    /// Bar from `center - top` to `center + bottom` over one column
    pub fn push_bar(
        &self,
        builder: &mut GeometryBuilder,
        column: &Column,
        top: f32,
        bottom: f32,
        color: [f32; 4],
    ) {
        let center = self.center();
        let half = self.half();
        let top = top.clamp(0.0, half);
        let bottom = bottom.clamp(0.0, half);
        if top <= 0.0 && bottom <= 0.0 {
            return;
        }
        push_span(
            builder,
            self.frame,
            (column.along, column.along + column.width),
            (center - top, center + bottom),
            color,
        );
    }
}

/// Stem tracks are drawn by the stem overlay instead of the signal layer
pub(crate) fn stems_drawn_separately(track: &TrackWaveform) -> bool {
    cfg!(feature = "stem") && track.has_stems()
}

/// Top and bottom samples of a column
///
/// With split stereo the top shows the left channel and the bottom the
/// right; otherwise both show the louder of the two.
pub(crate) fn stereo_halves(
    peak: [WaveformSample; 2],
    split_stereo: bool,
) -> (WaveformSample, WaveformSample) {
    if split_stereo {
        (peak[0], peak[1])
    } else {
        let both = peak[0].max(peak[1]);
        (both, both)
    }
}

/// Amplitude in pixels for a 0-255 value
#[inline]
pub(crate) fn amplitude(value: u8, gain: f32, half: f32) -> f32 {
    value as f32 / 255.0 * gain * half
}

/// Low/mid/high band colors
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BandColors {
    pub low: Color,
    pub mid: Color,
    pub high: Color,
}

impl BandColors {
    pub const RGB: BandColors = BandColors {
        low: defaults::RGB_LOW,
        mid: defaults::RGB_MID,
        high: defaults::RGB_HIGH,
    };

    pub const FILTERED: BandColors = BandColors {
        low: defaults::FILTERED_LOW,
        mid: defaults::FILTERED_MID,
        high: defaults::FILTERED_HIGH,
    };

    /// Read `<prefix>LowColor`, `<prefix>MidColor` and `<prefix>HighColor`
    pub fn setup(&mut self, node: &SkinNode, context: &SkinContext, prefix: &str) {
        self.low = context.select_color_or(node, &format!("{prefix}LowColor"), self.low);
        self.mid = context.select_color_or(node, &format!("{prefix}MidColor"), self.mid);
        self.high = context.select_color_or(node, &format!("{prefix}HighColor"), self.high);
    }
}

/// Color of a column mixed from its band amplitudes
///
/// Normalized so the strongest channel is at full intensity.
pub(crate) fn mix_rgb(sample: WaveformSample, colors: &BandColors, gain: &VisualGain) -> [f32; 4] {
    let low = sample.low as f32 * gain.low;
    let mid = sample.mid as f32 * gain.mid;
    let high = sample.high as f32 * gain.high;

    let r = low * colors.low.r + mid * colors.mid.r + high * colors.high.r;
    let g = low * colors.low.g + mid * colors.mid.g + high * colors.high.g;
    let b = low * colors.low.b + mid * colors.mid.b + high * colors.high.b;

    let max = r.max(g).max(b);
    if max <= 0.0 {
        return [0.0, 0.0, 0.0, 0.0];
    }
    [r / max, g / max, b / max, 1.0]
}

/// Draw the RGB style over the given columns
pub(crate) fn build_rgb(
    builder: &mut GeometryBuilder,
    pass: &SignalPass<'_>,
    colors: &BandColors,
    split_stereo: bool,
    per_pixel: f32,
) {
    let gain = pass.gain();
    let half = pass.half();
    for column in columns(pass.frame, pass.source, per_pixel) {
        let Some(peak) = pass.track.peak(column.range.clone()) else {
            continue;
        };
        let (top, bottom) = stereo_halves(peak, split_stereo);
        let color = mix_rgb(top.max(bottom), colors, &gain);
        pass.push_bar(
            builder,
            &column,
            amplitude(top.all, gain.all, half),
            amplitude(bottom.all, gain.all, half),
            color,
        );
    }
}

/// Draw the filtered style: one envelope per band, or stacked outward
pub(crate) fn build_filtered(
    builder: &mut GeometryBuilder,
    pass: &SignalPass<'_>,
    colors: &BandColors,
    stacked: bool,
    per_pixel: f32,
) {
    let gain = pass.gain();
    let half = pass.half();
    let bands = |sample: WaveformSample| {
        [
            amplitude(sample.low, gain.low * gain.all, half),
            amplitude(sample.mid, gain.mid * gain.all, half),
            amplitude(sample.high, gain.high * gain.all, half),
        ]
    };
    let band_colors = [rgba(colors.low), rgba(colors.mid), rgba(colors.high)];

    for column in columns(pass.frame, pass.source, per_pixel) {
        let Some(peak) = pass.track.peak(column.range.clone()) else {
            continue;
        };
        let top = bands(peak[0]);
        let bottom = bands(peak[1]);

        if stacked {
            // Outermost first: low+mid+high, then low+mid, then low
            for band in (0..3).rev() {
                let top_extent: f32 = top[..=band].iter().sum();
                let bottom_extent: f32 = bottom[..=band].iter().sum();
                pass.push_bar(builder, &column, top_extent, bottom_extent, band_colors[band]);
            }
        } else {
            for band in 0..3 {
                pass.push_bar(builder, &column, top[band], bottom[band], band_colors[band]);
            }
        }
    }
}
