//! Hue/saturation/value waveform
//!
//! The hue comes from the skin's `SignalColor`. Per column, a bass-heavy
//! mix darkens the color and a treble-heavy mix washes it out.

use iced::Color;
use mesh_rendergraph::{GpuResources, Painter, RenderError, Renderer};

use super::{amplitude, columns, signal_layer, stereo_halves, SignalPass};
use crate::renderers::{Layer, WaveformRenderer};
use crate::skin::{SkinContext, SkinNode};
use crate::theme::defaults;
use crate::track::WaveformSample;
use crate::types::PositionSource;
use crate::view::WaveformFrame;

pub struct HsvRenderer {
    source: PositionSource,
    color: Color,
    layer: Layer,
}

impl HsvRenderer {
    pub fn new(source: PositionSource) -> Self {
        Self {
            source,
            color: defaults::SIGNAL,
            layer: signal_layer("hsv"),
        }
    }
}

/// Hue of a color in degrees [0, 360)
pub(crate) fn hue(color: Color) -> f32 {
    let max = color.r.max(color.g).max(color.b);
    let min = color.r.min(color.g).min(color.b);
    let delta = max - min;
    if delta <= 0.0 {
        return 0.0;
    }
    let hue = if max == color.r {
        60.0 * ((color.g - color.b) / delta).rem_euclid(6.0)
    } else if max == color.g {
        60.0 * ((color.b - color.r) / delta + 2.0)
    } else {
        60.0 * ((color.r - color.g) / delta + 4.0)
    };
    hue.rem_euclid(360.0)
}

/// RGB from hue (degrees), saturation and value in [0, 1]
pub(crate) fn hsv_to_rgb(hue: f32, saturation: f32, value: f32) -> [f32; 3] {
    let c = value * saturation;
    let h = hue.rem_euclid(360.0) / 60.0;
    let x = c * (1.0 - (h % 2.0 - 1.0).abs());
    let (r, g, b) = match h as u32 {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };
    let m = value - c;
    [r + m, g + m, b + m]
}

/// Column color: saturation drops with the treble share, value with the bass share
fn column_color(hue: f32, sample: WaveformSample) -> [f32; 4] {
    let total = sample.low as f32 + sample.mid as f32 + sample.high as f32;
    let (low, high) = if total > 0.0 {
        (sample.low as f32 / total, sample.high as f32 / total)
    } else {
        (0.0, 0.0)
    };
    let [r, g, b] = hsv_to_rgb(hue, 1.0 - high, 1.0 - low);
    [r, g, b, 1.0]
}

impl WaveformRenderer for HsvRenderer {
    fn setup(&mut self, node: &SkinNode, context: &SkinContext) {
        self.color = context.select_color_or(node, "SignalColor", self.color);
    }
}

impl Renderer<WaveformFrame> for HsvRenderer {
    fn name(&self) -> &'static str {
        "hsv"
    }

    fn init(&mut self, gpu: &mut dyn GpuResources) -> Result<(), RenderError> {
        self.layer.init(gpu)
    }

    fn preprocess(&mut self, frame: &WaveformFrame) {
        let hue = hue(self.color);
        let builder = self.layer.begin();
        let Some(pass) = SignalPass::new(frame, self.source) else {
            return;
        };

        let gain = pass.gain();
        let half = pass.half();
        for column in columns(frame, pass.source, 1.0) {
            let Some(peak) = pass.track.peak(column.range.clone()) else {
                continue;
            };
            let (top, bottom) = stereo_halves(peak, false);
            pass.push_bar(
                builder,
                &column,
                amplitude(top.all, gain.all, half),
                amplitude(bottom.all, gain.all, half),
                column_color(hue, top),
            );
        }
    }

    fn paint(&mut self, _frame: &WaveformFrame, painter: &mut Painter<'_>) {
        self.layer.paint(painter);
    }

    fn release(&mut self, gpu: &mut dyn GpuResources) {
        self.layer.release(gpu);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: [f32; 3], b: [f32; 3]) -> bool {
        a.iter().zip(b).all(|(x, y)| (x - y).abs() < 1e-5)
    }

    #[test]
    fn test_hue_of_primaries() {
        assert_eq!(hue(Color::from_rgb(1.0, 0.0, 0.0)), 0.0);
        assert_eq!(hue(Color::from_rgb(0.0, 1.0, 0.0)), 120.0);
        assert_eq!(hue(Color::from_rgb(0.0, 0.0, 1.0)), 240.0);
        assert_eq!(hue(Color::from_rgb(0.5, 0.5, 0.5)), 0.0);
    }

    #[test]
    fn test_hsv_to_rgb() {
        assert!(close(hsv_to_rgb(0.0, 1.0, 1.0), [1.0, 0.0, 0.0]));
        assert!(close(hsv_to_rgb(120.0, 1.0, 1.0), [0.0, 1.0, 0.0]));
        assert!(close(hsv_to_rgb(240.0, 0.0, 0.5), [0.5, 0.5, 0.5]));
    }

    #[test]
    fn test_bass_darkens_treble_washes_out() {
        let bass = column_color(0.0, WaveformSample::new(255, 255, 0, 0));
        assert!(bass[0] < 1e-5, "pure bass is black");

        let treble = column_color(0.0, WaveformSample::new(255, 0, 0, 255));
        assert!(close([treble[0], treble[1], treble[2]], [1.0, 1.0, 1.0]), "pure treble is white");
    }
}
