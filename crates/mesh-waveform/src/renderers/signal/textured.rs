//! High-detail waveform
//!
//! Samples the track once per physical pixel instead of once per
//! device-independent pixel, so HiDPI surfaces show the full analysis
//! resolution. Drawn in the RGB, filtered or stacked style.

use mesh_rendergraph::{GpuResources, Painter, RenderError, Renderer, Viewport};

use super::{build_filtered, build_rgb, signal_layer, BandColors, SignalPass};
use crate::renderers::{Layer, WaveformRenderer};
use crate::skin::{SkinContext, SkinNode};
use crate::types::{PositionSource, WaveformOptions};
use crate::view::WaveformFrame;

/// Visual style of the high-detail renderer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TexturedStyle {
    Rgb,
    Filtered,
    Stacked,
}

pub struct TexturedRenderer {
    source: PositionSource,
    style: TexturedStyle,
    split_stereo: bool,
    colors: BandColors,
    viewport: Viewport,
    layer: Layer,
}

impl TexturedRenderer {
    pub fn new(source: PositionSource, style: TexturedStyle, options: WaveformOptions) -> Self {
        let (colors, label) = match style {
            TexturedStyle::Rgb => (BandColors::RGB, "textured_rgb"),
            TexturedStyle::Filtered => (BandColors::FILTERED, "textured_filtered"),
            TexturedStyle::Stacked => (BandColors::FILTERED, "textured_stacked"),
        };
        Self {
            source,
            style,
            split_stereo: options.contains(WaveformOptions::SPLIT_STEREO_SIGNAL),
            colors,
            viewport: Viewport::default(),
            layer: signal_layer(label),
        }
    }

    pub fn style(&self) -> TexturedStyle {
        self.style
    }
}

impl WaveformRenderer for TexturedRenderer {
    fn setup(&mut self, node: &SkinNode, context: &SkinContext) {
        let prefix = match self.style {
            TexturedStyle::Rgb => "SignalRGB",
            TexturedStyle::Filtered | TexturedStyle::Stacked => "Signal",
        };
        self.colors.setup(node, context, prefix);
    }
}

impl Renderer<WaveformFrame> for TexturedRenderer {
    fn name(&self) -> &'static str {
        match self.style {
            TexturedStyle::Rgb => "textured_rgb",
            TexturedStyle::Filtered => "textured_filtered",
            TexturedStyle::Stacked => "textured_stacked",
        }
    }

    fn init(&mut self, gpu: &mut dyn GpuResources) -> Result<(), RenderError> {
        self.layer.init(gpu)
    }

    fn resize(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    fn preprocess(&mut self, frame: &WaveformFrame) {
        let (style, colors, split_stereo) = (self.style, self.colors, self.split_stereo);
        let per_pixel = self.viewport.device_pixel_ratio;
        let builder = self.layer.begin();
        let Some(pass) = SignalPass::new(frame, self.source) else {
            return;
        };
        match style {
            TexturedStyle::Rgb => build_rgb(builder, &pass, &colors, split_stereo, per_pixel),
            TexturedStyle::Filtered => build_filtered(builder, &pass, &colors, false, per_pixel),
            TexturedStyle::Stacked => build_filtered(builder, &pass, &colors, true, per_pixel),
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
    use crate::controls::ControlRegistry;
    use crate::renderers::tests::loaded_view;

    #[test]
    fn test_samples_per_physical_pixel() {
        let registry = ControlRegistry::new();
        let frame = loaded_view(&registry).snapshot();

        let mut renderer =
            TexturedRenderer::new(PositionSource::Play, TexturedStyle::Rgb, WaveformOptions::empty());
        renderer.resize(Viewport::new(200.0, 100.0, 2.0));
        renderer.preprocess(&frame);

        // 400 half-pixel columns; a column over a zero sample draws nothing
        let bars = renderer.layer.builder().len() / 6;
        assert!(bars > 200 && bars <= 400, "{bars} bars");
        assert!(renderer
            .layer
            .builder()
            .vertices()
            .iter()
            .any(|v| v.x.fract() == 0.5));
    }

    #[test]
    fn test_names_follow_style() {
        let options = WaveformOptions::empty();
        let name = |style| TexturedRenderer::new(PositionSource::Play, style, options).name();
        assert_eq!(name(TexturedStyle::Rgb), "textured_rgb");
        assert_eq!(name(TexturedStyle::Filtered), "textured_filtered");
        assert_eq!(name(TexturedStyle::Stacked), "textured_stacked");
    }
}
