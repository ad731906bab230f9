//! Band-mixed color waveform

use mesh_rendergraph::{GpuResources, Painter, RenderError, Renderer};

use super::{build_rgb, signal_layer, BandColors, SignalPass};
use crate::renderers::{Layer, WaveformRenderer};
use crate::skin::{SkinContext, SkinNode};
use crate::types::{PositionSource, WaveformOptions};
use crate::view::WaveformFrame;

/// Each column's color is mixed from the low/mid/high band colors in
/// proportion to the band amplitudes
pub struct RgbRenderer {
    source: PositionSource,
    split_stereo: bool,
    colors: BandColors,
    layer: Layer,
}

impl RgbRenderer {
    pub fn new(source: PositionSource, options: WaveformOptions) -> Self {
        Self {
            source,
            split_stereo: options.contains(WaveformOptions::SPLIT_STEREO_SIGNAL),
            colors: BandColors::RGB,
            layer: signal_layer("rgb"),
        }
    }

    pub fn split_stereo(&self) -> bool {
        self.split_stereo
    }
}

impl WaveformRenderer for RgbRenderer {
    fn setup(&mut self, node: &SkinNode, context: &SkinContext) {
        self.colors.setup(node, context, "SignalRGB");
    }
}

impl Renderer<WaveformFrame> for RgbRenderer {
    fn name(&self) -> &'static str {
        "rgb"
    }

    fn init(&mut self, gpu: &mut dyn GpuResources) -> Result<(), RenderError> {
        self.layer.init(gpu)
    }

    fn preprocess(&mut self, frame: &WaveformFrame) {
        let (colors, split_stereo) = (self.colors, self.split_stereo);
        let builder = self.layer.begin();
        if let Some(pass) = SignalPass::new(frame, self.source) {
            build_rgb(builder, &pass, &colors, split_stereo, 1.0);
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
    use crate::controls::{items, ConfigKey, ControlRegistry};
    use crate::renderers::tests::{loaded_view, GROUP};

    #[test]
    fn test_split_stereo_halves_differ() {
        let registry = ControlRegistry::new();
        let frame = loaded_view(&registry).snapshot();

        let mut split = RgbRenderer::new(PositionSource::Play, WaveformOptions::SPLIT_STEREO_SIGNAL);
        split.preprocess(&frame);
        // The ramp's right channel is half the left: bars extend further up than down
        let min_y = split.layer.builder().vertices().iter().map(|v| v.y).fold(f32::MAX, f32::min);
        let max_y = split.layer.builder().vertices().iter().map(|v| v.y).fold(f32::MIN, f32::max);
        assert!(50.0 - min_y > max_y - 50.0);

        let mut joined = RgbRenderer::new(PositionSource::Play, WaveformOptions::empty());
        joined.preprocess(&frame);
        let min_y = joined.layer.builder().vertices().iter().map(|v| v.y).fold(f32::MAX, f32::min);
        let max_y = joined.layer.builder().vertices().iter().map(|v| v.y).fold(f32::MIN, f32::max);
        assert!(((50.0 - min_y) - (max_y - 50.0)).abs() < 1e-3);
    }

    #[test]
    fn test_slip_lane_when_slip_active() {
        let registry = ControlRegistry::new();
        let view = loaded_view(&registry);
        registry.set(&ConfigKey::new(GROUP, items::SLIP_ENABLED), 1.0);
        registry.set(&ConfigKey::new(GROUP, items::SLIP_POSITION), 0.45);

        let mut renderer = RgbRenderer::new(PositionSource::Slip, WaveformOptions::empty());
        renderer.preprocess(&view.snapshot());
        let vertices = renderer.layer.builder().vertices();
        assert!(!vertices.is_empty());
        assert!(vertices.iter().all(|v| v.y >= 50.0));
    }
}
