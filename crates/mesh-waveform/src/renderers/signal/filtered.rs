//! Per-band envelopes

use mesh_rendergraph::{GpuResources, Painter, RenderError, Renderer};

use super::{build_filtered, signal_layer, BandColors, SignalPass};
use crate::renderers::{Layer, WaveformRenderer};
use crate::skin::{SkinContext, SkinNode};
use crate::types::PositionSource;
use crate::view::WaveformFrame;

/// Low, mid and high band envelopes layered over each other, or stacked
/// outward from the center
pub struct FilteredRenderer {
    source: PositionSource,
    stacked: bool,
    colors: BandColors,
    layer: Layer,
}

impl FilteredRenderer {
    pub fn new(source: PositionSource, stacked: bool) -> Self {
        Self {
            source,
            stacked,
            colors: BandColors::FILTERED,
            layer: signal_layer(if stacked { "stacked" } else { "filtered" }),
        }
    }

    pub fn is_stacked(&self) -> bool {
        self.stacked
    }
}

impl WaveformRenderer for FilteredRenderer {
    fn setup(&mut self, node: &SkinNode, context: &SkinContext) {
        self.colors.setup(node, context, "Signal");
    }
}

impl Renderer<WaveformFrame> for FilteredRenderer {
    fn name(&self) -> &'static str {
        if self.stacked {
            "stacked"
        } else {
            "filtered"
        }
    }

    fn init(&mut self, gpu: &mut dyn GpuResources) -> Result<(), RenderError> {
        self.layer.init(gpu)
    }

    fn preprocess(&mut self, frame: &WaveformFrame) {
        let (colors, stacked) = (self.colors, self.stacked);
        let builder = self.layer.begin();
        if let Some(pass) = SignalPass::new(frame, self.source) {
            build_filtered(builder, &pass, &colors, stacked, 1.0);
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
    fn test_band_colors_from_skin() {
        let mut renderer = FilteredRenderer::new(PositionSource::Play, false);
        let node = SkinNode::from_yaml("SignalLowColor: \"#ffffff\"").unwrap();
        renderer.setup(&node, &SkinContext::new());
        assert_eq!(renderer.colors.low.g, 1.0);
        assert_eq!(renderer.colors.mid, BandColors::FILTERED.mid);
    }

    #[test]
    fn test_stacked_reaches_further_than_layered() {
        let registry = ControlRegistry::new();
        let frame = loaded_view(&registry).snapshot();

        let extent = |stacked: bool| {
            let mut renderer = FilteredRenderer::new(PositionSource::Play, stacked);
            renderer.preprocess(&frame);
            renderer
                .layer
                .builder()
                .vertices()
                .iter()
                .map(|v| 50.0 - v.y)
                .fold(0.0_f32, f32::max)
        };

        assert!(extent(true) > extent(false));
        assert_eq!(
            FilteredRenderer::new(PositionSource::Play, true).name(),
            "stacked"
        );
    }
}
