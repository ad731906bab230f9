//! Solid background fill

use iced::Color;
use mesh_rendergraph::{BlendMode, GpuResources, Painter, RenderError, Renderer, Viewport};

use super::{Layer, WaveformRenderer};
use crate::skin::{SkinContext, SkinNode};
use crate::theme::{defaults, rgba};
use crate::view::WaveformFrame;

/// Fills the whole surface with the skin's `BgColor`
pub struct BackgroundRenderer {
    color: Color,
    viewport: Viewport,
    layer: Layer,
}

impl Default for BackgroundRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl BackgroundRenderer {
    pub fn new() -> Self {
        Self {
            color: defaults::BACKGROUND,
            viewport: Viewport::default(),
            layer: Layer::new("background", 6, BlendMode::Opaque),
        }
    }

    pub fn color(&self) -> Color {
        self.color
    }
}

impl WaveformRenderer for BackgroundRenderer {
    fn setup(&mut self, node: &SkinNode, context: &SkinContext) {
        self.color = context.select_color_or(node, "BgColor", self.color);
    }
}

impl Renderer<WaveformFrame> for BackgroundRenderer {
    fn name(&self) -> &'static str {
        "background"
    }

    fn init(&mut self, gpu: &mut dyn GpuResources) -> Result<(), RenderError> {
        self.layer.init(gpu)
    }

    fn resize(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    fn preprocess(&mut self, _frame: &WaveformFrame) {
        let (width, height) = (self.viewport.width, self.viewport.height);
        let color = rgba(self.color);
        let builder = self.layer.begin();
        if width > 0.0 && height > 0.0 {
            builder.push_rect(0.0, 0.0, width, height, color);
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
    fn test_skin_color_overrides_default() {
        let mut renderer = BackgroundRenderer::new();
        let node = SkinNode::from_yaml("BgColor: \"#ff0000\"").unwrap();
        renderer.setup(&node, &SkinContext::new());
        assert_eq!(renderer.color().r, 1.0);
        assert_eq!(renderer.color().g, 0.0);
    }

    #[test]
    fn test_fills_viewport() {
        let registry = ControlRegistry::new();
        let frame = loaded_view(&registry).snapshot();
        let mut renderer = BackgroundRenderer::new();
        renderer.resize(Viewport::new(200.0, 100.0, 1.0));
        renderer.preprocess(&frame);

        let vertices = renderer.layer.builder().vertices();
        assert_eq!(vertices.len(), 6);
        assert!(vertices.iter().all(|v| v.x == 0.0 || v.x == 200.0));
        assert!(vertices.iter().all(|v| v.y == 0.0 || v.y == 100.0));
    }

    #[test]
    fn test_empty_viewport_builds_nothing() {
        let registry = ControlRegistry::new();
        let frame = loaded_view(&registry).snapshot();
        let mut renderer = BackgroundRenderer::new();
        renderer.preprocess(&frame);
        assert!(renderer.layer.builder().is_empty());
    }
}
