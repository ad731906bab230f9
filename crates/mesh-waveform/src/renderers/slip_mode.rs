//! Slip-mode border
//!
//! While slip mode is on and the slip position has diverged from the play
//! position, a pulsing border is drawn along the top and bottom edges of
//! the view. Both conditions are read every frame: the audio thread can
//! change either at any time.

use std::time::Instant;

use iced::Color;
use mesh_rendergraph::{BlendMode, GpuResources, Painter, RenderError, Renderer, Viewport};

use super::{push_span, triangle_wave, Layer, RendererContext, WaveformRenderer};
use crate::controls::{items, ConfigKey, ControlProxy};
use crate::skin::{SkinContext, SkinNode};
use crate::theme::{defaults, with_alpha};
use crate::view::WaveformFrame;

const BLINK_PERIOD_MS: u128 = 1600;
const DEFAULT_BORDER_SIZE: f32 = 10.0;

/// Border alpha at `elapsed_ms` into the blink cycle
///
/// A triangle wave between 0.75 (at phase 0) and 0.25 (at half period):
/// the border never fully disappears.
pub fn slip_border_alpha(elapsed_ms: u128) -> f32 {
    0.25 + 0.5 * triangle_wave(elapsed_ms, BLINK_PERIOD_MS)
}

pub struct SlipModeRenderer {
    slip_enabled: ControlProxy,
    color: Color,
    top_size: f32,
    bottom_size: f32,
    started: Instant,
    viewport: Viewport,
    layer: Layer,
}

impl SlipModeRenderer {
    pub fn new(context: RendererContext<'_>) -> Self {
        let key = ConfigKey::new(context.group, items::SLIP_ENABLED);
        Self {
            slip_enabled: context.registry.proxy_or_create(&key, 0.0),
            color: defaults::SLIP_BORDER,
            top_size: DEFAULT_BORDER_SIZE,
            bottom_size: DEFAULT_BORDER_SIZE,
            started: Instant::now(),
            viewport: Viewport::default(),
            layer: Layer::new("slip_mode", 12, BlendMode::Alpha),
        }
    }

    pub fn border_sizes(&self) -> (f32, f32) {
        (self.top_size, self.bottom_size)
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    fn build(&mut self, frame: &WaveformFrame, elapsed_ms: u128) {
        let active = self.slip_enabled.to_bool() && frame.slip_active;
        let alpha = slip_border_alpha(elapsed_ms);
        let color = with_alpha(self.color, alpha);
        let (top, bottom) = (self.top_size, self.bottom_size);
        let builder = self.layer.begin();

        if !active || alpha == 0.0 || frame.length <= 0.0 || frame.breadth <= 0.0 {
            return;
        }

        let length = (0.0, frame.length);
        if top > 0.0 {
            push_span(builder, frame, length, (0.0, top.min(frame.breadth)), color);
        }
        if bottom > 0.0 {
            let start = (frame.breadth - bottom).max(0.0);
            push_span(builder, frame, length, (start, frame.breadth), color);
        }
    }
}

fn border_size(context: &SkinContext, node: &SkinNode, key: &str, current: f32) -> f32 {
    let size = context.select_float(node, key, current as f64) as f32;
    if size < 0.0 {
        log::warn!("Skin: {} = {} is negative, keeping {}", key, size, current);
        return current;
    }
    size
}

impl WaveformRenderer for SlipModeRenderer {
    fn setup(&mut self, node: &SkinNode, context: &SkinContext) {
        self.color = context.select_color_or(node, "SlipBorderOutlineColor", self.color);
        self.top_size = border_size(context, node, "SlipBorderTopOutlineSize", self.top_size);
        self.bottom_size =
            border_size(context, node, "SlipBorderBottomOutlineSize", self.bottom_size);
    }
}

impl Renderer<WaveformFrame> for SlipModeRenderer {
    fn name(&self) -> &'static str {
        "slip_mode"
    }

    fn init(&mut self, gpu: &mut dyn GpuResources) -> Result<(), RenderError> {
        self.layer.init(gpu)
    }

    fn resize(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    fn preprocess(&mut self, frame: &WaveformFrame) {
        let elapsed_ms = self.started.elapsed().as_millis();
        self.build(frame, elapsed_ms);
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
    use std::sync::Arc;

    use crate::controls::ControlRegistry;
    use crate::renderers::tests::{loaded_view, GROUP};
    use crate::settings::WaveformSettings;

    fn renderer(registry: &Arc<ControlRegistry>) -> SlipModeRenderer {
        SlipModeRenderer::new(RendererContext {
            group: GROUP,
            registry,
            settings: &WaveformSettings::default(),
        })
    }

    fn set(registry: &ControlRegistry, item: &str, value: f64) {
        registry.set(&ConfigKey::new(GROUP, item), value);
    }

    #[test]
    fn test_alpha_peak_and_trough() {
        assert_eq!(slip_border_alpha(0), 0.75);
        assert_eq!(slip_border_alpha(1600), 0.75);
        assert_eq!(slip_border_alpha(800), 0.25);
        assert_eq!(slip_border_alpha(400), 0.5);
    }

    #[test]
    fn test_alpha_is_bounded_and_periodic() {
        for t in (0..10_000).step_by(7) {
            let alpha = slip_border_alpha(t);
            assert!(
                (0.25..=0.75).contains(&alpha),
                "alpha {} at {} ms out of range",
                alpha,
                t
            );
            assert_eq!(alpha, slip_border_alpha(t + BLINK_PERIOD_MS), "period at {} ms", t);
        }
    }

    #[test]
    fn test_border_needs_enabled_and_active() {
        let registry = Arc::new(ControlRegistry::new());
        let view = loaded_view(&registry);
        let mut renderer = renderer(&registry);

        // Enabled but positions agree: not active
        set(&registry, items::SLIP_ENABLED, 1.0);
        set(&registry, items::SLIP_POSITION, 0.5);
        renderer.build(&view.snapshot(), 0);
        assert!(renderer.layer.builder().is_empty());

        // Diverged: top and bottom bands
        set(&registry, items::SLIP_POSITION, 0.4);
        renderer.build(&view.snapshot(), 0);
        assert_eq!(renderer.layer.builder().len(), 12);
        let vertices = renderer.layer.builder().vertices();
        assert!(vertices.iter().all(|v| v.color[3] == 0.75));
        assert!(vertices.iter().all(|v| v.y <= 10.0 || v.y >= 90.0));

        // Disabled again: read fresh, nothing drawn
        set(&registry, items::SLIP_ENABLED, 0.0);
        let mut frame = view.snapshot();
        frame.slip_active = true;
        renderer.build(&frame, 0);
        assert!(renderer.layer.builder().is_empty());
    }

    #[test]
    fn test_skin_sizes() {
        let registry = Arc::new(ControlRegistry::new());
        let mut renderer = renderer(&registry);
        assert_eq!(renderer.border_sizes(), (10.0, 10.0));

        let node = SkinNode::from_yaml(
            "SlipBorderTopOutlineSize: 4\nSlipBorderBottomOutlineSize: -3\nSlipBorderOutlineColor: \"#ff0000\"",
        )
        .unwrap();
        renderer.setup(&node, &SkinContext::new());
        assert_eq!(renderer.border_sizes(), (4.0, 10.0));
        assert_eq!(renderer.color.r, 1.0);
    }

    #[test]
    fn test_default_color_is_light_gray() {
        let registry = Arc::new(ControlRegistry::new());
        let renderer = renderer(&registry);
        assert_eq!(renderer.color, Color::from_rgb8(224, 224, 224));
    }
}
