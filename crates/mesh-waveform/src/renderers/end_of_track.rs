//! End-of-track warning
//!
//! While the deck's `end_of_track` control is set, the view pulses with a
//! gradient that grows more intense as the remaining time shrinks.

use std::time::Instant;

use iced::Color;
use mesh_rendergraph::{BlendMode, GpuResources, Painter, RenderError, Renderer};

use super::{push_span_gradient, triangle_wave, Layer, RendererContext, WaveformRenderer};
use crate::controls::{items, ConfigKey, ControlProxy};
use crate::skin::{SkinContext, SkinNode};
use crate::theme::{defaults, with_alpha};
use crate::view::WaveformFrame;

const BLINK_PERIOD_MS: u128 = 1000;

/// Warning alpha for a point in the blink cycle and the remaining time
///
/// Zero once the remaining time reaches the warning threshold.
pub fn end_of_track_alpha(elapsed_ms: u128, remaining_seconds: f64, warning_seconds: f64) -> f32 {
    if warning_seconds <= 0.0 {
        return 0.0;
    }
    let criticality = ((warning_seconds - remaining_seconds) / warning_seconds).clamp(0.0, 1.0);
    criticality as f32 * triangle_wave(elapsed_ms, BLINK_PERIOD_MS)
}

pub struct EndOfTrackRenderer {
    end_of_track: ControlProxy,
    time_remaining: ControlProxy,
    warning_seconds: f64,
    color: Color,
    started: Instant,
    layer: Layer,
}

impl EndOfTrackRenderer {
    pub fn new(context: RendererContext<'_>) -> Self {
        let control = |item: &str| {
            context
                .registry
                .proxy_or_create(&ConfigKey::new(context.group, item), 0.0)
        };
        Self {
            end_of_track: control(items::END_OF_TRACK),
            time_remaining: control(items::TIME_REMAINING),
            warning_seconds: context.settings.display.end_of_track_warning_seconds,
            color: defaults::END_OF_TRACK,
            started: Instant::now(),
            layer: Layer::new("end_of_track", 6, BlendMode::Alpha),
        }
    }

    fn build(&mut self, frame: &WaveformFrame, elapsed_ms: u128) {
        let enabled = self.end_of_track.to_bool();
        let alpha = end_of_track_alpha(elapsed_ms, self.time_remaining.get(), self.warning_seconds);
        let color = self.color;
        let builder = self.layer.begin();

        if !enabled || alpha <= 0.0 || frame.should_only_draw_background() {
            return;
        }
        push_span_gradient(
            builder,
            frame,
            (0.0, frame.length),
            (0.0, frame.breadth),
            with_alpha(color, 0.0),
            with_alpha(color, alpha),
        );
    }
}

impl WaveformRenderer for EndOfTrackRenderer {
    fn setup(&mut self, node: &SkinNode, context: &SkinContext) {
        self.color = context.select_color_or(node, "EndOfTrackColor", self.color);
    }
}

impl Renderer<WaveformFrame> for EndOfTrackRenderer {
    fn name(&self) -> &'static str {
        "end_of_track"
    }

    fn init(&mut self, gpu: &mut dyn GpuResources) -> Result<(), RenderError> {
        self.layer.init(gpu)
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

    #[test]
    fn test_alpha_grows_towards_the_end() {
        assert_eq!(end_of_track_alpha(0, 30.0, 30.0), 0.0);
        assert_eq!(end_of_track_alpha(0, 15.0, 30.0), 0.5);
        assert_eq!(end_of_track_alpha(0, 0.0, 30.0), 1.0);
        // Trough of the blink cycle
        assert_eq!(end_of_track_alpha(500, 0.0, 30.0), 0.0);
        // Far from the end, or a disabled warning
        assert_eq!(end_of_track_alpha(0, 120.0, 30.0), 0.0);
        assert_eq!(end_of_track_alpha(0, 1.0, 0.0), 0.0);
    }

    #[test]
    fn test_draws_only_when_control_is_set() {
        let registry = Arc::new(ControlRegistry::new());
        let settings = WaveformSettings::default();
        let frame = loaded_view(&registry).snapshot();
        let mut renderer = EndOfTrackRenderer::new(RendererContext {
            group: GROUP,
            registry: &registry,
            settings: &settings,
        });
        registry.set(&ConfigKey::new(GROUP, items::TIME_REMAINING), 10.0);

        renderer.build(&frame, 0);
        assert!(renderer.layer.builder().is_empty(), "end_of_track is off");

        registry.set(&ConfigKey::new(GROUP, items::END_OF_TRACK), 1.0);
        renderer.build(&frame, 0);
        assert_eq!(renderer.layer.builder().len(), 6);

        let peak = renderer
            .layer
            .builder()
            .vertices()
            .iter()
            .map(|v| v.color[3])
            .fold(0.0_f32, f32::max);
        assert!((peak - 2.0 / 3.0).abs() < 1e-6);
    }
}
