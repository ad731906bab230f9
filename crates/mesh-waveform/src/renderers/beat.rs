//! Beat grid overlay

use iced::Color;
use mesh_rendergraph::{BlendMode, GpuResources, Painter, RenderError, Renderer};

use super::{push_line, Layer, WaveformRenderer};
use crate::skin::{SkinContext, SkinNode};
use crate::theme::{defaults, rgba};
use crate::types::PositionSource;
use crate::view::WaveformFrame;

/// Beats per bar; every bar's first beat uses the bar color
const BEATS_PER_BAR: usize = 4;

const BEAT_WIDTH: f32 = 1.0;
const BAR_WIDTH: f32 = 2.0;

/// Vertical lines at every beat in the visible window
pub struct BeatRenderer {
    source: PositionSource,
    beat_color: Color,
    bar_color: Color,
    layer: Layer,
}

impl BeatRenderer {
    pub fn new(source: PositionSource) -> Self {
        Self {
            source,
            beat_color: defaults::BEAT,
            bar_color: defaults::BAR,
            layer: Layer::new("beat", 6 * 256, BlendMode::Alpha),
        }
    }

    pub fn source(&self) -> PositionSource {
        self.source
    }
}

impl WaveformRenderer for BeatRenderer {
    fn setup(&mut self, node: &SkinNode, context: &SkinContext) {
        self.beat_color = context.select_color_or(node, "BeatColor", self.beat_color);
        self.bar_color = context.select_color_or(node, "BarColor", self.bar_color);
    }
}

impl Renderer<WaveformFrame> for BeatRenderer {
    fn name(&self) -> &'static str {
        "beat"
    }

    fn init(&mut self, gpu: &mut dyn GpuResources) -> Result<(), RenderError> {
        self.layer.init(gpu)
    }

    fn preprocess(&mut self, frame: &WaveformFrame) {
        let source = self.source;
        let (beat_color, bar_color) = (rgba(self.beat_color), rgba(self.bar_color));
        let builder = self.layer.begin();

        if frame.should_only_draw_background() {
            return;
        }
        let (Some(track), Some(lane)) = (frame.track(), frame.lane(source)) else {
            return;
        };

        for (index, &beat) in track.beats.iter().enumerate() {
            let x = frame.sample_to_x(beat, source);
            if x < 0.0 {
                continue;
            }
            if x > frame.length {
                break;
            }
            let (color, width) = if index % BEATS_PER_BAR == 0 {
                (bar_color, BAR_WIDTH)
            } else {
                (beat_color, BEAT_WIDTH)
            };
            push_line(builder, frame, x, width, lane, color);
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

    /// Loaded view with the window starting between two columns
    fn frame(registry: &ControlRegistry) -> WaveformFrame {
        let view = loaded_view(registry);
        registry.set(&ConfigKey::new(GROUP, items::PLAY_POSITION), 0.5005);
        view.snapshot()
    }

    #[test]
    fn test_only_visible_beats_are_drawn() {
        let registry = ControlRegistry::new();
        let frame = frame(&registry);
        let mut renderer = BeatRenderer::new(PositionSource::Play);
        renderer.preprocess(&frame);

        // Visible columns 300.5..700.5 with a beat every 10 columns: 310, 320, ... 700
        assert_eq!(renderer.layer.builder().len(), 40 * 6);
    }

    #[test]
    fn test_bars_use_bar_color() {
        let registry = ControlRegistry::new();
        let frame = frame(&registry);
        let mut renderer = BeatRenderer::new(PositionSource::Play);
        let node = SkinNode::from_yaml("BarColor: \"#ff0000\"\nBeatColor: \"#0000ff\"").unwrap();
        renderer.setup(&node, &SkinContext::new());
        renderer.preprocess(&frame);

        let red = renderer
            .layer
            .builder()
            .vertices()
            .iter()
            .filter(|v| v.color[0] == 1.0)
            .count();
        // A bar every 40 columns: 320, 360, ... 680
        assert_eq!(red, 10 * 6);
    }

    #[test]
    fn test_slip_source_is_idle_without_slip() {
        let registry = ControlRegistry::new();
        let frame = loaded_view(&registry).snapshot();
        let mut renderer = BeatRenderer::new(PositionSource::Slip);
        renderer.preprocess(&frame);
        assert!(renderer.layer.builder().is_empty());
    }
}
