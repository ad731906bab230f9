//! Highlighted track ranges (loops, intro/outro)
//!
//! Each range is bound to a start and an end control holding audio frame
//! positions (`-1` when unset) and, optionally, an enabled control. Enabled
//! ranges use their `Color`, disabled ones their `DisabledColor`.
//!
//! The widget keeps a typed handle to this renderer so other parts of the
//! UI can add ranges and hit-test them.

use std::sync::Arc;

use iced::Color;
use mesh_rendergraph::{BlendMode, GpuResources, Painter, RenderError, Renderer};

use super::{push_span, Layer, RendererContext, WaveformRenderer};
use crate::controls::{items, ConfigKey, ControlProxy, ControlRegistry};
use crate::skin::{SkinContext, SkinNode};
use crate::theme::{defaults, rgba};
use crate::types::PositionSource;
use crate::view::WaveformFrame;

/// Ranges beyond this many are ignored
const MAX_RANGES: usize = 16;

/// One range bound to its position controls
#[derive(Debug, Clone)]
pub struct MarkRange {
    start: ControlProxy,
    end: ControlProxy,
    enabled: Option<ControlProxy>,
    pub color: Color,
    pub disabled_color: Color,
}

impl MarkRange {
    pub fn new(
        start: ControlProxy,
        end: ControlProxy,
        enabled: Option<ControlProxy>,
        color: Color,
        disabled_color: Color,
    ) -> Self {
        Self {
            start,
            end,
            enabled,
            color,
            disabled_color,
        }
    }

    /// Start in audio frames, if set
    pub fn start(&self) -> Option<u64> {
        position(&self.start)
    }

    /// End in audio frames, if set
    pub fn end(&self) -> Option<u64> {
        position(&self.end)
    }

    /// Ranges without an enabled control are always enabled
    pub fn is_enabled(&self) -> bool {
        self.enabled.as_ref().map_or(true, |enabled| enabled.to_bool())
    }

    /// Both ends set and in order
    pub fn is_valid(&self) -> bool {
        matches!((self.start(), self.end()), (Some(start), Some(end)) if start < end)
    }

    fn active_color(&self) -> Color {
        if self.is_enabled() {
            self.color
        } else {
            self.disabled_color
        }
    }
}

fn position(proxy: &ControlProxy) -> Option<u64> {
    let value = proxy.get();
    (value >= 0.0).then_some(value as u64)
}

pub struct MarkRangeRenderer {
    group: String,
    registry: Arc<ControlRegistry>,
    ranges: Vec<MarkRange>,
    /// Length-axis spans drawn in the last frame, per range
    spans: Vec<Option<(f32, f32)>>,
    layer: Layer,
}

impl MarkRangeRenderer {
    /// Renderer with the deck's loop as the default range
    pub fn new(context: RendererContext<'_>) -> Self {
        let mut renderer = Self {
            group: context.group.to_string(),
            registry: Arc::clone(context.registry),
            ranges: Vec::new(),
            spans: Vec::new(),
            layer: Layer::new("mark_range", 6 * MAX_RANGES, BlendMode::Alpha),
        };
        let loop_range = renderer.bind_range(
            items::LOOP_START,
            items::LOOP_END,
            Some(items::LOOP_ENABLED),
            defaults::LOOP,
            defaults::LOOP_DISABLED,
        );
        renderer.add_range(loop_range);
        renderer
    }

    fn bind_range(
        &self,
        start: &str,
        end: &str,
        enabled: Option<&str>,
        color: Color,
        disabled_color: Color,
    ) -> MarkRange {
        let proxy = |item: &str| {
            self.registry
                .proxy_or_create(&ConfigKey::new(self.group.as_str(), item), -1.0)
        };
        let enabled = enabled.map(|item| {
            self.registry
                .proxy_or_create(&ConfigKey::new(self.group.as_str(), item), 0.0)
        });
        MarkRange::new(proxy(start), proxy(end), enabled, color, disabled_color)
    }

    pub fn ranges(&self) -> &[MarkRange] {
        &self.ranges
    }

    /// Add a range; ignored beyond the range limit
    pub fn add_range(&mut self, range: MarkRange) {
        if self.ranges.len() >= MAX_RANGES {
            log::warn!("MarkRangeRenderer: more than {} ranges, ignoring", MAX_RANGES);
            return;
        }
        self.ranges.push(range);
    }

    /// Index of the topmost range drawn under `along` in the last frame
    pub fn range_at(&self, along: f32) -> Option<usize> {
        self.spans
            .iter()
            .enumerate()
            .rev()
            .find(|(_, span)| span.is_some_and(|(start, end)| along >= start && along <= end))
            .map(|(index, _)| index)
    }
}

impl WaveformRenderer for MarkRangeRenderer {
    fn setup(&mut self, node: &SkinNode, context: &SkinContext) {
        let nodes = context.select_nodes(node, "MarkRange");
        if nodes.is_empty() {
            return;
        }

        // Skin ranges replace the default loop range
        self.ranges.clear();
        for range_node in &nodes {
            let start = context.select_string(range_node, "StartControl");
            let end = context.select_string(range_node, "EndControl");
            let (Some(start), Some(end)) = (start, end) else {
                log::warn!("MarkRange without StartControl/EndControl, skipping");
                continue;
            };
            let enabled = context.select_string(range_node, "EnabledControl");
            let color = context.select_color_or(range_node, "Color", defaults::LOOP);
            let disabled_color =
                context.select_color_or(range_node, "DisabledColor", defaults::LOOP_DISABLED);
            let range = self.bind_range(&start, &end, enabled.as_deref(), color, disabled_color);
            self.add_range(range);
        }
    }
}

impl Renderer<WaveformFrame> for MarkRangeRenderer {
    fn name(&self) -> &'static str {
        "mark_range"
    }

    fn init(&mut self, gpu: &mut dyn GpuResources) -> Result<(), RenderError> {
        self.layer.init(gpu)
    }

    fn preprocess(&mut self, frame: &WaveformFrame) {
        let builder = self.layer.begin();
        self.spans.clear();

        let lane = frame.lane(PositionSource::Play);
        for range in &self.ranges {
            let span = match (range.start(), range.end(), lane) {
                (Some(start), Some(end), Some(lane))
                    if start < end && !frame.should_only_draw_background() =>
                {
                    let x0 = frame.sample_to_x(start, PositionSource::Play).max(0.0);
                    let x1 = frame.sample_to_x(end, PositionSource::Play).min(frame.length);
                    (x0 < x1).then(|| {
                        push_span(builder, frame, (x0, x1), lane, rgba(range.active_color()));
                        (x0, x1)
                    })
                }
                _ => None,
            };
            self.spans.push(span);
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
    use crate::renderers::tests::{loaded_view, GROUP};
    use crate::settings::WaveformSettings;

    fn renderer(registry: &Arc<ControlRegistry>) -> MarkRangeRenderer {
        MarkRangeRenderer::new(RendererContext {
            group: GROUP,
            registry,
            settings: &WaveformSettings::default(),
        })
    }

    fn set(registry: &ControlRegistry, item: &str, value: f64) {
        registry.set(&ConfigKey::new(GROUP, item), value);
    }

    #[test]
    fn test_unset_loop_draws_nothing() {
        let registry = Arc::new(ControlRegistry::new());
        let frame = loaded_view(&registry).snapshot();
        let mut renderer = renderer(&registry);
        assert_eq!(renderer.ranges().len(), 1);
        assert!(!renderer.ranges()[0].is_valid());

        renderer.preprocess(&frame);
        assert!(renderer.layer.builder().is_empty());
        assert_eq!(renderer.range_at(100.0), None);
    }

    #[test]
    fn test_loop_range_is_hit_testable() {
        let registry = Arc::new(ControlRegistry::new());
        let frame = loaded_view(&registry).snapshot();
        let mut renderer = renderer(&registry);

        // Columns 400..600 of the ramp track (441 frames per column)
        set(&registry, items::LOOP_START, 400.0 * 441.0);
        set(&registry, items::LOOP_END, 600.0 * 441.0);
        set(&registry, items::LOOP_ENABLED, 1.0);
        renderer.preprocess(&frame);

        assert_eq!(renderer.layer.builder().len(), 6);
        assert_eq!(renderer.range_at(100.0), Some(0));
        assert_eq!(renderer.range_at(10.0), None);
        let alpha = renderer.layer.builder().vertices()[0].color[3];
        assert_eq!(alpha, defaults::LOOP.a);
    }

    #[test]
    fn test_disabled_range_uses_disabled_color() {
        let registry = Arc::new(ControlRegistry::new());
        let frame = loaded_view(&registry).snapshot();
        let mut renderer = renderer(&registry);
        set(&registry, items::LOOP_START, 400.0 * 441.0);
        set(&registry, items::LOOP_END, 600.0 * 441.0);
        renderer.preprocess(&frame);

        let alpha = renderer.layer.builder().vertices()[0].color[3];
        assert_eq!(alpha, defaults::LOOP_DISABLED.a);
    }

    #[test]
    fn test_skin_ranges_replace_default() {
        let registry = Arc::new(ControlRegistry::new());
        let mut renderer = renderer(&registry);
        let node = SkinNode::from_yaml(
            r##"
MarkRange:
  - StartControl: intro_start_position
    EndControl: intro_end_position
    Color: "#0000ff80"
  - EndControl: broken
"##,
        )
        .unwrap();
        renderer.setup(&node, &SkinContext::new());

        assert_eq!(renderer.ranges().len(), 1);
        assert!(renderer.ranges()[0].is_enabled());
        assert_eq!(renderer.ranges()[0].color.b, 1.0);
        assert!(registry
            .lookup(&ConfigKey::new(GROUP, "intro_start_position"))
            .is_some());
    }
}
