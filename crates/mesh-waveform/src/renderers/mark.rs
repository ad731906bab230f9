//! Cue marks and the play marker
//!
//! Marks are bound to position controls in audio frames (`-1` when unset):
//! the main cue point and the hot cues by default, or the skin's `Mark`
//! list. The play-position source also draws the play marker line across
//! the full breadth.

use std::sync::Arc;

use iced::Color;
use mesh_rendergraph::{BlendMode, GpuResources, Painter, RenderError, Renderer};

use super::{push_line, Layer, RendererContext, WaveformRenderer};
use crate::controls::{items, ConfigKey, ControlProxy, ControlRegistry};
use crate::skin::{SkinContext, SkinNode};
use crate::theme::{defaults, rgba, CUE_COLORS};
use crate::types::PositionSource;
use crate::view::WaveformFrame;

const MAX_MARKS: usize = 32;
const MARK_WIDTH: f32 = 2.0;
const HOVERED_MARK_WIDTH: f32 = 4.0;
const PLAY_MARKER_WIDTH: f32 = 2.0;

/// Hit-test tolerance around a mark line, in pixels
const MARK_HIT_TOLERANCE: f32 = 4.0;

/// One cue mark bound to its position control
#[derive(Debug, Clone)]
pub struct Mark {
    position: ControlProxy,
    pub color: Color,
    pub text: String,
}

impl Mark {
    pub fn new(position: ControlProxy, color: Color, text: impl Into<String>) -> Self {
        Self {
            position,
            color,
            text: text.into(),
        }
    }

    /// Position in audio frames, if set
    pub fn position(&self) -> Option<u64> {
        let value = self.position.get();
        (value >= 0.0).then_some(value as u64)
    }
}

pub struct MarkRenderer {
    source: PositionSource,
    group: String,
    registry: Arc<ControlRegistry>,
    marks: Vec<Mark>,
    play_marker_color: Color,
    hovered: Option<usize>,
    /// Length coordinate of each mark in the last frame
    drawn: Vec<Option<f32>>,
    layer: Layer,
}

impl MarkRenderer {
    /// Renderer with the main cue and the hot cues as default marks
    pub fn new(context: RendererContext<'_>, source: PositionSource) -> Self {
        let mut renderer = Self {
            source,
            group: context.group.to_string(),
            registry: Arc::clone(context.registry),
            marks: Vec::new(),
            play_marker_color: defaults::PLAY_POSITION,
            hovered: None,
            drawn: Vec::new(),
            layer: Layer::new("mark", 6 * (MAX_MARKS + 1), BlendMode::Alpha),
        };

        let main_cue = renderer.bind_mark(items::CUE_POINT, defaults::MAIN_CUE, "CUE");
        renderer.marks.push(main_cue);
        for (index, color) in CUE_COLORS.iter().enumerate() {
            let hotcue = renderer.bind_mark(
                &items::hotcue_position(index + 1),
                *color,
                (index + 1).to_string(),
            );
            renderer.marks.push(hotcue);
        }
        renderer
    }

    fn bind_mark(&self, item: &str, color: Color, text: impl Into<String>) -> Mark {
        let key = ConfigKey::new(self.group.as_str(), item);
        Mark::new(self.registry.proxy_or_create(&key, -1.0), color, text)
    }

    pub fn source(&self) -> PositionSource {
        self.source
    }

    pub fn marks(&self) -> &[Mark] {
        &self.marks
    }

    /// Index of the mark drawn nearest to `along` in the last frame
    pub fn mark_at(&self, along: f32) -> Option<usize> {
        self.drawn
            .iter()
            .enumerate()
            .filter_map(|(index, x)| x.map(|x| (index, (x - along).abs())))
            .filter(|&(_, distance)| distance <= MARK_HIT_TOLERANCE)
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(index, _)| index)
    }

    /// Highlight one mark (drawn wider), or none
    pub fn set_hovered(&mut self, index: Option<usize>) {
        self.hovered = index.filter(|&index| index < self.marks.len());
    }

    pub fn hovered(&self) -> Option<usize> {
        self.hovered
    }
}

impl WaveformRenderer for MarkRenderer {
    fn setup(&mut self, node: &SkinNode, context: &SkinContext) {
        self.play_marker_color = context.select_color_or(node, "PlayPosColor", self.play_marker_color);

        let nodes = context.select_nodes(node, "Mark");
        if nodes.is_empty() {
            return;
        }

        // Skin marks replace the defaults
        self.marks.clear();
        for (index, mark_node) in nodes.iter().enumerate() {
            let Some(control) = context.select_string(mark_node, "Control") else {
                log::warn!("Mark without Control, skipping");
                continue;
            };
            if self.marks.len() >= MAX_MARKS {
                log::warn!("MarkRenderer: more than {} marks, ignoring the rest", MAX_MARKS);
                break;
            }
            let fallback = CUE_COLORS[index % CUE_COLORS.len()];
            let color = context.select_color_or(mark_node, "Color", fallback);
            let text = context.select_string(mark_node, "Text").unwrap_or_default();
            let mark = self.bind_mark(&control, color, text);
            self.marks.push(mark);
        }
    }
}

impl Renderer<WaveformFrame> for MarkRenderer {
    fn name(&self) -> &'static str {
        "mark"
    }

    fn init(&mut self, gpu: &mut dyn GpuResources) -> Result<(), RenderError> {
        self.layer.init(gpu)
    }

    fn preprocess(&mut self, frame: &WaveformFrame) {
        let source = self.source;
        let hovered = self.hovered;
        let builder = self.layer.begin();
        self.drawn.clear();

        let lane = frame.lane(source).filter(|_| !frame.should_only_draw_background());
        for (index, mark) in self.marks.iter().enumerate() {
            let drawn = match (mark.position(), lane) {
                (Some(position), Some(lane)) => {
                    let x = frame.sample_to_x(position, source);
                    (0.0..=frame.length).contains(&x).then(|| {
                        let width = if hovered == Some(index) {
                            HOVERED_MARK_WIDTH
                        } else {
                            MARK_WIDTH
                        };
                        push_line(builder, frame, x, width, lane, rgba(mark.color));
                        x
                    })
                }
                _ => None,
            };
            self.drawn.push(drawn);
        }

        if source == PositionSource::Play && frame.length > 0.0 && frame.breadth > 0.0 {
            push_line(
                builder,
                frame,
                frame.play_marker_x(),
                PLAY_MARKER_WIDTH,
                (0.0, frame.breadth),
                rgba(self.play_marker_color),
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
