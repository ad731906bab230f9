//! Pre-roll and post-roll markers
//!
//! Where the visible window extends before the start or past the end of
//! the track, the empty region is filled with a row of dimmed triangles
//! pointing away from the audio.

use iced::Color;
use mesh_rendergraph::{BlendMode, GeometryBuilder, GpuResources, Painter, RenderError, Renderer};

use super::{Layer, WaveformRenderer};
use crate::skin::{SkinContext, SkinNode};
use crate::theme::{defaults, with_alpha};
use crate::types::PositionSource;
use crate::view::WaveformFrame;

const PREROLL_ALPHA: f32 = 0.5;

/// Limit on triangles per side so very narrow lanes stay bounded
const MAX_TRIANGLES: usize = 256;

pub struct PrerollRenderer {
    source: PositionSource,
    color: Color,
    layer: Layer,
}

impl PrerollRenderer {
    pub fn new(source: PositionSource) -> Self {
        Self {
            source,
            color: defaults::SIGNAL,
            layer: Layer::new("preroll", 3 * 2 * MAX_TRIANGLES, BlendMode::Alpha),
        }
    }

    pub fn source(&self) -> PositionSource {
        self.source
    }
}

/// Fill `start..end` along the length with triangles pointing towards `end`
/// (or towards `start` when `towards_start` is set)
fn push_triangles(
    builder: &mut GeometryBuilder,
    frame: &WaveformFrame,
    (start, end): (f32, f32),
    (top, bottom): (f32, f32),
    towards_start: bool,
    color: [f32; 4],
) {
    let size = (bottom - top) / 2.0;
    if size <= 0.0 || end <= start {
        return;
    }
    let middle = top + size;

    let mut count = 0;
    let mut base = if towards_start { end } else { start };
    while count < MAX_TRIANGLES {
        let tip = if towards_start { base - size } else { base + size };
        if (towards_start && tip < start) || (!towards_start && tip > end) {
            break;
        }
        builder.push_triangle(
            [
                frame.point(base, top + size * 0.5),
                frame.point(base, bottom - size * 0.5),
                frame.point(tip, middle),
            ],
            color,
        );
        base = tip;
        count += 1;
    }
}

impl WaveformRenderer for PrerollRenderer {
    fn setup(&mut self, node: &SkinNode, context: &SkinContext) {
        self.color = context.select_color_or(node, "SignalColor", self.color);
    }
}

impl Renderer<WaveformFrame> for PrerollRenderer {
    fn name(&self) -> &'static str {
        "preroll"
    }

    fn init(&mut self, gpu: &mut dyn GpuResources) -> Result<(), RenderError> {
        self.layer.init(gpu)
    }

    fn preprocess(&mut self, frame: &WaveformFrame) {
        let source = self.source;
        let color = with_alpha(self.color, PREROLL_ALPHA);
        let builder = self.layer.begin();

        if frame.should_only_draw_background() {
            return;
        }
        let Some(lane) = frame.lane(source) else {
            return;
        };

        let track_start = frame.fraction_to_x(0.0, source);
        let track_end = frame.fraction_to_x(1.0, source);
        if track_start > 0.0 {
            push_triangles(builder, frame, (0.0, track_start.min(frame.length)), lane, true, color);
        }
        if track_end < frame.length {
            push_triangles(builder, frame, (track_end.max(0.0), frame.length), lane, false, color);
        }
    }

    fn paint(&mut self, _frame: &WaveformFrame, painter: &mut Painter<'_>) {
        self.layer.paint(painter);
    }

    fn release(&mut self, gpu: &mut dyn GpuResources) {
        self.layer.release(gpu);
    }
}
