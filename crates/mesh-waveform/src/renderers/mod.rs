//! Waveform renderers
//!
//! Every visual layer of the waveform view is one renderer node. Renderers
//! read their skin keys once at construction ([`WaveformRenderer::setup`]),
//! rebuild their geometry in `preprocess` from the current
//! [`WaveformFrame`], and submit it in `paint`.

pub mod background;
pub mod beat;
pub mod end_of_track;
pub mod mark;
pub mod mark_range;
pub mod preroll;
pub mod signal;
pub mod slip_mode;
#[cfg(feature = "stem")]
pub mod stem;

use std::sync::Arc;

use mesh_rendergraph::{
    BlendMode, GeometryBuilder, GeometryId, GpuResources, Painter, RenderError, Renderer,
};

use crate::controls::ControlRegistry;
use crate::settings::WaveformSettings;
use crate::skin::{SkinContext, SkinNode};
use crate::types::Orientation;
use crate::view::WaveformFrame;

pub use background::BackgroundRenderer;
pub use beat::BeatRenderer;
pub use end_of_track::EndOfTrackRenderer;
pub use mark::{Mark, MarkRenderer};
pub use mark_range::{MarkRange, MarkRangeRenderer};
pub use preroll::PrerollRenderer;
pub use slip_mode::{slip_border_alpha, SlipModeRenderer};
#[cfg(feature = "stem")]
pub use stem::StemRenderer;

/// A renderer of the waveform view
pub trait WaveformRenderer: Renderer<WaveformFrame> {
    /// Read configuration from the skin's waveform node
    ///
    /// Called once, before the renderer joins the tree. Missing or
    /// malformed keys keep the built-in defaults.
    fn setup(&mut self, _node: &SkinNode, _context: &SkinContext) {}
}

/// Everything a renderer may bind to at construction
#[derive(Clone, Copy)]
pub struct RendererContext<'a> {
    /// Deck group, e.g. `[Channel1]`
    pub group: &'a str,
    pub registry: &'a Arc<ControlRegistry>,
    pub settings: &'a WaveformSettings,
}

/// Triangle wave over `period_ms`: 1 at phase 0, 0 at half period
pub fn triangle_wave(elapsed_ms: u128, period_ms: u128) -> f32 {
    if period_ms == 0 {
        return 0.0;
    }
    let phase = (elapsed_ms % period_ms) as f32;
    let half = period_ms as f32 / 2.0;
    2.0 * (phase - half).abs() / period_ms as f32
}

/// One geometry allocation plus the vertices rebuilt each frame
///
/// Covers the init / preprocess / paint / release plumbing shared by all
/// renderers.
#[derive(Debug)]
pub(crate) struct Layer {
    label: &'static str,
    capacity: usize,
    blend: BlendMode,
    geometry: Option<GeometryId>,
    builder: GeometryBuilder,
}

impl Layer {
    pub(crate) fn new(label: &'static str, capacity: usize, blend: BlendMode) -> Self {
        Self {
            label,
            capacity,
            blend,
            geometry: None,
            builder: GeometryBuilder::with_capacity(capacity),
        }
    }

    pub(crate) fn init(&mut self, gpu: &mut dyn GpuResources) -> Result<(), RenderError> {
        self.geometry = Some(gpu.create_geometry(self.label, self.capacity)?);
        Ok(())
    }

    pub(crate) fn release(&mut self, gpu: &mut dyn GpuResources) {
        if let Some(geometry) = self.geometry.take() {
            gpu.release_geometry(geometry);
        }
    }

    /// Builder cleared for a new frame
    pub(crate) fn begin(&mut self) -> &mut GeometryBuilder {
        self.builder.clear();
        &mut self.builder
    }

    pub(crate) fn builder(&self) -> &GeometryBuilder {
        &self.builder
    }

    pub(crate) fn paint(&self, painter: &mut Painter<'_>) {
        if let Some(geometry) = self.geometry {
            painter.draw(geometry, self.blend, self.builder.vertices());
        }
    }
}

/// Rectangle given in (length, breadth) coordinates
pub(crate) fn push_span(
    builder: &mut GeometryBuilder,
    frame: &WaveformFrame,
    along: (f32, f32),
    across: (f32, f32),
    color: [f32; 4],
) {
    let (x0, y0) = frame.point(along.0, across.0);
    let (x1, y1) = frame.point(along.1, across.1);
    builder.push_rect(x0.min(x1), y0.min(y1), x0.max(x1), y0.max(y1), color);
}

/// Rectangle whose color runs from `from` to `to` along the length axis
pub(crate) fn push_span_gradient(
    builder: &mut GeometryBuilder,
    frame: &WaveformFrame,
    along: (f32, f32),
    across: (f32, f32),
    from: [f32; 4],
    to: [f32; 4],
) {
    let (x0, y0) = frame.point(along.0, across.0);
    let (x1, y1) = frame.point(along.1, across.1);
    match frame.orientation {
        Orientation::Horizontal => builder.push_rect_horizontal_gradient(x0, y0, x1, y1, from, to),
        Orientation::Vertical => builder.push_rect_vertical_gradient(x0, y0, x1, y1, from, to),
    }
}

/// Line across the breadth at `along`, `width` pixels thick
pub(crate) fn push_line(
    builder: &mut GeometryBuilder,
    frame: &WaveformFrame,
    along: f32,
    width: f32,
    across: (f32, f32),
    color: [f32; 4],
) {
    let half = width / 2.0;
    push_span(builder, frame, (along - half, along + half), across, color);
}
