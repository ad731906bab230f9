//! Stem overlay
//!
//! For stem tracks the signal layer steps aside and each stem is drawn as
//! its own envelope in its stem color, scaled by the stem's volume. Muted
//! stems stay visible but faded.

use mesh_rendergraph::{BlendMode, GpuResources, Painter, RenderError, Renderer};

use super::signal::columns;
use super::{push_span, Layer, RendererContext, WaveformRenderer};
use crate::controls::{items, ConfigKey, ControlProxy};
use crate::theme::{with_alpha, STEM_COLORS};
use crate::track::NUM_STEMS;
use crate::types::PositionSource;
use crate::view::WaveformFrame;

const STEM_ALPHA: f32 = 0.75;
const MUTED_ALPHA: f32 = 0.2;

struct StemControls {
    volume: ControlProxy,
    mute: ControlProxy,
}

pub struct StemRenderer {
    source: PositionSource,
    stems: Vec<StemControls>,
    layer: Layer,
}

impl StemRenderer {
    pub fn new(context: RendererContext<'_>, source: PositionSource) -> Self {
        let stems = (1..=NUM_STEMS)
            .map(|index| {
                let group = items::stem_group(context.group, index);
                StemControls {
                    volume: context
                        .registry
                        .proxy_or_create(&ConfigKey::new(group.as_str(), items::STEM_VOLUME), 1.0),
                    mute: context
                        .registry
                        .proxy_or_create(&ConfigKey::new(group.as_str(), items::STEM_MUTE), 0.0),
                }
            })
            .collect();
        Self {
            source,
            stems,
            layer: Layer::new("stem", 6 * NUM_STEMS * 2048, BlendMode::Alpha),
        }
    }

    pub fn source(&self) -> PositionSource {
        self.source
    }
}

impl WaveformRenderer for StemRenderer {}

impl Renderer<WaveformFrame> for StemRenderer {
    fn name(&self) -> &'static str {
        "stem"
    }

    fn init(&mut self, gpu: &mut dyn GpuResources) -> Result<(), RenderError> {
        self.layer.init(gpu)
    }

    fn preprocess(&mut self, frame: &WaveformFrame) {
        let source = self.source;
        let levels: Vec<(f32, f32)> = self
            .stems
            .iter()
            .map(|stem| {
                let alpha = if stem.mute.to_bool() { MUTED_ALPHA } else { STEM_ALPHA };
                (stem.volume.get().clamp(0.0, 1.0) as f32, alpha)
            })
            .collect();
        let builder = self.layer.begin();

        if frame.should_only_draw_background() {
            return;
        }
        let (Some(track), Some((top, bottom))) = (frame.track(), frame.lane(source)) else {
            return;
        };
        if !track.has_stems() {
            return;
        }

        let center = (top + bottom) / 2.0;
        let half = (bottom - top) / 2.0;
        let gain = frame.gain.all;
        for column in columns(frame, source, 1.0) {
            let Some(peak) = track.stem_peak(column.range.clone()) else {
                continue;
            };
            for (stem, &value) in peak.iter().enumerate() {
                let (volume, alpha) = levels[stem];
                let extent = (value as f32 / 255.0 * gain * volume * half).min(half);
                if extent <= 0.0 {
                    continue;
                }
                push_span(
                    builder,
                    frame,
                    (column.along, column.along + column.width),
                    (center - extent, center + extent),
                    with_alpha(STEM_COLORS[stem], alpha),
                );
            }
        }
    }

    fn paint(&mut self, _frame: &WaveformFrame, painter: &mut Painter<'_>) {
        self.layer.paint(painter);
    }

    fn release(&mut self, gpu: &mut dyn GpuResources) {
        self.layer.release(gpu);
    }
}
