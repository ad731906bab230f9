//! Single-color envelope

use iced::Color;
use mesh_rendergraph::{GpuResources, Painter, RenderError, Renderer};

use super::{amplitude, columns, signal_layer, stereo_halves, SignalPass};
use crate::renderers::{Layer, WaveformRenderer};
use crate::skin::{SkinContext, SkinNode};
use crate::theme::{defaults, rgba};
use crate::types::PositionSource;
use crate::view::WaveformFrame;

/// Envelope of the full-band amplitude in the skin's `SignalColor`
pub struct SimpleRenderer {
    source: PositionSource,
    color: Color,
    layer: Layer,
}

impl SimpleRenderer {
    pub fn new(source: PositionSource) -> Self {
        Self {
            source,
            color: defaults::SIGNAL,
            layer: signal_layer("simple"),
        }
    }
}

impl WaveformRenderer for SimpleRenderer {
    fn setup(&mut self, node: &SkinNode, context: &SkinContext) {
        self.color = context.select_color_or(node, "SignalColor", self.color);
    }
}

impl Renderer<WaveformFrame> for SimpleRenderer {
    fn name(&self) -> &'static str {
        "simple"
    }

    fn init(&mut self, gpu: &mut dyn GpuResources) -> Result<(), RenderError> {
        self.layer.init(gpu)
    }

    fn preprocess(&mut self, frame: &WaveformFrame) {
        let color = rgba(self.color);
        let builder = self.layer.begin();
        let Some(pass) = SignalPass::new(frame, self.source) else {
            return;
        };

        let gain = pass.gain();
        let half = pass.half();
        for column in columns(frame, pass.source, 1.0) {
            let Some(peak) = pass.track.peak(column.range.clone()) else {
                continue;
            };
            let (top, bottom) = stereo_halves(peak, false);
            pass.push_bar(
                builder,
                &column,
                amplitude(top.all, gain.all, half),
                amplitude(bottom.all, gain.all, half),
                color,
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
