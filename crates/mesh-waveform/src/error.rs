//! Error types for the waveform view

use mesh_rendergraph::RenderError;

use crate::types::WaveformWidgetType;

/// Errors raised while building or driving a waveform widget
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum WaveformError {
    #[error("Waveform type '{0}' has no signal renderer")]
    UnsupportedType(WaveformWidgetType),

    #[error("Invalid skin: {0}")]
    Skin(String),

    #[error("Render graph error: {0}")]
    RenderGraph(#[from] RenderError),
}
