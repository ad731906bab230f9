//! Layered GPU waveform view for mesh decks
//!
//! This crate builds the scrolling deck waveform on top of
//! `mesh-rendergraph`: one renderer per visual layer, composed into a fixed
//! tree by [`WaveformWidget`] and drawn through iced's shader widget.
//!
//! ## Architecture
//!
//! - **Controls**: lock-free [`ControlValue`]s published by the audio engine,
//!   looked up once by [`ConfigKey`] and read every frame
//! - **Track data**: [`TrackSlot`] publishes the analyzed waveform to the
//!   render thread (basedrop, reclaimed off-thread)
//! - **View**: [`WaveformView`] snapshots positions and geometry into a
//!   [`WaveformFrame`] that every renderer reads
//! - **Renderers**: background, overlays, signal variants and the slip
//!   border, each configured from the skin once at construction
//! - **Selection**: [`select_signal_renderer`] and the dispatch table in
//!   [`factory`] turn (type, options, surface) into a signal renderer
//! - **Submission**: [`waveform_shader`] uploads the recorded draw list
//!
//! ## Per-frame flow
//!
//! ```text
//! WaveformWidget::render()
//!   ├── WaveformView::snapshot() ──► WaveformFrame
//!   ├── opacity node = 0 if background only, else 1
//!   ├── Engine::preprocess(&frame)      (all renderers, culled ones too)
//!   └── Engine::render(&frame, backend) ──► DrawList ──► waveform_shader
//! ```
//!
//! ## Features
//!
//! - `stem` (default): stem tracks are drawn per stem by the stem overlay

pub mod controls;
pub mod error;
pub mod factory;
pub mod gc;
pub mod pipeline;
pub mod renderers;
pub mod settings;
pub mod skin;
pub mod theme;
pub mod track;
pub mod types;
pub mod view;
pub mod widget;

// Re-export commonly used items
pub use controls::{items, ConfigKey, ControlProxy, ControlRegistry, ControlValue};
pub use error::WaveformError;
pub use factory::{
    high_detail_available, select_signal_renderer, signal_factory, supported_options,
    try_select_signal_renderer, SignalKind,
};
pub use pipeline::{surface_profile, waveform_shader, WaveformPipeline, WaveformPrimitive};
pub use renderers::{slip_border_alpha, MarkRange, MarkRangeRenderer, MarkRenderer, WaveformRenderer};
pub use settings::{
    default_settings_path, load_settings, save_settings, DisplaySettings, VisualGain,
    WaveformSettings,
};
pub use skin::{load_skin, Skin, SkinContext, SkinNode};
pub use theme::{CUE_COLORS, STEM_COLORS, STEM_NAMES};
pub use track::{TrackSlot, TrackWaveform, WaveformSample};
pub use types::{
    Orientation, PositionSource, WaveformOptions, WaveformWidgetType, WidgetCategory, WidgetVars,
};
pub use view::{WaveformFrame, WaveformView};
pub use widget::{EventDisposition, WaveformWidget};
