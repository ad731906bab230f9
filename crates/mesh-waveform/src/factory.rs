//! Signal renderer selection
//!
//! Picking the primary signal renderer is split in two pure steps:
//!
//! 1. [`select_signal_renderer`] maps (type, options, surface profile) to a
//!    [`SignalKind`], consulting the high-detail capability gate first
//! 2. a dispatch table maps each [`SignalKind`] to a factory function
//!
//! Every [`WaveformWidgetType`] maps to exactly one kind or to `None`.

use mesh_rendergraph::{Renderer, SurfaceProfile};

use crate::error::WaveformError;
use crate::renderers::signal::{
    FilteredRenderer, HsvRenderer, RgbRenderer, SimpleRenderer, TexturedRenderer, TexturedStyle,
};
use crate::renderers::WaveformRenderer;
use crate::skin::{SkinContext, SkinNode};
use crate::types::{PositionSource, WaveformOptions, WaveformWidgetType};
use crate::view::WaveformFrame;

/// Concrete signal renderer implementation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignalKind {
    Simple,
    Rgb,
    Hsv,
    Filtered,
    Stacked,
    Textured(TexturedStyle),
}

impl SignalKind {
    /// Whether the widget duplicates its overlays for the slip position
    pub fn supports_slip(self) -> bool {
        match self {
            SignalKind::Rgb
            | SignalKind::Filtered
            | SignalKind::Stacked
            | SignalKind::Textured(_) => true,
            SignalKind::Simple | SignalKind::Hsv => false,
        }
    }

    /// Renderer name this kind produces
    pub fn renderer_name(self) -> &'static str {
        match self {
            SignalKind::Simple => "simple",
            SignalKind::Rgb => "rgb",
            SignalKind::Hsv => "hsv",
            SignalKind::Filtered => "filtered",
            SignalKind::Stacked => "stacked",
            SignalKind::Textured(TexturedStyle::Rgb) => "textured_rgb",
            SignalKind::Textured(TexturedStyle::Filtered) => "textured_filtered",
            SignalKind::Textured(TexturedStyle::Stacked) => "textured_stacked",
        }
    }
}

/// High-detail (textured) rendering is offered for this combination
///
/// Requires the option, a type with a textured style, and a full-profile
/// surface.
pub fn high_detail_available(
    widget_type: WaveformWidgetType,
    options: WaveformOptions,
    profile: SurfaceProfile,
) -> bool {
    options.contains(WaveformOptions::HIGH_DETAIL)
        && textured_style(widget_type).is_some()
        && profile.supports_high_detail()
}

fn textured_style(widget_type: WaveformWidgetType) -> Option<TexturedStyle> {
    match widget_type {
        WaveformWidgetType::Rgb => Some(TexturedStyle::Rgb),
        WaveformWidgetType::Filtered => Some(TexturedStyle::Filtered),
        WaveformWidgetType::Stacked => Some(TexturedStyle::Stacked),
        _ => None,
    }
}

/// Signal renderer for a display type
///
/// Fails for types that have no signal renderer in this view.
pub fn try_select_signal_renderer(
    widget_type: WaveformWidgetType,
    options: WaveformOptions,
    profile: SurfaceProfile,
) -> Result<SignalKind, WaveformError> {
    if high_detail_available(widget_type, options, profile) {
        if let Some(style) = textured_style(widget_type) {
            return Ok(SignalKind::Textured(style));
        }
    }

    match widget_type {
        WaveformWidgetType::Simple => Ok(SignalKind::Simple),
        WaveformWidgetType::Rgb => Ok(SignalKind::Rgb),
        WaveformWidgetType::Hsv => Ok(SignalKind::Hsv),
        WaveformWidgetType::Filtered => Ok(SignalKind::Filtered),
        WaveformWidgetType::Stacked => Ok(SignalKind::Stacked),
        WaveformWidgetType::Empty | WaveformWidgetType::VSyncTest => {
            Err(WaveformError::UnsupportedType(widget_type))
        }
    }
}

/// Signal renderer for a display type, or `None` for types without one
///
/// `None` is a configuration error: it is logged and the widget draws its
/// overlays only.
pub fn select_signal_renderer(
    widget_type: WaveformWidgetType,
    options: WaveformOptions,
    profile: SurfaceProfile,
) -> Option<SignalKind> {
    match try_select_signal_renderer(widget_type, options, profile) {
        Ok(kind) => Some(kind),
        Err(e) => {
            log::error!("{}, drawing overlays only", e);
            None
        }
    }
}

/// Options a display type can make use of on this surface
pub fn supported_options(
    widget_type: WaveformWidgetType,
    profile: SurfaceProfile,
) -> WaveformOptions {
    let options = match widget_type {
        WaveformWidgetType::Rgb => WaveformOptions::ALL_COMBINED,
        WaveformWidgetType::Filtered | WaveformWidgetType::Stacked => WaveformOptions::HIGH_DETAIL,
        WaveformWidgetType::Empty
        | WaveformWidgetType::Simple
        | WaveformWidgetType::Hsv
        | WaveformWidgetType::VSyncTest => WaveformOptions::empty(),
    };
    if profile.supports_high_detail() {
        options
    } else {
        options - WaveformOptions::HIGH_DETAIL
    }
}

/// Signal renderer factory
pub type SignalFactory = fn(PositionSource, WaveformOptions) -> Box<dyn SignalRenderer>;

/// A signal renderer ready for skin setup and insertion into the tree
pub trait SignalRenderer: WaveformRenderer {
    /// Apply the skin and hand the renderer over to the tree
    fn into_node(
        self: Box<Self>,
        node: &SkinNode,
        context: &SkinContext,
    ) -> Box<dyn Renderer<WaveformFrame>>;
}

impl<R: WaveformRenderer + 'static> SignalRenderer for R {
    fn into_node(
        mut self: Box<Self>,
        node: &SkinNode,
        context: &SkinContext,
    ) -> Box<dyn Renderer<WaveformFrame>> {
        self.setup(node, context);
        self
    }
}

fn simple(source: PositionSource, _options: WaveformOptions) -> Box<dyn SignalRenderer> {
    Box::new(SimpleRenderer::new(source))
}

fn rgb(source: PositionSource, options: WaveformOptions) -> Box<dyn SignalRenderer> {
    Box::new(RgbRenderer::new(source, options))
}

fn hsv(source: PositionSource, _options: WaveformOptions) -> Box<dyn SignalRenderer> {
    Box::new(HsvRenderer::new(source))
}

fn filtered(source: PositionSource, _options: WaveformOptions) -> Box<dyn SignalRenderer> {
    Box::new(FilteredRenderer::new(source, false))
}

fn stacked(source: PositionSource, _options: WaveformOptions) -> Box<dyn SignalRenderer> {
    Box::new(FilteredRenderer::new(source, true))
}

fn textured_rgb(source: PositionSource, options: WaveformOptions) -> Box<dyn SignalRenderer> {
    Box::new(TexturedRenderer::new(source, TexturedStyle::Rgb, options))
}

fn textured_filtered(source: PositionSource, options: WaveformOptions) -> Box<dyn SignalRenderer> {
    Box::new(TexturedRenderer::new(source, TexturedStyle::Filtered, options))
}

fn textured_stacked(source: PositionSource, options: WaveformOptions) -> Box<dyn SignalRenderer> {
    Box::new(TexturedRenderer::new(source, TexturedStyle::Stacked, options))
}

/// Dispatch table: signal kind to factory
pub fn signal_factory(kind: SignalKind) -> SignalFactory {
    match kind {
        SignalKind::Simple => simple,
        SignalKind::Rgb => rgb,
        SignalKind::Hsv => hsv,
        SignalKind::Filtered => filtered,
        SignalKind::Stacked => stacked,
        SignalKind::Textured(TexturedStyle::Rgb) => textured_rgb,
        SignalKind::Textured(TexturedStyle::Filtered) => textured_filtered,
        SignalKind::Textured(TexturedStyle::Stacked) => textured_stacked,
    }
}
