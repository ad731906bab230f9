//! Waveform widget: render graph composition for one deck
//!
//! The widget assembles the renderer tree once, at construction, in a fixed
//! paint order:
//!
//! ```text
//! root
//! ├── background
//! └── opacity
//!     ├── end_of_track
//!     ├── preroll (play)
//!     ├── mark_range
//!     ├── stem (play)              [stem feature]
//!     ├── <signal> (play)
//!     ├── beat (play)
//!     ├── mark (play)
//!     │   ── only when the signal renderer supports slip ──
//!     ├── slip_mode
//!     ├── preroll (slip)
//!     ├── stem (slip)              [stem feature]
//!     ├── <signal> (slip)
//!     ├── beat (slip)
//!     └── mark (slip)
//! ```
//!
//! Each frame the opacity node is switched off when only the background can
//! be drawn, then the engine preprocesses and renders the whole tree with
//! the GPU context held.

use std::sync::Arc;
use std::time::Duration;

use mesh_rendergraph::{
    CurrentContext, Engine, FrameState, FrameStats, NodeId, NodeTree, RenderBackend, Renderer,
    RendererHandle, Viewport,
};

use crate::controls::ControlRegistry;
use crate::factory::{select_signal_renderer, signal_factory, supported_options, SignalKind};
use crate::renderers::{
    BackgroundRenderer, BeatRenderer, EndOfTrackRenderer, MarkRangeRenderer, MarkRenderer,
    PrerollRenderer, RendererContext, SlipModeRenderer, WaveformRenderer,
};
#[cfg(feature = "stem")]
use crate::renderers::StemRenderer;
use crate::settings::WaveformSettings;
use crate::skin::Skin;
use crate::track::TrackSlot;
use crate::types::{
    PositionSource, WaveformOptions, WaveformWidgetType, WidgetCategory, WidgetVars,
};
use crate::view::{WaveformFrame, WaveformView};

/// What the widget does with an input event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventDisposition {
    /// Not consumed, the parent widget handles it unchanged
    ForwardToParent,
}

/// Apply the skin and box a renderer for the tree
fn configured<R: WaveformRenderer + 'static>(
    mut renderer: R,
    skin: &Skin,
) -> Box<dyn Renderer<WaveformFrame>> {
    renderer.setup(&skin.waveform, &skin.context);
    Box::new(renderer)
}

/// Everything tree assembly needs besides the tree itself
struct Assembly<'a> {
    context: RendererContext<'a>,
    skin: &'a Skin,
    options: WaveformOptions,
    signal: Option<SignalKind>,
}

impl Assembly<'_> {
    fn signal(&self, source: PositionSource) -> Option<Box<dyn Renderer<WaveformFrame>>> {
        self.signal.map(|kind| {
            signal_factory(kind)(source, self.options)
                .into_node(&self.skin.waveform, &self.skin.context)
        })
    }

    #[cfg(feature = "stem")]
    fn stem(&self, tree: &mut NodeTree<WaveformFrame>, parent: NodeId, source: PositionSource) {
        tree.append_renderer(parent, configured(StemRenderer::new(self.context, source), self.skin));
    }

    #[cfg(not(feature = "stem"))]
    fn stem(&self, _tree: &mut NodeTree<WaveformFrame>, _parent: NodeId, _source: PositionSource) {}

    /// Stem, signal, beat grid and marks for one position source
    ///
    /// Returns the mark renderer's node.
    fn position_layers(
        &self,
        tree: &mut NodeTree<WaveformFrame>,
        parent: NodeId,
        source: PositionSource,
    ) -> NodeId {
        self.stem(tree, parent, source);
        if let Some(signal) = self.signal(source) {
            tree.append_renderer(parent, signal);
        }
        tree.append_renderer(parent, configured(BeatRenderer::new(source), self.skin));
        tree.append_renderer(
            parent,
            configured(MarkRenderer::new(self.context, source), self.skin),
        )
    }
}

/// GPU waveform view of one deck
pub struct WaveformWidget<B: RenderBackend> {
    engine: Option<Engine<WaveformFrame>>,
    backend: B,
    view: WaveformView,
    widget_type: WaveformWidgetType,
    signal: Option<SignalKind>,
    opacity_node: NodeId,
    mark_range: Option<RendererHandle<MarkRangeRenderer>>,
    mark: Option<RendererHandle<MarkRenderer>>,
    init_success: bool,
    device_pixel_ratio: f32,
    last_stats: FrameStats,
}

impl<B: RenderBackend> WaveformWidget<B> {
    /// Build the renderer tree for the configured type and initialize it
    ///
    /// Initialization is best-effort: renderers that fail to allocate are
    /// disabled and [`init_success`](Self::init_success) reports `false`.
    pub fn new(
        group: &str,
        registry: &Arc<ControlRegistry>,
        track: TrackSlot,
        settings: &WaveformSettings,
        skin: &Skin,
        mut backend: B,
    ) -> Self {
        let widget_type = settings.display.widget_type;
        let options = settings.options();
        let profile = backend.profile();
        let signal = select_signal_renderer(widget_type, options, profile);

        let assembly = Assembly {
            context: RendererContext {
                group,
                registry,
                settings,
            },
            skin,
            options,
            signal,
        };

        let mut tree = NodeTree::new();
        let root = tree.root();
        tree.append_renderer(root, configured(BackgroundRenderer::new(), skin));

        let opacity = tree.create_opacity(1.0);
        tree.append_renderer(
            opacity,
            configured(EndOfTrackRenderer::new(assembly.context), skin),
        );
        tree.append_renderer(
            opacity,
            configured(PrerollRenderer::new(PositionSource::Play), skin),
        );
        let mark_range = tree.append_renderer(
            opacity,
            configured(MarkRangeRenderer::new(assembly.context), skin),
        );
        let mark = assembly.position_layers(&mut tree, opacity, PositionSource::Play);

        if signal.is_some_and(SignalKind::supports_slip) {
            tree.append_renderer(
                opacity,
                configured(SlipModeRenderer::new(assembly.context), skin),
            );
            tree.append_renderer(
                opacity,
                configured(PrerollRenderer::new(PositionSource::Slip), skin),
            );
            assembly.position_layers(&mut tree, opacity, PositionSource::Slip);
        }

        let opacity_node = tree.append_child_node(root, opacity);
        let mark_range = tree.renderer_handle::<MarkRangeRenderer>(mark_range);
        let mark = tree.renderer_handle::<MarkRenderer>(mark);

        let mut engine = Engine::new(tree);
        let init_success = match CurrentContext::acquire(&mut backend) {
            Ok(mut context) => engine.initialize(&mut *context),
            Err(e) => {
                log::error!("WaveformWidget {}: cannot acquire GPU context: {}", group, e);
                false
            }
        };

        log::info!(
            "WaveformWidget {}: {} ({:?}), {} renderers, init ok: {}",
            group,
            widget_type,
            signal,
            engine.tree().renderer_nodes().len(),
            init_success
        );

        let view = WaveformView::new(group, registry, track, settings);

        Self {
            engine: Some(engine),
            backend,
            view,
            widget_type,
            signal,
            opacity_node,
            mark_range,
            mark,
            init_success,
            device_pixel_ratio: 1.0,
            last_stats: FrameStats::default(),
        }
    }

    /// Static capabilities of this widget family
    pub fn vars() -> WidgetVars {
        WidgetVars {
            use_gl: true,
            use_gles: true,
            use_glsl: true,
            category: WidgetCategory::AllShader,
        }
    }

    /// Options `widget_type` can use on a surface of this backend's profile
    pub fn supported_options(&self, widget_type: WaveformWidgetType) -> WaveformOptions {
        supported_options(widget_type, self.backend.profile())
    }

    pub fn widget_type(&self) -> WaveformWidgetType {
        self.widget_type
    }

    /// Selected signal renderer, `None` for types without one
    pub fn signal_kind(&self) -> Option<SignalKind> {
        self.signal
    }

    /// Whether every renderer initialized
    pub fn init_success(&self) -> bool {
        self.init_success
    }

    pub fn view(&self) -> &WaveformView {
        &self.view
    }

    pub fn view_mut(&mut self) -> &mut WaveformView {
        &mut self.view
    }

    pub fn engine(&self) -> Option<&Engine<WaveformFrame>> {
        self.engine.as_ref()
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Outermost opacity node
    pub fn opacity_node(&self) -> NodeId {
        self.opacity_node
    }

    /// Counters of the last painted frame
    pub fn last_stats(&self) -> FrameStats {
        self.last_stats
    }

    /// The mark-range renderer, for adding and hit-testing ranges
    pub fn mark_range(&mut self) -> Option<&mut MarkRangeRenderer> {
        let handle = self.mark_range?;
        self.engine.as_mut()?.tree_mut().get_mut(handle)
    }

    /// The play-position mark renderer, for hit-testing and hover
    pub fn mark(&mut self) -> Option<&mut MarkRenderer> {
        let handle = self.mark?;
        self.engine.as_mut()?.tree_mut().get_mut(handle)
    }

    /// Draw one frame
    ///
    /// Always returns zero: there is no separate painter setup to time.
    pub fn render(&mut self) -> Duration {
        self.paint_gl();
        Duration::ZERO
    }

    /// Preprocess and render the tree with the GPU context held
    pub fn paint_gl(&mut self) -> FrameStats {
        let frame = self.view.snapshot();
        let Some(engine) = self.engine.as_mut() else {
            return FrameStats::default();
        };

        // Opacity 0 skips the subtree's draw calls
        let opacity = if frame.should_only_draw_background() {
            0.0
        } else {
            1.0
        };
        engine.tree_mut().set_opacity(self.opacity_node, opacity);

        if engine.state() == FrameState::Uninitialized {
            log::debug!("WaveformWidget {}: not initialized, skipping frame", self.view.group());
            return FrameStats::default();
        }

        match CurrentContext::acquire(&mut self.backend) {
            Ok(mut context) => {
                engine.preprocess(&frame);
                self.last_stats = engine.render(&frame, &mut *context);
            }
            Err(e) => {
                log::warn!("WaveformWidget {}: skipping frame: {}", self.view.group(), e);
                self.last_stats = FrameStats::default();
            }
        }
        self.last_stats
    }

    /// Record the device pixel ratio; the resize itself happens in [`resize_gl`](Self::resize_gl)
    pub fn resize_renderer(&mut self, _width: u32, _height: u32, device_pixel_ratio: f32) {
        if device_pixel_ratio > 0.0 && device_pixel_ratio.is_finite() {
            self.device_pixel_ratio = device_pixel_ratio;
        } else {
            log::warn!("WaveformWidget: ignoring device pixel ratio {}", device_pixel_ratio);
        }
    }

    /// Surface resized to `width` x `height` physical pixels
    pub fn resize_gl(&mut self, width: u32, height: u32) {
        let dpr = self.device_pixel_ratio;
        let width = (width as f32 / dpr).round();
        let height = (height as f32 / dpr).round();
        let viewport = Viewport::new(width, height, dpr);

        if let Some(engine) = self.engine.as_mut() {
            engine.resize(viewport);
        }
        self.view.resize(width, height, dpr);
    }

    pub fn wheel_event(&self) -> EventDisposition {
        EventDisposition::ForwardToParent
    }

    pub fn leave_event(&self) -> EventDisposition {
        EventDisposition::ForwardToParent
    }
}

impl<B: RenderBackend> Drop for WaveformWidget<B> {
    fn drop(&mut self) {
        let Some(mut engine) = self.engine.take() else {
            return;
        };
        match CurrentContext::acquire(&mut self.backend) {
            Ok(mut context) => {
                engine.release(&mut *context);
                drop(engine);
            }
            Err(e) => {
                log::error!(
                    "WaveformWidget {}: cannot acquire GPU context for teardown: {}",
                    self.view.group(),
                    e
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mesh_rendergraph::{DrawListBackend, NodeKind, SurfaceProfile};

    use crate::controls::{items, ConfigKey};
    use crate::track::tests::ramp_track;

    const GROUP: &str = "[Channel1]";

    fn settings(widget_type: WaveformWidgetType, options: WaveformOptions) -> WaveformSettings {
        let mut settings = WaveformSettings::default();
        settings.display.widget_type = widget_type;
        settings.display.high_detail = options.contains(WaveformOptions::HIGH_DETAIL);
        settings.display.split_stereo = options.contains(WaveformOptions::SPLIT_STEREO_SIGNAL);
        settings
    }

    fn widget_with(
        registry: &Arc<ControlRegistry>,
        widget_type: WaveformWidgetType,
        options: WaveformOptions,
        backend: DrawListBackend,
    ) -> WaveformWidget<DrawListBackend> {
        let _ = env_logger::builder().is_test(true).try_init();
        WaveformWidget::new(
            GROUP,
            registry,
            TrackSlot::new(),
            &settings(widget_type, options),
            &Skin::default(),
            backend,
        )
    }

    fn widget(
        widget_type: WaveformWidgetType,
        options: WaveformOptions,
        profile: SurfaceProfile,
    ) -> WaveformWidget<DrawListBackend> {
        let registry = Arc::new(ControlRegistry::new());
        widget_with(&registry, widget_type, options, DrawListBackend::new(profile))
    }

    fn names(widget: &WaveformWidget<DrawListBackend>) -> Vec<&'static str> {
        widget.engine().map(|engine| engine.tree().renderer_names()).unwrap_or_default()
    }

    /// Paint order the tree must produce
    fn expected_order(signal: Option<SignalKind>) -> Vec<&'static str> {
        let stem = cfg!(feature = "stem");
        let mut order = vec!["background", "end_of_track", "preroll", "mark_range"];
        let mut layers = Vec::new();
        if stem {
            layers.push("stem");
        }
        if let Some(kind) = signal {
            layers.push(kind.renderer_name());
        }
        layers.extend(["beat", "mark"]);
        order.extend(&layers);

        if signal.is_some_and(SignalKind::supports_slip) {
            order.extend(["slip_mode", "preroll"]);
            order.extend(&layers);
        }
        order
    }

    fn option_sets() -> [WaveformOptions; 4] {
        [
            WaveformOptions::empty(),
            WaveformOptions::SPLIT_STEREO_SIGNAL,
            WaveformOptions::HIGH_DETAIL,
            WaveformOptions::ALL_COMBINED,
        ]
    }

    #[test]
    fn test_tree_order_for_every_combination() {
        for widget_type in WaveformWidgetType::ALL {
            for options in option_sets() {
                for profile in [SurfaceProfile::Full, SurfaceProfile::Reduced] {
                    let widget = widget(widget_type, options, profile);
                    let signal = select_signal_renderer(widget_type, options, profile);
                    assert_eq!(widget.signal_kind(), signal);
                    assert_eq!(
                        names(&widget),
                        expected_order(signal),
                        "{widget_type} {options:?} {profile:?}"
                    );
                }
            }
        }
    }

    #[test]
    fn test_background_sits_outside_the_opacity_node() {
        let widget = widget(WaveformWidgetType::Rgb, WaveformOptions::empty(), SurfaceProfile::Full);
        let Some(engine) = widget.engine() else {
            panic!("engine missing");
        };
        let tree = engine.tree();
        let children = tree.children(tree.root());
        assert_eq!(children.len(), 2);
        assert_eq!(children[1], widget.opacity_node());
        assert!(matches!(tree.kind(children[1]), Some(NodeKind::Opacity { .. })));
        assert_eq!(tree.renderer(children[0]).map(|r| r.name()), Some("background"));
    }

    #[test]
    fn test_slip_duplication_doubles_position_layers() {
        let count = |widget: &WaveformWidget<DrawListBackend>, name: &str| {
            names(widget).iter().filter(|n| **n == name).count()
        };

        // Simple has no slip support
        let plain = widget(WaveformWidgetType::Simple, WaveformOptions::empty(), SurfaceProfile::Full);
        let slip = widget(WaveformWidgetType::Rgb, WaveformOptions::empty(), SurfaceProfile::Full);

        let overlays = |widget: &WaveformWidget<DrawListBackend>| {
            let Some(engine) = widget.engine() else {
                return 0;
            };
            engine.tree().children(widget.opacity_node()).len()
        };
        // end_of_track and mark_range are shared; the per-source layers double
        let shared = 2;
        let per_source = overlays(&plain) - shared;
        assert_eq!(overlays(&slip), shared + 2 * per_source + 1);

        assert_eq!(count(&plain, "slip_mode"), 0);
        assert_eq!(count(&slip, "slip_mode"), 1);
        for name in ["preroll", "beat", "mark"] {
            assert_eq!(count(&plain, name), 1, "{name}");
            assert_eq!(count(&slip, name), 2, "{name}");
        }
    }

    #[test]
    fn test_high_detail_follows_surface_profile() {
        let hd = WaveformOptions::HIGH_DETAIL;
        let full = widget(WaveformWidgetType::Rgb, hd, SurfaceProfile::Full);
        let reduced = widget(WaveformWidgetType::Rgb, hd, SurfaceProfile::Reduced);

        assert!(names(&full).contains(&"textured_rgb"));
        assert!(!names(&full).contains(&"rgb"));
        assert!(names(&reduced).contains(&"rgb"));
        assert!(!names(&reduced).contains(&"textured_rgb"));
    }

    #[test]
    fn test_empty_type_has_overlays_only() {
        let widget = widget(WaveformWidgetType::Empty, WaveformOptions::empty(), SurfaceProfile::Full);
        assert_eq!(widget.signal_kind(), None);
        assert!(!names(&widget).contains(&"slip_mode"));
        assert!(widget.init_success());
    }

    #[test]
    fn test_culled_subtree_still_preprocesses() {
        let mut widget = widget(WaveformWidgetType::Rgb, WaveformOptions::empty(), SurfaceProfile::Full);
        widget.resize_renderer(400, 200, 2.0);
        widget.resize_gl(400, 200);
        let renderers = names(&widget).len();

        // No track loaded: background only
        let stats = widget.paint_gl();
        assert_eq!(stats.culled_subtrees, 1);
        assert_eq!(stats.renderers_preprocessed, renderers);
        assert_eq!(stats.renderers_painted, 1);
        assert_eq!(stats.draw_calls, 1, "only the background draws");
        assert_eq!(widget.backend().last_frame().draw_count(), 1);
    }

    #[test]
    fn test_loaded_track_draws_overlays() {
        let registry = Arc::new(ControlRegistry::new());
        let mut widget = widget_with(
            &registry,
            WaveformWidgetType::Rgb,
            WaveformOptions::empty(),
            DrawListBackend::new(SurfaceProfile::Full),
        );
        widget.resize_gl(200, 100);
        widget.view().track().load(ramp_track(1000, 10));
        registry.set(&ConfigKey::new(GROUP, items::PLAY_POSITION), 0.5);

        let stats = widget.paint_gl();
        assert_eq!(stats.culled_subtrees, 0);
        assert!(stats.draw_calls > 1);
        assert_eq!(stats.renderers_painted, names(&widget).len());
        assert_eq!(widget.render(), Duration::ZERO);
    }

    #[test]
    fn test_resize_is_idempotent() {
        let mut widget = widget(WaveformWidgetType::Rgb, WaveformOptions::empty(), SurfaceProfile::Full);
        widget.resize_renderer(801, 240, 2.0);
        widget.resize_gl(801, 240);
        let first = widget.engine().map(|engine| engine.viewport());
        let length = widget.view().length();

        widget.resize_gl(801, 240);
        assert_eq!(widget.engine().map(|engine| engine.viewport()), first);
        assert_eq!(widget.view().length(), length);
        // 801 / 2 rounds to 401 device-independent pixels
        assert_eq!(length, 401.0);
        assert_eq!(widget.view().breadth(), 120.0);
    }

    #[test]
    fn test_allocation_failure_degrades_gracefully() {
        // Room for the background only
        let backend = DrawListBackend::new(SurfaceProfile::Full).with_vertex_budget(6);
        let registry = Arc::new(ControlRegistry::new());
        let mut widget =
            widget_with(&registry, WaveformWidgetType::Rgb, WaveformOptions::empty(), backend);
        assert!(!widget.init_success());

        widget.resize_gl(200, 100);
        let stats = widget.paint_gl();
        assert_eq!(stats.renderers_preprocessed, 1);
        assert_eq!(stats.draw_calls, 1);
    }

    #[test]
    fn test_context_calls_are_balanced() {
        let mut widget = widget(WaveformWidgetType::Rgb, WaveformOptions::empty(), SurfaceProfile::Full);
        widget.resize_gl(200, 100);
        widget.paint_gl();
        widget.render();

        let (acquired, released) = widget.backend().context_calls();
        assert_eq!(acquired, 3, "init and two frames");
        assert_eq!(acquired, released);
        assert!(!widget.backend().is_current());
    }

    #[test]
    fn test_retained_handles() {
        let mut widget = widget(WaveformWidgetType::Rgb, WaveformOptions::empty(), SurfaceProfile::Full);
        assert_eq!(widget.mark_range().map(|r| r.ranges().len()), Some(1));
        let mark = widget.mark().map(|m| m.source());
        assert_eq!(mark, Some(PositionSource::Play));
    }

    #[test]
    fn test_events_forward_and_vars() {
        let widget = widget(WaveformWidgetType::Rgb, WaveformOptions::empty(), SurfaceProfile::Reduced);
        assert_eq!(widget.wheel_event(), EventDisposition::ForwardToParent);
        assert_eq!(widget.leave_event(), EventDisposition::ForwardToParent);
        assert_eq!(
            widget.supported_options(WaveformWidgetType::Rgb),
            WaveformOptions::SPLIT_STEREO_SIGNAL
        );

        let vars = WaveformWidget::<DrawListBackend>::vars();
        assert!(vars.use_gl && vars.use_gles && vars.use_glsl);
        assert_eq!(vars.category, WidgetCategory::AllShader);
    }
}
