//! Render engine: frame protocol over a [`NodeTree`]
//!
//! Per frame the engine runs two strictly ordered phases:
//!
//! 1. **preprocess**: every live renderer updates CPU-side state. This
//!    includes renderers under culled opacity nodes, so their timers and
//!    geometry are current if the subtree is re-enabled next frame.
//! 2. **render**: renderers draw in paint order. An opacity node with
//!    opacity 0 skips the draw calls of its entire subtree.
//!
//! No renderer is painted before every renderer has been preprocessed.

use crate::backend::{GpuResources, RenderBackend};
use crate::node::{NodeId, NodeKind, NodeTree, RendererStatus};
use crate::painter::Painter;
use crate::viewport::Viewport;

/// Where the engine is in its lifecycle / current frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameState {
    /// Renderers have not been initialized yet
    Uninitialized,
    /// Idle between frames
    Ready,
    /// Preprocess phase of the current frame ran; render may begin
    Preprocessing,
    /// Draw calls are being issued
    Rendering,
}

/// Counters for one rendered frame
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// Draw calls submitted to the backend
    pub draw_calls: usize,
    /// Opacity subtrees skipped because their opacity was 0
    pub culled_subtrees: usize,
    /// Renderers that ran `preprocess` for this frame
    pub renderers_preprocessed: usize,
    /// Renderers that ran `paint` for this frame
    pub renderers_painted: usize,
}

/// Owns the node tree and drives init / resize / preprocess / render
pub struct Engine<C> {
    tree: NodeTree<C>,
    viewport: Viewport,
    state: FrameState,
    preprocessed: usize,
}

impl<C: 'static> Engine<C> {
    /// Take exclusive ownership of an assembled tree
    pub fn new(tree: NodeTree<C>) -> Self {
        Self {
            tree,
            viewport: Viewport::default(),
            state: FrameState::Uninitialized,
            preprocessed: 0,
        }
    }

    pub fn tree(&self) -> &NodeTree<C> {
        &self.tree
    }

    /// Mutable tree access (opacity toggling, typed renderer handles)
    pub fn tree_mut(&mut self) -> &mut NodeTree<C> {
        &mut self.tree
    }

    pub fn state(&self) -> FrameState {
        self.state
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// Initialize every renderer, best-effort
    ///
    /// Returns `true` only if all renderers initialized. A failing renderer
    /// is logged and disabled; its siblings are still initialized.
    pub fn initialize(&mut self, gpu: &mut dyn GpuResources) -> bool {
        if self.state != FrameState::Uninitialized {
            debug_assert!(false, "Engine::initialize called twice");
            log::warn!("Engine: initialize called twice, ignoring");
            return self.all_ready();
        }

        let mut all_ok = true;
        for id in self.tree.renderer_nodes() {
            if let Some(NodeKind::Renderer { renderer, status }) = self.tree.kind_mut(id) {
                match renderer.init(gpu) {
                    Ok(()) => *status = RendererStatus::Ready,
                    Err(e) => {
                        log::error!("Engine: renderer '{}' failed to initialize: {}", renderer.name(), e);
                        *status = RendererStatus::Failed;
                        all_ok = false;
                    }
                }
            }
        }

        self.state = FrameState::Ready;
        log::debug!(
            "Engine: initialized {} renderers (all ok: {})",
            self.tree.renderer_nodes().len(),
            all_ok
        );
        all_ok
    }

    fn all_ready(&self) -> bool {
        self.tree
            .renderer_nodes()
            .into_iter()
            .all(|id| self.tree.renderer_status(id) == Some(RendererStatus::Ready))
    }

    /// Propagate a new viewport to every renderer
    pub fn resize(&mut self, viewport: Viewport) {
        self.viewport = viewport;
        for id in self.tree.renderer_nodes() {
            if let Some(NodeKind::Renderer { renderer, status }) = self.tree.kind_mut(id) {
                if *status != RendererStatus::Failed {
                    renderer.resize(viewport);
                }
            }
        }
    }

    /// Run the preprocess phase for every live renderer
    ///
    /// Culled subtrees are preprocessed too.
    pub fn preprocess(&mut self, context: &C) {
        debug_assert!(
            self.state != FrameState::Rendering,
            "preprocess while rendering"
        );

        let mut count = 0;
        for id in self.tree.renderer_nodes() {
            if let Some(NodeKind::Renderer { renderer, status }) = self.tree.kind_mut(id) {
                if *status == RendererStatus::Ready {
                    renderer.preprocess(context);
                    count += 1;
                }
            }
        }

        self.preprocessed = count;
        if self.state != FrameState::Uninitialized {
            self.state = FrameState::Preprocessing;
        }
    }

    /// Recompute the per-frame culled flag of every opacity node
    fn update_culling(&mut self) {
        for id in self.tree.traverse() {
            if let Some(NodeKind::Opacity { opacity, culled }) = self.tree.kind_mut(id) {
                *culled = *opacity <= 0.0;
            }
        }
    }

    /// Renderer nodes to paint this frame with their inherited opacity
    fn paint_list(&self) -> (Vec<(NodeId, f32)>, usize) {
        let mut list = Vec::new();
        let mut culled_subtrees = 0;
        let mut stack = vec![(self.tree.root(), 1.0_f32)];

        while let Some((id, inherited)) = stack.pop() {
            let opacity = match self.tree.kind(id) {
                Some(NodeKind::Opacity { culled: true, .. }) => {
                    culled_subtrees += 1;
                    continue;
                }
                Some(NodeKind::Opacity { opacity, .. }) => inherited * opacity,
                Some(NodeKind::Renderer {
                    status: RendererStatus::Ready,
                    ..
                }) => {
                    list.push((id, inherited));
                    inherited
                }
                _ => inherited,
            };
            stack.extend(self.tree.children(id).iter().rev().map(|&child| (child, opacity)));
        }

        (list, culled_subtrees)
    }

    /// Issue draw calls for every non-culled renderer in paint order
    pub fn render(&mut self, context: &C, backend: &mut dyn RenderBackend) -> FrameStats {
        match self.state {
            FrameState::Preprocessing => {}
            FrameState::Uninitialized => {
                debug_assert!(false, "render before initialize");
                log::warn!("Engine: render before initialize");
            }
            _ => {
                debug_assert!(false, "render without preprocess");
                log::warn!("Engine: render without preprocess, preprocessing now");
                self.preprocess(context);
            }
        }

        if self.state != FrameState::Uninitialized {
            self.state = FrameState::Rendering;
        }
        self.update_culling();
        let (paint_list, culled_subtrees) = self.paint_list();

        backend.begin_frame(self.viewport);
        let mut painter = Painter::new(backend, self.viewport);
        for &(id, opacity) in &paint_list {
            if let Some(renderer) = self.tree.renderer_mut(id) {
                painter.opacity = opacity;
                renderer.paint(context, &mut painter);
            }
        }
        let draw_calls = painter.draw_calls();
        drop(painter);
        backend.end_frame();

        if self.state != FrameState::Uninitialized {
            self.state = FrameState::Ready;
        }

        FrameStats {
            draw_calls,
            culled_subtrees,
            renderers_preprocessed: std::mem::take(&mut self.preprocessed),
            renderers_painted: paint_list.len(),
        }
    }

    /// Release every renderer's GPU resources (teardown, context current)
    pub fn release(&mut self, gpu: &mut dyn GpuResources) {
        for id in self.tree.renderer_nodes() {
            if let Some(NodeKind::Renderer { renderer, status }) = self.tree.kind_mut(id) {
                if *status == RendererStatus::Ready {
                    renderer.release(gpu);
                }
                *status = RendererStatus::Failed;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{CurrentContext, DrawListBackend, GeometryId, SurfaceProfile};
    use crate::error::RenderError;
    use crate::painter::{BlendMode, GeometryBuilder};
    use crate::renderer::Renderer;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Shared log of lifecycle calls, in order
    type Journal = Rc<RefCell<Vec<String>>>;

    struct Probe {
        name: &'static str,
        journal: Journal,
        capacity: usize,
        geometry: Option<GeometryId>,
        builder: GeometryBuilder,
        viewport: Viewport,
    }

    impl Probe {
        fn boxed(name: &'static str, journal: &Journal) -> Box<dyn Renderer<u32>> {
            Box::new(Self {
                name,
                journal: Rc::clone(journal),
                capacity: 6,
                geometry: None,
                builder: GeometryBuilder::new(),
                viewport: Viewport::default(),
            })
        }
    }

    impl Renderer<u32> for Probe {
        fn name(&self) -> &'static str {
            self.name
        }

        fn init(&mut self, gpu: &mut dyn GpuResources) -> Result<(), RenderError> {
            self.geometry = Some(gpu.create_geometry(self.name, self.capacity)?);
            Ok(())
        }

        fn resize(&mut self, viewport: Viewport) {
            self.viewport = viewport;
        }

        fn preprocess(&mut self, frame: &u32) {
            self.journal.borrow_mut().push(format!("pre:{}:{}", self.name, frame));
            self.builder.clear();
            self.builder
                .push_rect(0.0, 0.0, self.viewport.width, self.viewport.height, [1.0; 4]);
        }

        fn paint(&mut self, frame: &u32, painter: &mut Painter<'_>) {
            self.journal.borrow_mut().push(format!("paint:{}:{}", self.name, frame));
            if let Some(geometry) = self.geometry {
                painter.draw(geometry, BlendMode::Alpha, self.builder.vertices());
            }
        }
    }

    struct Fixture {
        engine: Engine<u32>,
        backend: DrawListBackend,
        journal: Journal,
        opacity: NodeId,
    }

    /// root: [bg, opacity: [a, b]]
    fn fixture(backend: DrawListBackend) -> Fixture {
        let _ = env_logger::builder().is_test(true).try_init();
        let journal: Journal = Rc::default();
        let mut tree = NodeTree::new();
        let root = tree.root();
        tree.append_renderer(root, Probe::boxed("bg", &journal));
        let opacity = tree.create_opacity(1.0);
        tree.append_renderer(opacity, Probe::boxed("a", &journal));
        tree.append_renderer(opacity, Probe::boxed("b", &journal));
        tree.append_child_node(root, opacity);

        Fixture {
            engine: Engine::new(tree),
            backend,
            journal,
            opacity,
        }
    }

    fn frame(f: &mut Fixture, n: u32) -> FrameStats {
        let mut ctx = CurrentContext::acquire(&mut f.backend).unwrap();
        f.engine.preprocess(&n);
        f.engine.render(&n, &mut *ctx)
    }

    fn init(f: &mut Fixture) -> bool {
        let mut ctx = CurrentContext::acquire(&mut f.backend).unwrap();
        let ok = f.engine.initialize(&mut *ctx);
        drop(ctx);
        f.engine.resize(Viewport::new(100.0, 40.0, 1.0));
        ok
    }

    #[test]
    fn test_preprocess_completes_before_any_paint() {
        let mut f = fixture(DrawListBackend::new(SurfaceProfile::Full));
        assert!(init(&mut f));
        frame(&mut f, 1);

        let journal = f.journal.borrow();
        let first_paint = journal.iter().position(|e| e.starts_with("paint")).unwrap();
        let last_pre = journal.iter().rposition(|e| e.starts_with("pre")).unwrap();
        assert!(last_pre < first_paint, "all preprocess calls precede paint: {journal:?}");
        assert_eq!(
            &journal[first_paint..],
            &["paint:bg:1", "paint:a:1", "paint:b:1"],
            "paint follows tree order"
        );
    }

    #[test]
    fn test_state_machine() {
        let mut f = fixture(DrawListBackend::new(SurfaceProfile::Full));
        assert_eq!(f.engine.state(), FrameState::Uninitialized);
        init(&mut f);
        assert_eq!(f.engine.state(), FrameState::Ready);

        let mut ctx = CurrentContext::acquire(&mut f.backend).unwrap();
        f.engine.preprocess(&7);
        assert_eq!(f.engine.state(), FrameState::Preprocessing);
        f.engine.render(&7, &mut *ctx);
        assert_eq!(f.engine.state(), FrameState::Ready);
    }

    #[test]
    fn test_zero_opacity_culls_draws_but_not_preprocess() {
        let mut f = fixture(DrawListBackend::new(SurfaceProfile::Full));
        init(&mut f);

        let visible = frame(&mut f, 1);
        assert_eq!(visible.draw_calls, 3);
        assert_eq!(visible.culled_subtrees, 0);

        f.engine.tree_mut().set_opacity(f.opacity, 0.0);
        f.journal.borrow_mut().clear();
        let culled = frame(&mut f, 2);

        assert_eq!(culled.draw_calls, 1, "only the background draws");
        assert_eq!(culled.culled_subtrees, 1);
        assert_eq!(culled.renderers_preprocessed, 3, "culled subtree still preprocessed");
        assert!(f.engine.tree().is_culled(f.opacity));
        assert!(f.journal.borrow().contains(&"pre:a:2".to_string()));
        assert!(!f.journal.borrow().contains(&"paint:a:2".to_string()));

        // Re-enabled: drawn again from already-current state
        f.engine.tree_mut().set_opacity(f.opacity, 1.0);
        assert_eq!(frame(&mut f, 3).draw_calls, 3);
    }

    #[test]
    fn test_partial_opacity_scales_alpha() {
        let mut f = fixture(DrawListBackend::new(SurfaceProfile::Full));
        init(&mut f);
        f.engine.tree_mut().set_opacity(f.opacity, 0.5);
        frame(&mut f, 1);

        let list = f.backend.last_frame();
        let bg = &list.vertices[list.commands[0].vertices.start as usize];
        let a = &list.vertices[list.commands[1].vertices.start as usize];
        assert_eq!(bg.color[3], 1.0);
        assert_eq!(a.color[3], 0.5);
    }

    #[test]
    fn test_failed_renderer_does_not_abort_siblings() {
        // Room for exactly one renderer's geometry
        let mut f = fixture(DrawListBackend::new(SurfaceProfile::Full).with_vertex_budget(6));
        assert!(!init(&mut f), "overall init reports failure");

        let stats = frame(&mut f, 1);
        assert_eq!(stats.draw_calls, 1, "the renderer that initialized still draws");
        assert_eq!(stats.renderers_preprocessed, 1, "failed renderers are no-ops");

        let tree = f.engine.tree();
        let statuses: Vec<_> = tree
            .renderer_nodes()
            .into_iter()
            .filter_map(|id| tree.renderer_status(id))
            .collect();
        assert_eq!(
            statuses,
            vec![RendererStatus::Ready, RendererStatus::Failed, RendererStatus::Failed]
        );
    }

    #[test]
    fn test_resize_is_idempotent() {
        let mut f = fixture(DrawListBackend::new(SurfaceProfile::Full));
        init(&mut f);

        let viewport = Viewport::new(320.0, 80.0, 2.0);
        f.engine.resize(viewport);
        frame(&mut f, 1);
        let first = f.backend.last_frame();
        f.engine.resize(viewport);
        frame(&mut f, 1);
        let second = f.backend.last_frame();

        assert_eq!(f.engine.viewport(), viewport);
        assert_eq!(first.vertices, second.vertices);
        assert_eq!(first.commands, second.commands);
    }

    #[test]
    fn test_release_disables_renderers() {
        let mut f = fixture(DrawListBackend::new(SurfaceProfile::Full));
        init(&mut f);
        {
            let mut ctx = CurrentContext::acquire(&mut f.backend).unwrap();
            f.engine.release(&mut *ctx);
        }
        assert_eq!(frame(&mut f, 1).draw_calls, 0);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "render without preprocess")]
    fn test_render_without_preprocess_asserts() {
        let mut f = fixture(DrawListBackend::new(SurfaceProfile::Full));
        init(&mut f);
        let mut ctx = CurrentContext::acquire(&mut f.backend).unwrap();
        f.engine.render(&1, &mut *ctx);
    }
}
