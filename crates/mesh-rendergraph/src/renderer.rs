//! Renderer trait
//!
//! A renderer draws one visual layer. It is owned by exactly one leaf node
//! of the tree and is driven by the [`Engine`](crate::Engine):
//!
//! 1. `init` once, before the first frame (allocates GPU resources)
//! 2. `resize` whenever the viewport changes
//! 3. per frame: `preprocess` (CPU-side updates) then `paint` (draw calls)
//! 4. `release` during teardown, with the GPU context current
//!
//! `C` is the per-frame context handed to every renderer (playback
//! snapshot, zoom, track data, ...). Renderers read it, they never keep it.

use std::any::Any;

use crate::backend::GpuResources;
use crate::error::RenderError;
use crate::painter::Painter;
use crate::viewport::Viewport;

/// Upcast helper so nodes can hand out typed access to their renderer
pub trait AsAny: Any {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// A stateful drawing unit for one visual layer
pub trait Renderer<C>: AsAny {
    /// Short name used in logs and diagnostics
    fn name(&self) -> &'static str;

    /// Allocate GPU resources.
    ///
    /// An error makes this renderer a no-op for its lifetime; siblings are
    /// unaffected.
    fn init(&mut self, _gpu: &mut dyn GpuResources) -> Result<(), RenderError> {
        Ok(())
    }

    /// Viewport changed. Must be idempotent for identical viewports.
    fn resize(&mut self, _viewport: Viewport) {}

    /// Update CPU-side state (geometry, timers) without drawing.
    fn preprocess(&mut self, _context: &C) {}

    /// Issue draw calls. Must be a no-op when preconditions are unmet.
    fn paint(&mut self, context: &C, painter: &mut Painter<'_>);

    /// Release GPU resources. Called once during teardown.
    fn release(&mut self, _gpu: &mut dyn GpuResources) {}
}
