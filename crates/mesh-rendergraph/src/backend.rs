//! GPU backend seam
//!
//! The render graph never talks to a graphics API directly. A backend owns
//! the GPU context and exposes:
//!
//! - **Context scoping**: `make_current` / `done_current`, wrapped by the
//!   [`CurrentContext`] guard so every GPU-touching operation is bracketed
//! - **Resources**: per-renderer geometry allocations ([`GpuResources`])
//! - **Submission**: `begin_frame` / `draw` / `end_frame`
//!
//! [`DrawListBackend`] is the host-agnostic implementation: it records each
//! frame into a [`DrawList`] that a host pipeline (see mesh-waveform's
//! iced shader pipeline) uploads and draws.

use std::collections::HashMap;
use std::ops::{Deref, DerefMut, Range};
use std::sync::Arc;

use crate::error::BackendError;
use crate::painter::{BlendMode, GpuVertex};
use crate::viewport::Viewport;

/// Handle to a geometry allocation owned by one renderer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GeometryId(u32);

impl GeometryId {
    /// Raw index (diagnostics only)
    pub fn index(self) -> u32 {
        self.0
    }
}

/// Capability class of the target surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SurfaceProfile {
    /// Desktop-class GPU API (Vulkan, Metal, DX12, desktop GL)
    #[default]
    Full,
    /// Reduced-capability profile (GLES / WebGL class)
    Reduced,
}

impl SurfaceProfile {
    /// Whether high-detail (per physical pixel) waveform rendering is offered
    pub fn supports_high_detail(self) -> bool {
        matches!(self, SurfaceProfile::Full)
    }
}

/// One draw call: a triangle list in normalized device coordinates
#[derive(Debug, Clone, Copy)]
pub struct DrawCall<'a> {
    pub geometry: GeometryId,
    pub blend: BlendMode,
    pub vertices: &'a [GpuVertex],
}

/// GPU resource allocation, available while the context is current
pub trait GpuResources {
    /// Reserve a geometry buffer with room for `capacity` vertices
    fn create_geometry(&mut self, label: &str, capacity: usize)
        -> Result<GeometryId, BackendError>;

    /// Free a geometry buffer. Unknown ids are ignored.
    fn release_geometry(&mut self, geometry: GeometryId);
}

/// A GPU context plus frame submission
pub trait RenderBackend: GpuResources {
    /// Capability class of the surface this backend draws into
    fn profile(&self) -> SurfaceProfile;

    /// Make the context current on this thread
    fn make_current(&mut self) -> Result<(), BackendError>;

    /// Release the context acquired by `make_current`
    fn done_current(&mut self);

    /// Whether the context is currently held
    fn is_current(&self) -> bool;

    fn begin_frame(&mut self, viewport: Viewport);

    fn draw(&mut self, call: DrawCall<'_>);

    fn end_frame(&mut self);
}

/// Scoped ownership of the GPU context
///
/// Acquired with [`CurrentContext::acquire`]; the context is released when
/// the guard is dropped.
pub struct CurrentContext<'a, B: RenderBackend + ?Sized> {
    backend: &'a mut B,
}

impl<'a, B: RenderBackend + ?Sized> CurrentContext<'a, B> {
    pub fn acquire(backend: &'a mut B) -> Result<Self, BackendError> {
        backend.make_current()?;
        Ok(Self { backend })
    }
}

impl<B: RenderBackend + ?Sized> Deref for CurrentContext<'_, B> {
    type Target = B;

    fn deref(&self) -> &B {
        self.backend
    }
}

impl<B: RenderBackend + ?Sized> DerefMut for CurrentContext<'_, B> {
    fn deref_mut(&mut self) -> &mut B {
        self.backend
    }
}

impl<B: RenderBackend + ?Sized> Drop for CurrentContext<'_, B> {
    fn drop(&mut self) {
        self.backend.done_current();
    }
}

/// A recorded draw call referencing a range of [`DrawList::vertices`]
#[derive(Debug, Clone, PartialEq)]
pub struct DrawCommand {
    pub geometry: GeometryId,
    pub blend: BlendMode,
    pub vertices: Range<u32>,
}

/// Everything drawn during one frame, in paint order
#[derive(Debug, Clone, Default)]
pub struct DrawList {
    pub viewport: Viewport,
    pub vertices: Vec<GpuVertex>,
    pub commands: Vec<DrawCommand>,
}

impl DrawList {
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn draw_count(&self) -> usize {
        self.commands.len()
    }
}

#[derive(Debug)]
struct GeometryInfo {
    label: String,
    capacity: usize,
}

/// Backend that records frames into [`DrawList`]s
///
/// An optional vertex budget bounds the total geometry reservation; once it
/// is exhausted `create_geometry` fails with [`BackendError::OutOfMemory`],
/// the same way a real device reports allocation failure.
#[derive(Debug)]
pub struct DrawListBackend {
    profile: SurfaceProfile,
    current: bool,
    geometries: HashMap<GeometryId, GeometryInfo>,
    next_geometry: u32,
    vertex_budget: Option<usize>,
    reserved_vertices: usize,
    recording: Option<DrawList>,
    last_frame: Arc<DrawList>,
    acquisitions: usize,
    releases: usize,
}

impl DrawListBackend {
    pub fn new(profile: SurfaceProfile) -> Self {
        Self {
            profile,
            current: false,
            geometries: HashMap::new(),
            next_geometry: 0,
            vertex_budget: None,
            reserved_vertices: 0,
            recording: None,
            last_frame: Arc::new(DrawList::default()),
            acquisitions: 0,
            releases: 0,
        }
    }

    /// Limit the total number of vertices that may be reserved
    pub fn with_vertex_budget(mut self, budget: usize) -> Self {
        self.vertex_budget = Some(budget);
        self
    }

    /// The most recently completed frame
    pub fn last_frame(&self) -> Arc<DrawList> {
        Arc::clone(&self.last_frame)
    }

    /// Number of live geometry allocations
    pub fn geometry_count(&self) -> usize {
        self.geometries.len()
    }

    /// Total `make_current` successes and `done_current` calls
    pub fn context_calls(&self) -> (usize, usize) {
        (self.acquisitions, self.releases)
    }

    fn ensure_current(&self, operation: &str) {
        if !self.current {
            debug_assert!(self.current, "{operation} without a current GPU context");
            log::warn!("DrawListBackend: {} without a current GPU context", operation);
        }
    }
}

impl GpuResources for DrawListBackend {
    fn create_geometry(
        &mut self,
        label: &str,
        capacity: usize,
    ) -> Result<GeometryId, BackendError> {
        self.ensure_current("create_geometry");

        if let Some(budget) = self.vertex_budget {
            if self.reserved_vertices + capacity > budget {
                return Err(BackendError::OutOfMemory {
                    label: label.to_string(),
                    requested: capacity,
                });
            }
        }

        let id = GeometryId(self.next_geometry);
        self.next_geometry += 1;
        self.reserved_vertices += capacity;
        self.geometries.insert(
            id,
            GeometryInfo {
                label: label.to_string(),
                capacity,
            },
        );
        log::debug!("DrawListBackend: allocated {:?} '{}' ({} vertices)", id, label, capacity);
        Ok(id)
    }

    fn release_geometry(&mut self, geometry: GeometryId) {
        self.ensure_current("release_geometry");
        if let Some(info) = self.geometries.remove(&geometry) {
            self.reserved_vertices = self.reserved_vertices.saturating_sub(info.capacity);
            log::debug!("DrawListBackend: released {:?} '{}'", geometry, info.label);
        }
    }
}

impl RenderBackend for DrawListBackend {
    fn profile(&self) -> SurfaceProfile {
        self.profile
    }

    fn make_current(&mut self) -> Result<(), BackendError> {
        if self.current {
            return Err(BackendError::ContextAlreadyCurrent);
        }
        self.current = true;
        self.acquisitions += 1;
        Ok(())
    }

    fn done_current(&mut self) {
        self.current = false;
        self.releases += 1;
    }

    fn is_current(&self) -> bool {
        self.current
    }

    fn begin_frame(&mut self, viewport: Viewport) {
        self.ensure_current("begin_frame");
        self.recording = Some(DrawList {
            viewport,
            vertices: Vec::with_capacity(self.last_frame.vertices.len()),
            commands: Vec::with_capacity(self.last_frame.commands.len()),
        });
    }

    fn draw(&mut self, call: DrawCall<'_>) {
        self.ensure_current("draw");

        let Some(info) = self.geometries.get_mut(&call.geometry) else {
            log::warn!("DrawListBackend: draw with unknown geometry {:?}", call.geometry);
            return;
        };
        if call.vertices.len() > info.capacity {
            // Geometry buffers grow on demand, like a re-allocated VBO
            self.reserved_vertices += call.vertices.len() - info.capacity;
            info.capacity = call.vertices.len();
        }

        let Some(list) = self.recording.as_mut() else {
            log::warn!("DrawListBackend: draw outside begin_frame/end_frame");
            return;
        };
        let start = list.vertices.len() as u32;
        list.vertices.extend_from_slice(call.vertices);
        list.commands.push(DrawCommand {
            geometry: call.geometry,
            blend: call.blend,
            vertices: start..list.vertices.len() as u32,
        });
    }

    fn end_frame(&mut self) {
        if let Some(list) = self.recording.take() {
            self.last_frame = Arc::new(list);
        }
    }
}
