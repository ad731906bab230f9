//! Painter and geometry helpers
//!
//! Renderers build geometry in device-independent pixels with
//! [`GeometryBuilder`] (usually during `preprocess`) and hand it to the
//! [`Painter`] in `paint`. The painter converts to normalized device
//! coordinates, applies the inherited opacity and forwards one draw call
//! to the backend.

use crate::backend::{DrawCall, GeometryId, RenderBackend};
use crate::viewport::Viewport;

/// A vertex in device-independent pixels with a straight-alpha RGBA color
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vertex {
    pub x: f32,
    pub y: f32,
    pub color: [f32; 4],
}

/// Vertex layout uploaded to the GPU (normalized device coordinates)
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct GpuVertex {
    pub position: [f32; 2],
    pub color: [f32; 4],
}

/// How a draw call composes with what is already in the target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlendMode {
    /// Overwrite the target (backgrounds)
    Opaque,
    /// Standard source-alpha / one-minus-source-alpha blending
    Alpha,
}

/// Triangle-list builder in device-independent pixels
#[derive(Debug, Clone, Default)]
pub struct GeometryBuilder {
    vertices: Vec<Vertex>,
}

impl GeometryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            vertices: Vec::with_capacity(capacity),
        }
    }

    /// Drop all vertices, keeping the allocation
    pub fn clear(&mut self) {
        self.vertices.clear();
    }

    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Append one triangle
    pub fn push_triangle(&mut self, points: [(f32, f32); 3], color: [f32; 4]) {
        for (x, y) in points {
            self.vertices.push(Vertex { x, y, color });
        }
    }

    /// Append an axis-aligned rectangle as two triangles
    pub fn push_rect(&mut self, x0: f32, y0: f32, x1: f32, y1: f32, color: [f32; 4]) {
        self.push_quad([(x0, y0), (x1, y0), (x0, y1), (x1, y1)], [color; 4]);
    }

    /// Append a rectangle whose color goes from `from` at `x0` to `to` at `x1`
    pub fn push_rect_horizontal_gradient(
        &mut self,
        x0: f32,
        y0: f32,
        x1: f32,
        y1: f32,
        from: [f32; 4],
        to: [f32; 4],
    ) {
        self.push_quad([(x0, y0), (x1, y0), (x0, y1), (x1, y1)], [from, to, from, to]);
    }

    /// Append a rectangle whose color goes from `from` at `y0` to `to` at `y1`
    pub fn push_rect_vertical_gradient(
        &mut self,
        x0: f32,
        y0: f32,
        x1: f32,
        y1: f32,
        from: [f32; 4],
        to: [f32; 4],
    ) {
        self.push_quad([(x0, y0), (x1, y0), (x0, y1), (x1, y1)], [from, from, to, to]);
    }

    /// Append a quad given in strip order: top-left, top-right, bottom-left, bottom-right
    pub fn push_quad(&mut self, corners: [(f32, f32); 4], colors: [[f32; 4]; 4]) {
        let v = |i: usize| Vertex {
            x: corners[i].0,
            y: corners[i].1,
            color: colors[i],
        };
        self.vertices
            .extend_from_slice(&[v(0), v(1), v(2), v(1), v(3), v(2)]);
    }
}

/// Per-frame drawing surface handed to renderers
pub struct Painter<'a> {
    backend: &'a mut dyn RenderBackend,
    viewport: Viewport,
    pub(crate) opacity: f32,
    draw_calls: usize,
    scratch: Vec<GpuVertex>,
}

impl<'a> Painter<'a> {
    pub(crate) fn new(backend: &'a mut dyn RenderBackend, viewport: Viewport) -> Self {
        Self {
            backend,
            viewport,
            opacity: 1.0,
            draw_calls: 0,
            scratch: Vec::new(),
        }
    }

    /// Viewport of the current frame
    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// Opacity inherited from enclosing opacity nodes
    pub fn opacity(&self) -> f32 {
        self.opacity
    }

    /// Number of draw calls issued so far this frame
    pub fn draw_calls(&self) -> usize {
        self.draw_calls
    }

    /// Submit a triangle list for `geometry`
    ///
    /// Empty vertex lists are skipped without a draw call.
    pub fn draw(&mut self, geometry: GeometryId, blend: BlendMode, vertices: &[Vertex]) {
        if vertices.is_empty() || self.opacity <= 0.0 {
            return;
        }

        self.scratch.clear();
        let opacity = self.opacity;
        let viewport = self.viewport;
        self.scratch.extend(vertices.iter().map(|v| GpuVertex {
            position: viewport.to_ndc(v.x, v.y),
            color: [v.color[0], v.color[1], v.color[2], v.color[3] * opacity],
        }));

        self.backend.draw(DrawCall {
            geometry,
            blend,
            vertices: &self.scratch,
        });
        self.draw_calls += 1;
    }
}
