//! Render graph for layered GPU views
//!
//! This crate provides the scene-graph core used by mesh's waveform views:
//!
//! - **Node arena**: an owned tree of group, opacity and renderer nodes,
//!   addressed by stable [`NodeId`] handles
//! - **Renderer trait**: stateful drawing units with an
//!   init / resize / preprocess / paint lifecycle
//! - **Engine**: drives the two-phase frame protocol (all preprocessing
//!   finishes before any draw call) with opacity-gated subtree culling
//! - **Backend seam**: [`RenderBackend`] abstracts the GPU context; the
//!   [`DrawListBackend`] records frames for submission by a host pipeline
//!
//! # Frame protocol
//!
//! ```text
//! Uninitialized ──initialize()──► Ready ──preprocess()──► Preprocessed ──render()──► Ready
//! ```
//!
//! # Usage
//!
//! ```ignore
//! let mut tree = NodeTree::new();
//! let root = tree.root();
//! let background = tree.create_renderer(Box::new(Background::default()));
//! tree.append_child_node(root, background);
//!
//! let mut engine = Engine::new(tree);
//! engine.initialize(&mut backend);
//! engine.resize(Viewport::new(800.0, 120.0, 2.0));
//!
//! // Every frame:
//! engine.preprocess(&frame);
//! let stats = engine.render(&frame, &mut backend);
//! ```

mod backend;
mod engine;
mod error;
mod node;
mod painter;
mod renderer;
mod viewport;

pub use backend::{
    CurrentContext, DrawCall, DrawCommand, DrawList, DrawListBackend, GeometryId, GpuResources,
    RenderBackend, SurfaceProfile,
};
pub use engine::{Engine, FrameState, FrameStats};
pub use error::{BackendError, RenderError};
pub use node::{NodeId, NodeKind, NodeTree, RendererHandle, RendererStatus};
pub use painter::{BlendMode, GeometryBuilder, GpuVertex, Painter, Vertex};
pub use renderer::{AsAny, Renderer};
pub use viewport::Viewport;
