//! GPU pipeline for waveform rendering
//!
//! The render graph records each frame into a [`DrawList`] (vertices in
//! normalized device coordinates plus per-layer draw commands). This module
//! submits that list through iced's `shader` widget: the primitive uploads
//! the vertices into a per-widget vertex buffer and replays the commands
//! with the opaque or alpha-blended pipeline.
//!
//! The shader program never captures events, so wheel and leave events
//! reach the parent widget unchanged.

use std::collections::HashMap;
use std::sync::Arc;

use iced::mouse;
use iced::widget::shader;
use iced::{Element, Length, Rectangle};
use mesh_rendergraph::{BlendMode, DrawList, GpuVertex, SurfaceProfile};

/// Surface profile of a wgpu backend
///
/// The GL backend is the GLES / WebGL class surface, which gets no
/// high-detail rendering.
pub fn surface_profile(backend: wgpu::Backend) -> SurfaceProfile {
    match backend {
        wgpu::Backend::Gl => SurfaceProfile::Reduced,
        _ => SurfaceProfile::Full,
    }
}

/// Shader widget drawing one recorded waveform frame
///
/// `id` must be stable per waveform widget: it keys the GPU vertex buffer.
pub fn waveform_shader<'a, Message: 'a>(id: u64, frame: Arc<DrawList>) -> Element<'a, Message> {
    shader(WaveformProgram { id, frame })
        .width(Length::Fill)
        .height(Length::Fill)
        .into()
}

/// Shader program for one waveform frame
#[derive(Debug, Clone)]
pub(crate) struct WaveformProgram {
    /// Stable ID from the owning waveform widget
    pub id: u64,
    pub frame: Arc<DrawList>,
}

impl<Message> shader::Program<Message> for WaveformProgram {
    type State = ();
    type Primitive = WaveformPrimitive;

    fn draw(
        &self,
        _state: &Self::State,
        _cursor: mouse::Cursor,
        _bounds: Rectangle,
    ) -> Self::Primitive {
        WaveformPrimitive {
            id: self.id,
            frame: Arc::clone(&self.frame),
        }
    }
}

/// Primitive for waveform rendering, created by `WaveformProgram::draw()`
#[derive(Debug, Clone)]
pub struct WaveformPrimitive {
    id: u64,
    frame: Arc<DrawList>,
}

/// Per-widget GPU resources
struct PrimitiveResources {
    buffer: wgpu::Buffer,
    /// Buffer size in bytes
    capacity: u64,
    /// Widget bounds in physical pixels: [x, y, width, height]
    bounds: [f32; 4],
}

/// Vertex buffer size for `bytes` of vertex data
fn buffer_size(bytes: u64) -> u64 {
    bytes
        .max(std::mem::size_of::<GpuVertex>() as u64 * 64)
        .next_power_of_two()
}

fn create_vertex_buffer(device: &wgpu::Device, size: u64) -> wgpu::Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Waveform Vertex Buffer"),
        size,
        usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

/// The GPU pipeline for rendering waveforms
pub struct WaveformPipeline {
    opaque: wgpu::RenderPipeline,
    alpha: wgpu::RenderPipeline,
    /// Per-widget resources, keyed by stable widget ID
    primitive_resources: HashMap<u64, PrimitiveResources>,
}

impl WaveformPipeline {
    fn pipeline(&self, blend: BlendMode) -> &wgpu::RenderPipeline {
        match blend {
            BlendMode::Opaque => &self.opaque,
            BlendMode::Alpha => &self.alpha,
        }
    }
}

fn create_render_pipeline(
    device: &wgpu::Device,
    layout: &wgpu::PipelineLayout,
    shader: &wgpu::ShaderModule,
    format: wgpu::TextureFormat,
    label: &str,
    blend: wgpu::BlendState,
) -> wgpu::RenderPipeline {
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: shader,
            entry_point: Some("vs_main"),
            buffers: &[wgpu::VertexBufferLayout {
                array_stride: std::mem::size_of::<GpuVertex>() as u64,
                step_mode: wgpu::VertexStepMode::Vertex,
                attributes: &wgpu::vertex_attr_array![0 => Float32x2, 1 => Float32x4],
            }],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: shader,
            entry_point: Some("fs_main"),
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend: Some(blend),
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            ..Default::default()
        },
        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
        cache: None,
    })
}

impl shader::Pipeline for WaveformPipeline {
    fn new(device: &wgpu::Device, _queue: &wgpu::Queue, format: wgpu::TextureFormat) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Waveform Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("waveform.wgsl").into()),
        });

        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Waveform Pipeline Layout"),
            bind_group_layouts: &[],
            push_constant_ranges: &[],
        });

        Self {
            opaque: create_render_pipeline(
                device,
                &layout,
                &shader,
                format,
                "Waveform Opaque Pipeline",
                wgpu::BlendState::REPLACE,
            ),
            alpha: create_render_pipeline(
                device,
                &layout,
                &shader,
                format,
                "Waveform Alpha Pipeline",
                wgpu::BlendState::ALPHA_BLENDING,
            ),
            primitive_resources: HashMap::new(),
        }
    }
}

impl shader::Primitive for WaveformPrimitive {
    type Pipeline = WaveformPipeline;

    fn prepare(
        &self,
        pipeline: &mut Self::Pipeline,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        bounds: &Rectangle,
        viewport: &shader::Viewport,
    ) {
        let scale = viewport.scale_factor() as f32;
        let scale = if scale > 0.0 && scale.is_finite() { scale } else { 1.0 };
        let physical = [
            bounds.x * scale,
            bounds.y * scale,
            bounds.width * scale,
            bounds.height * scale,
        ];

        let bytes: &[u8] = bytemuck::cast_slice(&self.frame.vertices);
        let required = bytes.len() as u64;

        let resources = pipeline
            .primitive_resources
            .entry(self.id)
            .or_insert_with(|| {
                let capacity = buffer_size(required);
                PrimitiveResources {
                    buffer: create_vertex_buffer(device, capacity),
                    capacity,
                    bounds: physical,
                }
            });

        if required > resources.capacity {
            let capacity = buffer_size(required);
            log::debug!(
                "Waveform {}: growing vertex buffer to {} bytes",
                self.id,
                capacity
            );
            resources.buffer = create_vertex_buffer(device, capacity);
            resources.capacity = capacity;
        }
        resources.bounds = physical;

        if !bytes.is_empty() {
            queue.write_buffer(&resources.buffer, 0, bytes);
        }
    }

    fn render(
        &self,
        pipeline: &Self::Pipeline,
        encoder: &mut wgpu::CommandEncoder,
        target: &wgpu::TextureView,
        clip_bounds: &Rectangle<u32>,
    ) {
        let Some(resources) = pipeline.primitive_resources.get(&self.id) else {
            return;
        };
        let [x, y, width, height] = resources.bounds;
        if self.frame.is_empty() || width <= 0.0 || height <= 0.0 {
            return;
        }

        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Waveform Render Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        // NDC of the recorded frame spans the widget bounds
        pass.set_viewport(x, y, width, height, 0.0, 1.0);
        pass.set_scissor_rect(
            clip_bounds.x,
            clip_bounds.y,
            clip_bounds.width,
            clip_bounds.height,
        );
        pass.set_vertex_buffer(0, resources.buffer.slice(..));

        for command in &self.frame.commands {
            pass.set_pipeline(pipeline.pipeline(command.blend));
            pass.draw(command.vertices.clone(), 0..1);
        }
    }
}
