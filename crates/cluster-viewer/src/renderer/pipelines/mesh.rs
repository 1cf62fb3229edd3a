use wgpu::util::DeviceExt;

use crate::data::types::{FrameUniform, MeshGpu};
use objmesh::Vertex;

/// Default shader for the mesh pipeline. `MeshPipeline::new` takes the
/// source as a parameter so variants can be substituted (e.g. against a
/// fallback adapter in tests) without touching the pipeline code.
pub const MESH_SHADER: &str = include_str!("../../../shaders/mesh.wgsl");

/// Lambert-shaded textured-mesh pipeline: one frame-uniform bind group and
/// one per-mesh texture bind group over a 4-attribute interleaved vertex
/// layout (position, normal, texcoord, color).
pub struct MeshPipeline {
    pub pipeline: wgpu::RenderPipeline,
    pub texture_layout: wgpu::BindGroupLayout,
    frame_ubo: wgpu::Buffer,
    frame_bind: wgpu::BindGroup,
}

impl MeshPipeline {
    pub fn new(
        device: &wgpu::Device,
        color_fmt: wgpu::TextureFormat,
        depth_fmt: wgpu::TextureFormat,
        shader_src: &str,
    ) -> Self {
        // Group 0: per-frame view/projection uniforms.
        let frame_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Frame UBO Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: wgpu::BufferSize::new(
                        std::mem::size_of::<FrameUniform>() as u64,
                    ),
                },
                count: None,
            }],
        });

        // Group 1: per-mesh diffuse texture + sampler.
        let texture_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Mesh Texture Layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("shaders/mesh.wgsl"),
            source: wgpu::ShaderSource::Wgsl(shader_src.into()),
        });

        let frame_ubo = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Frame UBO"),
            contents: bytemuck::bytes_of(&FrameUniform {
                view: glam::Mat4::IDENTITY.to_cols_array_2d(),
                proj: glam::Mat4::IDENTITY.to_cols_array_2d(),
            }),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let frame_bind = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Frame UBO BindGroup"),
            layout: &frame_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: frame_ubo.as_entire_binding(),
            }],
        });

        // Interleaved vertex layout; must match `objmesh::Vertex`.
        let vbuf_layout = wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                // Position
                wgpu::VertexAttribute {
                    shader_location: 0,
                    offset: 0,
                    format: wgpu::VertexFormat::Float32x3,
                },
                // Normal
                wgpu::VertexAttribute {
                    shader_location: 1,
                    offset: 12,
                    format: wgpu::VertexFormat::Float32x3,
                },
                // Texcoord ((-1, -1) = untextured)
                wgpu::VertexAttribute {
                    shader_location: 2,
                    offset: 24,
                    format: wgpu::VertexFormat::Float32x2,
                },
                // Color
                wgpu::VertexAttribute {
                    shader_location: 3,
                    offset: 32,
                    format: wgpu::VertexFormat::Float32x3,
                },
            ],
        };

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Mesh PipelineLayout"),
            bind_group_layouts: &[&frame_layout, &texture_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Mesh Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: "vs_main",
                buffers: &[vbuf_layout],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: Some(wgpu::Face::Back),
                ..Default::default()
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: depth_fmt,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: "fs_main",
                targets: &[Some(wgpu::ColorTargetState {
                    format: color_fmt,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
        });

        Self {
            pipeline,
            texture_layout,
            frame_ubo,
            frame_bind,
        }
    }

    /// Updates the per-frame view/projection uniforms.
    pub fn write_frame(&self, queue: &wgpu::Queue, uniform: &FrameUniform) {
        queue.write_buffer(&self.frame_ubo, 0, bytemuck::bytes_of(uniform));
    }

    pub fn draw_mesh<'a>(&'a self, rpass: &mut wgpu::RenderPass<'a>, mesh: &'a MeshGpu) {
        rpass.set_pipeline(&self.pipeline);
        rpass.set_bind_group(0, &self.frame_bind, &[]);
        mesh.draw(rpass);
    }
}
