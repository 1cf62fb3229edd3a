//! The rendering orchestrator. Owns the GPU context, the depth target, and
//! the mesh pipeline.

pub mod context;
pub mod pipelines;
pub mod targets;

use self::{context::GfxContext, pipelines::mesh::MeshPipeline, targets::Targets};
use crate::data::types::{FrameUniform, MeshGpu};
use std::sync::Arc;
use winit::window::Window;

/// Background matching the original viewer.
const CLEAR_COLOR: wgpu::Color = wgpu::Color {
    r: 0.6,
    g: 0.6,
    b: 0.6,
    a: 1.0,
};

pub struct Renderer {
    pub gfx: GfxContext,
    pub targets: Targets,
    pub mesh: MeshPipeline,
    pub egui_renderer: egui_wgpu::Renderer,
}

impl Renderer {
    /// Sets up the context and pipeline. A shader that fails validation is
    /// fatal here: no rendering is possible without the program, so startup
    /// aborts with the validation report.
    pub async fn new(window: Arc<Window>, shader_src: &str) -> anyhow::Result<Self> {
        let gfx = GfxContext::new(window).await?;
        let size = gfx.size;

        let targets = Targets::new(&gfx.device, size);
        let mesh = MeshPipeline::new(&gfx.device, gfx.config.format, targets.depth_fmt, shader_src);

        let egui_renderer = egui_wgpu::Renderer::new(&gfx.device, gfx.config.format, None, 1);

        Ok(Self {
            gfx,
            targets,
            mesh,
            egui_renderer,
        })
    }

    pub fn resize(&mut self, new_size: winit::dpi::PhysicalSize<u32>) {
        if new_size.width > 0 && new_size.height > 0 {
            self.gfx.resize(new_size);
            self.targets.resize(&self.gfx.device, new_size);
        }
    }

    /// Draws one frame into `swap_view`: clear-only when no mesh is
    /// selected, otherwise the selected mesh with the given frame uniforms.
    pub fn render(
        &mut self,
        swap_view: &wgpu::TextureView,
        selected: Option<&MeshGpu>,
        uniform: &FrameUniform,
    ) {
        if selected.is_some() {
            self.mesh.write_frame(&self.gfx.queue, uniform);
        }

        let mut encoder = self
            .gfx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Frame Encoder"),
            });

        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Mesh Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: swap_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(CLEAR_COLOR),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.targets.depth,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            if let Some(mesh) = selected {
                self.mesh.draw_mesh(&mut pass, mesh);
            }
        }

        self.gfx.queue.submit(std::iter::once(encoder.finish()));
    }
}
