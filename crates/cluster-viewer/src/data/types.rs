//! GPU resource types for one renderable mesh.

use glam::{Mat4, Vec3};

/// Per-frame uniform data. Must match `FrameUniform` in `mesh.wgsl`.
#[repr(C)]
#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
pub struct FrameUniform {
    /// Full view transform: incremental * committed * mesh centering.
    pub view: [[f32; 4]; 4],
    /// Orthographic projection.
    pub proj: [[f32; 4]; 4],
}

/// GPU handles for one uploaded mesh. Lives inside `MeshGpu` behind an
/// `Option` so release can take it exactly once.
pub struct MeshGpuResources {
    /// Interleaved `objmesh::Vertex` buffer.
    pub vbuf: wgpu::Buffer,
    /// u32 triangle-list index buffer.
    pub ibuf: wgpu::Buffer,
    pub index_count: u32,
    /// Diffuse texture, or the shared-layout 1x1 placeholder when the mesh
    /// is untextured.
    pub texture: wgpu::Texture,
    /// Texture + sampler bind group (group 1).
    pub bind: wgpu::BindGroup,
}

/// One loaded mesh and its GPU resources.
///
/// Resources are bound to the rendering context that created them and must
/// be released before that context is destroyed: explicitly on rescan
/// teardown, or via `App::shutdown` when the event loop exits. A released
/// mesh cannot draw by construction.
pub struct MeshGpu {
    /// Source file name, shown in the title bar and HUD.
    pub name: String,
    /// Translation moving the mesh's bounding-box center to the origin.
    pub center_offset: Vec3,
    gpu: Option<MeshGpuResources>,
}

impl MeshGpu {
    pub fn new(name: String, center_offset: Vec3, gpu: MeshGpuResources) -> Self {
        Self {
            name,
            center_offset,
            gpu: Some(gpu),
        }
    }

    pub fn model_matrix(&self) -> Mat4 {
        Mat4::from_translation(self.center_offset)
    }

    pub fn is_released(&self) -> bool {
        self.gpu.is_none()
    }

    /// Binds this mesh's buffers and texture and issues one indexed
    /// triangle-list draw. The caller has already set the pipeline and the
    /// frame uniforms. Draws nothing on a released mesh.
    pub fn draw<'a>(&'a self, rpass: &mut wgpu::RenderPass<'a>) {
        let Some(res) = &self.gpu else {
            log::error!("draw() on released mesh {:?}", self.name);
            return;
        };

        if res.index_count == 0 {
            return;
        }

        rpass.set_bind_group(1, &res.bind, &[]);
        rpass.set_vertex_buffer(0, res.vbuf.slice(..));
        rpass.set_index_buffer(res.ibuf.slice(..), wgpu::IndexFormat::Uint32);
        rpass.draw_indexed(0..res.index_count, 0, 0..1);
    }

    /// Destroys the GPU handles. Idempotent; a second call finds nothing
    /// left to release.
    pub fn release(&mut self) {
        if let Some(res) = self.gpu.take() {
            res.vbuf.destroy();
            res.ibuf.destroy();
            res.texture.destroy();
            log::debug!("released GPU resources for {}", self.name);
        }
    }
}
