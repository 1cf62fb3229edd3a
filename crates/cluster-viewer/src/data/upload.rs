//! Uploads parsed geometry (and its optional texture) to the GPU.

use std::path::PathBuf;

use objmesh::Geometry;
use thiserror::Error;
use wgpu::util::DeviceExt;

use crate::data::types::{MeshGpu, MeshGpuResources};

#[derive(Debug, Error)]
pub enum ResourceError {
    #[error("failed to decode texture {path}: {source}")]
    Texture {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

/// Uploads one mesh: vertex and index buffers verbatim, plus the diffuse
/// texture if the file's materials referenced one. Requires the rendering
/// context that owns `device`/`queue` to be alive. Texture decode failure
/// fails this mesh only.
pub fn upload_mesh(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    texture_layout: &wgpu::BindGroupLayout,
    geometry: &Geometry,
    name: &str,
) -> Result<MeshGpu, ResourceError> {
    let vbuf = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("Mesh Vertex Buffer"),
        contents: bytemuck::cast_slice(&geometry.vertices),
        usage: wgpu::BufferUsages::VERTEX,
    });

    let ibuf = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("Mesh Index Buffer"),
        contents: bytemuck::cast_slice(&geometry.indices),
        usage: wgpu::BufferUsages::INDEX,
    });

    // Decode the referenced image, or fall back to a 1x1 white placeholder
    // for untextured meshes. The shader's sentinel-texcoord branch keeps
    // the placeholder invisible; it only exists to satisfy the bind group
    // layout.
    let (pixels, width, height) = match &geometry.texture {
        Some(path) => {
            let img = image::open(path)
                .map_err(|source| ResourceError::Texture {
                    path: path.clone(),
                    source,
                })?
                // File formats store rows top-to-bottom; GPU texture origin
                // is bottom-left.
                .flipv()
                .to_rgba8();
            let (width, height) = img.dimensions();
            (img.into_raw(), width, height)
        }
        None => (vec![255u8; 4], 1, 1),
    };

    let size = wgpu::Extent3d {
        width,
        height,
        depth_or_array_layers: 1,
    };

    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("Mesh Diffuse Texture"),
        size,
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba8Unorm,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });

    queue.write_texture(
        wgpu::ImageCopyTexture {
            texture: &texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        &pixels,
        wgpu::ImageDataLayout {
            offset: 0,
            bytes_per_row: Some(width * 4),
            rows_per_image: Some(height),
        },
        size,
    );

    // Linear min/mag, no mipmaps.
    let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
        label: Some("Mesh Diffuse Sampler"),
        address_mode_u: wgpu::AddressMode::Repeat,
        address_mode_v: wgpu::AddressMode::Repeat,
        address_mode_w: wgpu::AddressMode::Repeat,
        mag_filter: wgpu::FilterMode::Linear,
        min_filter: wgpu::FilterMode::Linear,
        mipmap_filter: wgpu::FilterMode::Nearest,
        ..Default::default()
    });

    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

    let bind = device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("Mesh Texture BindGroup"),
        layout: texture_layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(&view),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::Sampler(&sampler),
            },
        ],
    });

    log::debug!(
        "uploaded {}: {} vertices, {} triangles, texture {}x{}",
        name,
        geometry.vertices.len(),
        geometry.triangle_count(),
        width,
        height
    );

    Ok(MeshGpu::new(
        name.to_string(),
        geometry.center_offset,
        MeshGpuResources {
            vbuf,
            ibuf,
            index_count: geometry.indices.len() as u32,
            texture,
            bind,
        },
    ))
}
