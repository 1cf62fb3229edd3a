use crate::{
    browser::ClusterBrowser,
    camera::ViewState,
    data::{
        types::{FrameUniform, MeshGpu},
        upload::upload_mesh,
    },
    renderer::{pipelines::mesh::MESH_SHADER, Renderer},
    ui,
};
use anyhow::Result;
use glam::Mat4;
use rayon::prelude::*;
use std::{
    path::{Path, PathBuf},
    sync::Arc,
};
use thiserror::Error;
use walkdir::WalkDir;
use winit::{
    event::{ElementState, WindowEvent},
    keyboard::{KeyCode, PhysicalKey},
    window::Window,
};

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("{0} is not a directory")]
    NotADirectory(PathBuf),
}

pub struct App {
    pub window: Arc<Window>,
    pub renderer: Renderer,
    pub view: ViewState,
    pub browser: ClusterBrowser<MeshGpu>,
    pub egui_ctx: egui::Context,
    pub egui_state: egui_winit::State,
    scan_dir: PathBuf,
}

impl App {
    pub async fn new(window: Arc<Window>, dir: &Path) -> Result<Self> {
        let renderer = Renderer::new(window.clone(), MESH_SHADER).await?;
        let size = renderer.gfx.size;

        let view = ViewState::new(size.width, size.height);

        let egui_ctx = egui::Context::default();
        let egui_state = egui_winit::State::new(
            egui_ctx.clone(),
            egui_ctx.viewport_id(),
            &*window,
            None,
            None,
        );

        let mut app = Self {
            window,
            renderer,
            view,
            browser: ClusterBrowser::new(),
            egui_ctx,
            egui_state,
            scan_dir: dir.to_path_buf(),
        };

        // A bad directory on startup just leaves the viewer empty.
        if let Err(err) = app.rescan(dir) {
            log::warn!("{err}");
        }

        Ok(app)
    }

    /// Replaces the loaded mesh set with the contents of `dir`. Previous
    /// GPU resources are released before any new ones are created; files
    /// that fail to parse or upload are reported and skipped.
    pub fn rescan(&mut self, dir: &Path) -> Result<(), ScanError> {
        if !dir.is_dir() {
            return Err(ScanError::NotADirectory(dir.to_path_buf()));
        }
        self.scan_dir = dir.to_path_buf();

        let mut paths: Vec<PathBuf> = WalkDir::new(dir)
            .max_depth(1)
            .into_iter()
            .filter_map(Result::ok)
            .filter(|e| e.file_type().is_file())
            .filter(|e| {
                e.path()
                    .extension()
                    .and_then(|s| s.to_str())
                    .is_some_and(|ext| ext.eq_ignore_ascii_case("obj"))
            })
            .map(|e| e.into_path())
            .collect();

        // Deterministic cluster order regardless of readdir order.
        paths.sort();

        for mut mesh in self.browser.drain() {
            mesh.release();
        }

        if paths.is_empty() {
            log::warn!("No .obj files found in '{}'", dir.display());
            self.update_title();
            return Ok(());
        }

        log::info!("Loading {} meshes...", paths.len());

        // Parsing touches no GPU state; fan out across cores.
        let parsed: Vec<(String, objmesh::Geometry)> = paths
            .par_iter()
            .filter_map(|path| match objmesh::load(path) {
                Ok(geometry) => {
                    let name = path
                        .file_name()
                        .map(|s| s.to_string_lossy().into_owned())
                        .unwrap_or_default();
                    Some((name, geometry))
                }
                Err(err) => {
                    log::error!("Skipping {}: {err}", path.display());
                    None
                }
            })
            .collect();

        // Uploads stay on the context-owning thread.
        let mut entries = Vec::with_capacity(parsed.len());
        for (name, geometry) in parsed {
            match upload_mesh(
                &self.renderer.gfx.device,
                &self.renderer.gfx.queue,
                &self.renderer.mesh.texture_layout,
                &geometry,
                &name,
            ) {
                Ok(mesh) => entries.push((name, mesh)),
                Err(err) => log::error!("Skipping {name}: {err}"),
            }
        }

        self.browser.rebuild(entries);
        log::info!(
            "Loaded {} meshes in {} clusters.",
            self.browser.mesh_count(),
            self.browser.cluster_count()
        );

        self.update_title();
        Ok(())
    }

    pub fn resize(&mut self, new_size: winit::dpi::PhysicalSize<u32>) {
        if new_size.width > 0 && new_size.height > 0 {
            self.renderer.resize(new_size);
            self.view.set_viewport(new_size.width, new_size.height);
        }
    }

    /// Forwards window events. Returns `true` when the event was consumed
    /// (by the HUD) and the caller should not act on it further.
    pub fn handle_event(&mut self, event: &WindowEvent) -> bool {
        let response = self.egui_state.on_window_event(&self.window, event);
        if response.consumed {
            return true;
        }

        self.view.handle_event(event);

        match event {
            WindowEvent::Resized(physical_size) => self.resize(*physical_size),
            WindowEvent::KeyboardInput { event, .. } if event.state == ElementState::Pressed => {
                if let PhysicalKey::Code(code) = event.physical_key {
                    self.handle_key(code);
                }
            }
            _ => {}
        }

        false
    }

    fn handle_key(&mut self, code: KeyCode) {
        let selection_changed = match code {
            KeyCode::ArrowRight => self.browser.next_in_cluster(),
            KeyCode::ArrowLeft => self.browser.prev_in_cluster(),
            KeyCode::ArrowDown => self.browser.next_cluster(),
            KeyCode::ArrowUp => self.browser.prev_cluster(),
            KeyCode::KeyR => {
                self.view.reset_view();
                false
            }
            KeyCode::F5 => {
                // A bad path is ignored: the previous set stays on screen.
                if let Err(err) = self.rescan(&self.scan_dir.clone()) {
                    log::warn!("{err}");
                }
                false
            }
            _ => false,
        };

        if selection_changed {
            self.update_title();
        }
    }

    fn update_title(&self) {
        let title = match self.browser.selected() {
            Some(mesh) => format!("Cluster viewer - {}", mesh.name),
            None => "Cluster viewer".to_string(),
        };
        self.window.set_title(&title);
    }

    pub fn render(&mut self) -> Result<(), wgpu::SurfaceError> {
        let frame = self.renderer.gfx.surface.get_current_texture()?;
        let swap_view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let hud_selection = self
            .browser
            .selected()
            .zip(self.browser.selection_info())
            .map(|(mesh, info)| (mesh.name.clone(), info));

        let uniform = match self.browser.selected() {
            Some(mesh) => FrameUniform {
                view: self.view.view_for(mesh.center_offset).to_cols_array_2d(),
                proj: self.view.projection().to_cols_array_2d(),
            },
            None => FrameUniform {
                view: Mat4::IDENTITY.to_cols_array_2d(),
                proj: Mat4::IDENTITY.to_cols_array_2d(),
            },
        };

        self.renderer
            .render(&swap_view, self.browser.selected(), &uniform);

        // HUD pass.
        let egui_input = self.egui_state.take_egui_input(&self.window);
        self.egui_ctx.begin_frame(egui_input);

        ui::draw_hud(&self.egui_ctx, hud_selection.as_ref());

        let egui_output = self.egui_ctx.end_frame();
        let shapes = self
            .egui_ctx
            .tessellate(egui_output.shapes, self.egui_ctx.pixels_per_point());

        let screen_descriptor = egui_wgpu::ScreenDescriptor {
            size_in_pixels: [
                self.renderer.gfx.config.width,
                self.renderer.gfx.config.height,
            ],
            pixels_per_point: self.egui_ctx.pixels_per_point(),
        };

        let mut encoder =
            self.renderer
                .gfx
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("UI Encoder"),
                });

        for (id, delta) in &egui_output.textures_delta.set {
            self.renderer.egui_renderer.update_texture(
                &self.renderer.gfx.device,
                &self.renderer.gfx.queue,
                *id,
                delta,
            );
        }

        self.renderer.egui_renderer.update_buffers(
            &self.renderer.gfx.device,
            &self.renderer.gfx.queue,
            &mut encoder,
            &shapes,
            &screen_descriptor,
        );

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("HUD Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &swap_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            self.renderer
                .egui_renderer
                .render(&mut render_pass, &shapes, &screen_descriptor);
        }

        for id in &egui_output.textures_delta.free {
            self.renderer.egui_renderer.free_texture(id);
        }

        self.renderer
            .gfx
            .queue
            .submit(std::iter::once(encoder.finish()));
        frame.present();

        Ok(())
    }

    /// Context-teardown hook: releases every live GPU mesh before the
    /// surface and device drop. Safe to call more than once.
    pub fn shutdown(&mut self) {
        for mut mesh in self.browser.drain() {
            mesh.release();
        }
    }
}
