//! Entry point for the cluster viewer application.

use anyhow::Result;
use clap::Parser;
use cluster_viewer::app::App;
use std::{path::PathBuf, sync::Arc};
use winit::{
    event::{Event, WindowEvent},
    event_loop::{ControlFlow, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::WindowBuilder,
};

/// Browse clustered OBJ mesh collections.
#[derive(Parser, Debug)]
#[command(name = "cluster-viewer", version)]
struct Args {
    /// Directory of .obj files, clustered by the filename prefix before
    /// the first '_'.
    dir: PathBuf,
}

fn main() -> Result<()> {
    // Initialize logging; default to "info" if RUST_LOG is unset.
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let event_loop = EventLoop::new()?;
    let window = Arc::new(
        WindowBuilder::new()
            .with_title("Cluster viewer")
            .with_inner_size(winit::dpi::LogicalSize::new(1024, 768))
            .build(&event_loop)?,
    );

    // Initialise the application (async → sync). A shader that fails to
    // validate aborts here; nothing can be drawn without it.
    let mut app = pollster::block_on(App::new(window.clone(), &args.dir))?;

    event_loop.run(move |event, elwt| {
        elwt.set_control_flow(ControlFlow::Poll);

        match event {
            Event::WindowEvent { window_id, event } if window_id == window.id() => {
                // Forward events to the app; handle unconsumed window events.
                if !app.handle_event(&event) {
                    match event {
                        WindowEvent::CloseRequested => elwt.exit(),
                        WindowEvent::KeyboardInput { event, .. } => {
                            if event.physical_key == PhysicalKey::Code(KeyCode::Escape) {
                                elwt.exit();
                            }
                        }
                        WindowEvent::RedrawRequested => match app.render() {
                            Ok(_) => {}
                            Err(wgpu::SurfaceError::Lost) => {
                                app.resize(app.renderer.gfx.size);
                            }
                            Err(wgpu::SurfaceError::OutOfMemory) => {
                                log::error!("WGPU out of memory - exiting.");
                                elwt.exit();
                            }
                            Err(e) => log::error!("Render error: {:?}", e),
                        },
                        _ => {}
                    }
                }
            }
            Event::AboutToWait => {
                // Request a redraw each frame.
                window.request_redraw();
            }
            Event::LoopExiting => {
                // The rendering context is about to go away; release every
                // live GPU resource first.
                app.shutdown();
            }
            _ => {}
        }
    })?;

    Ok(())
}
