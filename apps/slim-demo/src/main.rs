mod ui;

use anyhow::{Context as _, Result};
use clap::Parser;
use glam::Mat4;
use slim_events::{Event, EventBus, EventKind};
use slim_render::{Camera, FrameRenderer, PolygonMode, RenderError, Shader, mesh};
use slim_window::{Window, WindowProperties};
use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;
use tracing_subscriber::EnvFilter;
use ui::{MetricsUi, Toggles};

const CLEAR_COLOR: [f32; 4] = [0.1, 0.1, 0.1, 1.0];

#[derive(Parser)]
#[command(name = "slim-demo", about = "Colored cube with a metrics overlay")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Window title
    #[arg(long, default_value = "slim")]
    title: String,

    /// Initial width in pixels
    #[arg(long, default_value_t = 1280)]
    width: u32,

    /// Initial height in pixels
    #[arg(long, default_value_t = 720)]
    height: u32,

    /// Present without waiting for vertical sync
    #[arg(long)]
    no_vsync: bool,

    /// Draw triangle edges only
    #[arg(long)]
    wireframe: bool,

    /// Directory holding vertex.wgsl and fragment.wgsl
    #[arg(long, default_value = "res")]
    res_dir: PathBuf,
}

fn polygon_mode(wireframe: bool) -> PolygonMode {
    if wireframe {
        PolygonMode::Line
    } else {
        PolygonMode::Fill
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    tracing::info!("slim-demo starting");

    let bus = Rc::new(EventBus::new());
    let properties = WindowProperties::new(cli.title, cli.width, cli.height, !cli.no_vsync);
    let mut window =
        slim_window::create(properties, bus.clone()).context("failed to open window")?;
    let context = window.context().clone();

    let shader = Rc::new(
        Shader::create(
            &context,
            cli.res_dir.join("vertex.wgsl"),
            cli.res_dir.join("fragment.wgsl"),
        )
        .context("failed to build shader program")?,
    );
    let cube = mesh::cube(&context).context("failed to upload cube")?;

    let camera = Rc::new(RefCell::new(Camera::for_viewport(window.dimensions())));
    shader.bind();
    shader.set_mat4("model", Mat4::from_rotation_x(30.0_f32.to_radians()));
    shader.set_mat4("view", camera.borrow().view_matrix());
    shader.set_mat4("projection", camera.borrow().projection_matrix());

    let resize_listener = {
        let camera = camera.clone();
        let shader = shader.clone();
        bus.subscribe(EventKind::WindowResize, move |event| {
            if let Event::WindowResize { size, .. } = event {
                let mut camera = camera.borrow_mut();
                camera.set_viewport(*size);
                shader.set_mat4("projection", camera.projection_matrix());
            }
            Ok(())
        })
    };

    let mut toggles = Toggles {
        vsync: window.vsync(),
        wireframe: cli.wireframe,
    };
    let renderer = FrameRenderer::new(&context, CLEAR_COLOR, polygon_mode(toggles.wireframe));
    let mut metrics = MetricsUi::install(&mut window);

    let frames = slim_window::run_loop(&mut window, |window| {
        let stats = renderer.render(&shader, &cube)?;
        let next = metrics.prepare(window, stats, toggles);
        if next.vsync != toggles.vsync {
            window.set_vsync(next.vsync);
        }
        if next.wireframe != toggles.wireframe {
            renderer.set_polygon_mode(polygon_mode(next.wireframe));
        }
        toggles = next;
        Ok::<_, RenderError>(())
    })?;

    bus.unsubscribe(resize_listener);
    tracing::info!(frames, "slim-demo exiting");
    Ok(())
}
