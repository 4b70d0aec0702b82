use anyhow::Context as _;
use clap::{Parser, Subcommand};
use slim_events::{Event, EventBus, EventKind};
use slim_render::reflect::ProgramLayout;
use slim_render::{
    Camera, Context, FrameRenderer, GraphicsContext, HeadlessContext, PolygonMode, RenderError,
    Shader, mesh,
};
use slim_window::{HeadlessWindow, Window, WindowProperties};
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "slim-cli", about = "CLI tool for slim rendering operations")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print crate versions and the headless backend
    Info,
    /// Compile and link a shader pair, then list its interface
    Validate {
        /// Vertex stage source
        #[arg(long)]
        vertex: PathBuf,
        /// Fragment stage source
        #[arg(long)]
        fragment: PathBuf,
    },
    /// Render the cube for a number of frames without a display
    Headless {
        /// Frames to run before closing
        #[arg(short, long, default_value = "3", value_parser = clap::value_parser!(u64).range(1..))]
        frames: u64,
        /// Directory holding vertex.wgsl and fragment.wgsl
        #[arg(long, default_value = "res")]
        res_dir: PathBuf,
        /// Draw triangle edges only
        #[arg(long)]
        wireframe: bool,
    },
}

fn read(path: &Path) -> anyhow::Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

fn validate(vertex: &Path, fragment: &Path) -> anyhow::Result<()> {
    let vertex_src = read(vertex)?;
    let fragment_src = read(fragment)?;

    let context: Context = Rc::new(HeadlessContext::new());
    Shader::from_sources(&context, &vertex_src, &fragment_src)?;
    let layout = ProgramLayout::link(&vertex_src, &fragment_src)?;

    println!("OK: {} + {}", vertex.display(), fragment.display());
    println!(
        "entry points: {} / {}",
        layout.vertex_entry, layout.fragment_entry
    );
    println!("vertex inputs: {:?}", layout.vertex_inputs);
    println!("uniforms: {}", layout.uniforms.len());
    for uniform in layout.uniforms.values() {
        println!(
            "  @binding({}) {}: {:?}",
            uniform.binding, uniform.name, uniform.ty
        );
    }
    Ok(())
}

fn headless(frames: u64, res_dir: &Path, wireframe: bool) -> anyhow::Result<()> {
    let bus = Rc::new(EventBus::new());
    bus.subscribe(EventKind::WindowClose, |event: &Event| {
        tracing::info!(window = %event.window(), "close requested");
        Ok(())
    });

    let native = Rc::new(HeadlessContext::new());
    let mut window =
        HeadlessWindow::with_context(WindowProperties::default(), bus.clone(), native.clone());
    window.close_after(frames);
    let context = window.context().clone();

    let shader = Shader::create(
        &context,
        res_dir.join("vertex.wgsl"),
        res_dir.join("fragment.wgsl"),
    )?;
    let cube = mesh::cube(&context)?;
    let camera = Camera::for_viewport(window.dimensions());
    shader.bind();
    shader.set_mat4("model", glam::Mat4::from_rotation_x(30.0_f32.to_radians()));
    shader.set_mat4("view", camera.view_matrix());
    shader.set_mat4("projection", camera.projection_matrix());

    let mode = if wireframe {
        PolygonMode::Line
    } else {
        PolygonMode::Fill
    };
    let renderer = FrameRenderer::new(&context, [0.1, 0.1, 0.1, 1.0], mode);
    let mut triangles = 0u64;
    let ran = slim_window::run_loop(&mut window, |_| {
        triangles += u64::from(renderer.render(&shader, &cube)?.triangles);
        Ok::<_, RenderError>(())
    })?;

    let info = context.info();
    println!("backend: {} ({})", info.backend, info.version);
    println!("frames: {ran}  presented: {}", native.frames_presented());
    println!("draws: {}  triangles: {triangles}", native.draws().len());
    if let Some(draw) = native.last_draw() {
        println!(
            "last draw: {} indices, {} triangles, {:?}",
            draw.index_count,
            draw.triangles(),
            draw.polygon_mode
        );
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match cli.command {
        Commands::Info => {
            println!("slim-cli v{}", env!("CARGO_PKG_VERSION"));
            println!("events: {}", slim_events::crate_info());
            println!("render: {}", slim_render::crate_info());
            println!("window: {}", slim_window::crate_info());
            let info = HeadlessContext::new().info();
            println!("headless backend: {} ({})", info.backend, info.version);
        }
        Commands::Validate { vertex, fragment } => validate(&vertex, &fragment)?,
        Commands::Headless {
            frames,
            res_dir,
            wireframe,
        } => headless(frames, &res_dir, wireframe)?,
    }

    Ok(())
}
