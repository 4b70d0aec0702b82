use slim_render::{ContextInfo, FrameStats};
use slim_render_wgpu::{Overlay, OverlayTarget};
use slim_window::{Window, WinitWindow};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::Instant;

const FRAME_HISTORY: usize = 120;

/// Tessellated UI waiting to be painted by the next present.
struct PreparedUi {
    paint_jobs: Vec<egui::ClippedPrimitive>,
    textures: egui::TexturesDelta,
    pixels_per_point: f32,
}

/// Paints the prepared UI on top of the scene.
struct EguiOverlay {
    renderer: egui_wgpu::Renderer,
    prepared: Rc<RefCell<Option<PreparedUi>>>,
}

impl Overlay for EguiOverlay {
    fn paint(&mut self, target: OverlayTarget<'_>) {
        let Some(ui) = self.prepared.borrow_mut().take() else {
            return;
        };
        let screen = egui_wgpu::ScreenDescriptor {
            size_in_pixels: target.size_in_pixels,
            pixels_per_point: ui.pixels_per_point,
        };

        for (id, delta) in &ui.textures.set {
            self.renderer
                .update_texture(target.device, target.queue, *id, delta);
        }
        self.renderer.update_buffers(
            target.device,
            target.queue,
            target.encoder,
            &ui.paint_jobs,
            &screen,
        );
        {
            let mut pass = target
                .encoder
                .begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: Some("egui_pass"),
                    color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                        view: target.view,
                        resolve_target: None,
                        ops: wgpu::Operations {
                            load: wgpu::LoadOp::Load,
                            store: wgpu::StoreOp::Store,
                        },
                    })],
                    depth_stencil_attachment: None,
                    ..Default::default()
                })
                .forget_lifetime();
            self.renderer.render(&mut pass, &ui.paint_jobs, &screen);
        }
        for id in &ui.textures.free {
            self.renderer.free_texture(id);
        }
    }
}

/// Render settings the user can flip from the panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Toggles {
    pub vsync: bool,
    pub wireframe: bool,
}

/// Metrics panel drawn with egui over the scene.
pub struct MetricsUi {
    egui_ctx: egui::Context,
    input: Rc<RefCell<egui_winit::State>>,
    prepared: Rc<RefCell<Option<PreparedUi>>>,
    info: ContextInfo,
    last_frame: Instant,
    frame_times: VecDeque<f32>,
}

impl MetricsUi {
    /// Hook egui into the window's event stream and the context's present.
    pub fn install(window: &mut WinitWindow) -> Self {
        let egui_ctx = egui::Context::default();
        let native = window.native();
        let input = Rc::new(RefCell::new(egui_winit::State::new(
            egui_ctx.clone(),
            egui::ViewportId::ROOT,
            native,
            Some(native.scale_factor() as f32),
            None,
            None,
        )));

        let hook_input = input.clone();
        window.add_event_hook(move |native, event| {
            let _ = hook_input.borrow_mut().on_window_event(native, event);
        });

        let prepared = Rc::new(RefCell::new(None));
        let gpu = window.gpu();
        let renderer =
            egui_wgpu::Renderer::new(gpu.device(), gpu.surface_format(), None, 1, false);
        gpu.set_overlay(Box::new(EguiOverlay {
            renderer,
            prepared: prepared.clone(),
        }));

        Self {
            egui_ctx,
            input,
            prepared,
            info: window.context().info(),
            last_frame: Instant::now(),
            frame_times: VecDeque::with_capacity(FRAME_HISTORY),
        }
    }

    fn record_frame(&mut self) -> f32 {
        let now = Instant::now();
        let dt = (now - self.last_frame).as_secs_f32();
        self.last_frame = now;
        if self.frame_times.len() == FRAME_HISTORY {
            self.frame_times.pop_front();
        }
        self.frame_times.push_back(dt);
        self.frame_times.iter().sum::<f32>() / self.frame_times.len() as f32
    }

    /// Build this frame's UI. Returns the toggles as left by the user.
    pub fn prepare(&mut self, window: &WinitWindow, stats: FrameStats, toggles: Toggles) -> Toggles {
        let average = self.record_frame();
        let native = window.native();
        let dimensions = window.dimensions();
        let raw_input = self.input.borrow_mut().take_egui_input(native);

        let mut next = toggles;
        let info = &self.info;
        let output = self.egui_ctx.run(raw_input, |ctx| {
            egui::Window::new("Metrics")
                .default_width(240.0)
                .show(ctx, |ui| {
                    ui.label(format!("{} | {}", info.backend, info.version));
                    ui.separator();
                    ui.label(format!(
                        "{:.2} ms/frame ({:.0} FPS)",
                        average * 1000.0,
                        if average > 0.0 { 1.0 / average } else { 0.0 }
                    ));
                    ui.label(format!("Viewport: {}x{}", dimensions.x, dimensions.y));
                    ui.label(format!(
                        "Indices: {}  Triangles: {}",
                        stats.index_count, stats.triangles
                    ));
                    ui.separator();
                    ui.checkbox(&mut next.vsync, "VSync");
                    ui.checkbox(&mut next.wireframe, "Wireframe");
                });
        });

        self.input
            .borrow_mut()
            .handle_platform_output(native, output.platform_output);
        let paint_jobs = self
            .egui_ctx
            .tessellate(output.shapes, output.pixels_per_point);

        // A frame that never reached the screen still owes its texture uploads.
        let mut textures = self
            .prepared
            .borrow_mut()
            .take()
            .map(|ui| ui.textures)
            .unwrap_or_default();
        textures.append(output.textures_delta);
        *self.prepared.borrow_mut() = Some(PreparedUi {
            paint_jobs,
            textures,
            pixels_per_point: output.pixels_per_point,
        });
        next
    }
}
