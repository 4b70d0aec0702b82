use crate::error::WindowError;
use crate::properties::WindowProperties;
use crate::state::WindowCore;
use crate::window::Window;
use glam::UVec2;
use slim_events::{EventBus, WindowId};
use slim_render::Context;
use slim_render_wgpu::WgpuContext;
use std::rc::Rc;
use std::sync::Arc;
use std::time::Duration;
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, EventLoop};
use winit::platform::pump_events::{EventLoopExtPumpEvents, PumpStatus};

const STARTUP_PUMPS: u32 = 100;

/// Observer of raw platform events, run before the window handles them.
pub type EventHook = Box<dyn FnMut(&winit::window::Window, &WindowEvent)>;

/// Desktop window on winit, rendering through a [`WgpuContext`].
///
/// The event loop is pumped from [`Window::update`] instead of owning the
/// thread, so the caller keeps control of the frame loop.
pub struct WinitWindow {
    core: WindowCore,
    gpu: Rc<WgpuContext>,
    hooks: Vec<EventHook>,
    window: Arc<winit::window::Window>,
    event_loop: EventLoop<()>,
}

impl WinitWindow {
    /// The wgpu context, for collaborators that need the device.
    pub fn gpu(&self) -> &Rc<WgpuContext> {
        &self.gpu
    }

    /// Observe every platform event of this window, e.g. to feed a UI.
    pub fn add_event_hook(
        &mut self,
        hook: impl FnMut(&winit::window::Window, &WindowEvent) + 'static,
    ) {
        self.hooks.push(Box::new(hook));
    }
}

/// Creates the native window once the event loop resumes.
struct Startup {
    attributes: Option<winit::window::WindowAttributes>,
    window: Option<Result<winit::window::Window, winit::error::OsError>>,
}

impl ApplicationHandler for Startup {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if let Some(attributes) = self.attributes.take() {
            self.window = Some(event_loop.create_window(attributes));
        }
    }

    fn window_event(
        &mut self,
        _event_loop: &ActiveEventLoop,
        _window_id: winit::window::WindowId,
        _event: WindowEvent,
    ) {
    }
}

/// Routes one pump's worth of events into the shared core.
struct Pump<'a> {
    window: &'a winit::window::Window,
    core: &'a mut WindowCore,
    hooks: &'a mut [EventHook],
}

impl ApplicationHandler for Pump<'_> {
    fn resumed(&mut self, _event_loop: &ActiveEventLoop) {}

    fn window_event(
        &mut self,
        _event_loop: &ActiveEventLoop,
        window_id: winit::window::WindowId,
        event: WindowEvent,
    ) {
        if window_id != self.window.id() {
            return;
        }
        for hook in self.hooks.iter_mut() {
            hook(self.window, &event);
        }
        match event {
            WindowEvent::Resized(size) => {
                self.core.handle_resize(UVec2::new(size.width, size.height));
            }
            WindowEvent::CloseRequested => {
                self.core.handle_close();
            }
            _ => {}
        }
    }
}

impl Window for WinitWindow {
    type Native = winit::window::Window;

    fn create(properties: WindowProperties, bus: Rc<EventBus>) -> Result<Self, WindowError> {
        let mut event_loop = EventLoop::new()?;
        let mut startup = Startup {
            attributes: Some(
                winit::window::Window::default_attributes()
                    .with_title(properties.title.as_str())
                    .with_inner_size(PhysicalSize::new(properties.width, properties.height)),
            ),
            window: None,
        };

        for _ in 0..STARTUP_PUMPS {
            let status = event_loop.pump_app_events(Some(Duration::from_millis(10)), &mut startup);
            if startup.window.is_some() || matches!(status, PumpStatus::Exit(_)) {
                break;
            }
        }
        let window = Arc::new(startup.window.ok_or(WindowError::NotResumed)??);

        let size = window.inner_size();
        let gpu = Rc::new(WgpuContext::new(
            window.clone(),
            size.width,
            size.height,
            properties.vsync,
        )?);
        let context: Context = gpu.clone();
        let framebuffer = UVec2::new(size.width, size.height);

        Ok(Self {
            core: WindowCore::new(properties, framebuffer, context, bus),
            gpu,
            hooks: Vec::new(),
            window,
            event_loop,
        })
    }

    fn id(&self) -> WindowId {
        self.core.id()
    }

    fn should_close(&self) -> bool {
        self.core.is_closing()
    }

    fn update(&mut self) {
        let mut pump = Pump {
            window: &self.window,
            core: &mut self.core,
            hooks: &mut self.hooks,
        };
        if let PumpStatus::Exit(code) = self
            .event_loop
            .pump_app_events(Some(Duration::ZERO), &mut pump)
        {
            tracing::debug!(code, "event loop exited");
            self.core.mark_closing();
        }
        self.core.context().present();
    }

    fn native(&self) -> &winit::window::Window {
        &self.window
    }

    fn context(&self) -> &Context {
        self.core.context()
    }

    fn properties(&self) -> &WindowProperties {
        self.core.properties()
    }

    /// The viewport follows the size winit applies. When the request is
    /// asynchronous it is pushed by the `Resized` event that follows.
    fn set_dimensions(&mut self, width: u32, height: u32) {
        self.core.record_dimensions(width, height);
        if let Some(granted) = self
            .window
            .request_inner_size(PhysicalSize::new(width, height))
        {
            self.core
                .push_viewport(UVec2::new(granted.width, granted.height));
        }
    }

    fn set_vsync(&mut self, vsync: bool) {
        self.core.set_vsync(vsync);
    }

    fn request_close(&mut self) {
        self.core.handle_close();
    }
}
