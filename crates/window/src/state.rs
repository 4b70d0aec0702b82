use crate::properties::WindowProperties;
use glam::UVec2;
use slim_events::{Dispatch, Event, EventBus, WindowId};
use slim_render::Context;
use std::rc::Rc;

/// Platform-independent half of a window: properties, the graphics context
/// they drive, and the translation of platform callbacks into bus events.
pub(crate) struct WindowCore {
    id: WindowId,
    properties: WindowProperties,
    context: Context,
    bus: Rc<EventBus>,
    closing: bool,
}

impl WindowCore {
    /// Take ownership of an initialized context and push the initial
    /// viewport and swap interval to it.
    ///
    /// `properties` keep the requested size; the viewport follows
    /// `framebuffer`, the size the platform actually granted.
    pub fn new(
        properties: WindowProperties,
        framebuffer: UVec2,
        context: Context,
        bus: Rc<EventBus>,
    ) -> Self {
        let id = WindowId::next();
        let info = context.info();
        tracing::info!(
            %id,
            "graphics context: {} ({}), framebuffer {}x{}",
            info.backend,
            info.version,
            framebuffer.x,
            framebuffer.y
        );
        let core = Self {
            id,
            properties,
            context,
            bus,
            closing: false,
        };
        core.push_viewport(framebuffer);
        core.context.set_swap_interval(core.properties.vsync);
        core
    }

    pub fn id(&self) -> WindowId {
        self.id
    }

    pub fn properties(&self) -> &WindowProperties {
        &self.properties
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    pub fn is_closing(&self) -> bool {
        self.closing
    }

    /// Store new dimensions and push one viewport update.
    pub fn set_dimensions(&mut self, width: u32, height: u32) {
        self.record_dimensions(width, height);
        self.push_viewport(UVec2::new(width, height));
    }

    /// Store new dimensions without touching the context.
    pub fn record_dimensions(&mut self, width: u32, height: u32) {
        self.properties.width = width;
        self.properties.height = height;
    }

    /// Resize the context's viewport. A zero extent is clamped to 1.
    pub fn push_viewport(&self, framebuffer: UVec2) {
        self.context
            .set_viewport(framebuffer.x.max(1), framebuffer.y.max(1));
    }

    pub fn set_vsync(&mut self, vsync: bool) {
        self.properties.vsync = vsync;
        self.context.set_swap_interval(vsync);
    }

    /// Platform reported a new size.
    pub fn handle_resize(&mut self, size: UVec2) -> Dispatch {
        self.set_dimensions(size.x, size.y);
        tracing::debug!(id = %self.id, width = size.x, height = size.y, "window resized");
        self.bus.post(&Event::WindowResize {
            window: self.id,
            size,
        })
    }

    /// Platform asked the window to close.
    pub fn handle_close(&mut self) -> Dispatch {
        self.closing = true;
        tracing::debug!(id = %self.id, "window close requested");
        self.bus.post(&Event::WindowClose { window: self.id })
    }

    /// Enter the closing state without a platform request.
    pub fn mark_closing(&mut self) {
        self.closing = true;
    }
}
