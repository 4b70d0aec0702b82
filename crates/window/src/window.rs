use crate::error::WindowError;
use crate::properties::WindowProperties;
use glam::UVec2;
use slim_events::{EventBus, WindowId};
use slim_render::Context;
use std::rc::Rc;

/// A platform window owning its native handle and graphics context.
///
/// Windows are never `Clone`: the native handle has exactly one owner and is
/// released when the window drops. Events refer to a window by [`Window::id`].
pub trait Window {
    /// Raw platform handle exposed for collaborators such as a UI overlay.
    type Native: ?Sized;

    /// Open the window and initialize its graphics context.
    fn create(properties: WindowProperties, bus: Rc<EventBus>) -> Result<Self, WindowError>
    where
        Self: Sized;

    fn id(&self) -> WindowId;

    /// Whether a close was requested. Pure query.
    fn should_close(&self) -> bool;

    /// Drain pending platform events, posting resize/close to the bus as they
    /// are seen, then present the current frame.
    fn update(&mut self);

    fn native(&self) -> &Self::Native;

    fn context(&self) -> &Context;

    fn properties(&self) -> &WindowProperties;

    /// Current size. Reflects a platform resize only after the `update` that
    /// processed it.
    fn dimensions(&self) -> UVec2 {
        self.properties().dimensions()
    }

    fn set_width(&mut self, width: u32) {
        let height = self.properties().height;
        self.set_dimensions(width, height);
    }

    fn set_height(&mut self, height: u32) {
        let width = self.properties().width;
        self.set_dimensions(width, height);
    }

    /// Resize and push the viewport to the context once.
    fn set_dimensions(&mut self, width: u32, height: u32);

    fn vsync(&self) -> bool {
        self.properties().vsync
    }

    fn set_vsync(&mut self, vsync: bool);

    /// Ask the window to close, as if the platform had requested it.
    fn request_close(&mut self);
}
