use crate::error::WindowError;
use crate::properties::WindowProperties;
use crate::state::WindowCore;
use crate::window::Window;
use glam::UVec2;
use slim_events::{Dispatch, EventBus, WindowId};
use slim_render::{Context, HeadlessContext};
use std::rc::Rc;

/// Window without a display, backed by a [`HeadlessContext`].
///
/// Platform callbacks are simulated with [`HeadlessWindow::simulate_resize`]
/// and [`HeadlessWindow::simulate_close`]. The recording context stands in
/// for the native handle.
pub struct HeadlessWindow {
    core: WindowCore,
    native: Rc<HeadlessContext>,
    frames: u64,
    close_after: Option<u64>,
}

impl HeadlessWindow {
    /// Window over an existing recording context.
    pub fn with_context(
        properties: WindowProperties,
        bus: Rc<EventBus>,
        native: Rc<HeadlessContext>,
    ) -> Self {
        let context: Context = native.clone();
        let framebuffer = properties.dimensions();
        Self {
            core: WindowCore::new(properties, framebuffer, context, bus),
            native,
            frames: 0,
            close_after: None,
        }
    }

    /// Platform resize callback.
    pub fn simulate_resize(&mut self, width: u32, height: u32) -> Dispatch {
        self.core.handle_resize(UVec2::new(width, height))
    }

    /// Platform close callback.
    pub fn simulate_close(&mut self) -> Dispatch {
        self.core.handle_close()
    }

    /// Request a close from inside the `update` that completes `frames`.
    pub fn close_after(&mut self, frames: u64) {
        self.close_after = Some(frames);
    }

    /// Number of `update` calls so far.
    pub fn frames(&self) -> u64 {
        self.frames
    }
}

impl Window for HeadlessWindow {
    type Native = HeadlessContext;

    fn create(properties: WindowProperties, bus: Rc<EventBus>) -> Result<Self, WindowError> {
        Ok(Self::with_context(
            properties,
            bus,
            Rc::new(HeadlessContext::new()),
        ))
    }

    fn id(&self) -> WindowId {
        self.core.id()
    }

    fn should_close(&self) -> bool {
        self.core.is_closing()
    }

    fn update(&mut self) {
        self.frames += 1;
        if self
            .close_after
            .is_some_and(|limit| self.frames >= limit && !self.core.is_closing())
        {
            self.core.handle_close();
        }
        self.core.context().present();
    }

    fn native(&self) -> &HeadlessContext {
        &self.native
    }

    fn context(&self) -> &Context {
        self.core.context()
    }

    fn properties(&self) -> &WindowProperties {
        self.core.properties()
    }

    fn set_dimensions(&mut self, width: u32, height: u32) {
        self.core.set_dimensions(width, height);
    }

    fn set_vsync(&mut self, vsync: bool) {
        self.core.set_vsync(vsync);
    }

    fn request_close(&mut self) {
        self.core.handle_close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slim_events::{Event, EventKind};
    use std::cell::RefCell;

    fn window() -> (HeadlessWindow, Rc<EventBus>) {
        let bus = Rc::new(EventBus::new());
        let window =
            HeadlessWindow::create(WindowProperties::new("test", 800, 600, true), bus.clone())
                .unwrap();
        (window, bus)
    }

    #[test]
    fn dimensions_match_requested_size() {
        let (window, _bus) = window();
        assert_eq!(window.dimensions(), UVec2::new(800, 600));
        assert_eq!(window.native().viewport(), UVec2::new(800, 600));
        assert_eq!(window.properties().title, "test");
    }

    #[test]
    fn resize_posts_exactly_one_event() {
        let (mut window, bus) = window();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        bus.subscribe(EventKind::WindowResize, move |event| {
            sink.borrow_mut().push(*event);
            Ok(())
        });

        let dispatch = window.simulate_resize(1024, 768);
        assert_eq!(dispatch.delivered, 1);
        assert_eq!(
            *seen.borrow(),
            vec![Event::WindowResize {
                window: window.id(),
                size: UVec2::new(1024, 768),
            }]
        );
        assert_eq!(window.dimensions(), UVec2::new(1024, 768));
        assert_eq!(window.native().viewport(), UVec2::new(1024, 768));
    }

    #[test]
    fn setters_push_viewport_without_events() {
        let (mut window, bus) = window();
        let count = Rc::new(RefCell::new(0));
        let sink = count.clone();
        bus.subscribe(EventKind::WindowResize, move |_| {
            *sink.borrow_mut() += 1;
            Ok(())
        });

        window.set_width(300);
        window.set_height(200);
        assert_eq!(window.dimensions(), UVec2::new(300, 200));
        assert_eq!(window.native().viewport(), UVec2::new(300, 200));
        assert_eq!(*count.borrow(), 0);
    }

    #[test]
    fn vsync_changes_swap_interval() {
        let (mut window, _bus) = window();
        assert!(window.vsync());
        window.set_vsync(false);
        assert!(!window.vsync());
        assert!(!window.native().vsync());
    }

    #[test]
    fn close_flow() {
        let (mut window, bus) = window();
        let closed = Rc::new(RefCell::new(0));
        let sink = closed.clone();
        bus.subscribe(EventKind::WindowClose, move |_| {
            *sink.borrow_mut() += 1;
            Ok(())
        });

        assert!(!window.should_close());
        window.simulate_close();
        assert!(window.should_close());
        assert_eq!(*closed.borrow(), 1);
    }

    #[test]
    fn close_after_frame_limit() {
        let (mut window, _bus) = window();
        window.close_after(2);
        window.update();
        assert!(!window.should_close());
        window.update();
        assert!(window.should_close());
        assert_eq!(window.native().frames_presented(), 2);
        assert_eq!(window.frames(), 2);
    }
}
