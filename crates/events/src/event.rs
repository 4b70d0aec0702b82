use glam::UVec2;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Stable identifier for a window, carried in event payloads.
///
/// Listeners that need the window itself look it up by id; events never carry
/// a copy of the window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WindowId(pub u64);

impl WindowId {
    /// Allocate a process-unique id.
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for WindowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "window#{}", self.0)
    }
}

/// A window lifecycle event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// The window framebuffer changed size.
    WindowResize { window: WindowId, size: UVec2 },
    /// The platform asked the window to close.
    WindowClose { window: WindowId },
}

/// Variant tag used to subscribe to one kind of [`Event`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    WindowResize,
    WindowClose,
}

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::WindowResize { .. } => EventKind::WindowResize,
            Self::WindowClose { .. } => EventKind::WindowClose,
        }
    }

    /// The window this event originated from.
    pub fn window(&self) -> WindowId {
        match self {
            Self::WindowResize { window, .. } | Self::WindowClose { window } => *window,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_ids_are_unique() {
        let a = WindowId::next();
        let b = WindowId::next();
        assert_ne!(a, b);
    }

    #[test]
    fn event_kind_matches_variant() {
        let id = WindowId::next();
        let resize = Event::WindowResize {
            window: id,
            size: UVec2::new(800, 600),
        };
        assert_eq!(resize.kind(), EventKind::WindowResize);
        assert_eq!(resize.window(), id);

        let close = Event::WindowClose { window: id };
        assert_eq!(close.kind(), EventKind::WindowClose);
        assert_eq!(close.window(), id);
    }
}
