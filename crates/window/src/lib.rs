//! Window Abstraction: platform windows that own a graphics context and
//! translate platform callbacks into [`slim_events`] posts.
//!
//! The concrete window type is chosen at build time: [`WinitWindow`] with the
//! `desktop` feature (default), [`HeadlessWindow`] otherwise. [`create`]
//! returns the selected [`PlatformWindow`] without dynamic dispatch.
//!
//! # Invariants
//! - One native handle per window, released exactly once on drop.
//! - A platform resize updates properties and viewport, then posts exactly
//!   one `WindowResize`.
//! - `should_close` has no side effects.

mod error;
mod headless;
mod properties;
mod run;
mod state;
mod window;

#[cfg(feature = "desktop")]
mod desktop;

pub use error::WindowError;
pub use headless::HeadlessWindow;
pub use properties::WindowProperties;
pub use run::run_loop;
pub use window::Window;

#[cfg(feature = "desktop")]
pub use desktop::{EventHook, WinitWindow};

/// Window type selected for this build.
#[cfg(feature = "desktop")]
pub type PlatformWindow = WinitWindow;

/// Window type selected for this build.
#[cfg(not(feature = "desktop"))]
pub type PlatformWindow = HeadlessWindow;

/// Open the platform window for this build.
pub fn create(
    properties: WindowProperties,
    bus: std::rc::Rc<slim_events::EventBus>,
) -> Result<PlatformWindow, WindowError> {
    PlatformWindow::create(properties, bus)
}

pub fn crate_info() -> &'static str {
    concat!("slim-window v", env!("CARGO_PKG_VERSION"))
}
