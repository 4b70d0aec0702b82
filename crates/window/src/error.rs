use slim_render::RenderError;

/// A platform window or its graphics context could not be initialized.
#[derive(Debug, thiserror::Error)]
pub enum WindowError {
    #[cfg(feature = "desktop")]
    #[error("failed to create event loop: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),

    #[cfg(feature = "desktop")]
    #[error("failed to create native window: {0}")]
    Os(#[from] winit::error::OsError),

    #[error("event loop never resumed, no window was created")]
    NotResumed,

    #[error("graphics context initialization failed: {0}")]
    Context(#[from] RenderError),
}
