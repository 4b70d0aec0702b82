//! wgpu backend for the slim rendering core.
//!
//! [`WgpuContext`] implements the stateful [`slim_render::GraphicsContext`]
//! on top of wgpu. Draws issued during a frame are recorded and encoded into
//! a single render pass when the frame is presented; render pipelines are
//! built on first use for each (program, vertex array, polygon mode) triple.
//!
//! # Invariants
//! - The context lives on one thread; it is not `Send`.
//! - A vertex array's layout is fixed once attached, so cached pipelines
//!   never go stale.
//! - Uniform writes land before the frame that follows them is submitted.

mod gpu;
mod overlay;
mod pipeline;

pub use gpu::WgpuContext;
pub use overlay::{Overlay, OverlayTarget};

pub fn crate_info() -> &'static str {
    concat!("slim-render-wgpu v", env!("CARGO_PKG_VERSION"))
}
