//! Event Bus: decoupled, synchronous notification of window lifecycle events.
//!
//! # Invariants
//! - Delivery is immediate: `post` returns only after every interested
//!   listener has run. Nothing is queued, batched or replayed.
//! - Listeners of one kind run in registration order.
//! - A failing listener never blocks delivery to the listeners after it.
//! - Windows are referenced by [`WindowId`], never by value.

mod bus;
mod event;

pub use bus::{Dispatch, EventBus, ListenerError, SubscriptionId};
pub use event::{Event, EventKind, WindowId};

pub fn crate_info() -> &'static str {
    concat!("slim-events v", env!("CARGO_PKG_VERSION"))
}
