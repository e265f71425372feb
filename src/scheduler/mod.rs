//! Recurring-callback scheduling.
//!
//! This module provides the timer that schedules callback chains, the
//! opaque request handles used to cancel them, and the background repeat
//! loop that drives each chain.

mod handle;
mod repeat;
mod timer;
mod types;

pub use handle::RequestHandle;
pub use timer::Timer;
pub use types::{BoxFuture, Callback, HandleId, TimerError, ONCE, UNLIMITED_RECURRENCE};
