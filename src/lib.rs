pub mod scheduler;
pub mod testing;

pub use scheduler::{
    BoxFuture, Callback, HandleId, RequestHandle, Timer, TimerError, ONCE, UNLIMITED_RECURRENCE,
};
pub use tokio_util::sync::CancellationToken;
