//! Scheduler type definitions.
//!
//! This module contains the error type, the callback aliases, the handle
//! identifier, and the recurrence constants.

use std::fmt;
use std::future::Future;
use std::pin::Pin;

use thiserror::Error;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Recurrence value for a chain that repeats until cancelled.
pub const UNLIMITED_RECURRENCE: i32 = 0;

/// Recurrence value for a single invocation.
pub const ONCE: i32 = 1;

/// Unique identifier for a request handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandleId(Uuid);

impl HandleId {
    /// Generate a new random HandleId.
    pub(crate) fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Get the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for HandleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A boxed future produced by a scheduled callback invocation.
pub type BoxFuture = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// A scheduled callback.
///
/// Each invocation receives a clone of the chain's cancellation signal so
/// the body can observe cancellation mid-invocation if it chooses; the
/// repeat loop itself only checks the signal at wait boundaries.
pub type Callback = Box<dyn Fn(CancellationToken) -> BoxFuture + Send + Sync + 'static>;

/// Errors that can occur when scheduling callback chains.
#[derive(Debug, Error)]
pub enum TimerError {
    /// Recurrence below zero.
    #[error("recurrence must be non-negative, got {0}")]
    NegativeRecurrence(i32),

    /// An effectful operation was attempted on a disposed handle.
    #[error("request handle is disposed")]
    HandleDisposed,

    /// Entangled start targeting a handle the timer is not tracking.
    #[error("attempt to schedule a callback entangled to a handle not registered with the timer")]
    HandleNotTracked,
}

/// Box a plain async closure into a [`Callback`].
pub(crate) fn into_callback<F, Fut>(f: F) -> Callback
where
    F: Fn(CancellationToken) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    Box::new(move |signal| Box::pin(f(signal)))
}
