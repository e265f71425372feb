//! Testing utilities for users of the recur library.
//!
//! This module provides helpers for testing scheduled callbacks:
//!
//! - [`CallbackProbe`]: counts invocations and records whether the body
//!   observed a cancelled signal
//! - [`CallbackProbe::slow_callback`]: simulates a slow invocation body
//!   for exercising in-flight cancellation behavior

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::scheduler::BoxFuture;

/// Records invocations of a scheduled callback.
///
/// The probe hands out callbacks suitable for [`Timer::start`] and keeps a
/// shared invocation count that tests can poll.
///
/// # Example
///
/// ```
/// use recur::testing::CallbackProbe;
/// use recur::Timer;
/// use std::time::Duration;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), recur::TimerError> {
/// let timer = Timer::new();
/// let probe = CallbackProbe::new();
///
/// let _handle = timer.start(probe.callback(), Duration::from_millis(5), Timer::ONCE)?;
/// probe.wait_for_count(1, Duration::from_secs(1)).await;
/// assert_eq!(probe.count(), 1);
/// # Ok(())
/// # }
/// ```
///
/// [`Timer::start`]: crate::Timer::start
pub struct CallbackProbe {
    invocations: Arc<AtomicU32>,
    observed_cancelled: Arc<AtomicBool>,
}

impl CallbackProbe {
    /// Create a probe with a zero invocation count.
    pub fn new() -> Self {
        Self {
            invocations: Arc::new(AtomicU32::new(0)),
            observed_cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// A callback that bumps the invocation count and records whether the
    /// signal it received was already cancelled.
    pub fn callback(
        &self,
    ) -> impl Fn(CancellationToken) -> BoxFuture + Send + Sync + 'static {
        let invocations = Arc::clone(&self.invocations);
        let observed = Arc::clone(&self.observed_cancelled);
        move |signal: CancellationToken| {
            invocations.fetch_add(1, Ordering::SeqCst);
            if signal.is_cancelled() {
                observed.store(true, Ordering::SeqCst);
            }
            Box::pin(std::future::ready(())) as BoxFuture
        }
    }

    /// A callback whose body sleeps for `busy` before counting the
    /// invocation as complete. Useful for verifying that an in-flight
    /// invocation is never interrupted by cancellation.
    pub fn slow_callback(
        &self,
        busy: Duration,
    ) -> impl Fn(CancellationToken) -> BoxFuture + Send + Sync + 'static {
        let invocations = Arc::clone(&self.invocations);
        move |_signal: CancellationToken| {
            let invocations = Arc::clone(&invocations);
            Box::pin(async move {
                tokio::time::sleep(busy).await;
                invocations.fetch_add(1, Ordering::SeqCst);
            }) as BoxFuture
        }
    }

    /// Number of invocations recorded so far.
    pub fn count(&self) -> u32 {
        self.invocations.load(Ordering::SeqCst)
    }

    /// Whether any invocation saw its signal already cancelled.
    pub fn observed_cancelled(&self) -> bool {
        self.observed_cancelled.load(Ordering::SeqCst)
    }

    /// Wait until the probe has recorded at least `expected` invocations.
    ///
    /// This is more reliable than fixed sleeps since scheduling latency
    /// can vary. Polls every 5ms.
    ///
    /// # Panics
    ///
    /// Panics if the timeout is reached first.
    pub async fn wait_for_count(&self, expected: u32, timeout: Duration) {
        let start = tokio::time::Instant::now();
        loop {
            if self.count() >= expected {
                return;
            }
            if start.elapsed() > timeout {
                panic!(
                    "Timeout waiting for {} invocations, current count: {}",
                    expected,
                    self.count()
                );
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }
}

impl Default for CallbackProbe {
    fn default() -> Self {
        Self::new()
    }
}
