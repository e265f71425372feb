//! The background repeat loop driving one callback chain.
//!
//! Each scheduled chain runs as an independent tokio task: wait the
//! configured interval, invoke the callback, repeat per the recurrence
//! policy. Cancellation is checked only at the wait boundary before each
//! invocation; an invocation already started always runs to completion.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::trace;

use super::handle::LifecycleHook;
use super::types::{Callback, UNLIMITED_RECURRENCE};

/// Wait one interval on the chain's signal.
///
/// Returns `false` if cancellation was observed during the wait; the
/// callback must not be invoked in that case. The cancellation branch is
/// polled first so a zero interval cannot mask a signal that is already
/// set.
async fn wait_boundary(signal: &CancellationToken, interval: Duration) -> bool {
    tokio::select! {
        biased;
        _ = signal.cancelled() => false,
        _ = tokio::time::sleep(interval) => true,
    }
}

/// Spawn the repeat loop for one chain.
///
/// `on_complete` fires only when a finite recurrence exhausts naturally.
/// A cancelled chain exits silently, since cancellation already ran its
/// own hooks.
pub(crate) fn spawn_repeat(
    callback: Callback,
    interval: Duration,
    recurrence: i32,
    signal: CancellationToken,
    on_complete: Option<LifecycleHook>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        if recurrence == UNLIMITED_RECURRENCE {
            loop {
                if !wait_boundary(&signal, interval).await {
                    trace!("unlimited chain cancelled at wait boundary");
                    return;
                }
                callback(signal.clone()).await;
            }
        } else {
            for iteration in 0..recurrence {
                if !wait_boundary(&signal, interval).await {
                    trace!(iteration, "finite chain cancelled at wait boundary");
                    return;
                }
                callback(signal.clone()).await;
            }
            if let Some(hook) = on_complete {
                hook();
            }
        }
    })
}
