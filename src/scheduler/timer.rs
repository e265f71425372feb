//! The timer façade: schedules chains, tracks live handles, cancels
//! everything on demand.
//!
//! The timer owns the only resource shared across handles: a sharded
//! concurrent set of currently-live handles, kept consistent through the
//! lifecycle hooks it wires into each handle and consulted solely by
//! [`Timer::stop`] and entangled starts.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::handle::{LifecycleHook, RequestHandle, ScheduleHooks};
use super::types::{self, into_callback, HandleId, TimerError};

/// A concurrent recurring-callback scheduler.
///
/// Each [`start`](Timer::start) launches an independent background chain
/// that waits `interval`, invokes the callback, and repeats per the
/// recurrence policy. The returned [`RequestHandle`] cancels the chain
/// (and every chain entangled to it), while [`stop`](Timer::stop) cancels
/// all handles the timer currently tracks.
///
/// Tracking-set membership is best-effort: an entry is removed when its
/// handle is cancelled, disposed, or when any of its finite chains
/// exhausts naturally, so membership may lag true chain liveness under
/// concurrency.
pub struct Timer {
    tracked: Arc<DashMap<HandleId, RequestHandle>>,
}

impl Timer {
    /// Recurrence for a single invocation.
    pub const ONCE: i32 = types::ONCE;

    /// Recurrence for a chain that repeats until cancelled.
    pub const UNLIMITED_RECURRENCE: i32 = types::UNLIMITED_RECURRENCE;

    /// Create a timer with an empty tracking set.
    pub fn new() -> Self {
        Self {
            tracked: Arc::new(DashMap::new()),
        }
    }

    /// Schedule `callback` as a new independent chain.
    ///
    /// The callback is invoked after each `interval`, `recurrence` times
    /// ([`Timer::UNLIMITED_RECURRENCE`] means until cancelled). Returns
    /// the handle controlling the chain.
    ///
    /// # Errors
    ///
    /// [`TimerError::NegativeRecurrence`] if `recurrence < 0`.
    pub fn start<F, Fut>(
        &self,
        callback: F,
        interval: Duration,
        recurrence: i32,
    ) -> Result<RequestHandle, TimerError>
    where
        F: Fn(CancellationToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        validate_recurrence(recurrence)?;

        let handle = RequestHandle::new();
        let hooks = ScheduleHooks {
            on_schedule: Some(self.track_hook(&handle)),
            on_cancel: Some(self.untrack_hook(&handle)),
            on_dispose: Some(self.untrack_hook(&handle)),
            on_complete: Some(self.untrack_hook(&handle)),
        };
        handle.schedule(into_callback(callback), interval, recurrence, hooks)?;
        debug!(handle = %handle.id(), "started new chain");
        Ok(handle)
    }

    /// Schedule `callback` as a chain entangled to an existing handle.
    ///
    /// The new chain shares `handle`'s cancellation signal: cancelling or
    /// disposing the handle cancels every entangled chain together.
    ///
    /// The presence check below and the schedule are not atomic with
    /// respect to a concurrent cancel or stop on the same handle: a chain
    /// scheduled in that window only ever observes an already-cancelled
    /// signal and never fires.
    ///
    /// # Errors
    ///
    /// [`TimerError::NegativeRecurrence`] if `recurrence < 0`;
    /// [`TimerError::HandleNotTracked`] if the handle is not currently in
    /// the tracking set (already cancelled, disposed, or started on a
    /// different timer); [`TimerError::HandleDisposed`] if the handle is
    /// disposed between the presence check and the schedule.
    pub fn start_entangled<F, Fut>(
        &self,
        callback: F,
        handle: &RequestHandle,
        interval: Duration,
        recurrence: i32,
    ) -> Result<(), TimerError>
    where
        F: Fn(CancellationToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        validate_recurrence(recurrence)?;
        if !self.tracked.contains_key(&handle.id()) {
            return Err(TimerError::HandleNotTracked);
        }

        // Already tracked, so no add hook; the extra remove hooks are
        // idempotent against the ones the original start registered.
        let hooks = ScheduleHooks {
            on_cancel: Some(self.untrack_hook(handle)),
            on_complete: Some(self.untrack_hook(handle)),
            ..ScheduleHooks::default()
        };
        handle.schedule(into_callback(callback), interval, recurrence, hooks)?;
        debug!(handle = %handle.id(), "started entangled chain");
        Ok(())
    }

    /// Request cancellation of every chain entangled to `handle`.
    ///
    /// Always safe to call from any thread at any time: repeated or late
    /// cancellation is a no-op.
    pub fn cancel(&self, handle: &RequestHandle) {
        let _ = handle.try_cancel();
    }

    /// Best-effort cancellation of every currently tracked handle.
    ///
    /// Takes a snapshot of the tracking set, then cancels each handle in
    /// it. There is no global lock against concurrent [`start`](Timer::start)
    /// calls: a handle created concurrently with `stop` may or may not be
    /// in the snapshot. Every handle that is in the snapshot is cancelled.
    pub fn stop(&self) {
        // Collect before cancelling: the cancel hooks remove entries from
        // the same shards the iterator would otherwise hold locked.
        let snapshot: Vec<RequestHandle> = self
            .tracked
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        debug!(handles = snapshot.len(), "stopping all tracked handles");
        for handle in snapshot {
            let _ = handle.try_cancel();
        }
    }

    /// Whether `handle` is currently present in the tracking set.
    pub fn is_tracked(&self, handle: &RequestHandle) -> bool {
        self.tracked.contains_key(&handle.id())
    }

    /// Number of handles currently tracked.
    pub fn tracked_count(&self) -> usize {
        self.tracked.len()
    }

    fn track_hook(&self, handle: &RequestHandle) -> LifecycleHook {
        let tracked = Arc::clone(&self.tracked);
        let handle = handle.clone();
        Box::new(move || {
            tracked.insert(handle.id(), handle);
        })
    }

    fn untrack_hook(&self, handle: &RequestHandle) -> LifecycleHook {
        let tracked = Arc::clone(&self.tracked);
        let id = handle.id();
        Box::new(move || {
            tracked.remove(&id);
        })
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}

fn validate_recurrence(recurrence: i32) -> Result<(), TimerError> {
    if recurrence < 0 {
        return Err(TimerError::NegativeRecurrence(recurrence));
    }
    Ok(())
}
