//! Request handles for controlling scheduled callback chains.
//!
//! A handle owns the cancellation signal shared by every chain entangled
//! to it, plus the lifecycle hooks the timer wires against its tracking
//! set. All state transitions on one handle are serialized by a private
//! lock; the lock is never held across an await point.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::repeat::spawn_repeat;
use super::types::{Callback, HandleId, TimerError};

/// A lifecycle hook registered against a handle. Fires at most once.
pub(crate) type LifecycleHook = Box<dyn FnOnce() + Send>;

/// Hooks wired into a handle at schedule time.
///
/// Injected by the [`Timer`](super::Timer) to keep its tracking set
/// consistent with handle lifecycle; every field is optional.
#[derive(Default)]
pub(crate) struct ScheduleHooks {
    /// Invoked immediately, under the handle lock, before the loop spawns.
    pub on_schedule: Option<LifecycleHook>,
    /// Fires when the cancellation signal is set.
    pub on_cancel: Option<LifecycleHook>,
    /// Fires when the handle is disposed.
    pub on_dispose: Option<LifecycleHook>,
    /// Fires when a finite chain exhausts its recurrence naturally.
    pub on_complete: Option<LifecycleHook>,
}

/// Interior handle state.
///
/// There is no separate `Cancelled` variant: an `Active` handle whose
/// signal is set reads as cancelled. `Disposed` is terminal; moving into
/// it consumes the signal and the remaining hooks exactly once.
enum HandleState {
    Active {
        signal: CancellationToken,
        cancel_hooks: Vec<LifecycleHook>,
        dispose_hooks: Vec<LifecycleHook>,
    },
    Disposed,
}

/// An opaque token identifying one or more scheduled callback chains.
///
/// Returned by [`Timer::start`](super::Timer::start) and passed back for
/// cancellation and entangled scheduling. Clones share the same interior:
/// cancelling or disposing through any clone affects every chain entangled
/// to the handle. Equality and hashing are by handle identity, never by
/// state.
#[derive(Clone)]
pub struct RequestHandle {
    id: HandleId,
    state: Arc<Mutex<HandleState>>,
}

impl RequestHandle {
    /// Create a handle in the `Active` state with a fresh cancellation
    /// signal. No side effects visible outside the handle.
    pub(crate) fn new() -> Self {
        Self {
            id: HandleId::new(),
            state: Arc::new(Mutex::new(HandleState::Active {
                signal: CancellationToken::new(),
                cancel_hooks: Vec::new(),
                dispose_hooks: Vec::new(),
            })),
        }
    }

    /// The handle's unique identity.
    pub fn id(&self) -> HandleId {
        self.id
    }

    fn lock(&self) -> MutexGuard<'_, HandleState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Schedule a chain bound to this handle's cancellation signal.
    ///
    /// Hook registration, the immediate `on_schedule` call, and the loop
    /// spawn happen in one critical section, so a racing `dispose` either
    /// rejects the chain or sees it fully wired.
    pub(crate) fn schedule(
        &self,
        callback: Callback,
        interval: Duration,
        recurrence: i32,
        hooks: ScheduleHooks,
    ) -> Result<(), TimerError> {
        let mut state = self.lock();
        match &mut *state {
            HandleState::Disposed => Err(TimerError::HandleDisposed),
            HandleState::Active {
                signal,
                cancel_hooks,
                dispose_hooks,
            } => {
                if let Some(hook) = hooks.on_cancel {
                    cancel_hooks.push(hook);
                }
                if let Some(hook) = hooks.on_dispose {
                    dispose_hooks.push(hook);
                }
                if let Some(hook) = hooks.on_schedule {
                    hook();
                }
                spawn_repeat(
                    callback,
                    interval,
                    recurrence,
                    signal.clone(),
                    hooks.on_complete,
                );
                debug!(handle = %self.id, ?interval, recurrence, "chain scheduled");
                Ok(())
            }
        }
    }

    /// Attempt to cancel every chain entangled to this handle.
    ///
    /// Returns `false` without effect if the handle is disposed or the
    /// signal is already set. On the first successful call the signal is
    /// set (it is never unset afterwards) and the registered cancel hooks
    /// fire.
    pub fn try_cancel(&self) -> bool {
        let mut state = self.lock();
        match &mut *state {
            HandleState::Disposed => false,
            HandleState::Active {
                signal,
                cancel_hooks,
                ..
            } => {
                if signal.is_cancelled() {
                    return false;
                }
                signal.cancel();
                for hook in cancel_hooks.drain(..) {
                    hook();
                }
                debug!(handle = %self.id, "cancelled");
                true
            }
        }
    }

    /// Release the resources associated with this handle.
    ///
    /// Idempotent. Fires the registered dispose hooks exactly once and
    /// drops the handle's cancellation signal. Chains already running keep
    /// their own clones of the signal, so disposal does not cancel them.
    /// A disposed handle can still be passed around but rejects further
    /// scheduling and reports `false` from [`try_cancel`](Self::try_cancel).
    pub fn dispose(&self) {
        let mut state = self.lock();
        if let HandleState::Active { dispose_hooks, .. } =
            std::mem::replace(&mut *state, HandleState::Disposed)
        {
            for hook in dispose_hooks {
                hook();
            }
            debug!(handle = %self.id, "disposed");
        }
    }

    /// Whether the cancellation signal has been set.
    ///
    /// Reports `false` once disposed: disposal discards the signal.
    pub fn is_cancelled(&self) -> bool {
        match &*self.lock() {
            HandleState::Active { signal, .. } => signal.is_cancelled(),
            HandleState::Disposed => false,
        }
    }

    /// Whether the handle has been disposed.
    pub fn is_disposed(&self) -> bool {
        matches!(&*self.lock(), HandleState::Disposed)
    }
}

impl fmt::Debug for RequestHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestHandle")
            .field("id", &self.id)
            .field("disposed", &self.is_disposed())
            .finish_non_exhaustive()
    }
}

impl PartialEq for RequestHandle {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for RequestHandle {}

impl Hash for RequestHandle {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}
