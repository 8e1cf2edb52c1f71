//! Single-slot, overwrite-on-arrival hand-off between one producer and one consumer.

use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

struct SlotState<T> {
    value: Option<T>,
    published: u64,
    overwritten: u64,
}

/// Publication counters of a [`FrameSlot`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SlotCounts {
    /// Values handed to [`FrameSlot::publish`].
    pub published: u64,
    /// Values replaced before anyone claimed them.
    pub overwritten: u64,
}

/// Holds at most one value: the freshest one published and not yet grabbed.
///
/// `publish` always replaces the current value; `try_grab` blocks on a
/// condition variable until a value is present or the timeout elapses, then
/// takes it, leaving the slot empty. The slot starts empty.
pub struct FrameSlot<T> {
    state: Mutex<SlotState<T>>,
    ready: Condvar,
}

impl<T> FrameSlot<T> {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(SlotState {
                value: None,
                published: 0,
                overwritten: 0,
            }),
            ready: Condvar::new(),
        }
    }

    // A panic while holding the lock cannot leave `SlotState` half-updated,
    // so a poisoned mutex is still safe to use.
    fn lock(&self) -> MutexGuard<'_, SlotState<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Store `value`, dropping any unclaimed predecessor, and wake one waiter.
    ///
    /// Returns `true` if an unclaimed value was replaced.
    pub fn publish(&self, value: T) -> bool {
        let replaced = {
            let mut state = self.lock();
            let replaced = state.value.replace(value).is_some();
            state.published += 1;
            if replaced {
                state.overwritten += 1;
            }
            replaced
        };
        self.ready.notify_one();
        replaced
    }

    /// Wait up to `timeout` for a value and take it.
    ///
    /// Spurious wake-ups are absorbed by re-checking the slot; `None` means the
    /// timeout elapsed with the slot still empty.
    pub fn try_grab(&self, timeout: Duration) -> Option<T> {
        let guard = self.lock();
        let (mut state, _) = self
            .ready
            .wait_timeout_while(guard, timeout, |s| s.value.is_none())
            .unwrap_or_else(PoisonError::into_inner);
        state.value.take()
    }

    /// True iff an unclaimed value is present.
    pub fn is_ready(&self) -> bool {
        self.lock().value.is_some()
    }

    pub fn counts(&self) -> SlotCounts {
        let state = self.lock();
        SlotCounts {
            published: state.published,
            overwritten: state.overwritten,
        }
    }
}

impl<T> Default for FrameSlot<T> {
    fn default() -> Self {
        Self::new()
    }
}
