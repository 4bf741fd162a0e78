//! Reentrancy guards
//!
//! The original design used bare booleans in a single-threaded event
//! loop. Under real threads the same critical sections are guarded by
//! atomic compare-and-swap, with RAII tokens so every exit path releases
//! the flag.

use std::sync::atomic::{AtomicBool, Ordering};

/// Set while a hard reset or restore is quiescing the store.
///
/// The save pipeline and both backup schedulers check this before any
/// store access and skip their cycle while it is up, so nothing races
/// writes against a store mid-deletion.
#[derive(Default)]
pub struct ResetGuard {
    flag: AtomicBool,
}

impl ResetGuard {
    /// Whether a reset is currently in progress
    pub fn in_progress(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Try to start a reset. Returns `None` if one is already running.
    pub fn begin(&self) -> Option<ResetToken<'_>> {
        if self
            .flag
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return None;
        }
        Some(ResetToken { flag: &self.flag })
    }
}

/// Held for the duration of a reset; clears the flag on drop.
pub struct ResetToken<'a> {
    flag: &'a AtomicBool,
}

impl Drop for ResetToken<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

/// Single-run guard for the remote syncer.
///
/// `try_acquire` wins at most once until the returned token drops, so a
/// manual "sync now" and the scheduled run can never push concurrently.
#[derive(Default)]
pub struct InFlightGuard {
    flag: AtomicBool,
}

impl InFlightGuard {
    /// Try to claim the in-flight slot
    pub fn try_acquire(&self) -> Option<InFlightToken<'_>> {
        if self
            .flag
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return None;
        }
        Some(InFlightToken { flag: &self.flag })
    }

    /// Whether a run currently holds the slot
    pub fn is_in_flight(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Held for the duration of one run; clears the flag on drop.
pub struct InFlightToken<'a> {
    flag: &'a AtomicBool,
}

impl Drop for InFlightToken<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}
