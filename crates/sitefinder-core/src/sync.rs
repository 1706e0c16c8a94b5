// ── Short critical sections ──
//
// Business state that synchronous callers (enqueue, panel transitions,
// projection edits) must touch sits behind `std::sync::Mutex`. Guards are
// never held across an await.

use std::sync::{Mutex, MutexGuard};

/// Lock `mutex`. A poisoned lock means a panic while state was half
/// updated; carrying on would hide it.
pub(crate) fn locked<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().expect("state lock poisoned")
}
