//! RAII guard that signs a worker out of the roster when its thread ends.

use std::sync::Arc;

use super::worker::WorkerPhase;
use super::{pool, Shared};

/// Marks the worker exited when dropped, including on panic, so the counters
/// and `wait_idle` never wait on a dead thread.
pub(super) struct ExitGuard<'a> {
    pub(super) shared: &'a Arc<Shared>,
    pub(super) id: usize,
}

impl Drop for ExitGuard<'_> {
    fn drop(&mut self) {
        let mut state = self.shared.lock();
        let Some(slot) = state.slot_mut(self.id) else {
            return;
        };
        if slot.exited {
            return;
        }
        slot.exited = true;
        slot.busy = false;
        slot.phase = WorkerPhase::Retired;
        state.recompute();
        if std::thread::panicking() {
            tracing::warn!(worker = self.id, "download worker panicked; re-evaluating pool");
            pool::evaluate(self.shared, &mut state);
        }
        self.shared.changed.notify_all();
    }
}
