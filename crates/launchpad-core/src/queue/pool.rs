//! Worker pool sizing.
//!
//! Runs under the queue monitor after every deque mutation and every target
//! change:
//! 1. prune exited workers,
//! 2. spawn until the non-retiring workers reach the target,
//! 3. mark the first excess non-retiring workers (roster order) to retire.
//!
//! A retiring worker finishes the entry it holds before exiting, so shrinking
//! never abandons a transfer.

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use super::worker::{self, WorkerPhase};
use super::{QueueState, Shared};

pub(crate) struct WorkerSlot {
    pub(crate) id: usize,
    pub(crate) retiring: bool,
    pub(crate) busy: bool,
    pub(crate) exited: bool,
    pub(crate) phase: WorkerPhase,
    handle: Option<JoinHandle<()>>,
}

/// Roster summary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Live workers (not yet exited).
    pub workers: usize,
    /// Live workers not marked for retirement.
    pub active: usize,
    /// Live workers marked for retirement.
    pub retiring: usize,
    /// Workers currently executing an entry.
    pub busy: usize,
    /// Workers spawned over the queue's lifetime.
    pub spawned_total: usize,
}

fn active(state: &QueueState) -> usize {
    state
        .roster
        .iter()
        .filter(|s| !s.exited && !s.retiring)
        .count()
}

/// Moves exited workers' handles out of the roster.
pub(crate) fn prune(state: &mut QueueState) {
    let mut kept = Vec::with_capacity(state.roster.len());
    for slot in state.roster.drain(..) {
        if slot.exited {
            if let Some(h) = slot.handle {
                state.reaped.push(h);
            }
        } else {
            kept.push(slot);
        }
    }
    state.roster = kept;
    // Finished threads need no join; dropping the handle is enough.
    state.reaped.retain(|h| !h.is_finished());
}

pub(crate) fn evaluate(shared: &Arc<Shared>, state: &mut QueueState) {
    prune(state);

    while active(state) < state.target {
        let id = state.next_worker_id;
        state.next_worker_id += 1;
        let worker_shared = Arc::clone(shared);
        let spawned = thread::Builder::new()
            .name(format!("download-worker-{}", id))
            .spawn(move || worker::run(worker_shared, id));
        match spawned {
            Ok(handle) => {
                state.roster.push(WorkerSlot {
                    id,
                    retiring: false,
                    busy: false,
                    exited: false,
                    phase: WorkerPhase::Idle,
                    handle: Some(handle),
                });
                state.spawned_total += 1;
                tracing::debug!(worker = id, target = state.target, "spawned download worker");
            }
            Err(e) => {
                tracing::warn!("could not spawn download worker: {}", e);
                break;
            }
        }
    }

    let mut excess = active(state).saturating_sub(state.target);
    if excess > 0 {
        for slot in state.roster.iter_mut() {
            if excess == 0 {
                break;
            }
            if !slot.exited && !slot.retiring {
                slot.retiring = true;
                excess -= 1;
                tracing::debug!(worker = slot.id, busy = slot.busy, "worker marked for retirement");
            }
        }
    }
}

pub(crate) fn stats(state: &QueueState) -> PoolStats {
    let live = state.roster.iter().filter(|s| !s.exited);
    let mut stats = PoolStats {
        spawned_total: state.spawned_total,
        ..PoolStats::default()
    };
    for slot in live {
        stats.workers += 1;
        if slot.retiring {
            stats.retiring += 1;
        } else {
            stats.active += 1;
        }
        if slot.busy {
            stats.busy += 1;
        }
    }
    stats
}
