//! Download queue and its worker pool.
//!
//! A [`DownloadQueue`] owns a deque of entries, two observable counters and a
//! roster of worker threads. Every mutation runs under one monitor and, in
//! that same critical section, recomputes the counters and re-evaluates the
//! pool size. Transfers, installs and launches run in the workers outside it.
//!
//! There is no global FIFO guarantee once more than one worker is active:
//! entries leave the deque in order but may finish in any order.

mod entry;
mod guard;
mod pool;
mod worker;

use std::collections::VecDeque;
use std::sync::{mpsc, Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

pub use entry::{DownloadQueueEntry, EntryBuilder};
pub use pool::PoolStats;
pub use worker::{DownloadContext, WorkerPhase};

use pool::WorkerSlot;

/// Point-in-time counter values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueCounts {
    /// Entries waiting in the deque.
    pub queued: usize,
    /// `queued` plus entries currently being executed by a worker.
    pub total_in_flight: usize,
}

pub(crate) struct QueueState {
    entries: VecDeque<Arc<DownloadQueueEntry>>,
    counts: QueueCounts,
    target: usize,
    roster: Vec<WorkerSlot>,
    next_worker_id: usize,
    spawned_total: usize,
    /// Handles of exited workers, joined by `wait_idle`.
    reaped: Vec<JoinHandle<()>>,
    subscribers: Vec<mpsc::Sender<QueueCounts>>,
}

impl QueueState {
    fn new(target: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            counts: QueueCounts::default(),
            target,
            roster: Vec::new(),
            next_worker_id: 1,
            spawned_total: 0,
            reaped: Vec::new(),
            subscribers: Vec::new(),
        }
    }

    /// Recomputes both counters from the deque and roster; subscribers hear
    /// about it only when a value actually changed.
    fn recompute(&mut self) {
        let busy = self.roster.iter().filter(|s| s.busy).count();
        let counts = QueueCounts {
            queued: self.entries.len(),
            total_in_flight: self.entries.len() + busy,
        };
        if counts != self.counts {
            self.counts = counts;
            self.subscribers.retain(|tx| tx.send(counts).is_ok());
        }
    }

    /// Nothing queued and no worker holding an entry. Parked workers may
    /// still be alive.
    fn is_idle(&self) -> bool {
        self.entries.is_empty() && self.roster.iter().all(|s| s.exited || !s.busy)
    }

    fn all_exited(&self) -> bool {
        self.roster.iter().all(|s| s.exited)
    }

    fn slot_mut(&mut self, id: usize) -> Option<&mut WorkerSlot> {
        self.roster.iter_mut().find(|s| s.id == id)
    }
}

pub(crate) struct Shared {
    state: Mutex<QueueState>,
    changed: Condvar,
    context: DownloadContext,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn wait_until(
        &self,
        mut ready: impl FnMut(&QueueState) -> bool,
    ) -> MutexGuard<'_, QueueState> {
        let mut state = self.lock();
        while !ready(&*state) {
            state = self
                .changed
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
        state
    }
}

/// Shared, thread-safe download queue. Clones refer to the same queue; when
/// the last clone is dropped the workers retire after their current entry.
#[derive(Clone)]
pub struct DownloadQueue {
    shared: Arc<Shared>,
    _owner: Arc<RetireOnDrop>,
}

impl DownloadQueue {
    /// New empty queue. Workers are spawned by the first mutation or target
    /// change and then stay parked on the queue until they are retired.
    pub fn new(context: DownloadContext, target_parallelism: usize) -> Self {
        let shared = Arc::new(Shared {
            state: Mutex::new(QueueState::new(target_parallelism)),
            changed: Condvar::new(),
            context,
        });
        Self {
            _owner: Arc::new(RetireOnDrop {
                shared: Arc::clone(&shared),
            }),
            shared,
        }
    }

    /// Mutate the deque, then recompute counters, then re-evaluate the pool,
    /// all in one critical section.
    fn mutate<R>(&self, f: impl FnOnce(&mut VecDeque<Arc<DownloadQueueEntry>>) -> R) -> R {
        let mut state = self.shared.lock();
        let result = f(&mut state.entries);
        state.recompute();
        pool::evaluate(&self.shared, &mut state);
        self.shared.changed.notify_all();
        result
    }

    /// Append. Duplicates are accepted: each entry is its own unit of work.
    pub fn enqueue(&self, entry: Arc<DownloadQueueEntry>) {
        tracing::debug!(app = entry.app(), "enqueue");
        self.mutate(|q| q.push_back(entry));
    }

    /// Prepend, so the entry is the next one pulled.
    pub fn enqueue_front(&self, entry: Arc<DownloadQueueEntry>) {
        tracing::debug!(app = entry.app(), "enqueue at front");
        self.mutate(|q| q.push_front(entry));
    }

    pub fn remove_head(&self) -> Option<Arc<DownloadQueueEntry>> {
        self.mutate(|q| q.pop_front())
    }

    pub fn remove_tail(&self) -> Option<Arc<DownloadQueueEntry>> {
        self.mutate(|q| q.pop_back())
    }

    /// Removes this exact entry (pointer identity). False if it is not queued,
    /// e.g. because a worker already pulled it.
    pub fn remove(&self, entry: &Arc<DownloadQueueEntry>) -> bool {
        self.mutate(|q| match q.iter().position(|e| Arc::ptr_eq(e, entry)) {
            Some(i) => q.remove(i).is_some(),
            None => false,
        })
    }

    /// Removes every queued entry matching `pred`, returning them in queue order.
    pub fn remove_matching(
        &self,
        mut pred: impl FnMut(&DownloadQueueEntry) -> bool,
    ) -> Vec<Arc<DownloadQueueEntry>> {
        self.mutate(|q| {
            let mut removed = Vec::new();
            let mut kept = VecDeque::with_capacity(q.len());
            for e in q.drain(..) {
                if pred(&e) {
                    removed.push(e);
                } else {
                    kept.push_back(e);
                }
            }
            *q = kept;
            removed
        })
    }

    pub fn clear(&self) -> Vec<Arc<DownloadQueueEntry>> {
        self.mutate(|q| q.drain(..).collect())
    }

    pub fn peek_head(&self) -> Option<Arc<DownloadQueueEntry>> {
        self.shared.lock().entries.front().cloned()
    }

    pub fn peek_tail(&self) -> Option<Arc<DownloadQueueEntry>> {
        self.shared.lock().entries.back().cloned()
    }

    pub fn contains(&self, entry: &Arc<DownloadQueueEntry>) -> bool {
        self.shared
            .lock()
            .entries
            .iter()
            .any(|e| Arc::ptr_eq(e, entry))
    }

    /// Snapshot of the queued entries, head first.
    pub fn entries(&self) -> Vec<Arc<DownloadQueueEntry>> {
        self.shared.lock().entries.iter().cloned().collect()
    }

    pub fn queued_count(&self) -> usize {
        self.shared.lock().counts.queued
    }

    pub fn total_in_flight_count(&self) -> usize {
        self.shared.lock().counts.total_in_flight
    }

    pub fn counts(&self) -> QueueCounts {
        self.shared.lock().counts
    }

    pub fn target_parallelism(&self) -> usize {
        self.shared.lock().target
    }

    /// Changes the desired worker count and re-evaluates the pool right away.
    /// Growing spawns workers; shrinking marks workers to retire after their
    /// current entry. In-flight transfers are never cancelled by a shrink.
    pub fn set_target_parallelism(&self, n: usize) {
        let mut state = self.shared.lock();
        tracing::debug!(from = state.target, to = n, "target parallelism changed");
        state.target = n;
        pool::evaluate(&self.shared, &mut state);
        self.shared.changed.notify_all();
    }

    /// Receives every counter change. The current value is sent immediately.
    pub fn subscribe(&self) -> mpsc::Receiver<QueueCounts> {
        let (tx, rx) = mpsc::channel();
        let mut state = self.shared.lock();
        let _ = tx.send(state.counts);
        state.subscribers.push(tx);
        rx
    }

    /// Cancels an entry. A still-queued entry is removed and reported as
    /// cancelled here (returns true); one already pulled by a worker is
    /// flagged and the worker aborts it at its next checkpoint.
    pub fn cancel(&self, entry: &Arc<DownloadQueueEntry>) -> bool {
        entry.sink().cancel_requested();
        entry.cancel_token().cancel();
        if self.remove(entry) {
            tracing::info!(app = entry.app(), "cancelled before start");
            entry.sink().operation_canceled();
            entry.sink().hidden();
            true
        } else {
            false
        }
    }

    pub fn pool_stats(&self) -> PoolStats {
        pool::stats(&self.shared.lock())
    }

    /// Live workers, retiring ones included.
    pub fn worker_count(&self) -> usize {
        self.pool_stats().workers
    }

    pub fn active_worker_count(&self) -> usize {
        self.pool_stats().active
    }

    /// Phase of every live worker, in roster order.
    pub fn worker_phases(&self) -> Vec<(usize, WorkerPhase)> {
        self.shared
            .lock()
            .roster
            .iter()
            .filter(|s| !s.exited)
            .map(|s| (s.id, s.phase))
            .collect()
    }

    /// Blocks until nothing is queued or in flight, then joins the worker
    /// threads that have already exited. Idle workers stay parked. With a
    /// target of zero and entries still queued this waits until the target
    /// is raised.
    pub fn wait_idle(&self) {
        let handles = {
            let mut state = self.shared.wait_until(QueueState::is_idle);
            pool::prune(&mut state);
            std::mem::take(&mut state.reaped)
        };
        join_all(handles);
    }

    /// Like [`wait_idle`](Self::wait_idle) but gives up after `timeout`.
    /// Returns true if the queue went idle.
    pub fn wait_idle_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let handles = {
            let mut state = self.shared.lock();
            while !state.is_idle() {
                let now = Instant::now();
                if now >= deadline {
                    return false;
                }
                state = self
                    .shared
                    .changed
                    .wait_timeout(state, deadline - now)
                    .unwrap_or_else(PoisonError::into_inner)
                    .0;
            }
            pool::prune(&mut state);
            std::mem::take(&mut state.reaped)
        };
        join_all(handles);
        true
    }

    /// Drops queued entries, retires every worker and joins them once their
    /// in-flight entries finish. Returns the entries that never started.
    pub fn shutdown(&self) -> Vec<Arc<DownloadQueueEntry>> {
        let dropped = self.clear();
        self.set_target_parallelism(0);
        let handles = {
            let mut state = self.shared.wait_until(QueueState::all_exited);
            pool::prune(&mut state);
            std::mem::take(&mut state.reaped)
        };
        join_all(handles);
        tracing::debug!(dropped = dropped.len(), "download queue shut down");
        dropped
    }
}

/// Held by every [`DownloadQueue`] clone. Workers only hold [`Shared`], so
/// this drops with the last user handle and retires the parked workers.
struct RetireOnDrop {
    shared: Arc<Shared>,
}

impl Drop for RetireOnDrop {
    fn drop(&mut self) {
        let mut state = self.shared.lock();
        state.target = 0;
        pool::evaluate(&self.shared, &mut state);
        self.shared.changed.notify_all();
    }
}

fn join_all(handles: Vec<JoinHandle<()>>) {
    for h in handles {
        if h.join().is_err() {
            tracing::warn!("download worker panicked");
        }
    }
}
