use std::collections::HashMap;

use tracing::{debug, warn};

use super::backend::{FetchBackend, FetchJob};
use super::types::{AssetKind, AssetRequest, LoadResult, LoadState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(pub u64);

type CompletionHandler<C> = Box<dyn FnOnce(&mut C, &mut ResourceLoader<C>, LoadResult)>;

struct LoadTask<C> {
    request: AssetRequest,
    on_complete: CompletionHandler<C>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoaderStats {
    pub issued: u64,
    pub loaded: u64,
    pub failed: u64,
    pub duplicate_completions: u64,
}

/// Issues loads and runs their completion handlers on the caller's turn.
///
/// `C` is the state handlers mutate. Handlers also receive the loader so a
/// completion can issue dependent loads; those never complete within the
/// same [`dispatch_completions`](Self::dispatch_completions) call.
pub struct ResourceLoader<C> {
    backend: Box<dyn FetchBackend>,
    next_task_id: u64,
    pending: HashMap<TaskId, LoadTask<C>>,
    settled: HashMap<TaskId, LoadState>,
    stats: LoaderStats,
}

impl<C> ResourceLoader<C> {
    pub fn new(backend: Box<dyn FetchBackend>) -> Self {
        Self {
            backend,
            next_task_id: 1,
            pending: HashMap::new(),
            settled: HashMap::new(),
            stats: LoaderStats::default(),
        }
    }

    pub fn load<F>(&mut self, kind: AssetKind, path: impl Into<String>, on_complete: F) -> TaskId
    where
        F: FnOnce(&mut C, &mut ResourceLoader<C>, LoadResult) + 'static,
    {
        let task_id = TaskId(self.next_task_id);
        self.next_task_id = self.next_task_id.saturating_add(1);
        let request = AssetRequest::new(kind, path);
        debug!(task = task_id.0, kind = %kind, path = %request.path, "load_issued");

        self.pending.insert(
            task_id,
            LoadTask {
                request: request.clone(),
                on_complete: Box::new(on_complete),
            },
        );
        self.stats.issued = self.stats.issued.saturating_add(1);
        self.backend.submit(FetchJob { task_id, request });
        task_id
    }

    /// Runs the handler of every task the backend has finished since the last
    /// call. Returns how many handlers ran.
    pub fn dispatch_completions(&mut self, ctx: &mut C) -> usize {
        let finished = self.backend.poll_completed();
        let mut ready = Vec::with_capacity(finished.len());
        for done in finished {
            match self.pending.remove(&done.task_id) {
                Some(task) => ready.push((done.task_id, task, done.result)),
                None => {
                    self.stats.duplicate_completions =
                        self.stats.duplicate_completions.saturating_add(1);
                    warn!(
                        task = done.task_id.0,
                        settled = ?self.settled.get(&done.task_id),
                        "load_completion_dropped_unknown_or_duplicate"
                    );
                }
            }
        }

        let handled = ready.len();
        for (task_id, task, result) in ready {
            let state = match &result {
                Ok(_) => {
                    self.stats.loaded = self.stats.loaded.saturating_add(1);
                    LoadState::Loaded
                }
                Err(failure) => {
                    self.stats.failed = self.stats.failed.saturating_add(1);
                    warn!(
                        task = task_id.0,
                        kind = %task.request.kind,
                        path = %task.request.path,
                        error = %failure,
                        "load_failed"
                    );
                    LoadState::Failed
                }
            };
            self.settled.insert(task_id, state);
            (task.on_complete)(ctx, self, result);
        }
        handled
    }

    pub fn state(&self, task_id: TaskId) -> Option<LoadState> {
        if self.pending.contains_key(&task_id) {
            return Some(LoadState::Pending);
        }
        self.settled.get(&task_id).copied()
    }

    pub fn in_flight(&self) -> usize {
        self.pending.len()
    }

    pub fn stats(&self) -> LoaderStats {
        self.stats
    }
}
