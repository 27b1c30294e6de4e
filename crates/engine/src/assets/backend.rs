use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::{mpsc, Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};

use thiserror::Error;
use tracing::{debug, warn};

use super::decode::fetch_and_decode;
use super::loader::TaskId;
use super::types::{AssetRequest, LoadFailure, LoadResult, Resource};

#[derive(Debug, Clone)]
pub struct FetchJob {
    pub task_id: TaskId,
    pub request: AssetRequest,
}

#[derive(Debug)]
pub struct FetchDone {
    pub task_id: TaskId,
    pub result: LoadResult,
}

/// Performs fetch+parse work outside the main loop turn.
pub trait FetchBackend {
    fn submit(&mut self, job: FetchJob);
    /// Returns finished jobs without blocking.
    fn poll_completed(&mut self) -> Vec<FetchDone>;
}

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("failed to spawn asset loader worker {index}: {source}")]
    SpawnWorker {
        index: usize,
        #[source]
        source: std::io::Error,
    },
}

pub struct ThreadedBackend {
    job_tx: Option<mpsc::Sender<FetchJob>>,
    done_rx: mpsc::Receiver<FetchDone>,
    workers: Vec<JoinHandle<()>>,
    in_flight: HashMap<TaskId, String>,
}

impl ThreadedBackend {
    pub fn new(asset_root: PathBuf, worker_count: usize) -> Result<Self, BackendError> {
        let (job_tx, job_rx) = mpsc::channel::<FetchJob>();
        let (done_tx, done_rx) = mpsc::channel::<FetchDone>();
        let job_rx = Arc::new(Mutex::new(job_rx));
        let asset_root = Arc::new(asset_root);

        let worker_count = worker_count.max(1);
        let mut workers = Vec::with_capacity(worker_count);
        for index in 0..worker_count {
            let job_rx = Arc::clone(&job_rx);
            let done_tx = done_tx.clone();
            let asset_root = Arc::clone(&asset_root);
            let handle = thread::Builder::new()
                .name(format!("asset-loader-{index}"))
                .spawn(move || worker_loop(&asset_root, &job_rx, &done_tx))
                .map_err(|source| BackendError::SpawnWorker { index, source })?;
            workers.push(handle);
        }

        Ok(Self {
            job_tx: Some(job_tx),
            done_rx,
            workers,
            in_flight: HashMap::new(),
        })
    }
}

fn worker_loop(
    asset_root: &Path,
    job_rx: &Mutex<mpsc::Receiver<FetchJob>>,
    done_tx: &mpsc::Sender<FetchDone>,
) {
    loop {
        let next = {
            let guard = job_rx.lock().unwrap_or_else(PoisonError::into_inner);
            guard.recv()
        };
        let Ok(job) = next else {
            break;
        };

        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            fetch_and_decode(asset_root, &job.request)
        }))
        .unwrap_or_else(|_| {
            Err(LoadFailure::WorkerPanicked {
                path: job.request.path.clone(),
            })
        });

        let done = FetchDone {
            task_id: job.task_id,
            result,
        };
        if done_tx.send(done).is_err() {
            break;
        }
    }
}

impl FetchBackend for ThreadedBackend {
    fn submit(&mut self, job: FetchJob) {
        let path = job.request.path.clone();
        let task_id = job.task_id;
        let sent = match &self.job_tx {
            Some(job_tx) => job_tx.send(job).is_ok(),
            None => false,
        };
        if !sent {
            warn!(path = %path, "asset_loader_submit_after_shutdown");
        }
        self.in_flight.insert(task_id, path);
    }

    fn poll_completed(&mut self) -> Vec<FetchDone> {
        let mut completed = Vec::new();
        loop {
            match self.done_rx.try_recv() {
                Ok(done) => {
                    self.in_flight.remove(&done.task_id);
                    completed.push(done);
                }
                Err(mpsc::TryRecvError::Empty) => break,
                Err(mpsc::TryRecvError::Disconnected) => {
                    // Every worker is gone; nothing in flight can finish anymore.
                    for (task_id, path) in self.in_flight.drain() {
                        completed.push(FetchDone {
                            task_id,
                            result: Err(LoadFailure::Disconnected { path }),
                        });
                    }
                    break;
                }
            }
        }
        completed
    }
}

impl Drop for ThreadedBackend {
    fn drop(&mut self) {
        self.job_tx.take();
        for worker in self.workers.drain(..) {
            if worker.join().is_err() {
                warn!("asset_loader_worker_join_failed");
            }
        }
        debug!(abandoned = self.in_flight.len(), "asset_loader_shutdown");
    }
}

#[derive(Debug, Default)]
struct ScriptedQueue {
    submitted: usize,
    open: Vec<FetchJob>,
    ready: VecDeque<FetchDone>,
}

/// Deterministic backend: nothing completes until the paired
/// [`ScriptedHandle`] says so, in whatever order the caller chooses.
#[derive(Debug)]
pub struct ScriptedBackend {
    queue: Rc<RefCell<ScriptedQueue>>,
}

#[derive(Debug, Clone)]
pub struct ScriptedHandle {
    queue: Rc<RefCell<ScriptedQueue>>,
}

impl ScriptedBackend {
    pub fn new() -> (Self, ScriptedHandle) {
        let queue = Rc::new(RefCell::new(ScriptedQueue::default()));
        (
            Self {
                queue: Rc::clone(&queue),
            },
            ScriptedHandle { queue },
        )
    }
}

impl FetchBackend for ScriptedBackend {
    fn submit(&mut self, job: FetchJob) {
        let mut queue = self.queue.borrow_mut();
        queue.submitted += 1;
        queue.open.push(job);
    }

    fn poll_completed(&mut self) -> Vec<FetchDone> {
        self.queue.borrow_mut().ready.drain(..).collect()
    }
}

impl ScriptedHandle {
    pub fn submitted_count(&self) -> usize {
        self.queue.borrow().submitted
    }

    /// Requests submitted but not yet completed, in submission order.
    pub fn open_requests(&self) -> Vec<AssetRequest> {
        self.queue
            .borrow()
            .open
            .iter()
            .map(|job| job.request.clone())
            .collect()
    }

    pub fn is_open(&self, path: &str) -> bool {
        self.queue
            .borrow()
            .open
            .iter()
            .any(|job| job.request.path == path)
    }

    /// Completes the oldest open job for `path`. Returns `None` when no such job is open.
    pub fn complete_with(
        &self,
        path: &str,
        result: impl FnOnce(&AssetRequest) -> LoadResult,
    ) -> Option<TaskId> {
        let mut queue = self.queue.borrow_mut();
        let index = queue.open.iter().position(|job| job.request.path == path)?;
        let job = queue.open.remove(index);
        let result = result(&job.request);
        queue.ready.push_back(FetchDone {
            task_id: job.task_id,
            result,
        });
        Some(job.task_id)
    }

    pub fn complete_placeholder(&self, path: &str) -> Option<TaskId> {
        self.complete_with(path, |request| Ok(Resource::placeholder(request.kind)))
    }

    pub fn fail(&self, path: &str) -> Option<TaskId> {
        self.complete_with(path, |request| {
            Err(LoadFailure::Read {
                path: request.path.clone(),
                message: "scripted failure".to_string(),
            })
        })
    }

    /// Queues a completion for `task_id` even if it was already completed.
    pub fn inject_completion(&self, task_id: TaskId, result: LoadResult) {
        self.queue
            .borrow_mut()
            .ready
            .push_back(FetchDone { task_id, result });
    }
}
