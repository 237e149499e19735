use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use tracing::{debug, error, info};

use super::{
    DupDoneMessage, DupMessage, IndexDoneMessage, IndexMessage, JobErrorMessage, JobShared,
};
use crate::catalog::Catalog;
use crate::detector;
use crate::error::Error;
use crate::indexer;

/// Bounded progress queue per job. A slow or absent subscriber never blocks
/// the worker; overflowing events are dropped.
pub const PROGRESS_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Idle,
    Running,
    Done,
    Failed,
    Cancelled,
}

struct JobSlot<M> {
    shared: Option<Arc<JobShared>>,
    progress: Option<Receiver<M>>,
    // Kept only so the thread stays attached for debugging; never joined.
    // Superseded workers die on their own after seeing the cancel flag.
    _handle: Option<JoinHandle<()>>,
}

impl<M> JobSlot<M> {
    fn new() -> Self {
        JobSlot {
            shared: None,
            progress: None,
            _handle: None,
        }
    }

    /// Abrupt, best-effort termination of whatever is running: raise the
    /// cancel flag and drop the progress receiver. No drain and no rollback;
    /// catalog writes are idempotent per path.
    fn supersede(&mut self) {
        if let Some(shared) = &self.shared {
            if shared.is_running() {
                shared.request_cancel();
            }
        }
        self.progress = None;
        self._handle = None;
    }

    fn install(&mut self, shared: Arc<JobShared>, progress: Receiver<M>, handle: JoinHandle<()>) {
        self.shared = Some(shared);
        self.progress = Some(progress);
        self._handle = Some(handle);
    }

    fn state(&self) -> JobState {
        self.shared
            .as_ref()
            .map(|s| s.state())
            .unwrap_or(JobState::Idle)
    }
}

#[derive(Debug, Clone)]
pub struct IndexStatus {
    pub state: JobState,
    pub running: bool,
    pub indexed: usize,
    pub total: usize,
    pub last_run_at: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct DupStatus {
    pub state: JobState,
    pub running: bool,
    pub done: usize,
    pub total: usize,
    pub last_run_at: Option<i64>,
}

/// Owns at most one active index job and one active duplicate-scan job.
/// Starting a job while its category is busy supersedes the running one.
/// Each worker opens its own catalog connection and runs on its own thread,
/// so the control path never blocks on job work.
pub struct JobSupervisor {
    db_path: PathBuf,
    index: Mutex<JobSlot<IndexMessage>>,
    dup: Mutex<JobSlot<DupMessage>>,
}

impl JobSupervisor {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Self {
        JobSupervisor {
            db_path: db_path.as_ref().to_path_buf(),
            index: Mutex::new(JobSlot::new()),
            dup: Mutex::new(JobSlot::new()),
        }
    }

    // ── Index jobs ───────────────────────────────────────────────

    pub fn start_index(&self, roots: Vec<String>, ignore_patterns: Vec<String>) -> bool {
        let mut slot = self.index.lock().unwrap();
        slot.supersede();

        let shared = Arc::new(JobShared::new_running());
        let (tx, rx) = mpsc::sync_channel(PROGRESS_CHANNEL_CAPACITY);
        let emit: Arc<dyn Fn(IndexMessage) + Send + Sync> =
            Arc::new(move |msg| {
                let _ = tx.try_send(msg);
            });

        let worker_shared = Arc::clone(&shared);
        let db_path = self.db_path.clone();
        let handle = thread::spawn(move || {
            info!("Index job starting on {:?}", roots);
            let result = Catalog::open(&db_path)
                .map_err(Error::from)
                .and_then(|catalog| {
                    indexer::run(&catalog, &roots, &ignore_patterns, &worker_shared, &emit)
                });

            if worker_shared.is_cancelled() {
                debug!("Index job cancelled");
                worker_shared.finish(JobState::Cancelled);
                return;
            }
            match result {
                Ok(total) => {
                    worker_shared.record_progress(total, total);
                    emit(IndexMessage::Done(IndexDoneMessage { total }));
                    worker_shared.finish(JobState::Done);
                    info!("Index job done: {} records", total);
                }
                Err(e) => {
                    error!("Index job failed: {}", e);
                    emit(IndexMessage::Error(JobErrorMessage {
                        message: e.to_string(),
                    }));
                    worker_shared.finish(JobState::Failed);
                }
            }
        });

        slot.install(shared, rx, handle);
        true
    }

    /// Hand the progress stream to the one active subscriber. Subsequent
    /// calls return None until a new job is started.
    pub fn take_index_progress(&self) -> Option<Receiver<IndexMessage>> {
        self.index.lock().unwrap().progress.take()
    }

    pub fn index_status(&self) -> IndexStatus {
        let slot = self.index.lock().unwrap();
        match &slot.shared {
            Some(shared) => IndexStatus {
                state: slot.state(),
                running: shared.is_running(),
                indexed: shared.processed(),
                total: shared.total(),
                last_run_at: shared.last_run_at(),
            },
            None => IndexStatus {
                state: JobState::Idle,
                running: false,
                indexed: 0,
                total: 0,
                last_run_at: None,
            },
        }
    }

    pub fn stop_index(&self) {
        self.index.lock().unwrap().supersede();
    }

    // ── Duplicate scan jobs ──────────────────────────────────────

    pub fn start_dup_scan(&self, root: String) -> bool {
        let mut slot = self.dup.lock().unwrap();
        slot.supersede();

        let shared = Arc::new(JobShared::new_running());
        let (tx, rx) = mpsc::sync_channel(PROGRESS_CHANNEL_CAPACITY);
        let emit: Arc<dyn Fn(DupMessage) + Send + Sync> =
            Arc::new(move |msg| {
                let _ = tx.try_send(msg);
            });

        let worker_shared = Arc::clone(&shared);
        let db_path = self.db_path.clone();
        let handle = thread::spawn(move || {
            info!("Duplicate scan starting under {}", root);
            let result = Catalog::open(&db_path)
                .map_err(Error::from)
                .and_then(|catalog| detector::run(&catalog, &root, &worker_shared, &emit));

            if worker_shared.is_cancelled() {
                debug!("Duplicate scan cancelled");
                worker_shared.finish(JobState::Cancelled);
                return;
            }
            match result {
                Ok(candidates) => {
                    emit(DupMessage::Done(DupDoneMessage { candidates }));
                    worker_shared.finish(JobState::Done);
                    info!("Duplicate scan done: {} candidates", candidates);
                }
                Err(e) => {
                    error!("Duplicate scan failed: {}", e);
                    emit(DupMessage::Error(JobErrorMessage {
                        message: e.to_string(),
                    }));
                    worker_shared.finish(JobState::Failed);
                }
            }
        });

        slot.install(shared, rx, handle);
        true
    }

    pub fn take_dup_progress(&self) -> Option<Receiver<DupMessage>> {
        self.dup.lock().unwrap().progress.take()
    }

    pub fn dup_status(&self) -> DupStatus {
        let slot = self.dup.lock().unwrap();
        match &slot.shared {
            Some(shared) => DupStatus {
                state: slot.state(),
                running: shared.is_running(),
                done: shared.processed(),
                total: shared.total(),
                last_run_at: shared.last_run_at(),
            },
            None => DupStatus {
                state: JobState::Idle,
                running: false,
                done: 0,
                total: 0,
                last_run_at: None,
            },
        }
    }

    pub fn stop_dup(&self) {
        self.dup.lock().unwrap().supersede();
    }
}
