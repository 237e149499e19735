mod events;
mod supervisor;

pub use events::{
    DupDoneMessage, DupMessage, HashProgressMessage, IndexDoneMessage, IndexMessage,
    IndexProgressMessage, JobErrorMessage,
};
pub use supervisor::{DupStatus, IndexStatus, JobState, JobSupervisor};

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

/// State shared between a job worker thread and the supervisor that owns it.
/// Counters are atomics so `status()` never blocks on a running worker;
/// cancellation is a one-way flag the worker polls between units of work.
pub struct JobShared {
    cancel: AtomicBool,
    running: AtomicBool,
    processed: AtomicUsize,
    total: AtomicUsize,
    state: Mutex<JobState>,
    last_run_at: Mutex<Option<i64>>,
}

impl JobShared {
    /// Fresh control block in the Running state. The supervisor creates one
    /// per job; embedders driving `indexer::run`/`detector::run` on their own
    /// thread can too.
    pub fn new_running() -> Self {
        JobShared {
            cancel: AtomicBool::new(false),
            running: AtomicBool::new(true),
            processed: AtomicUsize::new(0),
            total: AtomicUsize::new(0),
            state: Mutex::new(JobState::Running),
            last_run_at: Mutex::new(None),
        }
    }

    pub fn request_cancel(&self) {
        self.cancel.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::Relaxed)
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    pub fn record_progress(&self, processed: usize, total: usize) {
        self.processed.store(processed, Ordering::Relaxed);
        self.total.store(total, Ordering::Relaxed);
    }

    pub fn processed(&self) -> usize {
        self.processed.load(Ordering::Relaxed)
    }

    pub fn total(&self) -> usize {
        self.total.load(Ordering::Relaxed)
    }

    pub fn state(&self) -> JobState {
        *self.state.lock().unwrap()
    }

    pub fn last_run_at(&self) -> Option<i64> {
        *self.last_run_at.lock().unwrap()
    }

    /// Terminal bookkeeping, written by the worker itself as its last act.
    pub(crate) fn finish(&self, state: JobState) {
        *self.state.lock().unwrap() = state;
        *self.last_run_at.lock().unwrap() = Some(chrono::Utc::now().timestamp());
        self.running.store(false, Ordering::Relaxed);
    }
}
