//! Progress messages streamed from background jobs to the single active
//! subscriber. One tagged variant per message kind; each carries only the
//! fields that kind needs.

#[derive(Debug, Clone)]
pub struct IndexProgressMessage {
    pub indexed: usize,
    pub current_path: String,
}

#[derive(Debug, Clone)]
pub struct IndexDoneMessage {
    pub total: usize,
}

#[derive(Debug, Clone)]
pub struct JobErrorMessage {
    pub message: String,
}

#[derive(Debug, Clone)]
pub enum IndexMessage {
    Progress(IndexProgressMessage),
    Done(IndexDoneMessage),
    Error(JobErrorMessage),
}

#[derive(Debug, Clone)]
pub struct HashProgressMessage {
    pub done: usize,
    pub total: usize,
}

#[derive(Debug, Clone)]
pub struct DupDoneMessage {
    pub candidates: usize,
}

#[derive(Debug, Clone)]
pub enum DupMessage {
    Progress(HashProgressMessage),
    Done(DupDoneMessage),
    Error(JobErrorMessage),
}
