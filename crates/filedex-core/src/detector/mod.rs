mod delete;
pub mod hash;
mod scan;

pub use delete::{delete_files, DeleteError, DeleteOutcome};
pub use scan::{run, HASH_PROGRESS_BATCH};
