pub mod classify;
mod walk;

pub use walk::{run, PROGRESS_BATCH};
