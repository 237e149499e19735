pub mod catalog;
pub mod config;
pub mod detector;
pub mod error;
pub mod indexer;
pub mod jobs;

pub use catalog::Catalog;
pub use config::AppConfig;
pub use error::Error;
pub use jobs::{JobState, JobSupervisor};
