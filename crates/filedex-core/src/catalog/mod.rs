pub mod models;
mod queries;
mod sqlite;

pub use models::{
    DuplicateGroup, FileRecord, FileType, GroupMember, HistoryEntry, SearchParams, SizeBucket,
};
pub use sqlite::Catalog;
