/// Coarse content classification, derived from a file's extension at index
/// time and stored as text in the `type` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileType {
    Folder,
    Image,
    Video,
    Audio,
    Doc,
    Archive,
    Code,
    Other,
}

impl FileType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileType::Folder => "folder",
            FileType::Image => "image",
            FileType::Video => "video",
            FileType::Audio => "audio",
            FileType::Doc => "doc",
            FileType::Archive => "archive",
            FileType::Code => "code",
            FileType::Other => "other",
        }
    }

    /// Inverse of `as_str`. Unknown labels map to `Other` so that rows
    /// written by a newer schema never fail to load.
    pub fn from_label(label: &str) -> FileType {
        match label {
            "folder" => FileType::Folder,
            "image" => FileType::Image,
            "video" => FileType::Video,
            "audio" => FileType::Audio,
            "doc" => FileType::Doc,
            "archive" => FileType::Archive,
            "code" => FileType::Code,
            _ => FileType::Other,
        }
    }
}

/// One row of `files_index`: a single filesystem entry.
#[derive(Debug, Clone)]
pub struct FileRecord {
    pub path: String,
    pub name: String,
    pub ext: String,
    pub file_type: FileType,
    pub size: i64,
    pub modified: i64,
    pub created: i64,
    pub partial_hash: Option<String>,
    pub full_hash: Option<String>,
    pub is_dir: bool,
    pub parent: String,
    pub content_snippet: Option<String>,
    pub indexed_at: i64,
}

/// Files sharing one exact size under a root; the duplicate seed.
#[derive(Debug, Clone)]
pub struct SizeBucket {
    pub size: i64,
    pub paths: Vec<String>,
}

/// A reported duplicate group: all catalog rows sharing `(size, partial_hash)`.
/// Members are in discovery order; by convention the first member is the
/// presentation "primary", which carries no semantic weight.
#[derive(Debug, Clone)]
pub struct DuplicateGroup {
    pub size: i64,
    pub partial_hash: String,
    pub files: Vec<GroupMember>,
}

impl DuplicateGroup {
    /// Bytes recoverable by deleting every member but one.
    pub fn wasted_bytes(&self) -> i64 {
        self.size * (self.files.len() as i64 - 1).max(0)
    }
}

#[derive(Debug, Clone)]
pub struct GroupMember {
    pub path: String,
    pub modified: i64,
    pub full_hash: Option<String>,
}

/// Parameters for the read-only catalog search used by browsing collaborators.
#[derive(Debug, Clone, Default)]
pub struct SearchParams {
    pub query: Option<String>,
    pub ext: Option<String>,
    pub file_type: Option<FileType>,
    pub size_min: Option<i64>,
    pub size_max: Option<i64>,
    pub modified_from: Option<i64>,
    pub modified_to: Option<i64>,
    pub limit: i64,
}

/// One row of `op_history`: a destructive operation the core performed.
#[derive(Debug, Clone)]
pub struct HistoryEntry {
    pub id: i64,
    pub op_type: String,
    pub payload: String,
    pub created_at: i64,
}
