use std::collections::HashSet;
use std::fs::{self, Metadata};
use std::path::Path;
use std::sync::Arc;
use std::time::UNIX_EPOCH;

use glob::Pattern;
use tracing::{debug, error, trace};

use super::classify::{self, SNIPPET_MAX_CHARS, SNIPPET_MAX_FILE_SIZE};
use crate::catalog::{Catalog, FileRecord, FileType};
use crate::config;
use crate::error::Error;
use crate::jobs::{IndexMessage, IndexProgressMessage, JobShared};

/// Records are flushed to the catalog and progress is reported every this
/// many processed entries.
pub const PROGRESS_BATCH: usize = 200;

#[cfg(unix)]
type DirKey = (u64, u64);
#[cfg(not(unix))]
type DirKey = std::path::PathBuf;

#[cfg(unix)]
fn dir_key(_dir: &Path, metadata: &Metadata) -> DirKey {
    use std::os::unix::fs::MetadataExt;
    (metadata.dev(), metadata.ino())
}

#[cfg(not(unix))]
fn dir_key(dir: &Path, _metadata: &Metadata) -> DirKey {
    fs::canonicalize(dir).unwrap_or_else(|_| dir.to_path_buf())
}

struct Walker<'a> {
    catalog: &'a Catalog,
    ctl: &'a JobShared,
    emit: &'a Arc<dyn Fn(IndexMessage) + Send + Sync>,
    ignore_patterns: Vec<Pattern>,
    batch: Vec<FileRecord>,
    indexed: usize,
    visited: HashSet<DirKey>,
}

/// Recursive index pass: visits every reachable directory and file beneath
/// the given roots and upserts a record for each. Returns the number of
/// records processed. Cancellation stops the walk early and leaves
/// whatever was already written.
pub fn run(
    catalog: &Catalog,
    roots: &[String],
    ignore_globs: &[String],
    ctl: &JobShared,
    emit: &Arc<dyn Fn(IndexMessage) + Send + Sync>,
) -> Result<usize, Error> {
    let ignore_patterns: Vec<Pattern> = ignore_globs
        .iter()
        .filter_map(|glob| match Pattern::new(glob) {
            Ok(p) => Some(p),
            Err(e) => {
                error!("Invalid glob pattern '{}': {}", glob, e);
                None
            }
        })
        .collect();

    let canonical_roots: Vec<String> = roots
        .iter()
        .filter_map(|root| match fs::canonicalize(root) {
            Ok(p) => Some(p.to_string_lossy().into_owned()),
            Err(e) => {
                error!("Skipping unreadable root '{}': {}", root, e);
                None
            }
        })
        .collect();
    let roots = config::non_overlapping_directories(canonical_roots);
    debug!("Indexing roots: {:?}", roots);

    let mut walker = Walker {
        catalog,
        ctl,
        emit,
        ignore_patterns,
        batch: Vec::with_capacity(PROGRESS_BATCH),
        indexed: 0,
        visited: HashSet::new(),
    };

    for root in &roots {
        if ctl.is_cancelled() {
            break;
        }
        walker.visit_dir(Path::new(root))?;
    }

    // Final partial batch.
    if !walker.batch.is_empty() {
        catalog.upsert_batch(&walker.batch)?;
        walker.batch.clear();
    }

    ctl.record_progress(walker.indexed, walker.indexed);
    Ok(walker.indexed)
}

impl Walker<'_> {
    fn visit_dir(&mut self, dir: &Path) -> Result<(), Error> {
        if self.ctl.is_cancelled() {
            return Ok(());
        }

        if self
            .ignore_patterns
            .iter()
            .any(|pattern| pattern.matches_path(dir))
        {
            return Ok(());
        }

        // Guard against traversal cycles (bind mounts, dangling hardlinked
        // trees): a directory is only descended once per run.
        let metadata = match fs::metadata(dir) {
            Ok(m) => m,
            Err(e) => {
                debug!("Skipping directory {}: {}", dir.display(), e);
                return Ok(());
            }
        };
        if !self.visited.insert(dir_key(dir, &metadata)) {
            trace!("Already visited {}, skipping", dir.display());
            return Ok(());
        }

        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                debug!("Skipping unreadable directory {}: {}", dir.display(), e);
                return Ok(());
            }
        };

        for entry_result in entries {
            if self.ctl.is_cancelled() {
                return Ok(());
            }
            let entry = match entry_result {
                Ok(entry) => entry,
                Err(e) => {
                    debug!("Skipping entry in {}: {}", dir.display(), e);
                    continue;
                }
            };

            let path = entry.path();
            if self
                .ignore_patterns
                .iter()
                .any(|pattern| pattern.matches_path(&path))
            {
                continue;
            }

            let entry_type = match entry.file_type() {
                Ok(t) => t,
                Err(e) => {
                    debug!("Skipping {}: {}", path.display(), e);
                    continue;
                }
            };
            // Symlinks are recorded with their target's metadata when it
            // resolves, but never descended into.
            let metadata = if entry_type.is_symlink() {
                match fs::metadata(&path) {
                    Ok(m) => m,
                    Err(e) => {
                        debug!("Skipping broken symlink {}: {}", path.display(), e);
                        continue;
                    }
                }
            } else {
                match entry.metadata() {
                    Ok(m) => m,
                    Err(e) => {
                        debug!("Skipping {}: {}", path.display(), e);
                        continue;
                    }
                }
            };

            let is_dir = !entry_type.is_symlink() && metadata.is_dir();
            self.push_record(build_record(&path, dir, &metadata, is_dir))?;

            if is_dir {
                self.visit_dir(&path)?;
            }
        }

        Ok(())
    }

    fn push_record(&mut self, record: FileRecord) -> Result<(), Error> {
        let current_path = record.path.clone();
        self.batch.push(record);
        self.indexed += 1;

        if self.batch.len() >= PROGRESS_BATCH {
            self.catalog.upsert_batch(&self.batch)?;
            self.batch.clear();
            self.ctl.record_progress(self.indexed, 0);
            (self.emit)(IndexMessage::Progress(IndexProgressMessage {
                indexed: self.indexed,
                current_path,
            }));
        }
        Ok(())
    }
}

fn build_record(path: &Path, parent: &Path, metadata: &Metadata, is_dir: bool) -> FileRecord {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = if is_dir {
        String::new()
    } else {
        path.extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default()
    };
    let file_type = if is_dir {
        FileType::Folder
    } else {
        classify::classify(&ext)
    };

    let modified = unix_seconds(metadata.modified().ok());
    let created = metadata
        .created()
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_secs() as i64)
        .unwrap_or(modified);

    let content_snippet = if !is_dir
        && metadata.len() < SNIPPET_MAX_FILE_SIZE
        && classify::is_text_ext(&ext)
    {
        read_snippet(path)
    } else {
        None
    };

    FileRecord {
        path: path.to_string_lossy().into_owned(),
        name,
        ext,
        file_type,
        size: metadata.len() as i64,
        modified,
        created,
        partial_hash: None,
        full_hash: None,
        is_dir,
        parent: parent.to_string_lossy().into_owned(),
        content_snippet,
        indexed_at: 0,
    }
}

fn unix_seconds(time: Option<std::time::SystemTime>) -> i64 {
    time.and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

fn read_snippet(path: &Path) -> Option<String> {
    let data = fs::read(path).ok()?;
    let text = String::from_utf8_lossy(&data);
    let snippet: String = text.chars().take(SNIPPET_MAX_CHARS).collect();
    Some(snippet)
}
