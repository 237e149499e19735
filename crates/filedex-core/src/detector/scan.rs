use std::path::Path;
use std::sync::Arc;

use dashmap::DashMap;
use rayon::prelude::*;
use tracing::{debug, error, info};

use super::hash;
use crate::catalog::Catalog;
use crate::error::Error;
use crate::jobs::{DupMessage, HashProgressMessage, JobShared};

/// Candidates are hashed and persisted in chunks of this size; each chunk
/// boundary reports progress and re-checks cancellation.
pub const HASH_PROGRESS_BATCH: usize = 50;

/// Duplicate scan over a previously indexed root.
///
/// 1. Size bucketing: catalog rows under the root grouped by exact size;
///    single-member buckets are discarded.
/// 2. Partial hash over a bounded prefix for every candidate, persisted.
/// 3. Full content hash for candidates that still share (size, partial),
///    persisted.
///
/// Groups themselves are materialized on the read path
/// (`Catalog::duplicate_groups`). Returns the candidate count.
pub fn run(
    catalog: &Catalog,
    root: &str,
    ctl: &JobShared,
    emit: &Arc<dyn Fn(DupMessage) + Send + Sync>,
) -> Result<usize, Error> {
    // The indexer stores canonicalized paths; match its form so the prefix
    // scoping works for roots given with symlinked or relative components.
    let root = std::fs::canonicalize(root)
        .map(|p| p.to_string_lossy().into_owned())
        .unwrap_or_else(|_| root.to_string());
    let root = root.as_str();

    let buckets = catalog.size_buckets(root)?;
    let candidates: Vec<(String, i64)> = buckets
        .into_iter()
        .filter(|bucket| bucket.paths.len() > 1)
        .flat_map(|bucket| {
            let size = bucket.size;
            bucket.paths.into_iter().map(move |path| (path, size))
        })
        .collect();

    let total = candidates.len();
    info!("{} duplicate candidates under {}", total, root);
    ctl.record_progress(0, total);
    emit(DupMessage::Progress(HashProgressMessage { done: 0, total }));

    // Phase 2: partial hashes, chunked. Groups accumulate concurrently as
    // the chunk is hashed in parallel.
    let partial_groups: DashMap<(i64, String), Vec<String>> = DashMap::new();
    let mut done = 0;
    for chunk in candidates.chunks(HASH_PROGRESS_BATCH) {
        if ctl.is_cancelled() {
            return Ok(total);
        }
        let hashed: Vec<(String, String)> = chunk
            .par_iter()
            .filter_map(|(path, size)| match hash::partial_hash(Path::new(path)) {
                Ok(hex) => {
                    partial_groups
                        .entry((*size, hex.clone()))
                        .or_default()
                        .push(path.clone());
                    Some((path.clone(), hex))
                }
                Err(e) => {
                    error!("Error hashing '{}': {}", path, e);
                    None
                }
            })
            .collect();
        catalog.set_partial_hashes(&hashed)?;

        done += chunk.len();
        ctl.record_progress(done, total);
        emit(DupMessage::Progress(HashProgressMessage { done, total }));
    }

    // Phase 3: full hashes only where size and prefix still collide.
    let full_candidates: Vec<String> = partial_groups
        .into_iter()
        .filter(|(_, paths)| paths.len() > 1)
        .flat_map(|(_, paths)| paths)
        .collect();
    debug!(
        "{} of {} candidates share size and prefix hash",
        full_candidates.len(),
        total
    );

    for chunk in full_candidates.chunks(HASH_PROGRESS_BATCH) {
        if ctl.is_cancelled() {
            return Ok(total);
        }
        let hashed: Vec<(String, String)> = chunk
            .par_iter()
            .filter_map(|path| match hash::full_hash(Path::new(path)) {
                Ok(hex) => Some((path.clone(), hex)),
                Err(e) => {
                    error!("Error hashing '{}': {}", path, e);
                    None
                }
            })
            .collect();
        catalog.set_full_hashes(&hashed)?;
    }

    Ok(total)
}
