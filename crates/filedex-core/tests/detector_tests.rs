use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};

use filedex_core::catalog::Catalog;
use filedex_core::detector;
use filedex_core::indexer;
use filedex_core::jobs::{DupMessage, IndexMessage, JobShared};
use tempfile::tempdir;

const MIB: usize = 1024 * 1024;

fn index_tree(catalog: &Catalog, root: &Path) {
    let ctl = JobShared::new_running();
    let emit: Arc<dyn Fn(IndexMessage) + Send + Sync> = Arc::new(|_| {});
    indexer::run(
        catalog,
        &[root.to_string_lossy().into_owned()],
        &[],
        &ctl,
        &emit,
    )
    .unwrap();
}

fn scan_tree(catalog: &Catalog, root: &Path) -> usize {
    let ctl = JobShared::new_running();
    let emit: Arc<dyn Fn(DupMessage) + Send + Sync> = Arc::new(|_| {});
    // The indexer stores canonicalized paths; scan under the same form.
    let canonical_root = fs::canonicalize(root).unwrap();
    detector::run(catalog, &canonical_root.to_string_lossy(), &ctl, &emit).unwrap()
}

fn canonical(root: &Path, name: &str) -> String {
    fs::canonicalize(root)
        .unwrap()
        .join(name)
        .to_string_lossy()
        .into_owned()
}

/// Files `a` and `b` share 2 MiB of content; `c` has the same size but
/// different content. Exactly one group comes back, containing a and b.
#[test]
fn test_happy_path_grouping() {
    let tmp = tempdir().unwrap();
    let root = tmp.path().join("root");
    fs::create_dir_all(&root).unwrap();

    let shared = vec![0xABu8; 2 * MIB];
    let mut different = shared.clone();
    different[0] = 0x00;
    fs::write(root.join("a.bin"), &shared).unwrap();
    fs::write(root.join("b.bin"), &shared).unwrap();
    fs::write(root.join("c.bin"), &different).unwrap();

    let catalog = Catalog::open_in_memory().unwrap();
    index_tree(&catalog, &root);
    let candidates = scan_tree(&catalog, &root);
    assert_eq!(candidates, 3);

    let canonical_root = fs::canonicalize(&root).unwrap();
    let groups = catalog
        .duplicate_groups(Some(&canonical_root.to_string_lossy()), 50)
        .unwrap();
    assert_eq!(groups.len(), 1);
    let group = &groups[0];
    assert_eq!(group.size, (2 * MIB) as i64);
    assert_eq!(group.files.len(), 2);

    let paths: Vec<&str> = group.files.iter().map(|f| f.path.as_str()).collect();
    assert!(paths.contains(&canonical(&root, "a.bin").as_str()));
    assert!(paths.contains(&canonical(&root, "b.bin").as_str()));
    assert!(!paths.contains(&canonical(&root, "c.bin").as_str()));
}

#[test]
fn test_unique_size_never_hashed_or_grouped() {
    let tmp = tempdir().unwrap();
    let root = tmp.path().join("root");
    fs::create_dir_all(&root).unwrap();
    fs::write(root.join("lonely.bin"), vec![1u8; 777]).unwrap();
    fs::write(root.join("pair1.bin"), vec![2u8; 100]).unwrap();
    fs::write(root.join("pair2.bin"), vec![2u8; 100]).unwrap();

    let catalog = Catalog::open_in_memory().unwrap();
    index_tree(&catalog, &root);
    let candidates = scan_tree(&catalog, &root);
    assert_eq!(candidates, 2);

    // Unique size: not a candidate, so never hashed.
    let lonely = catalog.get(&canonical(&root, "lonely.bin")).unwrap().unwrap();
    assert!(lonely.partial_hash.is_none());
    assert!(lonely.full_hash.is_none());

    let groups = catalog.duplicate_groups(None, 50).unwrap();
    assert!(groups
        .iter()
        .all(|g| g.files.iter().all(|f| !f.path.ends_with("lonely.bin"))));
}

#[test]
fn test_zero_byte_files_never_group() {
    let tmp = tempdir().unwrap();
    let root = tmp.path().join("root");
    fs::create_dir_all(&root).unwrap();
    fs::write(root.join("empty1.txt"), b"").unwrap();
    fs::write(root.join("empty2.txt"), b"").unwrap();

    let catalog = Catalog::open_in_memory().unwrap();
    index_tree(&catalog, &root);
    let candidates = scan_tree(&catalog, &root);

    assert_eq!(candidates, 0);
    assert!(catalog.duplicate_groups(None, 50).unwrap().is_empty());
}

#[test]
fn test_full_hash_persisted_for_colliding_candidates_only() {
    let tmp = tempdir().unwrap();
    let root = tmp.path().join("root");
    fs::create_dir_all(&root).unwrap();

    let payload = vec![0x5Au8; 4096];
    let mut other = payload.clone();
    other[0] = 0x00;
    fs::write(root.join("dup1.dat"), &payload).unwrap();
    fs::write(root.join("dup2.dat"), &payload).unwrap();
    fs::write(root.join("odd.dat"), &other).unwrap();

    let catalog = Catalog::open_in_memory().unwrap();
    index_tree(&catalog, &root);
    scan_tree(&catalog, &root);

    let dup1 = catalog.get(&canonical(&root, "dup1.dat")).unwrap().unwrap();
    let dup2 = catalog.get(&canonical(&root, "dup2.dat")).unwrap().unwrap();
    let odd = catalog.get(&canonical(&root, "odd.dat")).unwrap().unwrap();

    // Every candidate gets a partial hash...
    assert!(dup1.partial_hash.is_some());
    assert!(odd.partial_hash.is_some());
    assert_ne!(dup1.partial_hash, odd.partial_hash);

    // ...but only prefix-colliding candidates get the full hash.
    assert!(dup1.full_hash.is_some());
    assert_eq!(dup1.full_hash, dup2.full_hash);
    assert!(odd.full_hash.is_none());
}

/// Two files that agree on size and on the first 1 MiB but differ later are
/// still reported as one group: grouping reads `(size, partial_hash)` only.
/// The diverging full hashes are exposed on the members for callers that
/// want to double-check.
#[test]
fn test_grouping_reads_size_and_partial_hash_only() {
    let tmp = tempdir().unwrap();
    let root = tmp.path().join("root");
    fs::create_dir_all(&root).unwrap();

    let mut one = vec![0xCDu8; 2 * MIB];
    let mut two = one.clone();
    one[2 * MIB - 1] = 0x01;
    two[2 * MIB - 1] = 0x02;
    fs::write(root.join("one.bin"), &one).unwrap();
    fs::write(root.join("two.bin"), &two).unwrap();

    let catalog = Catalog::open_in_memory().unwrap();
    index_tree(&catalog, &root);
    scan_tree(&catalog, &root);

    let groups = catalog.duplicate_groups(None, 50).unwrap();
    assert_eq!(groups.len(), 1);
    let group = &groups[0];
    assert_eq!(group.files.len(), 2);
    assert_ne!(group.files[0].full_hash, group.files[1].full_hash);
}

#[test]
fn test_vanished_candidate_is_skipped() {
    let tmp = tempdir().unwrap();
    let root = tmp.path().join("root");
    fs::create_dir_all(&root).unwrap();
    fs::write(root.join("stays.bin"), vec![7u8; 512]).unwrap();
    fs::write(root.join("goes.bin"), vec![7u8; 512]).unwrap();

    let catalog = Catalog::open_in_memory().unwrap();
    index_tree(&catalog, &root);

    // The file disappears between indexing and hashing.
    fs::remove_file(root.join("goes.bin")).unwrap();

    let candidates = scan_tree(&catalog, &root);
    assert_eq!(candidates, 2);

    let stays = catalog.get(&canonical(&root, "stays.bin")).unwrap().unwrap();
    let goes = catalog.get(&canonical(&root, "goes.bin")).unwrap().unwrap();
    assert!(stays.partial_hash.is_some());
    assert!(goes.partial_hash.is_none());

    // With its only partner gone, the survivor forms no group.
    assert!(catalog.duplicate_groups(None, 50).unwrap().is_empty());
}

#[test]
fn test_progress_events_cover_all_candidates() {
    let tmp = tempdir().unwrap();
    let root = tmp.path().join("root");
    fs::create_dir_all(&root).unwrap();
    // 60 files of one size + 60 of another → 120 candidates, three chunks.
    for i in 0..60 {
        fs::write(root.join(format!("a{i:02}.dat")), vec![1u8; 256]).unwrap();
        fs::write(root.join(format!("b{i:02}.dat")), vec![2u8; 512]).unwrap();
    }

    let catalog = Catalog::open_in_memory().unwrap();
    index_tree(&catalog, &root);

    let events: Arc<Mutex<Vec<DupMessage>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&events);
    let emit: Arc<dyn Fn(DupMessage) + Send + Sync> =
        Arc::new(move |msg| sink.lock().unwrap().push(msg));
    let ctl = JobShared::new_running();
    let canonical_root = fs::canonicalize(&root).unwrap();
    let total = detector::run(&catalog, &canonical_root.to_string_lossy(), &ctl, &emit).unwrap();
    assert_eq!(total, 120);

    let events = events.lock().unwrap();
    let progress: Vec<(usize, usize)> = events
        .iter()
        .filter_map(|e| match e {
            DupMessage::Progress(p) => Some((p.done, p.total)),
            _ => None,
        })
        .collect();
    assert_eq!(progress.first(), Some(&(0, 120)));
    assert_eq!(progress.last(), Some(&(120, 120)));
}

#[test]
fn test_delete_shrinks_group_and_catalog() {
    let tmp = tempdir().unwrap();
    let root = tmp.path().join("root");
    fs::create_dir_all(&root).unwrap();
    let payload = vec![0xEEu8; 1024];
    fs::write(root.join("keep.bin"), &payload).unwrap();
    fs::write(root.join("drop.bin"), &payload).unwrap();

    let catalog = Catalog::open_in_memory().unwrap();
    index_tree(&catalog, &root);
    scan_tree(&catalog, &root);
    assert_eq!(catalog.duplicate_groups(None, 50).unwrap().len(), 1);

    let victim = canonical(&root, "drop.bin");
    let outcome = detector::delete_files(&catalog, &[victim.clone()]).unwrap();
    assert!(outcome.success);
    assert_eq!(outcome.deleted, vec![victim.clone()]);
    assert!(outcome.errors.is_empty());

    assert!(!root.join("drop.bin").exists());
    assert!(catalog.get(&victim).unwrap().is_none());
    assert!(catalog.duplicate_groups(None, 50).unwrap().is_empty());

    // The destructive operation left a history trail.
    let history = catalog.recent_history(10).unwrap();
    assert_eq!(history.len(), 1);
    assert!(history[0].payload.contains("drop.bin"));
}

#[test]
fn test_delete_missing_path_counts_as_removed() {
    let tmp = tempdir().unwrap();
    let root = tmp.path().join("root");
    fs::create_dir_all(&root).unwrap();
    fs::write(root.join("real.bin"), vec![1u8; 64]).unwrap();

    let catalog = Catalog::open_in_memory().unwrap();
    index_tree(&catalog, &root);

    let real = canonical(&root, "real.bin");
    // Already gone from disk: its record (if any) is dropped and the path
    // does not abort the rest of the batch.
    let missing = canonical(&root, "never_existed.bin");

    let outcome = detector::delete_files(&catalog, &[missing.clone(), real.clone()]).unwrap();
    assert!(outcome.deleted.contains(&missing));
    assert!(outcome.deleted.contains(&real));
    assert!(outcome.success);
    assert!(!root.join("real.bin").exists());
}
