use std::fs;
use std::path::Path;

use serde_json::json;
use tracing::{debug, warn};

use crate::catalog::Catalog;
use crate::error::Error;

#[derive(Debug, Clone)]
pub struct DeleteError {
    pub path: String,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct DeleteOutcome {
    pub success: bool,
    pub deleted: Vec<String>,
    pub errors: Vec<DeleteError>,
}

/// Remove selected duplicate members: move each file to the platform trash,
/// falling back to permanent deletion when trashing fails, then erase the
/// catalog row and append an op_history entry. Per-path failures are
/// collected without aborting the batch; only a catalog failure is fatal.
pub fn delete_files(catalog: &Catalog, paths: &[String]) -> Result<DeleteOutcome, Error> {
    let mut deleted = Vec::new();
    let mut errors = Vec::new();

    for path_str in paths {
        let path = Path::new(path_str);

        if !path.exists() {
            // Already gone; the catalog row is stale either way.
            warn!("File '{}' no longer exists, dropping its record", path_str);
            catalog.delete(path_str)?;
            deleted.push(path_str.clone());
            continue;
        }

        let removed = match trash::delete(path) {
            Ok(()) => {
                debug!("Trashed '{}'", path_str);
                true
            }
            Err(trash_err) => match fs::remove_file(path) {
                Ok(()) => {
                    debug!("Removed '{}' (trash unavailable: {})", path_str, trash_err);
                    true
                }
                Err(e) => {
                    errors.push(DeleteError {
                        path: path_str.clone(),
                        message: e.to_string(),
                    });
                    false
                }
            },
        };

        if removed {
            catalog.record_history("delete", &json!({ "path": path_str, "reason": "duplicate" }))?;
            catalog.delete(path_str)?;
            deleted.push(path_str.clone());
        }
    }

    Ok(DeleteOutcome {
        success: errors.is_empty(),
        deleted,
        errors,
    })
}
