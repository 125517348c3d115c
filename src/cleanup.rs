//! Best-effort removal of temporary materialized repositories.
//!
//! Clone clients leave read-only objects behind (pack files, hooks), so a
//! plain `remove_dir_all` can fail on otherwise healthy trees. Removal here
//! normalizes permissions first, deletes files before directories, and
//! retries a bounded number of times. It never returns an error: residue is
//! logged and left for the OS temp reaper.

use std::fs;
use std::path::Path;
use tracing::{debug, warn};
use walkdir::WalkDir;

const MAX_ATTEMPTS: usize = 3;

/// Removes a directory tree, tolerating locked and read-only entries.
///
/// Safe to call on a path that does not exist. Per-entry failures are
/// ignored until the final attempt, after which anything left is logged
/// as a warning.
pub(crate) fn remove_dir_best_effort(path: &Path) {
    for attempt in 1..=MAX_ATTEMPTS {
        if !path.exists() {
            return;
        }

        normalize_permissions(path);
        remove_entries(path);

        if fs::remove_dir_all(path).is_ok() || !path.exists() {
            debug!("Removed temporary directory {}", path.display());
            return;
        }

        warn!(
            "Cleanup attempt {attempt}/{MAX_ATTEMPTS} left residue in {}",
            path.display()
        );
    }

    if path.exists() {
        warn!(
            "Could not fully remove temporary directory {}",
            path.display()
        );
    }
}

/// Clears read-only bits on every entry so removal can proceed.
fn normalize_permissions(path: &Path) {
    for entry in WalkDir::new(path).into_iter().filter_map(std::result::Result::ok) {
        let Ok(metadata) = entry.metadata() else {
            continue;
        };
        let mut permissions = metadata.permissions();
        if permissions.readonly() {
            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                permissions.set_mode(0o777);
            }
            #[cfg(not(unix))]
            permissions.set_readonly(false);
            let _ = fs::set_permissions(entry.path(), permissions);
        }
    }
}

/// Removes files first, then directories bottom-up, ignoring failures.
fn remove_entries(path: &Path) {
    for entry in WalkDir::new(path)
        .contents_first(true)
        .into_iter()
        .filter_map(std::result::Result::ok)
    {
        let result = if entry.file_type().is_dir() {
            fs::remove_dir(entry.path())
        } else {
            fs::remove_file(entry.path())
        };
        if let Err(e) = result {
            debug!("Could not remove {}: {}", entry.path().display(), e);
        }
    }
}
