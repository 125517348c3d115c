//! Materializes remote repositories into a local temporary directory.
//!
//! Fetching is delegated to the external `git` client; the pipeline awaits
//! the clone to completion before scanning and treats any non-success exit
//! as fatal. No retries.

use crate::cleanup;
use crate::error::{Error, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::{debug, info};

/// Parameters for one repository fetch.
#[derive(Debug, Clone)]
pub struct CloneConfig {
    /// Repository URL, e.g. `https://github.com/owner/repo`
    pub url: String,

    /// Destination directory; must not already exist
    pub local_path: PathBuf,

    /// Branch to fetch, when the locator named one
    pub branch: Option<String>,

    /// Commit to check out, when the locator carried a 40-hex ref
    pub commit: Option<String>,
}

/// Clones a repository into `config.local_path`.
///
/// A branch ref fetches a shallow single-branch clone; a commit ref needs
/// history, so it fetches the full clone and checks the commit out.
///
/// # Errors
///
/// Returns [`Error::Clone`] if the destination already exists, the git
/// client cannot be spawned, or it exits unsuccessfully.
pub async fn clone_repo(config: &CloneConfig) -> Result<()> {
    if config.local_path.exists() {
        return Err(Error::clone_failed(format!(
            "destination already exists: {}",
            config.local_path.display()
        )));
    }
    if let Some(parent) = config.local_path.parent() {
        fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
    }

    info!("Cloning {} into {}", config.url, config.local_path.display());

    let dest = path_arg(&config.local_path);
    let url = config.url.as_str();

    if let Some(commit) = &config.commit {
        run_git(&["clone", url, dest.as_str()]).await?;
        debug!("Checking out commit {commit}");
        run_git(&["-C", dest.as_str(), "checkout", commit.as_str()]).await?;
    } else if let Some(branch) = &config.branch {
        run_git(&[
            "clone",
            "--depth=1",
            "--single-branch",
            "--branch",
            branch.as_str(),
            url,
            dest.as_str(),
        ])
        .await?;
    } else {
        run_git(&["clone", "--depth=1", url, dest.as_str()]).await?;
    }

    info!("Repository cloned successfully");
    Ok(())
}

async fn run_git(args: &[&str]) -> Result<()> {
    let output = Command::new("git")
        .args(args)
        .output()
        .await
        .map_err(|e| Error::clone_failed(format!("could not run git: {e}")))?;

    if output.status.success() {
        Ok(())
    } else {
        Err(Error::clone_failed(
            String::from_utf8_lossy(&output.stderr).trim().to_string(),
        ))
    }
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

/// Owns the temporary directory holding a materialized repository.
///
/// Dropping the guard triggers best-effort removal, so cleanup runs exactly
/// once per invocation on success, fetch failure, and every error path in
/// between.
#[derive(Debug)]
pub(crate) struct TempRepo {
    root: PathBuf,
}

impl TempRepo {
    pub(crate) fn new(root: PathBuf) -> Self {
        Self { root }
    }
}

impl Drop for TempRepo {
    fn drop(&mut self) {
        cleanup::remove_dir_best_effort(&self.root);
    }
}
