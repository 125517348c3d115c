//! Pipeline orchestration: resolve → materialize → scan → render → write.
//!
//! The repository fetch is the pipeline's only suspension point; everything
//! after it is synchronous. A temporary clone is removed on every exit path
//! by the guard's drop, including fetch failure.

use crate::clone::{self, CloneConfig, TempRepo};
use crate::error::{Error, Result};
use crate::query::Query;
use crate::render::{self, Digest};
use crate::scanner;
use std::path::PathBuf;
use tracing::{info, instrument};

/// Options for one digest invocation.
#[derive(Debug, Clone)]
pub struct IngestOptions {
    /// Local path or repository locator
    pub source: String,

    /// Where to write the digest; `None` skips the file write
    pub output: Option<PathBuf>,

    /// Per-file render limit in bytes
    pub max_file_size: u64,

    /// Include patterns (comma/space separated entries allowed)
    pub include_patterns: Vec<String>,

    /// Exclude patterns (comma/space separated entries allowed)
    pub exclude_patterns: Vec<String>,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            source: ".".to_string(),
            output: None,
            max_file_size: crate::query::DEFAULT_MAX_FILE_SIZE,
            include_patterns: Vec::new(),
            exclude_patterns: Vec::new(),
        }
    }
}

/// Analyzes a directory or remote repository and produces its digest.
///
/// Remote sources are materialized with the external git client before
/// scanning; the temporary clone is always removed afterwards, whether the
/// pipeline succeeds or fails.
///
/// # Errors
///
/// Returns an error for a malformed source locator, invalid patterns, a
/// nonexistent path, a failed fetch, or a failed output write. Resource
/// limits and unreadable entries degrade the digest instead of failing.
#[instrument(skip_all, fields(source = %options.source))]
pub async fn ingest(options: &IngestOptions) -> Result<Digest> {
    let query = Query::resolve(
        &options.source,
        options.max_file_size,
        &options.include_patterns,
        &options.exclude_patterns,
    )?;

    // The guard owns the temp directory from before the clone starts, so
    // a half-written clone is still removed when the fetch fails.
    let _temp_guard: Option<TempRepo> = match (query.remote(), query.temp_root()) {
        (Some(remote), Some(temp_root)) => {
            let guard = TempRepo::new(temp_root);
            clone::clone_repo(&CloneConfig {
                url: remote.url.clone(),
                local_path: query.local_path.clone(),
                branch: remote.branch.clone(),
                commit: remote.commit.clone(),
            })
            .await?;
            Some(guard)
        }
        _ => None,
    };

    let digest = build_digest(&query)?;

    if let Some(output) = &options.output {
        digest.write_to(output)?;
        info!("Digest written to {}", output.display());
    }

    Ok(digest)
}

fn build_digest(query: &Query) -> Result<Digest> {
    let root = query.root_path();
    if !root.exists() {
        return Err(Error::not_found(&query.slug));
    }

    if query.remote().is_some_and(|r| r.is_blob) {
        return render::render_single_file(query, &root);
    }

    if !root.is_dir() {
        return Err(Error::NotADirectory { path: root });
    }

    info!("Scanning {}", root.display());
    let tree = scanner::scan(&root, query);
    Ok(render::render_directory(query, &tree))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_fs::prelude::*;

    #[tokio::test]
    async fn test_ingest_local_directory() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child("a.txt").write_str("hello").unwrap();

        let options = IngestOptions {
            source: temp.path().to_str().unwrap().to_string(),
            ..IngestOptions::default()
        };
        let digest = ingest(&options).await.unwrap();

        assert_eq!(digest.tree, "Directory structure:\n└── a.txt\n");
        assert!(digest.content.contains("File: /a.txt"));
        assert!(digest.summary.contains("Files analyzed: 1"));
    }

    #[tokio::test]
    async fn test_ingest_writes_output_file() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child("a.txt").write_str("hello").unwrap();
        let output = temp.path().join("digest.txt");

        let options = IngestOptions {
            source: temp.path().to_str().unwrap().to_string(),
            output: Some(output.clone()),
            ..IngestOptions::default()
        };
        let digest = ingest(&options).await.unwrap();

        let written = std::fs::read_to_string(&output).unwrap();
        assert_eq!(
            written,
            format!("{}\n\n{}\n\n{}", digest.summary, digest.tree, digest.content)
        );
    }

    #[tokio::test]
    async fn test_ingest_nonexistent_path() {
        let options = IngestOptions {
            source: "/definitely/not/a/real/path".to_string(),
            ..IngestOptions::default()
        };
        let err = ingest(&options).await.unwrap_err();
        assert!(err.to_string().contains("cannot be found"));
    }

    #[tokio::test]
    async fn test_ingest_file_source_is_rejected() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child("plain.txt").write_str("x").unwrap();

        let options = IngestOptions {
            source: temp.path().join("plain.txt").to_str().unwrap().to_string(),
            ..IngestOptions::default()
        };
        let err = ingest(&options).await.unwrap_err();
        assert!(err.to_string().contains("not a directory"));
    }

    #[tokio::test]
    async fn test_ingest_patterns_applied() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child("src/lib.rs").write_str("pub fn l() {}").unwrap();
        temp.child("src/notes.md").write_str("# notes").unwrap();

        let options = IngestOptions {
            source: temp.path().to_str().unwrap().to_string(),
            include_patterns: vec!["*.rs".to_string()],
            ..IngestOptions::default()
        };
        let digest = ingest(&options).await.unwrap();

        assert!(digest.content.contains("File: /src/lib.rs"));
        assert!(!digest.content.contains("notes.md"));
    }

    #[tokio::test]
    async fn test_ingest_fetch_failure_is_fatal() {
        // An unresolvable host makes the git client fail fast; the error
        // surfaces as a clone failure and the guard removes its temp tree
        // on the way out.
        let options = IngestOptions {
            source: "https://github.invalid.example/owner/repo".to_string(),
            ..IngestOptions::default()
        };
        let err = ingest(&options).await.unwrap_err();
        assert!(matches!(err, Error::Clone { .. }));
    }
}
