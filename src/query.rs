//! Source resolution: raw source string → immutable [`Query`].
//!
//! A source is either a remote repository locator (recognized by URL
//! patterns, tolerating a missing scheme and text around the URL) or a
//! local filesystem path. Pattern lists are parsed and compiled here so
//! the rest of the pipeline never sees raw strings.

use crate::error::{Error, Result};
use crate::pattern::{self, PatternSet};
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use uuid::Uuid;

/// Default per-file render limit: larger text files keep a sentinel.
pub const DEFAULT_MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

static DIRECT_URL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(https?://)?github\.com/[\w-]+/[\w-]+(/.*)?$").unwrap());
static EMBEDDED_URL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"github\.com/[\w-]+/[\w-]+").unwrap());
static GENERIC_URL: Lazy<Regex> = Lazy::new(|| Regex::new(r"https?://\S+").unwrap());

/// Where the source content comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceKind {
    /// A directory already on the local filesystem.
    Local,
    /// A remote repository that must be materialized first.
    Remote(RemoteRepo),
}

/// Coordinates of a remote repository locator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteRepo {
    /// Normalized clone URL (`https://host/owner/repo`)
    pub url: String,

    /// Repository owner
    pub owner: String,

    /// Repository name
    pub name: String,

    /// Branch named by a `/tree/` or `/blob/` segment
    pub branch: Option<String>,

    /// Commit hash named by a 40-hex ref token
    pub commit: Option<String>,

    /// True when the locator addressed a single file (`/blob/`)
    pub is_blob: bool,
}

/// The resolved intent of one invocation. Built once, then immutable.
#[derive(Debug)]
pub struct Query {
    /// Local or remote source
    pub source: SourceKind,

    /// Resolved root path (clone destination for remote sources)
    pub local_path: PathBuf,

    /// Subpath within the source, `/` for the whole tree
    pub subpath: String,

    /// Short identifier for the source (owner-repo or directory name)
    pub slug: String,

    /// Per-file render limit in bytes
    pub max_file_size: u64,

    /// Ordered ignore patterns (defaults, ignore file, user)
    pub ignore_patterns: PatternSet,

    /// Include patterns; `None` admits every un-excluded file
    pub include_patterns: Option<PatternSet>,
}

impl Query {
    /// Resolves a source string and pattern lists into a query.
    ///
    /// # Errors
    ///
    /// Returns an input error for a malformed repository URL or a pattern
    /// containing invalid characters.
    pub fn resolve<S: AsRef<str>>(
        source: &str,
        max_file_size: u64,
        include_patterns: &[S],
        exclude_patterns: &[S],
    ) -> Result<Self> {
        let user_excludes = pattern::parse_patterns(exclude_patterns)?;
        let user_includes = pattern::parse_patterns(include_patterns)?;
        let include_patterns = if user_includes.is_empty() {
            None
        } else {
            Some(PatternSet::new(&user_includes)?)
        };

        if let Some(url) = extract_valid_url(source) {
            info!("Detected remote repository: {url}");
            Self::resolve_remote(&url, max_file_size, user_excludes, include_patterns)
        } else {
            debug!("Detected local path: {source}");
            Self::resolve_local(source, max_file_size, user_excludes, include_patterns)
        }
    }

    fn resolve_remote(
        url: &str,
        max_file_size: u64,
        user_excludes: Vec<String>,
        include_patterns: Option<PatternSet>,
    ) -> Result<Self> {
        let (remote, subpath) = parse_remote_url(url)?;
        let slug = format!("{}-{}", remote.owner, remote.name);
        let local_path = std::env::temp_dir()
            .join("repodigest")
            .join(Uuid::new_v4().to_string())
            .join(&slug);

        let mut ignore = pattern::default_patterns();
        ignore.extend(user_excludes);

        Ok(Self {
            source: SourceKind::Remote(remote),
            local_path,
            subpath,
            slug,
            max_file_size,
            ignore_patterns: PatternSet::new(&ignore)?,
            include_patterns,
        })
    }

    fn resolve_local(
        source: &str,
        max_file_size: u64,
        user_excludes: Vec<String>,
        include_patterns: Option<PatternSet>,
    ) -> Result<Self> {
        let raw = Path::new(source);
        let local_path = if raw.exists() {
            raw.canonicalize().map_err(|e| Error::io(raw, e))?
        } else {
            std::path::absolute(raw).map_err(|e| Error::io(raw, e))?
        };
        let slug = local_path
            .file_name()
            .map_or_else(|| local_path.to_string_lossy().into_owned(), |n| {
                n.to_string_lossy().into_owned()
            });

        // Root-level ignore rules are merged ahead of user patterns.
        let mut ignore = pattern::default_patterns();
        ignore.extend(pattern::parse_ignore_file(&local_path.join(".gitignore")));
        ignore.extend(user_excludes);

        Ok(Self {
            source: SourceKind::Local,
            local_path,
            subpath: "/".to_string(),
            slug,
            max_file_size,
            ignore_patterns: PatternSet::new(&ignore)?,
            include_patterns,
        })
    }

    /// The directory (or file) the scan starts from.
    #[must_use]
    pub fn root_path(&self) -> PathBuf {
        let subpath = self.subpath.trim_matches('/');
        if subpath.is_empty() {
            self.local_path.clone()
        } else {
            self.local_path.join(subpath)
        }
    }

    /// Remote coordinates, when the source is remote.
    #[must_use]
    pub fn remote(&self) -> Option<&RemoteRepo> {
        match &self.source {
            SourceKind::Remote(remote) => Some(remote),
            SourceKind::Local => None,
        }
    }

    /// The per-invocation temp directory to remove after the run.
    ///
    /// This is one level above the clone destination, so the repository
    /// directory and its uuid parent go together.
    #[must_use]
    pub(crate) fn temp_root(&self) -> Option<PathBuf> {
        match &self.source {
            SourceKind::Remote(_) => self.local_path.parent().map(Path::to_path_buf),
            SourceKind::Local => None,
        }
    }
}

/// Extracts a well-formed repository URL from the source string, if any.
///
/// Tries, in order: a direct GitHub locator (scheme optional), a locator
/// embedded in surrounding text or a Windows-style path, and a generic
/// `http(s)` URL.
#[must_use]
pub fn extract_valid_url(source: &str) -> Option<String> {
    let source = source.trim().replace('\\', "/");

    if let Some(m) = DIRECT_URL.find(&source) {
        let url = m.as_str();
        return Some(if url.starts_with("http") {
            url.to_string()
        } else {
            format!("https://{url}")
        });
    }

    if let Some(m) = EMBEDDED_URL.find(&source) {
        return Some(format!("https://{}", m.as_str()));
    }

    GENERIC_URL.find(&source).map(|m| m.as_str().to_string())
}

/// Parses a repository URL into remote coordinates plus a subpath.
fn parse_remote_url(url: &str) -> Result<(RemoteRepo, String)> {
    // Anything after the first whitespace is noise.
    let url = url.split_whitespace().next().unwrap_or_default();
    let url = if url.starts_with("http://") || url.starts_with("https://") {
        url.to_string()
    } else {
        format!("https://{url}")
    };

    let without_scheme = url
        .trim_start_matches("https://")
        .trim_start_matches("http://");
    let (host, path) = without_scheme.split_once('/').unwrap_or((without_scheme, ""));
    if host.is_empty() {
        return Err(Error::invalid_url(
            "please provide a valid Git repository URL",
        ));
    }

    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    if segments.len() < 2 {
        return Err(Error::invalid_url(
            "please provide a valid Git repository URL",
        ));
    }

    let owner = segments[0].to_string();
    let name = segments[1].to_string();
    let mut remote = RemoteRepo {
        url: format!("https://{host}/{owner}/{name}"),
        owner,
        name,
        branch: None,
        commit: None,
        is_blob: false,
    };
    let mut subpath = "/".to_string();

    // `/issues/...` and `/pull/...` address the repository itself.
    if matches!(segments.get(2), Some(&"issues" | &"pull")) {
        return Ok((remote, subpath));
    }

    if segments.len() >= 4 && matches!(segments[2], "tree" | "blob") {
        remote.is_blob = segments[2] == "blob";
        let reference = segments[3];
        if is_commit_hash(reference) {
            remote.commit = Some(reference.to_string());
        } else {
            remote.branch = Some(reference.to_string());
        }
        if segments.len() > 4 {
            subpath.push_str(&segments[4..].join("/"));
        }
    }

    Ok((remote, subpath))
}

/// A 40-character hexadecimal token is a commit hash; anything else in the
/// ref position is a branch name.
fn is_commit_hash(token: &str) -> bool {
    token.len() == 40 && token.chars().all(|c| c.is_ascii_hexdigit())
}
