//! Recursive directory scanning with filtering and safety limits.
//!
//! The walk is single-threaded and depth-first, visiting children in
//! lexicographic name order for deterministic output. Each call returns the
//! subtree it scanned; the caller composes child aggregates into the parent,
//! and the global byte/file budget is threaded explicitly down the
//! recursion.

use crate::query::Query;
use std::collections::HashSet;
use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, trace, warn};

/// Ceiling on the total bytes admitted across one walk.
pub(crate) const MAX_TOTAL_SIZE_BYTES: u64 = 500 * 1024 * 1024;

/// Ceiling on the total files admitted across one walk.
pub(crate) const MAX_FILES: usize = 10_000;

const SNIFF_LEN: usize = 1024;

/// Content of a scanned file: text, or a sentinel explaining its absence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileContent {
    /// UTF-8 text (invalid sequences substituted)
    Text(String),
    /// Classified as binary by content sniffing
    Binary,
    /// Within the walk's admission limit but over the render limit
    Oversized,
    /// Admitted but unreadable; skipped with a warning
    Unreadable,
}

/// A file entry in the scanned tree.
#[derive(Debug, Clone)]
pub struct FileNode {
    /// File name
    pub name: String,

    /// Path relative to the resolved root, `/`-separated
    pub rel_path: String,

    /// Size in bytes
    pub size: u64,

    /// Text content or a sentinel
    pub content: FileContent,
}

impl FileNode {
    /// Returns the text content, if any.
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        match &self.content {
            FileContent::Text(s) => Some(s),
            _ => None,
        }
    }
}

/// A directory entry in the scanned tree with composed aggregates.
#[derive(Debug, Clone, Default)]
pub struct DirNode {
    /// Directory name
    pub name: String,

    /// Path relative to the resolved root, `/`-separated; empty at the root
    pub rel_path: String,

    /// Total bytes of admitted descendant files
    pub size: u64,

    /// Number of admitted descendant files
    pub file_count: usize,

    /// Number of retained descendant directories
    pub dir_count: usize,

    /// Children in lexicographic name order
    pub children: Vec<Node>,
}

impl DirNode {
    fn empty(name: String, rel_path: String) -> Self {
        Self {
            name,
            rel_path,
            ..Self::default()
        }
    }
}

/// A node of the scanned tree.
#[derive(Debug, Clone)]
pub enum Node {
    /// Directory with children
    Dir(DirNode),
    /// File with content or sentinel
    File(FileNode),
}

/// Explicit byte/file budget threaded through one walk.
#[derive(Debug, Default)]
struct ScanBudget {
    total_bytes: u64,
    total_files: usize,
}

enum Admission {
    Admit,
    SkipSize,
    StopFiles,
}

impl ScanBudget {
    /// Decides whether a file of `size` bytes may be admitted, updating
    /// the running totals on admission.
    fn admit(&mut self, size: u64) -> Admission {
        if self.total_files >= MAX_FILES {
            return Admission::StopFiles;
        }
        if self.total_bytes + size > MAX_TOTAL_SIZE_BYTES {
            return Admission::SkipSize;
        }
        self.total_bytes += size;
        self.total_files += 1;
        Admission::Admit
    }

    fn exhausted(&self) -> bool {
        self.total_files >= MAX_FILES
    }
}

/// Scans `root` into a tree of directories and files.
///
/// Exclusion applies to files and directories, inclusion to files only;
/// an already-excluded path is never resurrected by an include pattern.
/// Resource limits degrade the result to a partial tree, never an error.
#[must_use]
pub fn scan(root: &Path, query: &Query) -> DirNode {
    let mut seen = HashSet::new();
    let mut budget = ScanBudget::default();
    let node = scan_dir(root, root, query, &mut seen, &mut budget);
    debug!(
        "Scan complete: {} files, {} bytes",
        budget.total_files, budget.total_bytes
    );
    node
}

fn scan_dir(
    path: &Path,
    root: &Path,
    query: &Query,
    seen: &mut HashSet<PathBuf>,
    budget: &mut ScanBudget,
) -> DirNode {
    let name = path
        .file_name()
        .map_or_else(String::new, |n| n.to_string_lossy().into_owned());
    let rel_path = relative_path(root, path);
    let mut node = DirNode::empty(name, rel_path);

    // Loop protection: refuse to re-enter a real path already visited.
    match path.canonicalize() {
        Ok(real) => {
            if !seen.insert(real) {
                warn!("Skipping already visited path: {}", path.display());
                return node;
            }
        }
        Err(e) => {
            warn!("Cannot resolve {}: {}", path.display(), e);
            return node;
        }
    }

    let entries = match read_sorted(path) {
        Ok(entries) => entries,
        Err(e) => {
            warn!("Permission denied reading {}: {}", path.display(), e);
            return node;
        }
    };

    for entry_path in entries {
        if budget.exhausted() {
            warn!("Maximum file limit ({MAX_FILES}) reached, stopping descent");
            break;
        }

        let rel = relative_path(root, &entry_path);
        if query.ignore_patterns.is_excluded(&rel) {
            trace!("Excluded: {rel}");
            continue;
        }

        let metadata = match fs::metadata(&entry_path) {
            Ok(m) => m,
            Err(e) => {
                warn!("Cannot stat {}: {}", entry_path.display(), e);
                continue;
            }
        };

        if metadata.is_file() {
            if query
                .include_patterns
                .as_ref()
                .is_some_and(|inc| !inc.is_included(&rel))
            {
                trace!("Not included: {rel}");
                continue;
            }

            let size = metadata.len();
            match budget.admit(size) {
                Admission::Admit => {}
                Admission::SkipSize => {
                    warn!("Skipping {rel}: would exceed total size limit");
                    continue;
                }
                Admission::StopFiles => break,
            }

            let file = FileNode {
                name: entry_path
                    .file_name()
                    .map_or_else(String::new, |n| n.to_string_lossy().into_owned()),
                rel_path: rel,
                size,
                content: load_content(&entry_path, size, query.max_file_size),
            };
            node.size += size;
            node.file_count += 1;
            node.children.push(Node::File(file));
        } else if metadata.is_dir() {
            let subdir = scan_dir(&entry_path, root, query, seen, budget);

            // With include patterns active, an empty subtree is dropped.
            if query.include_patterns.is_some() && subdir.file_count == 0 {
                continue;
            }
            node.size += subdir.size;
            node.file_count += subdir.file_count;
            node.dir_count += 1 + subdir.dir_count;
            node.children.push(Node::Dir(subdir));
        }
    }

    node
}

/// Directory entries sorted lexicographically by name.
fn read_sorted(path: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut names: Vec<_> = fs::read_dir(path)?
        .filter_map(std::result::Result::ok)
        .map(|e| e.file_name())
        .collect();
    names.sort();
    Ok(names.into_iter().map(|n| path.join(n)).collect())
}

fn load_content(path: &Path, size: u64, max_file_size: u64) -> FileContent {
    if !is_text_file(path) {
        trace!("Binary file: {}", path.display());
        return FileContent::Binary;
    }
    if size > max_file_size {
        debug!("Oversized file: {} ({size} bytes)", path.display());
        return FileContent::Oversized;
    }
    match fs::read(path) {
        Ok(bytes) => FileContent::Text(String::from_utf8_lossy(&bytes).into_owned()),
        Err(e) => {
            warn!("Error reading {}: {}", path.display(), e);
            FileContent::Unreadable
        }
    }
}

/// Classifies a file as text by sampling its first 1024 bytes.
///
/// Binary iff the sample contains a byte outside the allow-list
/// (bell, backspace, tab, newline, form-feed, carriage return, escape,
/// and the printable range). A sniff failure classifies as binary.
pub(crate) fn is_text_file(path: &Path) -> bool {
    let mut buffer = [0u8; SNIFF_LEN];
    let bytes_read = match File::open(path).and_then(|mut f| f.read(&mut buffer)) {
        Ok(n) => n,
        Err(_) => return false,
    };
    let sample = &buffer[..bytes_read];

    // NUL is the overwhelmingly common binary marker; probe it first.
    if memchr::memchr(0, sample).is_some() {
        return false;
    }

    sample
        .iter()
        .all(|&b| matches!(b, 7..=10 | 12 | 13 | 27) || b >= 0x20)
}

fn relative_path(root: &Path, path: &Path) -> String {
    pathdiff::diff_paths(path, root)
        .unwrap_or_else(|| path.to_path_buf())
        .to_string_lossy()
        .replace('\\', "/")
}
