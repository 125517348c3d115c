//! Glob pattern parsing and matching.
//!
//! One canonical implementation backs both user-supplied include/exclude
//! lists and `.gitignore`-derived rules: patterns are parsed and expanded
//! once, compiled into a [`PatternSet`], and consulted by the scanner for
//! every candidate path.

use crate::error::{Error, Result};
use globset::{Glob, GlobMatcher};
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

/// Built-in exclusions applied ahead of user patterns. Directory entries
/// carry a trailing separator and expand like ignore-file rules, so they
/// match at any depth.
const DEFAULT_IGNORE_PATTERNS: &[&str] = &[
    ".git/",
    "*.pyc",
    "__pycache__/",
    "node_modules/",
    "*.class",
    "target/",
    "dist/",
    "build/",
    "*.jar",
    "*.war",
    "*.ear",
    "*.zip",
    "*.png",
    "*.jpg",
    "*.jpeg",
    "*.gif",
    "*.ico",
    "*.pdf",
    "*.mov",
    "*.mp4",
    "*.mp3",
    "*.wav",
];

/// The expanded default ignore list, ready to head a combined pattern set.
pub(crate) fn default_patterns() -> Vec<String> {
    dedupe(
        DEFAULT_IGNORE_PATTERNS
            .iter()
            .flat_map(|p| normalize_pattern(p))
            .collect(),
    )
}

const ALLOWED_PATTERN_CHARS: &str = "-_./+*";

/// Tests a single relative path against a single glob pattern.
///
/// Glob semantics: `*` matches any run of characters including path
/// separators, `?` matches one character, bracket classes are supported.
/// An uncompilable pattern matches nothing.
#[must_use]
pub fn matches(relative_path: &str, pattern: &str) -> bool {
    Glob::new(pattern)
        .map(|g| g.compile_matcher().is_match(relative_path))
        .unwrap_or(false)
}

/// Parses and validates user-supplied patterns.
///
/// Inputs are split on commas and spaces, checked against the allowed
/// character set, stripped of leading separators, and directory patterns
/// (trailing `/`) are expanded to their derived glob forms. The result is
/// deduplicated while preserving first-seen order.
///
/// # Errors
///
/// Returns [`Error::InvalidPattern`] if a pattern contains characters
/// outside `[A-Za-z0-9-_./+*]`.
pub fn parse_patterns<S: AsRef<str>>(inputs: &[S]) -> Result<Vec<String>> {
    let mut parsed = Vec::new();
    for input in inputs {
        for raw in input.as_ref().split([',', ' ']) {
            if raw.is_empty() {
                continue;
            }
            validate_pattern(raw)?;
            parsed.extend(normalize_pattern(raw));
        }
    }
    Ok(dedupe(parsed))
}

/// Reads an ignore-rules file and returns its patterns.
///
/// Blank lines and `#`-prefixed lines are skipped. Lines with a trailing
/// separator are directory patterns and expand to the derived glob forms.
/// Lines that fail to compile as globs are dropped with a warning, never
/// an error. A missing or unreadable file yields an empty list.
pub fn parse_ignore_file(path: &Path) -> Vec<String> {
    let contents = match fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            debug!("No ignore file at {}: {}", path.display(), e);
            return Vec::new();
        }
    };

    let mut patterns = Vec::new();
    for line in contents.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        for pattern in normalize_pattern(line) {
            if Glob::new(pattern.trim_end_matches('/')).is_err() {
                warn!("Skipping unparseable ignore pattern '{pattern}'");
                continue;
            }
            patterns.push(pattern);
        }
    }
    dedupe(patterns)
}

fn validate_pattern(pattern: &str) -> Result<()> {
    if pattern
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || ALLOWED_PATTERN_CHARS.contains(c))
    {
        Ok(())
    } else {
        Err(Error::invalid_pattern(
            pattern,
            "only alphanumeric characters, dash (-), underscore (_), dot (.), \
             slash (/), plus (+) and asterisk (*) are allowed",
        ))
    }
}

/// Normalizes one pattern, expanding directory patterns to the four
/// derived glob forms: the bare name, its descendants, the name anywhere
/// in the tree, and its descendants anywhere in the tree.
fn normalize_pattern(pattern: &str) -> Vec<String> {
    let pattern = pattern.trim().trim_start_matches('/');
    if let Some(base) = pattern.strip_suffix('/') {
        vec![
            base.to_string(),
            format!("{base}/**"),
            format!("**/{base}"),
            format!("**/{base}/**"),
        ]
    } else {
        vec![pattern.to_string()]
    }
}

fn dedupe(patterns: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    patterns
        .into_iter()
        .filter(|p| !p.is_empty() && seen.insert(p.clone()))
        .collect()
}

struct CompiledPattern {
    base: String,
    is_dir: bool,
    matcher: GlobMatcher,
}

/// An ordered, deduplicated, compiled list of glob patterns.
pub struct PatternSet {
    patterns: Vec<CompiledPattern>,
}

impl PatternSet {
    /// Compiles a list of raw patterns.
    ///
    /// Duplicates are removed preserving first-seen order. A pattern with
    /// a trailing separator is a directory pattern: besides its glob form
    /// it matches the path itself and everything beneath it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPattern`] if a pattern cannot be compiled
    /// as a glob.
    pub fn new<S: AsRef<str>>(raw: &[S]) -> Result<Self> {
        let deduped = dedupe(raw.iter().map(|p| p.as_ref().to_string()).collect());
        let mut patterns = Vec::with_capacity(deduped.len());
        for pattern in &deduped {
            let is_dir = pattern.ends_with('/');
            let base = pattern.trim_end_matches('/').to_string();
            let matcher = Glob::new(&base)
                .map_err(|e| Error::invalid_pattern(pattern.clone(), e.to_string()))?
                .compile_matcher();
            patterns.push(CompiledPattern {
                base,
                is_dir,
                matcher,
            });
        }
        Ok(Self { patterns })
    }

    /// Returns true when no patterns are present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Number of compiled patterns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    /// True if any ignore pattern matches the relative path.
    ///
    /// Directory patterns additionally match the path itself and any path
    /// that starts with `base + "/"`.
    #[must_use]
    pub fn is_excluded(&self, relative_path: &str) -> bool {
        self.patterns.iter().any(|p| {
            if p.is_dir {
                relative_path == p.base
                    || relative_path.starts_with(&format!("{}/", p.base))
                    || p.matcher.is_match(relative_path)
            } else {
                p.matcher.is_match(relative_path)
            }
        })
    }

    /// True if the path matches at least one pattern, or the set is empty.
    ///
    /// Used for include lists: an absent list admits everything, a present
    /// list restricts files to those matching at least one glob.
    #[must_use]
    pub fn is_included(&self, relative_path: &str) -> bool {
        self.patterns.is_empty() || self.patterns.iter().any(|p| p.matcher.is_match(relative_path))
    }
}

impl std::fmt::Debug for PatternSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.patterns.iter().map(|p| &p.base))
            .finish()
    }
}
