use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using the library's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Comprehensive error types for the repodigest library.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// IO error with context about the file path.
    #[error("IO error accessing '{path}': {message}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// Error message
        message: String,
    },

    /// Source string could not be parsed as a repository URL.
    #[error("Invalid repository URL: {message}")]
    InvalidUrl {
        /// Detailed error message
        message: String,
    },

    /// Pattern contains characters outside the allowed set.
    #[error("Pattern '{pattern}' is invalid: {reason}")]
    InvalidPattern {
        /// The invalid pattern
        pattern: String,
        /// Reason why it's invalid
        reason: String,
    },

    /// The resolved source path does not exist.
    #[error("'{slug}' cannot be found")]
    NotFound {
        /// Slug or path that was looked up
        slug: String,
    },

    /// A directory was expected at the given path.
    #[error("Path is not a directory: {path}")]
    NotADirectory {
        /// Offending path
        path: PathBuf,
    },

    /// A single file was expected at the given path.
    #[error("Path '{path}' is not a file")]
    NotAFile {
        /// Offending path
        path: PathBuf,
    },

    /// A single-file digest was requested for a non-text file.
    #[error("File '{path}' is not a text file")]
    NotText {
        /// Offending path
        path: PathBuf,
    },

    /// The external git client failed to materialize the repository.
    #[error("Failed to clone repository: {message}")]
    Clone {
        /// stderr (or spawn failure) from the git client
        message: String,
    },
}

impl Error {
    /// Creates an IO error with path context.
    #[must_use]
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            message: source.to_string(),
        }
    }

    /// Creates an invalid URL error.
    #[must_use]
    pub fn invalid_url(message: impl Into<String>) -> Self {
        Self::InvalidUrl {
            message: message.into(),
        }
    }

    /// Creates an invalid pattern error.
    #[must_use]
    pub fn invalid_pattern(pattern: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidPattern {
            pattern: pattern.into(),
            reason: reason.into(),
        }
    }

    /// Creates a not-found error for a slug or path.
    #[must_use]
    pub fn not_found(slug: impl Into<String>) -> Self {
        Self::NotFound { slug: slug.into() }
    }

    /// Creates a clone failure error.
    #[must_use]
    pub fn clone_failed(message: impl Into<String>) -> Self {
        Self::Clone {
            message: message.into(),
        }
    }

    /// Returns true if this is an IO error.
    #[must_use]
    pub const fn is_io(&self) -> bool {
        matches!(self, Self::Io { .. })
    }

    /// Returns true if this error aborted before any scan started.
    #[must_use]
    pub const fn is_input(&self) -> bool {
        matches!(
            self,
            Self::InvalidUrl { .. }
                | Self::InvalidPattern { .. }
                | Self::NotFound { .. }
                | Self::NotADirectory { .. }
                | Self::NotAFile { .. }
                | Self::NotText { .. }
        )
    }
}
