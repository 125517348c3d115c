//! # repodigest
//!
//! Turn a directory or GitHub repository into a single LLM-ready text digest.
//!
//! ## Features
//!
//! - Local directories and remote GitHub locators (branch, commit, subpath)
//! - Include/exclude glob filtering with `.gitignore`-derived rules
//! - Directory-tree header with box-drawing connectors
//! - Token estimate in the summary (`cl100k_base`)
//! - Best-effort cleanup of temporary clones
//!
//! ## Quick Start
//!
//! ```no_run
//! use repodigest::{ingest, IngestOptions};
//!
//! # #[tokio::main]
//! # async fn main() -> anyhow::Result<()> {
//! let options = IngestOptions {
//!     source: "https://github.com/owner/repo".to_string(),
//!     output: Some("repo.txt".into()),
//!     ..IngestOptions::default()
//! };
//!
//! let digest = ingest(&options).await?;
//! println!("{}", digest.summary);
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! One pass per invocation:
//! 1. **Query**: resolves the source into a local path or remote locator
//! 2. **Clone**: materializes remote repositories via the git client
//! 3. **Scanner**: walks the tree, filtering and loading text contents
//! 4. **Render**: produces the summary, tree diagram, and content block
//! 5. **Cleanup**: removes the temporary clone on every exit path

#![warn(
    missing_docs,
    rust_2018_idioms,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery
)]
#![allow(clippy::module_name_repetitions)]

mod cleanup;
mod clone;
mod error;
mod ingest;
mod pattern;
mod query;
mod render;
mod scanner;
mod token;

pub use clone::{clone_repo, CloneConfig};
pub use error::{Error, Result};
pub use ingest::{ingest, IngestOptions};
pub use pattern::{matches, parse_ignore_file, parse_patterns, PatternSet};
pub use query::{Query, RemoteRepo, SourceKind, DEFAULT_MAX_FILE_SIZE};
pub use render::Digest;
pub use scanner::{scan, DirNode, FileContent, FileNode, Node};
pub use token::{estimate_tokens, format_token_count};
