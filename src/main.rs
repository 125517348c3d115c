use anyhow::Context;
use clap::Parser;
use repodigest::{ingest, IngestOptions, DEFAULT_MAX_FILE_SIZE};
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser, Debug)]
#[command(
    name = "repodigest",
    version,
    author,
    about = "Turn a directory or GitHub repository into a single text digest",
    long_about = "Turn a directory or GitHub repository into a single LLM-ready text digest.\n\n\
    The digest contains a summary (file count, estimated tokens), a directory tree, \
    and the concatenated contents of every text file that survives filtering. \
    Remote repositories are cloned into a temporary directory and cleaned up afterwards.\n\n\
    USAGE EXAMPLES:\n  \
      # Digest the current directory\n  \
      repodigest .\n\n  \
      # Digest a GitHub repository\n  \
      repodigest https://github.com/rust-lang/cargo\n\n  \
      # A branch subtree, Rust sources only\n  \
      repodigest github.com/owner/repo/tree/develop/src -i '*.rs'\n\n  \
      # Exclude generated code and logs\n  \
      repodigest ./my-project -e 'gen/' -e '*.log' -o my-project.txt"
)]
struct Cli {
    /// Local directory path or GitHub repository URL
    #[arg(value_name = "SOURCE")]
    source: String,

    /// Output file path (default: derived from the source name)
    #[arg(short, long, value_name = "PATH")]
    output: Option<PathBuf>,

    /// Maximum file size to include in the digest, in bytes
    #[arg(short = 's', long, default_value_t = DEFAULT_MAX_FILE_SIZE, value_name = "BYTES")]
    max_size: u64,

    /// Patterns to exclude (repeatable; comma/space separated lists allowed)
    #[arg(short = 'e', long = "exclude-pattern", value_name = "PATTERN")]
    exclude_pattern: Vec<String>,

    /// Patterns to include (repeatable; restricts the digest to matches)
    #[arg(short = 'i', long = "include-pattern", value_name = "PATTERN")]
    include_pattern: Vec<String>,

    /// Verbose output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_tracing(cli.verbose);

    let output = cli
        .output
        .unwrap_or_else(|| PathBuf::from(default_output_name(&cli.source)));

    let options = IngestOptions {
        source: cli.source,
        output: Some(output.clone()),
        max_file_size: cli.max_size,
        include_patterns: cli.include_pattern,
        exclude_patterns: cli.exclude_pattern,
    };

    let digest = ingest(&options)
        .await
        .context("Failed to create digest")?;

    println!("\nAnalysis complete! Output written to: {}", output.display());
    println!("\nSummary:");
    println!("{}", digest.summary);

    Ok(())
}

fn setup_tracing(verbosity: u8) {
    let filter = match verbosity {
        0 => EnvFilter::new("repodigest=warn"),
        1 => EnvFilter::new("repodigest=info"),
        2 => EnvFilter::new("repodigest=debug"),
        _ => EnvFilter::new("repodigest=trace"),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_thread_ids(false))
        .init();
}

/// Derives a digest filename from the source: `owner_repo.txt` for GitHub
/// locators, the directory basename otherwise.
fn default_output_name(source: &str) -> String {
    let name = if source.contains("github.com") {
        let normalized = source.replace('\\', "/");
        let parts: Vec<&str> = normalized.split('/').collect();
        parts
            .iter()
            .position(|p| *p == "github.com")
            .and_then(|i| match (parts.get(i + 1), parts.get(i + 2)) {
                (Some(owner), Some(repo)) => Some(format!("{owner}_{repo}")),
                _ => None,
            })
            .unwrap_or_else(|| "unknown_repo".to_string())
    } else {
        std::path::absolute(source)
            .ok()
            .and_then(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
            .unwrap_or_else(|| "digest".to_string())
    };

    let sanitized = sanitize_filename(&name);
    if sanitized.is_empty() {
        "digest.txt".to_string()
    } else {
        format!("{sanitized}.txt")
    }
}

/// Replaces characters that are invalid in filenames.
fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '\\' | '/' | '*' | '?' | ':' | '"' | '<' | '>' | '|' => '_',
            c => c,
        })
        .collect::<String>()
        .trim_matches('_')
        .to_string()
}
