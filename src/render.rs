//! Digest rendering: scanned tree → summary, tree diagram, content block.
//!
//! The three strings are rendered once per invocation from a completed
//! scan and assembled into the immutable [`Digest`] artifact.

use crate::error::{Error, Result};
use crate::query::Query;
use crate::scanner::{self, DirNode, FileNode, Node};
use crate::token;
use std::fs;
use std::path::Path;

const SEPARATOR: &str =
    "================================================\n";

const BRANCH: &str = "├── ";
const LAST_BRANCH: &str = "└── ";
const VERTICAL: &str = "│   ";
const SPACE: &str = "    ";

/// The rendered output of one run: summary, tree diagram, and content.
#[derive(Debug, Clone)]
pub struct Digest {
    /// Summary block (repository identity, counts, token estimate)
    pub summary: String,

    /// Tree diagram with box-drawing connectors
    pub tree: String,

    /// Concatenated file contents, README first
    pub content: String,

    /// Abbreviated token estimate, absent on encoder failure
    pub estimated_tokens: Option<String>,
}

impl Digest {
    /// Total size of the rendered strings in bytes.
    #[must_use]
    pub fn byte_size(&self) -> usize {
        self.summary.len() + self.tree.len() + self.content.len()
    }

    /// Writes `summary`, `tree`, and `content` separated by blank lines.
    ///
    /// Parent directories are created as needed. All content is UTF-8;
    /// unrepresentable input bytes were substituted when files were read.
    ///
    /// # Errors
    ///
    /// Returns an IO error if the file or its parent cannot be written.
    pub fn write_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
            }
        }
        fs::write(
            path,
            format!("{}\n\n{}\n\n{}", self.summary, self.tree, self.content),
        )
        .map_err(|e| Error::io(path, e))
    }
}

/// Renders the digest for a scanned directory tree.
#[must_use]
pub(crate) fn render_directory(query: &Query, root: &DirNode) -> Digest {
    let tree = render_tree(root);
    let mut files = Vec::new();
    collect_files(root, &mut files);
    let content = render_content(&files);

    let estimated_tokens = token::estimate_tokens(&format!("{tree}{content}"));
    let summary = render_summary(query, root, estimated_tokens.as_deref());

    Digest {
        summary,
        tree,
        content,
        estimated_tokens,
    }
}

/// Renders the digest for a single file (a remote `/blob/` locator).
///
/// # Errors
///
/// Returns an input error when the path is not a file or not text.
pub(crate) fn render_single_file(query: &Query, path: &Path) -> Result<Digest> {
    let metadata = fs::metadata(path).map_err(|e| Error::io(path, e))?;
    if !metadata.is_file() {
        return Err(Error::NotAFile {
            path: path.to_path_buf(),
        });
    }
    if !scanner::is_text_file(path) {
        return Err(Error::NotText {
            path: path.to_path_buf(),
        });
    }

    let size = metadata.len();
    let content = if size > query.max_file_size {
        "[Content ignored: file too large]".to_string()
    } else {
        let bytes = fs::read(path).map_err(|e| Error::io(path, e))?;
        String::from_utf8_lossy(&bytes).into_owned()
    };

    let name = path
        .file_name()
        .map_or_else(String::new, |n| n.to_string_lossy().into_owned());
    let file = FileNode {
        name: name.clone(),
        rel_path: query.subpath.trim_start_matches('/').to_string(),
        size,
        content: crate::scanner::FileContent::Text(content.clone()),
    };

    let files_content = render_content(&[&file]);
    let tree = format!("Directory structure:\n{LAST_BRANCH}{name}");

    let mut summary = format!(
        "Repository: {}\nFile: {name}\nSize: {} bytes\nLines: {}\n",
        repository_identity(query),
        token::format_number(size as usize),
        token::format_number(content.lines().count()),
    );
    let estimated_tokens = token::estimate_tokens(&files_content);
    if let Some(tokens) = &estimated_tokens {
        summary.push_str(&format!("\nEstimated tokens: {tokens}"));
    }

    Ok(Digest {
        summary,
        tree,
        content: files_content,
        estimated_tokens,
    })
}

/// Renders the tree diagram: the root's children, depth-first, with
/// box-drawing connectors; directories carry a trailing separator.
#[must_use]
pub(crate) fn render_tree(root: &DirNode) -> String {
    let mut out = String::from("Directory structure:\n");
    let count = root.children.len();
    for (i, child) in root.children.iter().enumerate() {
        render_node(&mut out, child, "", i + 1 == count);
    }
    out
}

fn render_node(out: &mut String, node: &Node, prefix: &str, is_last: bool) {
    let connector = if is_last { LAST_BRANCH } else { BRANCH };
    match node {
        Node::File(file) => {
            out.push_str(prefix);
            out.push_str(connector);
            out.push_str(&file.name);
            out.push('\n');
        }
        Node::Dir(dir) => {
            out.push_str(prefix);
            out.push_str(connector);
            out.push_str(&dir.name);
            out.push_str("/\n");

            let continuation = if is_last { SPACE } else { VERTICAL };
            let child_prefix = format!("{prefix}{continuation}");
            let count = dir.children.len();
            for (i, child) in dir.children.iter().enumerate() {
                render_node(out, child, &child_prefix, i + 1 == count);
            }
        }
    }
}

/// Collects files depth-first in scan order.
fn collect_files<'a>(node: &'a DirNode, out: &mut Vec<&'a FileNode>) {
    for child in &node.children {
        match child {
            Node::File(file) => out.push(file),
            Node::Dir(dir) => collect_files(dir, out),
        }
    }
}

/// Renders the concatenated content block.
///
/// Only files with text content appear; binary, oversized, and unreadable
/// files were counted in the statistics but are skipped here. The top-level
/// README, when present, leads regardless of scan order.
#[must_use]
pub(crate) fn render_content(files: &[&FileNode]) -> String {
    let mut out = String::new();

    for file in files {
        if file.text().is_none() {
            continue;
        }
        if display_path(file).to_lowercase() == "/readme.md" {
            push_file_block(&mut out, file);
            break;
        }
    }

    for file in files {
        if file.text().is_none() || display_path(file).to_lowercase() == "/readme.md" {
            continue;
        }
        push_file_block(&mut out, file);
    }

    out
}

fn push_file_block(out: &mut String, file: &FileNode) {
    out.push_str(SEPARATOR);
    out.push_str(&format!("File: {}\n", display_path(file)));
    out.push_str(SEPARATOR);
    if let Some(text) = file.text() {
        out.push_str(text);
    }
    out.push_str("\n\n");
}

fn display_path(file: &FileNode) -> String {
    format!("/{}", file.rel_path)
}

/// Renders the summary block for a directory digest.
#[must_use]
pub(crate) fn render_summary(query: &Query, root: &DirNode, tokens: Option<&str>) -> String {
    let mut summary = format!("Repository: {}\n", repository_identity(query));
    summary.push_str(&format!("Files analyzed: {}\n", root.file_count));

    if query.subpath != "/" {
        summary.push_str(&format!("Subpath: {}\n", query.subpath));
    }
    if let Some(remote) = query.remote() {
        if let Some(commit) = &remote.commit {
            summary.push_str(&format!("Commit: {commit}\n"));
        } else if let Some(branch) = &remote.branch {
            if branch != "main" && branch != "master" {
                summary.push_str(&format!("Branch: {branch}\n"));
            }
        }
    }
    if let Some(tokens) = tokens {
        summary.push_str(&format!("\nEstimated tokens: {tokens}"));
    }
    summary
}

fn repository_identity(query: &Query) -> String {
    match query.remote() {
        Some(remote) => format!("{}/{}", remote.owner, remote.name),
        None => query.slug.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{Query, RemoteRepo, SourceKind, DEFAULT_MAX_FILE_SIZE};
    use crate::scanner::{scan, FileContent};
    use assert_fs::prelude::*;

    fn local_query(root: &Path) -> Query {
        Query::resolve::<&str>(root.to_str().unwrap(), DEFAULT_MAX_FILE_SIZE, &[], &[]).unwrap()
    }

    fn file_node(rel_path: &str, content: FileContent) -> FileNode {
        FileNode {
            name: rel_path.rsplit('/').next().unwrap().to_string(),
            rel_path: rel_path.to_string(),
            size: 0,
            content,
        }
    }

    #[test]
    fn test_round_trip_single_text_file() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child("a.txt").write_str("hello").unwrap();

        let query = local_query(temp.path());
        let tree = scan(&query.root_path(), &query);
        let digest = render_directory(&query, &tree);

        assert_eq!(digest.tree, "Directory structure:\n└── a.txt\n");
        assert!(digest
            .content
            .contains("File: /a.txt\n================================================\nhello\n\n"));
        assert!(digest.summary.contains("Files analyzed: 1"));
    }

    #[test]
    fn test_tree_connectors_and_prefixes() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child("src/lib.rs").write_str("l").unwrap();
        temp.child("src/main.rs").write_str("m").unwrap();
        temp.child("zz.txt").write_str("z").unwrap();

        let query = local_query(temp.path());
        let tree = scan(&query.root_path(), &query);

        let expected = concat!(
            "Directory structure:\n",
            "├── src/\n",
            "│   ├── lib.rs\n",
            "│   └── main.rs\n",
            "└── zz.txt\n",
        );
        assert_eq!(render_tree(&tree), expected);
    }

    #[test]
    fn test_tree_prefix_under_last_child() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child("sub/inner.txt").write_str("i").unwrap();

        let query = local_query(temp.path());
        let tree = scan(&query.root_path(), &query);

        let expected = concat!(
            "Directory structure:\n",
            "└── sub/\n",
            "    └── inner.txt\n",
        );
        assert_eq!(render_tree(&tree), expected);
    }

    #[test]
    fn test_tree_line_count_matches_node_count() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child("a/one.txt").write_str("1").unwrap();
        temp.child("a/two.txt").write_str("2").unwrap();
        temp.child("b/three.txt").write_str("3").unwrap();
        temp.child("four.txt").write_str("4").unwrap();

        let query = local_query(temp.path());
        let tree = scan(&query.root_path(), &query);
        let rendered = render_tree(&tree);

        let node_lines = rendered.lines().count() - 1; // minus the header
        assert_eq!(node_lines, tree.file_count + tree.dir_count);
    }

    #[test]
    fn test_readme_rendered_first() {
        let a = file_node("aaa.txt", FileContent::Text("first alphabetically".into()));
        let readme = file_node("README.md", FileContent::Text("# Title".into()));
        let digest_files: Vec<&FileNode> = vec![&a, &readme];

        let content = render_content(&digest_files);
        let readme_pos = content.find("File: /README.md").unwrap();
        let a_pos = content.find("File: /aaa.txt").unwrap();
        assert!(readme_pos < a_pos);
    }

    #[test]
    fn test_nested_readme_not_hoisted() {
        let a = file_node("zzz.txt", FileContent::Text("z".into()));
        let nested = file_node("docs/readme.md", FileContent::Text("# Nested".into()));
        let files: Vec<&FileNode> = vec![&nested, &a];

        let content = render_content(&files);
        let nested_pos = content.find("File: /docs/readme.md").unwrap();
        let z_pos = content.find("File: /zzz.txt").unwrap();
        assert!(nested_pos < z_pos); // scan order, no hoisting
    }

    #[test]
    fn test_content_skips_sentinel_files() {
        let text = file_node("ok.txt", FileContent::Text("ok".into()));
        let binary = file_node("img.dat", FileContent::Binary);
        let oversized = file_node("huge.txt", FileContent::Oversized);
        let unreadable = file_node("locked.txt", FileContent::Unreadable);
        let files: Vec<&FileNode> = vec![&binary, &oversized, &unreadable, &text];

        let content = render_content(&files);
        assert!(content.contains("File: /ok.txt"));
        assert!(!content.contains("img.dat"));
        assert!(!content.contains("huge.txt"));
        assert!(!content.contains("locked.txt"));
    }

    fn remote_query(branch: Option<&str>, commit: Option<&str>, subpath: &str) -> Query {
        Query {
            source: SourceKind::Remote(RemoteRepo {
                url: "https://github.com/owner/repo".to_string(),
                owner: "owner".to_string(),
                name: "repo".to_string(),
                branch: branch.map(String::from),
                commit: commit.map(String::from),
                is_blob: false,
            }),
            local_path: std::env::temp_dir().join("repodigest-test"),
            subpath: subpath.to_string(),
            slug: "owner-repo".to_string(),
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            ignore_patterns: crate::pattern::PatternSet::new::<&str>(&[]).unwrap(),
            include_patterns: None,
        }
    }

    #[test]
    fn test_summary_remote_identity_and_counts() {
        let query = remote_query(None, None, "/");
        let root = DirNode {
            file_count: 7,
            ..DirNode::default()
        };

        let summary = render_summary(&query, &root, Some("1.2k"));
        assert!(summary.starts_with("Repository: owner/repo\n"));
        assert!(summary.contains("Files analyzed: 7\n"));
        assert!(summary.ends_with("\nEstimated tokens: 1.2k"));
        assert!(!summary.contains("Subpath:"));
        assert!(!summary.contains("Branch:"));
    }

    #[test]
    fn test_summary_subpath_and_branch_lines() {
        let query = remote_query(Some("develop"), None, "/src");
        let summary = render_summary(&query, &DirNode::default(), None);
        assert!(summary.contains("Subpath: /src\n"));
        assert!(summary.contains("Branch: develop\n"));
        assert!(!summary.contains("Estimated tokens"));
    }

    #[test]
    fn test_summary_default_branch_omitted() {
        let query = remote_query(Some("main"), None, "/");
        let summary = render_summary(&query, &DirNode::default(), None);
        assert!(!summary.contains("Branch:"));
    }

    #[test]
    fn test_summary_commit_wins_over_branch() {
        let hash = "a1b2c3d4e5f6a1b2c3d4e5f6a1b2c3d4e5f6a1b2";
        let query = remote_query(Some("develop"), Some(hash), "/");
        let summary = render_summary(&query, &DirNode::default(), None);
        assert!(summary.contains(&format!("Commit: {hash}\n")));
        assert!(!summary.contains("Branch:"));
    }

    #[test]
    fn test_single_file_digest() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child("notes.txt").write_str("one\ntwo\nthree").unwrap();

        let mut query = remote_query(Some("main"), None, "/notes.txt");
        query.local_path = temp.path().to_path_buf();

        let digest = render_single_file(&query, &temp.path().join("notes.txt")).unwrap();
        assert_eq!(digest.tree, "Directory structure:\n└── notes.txt");
        assert!(digest.summary.contains("File: notes.txt\n"));
        assert!(digest.summary.contains("Lines: 3\n"));
        assert!(digest.content.contains("File: /notes.txt"));
        assert!(digest.content.contains("one\ntwo\nthree"));
    }

    #[test]
    fn test_single_file_oversized_sentinel() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child("big.txt").write_str("0123456789abcdef").unwrap();

        let mut query = remote_query(None, None, "/big.txt");
        query.local_path = temp.path().to_path_buf();
        query.max_file_size = 8;

        let digest = render_single_file(&query, &temp.path().join("big.txt")).unwrap();
        assert!(digest.content.contains("[Content ignored: file too large]"));
        assert!(digest.summary.contains("Lines: 1\n"));
    }

    #[test]
    fn test_single_file_rejects_binary() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child("blob.bin").write_binary(&[0u8, 159, 146, 150]).unwrap();

        let mut query = remote_query(None, None, "/blob.bin");
        query.local_path = temp.path().to_path_buf();

        let err = render_single_file(&query, &temp.path().join("blob.bin")).unwrap_err();
        assert!(err.to_string().contains("not a text file"));
    }

    #[test]
    fn test_write_to_orders_blocks() {
        let temp = assert_fs::TempDir::new().unwrap();
        let digest = Digest {
            summary: "Repository: x".to_string(),
            tree: "Directory structure:\n└── a.txt\n".to_string(),
            content: "body".to_string(),
            estimated_tokens: None,
        };

        let out = temp.path().join("nested/digest.txt");
        digest.write_to(&out).unwrap();

        let written = fs::read_to_string(&out).unwrap();
        assert_eq!(
            written,
            "Repository: x\n\nDirectory structure:\n└── a.txt\n\n\nbody"
        );
    }

    #[test]
    fn test_byte_size() {
        let digest = Digest {
            summary: "ab".to_string(),
            tree: "cde".to_string(),
            content: "f".to_string(),
            estimated_tokens: None,
        };
        assert_eq!(digest.byte_size(), 6);
    }
}
