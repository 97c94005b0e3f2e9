//! Capped, best-effort file access over a repository checkout.
//!
//! Everything here is prompt fodder: reads are size-capped so a single file
//! cannot blow the prompt budget, and missing or unreadable paths are
//! skipped rather than treated as errors.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;

/// Per-file content cap in bytes. Larger files are truncated with a marker.
pub const MAX_FILE_BYTES: usize = 10_000;

/// Appended to capped content so the model knows it is looking at a prefix.
const TRUNCATION_MARKER: &str = "\n... (truncated)";

/// Well-known configuration files, with the description used in overview
/// prompts. Presence of any of these says a lot about the stack.
pub const CONFIG_FILES: &[(&str, &str)] = &[
    ("README.md", "Project documentation and overview"),
    ("package.json", "Node.js project configuration"),
    ("requirements.txt", "Python dependencies"),
    ("pyproject.toml", "Python project configuration"),
    ("pom.xml", "Maven project configuration"),
    ("build.gradle", "Gradle project configuration"),
    ("Gemfile", "Ruby dependencies"),
    ("composer.json", "PHP dependencies"),
    ("Cargo.toml", "Rust project configuration"),
    ("go.mod", "Go module definition"),
    ("Dockerfile", "Container configuration"),
    (".env.example", "Environment configuration template"),
    ("docker-compose.yml", "Multi-container configuration"),
];

/// Directories that never contain code worth prompting about.
const SKIP_DIRS: &[&str] = &["node_modules", ".git", "target", "dist", "build", "coverage"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    Config,
    Code,
}

/// One gathered file, content already capped.
#[derive(Debug, Clone, Serialize)]
pub struct FileRecord {
    pub path: String,
    pub content: String,
    pub kind: FileKind,
}

/// Read-only view of a repository checkout on the local filesystem.
///
/// Built fresh per analysis request; holds no file handles.
pub struct RepoSnapshot {
    root: PathBuf,
    max_file_bytes: usize,
}

impl RepoSnapshot {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            max_file_bytes: MAX_FILE_BYTES,
        }
    }

    #[cfg(test)]
    fn with_cap(mut self, max_file_bytes: usize) -> Self {
        self.max_file_bytes = max_file_bytes;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a repository-relative path, rejecting absolute paths and
    /// parent traversal.
    fn resolve(&self, rel: &str) -> Option<PathBuf> {
        let rel_path = Path::new(rel);
        if rel_path.is_absolute() {
            return None;
        }
        if rel_path
            .components()
            .any(|c| matches!(c, std::path::Component::ParentDir))
        {
            return None;
        }
        Some(self.root.join(rel_path))
    }

    /// Read a file relative to the root, capped. `None` when the path is
    /// missing, unreadable, not UTF-8, or escapes the root.
    pub fn read_capped(&self, rel: &str) -> Option<String> {
        let path = self.resolve(rel)?;
        let content = fs::read_to_string(&path).ok()?;
        Some(cap_content(content, self.max_file_bytes))
    }

    /// README.md content, capped. Missing README is simply omitted.
    pub fn readme(&self) -> Option<String> {
        self.read_capped("README.md")
    }

    /// All well-known config files present at the root.
    pub fn config_files(&self) -> Vec<FileRecord> {
        CONFIG_FILES
            .iter()
            .filter_map(|(name, _)| {
                let content = self.read_capped(name)?;
                Some(FileRecord {
                    path: (*name).to_string(),
                    content,
                    kind: FileKind::Config,
                })
            })
            .collect()
    }

    /// One entry per line, sorted, directories suffixed with `/`.
    pub fn top_level_tree(&self) -> String {
        let mut entries: Vec<String> = fs::read_dir(&self.root)
            .into_iter()
            .flatten()
            .flatten()
            .map(|entry| {
                let name = entry.file_name().to_string_lossy().into_owned();
                if entry.path().is_dir() {
                    format!("{name}/")
                } else {
                    name
                }
            })
            .collect();
        entries.sort();
        entries.join("\n")
    }

    /// Full directory tree, one entry per line, indented four spaces per
    /// level, directories suffixed with `/`. Vendor directories skipped.
    pub fn full_tree(&self) -> String {
        let mut lines = Vec::new();
        self.tree_walk(&self.root, 0, &mut lines);
        lines.join("\n")
    }

    fn tree_walk(&self, dir: &Path, depth: usize, lines: &mut Vec<String>) {
        let mut entries: Vec<_> = fs::read_dir(dir).into_iter().flatten().flatten().collect();
        entries.sort_by_key(|e| e.file_name());
        for entry in entries {
            let name = entry.file_name().to_string_lossy().into_owned();
            let indent = " ".repeat(4 * depth);
            if entry.path().is_dir() {
                if SKIP_DIRS.contains(&name.as_str()) {
                    continue;
                }
                lines.push(format!("{indent}{name}/"));
                self.tree_walk(&entry.path(), depth + 1, lines);
            } else {
                lines.push(format!("{indent}{name}"));
            }
        }
    }

    /// Gather content for entry-point files plus every file under the key
    /// directories. Missing paths are skipped; each file appears once.
    pub fn gather(&self, entry_files: &[String], key_directories: &[String]) -> Vec<FileRecord> {
        let mut seen = std::collections::HashSet::new();
        let mut records = Vec::new();

        for rel in entry_files {
            if let Some(content) = self.read_capped(rel)
                && seen.insert(rel.clone())
            {
                records.push(FileRecord {
                    path: rel.clone(),
                    content,
                    kind: kind_of(rel),
                });
            }
        }

        for dir_rel in key_directories {
            let Some(dir) = self.resolve(dir_rel) else {
                continue;
            };
            if !dir.is_dir() {
                continue;
            }
            self.dir_walk(&dir, None, &mut seen, &mut records);
        }

        records
    }

    /// Gather files under a directory whose extension is in `extensions`
    /// (any extension when empty).
    pub fn collect_with_extensions(
        &self,
        dir_rel: &str,
        extensions: &[&str],
        seen: &mut std::collections::HashSet<String>,
        records: &mut Vec<FileRecord>,
    ) {
        let Some(dir) = self.resolve(dir_rel) else {
            return;
        };
        if !dir.is_dir() {
            return;
        }
        let filter = if extensions.is_empty() {
            None
        } else {
            Some(extensions)
        };
        self.dir_walk(&dir, filter, seen, records);
    }

    fn dir_walk(
        &self,
        dir: &Path,
        extensions: Option<&[&str]>,
        seen: &mut std::collections::HashSet<String>,
        records: &mut Vec<FileRecord>,
    ) {
        let mut entries: Vec<_> = fs::read_dir(dir).into_iter().flatten().flatten().collect();
        entries.sort_by_key(|e| e.file_name());
        for entry in entries {
            let path = entry.path();
            let name = entry.file_name().to_string_lossy().into_owned();
            if path.is_dir() {
                if SKIP_DIRS.contains(&name.as_str()) {
                    continue;
                }
                self.dir_walk(&path, extensions, seen, records);
                continue;
            }
            if let Some(exts) = extensions
                && !exts.iter().any(|ext| name.ends_with(ext))
            {
                continue;
            }
            let Ok(rel) = path.strip_prefix(&self.root) else {
                continue;
            };
            let rel = rel.to_string_lossy().into_owned();
            if !seen.insert(rel.clone()) {
                continue;
            }
            let Ok(content) = fs::read_to_string(&path) else {
                continue;
            };
            records.push(FileRecord {
                path: rel.clone(),
                content: cap_content(content, self.max_file_bytes),
                kind: kind_of(&rel),
            });
        }
    }
}

fn kind_of(rel: &str) -> FileKind {
    let name = Path::new(rel)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    if CONFIG_FILES.iter().any(|(known, _)| *known == name) {
        FileKind::Config
    } else {
        FileKind::Code
    }
}

/// Truncate at a char boundary and append the marker.
fn cap_content(content: String, max_bytes: usize) -> String {
    if content.len() <= max_bytes {
        return content;
    }
    let mut end = max_bytes;
    while !content.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}{TRUNCATION_MARKER}", &content[..end])
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn fixture() -> (tempfile::TempDir, RepoSnapshot) {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("README.md"), "# demo project").unwrap();
        fs::write(dir.path().join("package.json"), "{\"name\": \"demo\"}").unwrap();
        fs::create_dir_all(dir.path().join("src/components")).unwrap();
        fs::write(dir.path().join("src/app.js"), "console.log('hi')").unwrap();
        fs::write(dir.path().join("src/components/button.js"), "export {}").unwrap();
        fs::create_dir_all(dir.path().join("node_modules/lib")).unwrap();
        fs::write(dir.path().join("node_modules/lib/index.js"), "ignored").unwrap();
        let snapshot = RepoSnapshot::new(dir.path());
        (dir, snapshot)
    }

    #[test]
    fn top_level_tree_marks_directories() {
        let (_dir, snapshot) = fixture();
        let tree = snapshot.top_level_tree();
        assert!(tree.contains("src/"));
        assert!(tree.contains("README.md"));
    }

    #[test]
    fn config_files_picks_up_known_names_only() {
        let (_dir, snapshot) = fixture();
        let configs = snapshot.config_files();
        let paths: Vec<_> = configs.iter().map(|f| f.path.as_str()).collect();
        assert!(paths.contains(&"package.json"));
        assert!(paths.contains(&"README.md"));
        assert!(!paths.contains(&"src/app.js"));
        assert!(configs.iter().all(|f| f.kind == FileKind::Config));
    }

    #[test]
    fn gather_walks_key_directories_and_skips_missing_entries() {
        let (_dir, snapshot) = fixture();
        let records = snapshot.gather(
            &["src/app.js".to_string(), "missing.js".to_string()],
            &["src/components".to_string(), "no-such-dir".to_string()],
        );
        let paths: Vec<_> = records.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(paths, vec!["src/app.js", "src/components/button.js"]);
    }

    #[test]
    fn gather_deduplicates_entry_files_inside_key_directories() {
        let (_dir, snapshot) = fixture();
        let records = snapshot.gather(
            &["src/components/button.js".to_string()],
            &["src/components".to_string()],
        );
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn vendor_directories_are_never_walked() {
        let (_dir, snapshot) = fixture();
        let records = snapshot.gather(&[], &[String::new()]);
        assert!(records.iter().all(|f| !f.path.contains("node_modules")));
    }

    #[test]
    fn oversized_content_is_truncated_with_marker() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("big.txt"), "x".repeat(100)).unwrap();
        let snapshot = RepoSnapshot::new(dir.path()).with_cap(10);
        let content = snapshot.read_capped("big.txt").unwrap();
        assert!(content.starts_with("xxxxxxxxxx"));
        assert!(content.ends_with("... (truncated)"));
    }

    #[test]
    fn parent_traversal_is_rejected() {
        let (_dir, snapshot) = fixture();
        assert!(snapshot.read_capped("../etc/passwd").is_none());
        assert!(snapshot.read_capped("/etc/passwd").is_none());
    }
}
