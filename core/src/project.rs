//! Project snapshots for modify mode.
//!
//! The walk yields `(path, content)` entries lazily; formatting them into a
//! prompt block is a separate step so exclusion policy and serialization can
//! change independently.

use std::path::{Path, PathBuf};

use walkdir::{DirEntry, WalkDir};

use crate::config::ProjectConfig;
use crate::error::{Error, Result};
use crate::language::Language;
use crate::patch::render_block;

/// One source file captured from the project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotEntry {
    /// Path relative to the project root.
    pub path: PathBuf,
    pub content: String,
}

/// Depth-first walker over the supported source files of a project.
#[derive(Debug, Clone)]
pub struct ProjectWalker {
    root: PathBuf,
    excluded_dirs: Vec<String>,
    excluded_files: Vec<String>,
}

impl ProjectWalker {
    /// Creates a walker with the default exclusions.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::with_policy(root, &ProjectConfig::default())
    }

    /// Creates a walker with the exclusions from `policy`.
    pub fn with_policy(root: impl Into<PathBuf>, policy: &ProjectConfig) -> Self {
        Self {
            root: root.into(),
            excluded_dirs: policy.excluded_dirs.clone(),
            excluded_files: policy.excluded_files.clone(),
        }
    }

    /// Returns the project root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn is_excluded(&self, entry: &DirEntry) -> bool {
        // The root itself is never excluded, whatever it is called.
        if entry.depth() == 0 {
            return false;
        }
        let name = entry.file_name().to_string_lossy();
        if entry.file_type().is_dir() {
            self.excluded_dirs.iter().any(|d| *d == name)
        } else {
            self.excluded_files.iter().any(|f| *f == name)
        }
    }

    /// Lazily yields every supported source file, depth-first in file-name
    /// order. Calling this again restarts the walk.
    ///
    /// Files that are not valid UTF-8 are skipped with a warning.
    pub fn entries(&self) -> impl Iterator<Item = Result<SnapshotEntry>> + '_ {
        WalkDir::new(&self.root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(move |e| !self.is_excluded(e))
            .filter_map(move |entry| {
                let entry = match entry {
                    Ok(entry) => entry,
                    Err(e) => return Some(Err(Error::Io(e.into()))),
                };
                if !entry.file_type().is_file() || Language::from_path(entry.path()).is_err() {
                    return None;
                }
                let relative = entry
                    .path()
                    .strip_prefix(&self.root)
                    .unwrap_or(entry.path())
                    .to_path_buf();

                match std::fs::read_to_string(entry.path()) {
                    Ok(content) => Some(Ok(SnapshotEntry {
                        path: relative,
                        content,
                    })),
                    Err(e) if e.kind() == std::io::ErrorKind::InvalidData => {
                        tracing::warn!(path = ?relative, "skipping non-UTF-8 file");
                        None
                    }
                    Err(e) => Some(Err(Error::Io(e))),
                }
            })
    }

    /// Collects the whole walk into a snapshot.
    pub fn snapshot(&self) -> Result<ProjectSnapshot> {
        let entries = self.entries().collect::<Result<Vec<_>>>()?;
        tracing::info!(root = ?self.root, files = entries.len(), "captured project snapshot");
        Ok(ProjectSnapshot { entries })
    }
}

/// Ordered contents of a project's source files, used as generation context.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectSnapshot {
    entries: Vec<SnapshotEntry>,
}

impl ProjectSnapshot {
    /// Returns the captured entries in walk order.
    pub fn entries(&self) -> &[SnapshotEntry] {
        &self.entries
    }

    /// Returns true if no source files were found.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Serializes all entries in the `--- File: <path> ---` block format.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for entry in &self.entries {
            render_block(&mut out, &entry.path, &entry.content);
        }
        out
    }
}

impl FromIterator<SnapshotEntry> for ProjectSnapshot {
    fn from_iter<I: IntoIterator<Item = SnapshotEntry>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patch::PatchSet;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    fn sample_project() -> TempDir {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        write(root, "index.js", "require('./lib/util');\n");
        write(root, "lib/util.js", "module.exports = {};\n");
        write(root, "scripts/setup.sh", "echo setup\n");
        write(root, "tool.py", "print('tool')\n");
        write(root, "README.md", "# readme\n");
        write(root, "package.json", "{}\n");
        write(root, "package-lock.json", "{}\n");
        write(root, "node_modules/dep/index.js", "module.exports = 1;\n");
        write(root, ".git/hooks/pre-commit.sh", "exit 0\n");
        dir
    }

    #[test]
    fn walk_includes_only_supported_sources_in_order() {
        let project = sample_project();
        let snapshot = ProjectWalker::new(project.path()).snapshot().unwrap();

        let paths: Vec<_> = snapshot.entries().iter().map(|e| e.path.clone()).collect();
        assert_eq!(
            paths,
            vec![
                PathBuf::from("index.js"),
                PathBuf::from("lib/util.js"),
                PathBuf::from("scripts/setup.sh"),
                PathBuf::from("tool.py"),
            ]
        );
    }

    #[test]
    fn custom_policy_controls_exclusions() {
        let project = sample_project();
        let policy = ProjectConfig {
            excluded_dirs: vec!["lib".to_string(), "node_modules".to_string()],
            excluded_files: vec!["tool.py".to_string()],
        };

        let snapshot = ProjectWalker::with_policy(project.path(), &policy)
            .snapshot()
            .unwrap();
        let paths: Vec<_> = snapshot.entries().iter().map(|e| e.path.clone()).collect();

        assert!(paths.contains(&PathBuf::from(".git/hooks/pre-commit.sh")));
        assert!(!paths.contains(&PathBuf::from("lib/util.js")));
        assert!(!paths.contains(&PathBuf::from("tool.py")));
    }

    #[test]
    fn entries_can_be_restarted() {
        let project = sample_project();
        let walker = ProjectWalker::new(project.path());

        let first: Vec<_> = walker.entries().map(|e| e.unwrap().path).collect();
        let second: Vec<_> = walker.entries().map(|e| e.unwrap().path).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn non_utf8_files_are_skipped() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("bin.js"), [0xff, 0xfe, 0x00]).unwrap();
        write(dir.path(), "ok.js", "1;\n");

        let snapshot = ProjectWalker::new(dir.path()).snapshot().unwrap();
        assert_eq!(snapshot.entries().len(), 1);
        assert_eq!(snapshot.entries()[0].path, PathBuf::from("ok.js"));
    }

    #[test]
    fn render_uses_delimiter_blocks() {
        let snapshot: ProjectSnapshot = vec![SnapshotEntry {
            path: PathBuf::from("file.js"),
            content: "console.log(1);\n".to_string(),
        }]
        .into_iter()
        .collect();

        assert_eq!(snapshot.render(), "--- File: file.js ---\nconsole.log(1);\n\n");
    }

    #[test]
    fn rendered_snapshot_parses_back_to_same_pairs() {
        let project = sample_project();
        let snapshot = ProjectWalker::new(project.path()).snapshot().unwrap();

        let parsed = PatchSet::parse(&snapshot.render()).unwrap();
        let pairs: Vec<_> = parsed
            .iter()
            .map(|p| (p.path.clone(), p.content.clone()))
            .collect();
        let expected: Vec<_> = snapshot
            .entries()
            .iter()
            .map(|e| (e.path.clone(), e.content.clone()))
            .collect();

        assert_eq!(pairs, expected);
    }

    #[test]
    fn empty_project_has_empty_snapshot() {
        let dir = TempDir::new().unwrap();
        let snapshot = ProjectWalker::new(dir.path()).snapshot().unwrap();
        assert!(snapshot.is_empty());
        assert_eq!(snapshot.render(), "");
    }
}
