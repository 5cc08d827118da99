//! Multi-file patch format.
//!
//! Files travel between the project and the generator as blocks:
//!
//! ```text
//! --- File: src/app.js ---
//! <content>
//! ```
//!
//! A block's content runs until the next delimiter line or the end of the
//! text, minus exactly one trailing newline. Writing a block emits
//! `delimiter "\n" content "\n"`, so [`render_block`] followed by
//! [`PatchSet::parse`] reproduces the content byte for byte as long as it
//! contains no delimiter line of its own.

use std::io::Write;
use std::path::{Component, Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;
use tempfile::NamedTempFile;

use crate::error::{Error, Result};

/// Text preceding the path on a delimiter line.
pub const DELIMITER_PREFIX: &str = "--- File: ";

/// Text following the path on a delimiter line.
pub const DELIMITER_SUFFIX: &str = " ---";

fn delimiter_regex() -> &'static Regex {
    static DELIMITER: OnceLock<Regex> = OnceLock::new();
    DELIMITER.get_or_init(|| {
        Regex::new(r"(?m)^--- File: (.*?) ---[ \t]*\r?$").expect("delimiter regex is valid")
    })
}

/// One file's proposed replacement content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePatch {
    /// Path relative to the project root.
    pub path: PathBuf,
    /// Full new content of the file.
    pub content: String,
}

/// Ordered patches parsed from one generator response. Paths are unique.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatchSet {
    patches: Vec<FilePatch>,
}

impl PatchSet {
    /// Parses a generator response into patches.
    ///
    /// Text before the first delimiter is ignored. A whitespace-only
    /// response parses to an empty set ("no changes proposed"); any other
    /// response without a delimiter line is malformed. When a path repeats,
    /// the last content wins and the first position is kept.
    pub fn parse(text: &str) -> Result<Self> {
        let matches: Vec<_> = delimiter_regex().captures_iter(text).collect();

        if matches.is_empty() {
            if text.trim().is_empty() {
                return Ok(Self::default());
            }
            return Err(Error::MalformedPatchResponse(format!(
                "no '{}<path>{}' delimiter found in response",
                DELIMITER_PREFIX, DELIMITER_SUFFIX
            )));
        }

        let mut set = Self::default();
        for (index, caps) in matches.iter().enumerate() {
            let (Some(whole), Some(path)) = (caps.get(0), caps.get(1)) else {
                continue;
            };

            let path = normalize_path(Path::new(path.as_str().trim()));
            validate_relative_path(&path)?;

            let mut start = whole.end();
            if text[start..].starts_with('\n') {
                start += 1;
            }
            let end = matches
                .get(index + 1)
                .and_then(|next| next.get(0))
                .map_or(text.len(), |next| next.start());

            let block = &text[start..end.max(start)];
            let content = block.strip_suffix('\n').unwrap_or(block);
            set.insert(FilePatch {
                path,
                content: content.to_string(),
            });
        }

        tracing::debug!(patches = set.len(), "parsed patch response");
        Ok(set)
    }

    /// Adds a patch, replacing the content of an existing patch for the same path.
    pub fn insert(&mut self, patch: FilePatch) {
        match self.patches.iter_mut().find(|p| p.path == patch.path) {
            Some(existing) => existing.content = patch.content,
            None => self.patches.push(patch),
        }
    }

    /// Returns true if no patches were proposed.
    pub fn is_empty(&self) -> bool {
        self.patches.is_empty()
    }

    /// Number of patches.
    pub fn len(&self) -> usize {
        self.patches.len()
    }

    /// Iterates patches in response order.
    pub fn iter(&self) -> std::slice::Iter<'_, FilePatch> {
        self.patches.iter()
    }

    /// Paths of all patches, in order.
    pub fn paths(&self) -> Vec<PathBuf> {
        self.patches.iter().map(|p| p.path.clone()).collect()
    }

    /// Serializes the set in the delimiter format.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for patch in &self.patches {
            render_block(&mut out, &patch.path, &patch.content);
        }
        out
    }

    /// Writes every patch under `root`, overwriting existing files.
    ///
    /// All-or-nothing: each patch is first staged in a temporary file next
    /// to its target, and targets are only replaced once every patch has
    /// been staged. A failure while staging leaves the project untouched.
    ///
    /// Returns the paths written, relative to `root`.
    pub fn apply(&self, root: &Path) -> Result<Vec<PathBuf>> {
        let mut staged = Vec::with_capacity(self.patches.len());
        for patch in &self.patches {
            let target = root.join(&patch.path);
            staged.push((stage(&target, &patch.content)?, target, &patch.path));
        }

        let mut written = Vec::with_capacity(staged.len());
        for (temp, target, path) in staged {
            temp.persist(&target).map_err(|e| Error::Io(e.error))?;
            tracing::info!(path = ?path, "wrote patched file");
            written.push(path.clone());
        }
        Ok(written)
    }
}

/// Writes `content` to a temporary file in the directory of `target`.
fn stage(target: &Path, content: &str) -> Result<NamedTempFile> {
    if target.is_dir() {
        return Err(Error::Io(std::io::Error::other(format!(
            "{} is a directory",
            target.display()
        ))));
    }
    let parent = target.parent().unwrap_or(Path::new("."));
    std::fs::create_dir_all(parent)?;

    let mut temp = NamedTempFile::new_in(parent)?;
    temp.write_all(content.as_bytes())?;
    temp.flush()?;

    // Temporary files are created owner-only; keep the target's mode instead.
    match std::fs::metadata(target) {
        Ok(meta) => temp.as_file().set_permissions(meta.permissions())?,
        Err(_) => set_default_mode(&temp)?,
    }
    Ok(temp)
}

#[cfg(unix)]
fn set_default_mode(temp: &NamedTempFile) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    temp.as_file()
        .set_permissions(std::fs::Permissions::from_mode(0o644))
}

#[cfg(not(unix))]
fn set_default_mode(_temp: &NamedTempFile) -> std::io::Result<()> {
    Ok(())
}

impl<'a> IntoIterator for &'a PatchSet {
    type Item = &'a FilePatch;
    type IntoIter = std::slice::Iter<'a, FilePatch>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl FromIterator<FilePatch> for PatchSet {
    fn from_iter<I: IntoIterator<Item = FilePatch>>(iter: I) -> Self {
        let mut set = Self::default();
        for patch in iter {
            set.insert(patch);
        }
        set
    }
}

/// Formats a path with `/` separators regardless of platform.
pub fn portable_path(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Returns the delimiter line (without newline) for `path`.
pub fn delimiter_line(path: &Path) -> String {
    format!("{}{}{}", DELIMITER_PREFIX, portable_path(path), DELIMITER_SUFFIX)
}

/// Appends one block for `path` to `out`.
pub fn render_block(out: &mut String, path: &Path, content: &str) {
    out.push_str(&delimiter_line(path));
    out.push('\n');
    out.push_str(content);
    out.push('\n');
}

/// Drops `.` components so `./a.js` and `a.js` name the same patch.
fn normalize_path(path: &Path) -> PathBuf {
    path.components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect()
}

/// Rejects empty paths, absolute paths, and paths that climb out of the root.
pub fn validate_relative_path(path: &Path) -> Result<()> {
    let escapes = path
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
    if escapes || path.as_os_str().is_empty() {
        return Err(Error::InvalidPatchPath(path.to_path_buf()));
    }
    Ok(())
}
