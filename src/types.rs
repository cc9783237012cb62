/*!
 * Core types and data structures for promptfs
 */

use std::path::{Path, PathBuf};

/// Kind of a filesystem entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryKind {
    /// Regular file
    File,
    /// Directory containing other entries
    Directory,
}

impl EntryKind {
    pub fn is_dir(self) -> bool {
        self == EntryKind::Directory
    }
}

/// One entry returned by a directory listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    /// Bare entry name
    pub name: String,
    /// Entry kind
    pub kind: EntryKind,
}

/// A discovered filesystem node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    /// Absolute path, the identity key of the entry
    pub path: PathBuf,
    /// Entry kind
    pub kind: EntryKind,
    /// Directory holding the entry
    pub parent: Option<PathBuf>,
}

impl FileEntry {
    pub fn new(path: impl Into<PathBuf>, kind: EntryKind) -> Self {
        let path = path.into();
        let parent = path.parent().map(Path::to_path_buf);
        Self { path, kind, parent }
    }

    /// Bare name of the entry
    pub fn name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.path.to_string_lossy().to_string())
    }
}

/// A node of a filtered directory tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeNode {
    /// Entry name
    pub name: String,
    /// Absolute path
    pub path: PathBuf,
    /// Entry kind
    pub kind: EntryKind,
    /// Ordered children, always empty for files
    pub children: Vec<TreeNode>,
}

/// A selected file and its content, read once per generation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedFileRecord {
    /// Path as it appears in the prompt
    pub path: String,
    /// Raw text content
    pub content: String,
}

impl SelectedFileRecord {
    pub fn new(path: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
        }
    }
}
