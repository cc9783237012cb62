/*!
 * Per-render projection of entries into display rows
 */

use std::fmt;
use std::path::{Path, PathBuf};

use crate::matcher::relative_path;
use crate::selection::SelectionModel;
use crate::types::{EntryKind, FileEntry};

/// Checkbox state shown next to an entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckState {
    Checked,
    Unchecked,
}

impl From<bool> for CheckState {
    fn from(checked: bool) -> Self {
        if checked {
            CheckState::Checked
        } else {
            CheckState::Unchecked
        }
    }
}

/// One row of the file browser
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayRow {
    pub label: String,
    pub path: PathBuf,
    pub kind: EntryKind,
    pub check: CheckState,
    /// Path relative to the selection root
    pub description: String,
}

/// Project an entry and the current selection into a row
pub fn display_row(entry: &FileEntry, selection: &SelectionModel, root: &Path) -> DisplayRow {
    let checked = match entry.kind {
        EntryKind::File => selection.is_selected(&entry.path),
        EntryKind::Directory => selection.is_directory_selected(&entry.path),
    };

    DisplayRow {
        label: entry.name(),
        path: entry.path.clone(),
        kind: entry.kind,
        check: checked.into(),
        description: relative_path(&entry.path, root),
    }
}

impl fmt::Display for DisplayRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mark = match self.check {
            CheckState::Checked => "[x]",
            CheckState::Unchecked => "[ ]",
        };
        let suffix = if self.kind.is_dir() { "/" } else { "" };
        write!(f, "{} {}{}", mark, self.label, suffix)?;
        if !self.description.is_empty() && self.description != self.label {
            write!(f, "  ({})", self.description)?;
        }
        Ok(())
    }
}
