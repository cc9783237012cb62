/*!
 * Selection state over the discovered file universe
 *
 * Only files are stored. A directory's selection is derived from the files
 * below it that have been discovered so far.
 */

use std::collections::HashSet;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use indexmap::IndexSet;
use log::{debug, info};

use crate::error::{PromptError, Result};
use crate::fs::FileSystem;
use crate::matcher::Matcher;
use crate::tree::{collect_files, list_included};
use crate::types::{EntryKind, TreeNode};

/// Receives a notification after every selection mutation
pub trait SelectionObserver: Send + Sync {
    fn selection_changed(&self, selected: &[PathBuf]);
}

/// Tree-view refresh signal; each notification bumps the generation
#[derive(Debug, Default)]
pub struct RefreshSignal {
    generation: AtomicU64,
}

impl RefreshSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of refreshes requested so far
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Request a refresh
    pub fn fire(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
    }
}

impl SelectionObserver for RefreshSignal {
    fn selection_changed(&self, _selected: &[PathBuf]) {
        self.fire();
    }
}

/// The set of selected files
pub struct SelectionModel {
    fs: Arc<dyn FileSystem>,
    selected: IndexSet<PathBuf>,
    discovered: IndexSet<PathBuf>,
    observers: Vec<Arc<dyn SelectionObserver>>,
}

impl SelectionModel {
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self {
            fs,
            selected: IndexSet::new(),
            discovered: IndexSet::new(),
            observers: Vec::new(),
        }
    }

    /// Register an observer notified after each mutation
    pub fn subscribe(&mut self, observer: Arc<dyn SelectionObserver>) {
        self.observers.push(observer);
    }

    /// Record files seen during traversal
    pub fn discover<I>(&mut self, files: I)
    where
        I: IntoIterator<Item = PathBuf>,
    {
        self.discovered.extend(files);
    }

    /// Record every file of a built tree
    pub fn discover_tree(&mut self, tree: &TreeNode) {
        self.discover(collect_files(tree));
    }

    /// Every file discovered in this session
    pub fn discovered_files(&self) -> impl Iterator<Item = &PathBuf> {
        self.discovered.iter()
    }

    pub fn is_selected(&self, path: &Path) -> bool {
        self.selected.contains(path)
    }

    /// True iff the directory has at least one discovered file below it and
    /// all of them are selected
    pub fn is_directory_selected(&self, dir: &Path) -> bool {
        let mut descendants = self.discovered_descendants(dir).peekable();
        if descendants.peek().is_none() {
            return false;
        }
        descendants.all(|path| self.selected.contains(path))
    }

    /// Selected files, each exactly once, in selection order
    pub fn selected_paths(&self) -> Vec<PathBuf> {
        self.selected.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.selected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    /// Flip a file, or select/deselect every file below a directory
    ///
    /// Directory descent filters entries through `matcher`, so a toggle never
    /// selects a file the tree would hide. The directory counts as selected
    /// when every file the matcher currently shows below it is selected.
    pub fn toggle(&mut self, path: &Path, matcher: &Matcher) -> Result<()> {
        let kind = self.fs.stat(path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => PromptError::NotFound(path.display().to_string()),
            _ => PromptError::Io(e),
        })?;

        match kind {
            EntryKind::File => {
                self.discovered.insert(path.to_path_buf());
                if !self.selected.shift_remove(path) {
                    self.selected.insert(path.to_path_buf());
                }
            }
            EntryKind::Directory => {
                let files = self.enumerate_files(path, matcher);
                self.rediscover(path, &files);

                let all_selected =
                    !files.is_empty() && files.iter().all(|file| self.selected.contains(file));
                if all_selected {
                    debug!("Deselecting {} files under {}", files.len(), path.display());
                    for file in &files {
                        self.selected.shift_remove(file);
                    }
                } else {
                    debug!("Selecting {} files under {}", files.len(), path.display());
                    self.selected.extend(files);
                }
            }
        }

        self.notify();
        Ok(())
    }

    /// Select every discovered file; returns the resulting selection size
    pub fn select_all(&mut self) -> usize {
        self.selected.extend(self.discovered.iter().cloned());
        info!("Selected {} files", self.selected.len());
        self.notify();
        self.selected.len()
    }

    /// Clear the selection; returns how many files were deselected
    pub fn deselect_all(&mut self) -> usize {
        let previous = self.selected.len();
        self.selected.clear();
        info!("Deselected {} files", previous);
        self.notify();
        previous
    }

    fn discovered_descendants<'a>(&'a self, dir: &'a Path) -> impl Iterator<Item = &'a PathBuf> {
        self.discovered
            .iter()
            .filter(move |path| path.as_path() != dir && path.starts_with(dir))
    }

    /// Replace the discovered files below `dir` with a fresh enumeration
    fn rediscover(&mut self, dir: &Path, files: &[PathBuf]) {
        let current: HashSet<&PathBuf> = files.iter().collect();
        self.discovered
            .retain(|path| !path.starts_with(dir) || path == dir || current.contains(path));
        self.discovered.extend(files.iter().cloned());
    }

    fn enumerate_files(&self, dir: &Path, matcher: &Matcher) -> Vec<PathBuf> {
        let mut files = Vec::new();
        let mut pending = vec![dir.to_path_buf()];

        while let Some(current) = pending.pop() {
            let entries = list_included(self.fs.as_ref(), &current, matcher);
            // reversed so directories are walked in listing order
            for entry in entries.into_iter().rev() {
                match entry.kind {
                    EntryKind::File => files.push(entry.path),
                    EntryKind::Directory => pending.push(entry.path),
                }
            }
        }

        files.sort();
        files
    }

    fn notify(&self) {
        let selected = self.selected_paths();
        for observer in &self.observers {
            observer.selection_changed(&selected);
        }
    }
}
