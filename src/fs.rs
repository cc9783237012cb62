/*!
 * Filesystem access used by the tree builder, the selection model and the
 * prompt formatter
 */

use std::fs;
use std::io;
use std::path::Path;

use log::debug;
use walkdir::WalkDir;

use crate::types::{DirEntry, EntryKind};

/// Filesystem capabilities the core relies on
pub trait FileSystem: Send + Sync {
    /// List the entries directly contained in `path`
    fn list(&self, path: &Path) -> io::Result<Vec<DirEntry>>;

    /// Determine whether `path` is a file or a directory
    fn stat(&self, path: &Path) -> io::Result<EntryKind>;

    /// Read the raw bytes of a file
    fn read(&self, path: &Path) -> io::Result<Vec<u8>>;
}

/// The local disk
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFs;

impl FileSystem for LocalFs {
    fn list(&self, path: &Path) -> io::Result<Vec<DirEntry>> {
        if !path.is_dir() {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("Not a directory: {}", path.display()),
            ));
        }

        let mut entries = Vec::new();
        for entry in WalkDir::new(path).min_depth(1).max_depth(1) {
            let entry = entry.map_err(io::Error::from)?;
            let file_type = entry.file_type();
            let kind = if file_type.is_dir() {
                EntryKind::Directory
            } else if file_type.is_symlink() && entry.path().is_dir() {
                // never followed, a link back up the tree would loop
                debug!("Skipping symlinked directory {}", entry.path().display());
                continue;
            } else {
                EntryKind::File
            };
            entries.push(DirEntry {
                name: entry.file_name().to_string_lossy().to_string(),
                kind,
            });
        }
        Ok(entries)
    }

    fn stat(&self, path: &Path) -> io::Result<EntryKind> {
        let metadata = fs::metadata(path)?;
        Ok(if metadata.is_dir() {
            EntryKind::Directory
        } else {
            EntryKind::File
        })
    }

    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        fs::read(path)
    }
}
