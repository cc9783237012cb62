/*!
 * Filtered directory trees and their ASCII diagram
 */

use std::cmp::Ordering;
use std::path::{Path, PathBuf};

use log::warn;
use rayon::prelude::*;

use crate::fs::FileSystem;
use crate::matcher::Matcher;
use crate::types::{EntryKind, FileEntry, TreeNode};

/// Directories first, then by name
pub fn compare_nodes(a: &TreeNode, b: &TreeNode) -> Ordering {
    match (a.kind, b.kind) {
        (EntryKind::Directory, EntryKind::File) => Ordering::Less,
        (EntryKind::File, EntryKind::Directory) => Ordering::Greater,
        _ => a.name.cmp(&b.name),
    }
}

/// Build the filtered tree rooted at `root`
///
/// Returns `None` when the root itself is excluded.
pub fn build_tree(fs: &dyn FileSystem, root: &Path, matcher: &Matcher) -> Option<TreeNode> {
    let name = root
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| root.to_string_lossy().to_string());

    let kind = match fs.stat(root) {
        Ok(kind) => kind,
        Err(e) => {
            warn!("Cannot stat {}: {}", root.display(), e);
            return None;
        }
    };

    if root != matcher.root() {
        let parent = root.parent().unwrap_or(Path::new(""));
        if !matcher.should_include(&name, kind.is_dir(), parent) {
            return None;
        }
    }

    Some(build_node(fs, root.to_path_buf(), name, kind, matcher))
}

fn build_node(
    fs: &dyn FileSystem,
    path: PathBuf,
    name: String,
    kind: EntryKind,
    matcher: &Matcher,
) -> TreeNode {
    let children = match kind {
        EntryKind::File => Vec::new(),
        EntryKind::Directory => build_children(fs, &path, matcher),
    };

    TreeNode {
        name,
        path,
        kind,
        children,
    }
}

fn build_children(fs: &dyn FileSystem, dir: &Path, matcher: &Matcher) -> Vec<TreeNode> {
    let entries = list_included(fs, dir, matcher);

    let mut children: Vec<TreeNode> = entries
        .into_par_iter()
        .map(|entry| {
            let name = entry.name();
            build_node(fs, entry.path, name, entry.kind, matcher)
        })
        .collect();

    children.sort_by(compare_nodes);
    children
}

/// List the entries of `dir` that pass the matcher, sorted like tree nodes
///
/// An unreadable directory is logged and yields no entries.
pub fn list_included(fs: &dyn FileSystem, dir: &Path, matcher: &Matcher) -> Vec<FileEntry> {
    let listing = match fs.list(dir) {
        Ok(listing) => listing,
        Err(e) => {
            warn!("Cannot read directory {}: {}", dir.display(), e);
            return Vec::new();
        }
    };

    let mut entries: Vec<FileEntry> = listing
        .into_iter()
        .filter(|entry| matcher.should_include(&entry.name, entry.kind.is_dir(), dir))
        .map(|entry| FileEntry::new(dir.join(&entry.name), entry.kind))
        .collect();

    entries.sort_by(|a, b| match (a.kind, b.kind) {
        (EntryKind::Directory, EntryKind::File) => Ordering::Less,
        (EntryKind::File, EntryKind::Directory) => Ordering::Greater,
        _ => a.name().cmp(&b.name()),
    });
    entries
}

/// Every file path contained in a tree, in tree order
pub fn collect_files(node: &TreeNode) -> Vec<PathBuf> {
    let mut files = Vec::new();
    let mut stack = vec![node];

    while let Some(current) = stack.pop() {
        match current.kind {
            EntryKind::File => files.push(current.path.clone()),
            EntryKind::Directory => stack.extend(current.children.iter().rev()),
        }
    }

    files
}

/// Render a tree as an ASCII diagram
///
/// The root is printed bare; descendants get `├── `/`└── ` connectors with
/// `│   ` or four-space continuation prefixes.
pub fn format_tree(node: &TreeNode) -> String {
    let mut lines = vec![node.name.clone()];
    format_children(node, "", &mut lines);
    lines.join("\n")
}

fn format_children(node: &TreeNode, prefix: &str, lines: &mut Vec<String>) {
    let count = node.children.len();
    for (i, child) in node.children.iter().enumerate() {
        let is_last = i + 1 == count;
        let connector = if is_last { "└── " } else { "├── " };
        lines.push(format!("{}{}{}", prefix, connector, child.name));

        if !child.children.is_empty() {
            let continuation = if is_last { "    " } else { "│   " };
            format_children(child, &format!("{}{}", prefix, continuation), lines);
        }
    }
}
