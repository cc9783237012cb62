/*!
 * A browsing session over one selection root
 *
 * The session owns the selection, the settings store and the preview slot,
 * and wires the observers together: every selection change bumps the tree
 * refresh signal and rechecks preview freshness, every settings change bumps
 * the refresh signal.
 */

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use log::{debug, error, info, warn};

use crate::clipboard::PromptSink;
use crate::display::{display_row, DisplayRow};
use crate::error::{PromptError, Result};
use crate::formatter::{read_records, PromptOptions, PromptWriter};
use crate::fs::FileSystem;
use crate::matcher::Matcher;
use crate::preview::{PreviewHandle, PreviewSlot, PREVIEW_TITLE};
use crate::selection::{RefreshSignal, SelectionModel};
use crate::settings::{Settings, SettingsStore};
use crate::sync::PreviewSync;
use crate::tree::{build_tree, format_tree, list_included};
use crate::types::{EntryKind, SelectedFileRecord, TreeNode};
use crate::{bail, ensure};

/// Message shown when generating with nothing selected
pub const EMPTY_SELECTION_MESSAGE: &str = "Please select at least one file to generate a prompt.";

/// Interactive state for one project
pub struct Session {
    root: PathBuf,
    fs: Arc<dyn FileSystem>,
    settings: SettingsStore,
    selection: SelectionModel,
    sync: Arc<PreviewSync>,
    refresh: Arc<RefreshSignal>,
    preview: PreviewSlot,
}

impl Session {
    /// Open a session rooted at `root`
    pub fn new(
        root: impl Into<PathBuf>,
        fs: Arc<dyn FileSystem>,
        mut settings: SettingsStore,
    ) -> Result<Self> {
        let root = root.into();
        match fs.stat(&root) {
            Ok(EntryKind::Directory) => {}
            Ok(EntryKind::File) => bail!(InvalidArgument, "Not a directory: {}", root.display()),
            Err(_) => bail!(NotFound, "{}", root.display()),
        }

        let sync = Arc::new(PreviewSync::new());
        let refresh = Arc::new(RefreshSignal::new());

        let mut selection = SelectionModel::new(fs.clone());
        selection.subscribe(refresh.clone());
        selection.subscribe(sync.clone());

        let on_settings = refresh.clone();
        settings.subscribe(Box::new(move |_| on_settings.fire()));

        Ok(Self {
            root,
            fs,
            settings,
            selection,
            sync,
            refresh,
            preview: PreviewSlot::new(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn settings(&self) -> &Settings {
        self.settings.get()
    }

    pub fn selection(&self) -> &SelectionModel {
        &self.selection
    }

    /// Matcher reflecting the current settings
    pub fn matcher(&self) -> Matcher {
        Matcher::new(&self.root, self.settings.get().ignore_rules(), self.fs.clone())
    }

    /// Resolve a path given relative to the selection root
    pub fn resolve(&self, path: impl AsRef<Path>) -> PathBuf {
        let path = path.as_ref();
        let joined = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        };
        joined
            .components()
            .filter(|c| !matches!(c, Component::CurDir))
            .collect()
    }

    /// Build the full filtered tree, recording every file it contains
    pub fn tree(&mut self) -> Option<TreeNode> {
        let tree = build_tree(self.fs.as_ref(), &self.root, &self.matcher());
        if let Some(tree) = &tree {
            self.selection.discover_tree(tree);
        }
        tree
    }

    /// Rows for the entries directly inside `dir`
    pub fn children(&mut self, dir: impl AsRef<Path>) -> Vec<DisplayRow> {
        let dir = self.resolve(dir);
        let entries = list_included(self.fs.as_ref(), &dir, &self.matcher());

        self.selection.discover(
            entries
                .iter()
                .filter(|entry| entry.kind == EntryKind::File)
                .map(|entry| entry.path.clone()),
        );

        entries
            .iter()
            .map(|entry| display_row(entry, &self.selection, &self.root))
            .collect()
    }

    /// Toggle a file or a whole directory
    pub fn toggle(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = self.resolve(path);
        let matcher = self.matcher();
        self.selection.toggle(&path, &matcher)
    }

    pub fn select_all(&mut self) -> usize {
        self.selection.select_all()
    }

    pub fn deselect_all(&mut self) -> usize {
        self.selection.deselect_all()
    }

    pub fn selected_paths(&self) -> Vec<PathBuf> {
        self.selection.selected_paths()
    }

    /// Render the prompt for the current selection
    pub fn generate(&self) -> Result<String> {
        self.generate_with_records().map(|(prompt, _)| prompt)
    }

    /// Render the prompt and return the file records it was built from
    pub fn generate_with_records(&self) -> Result<(String, Vec<SelectedFileRecord>)> {
        let paths = self.selection.selected_paths();
        ensure!(!paths.is_empty(), InvalidArgument, "{}", EMPTY_SELECTION_MESSAGE);

        let settings = self.settings.get();
        let mut options = PromptOptions::new(settings.output_format);
        if settings.include_tree_structure {
            match build_tree(self.fs.as_ref(), &self.root, &self.matcher()) {
                Some(tree) => options = options.with_project_structure(format_tree(&tree)),
                None => warn!("Selection root is filtered out, skipping project structure"),
            }
        }

        debug!(
            "Generating {} prompt from {} files",
            settings.output_format,
            paths.len()
        );
        let records = read_records(self.fs.as_ref(), &paths).map_err(|e| {
            error!("Error generating prompt: {}", e);
            e
        })?;
        let prompt = PromptWriter::new(options).render(records.clone());
        Ok((prompt, records))
    }

    /// Generate into the preview panel, creating or focusing it
    ///
    /// On failure the panel and the freshness state keep their previous values.
    pub fn show_preview(&mut self) -> Result<PreviewHandle> {
        let prompt = self.generate()?;
        let paths = self.selection.selected_paths();

        let handle = self.preview.create_or_show(PREVIEW_TITLE);
        handle.update_content(prompt);
        self.sync.mark_previewed(&paths);
        Ok(handle)
    }

    /// Regenerate the live preview from the current selection
    pub fn refresh_preview(&mut self) -> Result<PreviewHandle> {
        if self.preview.current().is_none() {
            bail!(InvalidArgument, "No preview is open");
        }
        self.show_preview()
    }

    /// Generate and hand the prompt to `sink`
    pub fn copy_to(&self, sink: &dyn PromptSink) -> Result<String> {
        let prompt = self.generate()?;
        sink.accept(&prompt).map_err(PromptError::from)?;
        info!("Prompt copied to clipboard");
        Ok(prompt)
    }

    pub fn preview(&self) -> Option<PreviewHandle> {
        self.preview.current()
    }

    pub fn close_preview(&mut self) {
        self.preview.dispose();
    }

    /// Whether the preview matches the current selection
    pub fn in_sync(&self) -> bool {
        self.sync.in_sync()
    }

    /// Warning to show while the preview is stale
    pub fn sync_warning(&self) -> Option<String> {
        self.sync.warning()
    }

    /// Number of tree refreshes requested so far
    pub fn refresh_generation(&self) -> u64 {
        self.refresh.generation()
    }

    /// Request a tree refresh
    pub fn refresh(&self) {
        self.refresh.fire();
    }

    /// Stored settings file, if any
    pub fn settings_path(&self) -> Option<&Path> {
        self.settings.path()
    }

    /// Change one setting through the store
    pub fn update_setting(&mut self, key: &str, raw: &str) -> Result<()> {
        self.settings.update_from_str(key, raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clipboard::ClipboardError;
    use crate::fs::LocalFs;
    use std::fs;
    use std::sync::Mutex;
    use tempfile::tempdir;

    #[derive(Default)]
    struct MemorySink(Mutex<Option<String>>);

    impl PromptSink for MemorySink {
        fn accept(&self, prompt: &str) -> std::result::Result<(), ClipboardError> {
            *self.0.lock().unwrap() = Some(prompt.to_string());
            Ok(())
        }
    }

    fn setup() -> std::io::Result<tempfile::TempDir> {
        let temp_dir = tempdir()?;
        let root = temp_dir.path();
        fs::create_dir(root.join("src"))?;
        fs::write(root.join("src/a.ts"), "export const a = 1;")?;
        fs::write(root.join("src/b.ts"), "export const b = 2;")?;
        fs::write(root.join("notes.log"), "noise")?;
        Ok(temp_dir)
    }

    fn session(root: &Path) -> Result<Session> {
        let settings = Settings {
            ignore_patterns: vec!["*.log".to_string()],
            ..Settings::default()
        };
        Session::new(root, Arc::new(LocalFs), SettingsStore::in_memory(settings))
    }

    #[test]
    fn test_generate_requires_selection() -> Result<()> {
        let temp_dir = setup()?;
        let session = session(temp_dir.path())?;
        let err = session.generate().unwrap_err();
        assert_eq!(err.to_string(), format!("Invalid argument: {}", EMPTY_SELECTION_MESSAGE));
        Ok(())
    }

    #[test]
    fn test_children_rows_and_toggle() -> Result<()> {
        let temp_dir = setup()?;
        let mut session = session(temp_dir.path())?;

        let rows = session.children(".");
        let labels: Vec<&str> = rows.iter().map(|r| r.label.as_str()).collect();
        assert_eq!(labels, vec!["src"]);

        session.toggle("src")?;
        assert_eq!(session.selected_paths().len(), 2);
        let rows = session.children("src");
        assert!(rows.iter().all(|r| r.check == crate::display::CheckState::Checked));
        Ok(())
    }

    #[test]
    fn test_preview_goes_stale_on_selection_change() -> Result<()> {
        let temp_dir = setup()?;
        let root = temp_dir.path();
        let mut session = session(root)?;
        session.toggle("src/a.ts")?;

        let handle = session.show_preview()?;
        assert!(session.in_sync());
        assert!(handle.content().unwrap().contains("export const a = 1;"));

        let before = session.refresh_generation();
        session.toggle("src/b.ts")?;
        assert!(!session.in_sync());
        assert!(session.sync_warning().is_some());
        assert_eq!(session.refresh_generation(), before + 1);

        let refreshed = session.refresh_preview()?;
        assert!(refreshed.same_panel(&handle));
        assert!(session.in_sync());
        assert!(handle.content().unwrap().contains("export const b = 2;"));
        Ok(())
    }

    #[test]
    fn test_failed_generation_keeps_previous_preview() -> Result<()> {
        let temp_dir = setup()?;
        let root = temp_dir.path();
        let mut session = session(root)?;
        session.toggle("src/a.ts")?;
        let handle = session.show_preview()?;
        let shown = handle.content();

        session.toggle("src/b.ts")?;
        fs::remove_file(root.join("src/b.ts"))?;
        assert!(session.show_preview().is_err());

        assert_eq!(handle.content(), shown);
        assert_eq!(session.selected_paths().len(), 2);
        assert!(!session.in_sync());
        Ok(())
    }

    #[test]
    fn test_copy_uses_sink_and_leaves_preview_alone() -> Result<()> {
        let temp_dir = setup()?;
        let mut session = session(temp_dir.path())?;
        session.toggle("src")?;

        let sink = MemorySink::default();
        let prompt = session.copy_to(&sink)?;
        assert_eq!(sink.0.lock().unwrap().as_deref(), Some(prompt.as_str()));
        assert!(session.preview().is_none());
        assert!(!session.in_sync());
        Ok(())
    }

    #[test]
    fn test_setting_change_requests_refresh() -> Result<()> {
        let temp_dir = setup()?;
        let mut session = session(temp_dir.path())?;
        let before = session.refresh_generation();

        session.update_setting("ignorePatterns", "[]")?;
        assert_eq!(session.refresh_generation(), before + 1);

        let names: Vec<String> = session.children(".").into_iter().map(|r| r.label).collect();
        assert_eq!(names, vec!["src", "notes.log"]);
        Ok(())
    }

    #[test]
    fn test_tree_structure_prefix() -> Result<()> {
        let temp_dir = setup()?;
        let mut session = session(temp_dir.path())?;
        session.update_setting("includeTreeStructure", "true")?;
        session.toggle("src/a.ts")?;

        let prompt = session.generate()?;
        assert!(prompt.contains("<source>project-structure</source>"));
        assert!(prompt.contains("└── src\n    ├── a.ts\n    └── b.ts"));
        assert!(prompt.contains("<document index=\"2\">"));
        Ok(())
    }

    #[test]
    fn test_generate_with_records_skips_structure_record() -> Result<()> {
        let temp_dir = setup()?;
        let mut session = session(temp_dir.path())?;
        session.update_setting("includeTreeStructure", "true")?;
        session.toggle("src/b.ts")?;
        session.toggle("src/a.ts")?;

        let (prompt, records) = session.generate_with_records()?;
        let contents: Vec<&str> = records.iter().map(|r| r.content.as_str()).collect();
        assert_eq!(contents, vec!["export const b = 2;", "export const a = 1;"]);
        assert!(prompt.starts_with(
            "<documents>\n<document index=\"1\">\n<source>project-structure</source>"
        ));
        Ok(())
    }

    #[test]
    fn test_root_must_be_a_directory() -> std::io::Result<()> {
        let temp_dir = setup()?;
        let file = temp_dir.path().join("src/a.ts");
        let missing = temp_dir.path().join("missing");

        let store = || SettingsStore::in_memory(Settings::default());
        assert!(Session::new(&file, Arc::new(LocalFs), store()).is_err());
        assert!(Session::new(&missing, Arc::new(LocalFs), store()).is_err());
        Ok(())
    }
}
