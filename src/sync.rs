/*!
 * Tracks whether the last generated preview still matches the selection
 */

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Mutex;

use log::debug;

use crate::selection::SelectionObserver;

/// True iff both path collections hold the same set of paths
pub fn check_sync(last_previewed: &[PathBuf], current: &[PathBuf]) -> bool {
    let last: HashSet<&PathBuf> = last_previewed.iter().collect();
    let current: HashSet<&PathBuf> = current.iter().collect();
    last == current
}

#[derive(Debug, Default)]
struct SyncState {
    last_previewed: Option<Vec<PathBuf>>,
    in_sync: bool,
}

/// Preview freshness, rechecked on every generation and selection change
///
/// Purely informational: it never blocks generation or touches the selection.
#[derive(Debug, Default)]
pub struct PreviewSync {
    state: Mutex<SyncState>,
}

impl PreviewSync {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the paths a preview was just generated from
    pub fn mark_previewed(&self, paths: &[PathBuf]) {
        let mut state = self.lock();
        state.last_previewed = Some(paths.to_vec());
        state.in_sync = true;
    }

    /// Recompute against the live selection
    pub fn recheck(&self, current: &[PathBuf]) -> bool {
        let mut state = self.lock();
        let in_sync = match &state.last_previewed {
            Some(last) => check_sync(last, current),
            None => false,
        };
        state.in_sync = in_sync;
        debug!("Preview in sync: {}", state.in_sync);
        state.in_sync
    }

    /// Whether a preview exists and matches the selection
    pub fn in_sync(&self) -> bool {
        self.lock().in_sync
    }

    /// Whether any preview was generated yet
    pub fn has_preview(&self) -> bool {
        self.lock().last_previewed.is_some()
    }

    /// User-facing warning when the preview is stale
    pub fn warning(&self) -> Option<String> {
        let state = self.lock();
        match &state.last_previewed {
            Some(_) if !state.in_sync => Some(
                "Selection changed since the preview was generated. Refresh to update it."
                    .to_string(),
            ),
            _ => None,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, SyncState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl SelectionObserver for PreviewSync {
    fn selection_changed(&self, selected: &[PathBuf]) {
        self.recheck(selected);
    }
}
