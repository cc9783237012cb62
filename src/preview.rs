/*!
 * The preview panel: at most one live instance, created on demand and
 * focused when requested again
 */

use std::sync::{Arc, Mutex, MutexGuard};

use log::debug;

/// Default panel title
pub const PREVIEW_TITLE: &str = "Files to LLM Prompt Preview";

#[derive(Debug)]
struct PreviewPanel {
    title: String,
    content: Option<String>,
    reveals: usize,
    disposed: bool,
}

/// Shared handle to the live preview panel
#[derive(Debug, Clone)]
pub struct PreviewHandle {
    panel: Arc<Mutex<PreviewPanel>>,
}

impl PreviewHandle {
    fn new(title: &str) -> Self {
        Self {
            panel: Arc::new(Mutex::new(PreviewPanel {
                title: title.to_string(),
                content: None,
                reveals: 1,
                disposed: false,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, PreviewPanel> {
        match self.panel.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Replace the displayed prompt
    pub fn update_content(&self, content: impl Into<String>) {
        self.lock().content = Some(content.into());
    }

    /// Displayed prompt, if any was generated
    pub fn content(&self) -> Option<String> {
        self.lock().content.clone()
    }

    pub fn title(&self) -> String {
        self.lock().title.clone()
    }

    /// How many times the panel was shown or focused
    pub fn reveal_count(&self) -> usize {
        self.lock().reveals
    }

    pub fn is_disposed(&self) -> bool {
        self.lock().disposed
    }

    /// Whether both handles refer to the same panel
    pub fn same_panel(&self, other: &PreviewHandle) -> bool {
        Arc::ptr_eq(&self.panel, &other.panel)
    }
}

/// Slot holding the live preview panel
#[derive(Debug, Default)]
pub struct PreviewSlot {
    current: Option<PreviewHandle>,
}

impl PreviewSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Focus the live panel, or create and register a new one
    pub fn create_or_show(&mut self, title: &str) -> PreviewHandle {
        if let Some(handle) = &self.current {
            handle.lock().reveals += 1;
            debug!("Revealing existing preview panel");
            return handle.clone();
        }

        debug!("Creating preview panel '{}'", title);
        let handle = PreviewHandle::new(title);
        self.current = Some(handle.clone());
        handle
    }

    /// The live panel, if any
    pub fn current(&self) -> Option<PreviewHandle> {
        self.current.clone()
    }

    /// Close the live panel and clear the slot
    pub fn dispose(&mut self) {
        if let Some(handle) = self.current.take() {
            handle.lock().disposed = true;
            debug!("Disposed preview panel");
        }
    }
}
