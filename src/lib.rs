/*!
 * promptfs - Assemble selected project files into a single LLM prompt
 *
 * This library browses a filtered project tree, tracks a file selection and
 * renders the selected files as one prompt in plain or Claude XML format.
 */

pub mod clipboard;
pub mod config;
pub mod display;
pub mod error;
pub mod formatter;
pub mod fs;
pub mod matcher;
pub mod preview;
pub mod report;
pub mod selection;
pub mod session;
pub mod settings;
pub mod sync;
pub mod tokens;
pub mod tree;
pub mod types;


// Re-export main components for easier access
pub use config::{Args, Config};
pub use error::{PromptError, Result};
pub use formatter::{format_output, generate_prompt, OutputFormat, PromptOptions};
pub use fs::{FileSystem, LocalFs};
pub use matcher::{should_include, IgnoreRules, Matcher};
pub use selection::SelectionModel;
pub use session::Session;
pub use settings::{Settings, SettingsStore};
pub use sync::check_sync;
pub use tree::{build_tree, format_tree};
pub use types::{EntryKind, FileEntry, SelectedFileRecord, TreeNode};

/// Version of the library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
