/*!
 * Command-line configuration for promptfs
 */

use std::io;
use std::path::PathBuf;

use clap::{Args as ClapArgs, Parser, Subcommand};
use clap_complete::Shell;

use crate::formatter::OutputFormat;
use crate::settings::{Settings, SettingsStore};

/// Command-line arguments for promptfs
#[derive(Parser, Debug, Clone)]
#[clap(
    name = "promptfs",
    version = env!("CARGO_PKG_VERSION"),
    about = "Select project files and assemble them into one prompt for LLM chats",
    long_about = "Browse a project's file tree, pick files or whole directories, and concatenate their contents into a single prompt in plain or Claude XML format."
)]
pub struct Args {
    #[clap(subcommand)]
    pub command: Option<Command>,

    /// Settings file (defaults to the platform config directory)
    #[clap(long, global = true)]
    pub settings: Option<PathBuf>,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[clap(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only print errors
    #[clap(short, long, global = true)]
    pub quiet: bool,

    /// Generate shell completions
    #[clap(long = "generate", value_enum)]
    pub generate: Option<Shell>,
}

/// Subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Print the filtered project tree
    Tree(TreeArgs),
    /// Build a prompt from files and directories
    Generate(GenerateArgs),
    /// Browse the project interactively
    Browse(TreeArgs),
    /// Show or change stored settings
    Settings {
        #[clap(subcommand)]
        action: SettingsAction,
    },
}

/// Settings subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum SettingsAction {
    /// Print the current settings as JSON
    Show,
    /// Set one setting; the value is parsed as JSON when possible
    Set { key: String, value: String },
}

/// Filter overrides shared by every command that walks the tree
#[derive(ClapArgs, Debug, Clone, Default)]
pub struct FilterArgs {
    /// Extra ignore patterns, comma-separated
    #[clap(long, value_delimiter = ',')]
    pub ignore_patterns: Vec<String>,

    /// Show hidden files and directories
    #[clap(long)]
    pub hidden: bool,

    /// Do not honor .gitignore files
    #[clap(long)]
    pub no_gitignore: bool,
}

/// Arguments of `tree` and `browse`
#[derive(ClapArgs, Debug, Clone)]
pub struct TreeArgs {
    /// Selection root
    #[clap(default_value = ".")]
    pub root: PathBuf,

    #[clap(flatten)]
    pub filters: FilterArgs,
}

/// Arguments of `generate`
#[derive(ClapArgs, Debug, Clone)]
pub struct GenerateArgs {
    /// Files or directories to select, relative to the root
    pub paths: Vec<PathBuf>,

    /// Selection root
    #[clap(long, default_value = ".")]
    pub root: PathBuf,

    /// Select every file under the root
    #[clap(long)]
    pub all: bool,

    /// Output format (defaults to the stored setting)
    #[clap(long, value_enum)]
    pub format: Option<OutputFormat>,

    /// Prefix the prompt with the project tree
    #[clap(long)]
    pub tree: bool,

    /// Write the prompt to a file instead of stdout
    #[clap(long, short)]
    pub output: Option<PathBuf>,

    /// Copy the prompt to the system clipboard
    #[clap(long)]
    pub clip: bool,

    /// Print a summary table to stderr
    #[clap(long)]
    pub report: bool,

    #[clap(flatten)]
    pub filters: FilterArgs,
}

/// Runtime configuration for one invocation
#[derive(Clone, Debug)]
pub struct Config {
    /// Selection root
    pub root: PathBuf,

    /// Settings file, if persistence is available
    pub settings_path: Option<PathBuf>,

    /// Filter overrides from the command line
    pub filters: FilterArgs,
}

impl Config {
    /// Create configuration from a root and command-line overrides
    pub fn new(root: PathBuf, settings_path: Option<PathBuf>, filters: FilterArgs) -> Self {
        Self {
            root,
            settings_path: settings_path.or_else(SettingsStore::default_path),
            filters,
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> io::Result<()> {
        if !self.root.exists() || !self.root.is_dir() {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("Root directory not found: {}", self.root.display()),
            ));
        }
        Ok(())
    }

    /// Apply command-line overrides on top of stored settings
    pub fn apply_overrides(&self, settings: &mut Settings) {
        settings
            .ignore_patterns
            .extend(self.filters.ignore_patterns.iter().cloned());
        if self.filters.hidden {
            settings.include_hidden = true;
        }
        if self.filters.no_gitignore {
            settings.override_gitignore = true;
        }
    }

    /// Load stored settings, falling back to defaults without a settings path
    pub fn load_settings(&self) -> crate::error::Result<SettingsStore> {
        match &self.settings_path {
            Some(path) => SettingsStore::load(path),
            None => Ok(SettingsStore::in_memory(Settings::default())),
        }
    }
}
