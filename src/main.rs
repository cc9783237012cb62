/*!
 * Command-line interface for promptfs
 */

use std::fs;
use std::io::{self, BufRead, Write};
use std::process;
use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::{CommandFactory, Parser};
use clap_complete::generate;
use indicatif::{ProgressBar, ProgressStyle};

use promptfs::clipboard::{PromptSink, SystemClipboard};
use promptfs::config::{Args, Command, Config, FilterArgs, GenerateArgs, SettingsAction, TreeArgs};
use promptfs::report::{render_report, PromptReport};
use promptfs::session::Session;
use promptfs::settings::SettingsStore;
use promptfs::tokens::count_tokens;
use promptfs::{format_tree, LocalFs, PromptError, Result};

fn main() {
    let args = Args::parse();

    setup_logging(args.quiet, args.verbose);
    log::debug!("CLI args parsed: {:?}", args);

    if let Some(shell) = args.generate {
        let mut cmd = Args::command();
        generate(shell, &mut cmd, "promptfs", &mut io::stdout());
        return;
    }

    if let Err(e) = run(args) {
        log::debug!("Command failed: {:?}", e);
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn setup_logging(quiet: bool, verbose: u8) {
    let log_level = if quiet {
        log::LevelFilter::Off
    } else {
        match verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            2 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        }
    };
    env_logger::Builder::new()
        .filter_level(log_level)
        .format_timestamp(None)
        .init();
    log::trace!("Logger initialized with level: {:?}", log_level);
}

fn run(args: Args) -> Result<()> {
    let command = args.command.unwrap_or(Command::Tree(TreeArgs {
        root: ".".into(),
        filters: FilterArgs::default(),
    }));

    match command {
        Command::Tree(tree_args) => {
            let config = Config::new(tree_args.root, args.settings, tree_args.filters);
            let mut session = open_session(&config, false)?;
            match session.tree() {
                Some(tree) => println!("{}", format_tree(&tree)),
                None => log::warn!("Nothing to show under {}", config.root.display()),
            }
            Ok(())
        }
        Command::Generate(generate_args) => run_generate(generate_args, args.settings),
        Command::Browse(tree_args) => {
            let config = Config::new(tree_args.root, args.settings, tree_args.filters);
            let mut session = open_session(&config, true)?;
            browse(&mut session)
        }
        Command::Settings { action } => {
            let config = Config::new(".".into(), args.settings, FilterArgs::default());
            let mut store = config.load_settings()?;
            match action {
                SettingsAction::Show => {
                    println!("{}", serde_json::to_string_pretty(store.get())?);
                }
                SettingsAction::Set { key, value } => {
                    store.update_from_str(&key, &value)?;
                    match store.path() {
                        Some(path) => println!("Updated {} in {}", key, path.display()),
                        None => println!("Updated {} (not persisted)", key),
                    }
                }
            }
            Ok(())
        }
    }
}

/// Open a session for `config`
///
/// Command-line filter overrides are applied to an in-memory copy of the
/// stored settings so they never reach the settings file. With `persistent`
/// and no overrides the stored settings are used directly.
fn open_session(config: &Config, persistent: bool) -> Result<Session> {
    config.validate()?;
    let store = config.load_settings()?;

    let has_overrides = !config.filters.ignore_patterns.is_empty()
        || config.filters.hidden
        || config.filters.no_gitignore;

    let store = if persistent && !has_overrides {
        store
    } else {
        let mut settings = store.get().clone();
        config.apply_overrides(&mut settings);
        if persistent {
            log::warn!("Filter overrides given, settings changes will not be saved");
        }
        SettingsStore::in_memory(settings)
    };

    let root = config.root.canonicalize()?;
    Session::new(root, Arc::new(LocalFs), store)
}

fn run_generate(args: GenerateArgs, settings_path: Option<std::path::PathBuf>) -> Result<()> {
    let config = Config::new(args.root.clone(), settings_path, args.filters.clone());
    let mut session = open_session(&config, false)?;

    if let Some(format) = args.format {
        session.update_setting("outputFormat", &format.to_string())?;
    }
    if args.tree {
        session.update_setting("includeTreeStructure", "true")?;
    }

    if args.all {
        session.tree();
        session.select_all();
    }
    for path in &args.paths {
        session.toggle(path)?;
    }

    let progress = ProgressBar::new_spinner();
    progress.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {wide_msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    progress.enable_steady_tick(Duration::from_millis(100));
    progress.set_message(format!(
        "Reading {} selected files",
        session.selected_paths().len()
    ));

    let start_time = Instant::now();
    let generated = session.generate_with_records();
    let duration = start_time.elapsed();
    progress.finish_and_clear();
    let (prompt, records) = generated?;

    match &args.output {
        Some(path) => {
            fs::write(path, &prompt)?;
            log::info!("Prompt written to {}", path.display());
        }
        None if !args.clip => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(prompt.as_bytes())?;
            stdout.write_all(b"\n")?;
        }
        None => {}
    }

    if args.clip {
        SystemClipboard::detect()?.accept(&prompt)?;
        eprintln!("Prompt copied to clipboard!");
    }

    if args.report {
        let tokens = count_tokens(&prompt)
            .map_err(|e| log::warn!("Token count unavailable: {}", e))
            .ok();
        let report = PromptReport::new(
            &records,
            session.root(),
            &prompt,
            session.settings().output_format,
            duration,
        )
        .with_tokens(tokens);
        eprintln!("{}", render_report(&report));
    }

    Ok(())
}

const BROWSE_HELP: &str = "\
Commands:
  ls [dir]          list entries with their selection state
  tree              print the filtered project tree
  toggle <path>     select or deselect a file or directory
  all               select every file seen so far
  none              clear the selection
  selected          list selected files
  preview           generate the prompt into the preview
  refresh           regenerate an open preview
  close             close the preview
  copy              copy the prompt to the clipboard
  settings          print current settings
  set <key> <json>  change a setting
  help              show this help
  quit              leave";

fn browse(session: &mut Session) -> Result<()> {
    println!("Browsing {} (type 'help' for commands)", session.root().display());

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut line = String::new();

    loop {
        print!("promptfs> ");
        stdout.flush()?;

        line.clear();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }

        let input = line.trim();
        let (command, rest) = match input.split_once(char::is_whitespace) {
            Some((command, rest)) => (command, rest.trim()),
            None => (input, ""),
        };

        match command {
            "" => continue,
            "quit" | "exit" => break,
            "help" => println!("{}", BROWSE_HELP),
            _ => {
                if let Err(e) = browse_command(session, command, rest) {
                    eprintln!("Error: {}", e);
                }
            }
        }

        if let Some(warning) = session.sync_warning() {
            println!("! {}", warning);
        }
    }

    Ok(())
}

fn browse_command(session: &mut Session, command: &str, rest: &str) -> Result<()> {
    match command {
        "ls" => {
            let dir = if rest.is_empty() { "." } else { rest };
            for row in session.children(dir) {
                println!("{}", row);
            }
        }
        "tree" => match session.tree() {
            Some(tree) => println!("{}", format_tree(&tree)),
            None => println!("(empty)"),
        },
        "toggle" => {
            if rest.is_empty() {
                return Err(PromptError::InvalidArgument("toggle needs a path".to_string()));
            }
            session.toggle(rest)?;
            println!("{} files selected", session.selection().len());
        }
        "all" => println!("Selected all {} files", session.select_all()),
        "none" => println!("Deselected all {} files", session.deselect_all()),
        "selected" => {
            for path in session.selected_paths() {
                println!("{}", path.display());
            }
        }
        "preview" => {
            let handle = session.show_preview()?;
            println!("== {} ==", handle.title());
            println!("{}", handle.content().unwrap_or_default());
        }
        "refresh" => {
            let handle = session.refresh_preview()?;
            println!("{}", handle.content().unwrap_or_default());
        }
        "close" => session.close_preview(),
        "copy" => {
            let clipboard = SystemClipboard::detect()?;
            session.copy_to(&clipboard)?;
            println!("Prompt copied to clipboard!");
        }
        "settings" => println!("{}", serde_json::to_string_pretty(session.settings())?),
        "set" => {
            let (key, value) = rest.split_once(char::is_whitespace).ok_or_else(|| {
                PromptError::InvalidArgument("usage: set <key> <json>".to_string())
            })?;
            session.update_setting(key, value.trim())?;
            println!("Updated {}", key);
        }
        other => {
            return Err(PromptError::InvalidArgument(format!(
                "Unknown command '{}', type 'help'",
                other
            )))
        }
    }
    Ok(())
}
