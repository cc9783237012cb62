/*!
 * System clipboard sink for generated prompts
 *
 * The clipboard is reached through whichever platform helper is installed
 * (pbcopy, wl-copy, xclip, xsel, clip.exe, termux-clipboard-set), with tmux
 * buffers preferred inside a tmux session.
 */

use std::env;
use std::io::{self, Write};
use std::path::Path;
use std::process::{Command, Stdio};

use log::debug;
use thiserror::Error;

/// Error type for clipboard operations
#[derive(Error, Debug)]
pub enum ClipboardError {
    /// The helper command failed
    #[error("{command} failed: {reason}")]
    CommandFailed { command: String, reason: String },

    /// No clipboard helper is installed
    #[error("No suitable clipboard mechanism found")]
    NoClipboardFound,

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Destination for a finished prompt
pub trait PromptSink {
    fn accept(&self, prompt: &str) -> Result<(), ClipboardError>;
}

/// Clipboard helper programs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClipboardProvider {
    Tmux,
    Wayland,
    Xclip,
    Xsel,
    MacOS,
    Windows,
    Termux,
}

impl ClipboardProvider {
    /// Helper program name
    pub fn program(self) -> &'static str {
        match self {
            Self::Tmux => "tmux",
            Self::Wayland => "wl-copy",
            Self::Xclip => "xclip",
            Self::Xsel => "xsel",
            Self::MacOS => "pbcopy",
            Self::Windows => "clip.exe",
            Self::Termux => "termux-clipboard-set",
        }
    }

    /// Arguments making the helper read the text from stdin
    pub fn args(self) -> &'static [&'static str] {
        match self {
            Self::Tmux => &["load-buffer", "-w", "-"],
            Self::Xclip => &["-selection", "clipboard", "-in"],
            Self::Xsel => &["-b", "-i"],
            Self::Wayland | Self::MacOS | Self::Windows | Self::Termux => &[],
        }
    }

    /// Providers worth trying on this platform, in preference order
    pub fn candidates() -> Vec<ClipboardProvider> {
        let mut candidates = Vec::new();
        if env::var_os("TMUX").is_some() {
            candidates.push(Self::Tmux);
        }

        if cfg!(target_os = "macos") {
            candidates.push(Self::MacOS);
        } else if cfg!(target_os = "windows") || env::var_os("WSL_DISTRO_NAME").is_some() {
            candidates.push(Self::Windows);
        } else if cfg!(target_os = "android") {
            candidates.push(Self::Termux);
        } else {
            if env::var_os("WAYLAND_DISPLAY").is_some() {
                candidates.push(Self::Wayland);
            }
            candidates.extend([Self::Xsel, Self::Xclip]);
        }

        candidates
    }
}

/// The system clipboard
#[derive(Debug, Clone, Copy)]
pub struct SystemClipboard {
    provider: ClipboardProvider,
}

impl SystemClipboard {
    /// Pick the first installed provider
    pub fn detect() -> Result<Self, ClipboardError> {
        ClipboardProvider::candidates()
            .into_iter()
            .find(|provider| command_exists(provider.program()))
            .map(|provider| {
                debug!("Using clipboard provider {:?}", provider);
                Self { provider }
            })
            .ok_or(ClipboardError::NoClipboardFound)
    }

    pub fn with_provider(provider: ClipboardProvider) -> Self {
        Self { provider }
    }

    pub fn provider(&self) -> ClipboardProvider {
        self.provider
    }
}

impl PromptSink for SystemClipboard {
    fn accept(&self, prompt: &str) -> Result<(), ClipboardError> {
        pipe_to_command(self.provider.program(), self.provider.args(), prompt)
    }
}

/// Copy text with the detected clipboard provider
pub fn copy_to_clipboard(text: &str) -> Result<(), ClipboardError> {
    SystemClipboard::detect()?.accept(text)
}

/// Whether `command` is an executable on PATH
pub fn command_exists(command: &str) -> bool {
    env::var_os("PATH")
        .map(|paths| {
            env::split_paths(&paths).any(|dir| is_executable(&dir.join(command)))
        })
        .unwrap_or(false)
}

fn is_executable(path: &Path) -> bool {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        path.metadata()
            .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
            .unwrap_or(false)
    }
    #[cfg(not(unix))]
    {
        path.is_file()
    }
}

fn pipe_to_command(program: &str, args: &[&str], text: &str) -> Result<(), ClipboardError> {
    let failed = |reason: String| ClipboardError::CommandFailed {
        command: program.to_string(),
        reason,
    };

    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|e| failed(format!("cannot spawn: {}", e)))?;

    let written = match child.stdin.take() {
        Some(mut stdin) => stdin.write_all(text.as_bytes()).map_err(ClipboardError::from),
        None => Err(failed("stdin unavailable".to_string())),
    };

    // reap the helper even when the write failed
    let status = child.wait()?;
    written?;
    if status.success() {
        Ok(())
    } else {
        Err(failed(format!("exited with {}", status)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_exists() {
        assert!(command_exists("sh"));
        assert!(!command_exists("nonexistentcommandxyz"));
    }

    #[test]
    fn test_candidates_are_unique() {
        let candidates = ClipboardProvider::candidates();
        for (i, a) in candidates.iter().enumerate() {
            assert!(!candidates[i + 1..].contains(a));
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_failing_command_reports_status() {
        let err = pipe_to_command("sh", &["-c", "cat >/dev/null; exit 3"], "text").unwrap_err();
        assert!(matches!(err, ClipboardError::CommandFailed { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn test_helper_exiting_early_is_reported() {
        let text = "x".repeat(1 << 20);
        let err = pipe_to_command("sh", &["-c", "exit 0"], &text).unwrap_err();
        assert!(matches!(err, ClipboardError::Io(_)));
    }

    #[test]
    #[ignore] // needs a running tmux session
    fn test_tmux_clipboard() {
        if env::var_os("TMUX").is_none() {
            return;
        }
        SystemClipboard::with_provider(ClipboardProvider::Tmux)
            .accept("promptfs clipboard test")
            .expect("copy to tmux buffer");

        let output = Command::new("tmux")
            .arg("show-buffer")
            .output()
            .expect("tmux show-buffer");
        assert_eq!(
            String::from_utf8_lossy(&output.stdout).trim(),
            "promptfs clipboard test"
        );
    }
}
