// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shell resolution and per-family command-line construction.

use std::path::{Path, PathBuf};

use crate::error::PlatformError;

/// Shell families with distinct invocation conventions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShellFamily {
    Bash,
    Zsh,
    Fish,
    /// sh, dash, and anything else speaking plain `-c`.
    Plain,
    Cmd,
    PowerShell,
}

/// A resolved shell binary plus how to hand it a command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shell {
    pub program: PathBuf,
    pub family: ShellFamily,
}

impl Shell {
    pub fn from_path(program: impl Into<PathBuf>) -> Self {
        let program = program.into();
        let family = classify(&program);
        Self { program, family }
    }

    /// Argument vector that runs `command` through this shell.
    ///
    /// Login/interactive flags are added for bash/zsh/fish so user rc files
    /// (version managers in particular) are loaded; plain shells get only
    /// `-l -c`.
    pub fn invocation(&self, command: &str) -> Vec<String> {
        match self.family {
            ShellFamily::Bash | ShellFamily::Zsh | ShellFamily::Fish => {
                vec!["-l".into(), "-i".into(), "-c".into(), command.into()]
            }
            ShellFamily::Plain => vec!["-l".into(), "-c".into(), command.into()],
            ShellFamily::Cmd => vec!["/C".into(), command.into()],
            ShellFamily::PowerShell => vec!["-Command".into(), command.into()],
        }
    }
}

fn classify(program: &Path) -> ShellFamily {
    let stem = program
        .file_stem()
        .map(|s| s.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    match stem.as_str() {
        "bash" => ShellFamily::Bash,
        "zsh" => ShellFamily::Zsh,
        "fish" => ShellFamily::Fish,
        "cmd" => ShellFamily::Cmd,
        "powershell" | "pwsh" => ShellFamily::PowerShell,
        _ => ShellFamily::Plain,
    }
}

/// Resolve the shell to run commands with: explicit setting, then the
/// user's login shell, then platform fallbacks.
pub fn resolve_shell(configured: Option<&str>) -> Result<Shell, PlatformError> {
    if let Some(path) = configured.filter(|s| !s.is_empty()) {
        return Ok(Shell::from_path(path));
    }

    #[cfg(unix)]
    {
        if let Ok(shell) = std::env::var("SHELL") {
            if !shell.is_empty() && Path::new(&shell).exists() {
                return Ok(Shell::from_path(shell));
            }
        }
        for fallback in ["/bin/bash", "/bin/sh"] {
            if Path::new(fallback).exists() {
                return Ok(Shell::from_path(fallback));
            }
        }
        Err(PlatformError::Shell("no $SHELL, /bin/bash, or /bin/sh".into()))
    }

    #[cfg(windows)]
    {
        let comspec = std::env::var("COMSPEC").unwrap_or_else(|_| "cmd.exe".into());
        Ok(Shell::from_path(comspec))
    }
}

/// Best-effort editor detection for the UI's "open in editor" affordance.
pub fn detect_editor() -> Option<String> {
    for var in ["VISUAL", "EDITOR"] {
        if let Ok(value) = std::env::var(var) {
            if !value.is_empty() {
                return Some(value);
            }
        }
    }
    None
}

#[cfg(test)]
#[path = "shell_tests.rs"]
mod tests;
