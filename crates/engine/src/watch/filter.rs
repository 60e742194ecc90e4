// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Include/exclude decisions for restart-watcher events.
//!
//! Order of evaluation: the hard ignore list, then every pattern parsed
//! from the gitignores collected between the watch dir and the group dir
//! (inclusive), then — for files only — the user watch patterns.
//! Directory events are never filtered by user patterns: directories must
//! stay traversable so matching files inside them are reachable.

use std::path::{Path, PathBuf};

use glob::Pattern;
use tracing::warn;

/// Directory names ignored anywhere in a path, before gitignores apply.
const HARD_IGNORES: &[&str] = &["node_modules", ".git", "dist", "build", ".cache"];

pub(crate) struct PathFilter {
    watch_dir: PathBuf,
    user_patterns: Vec<UserPattern>,
    ignores: Vec<IgnoreGlob>,
}

/// One compiled user watch pattern. The zero-depth variant covers
/// `**/*.ts` matching a top-level `a.ts`.
struct UserPattern {
    full: Pattern,
    zero_depth: Option<Pattern>,
}

/// One gitignore line compiled against its gitignore's directory.
struct IgnoreGlob {
    base: PathBuf,
    /// Match the named entity itself.
    this: Vec<Pattern>,
    /// Match everything under it.
    contents: Vec<Pattern>,
    /// Trailing-slash rule: `this` applies to directories only.
    dir_only: bool,
}

impl PathFilter {
    pub fn build(watch_dir: &Path, group_dir: &Path, user_patterns: &[String]) -> Self {
        let mut ignores = Vec::new();
        for dir in watch_dir.ancestors() {
            let gitignore = dir.join(".gitignore");
            if let Ok(content) = std::fs::read_to_string(&gitignore) {
                for line in content.lines() {
                    if let Some(glob) = compile_gitignore_line(dir, line) {
                        ignores.push(glob);
                    }
                }
            }
            if dir == group_dir {
                break;
            }
        }

        let user_patterns = user_patterns
            .iter()
            .filter_map(|raw| match Pattern::new(raw) {
                Ok(full) => {
                    let zero_depth = raw
                        .strip_prefix("**/")
                        .and_then(|rest| Pattern::new(rest).ok());
                    Some(UserPattern { full, zero_depth })
                }
                Err(e) => {
                    warn!(pattern = raw, error = %e, "invalid watch pattern skipped");
                    None
                }
            })
            .collect();

        Self { watch_dir: watch_dir.to_path_buf(), user_patterns, ignores }
    }

    /// Whether an event on `path` reaches the debouncer.
    pub fn allows(&self, path: &Path, is_dir: bool) -> bool {
        if path
            .components()
            .any(|c| HARD_IGNORES.contains(&c.as_os_str().to_string_lossy().as_ref()))
        {
            return false;
        }

        for ignore in &self.ignores {
            if ignore.matches(path, is_dir) {
                return false;
            }
        }

        // Directories pass so their contents stay reachable; files must
        // match a user pattern when any are configured.
        if is_dir || self.user_patterns.is_empty() {
            return true;
        }
        let rel = path.strip_prefix(&self.watch_dir).unwrap_or(path);
        self.user_patterns.iter().any(|p| {
            p.full.matches_path(rel)
                || p.zero_depth.as_ref().is_some_and(|z| z.matches_path(rel))
        })
    }
}

impl IgnoreGlob {
    fn matches(&self, path: &Path, is_dir: bool) -> bool {
        let Ok(rel) = path.strip_prefix(&self.base) else {
            return false;
        };
        if self.contents.iter().any(|p| p.matches_path(rel)) {
            return true;
        }
        if self.this.iter().any(|p| p.matches_path(rel)) {
            return !self.dir_only || is_dir;
        }
        false
    }
}

/// Translate one gitignore line, preserving the three gitignore shapes:
/// leading `/` anchors at the gitignore's directory, trailing `/` makes it
/// directory-only (contents included), a bare name matches at any depth.
/// Comments, blanks, and negations are skipped.
fn compile_gitignore_line(base: &Path, line: &str) -> Option<IgnoreGlob> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
        return None;
    }

    let dir_only = line.ends_with('/');
    let line = line.trim_end_matches('/');
    let anchored = line.starts_with('/') || line.trim_start_matches('/').contains('/');
    let line = line.trim_start_matches('/');
    if line.is_empty() {
        return None;
    }

    let (this_globs, contents_globs): (Vec<String>, Vec<String>) = if anchored {
        (vec![line.to_string()], vec![format!("{line}/**")])
    } else {
        (
            vec![line.to_string(), format!("**/{line}")],
            vec![format!("{line}/**"), format!("**/{line}/**")],
        )
    };

    Some(IgnoreGlob {
        base: base.to_path_buf(),
        this: compile_globs(&this_globs),
        contents: compile_globs(&contents_globs),
        dir_only,
    })
}

fn compile_globs(globs: &[String]) -> Vec<Pattern> {
    globs
        .iter()
        .filter_map(|g| match Pattern::new(g) {
            Ok(p) => Some(p),
            Err(e) => {
                warn!(pattern = g.as_str(), error = %e, "unusable gitignore pattern skipped");
                None
            }
        })
        .collect()
}

#[cfg(test)]
#[path = "filter_tests.rs"]
mod tests;
