// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Database handle: open, pragmas, migrations.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use rusqlite::Connection;
use tracing::info;

use crate::error::StorageError;

const SCHEMA_VERSION: i64 = 1;

const SCHEMA: &str = "
CREATE TABLE groups (
    id           TEXT PRIMARY KEY,
    name         TEXT NOT NULL,
    directory    TEXT NOT NULL,
    yaml_path    TEXT,
    sync_enabled INTEGER NOT NULL DEFAULT 0,
    position     INTEGER NOT NULL
);

CREATE TABLE projects (
    id             TEXT PRIMARY KEY,
    group_id       TEXT NOT NULL REFERENCES groups(id) ON DELETE CASCADE,
    name           TEXT NOT NULL,
    command        TEXT NOT NULL,
    kind           TEXT NOT NULL CHECK (kind IN ('service', 'task')),
    auto_restart   INTEGER NOT NULL DEFAULT 1,
    cwd            TEXT,
    interactive    INTEGER NOT NULL DEFAULT 0,
    watch_patterns TEXT,
    auto_start     INTEGER NOT NULL DEFAULT 0,
    position       INTEGER NOT NULL
);
CREATE INDEX idx_projects_group ON projects(group_id);

CREATE TABLE group_env_vars (
    group_id TEXT NOT NULL REFERENCES groups(id) ON DELETE CASCADE,
    key      TEXT NOT NULL,
    value    TEXT NOT NULL,
    PRIMARY KEY (group_id, key)
);

CREATE TABLE project_env_vars (
    project_id TEXT NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
    key        TEXT NOT NULL,
    value      TEXT NOT NULL,
    PRIMARY KEY (project_id, key)
);

CREATE TABLE sessions (
    id          TEXT PRIMARY KEY,
    project_id  TEXT NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
    started_at  TEXT NOT NULL,
    ended_at    TEXT,
    exit_status TEXT NOT NULL DEFAULT 'running'
);
CREATE INDEX idx_sessions_project ON sessions(project_id);

CREATE TABLE logs (
    id         INTEGER PRIMARY KEY AUTOINCREMENT,
    session_id TEXT NOT NULL REFERENCES sessions(id) ON DELETE CASCADE,
    stream     TEXT NOT NULL,
    data       BLOB NOT NULL,
    ts         TEXT NOT NULL
);
CREATE INDEX idx_logs_session ON logs(session_id);

CREATE TABLE metrics (
    id         INTEGER PRIMARY KEY AUTOINCREMENT,
    session_id TEXT NOT NULL REFERENCES sessions(id) ON DELETE CASCADE,
    ts         TEXT NOT NULL,
    cpu        REAL NOT NULL,
    memory     INTEGER NOT NULL
);
CREATE INDEX idx_metrics_session ON metrics(session_id);

CREATE TABLE settings (
    key   TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
";

/// Shared handle to the single database file. Single writer (the mutex),
/// short transactions, 5 s busy retry.
#[derive(Clone)]
pub struct Database {
    pub(crate) conn: Arc<Mutex<Connection>>,
    path: PathBuf,
}

impl Database {
    /// Open (and migrate) the database at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(&path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.busy_timeout(Duration::from_secs(5))?;
        migrate(&conn)?;
        Ok(Self { conn: Arc::new(Mutex::new(conn)), path })
    }

    /// In-memory database for tests.
    pub fn open_in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        migrate(&conn)?;
        Ok(Self { conn: Arc::new(Mutex::new(conn)), path: PathBuf::new() })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Size of the database file in bytes (0 for in-memory).
    pub fn file_size(&self) -> u64 {
        std::fs::metadata(&self.path).map(|m| m.len()).unwrap_or(0)
    }
}

fn migrate(conn: &Connection) -> Result<(), StorageError> {
    let version: i64 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;
    if version < SCHEMA_VERSION {
        info!(from = version, to = SCHEMA_VERSION, "migrating database schema");
        conn.execute_batch(SCHEMA)?;
        conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;
    }
    Ok(())
}

#[cfg(test)]
#[path = "db_tests.rs"]
mod tests;
