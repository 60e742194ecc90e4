// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Config store: persisted groups, projects, and env vars.
//!
//! Every mutation commits atomically across the group and its children.
//! `replace_group` is the only operation that may discard project ids;
//! surviving ids keep their rows (and therefore their session history).

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use rusqlite::{params, Connection, OptionalExtension, Transaction};

use runner_core::{Group, GroupId, Project, ProjectId, ProjectKind};

use crate::db::Database;
use crate::error::StorageError;

impl Database {
    pub fn list_groups(&self) -> Result<Vec<Group>, StorageError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT id, name, directory, yaml_path, sync_enabled FROM groups ORDER BY position",
        )?;
        let rows: Vec<GroupRow> = stmt
            .query_map([], group_row)?
            .collect::<Result<_, _>>()?;
        drop(stmt);
        rows.into_iter().map(|row| hydrate_group(&conn, row)).collect()
    }

    pub fn get_group(&self, id: &GroupId) -> Result<Group, StorageError> {
        let conn = self.conn.lock();
        let row = conn
            .query_row(
                "SELECT id, name, directory, yaml_path, sync_enabled FROM groups WHERE id = ?1",
                [id.as_str()],
                group_row,
            )
            .optional()?
            .ok_or_else(|| StorageError::not_found("group", id))?;
        hydrate_group(&conn, row)
    }

    /// Insert a whole group with its projects and env vars. Used by create
    /// and by YAML import.
    pub fn insert_group(&self, group: &Group) -> Result<(), StorageError> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        let position: i64 = tx.query_row(
            "SELECT COALESCE(MAX(position) + 1, 0) FROM groups",
            [],
            |row| row.get(0),
        )?;
        tx.execute(
            "INSERT INTO groups (id, name, directory, yaml_path, sync_enabled, position)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                group.id.as_str(),
                group.name,
                path_str(&group.directory),
                group.yaml_path.as_deref().map(|p| p.to_string_lossy().into_owned()),
                group.sync_enabled,
                position,
            ],
        )?;
        write_group_env(&tx, &group.id, &group.env_vars)?;
        for (pos, project) in group.projects.iter().enumerate() {
            insert_project_row(&tx, project, pos as i64)?;
        }
        tx.commit()?;
        Ok(())
    }

    pub fn rename_group(&self, id: &GroupId, name: &str) -> Result<(), StorageError> {
        let conn = self.conn.lock();
        let changed =
            conn.execute("UPDATE groups SET name = ?2 WHERE id = ?1", params![id.as_str(), name])?;
        require_hit(changed, "group", id)
    }

    pub fn update_group_directory(
        &self,
        id: &GroupId,
        directory: &Path,
    ) -> Result<(), StorageError> {
        let conn = self.conn.lock();
        let changed = conn.execute(
            "UPDATE groups SET directory = ?2 WHERE id = ?1",
            params![id.as_str(), path_str(directory)],
        )?;
        require_hit(changed, "group", id)
    }

    pub fn update_group_env_vars(
        &self,
        id: &GroupId,
        env_vars: &HashMap<String, String>,
    ) -> Result<(), StorageError> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        ensure_group(&tx, id)?;
        write_group_env(&tx, id, env_vars)?;
        tx.commit()?;
        Ok(())
    }

    /// Record or clear the group's YAML sync binding.
    pub fn update_group_sync(
        &self,
        id: &GroupId,
        yaml_path: Option<&Path>,
        enabled: bool,
    ) -> Result<(), StorageError> {
        if enabled && yaml_path.is_none() {
            return Err(StorageError::Conflict(format!(
                "group {id}: sync enabled without a YAML path"
            )));
        }
        let conn = self.conn.lock();
        let changed = conn.execute(
            "UPDATE groups SET yaml_path = ?2, sync_enabled = ?3 WHERE id = ?1",
            params![id.as_str(), yaml_path.map(|p| path_str(p)), enabled],
        )?;
        require_hit(changed, "group", id)
    }

    pub fn delete_group(&self, id: &GroupId) -> Result<(), StorageError> {
        let conn = self.conn.lock();
        let changed = conn.execute("DELETE FROM groups WHERE id = ?1", [id.as_str()])?;
        require_hit(changed, "group", id)
    }

    /// Whole-group swap used by YAML reload. Project rows whose ids survive
    /// are updated in place so their sessions are retained; rows whose ids
    /// disappear are deleted (cascading their sessions); new ids are
    /// inserted.
    pub fn replace_group(&self, group: &Group) -> Result<(), StorageError> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        ensure_group(&tx, &group.id)?;
        tx.execute(
            "UPDATE groups SET name = ?2, directory = ?3, yaml_path = ?4, sync_enabled = ?5
             WHERE id = ?1",
            params![
                group.id.as_str(),
                group.name,
                path_str(&group.directory),
                group.yaml_path.as_deref().map(|p| p.to_string_lossy().into_owned()),
                group.sync_enabled,
            ],
        )?;
        write_group_env(&tx, &group.id, &group.env_vars)?;

        let mut stmt = tx.prepare("SELECT id FROM projects WHERE group_id = ?1")?;
        let existing: Vec<String> = stmt
            .query_map([group.id.as_str()], |row| row.get(0))?
            .collect::<Result<_, _>>()?;
        drop(stmt);

        for old_id in &existing {
            if !group.projects.iter().any(|p| p.id.as_str() == old_id) {
                tx.execute("DELETE FROM projects WHERE id = ?1", [old_id])?;
            }
        }
        for (pos, project) in group.projects.iter().enumerate() {
            if existing.iter().any(|id| id == project.id.as_str()) {
                update_project_row(&tx, project, Some(pos as i64))?;
            } else {
                insert_project_row(&tx, project, pos as i64)?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    pub fn get_project(&self, id: &ProjectId) -> Result<Project, StorageError> {
        let conn = self.conn.lock();
        read_project(&conn, id)
    }

    pub fn create_project(&self, project: &Project) -> Result<(), StorageError> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        ensure_group(&tx, &project.group_id)?;
        let position: i64 = tx.query_row(
            "SELECT COALESCE(MAX(position) + 1, 0) FROM projects WHERE group_id = ?1",
            [project.group_id.as_str()],
            |row| row.get(0),
        )?;
        insert_project_row(&tx, project, position)?;
        tx.commit()?;
        Ok(())
    }

    pub fn update_project(&self, project: &Project) -> Result<(), StorageError> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        update_project_row(&tx, project, None)?;
        tx.commit()?;
        Ok(())
    }

    pub fn delete_project(&self, id: &ProjectId) -> Result<(), StorageError> {
        let conn = self.conn.lock();
        let changed = conn.execute("DELETE FROM projects WHERE id = ?1", [id.as_str()])?;
        require_hit(changed, "project", id)
    }

    pub fn delete_projects(&self, ids: &[ProjectId]) -> Result<(), StorageError> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        for id in ids {
            let changed = tx.execute("DELETE FROM projects WHERE id = ?1", [id.as_str()])?;
            require_hit(changed, "project", id)?;
        }
        tx.commit()?;
        Ok(())
    }

    /// Batch kind change. Converting to task leaves `auto_restart` stored
    /// but inert (the supervisor checks the kind).
    pub fn convert_projects(
        &self,
        ids: &[ProjectId],
        kind: ProjectKind,
    ) -> Result<(), StorageError> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        for id in ids {
            let changed = tx.execute(
                "UPDATE projects SET kind = ?2 WHERE id = ?1",
                params![id.as_str(), kind.as_str()],
            )?;
            require_hit(changed, "project", id)?;
        }
        tx.commit()?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Row mapping
// ---------------------------------------------------------------------------

struct GroupRow {
    id: String,
    name: String,
    directory: String,
    yaml_path: Option<String>,
    sync_enabled: bool,
}

fn group_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<GroupRow> {
    Ok(GroupRow {
        id: row.get(0)?,
        name: row.get(1)?,
        directory: row.get(2)?,
        yaml_path: row.get(3)?,
        sync_enabled: row.get(4)?,
    })
}

fn hydrate_group(conn: &Connection, row: GroupRow) -> Result<Group, StorageError> {
    let group_id = GroupId::new(row.id);
    let projects = load_projects(conn, &group_id)?;
    let env_vars = load_env(
        conn,
        "SELECT key, value FROM group_env_vars WHERE group_id = ?1",
        group_id.as_str(),
    )?;
    Ok(Group {
        id: group_id,
        name: row.name,
        directory: PathBuf::from(row.directory),
        projects,
        env_vars,
        yaml_path: row.yaml_path.map(PathBuf::from),
        sync_enabled: row.sync_enabled,
    })
}

const PROJECT_COLS: &str =
    "id, group_id, name, command, kind, auto_restart, cwd, interactive, watch_patterns, auto_start";

fn project_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Project> {
    let kind: String = row.get(4)?;
    let watch_patterns: Option<String> = row.get(8)?;
    Ok(Project {
        id: ProjectId::new(row.get::<_, String>(0)?),
        group_id: GroupId::new(row.get::<_, String>(1)?),
        name: row.get(2)?,
        command: row.get(3)?,
        kind: ProjectKind::parse(&kind).unwrap_or(ProjectKind::Service),
        auto_restart: row.get(5)?,
        env_vars: HashMap::new(),
        cwd: row.get::<_, Option<String>>(6)?.map(PathBuf::from),
        interactive: row.get(7)?,
        watch_patterns: watch_patterns
            .and_then(|json| serde_json::from_str(&json).ok())
            .unwrap_or_default(),
        auto_start_on_launch: row.get(9)?,
    })
}

fn load_projects(conn: &Connection, group_id: &GroupId) -> Result<Vec<Project>, StorageError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {PROJECT_COLS} FROM projects WHERE group_id = ?1 ORDER BY position"
    ))?;
    let mut projects: Vec<Project> = stmt
        .query_map([group_id.as_str()], project_row)?
        .collect::<Result<_, _>>()?;
    drop(stmt);
    for project in &mut projects {
        project.env_vars = load_env(
            conn,
            "SELECT key, value FROM project_env_vars WHERE project_id = ?1",
            project.id.as_str(),
        )?;
    }
    Ok(projects)
}

fn read_project(conn: &Connection, id: &ProjectId) -> Result<Project, StorageError> {
    let mut project = conn
        .query_row(
            &format!("SELECT {PROJECT_COLS} FROM projects WHERE id = ?1"),
            [id.as_str()],
            project_row,
        )
        .optional()?
        .ok_or_else(|| StorageError::not_found("project", id))?;
    project.env_vars = load_env(
        conn,
        "SELECT key, value FROM project_env_vars WHERE project_id = ?1",
        id.as_str(),
    )?;
    Ok(project)
}

fn load_env(
    conn: &Connection,
    sql: &str,
    id: &str,
) -> Result<HashMap<String, String>, StorageError> {
    let mut stmt = conn.prepare(sql)?;
    let vars = stmt
        .query_map([id], |row| Ok((row.get(0)?, row.get(1)?)))?
        .collect::<Result<_, _>>()?;
    Ok(vars)
}

// ---------------------------------------------------------------------------
// Write helpers
// ---------------------------------------------------------------------------

fn insert_project_row(
    tx: &Transaction<'_>,
    project: &Project,
    position: i64,
) -> Result<(), StorageError> {
    tx.execute(
        "INSERT INTO projects
           (id, group_id, name, command, kind, auto_restart, cwd, interactive,
            watch_patterns, auto_start, position)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        params![
            project.id.as_str(),
            project.group_id.as_str(),
            project.name,
            project.command,
            project.kind.as_str(),
            project.auto_restart,
            project.cwd.as_deref().map(|p| p.to_string_lossy().into_owned()),
            project.interactive,
            watch_patterns_json(project)?,
            project.auto_start_on_launch,
            position,
        ],
    )?;
    write_project_env(tx, project)?;
    Ok(())
}

fn update_project_row(
    tx: &Transaction<'_>,
    project: &Project,
    position: Option<i64>,
) -> Result<(), StorageError> {
    let changed = tx.execute(
        "UPDATE projects SET name = ?2, command = ?3, kind = ?4, auto_restart = ?5,
            cwd = ?6, interactive = ?7, watch_patterns = ?8, auto_start = ?9,
            position = COALESCE(?10, position)
         WHERE id = ?1",
        params![
            project.id.as_str(),
            project.name,
            project.command,
            project.kind.as_str(),
            project.auto_restart,
            project.cwd.as_deref().map(|p| p.to_string_lossy().into_owned()),
            project.interactive,
            watch_patterns_json(project)?,
            project.auto_start_on_launch,
            position,
        ],
    )?;
    require_hit(changed, "project", &project.id)?;
    write_project_env(tx, project)?;
    Ok(())
}

fn write_group_env(
    tx: &Transaction<'_>,
    id: &GroupId,
    env_vars: &HashMap<String, String>,
) -> Result<(), StorageError> {
    tx.execute("DELETE FROM group_env_vars WHERE group_id = ?1", [id.as_str()])?;
    for (key, value) in env_vars {
        tx.execute(
            "INSERT INTO group_env_vars (group_id, key, value) VALUES (?1, ?2, ?3)",
            params![id.as_str(), key, value],
        )?;
    }
    Ok(())
}

fn write_project_env(tx: &Transaction<'_>, project: &Project) -> Result<(), StorageError> {
    tx.execute("DELETE FROM project_env_vars WHERE project_id = ?1", [project.id.as_str()])?;
    for (key, value) in &project.env_vars {
        tx.execute(
            "INSERT INTO project_env_vars (project_id, key, value) VALUES (?1, ?2, ?3)",
            params![project.id.as_str(), key, value],
        )?;
    }
    Ok(())
}

fn watch_patterns_json(project: &Project) -> Result<Option<String>, StorageError> {
    if project.watch_patterns.is_empty() {
        Ok(None)
    } else {
        Ok(Some(serde_json::to_string(&project.watch_patterns).map_err(|e| {
            StorageError::Conflict(format!("unserializable watch patterns: {e}"))
        })?))
    }
}

fn ensure_group(tx: &Transaction<'_>, id: &GroupId) -> Result<(), StorageError> {
    let exists: bool = tx.query_row(
        "SELECT EXISTS(SELECT 1 FROM groups WHERE id = ?1)",
        [id.as_str()],
        |row| row.get(0),
    )?;
    if exists {
        Ok(())
    } else {
        Err(StorageError::not_found("group", id))
    }
}

fn require_hit(
    changed: usize,
    what: &str,
    id: impl std::fmt::Display,
) -> Result<(), StorageError> {
    if changed == 0 {
        Err(StorageError::not_found(what, id))
    } else {
        Ok(())
    }
}

fn path_str(path: &std::path::Path) -> String {
    path.to_string_lossy().into_owned()
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
