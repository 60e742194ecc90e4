// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session/log/metric store: append-heavy writes, aggregate reads.
//!
//! Log inserts arrive in batches from the engine's writer task; each batch
//! is one transaction. Ordering within a (session, stream) pair follows
//! insert order via the AUTOINCREMENT rowid.

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use rusqlite::{params, OptionalExtension};
use tracing::debug;

use runner_core::{ExitStatus, LogChunk, LogStream, MetricPoint, ProjectId, Session, SessionId};

use crate::db::Database;
use crate::error::StorageError;

/// Session row joined with per-session log/metric aggregates.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionWithStats {
    pub session: Session,
    pub log_count: u64,
    pub log_size: u64,
    pub metric_count: u64,
}

/// Whole-database counters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StorageTotals {
    pub session_count: u64,
    pub log_count: u64,
    pub log_bytes: u64,
    pub metric_count: u64,
    pub database_size_bytes: u64,
}

impl Database {
    /// Open a new session for a project. The caller (the supervisor) is
    /// responsible for the one-open-session-per-project invariant.
    pub fn create_session(&self, project_id: &ProjectId) -> Result<Session, StorageError> {
        let session = Session {
            id: SessionId::generate(),
            project_id: project_id.clone(),
            started_at: Utc::now(),
            ended_at: None,
            exit_status: ExitStatus::Running,
        };
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO sessions (id, project_id, started_at, ended_at, exit_status)
             VALUES (?1, ?2, ?3, NULL, 'running')",
            params![session.id.as_str(), project_id.as_str(), fmt_ts(&session.started_at)],
        )?;
        Ok(session)
    }

    pub fn end_session(
        &self,
        id: &SessionId,
        exit_status: ExitStatus,
    ) -> Result<(), StorageError> {
        let conn = self.conn.lock();
        let changed = conn.execute(
            "UPDATE sessions SET ended_at = ?2, exit_status = ?3 WHERE id = ?1",
            params![id.as_str(), fmt_ts(&Utc::now()), exit_status.as_str()],
        )?;
        if changed == 0 {
            return Err(StorageError::not_found("session", id));
        }
        Ok(())
    }

    pub fn insert_log(&self, chunk: &LogChunk) -> Result<(), StorageError> {
        self.insert_logs(std::slice::from_ref(chunk))
    }

    /// Batched log insert: one transaction per batch.
    pub fn insert_logs(&self, chunks: &[LogChunk]) -> Result<(), StorageError> {
        if chunks.is_empty() {
            return Ok(());
        }
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO logs (session_id, stream, data, ts) VALUES (?1, ?2, ?3, ?4)",
            )?;
            for chunk in chunks {
                stmt.execute(params![
                    chunk.session_id.as_str(),
                    chunk.stream.as_str(),
                    chunk.data.as_bytes(),
                    fmt_ts(&chunk.ts),
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    pub fn insert_metric(&self, point: &MetricPoint) -> Result<(), StorageError> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO metrics (session_id, ts, cpu, memory) VALUES (?1, ?2, ?3, ?4)",
            params![
                point.session_id.as_str(),
                fmt_ts(&point.ts),
                point.cpu as f64,
                point.memory as i64,
            ],
        )?;
        Ok(())
    }

    pub fn get_session(&self, id: &SessionId) -> Result<Option<Session>, StorageError> {
        let conn = self.conn.lock();
        Ok(conn
            .query_row(
                "SELECT id, project_id, started_at, ended_at, exit_status
                 FROM sessions WHERE id = ?1",
                [id.as_str()],
                session_row,
            )
            .optional()?)
    }

    /// All sessions for a project, newest first.
    pub fn get_project_sessions(
        &self,
        project_id: &ProjectId,
    ) -> Result<Vec<Session>, StorageError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT id, project_id, started_at, ended_at, exit_status
             FROM sessions WHERE project_id = ?1 ORDER BY started_at DESC, id DESC",
        )?;
        let sessions = stmt
            .query_map([project_id.as_str()], session_row)?
            .collect::<Result<_, _>>()?;
        Ok(sessions)
    }

    /// Sessions joined with log count, total log bytes, and metric count.
    pub fn get_project_sessions_with_stats(
        &self,
        project_id: &ProjectId,
    ) -> Result<Vec<SessionWithStats>, StorageError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT s.id, s.project_id, s.started_at, s.ended_at, s.exit_status,
                    (SELECT COUNT(*) FROM logs l WHERE l.session_id = s.id),
                    (SELECT COALESCE(SUM(LENGTH(l.data)), 0) FROM logs l WHERE l.session_id = s.id),
                    (SELECT COUNT(*) FROM metrics m WHERE m.session_id = s.id)
             FROM sessions s WHERE s.project_id = ?1
             ORDER BY s.started_at DESC, s.id DESC",
        )?;
        let rows = stmt
            .query_map([project_id.as_str()], |row| {
                Ok(SessionWithStats {
                    session: session_row(row)?,
                    log_count: row.get::<_, i64>(5)? as u64,
                    log_size: row.get::<_, i64>(6)? as u64,
                    metric_count: row.get::<_, i64>(7)? as u64,
                })
            })?
            .collect::<Result<_, _>>()?;
        Ok(rows)
    }

    pub fn get_last_completed_session(
        &self,
        project_id: &ProjectId,
    ) -> Result<Option<Session>, StorageError> {
        let conn = self.conn.lock();
        Ok(conn
            .query_row(
                "SELECT id, project_id, started_at, ended_at, exit_status
                 FROM sessions
                 WHERE project_id = ?1 AND ended_at IS NOT NULL
                 ORDER BY ended_at DESC, id DESC LIMIT 1",
                [project_id.as_str()],
                session_row,
            )
            .optional()?)
    }

    /// All log chunks of one session in insert order.
    pub fn get_session_logs(&self, id: &SessionId) -> Result<Vec<LogChunk>, StorageError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT session_id, stream, data, ts FROM logs WHERE session_id = ?1 ORDER BY id",
        )?;
        let logs = stmt.query_map([id.as_str()], log_row)?.collect::<Result<_, _>>()?;
        Ok(logs)
    }

    /// Byte-concatenation of the session's chunks in insert order.
    pub fn get_session_logs_as_string(&self, id: &SessionId) -> Result<String, StorageError> {
        let logs = self.get_session_logs(id)?;
        let mut text = String::with_capacity(logs.iter().map(|c| c.data.len()).sum());
        for chunk in logs {
            text.push_str(&chunk.data);
        }
        Ok(text)
    }

    pub fn get_session_metrics(&self, id: &SessionId) -> Result<Vec<MetricPoint>, StorageError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT session_id, ts, cpu, memory FROM metrics WHERE session_id = ?1 ORDER BY id",
        )?;
        let metrics = stmt.query_map([id.as_str()], metric_row)?.collect::<Result<_, _>>()?;
        Ok(metrics)
    }

    pub fn get_last_metric(&self, id: &SessionId) -> Result<Option<MetricPoint>, StorageError> {
        let conn = self.conn.lock();
        Ok(conn
            .query_row(
                "SELECT session_id, ts, cpu, memory FROM metrics
                 WHERE session_id = ?1 ORDER BY id DESC LIMIT 1",
                [id.as_str()],
                metric_row,
            )
            .optional()?)
    }

    /// Last `limit` log rows from the project's most recent session,
    /// returned in chronological order.
    pub fn get_recent_logs(
        &self,
        project_id: &ProjectId,
        limit: u32,
    ) -> Result<Vec<LogChunk>, StorageError> {
        let conn = self.conn.lock();
        let last_session: Option<String> = conn
            .query_row(
                "SELECT id FROM sessions WHERE project_id = ?1
                 ORDER BY started_at DESC, id DESC LIMIT 1",
                [project_id.as_str()],
                |row| row.get(0),
            )
            .optional()?;
        let Some(session_id) = last_session else {
            return Ok(Vec::new());
        };
        let mut stmt = conn.prepare(
            "SELECT session_id, stream, data, ts FROM
               (SELECT id, session_id, stream, data, ts FROM logs
                WHERE session_id = ?1 ORDER BY id DESC LIMIT ?2)
             ORDER BY id",
        )?;
        let logs = stmt
            .query_map(params![session_id, limit], log_row)?
            .collect::<Result<_, _>>()?;
        Ok(logs)
    }

    pub fn delete_session(&self, id: &SessionId) -> Result<(), StorageError> {
        let conn = self.conn.lock();
        let changed = conn.execute("DELETE FROM sessions WHERE id = ?1", [id.as_str()])?;
        if changed == 0 {
            return Err(StorageError::not_found("session", id));
        }
        Ok(())
    }

    /// Drop every log row belonging to the project, across all sessions.
    pub fn clear_project_logs(&self, project_id: &ProjectId) -> Result<(), StorageError> {
        let conn = self.conn.lock();
        conn.execute(
            "DELETE FROM logs WHERE session_id IN
               (SELECT id FROM sessions WHERE project_id = ?1)",
            [project_id.as_str()],
        )?;
        Ok(())
    }

    /// Remove sessions that ended more than `days` ago. Running sessions
    /// are never touched.
    pub fn cleanup_old_sessions(&self, days: u32) -> Result<usize, StorageError> {
        let cutoff = Utc::now() - Duration::days(i64::from(days));
        let conn = self.conn.lock();
        let removed = conn.execute(
            "DELETE FROM sessions WHERE ended_at IS NOT NULL AND ended_at < ?1",
            [fmt_ts(&cutoff)],
        )?;
        debug!(removed, days, "pruned old sessions");
        Ok(removed)
    }

    /// Remove all completed sessions, keeping only ones still running.
    pub fn cleanup_all_sessions(&self) -> Result<usize, StorageError> {
        let conn = self.conn.lock();
        let removed = conn.execute("DELETE FROM sessions WHERE ended_at IS NOT NULL", [])?;
        Ok(removed)
    }

    /// Crash recovery: mark sessions left `running` by a previous daemon
    /// as errored. Returns how many were closed.
    pub fn mark_open_sessions_errored(&self) -> Result<usize, StorageError> {
        let conn = self.conn.lock();
        let closed = conn.execute(
            "UPDATE sessions SET ended_at = ?1, exit_status = 'errored' WHERE ended_at IS NULL",
            [fmt_ts(&Utc::now())],
        )?;
        Ok(closed)
    }

    pub fn storage_totals(&self) -> Result<StorageTotals, StorageError> {
        let conn = self.conn.lock();
        let (session_count, log_count, log_bytes, metric_count) = conn.query_row(
            "SELECT (SELECT COUNT(*) FROM sessions),
                    (SELECT COUNT(*) FROM logs),
                    (SELECT COALESCE(SUM(LENGTH(data)), 0) FROM logs),
                    (SELECT COUNT(*) FROM metrics)",
            [],
            |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, i64>(2)?,
                    row.get::<_, i64>(3)?,
                ))
            },
        )?;
        drop(conn);
        Ok(StorageTotals {
            session_count: session_count as u64,
            log_count: log_count as u64,
            log_bytes: log_bytes as u64,
            metric_count: metric_count as u64,
            database_size_bytes: self.file_size(),
        })
    }
}

fn session_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Session> {
    let started: String = row.get(2)?;
    let ended: Option<String> = row.get(3)?;
    let status: String = row.get(4)?;
    Ok(Session {
        id: SessionId::new(row.get::<_, String>(0)?),
        project_id: ProjectId::new(row.get::<_, String>(1)?),
        started_at: parse_ts(&started),
        ended_at: ended.as_deref().map(parse_ts),
        exit_status: ExitStatus::parse(&status).unwrap_or(ExitStatus::Errored),
    })
}

fn log_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<LogChunk> {
    let stream: String = row.get(1)?;
    let data: Vec<u8> = row.get(2)?;
    let ts: String = row.get(3)?;
    Ok(LogChunk {
        session_id: SessionId::new(row.get::<_, String>(0)?),
        stream: LogStream::parse(&stream).unwrap_or(LogStream::Stdout),
        data: String::from_utf8_lossy(&data).into_owned(),
        ts: parse_ts(&ts),
    })
}

fn metric_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<MetricPoint> {
    let ts: String = row.get(1)?;
    Ok(MetricPoint {
        session_id: SessionId::new(row.get::<_, String>(0)?),
        ts: parse_ts(&ts),
        cpu: row.get::<_, f64>(2)? as f32,
        memory: row.get::<_, i64>(3)? as u64,
    })
}

/// Fixed-width RFC 3339 (micros, Z suffix) so string comparison orders
/// chronologically.
fn fmt_ts(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_ts(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_default()
}

#[cfg(test)]
#[path = "sessions_tests.rs"]
mod tests;
