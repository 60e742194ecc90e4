// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Interactive (PTY) children.
//!
//! One PTY master per child: a blocking reader thread multiplexes all
//! output as stdout, a blocking writer thread drains queued stdin bytes,
//! and a wait thread reports the exit code. Stdin is never logged.

use std::io::{Read, Write};

use chrono::Utc;
use portable_pty::{native_pty_system, CommandBuilder, MasterPty, PtySize};
use runner_core::{Event, LogChunk, LogStream, Session};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::child::StartSpec;
use crate::error::EngineError;
use crate::pumps::{StreamDecoder, READ_BUF_LEN};
use crate::supervisor::EngineShared;

const DEFAULT_COLS: u16 = 120;
const DEFAULT_ROWS: u16 = 30;

pub(crate) struct PtyChild {
    master: Box<dyn MasterPty + Send>,
    writer_tx: mpsc::UnboundedSender<String>,
    exit_rx: mpsc::Receiver<Option<i32>>,
    exit_code: Option<Option<i32>>,
    pid: u32,
}

impl PtyChild {
    pub fn spawn(
        shared: &EngineShared,
        spec: &StartSpec,
        session: &Session,
        cwd: &std::path::Path,
    ) -> Result<Self, EngineError> {
        let size = PtySize {
            rows: spec.rows.unwrap_or(DEFAULT_ROWS),
            cols: spec.cols.unwrap_or(DEFAULT_COLS),
            pixel_width: 0,
            pixel_height: 0,
        };
        let pair = native_pty_system()
            .openpty(size)
            .map_err(|e| EngineError::Spawn(e.to_string()))?;

        let mut cmd = CommandBuilder::new(&spec.shell.program);
        cmd.args(spec.shell.invocation(&spec.project.command));
        cmd.cwd(cwd);
        for (key, value) in &spec.env {
            cmd.env(key, value);
        }

        let mut child = pair
            .slave
            .spawn_command(cmd)
            .map_err(|e| EngineError::Spawn(e.to_string()))?;
        drop(pair.slave);

        let pid = child
            .process_id()
            .ok_or_else(|| EngineError::Spawn("PTY child has no pid".into()))?;

        // Reader thread: PTY output is one stream, tagged stdout.
        let reader = pair
            .master
            .try_clone_reader()
            .map_err(|e| EngineError::Spawn(e.to_string()))?;
        spawn_reader(shared, spec, session, reader);

        // Writer thread: drains queued stdin writes so the actor never
        // blocks on a full PTY.
        let writer = pair
            .master
            .take_writer()
            .map_err(|e| EngineError::Spawn(e.to_string()))?;
        let (writer_tx, writer_rx) = mpsc::unbounded_channel();
        spawn_writer(writer, writer_rx, pid);

        // Wait thread: portable-pty's wait is blocking.
        let (exit_tx, exit_rx) = mpsc::channel(1);
        std::thread::spawn(move || {
            let code = match child.wait() {
                Ok(status) => Some(status.exit_code() as i32),
                Err(e) => {
                    warn!(error = %e, "PTY wait failed");
                    None
                }
            };
            let _ = exit_tx.blocking_send(code);
        });

        Ok(Self { master: pair.master, writer_tx, exit_rx, exit_code: None, pid })
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }

    /// Cancel-safe exit wait; returns the cached code once resolved.
    pub async fn wait(&mut self) -> Option<i32> {
        if let Some(code) = self.exit_code {
            return code;
        }
        let code = self.exit_rx.recv().await.flatten();
        self.exit_code = Some(code);
        code
    }

    pub fn write(&self, data: String) {
        let _ = self.writer_tx.send(data);
    }

    pub fn resize(&self, cols: u16, rows: u16) {
        if let Err(e) =
            self.master.resize(PtySize { rows, cols, pixel_width: 0, pixel_height: 0 })
        {
            warn!(pid = self.pid, error = %e, "PTY resize failed");
        }
    }
}

fn spawn_reader(
    shared: &EngineShared,
    spec: &StartSpec,
    session: &Session,
    mut reader: Box<dyn Read + Send>,
) {
    let project_id = spec.project.id.clone();
    let session_id = session.id.clone();
    let event_tx = shared.event_tx.clone();
    let log_tx = shared.log_tx.clone();
    std::thread::spawn(move || {
        let mut buf = [0u8; READ_BUF_LEN];
        let mut decoder = StreamDecoder::new();
        let forward = |data: String| {
            if data.is_empty() {
                return;
            }
            let ts = Utc::now();
            let _ = event_tx.blocking_send(Event::ProcessLog {
                project_id: project_id.clone(),
                stream: LogStream::Stdout,
                data: data.clone(),
                timestamp: ts,
            });
            let _ = log_tx.blocking_send(LogChunk {
                session_id: session_id.clone(),
                stream: LogStream::Stdout,
                data,
                ts,
            });
        };
        loop {
            match reader.read(&mut buf) {
                Ok(0) | Err(_) => break,
                Ok(n) => forward(decoder.decode(&buf[..n])),
            }
        }
        forward(decoder.flush());
        debug!(%project_id, "PTY reader finished");
    });
}

fn spawn_writer(
    mut writer: Box<dyn Write + Send>,
    mut writer_rx: mpsc::UnboundedReceiver<String>,
    pid: u32,
) {
    std::thread::spawn(move || {
        while let Some(data) = writer_rx.blocking_recv() {
            if let Err(e) = writer.write_all(data.as_bytes()).and_then(|_| writer.flush()) {
                warn!(pid, error = %e, "PTY stdin write failed");
                break;
            }
        }
    });
}
