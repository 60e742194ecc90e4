// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pipe-mode I/O pumps.
//!
//! One reader task per stream forwards raw chunks the moment they arrive;
//! no line buffering, so partial lines (progress bars, spinners) reach the
//! UI verbatim. Chunks are timestamped before enqueueing. A multi-byte
//! UTF-8 character split across two reads is held back by [`StreamDecoder`]
//! until its remaining bytes arrive.

use chrono::Utc;
use runner_core::{Event, LogChunk, LogStream, ProjectId, SessionId};
use tokio::io::AsyncReadExt;
use tracing::warn;

use crate::supervisor::EngineShared;

pub(crate) const READ_BUF_LEN: usize = 8192;

/// Incremental UTF-8 decoder for a chunked byte stream.
///
/// An incomplete trailing sequence (at most 3 bytes) is carried into the
/// next call instead of being mangled into replacement characters on both
/// sides of the read boundary. Bytes that are actually invalid still decode
/// lossily.
pub(crate) struct StreamDecoder {
    carry: Vec<u8>,
}

impl StreamDecoder {
    pub fn new() -> Self {
        Self { carry: Vec::new() }
    }

    /// Decode the next chunk, holding back an incomplete trailing sequence.
    /// Returns an empty string when the whole chunk was carried.
    pub fn decode(&mut self, bytes: &[u8]) -> String {
        let buf: Vec<u8> = if self.carry.is_empty() {
            bytes.to_vec()
        } else {
            let mut joined = std::mem::take(&mut self.carry);
            joined.extend_from_slice(bytes);
            joined
        };
        let keep = incomplete_suffix_len(&buf);
        let split = buf.len() - keep;
        self.carry = buf[split..].to_vec();
        String::from_utf8_lossy(&buf[..split]).into_owned()
    }

    /// Drain whatever is still held back (stream ended mid-sequence).
    pub fn flush(&mut self) -> String {
        let carry = std::mem::take(&mut self.carry);
        String::from_utf8_lossy(&carry).into_owned()
    }
}

/// Length of a trailing UTF-8 sequence that is a prefix of a valid
/// character, 0 when the buffer ends on a complete (or invalid) boundary.
fn incomplete_suffix_len(buf: &[u8]) -> usize {
    let len = buf.len();
    let start = len.saturating_sub(3);
    for i in (start..len).rev() {
        let byte = buf[i];
        if byte < 0x80 {
            // ASCII: the tail is complete
            return 0;
        }
        if byte >= 0xC0 {
            // Lead byte: sequence length from its high bits
            let need = if byte >= 0xF0 {
                4
            } else if byte >= 0xE0 {
                3
            } else {
                2
            };
            let have = len - i;
            return if have < need { have } else { 0 };
        }
        // Continuation byte: keep scanning for the lead
    }
    0
}

/// Attach stdout/stderr readers to a freshly spawned pipe-mode child.
pub(crate) fn spawn_pipe_pumps(
    shared: &EngineShared,
    project_id: &ProjectId,
    session_id: &SessionId,
    child: &mut tokio::process::Child,
) {
    if let Some(stdout) = child.stdout.take() {
        spawn_pump(shared, project_id, session_id, LogStream::Stdout, stdout);
    } else {
        warn!(%project_id, "child has no stdout pipe");
    }
    if let Some(stderr) = child.stderr.take() {
        spawn_pump(shared, project_id, session_id, LogStream::Stderr, stderr);
    } else {
        warn!(%project_id, "child has no stderr pipe");
    }
}

fn spawn_pump<R>(
    shared: &EngineShared,
    project_id: &ProjectId,
    session_id: &SessionId,
    stream: LogStream,
    mut reader: R,
) where
    R: tokio::io::AsyncRead + Unpin + Send + 'static,
{
    let project_id = project_id.clone();
    let session_id = session_id.clone();
    let event_tx = shared.event_tx.clone();
    let log_tx = shared.log_tx.clone();
    tokio::spawn(async move {
        let mut buf = [0u8; READ_BUF_LEN];
        let mut decoder = StreamDecoder::new();
        loop {
            let data = match reader.read(&mut buf).await {
                Ok(0) => break,
                Ok(n) => decoder.decode(&buf[..n]),
                Err(e) => {
                    // Pump errors never transition the process state
                    warn!(%project_id, stream = %stream, error = %e, "pipe read failed");
                    break;
                }
            };
            if data.is_empty() {
                continue;
            }
            forward(&event_tx, &log_tx, &project_id, &session_id, stream, data).await;
        }
        let tail = decoder.flush();
        if !tail.is_empty() {
            forward(&event_tx, &log_tx, &project_id, &session_id, stream, tail).await;
        }
    });
}

async fn forward(
    event_tx: &tokio::sync::mpsc::Sender<Event>,
    log_tx: &tokio::sync::mpsc::Sender<LogChunk>,
    project_id: &ProjectId,
    session_id: &SessionId,
    stream: LogStream,
    data: String,
) {
    let ts = Utc::now();
    let _ = event_tx
        .send(Event::ProcessLog {
            project_id: project_id.clone(),
            stream,
            data: data.clone(),
            timestamp: ts,
        })
        .await;
    let _ = log_tx
        .send(LogChunk { session_id: session_id.clone(), stream, data, ts })
        .await;
}

#[cfg(test)]
#[path = "pumps_tests.rs"]
mod tests;
