//! Shared harness for the end-to-end specs.

use std::io::{BufRead, BufReader, Read, Write};
use std::os::unix::net::UnixStream;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};

pub use runner_core::{Event, ProjectKind};
pub use runner_wire::{ErrorKind, ProjectSpec, Request, Response};

const READY_TIMEOUT: Duration = Duration::from_secs(30);

/// One daemon instance on its own scratch state dir and working dir.
pub struct Daemon {
    child: Child,
    // Options so kill_hard can hand the dirs to a restarted instance
    state_dir: Option<tempfile::TempDir>,
    work_dir: Option<tempfile::TempDir>,
}

impl Daemon {
    pub fn launch() -> Self {
        let state_dir = tempfile::tempdir().expect("state dir");
        let work_dir = tempfile::tempdir().expect("work dir");
        Self::launch_in(state_dir, work_dir)
    }

    /// Launch against existing directories (restart scenarios).
    pub fn launch_in(state_dir: tempfile::TempDir, work_dir: tempfile::TempDir) -> Self {
        let bin = assert_cmd::cargo::cargo_bin("runnerd");
        let mut child = Command::new(bin)
            .env("RUNNER_STATE_DIR", state_dir.path())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .stdin(Stdio::null())
            .spawn()
            .expect("spawn runnerd");

        // The daemon prints READY once the socket is bound
        let stdout = child.stdout.take().expect("stdout");
        let mut lines = BufReader::new(stdout).lines();
        let started = Instant::now();
        loop {
            assert!(started.elapsed() < READY_TIMEOUT, "runnerd never printed READY");
            match lines.next() {
                Some(Ok(line)) if line.trim() == "READY" => break,
                Some(Ok(_)) => continue,
                other => panic!("runnerd stdout ended early: {other:?}"),
            }
        }
        Self { child, state_dir: Some(state_dir), work_dir: Some(work_dir) }
    }

    pub fn state_path(&self) -> &Path {
        self.state_dir.as_ref().expect("state dir").path()
    }

    pub fn work_path(&self) -> &Path {
        self.work_dir.as_ref().expect("work dir").path()
    }

    pub fn socket_path(&self) -> PathBuf {
        self.state_path().join("runnerd.sock")
    }

    pub fn ledger_path(&self) -> PathBuf {
        self.state_path().join("runner.pids")
    }

    pub fn ledger_pids(&self) -> Vec<u32> {
        std::fs::read_to_string(self.ledger_path())
            .unwrap_or_default()
            .lines()
            .filter_map(|l| l.trim().parse().ok())
            .collect()
    }

    pub fn client(&self) -> Client {
        Client::connect(&self.socket_path())
    }

    /// Ask for a clean shutdown and wait for the process to exit.
    pub fn shutdown(mut self) {
        let mut client = self.client();
        match client.request(&Request::Shutdown) {
            Response::ShuttingDown => {}
            other => panic!("unexpected shutdown reply: {other:?}"),
        }
        let started = Instant::now();
        loop {
            match self.child.try_wait().expect("wait") {
                Some(_) => return,
                None if started.elapsed() > Duration::from_secs(10) => {
                    let _ = self.child.kill();
                    panic!("daemon did not exit after shutdown request");
                }
                None => std::thread::sleep(Duration::from_millis(50)),
            }
        }
    }

    /// Kill the daemon hard, handing back the dirs for a restart.
    pub fn kill_hard(mut self) -> (tempfile::TempDir, tempfile::TempDir) {
        self.child.kill().expect("kill");
        let _ = self.child.wait();
        (self.state_dir.take().expect("state dir"), self.work_dir.take().expect("work dir"))
    }
}

impl Drop for Daemon {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

pub fn pid_alive(pid: u32) -> bool {
    Command::new("kill")
        .args(["-0", &pid.to_string()])
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

/// Blocking wire-protocol client.
pub struct Client {
    stream: UnixStream,
}

impl Client {
    pub fn connect(socket: &Path) -> Self {
        let started = Instant::now();
        loop {
            match UnixStream::connect(socket) {
                Ok(stream) => return Self { stream },
                Err(_) if started.elapsed() < Duration::from_secs(5) => {
                    std::thread::sleep(Duration::from_millis(50));
                }
                Err(e) => panic!("cannot connect to {}: {e}", socket.display()),
            }
        }
    }

    pub fn request(&mut self, request: &Request) -> Response {
        let frame = runner_wire::encode(request).expect("encode");
        self.stream.write_all(&frame).expect("write");
        self.read_response().expect("response")
    }

    fn read_response(&mut self) -> Option<Response> {
        let mut len_buf = [0u8; 4];
        self.stream.read_exact(&mut len_buf).ok()?;
        let len = u32::from_be_bytes(len_buf) as usize;
        let mut payload = vec![0u8; len];
        self.stream.read_exact(&mut payload).ok()?;
        serde_json::from_slice(&payload).ok()
    }

    /// Upgrade this connection into an event stream.
    pub fn subscribe(mut self) -> EventStream {
        match self.request(&Request::Subscribe) {
            Response::Ok => {}
            other => panic!("subscribe failed: {other:?}"),
        }
        EventStream { client: self }
    }
}

pub struct EventStream {
    client: Client,
}

impl EventStream {
    /// Next pushed event within `timeout`, None when the window lapses.
    pub fn next_event(&mut self, timeout: Duration) -> Option<Event> {
        self.client
            .stream
            .set_read_timeout(Some(timeout))
            .expect("set timeout");
        match self.client.read_response() {
            Some(Response::Event { event }) => Some(event),
            Some(other) => panic!("expected pushed event, got {other:?}"),
            None => None,
        }
    }

    /// Wait until an event satisfies `pred`, or give up at `deadline`.
    pub fn wait_for(
        &mut self,
        deadline: Duration,
        mut pred: impl FnMut(&Event) -> bool,
    ) -> Option<Event> {
        let started = Instant::now();
        while started.elapsed() < deadline {
            let remaining =
                deadline.saturating_sub(started.elapsed()).max(Duration::from_millis(10));
            if let Some(event) = self.next_event(remaining) {
                if pred(&event) {
                    return Some(event);
                }
            }
        }
        None
    }
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

pub fn service_spec(name: &str, command: &str) -> ProjectSpec {
    ProjectSpec {
        name: name.into(),
        command: command.into(),
        kind: ProjectKind::Service,
        auto_restart: false,
        env_vars: Default::default(),
        cwd: None,
        interactive: false,
        watch_patterns: Vec::new(),
        auto_start_on_launch: false,
    }
}

pub fn task_spec(name: &str, command: &str) -> ProjectSpec {
    ProjectSpec { kind: ProjectKind::Task, ..service_spec(name, command) }
}

pub fn expect_group(response: Response) -> runner_core::Group {
    match response {
        Response::Group { group } => *group,
        other => panic!("expected group, got {other:?}"),
    }
}

pub fn expect_project(response: Response) -> runner_core::Project {
    match response {
        Response::Project { project } => *project,
        other => panic!("expected project, got {other:?}"),
    }
}

pub fn expect_sessions(response: Response) -> Vec<runner_core::Session> {
    match response {
        Response::Sessions { sessions } => sessions,
        other => panic!("expected sessions, got {other:?}"),
    }
}
