//! Process supervision
//!
//! Two shapes of child process are supervised here:
//!
//! * a long-lived server that is "started" once a readiness line appears on
//!   stdout ([`start_server`]);
//! * a short-lived test process whose exit status is the result
//!   ([`run_child`]).
//!
//! Both race the child against a deadline. Every supervised process moves
//! through [`Phase`]s and resolves exactly once: the first terminal
//! transition wins and later signals (a late exit after a timeout, a ready
//! line after a conflict) are ignored.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use crate::error::{GridError, GridResult};

/// Printed by the Grid once it accepts sessions
pub const SERVER_READY_MARKER: &str = "Started Selenium Standalone";

/// Printed by the Grid when its port is taken
pub const SERVER_CONFLICT_MARKER: &str = "Address already in use";

pub const SERVER_START_TIMEOUT: Duration = Duration::from_secs(120);

/// How long to wait for output pipes to drain after a child exits
const OUTPUT_DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

/// Lifecycle of a supervised process
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Spawning,
    Running,
    /// Readiness line seen (server) or zero exit (test)
    Ready,
    Failed,
    TimedOut,
    SpawnError,
}

impl Phase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Phase::Ready | Phase::Failed | Phase::TimedOut | Phase::SpawnError)
    }
}

/// Guards the single transition into a terminal phase
#[derive(Debug)]
pub struct PhaseTracker {
    label: String,
    phase: Phase,
}

impl PhaseTracker {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            phase: Phase::Spawning,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Move to `next`. Returns false, leaving the phase alone, once resolved.
    pub fn advance(&mut self, next: Phase) -> bool {
        if self.phase.is_terminal() {
            debug!("{}: ignoring {:?} after {:?}", self.label, next, self.phase);
            return false;
        }
        debug!("{}: {:?} -> {:?}", self.label, self.phase, next);
        self.phase = next;
        true
    }
}

/// Log prefixes for a child's two output streams
#[derive(Debug, Clone, Copy)]
pub struct OutputTags {
    pub stdout: &'static str,
    pub stderr: &'static str,
}

impl OutputTags {
    pub const SELENIUM: OutputTags = OutputTags {
        stdout: "[Selenium]",
        stderr: "[Selenium]",
    };
    pub const TEST: OutputTags = OutputTags {
        stdout: "[Test]",
        stderr: "[Test Error]",
    };
    pub const CUCUMBER: OutputTags = OutputTags {
        stdout: "[Cucumber]",
        stderr: "[Cucumber Error]",
    };
}

/// What a server's stdout reported while it was starting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ServerSignal {
    Ready,
    Conflict,
}

/// Marker lines a reader task watches for. Sends one signal, then goes quiet.
struct MarkerWatch {
    ready: String,
    conflict: String,
    signals: mpsc::Sender<ServerSignal>,
}

impl MarkerWatch {
    fn classify(&self, line: &str) -> Option<ServerSignal> {
        if line.contains(&self.conflict) {
            Some(ServerSignal::Conflict)
        } else if line.contains(&self.ready) {
            Some(ServerSignal::Ready)
        } else {
            None
        }
    }
}

/// Where a reader task sends each line it reads
struct LineSink {
    tag: &'static str,
    echo: bool,
    markers: Option<MarkerWatch>,
    buffer: Option<Arc<Mutex<String>>>,
}

fn spawn_line_reader<R>(reader: R, mut sink: LineSink) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut reader = BufReader::new(reader);
        let mut raw = Vec::new();
        loop {
            raw.clear();
            match reader.read_until(b'\n', &mut raw).await {
                Ok(0) => break,
                Ok(_) => {
                    let line = String::from_utf8_lossy(&raw);
                    let line = line.trim_end_matches(&['\n', '\r'][..]);
                    if sink.echo {
                        debug!("{} {}", sink.tag, line);
                    }
                    if let Some(buffer) = &sink.buffer {
                        let mut buffer = buffer.lock();
                        buffer.push_str(line);
                        buffer.push('\n');
                    }
                    if let Some(signal) = sink.markers.as_ref().and_then(|m| m.classify(line)) {
                        if let Some(markers) = sink.markers.take() {
                            // Receiver gone means the start already resolved; keep echoing
                            let _ = markers.signals.send(signal).await;
                        }
                    }
                }
                Err(e) => {
                    debug!("{} read error: {}", sink.tag, e);
                    break;
                }
            }
        }
    })
}

fn command(program: &Path, args: &[String], env: &BTreeMap<String, String>) -> Command {
    let mut cmd = Command::new(program);
    cmd.args(args)
        .env_clear()
        .envs(env)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    cmd
}

/// Ask a child to stop, then reap it in the background
pub fn terminate(mut child: Child) {
    #[cfg(unix)]
    let signalled = match child.id() {
        Some(pid) => {
            use nix::sys::signal::{kill, Signal};
            use nix::unistd::Pid;
            kill(Pid::from_raw(pid as i32), Signal::SIGTERM).is_ok()
        }
        None => false,
    };
    #[cfg(not(unix))]
    let signalled = false;

    if !signalled {
        let _ = child.start_kill();
    }

    tokio::spawn(async move {
        let _ = child.wait().await;
    });
}

pub fn describe_exit(status: ExitStatus) -> String {
    match status.code() {
        Some(code) => format!("exit code {}", code),
        None => "terminated by signal".to_string(),
    }
}

/// A long-lived server and what marks it ready
#[derive(Debug, Clone)]
pub struct ServerLaunch {
    pub label: String,
    pub program: PathBuf,
    pub args: Vec<String>,
    pub env: BTreeMap<String, String>,
    pub ready_marker: String,
    pub conflict_marker: String,
    pub timeout: Duration,
    pub echo_output: bool,
}

impl ServerLaunch {
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self {
            label: "Selenium".to_string(),
            program: program.into(),
            args,
            env: BTreeMap::new(),
            ready_marker: SERVER_READY_MARKER.to_string(),
            conflict_marker: SERVER_CONFLICT_MARKER.to_string(),
            timeout: SERVER_START_TIMEOUT,
            echo_output: false,
        }
    }
}

/// Spawn a server and wait until it reports readiness.
///
/// Succeeds when the ready marker appears on stdout. Fails on the conflict
/// marker, on exit before readiness, or when `timeout` elapses; the timeout
/// sends SIGTERM to the child. Output keeps being echoed after readiness
/// when `echo_output` is set.
pub async fn start_server(launch: &ServerLaunch) -> GridResult<Child> {
    let mut tracker = PhaseTracker::new(&launch.label);

    let mut child = match command(&launch.program, &launch.args, &launch.env).spawn() {
        Ok(child) => child,
        Err(e) => {
            tracker.advance(Phase::SpawnError);
            error!("Failed to start {}: {}", launch.label, e);
            return Err(GridError::Spawn {
                program: launch.program.display().to_string(),
                reason: e.to_string(),
            });
        }
    };
    tracker.advance(Phase::Running);

    let (tx, mut rx) = mpsc::channel(1);
    if let Some(stdout) = child.stdout.take() {
        spawn_line_reader(
            stdout,
            LineSink {
                tag: OutputTags::SELENIUM.stdout,
                echo: launch.echo_output,
                markers: Some(MarkerWatch {
                    ready: launch.ready_marker.clone(),
                    conflict: launch.conflict_marker.clone(),
                    signals: tx,
                }),
                buffer: None,
            },
        );
    }
    if let Some(stderr) = child.stderr.take() {
        spawn_line_reader(
            stderr,
            LineSink {
                tag: OutputTags::SELENIUM.stderr,
                echo: launch.echo_output,
                markers: None,
                buffer: None,
            },
        );
    }

    let deadline = tokio::time::sleep(launch.timeout);
    tokio::pin!(deadline);
    let mut stdout_open = true;

    loop {
        tokio::select! {
            biased;

            _ = &mut deadline => {
                tracker.advance(Phase::TimedOut);
                warn!("{} did not become ready within {:?}", launch.label, launch.timeout);
                terminate(child);
                return Err(GridError::StartupTimeout {
                    seconds: launch.timeout.as_secs(),
                });
            }

            signal = rx.recv(), if stdout_open => match signal {
                Some(ServerSignal::Conflict) => {
                    tracker.advance(Phase::Failed);
                    terminate(child);
                    return Err(GridError::AlreadyRunning);
                }
                Some(ServerSignal::Ready) => {
                    tracker.advance(Phase::Ready);
                    return Ok(child);
                }
                None => stdout_open = false,
            },

            status = child.wait(), if !stdout_open => {
                tracker.advance(Phase::Failed);
                let reason = match status {
                    Ok(status) => describe_exit(status),
                    Err(e) => e.to_string(),
                };
                return Err(GridError::ExitedEarly(reason));
            }
        }
    }
}

/// A short-lived child whose exit status is its result
#[derive(Debug, Clone)]
pub struct ChildSpec {
    /// Used in log lines and the timeout message ("Test timeout after ...")
    pub label: String,
    pub program: PathBuf,
    pub args: Vec<String>,
    pub env: BTreeMap<String, String>,
    pub cwd: PathBuf,
    pub timeout: Duration,
    pub echo_output: bool,
    pub tags: OutputTags,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChildStatus {
    /// `None` when killed by a signal
    Exited(Option<i32>),
    TimedOut,
    SpawnError(String),
    WaitFailed(String),
}

/// Result of [`run_child`], with captured output
#[derive(Debug, Clone)]
pub struct ChildOutcome {
    pub status: ChildStatus,
    pub stdout: String,
    pub stderr: String,
    pub duration: Duration,
    label: String,
    timeout: Duration,
}

impl ChildOutcome {
    pub fn success(&self) -> bool {
        self.status == ChildStatus::Exited(Some(0))
    }

    /// Human-readable failure reason, `None` on success
    pub fn error_message(&self) -> Option<String> {
        match &self.status {
            ChildStatus::Exited(Some(0)) => None,
            ChildStatus::Exited(code) => {
                let stderr = self.stderr.trim();
                if !stderr.is_empty() {
                    Some(stderr.to_string())
                } else {
                    match code {
                        Some(code) => Some(format!("Process exited with code {}", code)),
                        None => Some("Process terminated by signal".to_string()),
                    }
                }
            }
            ChildStatus::TimedOut => Some(format!(
                "{} timeout after {}ms",
                self.label,
                self.timeout.as_millis()
            )),
            ChildStatus::SpawnError(e) => Some(e.clone()),
            ChildStatus::WaitFailed(e) => Some(e.clone()),
        }
    }
}

/// Run a child to completion, bounded by `spec.timeout`.
///
/// stdout and stderr are captured in full. On timeout the child gets SIGTERM
/// and whatever output arrived so far is returned.
pub async fn run_child(spec: &ChildSpec) -> ChildOutcome {
    let started = Instant::now();
    let mut tracker = PhaseTracker::new(&spec.label);
    let stdout_buf = Arc::new(Mutex::new(String::new()));
    let stderr_buf = Arc::new(Mutex::new(String::new()));

    let outcome = |status: ChildStatus| ChildOutcome {
        status,
        stdout: stdout_buf.lock().clone(),
        stderr: stderr_buf.lock().clone(),
        duration: started.elapsed(),
        label: spec.label.clone(),
        timeout: spec.timeout,
    };

    let mut cmd = command(&spec.program, &spec.args, &spec.env);
    cmd.current_dir(&spec.cwd);

    let mut child = match cmd.spawn() {
        Ok(child) => child,
        Err(e) => {
            tracker.advance(Phase::SpawnError);
            return outcome(ChildStatus::SpawnError(format!(
                "Failed to spawn {}: {}",
                spec.program.display(),
                e
            )));
        }
    };
    tracker.advance(Phase::Running);

    let mut readers = Vec::with_capacity(2);
    if let Some(stdout) = child.stdout.take() {
        readers.push(spawn_line_reader(
            stdout,
            LineSink {
                tag: spec.tags.stdout,
                echo: spec.echo_output,
                markers: None,
                buffer: Some(stdout_buf.clone()),
            },
        ));
    }
    if let Some(stderr) = child.stderr.take() {
        readers.push(spawn_line_reader(
            stderr,
            LineSink {
                tag: spec.tags.stderr,
                echo: spec.echo_output,
                markers: None,
                buffer: Some(stderr_buf.clone()),
            },
        ));
    }

    match tokio::time::timeout(spec.timeout, child.wait()).await {
        Ok(Ok(status)) => {
            for reader in readers {
                let _ = tokio::time::timeout(OUTPUT_DRAIN_TIMEOUT, reader).await;
            }
            tracker.advance(if status.success() { Phase::Ready } else { Phase::Failed });
            outcome(ChildStatus::Exited(status.code()))
        }
        Ok(Err(e)) => {
            tracker.advance(Phase::Failed);
            outcome(ChildStatus::WaitFailed(e.to_string()))
        }
        Err(_) => {
            tracker.advance(Phase::TimedOut);
            terminate(child);
            outcome(ChildStatus::TimedOut)
        }
    }
}
