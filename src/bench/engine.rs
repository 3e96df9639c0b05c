//! Invocation of the external acquisition engine

use crate::bench::config::EngineFlags;
use crate::bench::record::EngineOutput;
use crate::error::EngineError;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Exit status the engine uses for an internal error
pub const EXIT_ERROR: i32 = 1;
/// Exit status the engine (or `timeout(1)`) uses when out of time
pub const EXIT_TIMEOUT: i32 = 124;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Classified outcome of one engine run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineRun {
    /// Exit status 0
    Finished { stdout: String },
    /// Exit status 1
    Failed { stderr: String },
    /// Exit status 124, or killed by the harness wall clock
    TimedOut,
}

/// Something that runs the engine on one configuration
pub trait Engine {
    fn run(&self, conffile: &Path, flags: &EngineFlags) -> Result<EngineRun, EngineError>;
}

/// The engine as a child process
#[derive(Debug, Clone)]
pub struct ProcessEngine {
    command: PathBuf,
    /// Extra wall-clock time granted past the engine's own timeout
    grace: Duration,
}

impl ProcessEngine {
    pub fn new(command: impl Into<PathBuf>) -> Self {
        Self {
            command: command.into(),
            grace: Duration::from_secs(30),
        }
    }

    pub fn with_grace(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }

    fn spawn_error(&self, source: std::io::Error) -> EngineError {
        EngineError::Spawn {
            command: self.command.display().to_string(),
            source,
        }
    }
}

/// Drain a child pipe on its own thread so a chatty engine never blocks
fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> thread::JoinHandle<String> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe {
            let _ = pipe.read_to_end(&mut buf);
        }
        String::from_utf8_lossy(&buf).into_owned()
    })
}

/// Start the engine as the leader of its own process group
#[cfg(unix)]
fn isolate(command: &mut Command) {
    use std::os::unix::process::CommandExt;
    command.process_group(0);
}

#[cfg(not(unix))]
fn isolate(_command: &mut Command) {}

/// Kill the engine together with everything its launcher started
///
/// The descendants hold the output pipes open, so killing the launcher
/// alone would leave the drainers blocked.
#[cfg(unix)]
fn kill_tree(child: &mut Child) -> std::io::Result<()> {
    let pgid = child.id() as libc::pid_t;
    // SAFETY: plain syscall on a process group this harness created
    if unsafe { libc::kill(-pgid, libc::SIGKILL) } == -1 {
        let err = std::io::Error::last_os_error();
        if err.raw_os_error() != Some(libc::ESRCH) {
            return Err(err);
        }
    }
    Ok(())
}

#[cfg(not(unix))]
fn kill_tree(child: &mut Child) -> std::io::Result<()> {
    child.kill()
}

/// Wait for `child`, killing its process tree once `deadline` has passed
///
/// Returns `None` when the child was killed.
fn wait_until(
    child: &mut Child,
    deadline: Option<Instant>,
) -> std::io::Result<Option<std::process::ExitStatus>> {
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        if deadline.is_some_and(|d| Instant::now() >= d) {
            kill_tree(child)?;
            child.wait()?;
            return Ok(None);
        }
        thread::sleep(POLL_INTERVAL);
    }
}

impl Engine for ProcessEngine {
    fn run(&self, conffile: &Path, flags: &EngineFlags) -> Result<EngineRun, EngineError> {
        let args = flags.to_args(conffile);
        debug!(command = %self.command.display(), ?args, "starting engine");

        let started = Instant::now();
        let mut command = Command::new(&self.command);
        command
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        isolate(&mut command);
        let mut child = command.spawn().map_err(|e| self.spawn_error(e))?;

        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        let deadline = flags.timeout_duration().map(|t| started + t + self.grace);
        let status = wait_until(&mut child, deadline).map_err(|e| self.spawn_error(e))?;

        let stdout = stdout.join().unwrap_or_default();
        let stderr = stderr.join().unwrap_or_default();
        debug!(elapsed = ?started.elapsed(), ?status, "engine finished");

        let Some(status) = status else {
            warn!(conffile = %conffile.display(), "engine exceeded its wall-clock budget, killed");
            return Ok(EngineRun::TimedOut);
        };
        classify(status.code(), stdout, stderr, conffile)
    }
}

/// Map an exit status onto a run outcome
///
/// `None` is death by a signal the harness did not send.
pub fn classify(
    code: Option<i32>,
    stdout: String,
    stderr: String,
    conffile: &Path,
) -> Result<EngineRun, EngineError> {
    match code {
        Some(0) => Ok(EngineRun::Finished { stdout }),
        Some(EXIT_ERROR) => Ok(EngineRun::Failed { stderr }),
        Some(EXIT_TIMEOUT) => Ok(EngineRun::TimedOut),
        Some(code) => Err(EngineError::UnexpectedExit {
            code,
            conffile: conffile.display().to_string(),
        }),
        None => Err(EngineError::Killed {
            conffile: conffile.display().to_string(),
        }),
    }
}

/// Extract the result record from the engine's stdout
///
/// The engine logs freely; the record is the last line that starts with `{`.
pub fn parse_output(stdout: &str, conffile: &Path) -> Result<EngineOutput, EngineError> {
    let malformed = |reason: String| EngineError::MalformedOutput {
        conffile: conffile.display().to_string(),
        reason,
    };

    let line = stdout
        .lines()
        .map(str::trim)
        .rev()
        .find(|l| l.starts_with('{'))
        .ok_or_else(|| malformed("no JSON object on stdout".to_string()))?;

    serde_json::from_str(line).map_err(|e| malformed(e.to_string()))
}
