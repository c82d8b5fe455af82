//! Single-attempt execution of the workload under test.
//!
//! A [`ProcessLauncher`] turns one `(executable, workers, timeout)` request into
//! exactly one [`RunOutcome`]. Nothing here retries; the aggregator decides how
//! many attempts a configuration gets.

use std::io::{self, Read};
use std::path::Path;
use std::process::{Child, ChildStderr, Command, ExitStatus, Stdio};
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::config::{EXECUTABLE_PLACEHOLDER, HarnessConfig, WORKERS_PLACEHOLDER};

const POLL_INTERVAL: Duration = Duration::from_millis(5);
/// How long to wait for the stderr reader after the process group is gone.
const STDERR_GRACE: Duration = Duration::from_secs(2);
const MAX_STDERR_BYTES: u64 = 64 * 1024;

/// Result of one execution attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    /// Exit status 0 within the deadline.
    Success { elapsed_secs: f64 },
    /// The deadline passed; the process tree was killed.
    Timeout { limit: Duration },
    /// Nonzero exit (or death by signal, `exit_code == None`).
    ProcessFailure { exit_code: Option<i32>, stderr: String },
    /// The launcher could not be started at all.
    LaunchError { cause: String },
}

impl RunOutcome {
    pub fn elapsed_secs(&self) -> Option<f64> {
        match self {
            RunOutcome::Success { elapsed_secs } => Some(*elapsed_secs),
            _ => None,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, RunOutcome::Success { .. })
    }
}

/// Capability to run the workload once with a given worker count.
pub trait ProcessLauncher {
    fn launch(&mut self, executable: &Path, workers: usize, timeout: Duration) -> RunOutcome;
}

impl<L: ProcessLauncher + ?Sized> ProcessLauncher for &mut L {
    fn launch(&mut self, executable: &Path, workers: usize, timeout: Duration) -> RunOutcome {
        (**self).launch(executable, workers, timeout)
    }
}

impl<L: ProcessLauncher + ?Sized> ProcessLauncher for Box<L> {
    fn launch(&mut self, executable: &Path, workers: usize, timeout: Duration) -> RunOutcome {
        (**self).launch(executable, workers, timeout)
    }
}

/// Launches the workload through an external parallel launcher such as `mpirun`.
///
/// Arguments are a template: `{workers}` and `{executable}` are substituted on
/// every launch, so `["-np", "{workers}", "{executable}"]` becomes
/// `mpirun -np 4 ./workload`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLauncher {
    program: String,
    args: Vec<String>,
}

impl Default for CommandLauncher {
    fn default() -> Self {
        Self::from_config(&HarnessConfig::default())
    }
}

impl CommandLauncher {
    pub fn new(program: impl Into<String>, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    pub fn from_config(config: &HarnessConfig) -> Self {
        Self::new(config.launcher.clone(), config.launcher_args.iter().cloned())
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Launcher arguments with placeholders expanded for one attempt.
    pub fn expand_args(&self, executable: &Path, workers: usize) -> Vec<String> {
        let workers = workers.to_string();
        let executable = executable.to_string_lossy();
        self.args
            .iter()
            .map(|arg| {
                arg.replace(WORKERS_PLACEHOLDER, &workers)
                    .replace(EXECUTABLE_PLACEHOLDER, &executable)
            })
            .collect()
    }
}

impl ProcessLauncher for CommandLauncher {
    fn launch(&mut self, executable: &Path, workers: usize, timeout: Duration) -> RunOutcome {
        let args = self.expand_args(executable, workers);
        debug!(program = %self.program, ?args, ?timeout, "launching workload");

        let mut command = Command::new(&self.program);
        command
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());
        isolate_process_group(&mut command);

        let started = Instant::now();
        let child = match command.spawn() {
            Ok(child) => child,
            Err(err) => {
                return RunOutcome::LaunchError {
                    cause: format!("failed to spawn `{}`: {}", self.program, err),
                };
            }
        };

        let mut tree = ProcessTree::new(child);
        let stderr = tree.take_stderr().map(spawn_stderr_reader);

        match tree.wait_until(started + timeout) {
            Ok(true) => {
                let elapsed_secs = started.elapsed().as_secs_f64();
                match tree.terminate() {
                    Ok(status) => classify_exit(status, elapsed_secs, stderr),
                    Err(err) => wait_failure(&self.program, err),
                }
            }
            Ok(false) => {
                let _ = tree.terminate();
                RunOutcome::Timeout { limit: timeout }
            }
            Err(err) => {
                let _ = tree.terminate();
                wait_failure(&self.program, err)
            }
        }
    }
}

fn wait_failure(program: &str, err: io::Error) -> RunOutcome {
    RunOutcome::ProcessFailure {
        exit_code: None,
        stderr: format!("failed to wait for `{}`: {}", program, err),
    }
}

fn classify_exit(status: ExitStatus, elapsed_secs: f64, stderr: Option<mpsc::Receiver<String>>) -> RunOutcome {
    if status.success() {
        RunOutcome::Success { elapsed_secs }
    } else {
        RunOutcome::ProcessFailure {
            exit_code: status.code(),
            stderr: collect_stderr(stderr),
        }
    }
}

#[cfg(unix)]
fn isolate_process_group(command: &mut Command) {
    use std::os::unix::process::CommandExt;
    command.process_group(0);
}

#[cfg(not(unix))]
fn isolate_process_group(_command: &mut Command) {}

/// Owns the spawned launcher and, on unix, the process group it leads.
///
/// On Linux the leader is only observed (`WNOWAIT`) until the group has been
/// killed, so its zombie keeps the group id reserved while `killpg` runs.
/// Elsewhere the leader is reaped first and a recycled group id is an
/// accepted race. Dropping an unreaped tree kills it.
struct ProcessTree {
    child: Child,
    status: Option<ExitStatus>,
}

impl ProcessTree {
    fn new(child: Child) -> Self {
        Self { child, status: None }
    }

    fn take_stderr(&mut self) -> Option<ChildStderr> {
        self.child.stderr.take()
    }

    #[cfg(target_os = "linux")]
    fn leader_exited(&mut self) -> io::Result<bool> {
        let mut info: libc::siginfo_t = unsafe { std::mem::zeroed() };
        let rc = unsafe {
            libc::waitid(
                libc::P_PID,
                self.child.id() as libc::id_t,
                &mut info,
                libc::WEXITED | libc::WNOHANG | libc::WNOWAIT,
            )
        };
        if rc == -1 {
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::Interrupted {
                return Ok(false);
            }
            return Err(err);
        }
        // si_pid stays zero while the leader is still running.
        Ok(unsafe { info.si_pid() } != 0)
    }

    #[cfg(not(target_os = "linux"))]
    fn leader_exited(&mut self) -> io::Result<bool> {
        if self.status.is_none() {
            self.status = self.child.try_wait()?;
        }
        Ok(self.status.is_some())
    }

    /// `Ok(false)` means the deadline passed with the leader still running.
    fn wait_until(&mut self, deadline: Instant) -> io::Result<bool> {
        loop {
            if self.leader_exited()? {
                return Ok(true);
            }
            let now = Instant::now();
            if now >= deadline {
                return Ok(false);
            }
            thread::sleep(POLL_INTERVAL.min(deadline - now));
        }
    }

    /// Kill every member of the group, then reap the leader.
    fn terminate(&mut self) -> io::Result<ExitStatus> {
        #[cfg(unix)]
        {
            let pgid = self.child.id() as libc::pid_t;
            // ESRCH when the group is already empty; nothing to do then.
            unsafe {
                libc::killpg(pgid, libc::SIGKILL);
            }
        }
        #[cfg(not(unix))]
        if self.status.is_none() {
            let _ = self.child.kill();
        }
        match self.status {
            Some(status) => Ok(status),
            None => {
                let status = self.child.wait()?;
                self.status = Some(status);
                Ok(status)
            }
        }
    }
}

impl Drop for ProcessTree {
    fn drop(&mut self) {
        if self.status.is_none() {
            let _ = self.terminate();
        }
    }
}

fn spawn_stderr_reader(stderr: ChildStderr) -> mpsc::Receiver<String> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let mut buf = Vec::new();
        let mut limited = stderr.take(MAX_STDERR_BYTES);
        let _ = limited.read_to_end(&mut buf);
        // Keep draining past the cap so the writer never blocks on a full pipe.
        let _ = io::copy(&mut limited.into_inner(), &mut io::sink());
        let _ = tx.send(String::from_utf8_lossy(&buf).into_owned());
    });
    rx
}

fn collect_stderr(rx: Option<mpsc::Receiver<String>>) -> String {
    rx.and_then(|rx| rx.recv_timeout(STDERR_GRACE).ok())
        .map(|text| text.trim().to_string())
        .unwrap_or_default()
}
