use nix::sys::resource::{setrlimit, Resource};
use nix::sys::signal::{killpg, Signal};
use nix::unistd::{setsid, Pid};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Instant;
use tokio::process::Command;
use tokio::time::{self, Duration};
use tracing::debug;

use crate::{error::Error, types::ResourceLimits};

/// Captured output of a child process that ran to completion
#[derive(Debug)]
pub struct ProcessOutput {
    pub status: std::process::ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.status.success()
    }
}

/// Outcome of one child process invocation
#[derive(Debug)]
pub enum RunOutcome {
    Completed(ProcessOutput),
    TimedOut,
}

impl RunOutcome {
    /// Unwrap the completed output, mapping a deadline expiry to
    /// `Error::Timeout` carrying the configured limit
    pub fn into_output(self, timeout: Duration) -> Result<ProcessOutput, Error> {
        match self {
            RunOutcome::Completed(output) => Ok(output),
            RunOutcome::TimedOut => Err(Error::Timeout(timeout.as_secs())),
        }
    }
}

/// Runs one child process per call under a wall-clock deadline, with a
/// cleared environment and rlimit ceilings applied between fork and exec.
pub struct ProcessRunner {
    limits: ResourceLimits,
}

impl ProcessRunner {
    pub fn new(limits: ResourceLimits) -> Self {
        Self { limits }
    }

    /// A runner with the address-space ceiling lifted. The JVM reserves far
    /// more address space than it ever touches, so its memory is bounded with
    /// `-Xmx` instead of RLIMIT_AS.
    pub fn without_memory_limit(&self) -> Self {
        Self {
            limits: ResourceLimits {
                memory: u64::MAX,
                ..self.limits.clone()
            },
        }
    }

    pub async fn run(
        &self,
        program: &str,
        args: &[&str],
        cwd: Option<&Path>,
        timeout: Duration,
    ) -> Result<RunOutcome, Error> {
        let program_path = resolve_program(program)?;

        debug!(
            "Running {} {:?} (timeout: {}s)",
            program_path.display(),
            args,
            timeout.as_secs()
        );

        let mut command = Command::new(&program_path);
        command
            .args(args)
            .env_clear()
            .env("PATH", "/usr/bin:/bin:/usr/sbin:/sbin")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        if let Some(dir) = cwd {
            command.current_dir(dir);
        }

        // Stack copies for the post-fork closure
        let memory = self.limits.memory;
        let file_size = self.limits.file_size;
        let cpu_time = timeout.as_secs().saturating_add(1);

        unsafe {
            command.pre_exec(move || {
                // Own session and process group, so deadline expiry can take
                // down descendants along with the direct child
                if let Err(e) = setsid() {
                    return Err(std::io::Error::new(
                        std::io::ErrorKind::Other,
                        format!("Failed to create session: {}", e),
                    ));
                }
                apply_rlimits(cpu_time, memory, file_size)
            });
        }

        let start = Instant::now();
        let child = command
            .spawn()
            .map_err(|e| Error::Process(format!("Failed to spawn {}: {}", program, e)))?;
        let child_id = child.id();

        match time::timeout(timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => {
                debug!(
                    "Process exited with {} after {}ms",
                    output.status,
                    start.elapsed().as_millis()
                );

                #[cfg(unix)]
                {
                    use std::os::unix::process::ExitStatusExt;
                    // SIGKILL or SIGXCPU means the CPU ceiling fired before
                    // the wall clock did; report it as a timeout
                    if let Some(signal) = output.status.signal() {
                        if signal == 9 || signal == 24 {
                            return Ok(RunOutcome::TimedOut);
                        }
                    }
                }

                Ok(RunOutcome::Completed(ProcessOutput {
                    status: output.status,
                    stdout: String::from_utf8_lossy(&output.stdout).to_string(),
                    stderr: String::from_utf8_lossy(&output.stderr).to_string(),
                }))
            }
            Ok(Err(e)) => Err(Error::Process(format!("Failed to wait for process: {}", e))),
            Err(_) => {
                // Dropping the wait future drops the child, and kill_on_drop
                // takes it down with SIGKILL; the group kill reaches anything
                // the child spawned inside its session
                if let Some(pid) = child_id {
                    let _ = killpg(Pid::from_raw(pid as i32), Signal::SIGKILL);
                }
                debug!(
                    "Process exceeded {}s deadline and was killed",
                    timeout.as_secs()
                );
                Ok(RunOutcome::TimedOut)
            }
        }
    }
}

fn resolve_program(program: &str) -> Result<PathBuf, Error> {
    if Path::new(program).is_absolute() {
        Ok(PathBuf::from(program))
    } else {
        which::which(program).map_err(|_| Error::Process(format!("Command not found: {}", program)))
    }
}

fn apply_rlimits(cpu_time: u64, memory: u64, file_size: u64) -> std::io::Result<()> {
    #[cfg(target_os = "linux")]
    {
        if let Err(e) = setrlimit(Resource::RLIMIT_CPU, cpu_time, cpu_time) {
            return Err(std::io::Error::new(
                std::io::ErrorKind::Other,
                format!("Failed to set CPU time limit: {}", e),
            ));
        }
        if let Err(e) = setrlimit(Resource::RLIMIT_FSIZE, file_size, file_size) {
            return Err(std::io::Error::new(
                std::io::ErrorKind::Other,
                format!("Failed to set file size limit: {}", e),
            ));
        }
        // u64::MAX means uncapped address space
        if memory != u64::MAX {
            if let Err(e) = setrlimit(Resource::RLIMIT_AS, memory, memory) {
                return Err(std::io::Error::new(
                    std::io::ErrorKind::Other,
                    format!("Failed to set memory limit: {}", e),
                ));
            }
        }
    }

    #[cfg(target_os = "macos")]
    {
        let _ = (memory, file_size);
        if let Err(e) = setrlimit(Resource::RLIMIT_CPU, cpu_time, cpu_time) {
            return Err(std::io::Error::new(
                std::io::ErrorKind::Other,
                format!("Failed to set CPU time limit: {}", e),
            ));
        }
    }

    Ok(())
}
