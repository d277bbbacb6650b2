use std::future::Future;
use std::path::Path;
use std::process::Stdio;

use tokio::io::AsyncReadExt;
use tokio::process::Command;

use super::error::ExecutionError;
use super::scope::{Expiry, Scope};

/// Runs the staged artifact against one fixture
///
/// Implementations must not return before the subprocess has exited, been
/// killed, or failed to start, and must stop once `scope` expires.
pub trait CaseRunner: Send + Sync {
    fn run(
        &self,
        artifact: &Path,
        fixture: &Path,
        scope: &Scope,
    ) -> impl Future<Output = Result<Vec<u8>, ExecutionError>> + Send;
}

/// Spawns `<interpreter> <artifact> <fixture>` and captures its stdout
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    interpreter: String,
}

impl ProcessRunner {
    pub fn new(interpreter: impl Into<String>) -> Self {
        Self {
            interpreter: interpreter.into(),
        }
    }
}

/// Process group of a spawned submission, killed as a whole when dropped.
///
/// The interpreter is made leader of a fresh group, so everything the
/// submission forks shares the group id and dies with it.
struct ProcessGroup {
    pgid: libc::pid_t,
}

impl ProcessGroup {
    fn kill(&self) {
        // Negative pid addresses the whole group
        let rc = unsafe { libc::kill(-self.pgid, libc::SIGKILL) };
        if rc != 0 {
            let err = std::io::Error::last_os_error();
            if err.raw_os_error() != Some(libc::ESRCH) {
                log::warn!("Failed to kill process group {}: {err}", self.pgid);
            }
        }
    }
}

impl Drop for ProcessGroup {
    fn drop(&mut self) {
        self.kill();
    }
}

impl CaseRunner for ProcessRunner {
    async fn run(
        &self,
        artifact: &Path,
        fixture: &Path,
        scope: &Scope,
    ) -> Result<Vec<u8>, ExecutionError> {
        if let Some(expiry) = scope.check() {
            return Err(expiry.into());
        }

        let mut child = Command::new(&self.interpreter)
            .arg(artifact)
            .arg(fixture)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .process_group(0)
            .kill_on_drop(true)
            .spawn()
            .map_err(ExecutionError::Spawn)?;

        // Leftover background processes are swept on every exit path,
        // including when this future is dropped
        let group = child.id().map(|pid| ProcessGroup {
            pgid: pid as libc::pid_t,
        });

        let Some(mut stdout) = child.stdout.take() else {
            return Err(ExecutionError::Spawn(std::io::Error::other(
                "stdout was not captured",
            )));
        };

        // Read and wait together so a chatty child never blocks on a full pipe.
        // `child` is only borrowed here so it can still be killed afterwards.
        let finish = async {
            let mut buf = Vec::new();
            let (read, status) = tokio::join!(stdout.read_to_end(&mut buf), child.wait());
            read.map_err(ExecutionError::Wait)?;
            let status = status.map_err(ExecutionError::Wait)?;
            Ok::<_, ExecutionError>((status, buf))
        };

        let outcome = tokio::select! {
            res = finish => Ok(res),
            expiry = scope.expired() => Err(expiry),
        };

        match outcome {
            Ok(Ok((status, output))) if status.success() => Ok(output),
            Ok(Ok((status, _))) => Err(ExecutionError::NonZeroExit(status)),
            Ok(Err(e)) => Err(e),
            Err(expiry) => {
                // Group first, while the leader is unreaped and its id stays reserved
                if let Some(group) = &group {
                    group.kill();
                }
                if let Err(e) = child.kill().await {
                    log::warn!("Failed to kill overrunning process: {e}");
                }
                Err(expiry.into())
            }
        }
    }
}

impl From<Expiry> for ExecutionError {
    fn from(expiry: Expiry) -> Self {
        match expiry {
            Expiry::Deadline => Self::Timeout,
            Expiry::Cancelled => Self::Cancelled,
        }
    }
}
