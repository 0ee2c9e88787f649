//! Handle to a launched worker

use std::path::{Path, PathBuf};
use std::process::ExitStatus;

use tokio::process::Child;
use tracing::error;

use crate::endpoint::EndpointDescriptor;

/// A running (or exited) worker and the resources tied to it
///
/// `pid` is the OS process id found in the process table after launch. It
/// can stay `None` when the lookup matched nothing, in which case signal
/// based operations are refused.
pub struct WorkerProcessHandle {
    /// Underlying tokio child process
    child: Child,
    /// Process id resolved from the process table
    pid: Option<u32>,
    endpoint: EndpointDescriptor,
    profile_dir: PathBuf,
}

impl WorkerProcessHandle {
    pub(crate) fn new(
        child: Child,
        pid: Option<u32>,
        endpoint: EndpointDescriptor,
        profile_dir: PathBuf,
    ) -> Self {
        Self {
            child,
            pid,
            endpoint,
            profile_dir,
        }
    }

    /// Resolved process id
    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    pub(crate) fn set_pid(&mut self, pid: Option<u32>) {
        self.pid = pid;
    }

    /// Id of the directly spawned child (may be a run-as wrapper)
    pub fn child_id(&self) -> Option<u32> {
        self.child.id()
    }

    pub fn endpoint(&self) -> &EndpointDescriptor {
        &self.endpoint
    }

    pub fn profile_dir(&self) -> &Path {
        &self.profile_dir
    }

    /// Check if process is still running
    pub fn is_running(&mut self) -> bool {
        match self.child.try_wait() {
            Ok(Some(_)) => false,
            Ok(None) => true,
            Err(e) => {
                error!(pid = ?self.pid, error = %e, "Error checking process status");
                false
            }
        }
    }

    /// Exit code if the process has exited, without blocking
    pub fn try_exit_code(&mut self) -> std::io::Result<Option<i32>> {
        Ok(self.child.try_wait()?.map(exit_code))
    }

    /// Best-effort kill of the spawned child, used when launch is aborted
    pub(crate) fn abort(&mut self) {
        if let Err(e) = self.child.start_kill() {
            error!(child = ?self.child.id(), error = %e, "Failed to kill aborted child");
        }
    }
}

/// Exit code with signal terminations reported as `128 + signal`
fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }

    -1
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::process::Stdio;
    use std::time::Duration;
    use tokio::process::Command;

    #[cfg(unix)]
    fn spawn(script: &str) -> WorkerProcessHandle {
        let child = Command::new("/bin/sh")
            .args(["-c", script])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .unwrap();
        WorkerProcessHandle::new(
            child,
            None,
            EndpointDescriptor::pipe("test"),
            PathBuf::from("/tmp/.test_pipe_name-test;urp;"),
        )
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_exit_code_reported() {
        let mut handle = spawn("exit 3");
        let mut code = None;
        for _ in 0..100 {
            code = handle.try_exit_code().unwrap();
            if code.is_some() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert_eq!(code, Some(3));
        assert!(!handle.is_running());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_signal_exit_code() {
        let mut handle = spawn("sleep 10");
        assert!(handle.is_running());
        handle.abort();

        let mut code = None;
        for _ in 0..100 {
            code = handle.try_exit_code().unwrap();
            if code.is_some() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert_eq!(code, Some(137));
    }
}
