//! Process supervisor - lifecycle orchestration for one worker

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use crate::{
    config::{WorkerConfig, WorkerContext},
    error::{ProcessError, Result},
    finder::{ProcessTable, SystemProcessTable},
    handle::WorkerProcessHandle,
    launcher::ProcessLauncher,
    profile::ProfileDirectory,
    retry::{AttemptError, RetryPolicy},
};

/// Owns the lifecycle of exactly one office worker
///
/// Start and stop calls must be serialized by the caller; the `&mut self`
/// receivers enforce that for a single owner.
pub struct ProcessSupervisor {
    config: WorkerConfig,
    context: WorkerContext,
    table: Arc<dyn ProcessTable>,
    handle: Option<WorkerProcessHandle>,
}

impl ProcessSupervisor {
    /// Create a supervisor using the OS process table
    pub fn new(config: WorkerConfig, context: WorkerContext) -> Self {
        Self::with_process_table(config, context, Arc::new(SystemProcessTable::new()))
    }

    /// Create a supervisor using a custom process table
    pub fn with_process_table(
        config: WorkerConfig,
        context: WorkerContext,
        table: Arc<dyn ProcessTable>,
    ) -> Self {
        Self {
            config,
            context,
            table,
            handle: None,
        }
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    /// Profile directory derived for the configured endpoint
    pub fn profile_dir(&self) -> PathBuf {
        ProfileDirectory::derive_path(
            &self.config.endpoint,
            &self.context.temp_dir,
            &self.context.product,
        )
    }

    /// Current worker, if started
    pub fn handle(&self) -> Option<&WorkerProcessHandle> {
        self.handle.as_ref()
    }

    /// Resolved pid of the current worker
    pub fn pid(&self) -> Option<u32> {
        self.handle.as_ref().and_then(WorkerProcessHandle::pid)
    }

    /// Launch the worker
    ///
    /// On failure no handle is kept.
    pub async fn start(&mut self) -> Result<()> {
        if let Some(handle) = self.handle.as_mut() {
            if handle.is_running() {
                return Err(ProcessError::IllegalState(format!(
                    "Process with accept string '{}' already started",
                    self.config.endpoint
                )));
            }
            self.handle = None;
        }

        let launcher = ProcessLauncher::new(&self.config, &self.context, self.table.as_ref());
        self.handle = Some(launcher.start().await?);
        Ok(())
    }

    /// Whether the worker has been started and not yet exited
    pub fn is_running(&mut self) -> bool {
        self.handle
            .as_mut()
            .is_some_and(WorkerProcessHandle::is_running)
    }

    /// Wait for the worker's exit code
    ///
    /// Fails with [`ProcessError::RetryTimeout`] if the worker is still
    /// alive after `timeout`; any other failure is reported as
    /// [`ProcessError::OfficeProcess`].
    pub async fn exit_code(&mut self, interval: Duration, timeout: Duration) -> Result<i32> {
        let handle = self
            .handle
            .as_mut()
            .ok_or_else(|| ProcessError::OfficeProcess("process not started".to_string()))?;

        RetryPolicy::new(interval, timeout)
            .execute(|| match handle.try_exit_code() {
                Ok(Some(code)) => Ok(code),
                Ok(None) => Err(AttemptError::Temporary),
                Err(e) => Err(AttemptError::Fatal(ProcessError::OfficeProcess(
                    e.to_string(),
                ))),
            })
            .await
            .map_err(|e| match e {
                ProcessError::RetryTimeout { .. } | ProcessError::OfficeProcess(_) => e,
                other => ProcessError::OfficeProcess(other.to_string()),
            })
    }

    /// Wait for the exit code using the configured poll settings
    pub async fn wait_for_exit(&mut self) -> Result<i32> {
        let interval = self.config.retry_interval_duration();
        let timeout = self.config.retry_timeout_duration();
        self.exit_code(interval, timeout).await
    }

    /// Kill the worker with SIGKILL and wait for it to exit
    ///
    /// A worker that already exited is not signalled, since its pid may
    /// have been reused. Otherwise a resolved pid is required; without one
    /// nothing is signalled. On success the handle and the profile
    /// directory are released.
    pub async fn forcibly_terminate(&mut self, interval: Duration, timeout: Duration) -> Result<i32> {
        let pid = self.pid();
        info!(
            accept = %self.config.endpoint,
            pid = ?pid,
            "Trying to forcibly terminate process"
        );

        let exited = match self.handle.as_mut() {
            Some(handle) => handle
                .try_exit_code()
                .map_err(|e| ProcessError::OfficeProcess(e.to_string()))?,
            None => None,
        };
        if let Some(code) = exited {
            info!(pid = ?pid, exit_code = code, "Process already exited");
            self.release();
            return Ok(code);
        }

        let pid = pid.ok_or_else(|| ProcessError::PidUnresolved {
            accept: self.config.endpoint.accept_string(),
        })?;

        self.table.kill(pid)?;
        let code = self.exit_code(interval, timeout).await?;
        info!(pid = %pid, exit_code = code, "Process terminated");

        self.release();
        Ok(code)
    }

    /// Drop the handle and delete the profile directory
    ///
    /// Intended for after the worker exited; cleanup failures are logged
    /// and absorbed.
    pub fn release(&mut self) {
        let profile_dir = match self.handle.take() {
            Some(handle) => handle.profile_dir().to_path_buf(),
            None => self.profile_dir(),
        };
        debug!(profile_dir = %profile_dir.display(), "Releasing worker resources");
        ProfileDirectory::cleanup(&profile_dir);
    }
}
