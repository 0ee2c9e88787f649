//! Worker launch
//!
//! Launching is a query-before-act sequence: look for a live worker bound to
//! the same accept string, reclaim or refuse, rebuild the profile
//! directory, spawn, then look the new worker up again to learn its pid.
//! Two launchers racing for one endpoint can both pass the first lookup;
//! callers must hand out endpoints uniquely.

use std::collections::HashMap;
use std::env;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::{
    config::{PathAugmentation, WorkerConfig, WorkerContext},
    error::{ProcessError, Result},
    finder::{ProcessFinder, ProcessQuery, ProcessTable},
    handle::WorkerProcessHandle,
    profile::ProfileDirectory,
};

/// Position of the `-accept=` argument in the worker's command line
const ACCEPT_ARG_INDEX: usize = 1;

/// Flags keeping the worker non-interactive and stateless between runs
pub const SAFETY_FLAGS: [&str; 7] = [
    "-headless",
    "-nocrashreport",
    "-nodefault",
    "-nofirststartwizard",
    "-nolockcheck",
    "-nologo",
    "-norestore",
];

/// Full command line of one worker launch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchCommand {
    argv: Vec<String>,
}

impl LaunchCommand {
    pub fn new(run_as: &[String], executable: &Path, accept: &str, profile_url: &str) -> Self {
        let mut argv = run_as.to_vec();
        argv.push(executable.display().to_string());
        argv.push(format!("-accept={}", accept));
        argv.push(format!("-env:UserInstallation={}", profile_url));
        argv.extend(SAFETY_FLAGS.iter().map(|flag| flag.to_string()));
        Self { argv }
    }

    pub fn program(&self) -> &str {
        &self.argv[0]
    }

    pub fn args(&self) -> &[String] {
        &self.argv[1..]
    }

    pub fn argv(&self) -> &[String] {
        &self.argv
    }
}

/// Platform-specific location of the office executable
pub fn office_executable(office_home: &Path) -> PathBuf {
    if cfg!(target_os = "macos") {
        office_home.join("MacOS").join("soffice")
    } else if cfg!(windows) {
        office_home.join("program").join("soffice.exe")
    } else {
        office_home.join("program").join("soffice")
    }
}

/// Environment for the worker process under `strategy`
///
/// With [`PathAugmentation::BasisAndUre`] the `basis-link` marker in the
/// office home (and the `ure-link` marker it points to) are resolved and the
/// URE `bin` and basis `program` directories are prepended to `PATH`,
/// joined with the platform separator. The existing key is reused whatever
/// its case. Installations without a
/// `basis-link` file are left untouched.
pub fn augment_environment(
    strategy: PathAugmentation,
    office_home: &Path,
    mut env: HashMap<OsString, OsString>,
) -> Result<HashMap<OsString, OsString>> {
    if strategy == PathAugmentation::None {
        return Ok(env);
    }

    let basis_link = office_home.join("basis-link");
    if !basis_link.is_file() {
        debug!(
            office_home = %office_home.display(),
            "No basis-link found; search path left unchanged"
        );
        return Ok(env);
    }

    let basis_home = office_home.join(read_link_file(&basis_link)?);
    let basis_program = basis_home.join("program");
    let ure_home = basis_home.join(read_link_file(&basis_home.join("ure-link"))?);
    let ure_bin = ure_home.join("bin");

    let path_key = env
        .keys()
        .find(|key| key.to_string_lossy().eq_ignore_ascii_case("PATH"))
        .cloned()
        .unwrap_or_else(|| OsString::from("PATH"));

    let mut entries = vec![ure_bin, basis_program];
    if let Some(existing) = env.get(&path_key).filter(|value| !value.is_empty()) {
        entries.extend(env::split_paths(existing));
    }
    let path = env::join_paths(entries)
        .map_err(|e| ProcessError::InvalidConfig(format!("cannot build search path: {}", e)))?;

    debug!(key = ?path_key, value = ?path, "Setting search path");
    env.insert(path_key, path);
    Ok(env)
}

fn read_link_file(path: &Path) -> Result<String> {
    fs::read_to_string(path)
        .map(|text| text.trim().to_string())
        .map_err(|e| {
            ProcessError::InvalidConfig(format!("cannot read {}: {}", path.display(), e))
        })
}

/// Launches one worker against a process table
pub struct ProcessLauncher<'a> {
    config: &'a WorkerConfig,
    context: &'a WorkerContext,
    table: &'a dyn ProcessTable,
}

impl<'a> ProcessLauncher<'a> {
    pub fn new(
        config: &'a WorkerConfig,
        context: &'a WorkerContext,
        table: &'a dyn ProcessTable,
    ) -> Self {
        Self {
            config,
            context,
            table,
        }
    }

    /// Profile directory this launcher uses
    pub fn profile_dir(&self) -> PathBuf {
        ProfileDirectory::derive_path(
            &self.config.endpoint,
            &self.context.temp_dir,
            &self.context.product,
        )
    }

    /// Query matching workers bound to the configured endpoint
    pub fn query(&self) -> Result<ProcessQuery> {
        ProcessQuery::new(
            &self.config.process_name_pattern,
            ACCEPT_ARG_INDEX,
            &self.config.endpoint.accept_string(),
        )
    }

    /// Command line for the configured worker
    pub fn command(&self) -> Result<LaunchCommand> {
        let profile_url = ProfileDirectory::to_url(&self.profile_dir())?;
        Ok(LaunchCommand::new(
            &self.config.run_as_args,
            &office_executable(&self.config.office_home),
            &self.config.endpoint.accept_string(),
            &profile_url,
        ))
    }

    /// Launch the worker and resolve its pid
    pub async fn start(&self) -> Result<WorkerProcessHandle> {
        let accept = self.config.endpoint.accept_string();
        let query = self.query()?;
        let finder = ProcessFinder::new(self.table);
        let profile_dir = self.profile_dir();
        let command = self.command()?;

        let existing = finder.find_single(&query).inspect_err(|e| {
            if let ProcessError::AmbiguousMatch { count, .. } = e {
                warn!(
                    accept = %accept,
                    count = %count,
                    "More than one process with this accept string is running"
                );
            }
        })?;

        if let Some(pid) = existing {
            if !self.config.auto_reclaim {
                return Err(ProcessError::IllegalState(format!(
                    "A process with accept string '{}' is already running; pid {}",
                    accept, pid
                )));
            }
            warn!(pid = %pid, accept = %accept, "Killing existing process bound to endpoint");
            self.table.kill(pid)?;
        }

        ProfileDirectory::prepare(&profile_dir, self.config.template_profile_dir.as_deref())?;

        let env = augment_environment(
            self.config.path_augmentation,
            &self.config.office_home,
            env::vars_os().collect(),
        )?;

        info!(
            accept = %accept,
            profile_dir = %profile_dir.display(),
            "Starting process"
        );

        let child = Command::new(command.program())
            .args(command.args())
            .env_clear()
            .envs(&env)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| {
                ProfileDirectory::cleanup(&profile_dir);
                ProcessError::SpawnFailed(e)
            })?;

        let mut handle =
            WorkerProcessHandle::new(child, None, self.config.endpoint.clone(), profile_dir);

        let pid = match finder.find_single(&query) {
            Ok(pid) => pid,
            Err(e) => {
                handle.abort();
                ProfileDirectory::cleanup(handle.profile_dir());
                return Err(match e {
                    ProcessError::AmbiguousMatch { query, .. } => {
                        ProcessError::LaunchRace { query }
                    }
                    other => other,
                });
            }
        };

        match pid {
            Some(pid) => info!(pid = %pid, accept = %accept, "Started process"),
            None => info!(accept = %accept, "Started process; pid not found"),
        }

        handle.set_pid(pid);
        Ok(handle)
    }
}
