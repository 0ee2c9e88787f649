//! Process table queries
//!
//! Workers are identified by their command line: a live process whose name
//! matches the worker pattern and whose argument at a given position
//! contains the endpoint's accept string. The accept string is escaped
//! before being compiled so `.`, `;` and friends match literally.

use std::fmt;

use regex::Regex;
use sysinfo::{ProcessStatus, System};
use tracing::debug;

use crate::error::{ProcessError, Result};

/// Snapshot of one OS process
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessEntry {
    pub pid: u32,
    pub name: String,
    pub args: Vec<String>,
    pub running: bool,
}

/// Source of process snapshots and target of kill signals
pub trait ProcessTable: Send + Sync {
    /// Enumerate processes currently known to the OS
    fn processes(&self) -> Result<Vec<ProcessEntry>>;

    /// Send SIGKILL (signal 9) to `pid`
    fn kill(&self, pid: u32) -> Result<()>;
}

/// Process table backed by the operating system
#[derive(Debug, Default)]
pub struct SystemProcessTable;

impl SystemProcessTable {
    pub fn new() -> Self {
        Self
    }
}

impl ProcessTable for SystemProcessTable {
    fn processes(&self) -> Result<Vec<ProcessEntry>> {
        let mut system = System::new();
        system.refresh_processes();

        Ok(system
            .processes()
            .iter()
            .map(|(pid, process)| ProcessEntry {
                pid: pid.as_u32(),
                name: process.name().to_string(),
                args: process.cmd().to_vec(),
                running: !matches!(
                    process.status(),
                    ProcessStatus::Zombie | ProcessStatus::Dead
                ),
            })
            .collect())
    }

    #[cfg(unix)]
    fn kill(&self, pid: u32) -> Result<()> {
        use nix::sys::signal::{kill, Signal};
        use nix::unistd::Pid;

        let raw = i32::try_from(pid).map_err(|_| ProcessError::KillFailed {
            pid,
            reason: "pid out of range".to_string(),
        })?;
        if raw <= 0 {
            return Err(ProcessError::KillFailed {
                pid,
                reason: "refusing to signal a process group".to_string(),
            });
        }

        kill(Pid::from_raw(raw), Signal::SIGKILL).map_err(|e| ProcessError::KillFailed {
            pid,
            reason: e.to_string(),
        })
    }

    #[cfg(not(unix))]
    fn kill(&self, pid: u32) -> Result<()> {
        let mut system = System::new();
        system.refresh_processes();

        let process = system
            .process(sysinfo::Pid::from_u32(pid))
            .ok_or_else(|| ProcessError::KillFailed {
                pid,
                reason: "no such process".to_string(),
            })?;

        match process.kill_with(sysinfo::Signal::Kill) {
            Some(true) => Ok(()),
            Some(false) => Err(ProcessError::KillFailed {
                pid,
                reason: "signal not delivered".to_string(),
            }),
            None => Err(ProcessError::KillFailed {
                pid,
                reason: "kill signal unsupported on this platform".to_string(),
            }),
        }
    }
}

/// Query selecting running workers bound to one accept string
#[derive(Debug, Clone)]
pub struct ProcessQuery {
    name: Regex,
    arg_index: usize,
    arg: Regex,
}

impl ProcessQuery {
    /// Match processes named like `name_pattern` whose argument at
    /// `arg_index` contains `literal`
    pub fn new(name_pattern: &str, arg_index: usize, literal: &str) -> Result<Self> {
        let name = Regex::new(name_pattern).map_err(|e| {
            ProcessError::InvalidConfig(format!("invalid process name pattern: {}", e))
        })?;
        let arg = Regex::new(&regex::escape(literal)).map_err(|e| {
            ProcessError::InvalidConfig(format!("invalid argument pattern: {}", e))
        })?;
        Ok(Self {
            name,
            arg_index,
            arg,
        })
    }

    pub fn matches(&self, entry: &ProcessEntry) -> bool {
        entry.running
            && self.name.is_match(&entry.name)
            && entry
                .args
                .get(self.arg_index)
                .is_some_and(|arg| self.arg.is_match(arg))
    }
}

impl fmt::Display for ProcessQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "State.Name.re={},Args.{}.re={}",
            self.name.as_str(),
            self.arg_index,
            self.arg.as_str()
        )
    }
}

/// Looks up workers in a process table
pub struct ProcessFinder<'a> {
    table: &'a dyn ProcessTable,
}

impl<'a> ProcessFinder<'a> {
    pub fn new(table: &'a dyn ProcessTable) -> Self {
        Self { table }
    }

    /// The single process matching `query`
    ///
    /// Returns `None` when nothing matches and fails with
    /// [`ProcessError::AmbiguousMatch`] when more than one process does.
    pub fn find_single(&self, query: &ProcessQuery) -> Result<Option<u32>> {
        let matches: Vec<u32> = self
            .table
            .processes()?
            .iter()
            .filter(|entry| query.matches(entry))
            .map(|entry| entry.pid)
            .collect();

        debug!(query = %query, count = matches.len(), "Queried process table");

        match matches.as_slice() {
            [] => Ok(None),
            [pid] => Ok(Some(*pid)),
            _ => Err(ProcessError::AmbiguousMatch {
                query: query.to_string(),
                count: matches.len(),
            }),
        }
    }
}
