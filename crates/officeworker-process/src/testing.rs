//! Scripted process table for exercising launch and shutdown paths
//! without touching real processes

use std::collections::VecDeque;
use std::sync::Mutex;

use crate::{
    error::{ProcessError, Result},
    finder::{ProcessEntry, ProcessTable},
};

/// Process table returning a fixed sequence of snapshots
///
/// Each call to [`ProcessTable::processes`] consumes one snapshot; the last
/// one is repeated once the script runs out. Kills are recorded, not sent.
#[derive(Default)]
pub struct ScriptedProcessTable {
    snapshots: Mutex<VecDeque<Vec<ProcessEntry>>>,
    killed: Mutex<Vec<u32>>,
    fail_kills: bool,
}

impl ScriptedProcessTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a snapshot to the script
    pub fn then(self, snapshot: Vec<ProcessEntry>) -> Self {
        self.snapshots
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(snapshot);
        self
    }

    /// Make every kill fail as if the signal could not be delivered
    pub fn failing_kills(mut self) -> Self {
        self.fail_kills = true;
        self
    }

    /// Pids passed to `kill`, in order
    pub fn killed(&self) -> Vec<u32> {
        self.killed.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Snapshots not yet consumed
    pub fn remaining(&self) -> usize {
        self.snapshots.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

impl ProcessTable for ScriptedProcessTable {
    fn processes(&self) -> Result<Vec<ProcessEntry>> {
        let mut snapshots = self.snapshots.lock().unwrap_or_else(|e| e.into_inner());
        let snapshot = if snapshots.len() > 1 {
            snapshots.pop_front()
        } else {
            snapshots.front().cloned()
        };
        Ok(snapshot.unwrap_or_default())
    }

    fn kill(&self, pid: u32) -> Result<()> {
        self.killed
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(pid);
        if self.fail_kills {
            return Err(ProcessError::KillFailed {
                pid,
                reason: "scripted failure".to_string(),
            });
        }
        Ok(())
    }
}

/// A live office process listening on `accept`
pub fn worker_entry(pid: u32, accept: &str) -> ProcessEntry {
    ProcessEntry {
        pid,
        name: "soffice.bin".to_string(),
        args: vec![
            "/opt/office/program/soffice.bin".to_string(),
            format!("-accept={}", accept),
            "-headless".to_string(),
        ],
        running: true,
    }
}
