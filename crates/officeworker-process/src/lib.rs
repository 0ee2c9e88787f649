//! # officeworker-process
//!
//! **Purpose**: Lifecycle management for office-suite conversion workers
//!
//! Launches an office process listening on a unique endpoint, gives it a
//! private profile directory, detects instances already bound to that
//! endpoint, and terminates hung instances with bounded exit polling.
//!
//! ## Features
//!
//! - **Endpoint Identity**: Canonical accept strings shared by launch and lookup
//! - **Profile Directories**: Per-endpoint `UserInstallation` dirs with template copy
//! - **Process Lookup**: Process-table queries with explicit ambiguity errors
//! - **Collision Handling**: Refuse or reclaim endpoints held by another worker
//! - **Bounded Polling**: Interval/timeout retries with a distinct timeout error
//! - **Forced Termination**: SIGKILL plus exit-code confirmation
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use officeworker_process::{EndpointDescriptor, ProcessSupervisor, WorkerConfig, WorkerContext};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = WorkerConfig::new("/usr/lib/libreoffice", EndpointDescriptor::pipe("office1"))
//!     .auto_reclaim(true);
//!
//! let mut supervisor = ProcessSupervisor::new(config, WorkerContext::default());
//! supervisor.start().await?;
//!
//! // ... hand the endpoint to a URP client ...
//!
//! let code = supervisor
//!     .forcibly_terminate(Duration::from_millis(250), Duration::from_secs(30))
//!     .await?;
//! println!("worker exited with {}", code);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod endpoint;
pub mod error;
pub mod finder;
pub mod handle;
pub mod launcher;
pub mod profile;
pub mod retry;
pub mod supervisor;
#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use config::{PathAugmentation, WorkerConfig, WorkerContext};
pub use endpoint::EndpointDescriptor;
pub use error::{ProcessError, Result};
pub use finder::{ProcessEntry, ProcessFinder, ProcessQuery, ProcessTable, SystemProcessTable};
pub use handle::WorkerProcessHandle;
pub use launcher::{augment_environment, office_executable, LaunchCommand, ProcessLauncher};
pub use profile::ProfileDirectory;
pub use retry::{AttemptError, RetryPolicy};
pub use supervisor::ProcessSupervisor;
