//! Shared fixtures for worker lifecycle tests

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use officeworker_process::{EndpointDescriptor, PathAugmentation, WorkerConfig, WorkerContext};
use tempfile::TempDir;

/// Install a test subscriber once per binary
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

/// Throwaway office installation whose `soffice` is a shell script run
/// through `/bin/sh`
///
/// The script records its arguments to `args.txt` and then runs `body`,
/// which can refer to the fixture directory as `$root`.
pub struct FakeOffice {
    pub root: TempDir,
}

impl FakeOffice {
    pub fn new(body: &str) -> Self {
        let root = tempfile::tempdir().unwrap();
        let office_home = root.path().join("office");
        fs::create_dir_all(office_home.join("program")).unwrap();
        fs::create_dir_all(root.path().join("tmp")).unwrap();

        let script = format!(
            "root='{}'\nprintf '%s\\n' \"$@\" > \"$root/args.txt\"\n{}\n",
            root.path().display(),
            body
        );
        fs::write(office_home.join("program").join("soffice"), script).unwrap();

        Self { root }
    }

    pub fn office_home(&self) -> PathBuf {
        self.root.path().join("office")
    }

    pub fn temp_dir(&self) -> PathBuf {
        self.root.path().join("tmp")
    }

    pub fn context(&self) -> WorkerContext {
        WorkerContext::new(self.temp_dir(), "product")
    }

    pub fn config(&self, endpoint: EndpointDescriptor) -> WorkerConfig {
        WorkerConfig::new(self.office_home(), endpoint)
            .run_as(["/bin/sh"])
            .path_augmentation(PathAugmentation::None)
    }

    /// Arguments the script was started with, once it has written them
    pub async fn recorded_args(&self) -> Option<Vec<String>> {
        let path = self.root.path().join("args.txt");
        for _ in 0..100 {
            if let Ok(text) = fs::read_to_string(&path) {
                if !text.is_empty() {
                    return Some(text.lines().map(str::to_string).collect());
                }
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        None
    }

    /// Path of a file inside the fixture directory
    pub fn path(&self, name: &str) -> PathBuf {
        self.root.path().join(name)
    }

    /// Whether the script ever ran
    pub async fn was_spawned(&self) -> bool {
        tokio::time::sleep(Duration::from_millis(200)).await;
        self.root.path().join("args.txt").exists()
    }
}

pub fn entries_in(dir: &Path) -> Vec<String> {
    fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(|entry| entry.ok())
                .map(|entry| entry.file_name().to_string_lossy().to_string())
                .collect()
        })
        .unwrap_or_default()
}
