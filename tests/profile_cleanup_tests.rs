//! Profile directory cleanup never fails the caller

#![cfg(unix)]

mod common;

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;

use common::{entries_in, init_tracing};
use officeworker_process::{EndpointDescriptor, ProfileDirectory};

fn set_mode(path: &Path, mode: u32) {
    fs::set_permissions(path, fs::Permissions::from_mode(mode)).unwrap();
}

/// Permission bits are not enforced for privileged users
fn permissions_enforced(read_only_dir: &Path) -> bool {
    let probe = read_only_dir.join(".probe");
    match fs::write(&probe, "x") {
        Ok(()) => {
            let _ = fs::remove_file(probe);
            false
        }
        Err(_) => true,
    }
}

#[test]
fn test_undeletable_dir_is_renamed_aside() {
    init_tracing();
    let temp = tempfile::tempdir().unwrap();
    let endpoint = EndpointDescriptor::pipe("office1");
    let dir = ProfileDirectory::derive_path(&endpoint, temp.path(), "product");
    let locked = dir.join("user");
    fs::create_dir_all(&locked).unwrap();
    fs::write(locked.join("registrymodifications.xcu"), "x").unwrap();
    set_mode(&locked, 0o555);

    if !permissions_enforced(&locked) {
        set_mode(&locked, 0o755);
        return;
    }

    ProfileDirectory::cleanup(&dir);

    assert!(!dir.exists());
    let prefix = ".product_pipe_name-office1;urp;.old.";
    let renamed: Vec<String> = entries_in(temp.path())
        .into_iter()
        .filter(|name| name.starts_with(prefix))
        .collect();
    assert_eq!(renamed.len(), 1);
    let suffix = &renamed[0][prefix.len()..];
    assert!(!suffix.is_empty());
    assert!(suffix.chars().all(|c| c.is_ascii_digit()));

    set_mode(&temp.path().join(&renamed[0]).join("user"), 0o755);
}

#[test]
fn test_dir_left_in_place_when_rename_fails() {
    init_tracing();
    let temp = tempfile::tempdir().unwrap();
    let parent = temp.path().join("parent");
    let dir = parent.join(".product_pipe_name-stuck;urp;");
    let locked = dir.join("user");
    fs::create_dir_all(&locked).unwrap();
    fs::write(locked.join("file"), "x").unwrap();
    set_mode(&locked, 0o555);
    set_mode(&parent, 0o555);

    if !permissions_enforced(&parent) {
        set_mode(&parent, 0o755);
        set_mode(&locked, 0o755);
        return;
    }

    ProfileDirectory::cleanup(&dir);

    assert!(dir.exists());
    assert_eq!(entries_in(&parent).len(), 1);

    set_mode(&parent, 0o755);
    set_mode(&locked, 0o755);
}
