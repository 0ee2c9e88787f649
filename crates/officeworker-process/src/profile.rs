//! Per-worker profile directories
//!
//! Each worker gets a private `UserInstallation` directory derived from its
//! accept string. The directory is recreated on every launch and removed on
//! shutdown; removal is best effort and falls back to renaming the
//! directory aside so a stuck file never blocks the shutdown sequence.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, error, warn};
use url::Url;
use walkdir::WalkDir;

use crate::{
    endpoint::EndpointDescriptor,
    error::{ProcessError, Result},
};

/// Profile directory management
pub struct ProfileDirectory;

impl ProfileDirectory {
    /// Deterministic profile directory for an endpoint:
    /// `<temp_dir>/.<product>_<accept string>` with `,` replaced by `_`
    /// and `=` by `-`
    pub fn derive_path(endpoint: &EndpointDescriptor, temp_dir: &Path, product: &str) -> PathBuf {
        let sanitized = endpoint.accept_string().replace(',', "_").replace('=', "-");
        temp_dir.join(format!(".{}_{}", product, sanitized))
    }

    /// Make `path` ready for a fresh launch
    ///
    /// A leftover directory from a previous run is removed first. When a
    /// template is given it is copied recursively into `path`.
    pub fn prepare(path: &Path, template: Option<&Path>) -> Result<()> {
        if path.exists() {
            warn!(path = %path.display(), "Profile dir already exists; deleting");
            Self::cleanup(path);
        }

        if let Some(template) = template {
            debug!(
                template = %template.display(),
                path = %path.display(),
                "Copying template profile"
            );
            copy_dir_recursive(template, path).map_err(|source| ProcessError::ProfileSetup {
                path: path.to_path_buf(),
                source,
            })?;
        }

        Ok(())
    }

    /// Remove `path`, never failing
    ///
    /// On delete failure the directory is renamed to
    /// `<path>.old.<unix millis>`; if that fails too it is left in place.
    pub fn cleanup(path: &Path) {
        Self::cleanup_with(
            path,
            |path: &Path| fs::remove_dir_all(path),
            |from: &Path, to: &Path| fs::rename(from, to),
        );
    }

    pub(crate) fn cleanup_with<D, R>(path: &Path, delete: D, rename: R)
    where
        D: FnOnce(&Path) -> io::Result<()>,
        R: FnOnce(&Path, &Path) -> io::Result<()>,
    {
        if !path.exists() {
            return;
        }

        let err = match delete(path) {
            Ok(()) => {
                debug!(path = %path.display(), "Deleted profile dir");
                return;
            }
            Err(e) => e,
        };

        let aside = Self::aside_path(path, chrono::Utc::now().timestamp_millis());
        match rename(path, &aside) {
            Ok(()) => warn!(
                path = %path.display(),
                renamed = %aside.display(),
                error = %err,
                "Could not delete profile dir; renamed it"
            ),
            Err(rename_err) => error!(
                path = %path.display(),
                error = %err,
                rename_error = %rename_err,
                "Could not delete profile dir"
            ),
        }
    }

    /// `file://` URL of the profile directory, without trailing slash
    pub fn to_url(path: &Path) -> Result<String> {
        let url = Url::from_file_path(path).map_err(|_| {
            ProcessError::InvalidConfig(format!(
                "profile dir must be an absolute path: {}",
                path.display()
            ))
        })?;
        Ok(url.as_str().trim_end_matches('/').to_string())
    }

    fn aside_path(path: &Path, millis: i64) -> PathBuf {
        let mut name = path.file_name().unwrap_or_default().to_os_string();
        name.push(format!(".old.{}", millis));
        path.with_file_name(name)
    }
}

fn copy_dir_recursive(from: &Path, to: &Path) -> io::Result<()> {
    if !from.is_dir() {
        return Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!("template profile dir not found: {}", from.display()),
        ));
    }

    for entry in WalkDir::new(from) {
        let entry = entry.map_err(io::Error::from)?;
        let relative = entry
            .path()
            .strip_prefix(from)
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
        let target = to.join(relative);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)?;
        } else {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(entry.path(), &target)?;
        }
    }

    Ok(())
}
