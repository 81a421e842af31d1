//! Per-wheel working directory and archive extraction

use std::{
    fs::{self, File},
    io::{self, BufReader},
    path::{Path, PathBuf},
};

use log::{debug, info, warn};
use zip::ZipArchive;

use crate::error::{Error, Result};

/// A scoped guard owning an extraction directory.
///
/// The directory is removed when the guard is dropped, whether the pipeline
/// finished, returned an error, or unwound from a panic. A guard is only
/// handed out for a directory it created itself, so a pre-existing directory
/// with the same name is never deleted.
#[derive(Debug)]
#[must_use = "WorkDir must be held in scope to keep its directory alive"]
pub struct WorkDir {
    path: PathBuf,
}

impl WorkDir {
    /// Create `path`, failing if anything already exists there
    pub fn create(path: PathBuf) -> io::Result<Self> {
        // create_dir_all would silently reuse a leftover directory
        #[allow(clippy::create_dir)]
        fs::create_dir(&path)?;
        debug!("Created working directory {}", path.display());
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for WorkDir {
    fn drop(&mut self) {
        debug!("Removing working directory {}", self.path.display());
        if let Err(err) = fs::remove_dir_all(&self.path) {
            if err.kind() != io::ErrorKind::NotFound {
                warn!(
                    "Failed to remove working directory {}: {err}",
                    self.path.display()
                );
            }
        }
    }
}

/// Unpack `archive` into a fresh `<work_root>/<stem>` directory.
///
/// Entry paths that would escape the directory are rejected by the zip
/// reader, and Unix modes stored in the archive are restored.
pub fn extract(archive: &Path, work_root: &Path, stem: &str) -> Result<WorkDir> {
    let extract_error = |source| Error::Extract {
        archive: archive.to_path_buf(),
        source,
    };

    let file = File::open(archive).map_err(|err| extract_error(err.into()))?;
    let mut zip = ZipArchive::new(BufReader::new(file)).map_err(extract_error)?;

    let target = work_root.join(stem);
    let work_dir = WorkDir::create(target.clone()).map_err(|err| {
        if err.kind() == io::ErrorKind::AlreadyExists {
            Error::WorkDirExists { path: target }
        } else {
            extract_error(err.into())
        }
    })?;

    info!(
        "Extracting {} ({} entries) into {}",
        archive.display(),
        zip.len(),
        work_dir.path().display()
    );
    zip.extract(work_dir.path()).map_err(extract_error)?;

    Ok(work_dir)
}
