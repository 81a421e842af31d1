//! Writing the transformed tree back into a wheel
//!
//! Output is reproducible: entries are added in file-name order with a fixed
//! timestamp, so packing the same tree twice yields identical bytes.

use std::{
    fs::{self, File},
    io::{self, BufWriter, Write},
    path::Path,
};

use log::{debug, info, warn};
use walkdir::WalkDir;
use zip::{CompressionMethod, DateTime, ZipWriter, write::SimpleFileOptions};

use crate::{
    error::{Error, Result},
    layout::in_scripts_dir,
};

/// Mode recorded for entries when the platform has no Unix permissions
#[cfg(not(unix))]
const DEFAULT_FILE_MODE: u32 = 0o644;

/// Zip entry name for a path relative to the working directory
fn archive_name(relative: &Path) -> String {
    relative
        .iter()
        .map(|component| component.to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(unix)]
fn file_mode(path: &Path) -> io::Result<u32> {
    use std::os::unix::fs::PermissionsExt;

    Ok(fs::metadata(path)?.permissions().mode() & 0o777)
}

#[cfg(not(unix))]
fn file_mode(_path: &Path) -> io::Result<u32> {
    Ok(DEFAULT_FILE_MODE)
}

/// Mode stored in the archive; scripts always carry execute bits
fn entry_mode(path: &Path, relative: &Path) -> io::Result<u32> {
    let mode = file_mode(path)?;
    if in_scripts_dir(relative) && mode & 0o100 == 0 {
        Ok(mode | 0o111)
    } else {
        Ok(mode)
    }
}

fn entry_options(mode: u32) -> SimpleFileOptions {
    SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(DateTime::default())
        .unix_permissions(mode)
}

/// Zip every file below `root` into `destination`, replacing any existing file.
///
/// Entry names are relative to `root`. Returns the entry names in the order
/// they were written. An interrupted write can leave a truncated file behind.
pub fn pack(root: &Path, destination: &Path) -> Result<Vec<String>> {
    let pack_error = |source: io::Error| Error::pack(destination, source);

    if let Some(parent) = destination.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(pack_error)?;
    }
    if destination.is_file() {
        debug!("Deleting {}", destination.display());
        fs::remove_file(destination).map_err(pack_error)?;
    }

    info!("Creating {}", destination.display());
    let file = File::create(destination).map_err(pack_error)?;
    let mut writer = ZipWriter::new(BufWriter::new(file));

    let mut names = Vec::new();
    for entry in WalkDir::new(root).min_depth(1).sort_by_file_name() {
        let entry = entry.map_err(|err| pack_error(err.into()))?;
        if !entry.file_type().is_file() {
            if !entry.file_type().is_dir() {
                warn!("Skipping {}: not a regular file", entry.path().display());
            }
            continue;
        }
        let path = entry.path();
        let relative = path
            .strip_prefix(root)
            .map_err(|_| pack_error(io::Error::other("entry outside working directory")))?;
        let name = archive_name(relative);
        let options = entry_options(entry_mode(path, relative).map_err(pack_error)?);

        debug!("Adding {} -> {name}", path.display());
        writer
            .start_file(name.as_str(), options)
            .map_err(|err| Error::pack(destination, err))?;
        let mut source = File::open(path).map_err(pack_error)?;
        io::copy(&mut source, &mut writer).map_err(pack_error)?;
        names.push(name);
    }

    let mut inner = writer
        .finish()
        .map_err(|err| Error::pack(destination, err))?;
    inner.flush().map_err(pack_error)?;

    info!("Wrote {} entries to {}", names.len(), destination.display());
    Ok(names)
}
