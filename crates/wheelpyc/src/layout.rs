//! Naming conventions of an unpacked wheel tree
//!
//! A scripts directory is recognized by its exact name, `scripts`, not by a
//! name merely ending in `scripts`: `myscripts/` or `tests_scripts/` hold
//! ordinary package code and are compiled like the rest of the tree. The
//! `compileall -x` exclusion uses the same exact-component rule.

use std::{ffi::OsStr, path::Path};

use cow_utils::CowUtils;

/// Directory holding cached bytecode next to sources
pub const CACHE_DIR_NAME: &str = "__pycache__";

/// Directory holding executable entry points, as in `<dist>.data/scripts`
pub const SCRIPTS_DIR_NAME: &str = "scripts";

pub const SOURCE_EXTENSION: &str = "py";

pub const BYTECODE_EXTENSIONS: &[&str] = &["pyc", "pyo"];

/// Extension used for compiled artifacts placed beside their source
pub const LEGACY_BYTECODE_EXTENSION: &str = "pyc";

pub fn is_cache_dir(name: &OsStr) -> bool {
    name == CACHE_DIR_NAME
}

pub fn is_scripts_dir(name: &OsStr) -> bool {
    name == SCRIPTS_DIR_NAME
}

/// Whether any component of `relative` is a scripts directory
pub fn in_scripts_dir(relative: &Path) -> bool {
    relative
        .parent()
        .is_some_and(|parent| parent.iter().any(is_scripts_dir))
}

fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(OsStr::to_str)
        .is_some_and(|ext| extensions.contains(&&*ext.cow_to_ascii_lowercase()))
}

pub fn is_source_file(path: &Path) -> bool {
    has_extension(path, &[SOURCE_EXTENSION])
}

pub fn is_bytecode_file(path: &Path) -> bool {
    has_extension(path, BYTECODE_EXTENSIONS)
}

/// Whether the compiler left an artifact for `source`.
///
/// Checks the flat placement (`mod.pyc`) first, then the runtime's default
/// `__pycache__/mod.<tag>.pyc` layout.
pub fn has_compiled_artifact(source: &Path) -> bool {
    if source.with_extension(LEGACY_BYTECODE_EXTENSION).is_file() {
        return true;
    }

    let (Some(parent), Some(stem)) = (source.parent(), source.file_stem()) else {
        return false;
    };
    let Ok(entries) = parent.join(CACHE_DIR_NAME).read_dir() else {
        return false;
    };
    let prefix = format!("{}.", stem.to_string_lossy());
    entries.filter_map(Result::ok).any(|entry| {
        let path = entry.path();
        is_bytecode_file(&path)
            && entry
                .file_name()
                .to_str()
                .is_some_and(|name| name.starts_with(&prefix))
    })
}
