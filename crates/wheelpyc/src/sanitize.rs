//! Removal of stale bytecode from an unpacked wheel
//!
//! The tree is scanned read-only first and mutated afterwards, so deletion
//! never races the directory iterator.

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use log::{debug, info};
use walkdir::WalkDir;

use crate::{
    error::{Error, Result},
    layout::{is_bytecode_file, is_cache_dir, is_scripts_dir},
};

/// What [`sanitize`] changed in the tree
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SanitizeReport {
    pub removed_dirs: Vec<PathBuf>,
    pub removed_files: Vec<PathBuf>,
    /// Files under scripts directories that gained execute bits
    pub marked_executable: Vec<PathBuf>,
}

#[derive(Debug, Default)]
struct Plan {
    cache_dirs: Vec<PathBuf>,
    bytecode_files: Vec<PathBuf>,
    scripts: Vec<PathBuf>,
}

fn sanitize_error(path: &Path) -> impl FnOnce(io::Error) -> Error + '_ {
    move |source| Error::Sanitize {
        path: path.to_path_buf(),
        source,
    }
}

/// Collect what to delete without touching the tree
fn scan(root: &Path) -> Result<Plan> {
    let mut plan = Plan::default();
    let mut walker = WalkDir::new(root).min_depth(1).sort_by_file_name().into_iter();

    while let Some(entry) = walker.next() {
        let entry = entry.map_err(|err| sanitize_error(root)(err.into()))?;
        let name = entry.file_name();

        if entry.file_type().is_dir() {
            if is_scripts_dir(name) {
                scan_scripts(entry.path(), &mut plan)?;
                walker.skip_current_dir();
            } else if is_cache_dir(name) {
                plan.cache_dirs.push(entry.into_path());
                walker.skip_current_dir();
            }
        } else if is_bytecode_file(entry.path()) {
            plan.bytecode_files.push(entry.into_path());
        }
    }

    Ok(plan)
}

/// Files in a scripts directory are kept as they are; only cache
/// directories below it are dropped.
fn scan_scripts(dir: &Path, plan: &mut Plan) -> Result<()> {
    let mut walker = WalkDir::new(dir).min_depth(1).sort_by_file_name().into_iter();

    while let Some(entry) = walker.next() {
        let entry = entry.map_err(|err| sanitize_error(dir)(err.into()))?;
        if entry.file_type().is_dir() {
            if is_cache_dir(entry.file_name()) {
                plan.cache_dirs.push(entry.into_path());
                walker.skip_current_dir();
            }
        } else if entry.file_type().is_file() {
            plan.scripts.push(entry.into_path());
        }
    }
    Ok(())
}

/// Strip `__pycache__` directories and `.pyc`/`.pyo` files from `root`.
///
/// Files in scripts directories are left alone, bytecode included; when
/// `fix_script_permissions` is set they are made executable instead.
pub fn sanitize(root: &Path, fix_script_permissions: bool) -> Result<SanitizeReport> {
    let plan = scan(root)?;
    let mut report = SanitizeReport::default();

    for dir in plan.cache_dirs {
        debug!("Deleting {}", dir.display());
        fs::remove_dir_all(&dir).map_err(sanitize_error(&dir))?;
        report.removed_dirs.push(dir);
    }
    for file in plan.bytecode_files {
        debug!("Deleting {}", file.display());
        fs::remove_file(&file).map_err(sanitize_error(&file))?;
        report.removed_files.push(file);
    }
    if fix_script_permissions {
        for script in plan.scripts {
            if mark_executable(&script).map_err(sanitize_error(&script))? {
                debug!("Marked {} executable", script.display());
                report.marked_executable.push(script);
            }
        }
    }

    info!(
        "Sanitized {}: removed {} cache directories and {} bytecode files",
        root.display(),
        report.removed_dirs.len(),
        report.removed_files.len()
    );
    Ok(report)
}

/// Add execute bits; returns whether the mode changed
#[cfg(unix)]
fn mark_executable(path: &Path) -> io::Result<bool> {
    use std::os::unix::fs::PermissionsExt;

    let mut permissions = fs::metadata(path)?.permissions();
    let mode = permissions.mode();
    if mode & 0o111 == 0o111 {
        return Ok(false);
    }
    permissions.set_mode(mode | 0o111);
    fs::set_permissions(path, permissions)?;
    Ok(true)
}

#[cfg(not(unix))]
fn mark_executable(_path: &Path) -> io::Result<bool> {
    Ok(false)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn touch(root: &Path, relative: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "").unwrap();
    }

    #[test]
    fn test_removes_cache_dirs_and_bytecode() {
        let temp = tempfile::tempdir().unwrap();
        let root = temp.path();
        touch(root, "pkg/__init__.py");
        touch(root, "pkg/__pycache__/__init__.cpython-39.pyc");
        touch(root, "pkg/stale.pyc");
        touch(root, "pkg/OLD.PYO");
        touch(root, "pkg/data/__pycache__/x.pyc");
        touch(root, "pkg/data/table.csv");

        let report = sanitize(root, false).unwrap();

        assert_eq!(report.removed_dirs.len(), 2);
        assert_eq!(report.removed_files.len(), 2);
        assert!(root.join("pkg/__init__.py").is_file());
        assert!(root.join("pkg/data/table.csv").is_file());
        assert!(!root.join("pkg/__pycache__").exists());
        assert!(!root.join("pkg/data/__pycache__").exists());
        assert!(!root.join("pkg/stale.pyc").exists());
        assert!(!root.join("pkg/OLD.PYO").exists());
    }

    #[test]
    fn test_scripts_keep_files_but_lose_cache_dirs() {
        let temp = tempfile::tempdir().unwrap();
        let root = temp.path();
        touch(root, "demo-1.0.data/scripts/tool.pyc");
        touch(root, "demo-1.0.data/scripts/__pycache__/tool.cpython-38.pyc");
        touch(root, "demo-1.0.data/scripts/nested/__pycache__/x.pyc");

        let report = sanitize(root, false).unwrap();

        assert_eq!(
            report.removed_dirs,
            vec![
                root.join("demo-1.0.data/scripts/__pycache__"),
                root.join("demo-1.0.data/scripts/nested/__pycache__"),
            ]
        );
        assert!(report.removed_files.is_empty());
        assert!(root.join("demo-1.0.data/scripts/tool.pyc").is_file());
        assert!(!root.join("demo-1.0.data/scripts/__pycache__").exists());
        assert!(root.join("demo-1.0.data/scripts/nested").is_dir());
    }

    #[cfg(unix)]
    #[test]
    fn test_script_permissions_are_fixed() {
        use std::os::unix::fs::PermissionsExt;

        let temp = tempfile::tempdir().unwrap();
        let root = temp.path();
        touch(root, "demo-1.0.data/scripts/tool");
        touch(root, "demo/module.py");
        let tool = root.join("demo-1.0.data/scripts/tool");
        fs::set_permissions(&tool, fs::Permissions::from_mode(0o644)).unwrap();

        let report = sanitize(root, true).unwrap();

        assert_eq!(report.marked_executable, vec![tool.clone()]);
        let mode = fs::metadata(&tool).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o755);

        let module_mode = fs::metadata(root.join("demo/module.py"))
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(module_mode & 0o100, 0);
    }
}
