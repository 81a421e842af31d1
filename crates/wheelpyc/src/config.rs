//! Layered configuration
//!
//! Values are resolved lowest to highest priority: built-in defaults, the
//! user config file, `wheelpyc.toml` in the current directory, an explicit
//! `--config` file, `WHEELPYC_*` environment variables, and finally
//! command-line flags (applied by the binary).

use std::{
    ffi::OsString,
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use log::debug;
use serde::Deserialize;

use crate::dirs::{CONFIG_FILE_NAME, user_config_file};

/// Environment variable overriding [`Config::python`]
pub const ENV_PYTHON: &str = "WHEELPYC_PYTHON";
/// Environment variable overriding [`Config::dst`]
pub const ENV_DST: &str = "WHEELPYC_DST";

/// What to do with `.py` files once the compiler has run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceRemoval {
    /// Remove every source file, even ones the compiler produced nothing for
    #[default]
    Unconditional,
    /// Keep sources that have no compiled artifact next to them
    CompiledOnly,
}

/// Settings shared by every stage of the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Directory the re-packed wheels are written to
    pub dst: PathBuf,
    /// Python executable used to probe the interpreter tag and compile
    pub python: PathBuf,
    /// Parent of the per-wheel working directories; the current directory if unset
    pub work_root: Option<PathBuf>,
    /// Add execute bits to files under `scripts` directories before packing
    pub fix_script_permissions: bool,
    pub source_removal: SourceRemoval,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            dst: PathBuf::from("dist"),
            python: PathBuf::from(default_python()),
            work_root: None,
            fix_script_permissions: true,
            source_removal: SourceRemoval::default(),
        }
    }
}

/// On-disk representation; every key is optional so files can be layered
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
struct ConfigFile {
    dst: Option<PathBuf>,
    python: Option<PathBuf>,
    work_root: Option<PathBuf>,
    fix_script_permissions: Option<bool>,
    source_removal: Option<SourceRemoval>,
}

impl Config {
    /// Resolve configuration from files and the process environment.
    ///
    /// The user and project files are optional; an `explicit` file must exist.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(user_file) = user_config_file() {
            config.merge_file_if_exists(&user_file)?;
        }
        config.merge_file_if_exists(Path::new(CONFIG_FILE_NAME))?;
        if let Some(path) = explicit {
            config.merge_file(path)?;
        }

        config.apply_env_from(|key| std::env::var_os(key));
        Ok(config)
    }

    fn merge_file_if_exists(&mut self, path: &Path) -> Result<()> {
        if path.is_file() {
            self.merge_file(path)?;
        }
        Ok(())
    }

    /// Overlay the keys present in the TOML file at `path`
    pub fn merge_file(&mut self, path: &Path) -> Result<()> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        self.merge_toml(&content)
            .with_context(|| format!("invalid config file {}", path.display()))?;
        debug!("Loaded configuration from {}", path.display());
        Ok(())
    }

    /// Overlay the keys present in a TOML document
    pub fn merge_toml(&mut self, content: &str) -> Result<()> {
        let file: ConfigFile = toml::from_str(content)?;

        if let Some(dst) = file.dst {
            self.dst = dst;
        }
        if let Some(python) = file.python {
            self.python = python;
        }
        if let Some(work_root) = file.work_root {
            self.work_root = Some(work_root);
        }
        if let Some(fix) = file.fix_script_permissions {
            self.fix_script_permissions = fix;
        }
        if let Some(policy) = file.source_removal {
            self.source_removal = policy;
        }
        Ok(())
    }

    /// Apply `WHEELPYC_*` overrides looked up through `lookup`
    pub fn apply_env_from(&mut self, lookup: impl Fn(&str) -> Option<OsString>) {
        if let Some(python) = lookup(ENV_PYTHON).filter(|value| !value.is_empty()) {
            self.python = PathBuf::from(python);
        }
        if let Some(dst) = lookup(ENV_DST).filter(|value| !value.is_empty()) {
            self.dst = PathBuf::from(dst);
        }
    }

    /// Directory under which per-wheel working directories are created
    pub fn work_root(&self) -> &Path {
        self.work_root.as_deref().unwrap_or_else(|| Path::new("."))
    }
}

const fn default_python() -> &'static str {
    if cfg!(windows) { "python" } else { "python3" }
}
