//! Bytecode compilation of an unpacked wheel
//!
//! Compilation itself is delegated to a [`BytecodeCompiler`]; in production
//! that is `python -m compileall` run by the same interpreter whose tag ends up
//! in the output filename.

use std::{
    fs,
    path::{Path, PathBuf},
    process::{Command, Output},
};

use log::{debug, info, warn};
use walkdir::WalkDir;

use crate::{
    config::SourceRemoval,
    error::{Error, Result},
    interpreter::InterpreterTag,
    layout::{has_compiled_artifact, is_scripts_dir, is_source_file},
};

/// Prints `<implementation> <major> <minor>`; valid on Python 2 and 3
const PROBE_SCRIPT: &str = "import platform, sys; \
     print('%s %d %d' % (platform.python_implementation(), sys.version_info[0], sys.version_info[1]))";

/// `compileall -x` pattern excluding everything below a scripts directory.
/// Only meaningful against paths relative to the tree, see `compile_tree`.
const SCRIPTS_EXCLUDE_PATTERN: &str = r"[/\\]scripts[/\\]";

/// Where compiled artifacts are written relative to their sources
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// `mod.pyc` beside `mod.py`
    Legacy,
    /// Whatever the runtime does by default (`__pycache__` on Python 3)
    Default,
}

/// Result of one compiler run over a tree
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompileOutcome {
    /// False when at least one file failed to compile
    pub success: bool,
    /// Messages the compiler printed, one per line
    pub diagnostics: Vec<String>,
}

/// An external capability that turns Python sources into bytecode.
pub trait BytecodeCompiler {
    /// Identify the runtime that will produce the bytecode
    fn interpreter(&self) -> Result<InterpreterTag>;

    /// Recursively compile every source below `root`, skipping scripts
    /// directories. Per-file failures are reported in the outcome, not as
    /// errors; `Err` means the compiler could not run at all.
    fn compile_tree(&self, root: &Path, placement: Placement) -> Result<CompileOutcome>;
}

/// [`BytecodeCompiler`] backed by a Python executable
#[derive(Debug, Clone)]
pub struct PythonCompiler {
    python: PathBuf,
}

impl PythonCompiler {
    pub fn new(python: impl Into<PathBuf>) -> Self {
        Self {
            python: python.into(),
        }
    }

    /// The executable as seen from another working directory: bare names are
    /// still looked up on `PATH`, relative paths are anchored here.
    fn program(&self) -> Result<PathBuf> {
        if self.python.is_absolute() || self.python.components().count() < 2 {
            return Ok(self.python.clone());
        }
        std::path::absolute(&self.python).map_err(|source| Error::CompilerUnavailable {
            python: self.python.clone(),
            source,
        })
    }

    fn run(&self, command: &mut Command) -> Result<Output> {
        debug!("Running {command:?}");
        command.output().map_err(|source| Error::CompilerUnavailable {
            python: self.python.clone(),
            source,
        })
    }
}

impl BytecodeCompiler for PythonCompiler {
    fn interpreter(&self) -> Result<InterpreterTag> {
        let output = self.run(Command::new(&self.python).args(["-c", PROBE_SCRIPT]))?;
        let probe_error = |detail: String| Error::InterpreterProbe {
            python: self.python.clone(),
            detail,
        };

        if !output.status.success() {
            return Err(probe_error(format!(
                "probe exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        let stdout = String::from_utf8_lossy(&output.stdout);
        InterpreterTag::parse_probe(&stdout)
            .ok_or_else(|| probe_error(format!("unexpected probe output `{}`", stdout.trim())))
    }

    fn compile_tree(&self, root: &Path, placement: Placement) -> Result<CompileOutcome> {
        let mut command = Command::new(self.program()?);
        command.args(["-m", "compileall", "-q"]);
        if placement == Placement::Legacy {
            command.arg("-b");
        }
        // compileall matches `-x` against the paths it walks; compiling `.`
        // from inside the tree keeps the directories above `root` out of them
        command
            .arg("-x")
            .arg(SCRIPTS_EXCLUDE_PATTERN)
            .arg(".")
            .current_dir(root);

        let output = self.run(&mut command)?;
        let diagnostics = [&output.stdout, &output.stderr]
            .into_iter()
            .flat_map(|stream| {
                String::from_utf8_lossy(stream)
                    .lines()
                    .map(str::trim_end)
                    .filter(|line| !line.is_empty())
                    .map(str::to_owned)
                    .collect::<Vec<_>>()
            })
            .collect();

        Ok(CompileOutcome {
            success: output.status.success(),
            diagnostics,
        })
    }
}

/// What [`compile_and_strip`] did to the tree
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompileReport {
    pub outcome: CompileOutcome,
    pub removed_sources: Vec<PathBuf>,
    /// Sources without a compiled artifact, removed or kept per policy
    pub uncompiled: Vec<PathBuf>,
}

/// Source files below `root`, outside scripts directories
fn collect_sources(root: &Path) -> Result<Vec<PathBuf>> {
    let mut sources = Vec::new();
    let walker = WalkDir::new(root)
        .min_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| !(entry.file_type().is_dir() && is_scripts_dir(entry.file_name())));

    for entry in walker {
        let entry = entry.map_err(|err| Error::SourceRemoval {
            path: root.to_path_buf(),
            source: err.into(),
        })?;
        if entry.file_type().is_file() && is_source_file(entry.path()) {
            sources.push(entry.into_path());
        }
    }
    Ok(sources)
}

/// Compile the tree at `root`, then remove the sources that were compiled.
///
/// With [`SourceRemoval::Unconditional`] every source outside scripts
/// directories is removed even if the compiler left no artifact for it.
pub fn compile_and_strip(
    root: &Path,
    interpreter: &InterpreterTag,
    compiler: &dyn BytecodeCompiler,
    policy: SourceRemoval,
) -> Result<CompileReport> {
    let placement = if interpreter.supports_legacy_placement() {
        Placement::Legacy
    } else {
        Placement::Default
    };

    info!("Compiling {} with {interpreter}", root.display());
    let outcome = compiler.compile_tree(root, placement)?;
    if !outcome.success {
        warn!("Some files in {} failed to compile", root.display());
    }
    for line in &outcome.diagnostics {
        warn!("{line}");
    }

    let mut report = CompileReport {
        outcome,
        ..CompileReport::default()
    };

    for source in collect_sources(root)? {
        if !has_compiled_artifact(&source) {
            report.uncompiled.push(source.clone());
            if policy == SourceRemoval::CompiledOnly {
                warn!("No bytecode for {}; keeping source", source.display());
                continue;
            }
            warn!("No bytecode for {}; removing source anyway", source.display());
        }

        debug!("Deleting {}", source.display());
        fs::remove_file(&source).map_err(|err| Error::SourceRemoval {
            path: source.clone(),
            source: err,
        })?;
        report.removed_sources.push(source);
    }

    Ok(report)
}
