//! Per-wheel pipeline: extract, sanitize, compile, repack, clean up
//!
//! Wheels are processed one at a time. A failing wheel aborts its own
//! pipeline only; the batch moves on and reports every outcome.

use std::path::{Path, PathBuf};

use log::{error, info};

use crate::{
    compiler::{BytecodeCompiler, compile_and_strip},
    config::Config,
    error::Result,
    interpreter::InterpreterTag,
    repack::pack,
    sanitize::sanitize,
    wheel_name::WheelName,
    workdir,
};

/// Runs the pipeline for one or more wheels with a single interpreter
pub struct Repacker<'a> {
    config: &'a Config,
    compiler: &'a dyn BytecodeCompiler,
    interpreter: InterpreterTag,
}

impl std::fmt::Debug for Repacker<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repacker")
            .field("config", self.config)
            .field("interpreter", &self.interpreter)
            .finish_non_exhaustive()
    }
}

impl<'a> Repacker<'a> {
    /// Probe the compiler's interpreter once; every wheel is tagged with it
    pub fn new(config: &'a Config, compiler: &'a dyn BytecodeCompiler) -> Result<Self> {
        let interpreter = compiler.interpreter()?;
        info!("Using interpreter {interpreter} ({})", config.python.display());
        Ok(Self::with_interpreter(config, compiler, interpreter))
    }

    pub fn with_interpreter(
        config: &'a Config,
        compiler: &'a dyn BytecodeCompiler,
        interpreter: InterpreterTag,
    ) -> Self {
        Self {
            config,
            compiler,
            interpreter,
        }
    }

    pub const fn interpreter(&self) -> &InterpreterTag {
        &self.interpreter
    }

    /// Where `wheel` will be written
    pub fn output_path(&self, wheel: &WheelName) -> PathBuf {
        self.config
            .dst
            .join(wheel.for_interpreter(&self.interpreter).file_name())
    }

    /// Re-pack a single wheel and return the path of the new wheel.
    ///
    /// The filename is validated before anything touches the disk. The
    /// working directory is removed when this returns, on success or error.
    pub fn repack(&self, wheel_path: &Path) -> Result<PathBuf> {
        let wheel = WheelName::from_path(wheel_path)?;
        let output = self.output_path(&wheel);

        let work_dir = workdir::extract(wheel_path, self.config.work_root(), &wheel.stem())?;
        sanitize(work_dir.path(), self.config.fix_script_permissions)?;
        compile_and_strip(
            work_dir.path(),
            &self.interpreter,
            self.compiler,
            self.config.source_removal,
        )?;
        pack(work_dir.path(), &output)?;

        Ok(output)
    }

    /// Re-pack every wheel in order, collecting per-wheel outcomes
    pub fn repack_all<P: AsRef<Path>>(&self, wheels: &[P]) -> BatchReport {
        let outcomes = wheels
            .iter()
            .map(|wheel| {
                let input = wheel.as_ref().to_path_buf();
                info!("Re-packing {}", input.display());
                let result = self.repack(&input);
                match &result {
                    Ok(output) => info!("Created {}", output.display()),
                    Err(err) => error!("Failed to re-pack {}: {err}", input.display()),
                }
                WheelOutcome { input, result }
            })
            .collect();
        BatchReport { outcomes }
    }
}

/// Result of re-packing one input wheel
#[derive(Debug)]
pub struct WheelOutcome {
    pub input: PathBuf,
    pub result: Result<PathBuf>,
}

/// Outcomes of a batch, in input order
#[derive(Debug, Default)]
pub struct BatchReport {
    pub outcomes: Vec<WheelOutcome>,
}

impl BatchReport {
    pub fn is_success(&self) -> bool {
        self.outcomes.iter().all(|outcome| outcome.result.is_ok())
    }

    pub fn failures(&self) -> impl Iterator<Item = &WheelOutcome> {
        self.outcomes.iter().filter(|outcome| outcome.result.is_err())
    }

    pub fn outputs(&self) -> impl Iterator<Item = &Path> {
        self.outcomes
            .iter()
            .filter_map(|outcome| outcome.result.as_deref().ok())
    }
}
