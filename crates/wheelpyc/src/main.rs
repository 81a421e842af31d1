use std::{path::PathBuf, process::ExitCode};

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use log::{LevelFilter, error, info};
use wheelpyc::{
    compiler::PythonCompiler,
    config::{Config, SourceRemoval},
    orchestrator::Repacker,
};

/// Re-pack Python wheels into bytecode-only wheels
#[derive(Parser, Debug)]
#[command(name = "wheelpyc", version, about, long_about = None)]
struct Cli {
    /// Wheel files to re-pack
    #[arg(required = true, value_name = "WHEEL")]
    wheels: Vec<PathBuf>,

    /// Output directory for the re-packed wheels [default: dist]
    #[arg(short, long, value_name = "DIR")]
    dst: Option<PathBuf>,

    /// Python executable used to compile the bytecode
    #[arg(long, value_name = "PYTHON")]
    python: Option<PathBuf>,

    /// Directory in which per-wheel working directories are created
    #[arg(long, value_name = "DIR")]
    work_root: Option<PathBuf>,

    /// Configuration file layered over the user and project files
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Keep source files that failed to compile instead of dropping them
    #[arg(long)]
    compiled_only: bool,

    /// Do not add execute bits to files in scripts directories
    #[arg(long)]
    no_fix_script_permissions: bool,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, conflicts_with = "quiet")]
    verbose: u8,

    /// Only log warnings and errors
    #[arg(short, long)]
    quiet: bool,
}

impl Cli {
    const fn log_level(&self) -> LevelFilter {
        if self.quiet {
            return LevelFilter::Warn;
        }
        match self.verbose {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    }

    /// Command-line flags take precedence over every configuration layer
    fn apply_to(&self, config: &mut Config) {
        if let Some(dst) = &self.dst {
            config.dst.clone_from(dst);
        }
        if let Some(python) = &self.python {
            config.python.clone_from(python);
        }
        if let Some(work_root) = &self.work_root {
            config.work_root = Some(work_root.clone());
        }
        if self.compiled_only {
            config.source_removal = SourceRemoval::CompiledOnly;
        }
        if self.no_fix_script_permissions {
            config.fix_script_permissions = false;
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    env_logger::Builder::new()
        .filter_level(cli.log_level())
        .parse_default_env()
        .format_timestamp(None)
        .init();

    match run(&cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            error!("{err:#}");
            ExitCode::FAILURE
        }
    }
}

/// Returns whether every wheel was re-packed
fn run(cli: &Cli) -> Result<bool> {
    let mut config = Config::load(cli.config.as_deref()).context("failed to load configuration")?;
    cli.apply_to(&mut config);

    let compiler = PythonCompiler::new(&config.python);
    let repacker = Repacker::new(&config, &compiler).context("failed to prepare the compiler")?;
    let report = repacker.repack_all(&cli.wheels);

    let failed = report.failures().count();
    info!(
        "Re-packed {} of {} wheels into {}",
        report.outcomes.len() - failed,
        report.outcomes.len(),
        config.dst.display()
    );
    for failure in report.failures() {
        if let Err(err) = &failure.result {
            error!("{} ({} error): {err}", failure.input.display(), err.kind());
        }
    }

    Ok(report.is_success())
}
