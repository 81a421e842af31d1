#![allow(dead_code, unreachable_pub)]

use std::{
    fs::{self, File},
    io::{Read, Write},
    path::{Path, PathBuf},
};

use walkdir::WalkDir;
use wheelpyc::{
    Result,
    compiler::{BytecodeCompiler, CompileOutcome, Placement, PythonCompiler},
    config::Config,
    interpreter::{Implementation, InterpreterTag},
    layout::{is_scripts_dir, is_source_file},
};
use zip::{ZipArchive, ZipWriter, write::SimpleFileOptions};

/// Stands in for `compileall`: writes `<module>.pyc` beside each source
/// outside scripts directories, failing on sources containing `syntax error`.
#[derive(Debug)]
pub struct FakeCompiler {
    pub interpreter: InterpreterTag,
}

impl FakeCompiler {
    pub fn cpython(major: u8, minor: u8) -> Self {
        Self {
            interpreter: InterpreterTag::new(Implementation::CPython, major, minor),
        }
    }
}

impl BytecodeCompiler for FakeCompiler {
    fn interpreter(&self) -> Result<InterpreterTag> {
        Ok(self.interpreter.clone())
    }

    fn compile_tree(&self, root: &Path, _placement: Placement) -> Result<CompileOutcome> {
        let mut outcome = CompileOutcome {
            success: true,
            diagnostics: Vec::new(),
        };
        let sources: Vec<PathBuf> = WalkDir::new(root)
            .into_iter()
            .filter_entry(|entry| !is_scripts_dir(entry.file_name()))
            .filter_map(std::result::Result::ok)
            .filter(|entry| entry.file_type().is_file() && is_source_file(entry.path()))
            .map(walkdir::DirEntry::into_path)
            .collect();

        for source in sources {
            let content = fs::read_to_string(&source).unwrap();
            if content.contains("syntax error") {
                outcome.success = false;
                outcome
                    .diagnostics
                    .push(format!("*** Error compiling '{}'", source.display()));
            } else {
                fs::write(source.with_extension("pyc"), format!("compiled:{content}")).unwrap();
            }
        }
        Ok(outcome)
    }
}

/// The `python3` on `PATH`, if there is one
pub fn system_python() -> Option<PythonCompiler> {
    let available = std::process::Command::new("python3")
        .arg("--version")
        .output()
        .is_ok_and(|output| output.status.success());
    available.then(|| PythonCompiler::new("python3"))
}

/// A compiler whose runtime cannot be started
#[derive(Debug)]
pub struct BrokenCompiler;

impl BytecodeCompiler for BrokenCompiler {
    fn interpreter(&self) -> Result<InterpreterTag> {
        Ok(InterpreterTag::new(Implementation::CPython, 3, 9))
    }

    fn compile_tree(&self, _root: &Path, _placement: Placement) -> Result<CompileOutcome> {
        Err(wheelpyc::Error::CompilerUnavailable {
            python: PathBuf::from("python3"),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        })
    }
}

/// Write a zip with `(name, content, unix mode)` entries
pub fn write_wheel(path: &Path, entries: &[(&str, &str, u32)]) {
    let mut writer = ZipWriter::new(File::create(path).unwrap());
    for (name, content, mode) in entries {
        let options = SimpleFileOptions::default().unix_permissions(*mode);
        writer.start_file(*name, options).unwrap();
        writer.write_all(content.as_bytes()).unwrap();
    }
    writer.finish().unwrap();
}

/// A typical pure-Python wheel with stale bytecode and a console script
pub fn demo_entries() -> Vec<(&'static str, &'static str, u32)> {
    vec![
        ("demo/__init__.py", "from .core import run\n", 0o644),
        ("demo/core.py", "def run():\n    return 42\n", 0o644),
        ("demo/__pycache__/core.cpython-38.pyc", "old", 0o644),
        ("demo/stale.pyc", "old", 0o644),
        ("demo/data/config.json", "{}", 0o644),
        ("demo-1.0.data/scripts/demo-cli", "#!python\nimport demo\n", 0o644),
        ("demo-1.0.data/scripts/helper.py", "print('helper')\n", 0o644),
        ("demo-1.0.dist-info/METADATA", "Name: demo\nVersion: 1.0\n", 0o644),
        ("demo-1.0.dist-info/RECORD", "", 0o644),
    ]
}

/// Isolated input, output and work directories
#[derive(Debug)]
pub struct Sandbox {
    pub temp: tempfile::TempDir,
    pub config: Config,
}

impl Sandbox {
    pub fn new() -> Self {
        Self::with_work_root("work")
    }

    /// Sandbox whose work root sits at `relative` inside the temp directory
    pub fn with_work_root(relative: &str) -> Self {
        let temp = tempfile::tempdir().unwrap();
        let work_root = temp.path().join(relative);
        fs::create_dir_all(&work_root).unwrap();
        let config = Config {
            dst: temp.path().join("dist"),
            work_root: Some(work_root),
            ..Config::default()
        };
        Self { temp, config }
    }

    pub fn input(&self, file_name: &str) -> PathBuf {
        self.temp.path().join(file_name)
    }

    pub fn work_root(&self) -> &Path {
        self.config.work_root()
    }

    /// Whether every working directory has been cleaned up
    pub fn work_root_is_empty(&self) -> bool {
        fs::read_dir(self.work_root()).unwrap().next().is_none()
    }
}

/// Entry names of a zip file, in archive order
pub fn entry_names(path: &Path) -> Vec<String> {
    let mut archive = ZipArchive::new(File::open(path).unwrap()).unwrap();
    (0..archive.len())
        .map(|index| archive.by_index(index).unwrap().name().to_owned())
        .collect()
}

/// Unix mode of one entry
pub fn entry_mode(path: &Path, name: &str) -> u32 {
    let mut archive = ZipArchive::new(File::open(path).unwrap()).unwrap();
    let entry = archive.by_name(name).unwrap();
    entry.unix_mode().unwrap()
}

pub fn entry_content(path: &Path, name: &str) -> String {
    let mut archive = ZipArchive::new(File::open(path).unwrap()).unwrap();
    let mut content = String::new();
    archive
        .by_name(name)
        .unwrap()
        .read_to_string(&mut content)
        .unwrap();
    content
}
