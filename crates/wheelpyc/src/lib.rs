//! Re-pack Python wheels into bytecode-only wheels.
//!
//! A wheel is unpacked, stale bytecode is removed, every module is compiled
//! with an external Python runtime, sources are dropped, and the tree is zipped
//! into a new wheel whose interpreter tag names the compiling runtime.

pub mod compiler;
pub mod config;
pub mod dirs;
pub mod error;
pub mod interpreter;
pub mod layout;
pub mod orchestrator;
pub mod repack;
pub mod sanitize;
pub mod wheel_name;
pub mod workdir;

pub use error::{Error, ErrorKind, Result};
