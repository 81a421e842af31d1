//! Interpreter identity used to tag re-packed wheels
//!
//! The tag is probed from the Python runtime that compiles the bytecode, so
//! the output wheel advertises exactly the interpreter its `.pyc` files load on.

use std::fmt;

/// Marker used when the original tag does not name the compiling implementation
pub const GENERIC_MARKER: &str = "py";

/// Python implementation reported by `platform.python_implementation()`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Implementation {
    CPython,
    PyPy,
    IronPython,
    Jython,
    Other(String),
}

impl Implementation {
    pub fn from_name(name: &str) -> Self {
        match name {
            "CPython" => Self::CPython,
            "PyPy" => Self::PyPy,
            "IronPython" => Self::IronPython,
            "Jython" => Self::Jython,
            other => Self::Other(other.to_owned()),
        }
    }

    /// Two-letter abbreviation used in wheel interpreter tags
    pub const fn abbreviation(&self) -> Option<&'static str> {
        match self {
            Self::CPython => Some("cp"),
            Self::PyPy => Some("pp"),
            Self::IronPython => Some("ip"),
            Self::Jython => Some("jy"),
            Self::Other(_) => None,
        }
    }
}

/// The runtime that produced the bytecode.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InterpreterTag {
    pub implementation: Implementation,
    pub major: u8,
    pub minor: u8,
}

impl InterpreterTag {
    pub const fn new(implementation: Implementation, major: u8, minor: u8) -> Self {
        Self {
            implementation,
            major,
            minor,
        }
    }

    /// Major and minor digits, e.g. `39` or `310`
    pub fn version_code(&self) -> String {
        format!("{}{}", self.major, self.minor)
    }

    /// Compute the replacement for the first component of a wheel's tag bundle.
    ///
    /// An original tag that already names this implementation (`cp38` on
    /// CPython) keeps the implementation marker; anything else (`py3`,
    /// `py2.py3`, `cp38` on PyPy) becomes the generic `py` marker.
    pub fn rewrite(&self, original: &str) -> String {
        let marker = self
            .implementation
            .abbreviation()
            .filter(|abbrev| original.starts_with(*abbrev))
            .unwrap_or(GENERIC_MARKER);
        format!("{marker}{}", self.version_code())
    }

    /// Whether `compileall` can place artifacts next to their sources.
    ///
    /// Python 2 only knows the flat layout, so it never needs the flag.
    pub const fn supports_legacy_placement(&self) -> bool {
        self.major >= 3
    }

    /// Parse the `<implementation> <major> <minor>` line printed by the probe
    pub fn parse_probe(output: &str) -> Option<Self> {
        let mut fields = output.split_whitespace();
        let implementation = Implementation::from_name(fields.next()?);
        let major = fields.next()?.parse().ok()?;
        let minor = fields.next()?.parse().ok()?;
        if fields.next().is_some() {
            return None;
        }
        Some(Self::new(implementation, major, minor))
    }
}

impl fmt::Display for InterpreterTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let marker = self
            .implementation
            .abbreviation()
            .unwrap_or(GENERIC_MARKER);
        write!(f, "{marker}{}", self.version_code())
    }
}
