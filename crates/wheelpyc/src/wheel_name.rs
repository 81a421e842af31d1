//! Wheel filename parsing and tag rewriting
//!
//! The grammar is deliberately loose and matches what installers accept for
//! re-packed wheels: `<name>-<version>-<tag1>-<tag2...>.<ext>`. Everything
//! after the version is the tag bundle; only its first component is rewritten.

use std::{fmt, path::Path, str::FromStr};

use crate::{
    error::{Error, Result},
    interpreter::InterpreterTag,
};

/// Identity of a wheel as encoded in its filename
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WheelName {
    pub name: String,
    pub version: String,
    /// Tag bundle components in filename order (interpreter, ABI, platform, ...)
    pub tags: Vec<String>,
    /// Extension without the leading dot
    pub extension: String,
}

impl WheelName {
    pub fn parse(file_name: &str) -> Result<Self> {
        let invalid = |reason| Error::Naming {
            file_name: file_name.to_owned(),
            reason,
        };

        let (stem, extension) = file_name
            .rsplit_once('.')
            .filter(|(stem, ext)| !stem.is_empty() && !ext.is_empty())
            .ok_or_else(|| invalid("missing file extension"))?;

        let mut fields = stem.splitn(3, '-');
        let (Some(name), Some(version), Some(bundle)) = (fields.next(), fields.next(), fields.next())
        else {
            return Err(invalid("expected at least three `-` separated fields"));
        };
        if name.is_empty() || version.is_empty() {
            return Err(invalid("empty name or version field"));
        }

        let tags: Vec<String> = bundle.split('-').map(str::to_owned).collect();
        if tags[0].is_empty() {
            return Err(invalid("empty tag bundle"));
        }

        Ok(Self {
            name: name.to_owned(),
            version: version.to_owned(),
            tags,
            extension: extension.to_owned(),
        })
    }

    /// Parse the final component of `path`
    pub fn from_path(path: &Path) -> Result<Self> {
        let file_name = path.file_name().map(|name| name.to_string_lossy()).ok_or_else(|| {
            Error::Naming {
                file_name: path.display().to_string(),
                reason: "path has no file name",
            }
        })?;
        Self::parse(&file_name)
    }

    /// Filename without the extension; also names the working directory
    pub fn stem(&self) -> String {
        format!("{}-{}-{}", self.name, self.version, self.tags.join("-"))
    }

    pub fn file_name(&self) -> String {
        format!("{}.{}", self.stem(), self.extension)
    }

    /// Replace the first tag component, carrying the rest through unchanged
    #[must_use]
    pub fn with_first_tag(&self, tag: impl Into<String>) -> Self {
        let mut renamed = self.clone();
        renamed.tags[0] = tag.into();
        renamed
    }

    /// Retag for bytecode compiled by `interpreter`
    #[must_use]
    pub fn for_interpreter(&self, interpreter: &InterpreterTag) -> Self {
        self.with_first_tag(interpreter.rewrite(&self.tags[0]))
    }
}

impl FromStr for WheelName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for WheelName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.file_name())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{error::ErrorKind, interpreter::Implementation};

    fn cpython(minor: u8) -> InterpreterTag {
        InterpreterTag::new(Implementation::CPython, 3, minor)
    }

    #[test]
    fn test_parse_splits_fields() {
        let wheel = WheelName::parse("demo-1.0-cp38-cp38-manylinux1_x86_64.whl").unwrap();
        assert_eq!(wheel.name, "demo");
        assert_eq!(wheel.version, "1.0");
        assert_eq!(wheel.tags, vec!["cp38", "cp38", "manylinux1_x86_64"]);
        assert_eq!(wheel.extension, "whl");
        assert_eq!(wheel.stem(), "demo-1.0-cp38-cp38-manylinux1_x86_64");
    }

    #[test]
    fn test_generic_tag_rewrite() {
        let wheel = WheelName::parse("demo-1.0-py3-none-any.whl").unwrap();
        assert_eq!(
            wheel.for_interpreter(&cpython(9)).file_name(),
            "demo-1.0-py39-none-any.whl"
        );
    }

    #[test]
    fn test_implementation_tag_rewrite() {
        let wheel = WheelName::parse("demo-1.0-cp38-cp38-manylinux1_x86_64.whl").unwrap();
        assert_eq!(
            wheel.for_interpreter(&cpython(9)).file_name(),
            "demo-1.0-cp39-cp38-manylinux1_x86_64.whl"
        );
    }

    #[test]
    fn test_rewrite_twice_is_idempotent() {
        let wheel = WheelName::parse("pkg-2.3.1-py2.py3-none-any.whl").unwrap();
        let once = wheel.for_interpreter(&cpython(12));
        let twice = once.for_interpreter(&cpython(12));
        assert_eq!(once, twice);
        assert_eq!(twice.to_string(), "pkg-2.3.1-py312-none-any.whl");
    }

    #[test]
    fn test_with_first_tag_keeps_trailing_components() {
        let wheel = WheelName::parse("a-b-t1-t2-t3-t4.zip").unwrap();
        assert_eq!(wheel.with_first_tag("T").file_name(), "a-b-T-t2-t3-t4.zip");
    }

    #[test]
    fn test_single_tag_bundle_is_accepted() {
        let wheel = WheelName::parse("name-1.0-py3.whl").unwrap();
        assert_eq!(wheel.for_interpreter(&cpython(9)).file_name(), "name-1.0-py39.whl");
    }

    #[test]
    fn test_parse_rejects_malformed_names() {
        for bad in [
            "demo-1.0.whl",
            "demo.whl",
            "demo-1.0-py3-none-any",
            "demo-1.0-.whl",
            "-1.0-py3.whl",
            ".whl",
        ] {
            let err = WheelName::parse(bad).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Naming, "{bad} should be rejected");
        }
    }

    #[test]
    fn test_from_path_uses_file_name() {
        let wheel = WheelName::from_path(Path::new("/tmp/in/demo-1.0-py3-none-any.whl")).unwrap();
        assert_eq!(wheel.stem(), "demo-1.0-py3-none-any");
    }
}
