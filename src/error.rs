use std::fmt;
use std::path::PathBuf;

/// Errors that can abort a build.
///
/// `MalformedInput` from the text-record grammar has no variant here: per
/// the format's contract a bad line is skipped, not surfaced (see
/// `parser.rs`).
#[derive(Debug)]
pub enum BuildError {
    /// Reading an input file or writing/renaming the output failed.
    Io {
        path: Option<PathBuf>,
        source: std::io::Error,
    },
    /// The in-memory trie or string pool could not grow any further.
    Memory,
}

impl BuildError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        BuildError::Io {
            path: Some(path.into()),
            source,
        }
    }
}

impl From<std::io::Error> for BuildError {
    fn from(source: std::io::Error) -> Self {
        BuildError::Io { path: None, source }
    }
}

impl fmt::Display for BuildError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            BuildError::Io {
                path: Some(path),
                source,
            } => {
                write!(f, "Error: I/O failure on '{}': {}", path.display(), source)
            }
            BuildError::Io { path: None, source } => {
                write!(f, "Error: I/O failure: {}", source)
            }
            BuildError::Memory => {
                write!(f, "Error: allocation failed, the build must be aborted.")
            }
        }
    }
}

impl std::error::Error for BuildError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BuildError::Io { source, .. } => Some(source),
            BuildError::Memory => None,
        }
    }
}
