//! Crate-wide error type.
//!
//! Every fallible path in the engine funnels into [`EngineError`]. The binary's
//! `main` matches on the variant to pick an exit code (§7 of the design doc);
//! nothing below ever carries a backtrace or other internal detail the user
//! can't act on.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("usage error: {0}")]
    Usage(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("{binary} {args}: {detail}")]
    ChildProcess {
        binary: String,
        args: String,
        detail: String,
    },

    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("marks mismatch: {0}")]
    MarksMismatch(String),

    #[error("rejected: {0}")]
    PolicyReject(String),
}

pub type Result<T> = std::result::Result<T, EngineError>;

impl EngineError {
    /// Process exit code this error maps to, per the command-line surface
    /// convention: 0 success, 1 runtime error, 2 invalid invocation.
    pub fn exit_code(&self) -> i32 {
        match self {
            EngineError::Usage(_) => 2,
            _ => 1,
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        EngineError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn child_process(binary: impl Into<String>, args: impl Into<String>, detail: impl Into<String>) -> Self {
        EngineError::ChildProcess {
            binary: binary.into(),
            args: args.into(),
            detail: detail.into(),
        }
    }
}

/// Small helper so call sites can write `fs::rename(a, b).io_ctx(a)?` instead
/// of repeating the path-tagging boilerplate.
pub trait IoResultExt<T> {
    fn io_ctx(self, path: impl Into<PathBuf>) -> Result<T>;
}

impl<T> IoResultExt<T> for std::io::Result<T> {
    fn io_ctx(self, path: impl Into<PathBuf>) -> Result<T> {
        self.map_err(|e| EngineError::io(path, e))
    }
}
