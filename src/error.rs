use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Exit code used when the user interrupts a wrapper (Ctrl-C) or closes
/// standard input at a prompt.
pub const EXIT_INTERRUPTED: i32 = 114;

/// Errors raised by the helper layer.
///
/// Wrappers usually return these through `anyhow`; the dispatcher downcasts
/// back to `WrapError` to pick the process exit code.
#[derive(Debug, Error)]
pub enum WrapError {
    #[error("Cannot find \"{program}\" executable.")]
    NotFound { program: String },

    /// Deliberate stop with a message for the user.
    #[error("{0}")]
    Stop(String),

    #[error("interrupted")]
    Interrupted,

    #[error("Cannot execute \"{program}\": {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("IO error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Invalid output filter: {0}")]
    Pattern(#[from] regex::Error),

    #[error("Cannot process \"{path}\": {message}")]
    Data { path: PathBuf, message: String },

    #[error("{0}")]
    Usage(String),
}

impl WrapError {
    pub fn stop(message: impl Into<String>) -> Self {
        Self::Stop(message.into())
    }

    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            WrapError::Interrupted => EXIT_INTERRUPTED,
            WrapError::Usage(_) => 2,
            _ => 1,
        }
    }
}

pub type Result<T> = std::result::Result<T, WrapError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(WrapError::Interrupted.exit_code(), 114);
        assert_eq!(WrapError::Usage("bad".into()).exit_code(), 2);
        assert_eq!(WrapError::stop("Cannot create \"x\"").exit_code(), 1);
        let not_found = WrapError::NotFound {
            program: "xz".into(),
        };
        assert_eq!(not_found.exit_code(), 1);
    }

    #[test]
    fn test_stop_message_is_verbatim() {
        let err = WrapError::stop("Cannot find \"a.txt\" file.");
        assert_eq!(err.to_string(), "Cannot find \"a.txt\" file.");
    }
}
