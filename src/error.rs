use std::fmt;
use thiserror::Error;

/// Result type for archive workflow operations
pub type Result<T> = std::result::Result<T, Error>;

/// Failures surfaced by the workflow engine
#[derive(Debug, Error)]
pub enum Error {
    #[error("archive codec failed: {0:#}")]
    Codec(#[source] anyhow::Error),

    #[error("could not deliver {file_name}: {source:#}")]
    Delivery {
        file_name: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("entry index {index} out of range for {len} entries")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("resource handle {0} has been released")]
    HandleReleased(String),
}

impl Error {
    pub(crate) fn codec(err: impl Into<anyhow::Error>) -> Self {
        Error::Codec(err.into())
    }
}

/// Why an operation was ignored without touching the session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    /// No files were supplied
    EmptyInput,
    /// Another archive operation is in flight
    Busy,
    /// Decompression input does not carry the archive extension
    WrongExtension { file_name: String },
    /// Download of the selection requested with nothing selected
    NothingSelected,
    /// Download of everything requested before a bundle exists
    NoBundle,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::EmptyInput => write!(f, "no input files"),
            Rejection::Busy => write!(f, "another archive operation is running"),
            Rejection::WrongExtension { file_name } => {
                write!(f, "{file_name} is not a bundle archive")
            }
            Rejection::NothingSelected => write!(f, "no entries selected"),
            Rejection::NoBundle => write!(f, "no bundle available"),
        }
    }
}

/// Terminal result of one workflow invocation.
///
/// Workflows never fail with `Err`: the session status string is the
/// primary report, and the outcome tells a programmatic caller what
/// happened.
#[derive(Debug)]
#[must_use]
pub enum Outcome {
    Completed,
    Rejected(Rejection),
    Failed(Error),
}

impl Outcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, Outcome::Completed)
    }

    pub fn rejection(&self) -> Option<&Rejection> {
        match self {
            Outcome::Rejected(rejection) => Some(rejection),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&Error> {
        match self {
            Outcome::Failed(err) => Some(err),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codec_errors_show_the_cause_chain() {
        let err = Error::codec(anyhow::anyhow!("bad signature").context("Not a valid ZIP file"));
        assert_eq!(
            err.to_string(),
            "archive codec failed: Not a valid ZIP file: bad signature"
        );
    }

    #[test]
    fn outcome_accessors() {
        let outcome = Outcome::Rejected(Rejection::Busy);
        assert_eq!(outcome.rejection(), Some(&Rejection::Busy));
        assert!(outcome.error().is_none());
        assert!(Outcome::Completed.is_completed());
    }
}
