use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors that stop an export run.
#[derive(Debug, Error)]
pub enum ExportError {
    /// An output file could not be created, written or flushed.
    #[error("i/o error on '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The input log could not be opened.
    #[error("failed to open bag '{}': {message}", .path.display())]
    OpenLog { path: PathBuf, message: String },

    /// The container is damaged; scanning cannot resynchronize.
    #[error("corrupt bag: {message}")]
    LogCorrupt { message: String },

    /// Malformed region or export settings, detected before scanning.
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// More distinct obstacle ids than the sink pool holds, with the abort policy.
    #[error("obstacle id {id} exceeds the sink capacity of {capacity}")]
    CapacityExceeded { id: i32, capacity: usize },

    /// The pipeline was driven out of order (e.g. `run` called twice).
    #[error("invalid pipeline state: {0}")]
    InvalidState(String),
}

impl ExportError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// A record on a recognized channel whose payload does not parse.
///
/// Recoverable: the record is skipped and counted.
#[derive(Debug, Error)]
#[error("failed to decode message on channel {channel}: {source}")]
pub struct DecodeFailure {
    pub channel: &'static str,
    #[source]
    pub source: prost::DecodeError,
}
