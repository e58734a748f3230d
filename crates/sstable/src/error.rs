use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while writing or reading a run file.
#[derive(Debug, Error)]
pub enum SSTableError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    /// The file's footer, offset table or a cell is structurally broken.
    #[error("corrupt run {}: {reason}", path.display())]
    Corrupt { path: PathBuf, reason: String },

    /// A cell cannot be represented in the run format, or the input to the
    /// writer is not strictly ascending by key.
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

pub type Result<T> = std::result::Result<T, SSTableError>;
