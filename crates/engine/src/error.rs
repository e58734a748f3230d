use config::ConfigError;
use sstable::SSTableError;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors returned by [`Engine`](crate::Engine) operations.
#[derive(Debug, Error)]
pub enum Error {
    /// The key is absent or its newest version is a tombstone.
    #[error("key not found")]
    NotFound,

    /// A run's footer, offset table or cell data is structurally broken.
    #[error("corrupt run {}: {reason}", path.display())]
    CorruptRun { path: PathBuf, reason: String },

    #[error("io error: {0}")]
    Io(#[from] io::Error),

    /// A run discovered at startup could not be opened.
    #[error("failed to open run {} at startup", path.display())]
    Init {
        path: PathBuf,
        #[source]
        source: SSTableError,
    },

    /// A key or value too large for the run format.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// Every generation number up to `u64::MAX` is taken.
    #[error("run generation numbers exhausted")]
    GenerationExhausted,
}

impl Error {
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound)
    }
}

impl From<SSTableError> for Error {
    fn from(e: SSTableError) -> Self {
        match e {
            SSTableError::Io(e) => Error::Io(e),
            SSTableError::Corrupt { path, reason } => Error::CorruptRun { path, reason },
            SSTableError::InvalidInput(msg) => Error::InvalidInput(msg),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
