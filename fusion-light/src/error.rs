//! Error type for the epoch runner.

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, FitError>;

#[derive(Debug, Error)]
pub enum FitError {
    /// Anything raised by the model, optimizer, criterion or tensor ops.
    #[error(transparent)]
    Candle(#[from] candle::Error),

    #[error("i/o error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("batch tensors disagree on batch size: vi={vi}, ir={ir}, pngs={pngs}, labels={labels}")]
    BatchShape {
        vi: usize,
        ir: usize,
        pngs: usize,
        labels: usize,
    },

    #[error("epoch {epoch} is outside 1..={total_epochs}")]
    EpochOutOfRange { epoch: usize, total_epochs: usize },
}

impl FitError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
