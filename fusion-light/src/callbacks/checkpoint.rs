//! Model checkpointing.

use crate::metrics::SavedCheckpoints;
use crate::{FitError, Result, SegmentationModel};
use std::path::{Path, PathBuf};

pub const BEST_CHECKPOINT: &str = "best_epoch_weights.pth";
pub const LAST_CHECKPOINT: &str = "last_epoch_weights.pth";

/// File name of the periodic checkpoint for `epoch`.
pub fn periodic_checkpoint_name(epoch: usize, train_loss: f64, val_loss: f64) -> String {
    format!("ep{epoch:03}-loss{train_loss:.3}-val_loss{val_loss:.3}.pth")
}

/// Decides which of the periodic, best and last snapshots an epoch produces
/// and writes them.
#[derive(Clone, Debug)]
pub struct ModelCheckpoint {
    dirpath: PathBuf,
    save_period: usize,
    total_epochs: usize,
}

impl ModelCheckpoint {
    pub fn new(dirpath: impl Into<PathBuf>, save_period: usize, total_epochs: usize) -> Self {
        Self {
            dirpath: dirpath.into(),
            save_period,
            total_epochs,
        }
    }

    pub fn dirpath(&self) -> &Path {
        &self.dirpath
    }

    pub fn is_periodic(&self, epoch: usize) -> bool {
        epoch % self.save_period == 0 || epoch == self.total_epochs
    }

    /// `val_losses` must already contain the current epoch, so a tie with the
    /// previous minimum counts as a new best.
    pub fn is_best(val_loss: f64, val_losses: &[f64]) -> bool {
        if val_losses.len() <= 1 {
            return true;
        }
        let min = val_losses.iter().copied().fold(f64::INFINITY, f64::min);
        val_loss <= min
    }

    /// Writes the snapshots for `epoch` and returns their paths.
    pub fn save<M: SegmentationModel>(
        &self,
        model: &M,
        epoch: usize,
        train_loss: f64,
        val_loss: f64,
        val_losses: &[f64],
    ) -> Result<SavedCheckpoints> {
        std::fs::create_dir_all(&self.dirpath).map_err(|e| FitError::io(&self.dirpath, e))?;

        let periodic = if self.is_periodic(epoch) {
            let path = self
                .dirpath
                .join(periodic_checkpoint_name(epoch, train_loss, val_loss));
            self.write(model, &path)?;
            Some(path)
        } else {
            None
        };

        let best = if Self::is_best(val_loss, val_losses) {
            let path = self.dirpath.join(BEST_CHECKPOINT);
            self.write(model, &path)?;
            Some(path)
        } else {
            None
        };

        let last = self.dirpath.join(LAST_CHECKPOINT);
        self.write(model, &last)?;

        Ok(SavedCheckpoints {
            periodic,
            best,
            last,
        })
    }

    fn write<M: SegmentationModel>(&self, model: &M, path: &Path) -> Result<()> {
        model.save_weights(path)?;
        tracing::info!(path = %path.display(), "checkpoint saved");
        Ok(())
    }
}
