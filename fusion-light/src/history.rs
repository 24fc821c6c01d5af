//! Per-epoch loss log.

use crate::{FitError, Result};
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Append-only record of epoch losses.
pub trait LossRecord {
    fn append_loss(&mut self, epoch: usize, train_loss: f64, val_loss: f64) -> Result<()>;

    /// Validation losses of every recorded epoch, oldest first.
    fn val_losses(&self) -> &[f64];
}

/// In-memory loss history, optionally mirrored to text files.
///
/// With a log directory every append adds one line to `epoch_loss.txt` and
/// `epoch_val_loss.txt`.
#[derive(Clone, Debug, Default)]
pub struct LossHistory {
    epochs: Vec<usize>,
    train_losses: Vec<f64>,
    val_losses: Vec<f64>,
    log_dir: Option<PathBuf>,
}

impl LossHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_log_dir(dir: impl AsRef<Path>) -> Self {
        Self {
            log_dir: Some(dir.as_ref().to_path_buf()),
            ..Self::default()
        }
    }

    pub fn epochs(&self) -> &[usize] {
        &self.epochs
    }

    pub fn train_losses(&self) -> &[f64] {
        &self.train_losses
    }

    pub fn len(&self) -> usize {
        self.epochs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.epochs.is_empty()
    }

    /// Smallest validation loss recorded so far.
    pub fn best_val_loss(&self) -> Option<f64> {
        self.val_losses.iter().copied().reduce(f64::min)
    }

    pub fn log_dir(&self) -> Option<&Path> {
        self.log_dir.as_deref()
    }

    fn open_log(dir: &Path, file: &str) -> Result<(PathBuf, File)> {
        let path = dir.join(file);
        let f = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| FitError::io(&path, e))?;
        Ok((path, f))
    }
}

impl LossRecord for LossHistory {
    fn append_loss(&mut self, epoch: usize, train_loss: f64, val_loss: f64) -> Result<()> {
        if let Some(dir) = &self.log_dir {
            fs::create_dir_all(dir).map_err(|e| FitError::io(dir, e))?;
            // Both files are opened before either is written so they stay aligned.
            let (train_path, mut train_file) = Self::open_log(dir, "epoch_loss.txt")?;
            let (val_path, mut val_file) = Self::open_log(dir, "epoch_val_loss.txt")?;
            let train_line = format!("{train_loss}\n");
            let val_line = format!("{val_loss}\n");
            train_file
                .write_all(train_line.as_bytes())
                .map_err(|e| FitError::io(&train_path, e))?;
            val_file
                .write_all(val_line.as_bytes())
                .map_err(|e| FitError::io(&val_path, e))?;
        }
        self.epochs.push(epoch);
        self.train_losses.push(train_loss);
        self.val_losses.push(val_loss);
        Ok(())
    }

    fn val_losses(&self) -> &[f64] {
        &self.val_losses
    }
}
