//! Loss and f-score bookkeeping for one epoch.

use std::path::PathBuf;

/// Running sums for a single phase; reset by constructing a new value.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PhaseStats {
    pub total_loss: f64,
    pub total_f_score: f64,
    pub batches: usize,
}

impl PhaseStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, loss: f64, f_score: f64) {
        self.total_loss += loss;
        self.total_f_score += f_score;
        self.batches += 1;
    }

    /// Mean loss over the batches seen so far.
    pub fn running_loss(&self) -> f64 {
        if self.batches == 0 {
            0.0
        } else {
            self.total_loss / self.batches as f64
        }
    }

    pub fn running_f_score(&self) -> f64 {
        if self.batches == 0 {
            0.0
        } else {
            self.total_f_score / self.batches as f64
        }
    }

    /// Loss sum divided by the configured step bound, not by the number of
    /// batches actually seen.
    pub fn average_loss(&self, steps: usize) -> f64 {
        self.total_loss / steps as f64
    }

    pub fn average_f_score(&self, steps: usize) -> f64 {
        self.total_f_score / steps as f64
    }
}

/// Checkpoint files written at the end of an epoch.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SavedCheckpoints {
    pub periodic: Option<PathBuf>,
    pub best: Option<PathBuf>,
    pub last: PathBuf,
}

#[derive(Clone, Debug, PartialEq)]
pub struct EpochSummary {
    /// 1-based epoch number.
    pub epoch: usize,
    pub total_epochs: usize,
    pub train_loss: f64,
    pub val_loss: f64,
    pub train_f_score: f64,
    pub val_f_score: f64,
    pub train_batches: usize,
    pub val_batches: usize,
    pub checkpoints: SavedCheckpoints,
}
