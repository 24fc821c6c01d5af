//! Run configuration.

use crate::{FitError, Result};
use candle::Device;
use std::path::{Path, PathBuf};

#[derive(Clone, Debug)]
pub struct FitConfig {
    pub total_epochs: usize,
    /// Upper bound on training batches consumed per epoch.
    pub steps_train: usize,
    /// Upper bound on validation batches consumed per epoch.
    pub steps_val: usize,
    /// Write an `ep###-...` checkpoint every `save_period` epochs.
    pub save_period: usize,
    pub save_dir: PathBuf,
    pub device: Device,
    pub num_classes: usize,
    /// One weight per class for the pixel cross-entropy term.
    pub class_weights: Vec<f32>,
}

impl Default for FitConfig {
    fn default() -> Self {
        Self {
            total_epochs: 100,
            steps_train: 1,
            steps_val: 1,
            save_period: 5,
            save_dir: PathBuf::from("logs"),
            device: Device::Cpu,
            num_classes: 21,
            class_weights: vec![1.0; 21],
        }
    }
}

impl FitConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn total_epochs(mut self, epochs: usize) -> Self {
        self.total_epochs = epochs;
        self
    }

    pub fn steps(mut self, steps_train: usize, steps_val: usize) -> Self {
        self.steps_train = steps_train;
        self.steps_val = steps_val;
        self
    }

    /// Derives the step bounds from dataset lengths, dropping the last
    /// partial batch of each split.
    pub fn steps_from_lengths(
        self,
        num_train: usize,
        num_val: usize,
        batch_size: usize,
    ) -> Result<Self> {
        if batch_size == 0 {
            return Err(FitError::InvalidConfig("batch size must be positive".into()));
        }
        let steps_train = num_train / batch_size;
        let steps_val = num_val / batch_size;
        if steps_train == 0 || steps_val == 0 {
            return Err(FitError::InvalidConfig(format!(
                "dataset too small for batch size {batch_size}: {num_train} train / {num_val} val samples"
            )));
        }
        Ok(self.steps(steps_train, steps_val))
    }

    pub fn save_period(mut self, period: usize) -> Self {
        self.save_period = period;
        self
    }

    pub fn save_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.save_dir = dir.as_ref().to_path_buf();
        self
    }

    pub fn device(mut self, device: Device) -> Self {
        self.device = device;
        self
    }

    /// Sets the class count. Weights set earlier are kept when their length
    /// matches, otherwise every class gets weight 1.0.
    pub fn num_classes(mut self, num_classes: usize) -> Self {
        self.num_classes = num_classes;
        if self.class_weights.len() != num_classes {
            self.class_weights = vec![1.0; num_classes];
        }
        self
    }

    pub fn class_weights(mut self, weights: impl Into<Vec<f32>>) -> Self {
        self.class_weights = weights.into();
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.total_epochs == 0 {
            return Err(FitError::InvalidConfig("total_epochs must be positive".into()));
        }
        if self.steps_train == 0 || self.steps_val == 0 {
            return Err(FitError::InvalidConfig(format!(
                "step bounds must be positive (train={}, val={})",
                self.steps_train, self.steps_val
            )));
        }
        if self.save_period == 0 {
            return Err(FitError::InvalidConfig("save_period must be positive".into()));
        }
        if self.class_weights.len() != self.num_classes {
            return Err(FitError::InvalidConfig(format!(
                "{} class weights given for {} classes",
                self.class_weights.len(),
                self.num_classes
            )));
        }
        Ok(())
    }
}
