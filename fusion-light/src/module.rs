//! Collaborator traits driven by the epoch runner.

use candle::{Result, Tensor};
use candle_nn::Optimizer;
use std::path::Path;

/// A two-stream segmentation network.
pub trait SegmentationModel {
    /// Per-pixel class scores for a visible/infrared image pair.
    fn forward(&self, vi: &Tensor, ir: &Tensor) -> Result<Tensor>;

    /// Switch between training and evaluation behaviour (dropout, batch norm).
    fn set_training(&mut self, training: bool);

    /// Write a snapshot of all parameters to `path`.
    fn save_weights(&self, path: &Path) -> Result<()>;
}

/// Loss and metric functions. Each returns a scalar tensor.
pub trait SegmentationCriterion {
    /// Class-weighted pixel cross-entropy against the index map.
    fn cross_entropy(
        &self,
        outputs: &Tensor,
        pngs: &Tensor,
        weights: &Tensor,
        num_classes: usize,
    ) -> Result<Tensor>;

    /// Region-overlap loss against the one-hot label map.
    fn dice_loss(&self, outputs: &Tensor, labels: &Tensor) -> Result<Tensor>;

    /// Quality score; only ever reported, never optimized.
    fn f_score(&self, outputs: &Tensor, labels: &Tensor) -> Result<Tensor>;
}

pub trait EpochOptimizer {
    /// Clear accumulated gradients before a forward pass.
    fn zero_grad(&mut self) -> Result<()>;

    /// Backpropagate `loss` and apply one parameter update.
    fn backward_step(&mut self, loss: &Tensor) -> Result<()>;

    fn learning_rate(&self) -> f64;
}

/// Adapts a `candle_nn` optimizer such as `SGD` or `AdamW`.
///
/// Candle computes a fresh gradient store on every backward pass, so there
/// is nothing to clear in `zero_grad`.
pub struct CandleOptimizer<O> {
    inner: O,
}

impl<O: Optimizer> CandleOptimizer<O> {
    pub fn new(inner: O) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &O {
        &self.inner
    }

    pub fn inner_mut(&mut self) -> &mut O {
        &mut self.inner
    }

    pub fn into_inner(self) -> O {
        self.inner
    }
}

impl<O: Optimizer> EpochOptimizer for CandleOptimizer<O> {
    fn zero_grad(&mut self) -> Result<()> {
        Ok(())
    }

    fn backward_step(&mut self, loss: &Tensor) -> Result<()> {
        let grads = loss.backward()?;
        self.inner.step(&grads)
    }

    fn learning_rate(&self) -> f64 {
        self.inner.learning_rate()
    }
}
