//! Epoch-end hooks.

mod checkpoint;

pub use checkpoint::{
    periodic_checkpoint_name, ModelCheckpoint, BEST_CHECKPOINT, LAST_CHECKPOINT,
};

use candle::Result;

/// Evaluation hook run once per epoch, after the loss history is updated.
pub trait EvalCallback<M> {
    fn on_epoch_end(&mut self, epoch: usize, model: &M) -> Result<()>;
}

/// Skips evaluation entirely.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoEval;

impl<M> EvalCallback<M> for NoEval {
    fn on_epoch_end(&mut self, _epoch: usize, _model: &M) -> Result<()> {
        Ok(())
    }
}

impl<M, F> EvalCallback<M> for F
where
    F: FnMut(usize, &M) -> Result<()>,
{
    fn on_epoch_end(&mut self, epoch: usize, model: &M) -> Result<()> {
        self(epoch, model)
    }
}
