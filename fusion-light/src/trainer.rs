//! Epoch runner: one training pass, one validation pass, then bookkeeping.

use crate::batch::{DeviceContext, IntoBatch};
use crate::callbacks::{EvalCallback, ModelCheckpoint, BEST_CHECKPOINT};
use crate::history::LossRecord;
use crate::metrics::{EpochSummary, PhaseStats};
use crate::progress::{ProgressBarReporter, ProgressReporter};
use crate::{
    EpochOptimizer, FitConfig, FitError, Result, SegmentationCriterion, SegmentationModel,
};
use candle::{DType, Tensor};
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Phase {
    Train,
    Validation,
}

impl Phase {
    /// Only the training phase runs backward passes and optimizer steps.
    pub fn computes_gradients(self) -> bool {
        matches!(self, Phase::Train)
    }

    /// Label of the running loss in progress output.
    pub fn loss_key(self) -> &'static str {
        match self {
            Phase::Train => "total_loss",
            Phase::Validation => "val_loss",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Train => f.write_str("Train"),
            Phase::Validation => f.write_str("Validation"),
        }
    }
}

/// Everything an epoch reads from or writes to besides the batches.
pub struct FitSession<M, O, C, H, E> {
    pub model: M,
    pub optimizer: O,
    pub criterion: C,
    pub history: H,
    pub eval: E,
}

pub struct EpochRunner<R = ProgressBarReporter> {
    config: FitConfig,
    context: DeviceContext,
    checkpoint: ModelCheckpoint,
    reporter: R,
}

impl EpochRunner<ProgressBarReporter> {
    pub fn new(config: FitConfig) -> Result<Self> {
        Self::with_reporter(config, ProgressBarReporter::new())
    }
}

impl<R: ProgressReporter> EpochRunner<R> {
    pub fn with_reporter(config: FitConfig, reporter: R) -> Result<Self> {
        config.validate()?;
        let context = DeviceContext::new(config.device.clone(), &config.class_weights)?;
        let checkpoint = ModelCheckpoint::new(
            config.save_dir.clone(),
            config.save_period,
            config.total_epochs,
        );
        Ok(Self {
            config,
            context,
            checkpoint,
            reporter,
        })
    }

    pub fn config(&self) -> &FitConfig {
        &self.config
    }

    pub fn reporter(&self) -> &R {
        &self.reporter
    }

    pub fn reporter_mut(&mut self) -> &mut R {
        &mut self.reporter
    }

    /// Runs epochs `start_epoch + 1 ..= total_epochs`, asking `loader` for a
    /// fresh batch provider for every phase.
    pub fn fit<M, O, C, H, E, I, F>(
        &mut self,
        session: &mut FitSession<M, O, C, H, E>,
        start_epoch: usize,
        mut loader: F,
    ) -> Result<Vec<EpochSummary>>
    where
        M: SegmentationModel,
        O: EpochOptimizer,
        C: SegmentationCriterion,
        H: LossRecord,
        E: EvalCallback<M>,
        F: FnMut(Phase, usize) -> I,
        I: IntoIterator,
        I::Item: IntoBatch,
    {
        let mut summaries = Vec::new();
        for epoch in start_epoch + 1..=self.config.total_epochs {
            let train_batches = loader(Phase::Train, epoch);
            let val_batches = loader(Phase::Validation, epoch);
            summaries.push(self.run_epoch(epoch, session, train_batches, val_batches)?);
        }
        Ok(summaries)
    }

    /// Trains on up to `steps_train` batches, validates on up to `steps_val`
    /// batches, records the averaged losses, runs the evaluation hook and
    /// writes checkpoints. `epoch` is 1-based.
    pub fn run_epoch<M, O, C, H, E, T, V>(
        &mut self,
        epoch: usize,
        session: &mut FitSession<M, O, C, H, E>,
        train_batches: T,
        val_batches: V,
    ) -> Result<EpochSummary>
    where
        M: SegmentationModel,
        O: EpochOptimizer,
        C: SegmentationCriterion,
        H: LossRecord,
        E: EvalCallback<M>,
        T: IntoIterator,
        T::Item: IntoBatch,
        V: IntoIterator,
        V::Item: IntoBatch,
    {
        let total_epochs = self.config.total_epochs;
        if epoch == 0 || epoch > total_epochs {
            return Err(FitError::EpochOutOfRange {
                epoch,
                total_epochs,
            });
        }

        let train = self.run_phase(Phase::Train, epoch, session, train_batches)?;
        let val = self.run_phase(Phase::Validation, epoch, session, val_batches)?;

        let train_loss = train.average_loss(self.config.steps_train);
        let val_loss = val.average_loss(self.config.steps_val);

        session.history.append_loss(epoch, train_loss, val_loss)?;
        session.eval.on_epoch_end(epoch, &session.model)?;
        self.reporter
            .epoch_end(epoch, total_epochs, train_loss, val_loss);

        let checkpoints = self.checkpoint.save(
            &session.model,
            epoch,
            train_loss,
            val_loss,
            session.history.val_losses(),
        )?;
        if checkpoints.best.is_some() {
            self.reporter
                .note(&format!("Save best model to {BEST_CHECKPOINT}"));
        }

        Ok(EpochSummary {
            epoch,
            total_epochs,
            train_loss,
            val_loss,
            train_f_score: train.average_f_score(self.config.steps_train),
            val_f_score: val.average_f_score(self.config.steps_val),
            train_batches: train.batches,
            val_batches: val.batches,
            checkpoints,
        })
    }

    fn run_phase<M, O, C, H, E, I>(
        &mut self,
        phase: Phase,
        epoch: usize,
        session: &mut FitSession<M, O, C, H, E>,
        batches: I,
    ) -> Result<PhaseStats>
    where
        M: SegmentationModel,
        O: EpochOptimizer,
        C: SegmentationCriterion,
        I: IntoIterator,
        I::Item: IntoBatch,
    {
        let steps = match phase {
            Phase::Train => self.config.steps_train,
            Phase::Validation => self.config.steps_val,
        };
        let grad = phase.computes_gradients();
        let _span = tracing::trace_span!("phase", %phase, epoch).entered();

        session.model.set_training(grad);
        self.reporter
            .phase_start(phase, epoch, self.config.total_epochs, steps);

        let mut stats = PhaseStats::new();
        for item in batches.into_iter().take(steps) {
            let batch = self.context.prepare(item.into_batch()?)?;

            if grad {
                session.optimizer.zero_grad()?;
            }
            let outputs = session.model.forward(&batch.vi, &batch.ir)?;
            let outputs = if grad { outputs } else { outputs.detach() };

            let ce = session.criterion.cross_entropy(
                &outputs,
                &batch.pngs,
                self.context.class_weights(),
                self.config.num_classes,
            )?;
            let dice = session.criterion.dice_loss(&outputs, &batch.labels)?;
            let loss = ce.broadcast_add(&dice)?;
            let f_score = session.criterion.f_score(&outputs.detach(), &batch.labels)?;

            if grad {
                session.optimizer.backward_step(&loss)?;
            }

            stats.update(scalar(&loss)?, scalar(&f_score)?);
            self.reporter
                .batch_end(phase, &stats, session.optimizer.learning_rate());
        }
        self.reporter.phase_end(phase);

        if stats.batches < steps {
            tracing::warn!(
                %phase,
                epoch,
                batches = stats.batches,
                steps,
                "batch provider ran out before the step bound"
            );
        }
        Ok(stats)
    }
}

fn scalar(t: &Tensor) -> candle::Result<f64> {
    t.sum_all()?.to_dtype(DType::F64)?.to_scalar::<f64>()
}
