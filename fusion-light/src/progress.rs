//! Progress reporting.
//!
//! The runner reports through [`ProgressReporter`] only; swapping the
//! reporter never changes the numbers it computes.

use crate::metrics::PhaseStats;
use crate::Phase;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

pub trait ProgressReporter {
    fn phase_start(&mut self, _phase: Phase, _epoch: usize, _total_epochs: usize, _steps: usize) {}

    /// Called after every batch with the running sums of the current phase.
    fn batch_end(&mut self, _phase: Phase, _stats: &PhaseStats, _lr: f64) {}

    fn phase_end(&mut self, _phase: Phase) {}

    fn epoch_end(&mut self, _epoch: usize, _total_epochs: usize, _train_loss: f64, _val_loss: f64) {}

    fn note(&mut self, _message: &str) {}
}

impl<R: ProgressReporter + ?Sized> ProgressReporter for Box<R> {
    fn phase_start(&mut self, phase: Phase, epoch: usize, total_epochs: usize, steps: usize) {
        (**self).phase_start(phase, epoch, total_epochs, steps)
    }

    fn batch_end(&mut self, phase: Phase, stats: &PhaseStats, lr: f64) {
        (**self).batch_end(phase, stats, lr)
    }

    fn phase_end(&mut self, phase: Phase) {
        (**self).phase_end(phase)
    }

    fn epoch_end(&mut self, epoch: usize, total_epochs: usize, train_loss: f64, val_loss: f64) {
        (**self).epoch_end(epoch, total_epochs, train_loss, val_loss)
    }

    fn note(&mut self, message: &str) {
        (**self).note(message)
    }
}

/// Reports nothing.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullReporter;

impl ProgressReporter for NullReporter {}

/// Terminal progress bars on stdout, one per phase.
#[derive(Default)]
pub struct ProgressBarReporter {
    bar: Option<ProgressBar>,
}

impl ProgressBarReporter {
    pub fn new() -> Self {
        Self::default()
    }

    fn style() -> ProgressStyle {
        ProgressStyle::with_template("{prefix}: {percent:>3}%|{bar:30}| {pos}/{len} [{elapsed_precise}<{eta_precise}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("##-")
    }
}

impl ProgressReporter for ProgressBarReporter {
    fn phase_start(&mut self, phase: Phase, epoch: usize, total_epochs: usize, steps: usize) {
        println!("Start {phase}");
        let bar = ProgressBar::with_draw_target(Some(steps as u64), ProgressDrawTarget::stdout());
        bar.set_style(Self::style());
        bar.set_prefix(format!("Epoch {epoch}/{total_epochs}"));
        self.bar = Some(bar);
    }

    fn batch_end(&mut self, phase: Phase, stats: &PhaseStats, lr: f64) {
        if let Some(bar) = &self.bar {
            bar.set_message(format!(
                "{}={:.4}, f_score={:.4}, lr={lr:.2e}",
                phase.loss_key(),
                stats.running_loss(),
                stats.running_f_score(),
            ));
            bar.inc(1);
        }
    }

    fn phase_end(&mut self, phase: Phase) {
        if let Some(bar) = self.bar.take() {
            bar.finish();
        }
        println!("Finish {phase}");
    }

    fn epoch_end(&mut self, epoch: usize, total_epochs: usize, train_loss: f64, val_loss: f64) {
        println!("Epoch:{epoch}/{total_epochs}");
        println!("Total Loss: {train_loss:.3} || Val Loss: {val_loss:.3} ");
    }

    fn note(&mut self, message: &str) {
        match &self.bar {
            Some(bar) => bar.println(message),
            None => println!("{message}"),
        }
    }
}

/// Emits the same information as `tracing` events.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogReporter;

impl ProgressReporter for LogReporter {
    fn phase_start(&mut self, phase: Phase, epoch: usize, total_epochs: usize, steps: usize) {
        tracing::info!(%phase, epoch, total_epochs, steps, "phase started");
    }

    fn batch_end(&mut self, phase: Phase, stats: &PhaseStats, lr: f64) {
        tracing::debug!(
            %phase,
            batch = stats.batches,
            loss = stats.running_loss(),
            f_score = stats.running_f_score(),
            lr,
            "batch finished"
        );
    }

    fn phase_end(&mut self, phase: Phase) {
        tracing::info!(%phase, "phase finished");
    }

    fn epoch_end(&mut self, epoch: usize, total_epochs: usize, train_loss: f64, val_loss: f64) {
        tracing::info!(epoch, total_epochs, train_loss, val_loss, "epoch finished");
    }

    fn note(&mut self, message: &str) {
        tracing::info!("{message}");
    }
}
