//! Single-epoch training and validation for visible/infrared fusion
//! segmentation networks on Candle.

pub mod batch;
pub mod callbacks;
pub mod config;
pub mod error;
pub mod history;
pub mod metrics;
pub mod module;
pub mod progress;
pub mod trainer;

pub use batch::{Batch, DeviceContext, IntoBatch};
pub use callbacks::{EvalCallback, ModelCheckpoint, NoEval};
pub use config::FitConfig;
pub use error::{FitError, Result};
pub use history::{LossHistory, LossRecord};
pub use metrics::{EpochSummary, PhaseStats, SavedCheckpoints};
pub use module::{CandleOptimizer, EpochOptimizer, SegmentationCriterion, SegmentationModel};
pub use progress::{LogReporter, NullReporter, ProgressBarReporter, ProgressReporter};
pub use trainer::{EpochRunner, FitSession, Phase};
