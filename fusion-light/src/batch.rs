//! Training batches and device placement.

use crate::{FitError, Result};
use candle::{Device, Tensor};

/// One batch of co-registered samples.
#[derive(Clone, Debug)]
pub struct Batch {
    /// Visible-light images.
    pub vi: Tensor,
    /// Infrared images.
    pub ir: Tensor,
    /// Integer class index per pixel, consumed by the cross-entropy term.
    pub pngs: Tensor,
    /// One-hot (or soft) label map, consumed by the dice loss and f-score.
    pub labels: Tensor,
}

impl Batch {
    pub fn new(vi: Tensor, ir: Tensor, pngs: Tensor, labels: Tensor) -> Self {
        Self {
            vi,
            ir,
            pngs,
            labels,
        }
    }

    /// Leading dimension shared by all four tensors.
    pub fn batch_size(&self) -> Result<usize> {
        let vi = self.vi.dim(0)?;
        let ir = self.ir.dim(0)?;
        let pngs = self.pngs.dim(0)?;
        let labels = self.labels.dim(0)?;
        if vi != ir || vi != pngs || vi != labels {
            return Err(FitError::BatchShape {
                vi,
                ir,
                pngs,
                labels,
            });
        }
        Ok(vi)
    }

    pub fn to_device(&self, device: &Device) -> candle::Result<Self> {
        Ok(Self {
            vi: self.vi.to_device(device)?,
            ir: self.ir.to_device(device)?,
            pngs: self.pngs.to_device(device)?,
            labels: self.labels.to_device(device)?,
        })
    }
}

/// Items a batch provider may yield.
pub trait IntoBatch {
    fn into_batch(self) -> candle::Result<Batch>;
}

impl IntoBatch for Batch {
    fn into_batch(self) -> candle::Result<Batch> {
        Ok(self)
    }
}

impl IntoBatch for candle::Result<Batch> {
    fn into_batch(self) -> candle::Result<Batch> {
        self
    }
}

/// Target device plus the class-weight tensor already living on it.
#[derive(Clone, Debug)]
pub struct DeviceContext {
    device: Device,
    class_weights: Tensor,
}

impl DeviceContext {
    pub fn new(device: Device, class_weights: &[f32]) -> candle::Result<Self> {
        let class_weights = Tensor::new(class_weights, &device)?;
        Ok(Self {
            device,
            class_weights,
        })
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    pub fn class_weights(&self) -> &Tensor {
        &self.class_weights
    }

    /// Moves every tensor of `batch` onto the target device.
    pub fn prepare(&self, batch: Batch) -> Result<Batch> {
        batch.batch_size()?;
        Ok(batch.to_device(&self.device)?)
    }
}
