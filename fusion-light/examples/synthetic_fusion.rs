// Trains a two-stream 1x1-conv network on synthetic visible/infrared pairs
// where the class of every pixel is readable from the infrared intensity.
use candle::{DType, Device, Result, Tensor, D};
use candle_nn::{Conv2d, Module, Optimizer, VarBuilder, VarMap};
use fusion_light::{
    Batch, CandleOptimizer, EpochRunner, FitConfig, FitSession, LossHistory, Phase,
    SegmentationCriterion, SegmentationModel,
};
use std::path::Path;

const CLASSES: usize = 3;
const BATCH_SIZE: usize = 4;
const SIDE: usize = 16;

struct FusionNet {
    vi: Conv2d,
    ir: Conv2d,
    head: Conv2d,
    varmap: VarMap,
}

impl FusionNet {
    fn new(dev: &Device) -> Result<Self> {
        let varmap = VarMap::new();
        let vs = VarBuilder::from_varmap(&varmap, DType::F32, dev);
        let vi = candle_nn::conv2d(3, 8, 1, Default::default(), vs.pp("vi"))?;
        let ir = candle_nn::conv2d(1, 8, 1, Default::default(), vs.pp("ir"))?;
        let head = candle_nn::conv2d(8, CLASSES, 1, Default::default(), vs.pp("head"))?;
        Ok(Self {
            vi,
            ir,
            head,
            varmap,
        })
    }
}

impl SegmentationModel for FusionNet {
    fn forward(&self, vi: &Tensor, ir: &Tensor) -> Result<Tensor> {
        let fused = self.vi.forward(vi)?.add(&self.ir.forward(ir)?)?.relu()?;
        self.head.forward(&fused)
    }

    fn set_training(&mut self, _training: bool) {}

    fn save_weights(&self, path: &Path) -> Result<()> {
        self.varmap.save(path)
    }
}

struct CeDice;

impl SegmentationCriterion for CeDice {
    fn cross_entropy(
        &self,
        outputs: &Tensor,
        pngs: &Tensor,
        weights: &Tensor,
        num_classes: usize,
    ) -> Result<Tensor> {
        let logits = outputs.permute((0, 2, 3, 1))?.reshape(((), num_classes))?;
        let targets = pngs.flatten_all()?;
        let log_p = candle_nn::ops::log_softmax(&logits, D::Minus1)?;
        let picked = log_p.gather(&targets.unsqueeze(1)?, 1)?.squeeze(1)?;
        let w = weights.index_select(&targets, 0)?;
        picked.mul(&w)?.sum_all()?.neg()?.div(&w.sum_all()?)
    }

    fn dice_loss(&self, outputs: &Tensor, labels: &Tensor) -> Result<Tensor> {
        self.f_score(outputs, labels)?.affine(-1., 1.)
    }

    fn f_score(&self, outputs: &Tensor, labels: &Tensor) -> Result<Tensor> {
        let p = candle_nn::ops::softmax(outputs, 1)?;
        let tp = p.mul(labels)?.sum_all()?;
        let denom = p.sum_all()?.add(&labels.sum_all()?)?.affine(1., 1e-5)?;
        tp.affine(2., 1e-5)?.div(&denom)
    }
}

fn synthetic_batch(dev: &Device) -> Result<Batch> {
    let vi = Tensor::randn(0f32, 1., (BATCH_SIZE, 3, SIDE, SIDE), dev)?;
    let ir = Tensor::rand(0f32, CLASSES as f32, (BATCH_SIZE, 1, SIDE, SIDE), dev)?;
    let pngs = ir.floor()?.clamp(0f32, (CLASSES - 1) as f32)?.squeeze(1)?.to_dtype(DType::U32)?;
    let labels = candle_nn::encoding::one_hot(pngs.clone(), CLASSES, 1f32, 0f32)?
        .permute((0, 3, 1, 2))?
        .contiguous()?;
    Ok(Batch::new(vi, ir, pngs, labels))
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let dev = Device::cuda_if_available(0)?;
    println!("Using device: {:?}", dev);

    let save_dir = std::env::temp_dir().join("fusion-light-demo");
    let config = FitConfig::new()
        .total_epochs(10)
        .steps_from_lengths(20 * BATCH_SIZE, 4 * BATCH_SIZE, BATCH_SIZE)?
        .save_period(5)
        .save_dir(&save_dir)
        .device(dev.clone())
        .num_classes(CLASSES)
        .class_weights(vec![1.0, 1.0, 2.0]);

    let model = FusionNet::new(&dev)?;
    let params = candle_nn::ParamsAdamW {
        lr: 0.01,
        ..Default::default()
    };
    let optimizer = candle_nn::AdamW::new(model.varmap.all_vars(), params)?;

    let mut session = FitSession {
        model,
        optimizer: CandleOptimizer::new(optimizer),
        criterion: CeDice,
        history: LossHistory::with_log_dir(save_dir.join("loss")),
        eval: |epoch: usize, _model: &FusionNet| -> Result<()> {
            tracing::info!(epoch, "evaluation hook");
            Ok(())
        },
    };

    let mut runner = EpochRunner::new(config)?;
    let steps = (runner.config().steps_train, runner.config().steps_val);
    runner.fit(&mut session, 0, |phase, _epoch| {
        let n = match phase {
            Phase::Train => steps.0,
            Phase::Validation => steps.1,
        };
        (0..n).map(|_| synthetic_batch(&dev)).collect::<Vec<_>>()
    })?;

    println!(
        "best val loss {:.4}, checkpoints in {}",
        session.history.best_val_loss().unwrap_or(f64::NAN),
        save_dir.display()
    );
    Ok(())
}
