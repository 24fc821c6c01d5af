use anyhow::Result;
use candle::{Device, Tensor};
use fusion_light::callbacks::{periodic_checkpoint_name, BEST_CHECKPOINT, LAST_CHECKPOINT};
use fusion_light::{LossHistory, LossRecord, ModelCheckpoint, SegmentationModel};
use std::path::Path;

/// Snapshot is a 4-vector filled with `value`.
struct ConstModel {
    value: f32,
}

impl SegmentationModel for ConstModel {
    fn forward(&self, vi: &Tensor, _ir: &Tensor) -> candle::Result<Tensor> {
        Ok(vi.clone())
    }

    fn set_training(&mut self, _training: bool) {}

    fn save_weights(&self, path: &Path) -> candle::Result<()> {
        Tensor::full(self.value, 4, &Device::Cpu)?.save_safetensors("w", path)
    }
}

#[test]
fn periodic_name_embeds_epoch_and_losses() {
    assert_eq!(
        periodic_checkpoint_name(3, 0.12345, 1.5),
        "ep003-loss0.123-val_loss1.500.pth"
    );
    assert_eq!(
        periodic_checkpoint_name(120, 2.0, 0.0126),
        "ep120-loss2.000-val_loss0.013.pth"
    );
}

#[test]
fn periodic_on_multiples_and_final_epoch() {
    let ckpt = ModelCheckpoint::new("unused", 5, 12);
    let periodic: Vec<_> = (1..=12).filter(|&e| ckpt.is_periodic(e)).collect();
    assert_eq!(periodic, vec![5, 10, 12]);

    let every = ModelCheckpoint::new("unused", 1, 3);
    assert!((1..=3).all(|e| every.is_periodic(e)));
}

#[test]
fn best_against_history_including_current_epoch() {
    assert!(ModelCheckpoint::is_best(0.5, &[0.5]));
    assert!(ModelCheckpoint::is_best(0.3, &[0.5, 0.3]));
    assert!(!ModelCheckpoint::is_best(0.4, &[0.5, 0.3, 0.4]));
    assert!(ModelCheckpoint::is_best(0.3, &[0.5, 0.3, 0.4, 0.3]));
    assert!(!ModelCheckpoint::is_best(f64::NAN, &[0.5, f64::NAN]));
}

#[test]
fn save_creates_directory_and_overwrites_last() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let save_dir = dir.path().join("nested").join("weights");
    let ckpt = ModelCheckpoint::new(&save_dir, 2, 4);
    let mut history = LossHistory::new();

    history.append_loss(1, 0.9, 0.8)?;
    let first = ckpt.save(&ConstModel { value: 1.0 }, 1, 0.9, 0.8, history.val_losses())?;
    let loaded = candle::safetensors::load(save_dir.join(LAST_CHECKPOINT), &Device::Cpu)?;
    assert_eq!(loaded["w"].to_vec1::<f32>()?, vec![1.0; 4]);
    assert!(first.periodic.is_none());
    assert_eq!(first.best, Some(save_dir.join(BEST_CHECKPOINT)));
    assert_eq!(first.last, save_dir.join(LAST_CHECKPOINT));

    history.append_loss(2, 0.7, 0.85)?;
    let second = ckpt.save(&ConstModel { value: 2.0 }, 2, 0.7, 0.85, history.val_losses())?;
    assert_eq!(
        second.periodic,
        Some(save_dir.join("ep002-loss0.700-val_loss0.850.pth"))
    );
    assert!(second.best.is_none());

    let mut names: Vec<_> = std::fs::read_dir(&save_dir)?
        .map(|e| e.map(|e| e.file_name().to_string_lossy().into_owned()))
        .collect::<std::io::Result<_>>()?;
    names.sort();
    assert_eq!(
        names,
        vec![
            BEST_CHECKPOINT.to_string(),
            "ep002-loss0.700-val_loss0.850.pth".to_string(),
            LAST_CHECKPOINT.to_string(),
        ]
    );

    let last = candle::safetensors::load(save_dir.join(LAST_CHECKPOINT), &Device::Cpu)?;
    assert_eq!(last["w"].to_vec1::<f32>()?, vec![2.0; 4]);
    // best was not rewritten in epoch 2
    let best = candle::safetensors::load(save_dir.join(BEST_CHECKPOINT), &Device::Cpu)?;
    assert_eq!(best["w"].to_vec1::<f32>()?, vec![1.0; 4]);
    Ok(())
}
