use anyhow::Result;
use candle::{DType, Device, Tensor};
use fusion_light::{
    Batch, DeviceContext, FitConfig, FitError, LossHistory, LossRecord, PhaseStats,
};

#[test]
fn default_config_is_valid() {
    FitConfig::default().validate().unwrap();
}

#[test]
fn rejects_degenerate_settings() {
    let invalid = [
        FitConfig::new().total_epochs(0),
        FitConfig::new().steps(0, 1),
        FitConfig::new().steps(1, 0),
        FitConfig::new().save_period(0),
        FitConfig::new().num_classes(3).class_weights(vec![1.0, 2.0]),
    ];
    for config in invalid {
        assert!(matches!(config.validate(), Err(FitError::InvalidConfig(_))));
    }
}

#[test]
fn num_classes_resets_weights() {
    let config = FitConfig::new().num_classes(4);
    assert_eq!(config.class_weights, vec![1.0; 4]);
    config.validate().unwrap();
}

#[test]
fn num_classes_keeps_matching_weights() {
    let config = FitConfig::new()
        .class_weights(vec![1.0, 2.0, 0.5])
        .num_classes(3);
    assert_eq!(config.class_weights, vec![1.0, 2.0, 0.5]);

    let resized = config.num_classes(2);
    assert_eq!(resized.class_weights, vec![1.0; 2]);
}

#[test]
fn steps_from_dataset_lengths() -> Result<()> {
    let config = FitConfig::new().steps_from_lengths(1000, 130, 16)?;
    assert_eq!((config.steps_train, config.steps_val), (62, 8));

    let err = FitConfig::new().steps_from_lengths(100, 10, 16).unwrap_err();
    assert!(matches!(err, FitError::InvalidConfig(_)));
    assert!(FitConfig::new().steps_from_lengths(100, 100, 0).is_err());
    Ok(())
}

#[test]
fn phase_stats_running_and_epoch_averages() {
    let mut stats = PhaseStats::new();
    assert_eq!(stats.running_loss(), 0.0);

    stats.update(1.0, 0.2);
    stats.update(2.0, 0.4);
    assert_eq!(stats.batches, 2);
    assert!((stats.running_loss() - 1.5).abs() < 1e-12);
    assert!((stats.running_f_score() - 0.3).abs() < 1e-12);
    assert!((stats.average_loss(4) - 0.75).abs() < 1e-12);
    assert!((stats.average_f_score(4) - 0.15).abs() < 1e-12);
}

#[test]
fn loss_history_mirrors_to_log_dir() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let log_dir = dir.path().join("loss_2024");
    let mut history = LossHistory::with_log_dir(&log_dir);

    history.append_loss(1, 0.9, 1.1)?;
    history.append_loss(2, 0.6, 0.7)?;

    assert_eq!(history.epochs(), &[1, 2]);
    assert_eq!(history.train_losses(), &[0.9, 0.6]);
    assert_eq!(history.val_losses(), &[1.1, 0.7]);
    assert_eq!(history.best_val_loss(), Some(0.7));

    let train = std::fs::read_to_string(log_dir.join("epoch_loss.txt"))?;
    let val = std::fs::read_to_string(log_dir.join("epoch_val_loss.txt"))?;
    assert_eq!(train, "0.9\n0.6\n");
    assert_eq!(val, "1.1\n0.7\n");
    Ok(())
}

#[test]
fn failed_log_write_leaves_history_untouched() -> Result<()> {
    let dir = tempfile::tempdir()?;
    // A directory where the validation log should be makes its open fail.
    std::fs::create_dir_all(dir.path().join("epoch_val_loss.txt"))?;
    let mut history = LossHistory::with_log_dir(dir.path());

    let err = history.append_loss(1, 0.9, 1.1).unwrap_err();

    assert!(matches!(err, FitError::Io { .. }));
    assert!(history.is_empty());
    let train = std::fs::read_to_string(dir.path().join("epoch_loss.txt"))?;
    assert_eq!(train, "");
    Ok(())
}

#[test]
fn empty_history_has_no_best() {
    let history = LossHistory::new();
    assert!(history.is_empty());
    assert_eq!(history.best_val_loss(), None);
}

#[test]
fn device_context_places_batch_and_weights() -> Result<()> {
    let ctx = DeviceContext::new(Device::Cpu, &[1.0, 0.5, 2.0])?;
    assert_eq!(ctx.class_weights().to_vec1::<f32>()?, vec![1.0, 0.5, 2.0]);

    let dev = Device::Cpu;
    let batch = Batch::new(
        Tensor::zeros((2, 3, 8, 8), DType::F32, &dev)?,
        Tensor::zeros((2, 1, 8, 8), DType::F32, &dev)?,
        Tensor::zeros((2, 8, 8), DType::U32, &dev)?,
        Tensor::zeros((2, 3, 8, 8), DType::F32, &dev)?,
    );
    let placed = ctx.prepare(batch)?;
    assert!(placed.vi.device().same_device(ctx.device()));
    assert_eq!(placed.batch_size()?, 2);
    Ok(())
}

#[test]
fn batch_size_mismatch_is_reported() -> Result<()> {
    let dev = Device::Cpu;
    let batch = Batch::new(
        Tensor::zeros((2, 3, 8, 8), DType::F32, &dev)?,
        Tensor::zeros((2, 1, 8, 8), DType::F32, &dev)?,
        Tensor::zeros((2, 8, 8), DType::U32, &dev)?,
        Tensor::zeros((1, 3, 8, 8), DType::F32, &dev)?,
    );
    let err = batch.batch_size().unwrap_err();
    assert!(matches!(
        err,
        FitError::BatchShape {
            vi: 2,
            ir: 2,
            pngs: 2,
            labels: 1
        }
    ));
    Ok(())
}
