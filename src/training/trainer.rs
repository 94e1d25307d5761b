//! Training loop implementation for DCGAN
//!
//! Each step makes one discriminator update on a combined [fake; real] batch
//! followed by one composite update that moves the generator only. Loop state
//! lives in `TrainState`, so a run can be resumed from a checkpoint.

use std::ops::Range;

use indicatif::{ProgressBar, ProgressStyle};
use tch::Tensor;
use tracing::{info, warn};

use super::labels::{adversarial_targets, discriminator_labels, LabelConfig};
use super::losses::discriminator_loss;
use super::metrics::TrainingMetrics;
use super::optim::{ParamOptimizer, RmsPropConfig};
use super::sink::{CheckpointEvent, TrainingSink};
use crate::data::transforms::{expect_image_batch, expect_shape};
use crate::data::{batch_to_tensor, DatasetCursor, ImageDataset};
use crate::error::{Error, Result};
use crate::model::{Adversarial, DCGAN};

/// Steps averaged by the mode-collapse check
const COLLAPSE_WINDOW: usize = 100;

/// Training configuration
#[derive(Debug, Clone)]
pub struct TrainingConfig {
    /// Total number of steps
    pub iterations: usize,
    /// Real (and generated) images per step
    pub batch_size: usize,
    /// Discriminator optimizer
    pub disc_optim: RmsPropConfig,
    /// Composite optimizer
    pub gan_optim: RmsPropConfig,
    /// Label values and jitter
    pub labels: LabelConfig,
    /// Checkpoint every N steps
    pub checkpoint_every: usize,
    /// Draw a progress bar
    pub show_progress: bool,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            iterations: 10_000,
            batch_size: 20,
            disc_optim: RmsPropConfig::with_lr(8e-4),
            gan_optim: RmsPropConfig::with_lr(4e-4),
            labels: LabelConfig::default(),
            checkpoint_every: 100,
            show_progress: true,
        }
    }
}

impl TrainingConfig {
    /// Validate loop settings
    pub fn validate(&self) -> Result<()> {
        if self.iterations == 0 || self.batch_size == 0 || self.checkpoint_every == 0 {
            return Err(Error::Config(
                "iterations, batch_size and checkpoint_every must be > 0".to_string(),
            ));
        }
        self.disc_optim.validate()?;
        self.gan_optim.validate()?;
        self.labels.validate()
    }
}

/// Mutable loop state
#[derive(Debug, Clone)]
pub struct TrainState {
    /// Completed steps
    pub step: usize,
    /// Position of the next real batch
    pub cursor: DatasetCursor,
    /// Discriminator loss of the latest step
    pub last_disc_loss: Option<f64>,
    /// Adversarial loss of the latest step
    pub last_gan_loss: Option<f64>,
}

impl TrainState {
    /// Fresh state at step 0, cursor at the first image
    pub fn new(dataset_len: usize, batch_size: usize) -> Result<Self> {
        Self::resume(dataset_len, batch_size, 0, 0)
    }

    /// State continuing after `step` completed steps with the cursor at `offset`
    pub fn resume(dataset_len: usize, batch_size: usize, step: usize, offset: usize) -> Result<Self> {
        Ok(Self {
            step,
            cursor: DatasetCursor::with_offset(dataset_len, batch_size, offset)?,
            last_disc_loss: None,
            last_gan_loss: None,
        })
    }
}

/// Result of one training step
pub struct StepOutcome {
    /// Discriminator loss
    pub disc_loss: f64,
    /// Adversarial loss
    pub gan_loss: f64,
    /// Rows of the combined discriminator batch
    pub combined_batch: i64,
    /// Combined [generated; real] batch seen by the discriminator update
    pub combined: Tensor,
    /// Latent vectors behind the generated half
    pub disc_latent: Tensor,
    /// Fresh latent vectors used by the composite update
    pub gan_latent: Tensor,
    /// Generated half of the combined batch, NHWC
    pub generated: Tensor,
    /// Real half of the combined batch, NHWC
    pub real: Tensor,
    /// Dataset indices of the real half
    pub window: Range<usize>,
}

/// DCGAN Trainer
pub struct Trainer {
    config: TrainingConfig,
    disc_optimizer: ParamOptimizer,
    adversarial: Adversarial,
    metrics: TrainingMetrics,
}

impl Trainer {
    /// Create a trainer with one optimizer per parameter group of `model`
    pub fn new(config: TrainingConfig, model: &DCGAN) -> Result<Self> {
        config.validate()?;
        let disc_optimizer = ParamOptimizer::rmsprop(&model.disc_vs, config.disc_optim)?;
        let adversarial = Adversarial::new(model, config.gan_optim)?;

        Ok(Self {
            config,
            disc_optimizer,
            adversarial,
            metrics: TrainingMetrics::new(),
        })
    }

    /// Continue recording into previously saved metrics (used when resuming)
    pub fn with_metrics(mut self, metrics: TrainingMetrics) -> Self {
        self.metrics = metrics;
        self
    }

    /// Train the DCGAN model from step 0
    ///
    /// # Arguments
    ///
    /// * `model` - DCGAN model to train
    /// * `dataset` - Real images, read through a wrap-around cursor
    /// * `sink` - Receives every checkpoint interval
    ///
    /// # Returns
    ///
    /// Training metrics
    pub fn train(
        &mut self,
        model: &mut DCGAN,
        dataset: &ImageDataset,
        sink: &mut dyn TrainingSink,
    ) -> Result<&TrainingMetrics> {
        let mut state = TrainState::new(dataset.len(), self.config.batch_size)?;
        self.run(model, dataset, &mut state, sink)
    }

    /// Run steps from `state` until the iteration bound
    ///
    /// Optimizer decay schedules continue from `state.step`.
    pub fn run(
        &mut self,
        model: &mut DCGAN,
        dataset: &ImageDataset,
        state: &mut TrainState,
        sink: &mut dyn TrainingSink,
    ) -> Result<&TrainingMetrics> {
        let (h, w, c) = dataset.image_shape();
        let data_shape = [h as i64, w as i64, c as i64];
        if data_shape != model.image_shape() {
            return Err(Error::shape("dataset images", &model.image_shape(), &data_shape));
        }

        self.disc_optimizer.set_updates(state.step as u64);
        self.adversarial.optimizer_mut().set_updates(state.step as u64);

        info!(
            "Starting training at step {} of {}, {} images, batch size {}",
            state.step,
            self.config.iterations,
            dataset.len(),
            self.config.batch_size
        );

        let pb = self.progress_bar(state.step);

        while state.step < self.config.iterations {
            let outcome = self.step(model, dataset, state)?;

            pb.set_message(format!(
                "D: {:.4}, G: {:.4}",
                outcome.disc_loss, outcome.gan_loss
            ));
            pb.inc(1);

            if state.step % self.config.checkpoint_every == 0 {
                pb.suspend(|| {
                    info!(
                        "Step {}/{}: discriminator loss={:.4}, adversarial loss={:.4}",
                        state.step, self.config.iterations, outcome.disc_loss, outcome.gan_loss
                    );
                    if self.metrics.check_mode_collapse(COLLAPSE_WINDOW) {
                        warn!("Possible mode collapse detected! Consider adjusting learning rates.");
                    }
                });

                let event = CheckpointEvent {
                    step: state.step,
                    cursor_offset: state.cursor.offset(),
                    disc_loss: outcome.disc_loss,
                    gan_loss: outcome.gan_loss,
                    model: &*model,
                    generated: &outcome.generated,
                    real: &outcome.real,
                    metrics: &self.metrics,
                };
                sink.on_checkpoint(&event)?;
            }
        }

        pb.finish_with_message("done");
        info!("Training complete after {} steps", state.step);

        Ok(&self.metrics)
    }

    /// One full step: discriminator update, composite update, cursor advance
    pub fn step(
        &mut self,
        model: &mut DCGAN,
        dataset: &ImageDataset,
        state: &mut TrainState,
    ) -> Result<StepOutcome> {
        let batch_size = self.config.batch_size as i64;
        let device = model.device;
        let image_shape = model.image_shape();
        let window = state.cursor.window();

        let disc_latent = model.sample_latent(batch_size);
        let generated = model.generate_from_noise(&disc_latent)?;

        let real = batch_to_tensor(dataset.batch(window.start, window.len())?, device)?;
        if expect_image_batch(&real, image_shape, "real batch")? != batch_size {
            return Err(Error::shape(
                "real batch",
                &[batch_size, image_shape[0], image_shape[1], image_shape[2]],
                &real.size(),
            ));
        }

        let combined = Tensor::cat(&[&generated, &real], 0);
        let combined_batch = expect_image_batch(&combined, image_shape, "combined batch")?;
        let labels = discriminator_labels(batch_size, &self.config.labels, device);
        let disc_loss = self.discriminator_update(model, &combined, &labels)?;

        let gan_latent = model.sample_latent(batch_size);
        let targets = adversarial_targets(batch_size, &self.config.labels, device);
        let gan_loss = self.adversarial.train_step(model, &gan_latent, &targets)?;

        state.cursor.advance();
        state.step += 1;

        if !disc_loss.is_finite() || !gan_loss.is_finite() {
            return Err(Error::NumericInstability {
                step: state.step,
                disc_loss,
                gan_loss,
            });
        }

        state.last_disc_loss = Some(disc_loss);
        state.last_gan_loss = Some(gan_loss);
        self.metrics.record_step(state.step, disc_loss, gan_loss);

        Ok(StepOutcome {
            disc_loss,
            gan_loss,
            combined_batch,
            combined,
            disc_latent,
            gan_latent,
            generated,
            real,
            window,
        })
    }

    fn discriminator_update(&mut self, model: &DCGAN, combined: &Tensor, labels: &Tensor) -> Result<f64> {
        let logits = model.discriminator.forward_t(combined, true);
        expect_shape(&logits, &labels.size(), "discriminator scores")?;

        let loss = discriminator_loss(&logits, labels);
        self.disc_optimizer.update(&loss);
        Ok(loss.double_value(&[]))
    }

    fn progress_bar(&self, position: usize) -> ProgressBar {
        if !self.config.show_progress {
            return ProgressBar::hidden();
        }

        let pb = ProgressBar::new(self.config.iterations as u64);
        let style = ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("##-");
        pb.set_style(style);
        pb.set_position(position as u64);
        pb
    }

    /// Learning rates the next (discriminator, composite) updates will use
    pub fn learning_rates(&self) -> (f64, f64) {
        (
            self.disc_optimizer.current_lr(),
            self.adversarial.optimizer().current_lr(),
        )
    }

    /// Get training metrics
    pub fn metrics(&self) -> &TrainingMetrics {
        &self.metrics
    }

    /// Get configuration
    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{snapshot, tiny_dataset, tiny_dcgan};
    use crate::training::FileSink;
    use tch::no_grad;
    use tempfile::tempdir;

    fn quick_config(iterations: usize, batch_size: usize) -> TrainingConfig {
        TrainingConfig {
            iterations,
            batch_size,
            show_progress: false,
            ..Default::default()
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        steps: Vec<usize>,
        losses: Vec<(f64, f64)>,
    }

    impl TrainingSink for RecordingSink {
        fn on_checkpoint(&mut self, event: &CheckpointEvent<'_>) -> Result<()> {
            assert_eq!(event.generated.size(), event.real.size());
            self.steps.push(event.step);
            self.losses.push((event.disc_loss, event.gan_loss));
            Ok(())
        }
    }

    #[test]
    fn test_training_config_default() {
        let config = TrainingConfig::default();
        assert_eq!(config.iterations, 10_000);
        assert_eq!(config.batch_size, 20);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_five_steps_wrap_cursor() {
        let mut model = tiny_dcgan();
        let dataset = tiny_dataset(100);
        let mut trainer = Trainer::new(quick_config(5, 20), &model).unwrap();
        let mut state = TrainState::new(dataset.len(), 20).unwrap();

        let mut starts = Vec::new();
        for _ in 0..5 {
            let outcome = trainer.step(&mut model, &dataset, &mut state).unwrap();
            assert_eq!(outcome.combined_batch, 40);
            assert_eq!(outcome.generated.size(), vec![20, 16, 16, 3]);
            starts.push(outcome.window.start);
        }

        assert_eq!(starts, vec![0, 20, 40, 60, 80]);
        assert_eq!(state.step, 5);
        assert_eq!(state.cursor.offset(), 0);
        assert_eq!(state.cursor.wraps(), 1);
        assert_eq!(trainer.metrics().len(), 5);
    }

    #[test]
    fn test_combined_batch_is_generated_then_real() {
        let mut model = tiny_dcgan();
        let dataset = tiny_dataset(100);
        let mut trainer = Trainer::new(quick_config(1, 20), &model).unwrap();
        let mut state = TrainState::new(dataset.len(), 20).unwrap();

        let outcome = trainer.step(&mut model, &dataset, &mut state).unwrap();

        assert_eq!(outcome.combined.size(), vec![40, 16, 16, 3]);
        assert!(outcome.combined.narrow(0, 0, 20).equal(&outcome.generated));
        assert!(outcome.combined.narrow(0, 20, 20).equal(&outcome.real));

        let expected_real = batch_to_tensor(dataset.batch(0, 20).unwrap(), model.device).unwrap();
        assert!(outcome.real.equal(&expected_real));
        assert!(!outcome.generated.equal(&expected_real));
    }

    #[test]
    fn test_composite_update_uses_fresh_latents() {
        let mut model = tiny_dcgan();
        let dataset = tiny_dataset(100);
        let mut trainer = Trainer::new(quick_config(1, 20), &model).unwrap();
        let mut state = TrainState::new(dataset.len(), 20).unwrap();

        let outcome = trainer.step(&mut model, &dataset, &mut state).unwrap();

        assert_eq!(outcome.disc_latent.size(), vec![20, 8]);
        assert_eq!(outcome.gan_latent.size(), vec![20, 8]);
        assert!(!outcome.disc_latent.equal(&outcome.gan_latent));
    }

    #[test]
    fn test_real_half_comes_from_cursor_window() {
        let mut model = tiny_dcgan();
        let dataset = tiny_dataset(100);
        let mut trainer = Trainer::new(quick_config(2, 20), &model).unwrap();
        let mut state = TrainState::resume(dataset.len(), 20, 0, 40).unwrap();

        let outcome = trainer.step(&mut model, &dataset, &mut state).unwrap();

        assert_eq!(outcome.window, 40..60);
        let first = outcome.real.double_value(&[0, 0, 0, 0]);
        let last = outcome.real.double_value(&[19, 0, 0, 0]);
        assert!((first - 0.40).abs() < 1e-6);
        assert!((last - 0.59).abs() < 1e-6);
    }

    #[test]
    fn test_discriminator_update_moves_only_discriminator() {
        let model = tiny_dcgan();
        let mut trainer = Trainer::new(quick_config(1, 4), &model).unwrap();

        let gen_before = snapshot(&model.gen_vs);
        let disc_before = snapshot(&model.disc_vs);

        let generated = model.generate(4).unwrap();
        let real = Tensor::rand([4, 16, 16, 3], (tch::Kind::Float, model.device));
        let combined = Tensor::cat(&[&generated, &real], 0);
        let labels = discriminator_labels(4, &LabelConfig::default(), model.device);

        let loss = trainer
            .discriminator_update(&model, &combined, &labels)
            .unwrap();

        assert!(loss.is_finite());
        assert!(gen_before
            .iter()
            .all(|(name, t)| t.equal(&model.gen_vs.variables()[name])));
        assert!(disc_before
            .iter()
            .any(|(name, t)| !t.equal(&model.disc_vs.variables()[name])));
    }

    #[test]
    fn test_checkpoint_interval_events() {
        let mut model = tiny_dcgan();
        let dataset = tiny_dataset(100);
        let mut trainer = Trainer::new(quick_config(300, 20), &model).unwrap();
        let mut sink = RecordingSink::default();

        let metrics = trainer.train(&mut model, &dataset, &mut sink).unwrap();

        assert_eq!(metrics.len(), 300);
        assert_eq!(sink.steps, vec![100, 200, 300]);
        assert!(sink.losses.iter().all(|(d, g)| d.is_finite() && g.is_finite()));
    }

    #[test]
    fn test_file_sink_writes_sample_pairs() {
        let dir = tempdir().unwrap();
        let output_dir = dir.path().join("gan_images");
        let checkpoint = output_dir.join("gan.pt");

        let mut model = tiny_dcgan();
        let dataset = tiny_dataset(100);
        let mut trainer = Trainer::new(quick_config(300, 20), &model).unwrap();
        let mut sink = FileSink::new(&output_dir, &checkpoint);

        trainer.train(&mut model, &dataset, &mut sink).unwrap();

        let pngs = std::fs::read_dir(&output_dir)
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.path().extension().map_or(false, |ext| ext == "png"))
            .count();
        assert_eq!(pngs, 6);
        for step in [100, 200, 300] {
            assert!(output_dir.join(format!("generated_{}.png", step)).exists());
            assert!(output_dir.join(format!("real_{}.png", step)).exists());
        }
        assert!(checkpoint.exists());
        assert!(sink.metrics_path().exists());
    }

    #[test]
    fn test_resume_continues_from_state() {
        let mut model = tiny_dcgan();
        let dataset = tiny_dataset(100);
        let mut trainer = Trainer::new(quick_config(300, 20), &model).unwrap();
        let mut state = TrainState::resume(dataset.len(), 20, 250, 60).unwrap();
        let mut sink = RecordingSink::default();

        trainer
            .run(&mut model, &dataset, &mut state, &mut sink)
            .unwrap();

        assert_eq!(state.step, 300);
        assert_eq!(trainer.metrics().len(), 50);
        assert_eq!(sink.steps, vec![300]);
        assert_eq!(trainer.disc_optimizer.updates(), 300);
    }

    #[test]
    fn test_resume_keeps_metrics_history() {
        let dir = tempdir().unwrap();
        let output_dir = dir.path().join("gan_images");
        let checkpoint = output_dir.join("gan.pt");
        let dataset = tiny_dataset(100);
        let mut sink = FileSink::new(&output_dir, &checkpoint);

        let mut model = tiny_dcgan();
        let mut first = Trainer::new(quick_config(200, 20), &model).unwrap();
        first.train(&mut model, &dataset, &mut sink).unwrap();

        let mut resumed = tiny_dcgan();
        let meta = crate::utils::load_checkpoint(&mut resumed, &checkpoint).unwrap();
        assert_eq!(meta.step, 200);

        let history = TrainingMetrics::resume_from_csv(sink.metrics_path(), meta.step).unwrap();
        let mut second = Trainer::new(quick_config(300, 20), &resumed)
            .unwrap()
            .with_metrics(history);
        let mut state = TrainState::resume(dataset.len(), 20, meta.step, meta.cursor_offset).unwrap();
        second
            .run(&mut resumed, &dataset, &mut state, &mut sink)
            .unwrap();

        let saved = TrainingMetrics::load_csv(sink.metrics_path()).unwrap();
        assert_eq!(saved.len(), 300);
        assert_eq!(saved.steps, (1..=300).collect::<Vec<_>>());
    }

    #[test]
    fn test_non_finite_loss_halts_training() {
        let mut model = tiny_dcgan();
        no_grad(|| {
            for (_, mut var) in model.gen_vs.variables() {
                let _ = var.fill_(f64::NAN);
            }
        });
        let dataset = tiny_dataset(40);
        let mut trainer = Trainer::new(quick_config(10, 20), &model).unwrap();
        let mut sink = RecordingSink::default();

        let result = trainer.train(&mut model, &dataset, &mut sink);

        assert!(matches!(
            result,
            Err(Error::NumericInstability { step: 1, .. })
        ));
        assert!(sink.steps.is_empty());
    }

    #[test]
    fn test_rejects_mismatched_dataset() {
        let mut model = tiny_dcgan();
        let dataset = ImageDataset::new(ndarray::Array4::<f32>::zeros((40, 8, 8, 3))).unwrap();
        let mut trainer = Trainer::new(quick_config(1, 20), &model).unwrap();

        assert!(matches!(
            trainer.train(&mut model, &dataset, &mut RecordingSink::default()),
            Err(Error::Shape { .. })
        ));
    }

    #[test]
    fn test_batch_larger_than_dataset_rejected() {
        let mut model = tiny_dcgan();
        let dataset = tiny_dataset(10);
        let mut trainer = Trainer::new(quick_config(1, 20), &model).unwrap();

        assert!(trainer
            .train(&mut model, &dataset, &mut RecordingSink::default())
            .is_err());
    }
}
