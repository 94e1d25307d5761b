//! DCGAN for CIFAR-10 image generation
//!
//! Main entry point providing CLI interface for:
//! - Training the DCGAN on one CIFAR-10 class
//! - Generating sample images from a checkpoint
//! - Scoring real and generated images with the discriminator
//! - Writing a default configuration file

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use dcgan_cifar::{
    data::{batch_to_tensor, ImageDataset},
    model::DCGAN,
    training::{FileSink, TrainState, Trainer, TrainingMetrics},
    utils::{load_checkpoint, save_image, Config},
};

/// DCGAN for synthetic CIFAR-10 images
#[derive(Parser)]
#[command(name = "dcgan_cifar")]
#[command(version = "0.1.0")]
#[command(about = "Train a DCGAN on one CIFAR-10 class and sample images from it")]
struct Cli {
    /// Path to configuration file (.json or .toml)
    #[arg(short, long, default_value = "config.json")]
    config: String,

    /// Verbosity level
    #[arg(short, long, default_value = "info")]
    verbosity: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Train the DCGAN model
    Train {
        /// Directory with the CIFAR-10 binary batches
        #[arg(short, long)]
        data_dir: Option<String>,

        /// Number of training steps
        #[arg(short, long)]
        iterations: Option<usize>,

        /// Directory for sample images and metrics
        #[arg(short, long)]
        output_dir: Option<String>,

        /// Resume from the configured checkpoint
        #[arg(long)]
        resume: bool,
    },

    /// Generate sample images from a checkpoint
    Generate {
        /// Checkpoint file (defaults to the configured one)
        #[arg(short, long)]
        checkpoint: Option<String>,

        /// Number of images to generate
        #[arg(short, long, default_value = "16", value_parser = clap::value_parser!(u32).range(1..))]
        num_samples: u32,

        /// Output directory
        #[arg(short, long, default_value = "samples")]
        output_dir: String,
    },

    /// Report mean discriminator scores on real and generated images
    Evaluate {
        /// Checkpoint file (defaults to the configured one)
        #[arg(short, long)]
        checkpoint: Option<String>,

        /// Number of images of each kind
        #[arg(short, long, default_value = "100", value_parser = clap::value_parser!(u32).range(1..))]
        num_samples: u32,
    },

    /// Initialize default configuration file
    Init {
        /// Output configuration file path
        #[arg(short, long, default_value = "config.json")]
        output: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let level = match cli.verbosity.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Train {
            data_dir,
            iterations,
            output_dir,
            resume,
        } => {
            let mut config = load_config(&cli.config)?;
            if let Some(dir) = data_dir {
                config.data.data_dir = dir;
            }
            if let Some(n) = iterations {
                config.training.iterations = n;
            }
            if let Some(dir) = output_dir {
                config.training.output_dir = dir;
            }
            train_model(&config, resume)?;
        }
        Commands::Generate {
            checkpoint,
            num_samples,
            output_dir,
        } => {
            let config = load_config(&cli.config)?;
            generate_samples(&config, checkpoint, num_samples, &output_dir)?;
        }
        Commands::Evaluate {
            checkpoint,
            num_samples,
        } => {
            let config = load_config(&cli.config)?;
            evaluate_model(&config, checkpoint, num_samples)?;
        }
        Commands::Init { output } => {
            init_config(&output)?;
        }
    }

    Ok(())
}

/// Load the configuration file, or defaults when it does not exist
fn load_config(path: &str) -> Result<Config> {
    let config = if Path::new(path).exists() {
        Config::load(path).with_context(|| format!("failed to read config {}", path))?
    } else {
        info!("No configuration at {}, using defaults", path);
        Config::default()
    };
    config.validate()?;

    if let Some(seed) = config.training.seed {
        tch::manual_seed(seed);
    }
    Ok(config)
}

fn build_model(config: &Config) -> Result<DCGAN> {
    let device = config.get_device();
    let model = DCGAN::new(
        config.generator_config(),
        config.discriminator_config(),
        device,
    )?;

    let (gen_params, disc_params) = model.num_parameters();
    info!(
        "Created DCGAN on {:?}: latent_dim={}, image={:?}, parameters G={} D={}",
        device,
        model.latent_dim(),
        model.image_shape(),
        gen_params,
        disc_params
    );
    Ok(model)
}

fn load_dataset(config: &Config) -> Result<ImageDataset> {
    let mut dataset = ImageDataset::load_cifar10(&config.data.data_dir, config.data.class_label)
        .with_context(|| format!("failed to load CIFAR-10 from {}", config.data.data_dir))?;
    if let Some(seed) = config.data.shuffle_seed {
        dataset.shuffle(seed);
    }
    Ok(dataset)
}

fn checkpoint_path(config: &Config, checkpoint: Option<String>) -> PathBuf {
    PathBuf::from(checkpoint.unwrap_or_else(|| config.training.checkpoint_path.clone()))
}

/// Train the model and write checkpoints, samples and metrics
fn train_model(config: &Config, resume: bool) -> Result<()> {
    let dataset = load_dataset(config)?;
    let mut model = build_model(config)?;
    let training_config = config.to_training_config();
    let checkpoint = PathBuf::from(&config.training.checkpoint_path);
    let mut sink = FileSink::new(&config.training.output_dir, &checkpoint);

    let (mut state, history) = if resume {
        let meta = load_checkpoint(&mut model, &checkpoint)?;
        info!(
            "Resumed from step {} (D_loss: {:.4}, GAN_loss: {:.4})",
            meta.step, meta.disc_loss, meta.gan_loss
        );
        let state = TrainState::resume(
            dataset.len(),
            training_config.batch_size,
            meta.step,
            meta.cursor_offset,
        )?;
        let history = TrainingMetrics::resume_from_csv(sink.metrics_path(), meta.step)?;
        (state, history)
    } else {
        let state = TrainState::new(dataset.len(), training_config.batch_size)?;
        (state, TrainingMetrics::new())
    };

    info!("Starting training for {} steps", training_config.iterations);
    info!("  Discriminator LR: {}", training_config.disc_optim.lr);
    info!("  GAN LR: {}", training_config.gan_optim.lr);
    info!("  Label noise: {}", training_config.labels.noise);

    let mut trainer = Trainer::new(training_config, &model)?.with_metrics(history);
    trainer.run(&mut model, &dataset, &mut state, &mut sink)?;

    let metrics_path = sink.metrics_path();
    std::fs::create_dir_all(&config.training.output_dir)?;
    trainer.metrics().save_csv(&metrics_path)?;

    match (state.last_disc_loss, state.last_gan_loss) {
        (Some(disc_loss), Some(gan_loss)) => info!(
            "Training complete at step {}. Final D_loss: {:.4}, GAN_loss: {:.4}",
            state.step, disc_loss, gan_loss
        ),
        _ => info!("No steps run; checkpoint already at step {}", state.step),
    }
    let (disc_lr, gan_lr) = trainer.learning_rates();
    info!("Final learning rates: D={:.3e}, GAN={:.3e}", disc_lr, gan_lr);
    info!("Metrics saved to {}", metrics_path.display());

    Ok(())
}

/// Write `num_samples` generated images as PNG
fn generate_samples(
    config: &Config,
    checkpoint: Option<String>,
    num_samples: u32,
    output_dir: &str,
) -> Result<()> {
    let mut model = build_model(config)?;
    let checkpoint = checkpoint_path(config, checkpoint);
    let meta = load_checkpoint(&mut model, &checkpoint)?;

    info!("Generating {} images from step {}", num_samples, meta.step);
    let images = model.generate(i64::from(num_samples))?;

    std::fs::create_dir_all(output_dir)?;
    for i in 0..i64::from(num_samples) {
        let path = Path::new(output_dir).join(format!("sample_{:04}.png", i));
        save_image(&images.get(i), &path)?;
    }

    info!("Saved {} images to {}", num_samples, output_dir);
    Ok(())
}

/// Mean discriminator probability on real and on generated images
fn evaluate_model(config: &Config, checkpoint: Option<String>, num_samples: u32) -> Result<()> {
    let dataset = load_dataset(config)?;
    let mut model = build_model(config)?;
    let checkpoint = checkpoint_path(config, checkpoint);
    load_checkpoint(&mut model, &checkpoint)?;

    let count = (num_samples as usize).min(dataset.len());
    let real = batch_to_tensor(dataset.batch(0, count)?, model.device)?;
    let real_score = model.discriminate(&real)?.mean(tch::Kind::Float).double_value(&[]);

    let generated = model.generate(count as i64)?;
    let fake_score = model
        .discriminate(&generated)?
        .mean(tch::Kind::Float)
        .double_value(&[]);

    info!("Mean discriminator score on {} images:", count);
    info!("  - Real: {:.4}", real_score);
    info!("  - Generated: {:.4}", fake_score);
    if fake_score < 0.05 {
        warn!("Generated images are rejected almost always; training may have collapsed");
    }

    Ok(())
}

/// Initialize default configuration file
fn init_config(output_path: &str) -> Result<()> {
    let config = Config::default();
    config.save(output_path)?;

    info!("Created default configuration at {}", output_path);
    Ok(())
}
