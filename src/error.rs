//! Error types for the crate

/// Result type for this library
pub type Result<T> = std::result::Result<T, Error>;

/// Library error type
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Shape mismatch at {stage}: expected {expected:?}, got {actual:?}")]
    Shape {
        stage: &'static str,
        expected: Vec<i64>,
        actual: Vec<i64>,
    },

    #[error("Non-finite loss at step {step}: D_loss={disc_loss}, GAN_loss={gan_loss}")]
    NumericInstability {
        step: usize,
        disc_loss: f64,
        gan_loss: f64,
    },

    #[error("Dataset error: {0}")]
    Dataset(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Torch error: {0}")]
    Torch(#[from] tch::TchError),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlDe(#[from] toml::de::Error),

    #[error("TOML write error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl Error {
    /// Shorthand for a shape mismatch between two tensor sizes
    pub fn shape(stage: &'static str, expected: &[i64], actual: &[i64]) -> Self {
        Error::Shape {
            stage,
            expected: expected.to_vec(),
            actual: actual.to_vec(),
        }
    }
}
