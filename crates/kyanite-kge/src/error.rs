use thiserror::Error;

/// Errors that can occur in kyanite-kge.
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed or inconsistent triple data (unknown entity/relation,
    /// unparseable line). Unrecoverable: no valid training is possible.
    #[error("data error: {0}")]
    Data(String),

    /// Non-finite loss or score detected during training.
    #[error("numerical error: {0}")]
    Numerical(String),

    /// Invalid hyperparameter or configuration value.
    #[error("config error: {0}")]
    Config(String),

    /// IO error while reading a dataset.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Tensor backend error.
    #[error("tensor error: {0}")]
    Tensor(#[from] candle_core::Error),
}

/// Result type alias for kyanite-kge.
pub type Result<T> = std::result::Result<T, Error>;
