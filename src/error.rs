use thiserror::Error;

#[derive(Error, Debug)]
pub enum SaverError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Missing required column: {0}")]
    MissingColumn(String),

    #[error("Invalid value {value:?} in column '{column}': {reason}")]
    InvalidFieldValue {
        column: String,
        value: String,
        reason: String,
    },

    #[error("Bulk invalidate was not acknowledged by {0}")]
    InvalidateUnacknowledged(String),

    #[error("Store error: {0}")]
    Store(String),
}

pub type Result<T> = std::result::Result<T, SaverError>;
