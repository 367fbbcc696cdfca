/// Errors from reading or writing the settings file.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Settings I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Settings encoding failed: {0}")]
    Encoding(#[from] serde_json::Error),

    #[error("Unknown settings key: {0}")]
    UnknownKey(String),

    #[error("Invalid value for {key}: {reason}")]
    InvalidValue { key: String, reason: String },
}
