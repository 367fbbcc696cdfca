#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Invalid override table: {0}")]
    OverrideTable(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
