use feature_engine::EngineError;

/// Errors while reading a studio document.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("failed to read file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse file: {0}")]
    ParseError(String),

    #[error("unknown file format: {0}")]
    UnknownFormat(String),

    #[error("file version {file_version} is newer than supported version {supported_version}")]
    FutureVersion {
        file_version: u32,
        supported_version: u32,
    },

    #[error("migration failed from version {from} to {to}: {reason}")]
    MigrationFailed { from: u32, to: u32, reason: String },

    #[error("invalid studio: {0}")]
    InvalidStudio(#[from] EngineError),
}

/// Errors while writing a studio document.
#[derive(Debug, thiserror::Error)]
pub enum SaveError {
    #[error("failed to serialize studio: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("failed to write file: {0}")]
    Io(#[from] std::io::Error),
}
