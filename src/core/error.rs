use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Missing municipality controller: {0}")]
    MissingController(crate::core::types::MunicipalityCode),

    #[error("Invariant violated: {0}")]
    InvariantViolation(String),

    #[error("Unknown schema version {found}, expected one of {known:?}")]
    SchemaVersion { found: u32, known: &'static [u32] },

    #[error("Invalid seed: {0}")]
    InvalidSeed(String),

    #[error("Malformed militia pool key: {0}")]
    MilitiaKey(String),

    #[error("Strategy profile error: {0}")]
    ProfileError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, EngineError>;
