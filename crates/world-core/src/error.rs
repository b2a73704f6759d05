use thiserror::Error;

/// Everything that can go wrong while producing a greeting.
///
/// The controller treats every variant the same way (the fixed failure
/// message); the variants only exist so the log says what happened.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GenerationError {
    #[error("API key not set (expected in ${0})")]
    MissingApiKey(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Malformed stream: {0}")]
    Malformed(String),

    #[error("Prompt blocked: {0}")]
    Blocked(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Preset registry must contain at least one preset")]
    Empty,

    #[error("Duplicate preset id: {0}")]
    DuplicateId(String),
}
