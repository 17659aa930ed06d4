use thiserror::Error;

/// Error taxonomy for the fact-check pipeline.
///
/// `Validation` is fatal to a request and surfaced immediately. `Upstream`
/// and `Translation` are recovered locally wherever a component defines a
/// fallback and only propagate where none applies. `Database` failures on
/// the cache-write path are logged and swallowed at the store boundary.
/// Unknown task or cache keys are represented as `Option::None` by the
/// lookup APIs, never as an error.
#[derive(Error, Debug)]
pub enum ClaimLensError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Translation error: {0}")]
    Translation(String),

    #[error("Upstream service error: {0}")]
    Upstream(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}
