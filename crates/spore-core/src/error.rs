use thiserror::Error;

/// Top-level error type for Spore.
#[derive(Debug, Error)]
pub enum SporeError {
    /// Error from the completion provider.
    #[error("provider error: {0}")]
    Provider(String),

    /// Error from a messaging channel.
    #[error("channel error: {0}")]
    Channel(String),

    /// Error from the market-data endpoint.
    #[error("market error: {0}")]
    Market(String),

    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
