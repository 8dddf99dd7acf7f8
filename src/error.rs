use thiserror::Error;

/// Failure kinds the application distinguishes by recovery strategy.
#[derive(Debug, Error)]
pub enum ChatError {
    /// No credential available. Fatal at startup; checked once when the
    /// gateway client is constructed, never on first request.
    #[error("no API credential configured: set PARLEY_API_KEY or api_key in config.toml")]
    Configuration,

    /// The gateway returned a non-success status or the stream broke.
    /// Recovered by surfacing a transient notification; partial assistant
    /// content is kept.
    #[error("completion request failed: {0}")]
    RequestFailure(String),

    /// Durable storage holds data we cannot parse. Recovered by falling
    /// back to an empty session.
    #[error("stored conversations are unreadable: {0}")]
    StorageCorruption(#[source] serde_json::Error),
}
