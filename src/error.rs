//! Error types for the motivator bot.

/// Top-level error type for the bot core.
#[derive(Debug, thiserror::Error)]
pub enum BotError {
    /// Missing or invalid required settings. Fatal at startup.
    #[error("config error: {0}")]
    Config(String),

    /// Text catalog could not be read, parsed, or written.
    #[error("catalog error: {0}")]
    Catalog(String),

    /// Delivery to a single user failed.
    #[error("dispatch error: {0}")]
    Dispatch(String),

    /// Transport failure outside a specific delivery.
    #[error("transport error: {0}")]
    Transport(String),

    /// Preference/session storage error.
    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    /// Lock poisoned by a panicking holder.
    #[error("lock poisoned: {0}")]
    Lock(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encode/decode error.
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, BotError>;
