pub type Result<T> = std::result::Result<T, CollectorError>;

/// Error type shared by the collector
///
/// Only configuration errors end the process; everything else is logged by
/// the poller and the loop carries on with the next attempt or cycle.
#[derive(Debug, thiserror::Error)]
pub enum CollectorError {
    /// Missing or invalid configuration value
    #[error("Configuration error: {0}")]
    Config(String),

    /// The capture command could not be spawned or read
    #[error("Capture command failed: {0}")]
    Capture(#[from] std::io::Error),

    /// A capture line that cannot be decoded
    #[error("Malformed line '{line}': {reason}")]
    MalformedLine { line: String, reason: String },

    #[error("Database error: {0}")]
    Database(#[from] tokio_postgres::Error),

    #[error("TLS error: {0}")]
    Tls(#[from] openssl::error::ErrorStack),

    #[error("Invalid database URL: {0}")]
    Url(#[from] url::ParseError),
}

impl CollectorError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn malformed(line: &str, reason: impl Into<String>) -> Self {
        Self::MalformedLine {
            line: line.to_string(),
            reason: reason.into(),
        }
    }
}
