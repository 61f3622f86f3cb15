//! Errors raised while tracking click clusters.

/// Errors that can occur while storing or classifying clicks.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ClusterError {
    /// A click was rejected before any state was touched:
    /// non-finite coordinate or empty page identifier.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The clustering capability failed, timed out, or returned a malformed result.
    #[error("clustering unavailable: {0}")]
    ClusteringUnavailable(String),

    /// A page was queried before any click was recorded for it.
    #[error("unknown page: {0}")]
    UnknownPage(String),

    /// Clustering parameters are out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
