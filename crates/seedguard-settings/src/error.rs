//! Error types for settings resolution.

use thiserror::Error;

/// Primary error type for settings resolution.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// The backing store failed and no cached value was available to serve.
    #[error("safety settings unavailable for scope '{scope}'")]
    Unavailable {
        /// Settings scope that could not be resolved.
        scope: String,
        /// Underlying store error.
        #[source]
        source: anyhow::Error,
    },
}

/// Convenience alias for settings resolution results.
pub type SettingsResult<T> = Result<T, SettingsError>;
