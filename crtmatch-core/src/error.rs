//! Error types for crtmatch-core.

use thiserror::Error;

/// Result type alias for crtmatch operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types.
///
/// The matching path itself never returns these; "no match" is reported
/// through sentinel values. Errors only arise while building inputs.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error.
    #[error("configuration error: {0}")]
    ConfigError(String),

    /// Direction-averaging fraction outside (0, 1].
    #[error("invalid direction fraction: {0} (expected 0 < fraction <= 1)")]
    InvalidFraction(f64),

    /// Malformed track.
    #[error("invalid track: {0}")]
    InvalidTrack(String),
}
