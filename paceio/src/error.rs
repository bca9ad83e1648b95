use thiserror::Error;

/// Result type for pacer construction
pub type Result<T> = std::result::Result<T, PaceError>;

/// Errors that can occur when configuring a pacer
///
/// Pacing itself never fails; once a wrapper is built, the only errors a
/// caller sees are the ones the wrapped stream produces, passed through
/// untouched.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaceError {
    /// Configured throughput was zero bytes per second
    #[error("rate must be greater than zero bytes per second")]
    ZeroRate,
}
