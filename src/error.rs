//! Errors raised while configuring a summary.
//!
//! Only construction can fail. Inserting, merging and querying never do: an
//! empty summary answers queries with `None` rather than an error.

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Rejected configuration.
#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
pub enum Error {
    /// A targeted quantile outside of the open interval (0, 1).
    #[error("quantile must lie in (0, 1), got {0}")]
    InvalidQuantile(f64),
    /// An error allowance outside of the open interval (0, 1).
    #[error("error allowance must lie in (0, 1), got {0}")]
    InvalidError(f64),
    /// No targeted quantiles were supplied.
    #[error("at least one targeted quantile is required")]
    NoQuantiles,
    /// The batch capacity must hold at least one value.
    #[error("buffer capacity must be positive, got {0}")]
    InvalidCapacity(usize),
}
