//! The invariant function bounds how uncertain the rank of a stored sample
//! may be. It drives both the `delta` assigned on insertion and the decision
//! of whether two neighbouring samples may be collapsed.
//!
//! Only the 'targeted quantiles' invariant of Cormode, Korn, Muthukrishnan and
//! Srivastava is provided here. Other policies plug in through [`Invariant`].

use std::fmt;

use crate::error::{Error, Result};

/// A policy bounding the acceptable rank uncertainty of a sample.
///
/// Implementations must be pure: the same `(r, n)` always yields the same
/// bound. `f` is called while the summary is being mutated, so it must not
/// reach back into the summary.
pub trait Invariant {
    /// Maximum width of the uncertainty band for a sample at rank `r` in a
    /// stream of `n` observations.
    fn f(&self, r: usize, n: usize) -> f64;
}

/// Targeted quantiles used when none are configured: the median within 5%
/// and the 99th percentile within 0.1%.
pub const DEFAULT_QUANTILES: [Quantile; 2] = [
    Quantile {
        quantile: 0.5,
        error: 0.05,
    },
    Quantile {
        quantile: 0.99,
        error: 0.001,
    },
];

/// A targeted quantile and the error the summary may make when answering it.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde_support", derive(serde::Serialize, serde::Deserialize))]
pub struct Quantile {
    quantile: f64,
    error: f64,
}

impl Quantile {
    /// Create a targeted quantile
    ///
    /// Both `quantile` and `error` must lie in the open interval (0, 1).
    ///
    /// # Examples
    /// ```
    /// use ckms_stream::ckms::Quantile;
    ///
    /// let p99 = Quantile::new(0.99, 0.001).unwrap();
    /// assert_eq!(0.99, p99.quantile());
    /// assert!(Quantile::new(1.0, 0.001).is_err());
    /// ```
    pub fn new(quantile: f64, error: f64) -> Result<Quantile> {
        if !(quantile > 0.0 && quantile < 1.0) {
            return Err(Error::InvalidQuantile(quantile));
        }
        if !(error > 0.0 && error < 1.0) {
            return Err(Error::InvalidError(error));
        }
        Ok(Quantile { quantile, error })
    }

    /// The targeted quantile, in (0, 1)
    pub fn quantile(&self) -> f64 {
        self.quantile
    }

    /// The error allowance for this quantile, in (0, 1)
    pub fn error(&self) -> f64 {
        self.error
    }

    fn bound(&self, r: f64, n: f64) -> f64 {
        if r <= (self.quantile * n).floor() {
            (2.0 * self.error * (n - r)) / (1.0 - self.quantile)
        } else {
            (2.0 * self.error * r) / self.quantile
        }
    }
}

impl fmt::Display for Quantile {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Q{{q={}, eps={}}}", self.quantile, self.error)
    }
}

/// The targeted quantiles invariant
///
/// Accuracy is spent near the rank of each targeted quantile and relaxed
/// elsewhere. The bound at any rank is the smallest of the per-quantile
/// bounds, capped at `n + 1`.
#[derive(Debug, Clone, PartialEq)]
pub struct TargetedQuantiles {
    quantiles: Vec<Quantile>,
}

impl TargetedQuantiles {
    /// Create the invariant for a non-empty set of targeted quantiles
    pub fn new(quantiles: &[Quantile]) -> Result<TargetedQuantiles> {
        if quantiles.is_empty() {
            return Err(Error::NoQuantiles);
        }
        Ok(TargetedQuantiles {
            quantiles: quantiles.to_vec(),
        })
    }

    /// The targeted quantiles this invariant was built for
    pub fn quantiles(&self) -> &[Quantile] {
        &self.quantiles
    }
}

impl Default for TargetedQuantiles {
    fn default() -> TargetedQuantiles {
        TargetedQuantiles {
            quantiles: DEFAULT_QUANTILES.to_vec(),
        }
    }
}

impl Invariant for TargetedQuantiles {
    fn f(&self, r: usize, n: usize) -> f64 {
        let r = r as f64;
        let n = n as f64;
        self.quantiles
            .iter()
            .map(|q| q.bound(r, n))
            .fold(n + 1.0, f64::min)
    }
}
