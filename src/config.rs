//! Construction parameters shared by [`CKMS`](crate::ckms::CKMS) and
//! [`IngestionBuffer`](crate::buffer::IngestionBuffer).
//!
//! With the `serde_support` feature enabled `Config` can be read from any
//! serde format. Whatever its origin, a `Config` is validated when a summary
//! is built from it.

use crate::ckms::{Quantile, TargetedQuantiles, DEFAULT_QUANTILES};
use crate::error::{Error, Result};

/// Number of values buffered before a flush when no capacity is configured.
pub const DEFAULT_BUFFER_CAPACITY: usize = 4096;

/// Batch capacity and targeted quantiles for a summary.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde_support", derive(serde::Serialize, serde::Deserialize))]
pub struct Config {
    /// Values held back before they are merged into the sample sequence.
    pub buffer_capacity: usize,
    /// The quantiles the summary answers accurately.
    pub quantiles: Vec<Quantile>,
}

impl Default for Config {
    fn default() -> Config {
        Config {
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
            quantiles: DEFAULT_QUANTILES.to_vec(),
        }
    }
}

impl Config {
    /// Replace the batch capacity
    pub fn with_buffer_capacity(mut self, buffer_capacity: usize) -> Config {
        self.buffer_capacity = buffer_capacity;
        self
    }

    /// Replace the targeted quantiles
    ///
    /// # Examples
    /// ```
    /// use ckms_stream::ckms::Quantile;
    /// use ckms_stream::Config;
    ///
    /// let config = Config::default()
    ///     .with_buffer_capacity(500)
    ///     .with_quantiles(&[Quantile::new(0.9, 0.01).unwrap()]);
    /// assert!(config.validate().is_ok());
    /// ```
    pub fn with_quantiles(mut self, quantiles: &[Quantile]) -> Config {
        self.quantiles = quantiles.to_vec();
        self
    }

    /// Check the configuration without building anything from it
    pub fn validate(&self) -> Result<()> {
        self.invariant().map(|_| ())
    }

    pub(crate) fn invariant(&self) -> Result<TargetedQuantiles> {
        if self.buffer_capacity == 0 {
            return Err(Error::InvalidCapacity(self.buffer_capacity));
        }
        // Deserialized quantiles have not been through Quantile::new.
        let quantiles = self
            .quantiles
            .iter()
            .map(|q| Quantile::new(q.quantile(), q.error()))
            .collect::<Result<Vec<Quantile>>>()?;
        TargetedQuantiles::new(&quantiles)
    }
}
