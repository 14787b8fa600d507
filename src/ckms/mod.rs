//! This is an implementation of the algorithm presented in Cormode, Korn,
//! Muthukrishnan, Srivastava's paper "Effective Computation of Biased Quantiles
//! over Data Streams". The ambition here is to approximate quantiles on a
//! stream of data without having a boatload of information kept in memory.
//!
//! The summary is tuned for a small set of 'targeted' quantiles, each with its
//! own error allowance. Accuracy is spent near the ranks of those quantiles
//! and relaxed elsewhere. The invariant that encodes this trade is pluggable
//! through the [`Invariant`] trait.
//!
//! We follow the 'batch' method of the paper. Incoming items are buffered and
//! once `buffer_capacity` items are held the buffer is sorted and merged into
//! the sample sequence, which is then compressed.
//!
//! # Examples
//!
//! ```
//! use ckms_stream::ckms::{Quantile, CKMS};
//!
//! let quantiles = [
//!     Quantile::new(0.5, 0.1).unwrap(),
//!     Quantile::new(0.99, 0.001).unwrap(),
//! ];
//! let mut ckms = CKMS::<u32>::new(&quantiles).unwrap();
//! for i in 1..1000 {
//!     ckms.insert(i);
//! }
//!
//! let median = ckms.query(0.5).unwrap();
//! assert!(400 <= median && median <= 600);
//! let p99 = ckms.query(0.99).unwrap();
//! assert!(980 <= p99 && p99 <= 999);
//! ```
use std::cmp;
use std::fmt::Debug;

mod entry;
mod invariant;
mod store;

pub use self::invariant::{Invariant, Quantile, TargetedQuantiles, DEFAULT_QUANTILES};

use self::store::Store;
use crate::config::{Config, DEFAULT_BUFFER_CAPACITY};
use crate::error::{Error, Result};

/// A structure to provide approximate quantile queries in bounded memory and
/// with bounded error.
///
/// `CKMS` is not internally synchronised. Share it between threads through an
/// [`IngestionBuffer`](crate::buffer::IngestionBuffer) or confine it to one.
#[derive(Clone, Debug)]
pub struct CKMS<T, I = TargetedQuantiles>
where
    T: Copy + PartialEq,
{
    // Values not yet merged into 'samples'. Once buffer_capacity of them are
    // held they are merged in sorted order and 'samples' is compressed.
    buffer: Vec<T>,
    buffer_capacity: usize,

    // This is the S(n) of the above paper.
    samples: Store<T, I>,

    last_in: Option<T>,
}

impl<T> CKMS<T, TargetedQuantiles>
where
    T: Copy + PartialOrd + Debug,
{
    /// Create a new CKMS for the given targeted quantiles
    ///
    /// The batch capacity defaults to 4096 values. Fails when `quantiles` is
    /// empty.
    pub fn new(quantiles: &[Quantile]) -> Result<Self> {
        Self::with_invariant(DEFAULT_BUFFER_CAPACITY, TargetedQuantiles::new(quantiles)?)
    }

    /// Create a new CKMS from a `Config`, validating it first
    pub fn with_config(config: &Config) -> Result<Self> {
        let invariant = config.invariant()?;
        Self::with_invariant(config.buffer_capacity, invariant)
    }
}

impl<T> Default for CKMS<T, TargetedQuantiles>
where
    T: Copy + PartialOrd + Debug,
{
    fn default() -> Self {
        CKMS {
            buffer: Vec::with_capacity(DEFAULT_BUFFER_CAPACITY),
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
            samples: Store::new(TargetedQuantiles::default()),
            last_in: None,
        }
    }
}

impl<T, I> CKMS<T, I>
where
    T: Copy + PartialOrd + Debug,
    I: Invariant,
{
    /// Create a new CKMS driven by an arbitrary invariant
    ///
    /// `buffer_capacity` must be at least 1.
    pub fn with_invariant(buffer_capacity: usize, invariant: I) -> Result<Self> {
        if buffer_capacity == 0 {
            return Err(Error::InvalidCapacity(buffer_capacity));
        }
        Ok(CKMS {
            buffer: Vec::with_capacity(cmp::min(buffer_capacity, DEFAULT_BUFFER_CAPACITY)),
            buffer_capacity,
            samples: Store::new(invariant),
            last_in: None,
        })
    }

    /// Insert a T into the CKMS
    ///
    /// The value is buffered. Once the buffer reaches capacity it is merged
    /// and the samples compressed before this call returns.
    pub fn insert(&mut self, v: T) {
        self.last_in = Some(v);
        self.buffer.push(v);
        if self.buffer.len() >= self.buffer_capacity {
            self.flush();
        }
    }

    /// Merge a batch of raw values into the sample sequence
    ///
    /// Values are merged in ascending order regardless of their order in
    /// `values`, which is left empty. The internal buffer is not touched and
    /// no compression is done.
    pub fn merge_batch(&mut self, values: &mut Vec<T>) {
        self.samples.merge(values);
    }

    /// Collapse samples that no longer need to be held apart
    ///
    /// Never changes `count`.
    pub fn compress(&mut self) {
        self.samples.compress();
    }

    /// Merge anything buffered and compress
    pub fn flush(&mut self) {
        self.samples.merge(&mut self.buffer);
        self.samples.compress();
    }

    /// Query CKMS for an approximate quantile
    ///
    /// Buffered values are flushed first, so every prior `insert` is
    /// reflected. `q` is expected in (0, 1). The true rank of the returned
    /// value lies within the invariant's bound of `q * count`.
    ///
    /// Returns `None` when nothing has been inserted.
    ///
    /// # Examples
    /// ```
    /// use ckms_stream::ckms::CKMS;
    ///
    /// let mut ckms = CKMS::<f64>::default();
    /// assert_eq!(None, ckms.query(0.5));
    /// ckms.insert(1.0);
    /// assert_eq!(Some(1.0), ckms.query(0.5));
    /// ```
    pub fn query(&mut self, q: f64) -> Option<T> {
        self.flush();
        self.samples.query(q)
    }

    /// Query several quantiles
    ///
    /// Each entry is an independent `query`; results keep the order of
    /// `quantiles`.
    pub fn snapshot(&mut self, quantiles: &[f64]) -> Vec<(f64, Option<T>)> {
        quantiles.iter().map(|&q| (q, self.query(q))).collect()
    }

    /// Drop every sample, buffered value and count
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.samples.clear();
        self.last_in = None;
    }

    /// Query CKMS for the count of its points
    ///
    /// This is the number of points merged into the samples, _not_ the number
    /// of points currently stored, and excludes anything still buffered.
    ///
    /// # Examples
    /// ```
    /// use ckms_stream::ckms::CKMS;
    ///
    /// let mut ckms = CKMS::<u32>::default();
    /// for i in 0..1000 {
    ///     ckms.insert(i as u32);
    /// }
    /// assert_eq!(ckms.count(), 0);
    /// ckms.flush();
    /// assert_eq!(ckms.count(), 1000);
    /// ```
    pub fn count(&self) -> usize {
        self.samples.count()
    }

    /// Number of samples currently stored
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// True when no observation has been merged
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Number of buffered values awaiting a merge
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    /// Return the last element inserted into the CKMS
    pub fn last(&self) -> Option<T> {
        self.last_in
    }

    /// Retrieve a representative vector of points
    ///
    /// Buffered values are flushed first. Doing so consumes the CKMS.
    ///
    /// # Examples
    /// ```
    /// use ckms_stream::ckms::CKMS;
    ///
    /// let mut ckms = CKMS::<u32>::default();
    /// for i in 0..2 {
    ///     ckms.insert(i as u32);
    /// }
    ///
    /// assert_eq!(ckms.into_vec(), vec![0, 1]);
    /// ```
    pub fn into_vec(mut self) -> Vec<T> {
        self.flush();
        self.samples.iter().map(|e| e.v).collect()
    }

    /// The batch capacity
    pub fn buffer_capacity(&self) -> usize {
        self.buffer_capacity
    }

    /// The invariant driving insertion and compression
    pub fn invariant(&self) -> &I {
        &self.samples.invariant
    }
}
