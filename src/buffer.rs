//! A non-blocking, multi-producer front end for [`CKMS`].
//!
//! Producers call [`IngestionBuffer::observe`] from any number of threads.
//! Values collect in a lock-free queue while an atomic counter tracks how
//! many have been accepted. The producer that pushes the counter past
//! capacity and then wins a compare-and-set on the flush flag drains the
//! queue into the summary. Producers that lose the race spin and retry; none
//! of them waits on another producer's lock.
//!
//! Consumers (`query`, `snapshot`, `count`, `reset`) take the same flag, so
//! the summary is only ever touched by the flag holder. Its mutex is never
//! contended.
//!
//! # Examples
//!
//! ```
//! use std::sync::Arc;
//! use std::thread;
//!
//! use ckms_stream::{Config, IngestionBuffer};
//!
//! let buffer = Arc::new(IngestionBuffer::<u32>::with_config(&Config::default()).unwrap());
//! let handles: Vec<_> = (0..4)
//!     .map(|t| {
//!         let buffer = Arc::clone(&buffer);
//!         thread::spawn(move || {
//!             for i in 0..1000 {
//!                 buffer.observe(t * 1000 + i);
//!             }
//!         })
//!     })
//!     .collect();
//! for h in handles {
//!     h.join().unwrap();
//! }
//!
//! buffer.force_merge();
//! assert_eq!(4000, buffer.count());
//! ```

use std::cmp;
use std::fmt::Debug;
use std::hint;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use crossbeam_queue::SegQueue;
use log::trace;
use parking_lot::Mutex;

use crate::ckms::{Invariant, TargetedQuantiles, CKMS};
use crate::config::Config;
use crate::error::{Error, Result};

/// Concurrent accumulation in front of a single [`CKMS`]
#[derive(Debug)]
pub struct IngestionBuffer<T, I = TargetedQuantiles>
where
    T: Copy + PartialEq,
{
    summary: Mutex<CKMS<T, I>>,
    pending: SegQueue<T>,
    // Values accepted since the last flush, plus retries by producers that
    // lost the flush race.
    pending_count: AtomicUsize,
    flushing: AtomicBool,
    capacity: usize,
}

impl<T> IngestionBuffer<T, TargetedQuantiles>
where
    T: Copy + PartialOrd + Debug,
{
    /// Build the buffer and its summary from one `Config`
    ///
    /// `buffer_capacity` sizes both the lock-free queue and the summary's own
    /// batch.
    pub fn with_config(config: &Config) -> Result<Self> {
        IngestionBuffer::new(config.buffer_capacity, CKMS::with_config(config)?)
    }
}

impl<T, I> IngestionBuffer<T, I>
where
    T: Copy + PartialOrd + Debug,
    I: Invariant,
{
    /// Wrap `summary`, flushing into it every `capacity` observations
    pub fn new(capacity: usize, summary: CKMS<T, I>) -> Result<Self> {
        if capacity == 0 {
            return Err(Error::InvalidCapacity(capacity));
        }
        Ok(IngestionBuffer {
            summary: Mutex::new(summary),
            pending: SegQueue::new(),
            pending_count: AtomicUsize::new(0),
            flushing: AtomicBool::new(false),
            capacity,
        })
    }

    /// Record one observation
    ///
    /// Never blocks on another producer. The call that finds the buffer full
    /// and wins the flush flag merges the pending values before returning;
    /// every other caller either records its value straight away or spins
    /// until the flush completes.
    pub fn observe(&self, v: T) {
        loop {
            let p = self.pending_count.fetch_add(1, Ordering::AcqRel) + 1;
            if p <= self.capacity {
                self.pending.push(v);
                return;
            }

            if self
                .flushing
                .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
                .is_ok()
            {
                let _flag = FlushFlag(&self.flushing);
                trace!("observe over capacity ({}), flushing", p);
                self.drain();
                // Deliberately 1 rather than 0: v seeds the next batch and
                // is counted in it.
                self.pending_count.store(1, Ordering::Release);
                self.pending.push(v);
                return;
            }

            // Another producer is flushing. v is not recorded yet.
            hint::spin_loop();
        }
    }

    /// Merge every pending value into the summary now
    ///
    /// Waits for an in-flight flush to finish rather than running beside it.
    /// Values are popped from the queue, so a producer racing with this call
    /// has its value merged now or in a later flush, never twice.
    pub fn force_merge(&self) {
        self.with_flush_flag(Self::merge_pending);
    }

    /// Approximate the value at quantile `q` over every value observed so far
    ///
    /// Returns `None` when nothing has been observed.
    pub fn query(&self, q: f64) -> Option<T> {
        self.with_flush_flag(|buffer| {
            buffer.merge_pending();
            buffer.summary.lock().query(q)
        })
    }

    /// Query several quantiles, each independently
    pub fn snapshot(&self, quantiles: &[f64]) -> Vec<(f64, Option<T>)> {
        quantiles.iter().map(|&q| (q, self.query(q))).collect()
    }

    /// Discard pending values and empty the summary
    ///
    /// Observations that race with this call may survive it.
    pub fn reset(&self) {
        self.with_flush_flag(|buffer| {
            while buffer.pending.pop().is_some() {}
            buffer.pending_count.store(0, Ordering::Release);
            buffer.summary.lock().reset();
        });
    }

    /// Observations merged into the summary
    ///
    /// Excludes anything still pending.
    pub fn count(&self) -> usize {
        self.with_flush_flag(|buffer| buffer.summary.lock().count())
    }

    /// Observations accepted before a flush is triggered
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Merge whatever is pending and hand back the summary
    pub fn into_inner(self) -> CKMS<T, I> {
        self.force_merge();
        self.summary.into_inner()
    }

    fn with_flush_flag<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&Self) -> R,
    {
        while self
            .flushing
            .compare_exchange_weak(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            hint::spin_loop();
        }
        let _flag = FlushFlag(&self.flushing);
        f(self)
    }

    // Callers must hold the flush flag.
    fn merge_pending(&self) {
        self.drain();
        self.pending_count.store(0, Ordering::Release);
    }

    // Callers must hold the flush flag.
    fn drain(&self) {
        let mut batch = Vec::with_capacity(cmp::min(self.capacity, self.pending.len()));
        while let Some(v) = self.pending.pop() {
            batch.push(v);
        }
        if batch.is_empty() {
            return;
        }
        let mut summary = self.summary.lock();
        summary.merge_batch(&mut batch);
        summary.compress();
    }
}

// Clears the flush flag when dropped, including while unwinding from a
// panicking merge, so producers never spin on a flag nobody holds.
struct FlushFlag<'a>(&'a AtomicBool);

impl Drop for FlushFlag<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}
