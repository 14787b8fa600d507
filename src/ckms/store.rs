use std::cmp;
use std::ops::Index;

use log::{debug, trace};

use crate::ckms::entry::Entry;
use crate::ckms::invariant::Invariant;

/// The sample sequence S(n) and the count of observations it represents.
///
/// The reference presentation keeps samples in a linked list and rescans it
/// from the head for every insertion. We keep a flat Vec instead and address
/// samples by index: the rank of an insertion point is still the sum of `g`
/// over every sample ahead of it, including samples inserted earlier in the
/// same batch.
#[derive(Clone, Debug)]
pub struct Store<T, I>
where
    T: PartialEq,
{
    pub invariant: I,
    data: Vec<Entry<T>>,
    n: usize, // observations merged so far
}

impl<T, I> Store<T, I>
where
    T: PartialOrd + Copy,
    I: Invariant,
{
    pub fn new(invariant: I) -> Store<T, I> {
        Store {
            invariant,
            data: Vec::new(),
            n: 0,
        }
    }

    /// Merge a batch of raw observations into the sample sequence
    ///
    /// The batch is sorted and every value inserted in ascending order. The
    /// batch is left empty.
    pub fn merge(&mut self, batch: &mut Vec<T>) {
        if batch.is_empty() {
            return;
        }
        trace!("merging batch of {} into {} samples", batch.len(), self.data.len());

        // Values incomparable even with themselves (NaN) go last, so the
        // rest sort under a total order.
        let comparable = partition_incomparable(batch);
        batch[..comparable].sort_by(|a, b| a.partial_cmp(b).unwrap_or(cmp::Ordering::Equal));

        let mut start = 0;
        if self.data.is_empty() {
            self.data.push(Entry {
                v: batch[0],
                g: 1,
                delta: 0,
            });
            self.n += 1;
            start = 1;
        }

        for &v in &batch[start..] {
            // Seek past every sample not greater than v, so equal values keep
            // their insertion order, accumulating the rank as we go.
            let mut idx = 0;
            let mut r = 0;
            while idx < self.data.len() && !(v < self.data[idx].v) {
                r += self.data[idx].g;
                idx += 1;
            }

            let delta = if idx == 0 || idx == self.data.len() {
                0
            } else {
                (self.invariant.f(r, self.n).floor() as usize).saturating_sub(1)
            };
            self.data.insert(idx, Entry { v, g: 1, delta });
            self.n += 1;
        }

        batch.clear();
    }

    /// Collapse neighbouring samples whose combined uncertainty still fits
    /// under the invariant
    ///
    /// For adjacent samples `(cur, nxt)` at rank `r`, `cur` is absorbed into
    /// `nxt` when `cur.g + nxt.g + nxt.delta <= f(r, n)`. The minimum sample
    /// is never absorbed. The maximum cannot be, as only the left element of
    /// a pair is ever removed.
    pub fn compress(&mut self) {
        if self.data.len() < 3 {
            return;
        }
        let before = self.data.len();

        // Entries in data[..=cur] are settled; data[cur] is the left element
        // of the pair under consideration and r its rank.
        let mut cur = 1;
        let mut r = self.data[0].g + self.data[1].g;
        for nxt in 2..self.data.len() {
            let nxt_entry = self.data[nxt];
            let lhs = self.data[cur].g + nxt_entry.g + nxt_entry.delta;
            if (lhs as f64) <= self.invariant.f(r, self.n) {
                self.data[cur] = Entry {
                    v: nxt_entry.v,
                    g: self.data[cur].g + nxt_entry.g,
                    delta: nxt_entry.delta,
                };
            } else {
                cur += 1;
                self.data[cur] = nxt_entry;
            }
            r += nxt_entry.g;
        }
        self.data.truncate(cur + 1);

        debug!("compressed {} samples to {} (n = {})", before, self.data.len(), self.n);
    }

    /// Approximate the value at quantile `q`
    ///
    /// Returns the value of the last sample whose maximum rank does not
    /// exceed `q * n + f(q * n, n) / 2`, or the maximum when every sample
    /// qualifies.
    pub fn query(&self, q: f64) -> Option<T> {
        let last = self.data.last()?;

        let desired = (q * (self.n as f64)).floor() as usize;
        let bound = (desired as f64) + self.invariant.f(desired, self.n) / 2.0;

        let mut r = 0;
        for pair in self.data.windows(2) {
            let (prev, cur) = (&pair[0], &pair[1]);
            r += prev.g;
            if ((r + cur.g + cur.delta) as f64) > bound {
                return Some(prev.v);
            }
        }
        Some(last.v)
    }

    pub fn clear(&mut self) {
        self.data.clear();
        self.n = 0;
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Total stored samples
    ///
    /// This value will fluctuate as compression happens.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Total observations merged, ever
    ///
    /// This value only decreases on `clear` and may or may not be equivalent
    /// to `Self::len`
    pub fn count(&self) -> usize {
        self.n
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Entry<T>> {
        self.data.iter()
    }
}

// Moves every value for which `v.partial_cmp(&v)` is `None` to the tail of
// `batch`, keeping the relative order of the rest. Returns the number of
// comparable values.
fn partition_incomparable<T>(batch: &mut [T]) -> usize
where
    T: PartialOrd,
{
    let mut keep = 0;
    for i in 0..batch.len() {
        if batch[i].partial_cmp(&batch[i]).is_some() {
            batch.swap(keep, i);
            keep += 1;
        }
    }
    keep
}

impl<T, I> Index<usize> for Store<T, I>
where
    T: PartialEq,
{
    type Output = Entry<T>;

    fn index(&self, index: usize) -> &Self::Output {
        &self.data[index]
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::ckms::invariant::{Quantile, TargetedQuantiles};
    use quickcheck::{QuickCheck, TestResult};

    fn store(pairs: &[(f64, f64)]) -> Store<i32, TargetedQuantiles> {
        let qs: Vec<Quantile> = pairs
            .iter()
            .map(|&(q, e)| Quantile::new(q, e).unwrap())
            .collect();
        Store::new(TargetedQuantiles::new(&qs).unwrap())
    }

    fn scenario() -> Store<i32, TargetedQuantiles> {
        store(&[(0.5, 0.1), (0.9, 0.01), (0.99, 0.001)])
    }

    fn g_sum(store: &Store<i32, TargetedQuantiles>) -> usize {
        store.iter().map(|e| e.g).sum()
    }

    #[test]
    fn first_value_seeds_sequence() {
        let mut store = scenario();
        let mut batch = vec![3, 1, 2];
        store.merge(&mut batch);

        assert!(batch.is_empty());
        assert_eq!(3, store.count());
        let vs: Vec<i32> = store.iter().map(|e| e.v).collect();
        assert_eq!(vec![1, 2, 3], vs);
        // both boundaries carry no uncertainty
        assert_eq!(0, store[0].delta);
        assert_eq!(0, store[2].delta);
    }

    #[test]
    fn ties_keep_insertion_order() {
        let mut store = scenario();
        store.merge(&mut vec![1, 5]);
        store.merge(&mut vec![5, 5]);

        assert_eq!(4, store.len());
        let vs: Vec<i32> = store.iter().map(|e| e.v).collect();
        assert_eq!(vec![1, 5, 5, 5], vs);
    }

    #[test]
    fn empty_batch_is_noop() {
        let mut store = scenario();
        store.merge(&mut vec![]);
        assert!(store.is_empty());
        assert_eq!(None, store.query(0.5));
    }

    #[test]
    fn short_sequences_are_not_compressed() {
        let mut store = store(&[(0.5, 0.9)]);
        store.merge(&mut vec![1, 2]);
        store.compress();
        assert_eq!(2, store.len());
    }

    #[test]
    fn compression_test() {
        let mut store = scenario();
        let mut batch: Vec<i32> = (1..1000).collect();
        store.merge(&mut batch);
        assert_eq!(999, store.len());
        store.compress();

        assert_eq!(999, store.count());
        assert_eq!(999, g_sum(&store));
        assert!(store.len() < 999);
        assert_eq!(1, store[0].v);
        assert_eq!(999, store[store.len() - 1].v);
    }

    #[test]
    fn incomparable_values_sort_last() {
        let mut batch = vec![3.0, f64::NAN, 1.0, f64::NAN, 2.0];
        assert_eq!(3, partition_incomparable(&mut batch));
        assert_eq!(vec![3.0, 1.0, 2.0], batch[..3].to_vec());
        assert!(batch[3].is_nan() && batch[4].is_nan());
    }

    #[test]
    fn merge_with_nan() {
        let qs = [Quantile::new(0.5, 0.1).unwrap()];
        let mut store: Store<f64, TargetedQuantiles> =
            Store::new(TargetedQuantiles::new(&qs).unwrap());
        let mut batch: Vec<f64> = (0..1_000)
            .map(|i| if i % 7 == 0 { f64::NAN } else { f64::from(i) })
            .collect();
        store.merge(&mut batch);
        store.compress();

        assert_eq!(1_000, store.count());
        assert_eq!(1_000, store.iter().map(|e| e.g).sum::<usize>());
        assert_eq!(1.0, store[0].v);
        assert!(store.query(0.5).is_some());
    }

    #[test]
    fn clear_test() {
        let mut store = scenario();
        store.merge(&mut vec![1, 2, 3]);
        store.clear();
        assert!(store.is_empty());
        assert_eq!(0, store.count());
    }

    // prop: compress preserves sum(g) == n and both extremes
    #[test]
    fn compress_conserves_test() {
        fn inner(batches: Vec<Vec<i32>>) -> TestResult {
            let mut store = scenario();
            let mut all: Vec<i32> = vec![];
            for mut batch in batches {
                all.extend_from_slice(&batch);
                store.merge(&mut batch);
                store.compress();
            }
            if all.is_empty() {
                return TestResult::discard();
            }

            let min = *all.iter().min().unwrap();
            let max = *all.iter().max().unwrap();
            TestResult::from_bool(
                store.count() == all.len() && g_sum(&store) == all.len() && store[0].v == min
                    && store[store.len() - 1].v == max,
            )
        }
        QuickCheck::new().quickcheck(inner as fn(Vec<Vec<i32>>) -> TestResult);
    }

    // prop: repeated compression reaches a fixed point without touching sum(g)
    #[test]
    fn compress_fixed_point_test() {
        fn inner(mut fs: Vec<i32>) -> TestResult {
            let mut store = scenario();
            let total = fs.len();
            store.merge(&mut fs);

            let mut prev_len = store.len() + 1;
            while store.len() < prev_len {
                prev_len = store.len();
                store.compress();
            }
            let settled: Vec<(i32, usize, usize)> =
                store.iter().map(|e| (e.v, e.g, e.delta)).collect();
            store.compress();
            let again: Vec<(i32, usize, usize)> =
                store.iter().map(|e| (e.v, e.g, e.delta)).collect();

            TestResult::from_bool(settled == again && g_sum(&store) == total)
        }
        QuickCheck::new().quickcheck(inner as fn(Vec<i32>) -> TestResult);
    }
}
