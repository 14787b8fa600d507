use std::cmp;

/// A stored sample: the tuple `(v, g, delta)`.
///
/// `g` is the difference between the minimum rank of `v` and the minimum rank
/// of its predecessor. `delta` is the difference between the maximum and
/// minimum rank `v` may hold. `delta` is fixed when the sample is inserted.
#[derive(Debug, Clone, Copy)]
pub struct Entry<T>
where
    T: PartialEq,
{
    pub g: usize,
    pub delta: usize,
    pub v: T,
}

// The derivation of PartialEq for Entry is not appropriate. The sole ordering
// value in an Entry is the value 'v'.
impl<T> PartialEq for Entry<T>
where
    T: PartialEq,
{
    fn eq(&self, other: &Entry<T>) -> bool {
        self.v == other.v
    }
}

impl<T> PartialOrd for Entry<T>
where
    T: PartialOrd,
{
    fn partial_cmp(&self, other: &Entry<T>) -> Option<cmp::Ordering> {
        self.v.partial_cmp(&other.v)
    }
}
