use std::collections::BTreeSet;
use std::collections::btree_set;
use std::fmt::{self, Display};
use std::iter::Copied;
use std::num::NonZero;

use crate::{Item, emit};

/// A set of CPU indices produced by parsing a CPU list expression.
///
/// Membership is what matters; iteration always yields indices in ascending order. The
/// [`Display`] implementation writes the canonical form accepted by `smp_affinity_list` and by
/// kernel command-line parameters: ascending bare indices separated by commas, e.g. `0,1,5`.
///
/// # Example
///
/// ```
/// use std::num::NonZero;
///
/// let total = NonZero::new(8).unwrap();
/// let cpus = rt_cpulist::parse("4-6,1", total).unwrap();
///
/// assert!(cpus.contains(5));
/// assert_eq!(cpus.to_string(), "1,4,5,6");
/// ```
#[derive(Clone, Debug, Default, Eq, Hash, PartialEq)]
pub struct CpuSet {
    indices: BTreeSet<Item>,
}

impl CpuSet {
    /// Creates an empty set.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            indices: BTreeSet::new(),
        }
    }

    /// Creates the set of every CPU index below `total_cpus`.
    #[must_use]
    pub fn universe(total_cpus: NonZero<Item>) -> Self {
        (0..total_cpus.get()).collect()
    }

    /// Whether `index` is a member of the set.
    #[must_use]
    pub fn contains(&self, index: Item) -> bool {
        self.indices.contains(&index)
    }

    /// Number of distinct indices in the set.
    #[must_use]
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    /// Whether the set has no members.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Iterates over the members in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = Item> + '_ {
        self.indices.iter().copied()
    }

    /// The highest member, if any.
    #[must_use]
    pub fn last(&self) -> Option<Item> {
        self.indices.last().copied()
    }

    /// Whether the two sets share no index.
    #[must_use]
    pub fn is_disjoint(&self, other: &Self) -> bool {
        self.indices.is_disjoint(&other.indices)
    }

    /// Returns every index below `total_cpus` that is not a member of this set.
    ///
    /// Members at or above `total_cpus` are ignored.
    #[must_use]
    pub fn complement(&self, total_cpus: NonZero<Item>) -> Self {
        (0..total_cpus.get())
            .filter(|index| !self.contains(*index))
            .collect()
    }

    pub(crate) fn extend_from(&mut self, indices: impl IntoIterator<Item = Item>) {
        self.indices.extend(indices);
    }
}

impl FromIterator<Item> for CpuSet {
    fn from_iter<T: IntoIterator<Item = Item>>(iter: T) -> Self {
        Self {
            indices: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a CpuSet {
    type Item = Item;
    type IntoIter = Copied<btree_set::Iter<'a, Item>>;

    fn into_iter(self) -> Self::IntoIter {
        self.indices.iter().copied()
    }
}

impl IntoIterator for CpuSet {
    type Item = Item;
    type IntoIter = btree_set::IntoIter<Item>;

    fn into_iter(self) -> Self::IntoIter {
        self.indices.into_iter()
    }
}

impl Display for CpuSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&emit(self))
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use new_zealand::nz;
    use static_assertions::assert_impl_all;

    use super::*;

    assert_impl_all!(CpuSet: Send, Sync, Clone);

    #[test]
    fn universe_covers_every_index() {
        let universe = CpuSet::universe(nz!(4));

        assert_eq!(universe.iter().collect::<Vec<_>>(), vec![0, 1, 2, 3]);
        assert_eq!(universe.len(), 4);
    }

    #[test]
    fn duplicates_collapse() {
        let set: CpuSet = [3, 1, 3, 2, 1].into_iter().collect();

        assert_eq!(set.iter().collect::<Vec<_>>(), vec![1, 2, 3]);
        assert_eq!(set.last(), Some(3));
    }

    #[test]
    fn complement_ignores_out_of_universe_members() {
        let set: CpuSet = [0, 2, 9].into_iter().collect();

        let complement = set.complement(nz!(4));

        assert_eq!(complement.iter().collect::<Vec<_>>(), vec![1, 3]);
    }

    #[test]
    fn complement_of_universe_is_empty() {
        let universe = CpuSet::universe(nz!(3));

        assert!(universe.complement(nz!(3)).is_empty());
    }

    #[test]
    fn disjointness() {
        let a: CpuSet = [1, 2, 3].into_iter().collect();
        let b: CpuSet = [3, 4].into_iter().collect();
        let c: CpuSet = [5, 6].into_iter().collect();

        assert!(!a.is_disjoint(&b));
        assert!(a.is_disjoint(&c));
        assert!(CpuSet::new().is_disjoint(&a));
    }

    #[test]
    fn display_is_canonical() {
        let set: CpuSet = [9, 8, 0].into_iter().collect();

        assert_eq!(set.to_string(), "0,8,9");
        assert_eq!(CpuSet::new().to_string(), "");
    }
}
