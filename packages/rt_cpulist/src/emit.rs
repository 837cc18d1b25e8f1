use itertools::Itertools;

use crate::Item;

/// Generates the canonical textual form of a set of CPU indices: ascending, duplicates removed,
/// separated by commas, e.g. `0,1,5,6`.
///
/// Consecutive indices are deliberately not folded into ranges and the `all` keyword is never
/// emitted, so the output can be written as-is into `smp_affinity_list` or a kernel parameter.
/// The output can be parsed back with [`parse()`][crate::parse] given a sufficient CPU count.
/// An empty input produces an empty string.
pub fn emit(items: impl IntoIterator<Item = Item>) -> String {
    items.into_iter().sorted_unstable().dedup().join(",")
}
