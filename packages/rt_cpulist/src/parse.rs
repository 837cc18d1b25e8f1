use std::num::NonZero;

use crate::classify::classify;
use crate::{CpuSet, Item};

/// The keyword that selects every CPU. Only valid as the entire expression.
pub const ALL_KEYWORD: &str = "all";

/// Parses a [CPU list expression][crate] and returns the selected CPU indices.
///
/// Every index must be below `total_cpus`. The expression is processed left to right and the
/// first invalid atom aborts parsing; no partial result is returned. Duplicate indices are
/// allowed and collapse into one.
///
/// Whitespace is not trimmed. An empty expression is an error because the empty atom is not a
/// valid CPU index.
///
/// # Example
///
/// ```
/// use std::num::NonZero;
///
/// let total = NonZero::new(24).unwrap();
/// let cpus = rt_cpulist::parse("0-20:2/5,23", total).unwrap();
///
/// assert_eq!(cpus.to_string(), "0,1,5,6,10,11,15,16,20,23");
/// ```
pub fn parse(expression: &str, total_cpus: NonZero<Item>) -> crate::Result<CpuSet> {
    if expression == ALL_KEYWORD {
        return Ok(CpuSet::universe(total_cpus));
    }

    let mut cpus = CpuSet::new();

    for atom in expression.split(',') {
        cpus.extend_from(classify(atom, total_cpus)?.indices());
    }

    Ok(cpus)
}
