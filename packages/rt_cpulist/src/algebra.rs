use std::num::NonZero;

use crate::{Item, parse};

/// Parses `expression` and returns the canonical list of every CPU below `total_cpus` that the
/// expression does not select.
///
/// This is how interrupt handling is moved off isolated CPUs: the handler affinity is the
/// complement of the isolated set. The result may be empty if the expression selects every CPU.
///
/// # Example
///
/// ```
/// use std::num::NonZero;
///
/// let total = NonZero::new(10).unwrap();
///
/// assert_eq!(rt_cpulist::complement("0-7", total).unwrap(), "8,9");
/// ```
pub fn complement(expression: &str, total_cpus: NonZero<Item>) -> crate::Result<String> {
    Ok(parse(expression, total_cpus)?
        .complement(total_cpus)
        .to_string())
}

/// Parses both expressions against the same CPU count and reports whether they select no CPU
/// in common.
///
/// If both expressions are invalid, the error for `a` is returned.
pub fn are_mutually_exclusive(
    a: &str,
    b: &str,
    total_cpus: NonZero<Item>,
) -> crate::Result<bool> {
    let a = parse(a, total_cpus)?;
    let b = parse(b, total_cpus)?;

    Ok(a.is_disjoint(&b))
}
