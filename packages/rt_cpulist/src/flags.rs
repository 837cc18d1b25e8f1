use std::num::NonZero;

use itertools::Itertools;

use crate::{CpuSet, Item, parse};

/// Stands for the highest CPU index in the CPU list portion of a flagged expression, either as a
/// whole atom (`0,N`) or as a range bound (`2-N`, `2-N:1/2`). Matched case-insensitively.
pub const LAST_CPU_PLACEHOLDER: &str = "N";

/// The result of [`parse_with_flags()`]: the leading keyword flags plus the CPU list that
/// followed them.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct FlaggedCpuList {
    flags: Vec<String>,
    cpus: CpuSet,
}

impl FlaggedCpuList {
    /// The recognized flags in the order they were written. Repeated flags are kept.
    #[must_use]
    pub fn flags(&self) -> &[String] {
        &self.flags
    }

    /// The CPUs selected by the list portion.
    ///
    /// This is empty when the expression contained only flags. Whether that is acceptable is up
    /// to the caller; most kernel parameters require at least one CPU.
    #[must_use]
    pub fn cpus(&self) -> &CpuSet {
        &self.cpus
    }

    /// Splits the result into its flags and CPUs.
    #[must_use]
    pub fn into_parts(self) -> (Vec<String>, CpuSet) {
        (self.flags, self.cpus)
    }
}

/// Parses a CPU list that may be preceded by keyword flags, as accepted by kernel parameters
/// such as `isolcpus=domain,managed_irq,2-5`.
///
/// Leading atoms that exactly match one of `recognized_flags` are collected as flags. The first
/// atom that is not a recognized flag starts the CPU list; it and everything after it is parsed
/// with [`parse()`]. Flags are not recognized once the CPU list has started.
///
/// In the CPU list portion, [`LAST_CPU_PLACEHOLDER`] is replaced by the highest CPU index
/// (`total_cpus - 1`) wherever it forms a whole atom or a range bound. The atoms keep their
/// order, so `all` is still only accepted as the entire CPU list.
///
/// # Example
///
/// ```
/// use std::num::NonZero;
///
/// let total = NonZero::new(8).unwrap();
/// let list =
///     rt_cpulist::parse_with_flags("nohz,domain,2-3", &["domain", "nohz", "managed_irq"], total)
///         .unwrap();
///
/// assert_eq!(list.flags(), ["nohz", "domain"]);
/// assert_eq!(list.cpus().to_string(), "2,3");
/// ```
pub fn parse_with_flags(
    expression: &str,
    recognized_flags: &[&str],
    total_cpus: NonZero<Item>,
) -> crate::Result<FlaggedCpuList> {
    let mut atoms = expression.split(',').peekable();

    let mut flags = Vec::new();

    while let Some(flag) = atoms.next_if(|atom| recognized_flags.contains(atom)) {
        flags.push(flag.to_string());
    }

    let last_cpu = total_cpus.get().saturating_sub(1).to_string();

    let list = atoms
        .map(|atom| resolve_placeholder(atom, &last_cpu))
        .join(",");

    let cpus = if list.is_empty() {
        CpuSet::new()
    } else {
        parse(&list, total_cpus)?
    };

    Ok(FlaggedCpuList { flags, cpus })
}

/// Replaces the placeholder in the range bounds of `atom`. A single index counts as a range with
/// one bound, and the stripe suffix is left alone.
fn resolve_placeholder(atom: &str, last_cpu: &str) -> String {
    let (range, stripe) = match atom.split_once(':') {
        Some((range, stripe)) => (range, Some(stripe)),
        None => (atom, None),
    };

    let range = range
        .split('-')
        .map(|bound| {
            if bound.eq_ignore_ascii_case(LAST_CPU_PLACEHOLDER) {
                last_cpu
            } else {
                bound
            }
        })
        .join("-");

    match stripe {
        Some(stripe) => format!("{range}:{stripe}"),
        None => range,
    }
}
