use std::num::NonZero;
use std::str::FromStr;

use crate::{Error, Item};

/// One comma-separated element of a CPU list expression, decoded and validated against the
/// total CPU count.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum Atom {
    /// `5`
    Single(Item),

    /// `2-7`, both ends inclusive.
    Range { start: Item, end: Item },

    /// `0-20:2/5`, the first `take` positions of every `stride`-sized block counted from `start`.
    Striped {
        start: Item,
        end: Item,
        take: NonZero<Item>,
        stride: NonZero<Item>,
    },
}

impl Atom {
    /// The CPU indices selected by this atom, in ascending order.
    #[expect(
        clippy::arithmetic_side_effects,
        reason = "position is never below start and stride is non-zero"
    )]
    pub(crate) fn indices(self) -> impl Iterator<Item = Item> {
        let (start, end, take, stride) = match self {
            Self::Single(index) => (index, index, NonZero::<Item>::MIN, NonZero::<Item>::MIN),
            Self::Range { start, end } => (start, end, NonZero::<Item>::MIN, NonZero::<Item>::MIN),
            Self::Striped {
                start,
                end,
                take,
                stride,
            } => (start, end, take, stride),
        };

        (start..=end).filter(move |position| (position - start) % stride < take.get())
    }
}

/// Decodes one atom. The `all` keyword is not an atom; it is only meaningful as a whole
/// expression and is handled by the caller.
///
/// Shape precedence: a colon makes it a striped range, otherwise a dash makes it a plain range,
/// otherwise it must be a single index.
pub(crate) fn classify(atom: &str, total_cpus: NonZero<Item>) -> crate::Result<Atom> {
    if let Some((range, suffix)) = atom.split_once(':') {
        // The range is validated before the suffix is even looked at.
        let (start, end) = classify_range(range, total_cpus)?;
        let (take, stride) = classify_stripe(suffix, total_cpus)?;

        Ok(Atom::Striped {
            start,
            end,
            take,
            stride,
        })
    } else if atom.contains('-') {
        let (start, end) = classify_range(atom, total_cpus)?;

        Ok(Atom::Range { start, end })
    } else {
        classify_single(atom, total_cpus).map(Atom::Single)
    }
}

fn classify_single(atom: &str, total_cpus: NonZero<Item>) -> crate::Result<Item> {
    let index = parse_index(atom).ok_or_else(|| Error::InvalidCpu {
        atom: atom.to_string(),
    })?;

    if index >= total_cpus.get() {
        return Err(Error::CpuOutOfBounds {
            atom: atom.to_string(),
        });
    }

    Ok(index)
}

fn classify_range(range: &str, total_cpus: NonZero<Item>) -> crate::Result<(Item, Item)> {
    let mut parts = range.split('-');

    let (Some(start_text), Some(end_text), None) = (parts.next(), parts.next(), parts.next())
    else {
        return Err(Error::InvalidRange {
            range: range.to_string(),
        });
    };

    let start = parse_index(start_text).ok_or_else(|| Error::InvalidRangeStart {
        start: start_text.to_string(),
    })?;

    let end = parse_index(end_text).ok_or_else(|| Error::InvalidRangeEnd {
        end: end_text.to_string(),
    })?;

    if end >= total_cpus.get() {
        return Err(Error::RangeEndOutOfBounds {
            start: start_text.to_string(),
            end: end_text.to_string(),
        });
    }

    if start > end {
        return Err(Error::RangeStartAfterEnd {
            start: start_text.to_string(),
            end: end_text.to_string(),
        });
    }

    Ok((start, end))
}

fn classify_stripe(
    suffix: &str,
    total_cpus: NonZero<Item>,
) -> crate::Result<(NonZero<Item>, NonZero<Item>)> {
    let invalid = || Error::InvalidStripe {
        suffix: suffix.to_string(),
    };

    let (take_text, stride_text) = suffix.split_once('/').ok_or_else(invalid)?;

    let take = parse_digits::<u64>(take_text).ok_or_else(invalid)?;

    if take == 0 {
        return Err(Error::TakeTooSmall { take: 0 });
    }

    if take > u64::from(total_cpus.get()) {
        return Err(Error::TakeOutOfBounds { take });
    }

    let take = Item::try_from(take)
        .ok()
        .and_then(NonZero::new)
        .ok_or_else(invalid)?;

    let stride = parse_index(stride_text)
        .and_then(NonZero::new)
        .ok_or_else(invalid)?;

    Ok((take, stride))
}

/// Decimal digits only: no sign, no whitespace, and the value must fit in [`Item`].
fn parse_index(text: &str) -> Option<Item> {
    parse_digits(text)
}

fn parse_digits<T: FromStr>(text: &str) -> Option<T> {
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    text.parse().ok()
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use new_zealand::nz;

    use super::*;

    #[test]
    fn classifies_each_shape() {
        assert_eq!(classify("3", nz!(4)).unwrap(), Atom::Single(3));
        assert_eq!(
            classify("1-3", nz!(4)).unwrap(),
            Atom::Range { start: 1, end: 3 }
        );
        assert_eq!(
            classify("0-20:2/5", nz!(24)).unwrap(),
            Atom::Striped {
                start: 0,
                end: 20,
                take: nz!(2),
                stride: nz!(5),
            }
        );
    }

    #[test]
    fn all_is_not_an_atom() {
        assert_eq!(
            classify("all", nz!(4)).unwrap_err(),
            Error::InvalidCpu {
                atom: "all".to_string()
            }
        );
    }

    #[test]
    fn signs_and_whitespace_are_not_digits() {
        assert!(matches!(
            classify("+1", nz!(4)),
            Err(Error::InvalidCpu { .. })
        ));
        assert!(matches!(
            classify(" 1", nz!(4)),
            Err(Error::InvalidCpu { .. })
        ));
        assert!(matches!(
            classify("1- 2", nz!(4)),
            Err(Error::InvalidRangeEnd { .. })
        ));
    }

    #[test]
    fn index_overflowing_item_is_invalid() {
        assert_eq!(
            classify("99999999999", nz!(4)).unwrap_err().to_string(),
            "invalid CPU: 99999999999"
        );
    }

    #[test]
    fn colon_without_dash_is_invalid_range() {
        assert_eq!(
            classify("5:1/2", nz!(8)).unwrap_err().to_string(),
            "invalid range: 5"
        );
    }

    #[test]
    fn range_errors_are_checked_in_order() {
        // An unparseable end is reported before any bounds check.
        assert_eq!(
            classify("9-x", nz!(8)).unwrap_err().to_string(),
            "invalid end of range: x"
        );

        // Out-of-bounds end wins over an inverted range.
        assert_eq!(
            classify("9-8", nz!(8)).unwrap_err().to_string(),
            "end of range greater than total CPUs: 9-8"
        );
    }

    #[test]
    fn stripe_with_bad_stride() {
        assert_eq!(
            classify("0-3:1/0", nz!(8)).unwrap_err().to_string(),
            "invalid group size or used size: 1/0"
        );
        assert_eq!(
            classify("0-3:1/x", nz!(8)).unwrap_err().to_string(),
            "invalid group size or used size: 1/x"
        );
        assert_eq!(
            classify("0-3:x/2", nz!(8)).unwrap_err().to_string(),
            "invalid group size or used size: x/2"
        );
    }

    #[test]
    fn take_wider_than_an_index_is_out_of_bounds() {
        assert_eq!(
            classify("0-3:99999999999/10", nz!(8)).unwrap_err(),
            Error::TakeOutOfBounds { take: 99_999_999_999 }
        );
        assert_eq!(
            classify("0-3:99999999999/10", nz!(8))
                .unwrap_err()
                .to_string(),
            "used size greater than total CPUs: 99999999999"
        );
    }

    #[test]
    fn take_equal_to_total_is_allowed() {
        assert!(classify("0-3:8/10", nz!(8)).is_ok());
    }

    #[test]
    fn striped_indices() {
        let atom = classify("0-20:2/5", nz!(24)).unwrap();

        assert_eq!(
            atom.indices().collect::<Vec<_>>(),
            vec![0, 1, 5, 6, 10, 11, 15, 16, 20]
        );
    }

    #[test]
    fn striped_indices_are_relative_to_start() {
        let atom = classify("3-12:1/4", nz!(16)).unwrap();

        assert_eq!(atom.indices().collect::<Vec<_>>(), vec![3, 7, 11]);
    }

    #[test]
    fn take_larger_than_stride_selects_everything() {
        let atom = classify("2-5:3/2", nz!(8)).unwrap();

        assert_eq!(atom.indices().collect::<Vec<_>>(), vec![2, 3, 4, 5]);
    }

    #[test]
    fn single_and_range_indices() {
        assert_eq!(Atom::Single(7).indices().collect::<Vec<_>>(), vec![7]);
        assert_eq!(
            Atom::Range { start: 2, end: 4 }
                .indices()
                .collect::<Vec<_>>(),
            vec![2, 3, 4]
        );
    }
}
