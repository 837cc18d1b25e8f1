use thiserror::Error;

use crate::Item;

/// Errors that can occur when processing CPU list expressions.
///
/// Every variant carries the offending piece of the input and renders it with a fixed message.
/// The rendered text is a stable contract: operators and tooling match on it, so it must not
/// change between versions.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
#[non_exhaustive]
pub enum Error {
    /// An atom without a range operator that is not a decimal integer.
    #[error("invalid CPU: {atom}")]
    InvalidCpu {
        /// The atom as it appeared in the expression.
        atom: String,
    },

    /// A single index that is not below the total CPU count.
    #[error("CPU greater than total CPUs: {atom}")]
    CpuOutOfBounds {
        /// The atom as it appeared in the expression.
        atom: String,
    },

    /// A range that does not consist of exactly two dash-separated endpoints.
    #[error("invalid range: {range}")]
    InvalidRange {
        /// The range as it appeared in the expression, without any take/stride suffix.
        range: String,
    },

    /// The start of a range is not a decimal integer.
    #[error("invalid start of range: {start}")]
    InvalidRangeStart {
        /// The text before the dash.
        start: String,
    },

    /// The end of a range is not a decimal integer.
    #[error("invalid end of range: {end}")]
    InvalidRangeEnd {
        /// The text after the dash.
        end: String,
    },

    /// The end of a range is not below the total CPU count.
    #[error("end of range greater than total CPUs: {start}-{end}")]
    RangeEndOutOfBounds {
        /// The text before the dash.
        start: String,
        /// The text after the dash.
        end: String,
    },

    /// The start of a range is past its end.
    #[error("start of range greater than end: {start}-{end}")]
    RangeStartAfterEnd {
        /// The text before the dash.
        start: String,
        /// The text after the dash.
        end: String,
    },

    /// The `take/stride` suffix of a striped range is malformed.
    #[error("invalid group size or used size: {suffix}")]
    InvalidStripe {
        /// Everything after the colon.
        suffix: String,
    },

    /// The `take` part of a striped range selects nothing.
    #[error("used size must be at least 1, got: {take}")]
    TakeTooSmall {
        /// The parsed `take` value.
        take: Item,
    },

    /// The `take` part of a striped range exceeds the total CPU count.
    #[error("used size greater than total CPUs: {take}")]
    TakeOutOfBounds {
        /// The parsed `take` value. Wider than a CPU index so that oversized values are still
        /// reported as out of bounds.
        take: u64,
    },
}

/// A specialized `Result` type for CPU list operations, returning the crate's
/// [`Error`] type as the error value.
pub(crate) type Result<T> = std::result::Result<T, Error>;
