#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Parsing, validation and set algebra for the CPU list expressions used to configure real-time
//! Linux kernels: `isolcpus=`, `nohz_full=`, `/proc/irq/*/smp_affinity_list` and similar.
//!
//! Example expression: `0-3,8,12-23:2/4`
//!
//! Every operation takes the total CPU count explicitly. Whether that is the live machine's CPU
//! count or a bound from configuration is the caller's decision.
//!
//! # Format
//!
//! The expression is either the keyword `all`, which selects every CPU, or a comma-separated
//! list of one or more atoms, where each atom is either:
//!
//! * a single CPU index (e.g. `1`)
//! * an inclusive range of indices (e.g. `2-4`)
//! * a striped range `start-end:take/stride` that selects the first `take` indices of every
//!   block of `stride` indices counted from `start` (e.g. `0-20:2/5` is
//!   `0,1,5,6,10,11,15,16,20`)
//!
//! Whitespace or extra characters are not allowed anywhere in the expression. Every index must
//! be below the total CPU count. Invalid input is reported with the first [`Error`] encountered;
//! the error text is stable and meant to be shown to operators verbatim.
//!
//! Kernel parameters such as `isolcpus=` may prefix the list with keyword flags; see
//! [`parse_with_flags()`].
//!
//! # Example
//!
//! ```
//! use std::num::NonZero;
//!
//! let total = NonZero::new(8).unwrap();
//!
//! let isolated = rt_cpulist::parse("2-5", total).unwrap();
//! let handlers = isolated.complement(total);
//!
//! assert_eq!(handlers.to_string(), "0,1,6,7");
//! assert!(rt_cpulist::are_mutually_exclusive("2-5", "0,1", total).unwrap());
//! ```

mod algebra;
mod classify;
mod emit;
mod error;
mod flags;
mod parse;
mod set;

pub use algebra::*;
pub use emit::*;
pub use error::*;
pub use flags::*;
pub use parse::*;
pub use set::*;

pub(crate) type Item = u32;
