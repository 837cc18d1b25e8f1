use std::collections::HashMap;

use thiserror::Error;

use crate::{KernelCmdline, Nohz};

/// Errors found in a kernel command line.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
#[non_exhaustive]
pub enum CmdlineError {
    /// The same `key=value` parameter appears more than once with different values.
    #[error("duplicated parameter: {key}")]
    DuplicatedParameter {
        /// The parameter name.
        key: String,
    },
}

impl KernelCmdline {
    /// Renders the configured parameters as `key=value` strings, in a fixed order. Parameters
    /// that are not configured are omitted.
    ///
    /// ```
    /// let cmdline: rt_conf::KernelCmdline =
    ///     toml::from_str("isolcpus = \"managed_irq,2-3\"\nnohz = \"on\"").unwrap();
    ///
    /// assert_eq!(cmdline.to_params(), ["isolcpus=managed_irq,2-3", "nohz=on"]);
    /// ```
    #[must_use]
    pub fn to_params(&self) -> Vec<String> {
        [
            ("isolcpus", self.isolcpus.as_deref()),
            ("nohz", self.nohz.map(Nohz::as_str)),
            ("nohz_full", self.nohz_full.as_deref()),
            ("kthread_cpus", self.kthread_cpus.as_deref()),
            ("irqaffinity", self.irqaffinity.as_deref()),
        ]
        .into_iter()
        .filter_map(|(key, value)| value.map(|value| format!("{key}={value}")))
        .collect()
    }
}

/// The name of a command-line parameter: the part before `=`, or the whole word for flags
/// like `quiet`.
pub(crate) fn param_key(param: &str) -> &str {
    param.split_once('=').map_or(param, |(key, _)| key)
}

/// Checks that no `key=value` parameter in a whitespace-separated kernel command line is given
/// twice with different values.
///
/// Repeating a parameter with the same value, or repeating a bare flag, is harmless and allowed.
pub fn find_duplicated_params(cmdline: &str) -> Result<(), CmdlineError> {
    let mut seen: HashMap<&str, &str> = HashMap::new();

    for param in cmdline.split_whitespace() {
        let Some((key, value)) = param.split_once('=') else {
            continue;
        };

        if let Some(previous) = seen.insert(key, value) {
            if previous != value {
                return Err(CmdlineError::DuplicatedParameter {
                    key: key.to_string(),
                });
            }
        }
    }

    Ok(())
}
