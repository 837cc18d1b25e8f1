use std::num::NonZero;

use log::debug;
use regex::Regex;
use rt_cpulist::{CpuSet, parse, parse_with_flags};
use serde::Deserialize;
use thiserror::Error;

use crate::irq::{IrqAttribute, IrqMatcher, IrqRule};

/// Keyword flags the kernel accepts in front of the `isolcpus=` CPU list.
pub const ISOLCPUS_FLAGS: &[&str] = &["domain", "nohz", "managed_irq"];

/// The rt_conf configuration file, in TOML format.
///
/// ```toml
/// [kernel_cmdline]
/// isolcpus = "domain,managed_irq,2-5"
/// nohz = "on"
/// nohz_full = "2-5"
/// kthread_cpus = "0,1"
/// irqaffinity = "0,1"
///
/// [interrupts]
/// remove_from_cpus = "2-5"
/// handle_on_cpus = "0,1"
///
/// [[irq_tuning]]
/// cpus = "0"
/// filter = { actions = "^eth0", type = "edge" }
/// ```
///
/// Every section and field is optional. Use [`Config::validate()`] before acting on it.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(deny_unknown_fields)]
#[non_exhaustive]
pub struct Config {
    /// Parameters to add to the default kernel command line.
    #[serde(default)]
    pub kernel_cmdline: KernelCmdline,

    /// Runtime interrupt affinity.
    #[serde(default)]
    pub interrupts: Interrupts,

    /// Affinity for selected interrupts, applied after [`Config::interrupts`]. When several
    /// entries select the same interrupt, the last one wins.
    #[serde(default)]
    pub irq_tuning: Vec<IrqTuning>,
}

/// Real-time related kernel command-line parameters.
///
/// Values are CPU list expressions and are passed to the kernel as written.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(deny_unknown_fields)]
#[non_exhaustive]
pub struct KernelCmdline {
    /// `isolcpus=`, optionally prefixed by [`ISOLCPUS_FLAGS`].
    pub isolcpus: Option<String>,

    /// `nohz=`
    pub nohz: Option<Nohz>,

    /// `nohz_full=`
    pub nohz_full: Option<String>,

    /// `kthread_cpus=`
    pub kthread_cpus: Option<String>,

    /// `irqaffinity=`
    pub irqaffinity: Option<String>,
}

/// Value of the `nohz=` kernel parameter.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "lowercase")]
#[non_exhaustive]
pub enum Nohz {
    /// Dynamic ticks enabled.
    On,

    /// Dynamic ticks disabled.
    Off,
}

impl Nohz {
    /// The value as written on the kernel command line.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::On => "on",
            Self::Off => "off",
        }
    }
}

/// Which CPUs service hardware interrupts at runtime.
///
/// If `handle_on_cpus` is absent, interrupts are handled by every CPU that is not listed in
/// `remove_from_cpus`.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(deny_unknown_fields)]
#[non_exhaustive]
pub struct Interrupts {
    /// CPUs that must not service interrupts.
    pub remove_from_cpus: Option<String>,

    /// CPUs that service interrupts.
    pub handle_on_cpus: Option<String>,
}

/// Moves the interrupts selected by [`IrqFilter`] to `cpus`.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(deny_unknown_fields)]
#[non_exhaustive]
pub struct IrqTuning {
    /// CPUs that service the selected interrupts.
    pub cpus: String,

    /// Which interrupts to move. An empty filter selects every interrupt.
    #[serde(default)]
    pub filter: IrqFilter,
}

/// Regular expressions matched against the files in `/sys/kernel/irq/<irq>/`.
///
/// An interrupt is selected when every present pattern matches the corresponding file.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(deny_unknown_fields)]
#[non_exhaustive]
pub struct IrqFilter {
    /// Matched against `actions`, the names of the registered handlers.
    pub actions: Option<String>,

    /// Matched against `chip_name`, the interrupt controller.
    pub chip_name: Option<String>,

    /// Matched against `name`, the flow handler name.
    pub name: Option<String>,

    /// Matched against `type`, the trigger type such as `edge` or `level`.
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

/// Errors that can occur when loading or validating a [`Config`].
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// The configuration is not valid TOML or does not match the expected shape.
    #[error("invalid configuration: {0}")]
    Syntax(#[from] toml::de::Error),

    /// A CPU list field failed to parse.
    #[error("{field}: {source}")]
    InvalidCpuList {
        /// The offending field, as `section.field`.
        field: &'static str,

        /// The parser error, whose text is shown verbatim.
        source: rt_cpulist::Error,
    },

    /// A CPU list field parsed successfully but selects no CPU.
    #[error("{field}: no CPUs selected")]
    EmptyCpuList {
        /// The offending field, as `section.field`.
        field: &'static str,
    },

    /// Two CPU lists that must not overlap share at least one CPU.
    #[error("{first} and {second} must be mutually exclusive")]
    OverlappingCpuLists {
        /// The first field, as `section.field`.
        first: &'static str,

        /// The second field, as `section.field`.
        second: &'static str,
    },

    /// Removing interrupts from the listed CPUs would leave no CPU to handle them.
    #[error("interrupts.remove_from_cpus leaves no CPU to handle interrupts")]
    NoHandlerCpus,

    /// The CPU list of an `[[irq_tuning]]` entry failed to parse.
    #[error("irq_tuning[{index}].cpus: {source}")]
    InvalidTuningCpuList {
        /// Position of the entry in the file, starting from 0.
        index: usize,

        /// The parser error, whose text is shown verbatim.
        source: rt_cpulist::Error,
    },

    /// A filter pattern of an `[[irq_tuning]]` entry is not a valid regular expression.
    #[error("on field irq_tuning[{index}].filter.{field}: invalid regex: {source}")]
    InvalidRegex {
        /// Position of the entry in the file, starting from 0.
        index: usize,

        /// The filter field.
        field: &'static str,

        /// The regex compilation error.
        source: regex::Error,
    },
}

impl Config {
    /// Parses a configuration from TOML text. The result is not validated.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;

        debug!("loaded configuration: {config:?}");

        Ok(config)
    }

    /// Checks every CPU list against `total_cpus` and checks the relations between fields.
    ///
    /// The first problem found is returned.
    pub fn validate(&self, total_cpus: NonZero<u32>) -> Result<(), ConfigError> {
        self.kernel_cmdline.validate(total_cpus)?;
        self.interrupts.validate(total_cpus)?;
        self.irq_rules(total_cpus).map(|_| ())
    }

    /// Parses the CPU lists and compiles the filters of every `[[irq_tuning]]` entry, in file
    /// order.
    pub(crate) fn irq_rules(&self, total_cpus: NonZero<u32>) -> Result<Vec<IrqRule>, ConfigError> {
        self.irq_tuning
            .iter()
            .enumerate()
            .map(|(index, tuning)| tuning.rule(index, total_cpus))
            .collect()
    }
}

impl IrqTuning {
    fn rule(&self, index: usize, total_cpus: NonZero<u32>) -> Result<IrqRule, ConfigError> {
        let matcher = self.filter.matcher(index)?;

        let cpus = parse(&self.cpus, total_cpus)
            .map_err(|source| ConfigError::InvalidTuningCpuList { index, source })?;

        Ok(IrqRule { cpus, matcher })
    }
}

impl IrqFilter {
    fn matcher(&self, index: usize) -> Result<IrqMatcher, ConfigError> {
        let fields = [
            ("actions", IrqAttribute::Actions, &self.actions),
            ("chip_name", IrqAttribute::ChipName, &self.chip_name),
            ("name", IrqAttribute::Name, &self.name),
            ("type", IrqAttribute::Type, &self.kind),
        ];

        let mut patterns = Vec::new();

        for (field, attribute, pattern) in fields {
            let Some(pattern) = pattern else {
                continue;
            };

            let regex = Regex::new(pattern).map_err(|source| ConfigError::InvalidRegex {
                index,
                field,
                source,
            })?;

            patterns.push((attribute, regex));
        }

        Ok(IrqMatcher::new(patterns))
    }
}

impl KernelCmdline {
    fn validate(&self, total_cpus: NonZero<u32>) -> Result<(), ConfigError> {
        if let Some(isolcpus) = &self.isolcpus {
            let list = parse_with_flags(isolcpus, ISOLCPUS_FLAGS, total_cpus).map_err(|source| {
                ConfigError::InvalidCpuList {
                    field: "kernel_cmdline.isolcpus",
                    source,
                }
            })?;

            if list.cpus().is_empty() {
                return Err(ConfigError::EmptyCpuList {
                    field: "kernel_cmdline.isolcpus",
                });
            }
        }

        parse_field(
            "kernel_cmdline.nohz_full",
            self.nohz_full.as_deref(),
            total_cpus,
        )?;
        parse_field(
            "kernel_cmdline.kthread_cpus",
            self.kthread_cpus.as_deref(),
            total_cpus,
        )?;
        parse_field(
            "kernel_cmdline.irqaffinity",
            self.irqaffinity.as_deref(),
            total_cpus,
        )?;

        Ok(())
    }
}

impl Interrupts {
    fn validate(&self, total_cpus: NonZero<u32>) -> Result<(), ConfigError> {
        self.handler_cpus(total_cpus).map(|_| ())
    }

    /// The CPUs that should service interrupts, or `None` if interrupt affinity is not
    /// configured at all.
    ///
    /// This is `handle_on_cpus` if present, otherwise the complement of `remove_from_cpus`. Both
    /// lists are validated, and they must not overlap.
    pub fn handler_cpus(&self, total_cpus: NonZero<u32>) -> Result<Option<CpuSet>, ConfigError> {
        let remove_from = parse_field(
            "interrupts.remove_from_cpus",
            self.remove_from_cpus.as_deref(),
            total_cpus,
        )?;
        let handle_on = parse_field(
            "interrupts.handle_on_cpus",
            self.handle_on_cpus.as_deref(),
            total_cpus,
        )?;

        match (remove_from, handle_on) {
            (Some(remove_from), Some(handle_on)) => {
                if !remove_from.is_disjoint(&handle_on) {
                    return Err(ConfigError::OverlappingCpuLists {
                        first: "interrupts.remove_from_cpus",
                        second: "interrupts.handle_on_cpus",
                    });
                }

                Ok(Some(handle_on))
            }
            (None, Some(handle_on)) => Ok(Some(handle_on)),
            (Some(remove_from), None) => {
                let handlers = remove_from.complement(total_cpus);

                if handlers.is_empty() {
                    return Err(ConfigError::NoHandlerCpus);
                }

                Ok(Some(handlers))
            }
            (None, None) => Ok(None),
        }
    }
}

fn parse_field(
    field: &'static str,
    value: Option<&str>,
    total_cpus: NonZero<u32>,
) -> Result<Option<CpuSet>, ConfigError> {
    value
        .map(|expression| {
            parse(expression, total_cpus)
                .map_err(|source| ConfigError::InvalidCpuList { field, source })
        })
        .transpose()
}
