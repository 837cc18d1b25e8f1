use std::collections::BTreeMap;
use std::io;
use std::num::NonZero;

use log::{debug, info, warn};
use regex::Regex;
use rt_cpulist::{CpuSet, parse};
use thiserror::Error;

use crate::pal::Platform;

/// Errors that can occur when reading or changing interrupt affinity.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum IrqError {
    /// The list of interrupts could not be read.
    #[error("error reading /proc/irq: {0}")]
    List(#[source] io::Error),

    /// The affinity of an interrupt could not be read.
    #[error("error reading /proc/irq/{irq}/smp_affinity_list: {source}")]
    Read {
        /// The interrupt number.
        irq: u32,
        /// The underlying I/O error.
        source: io::Error,
    },

    /// A descriptive attribute of an interrupt could not be read.
    #[error("error reading /sys/kernel/irq/{irq}/{attribute}: {source}")]
    ReadAttribute {
        /// The interrupt number.
        irq: u32,
        /// The attribute file name.
        attribute: &'static str,
        /// The underlying I/O error.
        source: io::Error,
    },

    /// The kernel reported an affinity that is not a valid CPU list.
    #[error("error parsing CPUs for IRQ {irq}: {source}")]
    Parse {
        /// The interrupt number.
        irq: u32,
        /// The parser error.
        source: rt_cpulist::Error,
    },

    /// The affinity of an interrupt could not be changed for a reason other than the interrupt
    /// being kernel-managed.
    #[error("error writing to /proc/irq/{irq}/smp_affinity_list: {source}")]
    Write {
        /// The interrupt number.
        irq: u32,
        /// The underlying I/O error.
        source: io::Error,
    },
}

/// The current affinity of one interrupt.
#[derive(Clone, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub struct IrqAffinity {
    /// The interrupt number.
    pub irq: u32,

    /// The CPUs currently allowed to service the interrupt.
    pub cpus: CpuSet,
}

/// What changing interrupt affinity did to each interrupt.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
#[non_exhaustive]
pub struct RemapReport {
    /// Interrupts whose affinity was changed.
    pub remapped: Vec<u32>,

    /// Kernel-managed interrupts that refused the change and were left alone.
    pub skipped_managed: Vec<u32>,
}

/// The descriptive files under `/sys/kernel/irq/{irq}/` that interrupts can be selected by.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum IrqAttribute {
    Actions,
    ChipName,
    Name,
    Type,
}

impl IrqAttribute {
    pub(crate) const fn file_name(self) -> &'static str {
        match self {
            Self::Actions => "actions",
            Self::ChipName => "chip_name",
            Self::Name => "name",
            Self::Type => "type",
        }
    }
}

/// Selects interrupts whose sysfs attributes match every configured pattern.
///
/// A matcher without patterns selects every interrupt.
#[derive(Clone, Debug, Default)]
pub(crate) struct IrqMatcher {
    patterns: Vec<(IrqAttribute, Regex)>,
}

impl IrqMatcher {
    pub(crate) fn new(patterns: Vec<(IrqAttribute, Regex)>) -> Self {
        Self { patterns }
    }

    fn matches(&self, platform: &impl Platform, irq: u32) -> Result<bool, IrqError> {
        for (attribute, pattern) in &self.patterns {
            let value = platform
                .read_irq_attribute(irq, *attribute)
                .map_err(|source| IrqError::ReadAttribute {
                    irq,
                    attribute: attribute.file_name(),
                    source,
                })?;

            if !pattern.is_match(value.trim()) {
                return Ok(false);
            }
        }

        Ok(true)
    }
}

/// Moves the interrupts selected by `matcher` to `cpus`.
#[derive(Clone, Debug)]
pub(crate) struct IrqRule {
    pub(crate) cpus: CpuSet,
    pub(crate) matcher: IrqMatcher,
}

/// The affinity each interrupt should end up with.
pub(crate) type AffinityPlan = BTreeMap<u32, CpuSet>;

/// Reads the current affinity of every interrupt.
pub(crate) fn snapshot(
    platform: &impl Platform,
    total_cpus: NonZero<u32>,
) -> Result<Vec<IrqAffinity>, IrqError> {
    platform
        .irq_numbers()
        .map_err(IrqError::List)?
        .into_iter()
        .map(|irq| {
            let contents = platform
                .read_smp_affinity_list(irq)
                .map_err(|source| IrqError::Read { irq, source })?;

            let cpus = parse(contents.trim(), total_cpus)
                .map_err(|source| IrqError::Parse { irq, source })?;

            Ok(IrqAffinity { irq, cpus })
        })
        .collect()
}

/// Plans moving every interrupt to `handler_cpus`.
pub(crate) fn plan_all(
    platform: &impl Platform,
    handler_cpus: &CpuSet,
) -> Result<AffinityPlan, IrqError> {
    Ok(platform
        .irq_numbers()
        .map_err(IrqError::List)?
        .into_iter()
        .map(|irq| (irq, handler_cpus.clone()))
        .collect())
}

/// Plans moving each interrupt to the CPUs of the last rule that selects it. Interrupts that no
/// rule selects are left out of the plan.
pub(crate) fn plan_rules(
    platform: &impl Platform,
    rules: &[IrqRule],
) -> Result<AffinityPlan, IrqError> {
    let mut plan = AffinityPlan::new();

    for irq in platform.irq_numbers().map_err(IrqError::List)? {
        for rule in rules.iter().rev() {
            if rule.matcher.matches(platform, irq)? {
                debug!("IRQ {irq} selected for CPUs {}", rule.cpus);
                plan.insert(irq, rule.cpus.clone());
                break;
            }
        }
    }

    Ok(plan)
}

/// Writes the planned affinity of every interrupt in `plan`.
///
/// Kernel-managed interrupts cannot be moved from userspace and refuse the write with `EIO`;
/// those are skipped. Any other failure stops the remapping, leaving already remapped interrupts
/// in their new state.
pub(crate) fn apply(platform: &impl Platform, plan: &AffinityPlan) -> Result<RemapReport, IrqError> {
    let mut report = RemapReport::default();

    for (&irq, cpus) in plan {
        let affinity = cpus.to_string();

        match platform.write_smp_affinity_list(irq, &affinity) {
            Ok(()) => {
                info!("IRQ {irq} now handled on CPUs {affinity}");
                report.remapped.push(irq);
            }
            Err(error) if is_managed_irq_refusal(&error) => {
                warn!("Managed IRQ {irq}, skipped");
                report.skipped_managed.push(irq);
            }
            Err(source) => return Err(IrqError::Write { irq, source }),
        }
    }

    Ok(report)
}

fn is_managed_irq_refusal(error: &io::Error) -> bool {
    error.raw_os_error() == Some(libc::EIO)
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use mockall::predicate::{always, eq};
    use new_zealand::nz;

    use super::*;
    use crate::pal::{MockPlatform, PlatformFacade};

    fn rule(cpus: &[u32], patterns: &[(IrqAttribute, &str)]) -> IrqRule {
        IrqRule {
            cpus: cpus.iter().copied().collect(),
            matcher: IrqMatcher::new(
                patterns
                    .iter()
                    .map(|(attribute, pattern)| (*attribute, Regex::new(pattern).unwrap()))
                    .collect(),
            ),
        }
    }

    #[test]
    fn moving_everything_writes_canonical_list_to_every_irq() {
        let mut platform = MockPlatform::new();

        platform.expect_irq_numbers().returning(|| Ok(vec![0, 8, 9]));
        platform
            .expect_write_smp_affinity_list()
            .with(always(), eq("0,1,6,7"))
            .times(3)
            .returning(|_, _| Ok(()));

        let platform = PlatformFacade::from_mock(platform);
        let handlers: CpuSet = [0, 1, 6, 7].into_iter().collect();

        let plan = plan_all(&platform, &handlers).unwrap();
        let report = apply(&platform, &plan).unwrap();

        assert_eq!(report.remapped, vec![0, 8, 9]);
        assert!(report.skipped_managed.is_empty());
    }

    #[test]
    fn managed_irqs_are_skipped() {
        let mut platform = MockPlatform::new();

        platform
            .expect_write_smp_affinity_list()
            .returning(|irq, _| {
                if irq == 2 {
                    Err(io::Error::from_raw_os_error(libc::EIO))
                } else {
                    Ok(())
                }
            });

        let platform = PlatformFacade::from_mock(platform);
        let plan: AffinityPlan = [1, 2, 3]
            .into_iter()
            .map(|irq| (irq, [0].into_iter().collect()))
            .collect();

        let report = apply(&platform, &plan).unwrap();

        assert_eq!(report.remapped, vec![1, 3]);
        assert_eq!(report.skipped_managed, vec![2]);
    }

    #[test]
    fn other_write_failures_abort() {
        let mut platform = MockPlatform::new();

        platform
            .expect_write_smp_affinity_list()
            .with(eq(1), always())
            .returning(|_, _| Ok(()));
        platform
            .expect_write_smp_affinity_list()
            .with(eq(2), always())
            .returning(|_, _| Err(io::Error::from(io::ErrorKind::PermissionDenied)));

        let platform = PlatformFacade::from_mock(platform);
        let plan: AffinityPlan = [1, 2, 3]
            .into_iter()
            .map(|irq| (irq, [0].into_iter().collect()))
            .collect();

        let error = apply(&platform, &plan).unwrap_err();

        assert!(matches!(error, IrqError::Write { irq: 2, .. }));
        assert!(
            error
                .to_string()
                .starts_with("error writing to /proc/irq/2/smp_affinity_list: ")
        );
    }

    #[test]
    fn listing_failure_is_reported() {
        let mut platform = MockPlatform::new();

        platform
            .expect_irq_numbers()
            .returning(|| Err(io::Error::from(io::ErrorKind::NotFound)));

        let platform = PlatformFacade::from_mock(platform);

        assert!(matches!(
            plan_all(&platform, &CpuSet::new()),
            Err(IrqError::List(_))
        ));
    }

    #[test]
    fn rules_select_by_attribute() {
        let mut platform = MockPlatform::new();

        platform.expect_irq_numbers().returning(|| Ok(vec![1, 2, 3]));
        platform
            .expect_read_irq_attribute()
            .with(always(), eq(IrqAttribute::Actions))
            .returning(|irq, _| {
                Ok(match irq {
                    1 => "i8042\n".to_string(),
                    2 => "eth0-rx-0\n".to_string(),
                    _ => "\n".to_string(),
                })
            });

        let platform = PlatformFacade::from_mock(platform);

        let plan = plan_rules(&platform, &[rule(&[0, 1], &[(IrqAttribute::Actions, "^eth")])])
            .unwrap();

        assert_eq!(plan.len(), 1);
        assert_eq!(plan[&2].to_string(), "0,1");
    }

    #[test]
    fn every_pattern_of_a_rule_must_match() {
        let mut platform = MockPlatform::new();

        platform.expect_irq_numbers().returning(|| Ok(vec![10, 11]));
        platform
            .expect_read_irq_attribute()
            .with(always(), eq(IrqAttribute::ChipName))
            .returning(|_, _| Ok("IR-PCI-MSIX\n".to_string()));
        platform
            .expect_read_irq_attribute()
            .with(always(), eq(IrqAttribute::Type))
            .returning(|irq, _| {
                Ok(if irq == 10 { "edge\n" } else { "level\n" }.to_string())
            });

        let platform = PlatformFacade::from_mock(platform);

        let plan = plan_rules(
            &platform,
            &[rule(
                &[3],
                &[(IrqAttribute::ChipName, "MSI"), (IrqAttribute::Type, "^edge$")],
            )],
        )
        .unwrap();

        assert_eq!(plan.keys().copied().collect::<Vec<_>>(), vec![10]);
    }

    #[test]
    fn later_rules_win() {
        let mut platform = MockPlatform::new();

        platform.expect_irq_numbers().returning(|| Ok(vec![5]));
        platform
            .expect_read_irq_attribute()
            .returning(|_, _| Ok("nvme0q1".to_string()));

        let platform = PlatformFacade::from_mock(platform);

        let plan = plan_rules(
            &platform,
            &[
                rule(&[0], &[(IrqAttribute::Name, "nvme")]),
                rule(&[1], &[(IrqAttribute::Name, "q1$")]),
            ],
        )
        .unwrap();

        assert_eq!(plan[&5].to_string(), "1");
    }

    #[test]
    fn rule_without_patterns_selects_everything() {
        let mut platform = MockPlatform::new();

        platform.expect_irq_numbers().returning(|| Ok(vec![0, 1]));
        platform.expect_read_irq_attribute().never();

        let platform = PlatformFacade::from_mock(platform);

        let plan = plan_rules(&platform, &[rule(&[2], &[])]).unwrap();

        assert_eq!(plan.len(), 2);
    }

    #[test]
    fn unreadable_attribute_is_reported() {
        let mut platform = MockPlatform::new();

        platform.expect_irq_numbers().returning(|| Ok(vec![4]));
        platform
            .expect_read_irq_attribute()
            .returning(|_, _| Err(io::Error::from(io::ErrorKind::NotFound)));

        let platform = PlatformFacade::from_mock(platform);

        let error =
            plan_rules(&platform, &[rule(&[0], &[(IrqAttribute::Name, "x")])]).unwrap_err();

        assert!(
            error
                .to_string()
                .starts_with("error reading /sys/kernel/irq/4/name: ")
        );
    }

    #[test]
    fn snapshot_parses_kernel_ranges() {
        let mut platform = MockPlatform::new();

        platform.expect_irq_numbers().returning(|| Ok(vec![0, 24]));
        platform
            .expect_read_smp_affinity_list()
            .with(eq(0))
            .returning(|_| Ok("0-3\n".to_string()));
        platform
            .expect_read_smp_affinity_list()
            .with(eq(24))
            .returning(|_| Ok("2\n".to_string()));

        let platform = PlatformFacade::from_mock(platform);

        let affinities = snapshot(&platform, nz!(4)).unwrap();

        assert_eq!(affinities.len(), 2);
        assert_eq!(affinities[0].irq, 0);
        assert_eq!(affinities[0].cpus.to_string(), "0,1,2,3");
        assert_eq!(affinities[1].irq, 24);
        assert_eq!(affinities[1].cpus.to_string(), "2");
    }

    #[test]
    fn snapshot_reports_unparseable_affinity() {
        let mut platform = MockPlatform::new();

        platform.expect_irq_numbers().returning(|| Ok(vec![5]));
        platform
            .expect_read_smp_affinity_list()
            .returning(|_| Ok("0-7\n".to_string()));

        let platform = PlatformFacade::from_mock(platform);

        assert_eq!(
            snapshot(&platform, nz!(4)).unwrap_err().to_string(),
            "error parsing CPUs for IRQ 5: end of range greater than total CPUs: 0-7"
        );
    }
}
