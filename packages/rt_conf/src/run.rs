use std::io;
use std::num::NonZero;
use std::path::PathBuf;
use std::thread;

use log::info;
use thiserror::Error;

use crate::irq::{self, AffinityPlan};
use crate::pal::{Platform, PlatformFacade};
use crate::{
    Bootloader, Config, ConfigError, GrubError, GrubUpdate, IrqError, RemapReport, bootloader,
    grub_conclusion, rpi_conclusion, ubuntu_core_conclusion, update_grub_default,
};

/// Default location of the GRUB defaults file.
pub const DEFAULT_GRUB_FILE: &str = "/etc/default/grub";

/// Input parameters for the [`run()`] function.
#[derive(Clone, Debug)]
#[non_exhaustive]
pub struct RunInput {
    /// Path to the TOML configuration file.
    pub config_path: PathBuf,

    /// Path to the GRUB defaults file to update.
    pub grub_default_path: PathBuf,

    /// The CPU count to validate against. Defaults to the CPUs available to this process.
    pub total_cpus: Option<NonZero<u32>>,

    /// How kernel command-line parameters are applied. Detected from the system if absent.
    pub bootloader: Option<Bootloader>,

    /// Leave the kernel command line alone.
    pub skip_grub: bool,

    /// Leave interrupt affinity alone.
    pub skip_irq: bool,

    /// Report what would change without writing anything.
    pub dry_run: bool,
}

impl RunInput {
    /// Input that applies everything in the configuration file at `config_path`.
    #[must_use]
    pub fn new(config_path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: config_path.into(),
            grub_default_path: PathBuf::from(DEFAULT_GRUB_FILE),
            total_cpus: None,
            bootloader: None,
            skip_grub: false,
            skip_irq: false,
            dry_run: false,
        }
    }
}

/// What a successful [`run()`] did.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
#[non_exhaustive]
pub struct RunReport {
    /// Lines to show to the operator.
    pub messages: Vec<String>,

    /// The GRUB update, if the kernel command line was changed (or would be, in a dry run).
    pub grub: Option<GrubUpdate>,

    /// The remapping of every interrupt to the handler CPUs, if one was performed.
    pub irq: Option<RemapReport>,

    /// The remapping of interrupts selected by `[[irq_tuning]]` entries, if one was performed.
    pub irq_tuning: Option<RemapReport>,
}

/// Errors that abort a [`run()`].
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RunError {
    /// The CPU count of this machine could not be determined.
    #[error("cannot determine the number of CPUs: {0}")]
    CpuCount(String),

    /// The configuration file could not be read.
    #[error("failed to read {}: {source}", path.display())]
    ReadConfig {
        /// The configuration file.
        path: PathBuf,
        /// The underlying I/O error.
        source: io::Error,
    },

    /// The configuration file is invalid.
    #[error("configuration rejected: {0}")]
    Config(#[from] ConfigError),

    /// The GRUB defaults file could not be read.
    #[error("failed to parse grub file {}: {source}", path.display())]
    ReadGrub {
        /// The GRUB defaults file.
        path: PathBuf,
        /// The underlying I/O error.
        source: io::Error,
    },

    /// The GRUB defaults file could not be updated.
    #[error("error updating {}: {source}", path.display())]
    UpdateGrub {
        /// The GRUB defaults file.
        path: PathBuf,
        /// What went wrong.
        source: GrubError,
    },

    /// The updated GRUB defaults file could not be written.
    #[error("failed to write to {}: {source}", path.display())]
    WriteGrub {
        /// The GRUB defaults file.
        path: PathBuf,
        /// The underlying I/O error.
        source: io::Error,
    },

    /// snapd refused the kernel command line.
    #[error("failed to set the Ubuntu Core kernel command line: {0}")]
    SnapSet(#[source] io::Error),

    /// Interrupt affinity could not be read or changed.
    #[error(transparent)]
    Irq(#[from] IrqError),
}

/// Loads and validates the configuration, then applies it: kernel command-line parameters are
/// handed to the bootloader and interrupts are moved to the handler CPUs.
///
/// Nothing is written if the configuration is invalid.
pub fn run(input: &RunInput) -> Result<RunReport, RunError> {
    run_with_platform(input, &PlatformFacade::target())
}

fn run_with_platform(input: &RunInput, fs: &impl Platform) -> Result<RunReport, RunError> {
    let total_cpus = match input.total_cpus {
        Some(total_cpus) => total_cpus,
        None => available_cpus()?,
    };

    info!("Total CPUs: {total_cpus}");

    let text = fs
        .read_to_string(&input.config_path)
        .map_err(|source| RunError::ReadConfig {
            path: input.config_path.clone(),
            source,
        })?;

    let config = Config::from_toml_str(&text)?;
    config.validate(total_cpus)?;

    let mut report = RunReport::default();

    if input.skip_grub {
        info!("Skipping kernel command line");
    } else {
        apply_kernel_cmdline(input, &config, fs, &mut report)?;
    }

    if input.skip_irq {
        info!("Skipping interrupt affinity");
    } else {
        apply_interrupts(input, &config, total_cpus, fs, &mut report)?;
        apply_irq_tuning(input, &config, total_cpus, fs, &mut report)?;
    }

    Ok(report)
}

fn apply_kernel_cmdline(
    input: &RunInput,
    config: &Config,
    fs: &impl Platform,
    report: &mut RunReport,
) -> Result<(), RunError> {
    let params = config.kernel_cmdline.to_params();

    if params.is_empty() {
        info!("No kernel command line parameters configured");
        return Ok(());
    }

    let bootloader = input
        .bootloader
        .unwrap_or_else(|| bootloader::detect(fs));

    info!("Bootloader: {bootloader}");

    match bootloader {
        Bootloader::Grub => apply_to_grub(input, &params, fs, report),
        Bootloader::RaspberryPi => {
            report.messages.extend(rpi_conclusion(&params.join(" ")));
            Ok(())
        }
        Bootloader::UbuntuCore => apply_to_ubuntu_core(input, &params, fs, report),
    }
}

fn apply_to_grub(
    input: &RunInput,
    params: &[String],
    fs: &impl Platform,
    report: &mut RunReport,
) -> Result<(), RunError> {
    let path = &input.grub_default_path;

    let contents = fs
        .read_to_string(path)
        .map_err(|source| RunError::ReadGrub {
            path: path.clone(),
            source,
        })?;

    let update =
        update_grub_default(&contents, params).map_err(|source| RunError::UpdateGrub {
            path: path.clone(),
            source,
        })?;

    if input.dry_run {
        report.messages.push(format!(
            "Would update {}: {}",
            path.display(),
            update.new_cmdline
        ));
    } else {
        fs.write(path, &update.contents)
            .map_err(|source| RunError::WriteGrub {
                path: path.clone(),
                source,
            })?;

        info!("Updated {}", path.display());
        report
            .messages
            .extend(grub_conclusion(path, &update));
    }

    report.grub = Some(update);

    Ok(())
}

fn apply_to_ubuntu_core(
    input: &RunInput,
    params: &[String],
    fs: &impl Platform,
    report: &mut RunReport,
) -> Result<(), RunError> {
    let cmdline = params.join(" ");

    if input.dry_run {
        report
            .messages
            .push(format!("Would set system.kernel.cmdline-append: {cmdline}"));
        return Ok(());
    }

    fs.set_snap_cmdline_append(&cmdline)
        .map_err(RunError::SnapSet)?;

    report.messages.extend(ubuntu_core_conclusion());

    Ok(())
}

fn apply_interrupts(
    input: &RunInput,
    config: &Config,
    total_cpus: NonZero<u32>,
    fs: &impl Platform,
    report: &mut RunReport,
) -> Result<(), RunError> {
    let Some(handler_cpus) = config.interrupts.handler_cpus(total_cpus)? else {
        info!("No interrupt affinity configured");
        return Ok(());
    };

    let plan = irq::plan_all(fs, &handler_cpus)?;

    if input.dry_run {
        describe_plan(fs, &plan, total_cpus, report)?;
        return Ok(());
    }

    let remapped = irq::apply(fs, &plan)?;

    report.messages.push(format!(
        "Moved {} IRQs to CPUs {handler_cpus}, skipped {} managed IRQs",
        remapped.remapped.len(),
        remapped.skipped_managed.len()
    ));
    report.irq = Some(remapped);

    Ok(())
}

fn apply_irq_tuning(
    input: &RunInput,
    config: &Config,
    total_cpus: NonZero<u32>,
    fs: &impl Platform,
    report: &mut RunReport,
) -> Result<(), RunError> {
    if config.irq_tuning.is_empty() {
        return Ok(());
    }

    let rules = config.irq_rules(total_cpus)?;
    let plan = irq::plan_rules(fs, &rules)?;

    if input.dry_run {
        describe_plan(fs, &plan, total_cpus, report)?;
        return Ok(());
    }

    let tuned = irq::apply(fs, &plan)?;

    report.messages.push(format!(
        "Tuned {} IRQs selected by irq_tuning, skipped {} managed IRQs",
        tuned.remapped.len(),
        tuned.skipped_managed.len()
    ));
    report.irq_tuning = Some(tuned);

    Ok(())
}

fn describe_plan(
    fs: &impl Platform,
    plan: &AffinityPlan,
    total_cpus: NonZero<u32>,
    report: &mut RunReport,
) -> Result<(), RunError> {
    for affinity in irq::snapshot(fs, total_cpus)? {
        if let Some(target) = plan.get(&affinity.irq) {
            report.messages.push(format!(
                "Would move IRQ {} from CPUs {} to CPUs {target}",
                affinity.irq, affinity.cpus
            ));
        }
    }

    Ok(())
}

// Depends on the machine running the tests.
#[cfg_attr(test, mutants::skip)]
fn available_cpus() -> Result<NonZero<u32>, RunError> {
    let available = thread::available_parallelism()
        .map_err(|error| RunError::CpuCount(error.to_string()))?;

    NonZero::<u32>::try_from(available).map_err(|error| RunError::CpuCount(error.to_string()))
}
