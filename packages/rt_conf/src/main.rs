#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(coverage_nightly, coverage(off))]

//! Binary entry point for the rt-conf tool.
//!
//! This module is excluded from mutation testing because testing process entry/exit behavior
//! is impractical - it requires spawning subprocesses and checking exit codes.

use std::num::NonZero;
use std::path::PathBuf;
use std::process::ExitCode;

use argh::FromArgs;
use log::LevelFilter;
use rt_conf::{Bootloader, DEFAULT_GRUB_FILE, RunInput, run};

/// Configure a Linux system for real-time workloads: isolate CPUs on the kernel command line
/// and move interrupt handling off the isolated CPUs.
#[derive(FromArgs)]
struct Args {
    /// path to the TOML configuration file
    #[argh(option)]
    config: PathBuf,

    /// path to the GRUB defaults file (default: /etc/default/grub)
    #[argh(option)]
    grub_default: Option<PathBuf>,

    /// validate CPU lists against this CPU count instead of the CPUs available to this process
    #[argh(option)]
    total_cpus: Option<NonZero<u32>>,

    /// apply the kernel command line for this bootloader (grub, rpi or ubuntu-core) instead of
    /// detecting it
    #[argh(option)]
    bootloader: Option<Bootloader>,

    /// do not touch the kernel command line
    #[argh(switch)]
    skip_grub: bool,

    /// do not touch interrupt affinity
    #[argh(switch)]
    skip_irq: bool,

    /// report what would change without writing anything
    #[argh(switch)]
    dry_run: bool,
}

// Binary entry point - mutations would require subprocess testing which is impractical.
#[cfg_attr(test, mutants::skip)]
fn main() -> ExitCode {
    env_logger::Builder::new()
        .filter_level(LevelFilter::Info)
        .parse_default_env()
        .init();

    let args: Args = argh::from_env();

    let mut input = RunInput::new(args.config);
    input.grub_default_path = args
        .grub_default
        .unwrap_or_else(|| PathBuf::from(DEFAULT_GRUB_FILE));
    input.total_cpus = args.total_cpus;
    input.bootloader = args.bootloader;
    input.skip_grub = args.skip_grub;
    input.skip_irq = args.skip_irq;
    input.dry_run = args.dry_run;

    match run(&input) {
        Ok(report) => {
            for line in report.messages {
                println!("{line}");
            }

            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
