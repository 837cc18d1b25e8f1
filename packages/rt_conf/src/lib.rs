#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! Configures a Linux system for real-time workloads.
//!
//! Given a TOML configuration file (see [`Config`]), this crate:
//!
//! * validates every CPU list against the machine's CPU count, using [`rt_cpulist`];
//! * adds CPU isolation parameters such as `isolcpus=` and `nohz_full=` to the kernel command
//!   line: in `/etc/default/grub` on GRUB systems, through snapd on Ubuntu Core, or as
//!   instructions for `cmdline.txt` on a Raspberry Pi;
//! * moves hardware interrupt handling off the isolated CPUs by rewriting
//!   `/proc/irq/*/smp_affinity_list`, skipping interrupts that the kernel manages itself;
//! * moves interrupts selected by their `/sys/kernel/irq` attributes to dedicated CPUs.
//!
//! The binary entry point is in `main.rs`; the logic is exposed via [`run()`]. The building
//! blocks ([`Config::validate()`], [`KernelCmdline::to_params()`],
//! [`update_grub_default()`]) are pure and usable on their own.

mod bootloader;
mod cmdline;
mod config;
mod grub;
mod irq;
mod pal;
mod run;

pub use bootloader::{
    Bootloader, OS_RELEASE_FILE, RPI_CMDLINE_FILE, RPI_LEGACY_CMDLINE_FILE, UnknownBootloader,
    rpi_conclusion, ubuntu_core_conclusion,
};
pub use cmdline::{CmdlineError, find_duplicated_params};
pub use config::*;
pub use grub::*;
pub use irq::{IrqAffinity, IrqError, RemapReport};
pub use run::*;
