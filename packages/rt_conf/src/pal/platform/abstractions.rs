use std::fmt::Debug;
use std::io;
use std::path::Path;

use crate::irq::IrqAttribute;

/// Abstraction over the parts of the operating system that rt_conf reads and changes.
///
/// Linux exposes interrupt routing as a virtual filesystem under `/proc/irq` and interrupt
/// descriptions under `/sys/kernel/irq`. Writes to `/proc/irq` are synchronous and are validated
/// by the kernel at write time, so a failed write is reported directly by the call that made it.
///
/// This trait is automatically mocked by mockall in test builds, generating `MockPlatform`.
#[cfg_attr(test, mockall::automock)]
pub(crate) trait Platform: Debug + Send + Sync + 'static {
    /// Lists the interrupt numbers that have a directory under `/proc/irq`, in ascending order.
    fn irq_numbers(&self) -> io::Result<Vec<u32>>;

    /// Reads `/proc/irq/{irq}/smp_affinity_list`.
    ///
    /// This is a CPU list format file ("0-3,8" style list) followed by a newline.
    fn read_smp_affinity_list(&self, irq: u32) -> io::Result<String>;

    /// Writes `/proc/irq/{irq}/smp_affinity_list`.
    ///
    /// The kernel refuses writes for managed interrupts with `EIO`.
    fn write_smp_affinity_list(&self, irq: u32, cpus: &str) -> io::Result<()>;

    /// Reads one descriptive attribute of an interrupt from `/sys/kernel/irq/{irq}/`.
    fn read_irq_attribute(&self, irq: u32, attribute: IrqAttribute) -> io::Result<String>;

    /// Reads a regular text file, such as the configuration file or `/etc/default/grub`.
    fn read_to_string(&self, path: &Path) -> io::Result<String>;

    /// Replaces the contents of a regular text file.
    fn write(&self, path: &Path, contents: &str) -> io::Result<()>;

    /// Whether a file or directory exists at `path`.
    fn exists(&self, path: &Path) -> bool;

    /// Asks snapd to append `cmdline` to the kernel command line of an Ubuntu Core system.
    fn set_snap_cmdline_append(&self, cmdline: &str) -> io::Result<()>;
}
