// Real platform implementation that delegates to std::fs and the snap command.
//
// This is a trivial forwarder to system APIs and is excluded from coverage and mutation testing.

use std::fs;
use std::io;
use std::path::Path;
use std::process::Command;

use crate::irq::IrqAttribute;
use crate::pal::Platform;

const PROC_IRQ: &str = "/proc/irq";
const SYS_KERNEL_IRQ: &str = "/sys/kernel/irq";

/// The operating system that the build is targeting.
#[derive(Debug, Default)]
pub(crate) struct BuildTargetPlatform;

// Trivial forwarder to system APIs - not worth testing.
#[cfg_attr(coverage_nightly, coverage(off))]
#[cfg_attr(test, mutants::skip)]
impl Platform for BuildTargetPlatform {
    fn irq_numbers(&self) -> io::Result<Vec<u32>> {
        let mut irqs = Vec::new();

        for entry in fs::read_dir(PROC_IRQ)? {
            let entry = entry?;

            if !entry.file_type()?.is_dir() {
                continue;
            }

            // Skip anything that is not an interrupt number, like "default_smp_affinity".
            if let Some(irq) = entry
                .file_name()
                .to_str()
                .and_then(|name| name.parse::<u32>().ok())
            {
                irqs.push(irq);
            }
        }

        irqs.sort_unstable();

        Ok(irqs)
    }

    fn read_smp_affinity_list(&self, irq: u32) -> io::Result<String> {
        fs::read_to_string(format!("{PROC_IRQ}/{irq}/smp_affinity_list"))
    }

    fn write_smp_affinity_list(&self, irq: u32, cpus: &str) -> io::Result<()> {
        fs::write(format!("{PROC_IRQ}/{irq}/smp_affinity_list"), cpus)
    }

    fn read_irq_attribute(&self, irq: u32, attribute: IrqAttribute) -> io::Result<String> {
        fs::read_to_string(format!(
            "{SYS_KERNEL_IRQ}/{irq}/{}",
            attribute.file_name()
        ))
    }

    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        fs::read_to_string(path)
    }

    fn write(&self, path: &Path, contents: &str) -> io::Result<()> {
        fs::write(path, contents)
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn set_snap_cmdline_append(&self, cmdline: &str) -> io::Result<()> {
        let status = Command::new("snap")
            .args([
                "set",
                "system",
                &format!("system.kernel.cmdline-append={cmdline}"),
            ])
            .status()?;

        if status.success() {
            Ok(())
        } else {
            Err(io::Error::other(format!("snap set exited with {status}")))
        }
    }
}
