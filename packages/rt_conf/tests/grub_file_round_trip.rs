//! Runs the full configuration flow against real files in a temporary directory.
//!
//! Interrupt affinity is skipped because it requires root and a real `/proc/irq`.

#![cfg(not(miri))]

use std::fs;
use std::num::NonZero;

use rt_conf::{Bootloader, RunError, RunInput, run};

fn input_in(dir: &tempfile::TempDir, config: &str, grub: &str) -> RunInput {
    let config_path = dir.path().join("rt-conf.toml");
    let grub_path = dir.path().join("grub");

    fs::write(&config_path, config).unwrap();
    fs::write(&grub_path, grub).unwrap();

    let mut input = RunInput::new(config_path);
    input.grub_default_path = grub_path;
    input.total_cpus = NonZero::new(8);
    input.bootloader = Some(Bootloader::Grub);
    input.skip_irq = true;
    input
}

#[test]
fn kernel_cmdline_is_written_to_grub_file() {
    let dir = tempfile::tempdir().unwrap();

    let input = input_in(
        &dir,
        "[kernel_cmdline]\nisolcpus = \"1-3\"\nnohz = \"on\"\n",
        "GRUB_DEFAULT=0\nGRUB_CMDLINE_LINUX_DEFAULT=\"quiet splash\"\n",
    );

    let report = run(&input).unwrap();

    assert_eq!(
        fs::read_to_string(&input.grub_default_path).unwrap(),
        "GRUB_DEFAULT=0\nGRUB_CMDLINE_LINUX_DEFAULT=\"quiet splash isolcpus=1-3 nohz=on\"\n"
    );
    assert!(report.messages.iter().any(|line| line == "\tsudo update-grub"));
}

#[test]
fn dry_run_leaves_grub_file_alone() {
    let dir = tempfile::tempdir().unwrap();

    let mut input = input_in(
        &dir,
        "[kernel_cmdline]\nisolcpus = \"1-3\"\n",
        "GRUB_CMDLINE_LINUX_DEFAULT=\"\"\n",
    );
    input.dry_run = true;

    let report = run(&input).unwrap();

    assert_eq!(
        fs::read_to_string(&input.grub_default_path).unwrap(),
        "GRUB_CMDLINE_LINUX_DEFAULT=\"\"\n"
    );
    assert_eq!(report.grub.unwrap().new_cmdline, "isolcpus=1-3");
}

#[test]
fn out_of_range_cpu_is_rejected() {
    let dir = tempfile::tempdir().unwrap();

    let input = input_in(
        &dir,
        "[kernel_cmdline]\nisolcpus = \"domain,6-8\"\n",
        "GRUB_CMDLINE_LINUX_DEFAULT=\"\"\n",
    );

    let error = run(&input).unwrap_err();

    assert!(matches!(error, RunError::Config(_)));
    assert_eq!(
        error.to_string(),
        "configuration rejected: kernel_cmdline.isolcpus: end of range greater than total CPUs: 6-8"
    );
}

#[test]
fn missing_grub_file_is_reported() {
    let dir = tempfile::tempdir().unwrap();

    let mut input = input_in(&dir, "[kernel_cmdline]\nnohz = \"off\"\n", "");
    input.grub_default_path = dir.path().join("does-not-exist");

    let error = run(&input).unwrap_err();

    assert!(error.to_string().starts_with("failed to parse grub file"));
}
