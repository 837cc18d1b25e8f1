use std::fmt::{self, Display};
use std::path::Path;
use std::str::FromStr;

use log::debug;
use thiserror::Error;

use crate::pal::Platform;
use crate::parse_grub_default;

/// Identifies the operating system; `ID=ubuntu-core` marks an Ubuntu Core system.
pub const OS_RELEASE_FILE: &str = "/etc/os-release";

/// Kernel command-line file of the Raspberry Pi firmware.
pub const RPI_CMDLINE_FILE: &str = "/boot/firmware/cmdline.txt";

/// Kernel command-line file of the Raspberry Pi firmware with an old style boot partition.
pub const RPI_LEGACY_CMDLINE_FILE: &str = "/boot/cmdline.txt";

/// How kernel command-line parameters reach the kernel on this system.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub enum Bootloader {
    /// GRUB, configured through `/etc/default/grub`.
    Grub,

    /// The Raspberry Pi firmware, configured through `cmdline.txt`.
    RaspberryPi,

    /// Ubuntu Core, where snapd owns the kernel command line.
    UbuntuCore,
}

impl Bootloader {
    /// The value accepted by [`FromStr`].
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Grub => "grub",
            Self::RaspberryPi => "rpi",
            Self::UbuntuCore => "ubuntu-core",
        }
    }
}

impl Display for Bootloader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The bootloader name is not one of `grub`, `rpi` or `ubuntu-core`.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
#[error("unknown bootloader: {0}")]
pub struct UnknownBootloader(String);

impl FromStr for Bootloader {
    type Err = UnknownBootloader;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [Self::Grub, Self::RaspberryPi, Self::UbuntuCore]
            .into_iter()
            .find(|bootloader| bootloader.as_str() == s)
            .ok_or_else(|| UnknownBootloader(s.to_string()))
    }
}

/// Ubuntu Core is recognized from `/etc/os-release`. Otherwise the presence of a Raspberry Pi
/// `cmdline.txt` means the Pi firmware boots the kernel. Anything else is assumed to be GRUB.
pub(crate) fn detect(platform: &impl Platform) -> Bootloader {
    match platform.read_to_string(Path::new(OS_RELEASE_FILE)) {
        // Same KEY=VALUE syntax as `/etc/default/grub`.
        Ok(contents) => {
            if parse_grub_default(&contents)
                .get("ID")
                .is_some_and(|id| id == "ubuntu-core")
            {
                return Bootloader::UbuntuCore;
            }
        }
        Err(error) => debug!("cannot read {OS_RELEASE_FILE}: {error}"),
    }

    if [RPI_CMDLINE_FILE, RPI_LEGACY_CMDLINE_FILE]
        .into_iter()
        .any(|file| platform.exists(Path::new(file)))
    {
        return Bootloader::RaspberryPi;
    }

    Bootloader::Grub
}

/// Operator-facing instructions for a Raspberry Pi, whose `cmdline.txt` is edited by hand.
#[must_use]
pub fn rpi_conclusion(cmdline: &str) -> Vec<String> {
    vec![
        "Detected bootloader: Raspberry Pi".to_string(),
        String::new(),
        format!("Please, append the following to {RPI_CMDLINE_FILE}:"),
        "In case of old style boot partition,".to_string(),
        format!("append to {RPI_LEGACY_CMDLINE_FILE}"),
        cmdline.to_string(),
    ]
}

/// Operator-facing summary after snapd accepted the kernel command line.
#[must_use]
pub fn ubuntu_core_conclusion() -> Vec<String> {
    vec![
        "Detected bootloader: Ubuntu Core managed".to_string(),
        String::new(),
        "Successfully applied the changes.".to_string(),
        "Please reboot your system to apply the changes.".to_string(),
    ]
}
