// Facade that dispatches to either the real platform or a mock in tests.

use std::fmt::{self, Debug};
use std::io;
use std::path::Path;
#[cfg(test)]
use std::sync::Arc;

use crate::irq::IrqAttribute;
#[cfg(test)]
use crate::pal::MockPlatform;
use crate::pal::{BuildTargetPlatform, Platform};

/// Facade over platform operations, dispatching to real or mock implementation.
///
/// In production, this always uses `BuildTargetPlatform`. In tests, it can also wrap a
/// `MockPlatform` for controlled test scenarios.
#[derive(Clone)]
pub(crate) enum PlatformFacade {
    /// Real platform implementation.
    Target(&'static BuildTargetPlatform),

    /// Mock platform for testing.
    #[cfg(test)]
    Mock(Arc<MockPlatform>),
}

// Debug implementations have no API contract to test.
#[cfg_attr(coverage_nightly, coverage(off))]
#[cfg_attr(test, mutants::skip)]
impl Debug for PlatformFacade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Target(_) => f.debug_struct("PlatformFacade::Target").finish(),
            #[cfg(test)]
            Self::Mock(_) => f.debug_struct("PlatformFacade::Mock").finish(),
        }
    }
}

static BUILD_TARGET_PLATFORM: BuildTargetPlatform = BuildTargetPlatform;

// Facade types are trivial pass-through layers - not worth testing.
#[cfg_attr(coverage_nightly, coverage(off))]
#[cfg_attr(test, mutants::skip)]
impl PlatformFacade {
    pub(crate) const fn target() -> Self {
        Self::Target(&BUILD_TARGET_PLATFORM)
    }

    #[cfg(test)]
    pub(crate) fn from_mock(mock: MockPlatform) -> Self {
        Self::Mock(Arc::new(mock))
    }
}

// Facade types are trivial pass-through layers - not worth testing.
#[cfg_attr(coverage_nightly, coverage(off))]
#[cfg_attr(test, mutants::skip)]
impl Platform for PlatformFacade {
    fn irq_numbers(&self) -> io::Result<Vec<u32>> {
        match self {
            Self::Target(p) => p.irq_numbers(),
            #[cfg(test)]
            Self::Mock(p) => p.irq_numbers(),
        }
    }

    fn read_smp_affinity_list(&self, irq: u32) -> io::Result<String> {
        match self {
            Self::Target(p) => p.read_smp_affinity_list(irq),
            #[cfg(test)]
            Self::Mock(p) => p.read_smp_affinity_list(irq),
        }
    }

    fn write_smp_affinity_list(&self, irq: u32, cpus: &str) -> io::Result<()> {
        match self {
            Self::Target(p) => p.write_smp_affinity_list(irq, cpus),
            #[cfg(test)]
            Self::Mock(p) => p.write_smp_affinity_list(irq, cpus),
        }
    }

    fn read_irq_attribute(&self, irq: u32, attribute: IrqAttribute) -> io::Result<String> {
        match self {
            Self::Target(p) => p.read_irq_attribute(irq, attribute),
            #[cfg(test)]
            Self::Mock(p) => p.read_irq_attribute(irq, attribute),
        }
    }

    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        match self {
            Self::Target(p) => p.read_to_string(path),
            #[cfg(test)]
            Self::Mock(p) => p.read_to_string(path),
        }
    }

    fn write(&self, path: &Path, contents: &str) -> io::Result<()> {
        match self {
            Self::Target(p) => p.write(path, contents),
            #[cfg(test)]
            Self::Mock(p) => p.write(path, contents),
        }
    }

    fn exists(&self, path: &Path) -> bool {
        match self {
            Self::Target(p) => p.exists(path),
            #[cfg(test)]
            Self::Mock(p) => p.exists(path),
        }
    }

    fn set_snap_cmdline_append(&self, cmdline: &str) -> io::Result<()> {
        match self {
            Self::Target(p) => p.set_snap_cmdline_append(cmdline),
            #[cfg(test)]
            Self::Mock(p) => p.set_snap_cmdline_append(cmdline),
        }
    }
}
