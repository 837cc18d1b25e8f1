// Platform abstraction layer for rt_conf.
//
// Everything that touches procfs, sysfs, configuration files or snapd goes through the
// `Platform` trait so the configuration logic can be tested against a mock: abstraction (trait)
// → facade (enum) → real implementation.

mod platform;

pub(crate) use platform::*;
