// Platform abstraction for rt_conf.
//
// Provides a mockable interface over the procfs and sysfs interrupt files, the configuration
// files that rt_conf reads and rewrites, and the snapd configuration of Ubuntu Core systems.

mod abstractions;
mod facade;
mod real;

pub(crate) use abstractions::*;
pub(crate) use facade::*;
pub(crate) use real::*;
