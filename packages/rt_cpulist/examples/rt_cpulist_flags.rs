//! Kernel parameters like `isolcpus=` accept keyword flags in front of the CPU list.

use std::num::NonZero;

fn main() {
    let total_cpus = NonZero::new(8).unwrap();

    let list = rt_cpulist::parse_with_flags(
        "domain,managed_irq,2-5",
        &["domain", "nohz", "managed_irq"],
        total_cpus,
    )
    .unwrap();

    println!("Flags: {:?}", list.flags());
    println!("CPUs: {}", list.cpus());
}
