//! Parsing an isolation list and deriving the interrupt handler list from it.

use std::num::NonZero;

fn main() {
    let total_cpus = NonZero::new(24).unwrap();

    let isolated = rt_cpulist::parse("2-20:2/4", total_cpus).unwrap();
    println!("Isolated CPUs: {isolated}");

    let handlers = rt_cpulist::complement("2-20:2/4", total_cpus).unwrap();
    println!("IRQ handler CPUs: {handlers}");

    assert!(rt_cpulist::are_mutually_exclusive(&isolated.to_string(), &handlers, total_cpus).unwrap());

    match rt_cpulist::parse("6-24", total_cpus) {
        Ok(_) => unreachable!("24 is not a valid index on a 24-CPU machine"),
        Err(error) => println!("Rejected: {error}"),
    }
}
