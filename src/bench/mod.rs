//! Client programs assembled against a memory map.

pub mod array_scalar;

use crate::config::MemoryMap;
use crate::error::AsmResult;
use crate::image::ImageSet;

pub struct Benchmark {
    pub name: &'static str,
    pub description: &'static str,
    pub assemble: fn(&MemoryMap) -> AsmResult<ImageSet>,
}

pub static BENCHMARKS: [Benchmark; 1] = [Benchmark {
    name: array_scalar::NAME,
    description: "increment a -1 terminated array in place, then stream it out",
    assemble: array_scalar::assemble,
}];

pub fn by_name(name: &str) -> Option<&'static Benchmark> {
    BENCHMARKS.iter().find(|b| b.name == name)
}

#[test]
fn test_registry() {
    assert!(by_name("array_scalar").is_some());
    assert!(by_name("hailstone").is_none());
}
