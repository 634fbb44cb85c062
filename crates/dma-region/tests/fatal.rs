#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(coverage_nightly, coverage(off))]
#![cfg(test)]

use dma_region::{Region, RegionConfig};
use snafu_utils::fatal;

#[test]
#[should_panic(expected = "Error: invalid DMA handle 0x1000")]
fn double_release_is_fatal() {
    let region = Region::new(RegionConfig::new(0x1000, 0x100)).unwrap();
    let addr = region.alloc(16, 0).unwrap();
    region.release(addr).unwrap();
    if let Err(err) = region.release(addr) {
        fatal(err);
    }
}

#[test]
fn out_of_memory_is_not_fatal() {
    let region = Region::new(RegionConfig::new(0x1000, 0x100)).unwrap();
    let err = region.alloc(0x200, 0).unwrap_err();
    assert!(err.is_recoverable());
    assert_eq!(
        err.to_string(),
        "out of DMA memory: no free extent for 512 bytes aligned to 0"
    );
}
