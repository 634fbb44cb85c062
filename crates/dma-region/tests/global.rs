#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(coverage_nightly, coverage(off))]
#![cfg(test)]

use dma_region::{Region, RegionConfig, global};

// The default region is process-wide, so everything lives in one test.
#[test]
fn install_once() {
    assert!(global::get().is_none());

    let region = Region::new(RegionConfig::new(0x4000, 0x1000)).unwrap();
    let installed = global::install(region).unwrap();
    assert_eq!(installed.start(), 0x4000);
    assert!(core::ptr::eq(global::get().unwrap(), installed));

    let other = Region::new(RegionConfig::new(0x9000, 0x1000)).unwrap();
    let err = global::install(other).unwrap_err();
    assert!(err.is_already_installed());
    assert_eq!(
        err.to_string(),
        "a default DMA region is already installed at 0x4000"
    );

    let addr = global::get().unwrap().alloc(16, 0).unwrap();
    global::get().unwrap().release(addr).unwrap();
}
