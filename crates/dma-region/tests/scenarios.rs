#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(coverage_nightly, coverage(off))]
#![cfg(test)]

use dma_region::{DmaAddr, Extent, Region, RegionConfig};

fn region(start: usize, size: usize) -> Region {
    Region::new(RegionConfig::new(start, size)).unwrap()
}

#[test]
fn first_fit_then_exhaustion() {
    let region = region(0x1000, 0x1000);

    let addr = region.alloc(100, 0).unwrap();
    assert_eq!(addr, DmaAddr::new(0x1000));
    assert_eq!(region.free_extents(), [Extent::new(0x1064, 0xf9c)]);

    let err = region.alloc(4000, 0).unwrap_err();
    assert!(err.is_out_of_memory());
    // a failed request leaves the free list alone
    assert_eq!(region.free_extents(), [Extent::new(0x1064, 0xf9c)]);
    region.check_invariants().unwrap();
}

#[test]
fn aligned_base_needs_no_pad() {
    let region = region(0x1000, 0x1000);

    let addr = region.alloc(64, 64).unwrap();
    assert_eq!(addr, DmaAddr::new(0x1000));
    assert!(region.free_extents().iter().all(|e| e.base() >= 0x1040));
    assert_eq!(region.stats().free_bytes, 0x1000 - 64);
    region.check_invariants().unwrap();
}

#[test]
fn release_coalesces_in_either_order() {
    for reversed in [false, true] {
        let region = region(0x2000, 0x100);
        let a = region.alloc(32, 0).unwrap();
        let b = region.alloc(32, 0).unwrap();
        assert_eq!(a, DmaAddr::new(0x2000));
        assert_eq!(b, DmaAddr::new(0x2020));

        let (first, second) = if reversed { (b, a) } else { (a, b) };
        region.release(first).unwrap();
        region.release(second).unwrap();
        assert_eq!(region.free_extents(), [Extent::new(0x2000, 0x100)]);
    }
}

#[test]
fn double_release_is_invalid_handle() {
    let region = region(0x1000, 0x1000);
    let addr = region.alloc(128, 0).unwrap();
    region.release(addr).unwrap();

    let err = region.release(addr).unwrap_err();
    assert!(err.is_invalid_handle());
    assert_eq!(err.addr(), addr);
    assert_eq!(region.free_extents(), [Extent::new(0x1000, 0x1000)]);
}

#[test]
fn read_past_extent_is_out_of_bounds() {
    let region = region(0x1000, 0x1000);
    let addr = region.alloc(40, 0).unwrap();

    let mut dst = [0_u8; 50];
    let err = region.read(addr, 10, &mut dst).unwrap_err();
    assert!(err.is_out_of_bounds());
    assert_eq!(
        err.to_string(),
        "DMA access out of bounds: handle=0x1000, offset=10, len=50, size=40"
    );
    region.release(addr).unwrap();
}

#[test]
fn both_surfaces_share_one_region() {
    let region = region(0x1000, 0x1000);
    let a = region.alloc(0x100, 0).unwrap();
    let (b, view) = region.reserve(0x100, 0).unwrap();
    assert_eq!(b, DmaAddr::new(0x1100));

    // a reserved buffer may be released through the common entry point
    region.release(b).unwrap();
    drop(view);
    region.release(a).unwrap();
    assert_eq!(region.free_extents(), [Extent::new(0x1000, 0x1000)]);
}
