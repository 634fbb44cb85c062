#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(coverage_nightly, coverage(off))]
#![cfg(test)]

use std::thread;

use dma_region::{Extent, Region, RegionConfig};

const THREADS: u8 = 8;
const ROUNDS: usize = 500;

#[test]
fn concurrent_alloc_and_release() {
    let region = Region::new(RegionConfig::new(0x10_0000, 0x1_0000)).unwrap();

    thread::scope(|s| {
        for id in 0..THREADS {
            let region = &region;
            s.spawn(move || {
                for round in 0..ROUNDS {
                    let size = 16 + (round % 7) * 24;
                    let contents = vec![id; size];
                    let addr = loop {
                        match region.alloc_from(&contents, 16) {
                            Ok(addr) => break addr,
                            Err(err) if err.is_recoverable() => thread::yield_now(),
                            Err(err) => panic!("{err}"),
                        }
                    };
                    let mut buf = vec![0_u8; size];
                    region.read(addr, 0, &mut buf).unwrap();
                    assert_eq!(buf, contents, "buffer {addr} shared between threads");
                    region.release(addr).unwrap();
                }
            });
        }
    });

    region.check_invariants().unwrap();
    assert_eq!(region.free_extents(), [Extent::new(0x10_0000, 0x1_0000)]);
}

#[test]
fn concurrent_views() {
    let region = Region::new(RegionConfig::new(0x10_0000, 0x1_0000)).unwrap();

    thread::scope(|s| {
        for id in 0..THREADS {
            let region = &region;
            s.spawn(move || {
                for _ in 0..ROUNDS {
                    let (_addr, view) = region.reserve(64, 64).unwrap();
                    view.fill(id).unwrap();
                    let mut buf = [0_u8; 64];
                    view.read_at(0, &mut buf).unwrap();
                    assert_eq!(buf, [id; 64]);
                    view.release().unwrap();
                }
            });
        }
    });

    assert_eq!(region.stats().used_extents, 0);
    assert_eq!(region.free_extents(), [Extent::new(0x10_0000, 0x1_0000)]);
}
