//! Physically addressed DMA buffer allocator.
//!
//! Peripheral controllers (network, storage, RNG, VirtIO queues) need buffers
//! at fixed addresses that the hardware can reach directly. This crate manages
//! a dedicated address window as an arena of address-stable extents and hands
//! out plain [`DmaAddr`] handles that drivers can program into device
//! registers.
//!
//! # Algorithm
//!
//! - **First fit**: the free list is kept in address order and the first
//!   extent large enough for the request is used
//! - **Alignment**: the search size is inflated by the alignment, then the
//!   claimed extent is trimmed so that every unused byte returns to the free
//!   list
//! - **Coalescing**: every release merges address-contiguous free extents
//!
//! At all times, free and used extents exactly tile the region window.
//!
//! # Usage
//!
//! ```rust
//! use dma_region::{DmaAddr, Region, RegionConfig};
//!
//! let region = Region::new(RegionConfig::new(0x1000, 0x1000)).unwrap();
//!
//! // copy-based API
//! let addr = region.alloc_from(b"hello", 16).unwrap();
//! let mut buf = [0_u8; 5];
//! region.read(addr, 0, &mut buf).unwrap();
//! assert_eq!(&buf, b"hello");
//! region.release(addr).unwrap();
//!
//! // zero-copy API
//! let (addr, view) = region.reserve(64, 64).unwrap();
//! assert!(addr.is_aligned(64));
//! view.write_at(0, &[0xff; 64]).unwrap();
//! view.release().unwrap();
//!
//! // zero-sized requests yield the sentinel, which every operation ignores
//! let null = region.alloc(0, 0).unwrap();
//! assert_eq!(null, DmaAddr::NULL);
//! region.release(null).unwrap();
//! ```
//!
//! # Errors
//!
//! [`AllocError::OutOfMemory`] is recoverable: release other buffers and
//! retry, or push back on the producer. [`AccessError`] (invalid handle,
//! double release, out-of-bounds access) means the driver is broken and
//! should be propagated to [`snafu_utils::fatal`].
//!
//! # Thread Safety
//!
//! [`Region`] is `Send + Sync`. Each operation holds the region's spinlock
//! for its whole duration; the lock is not reentrant. Separate regions share
//! no state.

#![cfg_attr(not(test), no_std)]
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

extern crate alloc;

pub use self::{
    addr::DmaAddr,
    config::RegionConfig,
    error::{AccessError, AllocError, ConfigError, GlobalError, InvariantError},
    extent::Extent,
    region::{Region, RegionStats},
    registry::{ExtentKind, UsedExtent},
    view::DmaSlice,
};

mod addr;
mod config;
mod error;
mod extent;
mod free_list;
pub mod global;
mod memory;
mod region;
mod registry;
mod view;
