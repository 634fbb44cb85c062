//! Error types.
//!
//! Errors fall into two classes:
//!
//! - [`AllocError::OutOfMemory`] is resource exhaustion. A driver may release
//!   other buffers and retry, or apply back-pressure.
//! - [`AccessError`] and [`AllocError::InvalidAlign`] are driver bugs (unknown
//!   handle, double release, out-of-bounds access, bad alignment). They carry
//!   the [`Location`] they were raised at and are meant to be propagated to
//!   [`snafu_utils::fatal`], never retried.

use snafu::Snafu;
use snafu_utils::{Located, Location};

use crate::addr::DmaAddr;

/// Errors returned when claiming space from a region.
#[derive(Debug, Snafu, derive_more::IsVariant)]
#[snafu(visibility(pub(crate)))]
pub enum AllocError {
    #[snafu(display("out of DMA memory: no free extent for {size} bytes aligned to {align}"))]
    OutOfMemory { size: usize, align: usize },
    #[snafu(display("invalid DMA alignment {align}: must be zero or a power of two"))]
    InvalidAlign {
        align: usize,
        #[snafu(implicit)]
        location: Location,
    },
}

impl AllocError {
    /// Returns `true` if the caller may recover by releasing memory.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        self.is_out_of_memory()
    }
}

impl Located for AllocError {
    fn location(&self) -> Option<Location> {
        match self {
            Self::OutOfMemory { .. } => None,
            Self::InvalidAlign { location, .. } => Some(*location),
        }
    }
}

/// Errors returned when accessing or releasing an allocation.
#[derive(Debug, Snafu, derive_more::IsVariant)]
#[snafu(visibility(pub(crate)))]
pub enum AccessError {
    #[snafu(display("invalid DMA handle {addr}: not allocated, already released, or stale"))]
    InvalidHandle {
        addr: DmaAddr,
        #[snafu(implicit)]
        location: Location,
    },
    #[snafu(display(
        "DMA access out of bounds: handle={addr}, offset={offset}, len={len}, size={size}"
    ))]
    OutOfBounds {
        addr: DmaAddr,
        offset: usize,
        len: usize,
        size: usize,
        #[snafu(implicit)]
        location: Location,
    },
}

impl AccessError {
    #[must_use]
    pub fn addr(&self) -> DmaAddr {
        match self {
            Self::InvalidHandle { addr, .. } | Self::OutOfBounds { addr, .. } => *addr,
        }
    }
}

impl Located for AccessError {
    fn location(&self) -> Option<Location> {
        match self {
            Self::InvalidHandle { location, .. } | Self::OutOfBounds { location, .. } => {
                Some(*location)
            }
        }
    }
}

/// Errors detected when constructing a region.
#[derive(Debug, Snafu, derive_more::IsVariant)]
#[snafu(visibility(pub(crate)))]
pub enum ConfigError {
    #[snafu(display("DMA region start address must be nonzero"))]
    NullStart,
    #[snafu(display("DMA region size must be nonzero"))]
    ZeroSize,
    #[snafu(display(
        "DMA region window overflows the address space: start={start:#x}, size={size:#x}"
    ))]
    WindowOverflow { start: usize, size: usize },
    #[snafu(display("invalid default DMA alignment {align}: must be zero or a power of two"))]
    InvalidDefaultAlign { align: usize },
    #[snafu(display("backing memory length {actual:#x} does not match region size {expected:#x}"))]
    SizeMismatch { expected: usize, actual: usize },
}

impl Located for ConfigError {
    fn location(&self) -> Option<Location> {
        None
    }
}

/// Bookkeeping corruption found by [`Region::check_invariants`].
///
/// [`Region::check_invariants`]: crate::Region::check_invariants
#[derive(Debug, Snafu, derive_more::IsVariant)]
#[snafu(visibility(pub(crate)))]
pub enum InvariantError {
    #[snafu(display("free list is not sorted by address at {base:#x}"))]
    Unordered { base: usize },
    #[snafu(display("extents overlap at {base:#x}"))]
    Overlap { base: usize },
    #[snafu(display("free extents at {base:#x} and {next:#x} are contiguous but not merged"))]
    Uncoalesced { base: usize, next: usize },
    #[snafu(display("gap in region tiling: {start:#x}..{end:#x} is neither free nor used"))]
    Gap { start: usize, end: usize },
    #[snafu(display("extents outside the region window at {base:#x}"))]
    OutOfWindow { base: usize },
    #[snafu(display("free ({free:#x}) and used ({used:#x}) bytes do not add up to {size:#x}"))]
    ByteCount { free: usize, used: usize, size: usize },
}

impl Located for InvariantError {
    fn location(&self) -> Option<Location> {
        None
    }
}

/// Errors from the default-region registry.
#[derive(Debug, Snafu, derive_more::IsVariant)]
#[snafu(visibility(pub(crate)))]
pub enum GlobalError {
    #[snafu(display("a default DMA region is already installed at {start:#x}"))]
    AlreadyInstalled { start: usize },
}

impl Located for GlobalError {
    fn location(&self) -> Option<Location> {
        None
    }
}
