use alloc::collections::BTreeMap;

use crate::extent::Extent;

/// Which allocation surface produced a used extent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, derive_more::IsVariant)]
pub enum ExtentKind {
    /// Claimed through the copy-based API (`alloc`/`alloc_from`).
    Allocated,
    /// Claimed through the zero-copy API (`reserve`).
    Reserved,
}

/// An extent currently handed out to a caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UsedExtent {
    extent: Extent,
    kind: ExtentKind,
    serial: u64,
}

impl UsedExtent {
    #[must_use]
    pub fn extent(&self) -> Extent {
        self.extent
    }

    #[must_use]
    pub fn kind(&self) -> ExtentKind {
        self.kind
    }

    /// Claim number, unique within a region.
    ///
    /// Two claims of the same address at different times have different
    /// serials, which is what lets a view detect that its reservation is gone.
    #[must_use]
    pub fn serial(&self) -> u64 {
        self.serial
    }

    /// Returns `true` if `offset..offset + len` lies inside the extent.
    #[must_use]
    pub fn fits(&self, offset: usize, len: usize) -> bool {
        offset
            .checked_add(len)
            .is_some_and(|end| end <= self.extent.size())
    }
}

/// Used extents keyed by base address.
#[derive(Debug, Default)]
pub(crate) struct UsedRegistry {
    entries: BTreeMap<usize, UsedExtent>,
    next_serial: u64,
}

impl UsedRegistry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Records `extent` as used and returns its entry.
    ///
    /// # Panics
    ///
    /// Panics if `extent` overlaps an extent already recorded.
    pub(crate) fn insert(&mut self, extent: Extent, kind: ExtentKind) -> UsedExtent {
        if let Some((_, prev)) = self.entries.range(..=extent.base()).next_back() {
            assert!(
                !prev.extent.overlaps(&extent),
                "Claimed extent {extent:x?} overlaps used extent {:x?}",
                prev.extent
            );
        }
        if let Some((_, next)) = self.entries.range(extent.base()..).next() {
            assert!(
                !next.extent.overlaps(&extent),
                "Claimed extent {extent:x?} overlaps used extent {:x?}",
                next.extent
            );
        }

        let used = UsedExtent {
            extent,
            kind,
            serial: self.next_serial,
        };
        self.next_serial += 1;
        self.entries.insert(extent.base(), used);
        used
    }

    pub(crate) fn get(&self, base: usize) -> Option<&UsedExtent> {
        self.entries.get(&base)
    }

    pub(crate) fn remove(&mut self, base: usize) -> Option<UsedExtent> {
        self.entries.remove(&base)
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &UsedExtent> {
        self.entries.values()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn total_size(&self) -> usize {
        self.entries.values().map(|u| u.extent.size()).sum()
    }
}
