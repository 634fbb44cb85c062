//! Address-ordered free list with first-fit allocation.
//!
//! # Algorithm
//!
//! - **Free List**: free extents kept in a vector sorted by base address
//! - **Allocation**: the first extent (lowest address) large enough for the
//!   request is taken; any excess goes back to the list at the same position
//! - **Alignment**: the search size is inflated by the alignment, then the
//!   claimed extent is trimmed in two phases (leading pad, trailing leftover)
//! - **Coalescing**: after a release, every extent whose end equals the next
//!   extent's base is merged with it
//!
//! ```text
//! claimed extent (search size = size + align):
//! ┌───────────┬──────────────────────┬──────────────┐┌──────────────┐
//! │ pad       │ returned (size)      │ leftover     ││ tail         │
//! └───────────┴──────────────────────┴──────────────┘└──────────────┘
//!   ^ back to list, before            ^ back to list,   ^ back to list,
//!                                       after             same position
//! ```

use alloc::vec::Vec;

use crate::extent::Extent;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct FreeList {
    extents: Vec<Extent>,
}

impl FreeList {
    /// Creates a list holding the single extent `initial`.
    pub(crate) fn new(initial: Extent) -> Self {
        let mut extents = Vec::new();
        if !initial.is_empty() {
            extents.push(initial);
        }
        Self { extents }
    }

    pub(crate) fn as_slice(&self) -> &[Extent] {
        &self.extents
    }

    pub(crate) fn total_size(&self) -> usize {
        self.extents.iter().map(Extent::size).sum()
    }

    pub(crate) fn largest(&self) -> usize {
        self.extents.iter().map(Extent::size).max().unwrap_or(0)
    }

    /// Removes and returns the first extent able to hold `size` bytes aligned
    /// to `align`.
    ///
    /// An `align` of zero means no alignment constraint. Returns `None` if no
    /// listed extent is large enough; the list is left untouched in that case.
    ///
    /// # Panics
    ///
    /// Panics if `size` is zero or `align` is neither zero nor a power of two.
    pub(crate) fn claim(&mut self, size: usize, align: usize) -> Option<Extent> {
        assert!(size > 0, "Size must be greater than zero");
        assert!(
            align == 0 || align.is_power_of_two(),
            "Alignment must be zero or a power of two"
        );

        // Inflating by `align` guarantees an aligned start exists in the match.
        let search_size = if align > 0 {
            size.checked_add(align)?
        } else {
            size
        };

        let mut index = self.extents.iter().position(|e| e.size() >= search_size)?;
        let mut claimed = self.extents.remove(index);

        if claimed.size() > search_size {
            let (head, tail) = claimed.split_at(search_size);
            self.extents.insert(index, tail);
            claimed = head;
        }

        if align == 0 {
            return Some(claimed);
        }

        let pad = claimed.base().next_multiple_of(align) - claimed.base();
        if pad > 0 {
            let (lead, rest) = claimed.split_at(pad);
            self.extents.insert(index, lead);
            index += 1;
            claimed = rest;
        }

        if claimed.size() > size {
            let (body, leftover) = claimed.split_at(size);
            self.extents.insert(index, leftover);
            claimed = body;
        }

        assert_eq!(claimed.size(), size);
        assert!(claimed.base().is_multiple_of(align));
        Some(claimed)
    }

    /// Inserts `extent` at its address-ordered position.
    ///
    /// Does not merge; call [`coalesce`](Self::coalesce) afterwards.
    ///
    /// # Panics
    ///
    /// Panics if `extent` overlaps an extent already in the list.
    pub(crate) fn insert(&mut self, extent: Extent) {
        if extent.is_empty() {
            return;
        }

        let index = self.extents.partition_point(|e| e.base() < extent.base());
        if let Some(prev) = index.checked_sub(1).and_then(|i| self.extents.get(i)) {
            assert!(
                !prev.overlaps(&extent),
                "Freed extent {extent:x?} overlaps free extent {prev:x?}"
            );
        }
        if let Some(next) = self.extents.get(index) {
            assert!(
                !next.overlaps(&extent),
                "Freed extent {extent:x?} overlaps free extent {next:x?}"
            );
        }
        self.extents.insert(index, extent);
    }

    /// Merges every run of address-contiguous extents into one extent.
    ///
    /// A single pass is enough: each merged extent keeps absorbing its
    /// successors until a gap is found.
    pub(crate) fn coalesce(&mut self) {
        self.extents.dedup_by(|next, prev| {
            if prev.is_followed_by(next) {
                prev.absorb(*next);
                true
            } else {
                false
            }
        });
    }
}
