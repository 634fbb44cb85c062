use core::ops::Range;

/// A contiguous range of the managed address space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Extent {
    base: usize,
    size: usize,
}

impl Extent {
    /// Creates an extent covering `base..base + size`.
    ///
    /// # Panics
    ///
    /// Panics if the end address overflows `usize`.
    #[must_use]
    pub const fn new(base: usize, size: usize) -> Self {
        assert!(base.checked_add(size).is_some(), "Extent end overflows");
        Self { base, size }
    }

    #[must_use]
    pub const fn base(&self) -> usize {
        self.base
    }

    #[must_use]
    pub const fn size(&self) -> usize {
        self.size
    }

    /// Returns one past the last address of the extent.
    #[must_use]
    pub const fn end(&self) -> usize {
        self.base + self.size
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.size == 0
    }

    #[must_use]
    pub const fn range(&self) -> Range<usize> {
        self.base..self.end()
    }

    #[must_use]
    pub const fn contains(&self, addr: usize) -> bool {
        self.base <= addr && addr < self.end()
    }

    /// Returns `true` if `next` starts exactly where `self` ends.
    #[must_use]
    pub const fn is_followed_by(&self, next: &Self) -> bool {
        self.end() == next.base
    }

    #[must_use]
    pub const fn overlaps(&self, other: &Self) -> bool {
        self.base < other.end() && other.base < self.end()
    }

    /// Splits the extent at `offset` bytes from its base.
    ///
    /// # Panics
    ///
    /// Panics if `offset` is larger than the extent.
    #[must_use]
    pub const fn split_at(self, offset: usize) -> (Self, Self) {
        assert!(offset <= self.size, "Split offset out of extent");
        (
            Self {
                base: self.base,
                size: offset,
            },
            Self {
                base: self.base + offset,
                size: self.size - offset,
            },
        )
    }

    /// Grows the extent by absorbing `next`, which must follow it directly.
    pub(crate) fn absorb(&mut self, next: Self) {
        assert!(self.is_followed_by(&next), "Absorbed extent must be adjacent");
        self.size += next.size;
    }
}
