use core::fmt;

/// Address of an allocation inside a DMA region.
///
/// A `DmaAddr` is a plain integer with no ownership attached: it is what a
/// driver writes into a device register (descriptor table base, queue
/// address, ...). It stays valid and unmoved until it is released.
///
/// [`DmaAddr::NULL`] is the sentinel returned for zero-sized requests. Every
/// operation taking a handle treats it as a no-op target.
#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, derive_more::Display,
)]
#[display("{_0:#x}")]
#[repr(transparent)]
pub struct DmaAddr(usize);

impl fmt::LowerHex for DmaAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::LowerHex::fmt(&self.0, f)
    }
}

impl fmt::UpperHex for DmaAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::UpperHex::fmt(&self.0, f)
    }
}

impl DmaAddr {
    /// The "no allocation" address.
    pub const NULL: Self = Self(0);

    #[must_use]
    pub const fn new(addr: usize) -> Self {
        Self(addr)
    }

    /// Returns the raw address value.
    #[must_use]
    pub const fn value(self) -> usize {
        self.0
    }

    #[must_use]
    pub const fn is_null(self) -> bool {
        self.0 == 0
    }

    /// Adds a byte offset, returning `None` on overflow.
    #[must_use]
    pub const fn checked_add(self, offset: usize) -> Option<Self> {
        match self.0.checked_add(offset) {
            Some(addr) => Some(Self(addr)),
            None => None,
        }
    }

    /// Checks if the address is a multiple of `align`.
    ///
    /// An `align` of zero means "no constraint" and always succeeds.
    #[must_use]
    pub const fn is_aligned(self, align: usize) -> bool {
        align == 0 || self.0.is_multiple_of(align)
    }
}

impl From<DmaAddr> for usize {
    fn from(addr: DmaAddr) -> Self {
        addr.0
    }
}
