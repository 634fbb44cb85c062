use core::{fmt, ptr::NonNull, slice};

use crate::{
    addr::DmaAddr,
    error::{AccessError, OutOfBoundsSnafu},
    region::Region,
};

/// Direct view on a reserved buffer.
///
/// Returned by [`Region::reserve`]. The view remembers which reservation it
/// belongs to, so its safe accessors fail with
/// [`AccessError::InvalidHandle`] once the reservation has been released,
/// even if the same address has been handed out again since.
///
/// The safe accessors copy under the region lock. For zero-copy hand-off to
/// hardware, or hot paths that fill the buffer in place, use
/// [`as_mut_ptr`](Self::as_mut_ptr) or [`as_mut_slice`](Self::as_mut_slice).
pub struct DmaSlice<'r> {
    region: &'r Region,
    addr: DmaAddr,
    len: usize,
    serial: u64,
    ptr: NonNull<u8>,
}

// Safe access goes through the region lock; raw access is `unsafe`.
unsafe impl Send for DmaSlice<'_> {}

impl fmt::Debug for DmaSlice<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DmaSlice")
            .field("addr", &self.addr)
            .field("len", &self.len)
            .field("serial", &self.serial)
            .finish_non_exhaustive()
    }
}

impl<'r> DmaSlice<'r> {
    pub(crate) fn new(
        region: &'r Region,
        addr: DmaAddr,
        len: usize,
        serial: u64,
        ptr: NonNull<u8>,
    ) -> Self {
        Self {
            region,
            addr,
            len,
            serial,
            ptr,
        }
    }

    /// View for zero-sized reservations, bound to [`DmaAddr::NULL`].
    pub(crate) fn empty(region: &'r Region) -> Self {
        Self::new(region, DmaAddr::NULL, 0, 0, NonNull::dangling())
    }

    /// Returns the handle of the reservation.
    #[must_use]
    pub fn addr(&self) -> DmaAddr {
        self.addr
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the region the view was reserved from.
    #[must_use]
    pub fn region(&self) -> &'r Region {
        self.region
    }

    /// Copies bytes at `offset` of the buffer into `dst`.
    pub fn read_at(&self, offset: usize, dst: &mut [u8]) -> Result<(), AccessError> {
        self.access(offset, dst.len(), |ptr| unsafe {
            ptr.copy_to(dst.as_mut_ptr(), dst.len());
        })
    }

    /// Copies `src` into the buffer at `offset`.
    pub fn write_at(&self, offset: usize, src: &[u8]) -> Result<(), AccessError> {
        self.access(offset, src.len(), |ptr| unsafe {
            ptr.copy_from(src.as_ptr(), src.len());
        })
    }

    /// Sets every byte of the buffer to `value`.
    pub fn fill(&self, value: u8) -> Result<(), AccessError> {
        self.access(0, self.len, |ptr| unsafe {
            ptr.write_bytes(value, self.len);
        })
    }

    fn access(
        &self,
        offset: usize,
        len: usize,
        f: impl FnOnce(*mut u8),
    ) -> Result<(), AccessError> {
        if self.addr.is_null() {
            let fits = offset.checked_add(len).is_some_and(|end| end == 0);
            if !fits {
                return OutOfBoundsSnafu {
                    addr: self.addr,
                    offset,
                    len,
                    size: 0_usize,
                }
                .fail();
            }
            return Ok(());
        }
        // `with_used` has checked `offset..offset + len` against the extent.
        self.region
            .with_used(self.addr, Some(self.serial), offset, len, |_| {
                f(unsafe { self.ptr.as_ptr().add(offset) });
            })
    }

    /// Returns a raw pointer to the first byte of the buffer.
    #[must_use]
    pub fn as_ptr(&self) -> *const u8 {
        self.ptr.as_ptr()
    }

    /// Returns a raw mutable pointer to the first byte of the buffer.
    #[must_use]
    pub fn as_mut_ptr(&mut self) -> *mut u8 {
        self.ptr.as_ptr()
    }

    /// Borrows the buffer contents directly.
    ///
    /// # Safety
    ///
    /// The caller must ensure that:
    ///
    /// - the reservation is not released while the slice is alive
    /// - no device writes to the buffer while the slice is alive
    #[must_use]
    pub unsafe fn as_slice(&self) -> &[u8] {
        unsafe { slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }

    /// Mutably borrows the buffer contents directly.
    ///
    /// # Safety
    ///
    /// The caller must ensure that:
    ///
    /// - the reservation is not released while the slice is alive
    /// - no device accesses the buffer while the slice is alive
    #[must_use]
    pub unsafe fn as_mut_slice(&mut self) -> &mut [u8] {
        unsafe { slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len) }
    }

    /// Releases the reservation this view belongs to.
    ///
    /// Fails with [`AccessError::InvalidHandle`] if it was already released
    /// through [`Region::release`].
    pub fn release(self) -> Result<(), AccessError> {
        self.region.release_checked(self.addr, Some(self.serial))
    }
}

#[cfg_attr(coverage_nightly, coverage(off))]
#[cfg(test)]
mod tests {
    use crate::{config::RegionConfig, extent::Extent};

    use super::*;

    fn with_test_region<F>(test_fn: F)
    where
        F: FnOnce(&Region),
    {
        let region = Region::new(RegionConfig::new(0x1000, 0x1000)).unwrap();
        test_fn(&region);
        region.check_invariants().unwrap();
    }

    #[test]
    fn test_write_then_read() {
        with_test_region(|region| {
            let (addr, view) = region.reserve(32, 16).unwrap();
            assert_eq!(view.addr(), addr);
            assert_eq!(view.len(), 32);
            view.write_at(4, b"ring").unwrap();

            let mut buf = [0_u8; 4];
            view.read_at(4, &mut buf).unwrap();
            assert_eq!(&buf, b"ring");
            // the copy-based API sees the same bytes
            region.read(addr, 4, &mut buf).unwrap();
            assert_eq!(&buf, b"ring");
            view.release().unwrap();
        });
    }

    #[test]
    fn test_fill() {
        with_test_region(|region| {
            let (_addr, view) = region.reserve(8, 0).unwrap();
            view.fill(0xa5).unwrap();
            let mut buf = [0_u8; 8];
            view.read_at(0, &mut buf).unwrap();
            assert_eq!(buf, [0xa5; 8]);
            view.release().unwrap();
        });
    }

    #[test]
    fn test_out_of_bounds() {
        with_test_region(|region| {
            let (addr, view) = region.reserve(16, 0).unwrap();
            let err = view.write_at(8, &[0; 9]).unwrap_err();
            assert!(err.is_out_of_bounds());
            assert_eq!(err.addr(), addr);
            let mut buf = [0_u8; 1];
            assert!(view.read_at(usize::MAX, &mut buf).unwrap_err().is_out_of_bounds());
            view.release().unwrap();
        });
    }

    #[test]
    fn test_stale_view_after_reuse() {
        with_test_region(|region| {
            let (addr, stale) = region.reserve(64, 0).unwrap();
            region.release(addr).unwrap();
            let (again, fresh) = region.reserve(64, 0).unwrap();
            assert_eq!(again, addr);

            assert!(stale.write_at(0, b"x").unwrap_err().is_invalid_handle());
            assert!(stale.release().unwrap_err().is_invalid_handle());
            fresh.write_at(0, b"x").unwrap();
            fresh.release().unwrap();
        });
    }

    #[test]
    fn test_empty_view() {
        with_test_region(|region| {
            let (addr, view) = region.reserve(0, 0).unwrap();
            assert!(addr.is_null());
            assert!(view.is_empty());
            view.fill(0).unwrap();
            view.write_at(0, &[]).unwrap();
            assert!(view.write_at(0, b"x").unwrap_err().is_out_of_bounds());
            view.release().unwrap();
        });
    }

    #[test]
    fn test_raw_slice_address() {
        with_test_region(|region| {
            let (addr, mut view) = region.reserve(0x100, 0x100).unwrap();
            let slice = unsafe { view.as_mut_slice() };
            slice[0x10..0x14].copy_from_slice(b"head");
            let sub = &slice[0x10..0x20];
            assert_eq!(region.address_of(sub), addr.checked_add(0x10));

            let mut buf = [0_u8; 4];
            view.read_at(0x10, &mut buf).unwrap();
            assert_eq!(&buf, b"head");
            assert_eq!(region.address_of(&buf), None);
            view.release().unwrap();
            assert_eq!(region.free_extents(), [Extent::new(0x1000, 0x1000)]);
        });
    }
}
