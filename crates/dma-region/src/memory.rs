//! Bytes behind a region window.
//!
//! Handle `start + n` corresponds to byte `n` of the backing memory. The
//! memory is reached only through raw pointers: device DMA may write it at any
//! time, so no long-lived Rust reference to it is ever created here.

use alloc::{boxed::Box, vec};
use core::ptr::{self, NonNull};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Source {
    /// Heap arena allocated by the region, freed on drop.
    Owned,
    /// Caller-provided static buffer.
    Static,
    /// Identity-mapped physical window.
    Physical,
}

#[derive(Debug)]
pub(crate) struct Memory {
    base: NonNull<u8>,
    len: usize,
    source: Source,
}

// The pointer is only dereferenced for extents the region's registry hands
// out, and bookkeeping is serialized by the region lock.
unsafe impl Send for Memory {}
unsafe impl Sync for Memory {}

impl Memory {
    /// Allocates a zero-filled heap arena of `len` bytes.
    pub(crate) fn owned(len: usize) -> Self {
        let arena = Box::leak(vec![0_u8; len].into_boxed_slice());
        Self {
            base: NonNull::from(arena).cast(),
            len,
            source: Source::Owned,
        }
    }

    pub(crate) fn from_static(buf: &'static mut [u8]) -> Self {
        let len = buf.len();
        Self {
            base: NonNull::from(buf).cast(),
            len,
            source: Source::Static,
        }
    }

    /// Uses the memory at physical address `start` directly.
    ///
    /// # Safety
    ///
    /// `start..start + len` must be mapped (identity), writable, and not used
    /// by anything else for the lifetime of the returned value. `start` must
    /// be nonzero.
    pub(crate) unsafe fn physical(start: usize, len: usize) -> Self {
        let base = ptr::with_exposed_provenance_mut::<u8>(start);
        Self {
            base: unsafe { NonNull::new_unchecked(base) },
            len,
            source: Source::Physical,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.len
    }

    /// Returns a pointer to byte `offset` of the memory.
    ///
    /// # Panics
    ///
    /// Panics if `offset` is past the end of the memory.
    pub(crate) fn ptr_at(&self, offset: usize) -> NonNull<u8> {
        assert!(offset <= self.len, "Offset {offset:#x} out of backing memory");
        unsafe { self.base.add(offset) }
    }

    /// Returns `Some(offset)` if `buf` lies entirely inside this memory.
    pub(crate) fn offset_of(&self, buf: &[u8]) -> Option<usize> {
        let base = self.base.as_ptr().addr();
        let addr = buf.as_ptr().addr();
        let offset = addr.checked_sub(base)?;
        let end = offset.checked_add(buf.len())?;
        (end <= self.len).then_some(offset)
    }

    /// Copies `dst.len()` bytes starting at `offset` into `dst`.
    ///
    /// # Safety
    ///
    /// `offset..offset + dst.len()` must be inside a used extent owned by the
    /// caller for the duration of the copy.
    pub(crate) unsafe fn read(&self, offset: usize, dst: &mut [u8]) {
        assert!(offset + dst.len() <= self.len);
        unsafe {
            ptr::copy(self.ptr_at(offset).as_ptr(), dst.as_mut_ptr(), dst.len());
        }
    }

    /// Copies `src` into the memory starting at `offset`.
    ///
    /// # Safety
    ///
    /// Same as [`read`](Self::read).
    pub(crate) unsafe fn write(&self, offset: usize, src: &[u8]) {
        assert!(offset + src.len() <= self.len);
        unsafe {
            ptr::copy(src.as_ptr(), self.ptr_at(offset).as_ptr(), src.len());
        }
    }
}

impl Drop for Memory {
    fn drop(&mut self) {
        if self.source == Source::Owned && self.len > 0 {
            let arena = ptr::slice_from_raw_parts_mut(self.base.as_ptr(), self.len);
            drop(unsafe { Box::from_raw(arena) });
        }
    }
}
