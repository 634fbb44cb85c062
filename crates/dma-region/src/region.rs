use alloc::vec::Vec;
use core::fmt;

use log::{debug, error, trace, warn};
use snafu::{OptionExt as _, ensure};
use spin::Mutex;

use crate::{
    addr::DmaAddr,
    config::RegionConfig,
    error::{
        AccessError, AllocError, ByteCountSnafu, ConfigError, GapSnafu, InvalidAlignSnafu,
        InvalidHandleSnafu, InvariantError, OutOfBoundsSnafu, OutOfMemorySnafu,
        OutOfWindowSnafu, OverlapSnafu, SizeMismatchSnafu, UncoalescedSnafu, UnorderedSnafu,
    },
    extent::Extent,
    free_list::FreeList,
    memory::Memory,
    registry::{ExtentKind, UsedExtent, UsedRegistry},
    view::DmaSlice,
};

/// Allocator bookkeeping guarded by the region lock.
#[derive(Debug)]
struct State {
    free: FreeList,
    used: UsedRegistry,
}

impl State {
    fn new(window: Extent) -> Self {
        Self {
            free: FreeList::new(window),
            used: UsedRegistry::new(),
        }
    }

    /// Verifies that free and used extents exactly tile `window`.
    ///
    /// Adjacent free extents are only an error when `require_coalesced` is
    /// set: aligned claims legitimately leave contiguous pieces behind until
    /// the next release merges them.
    fn check(&self, window: Extent, require_coalesced: bool) -> Result<(), InvariantError> {
        let free = self.free.as_slice();
        for pair in free.windows(2) {
            let [prev, next] = pair else { unreachable!() };
            ensure!(prev.base() < next.base(), UnorderedSnafu { base: next.base() });
            ensure!(
                !require_coalesced || !prev.is_followed_by(next),
                UncoalescedSnafu {
                    base: prev.base(),
                    next: next.base(),
                }
            );
        }

        let mut free = free.iter().copied().peekable();
        let mut used = self.used.iter().map(UsedExtent::extent).peekable();
        let mut cursor = window.base();
        loop {
            let extent = match (free.peek().copied(), used.peek().copied()) {
                (Some(f), Some(u)) if f.base() < u.base() => free.next(),
                (Some(_), None) => free.next(),
                (_, Some(_)) => used.next(),
                (None, None) => break,
            };
            let Some(extent) = extent else { break };

            ensure!(
                window.contains(extent.base()) && extent.end() <= window.end(),
                OutOfWindowSnafu {
                    base: extent.base(),
                }
            );
            ensure!(
                extent.base() >= cursor,
                OverlapSnafu {
                    base: extent.base(),
                }
            );
            ensure!(
                extent.base() == cursor,
                GapSnafu {
                    start: cursor,
                    end: extent.base(),
                }
            );
            cursor = extent.end();
        }
        ensure!(
            cursor == window.end(),
            GapSnafu {
                start: cursor,
                end: window.end(),
            }
        );

        let free_bytes = self.free.total_size();
        let used_bytes = self.used.total_size();
        ensure!(
            free_bytes + used_bytes == window.size(),
            ByteCountSnafu {
                free: free_bytes,
                used: used_bytes,
                size: window.size(),
            }
        );
        Ok(())
    }
}

/// Allocation counters of a region at one instant.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RegionStats {
    pub free_bytes: usize,
    pub used_bytes: usize,
    pub free_extents: usize,
    pub used_extents: usize,
    pub reserved_extents: usize,
    pub largest_free: usize,
}

/// A fixed address window managed as a first-fit, coalescing DMA allocator.
///
/// Every byte of `start..start + size` is at all times either in the free
/// list or in the used registry. Handles returned by allocation are plain
/// addresses inside the window and stay put until released.
///
/// All operations take the region lock for their bookkeeping and log only
/// after dropping it. The lock is a spinlock and is not reentrant. It
/// protects the bookkeeping only, never the buffer contents: sequencing CPU
/// and device accesses to a buffer is the driver's job.
pub struct Region {
    window: Extent,
    default_align: usize,
    memory: Memory,
    state: Mutex<State>,
}

impl fmt::Debug for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut d = f.debug_struct("Region");
        d.field("start", &format_args!("{:#x}", self.start()))
            .field("size", &format_args!("{:#x}", self.size()));
        match self.state.try_lock() {
            Some(state) => d.field("state", &*state),
            None => d.field("state", &"<locked>"),
        };
        d.finish()
    }
}

impl Region {
    /// Creates a region backed by a zero-filled heap arena.
    ///
    /// Handles are still numbered from `config.start()`; only the bytes live
    /// on the heap. This is the constructor for hosted use and tests.
    pub fn new(config: RegionConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::with_memory(config, Memory::owned(config.size())))
    }

    /// Creates a region over a caller-provided static buffer.
    pub fn from_static(config: RegionConfig, buf: &'static mut [u8]) -> Result<Self, ConfigError> {
        config.validate()?;
        ensure!(
            buf.len() == config.size(),
            SizeMismatchSnafu {
                expected: config.size(),
                actual: buf.len(),
            }
        );
        Ok(Self::with_memory(config, Memory::from_static(buf)))
    }

    /// Creates a region over the identity-mapped physical window described by
    /// `config`.
    ///
    /// # Safety
    ///
    /// The caller must ensure that:
    ///
    /// - `config.start()..config.start() + config.size()` is mapped at the same
    ///   virtual address and is readable and writable
    /// - the window is not used by anything else (runtime heap, other regions)
    ///   for the lifetime of the returned region
    pub unsafe fn from_physical(config: RegionConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let memory = unsafe { Memory::physical(config.start(), config.size()) };
        Ok(Self::with_memory(config, memory))
    }

    fn with_memory(config: RegionConfig, memory: Memory) -> Self {
        assert_eq!(memory.len(), config.size());
        let window = Extent::new(config.start(), config.size());
        debug!(
            "DMA region {:#x}..{:#x} ({} bytes, default align {})",
            window.base(),
            window.end(),
            window.size(),
            config.default_align()
        );
        Self {
            window,
            default_align: config.default_align(),
            memory,
            state: Mutex::new(State::new(window)),
        }
    }

    /// Returns the first address of the window.
    #[must_use]
    pub fn start(&self) -> usize {
        self.window.base()
    }

    /// Returns one past the last address of the window.
    #[must_use]
    pub fn end(&self) -> usize {
        self.window.end()
    }

    #[must_use]
    pub fn size(&self) -> usize {
        self.window.size()
    }

    /// Returns `true` if `addr` lies inside the window.
    #[must_use]
    pub fn contains(&self, addr: DmaAddr) -> bool {
        self.window.contains(addr.value())
    }

    /// Returns the handle address of `buf` if it lies inside this region's
    /// backing memory, e.g. a sub-slice of a reserved view.
    #[must_use]
    pub fn address_of(&self, buf: &[u8]) -> Option<DmaAddr> {
        let offset = self.memory.offset_of(buf)?;
        Some(DmaAddr::new(self.start() + offset))
    }

    /// Allocates `size` bytes aligned to `align`.
    ///
    /// An `align` of zero applies the region's default alignment (none unless
    /// configured). A `size` of zero returns [`DmaAddr::NULL`] without
    /// claiming anything. The buffer keeps whatever bytes it last held.
    pub fn alloc(&self, size: usize, align: usize) -> Result<DmaAddr, AllocError> {
        if size == 0 {
            return Ok(DmaAddr::NULL);
        }
        let align = self.effective_align(align)?;

        let used = self.claim(size, align, ExtentKind::Allocated, |_| {})?;
        Ok(DmaAddr::new(used.extent().base()))
    }

    /// Allocates a buffer holding a copy of `contents`.
    ///
    /// An empty `contents` returns [`DmaAddr::NULL`]. If `contents` already
    /// lies inside this region's memory (e.g. it was carved out of a reserved
    /// view), its address is returned as is: nothing is claimed or copied and
    /// `align` is not checked against it.
    pub fn alloc_from(&self, contents: &[u8], align: usize) -> Result<DmaAddr, AllocError> {
        if contents.is_empty() {
            return Ok(DmaAddr::NULL);
        }
        if let Some(addr) = self.address_of(contents) {
            trace!("DMA buffer {addr} is already in the region");
            return Ok(addr);
        }
        let align = self.effective_align(align)?;

        let used = self.claim(contents.len(), align, ExtentKind::Allocated, |used| unsafe {
            self.memory.write(self.memory_offset(used, 0), contents);
        })?;
        Ok(DmaAddr::new(used.extent().base()))
    }

    /// Reserves `size` bytes aligned to `align` and returns a direct view on
    /// them.
    ///
    /// The view lets producers fill and consumers drain the buffer without
    /// staging copies. Its contents are whatever the memory last held. A
    /// `size` of zero returns [`DmaAddr::NULL`] and an empty view.
    pub fn reserve(
        &self,
        size: usize,
        align: usize,
    ) -> Result<(DmaAddr, DmaSlice<'_>), AllocError> {
        if size == 0 {
            return Ok((DmaAddr::NULL, DmaSlice::empty(self)));
        }
        let align = self.effective_align(align)?;

        let used = self.claim(size, align, ExtentKind::Reserved, |_| {})?;
        let addr = DmaAddr::new(used.extent().base());
        let ptr = self.memory.ptr_at(self.memory_offset(&used, 0));
        Ok((addr, DmaSlice::new(self, addr, size, used.serial(), ptr)))
    }

    /// Copies `dst.len()` bytes at `offset` of the allocation `addr` into
    /// `dst`.
    ///
    /// [`DmaAddr::NULL`] is a no-op. When `dst` already is the requested
    /// bytes, as when reading a reserved buffer back through its own view,
    /// the handle and range are still validated but nothing is copied.
    pub fn read(&self, addr: DmaAddr, offset: usize, dst: &mut [u8]) -> Result<(), AccessError> {
        if addr.is_null() {
            return Ok(());
        }
        let in_place = self.memory.offset_of(dst);
        self.with_used(addr, None, offset, dst.len(), |mem_offset| {
            if in_place != Some(mem_offset) {
                unsafe { self.memory.read(mem_offset, dst) };
            }
        })
    }

    /// Copies `src` into the allocation `addr` at `offset`.
    ///
    /// [`DmaAddr::NULL`] is a no-op.
    pub fn write(&self, addr: DmaAddr, src: &[u8], offset: usize) -> Result<(), AccessError> {
        if addr.is_null() {
            return Ok(());
        }
        self.with_used(addr, None, offset, src.len(), |mem_offset| unsafe {
            self.memory.write(mem_offset, src);
        })
    }

    /// Returns the allocation `addr` to the free list and coalesces.
    ///
    /// Releasing an address that is not allocated, including a second
    /// release of the same address, fails with
    /// [`AccessError::InvalidHandle`]. [`DmaAddr::NULL`] is a no-op.
    pub fn release(&self, addr: DmaAddr) -> Result<(), AccessError> {
        self.release_checked(addr, None)
    }

    pub(crate) fn release_checked(
        &self,
        addr: DmaAddr,
        serial: Option<u64>,
    ) -> Result<(), AccessError> {
        if addr.is_null() {
            return Ok(());
        }

        let mut state = self.state.lock();
        if let Err(err) = Self::lookup(&state, addr, serial) {
            drop(state);
            error!("{err}");
            return Err(err);
        }
        let Some(used) = state.used.remove(addr.value()) else {
            unreachable!("looked up entry vanished under the lock");
        };
        state.free.insert(used.extent());
        state.free.coalesce();
        self.debug_check(&state, true);
        drop(state);

        trace!(
            "DMA release {addr} ({} bytes, {:?})",
            used.extent().size(),
            used.kind()
        );
        Ok(())
    }

    /// Runs `f` with the backing-memory offset of `offset` inside the
    /// allocation `addr`, after validating the handle and the byte range
    /// `offset..offset + len`. `f` runs under the region lock.
    pub(crate) fn with_used<R>(
        &self,
        addr: DmaAddr,
        serial: Option<u64>,
        offset: usize,
        len: usize,
        f: impl FnOnce(usize) -> R,
    ) -> Result<R, AccessError> {
        let result = {
            let state = self.state.lock();
            Self::lookup(&state, addr, serial).and_then(|used| {
                ensure!(
                    used.fits(offset, len),
                    OutOfBoundsSnafu {
                        addr,
                        offset,
                        len,
                        size: used.extent().size(),
                    }
                );
                Ok(f(self.memory_offset(&used, offset)))
            })
        };
        result.inspect_err(|err| error!("{err}"))
    }

    fn lookup(
        state: &State,
        addr: DmaAddr,
        serial: Option<u64>,
    ) -> Result<UsedExtent, AccessError> {
        state
            .used
            .get(addr.value())
            .filter(|used| serial.is_none_or(|serial| used.serial() == serial))
            .copied()
            .context(InvalidHandleSnafu { addr })
    }

    fn effective_align(&self, align: usize) -> Result<usize, AllocError> {
        ensure!(
            align == 0 || align.is_power_of_two(),
            InvalidAlignSnafu { align }
        );
        Ok(if align == 0 { self.default_align } else { align })
    }

    /// Claims an extent and records it as used, running `init` on it before
    /// the region lock is released.
    fn claim(
        &self,
        size: usize,
        align: usize,
        kind: ExtentKind,
        init: impl FnOnce(&UsedExtent),
    ) -> Result<UsedExtent, AllocError> {
        let mut state = self.state.lock();
        let Some(extent) = state.free.claim(size, align) else {
            let (free, largest) = (state.free.total_size(), state.free.largest());
            drop(state);
            warn!(
                "DMA region {:#x}: out of memory for {size} bytes aligned to {align} \
                 (free {free} bytes, largest {largest})",
                self.start(),
            );
            return OutOfMemorySnafu { size, align }.fail();
        };
        let used = state.used.insert(extent, kind);
        init(&used);
        self.debug_check(&state, false);
        drop(state);

        trace!(
            "DMA {kind:?} {:#x} ({size} bytes, align {align})",
            extent.base()
        );
        Ok(used)
    }

    fn memory_offset(&self, used: &UsedExtent, offset: usize) -> usize {
        used.extent().base() - self.start() + offset
    }

    fn debug_check(&self, state: &State, require_coalesced: bool) {
        if !cfg!(debug_assertions) {
            return;
        }
        if let Err(err) = state.check(self.window, require_coalesced) {
            panic!("DMA region bookkeeping corrupted: {err}");
        }
    }

    /// Verifies the region bookkeeping.
    ///
    /// Checks that the free list is sorted and that free and used extents
    /// exactly tile the window without overlap. Debug builds run this after
    /// every allocation and release.
    pub fn check_invariants(&self) -> Result<(), InvariantError> {
        self.state.lock().check(self.window, false)
    }

    #[must_use]
    pub fn stats(&self) -> RegionStats {
        let state = self.state.lock();
        RegionStats {
            free_bytes: state.free.total_size(),
            used_bytes: state.used.total_size(),
            free_extents: state.free.as_slice().len(),
            used_extents: state.used.len(),
            reserved_extents: state.used.iter().filter(|u| u.kind().is_reserved()).count(),
            largest_free: state.free.largest(),
        }
    }

    /// Returns a snapshot of the free list in address order.
    #[must_use]
    pub fn free_extents(&self) -> Vec<Extent> {
        self.state.lock().free.as_slice().to_vec()
    }

    /// Returns a snapshot of the used registry in address order.
    #[must_use]
    pub fn used_extents(&self) -> Vec<UsedExtent> {
        self.state.lock().used.iter().copied().collect()
    }
}
