//! A recording, bump-allocating mock of the [`super::GxQueue`] /
//! [`super::LinearAllocator`] / [`super::VramAllocator`] traits for unit
//! tests that exercise this crate without real hardware.
//!
//! This plays the same testability role as the teacher's `MOCK_MODE`
//! `AtomicBool` in `libs/graphics/components/textures/texture.rs`, which
//! short-circuits real `gl::` calls so resource bookkeeping can be tested
//! in isolation. Here the host traits are genuinely pluggable (there is no
//! hidden global to flip), so the mock is a concrete struct rather than a
//! process-wide flag — every test gets its own queue and can inspect what
//! was submitted.

use super::{
    DisplayTransferParams, FillWidth, GxQueue, LinearAllocator, MemoryFillRegion, PhysicalAddress,
    TextureCopyParams, TextureCopyRect, TextureCopySurface, VramAllocator,
};

/// One call recorded by [`MockGxQueue`], for test assertions.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedCall {
    /// A command list was submitted.
    SubmitCommandList {
        /// Address of the submitted list.
        addr: PhysicalAddress,
        /// Size of the submitted list, in 32-bit words.
        size_in_words: usize,
    },
    /// A memory fill was issued, regions already reordered by address.
    MemoryFill {
        /// The lower-addressed region, if any.
        first: Option<MemoryFillRegion>,
        /// The higher-addressed region, if any.
        second: Option<MemoryFillRegion>,
    },
    /// A display transfer was issued.
    DisplayTransfer(DisplayTransferParams),
    /// A texture copy was issued.
    TextureCopy(TextureCopyParams),
    /// A rectangle copy was issued.
    RectCopy {
        /// The source surface.
        src: TextureCopySurface,
        /// The source sub-rectangle.
        src_rect: TextureCopyRect,
        /// The destination surface.
        dst: TextureCopySurface,
        /// The destination sub-rectangle.
        dst_rect: TextureCopyRect,
    },
    /// A cache region was flushed.
    FlushCacheRegion {
        /// Start address of the flushed region.
        addr: PhysicalAddress,
        /// Size of the flushed region, in bytes.
        size: usize,
    },
    /// A cache region was invalidated.
    InvalidateCacheRegion {
        /// Start address of the invalidated region.
        addr: PhysicalAddress,
        /// Size of the invalidated region, in bytes.
        size: usize,
    },
    /// The queue waited for VBlank.
    WaitVblank,
    /// The queue waited for idle.
    WaitIdle,
    /// The entire linear heap's CPU cache was flushed.
    FlushLinearHeap,
}

/// A `GxQueue` that records every call instead of touching hardware.
#[derive(Debug, Default)]
pub struct MockGxQueue {
    /// Calls recorded so far, in submission order.
    pub calls: Vec<RecordedCall>,
}

impl MockGxQueue {
    /// Creates an empty mock queue.
    pub fn new() -> Self {
        Self::default()
    }
}

impl GxQueue for MockGxQueue {
    fn submit_command_list(&mut self, addr: PhysicalAddress, size_in_words: usize, _flush: bool) {
        self.calls.push(RecordedCall::SubmitCommandList { addr, size_in_words });
    }

    /// Reorders `first`/`second` by address before recording, the same
    /// ordering rule `GLASS_gpu_clearBuffers` applies in the original
    /// (see `examples/original_source/Source/Base/GX.c`'s `GLASS_memoryFill`).
    fn memory_fill(&mut self, first: Option<MemoryFillRegion>, second: Option<MemoryFillRegion>) {
        let (first, second) = match (first, second) {
            (Some(a), Some(b)) if b.addr < a.addr => (Some(b), Some(a)),
            other => other,
        };
        self.calls.push(RecordedCall::MemoryFill { first, second });
    }

    fn display_transfer(&mut self, params: DisplayTransferParams) {
        self.calls.push(RecordedCall::DisplayTransfer(params));
    }

    fn texture_copy(&mut self, params: TextureCopyParams) {
        self.calls.push(RecordedCall::TextureCopy(params));
    }

    fn rect_copy(
        &mut self,
        src: TextureCopySurface,
        src_rect: TextureCopyRect,
        dst: TextureCopySurface,
        dst_rect: TextureCopyRect,
    ) {
        self.calls.push(RecordedCall::RectCopy { src, src_rect, dst, dst_rect });
    }

    fn flush_cache_region(&mut self, addr: PhysicalAddress, size: usize) {
        self.calls.push(RecordedCall::FlushCacheRegion { addr, size });
    }

    fn invalidate_cache_region(&mut self, addr: PhysicalAddress, size: usize) {
        self.calls.push(RecordedCall::InvalidateCacheRegion { addr, size });
    }

    fn wait_vblank(&mut self) {
        self.calls.push(RecordedCall::WaitVblank);
    }

    fn wait_idle(&mut self) {
        self.calls.push(RecordedCall::WaitIdle);
    }

    fn flush_linear_heap(&mut self) {
        self.calls.push(RecordedCall::FlushLinearHeap);
    }
}

/// A simple bump allocator standing in for the linear heap in tests.
///
/// Never reclaims freed space (`free` just records nothing); adequate for
/// unit tests that allocate a handful of buffers and don't churn memory.
#[derive(Debug)]
pub struct BumpAllocator {
    next: PhysicalAddress,
    limit: PhysicalAddress,
}

impl BumpAllocator {
    /// Creates an allocator covering `[base, base + size)`.
    pub fn new(base: PhysicalAddress, size: u32) -> Self {
        Self { next: base, limit: base.wrapping_add(size) }
    }
}

fn align_up(addr: u32, align: usize) -> u32 {
    let align = align.max(1) as u32;
    (addr + align - 1) & !(align - 1)
}

impl LinearAllocator for BumpAllocator {
    fn alloc(&mut self, size: usize, align: usize) -> Option<PhysicalAddress> {
        let start = align_up(self.next, align);
        let end = start.checked_add(size as u32)?;
        if end > self.limit {
            return None;
        }
        self.next = end;
        Some(start)
    }

    fn free(&mut self, _addr: PhysicalAddress) {}
}

impl VramAllocator for BumpAllocator {
    fn alloc(&mut self, size: usize, align: usize) -> Option<PhysicalAddress> {
        LinearAllocator::alloc(self, size, align)
    }

    fn free(&mut self, addr: PhysicalAddress) {
        LinearAllocator::free(self, addr)
    }
}
