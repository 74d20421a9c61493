//! The boundary between this crate and the real GPU/GSP driver.
//!
//! Everything in this module is a trait: the host-OS linear-heap and VRAM
//! allocators, the GX command queue, and the display-transfer/memory-fill/
//! texture-copy/VBlank primitives are all declared opaque here and provided
//! by a platform crate, never implemented by this one. That split mirrors
//! spec.md's own scope boundary (linear-heap/VRAM allocators and the host-OS
//! GX/GSP driver are explicitly out of scope) and is grounded on
//! `examples/original_source/Source/Base/GX.c`'s `GLASS_memoryFill`/
//! `GLASS_displayTransfer`/`GLASS_textureCopy`/`GLASS_processCommandList`
//! function surface.
//!
//! # Design Pattern
//!
//! Like the teacher's `RenderBackend` trait, [`GxQueue`] is intentionally
//! not object-safe: contexts are generic over a concrete `Q: GxQueue`
//! rather than boxing a trait object, so the hot submit path stays a direct
//! call.

/// A physical memory address as the GX hardware sees it (linear heap or
/// VRAM); never dereferenced by this crate.
pub type PhysicalAddress = u32;

/// Pixel formats the display-transfer engine can read or write, per
/// spec.md §4.7's transfer-format enum.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransferFormat {
    /// 32-bit RGBA.
    Rgba8 = 0,
    /// 24-bit RGB.
    Rgb8 = 1,
    /// 16-bit RGB565.
    Rgb565 = 2,
    /// 16-bit RGBA5551.
    Rgb5A1 = 3,
    /// 16-bit RGBA4444.
    Rgba4 = 4,
}

/// Output downscale applied during a display transfer.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TransferScaling {
    /// No downscale.
    #[default]
    None = 0,
    /// Downscale by 2 horizontally.
    Horizontal2x1 = 1,
    /// Downscale by 2 in both dimensions.
    Both2x2 = 2,
}

/// Fill granularity for a GX memory fill.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FillWidth {
    /// 16-bit fill value.
    Bits16 = 0,
    /// 24-bit fill value.
    Bits24 = 1,
    /// 32-bit fill value.
    Bits32 = 2,
}

/// Parameters for a single memory-fill region, as submitted to the GX
/// queue. [`GxQueue::memory_fill`] takes one or two of these: when two
/// regions are given, the queue sorts them by address before submission,
/// matching the hardware's requirement (see `submit_memory_fill`'s
/// doc comment for the ordering rule).
#[derive(Debug, Clone, Copy)]
pub struct MemoryFillRegion {
    /// Start address of the region to fill.
    pub addr: PhysicalAddress,
    /// Size of the region in bytes.
    pub size: usize,
    /// The fill value (interpreted per `width`).
    pub value: u32,
    /// Fill granularity.
    pub width: FillWidth,
}

/// Parameters for a display transfer (used both for the swap engine's
/// framebuffer-to-screen blit and for `glReadPixels`/tiling conversions that
/// route through the hardware transfer engine).
#[derive(Debug, Clone, Copy)]
pub struct DisplayTransferParams {
    /// Source buffer address.
    pub src_addr: PhysicalAddress,
    /// Source width in pixels.
    pub src_width: u16,
    /// Source height in pixels.
    pub src_height: u16,
    /// Source pixel format.
    pub src_format: TransferFormat,
    /// Destination buffer address.
    pub dst_addr: PhysicalAddress,
    /// Destination width in pixels.
    pub dst_width: u16,
    /// Destination height in pixels.
    pub dst_height: u16,
    /// Destination pixel format.
    pub dst_format: TransferFormat,
    /// Whether to flip the output vertically.
    pub vertical_flip: bool,
    /// Whether the output should be written in tiled (Z-order) layout.
    pub make_tiled: bool,
    /// Downscale factor to apply during the transfer.
    pub scaling: TransferScaling,
}

/// Parameters for a raw linear-to-linear texture copy (used by the texture
/// manager's hardware tiling fast path).
#[derive(Debug, Clone, Copy)]
pub struct TextureCopyParams {
    /// Source buffer address.
    pub src_addr: PhysicalAddress,
    /// Destination buffer address.
    pub dst_addr: PhysicalAddress,
    /// Number of bytes to copy.
    pub size: usize,
}

/// One side of a [`GxQueue::rect_copy`]: a surface the transfer engine reads
/// from or writes to, described the way the hardware addresses it rather
/// than by logical texture coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextureCopySurface {
    /// Base address of the surface.
    pub addr: PhysicalAddress,
    /// Full width of the surface, in pixels (not just the sub-rectangle).
    pub width: u32,
    /// Full height of the surface, in pixels.
    pub height: u32,
    /// Bytes per pixel.
    pub bytes_per_pixel: u32,
    /// Whether the surface is stored in the PICA200's rotated (tiled)
    /// layout rather than row-major.
    pub rotated: bool,
}

/// A sub-rectangle within a [`TextureCopySurface`], in pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextureCopyRect {
    /// Left edge.
    pub x: u32,
    /// Top edge.
    pub y: u32,
    /// Width of the rectangle.
    pub width: u32,
    /// Height of the rectangle.
    pub height: u32,
}

/// The GX command queue: submits finalized command lists and schedules the
/// transfer-engine operations a context needs (clear, swap, hardware
/// tiling). A context holds one `Q: GxQueue` for its lifetime.
///
/// # Object Safety
///
/// Not object-safe by design, matching the teacher's `RenderBackend`: a
/// context is generic over its queue implementation rather than boxing it.
pub trait GxQueue: Send + Sync {
    /// Submits a finalized command list for GPU execution.
    ///
    /// `addr` must point to linear-heap or VRAM memory containing
    /// `size_in_words` finalized 32-bit command words (see
    /// [`crate::libs::graphics::encoder::CommandList::finalize_and_swap`]).
    /// If `flush` is set, the CPU cache for that range is flushed before
    /// the GPU reads it.
    fn submit_command_list(&mut self, addr: PhysicalAddress, size_in_words: usize, flush: bool);

    /// Fills one or two memory regions with a constant value.
    ///
    /// When both `first` and `second` are provided, the hardware requires
    /// the lower physical address be passed as the first argument; this is
    /// the implementation's responsibility, not the caller's — callers may
    /// pass the color and depth/stencil regions in either order.
    fn memory_fill(&mut self, first: Option<MemoryFillRegion>, second: Option<MemoryFillRegion>);

    /// Performs a display transfer (format conversion, optional downscale,
    /// optional tiling, optional vertical flip) from one buffer to another.
    fn display_transfer(&mut self, params: DisplayTransferParams);

    /// Performs a raw byte-for-byte copy between two linear/VRAM buffers.
    fn texture_copy(&mut self, params: TextureCopyParams);

    /// Copies a sub-rectangle between two surfaces, converting between
    /// tiled and row-major layout as the `rotated` flags require. Used by
    /// the texture manager's rectangle read/write path
    /// (`GLASS_tex_readRect`/`GLASS_tex_writeRect`'s `kygxSyncRectCopy`).
    fn rect_copy(
        &mut self,
        src: TextureCopySurface,
        src_rect: TextureCopyRect,
        dst: TextureCopySurface,
        dst_rect: TextureCopyRect,
    );

    /// Writes back the CPU cache for `size` bytes starting at `addr`, so the
    /// GPU's view of host-written memory is current before a transfer reads
    /// it.
    fn flush_cache_region(&mut self, addr: PhysicalAddress, size: usize);

    /// Invalidates the CPU cache for `size` bytes starting at `addr`, so a
    /// subsequent CPU read observes what the GPU just wrote rather than a
    /// stale cache line.
    fn invalidate_cache_region(&mut self, addr: PhysicalAddress, size: usize);

    /// Blocks the calling thread until the next VBlank, ordering subsequent
    /// submissions after the display has latched the current framebuffer.
    fn wait_vblank(&mut self);

    /// Blocks until every command submitted so far has finished executing.
    fn wait_idle(&mut self);

    /// Flushes (writes back) the CPU cache for the *entire* linear heap.
    ///
    /// Used by the swap engine when a context's `flush_all_linear` option
    /// (spec.md §4.1 flush step 9) is set, as a coarser alternative to the
    /// translator issuing a per-region cache flush for each buffer/texture
    /// it touched. Most contexts leave this unset and rely on per-region
    /// flushes instead; this exists for callers that would rather pay one
    /// flush of the whole heap than track regions precisely.
    fn flush_linear_heap(&mut self);
}

/// Host-OS allocator for the GPU-addressable linear heap.
///
/// Command lists, vertex/index buffers, and non-VRAM textures all live in
/// linear memory; this crate never allocates it directly.
pub trait LinearAllocator: Send + Sync {
    /// Allocates `size` bytes of linear memory, aligned to `align` (a power
    /// of two). Returns `None` on exhaustion.
    fn alloc(&mut self, size: usize, align: usize) -> Option<PhysicalAddress>;

    /// Frees a previously allocated region.
    fn free(&mut self, addr: PhysicalAddress);
}

/// Host-OS allocator for dedicated video memory (VRAM), used for
/// render-target-only textures and renderbuffers when the caller requests
/// VRAM placement.
pub trait VramAllocator: Send + Sync {
    /// Allocates `size` bytes of VRAM, aligned to `align`. Returns `None` on
    /// exhaustion.
    fn alloc(&mut self, size: usize, align: usize) -> Option<PhysicalAddress>;

    /// Frees a previously allocated region.
    fn free(&mut self, addr: PhysicalAddress);
}

pub mod mock;
