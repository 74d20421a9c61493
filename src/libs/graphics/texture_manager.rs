//! Pixel-format tables, Z-order tiling, and texture (re)allocation.
//!
//! The PICA200 stores every 2D image — textures, renderbuffers, the
//! framebuffer itself — tiled in 8x8 blocks of Z-order (Morton) pixels
//! rather than row-major. This module holds the bits-per-pixel tables for
//! every supported format, the tile/untile transform, mip-level offset
//! math, and the allocate/reallocate logic [`crate::libs::graphics::resources::Texture`]
//! needs when the application calls `glTexImage2D` or resizes a
//! renderbuffer.
//!
//! # Design Pattern
//!
//! [`Z_ORDER_TABLE`] and [`tile_offset`] are ported directly from
//! `examples/original_source/Source/Base/Tiling.c`'s `GLASS_handleTile`;
//! [`sw_tile`] drives it in both directions via its `to_tiled` flag,
//! matching `GLASS_swTiling`. The bpp table in [`NativePixelFormat::bpp`]
//! comes from `examples/original_source/Source/Base/Format.c`. The realloc
//! unchanged/updated/failed tri-state and cube-map co-residency check
//! mirror `examples/original_source/Source/Base/TexManager.c`'s
//! `GLASS_reallocTexImpl`/`GLASS_tex_realloc`; [`write_tiled`],
//! [`write_untiled`], [`read_rect`] and [`write_rect`] mirror that same
//! file's `GLASS_tex_write`/`GLASS_tex_writeUntiled`/`GLASS_tex_readRect`/
//! `GLASS_tex_writeRect`. [`untile_rect`] and [`tile_rect`] cover the
//! unaligned-rectangle case (`GLASS_tex_readUntiledRect`/
//! `GLASS_tex_writeUntiledRect`): align outward to the tile grid, run
//! [`read_rect`]/[`write_rect`] over the aligned extent, then untile/tile in
//! software around a row-wise sub-rectangle copy.

use crate::core::error::GlError;
use crate::libs::graphics::host::{
    GxQueue, PhysicalAddress, TextureCopyParams, TextureCopyRect, TextureCopySurface, TransferFormat,
};

/// Z-order (Morton) offset of each of the 64 pixels within an 8x8 tile, in
/// row-major scan order. Ported verbatim from `Tiling.c`'s
/// `Z_ORDER_TABLE`; the 8 values cover one row of 8 pixels and are reused
/// for each of the 8 rows with a `+= 4` shift, matching the original's
/// nested-loop indexing.
pub const Z_ORDER_TABLE: [u8; 8] = [0, 1, 4, 5, 16, 17, 20, 21];

/// Side length, in pixels, of one tile.
pub const TILE_SIZE: u32 = 8;

/// Native GPU pixel formats a texture's storage may use, per spec.md §3.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NativePixelFormat {
    /// 32-bit RGBA.
    Rgba8,
    /// 24-bit RGB.
    Rgb8,
    /// 16-bit RGBA5551.
    Rgb5A1,
    /// 16-bit RGB565.
    Rgb565,
    /// 16-bit RGBA4444.
    Rgba4,
    /// 16-bit luminance-alpha.
    La8,
    /// 8-bit luminance.
    L8,
    /// 8-bit alpha.
    A8,
    /// 8-bit luminance-alpha (4 bits each).
    La4,
    /// 4-bit luminance.
    L4,
    /// 4-bit alpha.
    A4,
    /// ETC1 compressed RGB.
    Etc1,
    /// ETC1 compressed RGBA (with an alpha plane).
    Etc1A4,
}

impl NativePixelFormat {
    /// Bits per pixel, per `GLASS_texBpp`. Compressed formats return their
    /// *average* bits per pixel (4 for ETC1, 8 for ETC1A4) since they are
    /// never addressed per-pixel.
    pub const fn bpp(self) -> u32 {
        match self {
            NativePixelFormat::Rgba8 => 32,
            NativePixelFormat::Rgb8 => 24,
            NativePixelFormat::Rgb5A1 | NativePixelFormat::Rgb565 | NativePixelFormat::Rgba4 | NativePixelFormat::La8 => 16,
            NativePixelFormat::L8 | NativePixelFormat::A8 | NativePixelFormat::La4 => 8,
            NativePixelFormat::L4 | NativePixelFormat::A4 => 4,
            NativePixelFormat::Etc1 => 4,
            NativePixelFormat::Etc1A4 => 8,
        }
    }

    /// Whether this format is a block-compressed ETC1 variant, which
    /// bypasses the per-pixel tiling path entirely (the compressed blob is
    /// stored as supplied).
    pub const fn is_compressed(self) -> bool {
        matches!(self, NativePixelFormat::Etc1 | NativePixelFormat::Etc1A4)
    }

    /// Maps this texture format onto a hardware transfer format, where one
    /// exists, for use in display transfers / hardware-tiling copies.
    /// Mirrors `GLASS_pixels_tryUnwrapTransferFormat`'s texture branch.
    pub const fn transfer_format(self) -> Option<TransferFormat> {
        match self {
            NativePixelFormat::Rgba8 => Some(TransferFormat::Rgba8),
            NativePixelFormat::Rgb8 => Some(TransferFormat::Rgb8),
            NativePixelFormat::Rgb565 => Some(TransferFormat::Rgb565),
            NativePixelFormat::Rgb5A1 => Some(TransferFormat::Rgb5A1),
            NativePixelFormat::Rgba4 => Some(TransferFormat::Rgba4),
            _ => None,
        }
    }
}

/// Computes the flat (untiled, row-major) byte offset of pixel `(x, y)` in
/// an image of `width` pixels at `bpp` bits per pixel.
pub fn linear_offset(x: u32, y: u32, width: u32, bpp: u32) -> usize {
    ((y * width + x) as usize * bpp as usize) / 8
}

/// Computes the tiled (Z-order) byte offset of pixel `(x, y)` in an image
/// of `width`x`height` pixels at `bpp` bits per pixel.
///
/// Ported from `Tiling.c`'s `GLASS_handleTile`: the image is divided into
/// 8x8 tiles stored left-to-right, bottom-to-top (the PICA200 framebuffer
/// origin is bottom-left), and pixels within a tile follow
/// [`Z_ORDER_TABLE`].
pub fn tile_offset(x: u32, y: u32, width: u32, bpp: u32) -> usize {
    let tiles_per_row = width / TILE_SIZE;
    let tile_x = x / TILE_SIZE;
    let tile_y = y / TILE_SIZE;
    let tile_index = tile_y * tiles_per_row + tile_x;

    let in_tile_x = x % TILE_SIZE;
    let in_tile_y = y % TILE_SIZE;
    let morton = Z_ORDER_TABLE[in_tile_x as usize] as u32 + (in_tile_y as u32) * 4;

    let pixel_index = tile_index * (TILE_SIZE * TILE_SIZE) + morton;
    (pixel_index as usize * bpp as usize) / 8
}

/// Byte offset of mip level `level`'s data within a tiled texture whose
/// base level is `width`x`height` at `bpp` bits per pixel.
///
/// `sum_{i=0}^{level-1} bpp * (w>>i) * (h>>i) / 8` collapses (for
/// power-of-two, square-ish mip chains where each level is 1/4 the area of
/// the previous) into the closed form `bpp*w*h*((4^level - 1) / 12) / 8`,
/// matching the original's mip-offset formula.
pub fn mip_level_offset(width: u32, height: u32, bpp: u32, level: u32) -> usize {
    if level == 0 {
        return 0;
    }
    let four_pow = 4u64.pow(level);
    let numerator = bpp as u64 * width as u64 * height as u64 * (four_pow - 1);
    (numerator / 12 / 8) as usize
}

/// Converts between tiled and linear layouts in-place over a full
/// `width`x`height` image, used for the software tiling fallback (the
/// hardware transfer-engine fast path only applies at >=64x64, per
/// `GLASS_hwTransferFormat`).
///
/// `to_tiled` selects the direction: `true` copies `src` (row-major) into
/// `dst` (Z-order); `false` is the inverse.
pub fn sw_tile(src: &[u8], dst: &mut [u8], width: u32, height: u32, bpp: u32, to_tiled: bool) {
    for y in 0..height {
        for x in 0..width {
            let linear = linear_offset(x, y, width, bpp);
            let tiled = tile_offset(x, y, width, bpp);
            let bytes = (bpp as usize).div_ceil(8).max(1);
            let (from, to) = if to_tiled { (linear, tiled) } else { (tiled, linear) };
            if from + bytes <= src.len() && to + bytes <= dst.len() {
                dst[to..to + bytes].copy_from_slice(&src[from..from + bytes]);
            }
        }
    }
}

/// Flips an image vertically in place, one row at a time.
///
/// OpenGL's texture origin is bottom-left; the PICA200's native tiled
/// layout expects top-left. `write_untiled` applies this before handing
/// data to [`sw_tile`], matching `GLASS_tex_writeUntiled`'s
/// `ripConvertToNative(..., true)` flip argument.
pub fn flip_vertical(buf: &mut [u8], width: u32, height: u32, bpp: u32) {
    let stride = (width as usize * bpp as usize).div_ceil(8);
    for row in 0..(height as usize / 2) {
        let other = height as usize - 1 - row;
        let (top, bottom) = buf.split_at_mut(other * stride);
        let top_row = &mut top[row * stride..row * stride + stride];
        let bottom_row = &mut bottom[..stride];
        top_row.swap_with_slice(bottom_row);
    }
}

/// Converts a row-major, bottom-left-origin image supplied by the
/// application (as `glTexImage2D`-style calls receive it) into the tiled
/// bytes ready to hand to [`write_tiled`].
///
/// Grounded on `GLASS_tex_writeUntiled`: flip the Y axis, then run the
/// software tile encoder. The result is sized for exactly one
/// `width`x`height` level; callers write it at the destination face's
/// mip offset.
pub fn write_untiled(src: &[u8], width: u32, height: u32, bpp: u32) -> Vec<u8> {
    let mut flipped = src.to_vec();
    flip_vertical(&mut flipped, width, height, bpp);
    let mut tiled = vec![0u8; flipped.len()];
    sw_tile(&flipped, &mut tiled, width, height, bpp, true);
    tiled
}

/// Performs the hardware-accelerated tiled write `GLASS_tex_write`
/// describes: flush the CPU cache for both the source and destination
/// regions, issue an asynchronous byte-exact copy, then invalidate the
/// destination region so no stale cache line is read back by the CPU.
///
/// `src_addr` must already hold `size` bytes of correctly tiled data (the
/// output of [`write_untiled`] for a software-converted upload, or
/// already-tiled data for a direct GPU-to-GPU copy). `dst_addr` is the
/// destination face's base address plus its mip-level offset.
pub fn write_tiled<Q: GxQueue>(queue: &mut Q, src_addr: PhysicalAddress, dst_addr: PhysicalAddress, size: usize) {
    queue.flush_cache_region(src_addr, size);
    queue.flush_cache_region(dst_addr, size);
    queue.texture_copy(TextureCopyParams { src_addr, dst_addr, size });
    queue.invalidate_cache_region(dst_addr, size);
}

/// Whether a transfer of `width`x`height` pixels is large enough to route
/// through the hardware display-transfer engine instead of the software
/// tiling fallback. Mirrors `GLASS_hwTransferFormat`'s size gate.
pub fn should_use_hardware_tiling(width: u32, height: u32) -> bool {
    width >= 64 && height >= 64
}

/// Mask applied to a physical address's low bits when checking cube-map
/// face co-residency: all six faces must agree above this mask, per
/// spec.md §4.5 ("addresses whose high bits agree (validated on
/// allocation)").
const CUBE_CORESIDENCY_MASK: u32 = !0x3FFFFF;

/// Whether every address in `addrs` shares the same bits above
/// [`CUBE_CORESIDENCY_MASK`] as the first.
fn faces_coresident(addrs: &[PhysicalAddress]) -> bool {
    match addrs.split_first() {
        Some((first, rest)) => rest.iter().all(|a| a & CUBE_CORESIDENCY_MASK == first & CUBE_CORESIDENCY_MASK),
        None => true,
    }
}

/// Outcome of a texture storage (re)allocation attempt, mirroring the
/// original's `TexReallocStatus` tri-state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReallocStatus {
    /// Existing storage already matches the requested size/format; nothing
    /// was reallocated.
    Unchanged,
    /// Storage was freed and reallocated to the new size/format.
    Updated,
    /// Allocation failed; prior storage (if any) is left untouched.
    Failed,
}

/// Total storage size in bytes for a texture with `num_faces` faces,
/// `width`x`height` base level, `mip_levels` total levels (including the
/// base), at `format`.
pub fn texture_storage_size(width: u32, height: u32, format: NativePixelFormat, mip_levels: u32, num_faces: u32) -> usize {
    let per_face = mip_level_offset(width, height, format.bpp(), mip_levels);
    per_face * num_faces as usize
}

/// Attempts to (re)allocate the face storage addresses for a texture,
/// following `GLASS_reallocTexImpl`'s rules:
///
/// - If the requested size/format is unchanged from what `current_size`
///   already describes, returns [`ReallocStatus::Unchanged`] without
///   touching `faces`.
/// - Otherwise frees any existing face addresses via `free`, then
///   allocates a fresh block per face via `alloc`. A cube map's 6 faces
///   must all succeed (co-residency requirement: a cube map sampler reads
///   all six faces via address-bit offsets from face 0, so they must sit
///   in one contiguous, correctly-ordered allocation) — on any failure,
///   every face allocated so far in this call is freed and the function
///   returns [`ReallocStatus::Failed`], leaving `faces` as it was before
///   the call.
pub fn realloc_texture_storage<A>(
    faces: &mut [Option<PhysicalAddress>; 6],
    num_faces: usize,
    new_size: usize,
    current_size: usize,
    mut alloc: A,
    mut free: impl FnMut(PhysicalAddress),
) -> ReallocStatus
where
    A: FnMut(usize) -> Option<PhysicalAddress>,
{
    if new_size == current_size && faces[0].is_some() {
        return ReallocStatus::Unchanged;
    }

    let previous = *faces;

    for addr in previous.iter().take(num_faces).flatten() {
        free(*addr);
    }
    for slot in faces.iter_mut() {
        *slot = None;
    }

    let mut allocated = Vec::with_capacity(num_faces);
    for _ in 0..num_faces {
        match alloc(new_size) {
            Some(addr) => allocated.push(addr),
            None => {
                log::warn!("texture storage allocation failed ({new_size} bytes x{num_faces} faces), rolling back");
                for addr in allocated {
                    free(addr);
                }
                return ReallocStatus::Failed;
            }
        }
    }

    if num_faces == 6 && !faces_coresident(&allocated) {
        allocated.sort_unstable();
        if !faces_coresident(&allocated) {
            log::warn!("cube map faces not co-resident after sort, rolling back allocation");
            for addr in allocated {
                free(addr);
            }
            return ReallocStatus::Failed;
        }
    }

    for (slot, addr) in faces.iter_mut().zip(allocated) {
        *slot = Some(addr);
    }
    ReallocStatus::Updated
}

/// Validates a rectangle `(x, y, w, h)` against an image's dimensions and
/// the hardware's 8-pixel tile alignment requirement for partial
/// reads/writes (`GLASS_tex_write`'s `writeRect`/`readRect` paths require
/// tile-aligned rectangles; unaligned rectangles fall back to the
/// untiled/per-pixel path).
pub fn rect_is_tile_aligned(x: u32, y: u32, w: u32, h: u32) -> bool {
    x % TILE_SIZE == 0 && y % TILE_SIZE == 0 && w % TILE_SIZE == 0 && h % TILE_SIZE == 0
}

/// Validates that a rectangle lies fully within `width`x`height`, as
/// `glTexSubImage2D`/`glCopyTexSubImage2D`-equivalents must before writing.
pub fn rect_in_bounds(x: u32, y: u32, w: u32, h: u32, width: u32, height: u32) -> Result<(), GlError> {
    if x.checked_add(w).is_none_or(|r| r > width) || y.checked_add(h).is_none_or(|r| r > height) {
        return Err(GlError::InvalidValue);
    }
    Ok(())
}

/// Copies a tile-aligned `(x, y, w, h)` sub-rectangle out of a tiled
/// texture face into a linear destination buffer, via the hardware
/// rectangle-copy transfer engine. Grounded on `GLASS_tex_readRect`.
///
/// Returns [`GlError::InvalidValue`] if the rectangle is out of bounds or
/// not tile-aligned.
#[allow(clippy::too_many_arguments)]
pub fn read_rect<Q: GxQueue>(
    queue: &mut Q,
    src_addr: PhysicalAddress,
    tex_width: u32,
    tex_height: u32,
    bytes_per_pixel: u32,
    dst_addr: PhysicalAddress,
    x: u32,
    y: u32,
    w: u32,
    h: u32,
) -> Result<(), GlError> {
    rect_in_bounds(x, y, w, h, tex_width, tex_height)?;
    if !rect_is_tile_aligned(x, y, w, h) {
        return Err(GlError::InvalidValue);
    }
    let src = TextureCopySurface { addr: src_addr, width: tex_width, height: tex_height, bytes_per_pixel, rotated: true };
    let dst = TextureCopySurface { addr: dst_addr, width: w, height: h, bytes_per_pixel, rotated: true };
    let src_rect = TextureCopyRect { x, y, width: w, height: h };
    let dst_rect = TextureCopyRect { x: 0, y: 0, width: w, height: h };
    queue.rect_copy(src, src_rect, dst, dst_rect);
    Ok(())
}

/// Copies a tile-aligned linear source rectangle into a sub-rectangle of a
/// tiled texture face, via the hardware rectangle-copy transfer engine.
/// Grounded on `GLASS_tex_writeRect`.
#[allow(clippy::too_many_arguments)]
pub fn write_rect<Q: GxQueue>(
    queue: &mut Q,
    src_addr: PhysicalAddress,
    dst_addr: PhysicalAddress,
    tex_width: u32,
    tex_height: u32,
    bytes_per_pixel: u32,
    x: u32,
    y: u32,
    w: u32,
    h: u32,
) -> Result<(), GlError> {
    rect_in_bounds(x, y, w, h, tex_width, tex_height)?;
    if !rect_is_tile_aligned(x, y, w, h) {
        return Err(GlError::InvalidValue);
    }
    let src = TextureCopySurface { addr: src_addr, width: w, height: h, bytes_per_pixel, rotated: true };
    let dst = TextureCopySurface { addr: dst_addr, width: tex_width, height: tex_height, bytes_per_pixel, rotated: true };
    let src_rect = TextureCopyRect { x: 0, y: 0, width: w, height: h };
    let dst_rect = TextureCopyRect { x, y, width: w, height: h };
    queue.rect_copy(src, src_rect, dst, dst_rect);
    Ok(())
}

/// Aligns a sub-rectangle outward to the hardware's 8-pixel tile boundary,
/// as `GLASS_tex_readUntiledRect`/`writeUntiledRect` do before issuing the
/// tile-aligned [`read_rect`]/[`write_rect`] call: the origin rounds down,
/// the extent rounds up, independently of the other.
pub fn align_rect_outward(x: u32, y: u32, width: u32, height: u32) -> (u32, u32, u32, u32) {
    let aligned_x = (x / TILE_SIZE) * TILE_SIZE;
    let aligned_y = (y / TILE_SIZE) * TILE_SIZE;
    let aligned_width = width.div_ceil(TILE_SIZE) * TILE_SIZE;
    let aligned_height = height.div_ceil(TILE_SIZE) * TILE_SIZE;
    (aligned_x, aligned_y, aligned_width, aligned_height)
}

/// Copies a `width`x`height` sub-rectangle out of a `stride_width`-wide
/// linear buffer at offset `(offset_x, offset_y)`, one row at a time.
fn extract_subrect(buf: &[u8], stride_width: u32, offset_x: u32, offset_y: u32, width: u32, height: u32, bpp: u32) -> Vec<u8> {
    let bytes = (bpp as usize).div_ceil(8).max(1);
    let line_width = width as usize * bytes;
    let stride = stride_width as usize * bytes;
    let mut out = vec![0u8; line_width * height as usize];
    let mut src = offset_y as usize * stride + offset_x as usize * bytes;
    let mut dst = 0;
    for _ in 0..height {
        out[dst..dst + line_width].copy_from_slice(&buf[src..src + line_width]);
        src += stride;
        dst += line_width;
    }
    out
}

/// Inverse of [`extract_subrect`]: writes `data` into a `width`x`height`
/// sub-rectangle of a `stride_width`-wide linear buffer at offset
/// `(offset_x, offset_y)`, one row at a time.
fn insert_subrect(buf: &mut [u8], stride_width: u32, offset_x: u32, offset_y: u32, width: u32, height: u32, bpp: u32, data: &[u8]) {
    let bytes = (bpp as usize).div_ceil(8).max(1);
    let line_width = width as usize * bytes;
    let stride = stride_width as usize * bytes;
    let mut dst = offset_y as usize * stride + offset_x as usize * bytes;
    let mut src = 0;
    for _ in 0..height {
        buf[dst..dst + line_width].copy_from_slice(&data[src..src + line_width]);
        src += line_width;
        dst += stride;
    }
}

/// Converts an aligned tiled rectangle (as read back by [`read_rect`] into a
/// scratch buffer sized `aligned_width`x`aligned_height`) into the caller's
/// unaligned sub-rectangle, untiling first and then extracting the requested
/// rows. `offset_x`/`offset_y` is the unaligned rectangle's origin relative
/// to the aligned rectangle's origin. Mirrors `GLASS_tex_readUntiledRect`'s
/// untile-then-memcpy tail.
#[allow(clippy::too_many_arguments)]
pub fn untile_rect(
    aligned_tiled: &[u8],
    aligned_width: u32,
    aligned_height: u32,
    offset_x: u32,
    offset_y: u32,
    width: u32,
    height: u32,
    bpp: u32,
) -> Vec<u8> {
    let mut linear = vec![0u8; aligned_tiled.len()];
    sw_tile(aligned_tiled, &mut linear, aligned_width, aligned_height, bpp, false);
    extract_subrect(&linear, aligned_width, offset_x, offset_y, width, height, bpp)
}

/// Inverse of [`untile_rect`]: merges `data` (the caller's unaligned
/// sub-rectangle) into an aligned tiled rectangle already read back from
/// hardware, then re-tiles the result so it can be handed to [`write_rect`].
/// Mirrors `GLASS_tex_writeUntiledRect`.
#[allow(clippy::too_many_arguments)]
pub fn tile_rect(
    existing_aligned_tiled: &[u8],
    aligned_width: u32,
    aligned_height: u32,
    offset_x: u32,
    offset_y: u32,
    width: u32,
    height: u32,
    bpp: u32,
    data: &[u8],
) -> Vec<u8> {
    let mut linear = vec![0u8; existing_aligned_tiled.len()];
    sw_tile(existing_aligned_tiled, &mut linear, aligned_width, aligned_height, bpp, false);
    insert_subrect(&mut linear, aligned_width, offset_x, offset_y, width, height, bpp, data);
    let mut tiled = vec![0u8; linear.len()];
    sw_tile(&linear, &mut tiled, aligned_width, aligned_height, bpp, true);
    tiled
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::libs::graphics::host::mock::{MockGxQueue, RecordedCall};

    #[test]
    fn flip_vertical_reverses_row_order() {
        // 2x2 image, 1 byte per pixel (bpp=8): rows [0,1] and [2,3].
        let mut buf = vec![0u8, 1, 2, 3];
        flip_vertical(&mut buf, 2, 2, 8);
        assert_eq!(buf, vec![2, 3, 0, 1]);
    }

    #[test]
    fn flip_vertical_is_its_own_inverse() {
        let mut buf: Vec<u8> = (0..64).collect();
        let original = buf.clone();
        flip_vertical(&mut buf, 8, 8, 8);
        flip_vertical(&mut buf, 8, 8, 8);
        assert_eq!(buf, original);
    }

    #[test]
    fn write_untiled_flips_then_tiles() {
        let width = 8;
        let height = 8;
        let bpp = 8;
        let src: Vec<u8> = (0..64).collect();
        let tiled = write_untiled(&src, width, height, bpp);

        let mut flipped = src.clone();
        flip_vertical(&mut flipped, width, height, bpp);
        let mut expected = vec![0u8; 64];
        sw_tile(&flipped, &mut expected, width, height, bpp, true);
        assert_eq!(tiled, expected);
    }

    #[test]
    fn write_tiled_flushes_copies_then_invalidates_destination() {
        let mut queue = MockGxQueue::new();
        write_tiled(&mut queue, 0x1000, 0x2000, 64);
        assert_eq!(
            queue.calls,
            vec![
                RecordedCall::FlushCacheRegion { addr: 0x1000, size: 64 },
                RecordedCall::FlushCacheRegion { addr: 0x2000, size: 64 },
                RecordedCall::TextureCopy(TextureCopyParams { src_addr: 0x1000, dst_addr: 0x2000, size: 64 }),
                RecordedCall::InvalidateCacheRegion { addr: 0x2000, size: 64 },
            ]
        );
    }

    #[test]
    fn read_rect_rejects_unaligned_rectangle() {
        let mut queue = MockGxQueue::new();
        let err = read_rect(&mut queue, 0x1000, 64, 64, 4, 0x2000, 1, 0, 8, 8).unwrap_err();
        assert_eq!(err, GlError::InvalidValue);
        assert!(queue.calls.is_empty());
    }

    #[test]
    fn read_rect_rejects_out_of_bounds_rectangle() {
        let mut queue = MockGxQueue::new();
        let err = read_rect(&mut queue, 0x1000, 64, 64, 4, 0x2000, 56, 56, 16, 16).unwrap_err();
        assert_eq!(err, GlError::InvalidValue);
    }

    #[test]
    fn read_rect_issues_a_rect_copy_with_correct_surfaces() {
        let mut queue = MockGxQueue::new();
        read_rect(&mut queue, 0x1000, 64, 64, 4, 0x2000, 8, 16, 16, 16).unwrap();
        assert_eq!(
            queue.calls,
            vec![RecordedCall::RectCopy {
                src: TextureCopySurface { addr: 0x1000, width: 64, height: 64, bytes_per_pixel: 4, rotated: true },
                src_rect: TextureCopyRect { x: 8, y: 16, width: 16, height: 16 },
                dst: TextureCopySurface { addr: 0x2000, width: 16, height: 16, bytes_per_pixel: 4, rotated: true },
                dst_rect: TextureCopyRect { x: 0, y: 0, width: 16, height: 16 },
            }]
        );
    }

    #[test]
    fn write_rect_issues_a_rect_copy_with_correct_surfaces() {
        let mut queue = MockGxQueue::new();
        write_rect(&mut queue, 0x2000, 0x1000, 64, 64, 4, 8, 16, 16, 16).unwrap();
        assert_eq!(
            queue.calls,
            vec![RecordedCall::RectCopy {
                src: TextureCopySurface { addr: 0x2000, width: 16, height: 16, bytes_per_pixel: 4, rotated: true },
                src_rect: TextureCopyRect { x: 0, y: 0, width: 16, height: 16 },
                dst: TextureCopySurface { addr: 0x1000, width: 64, height: 64, bytes_per_pixel: 4, rotated: true },
                dst_rect: TextureCopyRect { x: 8, y: 16, width: 16, height: 16 },
            }]
        );
    }

    #[test]
    fn z_order_table_covers_one_tile_row() {
        assert_eq!(Z_ORDER_TABLE, [0, 1, 4, 5, 16, 17, 20, 21]);
    }

    #[test]
    fn tile_offset_of_origin_is_zero() {
        assert_eq!(tile_offset(0, 0, 64, 32), 0);
    }

    #[test]
    fn tile_offset_second_pixel_in_row_follows_morton_order() {
        // Within a tile, x=1,y=0 should land at Z_ORDER_TABLE[1] = 1.
        let bpp = 32;
        let off = tile_offset(1, 0, 64, bpp);
        assert_eq!(off, (1 * bpp as usize) / 8);
    }

    #[test]
    fn mip_level_zero_has_no_offset() {
        assert_eq!(mip_level_offset(256, 256, 32, 0), 0);
    }

    #[test]
    fn mip_level_offset_matches_closed_form_sum() {
        let (w, h, bpp) = (64u32, 64u32, 32u32);
        let mut expected = 0usize;
        for i in 0..3u32 {
            expected += (bpp as usize * (w >> i) as usize * (h >> i) as usize) / 8;
        }
        assert_eq!(mip_level_offset(w, h, bpp, 3), expected);
    }

    #[test]
    fn sw_tile_roundtrips() {
        let width = 16;
        let height = 16;
        let bpp = 32;
        let size = (width * height * bpp / 8) as usize;
        let src: Vec<u8> = (0..size).map(|i| (i % 251) as u8).collect();
        let mut tiled = vec![0u8; size];
        sw_tile(&src, &mut tiled, width, height, bpp, true);
        let mut untiled = vec![0u8; size];
        sw_tile(&tiled, &mut untiled, width, height, bpp, false);
        assert_eq!(src, untiled);
    }

    #[test]
    fn hardware_tiling_gate_respects_64px_minimum() {
        assert!(!should_use_hardware_tiling(32, 32));
        assert!(should_use_hardware_tiling(64, 64));
        assert!(!should_use_hardware_tiling(128, 32));
    }

    #[test]
    fn realloc_reports_unchanged_when_size_matches() {
        let mut faces = [Some(0x1000u32), None, None, None, None, None];
        let status = realloc_texture_storage(&mut faces, 1, 4096, 4096, |_| Some(0x2000), |_| {});
        assert_eq!(status, ReallocStatus::Unchanged);
        assert_eq!(faces[0], Some(0x1000));
    }

    #[test]
    fn realloc_frees_old_and_allocates_new_on_size_change() {
        let mut faces = [Some(0x1000u32), None, None, None, None, None];
        let mut freed = Vec::new();
        let status = realloc_texture_storage(&mut faces, 1, 8192, 4096, |_| Some(0x2000), |addr| freed.push(addr));
        assert_eq!(status, ReallocStatus::Updated);
        assert_eq!(faces[0], Some(0x2000));
        assert_eq!(freed, vec![0x1000]);
    }

    #[test]
    fn cube_map_realloc_fails_atomically_if_any_face_fails() {
        let mut faces: [Option<PhysicalAddress>; 6] = [Some(0x1000), Some(0x2000), Some(0x3000), Some(0x4000), Some(0x5000), Some(0x6000)];
        let mut call = 0;
        let mut freed = Vec::new();
        let status = realloc_texture_storage(
            &mut faces,
            6,
            16384,
            4096,
            |_| {
                call += 1;
                if call <= 3 {
                    Some(0x9000 + call)
                } else {
                    None
                }
            },
            |addr| freed.push(addr),
        );
        assert_eq!(status, ReallocStatus::Failed);
        assert!(faces.iter().all(|f| f.is_none()));
    }

    #[test]
    fn cube_map_realloc_succeeds_when_faces_share_high_bits() {
        let mut faces: [Option<PhysicalAddress>; 6] = [None; 6];
        let base = 0x0040_0000u32;
        let mut next = 0;
        let status = realloc_texture_storage(
            &mut faces,
            6,
            4096,
            0,
            |_| {
                let addr = base + next * 4096;
                next += 1;
                Some(addr)
            },
            |_| {},
        );
        assert_eq!(status, ReallocStatus::Updated);
        let high = faces[0].unwrap() & CUBE_CORESIDENCY_MASK;
        assert!(faces.iter().all(|f| f.unwrap() & CUBE_CORESIDENCY_MASK == high));
    }

    #[test]
    fn cube_map_realloc_fails_when_faces_straddle_coresidency_mask() {
        let mut faces: [Option<PhysicalAddress>; 6] = [None; 6];
        let mut allocs = vec![0x003F_FFFFu32, 0x0040_0000, 0x0040_1000, 0x0040_2000, 0x0040_3000, 0x0040_4000].into_iter();
        let mut freed = Vec::new();
        let status = realloc_texture_storage(&mut faces, 6, 4096, 0, |_| allocs.next(), |addr| freed.push(addr));
        assert_eq!(status, ReallocStatus::Failed);
        assert!(faces.iter().all(|f| f.is_none()));
        assert_eq!(freed.len(), 6);
    }

    #[test]
    fn rect_bounds_checks_reject_overflow() {
        assert!(rect_in_bounds(0, 0, 64, 64, 64, 64).is_ok());
        assert!(rect_in_bounds(32, 32, 64, 64, 64, 64).is_err());
    }

    #[test]
    fn rect_alignment_requires_multiples_of_tile_size() {
        assert!(rect_is_tile_aligned(8, 8, 16, 16));
        assert!(!rect_is_tile_aligned(3, 0, 16, 16));
    }

    #[test]
    fn align_rect_outward_rounds_origin_down_and_extent_up() {
        assert_eq!(align_rect_outward(3, 10, 5, 20), (0, 8, 8, 24));
        assert_eq!(align_rect_outward(8, 8, 8, 8), (8, 8, 8, 8));
    }

    #[test]
    fn untile_rect_extracts_the_requested_sub_rectangle() {
        let bpp = 8;
        let linear: Vec<u8> = (0..64).collect();
        let mut tiled = vec![0u8; 64];
        sw_tile(&linear, &mut tiled, 8, 8, bpp, true);

        let extracted = untile_rect(&tiled, 8, 8, 2, 3, 3, 2, bpp);
        assert_eq!(extracted, vec![26, 27, 28, 34, 35, 36]);
    }

    #[test]
    fn tile_rect_and_untile_rect_roundtrip_an_inserted_sub_rectangle() {
        let bpp = 8;
        let tiled = vec![0u8; 64];
        let data = vec![9, 9, 9, 9, 9, 9];

        let updated = tile_rect(&tiled, 8, 8, 2, 3, 3, 2, bpp, &data);
        let extracted = untile_rect(&updated, 8, 8, 2, 3, 3, 2, bpp);
        assert_eq!(extracted, data);
    }
}
