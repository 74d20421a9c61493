//! Draw-call validation and the primitive/index/draw-trigger register
//! encoding a `glDrawArrays`/`glDrawElements`-equivalent emits.
//!
//! A draw call does three things in order: validate the requested
//! primitive mode and (for indexed draws) index type, confirm the bound
//! framebuffer is complete, then flush the context's dirty state with
//! `send = false` (a draw never itself submits a finalized list to the
//! display — [`crate::libs::graphics::swap`] does that) before appending
//! its own primitive-config/index-buffer-config/draw-trigger words. Active
//! attribute upload is [`Context::flush`]'s job (`emit_attributes`), driven
//! by the same flush call this module issues — a draw never encodes
//! attribute registers itself.
//!
//! # Design Pattern
//!
//! Grounded on spec.md §4.6's draw-trigger register sequence and on
//! `examples/original_source/Source/Platform/GPU.c`'s
//! `GLASS_gpu_drawArrays`/`GLASS_gpu_drawElements` (register order,
//! `GPUREG_INDEXBUFFER_CONFIG`'s `physIndices - PHYSICAL_LINEAR_BASE`
//! encoding, the `GPUREG_START_DRAW_FUNC0`/`GPUREG_GEOSTAGE_CONFIG2`
//! brackets around the trigger) and `Source/Common/Rendering.c`'s
//! `isDrawMode`/index-type checks ahead of `GLASS_context_flush(ctx, false)`.

use crate::core::error::GlError;
use crate::libs::graphics::context::{Context, DirtyFlags};
use crate::libs::graphics::encoder::CommandList;
use crate::libs::graphics::host::PhysicalAddress;
use crate::libs::graphics::resources::{FramebufferStatus, ResourceHeap};

/// Physical base address of the linear heap, subtracted from a buffer's
/// physical address before it is written into a register that only has
/// room for an offset into linear memory (e.g. `GPUREG_INDEXBUFFER_CONFIG`).
/// Grounded on `examples/original_source/Source/GPU.c`'s
/// `PHYSICAL_LINEAR_BASE`.
const PHYSICAL_LINEAR_BASE: u32 = 0x1800_0000;

/// `GPUREG_PRIMITIVE_CONFIG`: selects the primitive topology a following
/// draw trigger assembles vertices into.
const REG_PRIMITIVE_CONFIG: u32 = 0x025E;
/// `GPUREG_INDEXBUFFER_CONFIG`: index-buffer base address (relative to
/// [`PHYSICAL_LINEAR_BASE`]) and element-width bit, or the
/// no-index-buffer sentinel for `glDrawArrays`.
const REG_INDEXBUFFER_CONFIG: u32 = 0x0227;
/// `GPUREG_NUMVERTICES`: vertex count for the following draw trigger.
const REG_NUMVERTICES: u32 = 0x0228;
/// `GPUREG_GEOSTAGE_CONFIG2`: geometry-stage enable bracket around a draw
/// trigger.
const REG_GEOSTAGE_CONFIG2: u32 = 0x0229;
/// `GPUREG_VERTEX_OFFSET`: first-vertex offset for `glDrawArrays`-style
/// draws (always 0 for indexed draws, per the original's
/// `GLASS_gpu_drawElements`).
const REG_VERTEX_OFFSET: u32 = 0x022A;
/// `GPUREG_START_DRAW_FUNC0`: bracketed 0-then-1 around the trigger write
/// itself.
const REG_START_DRAW_FUNC0: u32 = 0x022B;
/// `GPUREG_RESTART_PRIMITIVE`: forces the primitive assembler to restart
/// before this draw, so it doesn't stitch a strip/fan onto the previous
/// draw's trailing vertices.
const REG_RESTART_PRIMITIVE: u32 = 0x022C;
/// `GPUREG_DRAWARRAYS`: non-indexed draw trigger.
const REG_DRAWARRAYS: u32 = 0x022E;
/// `GPUREG_DRAWELEMENTS`: indexed draw trigger.
const REG_DRAWELEMENTS: u32 = 0x022F;
/// `GPUREG_VTX_FUNC`: kicks the vertex shader's output FIFO after the
/// trigger has been issued.
const REG_VTX_FUNC: u32 = 0x0230;

/// Primitive topology a caller may request for a draw call. This mirrors
/// the full set of primitive modes GL ES exposes, not just the ones this
/// hardware can actually draw — [`validate_draw_args`] is what narrows it
/// down to spec.md §4.6 step 1's `{triangles, triangle-strip, triangle-fan,
/// geometry-primitive}`, the same way `isDrawMode` does in
/// `examples/original_source/Source/Common/Rendering.c`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawMode {
    /// Independent triangles.
    Triangles,
    /// A connected triangle strip.
    TriangleStrip,
    /// A triangle fan.
    TriangleFan,
    /// `GL_GEOMETRY_PRIMITIVE_PICA`: primitives assembled and emitted by a
    /// geometry shader rather than the fixed triangle/strip/fan rasterizer
    /// input.
    GeometryPrimitive,
    /// Independent line segments. Not drawable by this hardware; rejected
    /// by [`validate_draw_args`].
    Lines,
    /// A connected line strip. Not drawable by this hardware; rejected by
    /// [`validate_draw_args`].
    LineStrip,
    /// A closed line loop. Not drawable by this hardware; rejected by
    /// [`validate_draw_args`].
    LineLoop,
    /// Independent points. Not drawable by this hardware; rejected by
    /// [`validate_draw_args`].
    Points,
}

impl DrawMode {
    /// Hardware primitive-config encoding for this mode, per
    /// `examples/original_source/Source/Platform/GPUDefs.h`'s
    /// `PRIMITIVE_TRIANGLES`/`PRIMITIVE_TRIANGLE_STRIP`/
    /// `PRIMITIVE_TRIANGLE_FAN`/`PRIMITIVE_GEOMETRY` values. Only called
    /// once [`validate_draw_args`] has confirmed `self` is one of the four
    /// hardware-drawable modes.
    const fn register_value(self) -> u32 {
        match self {
            DrawMode::Triangles => 0,
            DrawMode::TriangleStrip => 1,
            DrawMode::TriangleFan => 2,
            DrawMode::GeometryPrimitive => 3,
            DrawMode::Lines | DrawMode::LineStrip | DrawMode::LineLoop | DrawMode::Points => {
                unreachable!("validate_draw_args rejects non-hardware draw modes before this is called")
            }
        }
    }

    /// Whether this hardware can draw `self` directly, per spec.md §4.6
    /// step 1's mode set.
    const fn is_hardware_drawable(self) -> bool {
        matches!(self, DrawMode::Triangles | DrawMode::TriangleStrip | DrawMode::TriangleFan | DrawMode::GeometryPrimitive)
    }
}

/// Index buffer element type for `glDrawElements`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexType {
    /// 8-bit unsigned indices.
    U8,
    /// 16-bit unsigned indices.
    U16,
}

impl IndexType {
    /// Size in bytes of one index.
    pub const fn size(self) -> usize {
        match self {
            IndexType::U8 => 1,
            IndexType::U16 => 2,
        }
    }
}

/// Validates `mode` and, for indexed draws, `index_type`, per spec.md §4.6
/// step 1, mirroring `isDrawMode` in
/// `examples/original_source/Source/Common/Rendering.c`: a mode this
/// hardware cannot draw is [`GlError::InvalidEnum`], a negative count is
/// [`GlError::InvalidValue`]. `index_type` is accepted for symmetry with
/// the spec's step-1 wording, but [`IndexType`] is already closed to the
/// two element widths this hardware supports, so there is no invalid
/// `index_type` left to reject once the caller can only construct one of
/// those two variants.
pub fn validate_draw_args(count: i32, mode: DrawMode, _index_type: Option<IndexType>) -> Result<u32, GlError> {
    if !mode.is_hardware_drawable() {
        return Err(GlError::InvalidEnum);
    }
    if count < 0 {
        return Err(GlError::InvalidValue);
    }
    Ok(count as u32)
}

/// Runs a draw call: validates arguments, checks framebuffer completeness,
/// flushes dirty context state with `send = false`, then appends the
/// primitive-config/index-buffer-config/draw-trigger words and marks the
/// context's draw state dirty so the next flush emits the
/// framebuffer-flush/invalidate pair.
///
/// `indices` is `Some((address, index_type))` for `glDrawElements`-style
/// calls, `None` for `glDrawArrays`-style calls. `fallback_screen_width` is
/// the physical screen width used for the viewport/scissor x-mirror when no
/// framebuffer is bound (see [`Context::render_width`]).
pub fn draw(
    ctx: &mut Context,
    heap: &mut ResourceHeap,
    list: &mut CommandList,
    mode: DrawMode,
    first: u32,
    count: i32,
    indices: Option<(PhysicalAddress, IndexType)>,
    fallback_screen_width: u32,
) -> Result<(), GlError> {
    let count = validate_draw_args(count, mode, indices.map(|(_, index_type)| index_type))?;
    if count == 0 {
        return Ok(());
    }

    if heap.check_framebuffer_status(ctx.framebuffer) != FramebufferStatus::Complete {
        return Err(GlError::InvalidFramebufferOperation);
    }

    let attachment_dims = heap.color_attachment_dims(ctx.framebuffer);
    let render_width = ctx.render_width(attachment_dims.map(|(w, _)| w), fallback_screen_width);
    ctx.flush(heap, list, false, render_width);

    emit_primitive_config(list, mode);
    emit_draw_trigger(list, first, count, indices);
    ctx.mark_dirty(DirtyFlags::DRAW);

    Ok(())
}

fn emit_primitive_config(list: &mut CommandList, mode: DrawMode) {
    list.write(REG_PRIMITIVE_CONFIG, mode.register_value());
}

/// Encodes `GPUREG_INDEXBUFFER_CONFIG` as a single word: the index
/// buffer's address relative to [`PHYSICAL_LINEAR_BASE`] OR'd with the
/// element-width bit, or `0x8000_0000` (high bit set, zero base) when
/// there is no index buffer at all — the `glDrawArrays` case, per
/// `examples/original_source/Source/GPU.c`'s `GLASS_gpu_drawArrays`.
fn emit_index_buffer_config(list: &mut CommandList, indices: Option<(PhysicalAddress, IndexType)>) {
    let word = match indices {
        Some((addr, index_type)) => {
            let type_bit = match index_type {
                IndexType::U8 => 0,
                IndexType::U16 => 1 << 31,
            };
            addr.wrapping_sub(PHYSICAL_LINEAR_BASE) | type_bit
        }
        None => 0x8000_0000,
    };
    list.write(REG_INDEXBUFFER_CONFIG, word);
}

/// Emits spec.md §4.6 step 4's full draw-trigger sequence: primitive
/// restart, index-buffer-config, vertex count/offset, a geostage-enable
/// bracket around a start-draw=0/1 bracket around the actual
/// `DRAWARRAYS`/`DRAWELEMENTS` trigger, and the trailing vertex-function
/// kick. Grounded word-for-word on
/// `examples/original_source/Source/GPU.c`'s `GLASS_gpu_drawArrays`/
/// `GLASS_gpu_drawElements`.
fn emit_draw_trigger(list: &mut CommandList, first: u32, count: u32, indices: Option<(PhysicalAddress, IndexType)>) {
    list.write(REG_RESTART_PRIMITIVE, 1);
    emit_index_buffer_config(list, indices);
    list.write(REG_NUMVERTICES, count);
    list.write(REG_VERTEX_OFFSET, if indices.is_some() { 0 } else { first });

    list.write_masked(REG_GEOSTAGE_CONFIG2, 1, 0x1);
    list.write_masked(REG_START_DRAW_FUNC0, 0, 0x1);
    let trigger_reg = if indices.is_some() { REG_DRAWELEMENTS } else { REG_DRAWARRAYS };
    list.write(trigger_reg, 1);
    list.write_masked(REG_START_DRAW_FUNC0, 1, 0x1);
    list.write_masked(REG_GEOSTAGE_CONFIG2, 0, 0x1);

    list.write(REG_VTX_FUNC, 1);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::libs::graphics::resources::{ColorAttachment, ResourceHeap};

    fn complete_heap() -> (ResourceHeap, crate::libs::graphics::resources::FramebufferHandle) {
        let mut heap = ResourceHeap::new();
        let fb = heap.gen_framebuffer();
        let color = heap.gen_renderbuffer();
        heap.renderbuffers.get_mut(color).unwrap().address = Some(0x1000);
        heap.renderbuffers.get_mut(color).unwrap().width = 256;
        heap.renderbuffers.get_mut(color).unwrap().height = 256;
        heap.framebuffers.get_mut(fb).unwrap().color = Some(ColorAttachment::Renderbuffer(color));
        (heap, fb)
    }

    /// Decodes a run of single-parameter `write`/`write_masked` commands
    /// (value word, then header word — the shape every word emitted by
    /// [`emit_draw_trigger`] takes) into `(register, mask, value)` triples.
    fn decode_single_writes(words: &[u32]) -> Vec<(u32, u32, u32)> {
        words
            .chunks_exact(2)
            .map(|pair| {
                let (value, header) = (pair[0], pair[1]);
                (header & 0xFFFF, (header >> 16) & 0xF, value)
            })
            .collect()
    }

    /// All values written to `reg`, in emission order.
    fn writes_to(cmds: &[(u32, u32, u32)], reg: u32) -> Vec<(u32, u32)> {
        cmds.iter().filter(|(r, _, _)| *r == reg).map(|(_, mask, value)| (*mask, *value)).collect()
    }

    #[test]
    fn negative_count_is_invalid_value() {
        assert_eq!(validate_draw_args(-1, DrawMode::Triangles, None), Err(GlError::InvalidValue));
    }

    #[test]
    fn non_hardware_mode_is_invalid_enum() {
        assert_eq!(validate_draw_args(3, DrawMode::Points, None), Err(GlError::InvalidEnum));
        assert_eq!(validate_draw_args(3, DrawMode::Lines, None), Err(GlError::InvalidEnum));
        assert_eq!(validate_draw_args(3, DrawMode::LineStrip, None), Err(GlError::InvalidEnum));
        assert_eq!(validate_draw_args(3, DrawMode::LineLoop, None), Err(GlError::InvalidEnum));
    }

    #[test]
    fn hardware_modes_are_accepted() {
        assert_eq!(validate_draw_args(3, DrawMode::Triangles, None), Ok(3));
        assert_eq!(validate_draw_args(3, DrawMode::TriangleStrip, None), Ok(3));
        assert_eq!(validate_draw_args(3, DrawMode::TriangleFan, None), Ok(3));
        assert_eq!(validate_draw_args(3, DrawMode::GeometryPrimitive, None), Ok(3));
    }

    #[test]
    fn zero_count_is_a_noop_draw() {
        let mut ctx = Context::new();
        let (mut heap, fb) = complete_heap();
        ctx.framebuffer = Some(fb);
        let mut list = CommandList::new();
        ctx.flush(&mut heap, &mut list, true, 400);
        let before = list.len();
        draw(&mut ctx, &mut heap, &mut list, DrawMode::Triangles, 0, 0, None, 400).unwrap();
        assert_eq!(list.len(), before);
    }

    #[test]
    fn draw_without_complete_framebuffer_is_rejected() {
        let mut ctx = Context::new();
        let mut heap = ResourceHeap::new();
        let mut list = CommandList::new();
        let err = draw(&mut ctx, &mut heap, &mut list, DrawMode::Triangles, 0, 3, None, 400).unwrap_err();
        assert_eq!(err, GlError::InvalidFramebufferOperation);
    }

    #[test]
    fn successful_draw_emits_full_trigger_sequence_for_drawarrays() {
        let mut ctx = Context::new();
        let (mut heap, fb) = complete_heap();
        ctx.framebuffer = Some(fb);
        let mut list = CommandList::new();
        ctx.flush(&mut heap, &mut list, true, 400);
        let before = list.len();

        draw(&mut ctx, &mut heap, &mut list, DrawMode::Triangles, 2, 3, None, 400).unwrap();

        let cmds = decode_single_writes(&list_tail(&mut list, before));

        assert_eq!(writes_to(&cmds, REG_RESTART_PRIMITIVE), vec![(0xF, 1)]);
        assert_eq!(writes_to(&cmds, REG_INDEXBUFFER_CONFIG), vec![(0xF, 0x8000_0000)]);
        assert_eq!(writes_to(&cmds, REG_NUMVERTICES), vec![(0xF, 3)]);
        assert_eq!(writes_to(&cmds, REG_VERTEX_OFFSET), vec![(0xF, 2)]);
        assert_eq!(writes_to(&cmds, REG_GEOSTAGE_CONFIG2), vec![(0x1, 1), (0x1, 0)]);
        assert_eq!(writes_to(&cmds, REG_START_DRAW_FUNC0), vec![(0x1, 0), (0x1, 1)]);
        assert_eq!(writes_to(&cmds, REG_DRAWARRAYS), vec![(0xF, 1)]);
        assert!(writes_to(&cmds, REG_DRAWELEMENTS).is_empty());
        assert_eq!(writes_to(&cmds, REG_VTX_FUNC), vec![(0xF, 1)]);

        // start-draw=0 must precede the trigger, which must precede start-draw=1.
        let start_draw_idx: Vec<usize> = cmds.iter().enumerate().filter(|(_, (r, _, _))| *r == REG_START_DRAW_FUNC0).map(|(i, _)| i).collect();
        let trigger_idx = cmds.iter().position(|(r, _, _)| *r == REG_DRAWARRAYS).unwrap();
        assert!(start_draw_idx[0] < trigger_idx);
        assert!(trigger_idx < start_draw_idx[1]);
    }

    #[test]
    fn indexed_draw_emits_drawelements_with_combined_index_buffer_word() {
        let mut ctx = Context::new();
        let (mut heap, fb) = complete_heap();
        ctx.framebuffer = Some(fb);
        let mut list = CommandList::new();
        ctx.flush(&mut heap, &mut list, true, 400);
        let before = list.len();

        draw(&mut ctx, &mut heap, &mut list, DrawMode::Triangles, 0, 6, Some((0x1800_2000, IndexType::U16)), 400).unwrap();

        let cmds = decode_single_writes(&list_tail(&mut list, before));

        assert_eq!(writes_to(&cmds, REG_INDEXBUFFER_CONFIG), vec![(0xF, 0x8000_2000)]);
        assert_eq!(writes_to(&cmds, REG_NUMVERTICES), vec![(0xF, 6)]);
        assert_eq!(writes_to(&cmds, REG_VERTEX_OFFSET), vec![(0xF, 0)]);
        assert_eq!(writes_to(&cmds, REG_DRAWELEMENTS), vec![(0xF, 1)]);
        assert!(writes_to(&cmds, REG_DRAWARRAYS).is_empty());
    }

    #[test]
    fn successful_draw_marks_draw_dirty_for_next_flush() {
        let mut ctx = Context::new();
        let (mut heap, fb) = complete_heap();
        ctx.framebuffer = Some(fb);
        let mut list = CommandList::new();
        ctx.flush(&mut heap, &mut list, true, 400);

        draw(&mut ctx, &mut heap, &mut list, DrawMode::Triangles, 0, 3, None, 400).unwrap();

        assert!(ctx.dirty_flags().contains(DirtyFlags::DRAW));
    }

    /// Drains the list to get at the raw words, keeping only those emitted
    /// after `skip` (i.e. since the last checkpoint), then restores the
    /// list to its drained state so subsequent calls in the same test see
    /// a consistent (empty) buffer.
    fn list_tail(list: &mut CommandList, skip: usize) -> Vec<u32> {
        let all = list.finalize_and_swap().unwrap_or_default();
        all.into_iter().skip(skip).collect()
    }
}
