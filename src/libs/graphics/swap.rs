//! The swap engine: `glClear`, and presenting one or two contexts'
//! framebuffers to the display.
//!
//! Two independent pieces live here. [`clear`] turns `glClear`'s
//! color/depth/stencil request into one or two hardware memory-fill
//! regions, using whichever of the "early depth" or normal depth path
//! applies. [`swap_buffers`] drives the actual present: bind each context,
//! flush it with `send = true` (unlike a draw's `send = false` flush, a
//! swap's flush also emits any pending early-depth-buffer clear), wait for
//! the GPU to go idle, compute that context's display-transfer parameters,
//! and submit the transfer — observing the rule that when two contexts
//! swap together and only one has VSync enabled, the VSync'd context's
//! transfer goes first so it, not the other, ends up queued right before
//! the VBlank wait.
//!
//! # Design Pattern
//!
//! Ported from `examples/original_source/Source/Base/Context.c`'s
//! `GLASS_context_flush`'s `send` parameter and swap-ordering comment, and
//! from `examples/original_source/Source/Base/GX.c`'s
//! `GLASS_memoryFill`/`GLASS_displayTransfer` call shapes (abstracted here
//! behind [`GxQueue`] since the real GX/GSP driver is out of this crate's
//! scope).

use crate::libs::graphics::context::Context;
use crate::libs::graphics::host::{DisplayTransferParams, FillWidth, GxQueue, MemoryFillRegion, PhysicalAddress, TransferFormat};
use crate::libs::graphics::resources::{ColorAttachment, FramebufferStatus, RenderbufferFormat, ResourceHeap};
use crate::core::error::GlError;

/// One screen's clear request: which buffers to touch and what to clear
/// them to.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClearRequest {
    /// Clear the color buffer to this RGBA value, if set.
    pub color: Option<[f32; 4]>,
    /// Clear the depth buffer to this value (`0.0..=1.0`), if set.
    pub depth: Option<f32>,
    /// Clear the stencil buffer to this value, if set.
    pub stencil: Option<u8>,
}

fn color_fill_value(format: RenderbufferFormat, rgba: [f32; 4]) -> (u32, FillWidth) {
    let r = (rgba[0].clamp(0.0, 1.0) * 255.0) as u32;
    let g = (rgba[1].clamp(0.0, 1.0) * 255.0) as u32;
    let b = (rgba[2].clamp(0.0, 1.0) * 255.0) as u32;
    let a = (rgba[3].clamp(0.0, 1.0) * 255.0) as u32;
    match format {
        RenderbufferFormat::Rgba8 => ((r << 24) | (g << 16) | (b << 8) | a, FillWidth::Bits32),
        RenderbufferFormat::Rgb8 => ((r << 16) | (g << 8) | b, FillWidth::Bits24),
        RenderbufferFormat::Rgb565 => {
            let packed = ((r >> 3) << 11) | ((g >> 2) << 5) | (b >> 3);
            (packed, FillWidth::Bits16)
        }
        RenderbufferFormat::Rgb5A1 => {
            let packed = ((r >> 3) << 11) | ((g >> 3) << 6) | ((b >> 3) << 1) | (a >> 7);
            (packed, FillWidth::Bits16)
        }
        RenderbufferFormat::Rgba4 => {
            let packed = ((r >> 4) << 12) | ((g >> 4) << 8) | ((b >> 4) << 4) | (a >> 4);
            (packed, FillWidth::Bits16)
        }
        RenderbufferFormat::Depth16 | RenderbufferFormat::Depth24 | RenderbufferFormat::Depth24Stencil8 => {
            unreachable!("color_fill_value called with a depth format")
        }
    }
}

fn depth_stencil_fill_value(format: RenderbufferFormat, depth: Option<f32>, stencil: Option<u8>) -> (u32, FillWidth) {
    match format {
        RenderbufferFormat::Depth16 => {
            let d = depth.unwrap_or(1.0).clamp(0.0, 1.0);
            ((d * 65535.0) as u32, FillWidth::Bits16)
        }
        RenderbufferFormat::Depth24 => {
            let d = depth.unwrap_or(1.0).clamp(0.0, 1.0);
            (((d * 16_777_215.0) as u32) & 0xFF_FFFF, FillWidth::Bits24)
        }
        RenderbufferFormat::Depth24Stencil8 => {
            let d = depth.unwrap_or(1.0).clamp(0.0, 1.0);
            let d24 = ((d * 16_777_215.0) as u32) & 0xFF_FFFF;
            let s8 = stencil.unwrap_or(0) as u32;
            ((d24 << 8) | s8, FillWidth::Bits32)
        }
        _ => unreachable!("depth_stencil_fill_value called with a color format"),
    }
}

/// Performs a `glClear`-equivalent on the bound framebuffer: validates the
/// request (clearing stencil without an attached depth/stencil buffer is
/// [`GlError::InvalidOperation`], matching the combined `DEPTH24_STENCIL8`
/// attachment requirement every stencil-capable format here implies),
/// derives the hardware memory-fill pattern for each attachment touched,
/// and submits one or two fills — combined into a single
/// [`GxQueue::memory_fill`] call when both color and depth/stencil are
/// cleared together, since the hardware accepts at most two regions per
/// call and the queue itself handles address-ordering them.
pub fn clear<Q: GxQueue>(heap: &ResourceHeap, ctx: &Context, queue: &mut Q, request: ClearRequest) -> Result<(), GlError> {
    if heap.check_framebuffer_status(ctx.framebuffer) != FramebufferStatus::Complete {
        return Err(GlError::InvalidFramebufferOperation);
    }
    let Some(fb) = ctx.framebuffer.and_then(|h| heap.framebuffers.get(h)) else {
        return Err(GlError::InvalidFramebufferOperation);
    };

    let depth_rb = fb.depth.and_then(|h| heap.renderbuffers.get(h));
    if request.stencil.is_some() {
        let supports_stencil = depth_rb.map(|rb| rb.format == RenderbufferFormat::Depth24Stencil8).unwrap_or(false);
        if !supports_stencil {
            return Err(GlError::InvalidOperation);
        }
    }

    let mut color_region = None;
    if let (Some(rgba), Some(ColorAttachment::Renderbuffer(color_handle))) = (request.color, fb.color) {
        if let Some(color_rb) = heap.renderbuffers.get(color_handle) {
            if let Some(addr) = color_rb.address {
                let (value, width) = color_fill_value(color_rb.format, rgba);
                let size = (color_rb.width * color_rb.height * color_rb.format.bpp() / 8) as usize;
                color_region = Some(MemoryFillRegion { addr, size, value, width });
            }
        }
    }

    let mut depth_region = None;
    if request.depth.is_some() || request.stencil.is_some() {
        if let Some(rb) = depth_rb {
            if let Some(addr) = rb.address {
                let (value, width) = depth_stencil_fill_value(rb.format, request.depth, request.stencil);
                let size = (rb.width * rb.height * rb.format.bpp() / 8) as usize;
                depth_region = Some(MemoryFillRegion { addr, size, value, width });
            }
        }
    }

    if color_region.is_some() || depth_region.is_some() {
        queue.memory_fill(color_region, depth_region);
    }
    Ok(())
}

/// Computes the display-transfer parameters for presenting `ctx`'s bound
/// framebuffer's color attachment to the physical screen buffer at
/// `screen_addr`/`screen_width`/`screen_height`/`screen_format`.
pub fn display_transfer_params_for(
    heap: &ResourceHeap,
    ctx: &Context,
    screen_addr: PhysicalAddress,
    screen_width: u16,
    screen_height: u16,
    screen_format: TransferFormat,
) -> Option<DisplayTransferParams> {
    let fb = ctx.framebuffer.and_then(|h| heap.framebuffers.get(h))?;
    let ColorAttachment::Renderbuffer(color_handle) = fb.color? else { return None };
    let rb = heap.renderbuffers.get(color_handle)?;
    let src_addr = rb.address?;

    let src_format = match rb.format {
        RenderbufferFormat::Rgba8 => TransferFormat::Rgba8,
        RenderbufferFormat::Rgb8 => TransferFormat::Rgb8,
        RenderbufferFormat::Rgb565 => TransferFormat::Rgb565,
        RenderbufferFormat::Rgb5A1 => TransferFormat::Rgb5A1,
        RenderbufferFormat::Rgba4 => TransferFormat::Rgba4,
        _ => return None,
    };

    Some(DisplayTransferParams {
        src_addr,
        src_width: rb.width as u16,
        src_height: rb.height as u16,
        src_format,
        dst_addr: screen_addr,
        dst_width: screen_width,
        dst_height: screen_height,
        dst_format: screen_format,
        vertical_flip: ctx.params.horizontal_flip,
        make_tiled: false,
        scaling: ctx.params.downscale,
    })
}

/// One context's target screen for [`swap_buffers`].
pub struct SwapTarget<'a> {
    /// The context being presented.
    pub ctx: &'a mut Context,
    /// The screen buffer this context's color attachment is transferred to.
    pub screen_addr: PhysicalAddress,
    /// Screen width in pixels.
    pub screen_width: u16,
    /// Screen height in pixels.
    pub screen_height: u16,
    /// Screen pixel format.
    pub screen_format: TransferFormat,
}

/// Presents one or two contexts' framebuffers, in VSync-priority order,
/// then waits for the next VBlank.
///
/// For each target (in the order described below) this: flushes the
/// context with `send = true` into a fresh command list, submits it,
/// blocks until the GPU is idle, computes that context's transfer
/// parameters, and submits the transfer.
///
/// Ordering rule (mirroring the original's two-screen swap): if exactly
/// one of the two targets has `ctx.params.vsync` set, that target's
/// transfer is submitted first, so it is the one immediately followed by
/// the [`GxQueue::wait_vblank`] call. With zero or two VSync'd targets,
/// targets are processed in the order given.
///
/// [`GxQueue::wait_vblank`] is only called at all if at least one target
/// has VSync enabled (spec.md §4.7 step 5); with none enabled, the queue
/// simply isn't asked to wait.
pub fn swap_buffers<Q: GxQueue>(heap: &mut ResourceHeap, queue: &mut Q, mut targets: Vec<SwapTarget<'_>>) {
    if targets.len() == 2 && targets[0].ctx.params.vsync != targets[1].ctx.params.vsync && !targets[0].ctx.params.vsync {
        targets.swap(0, 1);
    }

    let any_vsync = targets.iter().any(|t| t.ctx.params.vsync);

    for target in &mut targets {
        let mut list = crate::libs::graphics::encoder::CommandList::new();
        let attachment_dims = heap.color_attachment_dims(target.ctx.framebuffer);
        let render_width = target.ctx.render_width(attachment_dims.map(|(w, _)| w), target.screen_width as u32);
        target.ctx.flush(heap, &mut list, true, render_width);
        if target.ctx.params.flush_all_linear {
            queue.flush_linear_heap();
        }
        if let Some(words) = list.finalize_and_swap() {
            queue.submit_command_list(words.as_ptr() as PhysicalAddress, words.len(), true);
        }
        queue.wait_idle();

        if let Some(params) = display_transfer_params_for(heap, target.ctx, target.screen_addr, target.screen_width, target.screen_height, target.screen_format) {
            queue.display_transfer(params);
        }
    }

    if any_vsync {
        queue.wait_vblank();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::libs::graphics::host::mock::MockGxQueue;
    use crate::libs::graphics::resources::ColorAttachment;

    fn heap_with_rgba8_framebuffer() -> (ResourceHeap, crate::libs::graphics::resources::FramebufferHandle) {
        let mut heap = ResourceHeap::new();
        let fb = heap.gen_framebuffer();
        let color = heap.gen_renderbuffer();
        let rb = heap.renderbuffers.get_mut(color).unwrap();
        rb.address = Some(0x1000);
        rb.width = 64;
        rb.height = 64;
        rb.format = RenderbufferFormat::Rgba8;
        heap.framebuffers.get_mut(fb).unwrap().color = Some(ColorAttachment::Renderbuffer(color));
        (heap, fb)
    }

    #[test]
    fn clear_without_complete_framebuffer_is_rejected() {
        let heap = ResourceHeap::new();
        let ctx = Context::default();
        let mut queue = MockGxQueue::default();
        let err = clear(&heap, &ctx, &mut queue, ClearRequest { color: Some([0.0; 4]), ..Default::default() }).unwrap_err();
        assert_eq!(err, GlError::InvalidFramebufferOperation);
    }

    #[test]
    fn stencil_clear_without_stencil_capable_depth_buffer_is_invalid_operation() {
        let (heap, fb) = heap_with_rgba8_framebuffer();
        let mut ctx = Context::default();
        ctx.framebuffer = Some(fb);
        let mut queue = MockGxQueue::default();
        let err = clear(&heap, &ctx, &mut queue, ClearRequest { stencil: Some(1), ..Default::default() }).unwrap_err();
        assert_eq!(err, GlError::InvalidOperation);
    }

    #[test]
    fn color_only_clear_submits_one_region() {
        let (heap, fb) = heap_with_rgba8_framebuffer();
        let mut ctx = Context::default();
        ctx.framebuffer = Some(fb);
        let mut queue = MockGxQueue::default();
        clear(&heap, &ctx, &mut queue, ClearRequest { color: Some([1.0, 0.0, 0.0, 1.0]), ..Default::default() }).unwrap();
        assert_eq!(queue.calls.len(), 1);
    }

    #[test]
    fn display_transfer_params_follow_color_attachment_dimensions() {
        let (heap, fb) = heap_with_rgba8_framebuffer();
        let mut ctx = Context::default();
        ctx.framebuffer = Some(fb);
        let params = display_transfer_params_for(&heap, &ctx, 0x8000, 400, 240, TransferFormat::Rgba8).unwrap();
        assert_eq!(params.src_width, 64);
        assert_eq!(params.dst_width, 400);
    }

    #[test]
    fn swap_buffers_prioritizes_vsync_target_first() {
        let (mut heap, fb) = heap_with_rgba8_framebuffer();
        let mut ctx_a = Context::default();
        ctx_a.framebuffer = Some(fb);
        ctx_a.params.vsync = false;
        let mut ctx_b = Context::default();
        ctx_b.framebuffer = Some(fb);
        ctx_b.params.vsync = true;

        let mut queue = MockGxQueue::default();
        let targets = vec![
            SwapTarget { ctx: &mut ctx_a, screen_addr: 0x9000, screen_width: 400, screen_height: 240, screen_format: TransferFormat::Rgba8 },
            SwapTarget { ctx: &mut ctx_b, screen_addr: 0xA000, screen_width: 400, screen_height: 240, screen_format: TransferFormat::Rgba8 },
        ];
        swap_buffers(&mut heap, &mut queue, targets);

        let first_transfer = queue.calls.iter().find(|c| matches!(c, crate::libs::graphics::host::mock::RecordedCall::DisplayTransfer(_)));
        assert!(matches!(first_transfer, Some(crate::libs::graphics::host::mock::RecordedCall::DisplayTransfer(p)) if p.dst_addr == 0xA000));
    }

    #[test]
    fn swap_buffers_skips_vblank_wait_when_nothing_is_vsynced() {
        let (mut heap, fb) = heap_with_rgba8_framebuffer();
        let mut ctx = Context::default();
        ctx.framebuffer = Some(fb);
        ctx.params.vsync = false;

        let mut queue = MockGxQueue::default();
        let targets = vec![SwapTarget { ctx: &mut ctx, screen_addr: 0x9000, screen_width: 400, screen_height: 240, screen_format: TransferFormat::Rgba8 }];
        swap_buffers(&mut heap, &mut queue, targets);

        assert!(!queue.calls.iter().any(|c| matches!(c, crate::libs::graphics::host::mock::RecordedCall::WaitVblank)));
    }

    #[test]
    fn swap_buffers_flushes_linear_heap_when_requested() {
        let (mut heap, fb) = heap_with_rgba8_framebuffer();
        let mut ctx = Context::default();
        ctx.framebuffer = Some(fb);
        ctx.params.flush_all_linear = true;

        let mut queue = MockGxQueue::default();
        let targets = vec![SwapTarget { ctx: &mut ctx, screen_addr: 0x9000, screen_width: 400, screen_height: 240, screen_format: TransferFormat::Rgba8 }];
        swap_buffers(&mut heap, &mut queue, targets);

        assert!(queue.calls.iter().any(|c| matches!(c, crate::libs::graphics::host::mock::RecordedCall::FlushLinearHeap)));
    }
}
