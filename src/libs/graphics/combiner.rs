//! Fixed-function texture combiner stage state.
//!
//! The PICA200 has no programmable fragment shader stage for texture
//! blending: instead, up to six combiner stages each read two or three
//! sources (texture samples, the primary/secondary vertex color, a
//! constant, or the previous stage's result), apply a per-channel operand
//! (take as-is, or one-minus), and combine them with one of a fixed set of
//! functions. This module holds that per-stage state; [`crate::libs::graphics::context`]
//! owns six of them and marks its `COMBINERS` dirty flag when any changes.
//!
//! # Design Pattern
//!
//! The enum shapes mirror `examples/original_source/Source/Base/Context.h`'s
//! default combiner state (`GLASS_context_initCommon` sets every stage's
//! function to `GL_REPLACE` and every source to `GL_PREVIOUS`/`GL_TEXTURE0`
//! depending on stage index) and `examples/original_source/Source/Common/Combiners.c`'s
//! source/operand/function enums, renamed from the GL constant names to
//! plain Rust enum variants the way [`crate::core::error::GlError`] does
//! for the error taxonomy.

/// Where a combiner stage reads one of its up-to-three inputs from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CombinerSource {
    /// The primary fragment color (vertex color or lighting result).
    PrimaryColor,
    /// The secondary (specular) fragment color.
    SecondaryColor,
    /// Texture unit 0's sample.
    Texture0,
    /// Texture unit 1's sample.
    Texture1,
    /// Texture unit 2's sample.
    Texture2,
    /// A per-stage constant color.
    Constant,
    /// The previous stage's output (stage 0 reads this as
    /// [`CombinerSource::PrimaryColor`] instead, since there is no
    /// previous stage).
    Previous,
    /// The previous stage's *buffer* output — a separate accumulator some
    /// stages can opt into instead of chaining directly.
    PreviousBuffer,
}

/// Per-channel operand applied to a combiner source before it reaches the
/// combining function.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CombinerOperand {
    /// Use the source's color channels unmodified.
    SrcColor,
    /// `1 - color`.
    OneMinusSrcColor,
    /// Use the source's alpha channel, broadcast to all channels.
    SrcAlpha,
    /// `1 - alpha`, broadcast.
    OneMinusSrcAlpha,
}

/// The function combining a stage's (up to three) operand-adjusted
/// sources into its output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CombinerFunction {
    /// Passes the first source through unchanged.
    Replace,
    /// `src0 * src1`.
    Modulate,
    /// `src0 + src1`.
    Add,
    /// `src0 + src1 - 0.5`.
    AddSigned,
    /// Linear interpolation between `src0` and `src1`, weighted by `src2`.
    Interpolate,
    /// `src0 - src1`.
    Subtract,
    /// Per-component RGB dot product, replicated across RGB.
    Dot3Rgb,
    /// Per-component RGB dot product, replicated across RGBA.
    Dot3Rgba,
    /// `src0 * src1 + src2`.
    MultAdd,
    /// `(src0 + src1) * src2`.
    AddMult,
}

/// The fixed output scale a combiner stage applies after its function:
/// the PICA200 supports 1x, 2x, or 4x.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CombinerScale {
    /// No scaling.
    X1,
    /// Double the result.
    X2,
    /// Quadruple the result.
    X4,
}

impl CombinerScale {
    /// The register-encoded scale exponent (`0`, `1`, or `2`), matching
    /// the hardware's `GPU_TEVSCALE` field.
    pub const fn exponent(self) -> u32 {
        match self {
            CombinerScale::X1 => 0,
            CombinerScale::X2 => 1,
            CombinerScale::X4 => 2,
        }
    }
}

/// One texture combiner stage's full configuration.
#[derive(Debug, Clone, Copy)]
pub struct CombinerStage {
    /// RGB channel sources (src0, src1, src2).
    pub rgb_sources: [CombinerSource; 3],
    /// Alpha channel sources.
    pub alpha_sources: [CombinerSource; 3],
    /// RGB channel operands.
    pub rgb_operands: [CombinerOperand; 3],
    /// Alpha channel operands.
    pub alpha_operands: [CombinerOperand; 3],
    /// RGB combining function.
    pub rgb_function: CombinerFunction,
    /// Alpha combining function.
    pub alpha_function: CombinerFunction,
    /// Constant color for this stage (used when a source is
    /// [`CombinerSource::Constant`]).
    pub constant_color: [f32; 4],
    /// RGB output scale.
    pub rgb_scale: CombinerScale,
    /// Alpha output scale.
    pub alpha_scale: CombinerScale,
}

impl CombinerStage {
    /// The power-on-reset default a fresh context initializes every
    /// combiner stage to: `GL_REPLACE` reading [`CombinerSource::Previous`]
    /// (stage 0 effectively reads the primary color, since "previous" is
    /// defined as the primary color entering stage 0), unity scale, and an
    /// opaque-black constant — matching `GLASS_context_initCommon`.
    pub const fn default_stage() -> Self {
        Self {
            rgb_sources: [CombinerSource::Previous, CombinerSource::Previous, CombinerSource::Previous],
            alpha_sources: [CombinerSource::Previous, CombinerSource::Previous, CombinerSource::Previous],
            rgb_operands: [CombinerOperand::SrcColor, CombinerOperand::SrcColor, CombinerOperand::SrcColor],
            alpha_operands: [CombinerOperand::SrcAlpha, CombinerOperand::SrcAlpha, CombinerOperand::SrcAlpha],
            rgb_function: CombinerFunction::Replace,
            alpha_function: CombinerFunction::Replace,
            constant_color: [0.0, 0.0, 0.0, 1.0],
            rgb_scale: CombinerScale::X1,
            alpha_scale: CombinerScale::X1,
        }
    }

    /// Number of sources this stage's function actually reads (1 for
    /// `Replace`, 2 for most functions, 3 for `Interpolate`/`MultAdd`/
    /// `AddMult`), used when encoding only the registers a stage needs.
    pub const fn active_source_count(function: CombinerFunction) -> usize {
        match function {
            CombinerFunction::Replace => 1,
            CombinerFunction::Interpolate | CombinerFunction::MultAdd | CombinerFunction::AddMult => 3,
            _ => 2,
        }
    }
}

impl Default for CombinerStage {
    fn default() -> Self {
        Self::default_stage()
    }
}

/// Number of combiner stages the PICA200 exposes.
pub const NUM_COMBINER_STAGES: usize = 6;
