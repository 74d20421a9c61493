//! Foundational infrastructure shared across the translation layer.
//!
//! - **Error handling**: the GL error taxonomy, the context's sticky error
//!   slot, and the shader binary parser's structural error type.
//! - **Handles**: type-safe, generation-counted references used in place of
//!   raw GL object names.
//! - **Math**: conversions between `f32` and the GPU's native float/fixed
//!   encodings (f24, f31, 1.4.8 fixed-point) and the packed vector formats
//!   used by uniform and attribute registers.

pub mod error;
pub mod handle;
pub mod math;
