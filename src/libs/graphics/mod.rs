//! The PICA200 translation layer.
//!
//! This is the engine room of the crate: a GL ES 2.0-shaped context sitting
//! on top of a register-programmed, fixed-function GPU. Nothing here talks
//! to real hardware — [`host`] is the trait boundary a platform crate
//! implements to actually submit command lists and run display transfers.
//!
//! - [`host`]: opaque collaborators (GX queue, linear/VRAM allocators,
//!   display transfer engine) this crate treats as an external dependency.
//! - [`encoder`]: the GPU command-list encoder — packs register writes into
//!   the word stream the hardware consumes.
//! - [`resources`]: the handle-based object model (buffers, renderbuffers,
//!   framebuffers, textures, shaders, programs).
//! - [`shader_binary`]: the DVLB/DVLP/DVLE vendor shader binary loader.
//! - [`texture_manager`]: tiling, face sizing, and pixel format tables.
//! - [`context`]: the dirty-state engine tying everything together.
//! - [`draw`]: draw-call validation and attribute upload.
//! - [`swap`]: the swap / display-transfer engine.
//! - [`combiner`]: the fixed-function texture combiner stages.

pub mod combiner;
pub mod context;
pub mod draw;
pub mod encoder;
pub mod host;
pub mod resources;
pub mod shader_binary;
pub mod swap;
pub mod texture_manager;
