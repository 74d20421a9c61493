#![warn(missing_docs)]
#![warn(rustdoc::all)]
#![allow(rustdoc::private_intra_doc_links)]

//! # pica-gl-core
//!
//! A translation layer that exposes an OpenGL ES 2.0-style C API on top of
//! the PICA200, the fixed-function, register-programmed GPU found in the
//! Nintendo 3DS. This crate is the core: it owns context state tracking,
//! GPU command-list encoding, the resource/object model (buffers, textures,
//! renderbuffers, framebuffers, shaders, programs), the vendor shader
//! binary loader, texture tiling, and the swap/display-transfer engine. The
//! `extern "C"` entry points a GLES client links against are a thin veneer
//! over this crate, out of scope here.
//!
//! ## Key Modules
//!
//! - [`core`]: Foundational building blocks — the GL error taxonomy,
//!   generational handles, and `f32` <-> GPU-native numeric conversions.
//! - [`libs::graphics`]: The context, command encoder, resource model,
//!   shader binary parser, texture manager, and swap engine that together
//!   implement the translation layer.
//! - [`libs::logger`]: Thin structured-logging setup shared by the above.

pub mod core;
/// Low-level libraries: the graphics translation layer and logging setup.
pub mod libs;
