//! Low-level libraries sitting below the public crate surface.

pub mod graphics;
pub mod logger;
