//! GL error taxonomy and the context's first-error-wins error slot.
//!
//! The PICA200 translation layer mirrors OpenGL ES 2.0's error model: a
//! context holds a single "sticky" error value, set by the first failing
//! call since the value was last read, and cleared back to [`GlError::NoError`]
//! on read. This module provides the error enum, its GL enum-value mapping,
//! and the `Cell`-based slot a [`crate::context::Context`] owns.
//!
//! # Example
//!
//! ```
//! use pica_gl::core::error::{ErrorSlot, GlError};
//!
//! let slot = ErrorSlot::new();
//! slot.set(GlError::InvalidValue);
//! slot.set(GlError::InvalidEnum); // ignored: first error wins
//! assert_eq!(slot.take(), GlError::InvalidValue);
//! assert_eq!(slot.take(), GlError::NoError);
//! ```

use std::cell::Cell;

/// GL enum value for `GL_NO_ERROR`.
pub const GL_NO_ERROR: u32 = 0x0000;
/// GL enum value for `GL_INVALID_ENUM`.
pub const GL_INVALID_ENUM: u32 = 0x0500;
/// GL enum value for `GL_INVALID_VALUE`.
pub const GL_INVALID_VALUE: u32 = 0x0501;
/// GL enum value for `GL_INVALID_OPERATION`.
pub const GL_INVALID_OPERATION: u32 = 0x0502;
/// GL enum value for `GL_OUT_OF_MEMORY`.
pub const GL_OUT_OF_MEMORY: u32 = 0x0505;
/// GL enum value for `GL_INVALID_FRAMEBUFFER_OPERATION`.
pub const GL_INVALID_FRAMEBUFFER_OPERATION: u32 = 0x0506;

/// An error recorded against a context, following the GL ES 2.0 taxonomy.
///
/// Every GL-level operation that can fail reports exactly one of these. The
/// variants carry no payload, matching the real `glGetError` contract: the
/// caller gets the category, not a message, and diagnostic detail (if any)
/// goes to the `log` facade instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GlError {
    /// No error has been recorded since the last `take()`.
    NoError,
    /// An unacceptable enum value was passed.
    InvalidEnum,
    /// A numeric argument was out of range (e.g. a negative size).
    InvalidValue,
    /// The operation is not allowed in the current state (e.g. drawing
    /// without a complete framebuffer, or deleting a bound object's name
    /// while a different rule requires it stay live).
    InvalidOperation,
    /// The currently bound framebuffer is not complete.
    InvalidFramebufferOperation,
    /// There is not enough memory to complete the operation; the resulting
    /// engine state is undefined until the object in question is recreated.
    OutOfMemory,
}

impl GlError {
    /// Returns the standard GL enum value for this error, as `glGetError`
    /// would return it to a C caller.
    pub const fn error_code(self) -> u32 {
        match self {
            GlError::NoError => GL_NO_ERROR,
            GlError::InvalidEnum => GL_INVALID_ENUM,
            GlError::InvalidValue => GL_INVALID_VALUE,
            GlError::InvalidOperation => GL_INVALID_OPERATION,
            GlError::InvalidFramebufferOperation => GL_INVALID_FRAMEBUFFER_OPERATION,
            GlError::OutOfMemory => GL_OUT_OF_MEMORY,
        }
    }

    /// Returns a short category name, used in [`std::fmt::Display`].
    pub const fn category(self) -> &'static str {
        match self {
            GlError::NoError => "NoError",
            GlError::InvalidEnum => "InvalidEnum",
            GlError::InvalidValue => "InvalidValue",
            GlError::InvalidOperation => "InvalidOperation",
            GlError::InvalidFramebufferOperation => "InvalidFramebufferOperation",
            GlError::OutOfMemory => "OutOfMemory",
        }
    }

    /// Returns a one-line human-readable explanation of the error.
    pub const fn message(self) -> &'static str {
        match self {
            GlError::NoError => "no error has been recorded",
            GlError::InvalidEnum => "an unacceptable enum value was specified",
            GlError::InvalidValue => "a numeric argument is out of range",
            GlError::InvalidOperation => "the operation is not allowed in the current state",
            GlError::InvalidFramebufferOperation => {
                "the currently bound framebuffer is not complete"
            }
            GlError::OutOfMemory => "there is not enough memory to execute the command",
        }
    }
}

impl Default for GlError {
    fn default() -> Self {
        GlError::NoError
    }
}

impl std::fmt::Display for GlError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[GL 0x{:04X}] {}: {}", self.error_code(), self.category(), self.message())
    }
}

impl std::error::Error for GlError {}

/// The first-error-wins slot a context exposes through `glGetError`.
///
/// GL ES 2.0 requires that once an error is recorded, it stays put until
/// read: subsequent failures are dropped on the floor rather than
/// overwriting it. `take()` implements the read-and-reset semantics of
/// `glGetError` itself.
#[derive(Debug)]
pub struct ErrorSlot(Cell<GlError>);

impl ErrorSlot {
    /// Creates a new, empty error slot.
    pub const fn new() -> Self {
        Self(Cell::new(GlError::NoError))
    }

    /// Records `error`, unless a prior error is already pending.
    pub fn set(&self, error: GlError) {
        if self.0.get() == GlError::NoError {
            self.0.set(error);
        }
    }

    /// Returns the pending error and resets the slot to [`GlError::NoError`].
    pub fn take(&self) -> GlError {
        self.0.replace(GlError::NoError)
    }
}

impl Default for ErrorSlot {
    fn default() -> Self {
        Self::new()
    }
}

/// Structural parse failures from the DVLB/DVLP/DVLE shader binary loader.
///
/// Kept separate from [`GlError`] because these carry the detail that makes
/// a rejected shader binary debuggable; callers convert a `ShaderBinaryError`
/// into a [`GlError`] (almost always [`GlError::InvalidOperation`]) at the
/// point they report it back through the GL error slot.
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum ShaderBinaryError {
    /// A section's magic bytes didn't match what was expected.
    #[error("bad magic for {section}: expected {expected:?}, found {found:?}")]
    BadMagic {
        /// Name of the section being parsed (`"DVLB"`, `"DVLP"`, `"DVLE"`).
        section: &'static str,
        /// The magic bytes that were expected.
        expected: [u8; 4],
        /// The magic bytes actually present.
        found: [u8; 4],
    },

    /// The binary is shorter than the section's minimum size.
    #[error("{section} section truncated: need at least {min_size} bytes, got {actual}")]
    Truncated {
        /// Name of the section being parsed.
        section: &'static str,
        /// Minimum size required for this section.
        min_size: usize,
        /// Actual number of bytes available.
        actual: usize,
    },

    /// A table offset or count would read past the end of the binary.
    #[error("{table} table in {section} overruns buffer: offset {offset}, count {count}")]
    TableOverrun {
        /// Name of the section being parsed.
        section: &'static str,
        /// Name of the table (`"const uniforms"`, `"output registers"`, ...).
        table: &'static str,
        /// The table's starting offset.
        offset: usize,
        /// The table's element count.
        count: usize,
    },

    /// A count field exceeded the hardware-imposed maximum.
    #[error("{field} count {count} exceeds the maximum of {max}")]
    CountExceeded {
        /// Name of the field that was out of range.
        field: &'static str,
        /// The count that was present in the binary.
        count: usize,
        /// The maximum permitted count.
        max: usize,
    },

    /// A flags or mode byte held a value with no defined meaning.
    #[error("unknown {field} value: 0x{value:02X}")]
    UnknownTag {
        /// Name of the field holding the unrecognized value.
        field: &'static str,
        /// The value that was present.
        value: u8,
    },

    /// No DVLE entry in the binary matched the requested entry point name.
    #[error("no entry point named {name:?} in shader binary")]
    EntryPointNotFound {
        /// The entry point name that was requested.
        name: String,
    },
}

impl From<ShaderBinaryError> for GlError {
    fn from(_: ShaderBinaryError) -> Self {
        GlError::InvalidOperation
    }
}
