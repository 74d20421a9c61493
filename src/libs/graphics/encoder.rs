//! The GPU command-list encoder.
//!
//! The PICA200 is programmed entirely through a stream of 32-bit words: a
//! header packs a register id, a 4-bit per-word write mask, a parameter
//! count, and a "consecutive" flag that auto-increments the register id for
//! each following parameter; the header is followed by that many parameter
//! words. [`CommandList`] builds that stream and double-buffers it so the
//! GPU can still be consuming the previous list while a new one is encoded.
//!
//! # Design Pattern
//!
//! Bit-exact with the reference hardware's own encoder
//! (`examples/original_source/Source/Platform/GPU.c`): the header layout,
//! the 256-step/255-per-chunk splitting of long parameter runs, and the
//! finalize/pad/swap sequence are all ported from there rather than
//! reinvented, since any deviation would produce a command stream the real
//! GPU rejects.
//!
//! # Example
//!
//! ```
//! use pica_gl::libs::graphics::encoder::CommandList;
//!
//! let mut list = CommandList::with_capacity(0x1000);
//! list.write(0x0040, 0x3F800000); // write a float 1.0 to some register
//! list.writes(0x0041, &[1, 2, 3]);
//! let words = list.finalize_and_swap().unwrap();
//! assert_eq!(words.len() % 4, 0); // finalized lists stay 16-byte aligned
//! ```

/// Default command-list capacity in bytes, matching the original's
/// `DEFAULT_CMDBUF_CAPACITY`.
pub const DEFAULT_CAPACITY: usize = 0x4000;

/// The `GPUREG_FINALIZE` register id the encoder writes to mark the end of
/// a command list.
const GPUREG_FINALIZE: u32 = 0x0110;
/// Sentinel value written to `GPUREG_FINALIZE`.
const FINALIZE_VALUE: u32 = 0x1234_5678;
/// Padding word used to 16-byte-align a finalized list.
const PAD_WORD: u32 = 0x7510_7510;

fn cmd_header(id: u32, mask: u32, num_params: usize, consecutive: bool) -> u32 {
    debug_assert!(num_params > 0 && num_params <= 256);
    (id & 0xFFFF)
        | ((mask & 0xF) << 16)
        | ((((num_params - 1) as u32) & 0xFF) << 20)
        | if consecutive { 1 << 31 } else { 0 }
}

/// A double-buffered GPU command-list encoder.
///
/// Commands accumulate into `main`; [`finalize_and_swap`](Self::finalize_and_swap)
/// appends the finalize sentinel, pads to 16 bytes if needed, and swaps
/// `main`/`second` so the caller can hand the just-finalized buffer to the
/// GX queue while encoding the next frame into the other one.
#[derive(Debug)]
pub struct CommandList {
    main: Vec<u32>,
    second: Vec<u32>,
    capacity_words: usize,
}

impl CommandList {
    /// Creates a command list with the default capacity (16 KiB).
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Creates a command list with the given capacity in bytes, rounded up
    /// to a multiple of 16 (the hardware's required list alignment).
    pub fn with_capacity(capacity_bytes: usize) -> Self {
        let capacity_bytes = (capacity_bytes + 15) & !15;
        let capacity_words = capacity_bytes / 4;
        Self {
            main: Vec::with_capacity(capacity_words),
            second: Vec::with_capacity(capacity_words),
            capacity_words,
        }
    }

    /// Number of 32-bit words written to the current (unfinalized) buffer.
    pub fn len(&self) -> usize {
        self.main.len()
    }

    /// Whether the current buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.main.is_empty()
    }

    fn check_capacity(&self, additional: usize) {
        if self.main.len() + additional > self.capacity_words {
            log::error!(
                "GPU command list capacity exceeded: {} + {} > {}",
                self.main.len(),
                additional,
                self.capacity_words
            );
        }
        assert!(
            self.main.len() + additional <= self.capacity_words,
            "GPU command list out of bounds: {} + {} > {}",
            self.main.len(),
            additional,
            self.capacity_words
        );
    }

    fn push_chunk(&mut self, id: u32, mask: u32, params: &[u32], consecutive: bool) {
        let header = cmd_header(id, mask, params.len(), consecutive);
        self.check_capacity(params.len() + 2);
        self.main.push(params[0]);
        self.main.push(header);
        self.main.extend_from_slice(&params[1..]);
        if (params.len() + 1) & 1 != 0 {
            self.main.push(0);
        }
    }

    /// Writes `params` to register `id`, masked by the low 4 bits of
    /// `mask`, splitting into chunks of at most 255 parameters the same
    /// way the original's `addMultiParamCmd` does (stepping by 256 but
    /// capping each chunk's parameter count at 255).
    pub fn writes_masked(&mut self, id: u32, params: &[u32], mask: u32) {
        assert!(!params.is_empty());
        let mut offset = 0;
        while offset < params.len() {
            let chunk_len = params.len().saturating_sub(offset).min(255);
            self.push_chunk(id, mask, &params[offset..offset + chunk_len], false);
            offset += 256;
        }
    }

    /// Like [`writes_masked`](Self::writes_masked), but with the unmasked
    /// (`0xF`) write mask.
    pub fn writes(&mut self, id: u32, params: &[u32]) {
        self.writes_masked(id, params, 0xF);
    }

    /// Writes `params` to consecutive registers starting at `id`,
    /// incrementing the register id by the chunk length after each chunk —
    /// the "incremental write" form used for e.g. loading a run of uniform
    /// registers.
    pub fn incremental_writes_masked(&mut self, id: u32, params: &[u32], mask: u32) {
        assert!(!params.is_empty());
        let mut offset = 0;
        let mut cur_id = id;
        while offset < params.len() {
            let chunk_len = params.len().saturating_sub(offset).min(255);
            self.push_chunk(cur_id, mask, &params[offset..offset + chunk_len], true);
            cur_id += chunk_len as u32;
            offset += 256;
        }
    }

    /// Like [`incremental_writes_masked`](Self::incremental_writes_masked),
    /// with the unmasked (`0xF`) write mask.
    pub fn incremental_writes(&mut self, id: u32, params: &[u32]) {
        self.incremental_writes_masked(id, params, 0xF);
    }

    /// Writes a single parameter to register `id`, masked.
    pub fn write_masked(&mut self, id: u32, value: u32, mask: u32) {
        self.check_capacity(2);
        self.main.push(value);
        self.main.push(cmd_header(id, mask, 1, false));
    }

    /// Writes a single parameter to register `id`, unmasked.
    pub fn write(&mut self, id: u32, value: u32) {
        self.write_masked(id, value, 0xF);
    }

    /// Finalizes the current buffer (appends the `GPUREG_FINALIZE` sentinel
    /// and, if needed, a padding word to keep the list 16-byte aligned),
    /// swaps it with the second buffer, and returns the finalized words.
    /// Returns `None` if nothing was written since the last finalize.
    pub fn finalize_and_swap(&mut self) -> Option<Vec<u32>> {
        if self.main.is_empty() {
            return None;
        }

        self.write(GPUREG_FINALIZE, FINALIZE_VALUE);
        if (self.main.len() * 4) % 16 != 0 {
            self.write(0, PAD_WORD);
        }

        std::mem::swap(&mut self.main, &mut self.second);
        let finalized = std::mem::take(&mut self.second);
        Some(finalized)
    }
}

impl Default for CommandList {
    fn default() -> Self {
        Self::new()
    }
}
