//! The DVLB/DVLP/DVLE shader binary loader.
//!
//! `glShaderBinary` hands this crate a single blob compiled by the vendor
//! shader compiler: a DVLB container wrapping one shared DVLP code section
//! and one or more DVLE per-shader sections. This module is a pure parser —
//! it turns that blob into [`ParsedDvlb`]/[`ParsedDvle`] — plus the two
//! pieces of derived state every loaded shader needs before it can be used:
//! uniform classification ([`load_uniforms`]) and vertex/geometry output
//! register semantic mapping ([`generate_outmaps`]).
//!
//! # Design Pattern
//!
//! Ported field-for-field from
//! `examples/original_source/Source/Common/Shaders.c`'s `parseDVLB`/
//! `parseDVLP`/`getDVLEInfo`/`loadUniforms`/`generateOutmaps`. Where the
//! original walks raw pointers with manual bounds checks sprinkled through
//! the function bodies, this version reads through [`Cursor`], a small
//! bounds-checked byte reader that turns every one of those checks into a
//! `?` — the same redesign spec.md §9 calls for at the command-encoder
//! layer, applied here to the parser. Leaf failures are
//! [`crate::core::error::ShaderBinaryError`] (via `thiserror`), converted to
//! [`GlError::InvalidOperation`] at the `glShaderBinary` call boundary.

use crate::core::error::{GlError, ShaderBinaryError};
use crate::libs::graphics::resources::{ActiveAttrib, ActiveUniform, ConstUniforms, GeometryShaderMode, ShaderStage, UniformValue};

const DVLB_MAGIC: [u8; 4] = *b"DVLB";
const DVLP_MAGIC: [u8; 4] = *b"DVLP";
const DVLE_MAGIC: [u8; 4] = *b"DVLE";

const MAX_DVLE_ENTRIES: usize = 8;
const MAX_CODE_WORDS: usize = 512;
const MAX_OPDESCS: usize = 128;
const MAX_CONST_UNIFORMS: usize = 96;
const MAX_OUTPUT_REGS: usize = 7;
const MAX_UNIFORMS: usize = 96;

/// Sentinel semantic byte for an output register slot that carries no
/// mapped semantic, ported from the original's `0x1F` fill value
/// (`0x1F1F1F1F` packed across a register's four components).
pub const UNUSED_SEM: u8 = 0x1F;

/// A bounds-checked little-endian cursor over a shader binary blob.
struct Cursor<'a> {
    data: &'a [u8],
    base: usize,
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(data: &'a [u8], base: usize) -> Self {
        Self { data, base, pos: base }
    }

    fn require(&self, section: &'static str, len: usize) -> Result<(), ShaderBinaryError> {
        if self.pos + len > self.data.len() {
            return Err(ShaderBinaryError::Truncated { section, min_size: self.pos + len - self.base, actual: self.data.len() - self.base });
        }
        Ok(())
    }

    fn u8(&mut self, section: &'static str) -> Result<u8, ShaderBinaryError> {
        self.require(section, 1)?;
        let v = self.data[self.pos];
        self.pos += 1;
        Ok(v)
    }

    fn u16(&mut self, section: &'static str) -> Result<u16, ShaderBinaryError> {
        self.require(section, 2)?;
        let v = u16::from_le_bytes([self.data[self.pos], self.data[self.pos + 1]]);
        self.pos += 2;
        Ok(v)
    }

    fn u32(&mut self, section: &'static str) -> Result<u32, ShaderBinaryError> {
        self.require(section, 4)?;
        let v = u32::from_le_bytes(self.data[self.pos..self.pos + 4].try_into().unwrap());
        self.pos += 4;
        Ok(v)
    }

    fn magic(&mut self, section: &'static str, expected: [u8; 4]) -> Result<(), ShaderBinaryError> {
        self.require(section, 4)?;
        let found: [u8; 4] = self.data[self.pos..self.pos + 4].try_into().unwrap();
        self.pos += 4;
        if found != expected {
            return Err(ShaderBinaryError::BadMagic { section, expected, found });
        }
        Ok(())
    }

    fn seek(&mut self, offset_words: u32) {
        self.pos = self.base + offset_words as usize * 4;
    }

    fn words(&self, section: &'static str, table: &'static str, offset_words: u32, count: usize) -> Result<Vec<u32>, ShaderBinaryError> {
        let start = self.base + offset_words as usize * 4;
        let end = start + count * 4;
        if end > self.data.len() {
            return Err(ShaderBinaryError::TableOverrun { section, table, offset: start, count });
        }
        Ok(self.data[start..end].chunks_exact(4).map(|c| u32::from_le_bytes(c.try_into().unwrap())).collect())
    }
}

/// A DVLE entry's constant uniform table row, before classification.
#[derive(Debug, Clone, Copy)]
struct RawConstEntry {
    kind: u8,
    id: u16,
    data: [u32; 4],
}

/// A DVLE entry's output register table row: the register's semantic
/// *type* (position/normal/color/texcoord/view), which register it writes,
/// and which of its four components are actually driven. Ported field-for-
/// field from `DVLEOutEntry` (`u16 type; u16 regID; u8 mask; u8 _unk[3];`).
#[derive(Debug, Clone, Copy)]
struct RawOutputReg {
    out_type: u16,
    reg_id: u16,
    mask: u8,
}

/// A DVLE entry's active uniform table row.
#[derive(Debug, Clone, Copy)]
struct RawUniform {
    symbol_offset: u32,
    reg_start: u16,
    reg_end: u16,
}

/// One parsed DVLE section: a single vertex or geometry shader and
/// everything needed to install it into a [`crate::libs::graphics::resources::Shader`].
#[derive(Debug, Clone)]
pub struct ParsedDvle {
    /// Vertex or geometry.
    pub stage: ShaderStage,
    /// Whether this entry's merge-outmaps bit was set.
    pub merge_outmaps: bool,
    /// Geometry submission mode (meaningless for vertex shaders).
    pub geometry_mode: GeometryShaderMode,
    /// Word offset of the entry point within the shared DVLP code blob.
    pub entrypoint: u32,
    /// Output register bitmask.
    pub out_mask: u32,
    /// Number of distinct output registers.
    pub out_total: u32,
    /// Packed per-register semantic bytes (v0..v6).
    pub out_sems: [u32; MAX_OUTPUT_REGS],
    /// Accumulated fixed semantic "clock" bits from outmap synthesis.
    pub out_clock: u32,
    /// Set if any texcoord/texcoord-w output register appears.
    pub use_texcoords: bool,
    /// Constant uniforms baked into the binary.
    pub const_uniforms: ConstUniforms,
    /// Active (`glUniform*`-settable) uniforms, unclassified values still
    /// tagged by register range; call [`load_uniforms`] to finish them.
    pub active_uniforms: Vec<ActiveUniform>,
    /// Active vertex attributes (vertex shaders only).
    pub active_attribs: Vec<ActiveAttrib>,
    /// Raw symbol table bytes.
    pub symbol_table: Vec<u8>,
}

/// A fully parsed shader binary: the shared code/op-desc blob plus every
/// DVLE entry it contains.
#[derive(Debug, Clone)]
pub struct ParsedDvlb {
    /// Shared machine code words.
    pub code: Vec<u32>,
    /// Shared operand descriptor words.
    pub op_descs: Vec<u32>,
    /// Every per-shader DVLE entry, in file order.
    pub entries: Vec<ParsedDvle>,
}

/// Parses a complete DVLB blob (the `glShaderBinary` payload) into its
/// shared DVLP code/op-descs and per-shader DVLE entries.
///
/// Mirrors `parseDVLB` -> `parseDVLP` -> `getDVLEInfo` from
/// `examples/original_source/Source/Common/Shaders.c`.
pub fn parse_dvlb(data: &[u8]) -> Result<ParsedDvlb, ShaderBinaryError> {
    let mut c = Cursor::new(data, 0);
    c.magic("DVLB", DVLB_MAGIC)?;
    let num_dvle = c.u32("DVLB")? as usize;
    if num_dvle == 0 || num_dvle > MAX_DVLE_ENTRIES {
        return Err(ShaderBinaryError::CountExceeded { field: "numDVLE", count: num_dvle, max: MAX_DVLE_ENTRIES });
    }

    let mut dvle_offsets = Vec::with_capacity(num_dvle);
    for _ in 0..num_dvle {
        dvle_offsets.push(c.u32("DVLB")?);
    }

    let dvlp_base = c.pos;
    let (code, op_descs) = parse_dvlp(data, dvlp_base)?;

    let mut entries = Vec::with_capacity(num_dvle);
    for offset in dvle_offsets {
        entries.push(parse_dvle(data, offset as usize)?);
    }

    Ok(ParsedDvlb { code, op_descs, entries })
}

fn parse_dvlp(data: &[u8], base: usize) -> Result<(Vec<u32>, Vec<u32>), ShaderBinaryError> {
    let mut c = Cursor::new(data, base);
    c.magic("DVLP", DVLP_MAGIC)?;
    let _version = c.u32("DVLP")?;
    let blob_offset = c.u32("DVLP")?;
    let blob_size = c.u32("DVLP")? as usize;
    let opdesc_offset = c.u32("DVLP")?;
    let opdesc_size = c.u32("DVLP")? as usize;

    if blob_size > MAX_CODE_WORDS {
        return Err(ShaderBinaryError::CountExceeded { field: "DVLP code words", count: blob_size, max: MAX_CODE_WORDS });
    }
    if opdesc_size > MAX_OPDESCS {
        return Err(ShaderBinaryError::CountExceeded { field: "DVLP operand descriptors", count: opdesc_size, max: MAX_OPDESCS });
    }

    let code = c.words("DVLP", "code", blob_offset, blob_size)?;
    let op_descs = c.words("DVLP", "operand descriptors", opdesc_offset, opdesc_size)?;
    Ok((code, op_descs))
}

fn parse_dvle(data: &[u8], base: usize) -> Result<ParsedDvle, ShaderBinaryError> {
    let mut c = Cursor::new(data, base);
    c.magic("DVLE", DVLE_MAGIC)?;
    let _version = c.u16("DVLE")?;
    let stage_tag = c.u8("DVLE")?;
    let stage = match stage_tag {
        0 => ShaderStage::Vertex,
        1 => ShaderStage::Geometry,
        other => return Err(ShaderBinaryError::UnknownTag { field: "DVLE shader type", value: other }),
    };
    let flags = c.u8("DVLE")?;
    let merge_outmaps = flags & 0x1 != 0;

    let gsh_mode_tag = c.u32("DVLE")?;
    let geometry_mode = match gsh_mode_tag {
        0 => GeometryShaderMode::Point,
        1 => GeometryShaderMode::Variable,
        2 => GeometryShaderMode::Fixed,
        other => return Err(ShaderBinaryError::UnknownTag { field: "DVLE geometry mode", value: other as u8 }),
    };

    let entry_start = c.u32("DVLE")?;
    let _entry_end = c.u32("DVLE")?;

    let const_table_offset = c.u32("DVLE")?;
    let const_table_count = c.u32("DVLE")? as usize;
    let out_reg_table_offset = c.u32("DVLE")?;
    let out_reg_table_count = c.u32("DVLE")? as usize;
    let uniform_table_offset = c.u32("DVLE")?;
    let uniform_table_count = c.u32("DVLE")? as usize;
    let symbol_table_offset = c.u32("DVLE")?;
    let symbol_table_size = c.u32("DVLE")? as usize;

    if const_table_count > MAX_CONST_UNIFORMS {
        return Err(ShaderBinaryError::CountExceeded { field: "const uniform table", count: const_table_count, max: MAX_CONST_UNIFORMS });
    }
    if out_reg_table_count > MAX_OUTPUT_REGS {
        return Err(ShaderBinaryError::CountExceeded { field: "output register table", count: out_reg_table_count, max: MAX_OUTPUT_REGS });
    }
    if uniform_table_count > MAX_UNIFORMS {
        return Err(ShaderBinaryError::CountExceeded { field: "active uniform table", count: uniform_table_count, max: MAX_UNIFORMS });
    }

    let const_entries = read_const_entries(data, base, const_table_offset, const_table_count)?;
    let out_regs = read_output_regs(data, base, out_reg_table_offset, out_reg_table_count)?;
    let raw_uniforms = read_raw_uniforms(data, base, uniform_table_offset, uniform_table_count)?;

    let symbol_start = base + symbol_table_offset as usize * 4;
    let symbol_end = symbol_start + symbol_table_size;
    if symbol_end > data.len() {
        return Err(ShaderBinaryError::TableOverrun { section: "DVLE", table: "symbol table", offset: symbol_start, count: symbol_table_size });
    }
    let symbol_table = data[symbol_start..symbol_end].to_vec();

    let const_uniforms = classify_const_uniforms(&const_entries);
    let (active_uniforms, active_attribs) = split_raw_uniforms(&raw_uniforms, &symbol_table, stage);
    let (out_mask, out_total, out_sems, out_clock, use_texcoords) = generate_outmaps(&out_regs, stage, merge_outmaps);

    Ok(ParsedDvle {
        stage,
        merge_outmaps,
        geometry_mode,
        entrypoint: entry_start,
        out_mask,
        out_total,
        out_sems,
        out_clock,
        use_texcoords,
        const_uniforms,
        active_uniforms,
        active_attribs,
        symbol_table,
    })
}

fn read_const_entries(data: &[u8], base: usize, offset: u32, count: usize) -> Result<Vec<RawConstEntry>, ShaderBinaryError> {
    const ENTRY_SIZE: usize = 20;
    let mut entries = Vec::with_capacity(count);
    let mut c = Cursor::new(data, base + offset as usize * 4);
    for _ in 0..count {
        let kind = c.u8("const uniform entry")?;
        let _pad = c.u8("const uniform entry")?;
        let id = c.u16("const uniform entry")?;
        let mut payload = [0u32; 4];
        for slot in &mut payload {
            *slot = c.u32("const uniform entry")?;
        }
        let _ = ENTRY_SIZE;
        entries.push(RawConstEntry { kind, id, data: payload });
    }
    Ok(entries)
}

fn read_output_regs(data: &[u8], base: usize, offset: u32, count: usize) -> Result<Vec<RawOutputReg>, ShaderBinaryError> {
    let mut regs = Vec::with_capacity(count);
    let mut c = Cursor::new(data, base + offset as usize * 4);
    for _ in 0..count {
        let out_type = c.u16("output register entry")?;
        let reg_id = c.u16("output register entry")?;
        let mask = c.u8("output register entry")?;
        let _unk0 = c.u8("output register entry")?;
        let _unk1 = c.u8("output register entry")?;
        let _unk2 = c.u8("output register entry")?;
        regs.push(RawOutputReg { out_type, reg_id, mask });
    }
    Ok(regs)
}

fn read_raw_uniforms(data: &[u8], base: usize, offset: u32, count: usize) -> Result<Vec<RawUniform>, ShaderBinaryError> {
    let mut uniforms = Vec::with_capacity(count);
    let mut c = Cursor::new(data, base + offset as usize * 4);
    for _ in 0..count {
        let symbol_offset = c.u32("active uniform entry")?;
        let reg_start = c.u16("active uniform entry")?;
        let reg_end = c.u16("active uniform entry")?;
        uniforms.push(RawUniform { symbol_offset, reg_start, reg_end });
    }
    Ok(uniforms)
}

fn read_symbol(symbol_table: &[u8], offset: u32) -> String {
    let start = offset as usize;
    if start >= symbol_table.len() {
        return String::new();
    }
    let end = symbol_table[start..].iter().position(|&b| b == 0).map(|p| start + p).unwrap_or(symbol_table.len());
    String::from_utf8_lossy(&symbol_table[start..end]).into_owned()
}

/// Register id ranges used to classify a raw uniform entry into the
/// attribute, bool, int, or float register class. Windows and bases are
/// spec.md §4.4 verbatim: attribute `[0x00..=0x0F]`, float `[0x10..=0x6F]`
/// (96 registers), int `[0x70..=0x73]` (4 registers), bool `[0x78..=0x87]`
/// (16 registers).
const ATTRIB_REG_BASE: u16 = 0x00;
const ATTRIB_REG_END: u16 = 0x0F;
const FLOAT_REG_BASE: u16 = 0x10;
const FLOAT_REG_END: u16 = 0x6F;
const INT_REG_BASE: u16 = 0x70;
const INT_REG_END: u16 = 0x73;
const BOOL_REG_BASE: u16 = 0x78;
const BOOL_REG_END: u16 = 0x87;

fn split_raw_uniforms(raw: &[RawUniform], symbol_table: &[u8], stage: ShaderStage) -> (Vec<ActiveUniform>, Vec<ActiveAttrib>) {
    let mut uniforms = Vec::new();
    let mut attribs = Vec::new();

    for entry in raw {
        let symbol = read_symbol(symbol_table, entry.symbol_offset);
        let count = (entry.reg_end - entry.reg_start + 1) as usize;

        if stage == ShaderStage::Vertex && entry.reg_start >= ATTRIB_REG_BASE && entry.reg_end <= ATTRIB_REG_END {
            // Attribute registers double as a vertex shader's input symbols.
            attribs.push(ActiveAttrib { id: entry.reg_start as u32, symbol: symbol.clone() });
            continue;
        }

        let (id, value) = if entry.reg_start >= BOOL_REG_BASE && entry.reg_start <= BOOL_REG_END {
            (entry.reg_start - BOOL_REG_BASE, UniformValue::Bool(false))
        } else if entry.reg_start >= INT_REG_BASE && entry.reg_start <= INT_REG_END {
            (entry.reg_start - INT_REG_BASE, UniformValue::Int(vec![[0; 4]; count]))
        } else {
            debug_assert!(entry.reg_start >= FLOAT_REG_BASE && entry.reg_start <= FLOAT_REG_END, "uniform reg {:#x} outside any known register window", entry.reg_start);
            (entry.reg_start.saturating_sub(FLOAT_REG_BASE), UniformValue::Float(vec![[0.0; 4]; count]))
        };

        uniforms.push(ActiveUniform { id: id as u32, symbol, value, dirty: true });
    }

    (uniforms, attribs)
}

fn classify_const_uniforms(entries: &[RawConstEntry]) -> ConstUniforms {
    let mut out = ConstUniforms::default();
    for entry in entries {
        match entry.kind {
            0 => {
                // bool constant: id is the bool register index, data[0] bit 0 is the value.
                if entry.data[0] & 1 != 0 {
                    out.bool_mask |= 1 << (entry.id & 0xF);
                }
            }
            1 => {
                // int constant: one of 4 slots, data holds 4 packed byte lanes.
                let slot = (entry.id & 0x3) as usize;
                out.int_data[slot] = crate::core::math::pack_int_vector(entry.data);
                out.int_mask |= 1 << slot;
            }
            2 => {
                // float constant: data holds x,y,z,w as raw f32 bit patterns.
                let lanes = [
                    f32::from_bits(entry.data[0]),
                    f32::from_bits(entry.data[1]),
                    f32::from_bits(entry.data[2]),
                    f32::from_bits(entry.data[3]),
                ];
                out.float_consts.push((entry.id as u32, crate::core::math::pack_float_vector(lanes)));
            }
            _ => {}
        }
    }
    out
}

/// Output register type tags, from `DVLEOutEntry::type` (the vendor
/// compiler's `OUTPUTREGTYPE_*` enum). `Dummy` entries are parsed but
/// contribute no semantic mapping.
const OUTPUTREGTYPE_POSITION: u16 = 0x00;
const OUTPUTREGTYPE_NORMALQUAT: u16 = 0x01;
const OUTPUTREGTYPE_COLOR: u16 = 0x02;
const OUTPUTREGTYPE_TEXCOORD0: u16 = 0x03;
const OUTPUTREGTYPE_TEXCOORD0W: u16 = 0x04;
const OUTPUTREGTYPE_TEXCOORD1: u16 = 0x05;
const OUTPUTREGTYPE_TEXCOORD2: u16 = 0x06;
const OUTPUTREGTYPE_VIEW: u16 = 0x08;
const OUTPUTREGTYPE_DUMMY: u16 = 0x09;

/// Synthesizes the packed per-register semantic words, the output-register
/// bitmask/count, the "clock" bits a shader's output registers drive, and
/// whether any texcoord output is produced, from a DVLE's raw output
/// register table.
///
/// Ported from `generateOutmaps`: each entry's `type` selects a semantic
/// base value, a component count, and fixed clock bits; the base value is
/// then assigned one-per-set-bit across the entry's 4-bit component mask,
/// incrementing as it goes (so e.g. a position entry with mask `0b0111`
/// gets semantics `0x00, 0x01, 0x02` in its x/y/z components). A
/// `position` entry that drives its z component (the third set bit) also
/// ORs in clock bit 0.
///
/// Unused component slots are left as [`UNUSED_SEM`] (`0x1F`) rather than
/// zeroed, matching the original's `0x1F1F1F1F` sentinel so a downstream
/// merge can tell "unset" apart from "mapped to semantic 0" (position.x).
fn generate_outmaps(regs: &[RawOutputReg], stage: ShaderStage, merge_outmaps: bool) -> (u32, u32, [u32; MAX_OUTPUT_REGS], u32, bool) {
    let mut out_sems = [0x1F1F1F1Fu32; MAX_OUTPUT_REGS];
    let mut out_mask = 0u32;
    let mut out_total = 0u32;
    let mut out_clock = 0u32;
    let mut use_texcoords = false;
    let _ = merge_outmaps;
    let _ = stage;

    for reg in regs {
        let idx = reg.reg_id as usize;
        if idx >= MAX_OUTPUT_REGS {
            continue;
        }
        if out_mask & (1 << idx) == 0 {
            out_mask |= 1 << idx;
            out_total += 1;
        }

        let (sem_base, max_sem) = match reg.out_type {
            OUTPUTREGTYPE_POSITION => (0x00u8, 4),
            OUTPUTREGTYPE_NORMALQUAT => {
                out_clock |= 1 << 24;
                (0x04, 4)
            }
            OUTPUTREGTYPE_COLOR => {
                out_clock |= 1 << 1;
                (0x08, 4)
            }
            OUTPUTREGTYPE_TEXCOORD0 => {
                out_clock |= 1 << 8;
                use_texcoords = true;
                (0x0C, 2)
            }
            OUTPUTREGTYPE_TEXCOORD0W => {
                out_clock |= 1 << 16;
                use_texcoords = true;
                (0x10, 1)
            }
            OUTPUTREGTYPE_TEXCOORD1 => {
                out_clock |= 1 << 9;
                use_texcoords = true;
                (0x0E, 2)
            }
            OUTPUTREGTYPE_TEXCOORD2 => {
                out_clock |= 1 << 10;
                use_texcoords = true;
                (0x16, 2)
            }
            OUTPUTREGTYPE_VIEW => {
                out_clock |= 1 << 24;
                (0x12, 3)
            }
            OUTPUTREGTYPE_DUMMY => continue,
            _ => continue,
        };

        let mut sem = sem_base;
        let mut cur_sem = 0u32;
        let mut packed = out_sems[idx].to_le_bytes();
        for component in 0..4 {
            if cur_sem >= max_sem {
                break;
            }
            if reg.mask & (1 << component) != 0 {
                packed[component] = sem;
                sem += 1;
                cur_sem += 1;
                if reg.out_type == OUTPUTREGTYPE_POSITION && cur_sem == 3 {
                    out_clock |= 1 << 0;
                }
            }
        }
        out_sems[idx] = u32::from_le_bytes(packed);
    }

    (out_mask, out_total, out_sems, out_clock, use_texcoords)
}

/// Merges a vertex shader's synthesized outmap into a geometry shader's,
/// for the `mergeOutmaps` case: the geometry shader inherits any register
/// slot it left at the [`UNUSED_SEM`] sentinel from the vertex shader's
/// mapping, per `examples/original_source/Source/Common/Shaders.c`'s
/// outmap merge step.
pub fn merge_outmaps(vertex_sems: &[u32; MAX_OUTPUT_REGS], geometry_sems: &mut [u32; MAX_OUTPUT_REGS]) {
    for (g, v) in geometry_sems.iter_mut().zip(vertex_sems.iter()) {
        if *g == 0x1F1F1F1F {
            *g = *v;
        }
    }
}

/// Finalizes a DVLE's unclassified active uniforms (as produced by
/// [`parse_dvle`]) into register-indexed uniform slots ready for
/// `glGetUniformLocation`/`glUniform*`. Currently a pass-through — register
/// rebasing is already performed during parsing — kept as a named step to
/// mirror the original's separate `loadUniforms` pass and as the extension
/// point for future per-uniform default-value population.
pub fn load_uniforms(uniforms: Vec<ActiveUniform>) -> Result<Vec<ActiveUniform>, GlError> {
    Ok(uniforms)
}

/// Locates the DVLE entry whose entry point matches `entry_point`, if
/// given, or the first entry of the requested stage otherwise. Mirrors the
/// original's `lookupShader`.
pub fn lookup_shader<'a>(dvlb: &'a ParsedDvlb, stage: ShaderStage, entry_point: Option<&str>) -> Result<&'a ParsedDvle, ShaderBinaryError> {
    let candidates = dvlb.entries.iter().filter(|e| e.stage == stage);
    match entry_point {
        None => candidates
            .into_iter()
            .next()
            .ok_or_else(|| ShaderBinaryError::EntryPointNotFound { name: "<default>".to_string() }),
        Some(name) => {
            for entry in candidates {
                let symbol_name = read_symbol(&entry.symbol_table, 0);
                if symbol_name == name {
                    return Ok(entry);
                }
            }
            Err(ShaderBinaryError::EntryPointNotFound { name: name.to_string() })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build_trivial_dvlb() -> Vec<u8> {
        // DVLB: magic, numDVLE=1, dvleOffset (word units from file start).
        let mut buf = Vec::new();
        buf.extend_from_slice(b"DVLB");
        buf.extend_from_slice(&1u32.to_le_bytes());
        // dvle offset filled in after we know the layout.
        let dvle_offset_pos = buf.len();
        buf.extend_from_slice(&0u32.to_le_bytes());

        let dvlp_base = buf.len();
        buf.extend_from_slice(b"DVLP");
        buf.extend_from_slice(&0u32.to_le_bytes()); // version
        let blob_offset_words = 8u32; // relative to dvlp_base, in words
        buf.extend_from_slice(&blob_offset_words.to_le_bytes());
        buf.extend_from_slice(&2u32.to_le_bytes()); // blob size (words)
        let opdesc_offset_words = 10u32;
        buf.extend_from_slice(&opdesc_offset_words.to_le_bytes());
        buf.extend_from_slice(&1u32.to_le_bytes()); // opdesc count
        // pad to the blob offset
        while buf.len() < dvlp_base + blob_offset_words as usize * 4 {
            buf.push(0);
        }
        buf.extend_from_slice(&0xAAAA_BBBBu32.to_le_bytes());
        buf.extend_from_slice(&0xCCCC_DDDDu32.to_le_bytes());
        buf.extend_from_slice(&0x1111_2222u32.to_le_bytes());

        let dvle_base = buf.len();
        buf[dvle_offset_pos..dvle_offset_pos + 4].copy_from_slice(&((dvle_base / 4) as u32).to_le_bytes());

        buf.extend_from_slice(b"DVLE");
        buf.extend_from_slice(&0u16.to_le_bytes()); // version
        buf.push(0); // vertex shader
        buf.push(0); // flags
        buf.extend_from_slice(&0u32.to_le_bytes()); // geometry mode (point)
        buf.extend_from_slice(&0u32.to_le_bytes()); // entry start
        buf.extend_from_slice(&0u32.to_le_bytes()); // entry end
        buf.extend_from_slice(&0u32.to_le_bytes()); // const table offset
        buf.extend_from_slice(&0u32.to_le_bytes()); // const table count
        buf.extend_from_slice(&0u32.to_le_bytes()); // out reg table offset
        buf.extend_from_slice(&0u32.to_le_bytes()); // out reg table count
        buf.extend_from_slice(&0u32.to_le_bytes()); // uniform table offset
        buf.extend_from_slice(&0u32.to_le_bytes()); // uniform table count
        buf.extend_from_slice(&0u32.to_le_bytes()); // symbol table offset
        buf.extend_from_slice(&0u32.to_le_bytes()); // symbol table size

        buf
    }

    #[test]
    fn parses_trivial_dvlb() {
        let data = build_trivial_dvlb();
        let parsed = parse_dvlb(&data).expect("should parse");
        assert_eq!(parsed.code, vec![0xAAAA_BBBB, 0xCCCC_DDDD]);
        assert_eq!(parsed.op_descs, vec![0x1111_2222]);
        assert_eq!(parsed.entries.len(), 1);
        assert_eq!(parsed.entries[0].stage, ShaderStage::Vertex);
    }

    #[test]
    fn rejects_bad_magic() {
        let mut data = build_trivial_dvlb();
        data[0] = b'X';
        let err = parse_dvlb(&data).unwrap_err();
        assert!(matches!(err, ShaderBinaryError::BadMagic { section: "DVLB", .. }));
    }

    #[test]
    fn rejects_truncated_buffer() {
        let data = build_trivial_dvlb();
        let truncated = &data[..data.len() - 20];
        assert!(parse_dvlb(truncated).is_err());
    }

    #[test]
    fn generate_outmaps_assigns_position_semantics_and_z_clock_bit() {
        // A position entry driving all 4 components (mask 0b1111).
        let regs = [RawOutputReg { out_type: OUTPUTREGTYPE_POSITION, reg_id: 0, mask: 0b1111 }];
        let (out_mask, out_total, out_sems, out_clock, use_texcoords) =
            generate_outmaps(&regs, ShaderStage::Vertex, false);
        assert_eq!(out_mask, 0b1);
        assert_eq!(out_total, 1);
        assert_eq!(out_sems[0].to_le_bytes(), [0x00, 0x01, 0x02, 0x03]);
        assert_eq!(out_clock & 1, 1); // position.z clock bit
        assert!(!use_texcoords);
    }

    #[test]
    fn generate_outmaps_marks_texcoord_usage() {
        let regs = [RawOutputReg { out_type: OUTPUTREGTYPE_TEXCOORD0, reg_id: 1, mask: 0b0011 }];
        let (_, _, out_sems, out_clock, use_texcoords) = generate_outmaps(&regs, ShaderStage::Vertex, false);
        assert!(use_texcoords);
        assert_eq!(out_clock & (1 << 8), 1 << 8);
        assert_eq!(out_sems[1].to_le_bytes()[..2], [0x0C, 0x0D]);
    }

    #[test]
    fn generate_outmaps_skips_masked_out_components() {
        // Only the x component (bit 0) is driven.
        let regs = [RawOutputReg { out_type: OUTPUTREGTYPE_COLOR, reg_id: 2, mask: 0b0001 }];
        let (_, _, out_sems, _, _) = generate_outmaps(&regs, ShaderStage::Vertex, false);
        let bytes = out_sems[2].to_le_bytes();
        assert_eq!(bytes[0], 0x08);
        assert_eq!(bytes[1], UNUSED_SEM);
    }

    #[test]
    fn merge_outmaps_fills_unused_slots_from_vertex() {
        let vertex = [0x0001_0203; MAX_OUTPUT_REGS];
        let mut geometry = [0x1F1F1F1F; MAX_OUTPUT_REGS];
        geometry[2] = 0x0405_0607;
        merge_outmaps(&vertex, &mut geometry);
        assert_eq!(geometry[0], 0x0001_0203);
        assert_eq!(geometry[2], 0x0405_0607);
    }

    #[test]
    fn lookup_shader_finds_first_entry_of_stage() {
        let data = build_trivial_dvlb();
        let parsed = parse_dvlb(&data).unwrap();
        let found = lookup_shader(&parsed, ShaderStage::Vertex, None).unwrap();
        assert_eq!(found.stage, ShaderStage::Vertex);
        assert!(lookup_shader(&parsed, ShaderStage::Geometry, None).is_err());
    }
}
