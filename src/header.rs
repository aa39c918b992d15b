//! HCA file header: a big-endian sequence of 4-byte tagged chunks.
//!
//! Grounded on Go `hca/hca_header.go`'s `loadHeader` and its per-tag
//! `*HeaderRead` helpers: exact tag constants (each masked with
//! `0x7F7F7F7F` so that a high-bit-set tag still compares equal to its
//! canonical form), exact field widths, and exact defaults-on-absence.
//! Chunks are walked in a fixed order; `HCA`, `fmt`, and one of `comp`/`dec`
//! are required, the rest are optional and fall back to the documented
//! default when missing.

use crate::errors;
use crate::io::ReadBuffer;
use crate::Result;

const TAG_MASK: u32 = 0x7F7F_7F7F;
const TAG_HCA: u32 = 0x4843_4100;
const TAG_FMT: u32 = 0x666D_7400;
const TAG_COMP: u32 = 0x636F_6D70;
const TAG_DEC: u32 = 0x6465_6300;
const TAG_VBR: u32 = 0x7662_7200;
const TAG_ATH: u32 = 0x6174_6800;
const TAG_LOOP: u32 = 0x6C6F_6F70;
const TAG_CIPH: u32 = 0x6369_7068;
const TAG_RVA: u32 = 0x7276_6100;
const TAG_COMM: u32 = 0x636F_6D6D;

/// Decoder configuration parsed from an HCA header, immutable thereafter.
#[derive(Debug, Clone)]
pub struct DecoderConfig {
    pub version: u16,
    pub data_offset: u16,

    pub channel_count: u8,
    pub sampling_rate: u32,
    pub block_count: u32,
    pub fmt_r01: u16,
    pub fmt_r02: u16,

    pub block_size: u16,
    pub comp_r01: u8,
    pub comp_r02: u8,
    pub comp_r03: u8,
    pub comp_r04: u8,
    pub comp_r05: u16,
    pub comp_r06: u16,
    pub comp_r07: u16,
    pub comp_r08: u8,
    pub comp_r09: u32,

    pub vbr_r01: u16,
    pub vbr_r02: u16,

    pub ath_type: u16,

    pub loop_start: u32,
    pub loop_end: u32,
    pub loop_r01: u16,
    pub loop_r02: u16,
    pub loop_flag: bool,

    pub ciph_type: u16,

    pub rva_volume: f32,

    pub comm_len: u8,
    pub comm_comment: String,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        DecoderConfig {
            version: 0,
            data_offset: 0,
            channel_count: 0,
            sampling_rate: 0,
            block_count: 0,
            fmt_r01: 0,
            fmt_r02: 0,
            block_size: 0,
            comp_r01: 0,
            comp_r02: 0,
            comp_r03: 1,
            comp_r04: 0,
            comp_r05: 0,
            comp_r06: 0,
            comp_r07: 0,
            comp_r08: 0,
            comp_r09: 0,
            vbr_r01: 0,
            vbr_r02: 0,
            ath_type: 0,
            loop_start: 0,
            loop_end: 0,
            loop_r01: 0,
            loop_r02: 0x400,
            loop_flag: false,
            ciph_type: 0,
            rva_volume: 1.0,
            comm_len: 0,
            comm_comment: String::new(),
        }
    }
}

impl DecoderConfig {
    /// Parses a header from `reader`, starting at the current position.
    /// `reader` is left positioned right after the last chunk read; callers
    /// seek to `data_offset` themselves before reading the first block.
    ///
    /// Per spec.md §6, the header is itself `dataOffset` bytes terminated by
    /// a trailing big-endian CRC-16 over the whole header (tag chunks
    /// included), verified with the same table as a block's CRC. The header
    /// is therefore buffered in full before any chunk is parsed.
    pub fn parse<R: ReadBuffer>(reader: &mut R) -> Result<DecoderConfig> {
        let mut cfg = DecoderConfig::default();

        let mut prefix = [0u8; 8];
        reader.read_into(&mut prefix)?;
        let hca_tag = u32::from_be_bytes(prefix[0..4].try_into().unwrap());
        if hca_tag & TAG_MASK != TAG_HCA {
            return errors::header_error("missing HCA tag");
        }
        cfg.version = u16::from_be_bytes(prefix[4..6].try_into().unwrap());
        cfg.data_offset = u16::from_be_bytes(prefix[6..8].try_into().unwrap());
        if (cfg.data_offset as usize) < prefix.len() + 2 {
            return errors::header_error("dataOffset too small for header + CRC");
        }

        let mut header_bytes = Vec::with_capacity(cfg.data_offset as usize);
        header_bytes.extend_from_slice(&prefix);
        header_bytes.resize(cfg.data_offset as usize, 0);
        reader.read_into(&mut header_bytes[prefix.len()..])?;

        if !crate::crc::verify(&header_bytes) {
            return errors::header_error("header CRC mismatch");
        }

        let body_end = header_bytes.len() - 2;
        let mut reader = std::io::Cursor::new(&header_bytes[prefix.len()..body_end]);
        let reader = &mut reader;

        let mut tag = reader.read_be_u32()?;
        if tag & TAG_MASK != TAG_FMT {
            return errors::header_error("missing fmt chunk");
        }
        read_fmt(reader, &mut cfg)?;
        tag = reader.read_be_u32()?;

        if tag & TAG_MASK == TAG_COMP {
            read_comp(reader, &mut cfg)?;
            tag = reader.read_be_u32()?;
        } else if tag & TAG_MASK == TAG_DEC {
            read_dec(reader, &mut cfg)?;
            tag = reader.read_be_u32()?;
        } else {
            return errors::header_error("missing comp/dec chunk");
        }

        if tag & TAG_MASK == TAG_VBR {
            cfg.vbr_r01 = reader.read_be_u16()?;
            cfg.vbr_r02 = reader.read_be_u16()?;
            tag = reader.read_be_u32()?;
        }

        if tag & TAG_MASK == TAG_ATH {
            cfg.ath_type = reader.read_be_u16()?;
            tag = reader.read_be_u32()?;
        } else {
            cfg.ath_type = crate::ath::Ath::default_type_for_version(cfg.version);
        }

        if tag & TAG_MASK == TAG_LOOP {
            cfg.loop_start = reader.read_be_u32()?;
            cfg.loop_end = reader.read_be_u32()?;
            cfg.loop_r01 = reader.read_be_u16()?;
            cfg.loop_r02 = reader.read_be_u16()?;
            cfg.loop_flag = true;
            if !(cfg.loop_start <= cfg.loop_end && cfg.loop_end < cfg.block_count) {
                return errors::header_error("loop indices out of range");
            }
            tag = reader.read_be_u32()?;
        }

        if tag & TAG_MASK == TAG_CIPH {
            cfg.ciph_type = reader.read_be_u16()?;
            if !matches!(cfg.ciph_type, 0 | 1 | 0x38) {
                return errors::header_error("unsupported cipher type");
            }
            tag = reader.read_be_u32()?;
        }

        if tag & TAG_MASK == TAG_RVA {
            cfg.rva_volume = reader.read_be_f32()?;
            tag = reader.read_be_u32()?;
        }

        if tag & TAG_MASK == TAG_COMM {
            cfg.comm_len = reader.read_u8()?;
            cfg.comm_comment = reader.read_cstring()?;
        }

        if cfg.comp_r03 == 0 {
            cfg.comp_r03 = 1;
        }
        if cfg.comp_r01 != 1 || cfg.comp_r02 != 15 {
            return errors::header_error("comp_r01/comp_r02 must be 1/15");
        }
        cfg.comp_r09 = ceil_div(
            cfg.comp_r05 as i64 - (cfg.comp_r06 as i64 + cfg.comp_r07 as i64),
            cfg.comp_r08 as i64,
        );

        tracing::debug!(
            channels = cfg.channel_count,
            sampling_rate = cfg.sampling_rate,
            block_count = cfg.block_count,
            block_size = cfg.block_size,
            "parsed HCA header"
        );
        Ok(cfg)
    }
}

fn read_fmt<R: ReadBuffer>(reader: &mut R, cfg: &mut DecoderConfig) -> Result<()> {
    let packed = reader.read_be_u32()?;
    cfg.channel_count = ((packed & 0xFF00_0000) >> 24) as u8;
    cfg.sampling_rate = packed & 0x00FF_FFFF;
    cfg.block_count = reader.read_be_u32()?;
    cfg.fmt_r01 = reader.read_be_u16()?;
    cfg.fmt_r02 = reader.read_be_u16()?;

    if !(1..=16).contains(&cfg.channel_count) {
        return errors::header_error("channelCount out of [1, 16]");
    }
    if !(1..=0x007F_FFFF).contains(&cfg.sampling_rate) {
        return errors::header_error("samplingRate out of [1, 2^23-1]");
    }
    Ok(())
}

fn read_comp<R: ReadBuffer>(reader: &mut R, cfg: &mut DecoderConfig) -> Result<()> {
    cfg.block_size = reader.read_be_u16()?;
    let data = reader.read_bytes(10)?;
    cfg.comp_r01 = data[0];
    cfg.comp_r02 = data[1];
    cfg.comp_r03 = data[2];
    cfg.comp_r04 = data[3];
    cfg.comp_r05 = data[4] as u16;
    cfg.comp_r06 = data[5] as u16;
    cfg.comp_r07 = data[6] as u16;
    cfg.comp_r08 = data[7];
    validate_block_size_and_comp(cfg)
}

fn read_dec<R: ReadBuffer>(reader: &mut R, cfg: &mut DecoderConfig) -> Result<()> {
    cfg.block_size = reader.read_be_u16()?;
    let data = reader.read_bytes(6)?;
    cfg.comp_r01 = data[0];
    cfg.comp_r02 = data[1];
    cfg.comp_r03 = data[4] & 0xF;
    cfg.comp_r04 = data[4] >> 4;
    cfg.comp_r05 = data[2] as u16 + 1;
    cfg.comp_r06 = if data[5] > 0 {
        data[3] as u16 + 1
    } else {
        data[2] as u16 + 1
    };
    cfg.comp_r07 = cfg.comp_r05 - cfg.comp_r06;
    cfg.comp_r08 = 0;
    validate_block_size_and_comp(cfg)
}

fn validate_block_size_and_comp(cfg: &DecoderConfig) -> Result<()> {
    let size_ok = cfg.block_size == 0 || (8..=0xFFFF).contains(&cfg.block_size);
    if !size_ok {
        return errors::header_error("blockSize out of range");
    }
    if !(cfg.comp_r01 <= cfg.comp_r02 && cfg.comp_r02 <= 0x1F) {
        return errors::header_error("comp_r01/comp_r02 out of range");
    }
    Ok(())
}

/// Integer ceiling division; `0` when the divisor is `0`, matching Go's
/// `ceil2` (which leaves the numerator unused in that case).
fn ceil_div(a: i64, b: i64) -> u32 {
    if b <= 0 {
        0
    } else {
        let t = a.max(0);
        ((t + b - 1) / b) as u32
    }
}
