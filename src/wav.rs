//! RIFF/WAVE container writer: `fmt `, optional `smpl`/`note`, and `data`.
//!
//! Grounded on Go `wave_header.go` (`stWaveHeader`/`stWAVEriff`/`stWAVEsmpl`/
//! `stWAVEnote`/`stWAVEdata`): exact chunk tags, exact field order, and the
//! exact constants `fmtSize = 0x10`, `smplSize = 0x3C`, `MIDIUnityNote =
//! 0x3C`, `sampleLoops = 1`, `samplerData = 0x18`. Sizing (`buildWaveHeader`
//! in Go `hca_decode.go`) is reproduced field-for-field, including the
//! `noteSize` 4-byte padding rule and the `+68`-byte (`17 * 4`) `smpl` chunk
//! addition when loop metadata is present but `Loop == 0`.

use crate::io::WriteBuffer;
use crate::Result;

/// Output sample format requested by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleMode {
    Float32,
    U8,
    I16,
    I24,
    I32,
}

impl SampleMode {
    pub fn bits(self) -> u16 {
        match self {
            SampleMode::Float32 => 32,
            SampleMode::U8 => 8,
            SampleMode::I16 => 16,
            SampleMode::I24 => 24,
            SampleMode::I32 => 32,
        }
    }

    fn fmt_type(self) -> u16 {
        match self {
            SampleMode::Float32 => 3,
            _ => 1,
        }
    }
}

/// Loop metadata carried from the decoder configuration into the `smpl`
/// chunk, or `None` when the file has no loop region.
pub struct LoopInfo {
    pub start_block: u32,
    pub end_block: u32,
    pub loop_r01: u16,
}

/// Everything `WavWriter` needs to size and emit the header, computed once
/// before the first block is decoded.
pub struct WavPlan {
    pub channel_count: u16,
    pub sampling_rate: u32,
    pub mode: SampleMode,
    pub block_count: u32,
    /// Present only when the header actually carries a `loop` chunk; drives
    /// the `smpl` chunk's contents (and whether it is emitted at all).
    pub loop_info: Option<LoopInfo>,
    /// The `[start, end)` block range repeated `loop_repeat` times, for data
    /// sizing and block iteration. Grounded on Go `hca.go:120-136`: this is
    /// `(loopStart, loopEnd)` when the header has a `loop` chunk, but falls
    /// back to `(0, blockCount)` when the caller requests repeats (`Loop !=
    /// 0`) on a file with none — the whole file is what gets replayed. `None`
    /// when no repeat is requested.
    pub loop_region: Option<(u32, u32)>,
    /// Caller's requested loop repeat count (`Decoder::loop_count`); `0`
    /// plays the loop region once as ordinary data with no `smpl` chunk.
    pub loop_repeat: u32,
    pub comment: Option<String>,
}

const SAMPLES_PER_BLOCK: u32 = 8 * 0x80;

impl WavPlan {
    fn sampling_size(&self) -> u32 {
        (self.mode.bits() / 8) as u32 * self.channel_count as u32
    }

    fn data_size(&self) -> u32 {
        let full = self.block_count * SAMPLES_PER_BLOCK * self.sampling_size();
        let loop_extra = match self.loop_region {
            Some((start, end)) if self.loop_repeat > 0 => {
                let region_blocks = end - start;
                region_blocks * SAMPLES_PER_BLOCK * self.sampling_size() * self.loop_repeat
            }
            _ => 0,
        };
        full + loop_extra
    }

    fn emits_smpl(&self) -> bool {
        self.loop_info.is_some() && self.loop_repeat == 0
    }

    fn note_size(&self) -> Option<u32> {
        self.comment.as_ref().map(|c| {
            let raw = 5 + c.len() as u32;
            (raw + 3) / 4 * 4
        })
    }

    fn riff_size(&self) -> u32 {
        let mut size = 0x1C + 8 + self.data_size();
        if self.emits_smpl() {
            size += 17 * 4;
        }
        if let Some(note_size) = self.note_size() {
            size += 8 + note_size;
        }
        size
    }
}

/// Writes the RIFF/WAVE container incrementally: header first, then one
/// `write_frame` call per decoded sample frame.
pub struct WavWriter<W> {
    inner: W,
    mode: SampleMode,
}

impl<W: WriteBuffer> WavWriter<W> {
    /// Writes the full header (`RIFF`/`fmt `/optional `smpl`/optional
    /// `note`/`data`) and returns a writer ready for `write_frame` calls.
    pub fn new(mut inner: W, plan: &WavPlan) -> Result<Self> {
        inner.write_all(b"RIFF")?;
        inner.write_le_u32(plan.riff_size())?;
        inner.write_all(b"WAVE")?;

        inner.write_all(b"fmt ")?;
        inner.write_le_u32(0x10)?;
        inner.write_le_u16(plan.mode.fmt_type())?;
        inner.write_le_u16(plan.channel_count)?;
        inner.write_le_u32(plan.sampling_rate)?;
        let sampling_size = plan.sampling_size();
        inner.write_le_u32(plan.sampling_rate * sampling_size)?;
        inner.write_le_u16(sampling_size as u16)?;
        inner.write_le_u16(plan.mode.bits())?;

        if plan.emits_smpl() {
            let info = plan.loop_info.as_ref().expect("emits_smpl implies loop_info");
            inner.write_all(b"smpl")?;
            inner.write_le_u32(0x3C)?;
            inner.write_le_u32(0)?; // manufacturer
            inner.write_le_u32(0)?; // product
            let sample_period = (1_000_000_000.0 / plan.sampling_rate as f64) as u32;
            inner.write_le_u32(sample_period)?;
            inner.write_le_u32(0x3C)?; // MIDIUnityNote
            inner.write_le_u32(0)?; // MIDIPitchFraction
            inner.write_le_u32(0)?; // SMPTEFormat
            inner.write_le_u32(0)?; // SMPTEOffset
            inner.write_le_u32(1)?; // sampleLoops
            inner.write_le_u32(0x18)?; // samplerData
            inner.write_le_u32(0)?; // loopIdentifier
            inner.write_le_u32(0)?; // loopType
            let loop_start = info.start_block * SAMPLES_PER_BLOCK * sampling_size;
            let loop_end = info.end_block * SAMPLES_PER_BLOCK * sampling_size;
            inner.write_le_u32(loop_start)?;
            inner.write_le_u32(loop_end)?;
            inner.write_le_u32(0)?; // loopFraction
            let play_count = if info.loop_r01 == 0x80 {
                0
            } else {
                info.loop_r01 as u32
            };
            inner.write_le_u32(play_count)?;
        }

        if let (Some(comment), Some(note_size)) = (&plan.comment, plan.note_size()) {
            inner.write_all(b"note")?;
            inner.write_le_u32(note_size)?;
            inner.write_le_u32(0)?; // dwName
            inner.write_cstring(comment)?;
            let written = 5 + comment.len() as u32;
            for _ in written..note_size {
                inner.write_u8(0)?;
            }
        }

        inner.write_all(b"data")?;
        inner.write_le_u32(plan.data_size())?;

        Ok(WavWriter {
            inner,
            mode: plan.mode,
        })
    }

    /// Writes one channel-interleaved frame of already clamped `[-1, 1]`
    /// samples, converting to the configured output format.
    pub fn write_frame(&mut self, samples: &[f32]) -> Result<()> {
        for &s in samples {
            match self.mode {
                SampleMode::Float32 => self.inner.write_le_f32(s)?,
                SampleMode::U8 => {
                    let v = (s * 127.0).round() as i32 + 128;
                    self.inner.write_u8(v.clamp(0, 255) as u8)?;
                }
                SampleMode::I16 => {
                    let v = (s * 32767.0).round() as i32;
                    self.inner.write_le_i16(v.clamp(i16::MIN as i32, i16::MAX as i32) as i16)?;
                }
                SampleMode::I24 => {
                    let v = (s * 8_388_607.0).round() as i32;
                    let v = v.clamp(-8_388_608, 8_388_607);
                    let bytes = v.to_le_bytes();
                    self.inner.write_all(&bytes[..3])?;
                }
                SampleMode::I32 => {
                    let v = s as f64 * 2_147_483_647.0;
                    self.inner.write_le_i32(v.round().clamp(i32::MIN as f64, i32::MAX as f64) as i32)?;
                }
            }
        }
        Ok(())
    }

    /// Consumes the writer, returning the underlying sink.
    pub fn into_inner(self) -> W {
        self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan(mode: SampleMode) -> WavPlan {
        WavPlan {
            channel_count: 1,
            sampling_rate: 44100,
            mode,
            block_count: 1,
            loop_info: None,
            loop_region: None,
            loop_repeat: 0,
            comment: None,
        }
    }

    #[test]
    fn writes_riff_wave_tags() {
        let buf: Vec<u8> = Vec::new();
        let w = WavWriter::new(buf, &plan(SampleMode::I16)).unwrap();
        let out = w.into_inner();
        assert_eq!(&out[0..4], b"RIFF");
        assert_eq!(&out[8..12], b"WAVE");
        assert_eq!(&out[12..16], b"fmt ");
    }

    #[test]
    fn mode_8_bit_silence_is_0x80() {
        let mut w = WavWriter::new(Vec::new(), &plan(SampleMode::U8)).unwrap();
        w.write_frame(&[0.0, 0.0, 0.0]).unwrap();
        let out = w.into_inner();
        assert!(out[out.len() - 3..].iter().all(|&b| b == 0x80));
    }

    #[test]
    fn mode_24_bit_full_scale_is_ff_ff_7f() {
        let mut w = WavWriter::new(Vec::new(), &plan(SampleMode::I24)).unwrap();
        w.write_frame(&[1.0]).unwrap();
        let out = w.into_inner();
        let tail = &out[out.len() - 3..];
        assert_eq!(tail, &[0xFF, 0xFF, 0x7F]);
    }

    #[test]
    fn loop_play_count_0x80_becomes_zero() {
        let mut p = plan(SampleMode::I16);
        p.loop_info = Some(LoopInfo {
            start_block: 3,
            end_block: 7,
            loop_r01: 0x80,
        });
        p.loop_repeat = 0;
        let w = WavWriter::new(Vec::new(), &p).unwrap();
        let out = w.into_inner();
        let smpl_pos = out.windows(4).position(|w| w == b"smpl").unwrap();
        // 16 fields (tag through loopFraction) precede loopPlayCount.
        let play_count_pos = smpl_pos + 16 * 4;
        let bytes = &out[play_count_pos..play_count_pos + 4];
        assert_eq!(u32::from_le_bytes(bytes.try_into().unwrap()), 0);
    }

    #[test]
    fn loop_play_count_explicit_value_is_kept() {
        let mut p = plan(SampleMode::I16);
        p.loop_info = Some(LoopInfo {
            start_block: 3,
            end_block: 7,
            loop_r01: 5,
        });
        p.loop_repeat = 0;
        let w = WavWriter::new(Vec::new(), &p).unwrap();
        let out = w.into_inner();
        let smpl_pos = out.windows(4).position(|w| w == b"smpl").unwrap();
        let play_count_pos = smpl_pos + 16 * 4;
        let bytes = &out[play_count_pos..play_count_pos + 4];
        assert_eq!(u32::from_le_bytes(bytes.try_into().unwrap()), 5);
    }
}
