//! Whole-file decode driver: header → channel setup → WAV header → block
//! loop with loop-region expansion.
//!
//! Grounded on Go `hca/hca_decode.go`'s `decodeBuffer`/
//! `decodeFromBytesDecode`/`buildWaveHeader`: header load, then a WAV header
//! sized for the full block count plus any loop expansion, then either a
//! single `[0, blockCount)` pass (`Loop == 0`) or `[0, loopEnd)` followed by
//! `Loop - 1` repeats of `[loopStart, loopEnd)` and one final
//! `[loopStart, blockCount)` pass. Each block's samples are scaled by
//! `rvaVolume * Volume` and clamped to `[-1, 1]` before being handed to the
//! `wav` writer. `Decoder` mirrors the Go `Hca` struct's public builder
//! fields (`CiphKey1`/`CiphKey2`/`Mode`/`Loop`/`Volume`).

use std::io::{Read, Seek, SeekFrom};

use crate::ath::Ath;
use crate::channel::{self, Channel};
use crate::cipher::Cipher;
use crate::header::DecoderConfig;
use crate::io::ReadBuffer;
use crate::tables::{Imdct, SUBBANDS, SUBFRAMES};
use crate::wav::{LoopInfo, SampleMode, WavPlan, WavWriter};
use crate::Result;

/// A builder-initialised, single-use decoder: configure with the setter
/// methods, then consume it with [`Decoder::decode`].
pub struct Decoder {
    ciph_key1: u32,
    ciph_key2: u32,
    mode: SampleMode,
    loop_count: u32,
    volume: f32,
}

impl Default for Decoder {
    fn default() -> Self {
        Decoder {
            ciph_key1: 0,
            ciph_key2: 0,
            mode: SampleMode::I16,
            loop_count: 0,
            volume: 1.0,
        }
    }
}

impl Decoder {
    pub fn new() -> Self {
        Decoder::default()
    }

    /// Sets the cipher keys used for `ciphType == 0x38`. A zero key pair
    /// demotes the effective cipher type to identity regardless of the
    /// header's requested type.
    pub fn cipher_keys(mut self, key1: u32, key2: u32) -> Self {
        self.ciph_key1 = key1;
        self.ciph_key2 = key2;
        self
    }

    /// Sets the output sample format.
    pub fn mode(mut self, mode: SampleMode) -> Self {
        self.mode = mode;
        self
    }

    /// Sets how many times the loop region replays (`0` = play it once,
    /// in-line, as ordinary data; no `smpl` chunk is emitted in that case).
    pub fn loop_count(mut self, loop_count: u32) -> Self {
        self.loop_count = loop_count;
        self
    }

    /// Sets the output volume multiplier, combined with the header's
    /// `rvaVolume` before clamping.
    pub fn volume(mut self, volume: f32) -> Self {
        self.volume = volume;
        self
    }

    /// Decodes `input` into `output` as a WAV file. On any error, no
    /// assumption is made about how much of `output` was written — callers
    /// that write to a file should use a temporary sink and promote it only
    /// on success (see `src/bin/hca_decode.rs`).
    pub fn decode<R: Read + Seek, W: std::io::Write>(&self, mut input: R, output: W) -> Result<()> {
        let cfg = DecoderConfig::parse(&mut input)?;
        input.seek(SeekFrom::Start(cfg.data_offset as u64))?;

        let ath = Ath::new(cfg.ath_type, cfg.sampling_rate)?;
        let cipher = Cipher::new(cfg.ciph_type, self.ciph_key1, self.ciph_key2)?;

        let types = channel::assign_channel_types(
            cfg.channel_count as usize,
            cfg.comp_r03 as usize,
            cfg.comp_r04 as usize,
            cfg.comp_r07 as usize,
        );
        let mut channels: Vec<Channel> = types
            .iter()
            .map(|&t| Channel::new(t, &cfg))
            .collect();
        let mut imdct = Imdct::new(SUBBANDS);

        let loop_info = if cfg.loop_flag {
            Some(LoopInfo {
                start_block: cfg.loop_start,
                end_block: cfg.loop_end,
                loop_r01: cfg.loop_r01,
            })
        } else {
            None
        };
        // Go `hca.go:120-136`: a real `loop` chunk supplies `(loopStart,
        // loopEnd)`; a caller-requested repeat on a file without one falls
        // back to replaying the whole file, `(0, blockCount)`.
        let loop_region = if cfg.loop_flag {
            Some((cfg.loop_start, cfg.loop_end))
        } else if self.loop_count > 0 {
            Some((0, cfg.block_count))
        } else {
            None
        };
        let plan = WavPlan {
            channel_count: cfg.channel_count as u16,
            sampling_rate: cfg.sampling_rate,
            mode: self.mode,
            block_count: cfg.block_count,
            loop_info,
            loop_region,
            loop_repeat: self.loop_count,
            comment: if cfg.comm_len > 0 {
                Some(cfg.comm_comment.clone())
            } else {
                None
            },
        };

        let mut writer = WavWriter::new(output, &plan)?;
        let rva_volume = cfg.rva_volume * self.volume;

        let mut block_buf = vec![0u8; cfg.block_size as usize];
        let mut frame = vec![0f32; cfg.channel_count as usize];

        let mut decode_range = |input: &mut R, start_block: u32, count: u32| -> Result<()> {
            let byte_offset = cfg.data_offset as u64 + start_block as u64 * cfg.block_size as u64;
            input.seek(SeekFrom::Start(byte_offset))?;
            for _ in 0..count {
                input.read_into(&mut block_buf)?;
                let decoded = crate::block::decode_block(
                    &mut block_buf,
                    &cfg,
                    &cipher,
                    &ath,
                    &mut channels,
                    &mut imdct,
                )?;
                if decoded {
                    emit_block(&channels, rva_volume, &mut frame, &mut writer)?;
                } else {
                    emit_silence(cfg.channel_count as usize, &mut writer)?;
                }
            }
            Ok(())
        };

        if self.loop_count == 0 {
            decode_range(&mut input, 0, cfg.block_count)?;
        } else {
            let (loop_start, loop_end) = loop_region.expect("loop_count > 0 implies loop_region");
            decode_range(&mut input, 0, loop_end)?;
            for _ in 1..self.loop_count {
                decode_range(&mut input, loop_start, loop_end - loop_start)?;
            }
            decode_range(&mut input, loop_start, cfg.block_count - loop_start)?;
        }

        tracing::info!(blocks = cfg.block_count, loops = self.loop_count, "decode complete");
        Ok(())
    }
}

fn emit_block<W: std::io::Write>(
    channels: &[Channel],
    rva_volume: f32,
    frame: &mut [f32],
    writer: &mut WavWriter<W>,
) -> Result<()> {
    for sub_frame in 0..SUBFRAMES {
        for sample_idx in 0..SUBBANDS {
            for (k, ch) in channels.iter().enumerate() {
                let s = ch.wave()[sub_frame][sample_idx] * rva_volume;
                frame[k] = s.clamp(-1.0, 1.0);
            }
            writer.write_frame(frame)?;
        }
    }
    Ok(())
}

fn emit_silence<W: std::io::Write>(channel_count: usize, writer: &mut WavWriter<W>) -> Result<()> {
    let frame = vec![0f32; channel_count];
    for _ in 0..(SUBFRAMES * SUBBANDS) {
        writer.write_frame(&frame)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn header_with_one_silent_block(ciph_type: Option<u16>) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(b"HCA\0");
        buf.extend_from_slice(&0x0200u16.to_be_bytes());
        buf.extend_from_slice(&0u16.to_be_bytes()); // dataOffset placeholder

        buf.extend_from_slice(b"fmt\0");
        let packed: u32 = (1u32 << 24) | 44100;
        buf.extend_from_slice(&packed.to_be_bytes());
        buf.extend_from_slice(&1u32.to_be_bytes()); // blockCount
        buf.extend_from_slice(&0u16.to_be_bytes());
        buf.extend_from_slice(&0u16.to_be_bytes());

        buf.extend_from_slice(b"comp");
        buf.extend_from_slice(&0x0400u16.to_be_bytes()); // blockSize
        buf.extend_from_slice(&[1, 15, 1, 0, 64, 64, 0, 0, 0, 0]);

        if let Some(t) = ciph_type {
            buf.extend_from_slice(b"ciph");
            buf.extend_from_slice(&t.to_be_bytes());
        }

        let data_offset = (buf.len() + 2) as u16;
        buf[6..8].copy_from_slice(&data_offset.to_be_bytes());
        let header_crc = crate::crc::compute(&buf, 0);
        buf.extend_from_slice(&header_crc.to_be_bytes());

        let mut block = vec![0u8; 0x3FE];
        let residue = crate::crc::compute(&block, 0);
        block.extend_from_slice(&residue.to_be_bytes());
        buf.extend_from_slice(&block);

        buf
    }

    #[test]
    fn one_block_one_channel_silent_block_decodes() {
        let bytes = header_with_one_silent_block(None);
        let decoder = Decoder::new();
        let mut out = Vec::new();
        decoder
            .decode(Cursor::new(bytes), &mut out)
            .expect("decode should succeed");

        assert_eq!(&out[0..4], b"RIFF");
        let data_pos = out.windows(4).position(|w| w == b"data").unwrap();
        let data_len = u32::from_le_bytes(out[data_pos + 4..data_pos + 8].try_into().unwrap());
        // 1 channel, 16-bit default mode, 1024 samples.
        assert_eq!(data_len, 1024 * 2);
        let samples = &out[data_pos + 8..];
        assert!(samples.iter().all(|&b| b == 0));
    }

    #[test]
    fn zero_key_cipher_38_matches_type_0() {
        // Same header except the requested ciphType: 0x38 with zero keys
        // must demote to identity, matching an explicit ciphType 0 file.
        let keyed_bytes = header_with_one_silent_block(Some(0x38));
        let identity_bytes = header_with_one_silent_block(Some(0));
        let decoder = Decoder::new().cipher_keys(0, 0);

        let mut out_a = Vec::new();
        decoder.decode(Cursor::new(keyed_bytes), &mut out_a).unwrap();
        let mut out_b = Vec::new();
        decoder.decode(Cursor::new(identity_bytes), &mut out_b).unwrap();

        assert_eq!(out_a, out_b);
    }
}
