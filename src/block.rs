//! Per-block orchestration: CRC verify → cipher unmask → bitstream → per
//! channel Stage A/B.
//!
//! Grounded on Go `hca/hca_decode.go`'s `decode(data []byte) bool`: CRC
//! check over the raw (still ciphered) bytes, cipher unmask, the
//! `0xFFFF` magic-word gate (anything else is a silent block — a no-op,
//! not an error), the `a = (9-bit << 8) - 7-bit` block-wide amplitude
//! reference, then per-channel `Init`, and eight `waveLine` iterations of
//! `Decode2`(fetch, all channels)/`Decode3`(dequantise, all channels)/
//! `Decode4`(couple, pairwise)/`Decode5`(`CalcBlock`+`buildWaveBytes`) — the
//! same call order the unused `channel_decoder.go` path corroborates. Fetch
//! and dequantise are each a full pass over every channel, not fused into
//! one per-channel loop: both stages read off the same sequential
//! `BitReader`, so the bit order only matches the encoder if every
//! channel's fetch happens before any channel's dequantise.

use crate::ath::Ath;
use crate::channel::{Channel, ChannelType};
use crate::cipher::Cipher;
use crate::crc;
use crate::errors;
use crate::header::DecoderConfig;
use crate::tables::{Imdct, SUBFRAMES};
use crate::Result;

const MAGIC: u32 = 0xFFFF;

/// Decodes one `blockSize`-byte block in place into `channels`' `wave`
/// buffers. Returns `Ok(true)` if the block carried data, `Ok(false)` if it
/// was a silent block (magic mismatch) — channel `wave` buffers are left
/// untouched in that case, which is not an error.
pub fn decode_block(
    data: &mut [u8],
    cfg: &DecoderConfig,
    cipher: &Cipher,
    ath: &Ath,
    channels: &mut [Channel],
    imdct: &mut Imdct,
) -> Result<bool> {
    if !crc::verify(data) {
        tracing::warn!(len = data.len(), "block failed CRC verification");
        return errors::block_error("CRC mismatch");
    }

    cipher.mask_in_place(data);

    let mut bits = crate::bitstream::BitReader::new(data);
    let magic = bits.read(16);
    if magic != MAGIC {
        tracing::trace!(magic, "silent block (magic mismatch)");
        return Ok(false);
    }

    let a = ((bits.read(9) as i32) << 8) - bits.read(7) as i32;

    for ch in channels.iter_mut() {
        ch.init(&mut bits, a, ath);
    }

    for wave_line in 0..SUBFRAMES {
        for ch in channels.iter_mut() {
            ch.fetch(&mut bits);
        }
        for ch in channels.iter_mut() {
            ch.dequantize(&mut bits, cfg);
        }

        for i in 0..channels.len().saturating_sub(1) {
            let (left, right) = channels.split_at_mut(i + 1);
            let primary = &left[i];
            if primary.ch_type == ChannelType::Primary {
                if let Some(secondary) = right.first_mut() {
                    primary.couple_into(secondary, wave_line, cfg);
                }
            }
        }

        for ch in channels.iter_mut() {
            ch.calc_block(imdct);
            ch.emit(wave_line);
        }
    }

    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tables::SUBBANDS;

    fn test_config() -> DecoderConfig {
        let mut cfg = DecoderConfig::default();
        cfg.channel_count = 1;
        cfg.comp_r01 = 1;
        cfg.comp_r02 = 15;
        cfg.comp_r03 = 1;
        cfg.comp_r05 = 64;
        cfg.comp_r06 = 64;
        cfg.comp_r07 = 0;
        cfg.comp_r08 = 0;
        cfg
    }

    fn crc_terminated(mut payload: Vec<u8>) -> Vec<u8> {
        let residue = crc::compute(&payload, 0);
        payload.extend_from_slice(&residue.to_be_bytes());
        payload
    }

    #[test]
    fn silent_block_returns_false_and_leaves_wave_zero() {
        let cfg = test_config();
        let cipher = Cipher::new(0, 1, 1).unwrap();
        let ath = Ath::new(0, 44100).unwrap();
        let mut channels = vec![Channel::new(ChannelType::Discrete, &cfg)];
        let mut imdct = Imdct::new(SUBBANDS);

        // All-zero payload: magic bits read as 0x0000, not 0xFFFF.
        let mut data = crc_terminated(vec![0u8; 64]);
        let decoded = decode_block(&mut data, &cfg, &cipher, &ath, &mut channels, &mut imdct).unwrap();
        assert!(!decoded);
        assert!(channels[0].wave().iter().flatten().all(|&s| s == 0.0));
    }

    #[test]
    fn bad_crc_is_a_block_error() {
        let cfg = test_config();
        let cipher = Cipher::new(0, 1, 1).unwrap();
        let ath = Ath::new(0, 44100).unwrap();
        let mut channels = vec![Channel::new(ChannelType::Discrete, &cfg)];
        let mut imdct = Imdct::new(SUBBANDS);

        let mut data = vec![0u8; 64];
        data[62] = 0xAB; // corrupt the stored CRC
        data[63] = 0xCD;
        assert!(decode_block(&mut data, &cfg, &cipher, &ath, &mut channels, &mut imdct).is_err());
    }

    #[test]
    fn magic_block_decodes_without_panicking() {
        let cfg = test_config();
        let cipher = Cipher::new(0, 1, 1).unwrap();
        let ath = Ath::new(0, 44100).unwrap();
        let mut channels = vec![Channel::new(ChannelType::Discrete, &cfg)];
        let mut imdct = Imdct::new(SUBBANDS);

        let mut payload = vec![0u8; 62];
        payload[0] = 0xFF;
        payload[1] = 0xFF; // magic == 0xFFFF in the first 16 bits
        let mut data = crc_terminated(payload);
        let decoded = decode_block(&mut data, &cfg, &cipher, &ath, &mut channels, &mut imdct).unwrap();
        assert!(decoded);
    }
}
