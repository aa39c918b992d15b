//! Byte-level read/write helpers, extending `io::Read`/`io::Write`.
//!
//! The HCA header is big-endian tagged chunks; the WAV output it is decoded
//! into is little-endian. Both directions are covered here so callers never
//! reach for raw `u8::from_be_bytes` plumbing.

use std::cmp;
use std::io as stdio;

/// Extends the functionality of `io::Read` with fixed-width integer helpers.
pub trait ReadBuffer {
    /// Reads as many bytes as `buf` is long.
    fn read_into(&mut self, buf: &mut [u8]) -> stdio::Result<()>;

    /// Reads `n` bytes and returns them in a vector.
    fn read_bytes(&mut self, n: usize) -> stdio::Result<Vec<u8>>;

    /// Skips over `n` bytes.
    fn skip_bytes(&mut self, n: usize) -> stdio::Result<()>;

    /// Reads a single byte.
    fn read_u8(&mut self) -> stdio::Result<u8>;

    /// Reads a big-endian 16-bit unsigned integer.
    fn read_be_u16(&mut self) -> stdio::Result<u16>;

    /// Reads a big-endian 32-bit unsigned integer.
    fn read_be_u32(&mut self) -> stdio::Result<u32>;

    /// Reads a big-endian 32-bit IEEE float.
    #[inline(always)]
    fn read_be_f32(&mut self) -> stdio::Result<f32> {
        self.read_be_u32().map(f32::from_bits)
    }

    /// Reads a NUL-terminated string, consuming the terminator.
    fn read_cstring(&mut self) -> stdio::Result<String>;
}

impl<R: stdio::Read> ReadBuffer for R {
    #[inline(always)]
    fn read_into(&mut self, buf: &mut [u8]) -> stdio::Result<()> {
        let mut n = 0;
        while n < buf.len() {
            let progress = self.read(&mut buf[n..])?;
            if progress > 0 {
                n += progress;
            } else {
                return Err(stdio::Error::new(
                    stdio::ErrorKind::UnexpectedEof,
                    "failed to read enough bytes",
                ));
            }
        }
        Ok(())
    }

    #[inline(always)]
    fn read_bytes(&mut self, n: usize) -> stdio::Result<Vec<u8>> {
        let mut buf = vec![0u8; n];
        self.read_into(&mut buf)?;
        Ok(buf)
    }

    #[inline(always)]
    fn skip_bytes(&mut self, n: usize) -> stdio::Result<()> {
        let mut n_read = 0;
        let mut buf = [0u8; 1024];
        while n_read < n {
            let end = cmp::min(n - n_read, 1024);
            let progress = self.read(&mut buf[0..end])?;
            if progress > 0 {
                n_read += progress;
            } else {
                return Err(stdio::Error::new(
                    stdio::ErrorKind::UnexpectedEof,
                    "failed to read enough bytes",
                ));
            }
        }
        Ok(())
    }

    #[inline(always)]
    fn read_u8(&mut self) -> stdio::Result<u8> {
        let mut buf = [0u8; 1];
        self.read_into(&mut buf)?;
        Ok(buf[0])
    }

    #[inline(always)]
    fn read_be_u16(&mut self) -> stdio::Result<u16> {
        let mut buf = [0u8; 2];
        self.read_into(&mut buf)?;
        Ok(u16::from_be_bytes(buf))
    }

    #[inline(always)]
    fn read_be_u32(&mut self) -> stdio::Result<u32> {
        let mut buf = [0u8; 4];
        self.read_into(&mut buf)?;
        Ok(u32::from_be_bytes(buf))
    }

    fn read_cstring(&mut self) -> stdio::Result<String> {
        let mut bytes = Vec::new();
        loop {
            let b = self.read_u8()?;
            if b == 0 {
                break;
            }
            bytes.push(b);
        }
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

/// Extends the functionality of `io::Write` with fixed-width integer helpers.
pub trait WriteBuffer: stdio::Write {
    /// Writes a single byte.
    fn write_u8(&mut self, x: u8) -> stdio::Result<()>;

    /// Writes an unsigned 16-bit integer in little-endian format.
    fn write_le_u16(&mut self, x: u16) -> stdio::Result<()>;

    /// Writes a signed 16-bit integer in little-endian format.
    fn write_le_i16(&mut self, x: i16) -> stdio::Result<()>;

    /// Writes an unsigned 32-bit integer in little-endian format.
    fn write_le_u32(&mut self, x: u32) -> stdio::Result<()>;

    /// Writes a signed 32-bit integer in little-endian format.
    fn write_le_i32(&mut self, x: i32) -> stdio::Result<()>;

    /// Writes an IEEE float in little-endian format.
    fn write_le_f32(&mut self, x: f32) -> stdio::Result<()>;

    /// Writes a NUL-terminated string, including the terminator.
    fn write_cstring(&mut self, s: &str) -> stdio::Result<()>;
}

impl<W: stdio::Write> WriteBuffer for W {
    #[inline(always)]
    fn write_u8(&mut self, x: u8) -> stdio::Result<()> {
        self.write_all(&[x])
    }

    #[inline(always)]
    fn write_le_u16(&mut self, x: u16) -> stdio::Result<()> {
        self.write_all(&x.to_le_bytes())
    }

    #[inline(always)]
    fn write_le_i16(&mut self, x: i16) -> stdio::Result<()> {
        self.write_le_u16(x as u16)
    }

    #[inline(always)]
    fn write_le_u32(&mut self, x: u32) -> stdio::Result<()> {
        self.write_all(&x.to_le_bytes())
    }

    #[inline(always)]
    fn write_le_i32(&mut self, x: i32) -> stdio::Result<()> {
        self.write_le_u32(x as u32)
    }

    #[inline(always)]
    fn write_le_f32(&mut self, x: f32) -> stdio::Result<()> {
        self.write_le_u32(x.to_bits())
    }

    fn write_cstring(&mut self, s: &str) -> stdio::Result<()> {
        self.write_all(s.as_bytes())?;
        self.write_u8(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn round_trips_be_u32() {
        let mut buf = Vec::new();
        buf.write_le_u32(0x1234_5678).unwrap();
        let mut cur = Cursor::new(vec![0x12, 0x34, 0x56, 0x78]);
        assert_eq!(cur.read_be_u32().unwrap(), 0x1234_5678);
        assert_eq!(buf, vec![0x78, 0x56, 0x34, 0x12]);
    }

    #[test]
    fn reads_cstring_up_to_nul() {
        let mut cur = Cursor::new(b"hi\0trailing".to_vec());
        assert_eq!(cur.read_cstring().unwrap(), "hi");
    }

    #[test]
    fn skip_bytes_advances_past_n() {
        let mut cur = Cursor::new(vec![1, 2, 3, 4, 5]);
        cur.skip_bytes(3).unwrap();
        assert_eq!(cur.read_u8().unwrap(), 4);
    }
}
