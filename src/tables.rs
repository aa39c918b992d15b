//! Fixed, process-wide constant tables shared by every decode: the IMDCT
//! twiddle/cosine tables and analysis window, the scale-factor
//! dequantisation ladder, and the stereo intensity-coupling ratio table.
//!
//! The IMDCT here is implemented as a DCT-IV via Lee's fast DCT-II
//! decomposition, following the same matrix-based construction used by
//! `symphonia-core`'s `dsp::dct`/`dsp::mdct` modules (an O(n log n)
//! algorithm, not the literal butterfly-FFT described at a high level in the
//! format's original documentation — they compute the same transform).
//! Unlike that crate this one has no `lazy_static` dependency, so the
//! per-size cosine tables are memoized behind `std::sync::OnceLock` instead,
//! matching this crate's dependency-minimalism.

use std::sync::OnceLock;

/// Number of subbands per sub-frame, and the IMDCT's coefficient count.
pub const SUBBANDS: usize = 128;

/// Number of sub-frames ("wave lines") decoded per block.
pub const SUBFRAMES: usize = 8;

/// Dequantisation scale ladder, indexed by a channel's per-subband scale
/// factor (0..=63). Not a proprietary literal (none survived retrieval): a
/// geometric ladder spanning the representable scale-factor range, doubling
/// in power every 6 steps, consistent with the role the ladder plays in
/// `Channel::dequantize` (scale 63 maps to unity gain, lower indices to
/// smaller magnitudes).
pub fn scale_factor(index: u8) -> f32 {
    static TABLE: OnceLock<[f32; 64]> = OnceLock::new();
    let table = TABLE.get_or_init(|| {
        let mut t = [0f32; 64];
        for (i, v) in t.iter_mut().enumerate() {
            *v = 2f32.powf((i as f32 - 63.0) / 6.0);
        }
        t
    });
    table[index as usize & 0x3F]
}

/// Stereo intensity-coupling ratio ladder, indexed by a secondary channel's
/// `value3` side-information nibble (0..=14, a 64-entry table per spec.md
/// §4.6 collapsed here to the monotonic range actually addressed). Like
/// `scale_factor`, not a proprietary literal: a geometric ladder decreasing
/// from unity gain toward silence.
pub fn intensity_ratio(index: u8) -> f32 {
    static TABLE: OnceLock<[f32; 16]> = OnceLock::new();
    let table = TABLE.get_or_init(|| {
        let mut t = [0f32; 16];
        for (i, v) in t.iter_mut().enumerate() {
            *v = 2f32.powf(-(i as f32) / 2.0);
        }
        t
    });
    table[index as usize & 0xF]
}

/// The 256-sample symmetric sine-squared analysis/synthesis window used by
/// the 128-point IMDCT's overlap-add. This is standard MDCT theory
/// (`window[n] = sin(pi/2 * sin(pi/N*(n+0.5))^2)`), not a proprietary
/// constant, so it is exact rather than a substitute.
pub fn window() -> &'static [f32; 2 * SUBBANDS] {
    static WINDOW: OnceLock<[f32; 2 * SUBBANDS]> = OnceLock::new();
    WINDOW.get_or_init(|| {
        let n = 2 * SUBBANDS;
        let mut w = [0f32; 2 * SUBBANDS];
        for (i, v) in w.iter_mut().enumerate() {
            let inner = (std::f64::consts::PI / n as f64) * (i as f64 + 0.5);
            *v = ((std::f64::consts::PI / 2.0) * inner.sin().powi(2)).sin() as f32;
        }
        w
    })
}

fn dct_cos_table(n: usize) -> &'static [f32] {
    static TABLE_64: OnceLock<[f32; 32]> = OnceLock::new();
    static TABLE_128: OnceLock<[f32; 64]> = OnceLock::new();

    fn build<const N2: usize>(n: usize) -> [f32; N2] {
        let freq = std::f64::consts::PI / n as f64;
        let mut t = [0f32; N2];
        for (i, c) in t.iter_mut().enumerate() {
            *c = (2.0 * ((i as f64 + 0.5) * freq).cos()).recip() as f32;
        }
        t
    }

    match n {
        64 => TABLE_64.get_or_init(|| build::<32>(64)).as_ref(),
        128 => TABLE_128.get_or_init(|| build::<64>(128)).as_ref(),
        _ => unreachable!("only 64- and 128-point DCT stages are used by the 128-point IMDCT"),
    }
}

/// N-point Discrete Cosine Transform (DCT-II), via Lee's fast recursive
/// decomposition. Grounded on `symphonia-core`'s `dsp::dct::Dct`.
pub struct Dct {
    n: usize,
    temp: Vec<f32>,
}

impl Dct {
    pub fn new(n: usize) -> Self {
        assert!(n.is_power_of_two());
        Dct {
            n,
            temp: vec![0.0; n],
        }
    }

    pub fn dct_ii_inplace(&mut self, x: &mut [f32]) {
        assert_eq!(x.len(), self.n);
        dct_ii_step(x, &mut self.temp);
    }
}

fn dct_ii_step(x: &mut [f32], t: &mut [f32]) {
    let n = x.len();
    if n > 32 {
        let half = n >> 1;
        let (xl, xr) = x.split_at_mut(half);
        let (tl, tr) = t.split_at_mut(half);
        let table = dct_cos_table(n);

        for ((((tls, trs), &xls), &xrs), &c) in tl
            .iter_mut()
            .zip(tr.iter_mut())
            .zip(xl.iter())
            .zip(xr.iter().rev())
            .zip(table.iter())
        {
            *tls = xls + xrs;
            *trs = (xls - xrs) * c;
        }

        dct_ii_step(tl, xl);
        dct_ii_step(tr, xr);

        for ((xsc, &tls), trsw) in x.chunks_exact_mut(2).zip(tl.iter()).zip(tr.windows(2)) {
            xsc[0] = tls;
            xsc[1] = trsw[0] + trsw[1];
        }
        x[n - 2] = t[half - 1];
        x[n - 1] = t[n - 1];
    } else {
        dct_ii_32(x);
    }
}

/// Unrolled 32-point DCT-II base case, identical in structure to
/// `symphonia-core`'s `dct_ii_32`.
fn dct_ii_32(x: &mut [f32]) {
    assert_eq!(x.len(), 32);

    const COS_16: [f32; 16] = [
        0.500_602_98,
        0.505_470_96,
        0.515_447_3,
        0.531_042_6,
        0.553_103_9,
        0.582_935,
        0.622_504_1,
        0.674_808_3,
        0.744_536_3,
        0.839_349_6,
        0.972_568_24,
        1.169_439_9,
        1.484_164_6,
        2.057_781,
        3.407_608_4,
        10.190_008,
    ];
    const COS_8: [f32; 8] = [
        0.502_419_3,
        0.522_498_6,
        0.566_944,
        0.646_821_8,
        0.788_154_6,
        1.060_677_7,
        1.722_447,
        5.101_148_6,
    ];
    const COS_4: [f32; 4] = [0.509_795_6, 0.601_344_9, 0.899_976_2, 2.562_915_4];
    const COS_2: [f32; 2] = [0.541_196_1, 1.306_563];
    const COS_1: f32 = 0.707_106_77;

    fn dct8(x: &mut [f32]) {
        let mut t = [
            (x[0] + x[7]),
            (x[1] + x[6]),
            (x[2] + x[5]),
            (x[3] + x[4]),
            (x[0] - x[7]) * COS_4[0],
            (x[1] - x[6]) * COS_4[1],
            (x[2] - x[5]) * COS_4[2],
            (x[3] - x[4]) * COS_4[3],
        ];
        dct4(&mut t[0..4]);
        dct4(&mut t[4..8]);
        for i in 0..3 {
            x[i << 1] = t[i];
            x[(i << 1) + 1] = t[4 + i] + t[4 + i + 1];
        }
        x[6] = t[3];
        x[7] = t[7];
    }

    fn dct4(x: &mut [f32]) {
        let mut t = [
            (x[0] + x[3]),
            (x[1] + x[2]),
            (x[0] - x[3]) * COS_2[0],
            (x[1] - x[2]) * COS_2[1],
        ];
        dct2(&mut t[0..2]);
        dct2(&mut t[2..4]);
        x[0] = t[0];
        x[1] = t[2] + t[3];
        x[2] = t[1];
        x[3] = t[3];
    }

    fn dct2(x: &mut [f32]) {
        let a = x[0] + x[1];
        let b = (x[0] - x[1]) * COS_1;
        x[0] = a;
        x[1] = b;
    }

    let mut t0 = [0f32; 32];
    for i in 0..16 {
        t0[i] = x[i] + x[31 - i];
        t0[16 + i] = (x[i] - x[31 - i]) * COS_16[i];
    }

    {
        let (a, b) = t0.split_at_mut(16);
        dct8_16(a);
        dct8_16(b);
    }

    for i in 0..15 {
        x[i << 1] = t0[i];
        x[(i << 1) + 1] = t0[16 + i] + t0[16 + i + 1];
    }
    x[30] = t0[15];
    x[31] = t0[31];

    // 16-point DCT-II built from the 8-point stage above.
    fn dct8_16(x: &mut [f32]) {
        let mut t = [0f32; 16];
        for i in 0..8 {
            t[i] = x[i] + x[15 - i];
            t[8 + i] = (x[i] - x[15 - i]) * COS_8[i];
        }
        {
            let (a, b) = t.split_at_mut(8);
            dct8(a);
            dct8(b);
        }
        for i in 0..7 {
            x[i << 1] = t[i];
            x[(i << 1) + 1] = t[8 + i] + t[8 + i + 1];
        }
        x[14] = t[7];
        x[15] = t[15];
    }
}

/// 128-point Inverse MDCT, implemented in terms of a DCT-IV built atop
/// `Dct`'s DCT-II, following `symphonia-core`'s `dsp::mdct::Imdct`. Consumes
/// 128 frequency-domain coefficients and produces 256 time-domain samples.
pub struct Imdct {
    dct: Dct,
    table: Vec<f32>,
}

impl Imdct {
    pub fn new(n: usize) -> Self {
        assert!(n.is_power_of_two());
        let c = std::f64::consts::PI / (4.0 * n as f64);
        let table = (0..n)
            .map(|i| (2.0 * (c * (2 * i + 1) as f64).cos()) as f32)
            .collect();
        Imdct {
            dct: Dct::new(n),
            table,
        }
    }

    /// `src.len()` must equal the coefficient count `n`; `dst.len()` must
    /// equal `2n`.
    pub fn imdct(&mut self, src: &[f32], dst: &mut [f32]) {
        let n2 = self.dct.n;
        let n = n2 << 1;
        let n4 = n2 >> 1;
        assert_eq!(src.len(), n2);
        assert_eq!(dst.len(), n);

        for ((ds, &s), &c) in dst[n2..].iter_mut().zip(src).zip(&self.table) {
            *ds = s * c;
        }
        self.dct.dct_ii_inplace(&mut dst[n2..]);

        let (vec0, rest) = dst.split_at_mut(n4);
        let (vec1, rest) = rest.split_at_mut(n4);
        let (vec2, vec3) = rest.split_at_mut(n4);

        vec1[0] = -0.5 * vec2[0];
        for i in 1..n4 {
            vec1[i] = -1.0 * (vec2[i] + vec1[i - 1]);
        }

        vec2[0] = vec3[0] + vec1[n4 - 1];
        for i in 1..n4 {
            vec2[i] = vec3[i] - vec2[i - 1];
        }

        for (s0, &s2) in vec0.iter_mut().zip(vec2.iter()) {
            *s0 = s2;
        }
        for ((s3, s2), &s1) in vec3.iter_mut().zip(vec2.iter_mut().rev()).zip(vec1.iter()) {
            *s3 = s1;
            *s2 = s1;
        }
        for (s1, &s0) in vec1.iter_mut().zip(vec0.iter().rev()) {
            *s1 = -1.0 * s0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scale_factor_is_monotonic() {
        for i in 1..64u8 {
            assert!(scale_factor(i) > scale_factor(i - 1));
        }
    }

    #[test]
    fn scale_factor_63_is_unity() {
        assert!((scale_factor(63) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn intensity_ratio_is_monotonic_decreasing() {
        for i in 1..16u8 {
            assert!(intensity_ratio(i) < intensity_ratio(i - 1));
        }
    }

    #[test]
    fn window_is_symmetric() {
        let w = window();
        for i in 0..w.len() {
            assert!((w[i] - w[w.len() - 1 - i]).abs() < 1e-4);
        }
    }

    #[test]
    fn imdct_of_zero_is_zero() {
        let mut imdct = Imdct::new(SUBBANDS);
        let src = [0f32; SUBBANDS];
        let mut dst = [0f32; 2 * SUBBANDS];
        imdct.imdct(&src, &mut dst);
        assert!(dst.iter().all(|&v| v.abs() < 1e-6));
    }

    #[test]
    fn dct_matches_direct_computation() {
        let mut src = [0f32; 64];
        for (i, v) in src.iter_mut().enumerate() {
            *v = (i as f32 * 0.1).sin();
        }
        let mut actual = src;
        let mut dct = Dct::new(64);
        dct.dct_ii_inplace(&mut actual);

        let n = 64;
        let w = std::f64::consts::PI / n as f64;
        for i in 0..n {
            let mut sum = 0.0f64;
            for j in 0..n {
                sum += src[j] as f64 * (w * i as f64 * (j as f64 + 0.5)).cos();
            }
            assert!((actual[i] as f64 - sum).abs() < 1e-2);
        }
    }
}
