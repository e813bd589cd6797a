//! Fixed-point cosine table, dot products, Goertzel-style DFT power, and
//! FFT/slow-DFT helpers.
//!
//! Fixed-point conventions (spec invariant I-3.3): phase accumulators are
//! Q16 (`PHASE_BASE = 2^16`), the cosine table is Q14 (`COS_BASE = 2^14`)
//! over 8192 entries indexed by the top 13 bits of the Q16 phase.

use num_complex::Complex64;
use rustfft::FftPlanner;
use std::f64::consts::PI;
use std::sync::OnceLock;

pub const PHASE_BITS: u32 = 16;
pub const PHASE_BASE: i32 = 1 << PHASE_BITS;

pub const COS_BITS: u32 = 14;
pub const COS_BASE: i32 = 1 << COS_BITS;

const COS_TABLE_BITS: u32 = 13;
const COS_TABLE_SIZE: usize = 1 << COS_TABLE_BITS;

static COS_TAB: OnceLock<[i16; COS_TABLE_SIZE]> = OnceLock::new();

fn cos_table() -> &'static [i16; COS_TABLE_SIZE] {
    COS_TAB.get_or_init(|| {
        let mut tab = [0i16; COS_TABLE_SIZE];
        for (i, slot) in tab.iter_mut().enumerate() {
            let angle = 2.0 * PI * i as f64 / COS_TABLE_SIZE as f64;
            *slot = (angle.cos() * COS_BASE as f64).round() as i16;
        }
        tab
    })
}

/// `cos(phase)` for a Q16 phase accumulator, returned in Q14.
pub fn cos_q14(phase: i32) -> i32 {
    let idx = (phase >> (PHASE_BITS - COS_TABLE_BITS)) & (COS_TABLE_SIZE as i32 - 1);
    cos_table()[idx as usize] as i32
}

/// `sin(phase)` via the quarter-wave shift of `cos_q14`.
pub fn sin_q14(phase: i32) -> i32 {
    cos_q14(phase - (PHASE_BASE >> 2))
}

/// Fixed-point dot product of two equal-length Q14 tables, accumulated
/// into `sum`.
pub fn dot_product(a: &[i16], b: &[i16], sum: i32) -> i32 {
    debug_assert_eq!(a.len(), b.len());
    a.iter()
        .zip(b.iter())
        .fold(sum, |acc, (&x, &y)| acc + x as i32 * y as i32)
}

pub fn norm2(a: &[i16], sum: i32) -> i32 {
    a.iter().fold(sum, |acc, &x| acc + x as i32 * x as i32)
}

/// Direct-form DFT power `|sum_n x[n] e^{-j2*pi*k*n/n}|^2`, scaled down by
/// `COS_BITS` as in the source (the recursive Goertzel recurrence is
/// algorithmically equivalent and is skipped in favour of the direct sum
/// the source itself falls back to).
pub fn goertzel_power(cos_tab: &[i16], sin_tab: &[i16], x: &[i16], k: usize, n: usize) -> i64 {
    let mut y_re: i64 = 0;
    let mut y_im: i64 = 0;
    let mut j = 0usize;
    for &sample in x.iter().take(n) {
        y_re += cos_tab[j] as i64 * sample as i64;
        y_im += sin_tab[j] as i64 * sample as i64;
        j += k;
        if j >= n {
            j -= n;
        }
    }
    y_re >>= COS_BITS;
    y_im >>= COS_BITS;
    y_re * y_re + y_im * y_im
}

/// Build the Q14 cos/sin reference tables used by `goertzel_power` for a
/// given block length `n`, one entry per sample index.
pub fn goertzel_tables(n: usize) -> (Vec<i16>, Vec<i16>) {
    let mut cos_tab = vec![0i16; n];
    let mut sin_tab = vec![0i16; n];
    for i in 0..n {
        let angle = 2.0 * PI * i as f64 / n as f64;
        cos_tab[i] = (angle.cos() * COS_BASE as f64).round() as i16;
        sin_tab[i] = (angle.sin() * COS_BASE as f64).round() as i16;
    }
    (cos_tab, sin_tab)
}

/// In-place radix-2 FFT (forward or inverse), normalized by `1/sqrt(n)` to
/// satisfy Parseval's theorem. `n` must be a power of two.
pub fn fft(data: &mut [Complex64], inverse: bool) {
    let n = data.len();
    assert!(n.is_power_of_two(), "fft size {n} is not a power of 2");
    let mut planner = FftPlanner::new();
    let plan = if inverse {
        planner.plan_fft_inverse(n)
    } else {
        planner.plan_fft_forward(n)
    };
    plan.process(data);
    let scale = 1.0 / (n as f64).sqrt();
    for c in data.iter_mut() {
        *c *= scale;
    }
}

/// O(N^2) DFT for arbitrary N, used during filter-table generation and for
/// the V.34 fast-equalizer PP correlation where N need not be a power of
/// two.
pub fn slow_dft(input: &[Complex64], inverse: bool) -> Vec<Complex64> {
    let n = input.len();
    let sign = if inverse { 1.0 } else { -1.0 };
    let mut output = vec![Complex64::new(0.0, 0.0); n];
    for (i, out) in output.iter_mut().enumerate() {
        let mut acc = Complex64::new(0.0, 0.0);
        for (j, &x) in input.iter().enumerate() {
            let angle = sign * 2.0 * PI * (i * j) as f64 / n as f64;
            acc += x * Complex64::new(angle.cos(), angle.sin());
        }
        *out = acc;
    }
    output
}

/// Hamming window of length `n`: `0.54 - 0.46*cos(2*pi*i/n)`.
pub fn hamming_window(n: usize) -> Vec<f64> {
    (0..n)
        .map(|i| 0.54 - 0.46 * (2.0 * PI * i as f64 / n as f64).cos())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// cos_q14 stays within [-COS_BASE, COS_BASE] and is exactly COS_BASE
    /// at phase 0.
    #[test]
    fn cos_bounds() {
        assert_eq!(cos_q14(0), COS_BASE);
        for phase in (0..PHASE_BASE).step_by(97) {
            let v = cos_q14(phase);
            assert!(v >= -COS_BASE && v <= COS_BASE);
        }
    }

    #[test]
    fn cos_quarter_turn_is_near_zero() {
        let v = cos_q14(PHASE_BASE / 4);
        assert!(v.abs() < 50, "cos(pi/2) should be near 0, got {v}");
    }

    #[test]
    fn sin_matches_shifted_cos() {
        let v = sin_q14(0);
        assert!(v.abs() < 50);
        let v = sin_q14(PHASE_BASE / 4);
        assert!((v - COS_BASE).abs() < 50);
    }

    /// FFT satisfies Parseval to within 0.1% across common sizes.
    #[test]
    fn fft_parseval() {
        for &n in &[128usize, 256, 512, 1024, 2048] {
            let input: Vec<Complex64> = (0..n)
                .map(|i| Complex64::new((i as f64 * 0.37).sin(), (i as f64 * 0.11).cos()))
                .collect();
            let time_energy: f64 = input.iter().map(|c| c.norm_sqr()).sum();

            let mut freq = input.clone();
            fft(&mut freq, false);
            let freq_energy: f64 = freq.iter().map(|c| c.norm_sqr()).sum();

            assert_relative_eq!(time_energy, freq_energy, max_relative = 1e-3);
        }
    }

    #[test]
    fn fft_inverse_roundtrips() {
        let n = 256;
        let input: Vec<Complex64> = (0..n)
            .map(|i| Complex64::new((i as f64 * 0.05).sin(), 0.0))
            .collect();
        let mut freq = input.clone();
        fft(&mut freq, false);
        fft(&mut freq, true);
        for (a, b) in input.iter().zip(freq.iter()) {
            assert_relative_eq!(a.re, b.re, epsilon = 1e-6);
            assert_relative_eq!(a.im, b.im, epsilon = 1e-6);
        }
    }

    #[test]
    #[should_panic(expected = "power of 2")]
    fn fft_rejects_non_power_of_two() {
        let mut data = vec![Complex64::new(0.0, 0.0); 100];
        fft(&mut data, false);
    }

    #[test]
    fn slow_dft_matches_fft_on_power_of_two() {
        let n = 64;
        let input: Vec<Complex64> = (0..n)
            .map(|i| Complex64::new((i as f64).sin(), 0.0))
            .collect();
        let slow = slow_dft(&input, false);
        let mut fast = input.clone();
        fft(&mut fast, false);
        let scale = (n as f64).sqrt();
        for (s, f) in slow.iter().zip(fast.iter()) {
            assert_relative_eq!(s.re, f.re * scale, epsilon = 1e-6);
            assert_relative_eq!(s.im, f.im * scale, epsilon = 1e-6);
        }
    }

    #[test]
    fn hamming_window_matches_formula() {
        let w = hamming_window(8);
        assert_eq!(w.len(), 8);
        assert_relative_eq!(w[0], 0.08, epsilon = 1e-6);
    }

    #[test]
    fn goertzel_detects_pure_tone() {
        let n = 200;
        let freq = 2100.0;
        let sample_rate = 8000.0;
        let k = (freq * n as f64 / sample_rate).round() as usize;
        let (cos_tab, sin_tab) = goertzel_tables(n);
        let x: Vec<i16> = (0..n)
            .map(|i| {
                let phase = 2.0 * PI * freq * i as f64 / sample_rate;
                (phase.sin() * 10000.0) as i16
            })
            .collect();
        let on_bin = goertzel_power(&cos_tab, &sin_tab, &x, k, n);
        let off_bin = goertzel_power(&cos_tab, &sin_tab, &x, k + 20, n);
        assert!(on_bin > off_bin * 10);
    }
}
