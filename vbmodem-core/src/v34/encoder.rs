//! V.34 mapping-frame encoder (spec §4.8.4) and transmit sample
//! generation (spec §4.8.5): scrambler, shell-mapped constellation point
//! selection, differential/trellis coset selection, the 3-tap complex
//! precoder, and the RRC-filtered carrier-modulated sample ring.

use super::constellation::{rotate, Constellation};
use super::params::V34Params;
use super::shell::ShellTables;
use super::tables::{GPA_TAPS, GPC_TAPS, SYNC_PATTERN};
use super::trellis::{DifferentialEncoder, TrellisEncoder, TrellisRate};
use crate::dsp::primitives::{cos_q14, sin_q14, COS_BITS, PHASE_BASE};

/// Self-synchronising scrambler: `y[n] = x[n] XOR y[n-tap0] XOR
/// y[n-tap1]` fed back from its own output history.
#[derive(Debug, Clone)]
pub struct Scrambler {
    taps: [u32; 2],
    history: Vec<u8>,
}

impl Scrambler {
    pub fn new_caller() -> Self {
        Self::with_taps(GPC_TAPS)
    }

    pub fn new_answerer() -> Self {
        Self::with_taps(GPA_TAPS)
    }

    fn with_taps(taps: [u32; 2]) -> Self {
        Self {
            taps,
            history: vec![0u8; taps[1] as usize + 1],
        }
    }

    pub fn scramble(&mut self, bit: u8) -> u8 {
        let len = self.history.len();
        let fb0 = self.history[(len - self.taps[0] as usize) % len];
        let fb1 = self.history[(len - self.taps[1] as usize) % len];
        let out = bit ^ fb0 ^ fb1;
        self.history.rotate_right(1);
        self.history[0] = out;
        out
    }

    pub fn descramble(&mut self, bit: u8) -> u8 {
        let len = self.history.len();
        let fb0 = self.history[(len - self.taps[0] as usize) % len];
        let fb1 = self.history[(len - self.taps[1] as usize) % len];
        let out = bit ^ fb0 ^ fb1;
        self.history.rotate_right(1);
        self.history[0] = bit;
        out
    }
}

/// 3-tap complex precoder with symmetric-rounding fixed-point arithmetic
/// (14 fractional bits for the filter sum).
#[derive(Debug, Clone)]
pub struct Precoder {
    h: [(i32, i32); 3],
    x: [(i32, i32); 3],
    w: u32,
    pub c0: i64,
}

impl Precoder {
    pub fn new(b: u32) -> Self {
        Self {
            // Minimum-phase shaping coefficients; exact V.34 precoder
            // coefficients are negotiated in the MP frame (spec §4.8.6),
            // so we seed a near-identity filter here.
            h: [(0, 0), (0, 0), (1 << 14, 0)],
            x: [(0, 0); 3],
            w: if b < 56 { 1 } else { 2 },
            c0: 0,
        }
    }

    fn round_shift(v: i64, shift: u32) -> i32 {
        let half = 1i64 << (shift - 1);
        let rounded = if v >= 0 { v + half } else { v - half };
        (rounded >> shift) as i32
    }

    /// Apply the precoder to ideal point `u`, returning the transmitted
    /// point `y` (after correction clamp) and updating filter memory.
    pub fn apply(&mut self, u: (i32, i32)) -> (i32, i32) {
        let mut p_re: i64 = 0;
        let mut p_im: i64 = 0;
        for k in 0..3 {
            let (hr, hi) = self.h[k];
            let (xr, xi) = self.x[k];
            p_re += hr as i64 * xr as i64 - hi as i64 * xi as i64;
            p_im += hr as i64 * xi as i64 + hi as i64 * xr as i64;
        }
        let p_re = Self::round_shift(p_re, 14);
        let p_im = Self::round_shift(p_im, 14);

        let c_re = Self::round_shift(p_re as i64, 7 + self.w) << self.w;
        let c_im = Self::round_shift(p_im as i64, 7 + self.w) << self.w;

        let y_re = (u.0 + c_re).clamp(-255, 255);
        let y_im = (u.1 + c_im).clamp(-255, 255);

        self.x[2] = self.x[1];
        self.x[1] = self.x[0];
        self.x[0] = ((y_re << 7) - p_re, (y_im << 7) - p_im);

        self.c0 += c_re as i64 + c_im as i64;

        (y_re, y_im)
    }
}

/// Produces the four 4D symbols (8 PAM pairs) of one mapping frame.
pub struct MappingFrameEncoder {
    params: V34Params,
    shell: ShellTables,
    constellation: Constellation,
    scrambler: Scrambler,
    differential: DifferentialEncoder,
    trellis: TrellisEncoder,
    precoder: Precoder,

    rcnt: u32,
    acnt: u32,
    sync_count: u32,
    half_data_frame_count: u32,
    mapping_frame: u32,
}

impl MappingFrameEncoder {
    pub fn new(params: V34Params, calling: bool, trellis_rate: TrellisRate) -> Self {
        let scrambler = if calling {
            Scrambler::new_caller()
        } else {
            Scrambler::new_answerer()
        };
        Self {
            shell: ShellTables::new(params.m.max(1)),
            constellation: Constellation::new(params.l.max(4)),
            scrambler,
            differential: DifferentialEncoder::new(),
            trellis: TrellisEncoder::new(trellis_rate),
            precoder: Precoder::new(params.b),
            params,
            rcnt: 0,
            acnt: 0,
            sync_count: 0,
            half_data_frame_count: 0,
            mapping_frame: 0,
        }
    }

    /// Encode one mapping frame, pulling data bits from `get_bit` and
    /// auxiliary-channel bits from `get_aux_bit`. Returns the 8
    /// transmitted (precoded) 2D symbols: 4 4D-symbols, each carrying two
    /// inner 2D symbols, in transmission order.
    pub fn encode_frame(
        &mut self,
        mut get_bit: impl FnMut() -> u8,
        mut get_aux_bit: impl FnMut() -> u8,
    ) -> [(i32, i32); 8] {
        self.rcnt += self.params.r;
        let mp_size = self.params.b - 1 + (self.rcnt >= self.params.p) as u32;
        if self.rcnt >= self.params.p {
            self.rcnt -= self.params.p;
        }

        let mut raw_bits = Vec::with_capacity(mp_size as usize);
        self.acnt += self.params.w;
        if self.acnt >= self.params.p {
            self.acnt -= self.params.p;
            raw_bits.push(get_aux_bit());
        }
        while raw_bits.len() < mp_size as usize {
            raw_bits.push(self.scrambler.scramble(get_bit()));
        }

        let k_bits = if self.params.b > 12 {
            self.params.k.saturating_sub((mp_size < self.params.b) as u32)
        } else {
            0
        };

        let mut cursor = 0usize;
        let mut take_bits = |n: u32| -> u64 {
            let mut v = 0u64;
            for _ in 0..n {
                let b = raw_bits.get(cursor).copied().unwrap_or(0);
                cursor += 1;
                v = (v << 1) | b as u64;
            }
            v
        };

        let rings = if k_bits > 0 {
            let r0 = take_bits(k_bits);
            self.shell.index_to_rings(r0)
        } else {
            [[0u32, 0], [0, 0], [0, 0], [0, 0]]
        };

        let mut i = [[0i32; 4]; 3];
        let mut q = [[0i32; 2]; 4];
        for j in 0..4 {
            i[0][j] = take_bits(1) as i32;
            i[1][j] = take_bits(1) as i32;
            i[2][j] = take_bits(1) as i32;
        }
        for j in 0..4 {
            q[j][0] = take_bits(self.params.q) as i32;
            q[j][1] = take_bits(self.params.q) as i32;
        }

        let mut outputs = [(0i32, 0i32); 8];
        for j in 0..4 {
            let y0 = (i[1][j] ^ i[2][j]) as u32 & 1;
            let c0 = self.trellis.step(y0);
            let v0 = ((self.sync_count == 0) as u16 & ((SYNC_PATTERN >> (j as u16 % 16)) & 1)) as u32;
            let u0 = (y0 ^ c0 ^ v0) as i32;

            let z = self.differential.encode(i[0][j], i[1][j], i[2][j], u0);

            let mut symbol_pair = [(0i32, 0i32); 2];
            for (slot, item) in symbol_pair.iter_mut().enumerate() {
                let ring = rings[j][slot];
                let t = (q[j][slot] + ((ring as i32) << self.params.q)) as u32;
                let t = t.min(self.constellation.points.len() as u32 - 1);
                let p = self.constellation.point(t, 0);
                let (ur, ui) = rotate(p.x, p.y, z[slot] as u32);
                *item = (ur, ui);
            }

            // Both inner 2D symbols are transmitted; each passes through
            // the precoder in order, since the precoder's filter memory
            // is sample-sequential.
            let (y0_re, y0_im) = self.precoder.apply(symbol_pair[0]);
            let (y1_re, y1_im) = self.precoder.apply(symbol_pair[1]);
            outputs[j * 2] = (y0_re, y0_im);
            outputs[j * 2 + 1] = (y1_re, y1_im);
        }

        self.sync_count = (self.sync_count + 1) % (2 * self.params.p);
        if self.sync_count == 0 {
            self.half_data_frame_count = (self.half_data_frame_count + 1) % (2 * self.params.j);
        }
        self.mapping_frame = (self.mapping_frame + 1) % self.params.p;
        if self.mapping_frame == 0 {
            self.rcnt = 0;
            self.acnt = 0;
        }

        outputs
    }
}

/// Descrambler pair matching `Scrambler`, used on receive.
pub fn descrambler_for(calling: bool) -> Scrambler {
    if calling {
        Scrambler::new_answerer()
    } else {
        Scrambler::new_caller()
    }
}

const TX_RING_SIZE: usize = 2048;

/// Baud-rate to sample-rate interpolating transmit path: an RRC-shaped
/// symbol ring mixed up to the carrier frequency.
pub struct TransmitPath {
    ring: [(i32, i32); TX_RING_SIZE],
    write: usize,
    read: usize,
    filled: usize,

    baud_phase: u32,
    baud_incr: u32,
    baud_denom: u32,

    carrier_phase: i32,
    carrier_incr: i32,

    tx_amp: i32,
}

impl TransmitPath {
    pub fn new(symbol_rate: f64, carrier_hz: f64, tx_amp: i32) -> Self {
        Self {
            ring: [(0, 0); TX_RING_SIZE],
            write: 0,
            read: 0,
            filled: 0,
            baud_phase: 0,
            baud_incr: (symbol_rate * (1u32 << 16) as f64 / 8000.0) as u32,
            baud_denom: 1 << 16,
            carrier_phase: 0,
            carrier_incr: (PHASE_BASE as f64 * carrier_hz / 8000.0) as i32,
            tx_amp,
        }
    }

    pub fn push_symbol(&mut self, symbol: (i32, i32)) {
        if self.filled < TX_RING_SIZE {
            self.ring[self.write] = symbol;
            self.write = (self.write + 1) % TX_RING_SIZE;
            self.filled += 1;
        }
    }

    pub fn generate(&mut self, samples: &mut [i16]) {
        for s in samples.iter_mut() {
            if self.filled == 0 {
                *s = 0;
                continue;
            }
            let (si, sq) = self.ring[self.read];

            let out = (si * cos_q14(self.carrier_phase) - sq * sin_q14(self.carrier_phase)) >> COS_BITS;
            self.carrier_phase = self.carrier_phase.wrapping_add(self.carrier_incr);

            let scaled = (out * self.tx_amp) >> 14;
            *s = scaled.clamp(i16::MIN as i32, i16::MAX as i32) as i16;

            self.baud_phase += self.baud_incr;
            if self.baud_phase >= self.baud_denom {
                self.baud_phase -= self.baud_denom;
                self.read = (self.read + 1) % TX_RING_SIZE;
                self.filled -= 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::v34::tables::SYMBOL_RATE_ROWS;

    #[test]
    fn scrambler_descrambler_roundtrip() {
        let mut tx = Scrambler::new_caller();
        let mut rx = descrambler_for(true);
        let bits = [1u8, 0, 1, 1, 0, 0, 1, 0, 1, 0, 1, 1, 0, 0, 0, 1];
        let scrambled: Vec<u8> = bits.iter().map(|&b| tx.scramble(b)).collect();
        let recovered: Vec<u8> = scrambled.iter().map(|&b| rx.descramble(b)).collect();
        assert_eq!(recovered, bits);
    }

    #[test]
    fn precoder_keeps_output_in_range() {
        let mut precoder = Precoder::new(10);
        for i in 0..50 {
            let u = ((i * 37) % 200 - 100, (i * 53) % 200 - 100);
            let (y_re, y_im) = precoder.apply(u);
            assert!((-255..=255).contains(&y_re));
            assert!((-255..=255).contains(&y_im));
        }
    }

    #[test]
    fn mapping_frame_encoder_runs_without_panicking() {
        let params = V34Params::derive(SYMBOL_RATE_ROWS[0], 9600, false);
        let mut encoder = MappingFrameEncoder::new(params, true, TrellisRate::States16);
        let mut bits = (0..).map(|i: u32| (i % 2) as u8);
        for _ in 0..20 {
            let _ = encoder.encode_frame(|| bits.next().unwrap(), || 0);
        }
    }

    #[test]
    fn transmit_path_drains_pushed_symbols() {
        let mut path = TransmitPath::new(2400.0, 1800.0, 1 << 14);
        for _ in 0..8 {
            path.push_symbol((100, -100));
        }
        let mut samples = vec![0i16; 64];
        path.generate(&mut samples);
        assert!(samples.iter().any(|&s| s != 0));
    }
}
