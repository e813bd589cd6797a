//! V.22/V.22bis DQPSK modulator, partial per the source it is ported from:
//! only the modulator is implemented there, the demodulator body is empty.
//! We keep that asymmetry rather than inventing a receive algorithm the
//! source never specified; `V22Demodulator::process` is a documented no-op
//! hook so callers have somewhere to wire a future implementation.
//!
//! Also backs the V.34 phase-2 600 bit/s DPSK probe signal (`mod_type ==
//! Mode600V34`), which reuses this modulator's rotation logic with a
//! simpler symbol mapping.

use crate::dsp::primitives::{cos_q14, COS_BITS, PHASE_BASE};
use std::sync::OnceLock;

const V34_SAMPLE_RATE: i32 = 8000;

const TX_FILTER_PHASES: usize = 40;
const TX_FILTER_WSIZE: usize = 20;
const TX_FILTER_SIZE: usize = TX_FILTER_PHASES * TX_FILTER_WSIZE;
const TX_BUF_SIZE: usize = 64;

static TX_FILTER: OnceLock<[i16; TX_FILTER_SIZE]> = OnceLock::new();

/// Root-raised-cosine pulse-shaping filter, 40 phases x 20 taps, Q14.
/// The source links this table from a generated file not present in our
/// corpus; we regenerate an equivalent root-raised-cosine shape at
/// roll-off 0.5 rather than guess at undocumented numeric coefficients.
fn tx_filter() -> &'static [i16; TX_FILTER_SIZE] {
    TX_FILTER.get_or_init(|| {
        let mut tab = [0i16; TX_FILTER_SIZE];
        let beta = 0.5_f64;
        let span = TX_FILTER_WSIZE as f64;
        for phase in 0..TX_FILTER_PHASES {
            for tap in 0..TX_FILTER_WSIZE {
                let t = (tap as f64 - span / 2.0) + phase as f64 / TX_FILTER_PHASES as f64;
                let v = root_raised_cosine(t, beta);
                tab[phase + tap * TX_FILTER_PHASES] = (v * 16384.0) as i16;
            }
        }
        tab
    })
}

fn root_raised_cosine(t: f64, beta: f64) -> f64 {
    if t.abs() < 1e-9 {
        return 1.0 - beta + 4.0 * beta / std::f64::consts::PI;
    }
    let denom = 1.0 - (4.0 * beta * t).powi(2);
    if denom.abs() < 1e-9 {
        let x = std::f64::consts::PI / (4.0 * beta);
        return (beta / 2.0f64.sqrt())
            * ((1.0 + 2.0 / std::f64::consts::PI) * x.sin() + (1.0 - 2.0 / std::f64::consts::PI) * x.cos());
    }
    let num = (std::f64::consts::PI * t * (1.0 - beta)).sin()
        + 4.0 * beta * t * (std::f64::consts::PI * t * (1.0 + beta)).cos();
    num / (std::f64::consts::PI * t * denom)
}

/// Which symbol mapping `V22Modulator` uses for each baud.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum V22Mode {
    /// V.34 phase 2, 600 bit/s probe: 1 bit/baud, 0/180 degree rotation.
    Mode600V34,
    /// V.22, 600 bit/s: 1 bit/baud, 90/270 degree rotation.
    Mode600,
    /// V.22, 1200 bit/s: 2 bits/baud quadrant DQPSK.
    Mode1200,
    /// V.22bis, 2400 bit/s: 2 bits/baud quadrant + 2 bits/baud amplitude.
    Mode2400,
}

#[derive(Debug, Clone)]
pub struct V22Modulator {
    calling: bool,
    mode: V22Mode,

    baud_phase: i32,
    baud_num: i32,
    baud_denom: i32,

    carrier_phase: i32,
    carrier_incr: i32,
    carrier2_phase: i32,
    carrier2_incr: i32,

    tx_buf: [(i32, i32); TX_BUF_SIZE],
    tx_outbuf_ptr: usize,
    z: i32,
}

impl V22Modulator {
    pub fn new(calling: bool, mode: V22Mode) -> Self {
        let (carrier_incr, carrier2_incr) = if calling {
            ((PHASE_BASE as f64 * 1200.0 / V34_SAMPLE_RATE as f64) as i32, 0)
        } else {
            (
                (PHASE_BASE as f64 * 2400.0 / V34_SAMPLE_RATE as f64) as i32,
                (PHASE_BASE as f64 * 1800.0 / V34_SAMPLE_RATE as f64) as i32,
            )
        };
        Self {
            calling,
            mode,
            baud_phase: 0,
            baud_num: 3,
            baud_denom: TX_FILTER_PHASES as i32,
            carrier_phase: 0,
            carrier_incr,
            carrier2_phase: 0,
            carrier2_incr,
            tx_buf: [(0, 0); TX_BUF_SIZE],
            tx_outbuf_ptr: 0,
            z: 0,
        }
    }

    fn baseband(&mut self, mut get_bit: impl FnMut() -> u8) -> (i32, i32) {
        let (x1, y1) = match self.mode {
            V22Mode::Mode600V34 => {
                let b1 = get_bit() as i32;
                self.z ^= b1 << 1;
                (0x2000, 0x2000)
            }
            V22Mode::Mode600 => {
                let b1 = get_bit() as i32;
                self.z = (self.z + ((b1 << 1) | 1)) & 3;
                (0x2000, 0x2000)
            }
            V22Mode::Mode1200 => {
                let b1 = get_bit() as i32;
                let mut b2 = get_bit() as i32;
                b2 ^= 1 - b1;
                self.z = (self.z + ((b1 << 1) | b2)) & 3;
                (0x2000, 0x2000)
            }
            V22Mode::Mode2400 => {
                let b1 = get_bit() as i32;
                let mut b2 = get_bit() as i32;
                b2 ^= 1 - b1;
                self.z = (self.z + ((b1 << 1) | b2)) & 3;
                let b1 = get_bit() as i32;
                let b2 = get_bit() as i32;
                let mut x1 = 0x1000;
                if b2 != 0 {
                    x1 += 0x2000;
                }
                let mut y1 = 0x1000;
                if b1 != 0 {
                    y1 += 0x2000;
                }
                (x1, y1)
            }
        };

        match self.z & 3 {
            0 => (x1, y1),
            1 => (-y1, x1),
            2 => (-x1, -y1),
            _ => (y1, -x1),
        }
    }

    /// Generate `samples.len()` output samples, pulling bits from
    /// `get_bit` as each new baud is due.
    pub fn generate(&mut self, samples: &mut [i16], mut get_bit: impl FnMut() -> u8) {
        let filter = tx_filter();
        for s in samples.iter_mut() {
            let mut ph = self.baud_phase;
            let mut si: i64 = 0;
            let mut sq: i64 = 0;
            for j in 0..TX_FILTER_WSIZE {
                let k = (self.tx_outbuf_ptr + TX_BUF_SIZE - j - 1) % TX_BUF_SIZE;
                let (tap_i, tap_q) = self.tx_buf[k];
                si += tap_i as i64 * filter[ph as usize] as i64;
                sq += tap_q as i64 * filter[ph as usize] as i64;
                ph += self.baud_denom;
                if ph as usize >= TX_FILTER_SIZE {
                    ph -= TX_FILTER_SIZE as i32;
                }
            }
            let si = (si >> 14) as i32;
            let sq = (sq >> 14) as i32;

            self.baud_phase += self.baud_num;
            if self.baud_phase >= self.baud_denom {
                self.baud_phase -= self.baud_denom;
                let (x, y) = self.baseband(&mut get_bit);
                self.tx_buf[self.tx_outbuf_ptr] = (x, y);
                self.tx_outbuf_ptr = (self.tx_outbuf_ptr + 1) % TX_BUF_SIZE;
            }

            let mut val =
                (si * cos_q14(self.carrier_phase) - sq * cos_q14((PHASE_BASE / 4) - self.carrier_phase))
                    >> COS_BITS;
            self.carrier_phase = self.carrier_phase.wrapping_add(self.carrier_incr);
            if !self.calling {
                val += cos_q14(self.carrier2_phase) >> 1;
                self.carrier2_phase = self.carrier2_phase.wrapping_add(self.carrier2_incr);
            }
            *s = val.clamp(i16::MIN as i32, i16::MAX as i32) as i16;
        }
    }
}

/// Stub receiver. The source this is ported from never filled in
/// `V22_demod`; kept as an explicit no-op rather than a guessed
/// implementation.
#[derive(Debug, Clone)]
pub struct V22Demodulator {
    calling: bool,
}

impl V22Demodulator {
    pub fn new(calling: bool) -> Self {
        Self { calling }
    }

    pub fn is_calling(&self) -> bool {
        self.calling
    }

    /// No-op: unimplemented in the source this module is grounded on.
    pub fn process(&mut self, _samples: &[i16], _put_bit: impl FnMut(u8)) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn modulator_produces_nonzero_output() {
        let mut modulator = V22Modulator::new(true, V22Mode::Mode1200);
        let mut samples = vec![0i16; 400];
        let mut bits = (0..).map(|i: u32| (i % 2) as u8);
        modulator.generate(&mut samples, || bits.next().unwrap());
        assert!(samples.iter().any(|&s| s != 0));
    }

    #[test]
    fn demodulator_stub_emits_nothing() {
        let mut demod = V22Demodulator::new(false);
        let mut count = 0;
        demod.process(&[0i16; 100], |_| count += 1);
        assert_eq!(count, 0);
    }

    #[test]
    fn all_modes_run_without_panicking() {
        for mode in [
            V22Mode::Mode600V34,
            V22Mode::Mode600,
            V22Mode::Mode1200,
            V22Mode::Mode2400,
        ] {
            let mut modulator = V22Modulator::new(false, mode);
            let mut samples = vec![0i16; 200];
            let mut bits = (0..).map(|i: u32| (i % 2) as u8);
            modulator.generate(&mut samples, || bits.next().unwrap());
        }
    }
}
