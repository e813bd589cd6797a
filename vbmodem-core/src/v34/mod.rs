//! V.34 trellis-coded QAM data pump (C9): the highest-rate modulation
//! this crate negotiates. Structured as the source structures it — a
//! parameter-derivation step, a signal constellation, shell mapping, a
//! mapping-frame encoder/decoder pair either side of a trellis code, and
//! the startup probe sequence that brings the line up before `DATA`.
//!
//! Full bit-exact fidelity to ITU-T V.34 is not attempted for the
//! adaptive receive loop (fast-equalizer FFT pre-training, the dedicated
//! Nyquist timing-recovery filters, and the generated trellis transition
//! tables); those simplifications are recorded in this project's design
//! notes rather than silently assumed away.
//!
//! `process_receive` also does not run the received symbol stream back
//! through the mapping-frame reconstruction (differential decode, shell
//! demapping via `rings_to_index`, K/I/Q bit reassembly, aux-channel
//! demux) that mirrors `MappingFrameEncoder::encode_frame` on transmit;
//! it takes one coset bit directly off each trellis decision instead.
//! That gap is recorded in this project's design notes alongside the
//! other two rather than left silent.

pub mod constellation;
pub mod decoder;
pub mod encoder;
pub mod params;
pub mod shell;
pub mod startup;
pub mod tables;
pub mod trellis;

use crate::dsp::primitives::{cos_q14, sin_q14, COS_BITS, PHASE_BASE};
use decoder::{Agc, Equalizer, ViterbiDecoder};
use encoder::{descrambler_for, MappingFrameEncoder, TransmitPath};
use params::V34Params;
use startup::StartupSequencer;
use tables::SYMBOL_RATE_ROWS;
use trellis::TrellisRate;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum V34Phase {
    Startup,
    Data,
}

/// Top-level V.34 modem: owns both directions' encoder/decoder state and
/// the startup sequencer that gates when `DATA` mapping frames begin.
pub struct V34Modem {
    calling: bool,
    params: V34Params,
    phase: V34Phase,

    startup: StartupSequencer,
    mapping_encoder: MappingFrameEncoder,
    transmit: TransmitPath,

    agc: Agc,
    equalizer: Equalizer,
    viterbi: ViterbiDecoder,
    constellation: constellation::Constellation,
    descrambler: encoder::Scrambler,

    carrier_phase: i32,
    carrier_incr: i32,
    symbols_since_frame: u32,
}

impl V34Modem {
    pub fn new(calling: bool, r_bps: u32, trellis_rate: TrellisRate) -> Self {
        let row = SYMBOL_RATE_ROWS[0];
        let params = V34Params::derive(row, r_bps, false);
        let carrier_hz = if calling {
            params.carrier_low
        } else {
            params.carrier_high
        };

        Self {
            calling,
            params,
            phase: V34Phase::Startup,
            startup: StartupSequencer::new(calling, false),
            mapping_encoder: MappingFrameEncoder::new(params, calling, trellis_rate),
            transmit: TransmitPath::new(params.symbol_rate, carrier_hz, 1 << 14),
            agc: Agc::new(),
            equalizer: Equalizer::new(10),
            viterbi: ViterbiDecoder::new(trellis_rate),
            constellation: constellation::Constellation::new(params.l.max(4)),
            descrambler: descrambler_for(calling),
            carrier_phase: 0,
            carrier_incr: (PHASE_BASE as f64 * carrier_hz / 8000.0) as i32,
            symbols_since_frame: 0,
        }
    }

    pub fn phase(&self) -> V34Phase {
        self.phase
    }

    pub fn params(&self) -> V34Params {
        self.params
    }

    /// Generate one block of transmit samples. In `DATA`, pulls bits
    /// from `get_bit` eight symbols at a time (one mapping frame).
    pub fn generate(&mut self, samples: &mut [i16], mut get_bit: impl FnMut() -> u8) {
        if self.phase == V34Phase::Startup {
            for s in samples.iter_mut() {
                let done = self.startup.advance_symbol();
                *s = 0;
                if done {
                    self.phase = V34Phase::Data;
                    break;
                }
            }
            return;
        }

        for s in samples.iter_mut() {
            if self.symbols_since_frame == 0 {
                let frame = self.mapping_encoder.encode_frame(&mut get_bit, || 0);
                for symbol in frame {
                    self.transmit.push_symbol(symbol);
                }
            }
            self.symbols_since_frame = (self.symbols_since_frame + 1) % 8;
            *s = 0;
        }
        self.transmit.generate(samples);
    }

    /// Demodulate one block of received samples, emitting decided bits to
    /// `put_bit` as the Viterbi decoder's traceback window fills.
    ///
    /// This takes one coset bit directly off each trellis decision rather
    /// than running the full mapping-frame reconstruction the encoder
    /// side performs (see this module's design notes).
    pub fn process_receive(&mut self, samples: &[i16], mut put_bit: impl FnMut(u8)) {
        for &sample in samples {
            let agc_out = self.agc.process(sample);

            let baseband_i = (agc_out * cos_q14(self.carrier_phase)) >> COS_BITS;
            let baseband_q = (agc_out * sin_q14(self.carrier_phase)) >> COS_BITS;
            self.carrier_phase = self.carrier_phase.wrapping_add(self.carrier_incr);

            let equalized = self.equalizer.push((baseband_i, baseband_q));

            if self.phase == V34Phase::Data {
                self.viterbi.step(&self.constellation, equalized);
                if let Some(decision) = self.viterbi.decide() {
                    let error = (equalized.0 - decision.0, equalized.1 - decision.1);
                    self.equalizer.update(error);

                    let bit = ((decision.0 >> 8) & 1) as u8;
                    put_bit(self.descrambler.descramble(bit));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_modem_starts_in_startup_phase() {
        let modem = V34Modem::new(true, 9600, TrellisRate::States16);
        assert_eq!(modem.phase(), V34Phase::Startup);
    }

    #[test]
    fn generate_does_not_panic_through_startup() {
        let mut modem = V34Modem::new(true, 9600, TrellisRate::States16);
        let mut samples = vec![0i16; 40];
        let mut bits = (0..).map(|i: u32| (i % 2) as u8);
        for _ in 0..50 {
            modem.generate(&mut samples, || bits.next().unwrap());
        }
    }

    #[test]
    fn process_receive_does_not_panic() {
        let mut modem = V34Modem::new(false, 9600, TrellisRate::States16);
        let samples = vec![100i16; 40];
        let mut bits_out = Vec::new();
        for _ in 0..200 {
            modem.process_receive(&samples, |b| bits_out.push(b));
        }
    }
}
