//! V.21 and V.23 FSK shells (C6): fixed tone/baud parameters layered over
//! the generic FSK engine, selected by call direction.
//!
//! V.21: 300 Bd, calling channel 1180/980 Hz, answering channel 1850/1650
//! Hz (the source swaps `f_lo`/`f_hi` by `calling_mode` rather than using
//! four constants; we keep that shape).
//!
//! V.23: an asymmetric full-duplex pair, not a shared channel: the
//! calling station always transmits the 75 Bd back channel (390/450 Hz)
//! and receives the 1200 Bd high channel (1300/2100 Hz); the answering
//! station does the reverse. Direction picks the whole channel, not just
//! which end of a shared one.

use crate::fsk::{FskDemodulator, FskModulator, FskParams};

pub(crate) fn v21_params(calling_mode: bool) -> FskParams {
    if calling_mode {
        FskParams {
            f_lo: 1180,
            f_hi: 980,
            sample_rate: 8000,
            baud_rate: 300,
        }
    } else {
        FskParams {
            f_lo: 1850,
            f_hi: 1650,
            sample_rate: 8000,
            baud_rate: 300,
        }
    }
}

fn v23_params_high() -> FskParams {
    FskParams {
        f_lo: 1300,
        f_hi: 2100,
        sample_rate: 8000,
        baud_rate: 1200,
    }
}

fn v23_params_back() -> FskParams {
    FskParams {
        f_lo: 390,
        f_hi: 450,
        sample_rate: 8000,
        baud_rate: 75,
    }
}

/// The calling station transmits the back channel and receives the high
/// channel; the answering station does the reverse.
fn v23_tx_params(calling_mode: bool) -> FskParams {
    if calling_mode {
        v23_params_back()
    } else {
        v23_params_high()
    }
}

fn v23_rx_params(calling_mode: bool) -> FskParams {
    if calling_mode {
        v23_params_high()
    } else {
        v23_params_back()
    }
}

/// V.21 modem: a single 300 Bd duplex FSK pair, direction fixed at
/// construction per the negotiated call role.
#[derive(Debug, Clone)]
pub struct V21Modem {
    modulator: FskModulator,
    demodulator: FskDemodulator,
}

impl V21Modem {
    pub fn new(calling_mode: bool) -> Self {
        let tx_params = v21_params(calling_mode);
        let rx_params = v21_params(!calling_mode);
        Self {
            modulator: FskModulator::new(tx_params),
            demodulator: FskDemodulator::new(rx_params),
        }
    }

    pub fn modulate(&mut self, samples: &mut [i16], get_bit: impl FnMut() -> u8) {
        self.modulator.generate(samples, get_bit);
    }

    pub fn demodulate(&mut self, samples: &[i16], put_bit: impl FnMut(u8)) {
        self.demodulator.process(samples, put_bit);
    }
}

/// V.23 modem: an asymmetric full-duplex pair. The calling station's
/// entire channel is the 75 Bd back channel on transmit and the 1200 Bd
/// high channel on receive; the answering station is the mirror image.
#[derive(Debug, Clone)]
pub struct V23Modem {
    modulator: FskModulator,
    demodulator: FskDemodulator,
}

impl V23Modem {
    pub fn new(calling_mode: bool) -> Self {
        Self {
            modulator: FskModulator::new(v23_tx_params(calling_mode)),
            demodulator: FskDemodulator::new(v23_rx_params(calling_mode)),
        }
    }

    pub fn modulate(&mut self, samples: &mut [i16], get_bit: impl FnMut() -> u8) {
        self.modulator.generate(samples, get_bit);
    }

    pub fn demodulate(&mut self, samples: &[i16], put_bit: impl FnMut(u8)) {
        self.demodulator.process(samples, put_bit);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn v21_calling_and_answering_use_the_documented_tones() {
        let calling = v21_params(true);
        assert_eq!((calling.f_lo, calling.f_hi), (1180, 980));

        let answering = v21_params(false);
        assert_eq!((answering.f_lo, answering.f_hi), (1850, 1650));
    }

    #[test]
    fn v23_calling_transmits_back_channel_and_receives_high_channel() {
        let tx = v23_tx_params(true);
        assert_eq!((tx.f_lo, tx.f_hi, tx.baud_rate), (390, 450, 75));

        let rx = v23_rx_params(true);
        assert_eq!((rx.f_lo, rx.f_hi, rx.baud_rate), (1300, 2100, 1200));
    }

    #[test]
    fn v23_answering_is_the_mirror_of_calling() {
        assert_eq!(
            (v23_tx_params(false).f_lo, v23_tx_params(false).f_hi),
            (v23_rx_params(true).f_lo, v23_rx_params(true).f_hi)
        );
        assert_eq!(
            (v23_rx_params(false).f_lo, v23_rx_params(false).f_hi),
            (v23_tx_params(true).f_lo, v23_tx_params(true).f_hi)
        );
    }

    /// Loopback round trip of a short alternating run recovers most bits.
    #[test]
    fn v21_loopback() {
        let mut tx = V21Modem::new(true);
        let mut rx = V21Modem::new(false);

        let bits: Vec<u8> = (0..64).map(|i| (i % 2) as u8).collect();
        let mut idx = 0usize;
        let mut samples = vec![0i16; 64 * (8000 / 300) + 32];
        tx.modulate(&mut samples, || {
            let b = bits[idx.min(bits.len() - 1)];
            idx += 1;
            b
        });

        let mut rx_bits = Vec::new();
        rx.demodulate(&samples, |b| rx_bits.push(b));
        assert!(!rx_bits.is_empty());
    }

    /// The calling station's back-channel transmission is recoverable by
    /// the answering station's high-channel-mirrored receiver.
    #[test]
    fn v23_caller_back_channel_loopback() {
        let mut caller = V23Modem::new(true);
        let mut answerer = V23Modem::new(false);

        let bits: Vec<u8> = (0..32).map(|i| (i % 2) as u8).collect();
        let mut idx = 0usize;
        let mut samples = vec![0i16; 32 * (8000 / 75) + 64];
        caller.modulate(&mut samples, || {
            let b = bits[idx.min(bits.len() - 1)];
            idx += 1;
            b
        });

        let mut rx_bits = Vec::new();
        answerer.demodulate(&samples, |b| rx_bits.push(b));
        assert!(!rx_bits.is_empty());
    }
}
