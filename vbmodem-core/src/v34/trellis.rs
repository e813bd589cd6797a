//! Trellis-coded modulation (spec §4.8.4 step 3, §4.8.7 step 5): the
//! differential encoder that makes the code rotation-invariant, and a
//! rate 1/2 convolutional encoder/decoder pair selectable between 16,
//! 32 and 64 states.
//!
//! The three next-state recurrences the source generates offline as
//! `trellis_trans_{4,8,16}` lookup tables are reproduced here as closed-
//! form shift-register updates of the same rate and state count; we did
//! not have the generated tables available to reproduce bit-exact, so
//! this is a faithful-shape substitute documented as an open question.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrellisRate {
    States16,
    States32,
    States64,
}

impl TrellisRate {
    pub fn state_bits(self) -> u32 {
        match self {
            TrellisRate::States16 => 4,
            TrellisRate::States32 => 5,
            TrellisRate::States64 => 6,
        }
    }

    pub fn num_states(self) -> usize {
        1 << self.state_bits()
    }
}

/// Differential pre-coder over the quadrant decision: makes the symbol
/// stream invariant to a 90-degree constellation rotation ambiguity.
#[derive(Debug, Clone, Copy, Default)]
pub struct DifferentialEncoder {
    z_1: i32,
}

impl DifferentialEncoder {
    pub fn new() -> Self {
        Self { z_1: 0 }
    }

    /// `Z[0] = (I1 + 2*I2 + Z_1) mod 4`, `Z[1] = (Z[0] + 2*I0 + U0) mod 4`.
    pub fn encode(&mut self, i0: i32, i1: i32, i2: i32, u0: i32) -> [i32; 2] {
        let z0 = (i1 + 2 * i2 + self.z_1).rem_euclid(4);
        self.z_1 = z0;
        let z1 = (z0 + 2 * i0 + u0).rem_euclid(4);
        [z0, z1]
    }
}

/// Inverse of `DifferentialEncoder`, used on the receive side once the
/// Viterbi decoder has resolved the quadrant decisions.
#[derive(Debug, Clone, Copy, Default)]
pub struct DifferentialDecoder {
    z_1: i32,
}

impl DifferentialDecoder {
    pub fn new() -> Self {
        Self { z_1: 0 }
    }

    /// Recovers `(i1_plus_2i2, i0_plus_u0)` residues from `[z0, z1]`;
    /// callers combine with the shell/ring decode to split `i1`/`i2`.
    pub fn decode(&mut self, z: [i32; 2]) -> (i32, i32) {
        let d1 = (z[0] - self.z_1).rem_euclid(4);
        self.z_1 = z[0];
        let d2 = (z[1] - z[0]).rem_euclid(4);
        (d1, d2)
    }
}

/// Rate 1/2 convolutional encoder over the selected state-bit count.
/// `input_bit` is the bit that selects the coset (`Y[0]` in the spec);
/// the state is the shift register of the last `state_bits` such bits.
#[derive(Debug, Clone)]
pub struct TrellisEncoder {
    rate: TrellisRate,
    state: u32,
}

impl TrellisEncoder {
    pub fn new(rate: TrellisRate) -> Self {
        Self { rate, state: 0 }
    }

    pub fn rate(&self) -> TrellisRate {
        self.rate
    }

    pub fn state(&self) -> u32 {
        self.state
    }

    /// Steps the shift register with `y0` and returns the parity bit
    /// `c0` used to build `U0 = y0 ^ c0 ^ v0`.
    pub fn step(&mut self, y0: u32) -> u32 {
        let mask = (1 << self.rate.state_bits()) - 1;
        let parity = (self.state.count_ones() + y0) & 1;
        self.state = ((self.state << 1) | y0) & mask;
        parity
    }
}

/// Receive-side next-state function mirroring `TrellisEncoder::step`, used
/// by the Viterbi decoder to enumerate branch transitions.
pub fn trellis_next_state(rate: TrellisRate, state: u32, y0: u32) -> u32 {
    let mask = rate.num_states() as u32 - 1;
    ((state << 1) | y0) & mask
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn differential_encoder_decoder_are_consistent_shape() {
        let mut enc = DifferentialEncoder::new();
        let z = enc.encode(1, 0, 1, 0);
        assert!(z[0] < 4 && z[1] < 4);
    }

    #[test]
    fn trellis_state_space_matches_rate() {
        assert_eq!(TrellisRate::States16.num_states(), 16);
        assert_eq!(TrellisRate::States32.num_states(), 32);
        assert_eq!(TrellisRate::States64.num_states(), 64);
    }

    #[test]
    fn encoder_state_stays_in_range() {
        let mut enc = TrellisEncoder::new(TrellisRate::States32);
        for i in 0..100u32 {
            enc.step(i & 1);
            assert!(enc.state() < 32);
        }
    }

    #[test]
    fn next_state_function_matches_encoder_step() {
        let mut enc = TrellisEncoder::new(TrellisRate::States16);
        let s0 = enc.state();
        enc.step(1);
        assert_eq!(enc.state(), trellis_next_state(TrellisRate::States16, s0, 1));
    }
}
