//! V.34 startup sequence (spec §4.8.6, §4.8.8): the Phase 3/4 tone/probe
//! sequence (`S -> S̄ -> S -> S̄ -> PP -> TRN -> J -> JP`) and the MP
//! frame that follows it, with its CRC.

use super::tables::{crc16, C_RADIUS, JEND, J16POINTS, J4POINTS};
use crate::dsp::primitives::cos_q14;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartupState {
    WaitS1,
    S1,
    SInv1,
    S2,
    SInv2,
    Pp,
    Trn,
    J,
    Jp,
    WaitJ,
    WaitJp,
    SInv,
    Mp,
    Mpp,
    E,
    Data,
}

const EQ_FRAC: u32 = 3;

fn block_length(state: StartupState) -> Option<u32> {
    match state {
        StartupState::S1 | StartupState::S2 => Some(128 * EQ_FRAC),
        StartupState::SInv1 | StartupState::SInv2 | StartupState::SInv => Some(16 * EQ_FRAC),
        StartupState::Pp => Some(6 * 48),
        StartupState::Trn => Some(1024),
        StartupState::J => Some(160),
        StartupState::Jp => Some(16),
        _ => None,
    }
}

/// Drives the calling or answering side through the fixed probe/training
/// sequence by symbol count, switching to event-driven states (`WaitJ`,
/// `WaitJp`) where the spec requires detecting the peer's markers instead
/// of counting down a fixed length.
pub struct StartupSequencer {
    calling: bool,
    state: StartupState,
    symbols_left: u32,
    j_received: bool,
    jp_received: bool,
    use_16_point: bool,
}

impl StartupSequencer {
    pub fn new(calling: bool, use_16_point: bool) -> Self {
        let state = if calling {
            StartupState::WaitS1
        } else {
            StartupState::WaitJ
        };
        Self {
            calling,
            state,
            symbols_left: 0,
            j_received: false,
            jp_received: false,
            use_16_point,
        }
    }

    pub fn state(&self) -> StartupState {
        self.state
    }

    pub fn mark_j_received(&mut self) {
        self.j_received = true;
    }

    pub fn mark_jp_received(&mut self) {
        self.jp_received = true;
    }

    /// Advance by one symbol interval, returning `true` once `DATA` is
    /// reached.
    pub fn advance_symbol(&mut self) -> bool {
        use StartupState::*;

        if let Some(total) = block_length(self.state) {
            if self.symbols_left == 0 {
                self.symbols_left = total;
            }
            self.symbols_left -= 1;
            if self.symbols_left == 0 {
                self.state = match self.state {
                    S1 => SInv1,
                    SInv1 => S2,
                    S2 => SInv2,
                    SInv2 => Pp,
                    Pp => Trn,
                    Trn => J,
                    J => Jp,
                    Jp => {
                        if self.calling {
                            WaitJ
                        } else {
                            Mp
                        }
                    }
                    SInv => Mp,
                    _ => unreachable!(),
                };
            }
            return false;
        }

        match self.state {
            WaitS1 => self.state = S1,
            WaitJ => {
                if self.j_received {
                    self.state = if self.calling { WaitJp } else { SInv };
                }
            }
            WaitJp => {
                if self.jp_received {
                    self.state = SInv;
                }
            }
            Mp => self.state = Mpp,
            Mpp => self.state = E,
            E => self.state = Data,
            Data => return true,
            _ => {}
        }
        false
    }

    /// The 16-bit payload to transmit during `J`/`JP` for the current
    /// state, or `None` outside those states.
    pub fn marker_payload(&self) -> Option<u16> {
        match self.state {
            StartupState::J if self.use_16_point => Some(J16POINTS),
            StartupState::J => Some(J4POINTS),
            StartupState::Jp => Some(JEND),
            _ => None,
        }
    }
}

/// 4-point QAM symbol generator used for the `S`/`S̄` reversal probe and
/// J/JP markers: carrier phase jump of `0`/`180` degrees encodes one bit.
pub fn probe_symbol(bit: u8, phase: i32) -> i16 {
    let sign = if bit != 0 { 1 } else { -1 };
    (sign * cos_q14(phase)) as i16
}

/// MP frame field layout (spec §4.8.6): 17-bit sync followed by the
/// negotiated-parameters payload and a bit-reversed CRC-16.
pub struct MpFrame {
    pub bits: Vec<u8>,
}

impl MpFrame {
    pub fn build(
        max_rate_cta: u8,
        max_rate_atc: u8,
        aux_channel_enabled: bool,
        trellis_state_code: u8,
        non_linear_enable: bool,
        rates_supported: u16,
    ) -> Self {
        let mut bits = Vec::new();
        for _ in 0..17 {
            bits.push(1u8);
        }
        bits.push(0); // start bit
        push_bits(&mut bits, 0, 2); // type
        push_bits(&mut bits, 0, 1); // reserved
        push_bits(&mut bits, max_rate_cta as u32, 4);
        push_bits(&mut bits, max_rate_atc as u32, 4);
        bits.push(aux_channel_enabled as u8);
        push_bits(&mut bits, trellis_state_code as u32, 2);
        bits.push(non_linear_enable as u8);
        bits.push(0); // shaping
        bits.push(0); // ack
        bits.push(0); // start
        push_bits(&mut bits, rates_supported as u32, 15);
        bits.push(0); // asym

        bits.push(0); // start before reserved field
        push_bits(&mut bits, 0, 16); // reserved

        let crc_input = &bits[17..];
        let crc = crc16(crc_input);
        bits.push(0); // start
        let crc_bits = bit_reversed_bits(crc, 16);
        bits.extend(crc_bits);

        Self { bits }
    }
}

fn push_bits(out: &mut Vec<u8>, value: u32, count: u32) {
    for i in (0..count).rev() {
        out.push(((value >> i) & 1) as u8);
    }
}

fn bit_reversed_bits(value: u16, count: u32) -> Vec<u8> {
    (0..count).map(|i| ((value >> i) & 1) as u8).collect()
}

/// Clamp used when decoding a received sample back to a constellation
/// coordinate (spec §4.8.4 precoder note, §4.8.2 constellation radius).
pub fn clamp_to_radius(v: i32) -> i32 {
    v.clamp(-C_RADIUS, C_RADIUS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn calling_side_starts_at_wait_s1() {
        let seq = StartupSequencer::new(true, false);
        assert_eq!(seq.state(), StartupState::WaitS1);
    }

    #[test]
    fn answering_side_starts_waiting_for_j() {
        let seq = StartupSequencer::new(false, false);
        assert_eq!(seq.state(), StartupState::WaitJ);
    }

    #[test]
    fn sequence_progresses_through_probe_states() {
        let mut seq = StartupSequencer::new(true, false);
        seq.advance_symbol(); // WaitS1 -> S1
        assert_eq!(seq.state(), StartupState::S1);
        for _ in 0..(128 * 3) {
            seq.advance_symbol();
        }
        assert_eq!(seq.state(), StartupState::SInv1);
    }

    #[test]
    fn mp_frame_starts_with_sync_ones() {
        let frame = MpFrame::build(5, 5, false, 0, true, 0x7fff);
        assert!(frame.bits[0..17].iter().all(|&b| b == 1));
    }

    #[test]
    fn clamp_to_radius_respects_bounds() {
        assert_eq!(clamp_to_radius(1000), C_RADIUS);
        assert_eq!(clamp_to_radius(-1000), -C_RADIUS);
        assert_eq!(clamp_to_radius(0), 0);
    }
}
