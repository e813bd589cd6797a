//! V.90 PCM mapping-frame data pump (C11): downstream PCM-coded frames
//! over a ring-coder index, shaped by a sign-hypothesis trellis search,
//! negotiated by the CP capability exchange before `DATA`.
//!
//! Only the downstream mapping-frame path is implemented (see this
//! project's design notes); the upstream rate-adapted V.34-style path
//! and digital-pad/robbed-bit-signaling detection are out of scope.

pub mod cp_frame;
pub mod decoder;
pub mod encoder;
pub mod tables;

pub use cp_frame::CpFrame;
pub use decoder::V90Decoder;
pub use encoder::{V90Encoder, V90Params};

const FRAME_SIZE: usize = 6;

fn ucode_tables(a_law: bool) -> [Vec<i16>; FRAME_SIZE] {
    std::array::from_fn(|_| tables::ucode_to_linear_table(a_law))
}

/// Builds a matched encoder/decoder pair for one negotiated connection.
pub struct V90Modem {
    pub encoder: V90Encoder,
    pub decoder: V90Decoder,
}

impl V90Modem {
    pub fn new(params: V90Params, a_law: bool) -> Self {
        let linear_tables = ucode_tables(a_law);

        let m_to_ucode: [[u8; 128]; FRAME_SIZE] = std::array::from_fn(|j| {
            let mut table = [0u8; 128];
            for (code, slot) in table.iter_mut().enumerate() {
                *slot = code as u8;
            }
            table.sort_by_key(|&code| std::cmp::Reverse(linear_tables[j][code as usize]));
            table
        });

        Self {
            encoder: V90Encoder::new(params, m_to_ucode),
            decoder: V90Decoder::new(params.m, linear_tables),
        }
    }

    /// Capability packet advertising this side's ring parameters and
    /// spectral-shaping coefficients, ready for `CpFrame::to_bits`.
    pub fn capability_packet(&self, params: &V90Params, a_law: bool) -> CpFrame {
        CpFrame {
            drn: 0,
            sr: (6 - params.s) as u8,
            ack: false,
            a_law,
            v34_symbol_rate_mask: 0,
            ld: params.ld as u8,
            rms_trn1d: 0,
            a1: params.a1 as i8,
            a2: params.a2 as i8,
            b1: params.b1 as i8,
            b2: params.b2 as i8,
            m_index: [0; 6],
            second_constellation: false,
            constellation_masks: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_matched_encoder_decoder_pair() {
        let params = V90Params::default();
        let mut modem = V90Modem::new(params, false);
        assert_eq!(modem.encoder.encode_frame(0, 0).len(), FRAME_SIZE);
    }

    #[test]
    fn capability_packet_serializes_cleanly() {
        let params = V90Params::default();
        let modem = V90Modem::new(params, false);
        let cp = modem.capability_packet(&params, false);
        let bits = cp.to_bits();
        assert!(CpFrame::from_bits(&bits).is_some());
    }
}
