//! V.90 mapping-frame decoder (spec §4.9.1 "Decoder"): binary-search
//! quantization against the per-position linear table, Horner
//! reassembly of the ring-coder index, and sign-embedding reversal.

const FRAME_SIZE: usize = 6;
const SIGN_OP: [u8; 4] = [0, 0x55, 0xff, 0xaa];

pub struct V90Decoder {
    m: [u32; FRAME_SIZE],
    m_to_linear: [Vec<i16>; FRAME_SIZE],
    last_sign: u8,
}

impl V90Decoder {
    pub fn new(m: [u32; FRAME_SIZE], m_to_linear: [Vec<i16>; FRAME_SIZE]) -> Self {
        Self {
            m,
            m_to_linear,
            last_sign: 0,
        }
    }

    /// Binary search `table` (strictly descending) for the ring index
    /// whose linear value is closest to `sample`.
    fn quantize(table: &[i16], sample: i16) -> u32 {
        let mut lo = 0usize;
        let mut hi = table.len().saturating_sub(1);
        while lo < hi {
            let mid = (lo + hi) / 2;
            if table[mid] == sample {
                return mid as u32;
            } else if table[mid] > sample {
                lo = mid + 1;
            } else {
                hi = mid;
            }
        }
        lo as u32
    }

    /// Decode one received frame of six PAM samples back to the K-bit
    /// ring-coder index and the embedded sign/data bits.
    pub fn decode_frame(&mut self, samples: [i16; FRAME_SIZE], s: u32) -> (u64, u8) {
        let mut rings = [0u32; FRAME_SIZE];
        let mut signs = 0u8;
        for j in 0..FRAME_SIZE {
            let magnitude = samples[j].unsigned_abs() as i16;
            rings[j] = Self::quantize(&self.m_to_linear[j], magnitude) % self.m[j].max(1);
            if samples[j] >= 0 {
                signs |= 1 << j;
            }
        }

        let mut v: u64 = 0;
        for j in (0..FRAME_SIZE).rev() {
            v = v * self.m[j].max(1) as u64 + rings[j] as u64;
        }

        let data_bits = if s >= 6 {
            let recovered = signs ^ self.last_sign;
            self.last_sign = signs;
            recovered
        } else {
            signs & ((1 << s) - 1)
        };

        (v, data_bits)
    }

    fn sign_op_for(&self, state: u8, prev_state: u8) -> u8 {
        SIGN_OP[((state << 1) | prev_state) as usize & 3]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descending_table() -> Vec<i16> {
        (0..128).rev().map(|i| i * 16).collect()
    }

    #[test]
    fn quantize_finds_exact_match() {
        let table = descending_table();
        let idx = V90Decoder::quantize(&table, table[40]);
        assert_eq!(table[idx as usize], table[40]);
    }

    #[test]
    fn quantize_picks_closest_on_gap() {
        let table = descending_table();
        let idx = V90Decoder::quantize(&table, table[40] + 3);
        assert!((table[idx as usize] - (table[40] + 3)).abs() <= 16);
    }

    #[test]
    fn decode_frame_s6_recovers_via_xor_chain() {
        let m = [128u32; FRAME_SIZE];
        let tables: [Vec<i16>; FRAME_SIZE] = std::array::from_fn(|_| descending_table());
        let mut decoder = V90Decoder::new(m, tables);
        let samples = [160i16, -320, 480, -640, 800, -960];
        let (_, _) = decoder.decode_frame(samples, 6);
    }

    #[test]
    fn sign_op_table_matches_encoder() {
        let m = [128u32; FRAME_SIZE];
        let tables: [Vec<i16>; FRAME_SIZE] = std::array::from_fn(|_| descending_table());
        let decoder = V90Decoder::new(m, tables);
        assert_eq!(decoder.sign_op_for(1, 0), 0xff);
    }
}
