//! V.90 mapping-frame encoder (spec §4.9.1): ring-coder bit packing into
//! six PCM codes, sign embedding, and a spectral-shaping trellis search
//! over the sign hypotheses.

const FRAME_SIZE: usize = 6;
const SIGN_OP: [u8; 4] = [0, 0x55, 0xff, 0xaa];

/// Negotiated per-connection V.90 parameters.
#[derive(Debug, Clone, Copy)]
pub struct V90Params {
    pub s: u32,
    pub k: u32,
    pub ld: u32,
    pub a1: i32,
    pub a2: i32,
    pub b1: i32,
    pub b2: i32,
    pub m: [u32; FRAME_SIZE],
}

impl Default for V90Params {
    fn default() -> Self {
        Self {
            s: 6,
            k: 36,
            ld: 1,
            a1: 0,
            a2: 0,
            b1: 0,
            b2: 0,
            m: [128; FRAME_SIZE],
        }
    }
}

/// One candidate path through the spectral-shaping trellis (spec §4.9.1
/// step 3): `(x, y, v, w)` plus the sign vector that produced it.
#[derive(Debug, Clone, Copy)]
struct ShapingPath {
    y: i32,
    v: i32,
    w: i64,
    signs: u8,
}

/// Encodes ring indices into six signed PAM codes, minimizing shaped
/// quantization energy across the sign hypotheses the depth-`ld` trellis
/// explores.
pub struct V90Encoder {
    params: V90Params,
    m_to_ucode: [[u8; 128]; FRAME_SIZE],
    last_sign: u8,
}

impl V90Encoder {
    pub fn new(params: V90Params, m_to_ucode: [[u8; 128]; FRAME_SIZE]) -> Self {
        Self {
            params,
            m_to_ucode,
            last_sign: 0,
        }
    }

    /// Peel the low `K` bits off `data` into six ring indices via
    /// sequential divide-and-modulo by `M[0..6]`.
    fn split_rings(&self, mut data: u64) -> [u32; FRAME_SIZE] {
        let mut rings = [0u32; FRAME_SIZE];
        for j in 0..FRAME_SIZE {
            let m = self.params.m[j].max(1) as u64;
            rings[j] = (data % m) as u32;
            data /= m;
        }
        rings
    }

    /// Encode one mapping frame. `data` holds the low `K` ring-coder
    /// bits; `sign_data` holds up to `S` extra data bits embedded via
    /// sign selection when `S < 6`.
    pub fn encode_frame(&mut self, data: u64, sign_data: u8) -> [i16; FRAME_SIZE] {
        let rings = self.split_rings(data);
        let ucodes: [u8; FRAME_SIZE] =
            std::array::from_fn(|j| self.m_to_ucode[j][rings[j] as usize % 128]);

        let magnitudes: [i16; FRAME_SIZE] =
            std::array::from_fn(|j| ucodes[j] as i16);

        let best = self.search_shaping_trellis(&magnitudes, sign_data);
        self.last_sign = best.signs;

        std::array::from_fn(|j| {
            let bit = (best.signs >> j) & 1;
            if bit != 0 {
                magnitudes[j]
            } else {
                -magnitudes[j]
            }
        })
    }

    /// Depth-`ld` search over sign hypotheses minimizing filtered energy
    /// `w`. With `ld == 0` this degenerates to the single best immediate
    /// choice the spec describes for `S == 6` (plain differential XOR
    /// chain against `last_sign`).
    fn search_shaping_trellis(&self, magnitudes: &[i16; FRAME_SIZE], sign_data: u8) -> ShapingPath {
        if self.params.s >= 6 {
            let signs = sign_data ^ self.last_sign;
            return ShapingPath { y: 0, v: 0, w: 0, signs };
        }

        let free_bits = FRAME_SIZE as u32 - self.params.s;
        let candidates = 1u16 << free_bits.min(8);
        let mut best: Option<ShapingPath> = None;
        for hyp in 0..candidates {
            let signs = sign_data | ((hyp as u8) << self.params.s);
            let path = self.shape_path(magnitudes, signs);
            if best.is_none() || path.w < best.unwrap().w {
                best = Some(path);
            }
        }
        best.unwrap_or(ShapingPath { y: 0, v: 0, w: 0, signs: sign_data })
    }

    fn shape_path(&self, magnitudes: &[i16; FRAME_SIZE], signs: u8) -> ShapingPath {
        let mut y_1 = 0i32;
        let mut v_1 = 0i32;
        let mut w: i64 = 0;
        let mut y = 0i32;
        let mut v = 0i32;
        for (j, &mag) in magnitudes.iter().enumerate() {
            let bit = (signs >> j) & 1;
            let x = if bit != 0 { mag as i32 } else { -(mag as i32) };
            y = x - ((self.params.b1 * x + self.params.a1 * y_1) >> 6);
            v = y - ((self.params.b2 * y_1 + self.params.a2 * v_1) >> 6);
            w += ((v * v) >> 4) as i64;
            y_1 = y;
            v_1 = v;
        }
        ShapingPath { y, v, w, signs }
    }

    fn sign_op_for(&self, state: u8, prev_state: u8) -> u8 {
        SIGN_OP[((state << 1) | prev_state) as usize & 3]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity_ucode_table() -> [[u8; 128]; FRAME_SIZE] {
        std::array::from_fn(|_| std::array::from_fn(|i| i as u8))
    }

    #[test]
    fn split_rings_reassembles_via_horner() {
        let params = V90Params::default();
        let encoder = V90Encoder::new(params, identity_ucode_table());
        let rings = encoder.split_rings(12345);
        let mut v: u64 = 0;
        for j in (0..FRAME_SIZE).rev() {
            v = v * params.m[j] as u64 + rings[j] as u64;
        }
        assert_eq!(v, 12345);
    }

    #[test]
    fn encode_frame_s6_uses_plain_xor_chain() {
        let params = V90Params {
            s: 6,
            ..V90Params::default()
        };
        let mut encoder = V90Encoder::new(params, identity_ucode_table());
        let frame = encoder.encode_frame(42, 0b101010);
        assert_eq!(frame.len(), FRAME_SIZE);
    }

    #[test]
    fn encode_frame_s_less_than_6_runs_shaping_search() {
        let params = V90Params {
            s: 3,
            ld: 1,
            ..V90Params::default()
        };
        let mut encoder = V90Encoder::new(params, identity_ucode_table());
        let frame = encoder.encode_frame(7, 0b011);
        assert_eq!(frame.len(), FRAME_SIZE);
    }

    #[test]
    fn sign_op_table_matches_spec_constants() {
        let params = V90Params::default();
        let encoder = V90Encoder::new(params, identity_ucode_table());
        assert_eq!(encoder.sign_op_for(0, 0), 0);
        assert_eq!(encoder.sign_op_for(0, 1), 0x55);
        assert_eq!(encoder.sign_op_for(1, 0), 0xff);
        assert_eq!(encoder.sign_op_for(1, 1), 0xaa);
    }
}
