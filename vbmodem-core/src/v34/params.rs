//! Derived per-connection parameters (spec §4.8.1): frame shape, shell
//! mapping depth, and constellation size from the negotiated symbol-rate
//! row and data rate.

use super::tables::SymbolRateRow;

/// All quantities derived once per connection from the negotiated
/// symbol-rate row, line rate `r_bps`, and auxiliary-channel flag.
#[derive(Debug, Clone, Copy)]
pub struct V34Params {
    pub symbol_rate: f64,
    pub carrier_low: f64,
    pub carrier_high: f64,

    /// Data-frame shape.
    pub n: u32,
    /// Mapping-frame length.
    pub b: u32,
    pub r: u32,
    /// Auxiliary-channel rate parameter; 0 when no aux channel.
    pub w: u32,

    /// Shell-mapping depth.
    pub k: u32,
    /// Halving shift applied while `k >= 32`.
    pub q: u32,
    /// Ring count.
    pub m: u32,
    /// Constellation size.
    pub l: u32,

    pub j: u32,
    pub p: u32,
}

impl V34Params {
    pub fn derive(row: SymbolRateRow, r_bps: u32, aux_channel: bool) -> Self {
        let symbol_rate = row.symbol_rate();
        let n = r_bps * 28 / (row.j * 100);
        let b = n.div_ceil(row.p);
        let r = n - (b - 1) * row.p;
        let w = if aux_channel { 15 - row.j } else { 0 };

        let (k, q) = shell_depth(b);
        let m = ((2f64).powf(k as f64 / 8.0)).ceil() as u32;
        let l = 4 * m * (1u32 << q);

        Self {
            symbol_rate,
            carrier_low: row.carrier_low(),
            carrier_high: row.carrier_high(),
            n,
            b,
            r,
            w,
            k,
            q,
            m,
            l,
            j: row.j,
            p: row.p,
        }
    }
}

fn shell_depth(b: u32) -> (u32, u32) {
    if b <= 12 {
        return (0, 0);
    }
    let mut k = b - 12;
    let mut q = 0;
    while k >= 32 {
        k /= 2;
        q += 1;
    }
    (k, q)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::v34::tables::SYMBOL_RATE_ROWS;

    #[test]
    fn small_b_has_zero_shell_depth() {
        assert_eq!(shell_depth(10), (0, 0));
        assert_eq!(shell_depth(12), (0, 0));
    }

    #[test]
    fn large_b_halves_k_below_32() {
        let (k, q) = shell_depth(12 + 100);
        assert!(k < 32);
        assert!(q >= 1);
    }

    #[test]
    fn derive_produces_consistent_frame_shape() {
        let row = SYMBOL_RATE_ROWS[0];
        let params = V34Params::derive(row, 28800, false);
        assert_eq!(params.r, params.n - (params.b - 1) * params.p);
        assert_eq!(params.w, 0);
    }

    #[test]
    fn aux_channel_sets_w_from_j() {
        let row = SYMBOL_RATE_ROWS[0];
        let params = V34Params::derive(row, 28800, true);
        assert_eq!(params.w, 15 - row.j);
    }
}
