//! Fixed-point DSP primitives shared by every data pump (C1): the Q14
//! cosine table, Goertzel-style DFT magnitude, small FFT, slow DFT for
//! arbitrary N, and the Hamming window.

pub mod primitives;

pub use primitives::{
    cos_q14, dot_product, fft, goertzel_power, goertzel_tables, hamming_window, norm2, sin_q14,
    slow_dft, COS_BASE, COS_BITS, PHASE_BASE, PHASE_BITS,
};
