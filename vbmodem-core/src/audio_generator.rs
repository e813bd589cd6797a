//! Test tone generator: a single band-limited sine at the 8 kHz linear-PCM
//! rate this crate operates at, used by test scenarios that need a clean
//! carrier or off-channel tone rather than a modulated signal.

use std::f64::consts::PI;

/// Generate `num_samples` of a sine tone at `freq_hz`, full-scale 16-bit
/// linear PCM at `sample_rate`. Frequencies at or above Nyquist are
/// clamped with a small safety margin rather than aliasing silently.
pub fn generate_tone(freq_hz: f64, num_samples: usize, sample_rate: usize) -> Vec<i16> {
    let nyquist = sample_rate as f64 / 2.0;
    let freq = freq_hz.min(nyquist * 0.95);
    let omega = 2.0 * PI * freq / sample_rate as f64;

    (0..num_samples)
        .map(|i| ((omega * i as f64).sin() * i16::MAX as f64) as i16)
        .collect()
}

/// Raised-sine fade applied in place to the first and last `fade_samples`
/// of a block, avoiding the click a hard-edged test tone would leave in
/// a loopback recording.
pub fn apply_fade_envelope(samples: &mut [i16], fade_samples: usize) {
    let fade_len = fade_samples.min(samples.len() / 2);
    let total = samples.len();

    for (i, sample) in samples.iter_mut().enumerate().take(fade_len) {
        let envelope = ((i as f64 / fade_len as f64) * PI / 2.0).sin();
        *sample = (*sample as f64 * envelope) as i16;
    }

    let start_idx = total.saturating_sub(fade_len);
    for (i, sample) in samples.iter_mut().enumerate().skip(start_idx) {
        let envelope = (((total - i) as f64 / fade_len as f64) * PI / 2.0).sin();
        *sample = (*sample as f64 * envelope) as i16;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tone_reaches_near_full_scale() {
        let samples = generate_tone(1000.0, 800, 8000);
        let max_amp = samples.iter().map(|&s| s.unsigned_abs()).max().unwrap();
        assert!(max_amp > 30000);
    }

    #[test]
    fn tone_above_nyquist_is_clamped_not_aliased() {
        let samples = generate_tone(20_000.0, 80, 8000);
        assert_eq!(samples.len(), 80);
    }

    #[test]
    fn fade_envelope_silences_block_edges() {
        let mut samples = vec![30000i16; 1000];
        apply_fade_envelope(&mut samples, 100);
        assert!(samples[0].abs() < 3000);
        assert!(samples[999].abs() < 3000);
        assert!((samples[500] - 30000).abs() < 10);
    }
}
