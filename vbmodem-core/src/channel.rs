//! AWGN test channel: additive noise on the 8 kHz linear-PCM sample
//! stream, for exercising a pump's receive side without real audio
//! hardware.

use rand::Rng;
use rand_distr::StandardNormal;

/// Add Gaussian noise to a PCM sample block in place. `noise_std` is in
/// the same units as the samples (linear PCM counts), so a `noise_std`
/// of a few hundred against full-scale ±32767 models a noisy line.
pub fn apply_pcm_noise<R: Rng>(samples: &mut [i16], noise_std: f64, rng: &mut R) {
    for sample in samples.iter_mut() {
        let noise: f64 = rng.sample::<f64, _>(StandardNormal) * noise_std;
        *sample = (*sample as f64 + noise).clamp(i16::MIN as f64, i16::MAX as f64) as i16;
    }
}

/// Scale a PCM sample block by a linear attenuation factor (`< 1.0`
/// reduces power), then add noise. Useful for modeling a weak line
/// together with AWGN in one pass.
pub fn apply_pcm_channel<R: Rng>(samples: &mut [i16], attenuation: f64, noise_std: f64, rng: &mut R) {
    for sample in samples.iter_mut() {
        let attenuated = *sample as f64 * attenuation;
        let noise: f64 = rng.sample::<f64, _>(StandardNormal) * noise_std;
        *sample = (attenuated + noise).clamp(i16::MIN as f64, i16::MAX as f64) as i16;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn noise_is_deterministic_with_seed() {
        let mut a = vec![1000i16; 8];
        let mut b = a.clone();
        apply_pcm_noise(&mut a, 50.0, &mut StdRng::seed_from_u64(7));
        apply_pcm_noise(&mut b, 50.0, &mut StdRng::seed_from_u64(7));
        assert_eq!(a, b);
    }

    #[test]
    fn zero_noise_with_unity_attenuation_preserves_signal() {
        let mut samples = vec![1234i16, -4321];
        apply_pcm_channel(&mut samples, 1.0, 0.0, &mut StdRng::seed_from_u64(1));
        assert_eq!(samples, vec![1234, -4321]);
    }

    #[test]
    fn attenuation_reduces_magnitude() {
        let mut samples = vec![10000i16];
        apply_pcm_channel(&mut samples, 0.5, 0.0, &mut StdRng::seed_from_u64(1));
        assert_eq!(samples[0], 5000);
    }
}
