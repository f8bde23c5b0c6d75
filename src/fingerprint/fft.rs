use std::f64::consts::PI;

use super::complex::Complex;
use super::Fingerprint;

/// Windowed, zero-padded spectrum of `samples`.
pub fn transform(samples: &[f32]) -> Fingerprint {
    let mut windowed = hanning_window(samples);
    let padded_len = nearest_power_of_two(windowed.len());
    windowed.resize(padded_len, Complex::ZERO);
    Fingerprint(fft(&windowed))
}

/// `s[i] * (0.5 + 0.5*cos(2πi/N))`, computed in single precision.
pub fn hanning_window(samples: &[f32]) -> Vec<Complex> {
    let n = samples.len() as f32;
    samples
        .iter()
        .enumerate()
        .map(|(i, &s)| {
            let w = 0.5 + 0.5 * (2.0 * std::f32::consts::PI * i as f32 / n).cos();
            Complex::real(f64::from(s * w))
        })
        .collect()
}

/// Smallest power of two `>= n`; 0 maps to 1.
pub fn nearest_power_of_two(n: usize) -> usize {
    if n.is_power_of_two() {
        return n;
    }
    let mut v = n;
    let mut shift = 1;
    while shift < usize::BITS {
        v |= v >> shift;
        shift *= 2;
    }
    v + 1
}

/// Recursive radix-2 Cooley-Tukey FFT. `input.len()` must be a power of two.
pub fn fft(input: &[Complex]) -> Vec<Complex> {
    let n = input.len();
    if n <= 1 {
        return input.to_vec();
    }
    debug_assert!(n.is_power_of_two(), "fft length {} is not a power of two", n);

    let even: Vec<Complex> = input.iter().step_by(2).copied().collect();
    let odd: Vec<Complex> = input.iter().skip(1).step_by(2).copied().collect();
    let even = fft(&even);
    let odd = fft(&odd);

    let half = n / 2;
    let mut result = vec![Complex::ZERO; n];
    for k in 0..half {
        let omega = Complex::from_angle(-2.0 * PI * k as f64 / n as f64);
        let t = omega * odd[k];
        result[k] = even[k] + t;
        result[k + half] = even[k] - t;
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use rustfft::{num_complex::Complex as RefComplex, FftPlanner};

    #[test]
    fn nearest_power_of_two_bounds() {
        for n in 1..=1_000_000usize {
            let p = nearest_power_of_two(n);
            assert!(p.is_power_of_two(), "n={} p={}", n, p);
            assert!(p >= n, "n={} p={}", n, p);
            assert!(p < 2 * n, "n={} p={}", n, p);
        }
        assert_eq!(nearest_power_of_two(0), 1);
        assert_eq!(nearest_power_of_two(1024), 1024);
        assert_eq!(nearest_power_of_two(1025), 2048);
    }

    #[test]
    fn output_length_is_padded_power_of_two() {
        for len in [0usize, 1, 2, 3, 5, 100, 1000, 1024, 1500] {
            let samples = vec![0.25f32; len];
            let fingerprint = transform(&samples);
            assert!(fingerprint.len().is_power_of_two());
            assert!(fingerprint.len() >= len);
        }
        assert_eq!(transform(&[0.1; 1000]).len(), 1024);
    }

    #[test]
    fn window_tapers_from_one() {
        let windowed = hanning_window(&[1.0; 4]);
        assert_eq!(windowed[0], Complex::real(1.0));
        assert!((windowed[1].re - 0.5).abs() < 1e-6);
        assert!(windowed[2].re.abs() < 1e-6);
        assert!(windowed.iter().all(|c| c.im == 0.0));
    }

    #[test]
    fn impulse_has_flat_spectrum() {
        let mut input = vec![Complex::ZERO; 8];
        input[0] = Complex::real(1.0);
        for bin in fft(&input) {
            assert!((bin.re - 1.0).abs() < 1e-12);
            assert!(bin.im.abs() < 1e-12);
        }
    }

    #[test]
    fn matches_reference_fft() {
        let input: Vec<Complex> = (0..256)
            .map(|i| {
                let t = i as f64;
                Complex::new((t * 0.37).sin() + 0.1 * (t * 1.9).cos(), (t * 0.11).cos() * 0.3)
            })
            .collect();

        let mut reference: Vec<RefComplex<f64>> =
            input.iter().map(|c| RefComplex::new(c.re, c.im)).collect();
        FftPlanner::<f64>::new()
            .plan_fft_forward(reference.len())
            .process(&mut reference);

        for (ours, theirs) in fft(&input).iter().zip(&reference) {
            assert!((ours.re - theirs.re).abs() < 1e-9, "{:?} vs {:?}", ours, theirs);
            assert!((ours.im - theirs.im).abs() < 1e-9, "{:?} vs {:?}", ours, theirs);
        }
    }

    #[test]
    fn silence_transforms_to_zero_magnitudes() {
        let fingerprint = transform(&[0.0; 1024]);
        assert_eq!(fingerprint.len(), 1024);
        assert!(fingerprint.as_slice().iter().all(|c| c.abs() == 0.0));
    }
}
