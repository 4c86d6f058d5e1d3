//! # Fast Fourier Transform (FFT) Module
//!
//! FFT-backed autocorrelation for the pitch estimator. The direct O(N^2) sum
//! in [`crate::pitch`] is the default; this path computes identical values
//! through the Wiener-Khinchin theorem and pays off for long frames.

use rustfft::{num_complex::Complex, FftPlanner};

/// Computes `corr[lag] = sum x[i] * x[i + lag]` for `lag` in `0..=max_lag`.
///
/// The signal is zero-padded to at least twice its length so the circular
/// correlation produced by the FFT equals the linear one. The result is
/// truncated to the signal length if `max_lag` reaches past it.
pub fn autocorrelation_fft(signal: &[f32], max_lag: usize) -> Vec<f32> {
    let n = signal.len();
    if n == 0 {
        return Vec::new();
    }
    let fft_len = (2 * n).next_power_of_two();

    let mut planner = FftPlanner::new();
    let forward = planner.plan_fft_forward(fft_len);
    let inverse = planner.plan_fft_inverse(fft_len);

    let mut buffer: Vec<Complex<f32>> = signal
        .iter()
        .map(|&sample| Complex { re: sample, im: 0.0 })
        .chain(std::iter::repeat(Complex { re: 0.0, im: 0.0 }))
        .take(fft_len)
        .collect();

    forward.process(&mut buffer);
    for bin in buffer.iter_mut() {
        // Power spectrum: X * conj(X)
        *bin = Complex { re: bin.norm_sqr(), im: 0.0 };
    }
    inverse.process(&mut buffer);

    // rustfft does not normalize the inverse transform.
    let scale = 1.0 / fft_len as f32;
    buffer
        .iter()
        .take((max_lag + 1).min(n))
        .map(|c| c.re * scale)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pitch::autocorrelation;

    #[test]
    fn test_matches_direct_sum() {
        let signal: Vec<f32> = (0..512)
            .map(|i| {
                let t = i as f32 / 8000.0;
                (2.0 * std::f32::consts::PI * 220.0 * t).sin()
                    + 0.3 * (2.0 * std::f32::consts::PI * 660.0 * t).sin()
            })
            .collect();

        let direct = autocorrelation(&signal, 200);
        let fast = autocorrelation_fft(&signal, 200);
        assert_eq!(direct.len(), fast.len());

        let tolerance = direct[0] * 1e-3;
        for (lag, (a, b)) in direct.iter().zip(&fast).enumerate() {
            assert!((a - b).abs() < tolerance, "lag {lag}: {a} vs {b}");
        }
    }

    #[test]
    fn test_truncates_to_signal_length() {
        let corr = autocorrelation_fft(&[1.0, -1.0, 1.0], 10);
        assert_eq!(corr.len(), 3);
        assert!((corr[0] - 3.0).abs() < 1e-4);
        assert!((corr[1] + 2.0).abs() < 1e-4);
        assert!((corr[2] - 1.0).abs() < 1e-4);
        assert!(autocorrelation_fft(&[], 4).is_empty());
    }
}
