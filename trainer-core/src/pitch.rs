//! # Pitch Detection Module
//!
//! Single-pitch fundamental-frequency estimation by time-domain
//! autocorrelation, tuned for plucked strings between roughly D2 and B5.
//!
//! ## Algorithm
//! 1. Remove DC, gate on peak amplitude and peak-normalize ([`crate::preprocess`])
//! 2. Autocorrelate over the lags allowed by `[min_f0, max_f0]`
//! 3. Skip the zero-lag lobe (everything before the first non-positive value)
//! 4. Take the strongest lag, first occurrence winning ties
//! 5. Refine it on the normalized square difference function (McLeod) and
//!    interpolate the peak to sub-sample accuracy
//!
//! The direct correlation is O(N^2) per frame. Frames are short and fixed in
//! length, so this stays well within the frame period; an FFT path is
//! available through [`CorrelationMethod::Fft`].

use crate::config::{CorrelationMethod, PitchConfig};
use crate::fft::autocorrelation_fft;
use crate::preprocess::preprocess_frame;

/// Samples a refined period may sit outside `[sr / max_f0, sr / min_f0]`
/// and still be reported, clamped to the range.
const PERIOD_SLACK: f32 = 0.25;

/// Estimates the fundamental of a raw frame with default settings.
///
/// # Returns
/// * `Some(frequency)` - Detected frequency in Hz, within `[MIN_F0, MAX_F0]`
/// * `None` - No pitch detected (silence, noise, or out-of-range period)
pub fn estimate_pitch(frame: &[f32], sample_rate: u32) -> Option<f32> {
    estimate_pitch_with(frame, sample_rate, &PitchConfig::default())
}

/// Estimates the fundamental of a raw frame.
pub fn estimate_pitch_with(frame: &[f32], sample_rate: u32, config: &PitchConfig) -> Option<f32> {
    let normalized = preprocess_frame(frame, config.amplitude_threshold)?;
    estimate_normalized(&normalized, sample_rate, config)
}

/// Estimates the fundamental of a frame that is already centered and
/// peak-normalized.
pub fn estimate_normalized(signal: &[f32], sample_rate: u32, config: &PitchConfig) -> Option<f32> {
    let (min_lag, max_lag) = lag_bounds(signal.len(), sample_rate, config)?;

    // Two lags past the window so a peak on its edge can still be refined.
    let corr = match config.method {
        CorrelationMethod::Direct => autocorrelation(signal, max_lag + 2),
        CorrelationMethod::Fft => autocorrelation_fft(signal, max_lag + 2),
    };
    let energy = corr[0];
    if energy <= 0.0 {
        return None;
    }

    // The correlation starts at its maximum and falls off; anything before it
    // first drops to zero belongs to that lobe, not to a period.
    let lobe_end = corr.iter().position(|&c| c <= 0.0)?;
    let start = min_lag.max(lobe_end);
    if start > max_lag {
        return None;
    }

    let mut best_lag = 0;
    let mut best = f32::MIN;
    for (lag, &value) in corr.iter().enumerate().take(max_lag + 1).skip(start) {
        if value > best {
            best = value;
            best_lag = lag;
        }
    }
    if best_lag == 0 || best / energy < config.min_correlation {
        return None;
    }

    let period = refine_lag(signal, &corr, best_lag, start, max_lag)?;
    let sr = sample_rate as f32;
    if period < sr / config.max_f0 - PERIOD_SLACK || period > sr / config.min_f0 + PERIOD_SLACK {
        return None;
    }
    Some((sr / period).clamp(config.min_f0, config.max_f0))
}

/// Computes `corr[lag] = sum x[i] * x[i + lag]` for `lag` in `0..=max_lag`,
/// truncated to the signal length.
pub fn autocorrelation(signal: &[f32], max_lag: usize) -> Vec<f32> {
    let n = signal.len();
    (0..(max_lag + 1).min(n))
        .map(|lag| {
            signal[..n - lag]
                .iter()
                .zip(&signal[lag..])
                .map(|(a, b)| a * b)
                .sum()
        })
        .collect()
}

/// Lag window `[floor(sr / max_f0), min(n - 1, floor(sr / min_f0))]`.
fn lag_bounds(len: usize, sample_rate: u32, config: &PitchConfig) -> Option<(usize, usize)> {
    if len < 2 || sample_rate == 0 || !(config.min_f0 > 0.0 && config.max_f0 > config.min_f0) {
        return None;
    }
    let sr = sample_rate as f32;
    let min_lag = (sr / config.max_f0).floor() as usize;
    let max_lag = ((sr / config.min_f0).floor() as usize).min(len - 1);
    if min_lag >= max_lag {
        return None;
    }
    Some((min_lag, max_lag))
}

/// Sub-sample period around `lag`, or `None` when the peak lies outside the
/// lag window.
///
/// The raw correlation sums fewer products at longer lags, which drags its
/// peaks towards zero lag. That bias helps choose between a period and its
/// multiples, but not to locate the peak. Refinement climbs and interpolates
/// the normalized square difference `2 r(l) / m(l)` instead, where `m(l)` is
/// the energy of both overlapping windows. It reaches exactly 1 at the period
/// of any periodic signal.
///
/// The climb may step one lag past `hi`, since a fractional period just
/// above the last whole lag is still in range.
fn refine_lag(signal: &[f32], corr: &[f32], lag: usize, lo: usize, hi: usize) -> Option<f32> {
    let n = signal.len();
    let energy: Vec<f64> = std::iter::once(0.0)
        .chain(signal.iter().scan(0.0, |acc, &s| {
            *acc += f64::from(s) * f64::from(s);
            Some(*acc)
        }))
        .collect();
    let nsdf = |l: usize| {
        let m = energy[n - l] + energy[n] - energy[l];
        if m > 0.0 { 2.0 * f64::from(corr[l]) / m } else { 0.0 }
    };

    let last = corr.len() - 1;
    let top = (hi + 1).min(last);
    let mut peak = lag;
    while peak < top && nsdf(peak + 1) > nsdf(peak) {
        peak += 1;
    }
    while peak > lo && nsdf(peak - 1) > nsdf(peak) {
        peak -= 1;
    }

    // Still rising at a window edge
    let rising_up = peak == top && peak < last && nsdf(peak + 1) > nsdf(peak);
    let rising_down = peak == lo && nsdf(peak - 1) > nsdf(peak);
    if rising_up || rising_down {
        return None;
    }

    if peak == last {
        return Some(peak as f32);
    }
    let y1 = nsdf(peak - 1);
    let y2 = nsdf(peak);
    let y3 = nsdf(peak + 1);
    let denominator = y1 - 2.0 * y2 + y3;
    if denominator >= -1e-12 {
        // Flat or not a maximum
        return Some(peak as f32);
    }
    let shift = ((y1 - y3) / (2.0 * denominator)).clamp(-0.5, 0.5);
    Some(peak as f32 + shift as f32)
}
