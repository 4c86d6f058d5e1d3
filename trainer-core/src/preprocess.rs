//! Frame conditioning ahead of the correlator: DC removal, amplitude gate
//! and peak normalization.

/// Removes the DC offset from a signal by making its average value zero.
pub fn remove_dc_offset(signal: &mut [f32]) {
    let len = signal.len();
    if len == 0 {
        return;
    }
    let avg = signal.iter().sum::<f32>() / len as f32;
    for sample in signal.iter_mut() {
        *sample -= avg;
    }
}

/// Largest absolute sample value.
pub fn peak_amplitude(signal: &[f32]) -> f32 {
    signal.iter().fold(0.0_f32, |peak, &s| peak.max(s.abs()))
}

/// Centers a frame and scales it to unit peak.
///
/// Returns `None` when the centered peak is below `amplitude_threshold`
/// (silence, handling noise) or the frame is empty. The input is not
/// modified.
pub fn preprocess_frame(frame: &[f32], amplitude_threshold: f32) -> Option<Vec<f32>> {
    if frame.is_empty() {
        return None;
    }

    let mut centered = frame.to_vec();
    remove_dc_offset(&mut centered);

    let peak = peak_amplitude(&centered);
    if peak < amplitude_threshold || peak <= 0.0 || !peak.is_finite() {
        return None;
    }

    let gain = 1.0 / peak;
    for sample in centered.iter_mut() {
        *sample *= gain;
    }
    Some(centered)
}
