//! # Sustain Tracker
//!
//! Turns the jittery per-frame pitch estimates into discrete note events. A
//! pitch only counts as played once it has stayed within `stable_cents` of a
//! running reference for `sustain_ms`; each held note fires once, and no two
//! notes fire closer together than `rearm_ms`.

use log::{debug, trace};
use serde::Serialize;

use crate::config::SustainConfig;
use crate::error::Result;
use crate::tuning::{self, PitchClass};

/// A sustained note recognised in the input.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PitchClassEvent {
    pub pitch_class: PitchClass,
    /// Smoothed reference frequency at the moment the note fired.
    pub frequency: f32,
    /// Nearest MIDI note, for octave-aware consumers.
    pub midi: i32,
    pub timestamp_ms: u64,
}

/// Mutable tracking state for one listening session.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SustainGateState {
    /// Time the current candidate has held steady.
    pub stable_ms: f32,
    /// Smoothed frequency of the current candidate.
    pub reference_hz: Option<f32>,
    /// Set once the current candidate has fired.
    pub locked: bool,
    /// When the last event fired. Survives resets so the cooldown spans them.
    pub last_fire_ms: Option<u64>,
}

impl SustainGateState {
    fn clear(&mut self) {
        self.stable_ms = 0.0;
        self.reference_hz = None;
        self.locked = false;
    }
}

#[derive(Debug, Clone)]
pub struct SustainTracker {
    config: SustainConfig,
    state: SustainGateState,
}

impl SustainTracker {
    pub fn new(config: SustainConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            state: SustainGateState::default(),
        })
    }

    pub fn state(&self) -> &SustainGateState {
        &self.state
    }

    pub fn config(&self) -> &SustainConfig {
        &self.config
    }

    /// Drops the current candidate. The cooldown timestamp is kept.
    pub fn reset(&mut self) {
        self.state.clear();
    }

    /// Feeds one frame's estimate.
    ///
    /// `gate_open` is the level gate's verdict for the same frame; a closed
    /// gate or a missing estimate resets tracking. `frame_ms` is the duration
    /// the frame covers and `now_ms` the current clock reading.
    pub fn process(
        &mut self,
        frequency: Option<f32>,
        gate_open: bool,
        frame_ms: f32,
        now_ms: u64,
    ) -> Option<PitchClassEvent> {
        let freq = match frequency {
            Some(f) if gate_open && f.is_finite() && f > 0.0 => f,
            _ => {
                if self.state.reference_hz.is_some() {
                    trace!("[SUSTAIN] signal lost, resetting");
                }
                self.state.clear();
                return None;
            }
        };

        let Some(reference) = self.state.reference_hz else {
            self.state.reference_hz = Some(freq);
            return None;
        };

        let deviation = tuning::calculate_cents_deviation(freq, reference);
        if deviation.abs() > self.config.stable_cents {
            trace!("[SUSTAIN] {:.1} Hz drifted {:+.0} cents, new candidate", freq, deviation);
            self.state.stable_ms = 0.0;
            self.state.reference_hz = Some(freq);
            self.state.locked = false;
            return None;
        }

        let smoothed = self.config.smoothing * reference + (1.0 - self.config.smoothing) * freq;
        self.state.reference_hz = Some(smoothed);
        self.state.stable_ms += frame_ms;

        if self.state.locked || self.state.stable_ms < self.config.sustain_ms {
            return None;
        }

        if let Some(last) = self.state.last_fire_ms {
            if now_ms.saturating_sub(last) < self.config.rearm_ms {
                trace!("[SUSTAIN] {:.1} Hz held but still cooling down", smoothed);
                return None;
            }
        }

        let midi = tuning::nearest_midi(smoothed)?;
        self.state.locked = true;
        self.state.last_fire_ms = Some(now_ms);

        let event = PitchClassEvent {
            pitch_class: PitchClass::from_midi(midi),
            frequency: smoothed,
            midi,
            timestamp_ms: now_ms,
        };
        debug!(
            "[SUSTAIN] note {} ({:.1} Hz) after {:.0} ms",
            tuning::midi_to_note_name(midi),
            smoothed,
            self.state.stable_ms
        );
        Some(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FRAME_MS: f32 = 50.0;

    /// Feeds `freqs` one per frame starting at `start_ms`, returning the events.
    fn feed(tracker: &mut SustainTracker, freqs: &[Option<f32>], start_ms: u64) -> Vec<(usize, PitchClassEvent)> {
        freqs
            .iter()
            .enumerate()
            .filter_map(|(i, &f)| {
                let now = start_ms + i as u64 * FRAME_MS as u64;
                tracker.process(f, true, FRAME_MS, now).map(|e| (i, e))
            })
            .collect()
    }

    fn tracker() -> SustainTracker {
        SustainTracker::new(SustainConfig::default()).unwrap()
    }

    #[test]
    fn test_sustained_note_fires_once() {
        let mut tracker = tracker();
        let events = feed(&mut tracker, &[Some(220.0); 30], 0);

        assert_eq!(events.len(), 1);
        let (frame, event) = events[0];
        // Frame 0 sets the reference; frames 1..=3 accumulate 150 ms >= 140 ms.
        assert_eq!(frame, 3);
        assert_eq!(event.pitch_class, PitchClass::A);
        assert_eq!(event.midi, 57);
        assert_eq!(event.timestamp_ms, 150);
        assert!((event.frequency - 220.0).abs() < 0.01);
        assert!(tracker.state().locked);
    }

    #[test]
    fn test_drift_resets_stability() {
        let mut tracker = tracker();
        feed(&mut tracker, &[Some(220.0), Some(220.0), Some(220.0)], 0);
        assert_eq!(tracker.state().stable_ms, 100.0);

        tracker.process(Some(240.0), true, FRAME_MS, 150);
        assert_eq!(tracker.state().stable_ms, 0.0);
        assert_eq!(tracker.state().reference_hz, Some(240.0));
        assert!(!tracker.state().locked);
    }

    #[test]
    fn test_vibrato_within_tolerance_keeps_progress() {
        let mut tracker = tracker();
        let wobble: Vec<Option<f32>> = [220.0, 221.5, 218.8, 221.0, 219.2, 220.6]
            .iter()
            .map(|&f| Some(f))
            .collect();
        let events = feed(&mut tracker, &wobble, 0);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].1.pitch_class, PitchClass::A);
    }

    #[test]
    fn test_cooldown_delays_next_note() {
        let config = SustainConfig { rearm_ms: 500, ..SustainConfig::default() };
        let mut tracker = SustainTracker::new(config).unwrap();

        let first = feed(&mut tracker, &[Some(220.0); 4], 0);
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].1.timestamp_ms, 150);

        // A new note is stable by 400 ms but may not fire before 650 ms.
        let second = feed(&mut tracker, &[Some(330.0); 12], 200);
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].1.pitch_class, PitchClass::E);
        assert_eq!(second[0].1.timestamp_ms, 650);
    }

    #[test]
    fn test_lost_signal_clears_but_keeps_cooldown() {
        let mut tracker = tracker();
        feed(&mut tracker, &[Some(220.0); 5], 0);
        assert_eq!(tracker.state().last_fire_ms, Some(150));

        assert!(tracker.process(None, true, FRAME_MS, 250).is_none());
        assert_eq!(tracker.state().reference_hz, None);
        assert_eq!(tracker.state().stable_ms, 0.0);
        assert!(!tracker.state().locked);
        assert_eq!(tracker.state().last_fire_ms, Some(150));
    }

    #[test]
    fn test_closed_gate_resets() {
        let mut tracker = tracker();
        feed(&mut tracker, &[Some(220.0); 3], 0);
        assert!(tracker.process(Some(220.0), false, FRAME_MS, 150).is_none());
        assert_eq!(tracker.state().reference_hz, None);

        // The same pitch has to sustain again from scratch
        let events = feed(&mut tracker, &[Some(220.0); 4], 200);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].0, 3);
    }

    #[test]
    fn test_replucked_note_fires_again() {
        let mut tracker = tracker();
        let mut freqs = vec![Some(196.0); 5];
        freqs.push(None);
        freqs.extend(vec![Some(196.0); 5]);
        let events = feed(&mut tracker, &freqs, 0);
        assert_eq!(events.len(), 2);
        assert!(events.iter().all(|(_, e)| e.pitch_class == PitchClass::G));
    }
}
