//! RMS level gate with hysteresis.
//!
//! A frame has to reach `rms_on` to open the gate, but only has to stay above
//! the lower `rms_off` to keep it open. A decaying string therefore does not
//! flap the gate open and closed around a single threshold.

use log::trace;

use crate::config::LevelConfig;
use crate::error::Result;

/// Root mean square of a frame; zero for an empty frame.
pub fn rms(frame: &[f32]) -> f32 {
    if frame.is_empty() {
        return 0.0;
    }
    (frame.iter().map(|&s| s * s).sum::<f32>() / frame.len() as f32).sqrt()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    /// Loud enough to be a deliberate note.
    Open,
    /// Too quiet; downstream note tracking must reset.
    Closed,
}

/// Outcome of feeding one frame to the gate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LevelReading {
    pub rms: f32,
    pub state: GateState,
    /// The gate was open on the previous frame and has just closed.
    pub released: bool,
}

impl LevelReading {
    pub fn is_open(&self) -> bool {
        self.state == GateState::Open
    }
}

/// Per-session hysteresis gate.
#[derive(Debug, Clone)]
pub struct LevelGate {
    config: LevelConfig,
    tracking: bool,
}

impl LevelGate {
    pub fn new(config: LevelConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, tracking: false })
    }

    pub fn is_tracking(&self) -> bool {
        self.tracking
    }

    /// Measures a raw (not normalized) frame and updates the gate.
    pub fn update(&mut self, frame: &[f32]) -> LevelReading {
        let level = rms(frame);
        let threshold = if self.tracking {
            self.config.rms_off
        } else {
            self.config.rms_on
        };

        let was_tracking = self.tracking;
        self.tracking = level >= threshold;
        if was_tracking != self.tracking {
            trace!("[LEVEL] gate {} at rms {:.4}", if self.tracking { "opened" } else { "closed" }, level);
        }

        LevelReading {
            rms: level,
            state: if self.tracking { GateState::Open } else { GateState::Closed },
            released: was_tracking && !self.tracking,
        }
    }

    pub fn reset(&mut self) {
        self.tracking = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn constant(level: f32) -> Vec<f32> {
        // A square wave of amplitude `level` has RMS `level`.
        (0..256).map(|i| if i % 2 == 0 { level } else { -level }).collect()
    }

    fn gate() -> LevelGate {
        LevelGate::new(LevelConfig { rms_on: 0.1, rms_off: 0.05 }).unwrap()
    }

    #[test]
    fn test_rms() {
        assert!((rms(&constant(0.25)) - 0.25).abs() < 1e-6);
        assert_eq!(rms(&[]), 0.0);
    }

    #[test]
    fn test_hysteresis() {
        let mut gate = gate();

        // Between thresholds: not enough to open
        assert!(!gate.update(&constant(0.07)).is_open());
        // Above rms_on opens
        assert!(gate.update(&constant(0.12)).is_open());
        // Between thresholds: stays open
        assert!(gate.update(&constant(0.07)).is_open());
        // Below rms_off closes and reports the release once
        let reading = gate.update(&constant(0.04));
        assert_eq!(reading.state, GateState::Closed);
        assert!(reading.released);
        let reading = gate.update(&constant(0.04));
        assert!(!reading.released);
        // Needs rms_on again to reopen
        assert!(!gate.update(&constant(0.07)).is_open());
    }

    #[test]
    fn test_thresholds_must_be_ordered() {
        assert!(LevelGate::new(LevelConfig { rms_on: 0.05, rms_off: 0.1 }).is_err());
    }

    #[test]
    fn test_reset_closes_gate() {
        let mut gate = gate();
        gate.update(&constant(0.2));
        assert!(gate.is_tracking());
        gate.reset();
        assert!(!gate.is_tracking());
    }
}
