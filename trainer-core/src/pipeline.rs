//! # Frame Pipeline
//!
//! Runs one frame through the level gate, the pitch estimator and the
//! sustain tracker. Frames must arrive in capture order: both the drift check
//! and the cooldown depend on it.

use std::sync::Arc;

use log::{debug, trace};

use crate::clock::Clock;
use crate::config::{DetectorConfig, PitchConfig};
use crate::error::{Result, TrainerError};
use crate::level::LevelGate;
use crate::pitch::estimate_pitch_with;
use crate::sustain::{PitchClassEvent, SustainTracker};

/// Duration covered by a frame, in milliseconds.
pub fn frame_duration_ms(len: usize, sample_rate: u32) -> f32 {
    if sample_rate == 0 {
        return 0.0;
    }
    len as f32 * 1000.0 / sample_rate as f32
}

/// Per-frame measurements, kept for display.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FrameReport {
    pub rms: f32,
    pub gate_open: bool,
    /// The gate closed on this frame and the note candidate was dropped.
    pub released: bool,
    pub frequency: Option<f32>,
}

/// Processes one raw frame and returns a note event if one fired.
pub fn process_frame(
    frame: &[f32],
    sample_rate: u32,
    config: &PitchConfig,
    level: &mut LevelGate,
    sustain: &mut SustainTracker,
    now_ms: u64,
) -> Option<PitchClassEvent> {
    analyze_frame(frame, sample_rate, config, level, sustain, now_ms).1
}

fn analyze_frame(
    frame: &[f32],
    sample_rate: u32,
    config: &PitchConfig,
    level: &mut LevelGate,
    sustain: &mut SustainTracker,
    now_ms: u64,
) -> (FrameReport, Option<PitchClassEvent>) {
    let reading = level.update(frame);
    let frequency = if reading.is_open() {
        estimate_pitch_with(frame, sample_rate, config)
    } else {
        None
    };
    trace!("[FRAME] rms {:.4} open {} f0 {:?}", reading.rms, reading.is_open(), frequency);
    if reading.released {
        debug!("[FRAME] Level gate released at rms {:.4}, note candidate cleared", reading.rms);
    }

    let event = sustain.process(
        frequency,
        reading.is_open(),
        frame_duration_ms(frame.len(), sample_rate),
        now_ms,
    );
    let report = FrameReport {
        rms: reading.rms,
        gate_open: reading.is_open(),
        released: reading.released,
        frequency,
    };
    (report, event)
}

/// Listening context: detector settings plus the per-session gate state.
pub struct Listener {
    config: DetectorConfig,
    sample_rate: u32,
    level: LevelGate,
    sustain: SustainTracker,
    clock: Arc<dyn Clock>,
    last_frame: FrameReport,
}

impl Listener {
    pub fn new(config: DetectorConfig, sample_rate: u32, clock: Arc<dyn Clock>) -> Result<Self> {
        config.validate()?;
        if sample_rate == 0 {
            return Err(TrainerError::InvalidConfig("sample rate must be positive".into()));
        }
        Ok(Self {
            level: LevelGate::new(config.level.clone())?,
            sustain: SustainTracker::new(config.sustain.clone())?,
            config,
            sample_rate,
            clock,
            last_frame: FrameReport::default(),
        })
    }

    pub fn clock(&self) -> Arc<dyn Clock> {
        self.clock.clone()
    }

    pub fn last_frame(&self) -> FrameReport {
        self.last_frame
    }

    /// Feeds the next captured frame.
    pub fn push_frame(&mut self, frame: &[f32]) -> Option<PitchClassEvent> {
        let (report, event) = analyze_frame(
            frame,
            self.sample_rate,
            &self.config.pitch,
            &mut self.level,
            &mut self.sustain,
            self.clock.now_ms(),
        );
        self.last_frame = report;
        event
    }

    /// Forgets the current note candidate and closes the level gate.
    pub fn reset(&mut self) {
        self.level.reset();
        self.sustain.reset();
        self.last_frame = FrameReport::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::config::LevelConfig;
    use crate::tuning::PitchClass;
    use std::f32::consts::PI;

    const SAMPLE_RATE: u32 = 44100;
    const FRAME: usize = 2048;

    fn sine_frame(freq: f32, amplitude: f32, offset: usize) -> Vec<f32> {
        (offset..offset + FRAME)
            .map(|i| amplitude * (2.0 * PI * freq * i as f32 / SAMPLE_RATE as f32).sin())
            .collect()
    }

    #[test]
    fn test_frame_duration() {
        assert!((frame_duration_ms(2048, 44100) - 46.44).abs() < 0.01);
        assert_eq!(frame_duration_ms(2048, 0), 0.0);
    }

    #[test]
    fn test_process_frame_with_explicit_state() {
        let config = DetectorConfig::default();
        let mut level = LevelGate::new(config.level.clone()).unwrap();
        let mut sustain = SustainTracker::new(config.sustain.clone()).unwrap();

        let mut events = Vec::new();
        for n in 0..10 {
            let frame = sine_frame(146.83, 0.3, n * FRAME);
            let now = (n as f32 * frame_duration_ms(FRAME, SAMPLE_RATE)) as u64;
            if let Some(event) =
                process_frame(&frame, SAMPLE_RATE, &config.pitch, &mut level, &mut sustain, now)
            {
                events.push(event);
            }
        }
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].pitch_class, PitchClass::D);
        assert_eq!(events[0].midi, 50);
    }

    #[test]
    fn test_listener_ignores_quiet_input() {
        let clock = Arc::new(ManualClock::new(0));
        let mut listener = Listener::new(DetectorConfig::default(), SAMPLE_RATE, clock.clone()).unwrap();
        for n in 0..20 {
            clock.advance(46);
            assert!(listener.push_frame(&sine_frame(220.0, 0.005, n * FRAME)).is_none());
            assert!(!listener.last_frame().gate_open);
        }
    }

    #[test]
    fn test_listener_reports_gate_release() {
        let clock = Arc::new(ManualClock::new(0));
        let mut listener = Listener::new(DetectorConfig::default(), SAMPLE_RATE, clock.clone()).unwrap();
        for n in 0..3 {
            clock.advance(46);
            listener.push_frame(&sine_frame(220.0, 0.3, n * FRAME));
            assert!(listener.last_frame().gate_open);
            assert!(!listener.last_frame().released);
        }

        clock.advance(46);
        listener.push_frame(&vec![0.0; FRAME]);
        let report = listener.last_frame();
        assert!(!report.gate_open);
        assert!(report.released);
        assert_eq!(report.frequency, None);

        clock.advance(46);
        listener.push_frame(&vec![0.0; FRAME]);
        assert!(!listener.last_frame().released);
    }

    #[test]
    fn test_listener_rejects_bad_config() {
        let clock = Arc::new(ManualClock::new(0));
        let config = DetectorConfig {
            level: LevelConfig { rms_on: 0.01, rms_off: 0.02 },
            ..DetectorConfig::default()
        };
        assert!(Listener::new(config, SAMPLE_RATE, clock.clone()).is_err());
        assert!(Listener::new(DetectorConfig::default(), 0, clock).is_err());
    }
}
