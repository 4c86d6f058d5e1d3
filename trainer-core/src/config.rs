//! # Configuration Module
//!
//! Tunable parameters for the detector pipeline and the sequence matcher.
//! Every struct has working defaults, so a config file only needs to list the
//! values it changes. Configs are stored as pretty-printed JSON.

use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TrainerError};

/// Lowest fundamental the estimator will report, in Hz.
pub const MIN_F0: f32 = 70.0;

/// Highest fundamental the estimator will report, in Hz.
pub const MAX_F0: f32 = 1000.0;

/// How the autocorrelation is computed. Both produce the same values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CorrelationMethod {
    /// Direct O(N^2) sum over the lag range.
    #[default]
    Direct,
    /// Wiener-Khinchin via a zero-padded FFT.
    Fft,
}

/// Kind of input feeding the detector; quieter sources get a lower gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InputKind {
    #[default]
    Microphone,
    LineIn,
}

impl InputKind {
    /// Peak-amplitude floor below which a frame is rejected.
    pub fn default_amplitude_threshold(self) -> f32 {
        match self {
            InputKind::Microphone => 0.02,
            InputKind::LineIn => 0.008,
        }
    }
}

/// Parameters for the frame preprocessor and the autocorrelation estimator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PitchConfig {
    pub min_f0: f32,
    pub max_f0: f32,
    /// Peak amplitude (after DC removal) a frame needs to be analysed.
    pub amplitude_threshold: f32,
    /// Minimum zero-lag-normalized correlation at the chosen lag.
    pub min_correlation: f32,
    pub method: CorrelationMethod,
}

impl Default for PitchConfig {
    fn default() -> Self {
        Self {
            min_f0: MIN_F0,
            max_f0: MAX_F0,
            amplitude_threshold: InputKind::Microphone.default_amplitude_threshold(),
            min_correlation: 0.3,
            method: CorrelationMethod::Direct,
        }
    }
}

impl PitchConfig {
    pub fn for_input(kind: InputKind) -> Self {
        Self {
            amplitude_threshold: kind.default_amplitude_threshold(),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.min_f0 > 0.0 && self.min_f0 < self.max_f0) {
            return Err(TrainerError::InvalidConfig(format!(
                "pitch range must satisfy 0 < min_f0 < max_f0 (got {}..{})",
                self.min_f0, self.max_f0
            )));
        }
        if self.amplitude_threshold < 0.0 {
            return Err(TrainerError::InvalidConfig(
                "amplitude_threshold must not be negative".into(),
            ));
        }
        if !(0.0..1.0).contains(&self.min_correlation) {
            return Err(TrainerError::InvalidConfig(
                "min_correlation must lie in [0, 1)".into(),
            ));
        }
        Ok(())
    }
}

/// Hysteresis thresholds on frame RMS.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LevelConfig {
    /// RMS needed to start tracking.
    pub rms_on: f32,
    /// RMS needed to keep tracking; strictly lower than `rms_on`.
    pub rms_off: f32,
}

impl Default for LevelConfig {
    fn default() -> Self {
        Self {
            rms_on: 0.012,
            rms_off: 0.006,
        }
    }
}

impl LevelConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.rms_off >= 0.0 && self.rms_off < self.rms_on) {
            return Err(TrainerError::InvalidConfig(format!(
                "rms_off ({}) must be non-negative and below rms_on ({})",
                self.rms_off, self.rms_on
            )));
        }
        Ok(())
    }
}

/// Stability and debounce parameters for turning pitch estimates into notes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SustainConfig {
    /// Maximum drift from the running reference, in cents.
    pub stable_cents: f32,
    /// How long a pitch must hold before it counts as played.
    pub sustain_ms: f32,
    /// Minimum gap between two emitted notes.
    pub rearm_ms: u64,
    /// Weight kept by the old reference on each stable frame.
    pub smoothing: f32,
}

impl Default for SustainConfig {
    fn default() -> Self {
        Self {
            stable_cents: 25.0,
            sustain_ms: 140.0,
            rearm_ms: 120,
            smoothing: 0.85,
        }
    }
}

impl SustainConfig {
    pub fn validate(&self) -> Result<()> {
        if self.stable_cents <= 0.0 {
            return Err(TrainerError::InvalidConfig("stable_cents must be positive".into()));
        }
        if self.sustain_ms < 0.0 {
            return Err(TrainerError::InvalidConfig("sustain_ms must not be negative".into()));
        }
        if !(0.0..1.0).contains(&self.smoothing) {
            return Err(TrainerError::InvalidConfig("smoothing must lie in [0, 1)".into()));
        }
        Ok(())
    }
}

/// Everything the per-frame pipeline needs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    pub pitch: PitchConfig,
    pub level: LevelConfig,
    pub sustain: SustainConfig,
}

impl DetectorConfig {
    pub fn for_input(kind: InputKind) -> Self {
        Self {
            pitch: PitchConfig::for_input(kind),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.pitch.validate()?;
        self.level.validate()?;
        self.sustain.validate()
    }
}

/// Rules for judging a played sequence against its target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// On a wrong note, restart the attempt from the first target note.
    pub reset_on_wrong: bool,
    /// Identical detections closer together than this count once.
    pub dedupe_window_ms: u64,
    /// Notes outside the target set count as wrong (otherwise ignored).
    pub count_non_chord_tones_as_error: bool,
    /// Target notes played out of order count as wrong (otherwise ignored).
    pub count_out_of_order_as_error: bool,
    /// Wrong notes tolerated before failing; only used without `reset_on_wrong`.
    pub wrong_tolerance: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            reset_on_wrong: true,
            dedupe_window_ms: 400,
            count_non_chord_tones_as_error: true,
            count_out_of_order_as_error: true,
            wrong_tolerance: 0,
        }
    }
}

/// Top-level config file contents.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainerConfig {
    pub detector: DetectorConfig,
    pub session: SessionConfig,
}

impl TrainerConfig {
    pub fn validate(&self) -> Result<()> {
        self.detector.validate()
    }

    /// Loads and validates a config from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let mut file = File::open(path)?;
        let mut data = String::new();
        file.read_to_string(&mut data)?;
        let config: TrainerConfig = serde_json::from_str(&data)?;
        config.validate()?;
        Ok(config)
    }

    /// Saves the config as pretty-printed JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json_string = serde_json::to_string_pretty(self)?;
        let mut file = File::create(path)?;
        file.write_all(json_string.as_bytes())?;
        Ok(())
    }
}
