// trainer-core/src/lib.rs

//! The core logic for the ear trainer.
//! This crate is responsible for audio capture, pitch detection, note
//! debouncing and judging played notes against a target sequence. It is
//! completely headless and contains no UI code.
//!
//! Data flow for one captured frame:
//! raw frame -> [`level`] gate -> [`preprocess`] + [`pitch`] estimate ->
//! [`sustain`] tracker -> pitch-class event -> [`matcher`] session.

pub mod audio;
pub mod clock;
pub mod config;
pub mod error;
pub mod fft;
pub mod fretboard;
pub mod level;
pub mod matcher;
pub mod pipeline;
pub mod pitch;
pub mod preprocess;
pub mod sustain;
pub mod trainer;
pub mod triad;
pub mod tuning;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{DetectorConfig, InputKind, SessionConfig, TrainerConfig};
pub use error::{Result, TrainerError};
pub use matcher::{MatchResult, NoteOutcome, SequenceSession, Status};
pub use pipeline::{process_frame, Listener};
pub use pitch::estimate_pitch;
pub use sustain::PitchClassEvent;
pub use trainer::{Trainer, TrainerUpdate};
pub use triad::{Inversion, Quality, Triad};
pub use tuning::{normalize, Pitch, PitchClass};
