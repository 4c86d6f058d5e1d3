//! Error types for the analysis core.
//!
//! Only malformed input and configuration problems are errors here. Silence,
//! missing periodicity and wrong notes are ordinary outcomes and are reported
//! through return values instead.

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, TrainerError>;

/// Errors raised by the trainer core.
#[derive(Debug, thiserror::Error)]
pub enum TrainerError {
    /// A note token could not be parsed into a pitch class
    #[error("invalid note name: {0:?}")]
    InvalidNote(String),

    /// A frequency that cannot be mapped onto the chromatic scale
    #[error("invalid frequency: {0} Hz")]
    InvalidFrequency(f32),

    /// Chord quality outside major/minor/diminished/augmented
    #[error("unsupported chord quality: {0:?}")]
    UnsupportedQuality(String),

    /// Inversion index other than 0, 1 or 2
    #[error("invalid inversion: {0} (expected 0, 1 or 2)")]
    InvalidInversion(u8),

    /// A sequence session needs at least one target pitch
    #[error("target sequence is empty")]
    EmptySequence,

    /// Inconsistent thresholds or out-of-range parameters
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config serialization error: {0}")]
    Json(#[from] serde_json::Error),
}
