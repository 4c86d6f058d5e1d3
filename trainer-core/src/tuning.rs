//! # Musical Tuning Module
//!
//! Equal-temperament helpers and the pitch-class normalizer used by the
//! matcher. Every detected frequency and every note token that enters the
//! trainer is reduced to one of twelve octave-independent [`PitchClass`]
//! values, spelled with sharps.
//!
//! ## Features
//! - Frequency to MIDI and MIDI to frequency conversion (A4 = 440 Hz)
//! - Note names with octave numbers (`E2`, `C#4`)
//! - Case-insensitive note-token parsing with enharmonic folding (`Db`, `B#`, `Fb`)
//! - Cent deviation measurements

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TrainerError};

/// Reference pitch for A4 in Hz.
pub const A4_FREQUENCY: f32 = 440.0;

/// MIDI note number of A4.
pub const A4_MIDI: i32 = 69;

/// Sharp-preferred spellings, indexed by semitone above C.
const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// One of the twelve chromatic pitch classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PitchClass {
    C,
    CSharp,
    D,
    DSharp,
    E,
    F,
    FSharp,
    G,
    GSharp,
    A,
    ASharp,
    B,
}

impl PitchClass {
    /// All pitch classes in chromatic order starting from C.
    pub const ALL: [PitchClass; 12] = [
        PitchClass::C,
        PitchClass::CSharp,
        PitchClass::D,
        PitchClass::DSharp,
        PitchClass::E,
        PitchClass::F,
        PitchClass::FSharp,
        PitchClass::G,
        PitchClass::GSharp,
        PitchClass::A,
        PitchClass::ASharp,
        PitchClass::B,
    ];

    /// Semitones above C (0..12).
    pub fn index(self) -> usize {
        self as usize
    }

    /// Pitch class for any semitone count; wraps around the octave.
    pub fn from_index(index: i32) -> Self {
        Self::ALL[index.rem_euclid(12) as usize]
    }

    pub fn from_midi(midi: i32) -> Self {
        Self::from_index(midi)
    }

    /// Nearest equal-tempered pitch class, or `None` for non-positive input.
    pub fn from_frequency(freq: f32) -> Option<Self> {
        nearest_midi(freq).map(Self::from_midi)
    }

    /// Canonical (sharp) spelling.
    pub fn name(self) -> &'static str {
        NOTE_NAMES[self.index()]
    }

    pub fn transpose(self, semitones: i32) -> Self {
        Self::from_index(self.index() as i32 + semitones)
    }
}

impl fmt::Display for PitchClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PitchClass {
    type Err = TrainerError;

    /// Parses `letter [accidental] [octave]`, e.g. `"c"`, `"Db"`, `"F#3"`, `"B#"`.
    ///
    /// At most one accidental is accepted; octave digits are validated and
    /// then ignored.
    fn from_str(token: &str) -> Result<Self> {
        let invalid = || TrainerError::InvalidNote(token.to_string());
        let mut chars = token.trim().chars().peekable();

        let letter = chars.next().ok_or_else(invalid)?;
        let base: i32 = match letter.to_ascii_uppercase() {
            'C' => 0,
            'D' => 2,
            'E' => 4,
            'F' => 5,
            'G' => 7,
            'A' => 9,
            'B' => 11,
            _ => return Err(invalid()),
        };

        let accidental = match chars.peek() {
            Some('#') | Some('♯') => 1,
            Some('b') | Some('♭') => -1,
            _ => 0,
        };
        if accidental != 0 {
            chars.next();
        }

        let rest: String = chars.collect();
        let digits = match rest.strip_prefix('-') {
            Some("") => return Err(invalid()),
            Some(digits) => digits,
            None => rest.as_str(),
        };
        if !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid());
        }

        Ok(Self::from_index(base + accidental))
    }
}

/// A pitch as handed in by a caller: either a measured frequency or a note token.
#[derive(Debug, Clone, PartialEq)]
pub enum Pitch {
    Frequency(f32),
    NoteName(String),
}

impl Pitch {
    /// Resolves the pitch into its canonical pitch class.
    pub fn resolve(&self) -> Result<PitchClass> {
        match self {
            Pitch::Frequency(freq) => {
                PitchClass::from_frequency(*freq).ok_or(TrainerError::InvalidFrequency(*freq))
            }
            Pitch::NoteName(name) => name.parse(),
        }
    }
}

impl From<f32> for Pitch {
    fn from(freq: f32) -> Self {
        Pitch::Frequency(freq)
    }
}

impl From<&str> for Pitch {
    fn from(name: &str) -> Self {
        Pitch::NoteName(name.to_string())
    }
}

impl From<String> for Pitch {
    fn from(name: String) -> Self {
        Pitch::NoteName(name)
    }
}

/// Maps a frequency or a note token onto a pitch class.
pub fn normalize(pitch: impl Into<Pitch>) -> Result<PitchClass> {
    pitch.into().resolve()
}

/// Fractional MIDI note number for a frequency.
pub fn freq_to_midi(freq: f32) -> Option<f32> {
    if freq.is_finite() && freq > 0.0 {
        Some(A4_MIDI as f32 + 12.0 * (freq / A4_FREQUENCY).log2())
    } else {
        None
    }
}

/// Nearest integer MIDI note for a frequency.
pub fn nearest_midi(freq: f32) -> Option<i32> {
    freq_to_midi(freq).map(|midi| midi.round() as i32)
}

pub fn midi_to_frequency(midi: i32) -> f32 {
    A4_FREQUENCY * 2.0_f32.powf((midi - A4_MIDI) as f32 / 12.0)
}

/// Note name with octave number, e.g. 40 -> `"E2"`.
pub fn midi_to_note_name(midi: i32) -> String {
    let octave = midi.div_euclid(12) - 1;
    format!("{}{}", PitchClass::from_midi(midi), octave)
}

/// Finds the closest equal-tempered note to a given frequency.
///
/// # Returns
/// * `(note_name, target_frequency)` - Closest note name and its target frequency
pub fn find_nearest_note(freq: f32) -> Option<(String, f32)> {
    let midi = nearest_midi(freq)?;
    Some((midi_to_note_name(midi), midi_to_frequency(midi)))
}

/// Calculates the deviation from a target frequency in cents.
///
/// Cents are a logarithmic unit of pitch measurement where:
/// - 100 cents = 1 semitone
/// - 1200 cents = 1 octave
/// - Positive values indicate sharpness, negative values indicate flatness
pub fn calculate_cents_deviation(freq: f32, target_freq: f32) -> f32 {
    1200.0 * (freq / target_freq).log2()
}
