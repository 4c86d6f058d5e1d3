//! Triads as ordered pitch-class targets.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TrainerError};
use crate::tuning::PitchClass;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Quality {
    Major,
    Minor,
    Diminished,
    Augmented,
}

impl Quality {
    pub const ALL: [Quality; 4] = [
        Quality::Major,
        Quality::Minor,
        Quality::Diminished,
        Quality::Augmented,
    ];

    /// Semitone offsets of the chord tones above the root.
    pub fn intervals(self) -> [i32; 3] {
        match self {
            Quality::Major => [0, 4, 7],
            Quality::Minor => [0, 3, 7],
            Quality::Diminished => [0, 3, 6],
            Quality::Augmented => [0, 4, 8],
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Quality::Major => "major",
            Quality::Minor => "minor",
            Quality::Diminished => "diminished",
            Quality::Augmented => "augmented",
        }
    }
}

impl FromStr for Quality {
    type Err = TrainerError;

    fn from_str(s: &str) -> Result<Self> {
        // "M" and "m" are distinguished by case, so check them before folding.
        match s.trim() {
            "M" => return Ok(Quality::Major),
            "m" => return Ok(Quality::Minor),
            _ => {}
        }
        match s.trim().to_ascii_lowercase().as_str() {
            "major" | "maj" => Ok(Quality::Major),
            "minor" | "min" => Ok(Quality::Minor),
            "diminished" | "dim" => Ok(Quality::Diminished),
            "augmented" | "aug" => Ok(Quality::Augmented),
            _ => Err(TrainerError::UnsupportedQuality(s.to_string())),
        }
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Which chord tone is played first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Inversion {
    #[default]
    Root,
    First,
    Second,
}

impl Inversion {
    pub const ALL: [Inversion; 3] = [Inversion::Root, Inversion::First, Inversion::Second];

    /// Number of chord tones rotated from the front to the back.
    pub fn rotation(self) -> usize {
        match self {
            Inversion::Root => 0,
            Inversion::First => 1,
            Inversion::Second => 2,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Inversion::Root => "root position",
            Inversion::First => "1st inversion",
            Inversion::Second => "2nd inversion",
        }
    }
}

impl TryFrom<u8> for Inversion {
    type Error = TrainerError;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0 => Ok(Inversion::Root),
            1 => Ok(Inversion::First),
            2 => Ok(Inversion::Second),
            other => Err(TrainerError::InvalidInversion(other)),
        }
    }
}

/// A three-note chord to be played tone by tone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Triad {
    pub root: PitchClass,
    pub quality: Quality,
    pub inversion: Inversion,
}

impl Triad {
    pub fn new(root: PitchClass, quality: Quality, inversion: Inversion) -> Self {
        Self { root, quality, inversion }
    }

    /// Builds a triad from textual parts, e.g. `("Eb", "minor", 1)`.
    pub fn parse(root: &str, quality: &str, inversion: u8) -> Result<Self> {
        Ok(Self::new(root.parse()?, quality.parse()?, Inversion::try_from(inversion)?))
    }

    /// Chord tones in playing order: root-first, then rotated by the inversion.
    pub fn pitches(&self) -> [PitchClass; 3] {
        let mut tones = self.quality.intervals().map(|offset| self.root.transpose(offset));
        tones.rotate_left(self.inversion.rotation());
        tones
    }

    /// Human-readable name, e.g. `C major (1st inversion)`.
    pub fn label(&self) -> String {
        format!("{} {} ({})", self.root, self.quality, self.inversion.label())
    }
}

impl fmt::Display for Triad {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use PitchClass::*;

    #[test]
    fn test_root_position_and_inversions() {
        let e_minor = Triad::parse("E", "minor", 0).unwrap();
        assert_eq!(e_minor.pitches(), [E, G, B]);

        let c_first = Triad::parse("C", "major", 1).unwrap();
        assert_eq!(c_first.pitches(), [E, G, C]);

        let c_second = Triad::parse("C", "major", 2).unwrap();
        assert_eq!(c_second.pitches(), [G, C, E]);
    }

    #[test]
    fn test_qualities() {
        assert_eq!(Triad::parse("B", "dim", 0).unwrap().pitches(), [B, D, F]);
        assert_eq!(Triad::parse("C", "aug", 0).unwrap().pitches(), [C, E, GSharp]);
        assert_eq!(Triad::parse("Bb", "maj", 0).unwrap().pitches(), [ASharp, D, F]);
        assert_eq!(Triad::parse("a", "m", 0).unwrap().pitches(), [A, C, E]);
    }

    #[test]
    fn test_tones_are_distinct() {
        for root in PitchClass::ALL {
            for quality in Quality::ALL {
                for inversion in Inversion::ALL {
                    let [a, b, c] = Triad::new(root, quality, inversion).pitches();
                    assert!(a != b && b != c && a != c);
                }
            }
        }
    }

    #[test]
    fn test_invalid_parts_rejected() {
        assert!(matches!(Triad::parse("H", "major", 0), Err(TrainerError::InvalidNote(_))));
        assert!(matches!(
            Triad::parse("C", "sus4", 0),
            Err(TrainerError::UnsupportedQuality(_))
        ));
        assert!(matches!(Triad::parse("C", "major", 3), Err(TrainerError::InvalidInversion(3))));
    }

    #[test]
    fn test_label() {
        assert_eq!(Triad::parse("C", "major", 1).unwrap().label(), "C major (1st inversion)");
        assert_eq!(Triad::parse("F#", "Minor", 0).unwrap().label(), "F# minor (root position)");
        assert_eq!(Triad::parse("Db", "aug", 2).unwrap().to_string(), "C# augmented (2nd inversion)");
    }
}
