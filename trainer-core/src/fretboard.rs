//! Guitar fretboard lookup for standard EADGBE tuning.
//!
//! Strings are numbered the way players name them: string 6 is the low E,
//! string 1 the high E.

use once_cell::sync::Lazy;

use crate::tuning;

/// Highest fret included in the table.
pub const MAX_FRET: u8 = 12;

/// Open-string MIDI notes, string 6 (E2) to string 1 (E4).
pub const STANDARD_TUNING: [(u8, i32); 6] = [(6, 40), (5, 45), (4, 50), (3, 55), (2, 59), (1, 64)];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FretPosition {
    pub string: u8,
    pub fret: u8,
    pub midi: i32,
}

impl FretPosition {
    pub fn note_name(&self) -> String {
        tuning::midi_to_note_name(self.midi)
    }
}

/// Every (string, fret) pair up to [`MAX_FRET`], low string first.
static FRETBOARD: Lazy<Vec<FretPosition>> = Lazy::new(|| {
    STANDARD_TUNING
        .iter()
        .flat_map(|&(string, open)| {
            (0..=MAX_FRET).map(move |fret| FretPosition {
                string,
                fret,
                midi: open + fret as i32,
            })
        })
        .collect()
});

pub fn positions() -> &'static [FretPosition] {
    &FRETBOARD
}

pub fn open_string_midi(string: u8) -> Option<i32> {
    STANDARD_TUNING
        .iter()
        .find(|&&(s, _)| s == string)
        .map(|&(_, midi)| midi)
}

/// The fret on `string` that sounds `midi`, if it is in range.
pub fn position_on_string(string: u8, midi: i32) -> Option<FretPosition> {
    FRETBOARD
        .iter()
        .find(|p| p.string == string && p.midi == midi)
        .copied()
}

/// All positions on the neck that sound `midi`.
pub fn positions_for_midi(midi: i32) -> Vec<FretPosition> {
    FRETBOARD.iter().filter(|p| p.midi == midi).copied().collect()
}

/// Closest fretboard position to a frequency, preferring lower strings on ties.
pub fn nearest_position(freq: f32) -> Option<FretPosition> {
    let midi = tuning::freq_to_midi(freq)?;
    FRETBOARD
        .iter()
        .min_by(|a, b| {
            let diff_a = (a.midi as f32 - midi).abs();
            let diff_b = (b.midi as f32 - midi).abs();
            diff_a.total_cmp(&diff_b)
        })
        .copied()
}
