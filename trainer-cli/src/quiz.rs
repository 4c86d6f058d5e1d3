//! Question generation and text rendering for the console trainer.

use std::fmt::Write as _;

use clap::ValueEnum;
use rand::Rng;
use rand::seq::IndexedRandom;
use trainer_core::fretboard::{self, MAX_FRET, STANDARD_TUNING};
use trainer_core::tuning::midi_to_note_name;
use trainer_core::{Inversion, MatchResult, NoteOutcome, PitchClass, Quality, Status, Triad};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Mode {
    /// Find a named note on a given string
    Note,
    /// Play the tones of a triad one after another
    Triad,
}

/// Which questions may be asked.
#[derive(Debug, Clone)]
pub struct QuizOptions {
    pub mode: Mode,
    pub qualities: Vec<Quality>,
    pub inversions: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Question {
    Note { string: u8, fret: u8, midi: i32 },
    Triad(Triad),
}

impl Question {
    pub fn random(options: &QuizOptions, rng: &mut impl Rng) -> Self {
        match options.mode {
            Mode::Note => {
                let (string, open) = STANDARD_TUNING[rng.random_range(0..STANDARD_TUNING.len())];
                let fret = rng.random_range(0..=MAX_FRET);
                Question::Note { string, fret, midi: open + fret as i32 }
            }
            Mode::Triad => {
                let root = PitchClass::from_index(rng.random_range(0..12));
                let quality = options.qualities.choose(rng).copied().unwrap_or(Quality::Major);
                let inversion = if options.inversions {
                    Inversion::ALL.choose(rng).copied().unwrap_or_default()
                } else {
                    Inversion::Root
                };
                Question::Triad(Triad::new(root, quality, inversion))
            }
        }
    }

    /// Pitch classes to be played, in order.
    pub fn target(&self) -> Vec<PitchClass> {
        match self {
            Question::Note { midi, .. } => vec![PitchClass::from_midi(*midi)],
            Question::Triad(triad) => triad.pitches().to_vec(),
        }
    }

    pub fn prompt(&self) -> String {
        match self {
            Question::Note { string, midi, .. } => {
                format!("STRING {} - {}", string, PitchClass::from_midi(*midi))
            }
            Question::Triad(triad) => {
                let tones: Vec<&str> = triad.pitches().iter().map(|p| p.name()).collect();
                format!("{}  [play: {}]", triad.label(), tones.join(" "))
            }
        }
    }

    /// The string a note question asks for.
    pub fn string(&self) -> Option<u8> {
        match self {
            Question::Note { string, .. } => Some(*string),
            Question::Triad(_) => None,
        }
    }
}

/// "Heard" line for a detected note, with its likely fretboard position.
pub fn describe_heard(midi: i32, frequency: f32) -> String {
    let mut line = format!("Heard: {} ({:.1} Hz)", midi_to_note_name(midi), frequency);
    if let Some(pos) = fretboard::nearest_position(frequency) {
        let _ = write!(line, " - e.g. string {} fret {}", pos.string, pos.fret);
    }
    line
}

/// Progress row such as `[x] C  [x] E  [ ] G`.
pub fn render_progress(target: &[PitchClass], progress: &[bool]) -> String {
    target
        .iter()
        .zip(progress)
        .map(|(pitch, done)| format!("[{}] {}", if *done { 'x' } else { ' ' }, pitch))
        .collect::<Vec<_>>()
        .join("  ")
}

/// One-line verdict for a judged note.
pub fn render_result(result: &MatchResult) -> String {
    match (result.status, result.outcome) {
        (Status::Success, _) => "Correct! Sequence complete.".to_string(),
        (Status::Fail, _) => format!("Too many wrong notes ({}). Moving on.", result.wrong),
        (_, NoteOutcome::Advanced) => format!(
            "Correct. Next: {}",
            result.expected.map(|p| p.name()).unwrap_or("-")
        ),
        (_, NoteOutcome::Wrong) if result.reset => format!(
            "Wrong note ({}). Start again from {}.",
            result.detected,
            result.expected.map(|p| p.name()).unwrap_or("-")
        ),
        (_, NoteOutcome::Wrong) => format!(
            "Wrong note ({}). Keep trying, expected {}.",
            result.detected,
            result.expected.map(|p| p.name()).unwrap_or("-")
        ),
        (_, NoteOutcome::Ignored) => format!("{} is ignored here.", result.detected),
        (_, NoteOutcome::Duplicate) => String::new(),
    }
}
