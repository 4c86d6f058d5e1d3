//! # Sequence Matcher
//!
//! Judges a stream of detected pitch classes against an ordered target, such
//! as the three tones of a triad in a given inversion.
//!
//! A session moves from `Pending` to either `Success` (every target note
//! played in order) or `Fail` (too many wrong notes). Terminal sessions no
//! longer change; callers start a new session for the next question.

use std::sync::Arc;

use log::debug;
use serde::Serialize;

use crate::clock::Clock;
use crate::config::SessionConfig;
use crate::error::{Result, TrainerError};
use crate::triad::Triad;
use crate::tuning::{Pitch, PitchClass};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Pending,
    Success,
    Fail,
}

impl Status {
    pub fn is_terminal(self) -> bool {
        self != Status::Pending
    }
}

/// What a single detection did to the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoteOutcome {
    /// Matched the expected note.
    Advanced,
    /// Counted against the player.
    Wrong,
    /// Tolerated by the lenient-mode settings.
    Ignored,
    /// Repeat of the previous detection inside the dedupe window.
    Duplicate,
}

/// Snapshot returned for every accepted detection, ready for rendering.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchResult {
    pub status: Status,
    pub outcome: NoteOutcome,
    /// The detection matched the expected note.
    pub correct: bool,
    pub detected: PitchClass,
    /// Next note to play; `None` once the session is terminal.
    pub expected: Option<PitchClass>,
    pub matched: usize,
    pub wrong: u32,
    /// One flag per target position, set for the positions already played.
    pub progress: Vec<bool>,
    /// This detection sent the attempt back to the first note.
    pub reset: bool,
}

/// Matching state for one question.
pub struct SequenceSession {
    target: Vec<PitchClass>,
    config: SessionConfig,
    clock: Arc<dyn Clock>,
    index: usize,
    wrong: u32,
    status: Status,
    last_accepted: Option<(PitchClass, u64)>,
    terminal: Option<MatchResult>,
}

impl SequenceSession {
    pub fn new(target: Vec<PitchClass>, config: SessionConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        if target.is_empty() {
            return Err(TrainerError::EmptySequence);
        }
        Ok(Self {
            target,
            config,
            clock,
            index: 0,
            wrong: 0,
            status: Status::Pending,
            last_accepted: None,
            terminal: None,
        })
    }

    pub fn for_triad(triad: &Triad, config: SessionConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        Self::new(triad.pitches().to_vec(), config, clock)
    }

    pub fn target(&self) -> &[PitchClass] {
        &self.target
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn matched(&self) -> usize {
        self.index
    }

    pub fn wrong(&self) -> u32 {
        self.wrong
    }

    pub fn expected(&self) -> Option<PitchClass> {
        if self.status.is_terminal() {
            None
        } else {
            self.target.get(self.index).copied()
        }
    }

    pub fn progress(&self) -> Vec<bool> {
        (0..self.target.len()).map(|i| i < self.index).collect()
    }

    /// Starts a fresh attempt on the same target.
    pub fn reset(&mut self) {
        self.index = 0;
        self.wrong = 0;
        self.status = Status::Pending;
        self.last_accepted = None;
        self.terminal = None;
    }

    /// Accepts a frequency or note token.
    ///
    /// Fails only if the pitch cannot be resolved; the session is untouched
    /// in that case.
    pub fn accept(&mut self, pitch: impl Into<Pitch>) -> Result<MatchResult> {
        let pitch_class = pitch.into().resolve()?;
        Ok(self.accept_class(pitch_class))
    }

    /// Accepts a detected pitch class at the current clock time.
    ///
    /// Once the session is terminal, every call returns the final result
    /// unchanged.
    pub fn accept_class(&mut self, detected: PitchClass) -> MatchResult {
        if let Some(terminal) = &self.terminal {
            return terminal.clone();
        }

        let now = self.clock.now_ms();
        if let Some((last, at)) = self.last_accepted {
            if last == detected && now.saturating_sub(at) < self.config.dedupe_window_ms {
                return self.snapshot(detected, NoteOutcome::Duplicate, false);
            }
        }
        self.last_accepted = Some((detected, now));

        if self.target[self.index] == detected {
            self.index += 1;
            if self.index == self.target.len() {
                self.status = Status::Success;
            }
            debug!("[MATCH] {} correct ({}/{})", detected, self.index, self.target.len());
            return self.finish(self.snapshot(detected, NoteOutcome::Advanced, false));
        }

        let in_target = self.target.contains(&detected);
        let counts = if in_target {
            self.config.count_out_of_order_as_error
        } else {
            self.config.count_non_chord_tones_as_error
        };
        if !counts {
            debug!("[MATCH] {} ignored", detected);
            return self.snapshot(detected, NoteOutcome::Ignored, false);
        }

        self.wrong += 1;
        let mut reset = false;
        if self.config.reset_on_wrong {
            reset = self.index > 0;
            self.index = 0;
        } else if self.wrong > self.config.wrong_tolerance {
            self.status = Status::Fail;
        }
        debug!(
            "[MATCH] {} wrong, expected {} (wrong notes: {})",
            detected, self.target[self.index], self.wrong
        );
        self.finish(self.snapshot(detected, NoteOutcome::Wrong, reset))
    }

    fn snapshot(&self, detected: PitchClass, outcome: NoteOutcome, reset: bool) -> MatchResult {
        MatchResult {
            status: self.status,
            outcome,
            correct: outcome == NoteOutcome::Advanced,
            detected,
            expected: self.expected(),
            matched: self.index,
            wrong: self.wrong,
            progress: self.progress(),
            reset,
        }
    }

    fn finish(&mut self, result: MatchResult) -> MatchResult {
        if result.status.is_terminal() {
            self.terminal = Some(result.clone());
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use PitchClass::*;

    fn session(target: &[PitchClass], config: SessionConfig) -> (SequenceSession, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(0));
        let session = SequenceSession::new(target.to_vec(), config, clock.clone()).unwrap();
        (session, clock)
    }

    /// Plays each note one second apart so dedupe never interferes.
    fn play(session: &mut SequenceSession, clock: &ManualClock, notes: &[PitchClass]) -> Vec<MatchResult> {
        notes
            .iter()
            .map(|&note| {
                clock.advance(1000);
                session.accept_class(note)
            })
            .collect()
    }

    #[test]
    fn test_reset_on_wrong_restarts_attempt() {
        let (mut session, clock) = session(&[C, E, G], SessionConfig::default());
        let results = play(&mut session, &clock, &[C, E, FSharp, C, E, G]);

        let after_wrong = &results[2];
        assert_eq!(after_wrong.outcome, NoteOutcome::Wrong);
        assert!(after_wrong.reset);
        assert_eq!(after_wrong.matched, 0);
        assert_eq!(after_wrong.expected, Some(C));
        assert_eq!(after_wrong.progress, vec![false, false, false]);

        let last = results.last().unwrap();
        assert_eq!(last.status, Status::Success);
        assert_eq!(last.wrong, 1);
        assert_eq!(last.matched, 3);
        assert_eq!(last.expected, None);
        assert_eq!(last.progress, vec![true, true, true]);
    }

    #[test]
    fn test_progress_and_expected() {
        let (mut session, clock) = session(&[E, G, C], SessionConfig::default());
        let result = play(&mut session, &clock, &[E])[0].clone();
        assert!(result.correct);
        assert_eq!(result.status, Status::Pending);
        assert_eq!(result.expected, Some(G));
        assert_eq!(result.progress, vec![true, false, false]);
    }

    #[test]
    fn test_dedupe_window() {
        let (mut session, clock) = session(&[C, E, G], SessionConfig::default());
        clock.advance(1000);
        session.accept_class(C);
        clock.advance(100);
        let repeat = session.accept_class(C);
        assert_eq!(repeat.outcome, NoteOutcome::Duplicate);
        assert_eq!(repeat.wrong, 0);
        assert_eq!(repeat.matched, 1);

        // Outside the window the repeat is judged normally (out of order here)
        clock.advance(1000);
        let late = session.accept_class(C);
        assert_eq!(late.outcome, NoteOutcome::Wrong);
        assert_eq!(late.wrong, 1);
    }

    #[test]
    fn test_fail_after_tolerance() {
        let config = SessionConfig {
            reset_on_wrong: false,
            wrong_tolerance: 1,
            ..SessionConfig::default()
        };
        let (mut session, clock) = session(&[A, CSharp, E], config);
        let results = play(&mut session, &clock, &[A, D, F]);
        assert_eq!(results[1].status, Status::Pending);
        assert_eq!(results[1].matched, 1);
        assert!(!results[1].reset);
        assert_eq!(results[2].status, Status::Fail);
        assert_eq!(results[2].wrong, 2);
        assert_eq!(results[2].expected, None);
    }

    #[test]
    fn test_zero_tolerance_fails_immediately() {
        let config = SessionConfig { reset_on_wrong: false, ..SessionConfig::default() };
        let (mut session, clock) = session(&[A], config);
        let result = play(&mut session, &clock, &[B]).remove(0);
        assert_eq!(result.status, Status::Fail);
    }

    #[test]
    fn test_terminal_is_idempotent() {
        let (mut session, clock) = session(&[D], SessionConfig::default());
        let done = play(&mut session, &clock, &[D]).remove(0);
        assert_eq!(done.status, Status::Success);

        let again = play(&mut session, &clock, &[F, D, GSharp]);
        for result in again {
            assert_eq!(result, done);
        }
        assert_eq!(session.wrong(), 0);
        assert_eq!(session.matched(), 1);
    }

    #[test]
    fn test_lenient_non_chord_tones() {
        let config = SessionConfig {
            count_non_chord_tones_as_error: false,
            ..SessionConfig::default()
        };
        let (mut session, clock) = session(&[C, E, G], config);
        let results = play(&mut session, &clock, &[C, D, G]);
        assert_eq!(results[1].outcome, NoteOutcome::Ignored);
        assert_eq!(results[1].matched, 1);
        // G is a chord tone out of order and still counts
        assert_eq!(results[2].outcome, NoteOutcome::Wrong);
        assert_eq!(results[2].wrong, 1);
    }

    #[test]
    fn test_lenient_out_of_order() {
        let config = SessionConfig {
            count_out_of_order_as_error: false,
            ..SessionConfig::default()
        };
        let (mut session, clock) = session(&[C, E, G], config);
        let results = play(&mut session, &clock, &[G, C, E, G]);
        assert_eq!(results[0].outcome, NoteOutcome::Ignored);
        assert_eq!(results[3].status, Status::Success);
        assert_eq!(results[3].wrong, 0);
    }

    #[test]
    fn test_accepts_frequencies_and_names() {
        let (mut session, _clock) = session(&[A, CSharp, E], SessionConfig::default());
        assert!(session.accept(440.0_f32).unwrap().correct);
        assert!(session.accept("Db4").unwrap().correct);
        assert!(session.accept("H").is_err());
        assert_eq!(session.matched(), 2);
    }

    #[test]
    fn test_triad_session_and_reset() {
        let triad = Triad::parse("C", "major", 1).unwrap();
        let clock = Arc::new(ManualClock::new(0));
        let mut session =
            SequenceSession::for_triad(&triad, SessionConfig::default(), clock.clone()).unwrap();
        assert_eq!(session.target(), &[E, G, C]);

        play(&mut session, &clock, &[E, G, C]);
        assert_eq!(session.status(), Status::Success);
        session.reset();
        assert_eq!(session.status(), Status::Pending);
        assert_eq!(session.expected(), Some(E));
    }

    #[test]
    fn test_empty_target_rejected() {
        let clock = Arc::new(ManualClock::new(0));
        assert!(matches!(
            SequenceSession::new(vec![], SessionConfig::default(), clock),
            Err(TrainerError::EmptySequence)
        ));
    }
}
