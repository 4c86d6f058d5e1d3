//! Trainer context: one listening pipeline plus the question being asked.
//!
//! Everything a running trainer mutates lives in this struct, so several
//! trainers (one per input, say) can run side by side.

use std::sync::Arc;

use log::info;
use serde::Serialize;

use crate::clock::Clock;
use crate::config::{DetectorConfig, SessionConfig, TrainerConfig};
use crate::error::Result;
use crate::matcher::{MatchResult, SequenceSession};
use crate::pipeline::Listener;
use crate::sustain::PitchClassEvent;
use crate::tuning::PitchClass;

/// A detected note and, if a question is active, how it was judged.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrainerUpdate {
    pub event: PitchClassEvent,
    pub result: Option<MatchResult>,
}

pub struct Trainer {
    listener: Listener,
    session_config: SessionConfig,
    session: Option<SequenceSession>,
}

impl Trainer {
    pub fn new(config: TrainerConfig, sample_rate: u32, clock: Arc<dyn Clock>) -> Result<Self> {
        Self::with_parts(config.detector, config.session, sample_rate, clock)
    }

    pub fn with_parts(
        detector: DetectorConfig,
        session: SessionConfig,
        sample_rate: u32,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        Ok(Self {
            listener: Listener::new(detector, sample_rate, clock)?,
            session_config: session,
            session: None,
        })
    }

    pub fn listener(&self) -> &Listener {
        &self.listener
    }

    pub fn session(&self) -> Option<&SequenceSession> {
        self.session.as_ref()
    }

    /// Replaces the active question. The note tracker is reset so a note
    /// still ringing from the previous question does not count.
    pub fn start_question(&mut self, target: Vec<PitchClass>) -> Result<()> {
        let session = SequenceSession::new(target, self.session_config.clone(), self.listener.clock())?;
        info!(
            "[TRAINER] new question: {}",
            session.target().iter().map(|p| p.name()).collect::<Vec<_>>().join(" ")
        );
        self.session = Some(session);
        self.listener.reset();
        Ok(())
    }

    /// Drops the active question; notes are still detected but not judged.
    pub fn clear_question(&mut self) {
        self.session = None;
    }

    /// Feeds one captured frame.
    pub fn on_frame(&mut self, frame: &[f32]) -> Option<TrainerUpdate> {
        let event = self.listener.push_frame(frame)?;
        let result = self
            .session
            .as_mut()
            .map(|session| session.accept_class(event.pitch_class));
        Some(TrainerUpdate { event, result })
    }
}
