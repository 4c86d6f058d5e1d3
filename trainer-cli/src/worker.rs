//! Audio worker thread: owns the capture stream and the trainer context.
//!
//! The main thread only sends questions in and receives judged notes out, so
//! frame processing stays strictly in capture order on a single thread.

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use anyhow::{Result, anyhow};
use cpal::traits::StreamTrait;
use crossbeam_channel::{Receiver, Sender};
use log::{debug, info, warn};
use trainer_core::audio::{self, CaptureOptions};
use trainer_core::{PitchClass, SystemClock, Trainer, TrainerConfig, TrainerUpdate};

/// Requests from the UI thread.
#[derive(Debug, Clone)]
pub enum WorkerCommand {
    /// Start judging against a new target.
    Ask(Vec<PitchClass>),
    /// Keep listening without judging.
    Clear,
}

/// Messages from the audio thread.
#[derive(Debug, Clone)]
pub enum WorkerEvent {
    Ready { sample_rate: u32 },
    Update(TrainerUpdate),
    Failed(String),
}

/// Handle to the audio thread.
pub struct AudioWorker {
    shutdown_tx: Sender<()>,
    command_tx: Sender<WorkerCommand>,
    events: Receiver<WorkerEvent>,
    thread_handle: Option<JoinHandle<()>>,
}

impl AudioWorker {
    /// Spawns the audio thread. Capture errors arrive as [`WorkerEvent::Failed`].
    pub fn spawn(config: TrainerConfig, capture: CaptureOptions) -> Self {
        let (shutdown_tx, shutdown_rx) = crossbeam_channel::bounded(1);
        let (command_tx, command_rx) = crossbeam_channel::unbounded::<WorkerCommand>();
        let (event_tx, events) = crossbeam_channel::unbounded::<WorkerEvent>();

        let thread_handle = thread::spawn(move || {
            info!("[AUDIO-THREAD] Starting audio thread...");
            let (raw_audio_tx, raw_audio_rx) = crossbeam_channel::bounded::<Vec<f32>>(64);

            let (stream, sample_rate) = match audio::start_audio_capture(raw_audio_tx, &capture) {
                Ok(tuple) => tuple,
                Err(e) => {
                    let _ = event_tx.send(WorkerEvent::Failed(format!("{e:#}")));
                    return;
                }
            };

            let mut trainer = match Trainer::new(config, sample_rate, Arc::new(SystemClock::new())) {
                Ok(trainer) => trainer,
                Err(e) => {
                    let _ = event_tx.send(WorkerEvent::Failed(e.to_string()));
                    return;
                }
            };
            let _ = event_tx.send(WorkerEvent::Ready { sample_rate });

            info!("[AUDIO-THREAD] Entering audio processing loop...");
            loop {
                crossbeam_channel::select! {
                    recv(raw_audio_rx) -> msg => match msg {
                        Ok(frame) => {
                            if let Some(update) = trainer.on_frame(&frame) {
                                if event_tx.send(WorkerEvent::Update(update)).is_err() {
                                    debug!("[AUDIO-THREAD] Event receiver dropped");
                                    break;
                                }
                            }
                        }
                        Err(_) => {
                            warn!("[AUDIO-THREAD] Audio channel closed");
                            let _ = event_tx.send(WorkerEvent::Failed("audio stream ended".into()));
                            break;
                        }
                    },
                    recv(command_rx) -> msg => match msg {
                        Ok(WorkerCommand::Ask(target)) => {
                            if let Err(e) = trainer.start_question(target) {
                                warn!("[AUDIO-THREAD] Could not start question: {}", e);
                            }
                        }
                        Ok(WorkerCommand::Clear) => trainer.clear_question(),
                        Err(_) => break,
                    },
                    recv(shutdown_rx) -> _ => {
                        info!("[AUDIO-THREAD] Received shutdown signal");
                        break;
                    },
                }
            }

            if let Err(e) = stream.pause() {
                warn!("[AUDIO-THREAD] Error pausing stream: {}", e);
            }
            drop(stream);
            info!("[AUDIO-THREAD] Audio thread finished");
        });

        Self {
            shutdown_tx,
            command_tx,
            events,
            thread_handle: Some(thread_handle),
        }
    }

    pub fn events(&self) -> &Receiver<WorkerEvent> {
        &self.events
    }

    pub fn ask(&self, target: Vec<PitchClass>) -> Result<()> {
        self.command_tx
            .send(WorkerCommand::Ask(target))
            .map_err(|_| anyhow!("audio thread is not running"))
    }

    pub fn clear(&self) -> Result<()> {
        self.command_tx
            .send(WorkerCommand::Clear)
            .map_err(|_| anyhow!("audio thread is not running"))
    }

    /// Discards notes that arrived while no one was listening.
    pub fn drain(&self) {
        while self.events.try_recv().is_ok() {}
    }
}

impl Drop for AudioWorker {
    fn drop(&mut self) {
        let _ = self.shutdown_tx.try_send(());
        if let Some(handle) = self.thread_handle.take() {
            if handle.join().is_err() {
                warn!("[MAIN] Audio thread panicked");
            }
        }
    }
}
