//! # Ear Trainer - console front end
//!
//! Asks for a note on a string or a triad, listens to the microphone and
//! judges what is played.
//!
//! ## Architecture
//! - **Main Thread**: question loop and text output
//! - **Audio Thread**: capture plus the trainer pipeline ([`worker`])
//! - **Communication**: crossbeam channels in both directions

mod quiz;
mod worker;

use std::io::{self, BufRead};
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use clap::{ArgAction, Parser};
use crossbeam_channel::{Receiver, Sender};
use log::info;
use trainer_core::audio::{self, CaptureOptions};
use trainer_core::{fretboard, InputKind, NoteOutcome, Quality, Status, TrainerConfig};

use quiz::{Mode, Question, QuizOptions};
use worker::{AudioWorker, WorkerEvent};

#[derive(Parser)]
#[command(name = "ear-trainer")]
#[command(about = "Play the requested note or triad; the trainer listens and judges")]
struct Args {
    /// What to ask for
    #[arg(long, value_enum, default_value_t = Mode::Triad)]
    mode: Mode,

    /// Input device (substring of its name); default device if omitted
    #[arg(long)]
    device: Option<String>,

    /// Zero-based input channel; all channels are mixed if omitted
    #[arg(long)]
    channel: Option<usize>,

    /// Use the lower amplitude gate for direct/line-level inputs
    #[arg(long)]
    line_in: bool,

    /// JSON config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write the effective config to this path and exit
    #[arg(long)]
    write_config: Option<PathBuf>,

    /// Number of questions (0 = keep going)
    #[arg(long, default_value_t = 0)]
    questions: usize,

    /// Restart the sequence on a wrong note instead of counting towards failure
    #[arg(long, action = ArgAction::Set, num_args = 0..=1, default_missing_value = "true")]
    reset_on_wrong: Option<bool>,

    /// Wrong notes allowed before a question fails (without reset-on-wrong)
    #[arg(long)]
    tolerance: Option<u32>,

    /// Triad qualities to ask for, comma separated
    #[arg(long, value_delimiter = ',', default_value = "major,minor")]
    qualities: Vec<String>,

    /// Only ask root-position triads
    #[arg(long)]
    no_inversions: bool,

    /// Note mode: the note must be played on the requested string
    #[arg(long)]
    strict_string: bool,

    /// Pause between questions in milliseconds
    #[arg(long, default_value_t = 1500)]
    pause_ms: u64,

    /// List input devices and exit
    #[arg(long)]
    list_devices: bool,
}

#[derive(Debug, Default)]
struct Stats {
    asked: usize,
    solved: usize,
    failed: usize,
    wrong_notes: u32,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    if args.list_devices {
        for name in audio::list_input_devices()? {
            println!("{name}");
        }
        return Ok(());
    }

    let config = build_config(&args)?;
    if let Some(path) = &args.write_config {
        config
            .save(path)
            .with_context(|| format!("Failed to write config to {}", path.display()))?;
        println!("Config written to {}", path.display());
        return Ok(());
    }

    let quiz = QuizOptions {
        mode: args.mode,
        qualities: args
            .qualities
            .iter()
            .map(|q| q.parse::<Quality>())
            .collect::<Result<Vec<_>, _>>()?,
        inversions: !args.no_inversions,
    };

    let capture = CaptureOptions {
        device: args.device.clone(),
        channel: args.channel,
    };
    let worker = AudioWorker::spawn(config, capture);
    wait_until_ready(&worker)?;

    println!("Ear trainer ({:?} mode). Type q and Enter to stop.", args.mode);
    let stats = run_quiz(&args, &quiz, &worker, &QuitSignal::spawn())?;
    drop(worker);

    println!("\nExiting trainer. Nice work!");
    println!(
        "Questions: {}  solved: {}  failed: {}  wrong notes: {}",
        stats.asked, stats.solved, stats.failed, stats.wrong_notes
    );
    Ok(())
}

fn build_config(args: &Args) -> Result<TrainerConfig> {
    let mut config = match &args.config {
        Some(path) => TrainerConfig::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => TrainerConfig::default(),
    };
    if args.line_in {
        config.detector.pitch.amplitude_threshold = InputKind::LineIn.default_amplitude_threshold();
    }
    if let Some(reset) = args.reset_on_wrong {
        config.session.reset_on_wrong = reset;
    }
    if let Some(tolerance) = args.tolerance {
        config.session.wrong_tolerance = tolerance;
    }
    config.validate()?;
    Ok(config)
}

fn wait_until_ready(worker: &AudioWorker) -> Result<()> {
    match worker.events().recv() {
        Ok(WorkerEvent::Ready { sample_rate }) => {
            info!("[MAIN] Listening at {} Hz", sample_rate);
            Ok(())
        }
        Ok(WorkerEvent::Failed(reason)) => Err(anyhow!("Audio setup failed: {reason}")),
        Ok(WorkerEvent::Update(_)) => Err(anyhow!("Audio thread sent data before it was ready")),
        Err(_) => Err(anyhow!("Audio thread exited during setup")),
    }
}

/// Fires once the player types `q` on stdin.
struct QuitSignal {
    rx: Receiver<()>,
    // Keeps the channel open after end of input.
    _tx: Sender<()>,
}

impl QuitSignal {
    fn spawn() -> Self {
        Self::from_reader(io::BufReader::new(io::stdin()))
    }

    fn from_reader<R: BufRead + Send + 'static>(reader: R) -> Self {
        let (tx, rx) = crossbeam_channel::bounded(1);
        let quit_tx = tx.clone();
        thread::spawn(move || {
            for line in reader.lines() {
                match line {
                    Ok(line) if line.trim().eq_ignore_ascii_case("q") => {
                        let _ = quit_tx.send(());
                        return;
                    }
                    Ok(_) => {}
                    Err(_) => return,
                }
            }
        });
        Self { rx, _tx: tx }
    }

    /// Waits out `pause`, returning `true` early if the player quits.
    fn wait(&self, pause: Duration) -> bool {
        self.rx.recv_timeout(pause).is_ok()
    }
}

fn run_quiz(args: &Args, quiz: &QuizOptions, worker: &AudioWorker, quit: &QuitSignal) -> Result<Stats> {
    let mut rng = rand::rng();
    let mut stats = Stats::default();

    while args.questions == 0 || stats.asked < args.questions {
        let question = Question::random(quiz, &mut rng);
        stats.asked += 1;

        println!("\n----------------------------------------");
        println!("Target: {}", question.prompt());
        println!("Listening...");
        worker.ask(question.target())?;

        let Some(status) = listen(args, &question, worker, quit, &mut stats)? else {
            break;
        };
        match status {
            Status::Success => stats.solved += 1,
            Status::Fail => stats.failed += 1,
            Status::Pending => {}
        }

        worker.clear()?;
        if quit.wait(Duration::from_millis(args.pause_ms)) {
            break;
        }
        worker.drain();
    }
    Ok(stats)
}

/// Prints judged notes until the current question is decided, or `None`
/// once the player quits.
fn listen(
    args: &Args,
    question: &Question,
    worker: &AudioWorker,
    quit: &QuitSignal,
    stats: &mut Stats,
) -> Result<Option<Status>> {
    let target = question.target();
    loop {
        let event = crossbeam_channel::select! {
            recv(worker.events()) -> event => event.map_err(|_| anyhow!("Audio thread stopped"))?,
            recv(quit.rx) -> _ => return Ok(None),
        };
        let update = match event {
            WorkerEvent::Update(update) => update,
            WorkerEvent::Failed(reason) => return Err(anyhow!("Audio failed: {reason}")),
            WorkerEvent::Ready { .. } => continue,
        };
        let Some(result) = update.result else { continue };
        if result.outcome == NoteOutcome::Duplicate {
            continue;
        }

        println!("\n{}", quiz::describe_heard(update.event.midi, update.event.frequency));
        if result.outcome == NoteOutcome::Wrong {
            stats.wrong_notes += 1;
        }

        if let (true, Some(string), Status::Success) = (args.strict_string, question.string(), result.status) {
            if fretboard::position_on_string(string, update.event.midi).is_none() {
                println!("Right note name, wrong string. Try again on string {string}.");
                worker.ask(target.clone())?;
                continue;
            }
        }

        println!("{}", quiz::render_result(&result));
        if target.len() > 1 {
            println!("{}", quiz::render_progress(&target, &result.progress));
        }
        if result.status.is_terminal() {
            return Ok(Some(result.status));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_reset_on_wrong_flag_forms() {
        let bare = Args::try_parse_from(["ear-trainer", "--reset-on-wrong"]).unwrap();
        assert_eq!(bare.reset_on_wrong, Some(true));

        let off = Args::try_parse_from(["ear-trainer", "--reset-on-wrong", "false"]).unwrap();
        assert_eq!(off.reset_on_wrong, Some(false));
        assert!(!build_config(&off).unwrap().session.reset_on_wrong);

        let absent = Args::try_parse_from(["ear-trainer"]).unwrap();
        assert_eq!(absent.reset_on_wrong, None);
    }

    #[test]
    fn test_q_stops_the_quiz() {
        let quit = QuitSignal::from_reader(Cursor::new("c major?\n Q \n"));
        assert!(quit.wait(Duration::from_secs(5)));
    }

    #[test]
    fn test_end_of_input_is_not_a_quit() {
        let quit = QuitSignal::from_reader(Cursor::new("hello\n"));
        assert!(!quit.wait(Duration::from_millis(100)));
        assert!(!quit.wait(Duration::from_millis(10)));
    }
}
