//! # Audio Capture Module
//!
//! Real-time microphone capture with CPAL (Cross-Platform Audio Library).
//! Interleaved device buffers are reduced to a single channel, either a chosen
//! input channel or a mono downmix, and re-chunked into fixed-size frames for
//! the analysis pipeline.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::SupportedStreamConfigRange;
use crossbeam_channel::{Sender, TrySendError};
use anyhow::{Result, anyhow, Context};
use log::{info, warn};

/// Audio buffer size for processing frames.
///
/// 2048 samples is about 46 ms at 44.1 kHz: long enough to hold two periods
/// of the lowest admissible fundamental.
pub const BUFFER_SIZE: usize = 2048;

/// Preferred capture rate in Hz.
pub const TARGET_SAMPLE_RATE: u32 = 44100;

/// Dropped frames between two "falling behind" warnings.
const DROP_LOG_INTERVAL: u64 = 100;

/// Which input to open and how to reduce it to one channel.
#[derive(Debug, Clone, Default)]
pub struct CaptureOptions {
    /// Substring of the device name; the default input device when `None`.
    pub device: Option<String>,
    /// Zero-based channel to analyse; all channels are averaged when `None`.
    pub channel: Option<usize>,
}

/// Names of all available input devices.
pub fn list_input_devices() -> Result<Vec<String>> {
    let host = cpal::default_host();
    let mut names = Vec::new();
    for device in host.input_devices()? {
        names.push(device.name()?);
    }
    Ok(names)
}

/// Starts audio capture and streams fixed-size mono frames to `sender`.
///
/// # Returns
/// * `Ok((stream, sample_rate))` - Audio stream handle and sample rate
/// * `Err(e)` - Error if no device, format or stream could be set up
pub fn start_audio_capture(
    sender: Sender<Vec<f32>>,
    options: &CaptureOptions,
) -> Result<(cpal::Stream, u32)> {
    let host = cpal::default_host();
    let device = match &options.device {
        Some(wanted) => host
            .input_devices()?
            .find(|d| d.name().map(|n| n.contains(wanted.as_str())).unwrap_or(false))
            .ok_or_else(|| anyhow!("No input device matching {:?}", wanted))?,
        None => host
            .default_input_device()
            .ok_or_else(|| anyhow!("No input device available"))?,
    };

    info!("[AUDIO] Using audio input device: {}", device.name()?);

    let configs = device.supported_input_configs()?.collect::<Vec<_>>();
    let supported_config = find_supported_config(configs, TARGET_SAMPLE_RATE, options.channel)
        .ok_or_else(|| anyhow!("No suitable f32 input format found"))?;

    let rate = TARGET_SAMPLE_RATE
        .clamp(supported_config.min_sample_rate().0, supported_config.max_sample_rate().0);
    let config = supported_config.with_sample_rate(cpal::SampleRate(rate));

    let sample_rate_val = config.sample_rate().0;
    let channels = config.channels() as usize;
    let config: cpal::StreamConfig = config.into();

    if let Some(channel) = options.channel {
        if channel >= channels {
            return Err(anyhow!("Channel {} requested but device has {} channels", channel, channels));
        }
    }
    info!("[AUDIO] Selected sample rate: {} Hz, {} channel(s)", sample_rate_val, channels);

    let err_fn = |err| warn!("[AUDIO] An error occurred on the audio stream: {}", err);

    // This buffer will accumulate audio data from the callback.
    let mut audio_buffer = Vec::with_capacity(BUFFER_SIZE * 2);
    let mut dropped = DroppedFrames::default();
    let selected_channel = options.channel;

    let stream = device
        .build_input_stream(
            &config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                audio_buffer.extend(to_mono(data, channels, selected_channel));
                forward_frames(&mut audio_buffer, &sender, &mut dropped);
            },
            err_fn,
            None,
        )
        .context("Failed to build input stream")?;

    stream.play()?;

    Ok((stream, sample_rate_val))
}

/// Reduces an interleaved buffer to one channel.
pub fn to_mono(
    data: &[f32],
    channels: usize,
    channel: Option<usize>,
) -> impl Iterator<Item = f32> + '_ {
    let channels = channels.max(1);
    data.chunks_exact(channels).map(move |frame| match channel {
        Some(c) => frame.get(c).copied().unwrap_or(0.0),
        None => frame.iter().sum::<f32>() / channels as f32,
    })
}

/// Finds the best supported f32 configuration for the target sample rate.
///
/// Configurations that include the requested channel and contain the target
/// rate are preferred; fewer channels win ties.
fn find_supported_config(
    configs: Vec<SupportedStreamConfigRange>,
    target_rate: u32,
    channel: Option<usize>,
) -> Option<SupportedStreamConfigRange> {
    configs
        .into_iter()
        .filter(|c| c.sample_format() == cpal::SampleFormat::F32)
        .filter(|c| channel.is_none_or(|ch| (c.channels() as usize) > ch))
        .min_by_key(|c| {
            let min_diff = (c.min_sample_rate().0 as i64 - target_rate as i64).abs();
            let max_diff = (c.max_sample_rate().0 as i64 - target_rate as i64).abs();
            let contains = c.min_sample_rate().0 <= target_rate && target_rate <= c.max_sample_rate().0;
            let distance = if contains { 0 } else { min_diff.min(max_diff) };
            (distance, c.channels())
        })
}

/// Frames the analysis side could not take.
#[derive(Debug, Default)]
struct DroppedFrames {
    total: u64,
}

impl DroppedFrames {
    /// Counts one drop; `true` when it should be logged.
    fn record(&mut self) -> bool {
        self.total += 1;
        self.total == 1 || self.total % DROP_LOG_INTERVAL == 0
    }
}

/// Sends every complete frame in `buffer` and keeps the remainder.
///
/// A full channel drops the frame: blocking here would stall the device
/// callback.
fn forward_frames(buffer: &mut Vec<f32>, sender: &Sender<Vec<f32>>, dropped: &mut DroppedFrames) {
    while buffer.len() >= BUFFER_SIZE {
        let frame: Vec<f32> = buffer.drain(..BUFFER_SIZE).collect();
        match sender.try_send(frame) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                if dropped.record() {
                    warn!("[AUDIO] Analysis is falling behind, {} frame(s) dropped so far", dropped.total);
                }
            }
            // Receiver gone; the stream is about to be torn down.
            Err(TrySendError::Disconnected(_)) => {}
        }
    }
}
