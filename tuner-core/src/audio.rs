//! # Audio Capture Module
//!
//! Real-time microphone capture using CPAL (Cross-Platform Audio Library).
//! Callback chunks of arbitrary size are reassembled into overlapping,
//! fixed-length analysis windows and streamed to the detection thread.
//!
//! ## Features
//! - Default input device selection
//! - Prefers mono 32-bit float, downmixes multi-channel input otherwise
//! - One window per cycle at a fixed rate, independent of the device's buffer size

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::SupportedStreamConfigRange;
use crossbeam_channel::Sender;

use crate::config::TunerConfig;
use crate::error::CaptureError;

/// Slices a continuous sample stream into overlapping analysis windows.
///
/// Every `hop_size` new samples, the most recent `window_size` samples are
/// emitted. Nothing is emitted until the first full window has arrived.
#[derive(Debug, Clone)]
pub struct WindowAssembler {
    window_size: usize,
    hop_size: usize,
    buffer: Vec<f32>,
    since_emit: usize,
}

impl WindowAssembler {
    pub fn new(window_size: usize, hop_size: usize) -> Self {
        Self {
            window_size,
            hop_size: hop_size.max(1),
            buffer: Vec::with_capacity(window_size + hop_size),
            since_emit: 0,
        }
    }

    /// Appends `samples`, calling `emit` once per completed hop.
    pub fn push(&mut self, samples: &[f32], mut emit: impl FnMut(&[f32])) {
        let mut rest = samples;
        while !rest.is_empty() {
            let take = (self.hop_size - self.since_emit).min(rest.len());
            self.buffer.extend_from_slice(&rest[..take]);
            rest = &rest[take..];
            self.since_emit += take;

            if self.buffer.len() > self.window_size {
                let excess = self.buffer.len() - self.window_size;
                self.buffer.drain(..excess);
            }

            if self.since_emit == self.hop_size {
                self.since_emit = 0;
                if self.buffer.len() == self.window_size {
                    emit(&self.buffer);
                }
            }
        }
    }

    /// Discards everything collected so far.
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.since_emit = 0;
    }
}

/// Averages interleaved frames down to one channel.
pub fn downmix_to_mono(data: &[f32], channels: usize, out: &mut Vec<f32>) {
    out.clear();
    if channels <= 1 {
        out.extend_from_slice(data);
        return;
    }
    out.extend(
        data.chunks_exact(channels)
            .map(|frame| frame.iter().sum::<f32>() / channels as f32),
    );
}

/// Starts audio capture from the default input device.
///
/// Windows of `config.detector.window_size` samples are sent on `sender`
/// `config.cycle_rate_hz` times per second. Returns the running stream (which
/// must be kept alive) and the actual sample rate.
pub fn start_audio_capture(
    sender: Sender<Vec<f32>>,
    config: &TunerConfig,
) -> Result<(cpal::Stream, u32), CaptureError> {
    let host = cpal::default_host();
    let device = host
        .default_input_device()
        .ok_or(CaptureError::NoMicrophone)?;

    let device_name = device.name().unwrap_or_else(|_| "unknown".to_string());
    tracing::info!(device = %device_name, "using audio input device");

    let configs = device.supported_input_configs()?.collect::<Vec<_>>();
    let supported_config = find_supported_config(configs, config.detector.sample_rate)
        .ok_or_else(|| CaptureError::NotSupported("no f32 input format".to_string()))?;

    let target_rate = config.detector.sample_rate.clamp(
        supported_config.min_sample_rate().0,
        supported_config.max_sample_rate().0,
    );
    let stream_config = supported_config.with_sample_rate(cpal::SampleRate(target_rate));
    let sample_rate = stream_config.sample_rate().0;
    let channels = stream_config.channels() as usize;
    let stream_config: cpal::StreamConfig = stream_config.into();

    let hop_size = config.hop_size_at(sample_rate);
    tracing::info!(sample_rate, channels, hop_size, "selected input format");

    let mut assembler = WindowAssembler::new(config.detector.window_size, hop_size);
    let mut mono = Vec::new();
    let err_fn = |err: cpal::StreamError| tracing::error!(%err, "audio stream error");

    let stream = device.build_input_stream(
        &stream_config,
        move |data: &[f32], _: &cpal::InputCallbackInfo| {
            downmix_to_mono(data, channels, &mut mono);
            assembler.push(&mono, |window| {
                // A full channel means the consumer is behind; drop the window.
                let _ = sender.try_send(window.to_vec());
            });
        },
        err_fn,
        None,
    )?;

    stream.play()?;

    Ok((stream, sample_rate))
}

/// Picks the f32 input configuration closest to what the tuner wants:
/// mono first, then the smallest distance to `target_rate`.
fn find_supported_config(
    configs: Vec<SupportedStreamConfigRange>,
    target_rate: u32,
) -> Option<SupportedStreamConfigRange> {
    configs
        .into_iter()
        .filter(|c| c.sample_format() == cpal::SampleFormat::F32)
        .min_by_key(|c| {
            let rate_diff = if (c.min_sample_rate().0..=c.max_sample_rate().0).contains(&target_rate) {
                0
            } else {
                let min_diff = (c.min_sample_rate().0 as i64 - target_rate as i64).abs();
                let max_diff = (c.max_sample_rate().0 as i64 - target_rate as i64).abs();
                min_diff.min(max_diff)
            };
            (c.channels() != 1, rate_diff)
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(start: usize, len: usize) -> Vec<f32> {
        (start..start + len).map(|i| i as f32).collect()
    }

    #[test]
    fn test_assembler_waits_for_full_window() {
        let mut assembler = WindowAssembler::new(8, 4);
        let mut windows = Vec::new();
        assembler.push(&ramp(0, 4), |w| windows.push(w.to_vec()));
        assert!(windows.is_empty());
        assembler.push(&ramp(4, 4), |w| windows.push(w.to_vec()));
        assert_eq!(windows, vec![ramp(0, 8)]);
    }

    #[test]
    fn test_assembler_overlaps_by_hop() {
        let mut assembler = WindowAssembler::new(8, 4);
        let mut windows = Vec::new();
        // One large chunk spanning several hops.
        assembler.push(&ramp(0, 16), |w| windows.push(w.to_vec()));
        assert_eq!(windows, vec![ramp(0, 8), ramp(4, 8), ramp(8, 8)]);
    }

    #[test]
    fn test_assembler_handles_tiny_chunks() {
        let mut assembler = WindowAssembler::new(6, 3);
        let mut windows = Vec::new();
        for i in 0..12 {
            assembler.push(&[i as f32], |w| windows.push(w.to_vec()));
        }
        assert_eq!(windows, vec![ramp(0, 6), ramp(3, 6), ramp(6, 6)]);
    }

    #[test]
    fn test_assembler_clear_restarts() {
        let mut assembler = WindowAssembler::new(4, 2);
        let mut count = 0;
        assembler.push(&ramp(0, 4), |_| count += 1);
        assert_eq!(count, 1);
        assembler.clear();
        assembler.push(&ramp(0, 2), |_| count += 1);
        assert_eq!(count, 1);
    }

    #[test]
    fn test_downmix_averages_frames() {
        let mut out = Vec::new();
        downmix_to_mono(&[1.0, 3.0, -1.0, 1.0], 2, &mut out);
        assert_eq!(out, vec![2.0, 0.0]);
        downmix_to_mono(&[0.5, 0.25], 1, &mut out);
        assert_eq!(out, vec![0.5, 0.25]);
    }
}
