//! # Detection Worker
//!
//! Runs capture and the pitch pipeline on a dedicated thread. The audio
//! stream is created inside the thread (cpal streams are not `Send` on every
//! platform) and readings are sent back over a crossbeam channel.

use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use cpal::traits::StreamTrait;
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use once_cell::sync::Lazy;

use crate::audio;
use crate::config::TunerConfig;
use crate::error::CaptureError;
use crate::pipeline::{PitchPipeline, PitchReading};

/// Windows buffered between the audio callback and the detection loop.
const WINDOW_QUEUE: usize = 8;

/// How long `spawn` waits for the device to open before giving up.
const STARTUP_TIMEOUT: Duration = Duration::from_secs(5);

static CLOCK_ORIGIN: Lazy<Instant> = Lazy::new(Instant::now);

/// Milliseconds on a process-wide monotonic clock.
///
/// Shared by every session so hold timers survive a stop/start.
pub fn monotonic_ms() -> u64 {
    CLOCK_ORIGIN.elapsed().as_millis() as u64
}

/// Handle to a running detection thread.
#[derive(Debug)]
pub struct DetectionWorker {
    shutdown_tx: Sender<()>,
    pitch_center_tx: Sender<f32>,
    thread_handle: Option<JoinHandle<()>>,
}

impl DetectionWorker {
    /// Opens the microphone and starts detecting.
    ///
    /// Blocks until capture is running, has failed, or the start-up timeout
    /// expires, so start-up errors are returned here rather than surfacing
    /// later on the reading channel.
    pub fn spawn(config: &TunerConfig, readings: Sender<PitchReading>) -> Result<Self, CaptureError> {
        let (shutdown_tx, shutdown_rx) = crossbeam_channel::bounded(1);
        let (pitch_center_tx, pitch_center_rx) = crossbeam_channel::unbounded();
        let (ready_tx, ready_rx) = crossbeam_channel::bounded(1);
        let config = config.clone();

        let thread_handle = thread::Builder::new()
            .name("pitch-detection".to_string())
            .spawn(move || run(config, readings, shutdown_rx, pitch_center_rx, ready_tx))
            .map_err(|err| CaptureError::Unknown(err.to_string()))?;

        match await_startup(&ready_rx, STARTUP_TIMEOUT) {
            Ok(sample_rate) => {
                tracing::info!(sample_rate, "detection worker started");
                Ok(Self {
                    shutdown_tx,
                    pitch_center_tx,
                    thread_handle: Some(thread_handle),
                })
            }
            Err(err) => {
                // Detached: with the shutdown sender gone the thread exits as
                // soon as the backend hands control back.
                drop(shutdown_tx);
                drop(thread_handle);
                Err(err)
            }
        }
    }

    /// Recalibrates the running pipeline's A4 reference.
    pub fn set_pitch_center(&self, pitch_center: f32) {
        if self.pitch_center_tx.send(pitch_center).is_err() {
            tracing::warn!("detection thread is gone; pitch center not applied");
        }
    }

    /// Stops capture and waits for the thread to finish.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        let Some(handle) = self.thread_handle.take() else {
            return;
        };
        let _ = self.shutdown_tx.try_send(());
        if handle.join().is_err() {
            tracing::error!("detection thread panicked");
        } else {
            tracing::info!("detection worker stopped");
        }
    }
}

impl Drop for DetectionWorker {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Waits for the detection thread to report the granted sample rate.
fn await_startup(
    ready_rx: &Receiver<Result<u32, CaptureError>>,
    timeout: Duration,
) -> Result<u32, CaptureError> {
    match ready_rx.recv_timeout(timeout) {
        Ok(result) => result,
        Err(RecvTimeoutError::Timeout) => {
            tracing::error!(timeout_ms = timeout.as_millis() as u64, "audio device did not start");
            Err(CaptureError::Unknown(format!(
                "audio device did not start within {} ms",
                timeout.as_millis()
            )))
        }
        Err(RecvTimeoutError::Disconnected) => Err(CaptureError::Unknown(
            "detection thread exited during start-up".to_string(),
        )),
    }
}

fn run(
    config: TunerConfig,
    readings: Sender<PitchReading>,
    shutdown_rx: Receiver<()>,
    pitch_center_rx: Receiver<f32>,
    ready_tx: Sender<Result<u32, CaptureError>>,
) {
    let (window_tx, window_rx) = crossbeam_channel::bounded::<Vec<f32>>(WINDOW_QUEUE);

    let (stream, sample_rate) = match audio::start_audio_capture(window_tx, &config) {
        Ok(started) => started,
        Err(err) => {
            tracing::error!(kind = err.kind(), %err, "failed to start audio capture");
            let _ = ready_tx.send(Err(err));
            return;
        }
    };

    // The estimator's lag range depends on the rate the device granted.
    let mut session = config;
    session.detector.sample_rate = sample_rate;
    let mut pipeline = PitchPipeline::new(&session);
    let _ = ready_tx.send(Ok(sample_rate));

    loop {
        crossbeam_channel::select! {
            recv(window_rx) -> msg => match msg {
                Ok(window) => {
                    let reading = pipeline.process(&window, monotonic_ms());
                    if readings.send(reading).is_err() {
                        tracing::debug!("reading receiver dropped");
                        break;
                    }
                }
                Err(_) => {
                    tracing::warn!("audio channel closed");
                    break;
                }
            },
            recv(pitch_center_rx) -> msg => match msg {
                Ok(pitch_center) => {
                    tracing::debug!(pitch_center, "recalibrating pitch center");
                    pipeline.set_pitch_center(pitch_center);
                }
                Err(_) => break,
            },
            recv(shutdown_rx) -> _ => {
                tracing::debug!("received shutdown signal");
                break;
            },
        }
    }

    if let Err(err) = stream.pause() {
        tracing::warn!(%err, "error pausing stream");
    }
    pipeline.reset();
    drop(stream);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_monotonic_clock_never_goes_back() {
        let a = monotonic_ms();
        std::thread::sleep(std::time::Duration::from_millis(5));
        let b = monotonic_ms();
        assert!(b >= a + 5);
    }

    #[test]
    fn test_startup_reports_sample_rate() {
        let (tx, rx) = crossbeam_channel::bounded(1);
        tx.send(Ok(48000)).unwrap();
        assert_eq!(await_startup(&rx, Duration::from_millis(10)), Ok(48000));
    }

    #[test]
    fn test_startup_passes_capture_errors_through() {
        let (tx, rx) = crossbeam_channel::bounded(1);
        tx.send(Err(CaptureError::NoMicrophone)).unwrap();
        assert_eq!(
            await_startup(&rx, Duration::from_millis(10)),
            Err(CaptureError::NoMicrophone)
        );
    }

    #[test]
    fn test_hung_device_times_out() {
        let (_tx, rx) = crossbeam_channel::bounded::<Result<u32, CaptureError>>(1);
        let started = Instant::now();
        let result = await_startup(&rx, Duration::from_millis(20));
        assert!(matches!(result, Err(CaptureError::Unknown(_))));
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn test_thread_exit_during_startup_is_an_error() {
        let (tx, rx) = crossbeam_channel::bounded::<Result<u32, CaptureError>>(1);
        drop(tx);
        assert_eq!(
            await_startup(&rx, Duration::from_millis(10)),
            Err(CaptureError::Unknown(
                "detection thread exited during start-up".to_string()
            ))
        );
    }
}
