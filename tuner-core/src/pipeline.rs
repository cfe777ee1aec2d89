//! # Pitch Pipeline
//!
//! One detection cycle: estimator → stabilizer → note mapping. The pipeline
//! owns the estimator's scratch memory and the stabilizer's history; the
//! tuning tracker is driven separately by whoever consumes the readings.

use crate::config::TunerConfig;
use crate::error::CaptureError;
use crate::pitch::PitchEstimator;
use crate::signal::SignalStabilizer;
use crate::tracker::PitchInput;
use crate::tuning::{self, NoteInfo};

/// Result of one detection cycle, ready for display and the tracker.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PitchReading {
    /// Stabilized frequency in Hz.
    pub frequency: Option<f32>,
    /// Nearest note of `frequency`.
    pub note: Option<NoteInfo>,
    /// Cents offset from `note` (0 when nothing is detected).
    pub cents: i32,
    pub confidence: f32,
    pub stability: f32,
    pub is_detecting: bool,
    /// Monotonic timestamp of the cycle in milliseconds.
    pub timestamp_ms: u64,
}

impl PitchReading {
    /// The reading shown while detection is stopped.
    pub fn silent() -> Self {
        Self::default()
    }

    /// The `{note, stability, isDetecting}` triple consumed by the tracker.
    pub fn to_pitch_input(&self) -> PitchInput {
        PitchInput {
            note: self.note,
            stability: self.stability,
            is_detecting: self.is_detecting,
        }
    }
}

/// Lifecycle of live detection, as shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DetectorStatus {
    #[default]
    Idle,
    RequestingPermission,
    Active,
    Error(CaptureError),
}

impl DetectorStatus {
    pub fn is_active(&self) -> bool {
        matches!(self, DetectorStatus::Active)
    }
}

/// Estimator and stabilizer for one session.
#[derive(Debug, Clone)]
pub struct PitchPipeline {
    estimator: PitchEstimator,
    stabilizer: SignalStabilizer,
    pitch_center: f32,
}

impl PitchPipeline {
    pub fn new(config: &TunerConfig) -> Self {
        Self {
            estimator: PitchEstimator::new(&config.detector),
            stabilizer: SignalStabilizer::new(&config.stabilizer),
            pitch_center: config.pitch_center(),
        }
    }

    /// Changes the A4 reference used for note mapping, clamped to the
    /// calibration range. History is kept: it holds raw frequencies.
    pub fn set_pitch_center(&mut self, pitch_center: f32) {
        self.pitch_center = tuning::clamp_pitch_center(pitch_center);
    }

    /// Runs one full cycle on `window`.
    pub fn process(&mut self, window: &[f32], timestamp_ms: u64) -> PitchReading {
        let raw = self.estimator.detect(window);
        let signal = self
            .stabilizer
            .process(raw.frequency, raw.confidence, window);
        let note = signal
            .frequency
            .and_then(|freq| tuning::frequency_to_note(freq, self.pitch_center));

        PitchReading {
            frequency: signal.frequency,
            note,
            cents: note.map_or(0, |n| n.cents),
            confidence: signal.confidence,
            stability: signal.stability,
            is_detecting: signal.is_detecting,
            timestamp_ms,
        }
    }

    /// Forgets accumulated history so the next cycle starts clean.
    pub fn reset(&mut self) {
        self.stabilizer.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tuning::NoteName;

    fn sine(freq: f32, amplitude: f32) -> Vec<f32> {
        (0..2048)
            .map(|i| amplitude * (2.0 * std::f32::consts::PI * freq * i as f32 / 44100.0).sin())
            .collect()
    }

    #[test]
    fn test_silent_window_reads_silent() {
        let mut pipeline = PitchPipeline::new(&TunerConfig::default());
        let reading = pipeline.process(&vec![0.0; 2048], 5);
        assert_eq!(reading.frequency, None);
        assert_eq!(reading.note, None);
        assert!(!reading.is_detecting);
        assert_eq!(reading.stability, 0.0);
        assert_eq!(reading.timestamp_ms, 5);
    }

    #[test]
    fn test_tone_maps_to_note() {
        let mut pipeline = PitchPipeline::new(&TunerConfig::default());
        let window = sine(110.0, 0.5);
        let mut reading = PitchReading::silent();
        for t in 0..5 {
            reading = pipeline.process(&window, t * 33);
        }
        let note = reading.note.expect("A2 should be mapped");
        assert_eq!(note.name, NoteName::A);
        assert_eq!(note.octave, 2);
        assert!(reading.cents.abs() <= 10, "cents {}", reading.cents);
        assert!(reading.stability > 0.9);

        let input = reading.to_pitch_input();
        assert!(input.is_detecting);
        assert_eq!(input.note, Some(note));
    }

    #[test]
    fn test_recalibration_applies_to_next_cycle() {
        let mut pipeline = PitchPipeline::new(&TunerConfig::default());
        let window = sine(110.0, 0.5);
        for t in 0..4 {
            pipeline.process(&window, t);
        }
        let at_440 = pipeline.process(&window, 4).cents;

        pipeline.set_pitch_center(442.0);
        let reading = pipeline.process(&window, 5);
        let note = reading.note.expect("A2 should still be mapped");
        assert_eq!(note.label(), "A2");
        // Same tone, sharper reference: about 8 cents lower than before.
        assert!((at_440 - reading.cents - 8).abs() <= 1, "{} vs {}", at_440, reading.cents);
        assert!(reading.stability > 0.9);
    }

    #[test]
    fn test_reset_clears_stability() {
        let mut pipeline = PitchPipeline::new(&TunerConfig::default());
        let window = sine(196.0, 0.5);
        for t in 0..5 {
            pipeline.process(&window, t);
        }
        pipeline.reset();
        assert_eq!(pipeline.process(&window, 10).stability, 0.0);
    }

    #[test]
    fn test_status_defaults_to_idle() {
        assert_eq!(DetectorStatus::default(), DetectorStatus::Idle);
        assert!(!DetectorStatus::Error(CaptureError::NoMicrophone).is_active());
        assert!(DetectorStatus::Active.is_active());
    }
}
