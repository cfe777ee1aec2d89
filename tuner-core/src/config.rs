//! # Configuration Module
//!
//! Every tunable constant of the detection pipeline lives here, grouped by the
//! stage that consumes it. The whole tree can be saved to and loaded from a JSON
//! file so a player's preferred reference pitch and preset survive restarts.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use crate::tuning::{self, PitchStandard};

/// Settings for the YIN pitch estimator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Sample rate of the incoming windows in Hz.
    pub sample_rate: u32,
    /// Number of samples per analysis window.
    pub window_size: usize,
    /// Absolute threshold on the normalized difference (0..1).
    pub threshold: f32,
    /// Lowest detectable frequency in Hz.
    pub min_frequency: f32,
    /// Highest detectable frequency in Hz.
    pub max_frequency: f32,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44100,
            window_size: 2048,
            threshold: 0.15,
            min_frequency: 70.0,
            max_frequency: 700.0,
        }
    }
}

/// Settings for the signal stabilizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StabilizerConfig {
    /// RMS level below which a window counts as silence.
    pub silence_threshold: f32,
    /// Lower bound of the accepted (guitar) range in Hz.
    pub min_frequency: f32,
    /// Upper bound of the accepted (guitar) range in Hz.
    pub max_frequency: f32,
    /// Capacity of the rolling median history.
    pub history_capacity: usize,
}

impl Default for StabilizerConfig {
    fn default() -> Self {
        Self {
            silence_threshold: 0.01,
            min_frequency: 82.0,
            max_frequency: 660.0,
            history_capacity: 11,
        }
    }
}

/// Settings for the guided tuning tracker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Maximum absolute cents offset that still counts as in tune.
    pub in_tune_cents: i32,
    /// Minimum stability required while holding a string in tune.
    pub in_tune_stability: f32,
    /// How long a string must stay in tune before it is locked (ms).
    pub hold_ms: u64,
    /// Minimum time between two detected-string switches (ms).
    pub debounce_ms: u64,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            in_tune_cents: 5,
            in_tune_stability: 0.7,
            hold_ms: 1000,
            debounce_ms: 150,
        }
    }
}

/// Top-level configuration for a tuner session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TunerConfig {
    pub detector: DetectorConfig,
    pub stabilizer: StabilizerConfig,
    pub tracker: TrackerConfig,
    /// A4 reference in Hz used when mapping frequencies to notes.
    /// Read it through [`TunerConfig::pitch_center`], which clamps it.
    pub pitch_center: f32,
    /// Target number of detection cycles per second.
    pub cycle_rate_hz: u32,
    /// Tuning preset selected at start-up.
    pub preset_id: String,
}

impl Default for TunerConfig {
    fn default() -> Self {
        Self {
            detector: DetectorConfig::default(),
            stabilizer: StabilizerConfig::default(),
            tracker: TrackerConfig::default(),
            pitch_center: PitchStandard::A440.pitch_center(),
            cycle_rate_hz: 30,
            preset_id: "standard".to_string(),
        }
    }
}

impl TunerConfig {
    /// A4 reference, clamped to the calibration range.
    pub fn pitch_center(&self) -> f32 {
        tuning::clamp_pitch_center(self.pitch_center)
    }

    /// Calibrates the A4 reference, clamping it to the calibration range.
    pub fn set_pitch_center(&mut self, pitch_center: f32) {
        self.pitch_center = tuning::clamp_pitch_center(pitch_center);
    }

    /// Number of new samples between two consecutive detection cycles.
    pub fn hop_size(&self) -> usize {
        self.hop_size_at(self.detector.sample_rate)
    }

    /// Hop size for a device running at `sample_rate`.
    pub fn hop_size_at(&self, sample_rate: u32) -> usize {
        (sample_rate / self.cycle_rate_hz.max(1)).max(1) as usize
    }

    /// Loads a configuration from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut file = File::open(path)
            .with_context(|| format!("failed to open config file {}", path.display()))?;
        let mut data = String::new();
        file.read_to_string(&mut data)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let config = serde_json::from_str(&data)
            .with_context(|| format!("malformed config file {}", path.display()))?;
        Ok(config)
    }

    /// Loads a configuration, falling back to defaults when the file does not exist.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::info!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }
        Self::load(path)
    }

    /// Saves the configuration as pretty-printed JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let json_string = serde_json::to_string_pretty(self).context("failed to serialize config")?;
        let mut file = File::create(path)
            .with_context(|| format!("failed to create config file {}", path.display()))?;
        file.write_all(json_string.as_bytes())?;
        Ok(())
    }
}
