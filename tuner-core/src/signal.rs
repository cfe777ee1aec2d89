//! # Signal Stabilizer Module
//!
//! Post-processing between the raw estimator and the tuning logic: silence
//! gating, confidence gating, range clamping, a rolling median filter and a
//! variance-based stability score.

use std::collections::VecDeque;

use crate::config::StabilizerConfig;

/// Detections below this confidence are discarded.
pub const MIN_CONFIDENCE: f32 = 0.5;

/// Scales the normalized variance into the stability score.
///
/// A spread of roughly 100 cents (about 6% of the mean) drives stability to 0.
const STABILITY_VARIANCE_SCALE: f32 = 500.0;

/// Stabilized pitch for one cycle.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct StabilizedSignal {
    /// Median-filtered frequency in Hz, `None` while nothing is accepted.
    pub frequency: Option<f32>,
    pub confidence: f32,
    pub is_detecting: bool,
    /// Consistency of recent accepted readings (0.0 to 1.0).
    pub stability: f32,
}

impl StabilizedSignal {
    fn rejected(confidence: f32) -> Self {
        Self {
            frequency: None,
            confidence,
            is_detecting: false,
            stability: 0.0,
        }
    }
}

/// Bounded FIFO of recently accepted frequencies; the oldest entry is evicted
/// once the capacity is reached.
#[derive(Debug, Clone)]
pub struct FrequencyHistory {
    values: VecDeque<f32>,
    capacity: usize,
}

impl FrequencyHistory {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            values: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, frequency: f32) {
        if self.values.len() == self.capacity {
            self.values.pop_front();
        }
        self.values.push_back(frequency);
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    #[cfg(test)]
    fn iter(&self) -> impl Iterator<Item = f32> + '_ {
        self.values.iter().copied()
    }

    /// Median of the stored values; even lengths average the two middle values.
    pub fn median(&self) -> Option<f32> {
        if self.values.is_empty() {
            return None;
        }
        let mut sorted: Vec<f32> = self.values.iter().copied().collect();
        sorted.sort_by(f32::total_cmp);
        let mid = sorted.len() / 2;
        if sorted.len() % 2 == 1 {
            Some(sorted[mid])
        } else {
            Some((sorted[mid - 1] + sorted[mid]) / 2.0)
        }
    }

    /// Stability score from the normalized population variance.
    ///
    /// Zero until at least three values have been collected.
    pub fn stability(&self) -> f32 {
        if self.values.len() < 3 {
            return 0.0;
        }
        let n = self.values.len() as f32;
        let mean = self.values.iter().sum::<f32>() / n;
        if mean == 0.0 {
            return 0.0;
        }
        let variance = self.values.iter().map(|v| (v - mean).powi(2)).sum::<f32>() / n;
        let normalized_variance = variance / (mean * mean);
        (1.0 - normalized_variance * STABILITY_VARIANCE_SCALE).clamp(0.0, 1.0)
    }
}

/// Root-mean-square amplitude of a window.
pub fn rms(window: &[f32]) -> f32 {
    if window.is_empty() {
        return 0.0;
    }
    (window.iter().map(|&s| s * s).sum::<f32>() / window.len() as f32).sqrt()
}

/// Turns per-cycle raw estimates into a smoothed signal.
#[derive(Debug, Clone)]
pub struct SignalStabilizer {
    silence_threshold: f32,
    min_frequency: f32,
    max_frequency: f32,
    history: FrequencyHistory,
}

impl SignalStabilizer {
    pub fn new(config: &StabilizerConfig) -> Self {
        Self {
            silence_threshold: config.silence_threshold,
            min_frequency: config.min_frequency,
            max_frequency: config.max_frequency,
            history: FrequencyHistory::new(config.history_capacity),
        }
    }

    pub fn history(&self) -> &FrequencyHistory {
        &self.history
    }

    /// Processes one cycle. Gates are applied in order and the first one that
    /// rejects the reading decides the result.
    pub fn process(
        &mut self,
        raw_frequency: Option<f32>,
        confidence: f32,
        window: &[f32],
    ) -> StabilizedSignal {
        // --- Silence gate ---
        if rms(window) < self.silence_threshold {
            self.clear_history("silence");
            return StabilizedSignal::rejected(0.0);
        }

        // --- Confidence / no-detection gate ---
        let frequency = match raw_frequency {
            Some(f) if confidence >= MIN_CONFIDENCE => f,
            _ => {
                self.clear_history("no confident detection");
                return StabilizedSignal::rejected(confidence);
            }
        };

        // --- Range gate: history survives a momentary out-of-range reading ---
        if !(self.min_frequency..=self.max_frequency).contains(&frequency) {
            return StabilizedSignal::rejected(confidence);
        }

        self.history.push(frequency);
        StabilizedSignal {
            frequency: self.history.median(),
            confidence,
            is_detecting: true,
            stability: self.history.stability(),
        }
    }

    /// Drops the accumulated history.
    pub fn reset(&mut self) {
        self.history.clear();
    }

    fn clear_history(&mut self, reason: &'static str) {
        if !self.history.is_empty() {
            tracing::trace!(reason, len = self.history.len(), "clearing frequency history");
            self.history.clear();
        }
    }
}

impl Default for SignalStabilizer {
    fn default() -> Self {
        Self::new(&StabilizerConfig::default())
    }
}
