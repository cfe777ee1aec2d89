//! # Pitch Detection Module
//!
//! Fundamental-frequency estimation for single-note instrument input using the
//! YIN algorithm (de Cheveigné & Kawahara, 2002).
//!
//! ## Algorithm
//! 1. **Difference function** - d(τ) = Σ(x[j] - x[j+τ])² over the first half window
//! 2. **Cumulative mean normalized difference** - d'(τ) = d(τ)·τ / Σd(1..τ)
//! 3. **Absolute threshold** - first τ with d'(τ) below the threshold, then the local minimum
//! 4. **Parabolic interpolation** - sub-sample refinement of the lag
//!
//! The search is restricted to lags between `sample_rate / max_frequency` and
//! `sample_rate / min_frequency`, so the cost is O(lag range × half window).

use crate::config::DetectorConfig;

/// Raw output of one detection call.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PitchEstimate {
    /// Detected fundamental in Hz, `None` when no periodic structure was found.
    pub frequency: Option<f32>,
    /// Confidence of the detection (0.0 to 1.0).
    pub confidence: f32,
}

impl PitchEstimate {
    /// The "nothing periodic here" result.
    pub const NONE: PitchEstimate = PitchEstimate {
        frequency: None,
        confidence: 0.0,
    };
}

/// YIN pitch estimator for fixed-length windows.
///
/// The internal buffer only exists to avoid an allocation per call. It is
/// fully rewritten on every call, so identical windows always produce
/// identical estimates.
#[derive(Debug, Clone)]
pub struct PitchEstimator {
    sample_rate: f32,
    threshold: f32,
    min_frequency: f32,
    max_frequency: f32,
    window_size: usize,
    half_size: usize,
    yin_buffer: Vec<f32>,
}

impl PitchEstimator {
    pub fn new(config: &DetectorConfig) -> Self {
        let half_size = config.window_size / 2;
        Self {
            sample_rate: config.sample_rate as f32,
            threshold: config.threshold,
            min_frequency: config.min_frequency,
            max_frequency: config.max_frequency,
            window_size: config.window_size,
            half_size,
            yin_buffer: vec![0.0; half_size],
        }
    }

    /// Lag search range `[min, max)` in samples.
    fn lag_bounds(&self) -> (usize, usize) {
        let lag_min = (self.sample_rate / self.max_frequency).floor() as usize;
        let lag_max = ((self.sample_rate / self.min_frequency).ceil() as usize).min(self.half_size);
        (lag_min.max(1), lag_max)
    }

    /// Estimates the fundamental frequency of one window.
    ///
    /// Windows whose length differs from the configured one yield no detection.
    pub fn detect(&mut self, window: &[f32]) -> PitchEstimate {
        if window.len() != self.window_size || self.half_size < 3 {
            tracing::trace!(
                got = window.len(),
                expected = self.window_size,
                "window length mismatch"
            );
            return PitchEstimate::NONE;
        }

        let half = self.half_size;
        let (lag_min, lag_max) = self.lag_bounds();
        if lag_min >= lag_max {
            return PitchEstimate::NONE;
        }
        let threshold = self.threshold;
        let yin = &mut self.yin_buffer;

        // --- Step 1: Difference function over the searched lags ---
        yin.fill(0.0);
        for tau in lag_min..lag_max {
            let mut diff = 0.0;
            for i in 0..half {
                let delta = window[i] - window[i + tau];
                diff += delta * delta;
            }
            yin[tau] = diff;
        }

        // --- Step 2: Cumulative mean normalized difference ---
        yin[0] = 1.0;
        let mut running_sum = 0.0;
        for tau in 1..lag_max {
            running_sum += yin[tau];
            yin[tau] = if running_sum == 0.0 {
                1.0
            } else {
                yin[tau] * tau as f32 / running_sum
            };
        }

        // --- Step 3: First dip below the threshold, walked down to its minimum ---
        let Some(tau_estimate) = (lag_min..lag_max)
            .find(|&tau| yin[tau] < threshold)
            .map(|mut tau| {
                while tau + 1 < lag_max && yin[tau + 1] < yin[tau] {
                    tau += 1;
                }
                tau
            })
        else {
            return PitchEstimate::NONE;
        };

        let confidence = 1.0 - yin[tau_estimate];

        // --- Step 4: Parabolic interpolation for sub-sample accuracy ---
        let refined_tau = if tau_estimate > 0 && tau_estimate < half - 1 {
            let s0 = yin[tau_estimate - 1];
            let s1 = yin[tau_estimate];
            let s2 = yin[tau_estimate + 1];
            let adjustment = (s2 - s0) / (2.0 * (2.0 * s1 - s2 - s0));
            if adjustment.is_finite() {
                tau_estimate as f32 + adjustment
            } else {
                tau_estimate as f32
            }
        } else {
            tau_estimate as f32
        };

        PitchEstimate {
            frequency: Some(self.sample_rate / refined_tau),
            confidence,
        }
    }
}
