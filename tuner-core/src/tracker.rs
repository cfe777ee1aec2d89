//! # Guided Tuning Tracker
//!
//! Walks the player through the strings of a preset. Every cycle the tracker
//! receives the mapped note of the stabilized pitch and decides which string
//! is being played, whether it has been held in tune long enough, and which
//! string to move to next.
//!
//! All operations are total: out-of-range indices, missing notes and
//! unmatched pitches leave the state untouched.

use serde::{Deserialize, Serialize};

use crate::config::TrackerConfig;
use crate::tuning::{self, NoteInfo, TuningPreset};

/// Workflow mode of the tuner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TunerMode {
    /// Step through the strings with hold-to-confirm.
    Guided,
    /// Passive display; the tracker ignores incoming pitches.
    AutoDetect,
}

/// Progress of a single string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StringStatus {
    /// Locked once reached; only a reset or preset change clears it.
    pub in_tune: bool,
    /// Timestamp (ms) at which the current uninterrupted in-tune hold began.
    pub in_tune_since: Option<u64>,
}

impl StringStatus {
    /// True while a hold is in progress but not yet confirmed.
    pub fn is_holding(&self) -> bool {
        !self.in_tune && self.in_tune_since.is_some()
    }
}

/// Externally visible tracker state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TunerState {
    pub mode: TunerMode,
    pub active_tuning: TuningPreset,
    /// One entry per string of `active_tuning`.
    pub string_status: Vec<StringStatus>,
    /// String currently being tuned; `None` in auto-detect mode.
    pub current_string_index: Option<usize>,
}

impl TunerState {
    fn guided(preset: TuningPreset) -> Self {
        Self {
            mode: TunerMode::Guided,
            string_status: vec![StringStatus::default(); preset.len()],
            current_string_index: (!preset.is_empty()).then_some(0),
            active_tuning: preset,
        }
    }

    /// True once every string has been locked in tune.
    pub fn all_in_tune(&self) -> bool {
        !self.string_status.is_empty() && self.string_status.iter().all(|s| s.in_tune)
    }

    fn reset_status(&mut self) {
        self.string_status.fill(StringStatus::default());
    }
}

/// Per-cycle input of the tracker.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PitchInput {
    pub note: Option<NoteInfo>,
    pub stability: f32,
    pub is_detecting: bool,
}

/// Bookkeeping that suppresses flicker between neighbouring strings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Debounce {
    last_detected_string: Option<usize>,
    /// `None` until the first accepted switch, so that one is never debounced.
    last_change_ms: Option<u64>,
}

/// Owns the guided-workflow state for one session.
#[derive(Debug, Clone)]
pub struct TuningTracker {
    state: TunerState,
    debounce: Debounce,
    config: TrackerConfig,
}

impl TuningTracker {
    /// Starts in guided mode on `preset`, pointing at the first string.
    pub fn new(preset: TuningPreset, config: TrackerConfig) -> Self {
        Self {
            state: TunerState::guided(preset),
            debounce: Debounce::default(),
            config,
        }
    }

    pub fn state(&self) -> &TunerState {
        &self.state
    }

    /// Replaces the active tuning and restarts the guided workflow.
    pub fn select_preset(&mut self, preset: TuningPreset) {
        tracing::debug!(preset = %preset.id, "selecting tuning preset");
        self.state = TunerState::guided(preset);
        self.clear_debounce();
    }

    /// Switches to passive auto-detect mode.
    pub fn select_auto_detect(&mut self) {
        tracing::debug!("switching to auto-detect mode");
        self.state.mode = TunerMode::AutoDetect;
        self.state.current_string_index = None;
        self.state.reset_status();
        self.clear_debounce();
    }

    /// Clears all progress and points back at the first string. Keeps the mode.
    pub fn reset_strings(&mut self) {
        self.state.reset_status();
        self.state.current_string_index = (!self.state.string_status.is_empty()).then_some(0);
        self.clear_debounce();
    }

    /// Moves the guided pointer to `index`; ignored when out of range.
    pub fn jump_to_string(&mut self, index: usize) {
        if index < self.state.string_status.len() {
            self.state.current_string_index = Some(index);
        }
    }

    /// Forgets the last detected string so the next detection switches freely.
    pub fn clear_debounce(&mut self) {
        self.debounce = Debounce::default();
    }

    /// Feeds one cycle's pitch into the guided workflow.
    ///
    /// `now_ms` is a monotonic timestamp in milliseconds.
    pub fn update_guided_state(&mut self, pitch: &PitchInput, now_ms: u64) {
        let note = match pitch.note {
            Some(note) if pitch.is_detecting => note,
            _ => return,
        };
        if self.state.mode != TunerMode::Guided {
            return;
        }
        let Some(matched) = tuning::find_closest_string(&note, &self.state.active_tuning) else {
            return;
        };
        let string_index = matched.string_index;

        // --- Debounce string switching ---
        let mut current_index = self.state.current_string_index;
        if Some(string_index) != self.debounce.last_detected_string {
            if let Some(last_change) = self.debounce.last_change_ms {
                let elapsed = now_ms.saturating_sub(last_change);
                if elapsed < self.config.debounce_ms {
                    tracing::trace!(string_index, elapsed, "debounced string switch");
                    return;
                }
            }
            self.debounce.last_detected_string = Some(string_index);
            self.debounce.last_change_ms = Some(now_ms);
            current_index = Some(string_index);
        }

        // --- Hold-to-confirm on the matched string ---
        let within_tolerance = matched.cents_off.abs() <= self.config.in_tune_cents
            && pitch.stability >= self.config.in_tune_stability;
        let entry = &mut self.state.string_status[string_index];
        let mut locked = false;

        if entry.in_tune {
            // Locked; nothing to do.
        } else if within_tolerance {
            match entry.in_tune_since {
                None => entry.in_tune_since = Some(now_ms),
                Some(since) if now_ms.saturating_sub(since) >= self.config.hold_ms => {
                    entry.in_tune = true;
                    entry.in_tune_since = None;
                    locked = true;
                }
                Some(_) => {}
            }
        } else {
            entry.in_tune_since = None;
        }

        if locked {
            tracing::debug!(string_index, "string locked in tune");
            if let Some(next) = next_untuned(&self.state.string_status, string_index) {
                tracing::debug!(from = string_index, to = next, "auto-advancing");
                current_index = Some(next);
            }
        }

        self.state.current_string_index = current_index;
    }
}

/// Next string after `from` (wrapping) that is not yet in tune.
fn next_untuned(status: &[StringStatus], from: usize) -> Option<usize> {
    let len = status.len();
    (1..=len)
        .map(|offset| (from + offset) % len)
        .find(|&idx| !status[idx].in_tune)
}

impl Default for TuningTracker {
    fn default() -> Self {
        Self::new(tuning::standard_tuning().clone(), TrackerConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tuning::{NoteName, find_preset};

    fn pitch(midi: i32, cents: i32, stability: f32) -> PitchInput {
        PitchInput {
            note: Some(NoteInfo {
                name: NoteName::from_midi(midi),
                octave: midi.div_euclid(12) - 1,
                midi,
                cents,
                frequency: tuning::midi_to_frequency(midi, 440.0),
            }),
            stability,
            is_detecting: true,
        }
    }

    #[test]
    fn test_initial_state_is_guided_standard() {
        let tracker = TuningTracker::default();
        let s = tracker.state();
        assert_eq!(s.mode, TunerMode::Guided);
        assert_eq!(s.active_tuning.id, "standard");
        assert_eq!(s.current_string_index, Some(0));
        assert_eq!(s.string_status.len(), 6);
        assert!(s.string_status.iter().all(|st| *st == StringStatus::default()));
    }

    #[test]
    fn test_select_preset_resets_everything() {
        let mut tracker = TuningTracker::default();
        tracker.select_auto_detect();
        tracker.select_preset(find_preset("drop-d").unwrap().clone());
        let s = tracker.state();
        assert_eq!(s.active_tuning.id, "drop-d");
        assert_eq!(s.mode, TunerMode::Guided);
        assert_eq!(s.current_string_index, Some(0));
        assert!(s.string_status.iter().all(|st| !st.in_tune));
    }

    #[test]
    fn test_status_length_follows_preset() {
        let mut tracker = TuningTracker::default();
        let mut four_string = find_preset("standard").unwrap().clone();
        four_string.notes.truncate(4);
        tracker.select_preset(four_string);
        assert_eq!(tracker.state().string_status.len(), 4);
    }

    #[test]
    fn test_auto_detect_clears_pointer_and_ignores_pitch() {
        let mut tracker = TuningTracker::default();
        tracker.select_auto_detect();
        assert_eq!(tracker.state().mode, TunerMode::AutoDetect);
        assert_eq!(tracker.state().current_string_index, None);

        let before = tracker.state().clone();
        tracker.update_guided_state(&pitch(40, 0, 0.9), 1000);
        assert_eq!(tracker.state(), &before);
    }

    #[test]
    fn test_reset_strings_keeps_mode() {
        let mut tracker = TuningTracker::default();
        tracker.jump_to_string(3);
        tracker.update_guided_state(&pitch(40, 0, 0.9), 1000);
        tracker.update_guided_state(&pitch(40, 0, 0.9), 2000);
        assert!(tracker.state().string_status[0].in_tune);

        tracker.reset_strings();
        let s = tracker.state();
        assert_eq!(s.mode, TunerMode::Guided);
        assert_eq!(s.current_string_index, Some(0));
        assert!(s.string_status.iter().all(|st| !st.in_tune));
    }

    #[test]
    fn test_jump_to_string_ignores_out_of_range() {
        let mut tracker = TuningTracker::default();
        tracker.jump_to_string(4);
        assert_eq!(tracker.state().current_string_index, Some(4));
        tracker.jump_to_string(10);
        assert_eq!(tracker.state().current_string_index, Some(4));
        tracker.jump_to_string(6);
        assert_eq!(tracker.state().current_string_index, Some(4));
    }

    #[test]
    fn test_ignores_non_detecting_and_missing_note() {
        let mut tracker = TuningTracker::default();
        let mut silent = pitch(45, 0, 0.9);
        silent.is_detecting = false;
        tracker.update_guided_state(&silent, 1000);
        let no_note = PitchInput {
            note: None,
            stability: 0.9,
            is_detecting: true,
        };
        tracker.update_guided_state(&no_note, 1000);
        assert_eq!(tracker.state().current_string_index, Some(0));
        assert!(tracker.state().string_status.iter().all(|st| st.in_tune_since.is_none()));
    }

    #[test]
    fn test_unmatched_note_is_ignored() {
        let mut tracker = TuningTracker::default();
        let before = tracker.state().clone();
        tracker.update_guided_state(&pitch(48, 0, 0.9), 1000);
        assert_eq!(tracker.state(), &before);
    }

    #[test]
    fn test_detects_current_string_from_pitch() {
        let mut tracker = TuningTracker::default();
        tracker.update_guided_state(&pitch(45, 3, 0.5), 1000);
        assert_eq!(tracker.state().current_string_index, Some(1));
        // Stability too low to start a hold.
        assert_eq!(tracker.state().string_status[1].in_tune_since, None);
    }

    #[test]
    fn test_hold_sequence_locks_and_advances() {
        let mut tracker = TuningTracker::default();
        let p = pitch(40, 2, 0.9);

        tracker.update_guided_state(&p, 1000);
        assert!(!tracker.state().string_status[0].in_tune);
        assert_eq!(tracker.state().string_status[0].in_tune_since, Some(1000));
        assert!(tracker.state().string_status[0].is_holding());

        tracker.update_guided_state(&p, 1999);
        assert!(!tracker.state().string_status[0].in_tune);

        tracker.update_guided_state(&p, 2000);
        let s = tracker.state();
        assert!(s.string_status[0].in_tune);
        assert_eq!(s.string_status[0].in_tune_since, None);
        assert_eq!(s.current_string_index, Some(1));
    }

    #[test]
    fn test_locked_string_stays_locked_on_drift() {
        let mut tracker = TuningTracker::default();
        tracker.update_guided_state(&pitch(40, 0, 0.9), 1000);
        tracker.update_guided_state(&pitch(40, 0, 0.9), 2000);
        tracker.update_guided_state(&pitch(40, 30, 0.2), 2500);
        assert!(tracker.state().string_status[0].in_tune);
    }

    #[test]
    fn test_drift_resets_hold_timer() {
        let mut tracker = TuningTracker::default();
        tracker.update_guided_state(&pitch(40, 2, 0.9), 1000);
        assert_eq!(tracker.state().string_status[0].in_tune_since, Some(1000));

        tracker.update_guided_state(&pitch(40, 20, 0.9), 1500);
        assert_eq!(tracker.state().string_status[0].in_tune_since, None);
        assert!(!tracker.state().string_status[0].in_tune);
    }

    #[test]
    fn test_low_stability_resets_hold_timer() {
        let mut tracker = TuningTracker::default();
        tracker.update_guided_state(&pitch(40, 2, 0.9), 1000);
        tracker.update_guided_state(&pitch(40, 2, 0.3), 1200);
        assert_eq!(tracker.state().string_status[0].in_tune_since, None);

        // The hold restarts from the next good reading, not the old one.
        tracker.update_guided_state(&pitch(40, 2, 0.9), 1300);
        tracker.update_guided_state(&pitch(40, 2, 0.9), 2200);
        assert!(!tracker.state().string_status[0].in_tune);
        tracker.update_guided_state(&pitch(40, 2, 0.9), 2300);
        assert!(tracker.state().string_status[0].in_tune);
    }

    #[test]
    fn test_debounce_discards_rapid_switch() {
        let mut tracker = TuningTracker::default();
        tracker.update_guided_state(&pitch(40, 0, 0.9), 1000);
        let before = tracker.state().clone();

        // A-string 100 ms later: inside the debounce window.
        tracker.update_guided_state(&pitch(45, 0, 0.9), 1100);
        assert_eq!(tracker.state(), &before);

        // Same string as last detected is not debounced.
        tracker.update_guided_state(&pitch(40, 0, 0.9), 1120);
        assert_eq!(tracker.state().current_string_index, Some(0));

        // After 150 ms the switch goes through.
        tracker.update_guided_state(&pitch(45, 0, 0.9), 1150);
        assert_eq!(tracker.state().current_string_index, Some(1));
        assert_eq!(tracker.state().string_status[1].in_tune_since, Some(1150));
    }

    #[test]
    fn test_debounced_update_leaves_counters_untouched() {
        let mut tracker = TuningTracker::default();
        tracker.update_guided_state(&pitch(40, 0, 0.9), 1000);
        tracker.update_guided_state(&pitch(45, 0, 0.9), 1100);
        // Had the discarded update moved the change time to 1100, this would be debounced.
        tracker.update_guided_state(&pitch(50, 0, 0.9), 1150);
        assert_eq!(tracker.state().current_string_index, Some(2));
    }

    #[test]
    fn test_auto_advance_wraps_to_first_untuned() {
        let mut tracker = TuningTracker::default();
        let mut t = 1000;
        // Tune strings 1..=5 first, then string 0.
        for midi in [45, 50, 55, 59, 64] {
            tracker.update_guided_state(&pitch(midi, 0, 0.9), t);
            tracker.update_guided_state(&pitch(midi, 0, 0.9), t + 1000);
            t += 2000;
        }
        assert_eq!(tracker.state().current_string_index, Some(0));

        tracker.update_guided_state(&pitch(40, 0, 0.9), t);
        tracker.update_guided_state(&pitch(40, 0, 0.9), t + 1000);
        let s = tracker.state();
        assert!(s.all_in_tune());
        // Nothing left to advance to: pointer stays on the completed string.
        assert_eq!(s.current_string_index, Some(0));
    }

    #[test]
    fn test_first_detection_at_clock_start_is_accepted() {
        let mut tracker = TuningTracker::default();
        tracker.update_guided_state(&pitch(45, 0, 0.9), 0);
        let s = tracker.state();
        assert_eq!(s.current_string_index, Some(1));
        assert_eq!(s.string_status[1].in_tune_since, Some(0));

        // Later switches are still debounced against that first one.
        tracker.update_guided_state(&pitch(40, 0, 0.9), 100);
        assert_eq!(tracker.state().current_string_index, Some(1));
    }

    #[test]
    fn test_empty_preset_has_no_current_string() {
        let mut tracker = TuningTracker::default();
        let mut empty = find_preset("standard").unwrap().clone();
        empty.notes.clear();
        tracker.select_preset(empty);
        assert!(tracker.state().string_status.is_empty());
        assert_eq!(tracker.state().current_string_index, None);

        tracker.reset_strings();
        assert_eq!(tracker.state().current_string_index, None);
        tracker.update_guided_state(&pitch(40, 0, 0.9), 1000);
        assert_eq!(tracker.state().current_string_index, None);
    }

    #[test]
    fn test_clear_debounce_allows_immediate_switch() {
        let mut tracker = TuningTracker::default();
        tracker.update_guided_state(&pitch(40, 0, 0.9), 1000);
        tracker.clear_debounce();
        tracker.update_guided_state(&pitch(45, 0, 0.9), 1010);
        assert_eq!(tracker.state().current_string_index, Some(1));
    }
}
