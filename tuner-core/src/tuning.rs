//! # Musical Tuning Module
//!
//! Maps frequencies onto equal-tempered notes and holds the table of guitar
//! tuning presets the guided tuner walks through.
//!
//! ## Features
//! - Frequency to note/octave/cents conversion against a configurable A4
//! - Cent deviation between two frequencies
//! - Six-string tuning presets (Standard, Drop D, Open G, ...)
//! - Closest-string matching of a detected note against a preset

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::fmt;

/// MIDI number of the A4 reference note.
const A4_MIDI: i32 = 69;

/// Lowest A4 reference the tuner can be calibrated to, in Hz.
pub const CALIBRATION_MIN_HZ: f32 = 420.0;
/// Highest A4 reference the tuner can be calibrated to, in Hz.
pub const CALIBRATION_MAX_HZ: f32 = 460.0;

/// Largest distance (in cents) at which a detected note still matches a string.
const MAX_STRING_DISTANCE_CENTS: i32 = 100;

/// The twelve pitch classes, spelled with sharps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NoteName {
    C,
    CSharp,
    D,
    DSharp,
    E,
    F,
    FSharp,
    G,
    GSharp,
    A,
    ASharp,
    B,
}

impl NoteName {
    /// All pitch classes in chromatic order starting at C.
    pub const ALL: [NoteName; 12] = [
        NoteName::C,
        NoteName::CSharp,
        NoteName::D,
        NoteName::DSharp,
        NoteName::E,
        NoteName::F,
        NoteName::FSharp,
        NoteName::G,
        NoteName::GSharp,
        NoteName::A,
        NoteName::ASharp,
        NoteName::B,
    ];

    /// Pitch class of a MIDI note number.
    pub fn from_midi(midi: i32) -> Self {
        Self::ALL[midi.rem_euclid(12) as usize]
    }

    /// Semitone offset from C.
    pub fn semitone(self) -> i32 {
        self as i32
    }

    pub fn as_str(self) -> &'static str {
        match self {
            NoteName::C => "C",
            NoteName::CSharp => "C#",
            NoteName::D => "D",
            NoteName::DSharp => "D#",
            NoteName::E => "E",
            NoteName::F => "F",
            NoteName::FSharp => "F#",
            NoteName::G => "G",
            NoteName::GSharp => "G#",
            NoteName::A => "A",
            NoteName::ASharp => "A#",
            NoteName::B => "B",
        }
    }
}

impl fmt::Display for NoteName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A detected note: nearest equal-tempered pitch plus the fine offset.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NoteInfo {
    pub name: NoteName,
    pub octave: i32,
    pub midi: i32,
    /// Offset from the nearest note in whole cents (-50..=50).
    pub cents: i32,
    /// The frequency the note was derived from, in Hz.
    pub frequency: f32,
}

impl NoteInfo {
    /// Scientific pitch notation, e.g. "E2" or "C#4".
    pub fn label(&self) -> String {
        format!("{}{}", self.name, self.octave)
    }
}

/// Reference pitch presets for A4.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PitchStandard {
    #[default]
    A440,
    A432,
}

impl PitchStandard {
    pub const ALL: [PitchStandard; 2] = [PitchStandard::A440, PitchStandard::A432];

    pub fn label(self) -> &'static str {
        match self {
            PitchStandard::A440 => "A4 = 440 Hz",
            PitchStandard::A432 => "A4 = 432 Hz",
        }
    }

    /// Frequency of A4 in Hz.
    pub fn pitch_center(self) -> f32 {
        match self {
            PitchStandard::A440 => 440.0,
            PitchStandard::A432 => 432.0,
        }
    }

    /// The preset whose reference is exactly `pitch_center`, if any.
    pub fn from_pitch_center(pitch_center: f32) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.pitch_center() == pitch_center)
    }
}

/// Clamps an A4 reference into the calibration range. Non-finite input falls
/// back to 440 Hz.
pub fn clamp_pitch_center(pitch_center: f32) -> f32 {
    if pitch_center.is_finite() {
        pitch_center.clamp(CALIBRATION_MIN_HZ, CALIBRATION_MAX_HZ)
    } else {
        PitchStandard::A440.pitch_center()
    }
}

/// Converts a frequency to the nearest note relative to `pitch_center` (A4).
///
/// Returns `None` for frequencies that are not finite and positive.
pub fn frequency_to_note(freq: f32, pitch_center: f32) -> Option<NoteInfo> {
    if !(freq.is_finite() && freq > 0.0 && pitch_center > 0.0) {
        return None;
    }
    let midi_exact = 12.0 * (freq / pitch_center).log2() + A4_MIDI as f32;
    let midi = midi_exact.round() as i32;
    let cents = ((midi_exact - midi as f32) * 100.0).round() as i32;

    Some(NoteInfo {
        name: NoteName::from_midi(midi),
        octave: midi.div_euclid(12) - 1,
        midi,
        cents,
        frequency: freq,
    })
}

/// Equal-tempered frequency of a MIDI note relative to `pitch_center` (A4).
pub fn midi_to_frequency(midi: i32, pitch_center: f32) -> f32 {
    pitch_center * 2.0_f32.powf((midi - A4_MIDI) as f32 / 12.0)
}

/// Calculates the deviation from a target frequency in cents.
///
/// Positive values are sharp, negative values flat.
pub fn calculate_cents_deviation(freq: f32, target_freq: f32) -> f32 {
    1200.0 * (freq / target_freq).log2()
}

/// One string's target pitch within a preset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TuningTarget {
    pub name: NoteName,
    pub octave: i32,
    pub midi: i32,
    /// Reference frequency at A4 = 440 Hz.
    pub frequency: f32,
}

impl TuningTarget {
    pub fn new(name: NoteName, octave: i32) -> Self {
        let midi = (octave + 1) * 12 + name.semitone();
        Self {
            name,
            octave,
            midi,
            frequency: midi_to_frequency(midi, 440.0),
        }
    }

    pub fn label(&self) -> String {
        format!("{}{}", self.name, self.octave)
    }
}

/// An ordered set of string targets, lowest string first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TuningPreset {
    pub id: String,
    pub name: String,
    pub description: String,
    pub notes: Vec<TuningTarget>,
}

impl TuningPreset {
    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }
}

fn preset(id: &str, name: &str, description: &str, strings: [(NoteName, i32); 6]) -> TuningPreset {
    TuningPreset {
        id: id.to_string(),
        name: name.to_string(),
        description: description.to_string(),
        notes: strings
            .iter()
            .map(|&(note, octave)| TuningTarget::new(note, octave))
            .collect(),
    }
}

/// Built-in guitar presets, computed once on first use.
static TUNING_PRESETS: Lazy<Vec<TuningPreset>> = Lazy::new(|| {
    use NoteName::*;
    vec![
        preset(
            "standard",
            "Standard",
            "E A D G B E",
            [(E, 2), (A, 2), (D, 3), (G, 3), (B, 3), (E, 4)],
        ),
        preset(
            "drop-d",
            "Drop D",
            "Low E dropped a whole step to D",
            [(D, 2), (A, 2), (D, 3), (G, 3), (B, 3), (E, 4)],
        ),
        preset(
            "half-step-down",
            "Half Step Down",
            "Every string lowered a semitone",
            [(DSharp, 2), (GSharp, 2), (CSharp, 3), (FSharp, 3), (ASharp, 3), (DSharp, 4)],
        ),
        preset(
            "open-g",
            "Open G",
            "Open strings ring a G major chord",
            [(D, 2), (G, 2), (D, 3), (G, 3), (B, 3), (D, 4)],
        ),
        preset(
            "open-d",
            "Open D",
            "Open strings ring a D major chord",
            [(D, 2), (A, 2), (D, 3), (FSharp, 3), (A, 3), (D, 4)],
        ),
        preset(
            "dadgad",
            "DADGAD",
            "Modal D suspended tuning",
            [(D, 2), (A, 2), (D, 3), (G, 3), (A, 3), (D, 4)],
        ),
    ]
});

/// All built-in presets; the first one is standard tuning.
pub fn tuning_presets() -> &'static [TuningPreset] {
    &TUNING_PRESETS
}

/// Looks up a built-in preset by id.
pub fn find_preset(id: &str) -> Option<&'static TuningPreset> {
    TUNING_PRESETS.iter().find(|p| p.id == id)
}

/// Standard guitar tuning (E2 A2 D3 G3 B3 E4).
pub fn standard_tuning() -> &'static TuningPreset {
    &TUNING_PRESETS[0]
}

/// Result of matching a detected note against a preset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StringMatch {
    pub string_index: usize,
    /// Signed offset from the matched string's target, in cents.
    pub cents_off: i32,
}

/// Finds the preset string closest to `note`, measured in cents including
/// the fine offset.
///
/// Returns `None` when every string is more than a semitone away. On ties the
/// lowest index wins.
pub fn find_closest_string(note: &NoteInfo, preset: &TuningPreset) -> Option<StringMatch> {
    let mut best: Option<StringMatch> = None;
    for (string_index, target) in preset.notes.iter().enumerate() {
        let cents_off = (note.midi - target.midi) * 100 + note.cents;
        let closer = match best {
            Some(current) => cents_off.abs() < current.cents_off.abs(),
            None => true,
        };
        if closer {
            best = Some(StringMatch { string_index, cents_off });
        }
    }
    best.filter(|m| m.cents_off.abs() <= MAX_STRING_DISTANCE_CENTS)
}
