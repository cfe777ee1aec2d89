// tuner-core/src/lib.rs

//! The core logic for the guitar tuner.
//! This crate is responsible for audio capture, pitch detection,
//! signal stabilization and guided string tracking. It is completely
//! headless and contains no GUI code.

pub mod audio;
pub mod config;
pub mod error;
pub mod gauge;
pub mod pipeline;
pub mod pitch;
pub mod signal;
pub mod tracker;
pub mod tuning;
pub mod worker;

pub use config::TunerConfig;
pub use error::CaptureError;
pub use pipeline::{DetectorStatus, PitchPipeline, PitchReading};
pub use pitch::{PitchEstimate, PitchEstimator};
pub use signal::{SignalStabilizer, StabilizedSignal};
pub use tracker::{PitchInput, StringStatus, TunerMode, TunerState, TuningTracker};
pub use tuning::{NoteInfo, NoteName, PitchStandard, TuningPreset, TuningTarget};
pub use worker::DetectionWorker;
