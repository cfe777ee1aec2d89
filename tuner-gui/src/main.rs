//! # Guitar Tuner GUI
//!
//! Desktop front end for the guided guitar tuner. It starts and stops live
//! detection, shows the current note on a dial, and walks the player through
//! the strings of the selected tuning.
//!
//! ## Architecture
//! - **Main Thread**: Iced GUI application; owns the tuning tracker
//! - **Detection Thread**: `DetectionWorker` from `tuner-core`, owns capture and the pitch pipeline
//! - **Communication**: Crossbeam channel carrying one `PitchReading` per cycle
//! - **Updates**: 60 FPS polling via subscription while detection runs

mod ui;

use crossbeam_channel::{Receiver, TryRecvError};
use iced::{Element, Subscription, Theme};
use tracing_subscriber::EnvFilter;
use tuner_core::tracker::TunerState;
use tuner_core::tuning;
use tuner_core::{
    CaptureError, DetectionWorker, DetectorStatus, PitchReading, PitchStandard, TunerConfig,
    TuningTracker,
};
use ui::main_display::create_main_view;

const CONFIG_PATH: &str = "tuner_config.json";

pub fn main() -> iced::Result {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    tracing::info!("starting guitar tuner");
    iced::application("Guitar Tuner", TunerApp::update, TunerApp::view)
        .subscription(TunerApp::subscription)
        .theme(TunerApp::theme)
        .run()
}

/// Messages that can be sent to update the application state.
#[derive(Debug, Clone)]
pub enum Message {
    StartDetection,
    StopDetection,
    PresetSelected(String),
    AutoDetect,
    ResetStrings,
    StringSelected(usize),
    PitchStandardSelected(PitchStandard),
    PitchCenterChanged(f32),
    SaveConfig,
    Tick,
}

/// Everything the view needs for one frame.
pub struct DisplayData<'a> {
    pub status: &'a DetectorStatus,
    pub reading: &'a PitchReading,
    pub state: &'a TunerState,
    pub pitch_center: f32,
}

struct TunerApp {
    config: TunerConfig,
    tracker: TuningTracker,
    worker: Option<DetectionWorker>,
    readings: Option<Receiver<PitchReading>>,
    status: DetectorStatus,
    last_reading: PitchReading,
}

impl Default for TunerApp {
    fn default() -> Self {
        let config = match TunerConfig::load_or_default(CONFIG_PATH) {
            Ok(config) => config,
            Err(err) => {
                tracing::warn!(error = %format!("{err:#}"), "ignoring unreadable config");
                TunerConfig::default()
            }
        };

        let preset = tuning::find_preset(&config.preset_id)
            .unwrap_or_else(tuning::standard_tuning)
            .clone();
        let tracker = TuningTracker::new(preset, config.tracker.clone());

        Self {
            config,
            tracker,
            worker: None,
            readings: None,
            status: DetectorStatus::Idle,
            last_reading: PitchReading::silent(),
        }
    }
}

impl TunerApp {
    fn start_detection(&mut self) {
        if self.worker.is_some() {
            return;
        }
        self.status = DetectorStatus::RequestingPermission;

        let (reading_tx, reading_rx) = crossbeam_channel::unbounded();
        match DetectionWorker::spawn(&self.config, reading_tx) {
            Ok(worker) => {
                self.worker = Some(worker);
                self.readings = Some(reading_rx);
                self.status = DetectorStatus::Active;
            }
            Err(err) => {
                tracing::error!(kind = err.kind(), %err, "could not start detection");
                self.status = DetectorStatus::Error(err);
            }
        }
    }

    fn stop_detection(&mut self) {
        if let Some(worker) = self.worker.take() {
            worker.stop();
        }
        self.readings = None;
        self.tracker.clear_debounce();
        self.last_reading = PitchReading::silent();
    }

    fn update(&mut self, message: Message) {
        match message {
            Message::StartDetection => self.start_detection(),
            Message::StopDetection => {
                self.stop_detection();
                self.status = DetectorStatus::Idle;
            }
            Message::PresetSelected(id) => match tuning::find_preset(&id) {
                Some(preset) => {
                    self.tracker.select_preset(preset.clone());
                    self.config.preset_id = id;
                }
                None => tracing::warn!(preset = %id, "unknown tuning preset"),
            },
            Message::AutoDetect => self.tracker.select_auto_detect(),
            Message::ResetStrings => self.tracker.reset_strings(),
            Message::StringSelected(index) => self.tracker.jump_to_string(index),
            Message::PitchStandardSelected(standard) => {
                self.apply_pitch_center(standard.pitch_center());
            }
            Message::PitchCenterChanged(pitch_center) => self.apply_pitch_center(pitch_center),
            Message::SaveConfig => match self.config.save(CONFIG_PATH) {
                Ok(()) => tracing::info!(path = CONFIG_PATH, "settings saved"),
                Err(err) => tracing::error!(error = %format!("{err:#}"), "error saving settings"),
            },
            Message::Tick => self.drain_readings(),
        }
    }

    /// Stores the new A4 reference and hands it to the running pipeline.
    fn apply_pitch_center(&mut self, pitch_center: f32) {
        self.config.set_pitch_center(pitch_center);
        if let Some(worker) = &self.worker {
            worker.set_pitch_center(self.config.pitch_center());
        }
    }

    /// Feeds every pending reading into the tracker, oldest first.
    fn drain_readings(&mut self) {
        let Some(receiver) = &self.readings else {
            return;
        };

        let mut disconnected = false;
        let mut pending = Vec::new();
        loop {
            match receiver.try_recv() {
                Ok(reading) => pending.push(reading),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    disconnected = true;
                    break;
                }
            }
        }

        for reading in pending {
            self.tracker
                .update_guided_state(&reading.to_pitch_input(), reading.timestamp_ms);
            self.last_reading = reading;
        }

        if disconnected {
            tracing::warn!("detection worker ended unexpectedly");
            self.stop_detection();
            self.status =
                DetectorStatus::Error(CaptureError::Unknown("audio stream ended".to_string()));
        }
    }

    fn view(&self) -> Element<'_, Message> {
        create_main_view(&DisplayData {
            status: &self.status,
            reading: &self.last_reading,
            state: self.tracker.state(),
            pitch_center: self.config.pitch_center(),
        })
    }

    /// Polls for readings every 16 ms while detection runs.
    fn subscription(&self) -> Subscription<Message> {
        if self.worker.is_some() {
            iced::time::every(std::time::Duration::from_millis(16)).map(|_| Message::Tick)
        } else {
            Subscription::none()
        }
    }

    fn theme(&self) -> Theme {
        Theme::Dark
    }
}
