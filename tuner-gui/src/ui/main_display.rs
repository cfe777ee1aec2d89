//! # Main Display Module
//!
//! Layout of the tuner window: status header, note readout with the dial,
//! the string row of the active tuning and the settings sidebar.

use iced::widget::{button, column, container, horizontal_space, row, slider, text, Space};
use iced::{Alignment, Color, Element, Length};
use tuner_core::gauge;
use tuner_core::tracker::{TunerMode, TunerState};
use tuner_core::tuning;
use tuner_core::{DetectorStatus, PitchReading, PitchStandard};

use super::gauge::{zone_color, Gauge};
use crate::{DisplayData, Message};

const IN_TUNE_COLOR: Color = Color::from_rgb(0.2, 0.7, 0.4);
const HOLDING_COLOR: Color = Color::from_rgb(1.0, 0.84, 0.0);
const CURRENT_COLOR: Color = Color::from_rgb(0.2, 0.45, 0.85);
const IDLE_COLOR: Color = Color::from_rgb(0.3, 0.3, 0.3);

/// Creates the complete main application view
pub fn create_main_view(data: &DisplayData) -> Element<'static, Message> {
    let header = create_header(data.status);
    let readout = create_readout_panel(data.reading);
    let strings = create_string_row(data.state);

    let mut main_column = column![
        header,
        Space::with_height(20),
        readout,
        Space::with_height(10),
        strings,
    ]
    .width(Length::Fill)
    .spacing(10);

    if data.state.all_in_tune() {
        main_column = main_column.push(text("All strings in tune").size(20).color(IN_TUNE_COLOR));
    }

    let main_content = row![
        main_column,
        Space::with_width(10),
        create_sidebar(data.state, data.pitch_center),
    ]
    .align_y(Alignment::Start)
    .padding(20);

    container(main_content)
        .width(Length::Fill)
        .height(Length::Fill)
        .into()
}

fn status_text(status: &DetectorStatus) -> String {
    match status {
        DetectorStatus::Idle => "Idle".to_string(),
        DetectorStatus::RequestingPermission => "Requesting microphone...".to_string(),
        DetectorStatus::Active => "Listening".to_string(),
        DetectorStatus::Error(err) => format!("Error ({}): {}", err.kind(), err),
    }
}

/// Title, status line and the start/stop control.
fn create_header(status: &DetectorStatus) -> Element<'static, Message> {
    let (label, message) = if status.is_active() {
        ("Stop", Message::StopDetection)
    } else {
        ("Start", Message::StartDetection)
    };

    let status_color = match status {
        DetectorStatus::Error(_) => Color::from_rgb8(0xFF, 0x33, 0x33),
        DetectorStatus::Active => IN_TUNE_COLOR,
        _ => Color::from_rgb(0.6, 0.6, 0.6),
    };

    row![
        text("Guitar Tuner").size(28),
        horizontal_space(),
        text(status_text(status)).size(16).color(status_color),
        Space::with_width(15),
        button(text(label).size(16)).padding([6, 16]).on_press(message),
    ]
    .align_y(Alignment::Center)
    .into()
}

/// Note, frequency, offset and signal quality above the dial.
fn create_readout_panel(reading: &PitchReading) -> Element<'static, Message> {
    let detected = reading.is_detecting && reading.note.is_some();

    let note_text = reading
        .note
        .filter(|_| detected)
        .map(|note| note.label())
        .unwrap_or_else(|| "--".to_string());
    let freq_text = reading
        .frequency
        .map(|f| format!("{f:.2} Hz"))
        .unwrap_or_else(|| "0.00 Hz".to_string());

    let (cents_text, direction_text, direction_color) = if detected {
        let cents = reading.cents as f32;
        let zone = gauge::cents_to_color_zone(cents);
        (
            format!("{:+} cents", reading.cents),
            gauge::cents_to_direction(cents).label(),
            zone_color(zone),
        )
    } else {
        ("-- cents".to_string(), "", Color::WHITE)
    };

    let quality = format!(
        "Confidence {:.0}%   Stability {:.0}%",
        reading.confidence * 100.0,
        reading.stability * 100.0
    );

    let content = column![
        row![
            text(note_text).size(48),
            Space::with_width(20),
            column![text(freq_text).size(20), text(cents_text).size(16)].spacing(4),
            horizontal_space(),
            text(direction_text).size(24).color(direction_color),
        ]
        .align_y(Alignment::Center),
        Gauge::new(detected.then_some(reading.cents as f32)).view(),
        text(quality).size(14),
    ]
    .spacing(10);

    container(content.padding(15)).width(Length::Fill).into()
}

/// One button per string, colored by progress.
fn create_string_row(state: &TunerState) -> Element<'static, Message> {
    let guided = state.mode == TunerMode::Guided;

    let buttons = state
        .active_tuning
        .notes
        .iter()
        .zip(&state.string_status)
        .enumerate()
        .fold(row![].spacing(8), |row, (index, (target, status))| {
            let color = if status.in_tune {
                IN_TUNE_COLOR
            } else if status.is_holding() {
                HOLDING_COLOR
            } else if guided && state.current_string_index == Some(index) {
                CURRENT_COLOR
            } else {
                IDLE_COLOR
            };
            row.push(
                button(text(target.label()).size(18).center().width(Length::Fill))
                    .width(Length::FillPortion(1))
                    .padding([10, 0])
                    .style(move |_theme, _status| button::Style {
                        background: Some(iced::Background::Color(color)),
                        text_color: Color::WHITE,
                        ..button::Style::default()
                    })
                    .on_press(Message::StringSelected(index)),
            )
        });

    column![
        text(state.active_tuning.name.clone()).size(18),
        buttons,
    ]
    .spacing(8)
    .into()
}

/// Styles `label` as a sidebar button, highlighted when `selected`.
fn make_button(label: String, message: Message, selected: bool) -> Element<'static, Message> {
    let mut button = button(text(label).size(14).width(Length::Fill))
        .padding([6, 10])
        .on_press(message);
    if selected {
        button = button.style(|_theme, _status| button::Style {
            background: Some(iced::Background::Color(CURRENT_COLOR)),
            text_color: Color::WHITE,
            ..button::Style::default()
        });
    }
    button.into()
}

/// Creates a settings section with title and buttons.
fn make_settings_section(
    title: &'static str,
    items: Vec<Element<'static, Message>>,
) -> Element<'static, Message> {
    let items_widget = items
        .into_iter()
        .fold(column![].spacing(8), |col, item| col.push(item));

    column![text(title).size(18), Space::with_height(10), items_widget]
        .spacing(5)
        .into()
}

/// Creates the settings sidebar widget.
///
/// Sections: tuning presets plus auto-detect, session controls, pitch
/// calibration and program settings.
fn create_sidebar(state: &TunerState, pitch_center: f32) -> Element<'static, Message> {
    let guided = state.mode == TunerMode::Guided;

    let mut tunings: Vec<_> = tuning::tuning_presets()
        .iter()
        .map(|preset| {
            make_button(
                preset.name.clone(),
                Message::PresetSelected(preset.id.clone()),
                guided && state.active_tuning.id == preset.id,
            )
        })
        .collect();
    tunings.push(make_button("Auto detect".to_string(), Message::AutoDetect, !guided));

    let session = vec![make_button(
        "Reset strings".to_string(),
        Message::ResetStrings,
        false,
    )];

    let mut calibration: Vec<_> = PitchStandard::ALL
        .iter()
        .map(|&standard| {
            make_button(
                standard.label().to_string(),
                Message::PitchStandardSelected(standard),
                PitchStandard::from_pitch_center(pitch_center) == Some(standard),
            )
        })
        .collect();
    calibration.push(text(format!("A4 = {pitch_center:.0} Hz")).size(14).into());
    calibration.push(
        slider(
            tuning::CALIBRATION_MIN_HZ..=tuning::CALIBRATION_MAX_HZ,
            pitch_center,
            Message::PitchCenterChanged,
        )
        .step(1.0)
        .into(),
    );

    let program = vec![make_button(
        "Save settings".to_string(),
        Message::SaveConfig,
        false,
    )];

    let sections = column![
        make_settings_section("Tunings", tunings),
        make_settings_section("Session", session),
        make_settings_section("Calibration", calibration),
        make_settings_section("Program", program),
    ]
    .spacing(10);

    container(sections.padding(15))
        .width(Length::Fixed(250.0))
        .height(Length::Fill)
        .into()
}
