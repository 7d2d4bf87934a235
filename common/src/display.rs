use serde::Serialize;

use crate::types::{LightingPhase, TemperatureReadings, TimeOfDay};

/// Alternating flag shared by the clock ring, the warning icon and the time
/// separator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Blink {
    on: bool,
}

impl Blink {
    pub fn toggle(&mut self) -> bool {
        self.on = !self.on;
        self.on
    }
}

/// Everything the display needs for one tick.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameState {
    pub time: TimeOfDay,
    #[serde(rename = "interiorC")]
    pub interior_c: f32,
    #[serde(rename = "exteriorC")]
    pub exterior_c: f32,
    #[serde(rename = "tempWarning")]
    pub temp_warning: bool,
    pub phase: LightingPhase,
    #[serde(rename = "phaseLabel")]
    pub phase_label: &'static str,
    pub progress: f32,
    pub blink: bool,
}

impl FrameState {
    pub fn new(
        time: TimeOfDay,
        readings: TemperatureReadings,
        temp_warning: bool,
        phase: LightingPhase,
        progress: f32,
        blink: bool,
    ) -> Self {
        Self {
            time,
            interior_c: readings.interior_c,
            exterior_c: readings.exterior_c,
            temp_warning,
            phase,
            phase_label: phase.label(),
            progress,
            blink,
        }
    }

    /// Width in pixels of the progress bar for a bar `width` pixels wide.
    pub fn progress_pixels(&self, width: u16) -> u16 {
        (self.progress.clamp(0.0, 1.0) * width as f32).round() as u16
    }

    /// `HH:MM` with the separator blanked on alternate ticks.
    pub fn clock_text(&self) -> String {
        let separator = if self.blink { ':' } else { ' ' };
        format!(
            "{:02}{separator}{:02}",
            self.time.hour(),
            self.time.minute()
        )
    }

    pub fn show_warning_icon(&self) -> bool {
        self.temp_warning && self.blink
    }
}
