use chrono::Timelike;
use serde::Serialize;

use crate::error::TimeError;

pub const MINUTES_PER_DAY: u16 = 24 * 60;

/// Wall-clock snapshot taken once per tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct TimeOfDay {
    hour: u8,
    minute: u8,
}

impl TimeOfDay {
    pub const MIDNIGHT: Self = Self { hour: 0, minute: 0 };

    pub fn new(hour: u8, minute: u8) -> Result<Self, TimeError> {
        if hour >= 24 {
            return Err(TimeError::HourOutOfRange(hour));
        }
        if minute >= 60 {
            return Err(TimeError::MinuteOutOfRange(minute));
        }
        Ok(Self { hour, minute })
    }

    pub fn from_minutes(minutes: u16) -> Self {
        let minutes = minutes % MINUTES_PER_DAY;
        Self {
            hour: (minutes / 60) as u8,
            minute: (minutes % 60) as u8,
        }
    }

    /// Truncates any chrono time or datetime to the minute.
    pub fn from_timelike(time: &impl Timelike) -> Self {
        Self {
            hour: time.hour() as u8,
            minute: time.minute() as u8,
        }
    }

    pub fn hour(self) -> u8 {
        self.hour
    }

    pub fn minute(self) -> u8 {
        self.minute
    }

    pub fn minutes_since_midnight(self) -> u16 {
        self.hour as u16 * 60 + self.minute as u16
    }
}

impl std::fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LightingPhase {
    Off,
    Sunrise,
    Noon,
    Evening,
    Neon,
}

impl LightingPhase {
    pub const ALL: [Self; 5] = [
        Self::Off,
        Self::Sunrise,
        Self::Noon,
        Self::Evening,
        Self::Neon,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Off => "OFF",
            Self::Sunrise => "SUNRISE",
            Self::Noon => "NOON",
            Self::Evening => "EVENING",
            Self::Neon => "NEON",
        }
    }

    /// Three-letter label shown on the display.
    pub fn label(self) -> &'static str {
        match self {
            Self::Off => "OFF",
            Self::Sunrise => "SUN",
            Self::Noon => "NON",
            Self::Evening => "EVE",
            Self::Neon => "NEO",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IrCommand {
    /// Power-on; a powered-off fixture ignores colour commands.
    Wake,
    Phase(LightingPhase),
}

/// Ordered side effect handed to the runtime harness.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    SendIr(IrCommand),
    MoveActuator(u8),
    Delay(u32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FeedTrigger {
    Alarm,
    Button,
    AlarmAndButton,
}

impl FeedTrigger {
    pub fn from_inputs(alarm_fired: bool, button_pressed: bool) -> Option<Self> {
        match (alarm_fired, button_pressed) {
            (true, true) => Some(Self::AlarmAndButton),
            (true, false) => Some(Self::Alarm),
            (false, true) => Some(Self::Button),
            (false, false) => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Alarm => "ALARM",
            Self::Button => "BUTTON",
            Self::AlarmAndButton => "ALARM_AND_BUTTON",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TemperatureReadings {
    #[serde(rename = "interiorC")]
    pub interior_c: f32,
    #[serde(rename = "exteriorC")]
    pub exterior_c: f32,
}
