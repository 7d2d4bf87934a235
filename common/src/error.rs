use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TimeError {
    #[error("hour {0} is outside 0..24")]
    HourOutOfRange(u8),
    #[error("minute {0} is outside 0..60")]
    MinuteOutOfRange(u8),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("{table} table is empty")]
    EmptyTable { table: &'static str },
    #[error("{table} window {index} is empty or reversed ({start}..{end})")]
    EmptyWindow {
        table: &'static str,
        index: usize,
        start: u8,
        end: u8,
    },
    #[error("{table} table must start at hour 0, starts at {start}")]
    DoesNotStartAtMidnight { table: &'static str, start: u8 },
    #[error("{table} table must end at hour 24, ends at {end}")]
    DoesNotEndAtMidnight { table: &'static str, end: u8 },
    #[error("{table} window {index} starts at {start} but the previous window ends at {previous_end}")]
    NotContiguous {
        table: &'static str,
        index: usize,
        start: u8,
        previous_end: u8,
    },
    #[error("comfort band is invalid ({min_c}..{max_c})")]
    InvalidComfortBand { min_c: f32, max_c: f32 },
    #[error("temperature sample count must be non-zero")]
    ZeroSamples,
    #[error("actuator angle {0} exceeds 180 degrees")]
    InvalidAngle(u8),
    #[error("feed hour {0} is outside 0..24")]
    InvalidFeedHour(u8),
    #[error("{0} must be non-zero")]
    ZeroDuration(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Peripheral {
    Clock,
    Display,
    Actuator,
}

impl Peripheral {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Clock => "clock",
            Self::Display => "display",
            Self::Actuator => "actuator",
        }
    }
}

/// Unrecoverable start-up failure. The harness decides whether to halt,
/// reset or report.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FatalError {
    #[error("{} failed to attach: {reason}", peripheral.as_str())]
    PeripheralUnavailable {
        peripheral: Peripheral,
        reason: String,
    },
}

impl FatalError {
    pub fn unavailable(peripheral: Peripheral, reason: impl Into<String>) -> Self {
        Self::PeripheralUnavailable {
            peripheral,
            reason: reason.into(),
        }
    }

    pub fn peripheral(&self) -> Peripheral {
        match self {
            Self::PeripheralUnavailable { peripheral, .. } => *peripheral,
        }
    }
}
