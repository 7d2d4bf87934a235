use crate::{
    error::ConfigError,
    types::{LightingPhase, TimeOfDay},
};

pub const HOURS_PER_DAY: u8 = 24;

/// A half-open `[start_hour, end_hour)` slice of the day.
pub trait HourWindow {
    fn start_hour(&self) -> u8;
    fn end_hour(&self) -> u8;

    fn contains_hour(&self, hour: u8) -> bool {
        (self.start_hour()..self.end_hour()).contains(&hour)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseWindow {
    pub start_hour: u8,
    pub end_hour: u8,
    pub phase: LightingPhase,
}

impl HourWindow for PhaseWindow {
    fn start_hour(&self) -> u8 {
        self.start_hour
    }

    fn end_hour(&self) -> u8 {
        self.end_hour
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bracket {
    pub start_hour: u8,
    pub end_hour: u8,
}

impl Bracket {
    pub const FULL_DAY: Self = Self {
        start_hour: 0,
        end_hour: HOURS_PER_DAY,
    };

    pub const fn new(start_hour: u8, end_hour: u8) -> Self {
        Self {
            start_hour,
            end_hour,
        }
    }

    /// Fractional position of `time` inside the bracket, clamped to `[0, 1]`.
    pub fn progress(&self, time: TimeOfDay) -> f32 {
        let start = self.start_hour as f32 * 60.0;
        let end = self.end_hour as f32 * 60.0;
        let span = end - start;
        if span <= 0.0 {
            return 0.0;
        }
        ((time.minutes_since_midnight() as f32 - start) / span).clamp(0.0, 1.0)
    }
}

impl HourWindow for Bracket {
    fn start_hour(&self) -> u8 {
        self.start_hour
    }

    fn end_hour(&self) -> u8 {
        self.end_hour
    }
}

/// Rejects tables that do not tile `[0, 24)` exactly, in order.
pub fn validate_tiling<W: HourWindow>(table: &'static str, windows: &[W]) -> Result<(), ConfigError> {
    let Some(first) = windows.first() else {
        return Err(ConfigError::EmptyTable { table });
    };

    if first.start_hour() != 0 {
        return Err(ConfigError::DoesNotStartAtMidnight {
            table,
            start: first.start_hour(),
        });
    }

    let mut previous_end = 0;
    for (index, window) in windows.iter().enumerate() {
        if window.start_hour() >= window.end_hour() || window.end_hour() > HOURS_PER_DAY {
            return Err(ConfigError::EmptyWindow {
                table,
                index,
                start: window.start_hour(),
                end: window.end_hour(),
            });
        }
        if index > 0 && window.start_hour() != previous_end {
            return Err(ConfigError::NotContiguous {
                table,
                index,
                start: window.start_hour(),
                previous_end,
            });
        }
        previous_end = window.end_hour();
    }

    if previous_end != HOURS_PER_DAY {
        return Err(ConfigError::DoesNotEndAtMidnight {
            table,
            end: previous_end,
        });
    }

    Ok(())
}

/// Phase windows covering the whole day, validated on construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhaseTable {
    windows: Vec<PhaseWindow>,
}

impl PhaseTable {
    pub fn new(windows: Vec<PhaseWindow>) -> Result<Self, ConfigError> {
        validate_tiling("phase", &windows)?;
        Ok(Self { windows })
    }

    pub fn windows(&self) -> &[PhaseWindow] {
        &self.windows
    }

    pub fn window_for(&self, hour: u8) -> Option<&PhaseWindow> {
        self.windows.iter().find(|window| window.contains_hour(hour))
    }
}

/// Progress brackets covering the whole day, validated on construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BracketTable {
    brackets: Vec<Bracket>,
}

impl BracketTable {
    pub fn new(brackets: Vec<Bracket>) -> Result<Self, ConfigError> {
        validate_tiling("bracket", &brackets)?;
        Ok(Self { brackets })
    }

    /// First bracket whose end lies past `hour`.
    pub fn bracket_for(&self, hour: u8) -> Option<&Bracket> {
        self.brackets.iter().find(|bracket| bracket.end_hour > hour)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window(start_hour: u8, end_hour: u8) -> PhaseWindow {
        PhaseWindow {
            start_hour,
            end_hour,
            phase: LightingPhase::Off,
        }
    }

    #[test]
    fn accepts_single_full_day_window() {
        assert!(BracketTable::new(vec![Bracket::FULL_DAY]).is_ok());
    }

    #[test]
    fn rejects_empty_table() {
        assert_eq!(
            PhaseTable::new(Vec::new()),
            Err(ConfigError::EmptyTable { table: "phase" })
        );
    }

    #[test]
    fn rejects_gap_between_windows() {
        let result = PhaseTable::new(vec![window(0, 8), window(9, 24)]);

        assert_eq!(
            result,
            Err(ConfigError::NotContiguous {
                table: "phase",
                index: 1,
                start: 9,
                previous_end: 8,
            })
        );
    }

    #[test]
    fn rejects_overlapping_windows() {
        let result = BracketTable::new(vec![Bracket::new(0, 10), Bracket::new(8, 24)]);

        assert!(matches!(result, Err(ConfigError::NotContiguous { index: 1, .. })));
    }

    #[test]
    fn rejects_short_coverage() {
        let result = BracketTable::new(vec![Bracket::new(0, 12), Bracket::new(12, 22)]);

        assert_eq!(
            result,
            Err(ConfigError::DoesNotEndAtMidnight {
                table: "bracket",
                end: 22,
            })
        );
    }

    #[test]
    fn rejects_late_start() {
        let result = BracketTable::new(vec![Bracket::new(1, 24)]);

        assert_eq!(
            result,
            Err(ConfigError::DoesNotStartAtMidnight {
                table: "bracket",
                start: 1,
            })
        );
    }

    #[test]
    fn rejects_reversed_or_oversized_window() {
        assert!(matches!(
            PhaseTable::new(vec![window(0, 12), window(12, 12), window(12, 24)]),
            Err(ConfigError::EmptyWindow { index: 1, .. })
        ));
        assert!(matches!(
            BracketTable::new(vec![Bracket::new(0, 25)]),
            Err(ConfigError::EmptyWindow { index: 0, .. })
        ));
    }

    #[test]
    fn bracket_progress_is_clamped() {
        let bracket = Bracket::new(8, 10);

        assert_eq!(bracket.progress(TimeOfDay::new(7, 0).unwrap()), 0.0);
        assert_eq!(bracket.progress(TimeOfDay::new(9, 0).unwrap()), 0.5);
        assert_eq!(bracket.progress(TimeOfDay::new(11, 0).unwrap()), 1.0);
    }
}
