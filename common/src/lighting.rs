use crate::{
    config::LightingConfig,
    error::ConfigError,
    schedule::{Bracket, BracketTable, PhaseTable},
    types::{LightingPhase, TimeOfDay},
};

/// Maps wall time to a lighting phase and a decorative progress fraction.
#[derive(Debug, Clone)]
pub struct LightingScheduler {
    phases: PhaseTable,
    brackets: BracketTable,
}

impl LightingScheduler {
    pub fn new(config: &LightingConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            phases: PhaseTable::new(config.phases.clone())?,
            brackets: BracketTable::new(config.brackets.clone())?,
        })
    }

    /// Phase identity depends on the hour only.
    pub fn phase_for(&self, time: TimeOfDay) -> LightingPhase {
        self.phases
            .window_for(time.hour())
            .map(|window| window.phase)
            .unwrap_or(LightingPhase::Off)
    }

    pub fn progress_for(&self, time: TimeOfDay) -> f32 {
        // A validated table always has a bracket ending past any hour < 24.
        self.brackets
            .bracket_for(time.hour())
            .copied()
            .unwrap_or(Bracket::FULL_DAY)
            .progress(time)
    }

    /// Start of the next window whose phase differs from the current one.
    pub fn next_transition(&self, time: TimeOfDay) -> Option<(TimeOfDay, LightingPhase)> {
        let current = self.phase_for(time);
        let windows = self.phases.windows();
        let position = windows
            .iter()
            .position(|window| (window.start_hour..window.end_hour).contains(&time.hour()))?;

        windows
            .iter()
            .cycle()
            .skip(position + 1)
            .take(windows.len())
            .find(|window| window.phase != current)
            .map(|window| (TimeOfDay::from_minutes(window.start_hour as u16 * 60), window.phase))
    }
}
