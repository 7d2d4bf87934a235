use crate::{
    config::SyncConfig,
    types::{Action, IrCommand, LightingPhase},
};

/// What the controller believes the fixture is showing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncState {
    pub assumed_phase: LightingPhase,
    /// `None` until the first sync, which then fires on the next tick.
    pub last_sync_at_ms: Option<u32>,
}

impl Default for SyncState {
    fn default() -> Self {
        Self {
            assumed_phase: LightingPhase::Off,
            last_sync_at_ms: None,
        }
    }
}

/// Counters reported by the harness on shutdown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncDiagnostics {
    pub sync_count: u32,
    pub wake_count: u32,
}

/// Periodically re-asserts the desired phase over the one-way IR link.
///
/// The link has no acknowledgement, so there is no retry: a dropped frame is
/// corrected by the next resend one interval later.
#[derive(Debug, Clone)]
pub struct IrSyncDriver {
    config: SyncConfig,
    diagnostics: SyncDiagnostics,
}

impl IrSyncDriver {
    pub fn new(config: SyncConfig) -> Self {
        Self {
            config,
            diagnostics: SyncDiagnostics::default(),
        }
    }

    pub fn diagnostics(&self) -> SyncDiagnostics {
        self.diagnostics
    }

    /// Whether a sync is due at `now_ms`. Millisecond counters wrap, so the
    /// elapsed time is computed with wrapping subtraction.
    pub fn is_due(&self, now_ms: u32, state: &SyncState) -> bool {
        state
            .last_sync_at_ms
            .map(|last| now_ms.wrapping_sub(last) >= self.config.interval_ms)
            .unwrap_or(true)
    }

    pub fn tick(
        &mut self,
        now_ms: u32,
        desired_phase: LightingPhase,
        state: &mut SyncState,
    ) -> Vec<Action> {
        if !self.is_due(now_ms, state) {
            return Vec::new();
        }

        let mut actions = Vec::with_capacity(3);
        if state.assumed_phase == LightingPhase::Off && desired_phase != LightingPhase::Off {
            actions.push(Action::SendIr(IrCommand::Wake));
            actions.push(Action::Delay(self.config.wake_settle_ms));
            self.diagnostics.wake_count = self.diagnostics.wake_count.saturating_add(1);
        }

        // Resent even when unchanged so a fixture that missed a frame catches up.
        actions.push(Action::SendIr(IrCommand::Phase(desired_phase)));

        state.assumed_phase = desired_phase;
        state.last_sync_at_ms = Some(now_ms);
        self.diagnostics.sync_count = self.diagnostics.sync_count.saturating_add(1);

        actions
    }
}
