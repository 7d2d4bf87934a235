use crate::{
    config::{ButtonTrigger, FeedConfig},
    types::{Action, FeedTrigger},
};

/// Decides when the feeder runs.
///
/// The alarm and the button are OR'd. In [`ButtonTrigger::Level`] mode a held
/// button feeds on every check for as long as it stays asserted; a stuck
/// button therefore keeps feeding. [`ButtonTrigger::Edge`] feeds once per
/// press and must be opted into.
#[derive(Debug, Clone)]
pub struct FeedScheduler {
    config: FeedConfig,
    button_was_asserted: bool,
    feed_count: u32,
}

impl FeedScheduler {
    pub fn new(config: FeedConfig) -> Self {
        Self {
            config,
            button_was_asserted: false,
            feed_count: 0,
        }
    }

    pub fn feed_hour(&self) -> u8 {
        self.config.feed_hour
    }

    pub fn feed_count(&self) -> u32 {
        self.feed_count
    }

    /// Move to the feed angle, hold, return to rest.
    pub fn feed_sequence(&self) -> [Action; 3] {
        [
            Action::MoveActuator(self.config.feed_angle),
            Action::Delay(self.config.hold_ms),
            Action::MoveActuator(self.config.rest_angle),
        ]
    }

    /// Runs `feed` with the actuator sequence when either input calls for it.
    pub fn check_and_feed(
        &mut self,
        alarm_fired: bool,
        button_pressed: bool,
        feed: impl FnOnce(&[Action]),
    ) -> Option<FeedTrigger> {
        let button = match self.config.button_trigger {
            ButtonTrigger::Level => button_pressed,
            ButtonTrigger::Edge => button_pressed && !self.button_was_asserted,
        };
        self.button_was_asserted = button_pressed;

        let trigger = FeedTrigger::from_inputs(alarm_fired, button)?;
        feed(&self.feed_sequence());
        self.feed_count = self.feed_count.saturating_add(1);
        Some(trigger)
    }
}
