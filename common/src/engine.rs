use crate::{
    config::ControllerConfig,
    display::{Blink, FrameState},
    error::{ConfigError, FatalError},
    feed::FeedScheduler,
    lighting::LightingScheduler,
    ports::{Actuator, AlarmSource, ButtonInput, ClockSource, DisplayDriver, TemperatureSensor},
    sync::{IrSyncDriver, SyncDiagnostics, SyncState},
    temperature::TemperatureMonitor,
    types::{Action, FeedTrigger, IrCommand, LightingPhase, TemperatureReadings, TimeOfDay},
};

/// Everything sampled from the outside world for one tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickInputs {
    pub time: TimeOfDay,
    pub readings: TemperatureReadings,
    pub alarm_fired: bool,
    pub button_pressed: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TickOutcome {
    pub frame: FrameState,
    /// Side effects in execution order; delays must complete before the
    /// next action runs.
    pub actions: Vec<Action>,
    pub phase: LightingPhase,
    pub phase_changed: bool,
    pub feed: Option<FeedTrigger>,
}

/// Peripherals the engine samples at the start of each tick.
pub struct Inputs<'a> {
    pub clock: &'a mut dyn ClockSource,
    pub thermometer: &'a mut dyn TemperatureSensor,
    pub alarm: &'a mut dyn AlarmSource,
    pub button: &'a mut dyn ButtonInput,
}

/// Peripherals that must attach before the control loop may start.
pub struct Outputs<'a> {
    pub clock: &'a mut dyn ClockSource,
    pub display: &'a mut dyn DisplayDriver,
    pub actuator: &'a mut dyn Actuator,
    pub alarm: &'a mut dyn AlarmSource,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StartupReport {
    /// The clock had lost power and was reset to the fallback time.
    pub clock_reset: Option<TimeOfDay>,
}

/// Owns all mutable controller state; one call to [`AquariumEngine::tick`]
/// per tick period.
#[derive(Debug, Clone)]
pub struct AquariumEngine {
    config: ControllerConfig,
    lighting: LightingScheduler,
    sync_driver: IrSyncDriver,
    sync_state: SyncState,
    feed: FeedScheduler,
    monitor: TemperatureMonitor,
    blink: Blink,
    last_phase: Option<LightingPhase>,
}

impl AquariumEngine {
    pub fn new(config: ControllerConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            lighting: LightingScheduler::new(&config.lighting)?,
            sync_driver: IrSyncDriver::new(config.sync),
            sync_state: SyncState::default(),
            feed: FeedScheduler::new(config.feed),
            monitor: TemperatureMonitor::new(config.temperature),
            blink: Blink::default(),
            last_phase: None,
            config,
        })
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    pub fn lighting(&self) -> &LightingScheduler {
        &self.lighting
    }

    pub fn sync_state(&self) -> SyncState {
        self.sync_state
    }

    pub fn sync_diagnostics(&self) -> SyncDiagnostics {
        self.sync_driver.diagnostics()
    }

    pub fn feed_count(&self) -> u32 {
        self.feed.feed_count()
    }

    pub fn ir_code(&self, command: IrCommand) -> u8 {
        self.config.ir_codes.code(command)
    }

    /// Attaches the required peripherals, parks the feeder and arms the daily
    /// feed alarm. Any attach failure is unrecoverable.
    pub fn bring_up(
        &self,
        outputs: Outputs<'_>,
        fallback_time: impl FnOnce() -> TimeOfDay,
    ) -> Result<StartupReport, FatalError> {
        outputs.clock.init()?;

        let mut clock_reset = None;
        if outputs.clock.lost_power() {
            let time = fallback_time();
            outputs.clock.adjust(time);
            clock_reset = Some(time);
        }

        outputs.display.init()?;
        outputs.actuator.init()?;
        outputs.actuator.move_to(self.config.feed.rest_angle);

        outputs.alarm.clear();
        outputs.alarm.arm_daily(self.feed.feed_hour(), 0);

        Ok(StartupReport { clock_reset })
    }

    /// Samples every input, clearing the alarm once it is observed.
    pub fn sample(&self, inputs: Inputs<'_>) -> TickInputs {
        let time = inputs.clock.now();
        let readings = self.monitor.sample(inputs.thermometer, inputs.clock);
        let alarm_fired = inputs.alarm.fired();
        if alarm_fired {
            inputs.alarm.clear();
        }

        TickInputs {
            time,
            readings,
            alarm_fired,
            button_pressed: inputs.button.is_asserted(),
        }
    }

    pub fn tick(&mut self, inputs: TickInputs, now_ms: u32) -> TickOutcome {
        let phase = self.lighting.phase_for(inputs.time);
        let progress = self.lighting.progress_for(inputs.time);
        let phase_changed = self.last_phase.is_some_and(|last| last != phase);
        self.last_phase = Some(phase);

        let mut actions = self.sync_driver.tick(now_ms, phase, &mut self.sync_state);

        let feed = self
            .feed
            .check_and_feed(inputs.alarm_fired, inputs.button_pressed, |sequence| {
                actions.extend_from_slice(sequence)
            });

        let temp_warning = self.monitor.is_warning(inputs.readings.interior_c);
        let blink = self.blink.toggle();

        TickOutcome {
            frame: FrameState::new(
                inputs.time,
                inputs.readings,
                temp_warning,
                phase,
                progress,
                blink,
            ),
            actions,
            phase,
            phase_changed,
            feed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Peripheral;
    use pretty_assertions::assert_eq;

    fn engine() -> AquariumEngine {
        AquariumEngine::new(ControllerConfig::default()).unwrap()
    }

    fn inputs(hour: u8, minute: u8) -> TickInputs {
        TickInputs {
            time: TimeOfDay::new(hour, minute).unwrap(),
            readings: TemperatureReadings {
                interior_c: 25.0,
                exterior_c: 21.0,
            },
            alarm_fired: false,
            button_pressed: false,
        }
    }

    #[derive(Default)]
    struct FakeClock {
        lost_power: bool,
        adjusted: Option<TimeOfDay>,
        fail: bool,
    }

    impl ClockSource for FakeClock {
        fn init(&mut self) -> Result<(), FatalError> {
            if self.fail {
                return Err(FatalError::unavailable(Peripheral::Clock, "no ack"));
            }
            Ok(())
        }

        fn now(&mut self) -> TimeOfDay {
            self.adjusted.unwrap_or(TimeOfDay::MIDNIGHT)
        }

        fn lost_power(&mut self) -> bool {
            self.lost_power
        }

        fn adjust(&mut self, time: TimeOfDay) {
            self.adjusted = Some(time);
        }

        fn ambient_temperature_c(&mut self) -> f32 {
            20.0
        }
    }

    #[derive(Default)]
    struct FakeDisplay {
        fail: bool,
    }

    impl DisplayDriver for FakeDisplay {
        fn init(&mut self) -> Result<(), FatalError> {
            if self.fail {
                return Err(FatalError::unavailable(Peripheral::Display, "no ack"));
            }
            Ok(())
        }

        fn render(&mut self, _frame: &FrameState) {}
    }

    #[derive(Default)]
    struct FakeServo {
        moves: Vec<u8>,
    }

    impl Actuator for FakeServo {
        fn move_to(&mut self, angle: u8) {
            self.moves.push(angle);
        }
    }

    #[derive(Default)]
    struct FakeAlarm {
        fired: bool,
        armed: Option<(u8, u8)>,
    }

    impl AlarmSource for FakeAlarm {
        fn arm_daily(&mut self, hour: u8, minute: u8) {
            self.armed = Some((hour, minute));
        }

        fn fired(&mut self) -> bool {
            self.fired
        }

        fn clear(&mut self) {
            self.fired = false;
        }
    }

    struct FakeButton(bool);

    impl ButtonInput for FakeButton {
        fn is_asserted(&mut self) -> bool {
            self.0
        }
    }

    struct FakeThermistor(f32);

    impl TemperatureSensor for FakeThermistor {
        fn read_averaged(&mut self, _samples: u16) -> f32 {
            self.0
        }
    }

    #[test]
    fn rejects_invalid_config() {
        let mut config = ControllerConfig::default();
        config.lighting.brackets.clear();

        assert!(matches!(
            AquariumEngine::new(config),
            Err(ConfigError::EmptyTable { table: "bracket" })
        ));
    }

    #[test]
    fn blink_changes_parity_once_per_tick() {
        let mut engine = engine();
        let mut previous = engine.tick(inputs(9, 0), 0).frame.blink;

        for second in 1..10 {
            let blink = engine.tick(inputs(9, 0), second * 1_000).frame.blink;
            assert_ne!(blink, previous);
            previous = blink;
        }
    }

    #[test]
    fn frame_carries_phase_progress_and_warning() {
        let mut engine = engine();
        let mut tick = inputs(8, 30);
        tick.readings.interior_c = 30.0;

        let frame = engine.tick(tick, 0).frame;

        assert_eq!(frame.phase, LightingPhase::Sunrise);
        assert_eq!(frame.phase_label, "SUN");
        assert_eq!(frame.progress, 0.5);
        assert!(frame.temp_warning);
        assert_eq!(frame.exterior_c, 21.0);
    }

    #[test]
    fn sync_actions_precede_feed_actions() {
        let mut engine = engine();
        let mut tick = inputs(9, 0);
        tick.alarm_fired = true;

        let outcome = engine.tick(tick, 0);

        assert_eq!(outcome.feed, Some(FeedTrigger::Alarm));
        assert_eq!(
            outcome.actions,
            vec![
                Action::SendIr(IrCommand::Wake),
                Action::Delay(300),
                Action::SendIr(IrCommand::Phase(LightingPhase::Sunrise)),
                Action::MoveActuator(90),
                Action::Delay(250),
                Action::MoveActuator(0),
            ]
        );
    }

    #[test]
    fn reports_phase_changes() {
        let mut engine = engine();

        assert!(!engine.tick(inputs(7, 59), 0).phase_changed);
        assert!(engine.tick(inputs(8, 0), 1_000).phase_changed);
        assert!(!engine.tick(inputs(8, 1), 2_000).phase_changed);
    }

    #[test]
    fn sample_clears_fired_alarm() {
        let engine = engine();
        let mut clock = FakeClock::default();
        let mut thermometer = FakeThermistor(26.5);
        let mut alarm = FakeAlarm {
            fired: true,
            ..FakeAlarm::default()
        };
        let mut button = FakeButton(true);

        let sampled = engine.sample(Inputs {
            clock: &mut clock,
            thermometer: &mut thermometer,
            alarm: &mut alarm,
            button: &mut button,
        });

        assert!(sampled.alarm_fired);
        assert!(sampled.button_pressed);
        assert!(!alarm.fired);
        assert_eq!(sampled.readings.interior_c, 26.5);
        assert_eq!(sampled.readings.exterior_c, 20.0);
    }

    #[test]
    fn bring_up_parks_feeder_and_arms_alarm() {
        let engine = engine();
        let mut clock = FakeClock::default();
        let mut display = FakeDisplay::default();
        let mut servo = FakeServo::default();
        let mut alarm = FakeAlarm::default();

        let report = engine
            .bring_up(
                Outputs {
                    clock: &mut clock,
                    display: &mut display,
                    actuator: &mut servo,
                    alarm: &mut alarm,
                },
                || panic!("clock did not lose power"),
            )
            .unwrap();

        assert_eq!(report.clock_reset, None);
        assert_eq!(servo.moves, vec![0]);
        assert_eq!(alarm.armed, Some((9, 0)));
    }

    #[test]
    fn bring_up_resets_clock_after_power_loss() {
        let engine = engine();
        let mut clock = FakeClock {
            lost_power: true,
            ..FakeClock::default()
        };
        let fallback = TimeOfDay::new(12, 34).unwrap();

        let report = engine
            .bring_up(
                Outputs {
                    clock: &mut clock,
                    display: &mut FakeDisplay::default(),
                    actuator: &mut FakeServo::default(),
                    alarm: &mut FakeAlarm::default(),
                },
                || fallback,
            )
            .unwrap();

        assert_eq!(report.clock_reset, Some(fallback));
        assert_eq!(clock.adjusted, Some(fallback));
    }

    #[test]
    fn bring_up_surfaces_fatal_peripheral_failure() {
        let engine = engine();
        let mut servo = FakeServo::default();

        let err = engine
            .bring_up(
                Outputs {
                    clock: &mut FakeClock::default(),
                    display: &mut FakeDisplay { fail: true },
                    actuator: &mut servo,
                    alarm: &mut FakeAlarm::default(),
                },
                || TimeOfDay::MIDNIGHT,
            )
            .unwrap_err();

        assert_eq!(err.peripheral(), Peripheral::Display);
        assert!(servo.moves.is_empty());
    }

    #[test]
    fn clock_failure_is_fatal() {
        let engine = engine();

        let err = engine
            .bring_up(
                Outputs {
                    clock: &mut FakeClock {
                        fail: true,
                        ..FakeClock::default()
                    },
                    display: &mut FakeDisplay::default(),
                    actuator: &mut FakeServo::default(),
                    alarm: &mut FakeAlarm::default(),
                },
                || TimeOfDay::MIDNIGHT,
            )
            .unwrap_err();

        assert_eq!(err.to_string(), "clock failed to attach: no ack");
    }
}
