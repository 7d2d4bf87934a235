use aquarium_common::{
    Action, AquariumEngine, ControllerConfig, FeedScheduler, IrCommand, IrSyncDriver,
    LightingPhase, LightingScheduler, SyncState, TemperatureReadings, TickInputs, TimeOfDay,
};
use pretty_assertions::assert_eq;

fn at(hour: u8, minute: u8) -> TimeOfDay {
    TimeOfDay::new(hour, minute).unwrap()
}

fn tick_inputs(time: TimeOfDay) -> TickInputs {
    TickInputs {
        time,
        readings: TemperatureReadings {
            interior_c: 25.0,
            exterior_c: 22.0,
        },
        alarm_fired: false,
        button_pressed: false,
    }
}

#[test]
fn sunrise_wakes_the_fixture() {
    let config = ControllerConfig::default();
    let scheduler = LightingScheduler::new(&config.lighting).unwrap();
    let mut driver = IrSyncDriver::new(config.sync);
    let mut state = SyncState::default();

    assert_eq!(scheduler.phase_for(at(7, 59)), LightingPhase::Off);
    assert!(scheduler.progress_for(at(7, 59)) > 0.99);

    let off = driver.tick(0, scheduler.phase_for(at(7, 59)), &mut state);
    assert_eq!(off, vec![Action::SendIr(IrCommand::Phase(LightingPhase::Off))]);

    let phase = scheduler.phase_for(at(8, 0));
    assert_eq!(phase, LightingPhase::Sunrise);

    let actions = driver.tick(10_000, phase, &mut state);
    assert_eq!(
        actions,
        vec![
            Action::SendIr(IrCommand::Wake),
            Action::Delay(config.sync.wake_settle_ms),
            Action::SendIr(IrCommand::Phase(LightingPhase::Sunrise)),
        ]
    );
    assert_eq!(state.assumed_phase, LightingPhase::Sunrise);
}

#[test]
fn late_evening_resend_has_no_wake() {
    let config = ControllerConfig::default();
    let scheduler = LightingScheduler::new(&config.lighting).unwrap();
    let mut driver = IrSyncDriver::new(config.sync);
    let mut state = SyncState {
        assumed_phase: LightingPhase::Off,
        last_sync_at_ms: Some(50_000),
    };

    let phase = scheduler.phase_for(at(23, 0));
    assert_eq!(phase, LightingPhase::Off);

    assert!(driver.tick(55_000, phase, &mut state).is_empty());
    assert_eq!(
        driver.tick(60_000, phase, &mut state),
        vec![Action::SendIr(IrCommand::Phase(LightingPhase::Off))]
    );
}

#[test]
fn a_day_of_one_second_ticks() {
    let mut engine = AquariumEngine::new(ControllerConfig::default()).unwrap();
    let mut phase_commands = 0;
    let mut wakes = 0;
    let mut transitions = Vec::new();

    for second in 0..24 * 60 * 60u32 {
        let time = TimeOfDay::from_minutes((second / 60) as u16);
        let outcome = engine.tick(tick_inputs(time), second * 1_000);

        for action in &outcome.actions {
            match action {
                Action::SendIr(IrCommand::Wake) => wakes += 1,
                Action::SendIr(IrCommand::Phase(_)) => phase_commands += 1,
                _ => {}
            }
        }

        if outcome.phase_changed {
            transitions.push((time, outcome.phase));
        }
        assert_eq!(engine.sync_state().assumed_phase, outcome.phase);
    }

    assert_eq!(
        transitions,
        vec![
            (at(8, 0), LightingPhase::Sunrise),
            (at(10, 0), LightingPhase::Noon),
            (at(12, 0), LightingPhase::Off),
            (at(18, 0), LightingPhase::Evening),
            (at(20, 0), LightingPhase::Neon),
            (at(22, 0), LightingPhase::Off),
        ]
    );
    // One resend every 10 s over 86_400 s.
    assert_eq!(phase_commands, 8_640);
    // OFF -> SUNRISE at 08:00 and OFF -> EVENING at 18:00.
    assert_eq!(wakes, 2);
    assert_eq!(engine.feed_count(), 0);
}

#[test]
fn held_button_feeds_on_every_tick() {
    let mut engine = AquariumEngine::new(ControllerConfig::default()).unwrap();
    let mut feeds = 0;

    for second in 0..5u32 {
        let mut inputs = tick_inputs(at(13, 0));
        inputs.button_pressed = true;
        if engine.tick(inputs, second * 1_000).feed.is_some() {
            feeds += 1;
        }
    }

    assert_eq!(feeds, 5);
    assert_eq!(engine.feed_count(), 5);
}

#[test]
fn uncleared_alarm_keeps_feeding() {
    let mut scheduler = FeedScheduler::new(ControllerConfig::default().feed);
    let mut feeds = 0;

    for _ in 0..3 {
        scheduler.check_and_feed(true, false, |_| feeds += 1);
    }
    assert_eq!(feeds, 3);

    // Cleared: nothing until the alarm matches again.
    for _ in 0..3 {
        scheduler.check_and_feed(false, false, |_| feeds += 1);
    }
    assert_eq!(feeds, 3);
}
