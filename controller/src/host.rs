use std::{
    sync::OnceLock,
    time::{Duration, Instant},
};

use anyhow::{anyhow, Context};
use aquarium_common::{
    ports::{Actuator, DisplayDriver, IrTransmitter},
    Action, AquariumEngine, ControllerConfig, Inputs, Outputs, TimeOfDay,
};
use chrono::{Local, NaiveDateTime, Utc};
use chrono_tz::Tz;
use tracing::{debug, info, warn};

use crate::sim::{
    LogIrTransmitter, LogServo, SignalButton, SimAlarm, SimClock, SimThermistor, TerminalDisplay,
};

const SIMULATED_INTERIOR_C: f32 = 25.5;

/// Knobs for the host simulation. The schedule itself is fixed.
#[derive(Debug, Clone, PartialEq)]
struct HostSettings {
    timezone: Option<Tz>,
    start_time: Option<TimeOfDay>,
    time_scale: u32,
}

impl HostSettings {
    fn from_env() -> anyhow::Result<Self> {
        let timezone = match std::env::var("AQUARIUM_TZ") {
            Ok(value) => Some(
                value
                    .parse::<Tz>()
                    .map_err(|err| anyhow!("invalid AQUARIUM_TZ `{value}`: {err}"))?,
            ),
            Err(_) => None,
        };

        let start_time = match std::env::var("AQUARIUM_START_TIME") {
            Ok(value) => Some(
                parse_time_of_day(&value)
                    .with_context(|| format!("invalid AQUARIUM_START_TIME `{value}`"))?,
            ),
            Err(_) => None,
        };

        let time_scale = std::env::var("AQUARIUM_TIME_SCALE")
            .ok()
            .and_then(|value| value.parse::<u32>().ok())
            .filter(|scale| *scale > 0)
            .unwrap_or(1);

        Ok(Self {
            timezone,
            start_time,
            time_scale,
        })
    }

    fn origin(&self) -> NaiveDateTime {
        let now = match self.timezone {
            Some(tz) => Utc::now().with_timezone(&tz).naive_local(),
            None => Local::now().naive_local(),
        };

        self.start_time
            .and_then(|time| {
                now.date()
                    .and_hms_opt(time.hour() as u32, time.minute() as u32, 0)
            })
            .unwrap_or(now)
    }
}

pub async fn run() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let settings = HostSettings::from_env()?;
    let config = ControllerConfig::default();
    let tick_period = Duration::from_millis(config.tick_period_ms as u64);
    let mut engine = AquariumEngine::new(config).context("invalid controller configuration")?;

    let clock = SimClock::new(settings.origin(), settings.time_scale);
    let mut rtc = clock.clone();
    let mut alarm = SimAlarm::new(clock);
    let mut thermistor = SimThermistor::new(SIMULATED_INTERIOR_C);
    let mut button = SignalButton::default();
    let mut ir = LogIrTransmitter::default();
    let mut servo = LogServo::default();
    let mut display = TerminalDisplay::default();

    let report = engine
        .bring_up(
            Outputs {
                clock: &mut rtc,
                display: &mut display,
                actuator: &mut servo,
                alarm: &mut alarm,
            },
            || TimeOfDay::from_timelike(&Local::now()),
        )
        .context("peripheral bring-up failed")?;
    if let Some(time) = report.clock_reset {
        warn!("clock lost power, reset to {time}");
    }

    spawn_button_listener(button.clone())?;

    info!(
        "controller running: tick={}ms, time scale={}x, feed at {:02}:00",
        tick_period.as_millis(),
        settings.time_scale,
        engine.config().feed.feed_hour
    );

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);
    let mut interval = tokio::time::interval(tick_period);

    loop {
        tokio::select! {
            _ = interval.tick() => {}
            _ = &mut shutdown => {
                info!("shutting down");
                break;
            }
        }

        let inputs = engine.sample(Inputs {
            clock: &mut rtc,
            thermometer: &mut thermistor,
            alarm: &mut alarm,
            button: &mut button,
        });
        let outcome = engine.tick(inputs, millis());

        if outcome.phase_changed {
            match engine.lighting().next_transition(inputs.time) {
                Some((at, next)) => info!(
                    "lighting phase -> {} (next: {} at {at})",
                    outcome.phase.as_str(),
                    next.as_str()
                ),
                None => info!("lighting phase -> {}", outcome.phase.as_str()),
            }
        }
        if let Some(trigger) = outcome.feed {
            info!(
                trigger = trigger.as_str(),
                total = engine.feed_count(),
                "feeding"
            );
        }

        execute_actions(&engine, &outcome.actions, &mut ir, &mut servo).await;
        display.render(&outcome.frame);
    }

    let diagnostics = engine.sync_diagnostics();
    info!(
        syncs = diagnostics.sync_count,
        wakes = diagnostics.wake_count,
        feeds = engine.feed_count(),
        ir_frames = ir.sent_frames(),
        "controller stopped"
    );
    Ok(())
}

async fn execute_actions(
    engine: &AquariumEngine,
    actions: &[Action],
    ir: &mut impl IrTransmitter,
    actuator: &mut impl Actuator,
) {
    for action in actions {
        debug!("engine action: {action:?}");
        match *action {
            Action::Delay(ms) => tokio::time::sleep(Duration::from_millis(ms as u64)).await,
            Action::SendIr(command) => ir.send(engine.ir_code(command)),
            Action::MoveActuator(angle) => actuator.move_to(angle),
        }
    }
}

#[cfg(unix)]
fn spawn_button_listener(button: SignalButton) -> anyhow::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut presses =
        signal(SignalKind::user_defined1()).context("failed to install SIGUSR1 handler")?;
    tokio::spawn(async move {
        while presses.recv().await.is_some() {
            let asserted = button.toggle();
            info!(asserted, "feed button toggled");
        }
    });
    Ok(())
}

#[cfg(not(unix))]
fn spawn_button_listener(_button: SignalButton) -> anyhow::Result<()> {
    warn!("manual feed button is not available on this platform");
    Ok(())
}

fn parse_time_of_day(value: &str) -> anyhow::Result<TimeOfDay> {
    let (hour, minute) = value
        .trim()
        .split_once(':')
        .ok_or_else(|| anyhow!("expected HH:MM"))?;
    let hour = hour.parse::<u8>().context("hour is not a number")?;
    let minute = minute.parse::<u8>().context("minute is not a number")?;
    Ok(TimeOfDay::new(hour, minute)?)
}

/// Milliseconds since start, truncated like a hardware counter; the sync
/// driver handles the wrap.
fn millis() -> u32 {
    monotonic_ms() as u32
}

fn monotonic_ms() -> u64 {
    static START: OnceLock<Instant> = OnceLock::new();
    START
        .get_or_init(Instant::now)
        .elapsed()
        .as_millis()
        .try_into()
        .unwrap_or(u64::MAX)
}
