//! Simulated peripherals for running the controller on a development host.

use std::{
    f32::consts::TAU,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Instant,
};

use aquarium_common::{
    ports::{
        Actuator, AlarmSource, ButtonInput, ClockSource, DisplayDriver, IrTransmitter,
        TemperatureSensor,
    },
    FrameState, TimeOfDay,
};
use chrono::{NaiveDateTime, TimeDelta, Timelike};
use tracing::{debug, info, warn};

/// Wall clock that starts at `origin` and runs `scale` times faster than
/// real time. Clones share the same origin.
#[derive(Debug, Clone)]
pub struct SimClock {
    origin: NaiveDateTime,
    started: Instant,
    scale: u32,
    adjusted: Option<NaiveDateTime>,
}

impl SimClock {
    pub fn new(origin: NaiveDateTime, scale: u32) -> Self {
        Self {
            origin,
            started: Instant::now(),
            scale,
            adjusted: None,
        }
    }

    #[cfg(test)]
    pub fn frozen(origin: NaiveDateTime) -> Self {
        Self::new(origin, 0)
    }

    pub fn local_now(&self) -> NaiveDateTime {
        let elapsed = self.started.elapsed().saturating_mul(self.scale);
        let elapsed = TimeDelta::from_std(elapsed).unwrap_or_else(|_| TimeDelta::zero());
        self.adjusted.unwrap_or(self.origin) + elapsed
    }
}

impl ClockSource for SimClock {
    fn now(&mut self) -> TimeOfDay {
        TimeOfDay::from_timelike(&self.local_now())
    }

    fn adjust(&mut self, time: TimeOfDay) {
        let date = self.local_now().date();
        self.adjusted = date.and_hms_opt(time.hour() as u32, time.minute() as u32, 0);
        self.started = Instant::now();
    }

    fn ambient_temperature_c(&mut self) -> f32 {
        // Room swings a couple of degrees over the day; DS3231 reports in
        // quarter degrees.
        let now = self.local_now();
        let day_fraction = (now.hour() * 60 + now.minute()) as f32 / (24.0 * 60.0);
        let celsius = 21.0 - 1.5 * (day_fraction * TAU).cos();
        (celsius * 4.0).round() / 4.0
    }
}

/// Thermistor with a fixed set point and a little deterministic jitter.
#[derive(Debug, Clone)]
pub struct SimThermistor {
    base_c: f32,
    reads: u32,
}

impl SimThermistor {
    pub fn new(base_c: f32) -> Self {
        Self { base_c, reads: 0 }
    }
}

impl TemperatureSensor for SimThermistor {
    fn read_averaged(&mut self, samples: u16) -> f32 {
        let samples = samples.max(1);
        let mut total = 0.0;
        for _ in 0..samples {
            self.reads = self.reads.wrapping_add(1);
            total += self.base_c + ((self.reads % 5) as f32 - 2.0) * 0.05;
        }
        total / samples as f32
    }
}

/// Daily alarm latched when the simulated clock passes the armed time, like
/// the DS3231 alarm flag.
#[derive(Debug, Clone)]
pub struct SimAlarm {
    clock: SimClock,
    armed: Option<(u8, u8)>,
    flag: bool,
    last_seen: Option<NaiveDateTime>,
}

impl SimAlarm {
    pub fn new(clock: SimClock) -> Self {
        Self {
            clock,
            armed: None,
            flag: false,
            last_seen: None,
        }
    }

    fn observe(&mut self) {
        let now = self.clock.local_now();
        let previous = self.last_seen.replace(now);
        let (Some((hour, minute)), Some(previous)) = (self.armed, previous) else {
            return;
        };

        // Check today's and yesterday's match so a skipped midnight still counts.
        for days_back in 0..2 {
            let Some(date) = now.date().checked_sub_signed(TimeDelta::days(days_back)) else {
                continue;
            };
            let Some(target) = date.and_hms_opt(hour as u32, minute as u32, 0) else {
                continue;
            };
            if previous < target && target <= now {
                self.flag = true;
            }
        }
    }
}

impl AlarmSource for SimAlarm {
    fn arm_daily(&mut self, hour: u8, minute: u8) {
        self.armed = Some((hour, minute));
        self.last_seen = Some(self.clock.local_now());
        info!("feed alarm armed for {hour:02}:{minute:02}");
    }

    fn fired(&mut self) -> bool {
        self.observe();
        self.flag
    }

    fn clear(&mut self) {
        self.flag = false;
    }
}

/// Level input toggled from outside the control loop (SIGUSR1 on unix).
#[derive(Debug, Clone, Default)]
pub struct SignalButton {
    asserted: Arc<AtomicBool>,
}

impl SignalButton {
    /// Flips the level and returns the new state.
    pub fn toggle(&self) -> bool {
        !self.asserted.fetch_xor(true, Ordering::Relaxed)
    }
}

impl ButtonInput for SignalButton {
    fn is_asserted(&mut self) -> bool {
        self.asserted.load(Ordering::Relaxed)
    }
}

#[derive(Debug, Default)]
pub struct LogIrTransmitter {
    sent_frames: u64,
}

impl LogIrTransmitter {
    pub fn sent_frames(&self) -> u64 {
        self.sent_frames
    }
}

impl IrTransmitter for LogIrTransmitter {
    fn send(&mut self, code: u8) {
        self.sent_frames = self.sent_frames.saturating_add(1);
        let hex = format!("{code:#04x}");
        debug!(code = %hex, sent_frames = self.sent_frames, "ir frame sent");
    }
}

#[derive(Debug, Default)]
pub struct LogServo {
    angle: Option<u8>,
}

impl LogServo {
    #[cfg(test)]
    pub fn angle(&self) -> Option<u8> {
        self.angle
    }
}

impl Actuator for LogServo {
    fn move_to(&mut self, angle: u8) {
        if let Some(previous) = self.angle {
            debug!("servo {previous} -> {angle} degrees");
        }
        self.angle = Some(angle);
    }
}

/// Logs each frame; a full line at info level once a minute and the JSON
/// snapshot at debug level every tick.
#[derive(Debug, Default)]
pub struct TerminalDisplay {
    last_minute: Option<TimeOfDay>,
}

impl TerminalDisplay {
    #[cfg(test)]
    pub fn last_minute(&self) -> Option<TimeOfDay> {
        self.last_minute
    }

    pub fn summary(frame: &FrameState) -> String {
        let warning = if frame.temp_warning { " !TEMP" } else { "" };
        format!(
            "{} {} {:>3.0}% in {:.1}C out {:.2}C{warning}",
            frame.clock_text(),
            frame.phase_label,
            frame.progress * 100.0,
            frame.interior_c,
            frame.exterior_c,
        )
    }
}

impl DisplayDriver for TerminalDisplay {
    fn render(&mut self, frame: &FrameState) {
        match serde_json::to_string(frame) {
            Ok(json) => debug!(frame = %json, "display frame"),
            Err(err) => warn!("display frame serialization failed: {err}"),
        }

        if self.last_minute != Some(frame.time) {
            self.last_minute = Some(frame.time);
            info!("{}", Self::summary(frame));
        }
    }
}
