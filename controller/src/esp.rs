use std::{
    cell::RefCell,
    rc::Rc,
    sync::OnceLock,
    thread,
    time::{Duration, Instant},
};

use anyhow::anyhow;
use esp_idf_hal::{
    adc::{
        attenuation::DB_11,
        oneshot::{config::AdcChannelConfig, AdcChannelDriver, AdcDriver},
        ADC1,
    },
    delay::BLOCK,
    gpio::{Gpio15, Gpio34, Input, PinDriver, Pull},
    i2c::{I2cConfig, I2cDriver},
    ledc::{config::TimerConfig, LedcDriver, LedcTimerDriver, Resolution},
    units::FromValueType,
};
use esp_idf_svc::{hal::prelude::Peripherals, log::EspLogger, sys::EspError};
use log::{debug, error, info, warn};

use aquarium_common::{
    config::IrHardwareConfig,
    error::{FatalError, Peripheral},
    ports::{
        Actuator, AlarmSource, ButtonInput, ClockSource, DisplayDriver, IrTransmitter,
        TemperatureSensor,
    },
    Action, AquariumEngine, ControllerConfig, FrameState, Inputs, Outputs, RawAverage,
    TimeOfDay,
};

use crate::ir::{init_ir_transmitter, RmtIrTransmitter};

const WATCHDOG_TIMEOUT_SEC: u32 = 30;
const I2C_BAUDRATE_KHZ: u32 = 100;

const DS3231_ADDRESS: u8 = 0x68;
const DS3231_TIME: u8 = 0x00;
const DS3231_ALARM1: u8 = 0x07;
const DS3231_STATUS: u8 = 0x0F;
const DS3231_TEMPERATURE: u8 = 0x11;
const DS3231_OSF: u8 = 0x80;
const DS3231_A1F: u8 = 0x01;
// A1M4 set, A1M1..A1M3 clear: match seconds, minutes and hours every day.
const DS3231_A1M4: u8 = 0x80;

const DISPLAY_ADDRESS: u8 = 0x3D;
const DISPLAY_WIDTH: u16 = 128;
const DISPLAY_PROGRESS_PAGE: u8 = 7;
const SSD1306_INIT: &[u8] = &[
    0xAE, 0xD5, 0x80, 0xA8, 0x3F, 0xD3, 0x00, 0x40, 0x8D, 0x14, 0x20, 0x00, 0xA1, 0xC8, 0xDA,
    0x12, 0x81, 0xCF, 0xD9, 0xF1, 0xDB, 0x40, 0xA4, 0xA6, 0xAF,
];

const SERVO_PERIOD_US: u32 = 20_000;
const SERVO_MIN_PULSE_US: u32 = 500;
const SERVO_MAX_PULSE_US: u32 = 2_500;
const SERVO_MAX_ANGLE: u32 = 180;

// 10k NTC, B = 3950, against a 10k divider on a 12-bit ADC.
const THERM_R25: f32 = 10_000.0;
const THERM_BETA: f32 = 3_950.0;
const THERM_T25_K: f32 = 298.15;
const THERM_DIVIDER: f32 = 10_000.0;
const ADC_MAX: f32 = 4_095.0;

type SharedBus = Rc<RefCell<I2cDriver<'static>>>;
type ThermistorChannel = AdcChannelDriver<'static, Gpio34, AdcDriver<'static, ADC1>>;

pub fn run() -> anyhow::Result<()> {
    esp_idf_svc::sys::link_patches();
    EspLogger::initialize_default();

    let config = ControllerConfig::default();
    let mut engine =
        AquariumEngine::new(config).map_err(|err| anyhow!("invalid controller config: {err}"))?;

    let Peripherals {
        pins,
        rmt,
        i2c0,
        ledc,
        adc1,
        ..
    } = Peripherals::take()?;

    let mut ir_config = IrHardwareConfig::default();
    ir_config.sanitize();
    let mut ir = match init_ir_transmitter(rmt, &ir_config) {
        Ok(transmitter) => {
            info!(
                "IR transmitter initialized on RMT channel{} / GPIO{} @ {}kHz",
                ir_config.rmt_channel, ir_config.tx_pin, ir_config.carrier_khz
            );
            transmitter
        }
        Err(err) => {
            warn!("failed to initialize IR transmitter, running disabled: {err:#}");
            RmtIrTransmitter::disabled()
        }
    };

    let bus: SharedBus = Rc::new(RefCell::new(I2cDriver::new(
        i2c0,
        pins.gpio21,
        pins.gpio22,
        &I2cConfig::new().baudrate(I2C_BAUDRATE_KHZ.kHz().into()),
    )?));

    let mut rtc = Ds3231::new(bus.clone());
    let mut alarm = Ds3231Alarm::new(bus.clone());
    let mut display = Ssd1306::new(bus);

    let timer = LedcTimerDriver::new(
        ledc.timer0,
        &TimerConfig::new()
            .frequency(50.Hz().into())
            .resolution(Resolution::Bits14),
    )?;
    let mut servo = Servo::new(LedcDriver::new(
        ledc.channel0,
        timer,
        pins.gpio18,
    )?);

    let mut thermistor = Thermistor::new(AdcChannelDriver::new(
        AdcDriver::new(adc1)?,
        pins.gpio34,
        &AdcChannelConfig {
            attenuation: DB_11,
            ..Default::default()
        },
    )?);

    let mut button = FeedButton::new(PinDriver::input(pins.gpio15)?)?;

    let bring_up = engine.bring_up(
        Outputs {
            clock: &mut rtc,
            display: &mut display,
            actuator: &mut servo,
            alarm: &mut alarm,
        },
        || TimeOfDay::MIDNIGHT,
    );
    let report = match bring_up {
        Ok(report) => report,
        Err(err) => halt(err),
    };
    if let Some(time) = report.clock_reset {
        warn!("RTC lost power, clock reset to {time}");
    }

    init_watchdog(WATCHDOG_TIMEOUT_SEC)?;
    if let Err(err) = add_current_task_to_watchdog() {
        warn!("failed to register control loop with watchdog: {err:#}");
    }

    let tick_period = Duration::from_millis(engine.config().tick_period_ms as u64);
    info!(
        "controller running: tick={}ms, feed at {:02}:00",
        tick_period.as_millis(),
        engine.config().feed.feed_hour
    );

    loop {
        feed_watchdog();
        let started = Instant::now();

        let inputs = engine.sample(Inputs {
            clock: &mut rtc,
            thermometer: &mut thermistor,
            alarm: &mut alarm,
            button: &mut button,
        });
        let outcome = engine.tick(inputs, millis());

        if outcome.phase_changed {
            info!(
                "lighting phase -> {} (IR frames sent {}, failed {})",
                outcome.phase.as_str(),
                ir.sent_frames(),
                ir.failed_frames()
            );
        }
        if let Some(trigger) = outcome.feed {
            info!(
                "feeding ({}), total {}",
                trigger.as_str(),
                engine.feed_count()
            );
        }

        execute_actions(&engine, &outcome.actions, &mut ir, &mut servo);
        display.render(&outcome.frame);

        thread::sleep(tick_period.saturating_sub(started.elapsed()));
    }
}

/// Parks forever after a failed bring-up; nothing is driven from here on.
fn halt(err: FatalError) -> ! {
    error!("{err}");
    loop {
        thread::sleep(Duration::from_millis(10));
    }
}

fn execute_actions(
    engine: &AquariumEngine,
    actions: &[Action],
    ir: &mut impl IrTransmitter,
    actuator: &mut impl Actuator,
) {
    for action in actions {
        debug!("engine action: {action:?}");
        match *action {
            Action::Delay(ms) => thread::sleep(Duration::from_millis(ms as u64)),
            Action::SendIr(command) => ir.send(engine.ir_code(command)),
            Action::MoveActuator(angle) => actuator.move_to(angle),
        }
    }
}

fn bcd_to_bin(value: u8) -> u8 {
    (value >> 4) * 10 + (value & 0x0F)
}

fn bin_to_bcd(value: u8) -> u8 {
    ((value / 10) << 4) | (value % 10)
}

fn read_registers(bus: &SharedBus, start: u8, buf: &mut [u8]) -> Result<(), EspError> {
    bus.borrow_mut()
        .write_read(DS3231_ADDRESS, &[start], buf, BLOCK)
}

fn write_registers(bus: &SharedBus, start: u8, data: &[u8]) -> Result<(), EspError> {
    let mut frame = Vec::with_capacity(data.len() + 1);
    frame.push(start);
    frame.extend_from_slice(data);
    bus.borrow_mut().write(DS3231_ADDRESS, &frame, BLOCK)
}

fn clear_status_bits(bus: &SharedBus, bits: u8) -> Result<(), EspError> {
    let mut status = [0u8];
    read_registers(bus, DS3231_STATUS, &mut status)?;
    write_registers(bus, DS3231_STATUS, &[status[0] & !bits])
}

/// DS3231 time and die temperature. Reads that fail on the bus repeat the
/// last good value.
struct Ds3231 {
    bus: SharedBus,
    last_time: TimeOfDay,
    last_temperature_c: f32,
}

impl Ds3231 {
    fn new(bus: SharedBus) -> Self {
        Self {
            bus,
            last_time: TimeOfDay::MIDNIGHT,
            last_temperature_c: 0.0,
        }
    }

    fn status(&self) -> Result<u8, EspError> {
        let mut status = [0u8];
        read_registers(&self.bus, DS3231_STATUS, &mut status)?;
        Ok(status[0])
    }
}

impl ClockSource for Ds3231 {
    fn init(&mut self) -> Result<(), FatalError> {
        self.status()
            .map(|_| ())
            .map_err(|err| FatalError::unavailable(Peripheral::Clock, err.to_string()))
    }

    fn now(&mut self) -> TimeOfDay {
        let mut regs = [0u8; 3];
        match read_registers(&self.bus, DS3231_TIME, &mut regs) {
            Ok(()) => {
                let minute = bcd_to_bin(regs[1] & 0x7F);
                let hour = bcd_to_bin(regs[2] & 0x3F);
                match TimeOfDay::new(hour, minute) {
                    Ok(time) => self.last_time = time,
                    Err(err) => warn!("RTC returned invalid time: {err}"),
                }
            }
            Err(err) => warn!("RTC time read failed: {err}"),
        }
        self.last_time
    }

    fn lost_power(&mut self) -> bool {
        match self.status() {
            Ok(status) => status & DS3231_OSF != 0,
            Err(err) => {
                warn!("RTC status read failed: {err}");
                false
            }
        }
    }

    fn adjust(&mut self, time: TimeOfDay) {
        let regs = [0, bin_to_bcd(time.minute()), bin_to_bcd(time.hour())];
        let result = write_registers(&self.bus, DS3231_TIME, &regs)
            .and_then(|()| clear_status_bits(&self.bus, DS3231_OSF));
        match result {
            Ok(()) => self.last_time = time,
            Err(err) => warn!("RTC adjust failed: {err}"),
        }
    }

    fn ambient_temperature_c(&mut self) -> f32 {
        let mut regs = [0u8; 2];
        match read_registers(&self.bus, DS3231_TEMPERATURE, &mut regs) {
            Ok(()) => {
                self.last_temperature_c = regs[0] as i8 as f32 + (regs[1] >> 6) as f32 * 0.25;
            }
            Err(err) => warn!("RTC temperature read failed: {err}"),
        }
        self.last_temperature_c
    }
}

/// Alarm 1 of the same DS3231; its flag latches until cleared.
struct Ds3231Alarm {
    bus: SharedBus,
}

impl Ds3231Alarm {
    fn new(bus: SharedBus) -> Self {
        Self { bus }
    }
}

impl AlarmSource for Ds3231Alarm {
    fn arm_daily(&mut self, hour: u8, minute: u8) {
        let regs = [0, bin_to_bcd(minute), bin_to_bcd(hour), DS3231_A1M4];
        match write_registers(&self.bus, DS3231_ALARM1, &regs) {
            Ok(()) => info!("feed alarm armed for {hour:02}:{minute:02}"),
            Err(err) => warn!("failed to arm feed alarm: {err}"),
        }
    }

    fn fired(&mut self) -> bool {
        let mut status = [0u8];
        match read_registers(&self.bus, DS3231_STATUS, &mut status) {
            Ok(()) => status[0] & DS3231_A1F != 0,
            Err(err) => {
                warn!("alarm status read failed: {err}");
                false
            }
        }
    }

    fn clear(&mut self) {
        if let Err(err) = clear_status_bits(&self.bus, DS3231_A1F) {
            warn!("failed to clear alarm flag: {err}");
        }
    }
}

/// SSD1306 over I2C. Draws the phase progress bar on the bottom page and
/// writes the text fields to the serial log once a minute.
struct Ssd1306 {
    bus: SharedBus,
    last_minute: Option<TimeOfDay>,
}

impl Ssd1306 {
    fn new(bus: SharedBus) -> Self {
        Self {
            bus,
            last_minute: None,
        }
    }

    fn command(&self, bytes: &[u8]) -> Result<(), EspError> {
        let mut frame = Vec::with_capacity(bytes.len() + 1);
        frame.push(0x00);
        frame.extend_from_slice(bytes);
        self.bus.borrow_mut().write(DISPLAY_ADDRESS, &frame, BLOCK)
    }

    fn draw_progress(&self, filled: u16) -> Result<(), EspError> {
        self.command(&[
            0x21,
            0,
            (DISPLAY_WIDTH - 1) as u8,
            0x22,
            DISPLAY_PROGRESS_PAGE,
            DISPLAY_PROGRESS_PAGE,
        ])?;

        let mut data = Vec::with_capacity(DISPLAY_WIDTH as usize + 1);
        data.push(0x40);
        data.extend((0..DISPLAY_WIDTH).map(|column| if column < filled { 0x3C } else { 0x00 }));
        self.bus.borrow_mut().write(DISPLAY_ADDRESS, &data, BLOCK)
    }
}

impl DisplayDriver for Ssd1306 {
    fn init(&mut self) -> Result<(), FatalError> {
        self.command(SSD1306_INIT)
            .map_err(|err| FatalError::unavailable(Peripheral::Display, err.to_string()))
    }

    fn render(&mut self, frame: &FrameState) {
        if let Err(err) = self.draw_progress(frame.progress_pixels(DISPLAY_WIDTH)) {
            warn!("display write failed: {err}");
        }

        if self.last_minute != Some(frame.time) {
            self.last_minute = Some(frame.time);
            let warning = if frame.show_warning_icon() { " !TEMP" } else { "" };
            info!(
                "{} {} in {:.1}C out {:.2}C{warning}",
                frame.clock_text(),
                frame.phase_label,
                frame.interior_c,
                frame.exterior_c
            );
        }
    }
}

/// Hobby servo on a 50 Hz LEDC channel.
struct Servo {
    driver: LedcDriver<'static>,
}

impl Servo {
    fn new(driver: LedcDriver<'static>) -> Self {
        Self { driver }
    }

    fn duty_for(&self, angle: u8) -> u32 {
        let angle = (angle as u32).min(SERVO_MAX_ANGLE);
        let pulse_us = SERVO_MIN_PULSE_US
            + (SERVO_MAX_PULSE_US - SERVO_MIN_PULSE_US) * angle / SERVO_MAX_ANGLE;
        self.driver.get_max_duty() * pulse_us / SERVO_PERIOD_US
    }
}

impl Actuator for Servo {
    fn init(&mut self) -> Result<(), FatalError> {
        self.driver
            .enable()
            .map_err(|err| FatalError::unavailable(Peripheral::Actuator, err.to_string()))
    }

    fn move_to(&mut self, angle: u8) {
        let duty = self.duty_for(angle);
        if let Err(err) = self.driver.set_duty(duty) {
            warn!("servo move to {angle} failed: {err}");
        }
    }
}

struct Thermistor {
    channel: ThermistorChannel,
    last_c: f32,
}

impl Thermistor {
    fn new(channel: ThermistorChannel) -> Self {
        Self {
            channel,
            last_c: 0.0,
        }
    }
}

impl TemperatureSensor for Thermistor {
    /// Averages the reads that succeeded. If none did, the previous value is
    /// reported again.
    fn read_averaged(&mut self, samples: u16) -> f32 {
        let mut average = RawAverage::default();
        for _ in 0..samples.max(1) {
            match self.channel.read_raw() {
                Ok(raw) => average.push(raw),
                Err(err) => warn!("thermistor read failed: {err}"),
            }
        }

        match average.mean() {
            Some(raw) => self.last_c = adc_to_celsius(raw),
            None => warn!("no thermistor reads succeeded, keeping {:.1} C", self.last_c),
        }
        self.last_c
    }
}

/// Beta equation. Rail readings (open or shorted probe) come back as 0 °C,
/// which the monitor treats as any other reading.
fn adc_to_celsius(raw: f32) -> f32 {
    if raw <= 0.0 || raw >= ADC_MAX {
        return 0.0;
    }
    let resistance = THERM_DIVIDER * raw / (ADC_MAX - raw);
    let inv_t = 1.0 / THERM_T25_K + (resistance / THERM_R25).ln() / THERM_BETA;
    1.0 / inv_t - 273.15
}

/// Active-low push button with the internal pull-up.
struct FeedButton {
    pin: PinDriver<'static, Gpio15, Input>,
}

impl FeedButton {
    fn new(mut pin: PinDriver<'static, Gpio15, Input>) -> anyhow::Result<Self> {
        pin.set_pull(Pull::Up)?;
        Ok(Self { pin })
    }
}

impl ButtonInput for FeedButton {
    fn is_asserted(&mut self) -> bool {
        self.pin.is_low()
    }
}

fn init_watchdog(timeout_sec: u32) -> anyhow::Result<()> {
    let config = esp_idf_svc::sys::esp_task_wdt_config_t {
        timeout_ms: timeout_sec.saturating_mul(1000),
        idle_core_mask: 0,
        trigger_panic: true,
    };
    let rc = unsafe { esp_idf_svc::sys::esp_task_wdt_init(&config) };
    if rc == esp_idf_svc::sys::ESP_OK || rc == esp_idf_svc::sys::ESP_ERR_INVALID_STATE {
        return Ok(());
    }
    Err(anyhow!("esp_task_wdt_init failed with code {}", rc))
}

fn add_current_task_to_watchdog() -> anyhow::Result<()> {
    let rc = unsafe { esp_idf_svc::sys::esp_task_wdt_add(core::ptr::null_mut()) };
    if rc == esp_idf_svc::sys::ESP_OK || rc == esp_idf_svc::sys::ESP_ERR_INVALID_STATE {
        return Ok(());
    }
    Err(anyhow!("esp_task_wdt_add failed with code {}", rc))
}

fn feed_watchdog() {
    let _ = unsafe { esp_idf_svc::sys::esp_task_wdt_reset() };
}

/// Truncated like a hardware counter; the sync driver handles the wrap.
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
