use crate::{
    error::ConfigError,
    schedule::{validate_tiling, Bracket, PhaseWindow},
    types::{IrCommand, LightingPhase},
};

const MAX_ACTUATOR_ANGLE: u8 = 180;

/// Highest RMT channel the transmitter can be bound to.
pub const MAX_RMT_CHANNEL: u8 = 3;

#[derive(Debug, Clone, PartialEq)]
pub struct LightingConfig {
    pub phases: Vec<PhaseWindow>,
    pub brackets: Vec<Bracket>,
}

impl Default for LightingConfig {
    fn default() -> Self {
        let phase = |start_hour, end_hour, phase| PhaseWindow {
            start_hour,
            end_hour,
            phase,
        };

        Self {
            phases: vec![
                phase(0, 8, LightingPhase::Off),
                phase(8, 10, LightingPhase::Sunrise),
                phase(10, 12, LightingPhase::Noon),
                phase(12, 18, LightingPhase::Off),
                phase(18, 20, LightingPhase::Evening),
                phase(20, 22, LightingPhase::Neon),
                phase(22, 24, LightingPhase::Off),
            ],
            brackets: vec![
                Bracket::new(0, 8),
                Bracket::new(8, 9),
                Bracket::new(9, 10),
                Bracket::new(10, 12),
                Bracket::new(12, 15),
                Bracket::new(15, 18),
                Bracket::new(18, 20),
                Bracket::new(20, 22),
                Bracket::new(22, 24),
            ],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncConfig {
    pub interval_ms: u32,
    pub wake_settle_ms: u32,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            interval_ms: 10_000,
            wake_settle_ms: 300,
        }
    }
}

/// Command bytes understood by the light fixture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IrCodes {
    pub wake: u8,
    pub off: u8,
    pub sunrise: u8,
    pub noon: u8,
    pub evening: u8,
    pub neon: u8,
}

impl Default for IrCodes {
    fn default() -> Self {
        Self {
            wake: 0x01,
            off: 0x02,
            sunrise: 0x10,
            noon: 0x11,
            evening: 0x12,
            neon: 0x13,
        }
    }
}

impl IrCodes {
    pub fn code(&self, command: IrCommand) -> u8 {
        match command {
            IrCommand::Wake => self.wake,
            IrCommand::Phase(LightingPhase::Off) => self.off,
            IrCommand::Phase(LightingPhase::Sunrise) => self.sunrise,
            IrCommand::Phase(LightingPhase::Noon) => self.noon,
            IrCommand::Phase(LightingPhase::Evening) => self.evening,
            IrCommand::Phase(LightingPhase::Neon) => self.neon,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ButtonTrigger {
    /// Feeds on every tick the button is held.
    #[default]
    Level,
    /// Feeds once per press.
    Edge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedConfig {
    pub feed_hour: u8,
    pub feed_angle: u8,
    pub rest_angle: u8,
    pub hold_ms: u32,
    pub button_trigger: ButtonTrigger,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            feed_hour: 9,
            feed_angle: 90,
            rest_angle: 0,
            hold_ms: 250,
            button_trigger: ButtonTrigger::Level,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TemperatureConfig {
    pub comfort_min_c: f32,
    pub comfort_max_c: f32,
    pub samples: u16,
}

impl Default for TemperatureConfig {
    fn default() -> Self {
        Self {
            comfort_min_c: 24.0,
            comfort_max_c: 28.0,
            samples: 50,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ControllerConfig {
    pub lighting: LightingConfig,
    pub sync: SyncConfig,
    pub ir_codes: IrCodes,
    pub feed: FeedConfig,
    pub temperature: TemperatureConfig,
    pub tick_period_ms: u32,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            lighting: LightingConfig::default(),
            sync: SyncConfig::default(),
            ir_codes: IrCodes::default(),
            feed: FeedConfig::default(),
            temperature: TemperatureConfig::default(),
            tick_period_ms: 1_000,
        }
    }
}

impl ControllerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_tiling("phase", &self.lighting.phases)?;
        validate_tiling("bracket", &self.lighting.brackets)?;

        if self.sync.interval_ms == 0 {
            return Err(ConfigError::ZeroDuration("sync interval"));
        }
        if self.tick_period_ms == 0 {
            return Err(ConfigError::ZeroDuration("tick period"));
        }
        if self.feed.hold_ms == 0 {
            return Err(ConfigError::ZeroDuration("feed hold"));
        }
        if self.feed.feed_hour >= 24 {
            return Err(ConfigError::InvalidFeedHour(self.feed.feed_hour));
        }
        for angle in [self.feed.feed_angle, self.feed.rest_angle] {
            if angle > MAX_ACTUATOR_ANGLE {
                return Err(ConfigError::InvalidAngle(angle));
            }
        }

        let band = &self.temperature;
        if !band.comfort_min_c.is_finite()
            || !band.comfort_max_c.is_finite()
            || band.comfort_min_c >= band.comfort_max_c
        {
            return Err(ConfigError::InvalidComfortBand {
                min_c: band.comfort_min_c,
                max_c: band.comfort_max_c,
            });
        }
        if band.samples == 0 {
            return Err(ConfigError::ZeroSamples);
        }

        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IrHardwareConfig {
    pub tx_pin: i32,
    pub rmt_channel: u8,
    pub carrier_khz: u32,
    pub nec_address: u8,
}

impl Default for IrHardwareConfig {
    fn default() -> Self {
        Self {
            tx_pin: 4,
            rmt_channel: 0,
            carrier_khz: 38,
            nec_address: 0x00,
        }
    }
}

impl IrHardwareConfig {
    pub fn sanitize(&mut self) {
        if self.tx_pin < 0 {
            self.tx_pin = 4;
        }

        if self.rmt_channel > MAX_RMT_CHANNEL {
            self.rmt_channel = 0;
        }

        self.carrier_khz = self.carrier_khz.clamp(30, 56);
    }
}
