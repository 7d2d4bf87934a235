use anyhow::{anyhow, Context};
use esp_idf_hal::{
    gpio::{AnyOutputPin, OutputPin},
    peripheral::Peripheral,
    rmt::{
        config::{CarrierConfig, DutyPercent, TransmitConfig},
        PinState, Pulse, PulseTicks, RmtChannel, TxRmtDriver, VariableLengthSignal, RMT,
    },
    units::FromValueType,
};
use log::warn;

use aquarium_common::{
    config::{IrHardwareConfig, MAX_RMT_CHANNEL},
    nec,
    ports::IrTransmitter,
};

// 80 MHz APB / 80 = 1 tick per microsecond, matching the NEC timings.
const IR_TICK_DIVIDER: u8 = 80;

enum IrBackend {
    Rmt(TxRmtDriver<'static>),
    Disabled,
}

/// NEC transmitter on the RMT peripheral. Sends are fire-and-forget: a failed
/// frame is counted and logged, never retried.
pub struct RmtIrTransmitter {
    backend: IrBackend,
    address: u8,
    sent_frames: u64,
    failed_frames: u64,
}

impl RmtIrTransmitter {
    pub fn new<C, P>(
        channel: impl Peripheral<P = C> + 'static,
        pin: impl Peripheral<P = P> + 'static,
        config: &IrHardwareConfig,
    ) -> anyhow::Result<Self>
    where
        C: RmtChannel,
        P: OutputPin,
    {
        let carrier = CarrierConfig::new()
            .frequency(config.carrier_khz.kHz().into())
            .carrier_level(PinState::High)
            .duty_percent(DutyPercent::new(33)?);

        let tx_config = TransmitConfig::new()
            .clock_divider(IR_TICK_DIVIDER)
            .carrier(Some(carrier))
            .idle(Some(PinState::Low));

        let tx = TxRmtDriver::new(channel, pin, &tx_config)
            .context("failed to init RMT IR driver")?;

        Ok(Self {
            backend: IrBackend::Rmt(tx),
            address: config.nec_address,
            sent_frames: 0,
            failed_frames: 0,
        })
    }

    pub fn disabled() -> Self {
        Self {
            backend: IrBackend::Disabled,
            address: 0,
            sent_frames: 0,
            failed_frames: 0,
        }
    }

    pub fn sent_frames(&self) -> u64 {
        self.sent_frames
    }

    pub fn failed_frames(&self) -> u64 {
        self.failed_frames
    }

    fn send_raw(&mut self, raw: &[u16]) -> anyhow::Result<()> {
        let IrBackend::Rmt(tx) = &mut self.backend else {
            warn!("IR disabled, dropping frame with {} timings", raw.len());
            return Ok(());
        };

        let mut pulses = Vec::with_capacity(raw.len());
        for (index, duration) in raw.iter().enumerate() {
            let level = if index % 2 == 0 {
                PinState::High
            } else {
                PinState::Low
            };

            pulses.push(Pulse::new(
                level,
                PulseTicks::new(*duration).context("invalid IR pulse duration")?,
            ));
        }

        let pulse_refs: Vec<&Pulse> = pulses.iter().collect();
        let mut signal = VariableLengthSignal::with_capacity(pulses.len());
        signal
            .push(pulse_refs)
            .context("failed to convert IR timings to RMT signal")?;

        tx.start_blocking(&signal)
            .context("failed to transmit IR frame over RMT")?;
        self.sent_frames = self.sent_frames.saturating_add(1);
        Ok(())
    }
}

impl IrTransmitter for RmtIrTransmitter {
    fn send(&mut self, code: u8) {
        if let Err(err) = self.send_raw(&nec::encode(self.address, code)) {
            self.failed_frames = self.failed_frames.saturating_add(1);
            warn!("IR frame {code:#04x} not sent: {err:#}");
        }
    }
}

pub fn init_ir_transmitter(rmt: RMT, ir: &IrHardwareConfig) -> anyhow::Result<RmtIrTransmitter> {
    if ir.tx_pin < 0 {
        return Err(anyhow!("invalid tx pin: {}", ir.tx_pin));
    }

    let pin = ir.tx_pin;

    match ir.rmt_channel {
        0 => unsafe { RmtIrTransmitter::new(rmt.channel0, AnyOutputPin::new(pin), ir) },
        1 => unsafe { RmtIrTransmitter::new(rmt.channel1, AnyOutputPin::new(pin), ir) },
        2 => unsafe { RmtIrTransmitter::new(rmt.channel2, AnyOutputPin::new(pin), ir) },
        3 => unsafe { RmtIrTransmitter::new(rmt.channel3, AnyOutputPin::new(pin), ir) },
        _ => Err(anyhow!(
            "unsupported RMT channel: {} (max {MAX_RMT_CHANNEL})",
            ir.rmt_channel
        )),
    }
}
