//! Collaborator traits between the control core and the hardware.
//!
//! The core only ever reads and commands peripherals through these; the
//! runtime harness supplies host simulations or ESP-IDF drivers.

use crate::{display::FrameState, error::FatalError, types::TimeOfDay};

/// Battery-backed wall clock.
pub trait ClockSource {
    fn init(&mut self) -> Result<(), FatalError> {
        Ok(())
    }

    fn now(&mut self) -> TimeOfDay;

    /// True when the backup battery failed and the time is meaningless.
    fn lost_power(&mut self) -> bool {
        false
    }

    fn adjust(&mut self, _time: TimeOfDay) {}

    /// Die temperature of the clock chip, used as the exterior reading.
    fn ambient_temperature_c(&mut self) -> f32;
}

/// Averaged, blocking read. A stuck or disconnected sensor is not signalled.
pub trait TemperatureSensor {
    fn read_averaged(&mut self, samples: u16) -> f32;
}

/// Daily hardware alarm. Stays fired until cleared.
pub trait AlarmSource {
    fn arm_daily(&mut self, _hour: u8, _minute: u8) {}

    fn fired(&mut self) -> bool;

    fn clear(&mut self);
}

/// Level-sensed input.
pub trait ButtonInput {
    fn is_asserted(&mut self) -> bool;
}

/// Positional actuator driving the feeder. Moves block and report nothing.
pub trait Actuator {
    fn init(&mut self) -> Result<(), FatalError> {
        Ok(())
    }

    fn move_to(&mut self, angle: u8);
}

/// One-way IR link; delivery is never confirmed.
pub trait IrTransmitter {
    fn send(&mut self, code: u8);
}

pub trait DisplayDriver {
    fn init(&mut self) -> Result<(), FatalError> {
        Ok(())
    }

    fn render(&mut self, frame: &FrameState);
}
