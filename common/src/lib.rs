pub mod config;
pub mod display;
pub mod engine;
pub mod error;
pub mod feed;
pub mod lighting;
pub mod nec;
pub mod ports;
pub mod schedule;
pub mod sync;
pub mod temperature;
pub mod types;

pub use config::{ButtonTrigger, ControllerConfig, IrCodes, IrHardwareConfig, LightingConfig};
pub use display::{Blink, FrameState};
pub use engine::{AquariumEngine, Inputs, Outputs, StartupReport, TickInputs, TickOutcome};
pub use error::{ConfigError, FatalError, Peripheral, TimeError};
pub use feed::FeedScheduler;
pub use lighting::LightingScheduler;
pub use schedule::{Bracket, BracketTable, PhaseTable, PhaseWindow};
pub use sync::{IrSyncDriver, SyncDiagnostics, SyncState};
pub use temperature::{RawAverage, TemperatureMonitor};
pub use types::{Action, FeedTrigger, IrCommand, LightingPhase, TemperatureReadings, TimeOfDay};
