pub mod control_loop;
pub mod diagnostics;
pub mod hal;
#[cfg(feature = "simulation")]
pub mod hal_sim;
pub mod image;
pub mod interlock;
pub mod monitor;
pub mod pump;
pub mod scaling;
pub mod sensors;
pub mod tags;

pub use control_loop::{CycleStatus, ExecutionStats, ScanConfig, ScanLoop};
pub use diagnostics::{Diagnostic, DiagnosticSink, LogSink, RecordingSink, Severity};
pub use hal::{BoolChannel, IoError, NumericChannel, ProcessIo};
#[cfg(feature = "simulation")]
pub use hal_sim::SimulatedStation;
pub use image::ProcessImage;
pub use interlock::{InterlockReason, InterlockResult};
pub use monitor::SensorMonitor;
pub use pump::{
    ControlInputs, CycleError, CycleOutcome, PumpController, PumpEvent, PumpState,
    STARTUP_EXEMPT_CYCLES,
};
pub use scaling::{scale, ScalingConfig};
pub use sensors::{SensorChannel, SensorReadings, ValidationReport};
