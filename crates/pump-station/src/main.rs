//! Pump station controller.
//!
//! Runs the sensor monitor and pump control scan tasks against either the
//! built-in station simulator or Modbus TCP remote I/O.

mod infra;
mod runtime;

use std::process::ExitCode;

fn main() -> ExitCode {
    runtime::run_from_args()
}
