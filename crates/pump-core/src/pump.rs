//! Start/stop state machine for a single pump.
//!
//! One call to [`PumpController::run_cycle`] is one control scan. The cycle
//! either completes, committing at most one transition followed by the output
//! writes, or aborts and leaves [`PumpState`] exactly as it was.

use crate::diagnostics::{Diagnostic, DiagnosticSink, Severity};
use crate::hal::{BoolChannel, IoError, NumericChannel, ProcessIo};
use crate::interlock::{self, InterlockReason};
use serde_json::Value;
use thiserror::Error;

pub const SOURCE: &str = "pump-control";

/// Control cycles after a start during which low suction pressure is tolerated.
pub const STARTUP_EXEMPT_CYCLES: u32 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PumpState {
    pub running: bool,
    /// Only meaningful while `running`.
    pub startup_cycle_count: u32,
}

impl PumpState {
    pub fn stopped() -> Self {
        Self::default()
    }

    pub fn in_startup_phase(&self) -> bool {
        self.running && self.startup_cycle_count < STARTUP_EXEMPT_CYCLES
    }
}

/// Every value a control scan needs, already checked for presence.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlInputs {
    pub motor_temp: f64,
    pub suction_pressure: f64,
    pub temp_setpoint: f64,
    pub pressure_setpoint: f64,
    pub start: bool,
    pub stop: bool,
    pub discharge_pressure: Option<f64>,
    pub flow_rate: Option<f64>,
}

impl ControlInputs {
    /// Read the required channels once. Every absent channel is named in the
    /// error, not just the first.
    pub fn gather<IO: ProcessIo + ?Sized>(io: &IO) -> Result<Self, CycleError> {
        let mut missing = Vec::new();

        let mut number = |channel: NumericChannel| {
            let value = io.read_number(channel);
            if value.is_none() {
                missing.push(channel.name());
            }
            value
        };
        let motor_temp = number(NumericChannel::MotorTemperature);
        let suction_pressure = number(NumericChannel::SuctionPressure);
        let temp_setpoint = number(NumericChannel::TemperatureSetpoint);
        let pressure_setpoint = number(NumericChannel::PressureSetpoint);

        let mut flag = |channel: BoolChannel| {
            let value = io.read_bool(channel);
            if value.is_none() {
                missing.push(channel.name());
            }
            value
        };
        let start = flag(BoolChannel::LocalStart);
        let stop = flag(BoolChannel::LocalStop);

        match (
            motor_temp,
            suction_pressure,
            temp_setpoint,
            pressure_setpoint,
            start,
            stop,
        ) {
            (
                Some(motor_temp),
                Some(suction_pressure),
                Some(temp_setpoint),
                Some(pressure_setpoint),
                Some(start),
                Some(stop),
            ) => {
                let inputs = Self {
                    motor_temp,
                    suction_pressure,
                    temp_setpoint,
                    pressure_setpoint,
                    start,
                    stop,
                    discharge_pressure: io.read_number(NumericChannel::DischargePressure),
                    flow_rate: io.read_number(NumericChannel::FlowRate),
                };
                inputs.check_finite()?;
                Ok(inputs)
            }
            _ => Err(CycleError::MissingData { channels: missing }),
        }
    }

    fn check_finite(&self) -> Result<(), CycleError> {
        let required = [
            (NumericChannel::MotorTemperature, self.motor_temp),
            (NumericChannel::SuctionPressure, self.suction_pressure),
            (NumericChannel::TemperatureSetpoint, self.temp_setpoint),
            (NumericChannel::PressureSetpoint, self.pressure_setpoint),
        ];
        for (channel, value) in required {
            if !value.is_finite() {
                return Err(CycleError::NonFinite {
                    channel: channel.name(),
                    value,
                });
            }
        }
        Ok(())
    }

    fn annotate(&self, diagnostic: Diagnostic) -> Diagnostic {
        diagnostic
            .with("motor_temp", self.motor_temp)
            .with("suction_pressure", self.suction_pressure)
            .with("temp_setpoint", self.temp_setpoint)
            .with("pressure_setpoint", self.pressure_setpoint)
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CycleError {
    #[error("missing required inputs: {}", .channels.join(", "))]
    MissingData { channels: Vec<&'static str> },
    #[error("non-finite value {value} on {channel}")]
    NonFinite { channel: &'static str, value: f64 },
    #[error("output write failed: {0}")]
    Io(#[from] IoError),
}

impl CycleError {
    pub fn is_missing_data(&self) -> bool {
        matches!(self, Self::MissingData { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PumpEvent {
    Started,
    StartRejected(InterlockReason),
    OperatorStop,
    EmergencyStop(InterlockReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    pub next: PumpState,
    pub event: Option<PumpEvent>,
    /// Set when this cycle advanced the startup counter.
    pub startup_progress: Option<u32>,
}

/// Pure transition function for one control scan.
pub fn decide(state: PumpState, inputs: &ControlInputs) -> Decision {
    if !state.running {
        if !inputs.start {
            return Decision {
                next: state,
                event: None,
                startup_progress: None,
            };
        }

        // A fresh start never waits on suction pressure.
        let check = interlock::evaluate(
            inputs.motor_temp,
            inputs.suction_pressure,
            inputs.temp_setpoint,
            inputs.pressure_setpoint,
            true,
        );
        return match check.reason {
            None => Decision {
                next: PumpState {
                    running: true,
                    startup_cycle_count: 0,
                },
                event: Some(PumpEvent::Started),
                startup_progress: None,
            },
            Some(reason) => Decision {
                next: state,
                event: Some(PumpEvent::StartRejected(reason)),
                startup_progress: None,
            },
        };
    }

    let in_startup = state.startup_cycle_count < STARTUP_EXEMPT_CYCLES;
    let mut next = state;
    let mut startup_progress = None;
    if in_startup {
        next.startup_cycle_count += 1;
        startup_progress = Some(next.startup_cycle_count);
    }

    // NC stop button: false means pressed. Operator stop skips interlocks.
    if !inputs.stop {
        next.running = false;
        return Decision {
            next,
            event: Some(PumpEvent::OperatorStop),
            startup_progress,
        };
    }

    let check = interlock::evaluate(
        inputs.motor_temp,
        inputs.suction_pressure,
        inputs.temp_setpoint,
        inputs.pressure_setpoint,
        in_startup,
    );
    let event = check.reason.map(|reason| {
        next.running = false;
        PumpEvent::EmergencyStop(reason)
    });

    Decision {
        next,
        event,
        startup_progress,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleOutcome {
    pub state: PumpState,
    pub event: Option<PumpEvent>,
}

/// Owns the pump state between scans. One controller per pump.
#[derive(Debug, Clone, Default)]
pub struct PumpController {
    state: PumpState,
    initialized: bool,
}

impl PumpController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_state(state: PumpState) -> Self {
        Self {
            state,
            initialized: false,
        }
    }

    pub fn state(&self) -> PumpState {
        self.state
    }

    /// Run one control scan. Errors have already been reported to `sink` when
    /// this returns; they are handed back so the caller can count them.
    pub fn run_cycle<IO, S>(&mut self, io: &mut IO, sink: &mut S) -> Result<CycleOutcome, CycleError>
    where
        IO: ProcessIo + ?Sized,
        S: DiagnosticSink + ?Sized,
    {
        if !self.initialized {
            sink.emit(
                Diagnostic::new(SOURCE, Severity::Info, "pump control task initialized")
                    .with("startup_exempt_cycles", STARTUP_EXEMPT_CYCLES),
            );
            self.initialized = true;
        }

        match self.step(io, sink) {
            Ok(outcome) => Ok(outcome),
            Err(err) => {
                sink.emit(self.fault_diagnostic(&err, &*io));
                Err(err)
            }
        }
    }

    fn step<IO, S>(&mut self, io: &mut IO, sink: &mut S) -> Result<CycleOutcome, CycleError>
    where
        IO: ProcessIo + ?Sized,
        S: DiagnosticSink + ?Sized,
    {
        let inputs = ControlInputs::gather(&*io)?;
        let decision = decide(self.state, &inputs);

        io.write_bool(BoolChannel::PumpEnabled, decision.next.running)?;
        if let Err(err) = io.write_bool(BoolChannel::PumpStateOutput, decision.next.running) {
            // An aborted cycle leaves both outputs at the committed state.
            let _ = io.write_bool(BoolChannel::PumpEnabled, self.state.running);
            return Err(err.into());
        }
        self.state = decision.next;

        if let Some(count) = decision.startup_progress {
            sink.emit(
                Diagnostic::new(
                    SOURCE,
                    Severity::Debug,
                    format!(
                        "pump starting, waiting for pressure buildup ({count}/{STARTUP_EXEMPT_CYCLES} cycles)"
                    ),
                )
                .with("startup_cycle_count", count),
            );
        }
        if let Some(event) = decision.event {
            sink.emit(event_diagnostic(event, &inputs));
        }

        Ok(CycleOutcome {
            state: self.state,
            event: decision.event,
        })
    }

    fn fault_diagnostic<IO: ProcessIo + ?Sized>(&self, err: &CycleError, io: &IO) -> Diagnostic {
        match err {
            CycleError::MissingData { channels } => {
                let mut diag =
                    Diagnostic::new(SOURCE, Severity::Error, "missing required variables")
                        .with("missing", channels.clone());
                for channel in NumericChannel::ALL {
                    diag = diag.with(
                        channel.name(),
                        io.read_number(channel).map_or(Value::Null, Value::from),
                    );
                }
                for channel in [BoolChannel::LocalStart, BoolChannel::LocalStop] {
                    diag = diag.with(
                        channel.name(),
                        io.read_bool(channel).map_or(Value::Null, Value::from),
                    );
                }
                diag.with("running", self.state.running)
            }
            other => Diagnostic::new(SOURCE, Severity::Critical, "pump control cycle fault")
                .with("error", other.to_string())
                .with("running", self.state.running),
        }
    }
}

fn event_diagnostic(event: PumpEvent, inputs: &ControlInputs) -> Diagnostic {
    match event {
        PumpEvent::Started => {
            inputs.annotate(Diagnostic::new(SOURCE, Severity::Info, "pump started"))
        }
        PumpEvent::StartRejected(reason) => inputs.annotate(
            Diagnostic::new(SOURCE, Severity::Warn, "start command rejected - safety interlock")
                .with("reason", reason.as_str()),
        ),
        PumpEvent::OperatorStop => {
            Diagnostic::new(SOURCE, Severity::Info, "pump stopped by operator")
        }
        PumpEvent::EmergencyStop(reason) => inputs.annotate(
            Diagnostic::new(SOURCE, Severity::Error, "emergency stop - safety interlock")
                .with("reason", reason.as_str()),
        ),
    }
}

impl From<PumpEvent> for Value {
    fn from(event: PumpEvent) -> Self {
        let (kind, reason) = match event {
            PumpEvent::Started => ("started", None),
            PumpEvent::StartRejected(r) => ("start_rejected", Some(r)),
            PumpEvent::OperatorStop => ("operator_stop", None),
            PumpEvent::EmergencyStop(r) => ("emergency_stop", Some(r)),
        };
        serde_json::json!({ "event": kind, "reason": reason.map(InterlockReason::as_str) })
    }
}
