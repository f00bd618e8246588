use pump_core::{
    BoolChannel, CycleError, InterlockReason, IoError, NumericChannel, ProcessImage, ProcessIo,
    PumpController, PumpEvent, PumpState, RecordingSink, Severity, STARTUP_EXEMPT_CYCLES,
};

struct Station {
    image: ProcessImage,
    controller: PumpController,
    sink: RecordingSink,
}

impl Station {
    fn new(state: PumpState) -> Self {
        let image = ProcessImage::with_station_defaults();
        image.set_number(NumericChannel::SuctionPressure, Some(10.0));
        image.set_number(NumericChannel::DischargePressure, Some(90.0));
        image.set_number(NumericChannel::FlowRate, Some(250.0));
        image.set_number(NumericChannel::MotorTemperature, Some(100.0));
        Self {
            image,
            controller: PumpController::with_state(state),
            sink: RecordingSink::new(),
        }
    }

    fn running(count: u32) -> Self {
        Self::new(PumpState {
            running: true,
            startup_cycle_count: count,
        })
    }

    fn set(&self, channel: NumericChannel, value: f64) {
        self.image.set_number(channel, Some(value));
    }

    fn press(&self, channel: BoolChannel, value: bool) {
        self.image.set_bool(channel, Some(value));
    }

    fn cycle(&mut self) -> Result<pump_core::CycleOutcome, CycleError> {
        let mut io = self.image.clone();
        self.controller.run_cycle(&mut io, &mut self.sink)
    }

    fn output(&self) -> Option<bool> {
        self.image.read_bool(BoolChannel::PumpStateOutput)
    }

    fn messages_at(&self, severity: Severity) -> Vec<String> {
        self.sink
            .diagnostics
            .iter()
            .filter(|d| d.severity == severity)
            .map(|d| d.message.clone())
            .collect()
    }
}

#[test]
fn scenario_a_start_with_safe_readings() {
    let mut station = Station::new(PumpState::stopped());
    station.press(BoolChannel::LocalStart, true);

    let outcome = station.cycle().unwrap();

    assert_eq!(outcome.event, Some(PumpEvent::Started));
    assert_eq!(
        station.controller.state(),
        PumpState {
            running: true,
            startup_cycle_count: 0
        }
    );
    assert_eq!(station.output(), Some(true));
    assert_eq!(station.image.read_bool(BoolChannel::PumpEnabled), Some(true));

    let started = station
        .sink
        .diagnostics
        .iter()
        .find(|d| d.message == "pump started")
        .expect("start is logged");
    assert_eq!(started.get("motor_temp").and_then(|v| v.as_f64()), Some(100.0));
    assert_eq!(started.get("suction_pressure").and_then(|v| v.as_f64()), Some(10.0));
}

#[test]
fn scenario_b_startup_window_tolerates_low_suction() {
    let mut station = Station::running(0);
    station.set(NumericChannel::SuctionPressure, 2.0);

    for expected in 1..=STARTUP_EXEMPT_CYCLES {
        let outcome = station.cycle().unwrap();
        assert_eq!(outcome.event, None);
        assert!(outcome.state.running);
        assert_eq!(outcome.state.startup_cycle_count, expected);
        assert_eq!(station.output(), Some(true));
    }
}

#[test]
fn scenario_c_exemption_expires() {
    let mut station = Station::running(STARTUP_EXEMPT_CYCLES);
    station.set(NumericChannel::SuctionPressure, 3.0);

    let outcome = station.cycle().unwrap();

    assert_eq!(
        outcome.event,
        Some(PumpEvent::EmergencyStop(InterlockReason::LowSuctionPressure))
    );
    assert!(!station.controller.state().running);
    assert_eq!(station.output(), Some(false));

    let estop = station.sink.last().unwrap();
    assert_eq!(estop.severity, Severity::Error);
    assert_eq!(
        estop.get("reason").and_then(|v| v.as_str()),
        Some("low suction pressure — cavitation risk")
    );
}

#[test]
fn scenario_d_operator_stop_bypasses_interlocks() {
    let mut station = Station::running(STARTUP_EXEMPT_CYCLES);
    station.set(NumericChannel::MotorTemperature, 180.0);
    station.press(BoolChannel::LocalStop, false);

    let outcome = station.cycle().unwrap();

    assert_eq!(outcome.event, Some(PumpEvent::OperatorStop));
    assert!(!outcome.state.running);
    assert_eq!(station.output(), Some(false));
    assert!(station
        .sink
        .diagnostics
        .iter()
        .all(|d| d.get("reason").is_none()));
    assert!(station.messages_at(Severity::Error).is_empty());
}

#[test]
fn scenario_e_missing_data_leaves_state_untouched() {
    let mut station = Station::running(2);
    station.image.set_bool(BoolChannel::PumpStateOutput, Some(false));
    station.image.set_number(NumericChannel::MotorTemperature, None);
    station.image.set_number(NumericChannel::PressureSetpoint, None);

    let err = station.cycle().unwrap_err();

    assert_eq!(
        err,
        CycleError::MissingData {
            channels: vec!["motor_temperature", "pressure_setpoint"]
        }
    );
    assert_eq!(
        station.controller.state(),
        PumpState {
            running: true,
            startup_cycle_count: 2
        }
    );
    // No output write happened this cycle.
    assert_eq!(station.output(), Some(false));
    assert_eq!(station.messages_at(Severity::Error), vec!["missing required variables"]);
}

#[test]
fn missing_button_aborts_cycle() {
    let mut station = Station::new(PumpState::stopped());
    station.image.set_bool(BoolChannel::LocalStop, None);
    station.press(BoolChannel::LocalStart, true);

    assert!(station.cycle().unwrap_err().is_missing_data());
    assert_eq!(station.controller.state(), PumpState::stopped());
}

#[test]
fn missing_data_while_running_keeps_pump_running() {
    let mut station = Station::running(STARTUP_EXEMPT_CYCLES);
    station.image.set_number(NumericChannel::SuctionPressure, None);
    assert!(station.cycle().is_err());

    station.set(NumericChannel::SuctionPressure, 20.0);
    let outcome = station.cycle().unwrap();
    assert!(outcome.state.running);
}

#[test]
fn output_mirrors_state_without_transitions() {
    let mut station = Station::new(PumpState::stopped());
    station.image.set_bool(BoolChannel::PumpStateOutput, None);

    station.cycle().unwrap();
    assert_eq!(station.output(), Some(false));

    station.press(BoolChannel::LocalStart, true);
    station.cycle().unwrap();
    station.press(BoolChannel::LocalStart, false);
    for _ in 0..6 {
        let outcome = station.cycle().unwrap();
        assert_eq!(station.output(), Some(outcome.state.running));
        assert!(outcome.state.running);
    }
}

#[test]
fn rejected_start_is_a_warning() {
    let mut station = Station::new(PumpState::stopped());
    station.set(NumericChannel::MotorTemperature, 145.0);
    station.press(BoolChannel::LocalStart, true);

    let outcome = station.cycle().unwrap();

    assert_eq!(
        outcome.event,
        Some(PumpEvent::StartRejected(
            InterlockReason::MotorTemperatureCritical
        ))
    );
    assert_eq!(
        station.messages_at(Severity::Warn),
        vec!["start command rejected - safety interlock"]
    );
    assert_eq!(station.output(), Some(false));
}

#[test]
fn setpoints_are_read_fresh_each_cycle() {
    let mut station = Station::running(STARTUP_EXEMPT_CYCLES);
    station.cycle().unwrap();
    assert!(station.controller.state().running);

    station.set(NumericChannel::TemperatureSetpoint, 95.0);
    let outcome = station.cycle().unwrap();
    assert_eq!(
        outcome.event,
        Some(PumpEvent::EmergencyStop(
            InterlockReason::MotorTemperatureCritical
        ))
    );
}

#[test]
fn full_start_sequence_trips_once_window_closes() {
    let mut station = Station::new(PumpState::stopped());
    station.set(NumericChannel::SuctionPressure, 1.0);
    station.press(BoolChannel::LocalStart, true);
    station.cycle().unwrap();
    station.press(BoolChannel::LocalStart, false);

    for _ in 0..STARTUP_EXEMPT_CYCLES {
        assert!(station.cycle().unwrap().state.running);
    }
    let outcome = station.cycle().unwrap();
    assert_eq!(
        outcome.event,
        Some(PumpEvent::EmergencyStop(InterlockReason::LowSuctionPressure))
    );
}

struct FailingOutput {
    image: ProcessImage,
    failing: &'static [BoolChannel],
}

impl ProcessIo for FailingOutput {
    fn read_number(&self, channel: NumericChannel) -> Option<f64> {
        self.image.read_number(channel)
    }

    fn read_bool(&self, channel: BoolChannel) -> Option<bool> {
        self.image.read_bool(channel)
    }

    fn write_number(&mut self, channel: NumericChannel, value: f64) -> Result<(), IoError> {
        self.image.write_number(channel, value)
    }

    fn write_bool(&mut self, channel: BoolChannel, value: bool) -> Result<(), IoError> {
        if !self.failing.contains(&channel) {
            return self.image.write_bool(channel, value);
        }
        Err(IoError::WriteFailed {
            channel: channel.name(),
            reason: "coil write timed out".to_string(),
        })
    }
}

#[test]
fn write_failure_is_critical_and_does_not_commit() {
    let station = Station::new(PumpState::stopped());
    station.press(BoolChannel::LocalStart, true);
    let mut io = FailingOutput {
        image: station.image.clone(),
        failing: &[BoolChannel::PumpEnabled, BoolChannel::PumpStateOutput],
    };
    let mut controller = PumpController::new();
    let mut sink = RecordingSink::new();

    let err = controller.run_cycle(&mut io, &mut sink).unwrap_err();
    assert!(matches!(err, CycleError::Io(IoError::WriteFailed { .. })));
    assert_eq!(controller.state(), PumpState::stopped());
    assert_eq!(sink.count(Severity::Critical), 1);

    // The next cycle runs normally once the output recovers.
    let mut healthy = station.image.clone();
    let outcome = controller.run_cycle(&mut healthy, &mut sink).unwrap();
    assert_eq!(outcome.event, Some(PumpEvent::Started));
}

#[test]
fn failed_output_write_restores_pump_enabled() {
    let station = Station::new(PumpState::stopped());
    station.press(BoolChannel::LocalStart, true);
    let mut io = FailingOutput {
        image: station.image.clone(),
        failing: &[BoolChannel::PumpStateOutput],
    };
    let mut controller = PumpController::new();
    let mut sink = RecordingSink::new();

    let err = controller.run_cycle(&mut io, &mut sink).unwrap_err();
    assert!(matches!(
        err,
        CycleError::Io(IoError::WriteFailed { channel: "pump_state_output", .. })
    ));
    assert_eq!(controller.state(), PumpState::stopped());
    assert_eq!(station.image.read_bool(BoolChannel::PumpEnabled), Some(false));
    assert_eq!(station.image.read_bool(BoolChannel::PumpStateOutput), Some(false));
    assert_eq!(sink.count(Severity::Critical), 1);
}

#[test]
fn non_finite_reading_is_an_internal_fault() {
    let mut station = Station::running(STARTUP_EXEMPT_CYCLES);
    station.set(NumericChannel::MotorTemperature, f64::NAN);

    let err = station.cycle().unwrap_err();
    assert!(matches!(err, CycleError::NonFinite { channel: "motor_temperature", .. }));
    assert!(station.controller.state().running);
    assert_eq!(station.sink.count(Severity::Critical), 1);
}
