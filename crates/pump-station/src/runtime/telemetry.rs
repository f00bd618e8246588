use pump_core::{
    BoolChannel, CycleError, CycleOutcome, NumericChannel, ProcessImage, PumpEvent,
    ValidationReport,
};
use pump_io::metrics::{
    init_metrics, serve_metrics, CONTROL_CYCLES, DISCHARGE_PRESSURE, EMERGENCY_STOPS, FLOW_RATE,
    INTERNAL_FAULTS, MISSING_DATA_CYCLES, MONITOR_CYCLES, MOTOR_TEMPERATURE, OPERATOR_STOPS,
    OUT_OF_RANGE_READINGS, PRESSURE_SETPOINT, PUMP_RUNNING, PUMP_STARTS, SENSOR_READ_FAILURES,
    START_REJECTIONS, SUCTION_PRESSURE, TEMPERATURE_SETPOINT,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::info;

const SAMPLE_PERIOD: Duration = Duration::from_millis(200);

pub fn init() {
    init_metrics();
}

pub fn start_metrics_server(addr: &Option<String>) -> Option<thread::JoinHandle<()>> {
    addr.as_ref().map(|addr| {
        info!(addr = %addr, "Starting metrics server");
        serve_metrics(addr.clone())
    })
}

/// Periodically copy process values from the image into the gauges.
/// Absent channels read as NaN so dashboards show a gap instead of a stale value.
pub fn start_metrics_updater(image: ProcessImage, stop: Arc<AtomicBool>) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let gauges = [
            (&*SUCTION_PRESSURE, NumericChannel::SuctionPressure),
            (&*DISCHARGE_PRESSURE, NumericChannel::DischargePressure),
            (&*FLOW_RATE, NumericChannel::FlowRate),
            (&*MOTOR_TEMPERATURE, NumericChannel::MotorTemperature),
            (&*TEMPERATURE_SETPOINT, NumericChannel::TemperatureSetpoint),
            (&*PRESSURE_SETPOINT, NumericChannel::PressureSetpoint),
        ];

        while !stop.load(Ordering::Relaxed) {
            let snapshot = image.snapshot();
            for (gauge, channel) in &gauges {
                gauge.set(snapshot.number(*channel).unwrap_or(f64::NAN));
            }
            let running = snapshot.flag(BoolChannel::PumpEnabled).unwrap_or(false);
            PUMP_RUNNING.set(if running { 1.0 } else { 0.0 });

            thread::sleep(SAMPLE_PERIOD);
        }
    })
}

pub fn record_control(result: &Result<CycleOutcome, CycleError>) {
    CONTROL_CYCLES.inc();
    match result {
        Ok(outcome) => match outcome.event {
            Some(PumpEvent::Started) => PUMP_STARTS.inc(),
            Some(PumpEvent::StartRejected(_)) => START_REJECTIONS.inc(),
            Some(PumpEvent::OperatorStop) => OPERATOR_STOPS.inc(),
            Some(PumpEvent::EmergencyStop(_)) => EMERGENCY_STOPS.inc(),
            None => {}
        },
        Err(err) if err.is_missing_data() => MISSING_DATA_CYCLES.inc(),
        Err(_) => INTERNAL_FAULTS.inc(),
    }
}

pub fn record_monitor(report: &ValidationReport) {
    MONITOR_CYCLES.inc();
    SENSOR_READ_FAILURES.inc_by(report.missing.len() as u64);
    OUT_OF_RANGE_READINGS.inc_by(report.out_of_range.len() as u64);
}
