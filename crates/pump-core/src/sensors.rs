//! Field sensor channels and the per-cycle presence/range check.

use crate::diagnostics::{Diagnostic, DiagnosticSink, Severity};
use crate::hal::{NumericChannel, ProcessIo};
use crate::scaling::ScalingConfig;

/// Raw count span of the station's analog input registers.
pub const RAW_FULL_SCALE: f64 = 32000.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SensorChannel {
    SuctionPressure,
    DischargePressure,
    FlowRate,
    MotorTemperature,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorRange {
    pub min: f64,
    pub max: f64,
    pub units: &'static str,
}

impl SensorRange {
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }

    pub fn describe(&self) -> String {
        format!("{}-{} {}", self.min, self.max, self.units)
    }
}

impl SensorChannel {
    pub const ALL: [SensorChannel; 4] = [
        SensorChannel::SuctionPressure,
        SensorChannel::DischargePressure,
        SensorChannel::FlowRate,
        SensorChannel::MotorTemperature,
    ];

    pub fn numeric(self) -> NumericChannel {
        match self {
            Self::SuctionPressure => NumericChannel::SuctionPressure,
            Self::DischargePressure => NumericChannel::DischargePressure,
            Self::FlowRate => NumericChannel::FlowRate,
            Self::MotorTemperature => NumericChannel::MotorTemperature,
        }
    }

    pub fn name(self) -> &'static str {
        self.numeric().name()
    }

    pub fn range(self) -> SensorRange {
        let units = self.numeric().tag().units;
        let (min, max) = match self {
            Self::SuctionPressure => (0.0, 100.0),
            Self::DischargePressure => (0.0, 200.0),
            Self::FlowRate => (0.0, 500.0),
            Self::MotorTemperature => (50.0, 150.0),
        };
        SensorRange { min, max, units }
    }

    /// Transmitters span the full declared range over raw 0..32000.
    pub fn scaling(self) -> ScalingConfig {
        let range = self.range();
        ScalingConfig::new(0.0, RAW_FULL_SCALE, range.min, range.max)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SensorReadings {
    pub suction_pressure: Option<f64>,
    pub discharge_pressure: Option<f64>,
    pub flow_rate: Option<f64>,
    pub motor_temperature: Option<f64>,
}

impl SensorReadings {
    pub fn read<IO: ProcessIo + ?Sized>(io: &IO) -> Self {
        Self {
            suction_pressure: io.read_number(NumericChannel::SuctionPressure),
            discharge_pressure: io.read_number(NumericChannel::DischargePressure),
            flow_rate: io.read_number(NumericChannel::FlowRate),
            motor_temperature: io.read_number(NumericChannel::MotorTemperature),
        }
    }

    pub fn get(&self, channel: SensorChannel) -> Option<f64> {
        match channel {
            SensorChannel::SuctionPressure => self.suction_pressure,
            SensorChannel::DischargePressure => self.discharge_pressure,
            SensorChannel::FlowRate => self.flow_rate,
            SensorChannel::MotorTemperature => self.motor_temperature,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationReport {
    pub missing: Vec<SensorChannel>,
    pub out_of_range: Vec<SensorChannel>,
}

impl ValidationReport {
    pub fn is_clean(&self) -> bool {
        self.missing.is_empty() && self.out_of_range.is_empty()
    }
}

/// Checks every channel independently; a failed channel never stops the
/// others from being checked. Findings are advisory only.
pub fn validate<S: DiagnosticSink + ?Sized>(
    source: &'static str,
    readings: &SensorReadings,
    sink: &mut S,
) -> ValidationReport {
    let mut report = ValidationReport::default();

    for channel in SensorChannel::ALL {
        let value = match readings.get(channel) {
            Some(value) => value,
            None => {
                sink.emit(
                    Diagnostic::new(
                        source,
                        Severity::Error,
                        format!("failed to read sensor {}", channel.name()),
                    )
                    .with("sensor", channel.name())
                    .with("error", "value is absent"),
                );
                report.missing.push(channel);
                continue;
            }
        };

        let range = channel.range();
        if !range.contains(value) {
            sink.emit(
                Diagnostic::new(source, Severity::Warn, "sensor value out of expected range")
                    .with("sensor", channel.name())
                    .with("value", value)
                    .with("expected", range.describe()),
            );
            report.out_of_range.push(channel);
        }
    }

    report
}
