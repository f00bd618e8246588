//! Typed access to the process variables the control logic reads and writes.

use crate::tags::{self, Tag};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NumericChannel {
    SuctionPressure,
    DischargePressure,
    FlowRate,
    MotorTemperature,
    TemperatureSetpoint,
    PressureSetpoint,
}

impl NumericChannel {
    pub const ALL: [NumericChannel; 6] = [
        NumericChannel::SuctionPressure,
        NumericChannel::DischargePressure,
        NumericChannel::FlowRate,
        NumericChannel::MotorTemperature,
        NumericChannel::TemperatureSetpoint,
        NumericChannel::PressureSetpoint,
    ];

    pub fn tag(self) -> &'static Tag {
        match self {
            Self::SuctionPressure => &tags::SUCTION_PRESSURE,
            Self::DischargePressure => &tags::DISCHARGE_PRESSURE,
            Self::FlowRate => &tags::FLOW_RATE,
            Self::MotorTemperature => &tags::MOTOR_TEMPERATURE,
            Self::TemperatureSetpoint => &tags::TEMPERATURE_SETPOINT,
            Self::PressureSetpoint => &tags::PRESSURE_SETPOINT,
        }
    }

    pub fn name(self) -> &'static str {
        self.tag().key
    }

    /// Field inputs are driven by the acquisition layer, never by control logic.
    pub fn is_field_input(self) -> bool {
        !matches!(self, Self::TemperatureSetpoint | Self::PressureSetpoint)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BoolChannel {
    LocalStart,
    LocalStop,
    PumpEnabled,
    PumpStateOutput,
}

impl BoolChannel {
    pub const ALL: [BoolChannel; 4] = [
        BoolChannel::LocalStart,
        BoolChannel::LocalStop,
        BoolChannel::PumpEnabled,
        BoolChannel::PumpStateOutput,
    ];

    pub fn tag(self) -> &'static Tag {
        match self {
            Self::LocalStart => &tags::LOCAL_START,
            Self::LocalStop => &tags::LOCAL_STOP,
            Self::PumpEnabled => &tags::PUMP_ENABLED,
            Self::PumpStateOutput => &tags::PUMP_STATE_OUTPUT,
        }
    }

    pub fn name(self) -> &'static str {
        self.tag().key
    }

    pub fn is_field_input(self) -> bool {
        matches!(self, Self::LocalStart | Self::LocalStop)
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum IoError {
    #[error("channel {0} is a field input and cannot be written")]
    ReadOnly(&'static str),
    #[error("write to {channel} failed: {reason}")]
    WriteFailed {
        channel: &'static str,
        reason: String,
    },
}

/// Capability interface handed to each scan cycle.
///
/// Reads return `None` when the runtime has no current value for the channel.
/// A successful write is visible to the next read from any holder.
pub trait ProcessIo {
    fn read_number(&self, channel: NumericChannel) -> Option<f64>;
    fn read_bool(&self, channel: BoolChannel) -> Option<bool>;
    fn write_number(&mut self, channel: NumericChannel, value: f64) -> Result<(), IoError>;
    fn write_bool(&mut self, channel: BoolChannel, value: bool) -> Result<(), IoError>;
}
