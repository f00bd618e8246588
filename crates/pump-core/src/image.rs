//! In-memory process image shared between the acquisition side and the scan
//! tasks.
//!
//! Cloning a [`ProcessImage`] hands out another handle to the same table. A
//! write through any handle is visible to the next read through every handle.

use crate::hal::{BoolChannel, IoError, NumericChannel, ProcessIo};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

pub const DEFAULT_TEMPERATURE_SETPOINT: f64 = 145.0;
pub const DEFAULT_PRESSURE_SETPOINT: f64 = 5.0;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ImageSnapshot {
    pub numbers: [Option<f64>; 6],
    pub bools: [Option<bool>; 4],
}

impl ImageSnapshot {
    pub fn number(&self, channel: NumericChannel) -> Option<f64> {
        self.numbers[numeric_slot(channel)]
    }

    pub fn flag(&self, channel: BoolChannel) -> Option<bool> {
        self.bools[bool_slot(channel)]
    }
}

fn numeric_slot(channel: NumericChannel) -> usize {
    match channel {
        NumericChannel::SuctionPressure => 0,
        NumericChannel::DischargePressure => 1,
        NumericChannel::FlowRate => 2,
        NumericChannel::MotorTemperature => 3,
        NumericChannel::TemperatureSetpoint => 4,
        NumericChannel::PressureSetpoint => 5,
    }
}

fn bool_slot(channel: BoolChannel) -> usize {
    match channel {
        BoolChannel::LocalStart => 0,
        BoolChannel::LocalStop => 1,
        BoolChannel::PumpEnabled => 2,
        BoolChannel::PumpStateOutput => 3,
    }
}

#[derive(Debug, Clone, Default)]
pub struct ProcessImage {
    inner: Arc<RwLock<ImageSnapshot>>,
}

impl ProcessImage {
    /// Every channel absent.
    pub fn new() -> Self {
        Self::default()
    }

    /// Buttons released, pump off, setpoints at their defaults. Sensors stay
    /// absent until the first acquisition.
    pub fn with_station_defaults() -> Self {
        Self::with_setpoints(DEFAULT_TEMPERATURE_SETPOINT, DEFAULT_PRESSURE_SETPOINT)
    }

    pub fn with_setpoints(temperature: f64, pressure: f64) -> Self {
        let image = Self::new();
        image.set_bool(BoolChannel::LocalStop, Some(true));
        image.set_bool(BoolChannel::LocalStart, Some(false));
        image.set_bool(BoolChannel::PumpEnabled, Some(false));
        image.set_bool(BoolChannel::PumpStateOutput, Some(false));
        image.set_number(NumericChannel::TemperatureSetpoint, Some(temperature));
        image.set_number(NumericChannel::PressureSetpoint, Some(pressure));
        image
    }

    /// Acquisition-side update; bypasses the field-input write guard.
    pub fn set_number(&self, channel: NumericChannel, value: Option<f64>) {
        self.write_guard().numbers[numeric_slot(channel)] = value;
    }

    pub fn set_bool(&self, channel: BoolChannel, value: Option<bool>) {
        self.write_guard().bools[bool_slot(channel)] = value;
    }

    pub fn snapshot(&self) -> ImageSnapshot {
        *self.read_guard()
    }

    fn read_guard(&self) -> RwLockReadGuard<'_, ImageSnapshot> {
        // Values are plain data; a panicked writer cannot leave them torn.
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_guard(&self) -> RwLockWriteGuard<'_, ImageSnapshot> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ProcessIo for ProcessImage {
    fn read_number(&self, channel: NumericChannel) -> Option<f64> {
        self.read_guard().number(channel)
    }

    fn read_bool(&self, channel: BoolChannel) -> Option<bool> {
        self.read_guard().flag(channel)
    }

    fn write_number(&mut self, channel: NumericChannel, value: f64) -> Result<(), IoError> {
        if channel.is_field_input() {
            return Err(IoError::ReadOnly(channel.name()));
        }
        self.set_number(channel, Some(value));
        Ok(())
    }

    fn write_bool(&mut self, channel: BoolChannel, value: bool) -> Result<(), IoError> {
        if channel.is_field_input() {
            return Err(IoError::ReadOnly(channel.name()));
        }
        self.set_bool(channel, Some(value));
        Ok(())
    }
}
