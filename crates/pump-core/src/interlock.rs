use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InterlockReason {
    MotorTemperatureCritical,
    LowSuctionPressure,
}

impl InterlockReason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::MotorTemperatureCritical => "motor temperature critical",
            Self::LowSuctionPressure => "low suction pressure — cavitation risk",
        }
    }
}

impl fmt::Display for InterlockReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InterlockResult {
    pub safe: bool,
    pub reason: Option<InterlockReason>,
}

impl InterlockResult {
    pub fn safe() -> Self {
        Self {
            safe: true,
            reason: None,
        }
    }

    pub fn tripped(reason: InterlockReason) -> Self {
        Self {
            safe: false,
            reason: Some(reason),
        }
    }
}

/// Decide whether starting or continuing operation is safe.
///
/// The temperature interlock is always active. The suction pressure interlock
/// is skipped when `pressure_exempt` is set. The first failing check wins.
pub fn evaluate(
    motor_temp: f64,
    suction_pressure: f64,
    temp_setpoint: f64,
    pressure_setpoint: f64,
    pressure_exempt: bool,
) -> InterlockResult {
    if motor_temp >= temp_setpoint {
        return InterlockResult::tripped(InterlockReason::MotorTemperatureCritical);
    }

    if !pressure_exempt && suction_pressure <= pressure_setpoint {
        return InterlockResult::tripped(InterlockReason::LowSuctionPressure);
    }

    InterlockResult::safe()
}
