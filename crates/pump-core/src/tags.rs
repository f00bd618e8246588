#[derive(Debug, Clone, Copy)]
pub struct Tag {
    pub key: &'static str,
    pub metric: &'static str,
    pub description: &'static str,
    pub units: &'static str,
}

pub const SUCTION_PRESSURE: Tag = Tag {
    key: "suction_pressure",
    metric: "pumpstation_suction_pressure_psi",
    description: "Pump inlet pressure",
    units: "PSI",
};

pub const DISCHARGE_PRESSURE: Tag = Tag {
    key: "discharge_pressure",
    metric: "pumpstation_discharge_pressure_psi",
    description: "Pump outlet pressure",
    units: "PSI",
};

pub const FLOW_RATE: Tag = Tag {
    key: "flow_rate",
    metric: "pumpstation_flow_rate_gpm",
    description: "Water flow rate",
    units: "GPM",
};

pub const MOTOR_TEMPERATURE: Tag = Tag {
    key: "motor_temperature",
    metric: "pumpstation_motor_temperature_fahrenheit",
    description: "Motor winding temperature",
    units: "°F",
};

pub const TEMPERATURE_SETPOINT: Tag = Tag {
    key: "temperature_setpoint",
    metric: "pumpstation_temperature_setpoint_fahrenheit",
    description: "Motor temperature trip threshold",
    units: "°F",
};

pub const PRESSURE_SETPOINT: Tag = Tag {
    key: "pressure_setpoint",
    metric: "pumpstation_pressure_setpoint_psi",
    description: "Minimum suction pressure threshold",
    units: "PSI",
};

pub const LOCAL_START: Tag = Tag {
    key: "local_start",
    metric: "pumpstation_local_start",
    description: "Normally open start button (true = pressed)",
    units: "",
};

pub const LOCAL_STOP: Tag = Tag {
    key: "local_stop",
    metric: "pumpstation_local_stop",
    description: "Normally closed stop button (false = pressed)",
    units: "",
};

pub const PUMP_ENABLED: Tag = Tag {
    key: "pump_enabled",
    metric: "pumpstation_pump_enabled",
    description: "Commanded pump running state",
    units: "",
};

pub const PUMP_STATE_OUTPUT: Tag = Tag {
    key: "pump_state_output",
    metric: "pumpstation_pump_state_output",
    description: "Pump state mirrored to the remote I/O output coil",
    units: "",
};
