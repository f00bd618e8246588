use crate::hal::{BoolChannel, ProcessIo};
use crate::image::ProcessImage;
use crate::sensors::SensorChannel;

/// Pump-aware station model producing raw analog counts.
///
/// Pressures and flow follow the pump output coil with a short lag; the motor
/// heats while running and cools toward ambient when stopped.
#[derive(Debug, Clone)]
pub struct SimulatedStation {
    suction_psi: f64,
    discharge_psi: f64,
    flow_gpm: f64,
    motor_temp_f: f64,

    static_suction_psi: f64,
    running_suction_psi: f64,
    running_discharge_psi: f64,
    running_flow_gpm: f64,
    hydraulic_tau_s: f64,

    ambient_temp_f: f64,
    running_temp_f: f64,
    thermal_tau_s: f64,

    pump_on: bool,
}

impl SimulatedStation {
    pub fn new() -> Self {
        Self {
            suction_psi: 3.0,
            discharge_psi: 3.0,
            flow_gpm: 0.0,
            motor_temp_f: 70.0,
            static_suction_psi: 3.0,
            running_suction_psi: 22.0,
            running_discharge_psi: 110.0,
            running_flow_gpm: 320.0,
            hydraulic_tau_s: 0.6,
            ambient_temp_f: 70.0,
            running_temp_f: 118.0,
            thermal_tau_s: 90.0,
            pump_on: false,
        }
    }

    pub fn set_pump(&mut self, on: bool) {
        self.pump_on = on;
    }

    pub fn step(&mut self, dt_s: f64) {
        let (suction, discharge, flow, temp) = if self.pump_on {
            (
                self.running_suction_psi,
                self.running_discharge_psi,
                self.running_flow_gpm,
                self.running_temp_f,
            )
        } else {
            (
                self.static_suction_psi,
                self.static_suction_psi,
                0.0,
                self.ambient_temp_f,
            )
        };

        let hydraulic = 1.0 - (-dt_s / self.hydraulic_tau_s).exp();
        self.suction_psi += (suction - self.suction_psi) * hydraulic;
        self.discharge_psi += (discharge - self.discharge_psi) * hydraulic;
        self.flow_gpm += (flow - self.flow_gpm) * hydraulic;

        let thermal = 1.0 - (-dt_s / self.thermal_tau_s).exp();
        self.motor_temp_f += (temp - self.motor_temp_f) * thermal;
    }

    pub fn engineering(&self, channel: SensorChannel) -> f64 {
        match channel {
            SensorChannel::SuctionPressure => self.suction_psi,
            SensorChannel::DischargePressure => self.discharge_psi,
            SensorChannel::FlowRate => self.flow_gpm,
            SensorChannel::MotorTemperature => self.motor_temp_f,
        }
    }

    /// Holding register value the remote I/O would report for `channel`.
    pub fn raw_register(&self, channel: SensorChannel) -> u16 {
        channel.scaling().to_raw(self.engineering(channel)).round() as u16
    }

    /// One acquisition tick: follow the output coil, advance the plant, and
    /// publish scaled readings into the image.
    pub fn tick(&mut self, image: &ProcessImage, dt_s: f64) {
        self.set_pump(image.read_bool(BoolChannel::PumpStateOutput).unwrap_or(false));
        self.step(dt_s);
        for channel in SensorChannel::ALL {
            let raw = f64::from(self.raw_register(channel));
            image.set_number(channel.numeric(), Some(channel.scaling().apply(raw)));
        }
    }
}

impl Default for SimulatedStation {
    fn default() -> Self {
        Self::new()
    }
}
