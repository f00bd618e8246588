use pump_core::image::{DEFAULT_PRESSURE_SETPOINT, DEFAULT_TEMPERATURE_SETPOINT};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_MODBUS_PORT: u16 = 5020;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{flag} expects a value")]
    MissingValue { flag: String },
    #[error("invalid value {value:?} for {name}")]
    InvalidValue { name: String, value: String },
    #[error("{name} must be greater than zero")]
    ZeroRate { name: &'static str },
}

#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeConfig {
    pub show_help: bool,
    pub run_seconds: Option<u64>,
    pub json_logs: bool,
    pub log_dir: Option<PathBuf>,
    pub metrics_addr: Option<String>,
    pub audit_path: Option<PathBuf>,
    pub modbus_addr: Option<String>,
    pub modbus_unit_id: u8,
    pub monitor_rate: Duration,
    pub control_rate: Duration,
    pub temperature_setpoint: f64,
    pub pressure_setpoint: f64,
    pub sim_auto_start: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            show_help: false,
            run_seconds: None,
            json_logs: false,
            log_dir: None,
            metrics_addr: None,
            audit_path: None,
            modbus_addr: None,
            modbus_unit_id: 1,
            monitor_rate: Duration::from_millis(100),
            control_rate: Duration::from_millis(500),
            temperature_setpoint: DEFAULT_TEMPERATURE_SETPOINT,
            pressure_setpoint: DEFAULT_PRESSURE_SETPOINT,
            sim_auto_start: false,
        }
    }
}

fn parse<T: FromStr>(name: &str, value: &str) -> Result<T, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidValue {
        name: name.to_string(),
        value: value.to_string(),
    })
}

fn parse_rate_ms(name: &'static str, value: &str) -> Result<Duration, ConfigError> {
    let ms: u64 = parse(name, value)?;
    if ms == 0 {
        return Err(ConfigError::ZeroRate { name });
    }
    Ok(Duration::from_millis(ms))
}

impl RuntimeConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let args: Vec<String> = std::env::args().collect();
        Self::from_sources(&args, |key| std::env::var(key).ok())
    }

    /// Environment supplies deployment defaults; flags override them.
    pub fn from_sources<F>(args: &[String], env: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = RuntimeConfig::default();

        if let Some(host) = env("MODBUS_IO_HOST") {
            let port = match env("MODBUS_IO_PORT") {
                Some(port) => parse::<u16>("MODBUS_IO_PORT", &port)?,
                None => DEFAULT_MODBUS_PORT,
            };
            cfg.modbus_addr = Some(format!("{host}:{port}"));
        }
        if let Some(rate) = env("TASK_SENSOR_MONITOR_RATE_MS") {
            cfg.monitor_rate = parse_rate_ms("TASK_SENSOR_MONITOR_RATE_MS", &rate)?;
        }
        if let Some(rate) = env("TASK_PUMP_CONTROL_RATE_MS") {
            cfg.control_rate = parse_rate_ms("TASK_PUMP_CONTROL_RATE_MS", &rate)?;
        }

        let mut i = 1;
        while i < args.len() {
            let flag = args[i].as_str();
            let mut value = || {
                i += 1;
                args.get(i)
                    .map(String::as_str)
                    .ok_or_else(|| ConfigError::MissingValue {
                        flag: flag.to_string(),
                    })
            };
            match flag {
                "--run-seconds" => {
                    cfg.run_seconds = Some(parse(flag, value()?)?);
                }
                "--json-logs" => {
                    cfg.json_logs = true;
                }
                "--log-dir" => {
                    cfg.log_dir = Some(PathBuf::from(value()?));
                }
                "--metrics-addr" => {
                    cfg.metrics_addr = Some(value()?.to_string());
                }
                "--audit-log" => {
                    cfg.audit_path = Some(PathBuf::from(value()?));
                }
                "--modbus" => {
                    cfg.modbus_addr = Some(value()?.to_string());
                }
                "--unit-id" => {
                    cfg.modbus_unit_id = parse(flag, value()?)?;
                }
                "--simulate" => {
                    cfg.modbus_addr = None;
                }
                "--sim-auto-start" => {
                    cfg.sim_auto_start = true;
                }
                "--monitor-rate-ms" => {
                    cfg.monitor_rate = parse_rate_ms("--monitor-rate-ms", value()?)?;
                }
                "--control-rate-ms" => {
                    cfg.control_rate = parse_rate_ms("--control-rate-ms", value()?)?;
                }
                "--temp-setpoint" => {
                    cfg.temperature_setpoint = parse(flag, value()?)?;
                }
                "--pressure-setpoint" => {
                    cfg.pressure_setpoint = parse(flag, value()?)?;
                }
                "--help" | "-h" => {
                    cfg.show_help = true;
                    break;
                }
                _ => {}
            }
            i += 1;
        }
        Ok(cfg)
    }

    pub fn simulated(&self) -> bool {
        self.modbus_addr.is_none()
    }

    pub fn print_help() {
        println!(
            r#"pump-station - Pump station control with safety interlocks

USAGE:
    pump-station [OPTIONS]

OPTIONS:
    --modbus <ADDR>            Remote I/O via Modbus TCP (e.g. 192.168.1.10:502)
    --unit-id <ID>             Modbus unit id [default: 1]
    --simulate                 Use the built-in station simulator (default without --modbus)
    --sim-auto-start           Pulse the start button once the simulator is up
    --monitor-rate-ms <MS>     Sensor monitor scan period [default: 100]
    --control-rate-ms <MS>     Pump control scan period [default: 500]
    --temp-setpoint <F>        Motor temperature trip threshold [default: 145]
    --pressure-setpoint <PSI>  Minimum suction pressure threshold [default: 5]
    --run-seconds <SECS>       Run for a fixed duration then exit
    --json-logs                Output logs in JSON format (for log aggregation)
    --log-dir <PATH>           Also write daily rolling log files to PATH
    --metrics-addr <ADDR>      Enable Prometheus metrics server on address (e.g., 0.0.0.0:9090)
    --audit-log <PATH>         Append pump events to a JSONL audit file
    -h, --help                 Print this help message

ENVIRONMENT VARIABLES:
    RUST_LOG                      Set log filter (e.g., RUST_LOG=debug,pump_core=trace)
    MODBUS_IO_HOST                Remote I/O host (enables Modbus)
    MODBUS_IO_PORT                Remote I/O port [default: 5020]
    TASK_SENSOR_MONITOR_RATE_MS   Sensor monitor scan period
    TASK_PUMP_CONTROL_RATE_MS     Pump control scan period

EXAMPLES:
    # Simulated station that starts the pump by itself
    pump-station --sim-auto-start

    # Production run with all observability
    pump-station --modbus 10.0.0.20:502 --json-logs --metrics-addr 0.0.0.0:9090 --audit-log /var/log/pump/audit.jsonl
"#
        );
    }
}
