use crate::infra::audit::{AuditEventType, AuditLogger};
use crate::runtime::config::RuntimeConfig;
use crate::runtime::logging::init_tracing;
use crate::runtime::telemetry;
use pump_core::{
    BoolChannel, CycleError, CycleOutcome, ExecutionStats, LogSink, ProcessImage, PumpController,
    ScanConfig, ScanLoop, SensorMonitor, SimulatedStation,
};
use pump_io::{ModbusConfig, ModbusIo};
use std::convert::Infallible;
use std::path::Path;
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

/// Where field inputs come from for this run.
enum IoSource {
    Simulated(thread::JoinHandle<ExecutionStats>),
    Modbus(ModbusIo),
}

impl IoSource {
    fn join(self) {
        match self {
            Self::Simulated(handle) => {
                join_scan("io-simulator", handle);
            }
            Self::Modbus(io) => io.join(),
        }
    }
}

pub fn run_from_args() -> ExitCode {
    let config = match RuntimeConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {e}");
            eprintln!("Run with --help for usage.");
            return ExitCode::from(2);
        }
    };
    if config.show_help {
        RuntimeConfig::print_help();
        return ExitCode::SUCCESS;
    }
    run(config)
}

pub fn run(config: RuntimeConfig) -> ExitCode {
    let _log_guard = init_tracing(config.json_logs, config.log_dir.as_deref());

    telemetry::init();
    let _metrics_handle = telemetry::start_metrics_server(&config.metrics_addr);

    let audit_logger = match init_audit_logger(config.audit_path.as_deref()) {
        Ok(logger) => logger,
        Err(e) => {
            error!(error = %e, "Audit logging requested but failed to initialize");
            return ExitCode::FAILURE;
        }
    };

    if let Some(ref logger) = audit_logger {
        let _ = logger.log_event(
            AuditEventType::SystemStart,
            serde_json::json!({
                "version": env!("CARGO_PKG_VERSION"),
                "io": config.modbus_addr.as_deref().unwrap_or("simulated"),
                "temperature_setpoint": config.temperature_setpoint,
                "pressure_setpoint": config.pressure_setpoint,
                "monitor_rate_ms": config.monitor_rate.as_millis() as u64,
                "control_rate_ms": config.control_rate.as_millis() as u64,
            }),
        );
    }

    let image = ProcessImage::with_setpoints(config.temperature_setpoint, config.pressure_setpoint);
    let stop = Arc::new(AtomicBool::new(false));

    let io_source = match start_io(&config, &image, &stop) {
        Ok(source) => source,
        Err(e) => {
            error!(error = %e, "Failed to start remote I/O");
            return ExitCode::FAILURE;
        }
    };

    info!(
        period_ms = config.monitor_rate.as_millis() as u64,
        "Starting sensor monitor task"
    );
    let monitor_handle = {
        let io = image.clone();
        let mut monitor = SensorMonitor::new();
        spawn_scan(
            ScanConfig::new("sensor-monitor", config.monitor_rate),
            Arc::clone(&stop),
            move || {
                let report = monitor.run_cycle(&io, &mut LogSink);
                telemetry::record_monitor(&report);
                Ok::<_, Infallible>(report)
            },
        )
    };

    info!(
        period_ms = config.control_rate.as_millis() as u64,
        temperature_setpoint = config.temperature_setpoint,
        pressure_setpoint = config.pressure_setpoint,
        "Starting pump control task"
    );
    let control_handle = {
        let mut io = image.clone();
        let mut controller = PumpController::new();
        let audit = audit_logger.clone();
        spawn_scan(
            ScanConfig::new("pump-control", config.control_rate),
            Arc::clone(&stop),
            move || {
                let result = controller.run_cycle(&mut io, &mut LogSink);
                telemetry::record_control(&result);
                if let Some(logger) = &audit {
                    if let Err(e) = audit_cycle(logger, &result) {
                        warn!(error = %e, "Failed to write audit entry");
                    }
                }
                result
            },
        )
    };

    let metrics_handle = telemetry::start_metrics_updater(image.clone(), Arc::clone(&stop));

    info!(simulated = config.simulated(), "Pump station running");

    let Some(seconds) = config.run_seconds else {
        // Scan tasks run until the process is killed.
        join_scan("pump-control", control_handle);
        return ExitCode::SUCCESS;
    };

    info!(seconds, "Running for limited duration");
    thread::sleep(Duration::from_secs(seconds));
    stop.store(true, Ordering::Relaxed);

    let control_stats = join_scan("pump-control", control_handle);
    let monitor_stats = join_scan("sensor-monitor", monitor_handle);
    io_source.join();
    let _ = metrics_handle.join();

    info!(
        control_cycles = control_stats.cycles_executed,
        control_aborted = control_stats.cycles_aborted,
        control_missed = control_stats.cycles_missed,
        monitor_cycles = monitor_stats.cycles_executed,
        max_jitter_us = control_stats.max_jitter_us.max(monitor_stats.max_jitter_us),
        "Run complete"
    );

    if let Some(ref logger) = audit_logger {
        let _ = logger.log_event(
            AuditEventType::SystemShutdown,
            serde_json::json!({
                "control_cycles": control_stats.cycles_executed,
                "control_aborted": control_stats.cycles_aborted,
                "control_panicked": control_stats.cycles_panicked,
                "monitor_cycles": monitor_stats.cycles_executed,
            }),
        );
    }

    ExitCode::SUCCESS
}

fn init_audit_logger(audit_path: Option<&Path>) -> std::io::Result<Option<Arc<AuditLogger>>> {
    let Some(path) = audit_path else {
        return Ok(None);
    };
    let logger = AuditLogger::new(path)?;
    info!(path = %path.display(), "Audit logging enabled");
    Ok(Some(Arc::new(logger)))
}

fn audit_cycle(
    logger: &AuditLogger,
    result: &Result<CycleOutcome, CycleError>,
) -> std::io::Result<()> {
    match result {
        Ok(CycleOutcome {
            state,
            event: Some(event),
        }) => logger.log_pump_event(*event, *state),
        Ok(_) => Ok(()),
        // Missing inputs recur every scan while a link is down; the log has them.
        Err(err) if err.is_missing_data() => Ok(()),
        Err(err) => logger.log_event(
            AuditEventType::InternalFault,
            serde_json::json!({ "error": err.to_string() }),
        ),
    }
}

fn start_io(
    config: &RuntimeConfig,
    image: &ProcessImage,
    stop: &Arc<AtomicBool>,
) -> Result<IoSource, pump_io::ModbusError> {
    if let Some(addr) = &config.modbus_addr {
        info!(addr = %addr, unit_id = config.modbus_unit_id, "Connecting to Modbus remote I/O");
        let modbus_config = ModbusConfig {
            addr: addr.clone(),
            unit_id: config.modbus_unit_id,
            poll_interval: config.monitor_rate,
            ..ModbusConfig::default()
        };
        let io = ModbusIo::start(modbus_config, image.clone(), Arc::clone(stop))?;
        return Ok(IoSource::Modbus(io));
    }

    info!(auto_start = config.sim_auto_start, "Using simulated station");
    Ok(IoSource::Simulated(spawn_simulator(
        config,
        image.clone(),
        Arc::clone(stop),
    )))
}

/// The simulator ticks at the monitor rate. With auto start it holds the
/// start button for two control periods once readings are available.
fn spawn_simulator(
    config: &RuntimeConfig,
    image: ProcessImage,
    stop: Arc<AtomicBool>,
) -> thread::JoinHandle<ExecutionStats> {
    let period = config.monitor_rate;
    let pulse_from = period * 2;
    let pulse_until = pulse_from + config.control_rate * 2;
    let auto_start = config.sim_auto_start;

    let mut station = SimulatedStation::new();
    let started = Instant::now();
    let mut last_tick = started;

    spawn_scan(
        ScanConfig::new("io-simulator", period),
        stop,
        move || {
            let now = Instant::now();
            station.tick(&image, now.duration_since(last_tick).as_secs_f64());
            last_tick = now;

            if auto_start {
                let elapsed = now.duration_since(started);
                let pressed = elapsed >= pulse_from && elapsed < pulse_until;
                image.set_bool(BoolChannel::LocalStart, Some(pressed));
            }
            Ok::<_, Infallible>(())
        },
    )
}

fn spawn_scan<T, E, F>(
    config: ScanConfig,
    stop: Arc<AtomicBool>,
    cycle: F,
) -> thread::JoinHandle<ExecutionStats>
where
    F: FnMut() -> Result<T, E> + Send + 'static,
{
    thread::spawn(move || {
        let mut scan = ScanLoop::new(config);
        scan.run(&stop, cycle);
        scan.stats().clone()
    })
}

fn join_scan(name: &str, handle: thread::JoinHandle<ExecutionStats>) -> ExecutionStats {
    match handle.join() {
        Ok(stats) => stats,
        Err(_) => {
            warn!(task = name, "Scan task thread terminated abnormally");
            ExecutionStats::default()
        }
    }
}
