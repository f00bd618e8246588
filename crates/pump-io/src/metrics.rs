//! Prometheus metrics for the pump station.
//!
//! Process values are sampled from the process image; event counters are
//! bumped by the scan tasks as cycles complete.

use prometheus::{Encoder, Gauge, IntCounter, Registry, TextEncoder};
use pump_core::tags::{self, Tag};
use std::sync::LazyLock;
use std::thread;
use tiny_http::{Response, Server};

/// Global metrics registry
pub static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

fn counter(name: &str, help: &str) -> IntCounter {
    let counter = IntCounter::new(name, help).unwrap();
    REGISTRY.register(Box::new(counter.clone())).unwrap();
    counter
}

fn gauge(name: &str, help: &str) -> Gauge {
    let gauge = Gauge::new(name, help).unwrap();
    REGISTRY.register(Box::new(gauge.clone())).unwrap();
    gauge
}

fn tag_gauge(tag: &Tag) -> Gauge {
    gauge(tag.metric, tag.description)
}

// ============================================================================
// Scan Task Metrics
// ============================================================================

/// Completed control scans
pub static CONTROL_CYCLES: LazyLock<IntCounter> = LazyLock::new(|| {
    counter(
        "pumpstation_control_cycles_total",
        "Pump control scans executed",
    )
});

/// Completed monitor scans
pub static MONITOR_CYCLES: LazyLock<IntCounter> = LazyLock::new(|| {
    counter(
        "pumpstation_monitor_cycles_total",
        "Sensor monitor scans executed",
    )
});

/// Control scans aborted because a required input was absent
pub static MISSING_DATA_CYCLES: LazyLock<IntCounter> = LazyLock::new(|| {
    counter(
        "pumpstation_missing_data_cycles_total",
        "Control scans aborted for missing inputs",
    )
});

/// Control scans aborted by an internal fault
pub static INTERNAL_FAULTS: LazyLock<IntCounter> = LazyLock::new(|| {
    counter(
        "pumpstation_internal_faults_total",
        "Control scans aborted by an internal fault",
    )
});

/// Sensor readings outside their declared range
pub static OUT_OF_RANGE_READINGS: LazyLock<IntCounter> = LazyLock::new(|| {
    counter(
        "pumpstation_out_of_range_readings_total",
        "Sensor readings outside the expected engineering range",
    )
});

/// Sensor reads that returned no value
pub static SENSOR_READ_FAILURES: LazyLock<IntCounter> = LazyLock::new(|| {
    counter(
        "pumpstation_sensor_read_failures_total",
        "Sensor channels absent during a monitor scan",
    )
});

// ============================================================================
// Pump Event Metrics
// ============================================================================

pub static PUMP_STARTS: LazyLock<IntCounter> =
    LazyLock::new(|| counter("pumpstation_pump_starts_total", "Pump starts"));

pub static START_REJECTIONS: LazyLock<IntCounter> = LazyLock::new(|| {
    counter(
        "pumpstation_start_rejections_total",
        "Start commands rejected by a safety interlock",
    )
});

pub static OPERATOR_STOPS: LazyLock<IntCounter> = LazyLock::new(|| {
    counter(
        "pumpstation_operator_stops_total",
        "Pump stops from the local stop button",
    )
});

pub static EMERGENCY_STOPS: LazyLock<IntCounter> = LazyLock::new(|| {
    counter(
        "pumpstation_emergency_stops_total",
        "Pump trips from a safety interlock",
    )
});

// ============================================================================
// Process State Metrics
// ============================================================================

pub static SUCTION_PRESSURE: LazyLock<Gauge> =
    LazyLock::new(|| tag_gauge(&tags::SUCTION_PRESSURE));

pub static DISCHARGE_PRESSURE: LazyLock<Gauge> =
    LazyLock::new(|| tag_gauge(&tags::DISCHARGE_PRESSURE));

pub static FLOW_RATE: LazyLock<Gauge> = LazyLock::new(|| tag_gauge(&tags::FLOW_RATE));

pub static MOTOR_TEMPERATURE: LazyLock<Gauge> =
    LazyLock::new(|| tag_gauge(&tags::MOTOR_TEMPERATURE));

pub static TEMPERATURE_SETPOINT: LazyLock<Gauge> =
    LazyLock::new(|| tag_gauge(&tags::TEMPERATURE_SETPOINT));

pub static PRESSURE_SETPOINT: LazyLock<Gauge> =
    LazyLock::new(|| tag_gauge(&tags::PRESSURE_SETPOINT));

/// Commanded pump state (1 = running, 0 = stopped)
pub static PUMP_RUNNING: LazyLock<Gauge> = LazyLock::new(|| tag_gauge(&tags::PUMP_ENABLED));

// ============================================================================
// Remote I/O Metrics
// ============================================================================

/// Modbus link status (1 = connected, 0 = disconnected)
pub static MODBUS_CONNECTED: LazyLock<Gauge> = LazyLock::new(|| {
    gauge(
        "pumpstation_modbus_connected",
        "Modbus remote I/O link status (1=connected, 0=disconnected)",
    )
});

pub static MODBUS_TRANSFER_ERRORS: LazyLock<IntCounter> = LazyLock::new(|| {
    counter(
        "pumpstation_modbus_transfer_errors_total",
        "Failed Modbus poll exchanges",
    )
});

// ============================================================================
// Metrics HTTP Server
// ============================================================================

pub fn render() -> Result<Vec<u8>, prometheus::Error> {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder.encode(&REGISTRY.gather(), &mut buffer)?;
    Ok(buffer)
}

/// Start the metrics HTTP server on the given address.
/// Returns a join handle for the server thread.
pub fn serve_metrics(bind_addr: String) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let server = match Server::http(&bind_addr) {
            Ok(s) => s,
            Err(e) => {
                tracing::error!("Failed to start metrics server on {}: {}", bind_addr, e);
                return;
            }
        };

        tracing::info!("Metrics server listening on http://{}/metrics", bind_addr);

        for request in server.incoming_requests() {
            let path = request.url();

            match path {
                "/metrics" => {
                    let buffer = match render() {
                        Ok(buffer) => buffer,
                        Err(e) => {
                            tracing::warn!("Failed to encode metrics: {}", e);
                            let _ = request.respond(
                                Response::from_string("Internal Server Error")
                                    .with_status_code(500),
                            );
                            continue;
                        }
                    };

                    let mut response = Response::from_data(buffer);
                    if let Ok(header) = tiny_http::Header::from_bytes(
                        &b"Content-Type"[..],
                        &b"text/plain; version=0.0.4"[..],
                    ) {
                        response = response.with_header(header);
                    }
                    let _ = request.respond(response);
                }
                "/health" => {
                    let _ = request.respond(Response::from_string("OK"));
                }
                "/ready" => {
                    // Ready once the control scan has completed a cycle
                    if CONTROL_CYCLES.get() > 0 {
                        let _ = request.respond(Response::from_string("Ready"));
                    } else {
                        let _ = request
                            .respond(Response::from_string("Not Ready").with_status_code(503));
                    }
                }
                _ => {
                    let _ =
                        request.respond(Response::from_string("Not Found").with_status_code(404));
                }
            }
        }
    })
}

/// Initialize all metrics (forces lazy initialization)
pub fn init_metrics() {
    let _ = CONTROL_CYCLES.get();
    let _ = MONITOR_CYCLES.get();
    let _ = MISSING_DATA_CYCLES.get();
    let _ = INTERNAL_FAULTS.get();
    let _ = OUT_OF_RANGE_READINGS.get();
    let _ = SENSOR_READ_FAILURES.get();
    let _ = PUMP_STARTS.get();
    let _ = START_REJECTIONS.get();
    let _ = OPERATOR_STOPS.get();
    let _ = EMERGENCY_STOPS.get();
    let _ = SUCTION_PRESSURE.get();
    let _ = DISCHARGE_PRESSURE.get();
    let _ = FLOW_RATE.get();
    let _ = MOTOR_TEMPERATURE.get();
    let _ = TEMPERATURE_SETPOINT.get();
    let _ = PRESSURE_SETPOINT.get();
    let _ = PUMP_RUNNING.get();
    let _ = MODBUS_CONNECTED.get();
    let _ = MODBUS_TRANSFER_ERRORS.get();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_renders_pump_metrics() {
        init_metrics();
        PUMP_STARTS.inc();
        let text = String::from_utf8(render().unwrap()).unwrap();
        assert!(text.contains("pumpstation_pump_starts_total"));
        assert!(text.contains("pumpstation_motor_temperature_fahrenheit"));
    }
}
