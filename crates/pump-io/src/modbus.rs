//! Modbus TCP remote I/O for the pump station.
//!
//! A background poller owns the connection. Each poll reads the four analog
//! holding registers and the two button coils into the process image, scaling
//! the analog words on the way in, then writes the pump state output coil from
//! the image. While the link is down every field input is marked absent so the
//! control scan sees missing data instead of stale values.

use crate::metrics::{MODBUS_CONNECTED, MODBUS_TRANSFER_ERRORS};
use pump_core::{BoolChannel, ProcessImage, ProcessIo, SensorChannel};
use std::net::{SocketAddr, ToSocketAddrs};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::runtime::Runtime;
use tokio::task::JoinHandle;
use tokio::time::{interval, sleep, timeout, MissedTickBehavior};
use tokio_modbus::client::Context;
use tokio_modbus::prelude::*;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum ModbusError {
    #[error("cannot resolve Modbus address {0}")]
    InvalidAddress(String),
    #[error("failed to start I/O runtime: {0}")]
    Runtime(#[source] std::io::Error),
    #[error("{0} timed out")]
    Timeout(&'static str),
    #[error("expected {expected} values, device returned {got}")]
    ShortResponse { expected: usize, got: usize },
    #[error("transfer failed: {0}")]
    Transfer(#[from] std::io::Error),
}

/// Station register layout. Sensors occupy consecutive holding registers in
/// [`SensorChannel::ALL`] order; stop and start are consecutive coils.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisterMap {
    pub sensor_start: u16,
    pub stop_coil: u16,
    pub output_coil: u16,
}

impl RegisterMap {
    pub fn start_coil(&self) -> u16 {
        self.stop_coil + 1
    }

    pub fn sensor_register(&self, channel: SensorChannel) -> u16 {
        let offset = SensorChannel::ALL
            .iter()
            .position(|c| *c == channel)
            .unwrap_or_default();
        self.sensor_start + offset as u16
    }
}

impl Default for RegisterMap {
    fn default() -> Self {
        Self {
            sensor_start: 2000,
            stop_coil: 2500,
            output_coil: 2502,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ModbusConfig {
    pub addr: String,
    pub unit_id: u8,
    pub poll_interval: Duration,
    pub timeout: Duration,
    pub retry_min_delay: Duration,
    pub retry_max_delay: Duration,
    pub registers: RegisterMap,
}

impl Default for ModbusConfig {
    fn default() -> Self {
        Self {
            addr: "127.0.0.1:5020".to_string(),
            unit_id: 1,
            poll_interval: Duration::from_millis(100),
            timeout: Duration::from_millis(3000),
            retry_min_delay: Duration::from_millis(1000),
            retry_max_delay: Duration::from_millis(60_000),
            registers: RegisterMap::default(),
        }
    }
}

/// Registers are INT16; negative words clamp to the bottom of the range.
pub fn decode_sensor(channel: SensorChannel, word: u16) -> f64 {
    channel.scaling().apply(f64::from(word as i16))
}

pub fn publish_sensors(image: &ProcessImage, words: &[u16]) -> Result<(), ModbusError> {
    if words.len() < SensorChannel::ALL.len() {
        return Err(ModbusError::ShortResponse {
            expected: SensorChannel::ALL.len(),
            got: words.len(),
        });
    }
    for (channel, word) in SensorChannel::ALL.iter().zip(words) {
        image.set_number(channel.numeric(), Some(decode_sensor(*channel, *word)));
    }
    Ok(())
}

/// `coils` is `[stop, start]` as read from the device.
pub fn publish_buttons(image: &ProcessImage, coils: &[bool]) -> Result<(), ModbusError> {
    match coils {
        [stop, start, ..] => {
            image.set_bool(BoolChannel::LocalStop, Some(*stop));
            image.set_bool(BoolChannel::LocalStart, Some(*start));
            Ok(())
        }
        _ => Err(ModbusError::ShortResponse {
            expected: 2,
            got: coils.len(),
        }),
    }
}

pub fn mark_inputs_absent(image: &ProcessImage) {
    for channel in SensorChannel::ALL {
        image.set_number(channel.numeric(), None);
    }
    image.set_bool(BoolChannel::LocalStop, None);
    image.set_bool(BoolChannel::LocalStart, None);
}

/// Handle to the running poller. Dropping it shuts the runtime down.
pub struct ModbusIo {
    runtime: Runtime,
    task: JoinHandle<()>,
}

impl ModbusIo {
    pub fn start(
        config: ModbusConfig,
        image: ProcessImage,
        stop: Arc<AtomicBool>,
    ) -> Result<Self, ModbusError> {
        let socket_addr = config
            .addr
            .to_socket_addrs()
            .ok()
            .and_then(|mut addrs| addrs.next())
            .ok_or_else(|| ModbusError::InvalidAddress(config.addr.clone()))?;

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("modbus-io")
            .enable_all()
            .build()
            .map_err(ModbusError::Runtime)?;

        let task = runtime.spawn(poll_loop(socket_addr, config, image, stop));
        Ok(Self { runtime, task })
    }

    /// Block until the poller observes the stop flag.
    pub fn join(self) {
        let Self { runtime, task } = self;
        if let Err(e) = runtime.block_on(task) {
            warn!(error = %e, "Modbus poller ended abnormally");
        }
    }
}

async fn poll_loop(
    addr: SocketAddr,
    config: ModbusConfig,
    image: ProcessImage,
    stop: Arc<AtomicBool>,
) {
    let mut backoff = config.retry_min_delay;

    while !stop.load(Ordering::Relaxed) {
        let connect = tcp::connect_slave(addr, Slave(config.unit_id));
        let connected = match timeout(config.timeout, connect).await {
            Ok(Ok(ctx)) => Ok(ctx),
            Ok(Err(e)) => Err(ModbusError::Transfer(e)),
            Err(_) => Err(ModbusError::Timeout("connect")),
        };

        let mut ctx = match connected {
            Ok(ctx) => {
                info!(addr = %addr, unit_id = config.unit_id, "Connected to Modbus remote I/O");
                MODBUS_CONNECTED.set(1.0);
                backoff = config.retry_min_delay;
                ctx
            }
            Err(e) => {
                warn!(
                    addr = %addr,
                    error = %e,
                    retry_in_ms = backoff.as_millis() as u64,
                    "Modbus connect failed"
                );
                mark_inputs_absent(&image);
                sleep_unless_stopped(backoff, &stop).await;
                backoff = (backoff * 2).min(config.retry_max_delay);
                continue;
            }
        };

        let mut ticker = interval(config.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        while !stop.load(Ordering::Relaxed) {
            ticker.tick().await;
            if let Err(e) = exchange(&mut ctx, &config, &image).await {
                warn!(addr = %addr, error = %e, "Modbus exchange failed, reconnecting");
                MODBUS_TRANSFER_ERRORS.inc();
                MODBUS_CONNECTED.set(0.0);
                mark_inputs_absent(&image);
                break;
            }
        }
    }

    MODBUS_CONNECTED.set(0.0);
    debug!("Modbus poller stopped");
}

async fn sleep_unless_stopped(total: Duration, stop: &AtomicBool) {
    let step = Duration::from_millis(100);
    let mut remaining = total;
    while !remaining.is_zero() && !stop.load(Ordering::Relaxed) {
        let chunk = remaining.min(step);
        sleep(chunk).await;
        remaining -= chunk;
    }
}

async fn exchange(
    ctx: &mut Context,
    config: &ModbusConfig,
    image: &ProcessImage,
) -> Result<(), ModbusError> {
    let map = &config.registers;

    let words = timeout(
        config.timeout,
        ctx.read_holding_registers(map.sensor_start, SensorChannel::ALL.len() as u16),
    )
    .await
    .map_err(|_| ModbusError::Timeout("sensor read"))??;
    publish_sensors(image, &words)?;

    let coils = timeout(config.timeout, ctx.read_coils(map.stop_coil, 2))
        .await
        .map_err(|_| ModbusError::Timeout("button read"))??;
    publish_buttons(image, &coils)?;

    let output = image
        .read_bool(BoolChannel::PumpStateOutput)
        .unwrap_or(false);
    timeout(config.timeout, ctx.write_single_coil(map.output_coil, output))
        .await
        .map_err(|_| ModbusError::Timeout("output write"))??;

    Ok(())
}
