pub mod metrics;
pub mod modbus;

pub use metrics::{init_metrics, serve_metrics};
pub use modbus::{ModbusConfig, ModbusError, ModbusIo, RegisterMap};
