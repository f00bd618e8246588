//! Audit trail for pump events.
//!
//! Every start, rejected start, stop and trip is appended to a JSONL file
//! together with the pump state after the cycle that produced it.

use pump_core::{PumpEvent, PumpState};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::{Mutex, PoisonError};
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditEventType {
    SystemStart,
    SystemShutdown,
    /// Pump commanded on
    PumpStarted,
    /// Start button pressed while an interlock was active
    StartRejected,
    /// Stop button pressed while running
    OperatorStop,
    /// Interlock tripped a running pump
    EmergencyStop,
    /// Control cycle aborted by a write failure or a non-finite input
    InternalFault,
}

impl From<PumpEvent> for AuditEventType {
    fn from(event: PumpEvent) -> Self {
        match event {
            PumpEvent::Started => Self::PumpStarted,
            PumpEvent::StartRejected(_) => Self::StartRejected,
            PumpEvent::OperatorStop => Self::OperatorStop,
            PumpEvent::EmergencyStop(_) => Self::EmergencyStop,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Wall-clock Unix timestamp in microseconds
    pub unix_us: u64,
    pub event_type: AuditEventType,
    pub details: serde_json::Value,
}

/// Thread-safe audit logger that writes to a JSONL file
pub struct AuditLogger {
    writer: Mutex<BufWriter<File>>,
}

fn unix_us() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_micros() as u64)
        .unwrap_or_default()
}

impl AuditLogger {
    /// Opens `path` in append mode, creating parent directories as needed.
    pub fn new(path: &Path) -> std::io::Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new().create(true).append(true).open(path)?;

        Ok(Self {
            writer: Mutex::new(BufWriter::with_capacity(8192, file)),
        })
    }

    pub fn log(&self, entry: &AuditEntry) -> std::io::Result<()> {
        let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        serde_json::to_writer(&mut *writer, entry)?;
        writer.write_all(b"\n")?;
        writer.flush()
    }

    pub fn log_event(
        &self,
        event_type: AuditEventType,
        details: serde_json::Value,
    ) -> std::io::Result<()> {
        self.log(&AuditEntry {
            unix_us: unix_us(),
            event_type,
            details,
        })
    }

    pub fn log_pump_event(&self, event: PumpEvent, state: PumpState) -> std::io::Result<()> {
        let mut details = serde_json::Value::from(event);
        if let Some(map) = details.as_object_mut() {
            map.insert("running".into(), state.running.into());
            map.insert(
                "startup_cycle_count".into(),
                state.startup_cycle_count.into(),
            );
        }
        self.log_event(event.into(), details)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pump_core::InterlockReason;
    use std::fs;
    use tempfile::tempdir;

    fn read_entries(path: &Path) -> Vec<AuditEntry> {
        fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    #[test]
    fn test_audit_logger_writes_jsonl() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("audit.jsonl");

        let logger = AuditLogger::new(&path).unwrap();
        logger
            .log_event(
                AuditEventType::SystemStart,
                serde_json::json!({"version": "0.1.0"}),
            )
            .unwrap();
        logger
            .log_pump_event(
                PumpEvent::EmergencyStop(InterlockReason::MotorTemperatureCritical),
                PumpState::stopped(),
            )
            .unwrap();

        let entries = read_entries(&path);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].event_type, AuditEventType::SystemStart);
        assert_eq!(entries[1].event_type, AuditEventType::EmergencyStop);
        assert_eq!(entries[1].details["event"], "emergency_stop");
        assert_eq!(entries[1].details["reason"], "motor temperature critical");
        assert_eq!(entries[1].details["running"], false);
        assert!(entries[1].unix_us >= entries[0].unix_us);
    }

    #[test]
    fn reopening_appends_instead_of_truncating() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("audit.jsonl");

        AuditLogger::new(&path)
            .unwrap()
            .log_event(AuditEventType::SystemStart, serde_json::Value::Null)
            .unwrap();
        AuditLogger::new(&path)
            .unwrap()
            .log_event(AuditEventType::SystemShutdown, serde_json::Value::Null)
            .unwrap();

        let kinds: Vec<_> = read_entries(&path).into_iter().map(|e| e.event_type).collect();
        assert_eq!(
            kinds,
            vec![AuditEventType::SystemStart, AuditEventType::SystemShutdown]
        );
    }
}
