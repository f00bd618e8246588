use crate::diagnostics::{Diagnostic, DiagnosticSink, Severity};
use crate::hal::ProcessIo;
use crate::sensors::{self, SensorChannel, SensorReadings, ValidationReport};

pub const SOURCE: &str = "sensor-monitor";

/// Diagnostics-only scan over the scaled sensor values. Never writes and never
/// touches pump state.
#[derive(Debug, Clone, Default)]
pub struct SensorMonitor {
    initialized: bool,
}

impl SensorMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn run_cycle<IO, S>(&mut self, io: &IO, sink: &mut S) -> ValidationReport
    where
        IO: ProcessIo + ?Sized,
        S: DiagnosticSink + ?Sized,
    {
        if !self.initialized {
            let channels: Vec<&str> = SensorChannel::ALL.iter().map(|c| c.name()).collect();
            sink.emit(
                Diagnostic::new(SOURCE, Severity::Info, "sensor monitor task initialized")
                    .with("channels", channels),
            );
            self.initialized = true;
        }

        let readings = SensorReadings::read(io);
        sensors::validate(SOURCE, &readings, sink)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::RecordingSink;
    use crate::hal::NumericChannel;
    use crate::image::ProcessImage;

    #[test]
    fn logs_initialization_once() {
        let image = ProcessImage::with_station_defaults();
        let mut monitor = SensorMonitor::new();
        let mut sink = RecordingSink::new();

        monitor.run_cycle(&image, &mut sink);
        monitor.run_cycle(&image, &mut sink);

        let inits = sink
            .messages()
            .iter()
            .filter(|m| **m == "sensor monitor task initialized")
            .count();
        assert_eq!(inits, 1);
    }

    #[test]
    fn reports_every_absent_sensor_each_cycle() {
        let image = ProcessImage::with_station_defaults();
        let mut monitor = SensorMonitor::new();
        let mut sink = RecordingSink::new();

        let report = monitor.run_cycle(&image, &mut sink);
        assert_eq!(report.missing.len(), 4);
        assert_eq!(sink.count(Severity::Error), 4);

        sink.clear();
        image.set_number(NumericChannel::FlowRate, Some(250.0));
        let report = monitor.run_cycle(&image, &mut sink);
        assert_eq!(report.missing.len(), 3);
        assert_eq!(sink.count(Severity::Error), 3);
    }

    #[test]
    fn does_not_write_outputs() {
        let image = ProcessImage::with_station_defaults();
        let before = image.snapshot();
        let mut monitor = SensorMonitor::new();
        monitor.run_cycle(&image, &mut RecordingSink::new());
        assert_eq!(image.snapshot(), before);
    }
}
