use crate::diagnostics::{Diagnostic, DiagnosticSink, LogSink, Severity};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

#[derive(Clone, Debug)]
pub struct ScanConfig {
    pub name: &'static str,
    pub period: Duration,
}

impl ScanConfig {
    pub fn new(name: &'static str, period: Duration) -> Self {
        Self { name, period }
    }
}

#[derive(Clone, Default, Debug, PartialEq, Eq)]
pub struct ExecutionStats {
    pub cycles_executed: u64,
    pub cycles_missed: u64,
    pub cycles_aborted: u64,
    pub cycles_panicked: u64,
    pub last_cycle_us: u64,
    pub max_jitter_us: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleStatus {
    Completed,
    Aborted,
    Panicked,
}

/// Fixed-rate, non-reentrant runner for one scan task.
///
/// A cycle that returns `Err` or panics is counted and the next cycle runs on
/// schedule. Cycles that overrun their slot are never queued up; the schedule
/// restarts from the late cycle instead.
pub struct ScanLoop {
    config: ScanConfig,
    stats: ExecutionStats,
}

impl ScanLoop {
    pub fn new(config: ScanConfig) -> Self {
        Self {
            config,
            stats: ExecutionStats::default(),
        }
    }

    pub fn run<T, E, F>(&mut self, stop: &AtomicBool, mut cycle: F)
    where
        F: FnMut() -> Result<T, E>,
    {
        let mut next_cycle = Instant::now();

        while !stop.load(Ordering::Relaxed) {
            let now = Instant::now();
            if now < next_cycle {
                thread::sleep(next_cycle - now);
            } else if now.duration_since(next_cycle) > self.config.period {
                self.stats.cycles_missed += 1;
                next_cycle = now;
            }

            let started = Instant::now();
            let jitter_us = started.saturating_duration_since(next_cycle).as_micros() as u64;
            self.stats.max_jitter_us = self.stats.max_jitter_us.max(jitter_us);

            self.run_cycle(&mut cycle, &mut LogSink);

            next_cycle += self.config.period;
        }
    }

    /// Execute exactly one cycle and account for it. A panic is reported to
    /// `sink` as a critical diagnostic from this task.
    pub fn run_cycle<T, E, F, S>(&mut self, cycle: &mut F, sink: &mut S) -> CycleStatus
    where
        F: FnMut() -> Result<T, E>,
        S: DiagnosticSink + ?Sized,
    {
        let started = Instant::now();
        let status = match panic::catch_unwind(AssertUnwindSafe(|| cycle())) {
            Ok(Ok(_)) => CycleStatus::Completed,
            Ok(Err(_)) => {
                self.stats.cycles_aborted += 1;
                CycleStatus::Aborted
            }
            Err(payload) => {
                self.stats.cycles_panicked += 1;
                let detail = payload
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                sink.emit(
                    Diagnostic::new(
                        self.config.name,
                        Severity::Critical,
                        "cycle panicked, continuing with next cycle",
                    )
                    .with("panic", detail),
                );
                CycleStatus::Panicked
            }
        };
        self.stats.cycles_executed += 1;
        self.stats.last_cycle_us = started.elapsed().as_micros() as u64;
        status
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    pub fn stats(&self) -> &ExecutionStats {
        &self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::RecordingSink;
    use std::sync::Arc;

    fn scan() -> ScanLoop {
        ScanLoop::new(ScanConfig::new("test-scan", Duration::from_millis(5)))
    }

    #[test]
    fn counts_aborted_cycles_and_keeps_going() {
        let mut scan = scan();
        let mut n = 0;
        let mut cycle = || {
            n += 1;
            if n % 2 == 0 {
                Err("missing")
            } else {
                Ok(())
            }
        };
        for _ in 0..4 {
            scan.run_cycle(&mut cycle, &mut LogSink);
        }
        assert_eq!(scan.stats().cycles_executed, 4);
        assert_eq!(scan.stats().cycles_aborted, 2);
    }

    #[test]
    fn panicking_cycle_does_not_escape() {
        let mut scan = scan();
        let mut sink = RecordingSink::new();
        let mut cycle = || -> Result<(), ()> { panic!("boom") };
        assert_eq!(scan.run_cycle(&mut cycle, &mut sink), CycleStatus::Panicked);

        let mut ok = || -> Result<(), ()> { Ok(()) };
        assert_eq!(scan.run_cycle(&mut ok, &mut sink), CycleStatus::Completed);
        assert_eq!(scan.stats().cycles_panicked, 1);
        assert_eq!(scan.stats().cycles_executed, 2);

        assert_eq!(sink.count(Severity::Critical), 1);
        let diag = sink.last().unwrap();
        assert_eq!(diag.source, "test-scan");
        assert_eq!(diag.get("panic").and_then(|v| v.as_str()), Some("boom"));
    }

    #[test]
    fn run_stops_when_flag_set() {
        let stop = Arc::new(AtomicBool::new(false));
        let stop_cycle = Arc::clone(&stop);
        let mut scan = scan();
        let mut cycles = 0;
        scan.run(&stop, || -> Result<(), ()> {
            cycles += 1;
            if cycles == 3 {
                stop_cycle.store(true, Ordering::Relaxed);
            }
            Ok(())
        });
        assert_eq!(cycles, 3);
        assert_eq!(scan.stats().cycles_executed, 3);
    }
}
