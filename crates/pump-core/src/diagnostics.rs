//! Structured diagnostics emitted by the scan tasks.
//!
//! Tasks never talk to a logger directly. They hand a [`Diagnostic`] to the
//! [`DiagnosticSink`] passed into each cycle, so the runtime decides where the
//! record goes and tests can assert on exactly what was reported.

use serde::Serialize;
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Debug,
    Info,
    Warn,
    Error,
    Critical,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    pub source: &'static str,
    pub severity: Severity,
    pub message: String,
    pub context: Map<String, Value>,
}

impl Diagnostic {
    pub fn new(source: &'static str, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            source,
            severity,
            message: message.into(),
            context: Map::new(),
        }
    }

    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.context.insert(key.to_string(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.context.get(key)
    }
}

pub trait DiagnosticSink {
    fn emit(&mut self, diagnostic: Diagnostic);
}

impl<S: DiagnosticSink + ?Sized> DiagnosticSink for &mut S {
    fn emit(&mut self, diagnostic: Diagnostic) {
        (**self).emit(diagnostic);
    }
}

/// Forwards diagnostics to the `log` facade, using the task name as target.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl DiagnosticSink for LogSink {
    fn emit(&mut self, diagnostic: Diagnostic) {
        let level = match diagnostic.severity {
            Severity::Debug => log::Level::Debug,
            Severity::Info => log::Level::Info,
            Severity::Warn => log::Level::Warn,
            Severity::Error | Severity::Critical => log::Level::Error,
        };
        let mut context = diagnostic.context;
        if diagnostic.severity == Severity::Critical {
            context.insert("critical".to_string(), Value::Bool(true));
        }
        if context.is_empty() {
            log::log!(target: diagnostic.source, level, "{}", diagnostic.message);
        } else {
            log::log!(
                target: diagnostic.source,
                level,
                "{} {}",
                diagnostic.message,
                Value::Object(context)
            );
        }
    }
}

/// Keeps every diagnostic in memory.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    pub diagnostics: Vec<Diagnostic>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == severity)
            .count()
    }

    pub fn messages(&self) -> Vec<&str> {
        self.diagnostics.iter().map(|d| d.message.as_str()).collect()
    }

    pub fn last(&self) -> Option<&Diagnostic> {
        self.diagnostics.last()
    }

    pub fn clear(&mut self) {
        self.diagnostics.clear();
    }
}

impl DiagnosticSink for RecordingSink {
    fn emit(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }
}
