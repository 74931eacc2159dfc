use log::Level;
use serde_json::Value;

/// Structured fact sink. Every fact carries the envelope added by `StageLogger`.
pub trait FactsEmitter {
    fn emit(&self, subsystem: &str, event: &str, decision: &str, fields: Value);
}

/// Human-oriented audit line sink.
pub trait AuditSink {
    fn log(&self, level: Level, msg: &str);
}

/// Discards everything; the default when a caller wants no output.
#[derive(Default)]
pub struct JsonlSink;

impl FactsEmitter for JsonlSink {
    fn emit(&self, _subsystem: &str, _event: &str, _decision: &str, _fields: Value) {}
}

impl AuditSink for JsonlSink {
    fn log(&self, _level: Level, _msg: &str) {}
}

/// Forwards facts and audit lines to the `log` facade.
#[derive(Default, Clone, Copy)]
pub struct LogSink;

impl FactsEmitter for LogSink {
    fn emit(&self, subsystem: &str, event: &str, decision: &str, fields: Value) {
        let level = match decision {
            "failure" => Level::Error,
            "warn" => Level::Warn,
            _ => Level::Info,
        };
        log::log!(target: "tokenrail::facts", level, "{subsystem} {event} {decision} {fields}");
    }
}

impl AuditSink for LogSink {
    fn log(&self, level: Level, msg: &str) {
        log::log!(target: "tokenrail::audit", level, "{msg}");
    }
}
