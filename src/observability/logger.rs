//! Structured JSON logger
//!
//! - One log line = one event
//! - `event` first, `severity` second, other keys sorted alphabetically
//! - Synchronous, no buffering
//! - Lines below the process-wide minimum severity are dropped

use std::fmt;
use std::io::{self, Write};
use std::sync::atomic::{AtomicU8, Ordering};

use serde::{Deserialize, Serialize};

/// Log severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    /// Debug-level detail
    Trace = 0,
    /// Normal operations
    Info = 1,
    /// Rejected user input
    Warn = 2,
    /// Operation failures
    Error = 3,
    /// Broken internal invariant
    Fatal = 4,
}

impl Severity {
    /// Returns the string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Trace => "TRACE",
            Severity::Info => "INFO",
            Severity::Warn => "WARN",
            Severity::Error => "ERROR",
            Severity::Fatal => "FATAL",
        }
    }

    fn from_u8(level: u8) -> Self {
        match level {
            0 => Severity::Trace,
            1 => Severity::Info,
            2 => Severity::Warn,
            3 => Severity::Error,
            _ => Severity::Fatal,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

static MIN_SEVERITY: AtomicU8 = AtomicU8::new(Severity::Warn as u8);

/// A structured logger that outputs JSON logs
pub struct Logger;

impl Logger {
    /// Sets the lowest severity that is written
    pub fn set_min_severity(severity: Severity) {
        MIN_SEVERITY.store(severity as u8, Ordering::Relaxed);
    }

    /// Returns the lowest severity that is written
    pub fn min_severity() -> Severity {
        Severity::from_u8(MIN_SEVERITY.load(Ordering::Relaxed))
    }

    /// True if a line at `severity` would be written
    pub fn enabled(severity: Severity) -> bool {
        severity >= Self::min_severity()
    }

    /// Log an event with the given severity and fields
    pub fn log(severity: Severity, event: &str, fields: &[(&str, &str)]) {
        if !Self::enabled(severity) {
            return;
        }
        #[cfg(test)]
        {
            let captured = CAPTURED.with(|cell| match cell.borrow_mut().as_mut() {
                Some(buffer) => {
                    Self::log_to_writer(severity, event, fields, buffer);
                    true
                }
                None => false,
            });
            if captured {
                return;
            }
        }
        if severity >= Severity::Error {
            Self::log_to_writer(severity, event, fields, &mut io::stderr());
        } else {
            Self::log_to_writer(severity, event, fields, &mut io::stdout());
        }
    }

    fn log_to_writer<W: Write>(
        severity: Severity,
        event: &str,
        fields: &[(&str, &str)],
        writer: &mut W,
    ) {
        let mut sorted_fields: Vec<_> = fields.iter().collect();
        sorted_fields.sort_by_key(|(k, _)| *k);

        let mut output = String::with_capacity(256);
        output.push_str("{\"event\":");
        push_json_string(&mut output, event);
        output.push_str(",\"severity\":");
        push_json_string(&mut output, severity.as_str());
        for (key, value) in sorted_fields {
            output.push(',');
            push_json_string(&mut output, key);
            output.push(':');
            push_json_string(&mut output, value);
        }
        output.push_str("}\n");

        // Single write per line
        let _ = writer.write_all(output.as_bytes());
        let _ = writer.flush();
    }
}

/// Appends `s` as a quoted, escaped JSON string
fn push_json_string(output: &mut String, s: &str) {
    match serde_json::to_string(s) {
        Ok(quoted) => output.push_str(&quoted),
        Err(_) => output.push_str("\"\""),
    }
}

#[cfg(test)]
thread_local! {
    static CAPTURED: std::cell::RefCell<Option<Vec<u8>>> = std::cell::RefCell::new(None);
}

/// Runs `f` and returns the lines it logged on this thread
#[cfg(test)]
pub fn capture_lines<R>(f: impl FnOnce() -> R) -> (R, Vec<String>) {
    CAPTURED.with(|cell| *cell.borrow_mut() = Some(Vec::new()));
    let result = f();
    let buffer = CAPTURED
        .with(|cell| cell.borrow_mut().take())
        .unwrap_or_default();
    let lines = String::from_utf8(buffer)
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect();
    (result, lines)
}

/// Capture logs to a buffer for testing
#[cfg(test)]
pub fn capture_log(severity: Severity, event: &str, fields: &[(&str, &str)]) -> String {
    let mut buffer = Vec::new();
    Logger::log_to_writer(severity, event, fields, &mut buffer);
    String::from_utf8(buffer).unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Trace < Severity::Info);
        assert!(Severity::Info < Severity::Warn);
        assert!(Severity::Warn < Severity::Error);
        assert!(Severity::Error < Severity::Fatal);
    }

    #[test]
    fn test_severity_round_trips_through_u8() {
        for severity in [
            Severity::Trace,
            Severity::Info,
            Severity::Warn,
            Severity::Error,
            Severity::Fatal,
        ] {
            assert_eq!(Severity::from_u8(severity as u8), severity);
        }
    }

    #[test]
    fn test_severity_serde_uses_uppercase() {
        let json = serde_json::to_string(&Severity::Trace).unwrap();
        assert_eq!(json, "\"TRACE\"");
        let parsed: Severity = serde_json::from_str("\"FATAL\"").unwrap();
        assert_eq!(parsed, Severity::Fatal);
    }

    #[test]
    fn test_fatal_always_enabled() {
        assert!(Logger::enabled(Severity::Fatal));
    }

    #[test]
    fn test_log_json_format() {
        let output = capture_log(Severity::Warn, "FILTER_REJECTED", &[]);

        let parsed: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(parsed["event"], "FILTER_REJECTED");
        assert_eq!(parsed["severity"], "WARN");
    }

    #[test]
    fn test_log_deterministic_ordering() {
        let output1 = capture_log(
            Severity::Trace,
            "TARGET_COMPILED",
            &[("limit_type", "F"), ("canonical_id", "cities|f:|ob:__name__asc")],
        );
        let output2 = capture_log(
            Severity::Trace,
            "TARGET_COMPILED",
            &[("canonical_id", "cities|f:|ob:__name__asc"), ("limit_type", "F")],
        );

        assert_eq!(output1, output2);
        assert!(output1.find("canonical_id").unwrap() < output1.find("limit_type").unwrap());
    }

    #[test]
    fn test_log_escapes_special_chars() {
        let output = capture_log(
            Severity::Warn,
            "QUERY_REJECTED",
            &[("message", "field \"a`b\"\nline2")],
        );

        let parsed: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(parsed["message"], "field \"a`b\"\nline2");
    }

    #[test]
    fn test_log_one_line() {
        let output = capture_log(Severity::Info, "TEST", &[("a", "1"), ("b", "2")]);

        assert_eq!(output.chars().filter(|c| *c == '\n').count(), 1);
        assert!(output.ends_with('\n'));
    }
}
