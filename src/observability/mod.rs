//! Observability for the query core
//!
//! Matching and ordering are pure; the only side effect the core has is a
//! structured log line when it rejects user input, compiles a target at
//! TRACE level, or hits a broken internal invariant.
//!
//! # Usage
//!
//! ```ignore
//! use aerodb_query::observability::{log_event_with_fields, Event, Logger, Severity};
//!
//! Logger::set_min_severity(Severity::Trace);
//! log_event_with_fields(Event::TargetCompiled, &[("canonical_id", "cities|f:|ob:__name__asc")]);
//! ```

mod events;
mod logger;

pub use events::Event;
pub use logger::{Logger, Severity};

#[cfg(test)]
pub(crate) use logger::capture_lines;

/// Log a lifecycle event at its default severity
pub fn log_event(event: Event) {
    log_event_with_fields(event, &[]);
}

/// Log a lifecycle event with fields at its default severity
pub fn log_event_with_fields(event: Event, fields: &[(&str, &str)]) {
    let severity = match event {
        Event::ConfigLoaded => Severity::Info,
        Event::FilterRejected | Event::QueryRejected => Severity::Warn,
        Event::TargetCompiled => Severity::Trace,
        Event::InvariantViolation => Severity::Fatal,
    };
    Logger::log(severity, event.as_str(), fields);
}

/// Reports a broken internal invariant and aborts the current operation.
///
/// Reaching this means a caller handed the core an inconsistent value;
/// continuing would produce wrong matches or ordering.
pub fn invariant_violation(message: &str) -> ! {
    log_event_with_fields(Event::InvariantViolation, &[("message", message)]);
    panic!("query invariant violated: {}", message);
}
