//! Observability events for the query core
//!
//! Every line the core logs is tagged with one of these events.
//! Events are explicit and typed.

use std::fmt;

/// Observable events in the query core
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Configuration
    /// Query configuration loaded
    ConfigLoaded,

    // Validation
    /// Filter factory rejected an operand/operator combination
    FilterRejected,
    /// Query builder rejected a filter, ordering or bound
    QueryRejected,

    // Compilation
    /// Query compiled to its target
    TargetCompiled,

    // Internal consistency
    /// An internal invariant was broken (FATAL)
    InvariantViolation,
}

impl Event {
    /// Returns the string representation of the event
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::ConfigLoaded => "QUERY_CONFIG_LOADED",
            Event::FilterRejected => "FILTER_REJECTED",
            Event::QueryRejected => "QUERY_REJECTED",
            Event::TargetCompiled => "TARGET_COMPILED",
            Event::InvariantViolation => "QUERY_INVARIANT_VIOLATION",
        }
    }

    /// Returns true if this event indicates a fatal condition
    pub fn is_fatal(&self) -> bool {
        matches!(self, Event::InvariantViolation)
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_events_have_string_representation() {
        let events = [
            Event::ConfigLoaded,
            Event::FilterRejected,
            Event::QueryRejected,
            Event::TargetCompiled,
            Event::InvariantViolation,
        ];

        for event in events {
            let s = event.as_str();
            assert!(!s.is_empty());
            assert!(s.chars().all(|c| c.is_uppercase() || c == '_'));
        }
    }

    #[test]
    fn test_fatal_events() {
        assert!(Event::InvariantViolation.is_fatal());
        assert!(!Event::QueryRejected.is_fatal());
        assert!(!Event::TargetCompiled.is_fatal());
    }

    #[test]
    fn test_event_display() {
        assert_eq!(format!("{}", Event::TargetCompiled), "TARGET_COMPILED");
    }
}
