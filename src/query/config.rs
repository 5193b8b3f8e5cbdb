//! Query Configuration
//!
//! Limits applied when filters are built, and the log level of the core.

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::errors::{QueryError, QueryResult};
use crate::observability::{log_event_with_fields, Event, Logger, Severity};

/// Query configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryConfig {
    /// Maximum number of values in an `in` or `array-contains-any` operand (default: 10)
    #[serde(default = "default_max_disjunction_values")]
    pub max_disjunction_values: usize,

    /// Lowest severity the logger writes (default: WARN)
    #[serde(default = "default_log_severity")]
    pub log_severity: Severity,
}

fn default_max_disjunction_values() -> usize {
    10
}

fn default_log_severity() -> Severity {
    Severity::Warn
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            max_disjunction_values: default_max_disjunction_values(),
            log_severity: default_log_severity(),
        }
    }
}

impl QueryConfig {
    /// Parses and validates a JSON configuration. Missing keys take defaults.
    pub fn from_json_str(json: &str) -> QueryResult<Self> {
        let config: QueryConfig = serde_json::from_str(json).map_err(|e| {
            QueryError::invalid_config(format!("malformed config: {}", e)).reported()
        })?;
        config.validate().map_err(QueryError::reported)?;
        Ok(config)
    }

    /// Reads a JSON configuration file
    pub fn load(path: impl AsRef<Path>) -> QueryResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            QueryError::invalid_config(format!("cannot read {}: {}", path.display(), e)).reported()
        })?;
        Self::from_json_str(&content)
    }

    pub fn validate(&self) -> QueryResult<()> {
        if self.max_disjunction_values == 0 {
            return Err(QueryError::invalid_config(
                "max_disjunction_values must be at least 1",
            ));
        }
        Ok(())
    }

    /// Installs the log level
    pub fn apply(&self) {
        Logger::set_min_severity(self.log_severity);
        log_event_with_fields(
            Event::ConfigLoaded,
            &[
                (
                    "max_disjunction_values",
                    &self.max_disjunction_values.to_string(),
                ),
                ("log_severity", self.log_severity.as_str()),
            ],
        );
    }
}
