//! Session configuration.

use replacemodel_core::{Dialect, Error, QuotePolicy, Result};
use replacemodel_query::AutoTime;
use serde::{Deserialize, Serialize};

/// Configuration for Session behavior.
///
/// Can be loaded from JSON; missing fields take their defaults.
///
/// ```ignore
/// let config = SessionConfig::from_json(r#"{"dialect": "postgres"}"#)?;
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Target database dialect.
    pub dialect: Dialect,
    /// Whether identifiers are quoted.
    pub quote_policy: QuotePolicy,
    /// Offset east of UTC, in seconds, for local generated timestamps.
    pub time_zone_offset_secs: i32,
}

impl SessionConfig {
    /// Create new default options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a configuration from JSON.
    #[allow(clippy::result_large_err)]
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| Error::Custom(format!("invalid session configuration: {e}")))
    }

    /// Set the dialect (builder pattern).
    #[must_use]
    pub fn dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = dialect;
        self
    }

    /// Set the identifier quoting policy (builder pattern).
    #[must_use]
    pub fn quote_policy(mut self, policy: QuotePolicy) -> Self {
        self.quote_policy = policy;
        self
    }

    /// Set the time zone offset used for generated timestamps (builder pattern).
    #[must_use]
    pub fn time_zone_offset_secs(mut self, seconds: i32) -> Self {
        self.time_zone_offset_secs = seconds;
        self
    }

    /// The clock generated timestamps are read from.
    pub fn clock(&self) -> AutoTime {
        AutoTime::with_offset_secs(self.time_zone_offset_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = SessionConfig::default();
        assert_eq!(config.dialect, Dialect::Mysql);
        assert_eq!(config.quote_policy, QuotePolicy::Always);
        assert_eq!(config.time_zone_offset_secs, 0);
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config =
            SessionConfig::from_json(r#"{"dialect": "oracle", "quote_policy": "never"}"#).unwrap();
        assert_eq!(config.dialect, Dialect::Oracle);
        assert_eq!(config.quote_policy, QuotePolicy::Never);
        assert_eq!(config.time_zone_offset_secs, 0);
    }

    #[test]
    fn invalid_json_is_an_error() {
        assert!(SessionConfig::from_json(r#"{"dialect": "db2"}"#).is_err());
    }

    #[test]
    fn builders_round_trip_through_json() {
        let config = SessionConfig::new()
            .dialect(Dialect::Mssql)
            .time_zone_offset_secs(-18_000);
        let json = serde_json::to_string(&config).unwrap();
        assert_eq!(SessionConfig::from_json(&json).unwrap(), config);
        assert_eq!(config.clock().offset().local_minus_utc(), -18_000);
    }
}
