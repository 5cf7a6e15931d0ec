//! Session manager configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("session_timeout_seconds must be greater than zero")]
    ZeroSessionTimeout,
}

/// Session manager configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Idle timeout after which a disposed session becomes reapable
    #[serde(rename = "session_timeout_seconds", with = "duration_secs")]
    pub session_timeout: Duration,

    /// Minimum spacing between reaper passes; defaults to the session
    /// timeout when unset
    #[serde(
        rename = "reap_interval_seconds",
        with = "opt_duration_secs",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub reap_interval: Option<Duration>,

    /// Hard cap on live sessions across all accesses
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_concurrent_sessions: Option<usize>,
}

impl SessionConfig {
    /// Effective reaper spacing
    pub fn reap_interval(&self) -> Duration {
        self.reap_interval.unwrap_or(self.session_timeout)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.session_timeout.is_zero() {
            return Err(ConfigError::ZeroSessionTimeout);
        }
        Ok(())
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            session_timeout: Duration::from_secs(300),
            reap_interval: None,
            max_concurrent_sessions: None,
        }
    }
}

/// Helper module for serializing Duration as seconds
mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

/// Same, for optional durations
mod opt_duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match duration {
            Some(d) => serializer.serialize_some(&d.as_secs()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = Option::<u64>::deserialize(deserializer)?;
        Ok(secs.map(Duration::from_secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SessionConfig::default();
        assert_eq!(config.session_timeout, Duration::from_secs(300));
        assert_eq!(config.reap_interval(), Duration::from_secs(300));
        assert!(config.max_concurrent_sessions.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_reap_interval_falls_back_to_timeout() {
        let config = SessionConfig {
            session_timeout: Duration::from_secs(120),
            reap_interval: None,
            max_concurrent_sessions: None,
        };
        assert_eq!(config.reap_interval(), Duration::from_secs(120));

        let config = SessionConfig {
            reap_interval: Some(Duration::from_secs(30)),
            ..config
        };
        assert_eq!(config.reap_interval(), Duration::from_secs(30));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let config = SessionConfig {
            session_timeout: Duration::ZERO,
            ..SessionConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ZeroSessionTimeout)
        ));
    }

    #[test]
    fn test_deserialize_seconds() {
        let config: SessionConfig =
            serde_json::from_str(r#"{"session_timeout_seconds": 60, "reap_interval_seconds": 10}"#)
                .unwrap();
        assert_eq!(config.session_timeout, Duration::from_secs(60));
        assert_eq!(config.reap_interval(), Duration::from_secs(10));
    }
}
