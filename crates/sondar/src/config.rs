//! Resilience configuration
//!
//! Timeouts, poll intervals and gesture geometry in one serializable
//! struct. Values come from defaults, an optional YAML file and `SONDAR_*`
//! environment overrides, applied in that order.

use crate::locator::LocatorOptions;
use crate::result::{SondarError, SondarResult};
use crate::scroll::{
    ConvergenceOptions, SwipeProfile, DEFAULT_MAX_ATTEMPTS, DEFAULT_SETTLE_DELAY_MS,
    DEFAULT_TAP_SETTLE_MS,
};
use crate::wait::{
    ConditionSpec, DEFAULT_POLL_INTERVAL_MS, DEFAULT_WAIT_TIMEOUT_MS, MIN_POLL_INTERVAL_MS,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Prefix of environment overrides
pub const ENV_PREFIX: &str = "SONDAR_";

/// Tunables for waits, element lookups and convergence sessions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResilienceConfig {
    /// Budget for generic condition waits
    pub wait_timeout_ms: u64,
    /// Pause between condition evaluations
    pub poll_interval_ms: u64,
    /// Budget for element visibility waits
    pub element_timeout_ms: u64,
    /// Gesture bound per convergence session
    pub max_scroll_attempts: u32,
    /// Pause after each scroll gesture
    pub settle_delay_ms: u64,
    /// Pause after tapping a transient control
    pub tap_settle_ms: u64,
    /// Where swipes start, as a fraction of the scrolled axis
    pub swipe_start_ratio: f64,
    /// Where swipes end
    pub swipe_end_ratio: f64,
    /// Press duration before a swipe moves
    pub swipe_hold_ms: u64,
}

impl Default for ResilienceConfig {
    fn default() -> Self {
        Self {
            wait_timeout_ms: DEFAULT_WAIT_TIMEOUT_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            element_timeout_ms: DEFAULT_WAIT_TIMEOUT_MS,
            max_scroll_attempts: DEFAULT_MAX_ATTEMPTS,
            settle_delay_ms: DEFAULT_SETTLE_DELAY_MS,
            tap_settle_ms: DEFAULT_TAP_SETTLE_MS,
            swipe_start_ratio: 0.8,
            swipe_end_ratio: 0.2,
            swipe_hold_ms: 1000,
        }
    }
}

fn parse_env<T: FromStr>(key: &str, value: &str) -> SondarResult<T> {
    value
        .trim()
        .parse()
        .map_err(|_| SondarError::config(format!("{key}: cannot parse {value:?}")))
}

impl ResilienceConfig {
    /// Create default configuration
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the condition wait budget
    #[must_use]
    pub const fn with_wait_timeout_ms(mut self, ms: u64) -> Self {
        self.wait_timeout_ms = ms;
        self
    }

    /// Set the poll interval
    #[must_use]
    pub const fn with_poll_interval_ms(mut self, ms: u64) -> Self {
        self.poll_interval_ms = ms;
        self
    }

    /// Set the element wait budget
    #[must_use]
    pub const fn with_element_timeout_ms(mut self, ms: u64) -> Self {
        self.element_timeout_ms = ms;
        self
    }

    /// Set the gesture bound
    #[must_use]
    pub const fn with_max_scroll_attempts(mut self, attempts: u32) -> Self {
        self.max_scroll_attempts = attempts;
        self
    }

    /// Set the settle delay
    #[must_use]
    pub const fn with_settle_delay_ms(mut self, ms: u64) -> Self {
        self.settle_delay_ms = ms;
        self
    }

    /// Set the tap settle delay
    #[must_use]
    pub const fn with_tap_settle_ms(mut self, ms: u64) -> Self {
        self.tap_settle_ms = ms;
        self
    }

    /// Parse and validate YAML
    pub fn from_yaml_str(yaml: &str) -> SondarResult<Self> {
        let config: Self = serde_yaml_ng::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a YAML file
    pub fn from_file(path: impl AsRef<Path>) -> SondarResult<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&contents).map_err(|err| match err {
            SondarError::Yaml(inner) => {
                SondarError::config(format!("{}: {inner}", path.display()))
            }
            other => other,
        })
    }

    /// Apply `SONDAR_*` overrides from an environment snapshot, then validate.
    ///
    /// Unknown `SONDAR_` keys are ignored.
    pub fn apply_env<I, K, V>(mut self, vars: I) -> SondarResult<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        for (key, value) in vars {
            let (key, value) = (key.as_ref(), value.as_ref());
            let Some(field) = key.strip_prefix(ENV_PREFIX) else {
                continue;
            };
            match field {
                "WAIT_TIMEOUT_MS" => self.wait_timeout_ms = parse_env(key, value)?,
                "POLL_INTERVAL_MS" => self.poll_interval_ms = parse_env(key, value)?,
                "ELEMENT_TIMEOUT_MS" => self.element_timeout_ms = parse_env(key, value)?,
                "MAX_SCROLL_ATTEMPTS" => self.max_scroll_attempts = parse_env(key, value)?,
                "SETTLE_DELAY_MS" => self.settle_delay_ms = parse_env(key, value)?,
                "TAP_SETTLE_MS" => self.tap_settle_ms = parse_env(key, value)?,
                "SWIPE_START_RATIO" => self.swipe_start_ratio = parse_env(key, value)?,
                "SWIPE_END_RATIO" => self.swipe_end_ratio = parse_env(key, value)?,
                "SWIPE_HOLD_MS" => self.swipe_hold_ms = parse_env(key, value)?,
                _ => {}
            }
        }
        self.validate()?;
        Ok(self)
    }

    /// Apply overrides from the process environment
    pub fn from_env(self) -> SondarResult<Self> {
        self.apply_env(std::env::vars())
    }

    /// Check ranges and cross-field invariants
    pub fn validate(&self) -> SondarResult<()> {
        if self.poll_interval_ms < MIN_POLL_INTERVAL_MS {
            return Err(SondarError::config(format!(
                "poll_interval_ms must be at least {MIN_POLL_INTERVAL_MS}, got {}",
                self.poll_interval_ms
            )));
        }
        for (name, timeout) in [
            ("wait_timeout_ms", self.wait_timeout_ms),
            ("element_timeout_ms", self.element_timeout_ms),
        ] {
            if timeout < self.poll_interval_ms {
                return Err(SondarError::config(format!(
                    "{name} ({timeout}) is shorter than poll_interval_ms ({})",
                    self.poll_interval_ms
                )));
            }
        }
        if self.max_scroll_attempts == 0 {
            return Err(SondarError::config("max_scroll_attempts must be at least 1"));
        }
        for (name, ratio) in [
            ("swipe_start_ratio", self.swipe_start_ratio),
            ("swipe_end_ratio", self.swipe_end_ratio),
        ] {
            if !(ratio > 0.0 && ratio < 1.0) {
                return Err(SondarError::config(format!(
                    "{name} must be strictly between 0 and 1, got {ratio}"
                )));
            }
        }
        Ok(())
    }

    /// Condition spec for generic waits
    pub fn condition(&self) -> SondarResult<ConditionSpec> {
        ConditionSpec::from_millis(self.wait_timeout_ms, self.poll_interval_ms)
    }

    /// Wait options for locators
    #[must_use]
    pub const fn locator_options(&self) -> LocatorOptions {
        LocatorOptions {
            timeout: Duration::from_millis(self.element_timeout_ms),
            poll_interval: Duration::from_millis(self.poll_interval_ms),
        }
    }

    /// Swipe geometry
    #[must_use]
    pub const fn swipe_profile(&self) -> SwipeProfile {
        SwipeProfile {
            start_ratio: self.swipe_start_ratio,
            end_ratio: self.swipe_end_ratio,
            hold: Duration::from_millis(self.swipe_hold_ms),
        }
    }

    /// Options for convergence sessions
    #[must_use]
    pub const fn convergence(&self) -> ConvergenceOptions {
        ConvergenceOptions {
            max_attempts: self.max_scroll_attempts,
            settle_delay: Duration::from_millis(self.settle_delay_ms),
            swipe: self.swipe_profile(),
        }
    }

    /// Settle delay after tapping transient controls
    #[must_use]
    pub const fn tap_settle(&self) -> Duration {
        Duration::from_millis(self.tap_settle_ms)
    }

    /// Serialize to YAML
    pub fn to_yaml(&self) -> SondarResult<String> {
        Ok(serde_yaml_ng::to_string(self)?)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::io::Write;

    mod defaults_tests {
        use super::*;

        #[test]
        fn test_defaults_are_valid() {
            let config = ResilienceConfig::default();
            config.validate().unwrap();
            assert_eq!(config.max_scroll_attempts, 20);
            assert_eq!(config.tap_settle(), Duration::from_millis(500));
        }

        #[test]
        fn test_derived_options() {
            let config = ResilienceConfig::new().with_settle_delay_ms(100);
            let convergence = config.convergence();
            assert_eq!(convergence.max_attempts, 20);
            assert_eq!(convergence.settle_delay, Duration::from_millis(100));
            assert_eq!(convergence.swipe.hold, Duration::from_millis(1000));

            let spec = config.condition().unwrap();
            assert_eq!(spec.timeout(), Duration::from_secs(10));
            assert_eq!(spec.interval(), Duration::from_millis(500));
            assert_eq!(config.locator_options().timeout, Duration::from_secs(10));
        }
    }

    mod validation_tests {
        use super::*;

        #[test]
        fn test_interval_below_floor_rejected() {
            let err = ResilienceConfig::new()
                .with_poll_interval_ms(10)
                .validate()
                .unwrap_err();
            assert!(err.to_string().contains("poll_interval_ms"));
        }

        #[test]
        fn test_timeout_shorter_than_interval_rejected() {
            let err = ResilienceConfig::new()
                .with_element_timeout_ms(100)
                .validate()
                .unwrap_err();
            assert!(err.to_string().contains("element_timeout_ms"));
        }

        #[test]
        fn test_zero_attempts_rejected() {
            assert!(ResilienceConfig::new()
                .with_max_scroll_attempts(0)
                .validate()
                .is_err());
        }

        #[test]
        fn test_ratio_out_of_range_rejected() {
            let config = ResilienceConfig {
                swipe_end_ratio: 1.0,
                ..ResilienceConfig::default()
            };
            assert!(config.validate().is_err());
        }
    }

    mod loading_tests {
        use super::*;

        #[test]
        fn test_partial_yaml_keeps_defaults() {
            let config =
                ResilienceConfig::from_yaml_str("poll_interval_ms: 250\nmax_scroll_attempts: 5\n")
                    .unwrap();
            assert_eq!(config.poll_interval_ms, 250);
            assert_eq!(config.max_scroll_attempts, 5);
            assert_eq!(config.wait_timeout_ms, 10_000);
        }

        #[test]
        fn test_invalid_yaml_values_rejected() {
            assert!(ResilienceConfig::from_yaml_str("poll_interval_ms: 1\n").is_err());
            assert!(ResilienceConfig::from_yaml_str("poll_interval_ms: [1]\n").is_err());
        }

        #[test]
        fn test_from_file() {
            let mut file = tempfile::NamedTempFile::new().unwrap();
            writeln!(file, "settle_delay_ms: 150").unwrap();
            let config = ResilienceConfig::from_file(file.path()).unwrap();
            assert_eq!(config.settle_delay_ms, 150);
        }

        #[test]
        fn test_missing_file_is_io_error() {
            let err = ResilienceConfig::from_file("/nonexistent/sondar.yaml").unwrap_err();
            assert!(matches!(err, SondarError::Io(_)));
        }

        #[test]
        fn test_yaml_output_reloads() {
            let config = ResilienceConfig::new().with_tap_settle_ms(750);
            let reloaded = ResilienceConfig::from_yaml_str(&config.to_yaml().unwrap()).unwrap();
            assert_eq!(reloaded, config);
        }
    }

    mod env_tests {
        use super::*;

        #[test]
        fn test_env_overrides() {
            let config = ResilienceConfig::new()
                .apply_env([
                    ("SONDAR_POLL_INTERVAL_MS", "100"),
                    ("SONDAR_MAX_SCROLL_ATTEMPTS", "7"),
                    ("SONDAR_SWIPE_START_RATIO", "0.9"),
                    ("PATH", "/usr/bin"),
                    ("SONDAR_UNKNOWN", "x"),
                ])
                .unwrap();
            assert_eq!(config.poll_interval_ms, 100);
            assert_eq!(config.max_scroll_attempts, 7);
            assert!((config.swipe_start_ratio - 0.9).abs() < f64::EPSILON);
        }

        #[test]
        fn test_unparsable_env_value() {
            let err = ResilienceConfig::new()
                .apply_env([("SONDAR_SETTLE_DELAY_MS", "soon")])
                .unwrap_err();
            assert!(err.to_string().contains("SONDAR_SETTLE_DELAY_MS"));
        }

        #[test]
        fn test_env_result_is_validated() {
            assert!(ResilienceConfig::new()
                .apply_env([("SONDAR_MAX_SCROLL_ATTEMPTS", "0")])
                .is_err());
        }
    }
}
