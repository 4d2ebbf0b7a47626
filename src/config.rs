//! # Runtime configuration.
//!
//! Provides [`JobConfig`] for the job supervisor and [`CallConfig`] for the call coordinator.
//!
//! ## Sentinel values
//! - `max_batch_size = 0` → no limit (the processor may try to finish everything at once)
//! - `CallConfig::default_timeout = 0s` → wait without a deadline
//!
//! ## Environment
//! [`JobConfig::from_env`] reads `<PREFIX>_MAX_BATCH_SIZE`, `<PREFIX>_MAX_INVOCATIONS` and
//! `<PREFIX>_BUS_CAPACITY`, falling back to the defaults for variables that are not set.

use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;

const DEFAULT_MAX_BATCH_SIZE: usize = 5000;
const DEFAULT_MAX_INVOCATIONS: u32 = 40;

/// Configuration for one job type driven by a [`JobSupervisor`](crate::JobSupervisor).
///
/// ## Field semantics
/// - `max_batch_size`: items handed to the processor per invocation (`0` = unlimited)
/// - `max_invocations`: invocation ceiling; an incomplete job at this invocation is stopped
/// - `bus_capacity`: event bus ring buffer size (min 1; clamped by Bus)
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct JobConfig {
    /// Maximum number of items a single invocation may process.
    pub max_batch_size: usize,

    /// Maximum number of invocations for one job chain.
    ///
    /// When invocation `n >= max_invocations` still reports an incomplete batch, no
    /// continuation is requested and a tracked job is marked
    /// [`JobStatus::FinishedFailureMaxInvocations`](crate::JobStatus::FinishedFailureMaxInvocations).
    pub max_invocations: u32,

    /// Capacity of the event bus broadcast channel ring buffer.
    pub bus_capacity: usize,
}

impl JobConfig {
    /// Returns the batch limit as an `Option` (`None` = unlimited).
    #[inline]
    pub fn batch_limit(&self) -> Option<usize> {
        if self.max_batch_size == 0 {
            None
        } else {
            Some(self.max_batch_size)
        }
    }

    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }

    /// Preset for the per-fleet charge calculation job.
    pub fn charge_calculation() -> Self {
        Self::default()
    }

    /// Preset for the global charge cache refresh job (untracked).
    pub fn cache_refresh() -> Self {
        Self::default()
    }

    /// Preset for bulk vehicle registration from an uploaded file.
    pub fn registration() -> Self {
        Self {
            max_batch_size: 1000,
            ..Self::default()
        }
    }

    /// Checks invariants that the supervisor relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_invocations == 0 {
            return Err(ConfigError::ZeroInvocations);
        }
        Ok(())
    }

    /// Builds a config from environment variables sharing `prefix`.
    ///
    /// ```
    /// use jobvisor::JobConfig;
    ///
    /// // Nothing set: defaults.
    /// let cfg = JobConfig::from_env("JOBVISOR_DOCTEST_UNSET").unwrap();
    /// assert_eq!(cfg, JobConfig::default());
    /// ```
    pub fn from_env(prefix: &str) -> Result<Self, ConfigError> {
        Self::from_lookup(prefix, |key| std::env::var(key).ok())
    }

    fn from_lookup(
        prefix: &str,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let mut cfg = Self::default();
        if let Some(v) = parse_var(&lookup, &format!("{prefix}_MAX_BATCH_SIZE"))? {
            cfg.max_batch_size = v;
        }
        if let Some(v) = parse_var(&lookup, &format!("{prefix}_MAX_INVOCATIONS"))? {
            cfg.max_invocations = v;
        }
        if let Some(v) = parse_var(&lookup, &format!("{prefix}_BUS_CAPACITY"))? {
            cfg.bus_capacity = v;
        }
        cfg.validate()?;
        Ok(cfg)
    }
}

fn parse_var<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Result<Option<T>, ConfigError> {
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue {
                key: key.to_string(),
                value: raw,
            }),
    }
}

impl Default for JobConfig {
    /// Default configuration:
    ///
    /// - `max_batch_size = 5000`
    /// - `max_invocations = 40`
    /// - `bus_capacity = 1024`
    fn default() -> Self {
        Self {
            max_batch_size: DEFAULT_MAX_BATCH_SIZE,
            max_invocations: DEFAULT_MAX_INVOCATIONS,
            bus_capacity: 1024,
        }
    }
}

/// Configuration for the [`CallCoordinator`](crate::CallCoordinator).
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CallConfig {
    /// Deadline used by the `*_default` await helpers (`0s` = no deadline).
    #[serde(with = "millis")]
    pub default_timeout: Duration,
}

impl CallConfig {
    /// Returns the default deadline as an `Option` (`None` = wait forever).
    #[inline]
    pub fn deadline(&self) -> Option<Duration> {
        if self.default_timeout == Duration::ZERO {
            None
        } else {
            Some(self.default_timeout)
        }
    }
}

impl Default for CallConfig {
    /// `default_timeout = 10s`.
    fn default() -> Self {
        Self {
            default_timeout: Duration::from_secs(10),
        }
    }
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}
