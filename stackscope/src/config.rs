//! Profiler configuration
//!
//! Holds the profiled package selection and the two timer periods. The
//! configuration is shared between the controller and the periodic tasks via
//! [`SharedConfig`]; every tick reads a fresh copy, so package changes apply
//! to the next tick and period changes to the next resumption.

use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use stackscope_common::INFRASTRUCTURE_THREAD_PREFIXES;

use crate::classification::ProfiledPackages;
use crate::domain::ProfilerError;

/// Default sampling period in milliseconds.
pub const DEFAULT_SAMPLING_PERIOD_MS: u64 = 50;

/// Default thread view refresh period in milliseconds.
pub const DEFAULT_REFRESH_PERIOD_MS: u64 = 1000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfilerConfig {
    /// Interval between stack samples
    pub sampling_period_ms: u64,

    /// Interval between thread/dependency refreshes
    pub refresh_period_ms: u64,

    /// Packages whose frames are aggregated (empty = none)
    pub profiled_packages: ProfiledPackages,

    /// Threads whose name starts with any of these are ignored
    pub excluded_thread_prefixes: Vec<String>,
}

impl Default for ProfilerConfig {
    fn default() -> Self {
        Self {
            sampling_period_ms: DEFAULT_SAMPLING_PERIOD_MS,
            refresh_period_ms: DEFAULT_REFRESH_PERIOD_MS,
            profiled_packages: ProfiledPackages::new(),
            excluded_thread_prefixes: INFRASTRUCTURE_THREAD_PREFIXES
                .iter()
                .map(|p| (*p).to_owned())
                .collect(),
        }
    }
}

impl ProfilerConfig {
    #[must_use]
    pub fn sampling_period(&self) -> Duration {
        Duration::from_millis(self.sampling_period_ms)
    }

    #[must_use]
    pub fn refresh_period(&self) -> Duration {
        Duration::from_millis(self.refresh_period_ms)
    }

    /// Reject periods a timer cannot run with.
    ///
    /// # Errors
    /// Returns an error if either period is zero
    pub fn validate(&self) -> Result<(), ProfilerError> {
        if self.sampling_period_ms == 0 {
            return Err(ProfilerError::InvalidSamplingPeriod(self.sampling_period_ms));
        }
        if self.refresh_period_ms == 0 {
            return Err(ProfilerError::InvalidRefreshPeriod(self.refresh_period_ms));
        }
        Ok(())
    }
}

/// Configuration shared between the controller and its timer threads.
#[derive(Debug, Clone, Default)]
pub struct SharedConfig(Arc<RwLock<ProfilerConfig>>);

impl SharedConfig {
    #[must_use]
    pub fn new(config: ProfilerConfig) -> Self {
        Self(Arc::new(RwLock::new(config)))
    }

    /// Copy of the current configuration.
    #[must_use]
    pub fn snapshot(&self) -> ProfilerConfig {
        self.0.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Apply `change` to the configuration in place.
    pub fn update(&self, change: impl FnOnce(&mut ProfilerConfig)) {
        let mut config = self.0.write().unwrap_or_else(PoisonError::into_inner);
        change(&mut config);
    }
}
