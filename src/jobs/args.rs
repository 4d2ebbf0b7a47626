//! Arguments of the three job types run by the supervisor.
//!
//! Each job type is a [`JobSupervisor`](crate::JobSupervisor) parameterized by one of
//! these argument types; the aliases below name the combinations.

use serde::{Deserialize, Serialize};

use crate::jobs::supervisor::JobSupervisor;

const DEFAULT_REFRESH_DAYS: u32 = 30;

/// Bulk vehicle registration from an uploaded file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationArgs {
    /// Storage bucket holding the upload.
    pub bucket: String,
    /// Object key of the upload.
    pub filename: String,
}

impl RegistrationArgs {
    /// Creates registration arguments.
    pub fn new(bucket: impl Into<String>, filename: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            filename: filename.into(),
        }
    }
}

/// Charge calculation for one fleet account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChargeCalculationArgs {
    /// Fleet account whose vehicles are processed.
    pub account_id: String,
}

impl ChargeCalculationArgs {
    /// Creates charge calculation arguments.
    pub fn new(account_id: impl Into<String>) -> Self {
        Self {
            account_id: account_id.into(),
        }
    }
}

/// Global charge cache refresh. Runs untracked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheRefreshArgs {
    /// Entries older than this many days are refreshed.
    #[serde(default = "default_refresh_days")]
    pub refresh_days: u32,
}

fn default_refresh_days() -> u32 {
    DEFAULT_REFRESH_DAYS
}

impl Default for CacheRefreshArgs {
    /// `refresh_days = 30`.
    fn default() -> Self {
        Self {
            refresh_days: DEFAULT_REFRESH_DAYS,
        }
    }
}

/// Supervisor for bulk registration jobs.
pub type RegistrationSupervisor = JobSupervisor<RegistrationArgs>;
/// Supervisor for per-account charge calculation jobs.
pub type ChargeCalculationSupervisor = JobSupervisor<ChargeCalculationArgs>;
/// Supervisor for the global cache refresh job.
pub type CacheRefreshSupervisor = JobSupervisor<CacheRefreshArgs>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refresh_days_defaults_to_thirty() {
        let args: CacheRefreshArgs = serde_json::from_str("{}").unwrap();
        assert_eq!(args, CacheRefreshArgs::default());
        assert_eq!(args.refresh_days, 30);
    }

    #[test]
    fn registration_args_are_camel_case() {
        let json = serde_json::to_value(RegistrationArgs::new("uploads", "fleet.csv")).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"bucket": "uploads", "filename": "fleet.csv"})
        );
    }
}
