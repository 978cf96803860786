//! Reporting thresholds and runtime configuration.

use std::fmt;
use std::path::Path;

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

pub const DEFAULT_PASSING_GRADE: f64 = 51.0;
pub const DEFAULT_PARTICIPATION_PASSING: f64 = 3.0;
pub const DEFAULT_ATTENDANCE_ALERT_RATE: f64 = 80.0;
pub const DEFAULT_LEADERBOARD_SIZE: usize = 10;

/// A score range used by a bucketed distribution.
///
/// `min` is inclusive. `max` is exclusive, except for the first (highest)
/// bucket of a set, whose `max` is the top of the scale and inclusive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bucket {
    pub label: &'static str,
    pub min: f64,
    pub max: f64,
}

/// Highest first. Covers 0..=100 without gaps.
pub const GRADE_BUCKETS: [Bucket; 6] = [
    Bucket { label: "90-100", min: 90.0, max: 100.0 },
    Bucket { label: "80-89", min: 80.0, max: 90.0 },
    Bucket { label: "70-79", min: 70.0, max: 80.0 },
    Bucket { label: "60-69", min: 60.0, max: 70.0 },
    Bucket { label: "51-59", min: 51.0, max: 60.0 },
    Bucket { label: "0-50", min: 0.0, max: 51.0 },
];

/// Highest first. Covers 0..=5 without gaps.
pub const PARTICIPATION_BUCKETS: [Bucket; 5] = [
    Bucket { label: "4.5-5", min: 4.5, max: 5.0 },
    Bucket { label: "3.5-4.4", min: 3.5, max: 4.5 },
    Bucket { label: "2.5-3.4", min: 2.5, max: 3.5 },
    Bucket { label: "1.5-2.4", min: 1.5, max: 2.5 },
    Bucket { label: "0-1.4", min: 0.0, max: 1.5 },
];

/// Thresholds shared by every report kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportingConfig {
    pub passing_grade: f64,
    /// Mean participation score (0-5 scale) a student needs to pass.
    pub participation_passing: f64,
    /// Percent of effective attendance under which a student is flagged.
    pub attendance_alert_rate: f64,
    pub leaderboard_size: usize,
    pub alert_limit: Option<usize>,
}

impl Default for ReportingConfig {
    fn default() -> Self {
        Self {
            passing_grade: DEFAULT_PASSING_GRADE,
            participation_passing: DEFAULT_PARTICIPATION_PASSING,
            attendance_alert_rate: DEFAULT_ATTENDANCE_ALERT_RATE,
            leaderboard_size: DEFAULT_LEADERBOARD_SIZE,
            alert_limit: None,
        }
    }
}

#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub database_url: Option<String>,
    pub reporting: ReportingConfig,
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("database_url", &self.database_url.as_ref().map(|_| "<redacted>"))
            .field("reporting", &self.reporting)
            .finish()
    }
}

impl AppConfig {
    /// Defaults, then an optional TOML file, then `ACADEMIC_REPORTS_*` variables.
    /// `DATABASE_URL` fills the database URL when nothing else set it.
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        figment = figment.merge(Env::prefixed("ACADEMIC_REPORTS_").split("__"));

        let mut config: Self = figment.extract()?;
        if config.database_url.is_none() {
            config.database_url = std::env::var("DATABASE_URL").ok();
        }
        Ok(config)
    }
}
