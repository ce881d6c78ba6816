//! Configuration for the drill CLI
//!
//! Sources, lowest precedence first: built-in defaults, the optional
//! config file, `DRILL_*` environment variables (`__` separates nested
//! keys, e.g. `DRILL_DATABASE__MAX_ATTEMPTS=60`), then CLI flags.

use std::collections::BTreeSet;
use std::time::Duration;

use chrono::NaiveDate;
use drill_core::PollPolicy;
use drill_types::{
    LabelPolicy, RecoverySelector, ResourceKind, TargetParams, TargetSpec,
};
use serde::{Deserialize, Serialize};

use crate::error::{CliError, CliResult};

/// Floor for a simulated poll interval
const MIN_SIMULATED_INTERVAL: Duration = Duration::from_millis(1);

/// Main CLI configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DrillConfig {
    /// Labels applied to restored resources
    #[serde(default)]
    pub labels: LabelsConfig,

    /// Database drill settings
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Volume drill settings
    #[serde(default)]
    pub volume: VolumeConfig,

    /// Whole-run settings
    #[serde(default)]
    pub run: RunConfig,

    /// Simulated backend settings
    #[serde(default)]
    pub simulation: SimulationConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Labeling policy settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabelsConfig {
    /// Value of the `Purpose` tag
    #[serde(default = "default_purpose")]
    pub purpose: String,

    /// Days after the run date before the resource may be deleted
    #[serde(default)]
    pub delete_after_days: u64,
}

impl Default for LabelsConfig {
    fn default() -> Self {
        Self {
            purpose: default_purpose(),
            delete_after_days: 0,
        }
    }
}

/// Database instance drill
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Backup vault to restore from
    #[serde(default)]
    pub vault: Option<String>,

    /// Tag filters as `Key=Value`
    #[serde(default)]
    pub tags: Vec<String>,

    #[serde(default = "default_instance_class")]
    pub instance_class: String,

    /// Provider default zone when unset
    #[serde(default)]
    pub availability_zone: Option<String>,

    #[serde(default)]
    pub publicly_accessible: bool,

    #[serde(default = "default_database_interval")]
    pub poll_interval_secs: u64,

    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Reported against the measured RTO; never affects pass/fail
    #[serde(default)]
    pub rto_objective_secs: Option<u64>,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            vault: Some("Default".to_string()),
            tags: Vec::new(),
            instance_class: default_instance_class(),
            availability_zone: None,
            publicly_accessible: false,
            poll_interval_secs: default_database_interval(),
            max_attempts: default_max_attempts(),
            rto_objective_secs: Some(600),
        }
    }
}

/// Block-storage volume drill
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VolumeConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default)]
    pub vault: Option<String>,

    /// Tag filters as `Key=Value`
    #[serde(default)]
    pub tags: Vec<String>,

    #[serde(default = "default_availability_zone")]
    pub availability_zone: String,

    #[serde(default = "default_volume_type")]
    pub volume_type: String,

    #[serde(default = "default_volume_interval")]
    pub poll_interval_secs: u64,

    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default)]
    pub rto_objective_secs: Option<u64>,
}

impl Default for VolumeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            vault: None,
            tags: vec!["Backup=daily".to_string()],
            availability_zone: default_availability_zone(),
            volume_type: default_volume_type(),
            poll_interval_secs: default_volume_interval(),
            max_attempts: default_max_attempts(),
            rto_objective_secs: Some(120),
        }
    }
}

/// Whole-run settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Cancel the run after this many seconds
    #[serde(default)]
    pub deadline_secs: Option<u64>,

    /// Prefix for restored resource names
    #[serde(default = "default_name_prefix")]
    pub name_prefix: String,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            deadline_secs: None,
            name_prefix: default_name_prefix(),
        }
    }
}

/// In-memory backend behaviour for `run --simulate`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Polls a simulated restore stays pending
    #[serde(default = "default_ready_after")]
    pub ready_after_polls: u32,

    /// Factor each per-kind poll interval is divided by
    #[serde(default = "default_time_scale")]
    pub time_scale: u32,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            ready_after_polls: default_ready_after(),
            time_scale: default_time_scale(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,

    /// JSON format
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

// Default value helpers
fn default_true() -> bool {
    true
}

fn default_purpose() -> String {
    "BackupTest".to_string()
}

fn default_instance_class() -> String {
    "db.t3.micro".to_string()
}

fn default_availability_zone() -> String {
    "us-east-1a".to_string()
}

fn default_volume_type() -> String {
    "gp3".to_string()
}

fn default_database_interval() -> u64 {
    30
}

fn default_volume_interval() -> u64 {
    15
}

fn default_max_attempts() -> u32 {
    40
}

fn default_name_prefix() -> String {
    "restore-test".to_string()
}

fn default_ready_after() -> u32 {
    2
}

fn default_time_scale() -> u32 {
    150
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Parse `Key=Value` tag filters
fn parse_tags(kind: ResourceKind, tags: &[String]) -> CliResult<Vec<(String, String)>> {
    tags.iter()
        .map(|raw| match raw.split_once('=') {
            Some((key, value)) if !key.trim().is_empty() => {
                Ok((key.trim().to_string(), value.trim().to_string()))
            }
            _ => Err(CliError::Config(format!(
                "{} tag filter {:?} is not Key=Value",
                kind, raw
            ))),
        })
        .collect()
}

impl DrillConfig {
    /// Load configuration from defaults, an optional file and the environment
    pub fn load(path: Option<&str>) -> CliResult<Self> {
        let mut builder = config::Config::builder();

        // Add default configuration
        builder = builder.add_source(config::Config::try_from(&DrillConfig::default())?);

        // An explicitly named file must exist
        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(true));
        }

        // Add environment variables with DRILL_ prefix
        builder = builder.add_source(
            config::Environment::with_prefix("DRILL")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config: DrillConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings no drill could run with
    pub fn validate(&self) -> CliResult<()> {
        let today = chrono::Utc::now().date_naive();
        for kind in ResourceKind::ALL {
            if !self.is_enabled(kind) {
                continue;
            }
            self.target_spec(kind, today)?;
            self.selector(kind)?;
            if !self.poll_policy(kind).is_usable() {
                return Err(CliError::Config(format!(
                    "{} needs poll_interval_secs and max_attempts above zero",
                    kind
                )));
            }
        }
        if self.run.name_prefix.trim().is_empty() {
            return Err(CliError::Config("run.name_prefix is empty".to_string()));
        }
        if self.simulation.time_scale == 0 {
            return Err(CliError::Config(
                "simulation.time_scale must be above zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn is_enabled(&self, kind: ResourceKind) -> bool {
        match kind {
            ResourceKind::Database => self.database.enabled,
            ResourceKind::Volume => self.volume.enabled,
        }
    }

    /// Kinds enabled in configuration
    pub fn enabled_kinds(&self) -> BTreeSet<ResourceKind> {
        ResourceKind::ALL
            .into_iter()
            .filter(|kind| self.is_enabled(*kind))
            .collect()
    }

    /// Labels for a run on `run_date`
    pub fn label_policy(&self, run_date: NaiveDate) -> LabelPolicy {
        LabelPolicy::for_run(
            self.labels.purpose.clone(),
            run_date,
            self.labels.delete_after_days,
        )
    }

    pub fn target_spec(&self, kind: ResourceKind, run_date: NaiveDate) -> CliResult<TargetSpec> {
        let params = match kind {
            ResourceKind::Database => TargetParams::Database {
                instance_class: self.database.instance_class.clone(),
                availability_zone: self.database.availability_zone.clone(),
                publicly_accessible: self.database.publicly_accessible,
            },
            ResourceKind::Volume => TargetParams::Volume {
                availability_zone: self.volume.availability_zone.clone(),
                volume_type: self.volume.volume_type.clone(),
            },
        };
        Ok(TargetSpec::new(params, self.label_policy(run_date))?)
    }

    pub fn selector(&self, kind: ResourceKind) -> CliResult<RecoverySelector> {
        let (vault, tags) = match kind {
            ResourceKind::Database => (&self.database.vault, &self.database.tags),
            ResourceKind::Volume => (&self.volume.vault, &self.volume.tags),
        };

        let mut selector = RecoverySelector {
            vault: vault.clone().filter(|v| !v.trim().is_empty()),
            ..RecoverySelector::default()
        };
        for (key, value) in parse_tags(kind, tags)? {
            selector = selector.with_tag(key, value);
        }
        Ok(selector)
    }

    pub fn poll_policy(&self, kind: ResourceKind) -> PollPolicy {
        let (interval, attempts) = match kind {
            ResourceKind::Database => (self.database.poll_interval_secs, self.database.max_attempts),
            ResourceKind::Volume => (self.volume.poll_interval_secs, self.volume.max_attempts),
        };
        PollPolicy::new(Duration::from_secs(interval), attempts)
    }

    /// Per-kind poll policy sped up for `run --simulate`
    pub fn simulated_poll_policy(&self, kind: ResourceKind) -> PollPolicy {
        let policy = self.poll_policy(kind);
        let scaled = policy.interval / self.simulation.time_scale.max(1);
        PollPolicy::new(scaled.max(MIN_SIMULATED_INTERVAL), policy.max_attempts)
    }

    pub fn rto_objective(&self, kind: ResourceKind) -> Option<Duration> {
        match kind {
            ResourceKind::Database => self.database.rto_objective_secs,
            ResourceKind::Volume => self.volume.rto_objective_secs,
        }
        .map(Duration::from_secs)
    }
}
