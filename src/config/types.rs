//! Configuration types and structures.
//!
//! This module contains all the configuration types used throughout the application.

use anyhow::{Result, anyhow};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Default port for the HTTP API.
pub const DEFAULT_PORT: u16 = 5000;

/// Team key used when a user has no team or the team has no queue list.
pub const DEFAULT_TEAM: &str = "default";

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub clock: ClockConfig,

    #[serde(default)]
    pub workday: WorkdayConfig,

    #[serde(default)]
    pub queues: QueuesConfig,

    #[serde(default)]
    pub referrals: ReferralsConfig,
}

/// Server-specific configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Address the HTTP API binds to.
    #[serde(default = "default_host")]
    pub host: String,

    /// Port for the HTTP API (default: 5000).
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("workforce/tracker.db")
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

/// Wall-clock settings used for every day-boundary computation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClockConfig {
    /// IANA time zone name (e.g. "America/New_York").
    #[serde(default = "default_time_zone")]
    pub time_zone: String,
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            time_zone: default_time_zone(),
        }
    }
}

fn default_time_zone() -> String {
    "America/New_York".to_string()
}

impl ClockConfig {
    /// Parse the configured zone name.
    pub fn zone(&self) -> Result<Tz> {
        self.time_zone
            .parse::<Tz>()
            .map_err(|e| anyhow!("Invalid time zone '{}': {}", self.time_zone, e))
    }
}

/// How the reconciliation sweep chooses the end time of a stale task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SweepPolicy {
    /// End the task at the end-of-day hour of its own start day (default).
    #[default]
    BackdateToCutoff,
    /// End the task at the moment the sweep runs.
    CloseAtSweepTime,
}

/// Working-day settings: end-of-business hour and sweep schedule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkdayConfig {
    /// Local hour (0-23) treated as end of business on a task's start day.
    #[serde(default = "default_end_of_day_hour")]
    pub end_of_day_hour: u32,

    /// Local hour (0-23) at which the daily sweep runs.
    #[serde(default)]
    pub sweep_hour: u32,

    /// End-time policy for tasks the sweep closes.
    #[serde(default)]
    pub sweep_policy: SweepPolicy,

    /// Disable the scheduled sweep (the `sweep` subcommand still works).
    #[serde(default = "default_true")]
    pub sweep_enabled: bool,

    /// Length of the trailing window returned by the recent-tasks query.
    #[serde(default = "default_recent_days")]
    pub recent_days: u32,
}

impl Default for WorkdayConfig {
    fn default() -> Self {
        Self {
            end_of_day_hour: default_end_of_day_hour(),
            sweep_hour: 0,
            sweep_policy: SweepPolicy::default(),
            sweep_enabled: true,
            recent_days: default_recent_days(),
        }
    }
}

fn default_end_of_day_hour() -> u32 {
    17
}

fn default_recent_days() -> u32 {
    7
}

fn default_true() -> bool {
    true
}

/// Allowed queue names, per team.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueuesConfig {
    /// Queues available to any team without its own list.
    #[serde(default = "QueuesConfig::default_queues")]
    pub default: Vec<String>,

    /// Per-team queue lists; a listed team sees only its own queues.
    #[serde(default)]
    pub teams: HashMap<String, Vec<String>>,
}

impl Default for QueuesConfig {
    fn default() -> Self {
        Self {
            default: Self::default_queues(),
            teams: HashMap::new(),
        }
    }
}

impl QueuesConfig {
    /// Built-in queue list.
    pub fn default_queues() -> Vec<String> {
        [
            "Personal Email",
            "SF Discount Dispute",
            "Alpha Split: Discount Dispute",
            "Alpha Split: Pre-service Dispute",
            "PCS: Data I Dispute",
            "PCS: Faircost Dispute",
            "PCS: Discount Dispute",
            "PCS: Pre-service Dispute",
            "PCS: FH Discount Dispute",
            "PCS: FH Pre-service Dispute",
            "PCS: MP Discount Dispute",
            "PCS: MP Pre-service Dispute",
            "HCBB Data Project",
            "Chapel",
            "Break",
            "Training",
            "Lunch",
            "IT Issue",
            "PCS Email Inbox",
            "LinkedIn Learning",
            "Meeting",
            "Aged Calls Cleaning",
            "Personal Queue",
            "Direct Contracts",
        ]
        .into_iter()
        .map(String::from)
        .collect()
    }
}

/// Referral log settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferralsConfig {
    /// In-progress referrals untouched for this many days are due for update.
    #[serde(default = "default_stale_after_days")]
    pub stale_after_days: i64,
}

impl Default for ReferralsConfig {
    fn default() -> Self {
        Self {
            stale_after_days: default_stale_after_days(),
        }
    }
}

fn default_stale_after_days() -> i64 {
    10
}

impl Config {
    /// Load configuration from file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values that would make day-boundary math meaningless.
    pub fn validate(&self) -> Result<()> {
        self.clock.zone()?;

        if self.workday.end_of_day_hour > 23 {
            return Err(anyhow!(
                "workday.end_of_day_hour must be 0-23, got {}",
                self.workday.end_of_day_hour
            ));
        }
        if self.workday.sweep_hour > 23 {
            return Err(anyhow!(
                "workday.sweep_hour must be 0-23, got {}",
                self.workday.sweep_hour
            ));
        }
        if self.workday.recent_days == 0 {
            return Err(anyhow!("workday.recent_days must be at least 1"));
        }
        if self.referrals.stale_after_days < 0 {
            return Err(anyhow!("referrals.stale_after_days must not be negative"));
        }
        if self.queues.default.iter().any(|q| q.trim().is_empty()) {
            return Err(anyhow!("queues.default contains an empty queue name"));
        }
        for (team, queues) in &self.queues.teams {
            if queues.is_empty() {
                return Err(anyhow!("queues.teams.{} has no queues", team));
            }
        }
        Ok(())
    }

    /// Ensure the database directory exists.
    pub fn ensure_db_dir(&self) -> Result<()> {
        if let Some(parent) = self.server.db_path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.workday.end_of_day_hour, 17);
        assert_eq!(config.workday.sweep_hour, 0);
        assert_eq!(config.workday.sweep_policy, SweepPolicy::BackdateToCutoff);
        assert_eq!(config.referrals.stale_after_days, 10);
        assert_eq!(config.queues.default.len(), 24);
    }

    #[test]
    fn rejects_unknown_time_zone() {
        let mut config = Config::default();
        config.clock.time_zone = "Mars/Olympus_Mons".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_out_of_range_hours() {
        let mut config = Config::default();
        config.workday.end_of_day_hour = 24;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.workday.sweep_hour = 30;
        assert!(config.validate().is_err());
    }

    #[test]
    fn sweep_policy_parses_from_yaml() {
        let yaml = "workday:\n  sweep_policy: close_at_sweep_time\n";
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.workday.sweep_policy, SweepPolicy::CloseAtSweepTime);
        // untouched fields keep their defaults
        assert_eq!(config.workday.end_of_day_hour, 17);
    }
}
