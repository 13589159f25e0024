//! Configuration loader with tier-based merging.
//!
//! Loads configuration from multiple tiers and merges them field-by-field.

use super::merge::deep_merge_all;
use super::types::Config;
use anyhow::{Context, Result};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Configuration tier priority (lowest to highest).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ConfigTier {
    /// Embedded defaults (lowest priority)
    Defaults = 0,
    /// Project-level config ($CWD/workforce/)
    Project = 1,
    /// User-level config (~/.workforce/)
    User = 2,
    /// Environment variables (highest priority)
    Environment = 3,
}

impl std::fmt::Display for ConfigTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigTier::Defaults => write!(f, "defaults"),
            ConfigTier::Project => write!(f, "project"),
            ConfigTier::User => write!(f, "user"),
            ConfigTier::Environment => write!(f, "environment"),
        }
    }
}

/// Directories searched for `config.yaml`.
#[derive(Debug, Clone)]
pub struct ConfigPaths {
    /// Project-level config directory
    pub project_dir: Option<PathBuf>,
    /// User-level config directory
    pub user_dir: Option<PathBuf>,
}

impl Default for ConfigPaths {
    fn default() -> Self {
        Self::discover()
    }
}

impl ConfigPaths {
    /// Discover configuration paths from environment and defaults.
    pub fn discover() -> Self {
        // User dir: WORKFORCE_USER_DIR or ~/.workforce
        let user_dir = std::env::var("WORKFORCE_USER_DIR")
            .ok()
            .map(PathBuf::from)
            .or_else(|| dirs::home_dir().map(|h| h.join(".workforce")));

        // Project dir: WORKFORCE_PROJECT_DIR or $CWD/workforce
        let project_dir = std::env::var("WORKFORCE_PROJECT_DIR")
            .ok()
            .map(PathBuf::from)
            .or_else(|| Some(PathBuf::from("workforce")));

        Self {
            project_dir,
            user_dir,
        }
    }

    /// Create paths with explicit directories.
    pub fn with_dirs(project_dir: Option<PathBuf>, user_dir: Option<PathBuf>) -> Self {
        Self {
            project_dir,
            user_dir,
        }
    }

    fn config_file(&self, tier: ConfigTier) -> Option<PathBuf> {
        let dir = match tier {
            ConfigTier::Project => self.project_dir.as_ref(),
            ConfigTier::User => self.user_dir.as_ref(),
            ConfigTier::Defaults | ConfigTier::Environment => None,
        }?;
        Some(dir.join("config.yaml"))
    }
}

/// Configuration loader that handles tier-based merging.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    /// Paths for each tier
    pub paths: ConfigPaths,
    /// Loaded configuration
    config: Config,
    /// Highest-priority config file that contributed (if any)
    config_path: Option<PathBuf>,
}

impl ConfigLoader {
    /// Load configuration from all tiers with proper merging.
    pub fn load() -> Result<Self> {
        Self::load_with_paths(ConfigPaths::discover())
    }

    /// Load configuration with explicit paths.
    pub fn load_with_paths(paths: ConfigPaths) -> Result<Self> {
        // Check for explicit config path override
        if let Ok(explicit_path) = std::env::var("WORKFORCE_CONFIG_PATH") {
            return Self::load_file(paths, PathBuf::from(explicit_path));
        }

        let mut tiers: Vec<Value> = vec![serde_json::to_value(Config::default())?];
        let mut config_path = None;

        for tier in [ConfigTier::Project, ConfigTier::User] {
            let Some(file) = paths.config_file(tier) else {
                continue;
            };
            if let Some(value) = read_yaml_tier(&file, tier) {
                tiers.push(value);
                config_path = Some(file);
            }
        }

        let merged = deep_merge_all(tiers);
        let mut config: Config =
            serde_json::from_value(merged).context("Invalid merged configuration")?;

        Self::apply_env_overrides(&mut config)?;
        config.validate()?;

        Ok(Self {
            paths,
            config,
            config_path,
        })
    }

    /// Load a single explicit config file in place of the tiers.
    pub fn load_file(paths: ConfigPaths, path: PathBuf) -> Result<Self> {
        let mut config = Config::load(&path)
            .with_context(|| format!("Failed to load config file {}", path.display()))?;
        Self::apply_env_overrides(&mut config)?;
        config.validate()?;
        Ok(Self {
            paths,
            config,
            config_path: Some(path),
        })
    }

    /// Apply environment variable overrides to config.
    fn apply_env_overrides(config: &mut Config) -> Result<()> {
        if let Ok(db_path) = std::env::var("WORKFORCE_DB_PATH") {
            config.server.db_path = PathBuf::from(db_path);
        }

        if let Ok(port) = std::env::var("WORKFORCE_PORT") {
            config.server.port = port
                .parse()
                .with_context(|| format!("WORKFORCE_PORT is not a port number: {}", port))?;
        }

        if let Ok(zone) = std::env::var("WORKFORCE_TIME_ZONE") {
            config.clock.time_zone = zone;
        }

        Ok(())
    }

    /// Get the loaded configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get mutable access to the configuration.
    pub fn config_mut(&mut self) -> &mut Config {
        &mut self.config
    }

    /// Consume the loader and return the configuration.
    pub fn into_config(self) -> Config {
        self.config
    }

    /// Get the config file path that was used.
    pub fn config_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }
}

/// Read one tier's YAML file. Missing files are skipped silently; unreadable
/// or malformed ones are skipped with a warning.
fn read_yaml_tier(file: &Path, tier: ConfigTier) -> Option<Value> {
    if !file.exists() {
        return None;
    }
    let content = match std::fs::read_to_string(file) {
        Ok(content) => content,
        Err(e) => {
            warn!(tier = %tier, path = %file.display(), error = %e, "Skipping unreadable config file");
            return None;
        }
    };
    match serde_yaml::from_str::<Value>(&content) {
        Ok(value) => {
            debug!(tier = %tier, path = %file.display(), "Loaded config tier");
            Some(value)
        }
        Err(e) => {
            warn!(tier = %tier, path = %file.display(), error = %e, "Skipping malformed config file");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SweepPolicy;
    use tempfile::TempDir;

    #[test]
    fn test_config_paths_discover() {
        let paths = ConfigPaths::discover();
        assert!(paths.project_dir.is_some());
    }

    #[test]
    fn test_load_defaults_only() {
        let temp = TempDir::new().unwrap();
        let paths = ConfigPaths::with_dirs(
            Some(temp.path().join("project")),
            Some(temp.path().join("user")),
        );

        let loader = ConfigLoader::load_with_paths(paths).unwrap();
        let config = loader.config();

        assert_eq!(config.workday.end_of_day_hour, 17);
        assert_eq!(config.server.port, 5000);
        assert!(loader.config_path().is_none());
    }

    #[test]
    fn test_project_config_overrides_defaults() {
        let temp = TempDir::new().unwrap();
        let project_dir = temp.path().join("workforce");
        std::fs::create_dir_all(&project_dir).unwrap();

        let config_content = r#"
workday:
  end_of_day_hour: 18
queues:
  teams:
    claims: ["Claims Review", "Break"]
"#;
        std::fs::write(project_dir.join("config.yaml"), config_content).unwrap();

        let paths = ConfigPaths::with_dirs(Some(project_dir), Some(temp.path().join("user")));

        let loader = ConfigLoader::load_with_paths(paths).unwrap();
        let config = loader.config();

        assert_eq!(config.workday.end_of_day_hour, 18);
        assert_eq!(config.workday.sweep_policy, SweepPolicy::BackdateToCutoff);
        assert_eq!(config.queues.teams["claims"], vec!["Claims Review", "Break"]);
        // the default list survives because it was not overridden
        assert_eq!(config.queues.default.len(), 24);
    }

    #[test]
    fn test_user_config_overrides_project() {
        let temp = TempDir::new().unwrap();
        let project_dir = temp.path().join("workforce");
        let user_dir = temp.path().join("user");
        std::fs::create_dir_all(&project_dir).unwrap();
        std::fs::create_dir_all(&user_dir).unwrap();

        let project_config = r#"
workday:
  end_of_day_hour: 18
  sweep_hour: 2
"#;
        std::fs::write(project_dir.join("config.yaml"), project_config).unwrap();

        let user_config = r#"
workday:
  end_of_day_hour: 16
"#;
        std::fs::write(user_dir.join("config.yaml"), user_config).unwrap();

        let paths = ConfigPaths::with_dirs(Some(project_dir), Some(user_dir.clone()));

        let loader = ConfigLoader::load_with_paths(paths).unwrap();
        let config = loader.config();

        assert_eq!(config.workday.end_of_day_hour, 16);
        assert_eq!(config.workday.sweep_hour, 2);
        assert_eq!(loader.config_path(), Some(user_dir.join("config.yaml").as_path()));
    }

    #[test]
    fn test_invalid_merged_values_are_rejected() {
        let temp = TempDir::new().unwrap();
        let project_dir = temp.path().join("workforce");
        std::fs::create_dir_all(&project_dir).unwrap();
        std::fs::write(
            project_dir.join("config.yaml"),
            "workday:\n  end_of_day_hour: 25\n",
        )
        .unwrap();

        let paths = ConfigPaths::with_dirs(Some(project_dir), None);
        assert!(ConfigLoader::load_with_paths(paths).is_err());
    }

    #[test]
    fn test_malformed_tier_is_skipped() {
        let temp = TempDir::new().unwrap();
        let project_dir = temp.path().join("workforce");
        std::fs::create_dir_all(&project_dir).unwrap();
        std::fs::write(project_dir.join("config.yaml"), "workday: [unclosed").unwrap();

        let paths = ConfigPaths::with_dirs(Some(project_dir), None);
        let loader = ConfigLoader::load_with_paths(paths).unwrap();
        assert_eq!(loader.config().workday.end_of_day_hour, 17);
    }

    #[test]
    fn test_explicit_file_replaces_tiers() {
        let temp = TempDir::new().unwrap();
        let project_dir = temp.path().join("workforce");
        std::fs::create_dir_all(&project_dir).unwrap();
        std::fs::write(
            project_dir.join("config.yaml"),
            "workday:\n  end_of_day_hour: 18\n",
        )
        .unwrap();

        let explicit = temp.path().join("explicit.yaml");
        std::fs::write(&explicit, "referrals:\n  stale_after_days: 3\n").unwrap();

        let paths = ConfigPaths::with_dirs(Some(project_dir), None);
        let loader = ConfigLoader::load_file(paths, explicit.clone()).unwrap();
        assert_eq!(loader.config().referrals.stale_after_days, 3);
        // project tier is not consulted
        assert_eq!(loader.config().workday.end_of_day_hour, 17);
        assert_eq!(loader.config_path(), Some(explicit.as_path()));
    }
}
