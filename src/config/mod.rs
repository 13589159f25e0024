//! Unified configuration system.
//!
//! Consolidates configuration from three tiers with field-by-field YAML merging:
//! 1. **Defaults** - Compiled into [`Config::default`]
//! 2. **Project** - `$CWD/workforce/config.yaml`
//! 3. **User** - `~/.workforce/config.yaml`
//!
//! Environment variables are applied last, then CLI flags in `main`.
//!
//! ## Environment Variables
//! - `WORKFORCE_CONFIG_PATH` - Explicit config file (skips tier discovery)
//! - `WORKFORCE_DB_PATH` - Database path
//! - `WORKFORCE_PORT` - HTTP port
//! - `WORKFORCE_TIME_ZONE` - IANA zone used for day boundaries
//! - `WORKFORCE_USER_DIR` - User config dir (default: `~/.workforce`)
//! - `WORKFORCE_PROJECT_DIR` - Project config dir (default: `./workforce`)

mod loader;
mod merge;
mod types;

pub use loader::{ConfigLoader, ConfigPaths, ConfigTier};
pub use merge::{deep_merge, deep_merge_all};
pub use types::*;
