//! Tiered configuration.
//!
//! Configuration is assembled from four tiers, later tiers overriding earlier
//! ones field by field:
//! 1. **Defaults** - [`Config::default`]
//! 2. **Project** - `$CWD/tasknest/config.yaml`
//! 3. **User** - `~/.tasknest/config.yaml`
//! 4. **Environment** - see below
//!
//! ## Environment Variables
//! - `TASKNEST_CONFIG_PATH` - Explicit config file (skips tiers 1-3)
//! - `TASKNEST_DB_PATH` - Database path
//! - `TASKNEST_STORAGE_DIR` - Image storage root
//! - `TASKNEST_USER` - Signed-in identity
//! - `TASKNEST_USER_DIR` - User config dir (default: `~/.tasknest`)
//! - `TASKNEST_PROJECT_DIR` - Project config dir (default: `./tasknest`)

mod loader;
mod types;

pub use loader::{ConfigLoader, ConfigPaths, deep_merge};
pub use types::*;
