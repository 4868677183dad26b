use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::session::{AuthProvider, UserId};

/// Top-level application settings container.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SyncSettings {
    pub backend: BackendSettings,
    pub sync: SyncTuning,
    pub auth: AuthSettings,
    pub logging: LoggingSettings,
}

/// `database_path` value that keeps the local backend in memory.
pub const IN_MEMORY_DATABASE: &str = ":memory:";

/// Where bookmark records live.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BackendSettings {
    /// SQLite file for the local backend. `None` uses `bookmarks.db` in the
    /// platform data directory; [`IN_MEMORY_DATABASE`] keeps nothing on disk.
    pub database_path: Option<String>,
    pub table: String,
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            database_path: None,
            table: "bookmarks".to_string(),
        }
    }
}

/// Real-time sync tuning.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SyncTuning {
    /// Change notifications arriving within this window collapse into one refetch.
    pub refetch_debounce_ms: u64,
}

impl Default for SyncTuning {
    fn default() -> Self {
        Self {
            refetch_debounce_ms: 150,
        }
    }
}

/// Accounts known to the local auth provider.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuthSettings {
    pub default_provider: AuthProvider,
    pub accounts: BTreeMap<AuthProvider, UserId>,
}

impl Default for AuthSettings {
    fn default() -> Self {
        let mut accounts = BTreeMap::new();
        accounts.insert(AuthProvider::Google, UserId::new("local-user"));
        Self {
            default_provider: AuthProvider::Google,
            accounts,
        }
    }
}

/// Log output settings. `RUST_LOG` takes precedence when set.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingSettings {
    pub filter: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            filter: "bookmark_sync=info".to_string(),
        }
    }
}
