//! App core for bookmark sync.
//!
//! Wires settings, the local backend and the view-state controller together.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use crate::database::Database;
use crate::managers::view_state_controller::{Collaborators, ControllerOptions, ViewStateController};
use crate::platform;
use crate::services::auth::LocalAuth;
use crate::services::change_feed::LocalChangeFeed;
use crate::services::data_store::SqliteDataStore;
use crate::services::notifier::RecordingNotifier;
use crate::services::settings_engine::{SettingsEngine, SettingsEngineTrait};
use crate::types::errors::AppError;
use crate::types::settings::{BackendSettings, SyncSettings, IN_MEMORY_DATABASE};

/// File name of the local database inside the platform data directory.
pub const DATABASE_FILE: &str = "bookmarks.db";

/// Where the local database lives: `None` for in-memory, otherwise a file.
///
/// Without an explicit `database_path` the platform data directory is used.
pub fn database_file(backend: &BackendSettings) -> Option<PathBuf> {
    match backend.database_path.as_deref() {
        Some(IN_MEMORY_DATABASE) => None,
        Some(path) => Some(PathBuf::from(path)),
        None => Some(platform::get_data_dir().join(DATABASE_FILE)),
    }
}

/// In-process auth, data store and change feed sharing one database.
///
/// The store publishes its writes to the feed, so any writer holding
/// `store` (another session, a test) triggers real-time notifications.
#[derive(Clone)]
pub struct LocalBackend {
    pub auth: Arc<LocalAuth>,
    pub store: Arc<SqliteDataStore>,
    pub feed: Arc<LocalChangeFeed>,
}

impl LocalBackend {
    /// Opens the configured database, creating its directory if needed.
    pub fn open(settings: &SyncSettings) -> Result<Self, AppError> {
        let db = match database_file(&settings.backend) {
            Some(path) => {
                if let Some(parent) = path.parent() {
                    fs::create_dir_all(parent)?;
                }
                tracing::debug!(path = %path.display(), "opening bookmark database");
                Database::open(&path)?
            }
            None => Database::open_in_memory()?,
        };
        Ok(Self::with_database(db, settings))
    }

    pub fn with_database(db: Database, settings: &SyncSettings) -> Self {
        let feed = Arc::new(LocalChangeFeed::new());
        let store = Arc::new(SqliteDataStore::new(db, settings.backend.table.clone()).with_feed(feed.clone()));
        let auth = Arc::new(LocalAuth::from_settings(&settings.auth));
        Self { auth, store, feed }
    }
}

/// Central application struct.
pub struct App {
    pub settings_engine: SettingsEngine,
    pub backend: LocalBackend,
    pub notifier: Arc<RecordingNotifier>,
    pub controller: ViewStateController,
}

impl App {
    /// Builds the app around `settings`, persisted at the platform config path.
    pub fn new(settings: SyncSettings) -> Result<Self, AppError> {
        Self::with_engine(SettingsEngine::new(None).with_settings(settings))
    }

    /// Builds the app around whatever `engine` currently holds.
    pub fn with_engine(engine: SettingsEngine) -> Result<Self, AppError> {
        let backend = LocalBackend::open(engine.get_settings())?;
        Ok(Self::with_backend(engine, backend))
    }

    pub fn with_backend(settings_engine: SettingsEngine, backend: LocalBackend) -> Self {
        let notifier = Arc::new(RecordingNotifier::new());
        let collaborators = Collaborators {
            auth: backend.auth.clone(),
            store: backend.store.clone(),
            feed: backend.feed.clone(),
            notifier: notifier.clone(),
        };
        let options = ControllerOptions::from_settings(settings_engine.get_settings());
        let controller = ViewStateController::new(collaborators, options);
        Self {
            settings_engine,
            backend,
            notifier,
            controller,
        }
    }

    /// Loads settings from `config_path` (or the platform default) and builds the app.
    pub fn from_config(config_path: Option<String>) -> Result<Self, AppError> {
        let mut engine = SettingsEngine::new(config_path);
        engine.load()?;
        Self::with_engine(engine)
    }

    pub fn settings(&self) -> &SyncSettings {
        self.settings_engine.get_settings()
    }

    /// Resolves the current session and waits for the initial fetch, if any.
    pub async fn startup(&mut self) {
        self.controller.initialize_session();
        self.controller.settle().await;
        tracing::info!(
            authenticated = self.controller.state().is_authenticated(),
            "bookmark sync started"
        );
    }

    pub fn shutdown(&mut self) {
        self.controller.teardown();
        tracing::info!("bookmark sync stopped");
    }
}
