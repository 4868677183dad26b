// Bookmark sync services
// Collaborator contracts (auth, data store, change feed) with their in-process
// implementations, plus alerts and settings.

pub mod auth;
pub mod change_feed;
pub mod data_store;
pub mod listeners;
pub mod notifier;
pub mod settings_engine;
