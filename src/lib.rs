//! Bookmark sync — a personal bookmark list kept in step with a remote store.
//!
//! This library crate exposes all modules for use by the binaries and integration tests.

pub mod app;
pub mod database;
pub mod logging;
pub mod managers;
pub mod platform;
pub mod rpc_handler;
pub mod services;
pub mod types;
