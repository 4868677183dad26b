// Bookmark sync platform abstraction
// Provides platform-specific paths for Windows, macOS, and Linux.
//
// Uses `cfg(target_os)` for conditional compilation to select the correct
// platform-specific implementation at compile time.

use std::path::PathBuf;

#[cfg(target_os = "linux")]
mod linux;

#[cfg(target_os = "macos")]
mod macos;

#[cfg(target_os = "windows")]
mod windows;

/// Directory name used under every platform root.
pub const APP_DIR_NAME: &str = "bookmark-sync";

/// Returns the platform-specific configuration directory.
///
/// - **Linux**: `~/.config/bookmark-sync` (or `$XDG_CONFIG_HOME/bookmark-sync`)
/// - **macOS**: `~/Library/Application Support/bookmark-sync`
/// - **Windows**: `%APPDATA%/bookmark-sync`
pub fn get_config_dir() -> PathBuf {
    #[cfg(target_os = "linux")]
    {
        linux::get_config_dir()
    }
    #[cfg(target_os = "macos")]
    {
        macos::get_config_dir()
    }
    #[cfg(target_os = "windows")]
    {
        windows::get_config_dir()
    }
}

/// Returns the platform-specific data directory, where the local database lives.
///
/// - **Linux**: `~/.local/share/bookmark-sync` (or `$XDG_DATA_HOME/bookmark-sync`)
/// - **macOS**: `~/Library/Application Support/bookmark-sync`
/// - **Windows**: `%APPDATA%/bookmark-sync`
pub fn get_data_dir() -> PathBuf {
    #[cfg(target_os = "linux")]
    {
        linux::get_data_dir()
    }
    #[cfg(target_os = "macos")]
    {
        macos::get_data_dir()
    }
    #[cfg(target_os = "windows")]
    {
        windows::get_data_dir()
    }
}
