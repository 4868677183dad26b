// Platform paths for Windows
// Config and data both live under %APPDATA%\bookmark-sync

use std::env;
use std::path::PathBuf;

use super::APP_DIR_NAME;

fn app_data() -> PathBuf {
    match env::var("APPDATA") {
        Ok(dir) => PathBuf::from(dir),
        Err(_) => {
            let profile = env::var("USERPROFILE").unwrap_or_else(|_| String::from("C:\\"));
            PathBuf::from(profile).join("AppData").join("Roaming")
        }
    }
}

pub fn get_config_dir() -> PathBuf {
    app_data().join(APP_DIR_NAME)
}

pub fn get_data_dir() -> PathBuf {
    get_config_dir()
}
