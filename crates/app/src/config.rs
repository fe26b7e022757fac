use directories::BaseDirs;
use shared::settings::AppSettings;
use std::path::PathBuf;

const APP_DIR: &str = "freddie";

/// Get the config file path
pub fn config_path() -> Option<PathBuf> {
    BaseDirs::new().map(|dirs| dirs.config_dir().join(APP_DIR).join("settings.json"))
}

/// Directory for the saved-chat store, unless overridden in settings.
pub fn data_dir(settings: &AppSettings) -> Option<PathBuf> {
    if let Some(dir) = &settings.history.dir {
        return Some(PathBuf::from(dir));
    }
    BaseDirs::new().map(|dirs| dirs.data_dir().join(APP_DIR))
}

/// Load settings from disk or return defaults.
///
/// The flag is false when no usable settings file was found.
pub fn load_settings_or_default() -> (AppSettings, bool) {
    if let Some(path) = config_path() {
        if let Ok(contents) = std::fs::read_to_string(&path) {
            match serde_json::from_str::<AppSettings>(&contents) {
                Ok(settings) => return (settings, true),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "ignoring malformed settings")
                }
            }
        }
    }
    (AppSettings::default(), false)
}

/// Save settings to disk
pub fn save_settings(settings: &AppSettings) {
    if let Some(path) = config_path() {
        if let Some(parent) = path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        if let Ok(json) = serde_json::to_string_pretty(settings) {
            if let Err(e) = std::fs::write(&path, json) {
                tracing::warn!(path = %path.display(), error = %e, "failed to write settings");
            }
        }
    }
}
