use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use pkgmux_platform::AppPaths;

use crate::error::AppError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppSettings {
    #[serde(default)]
    pub debug_logging: bool,

    #[serde(default = "default_max_log_size_bytes")]
    pub max_log_size_bytes: u64,

    #[serde(default = "default_operation_timeout")]
    pub operation_timeout_secs: u64,

    #[serde(default = "default_probe_timeout")]
    pub probe_timeout_secs: u64,

    #[serde(default = "default_scan_root")]
    pub default_scan_root: String,

    /// Managers that are never registered.
    #[serde(default)]
    pub disabled_managers: Vec<String>,
}

fn default_max_log_size_bytes() -> u64 {
    5 * 1024 * 1024
}

fn default_operation_timeout() -> u64 {
    120
}

fn default_probe_timeout() -> u64 {
    5
}

fn default_scan_root() -> String {
    ".".to_string()
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            debug_logging: false,
            max_log_size_bytes: default_max_log_size_bytes(),
            operation_timeout_secs: default_operation_timeout(),
            probe_timeout_secs: default_probe_timeout(),
            default_scan_root: default_scan_root(),
            disabled_managers: Vec::new(),
        }
    }
}

impl AppSettings {
    /// Settings from the platform settings file. A missing or unreadable
    /// file yields the defaults.
    pub fn load() -> Self {
        let Ok(paths) = AppPaths::new() else {
            return Self::default();
        };
        let settings_path = paths.settings_file();

        if !settings_path.exists() {
            return Self::default();
        }
        match Self::load_from(&settings_path) {
            Ok(settings) => settings,
            Err(e) => {
                // Logging is not up yet.
                eprintln!("warning: {e}; using default settings");
                Self::default()
            }
        }
    }

    /// Settings from an explicit file, which must exist and parse.
    pub fn load_from(path: &Path) -> Result<Self, AppError> {
        let content = std::fs::read_to_string(path).map_err(|e| AppError::settings(path, e))?;
        serde_json::from_str(&content).map_err(|e| AppError::settings(path, e))
    }

    pub fn operation_timeout(&self) -> Duration {
        Duration::from_secs(self.operation_timeout_secs)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }
}
