// Configuration management with layered configuration (file, env)

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Prefix of the environment overrides, e.g. `RSYNC_TRAY__SYNC__TOOL=rsync`
pub const ENV_PREFIX: &str = "RSYNC_TRAY";

/// Main settings structure containing all configuration options
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Executable invoked for every run
    #[serde(default = "default_tool")]
    pub tool: String,
    /// Location of the persisted job document; `~` expands to `$HOME`
    #[serde(default = "default_jobs_file")]
    pub jobs_file: String,
    /// Run every job once at startup
    #[serde(default = "default_sync_on_start")]
    pub sync_on_start: bool,
    /// Delay before the startup run
    #[serde(default = "default_initial_sync_delay")]
    pub initial_sync_delay_seconds: u64,
}

fn default_tool() -> String {
    "rsync".to_string()
}

fn default_jobs_file() -> String {
    "~/.config/rsync-tray/config.json".to_string()
}

fn default_sync_on_start() -> bool {
    true
}

fn default_initial_sync_delay() -> u64 {
    5
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            tool: default_tool(),
            jobs_file: default_jobs_file(),
            sync_on_start: default_sync_on_start(),
            initial_sync_delay_seconds: default_initial_sync_delay(),
        }
    }
}

impl SyncConfig {
    /// Job document path with a leading `~` expanded
    pub fn jobs_file_path(&self) -> PathBuf {
        expand_home(&self.jobs_file, std::env::var_os("HOME").map(PathBuf::from))
    }
}

fn expand_home(path: &str, home: Option<PathBuf>) -> PathBuf {
    match (path.strip_prefix("~"), home) {
        (Some(rest), Some(home)) if rest.is_empty() || rest.starts_with('/') => {
            home.join(rest.trim_start_matches('/'))
        }
        _ => PathBuf::from(path),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Pretty,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_log_format")]
    pub log_format: LogFormat,
    /// Prometheus exporter port; no exporter when unset
    #[serde(default)]
    pub metrics_port: Option<u16>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> LogFormat {
    LogFormat::Pretty
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: default_log_format(),
            metrics_port: None,
        }
    }
}

impl Settings {
    /// Load configuration with layered precedence: defaults → file → env
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_path("config")
    }

    /// Load configuration from a specific directory
    pub fn load_from_path<P: AsRef<Path>>(config_dir: P) -> Result<Self, ConfigError> {
        let config_dir = config_dir.as_ref();

        let builder = Config::builder()
            // Start with default configuration
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            // Add local configuration (not committed to git)
            .add_source(File::from(config_dir.join("local.toml")).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            );

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// Validate configuration settings
    pub fn validate(&self) -> Result<(), String> {
        if self.sync.tool.trim().is_empty() {
            return Err("Sync tool cannot be empty".to_string());
        }
        if self.sync.jobs_file.trim().is_empty() {
            return Err("Sync jobs_file cannot be empty".to_string());
        }
        if self.observability.metrics_port == Some(0) {
            return Err("Metrics port must be greater than 0".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_default_settings_are_valid() {
        let settings = Settings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.sync.tool, "rsync");
        assert_eq!(settings.sync.initial_sync_delay_seconds, 5);
    }

    #[test]
    fn test_validation_catches_empty_tool() {
        let mut settings = Settings::default();
        settings.sync.tool = "  ".to_string();
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_validation_catches_zero_metrics_port() {
        let mut settings = Settings::default();
        settings.observability.metrics_port = Some(0);
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_load_from_path_reads_default_toml() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("default.toml"),
            r#"
[sync]
tool = "/usr/local/bin/rsync"
sync_on_start = false

[observability]
log_format = "json"
metrics_port = 9191
"#,
        )
        .unwrap();

        let settings = Settings::load_from_path(dir.path()).unwrap();
        assert_eq!(settings.sync.tool, "/usr/local/bin/rsync");
        assert!(!settings.sync.sync_on_start);
        assert_eq!(settings.sync.initial_sync_delay_seconds, 5);
        assert_eq!(settings.observability.log_format, LogFormat::Json);
        assert_eq!(settings.observability.metrics_port, Some(9191));
    }

    #[test]
    fn test_load_from_empty_directory_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let settings = Settings::load_from_path(dir.path()).unwrap();
        assert_eq!(settings.sync.tool, "rsync");
        assert_eq!(settings.observability.log_level, "info");
    }

    #[test]
    fn test_expand_home() {
        let home = Some(PathBuf::from("/home/user"));
        assert_eq!(
            expand_home("~/.config/rsync-tray/config.json", home.clone()),
            PathBuf::from("/home/user/.config/rsync-tray/config.json")
        );
        assert_eq!(expand_home("~", home.clone()), PathBuf::from("/home/user"));
        assert_eq!(expand_home("~other/x", home), PathBuf::from("~other/x"));
        assert_eq!(expand_home("~/x", None), PathBuf::from("~/x"));
    }
}
