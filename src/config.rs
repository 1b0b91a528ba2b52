use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub monitor: MonitorConfig,
    #[serde(default)]
    pub launch: LaunchConfig,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub webhook: WebhookConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Detection and alerting cadence
#[derive(Debug, Clone, Deserialize)]
pub struct MonitorConfig {
    /// Seconds between supervisor ticks
    #[serde(default = "default_tick_secs")]
    pub tick_secs: u64,
    /// Trailing window scanned for error bursts, in seconds
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,
    /// Errors per second required before an alert is considered
    #[serde(default = "default_alert_threshold")]
    pub alert_threshold: u32,
    /// Minimum seconds between two alerts for the same service
    #[serde(default = "default_send_interval_secs")]
    pub send_interval_secs: i64,
    /// Seconds between historical-log cleanup sweeps (shared timer)
    #[serde(default = "default_cleanup_interval_secs")]
    pub cleanup_interval_secs: i64,
}

fn default_tick_secs() -> u64 {
    1
}

fn default_window_secs() -> u64 {
    60
}

fn default_alert_threshold() -> u32 {
    10
}

fn default_send_interval_secs() -> i64 {
    60
}

fn default_cleanup_interval_secs() -> i64 {
    3600
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            tick_secs: default_tick_secs(),
            window_secs: default_window_secs(),
            alert_threshold: default_alert_threshold(),
            send_interval_secs: default_send_interval_secs(),
            cleanup_interval_secs: default_cleanup_interval_secs(),
        }
    }
}

/// Launch confirmation polling
#[derive(Debug, Clone, Deserialize)]
pub struct LaunchConfig {
    /// Attempts to confirm the listening port after a launch
    #[serde(default = "default_confirm_retries")]
    pub confirm_retries: u32,
    /// Delay between confirmation attempts in milliseconds
    #[serde(default = "default_confirm_delay_ms")]
    pub confirm_delay_ms: u64,
}

fn default_confirm_retries() -> u32 {
    100
}

fn default_confirm_delay_ms() -> u64 {
    100
}

impl Default for LaunchConfig {
    fn default() -> Self {
        Self {
            confirm_retries: default_confirm_retries(),
            confirm_delay_ms: default_confirm_delay_ms(),
        }
    }
}

/// Filesystem layout around the supervised services
#[derive(Debug, Clone, Deserialize)]
pub struct PathsConfig {
    /// Service descriptor list (JSON, key `server_list`)
    #[serde(default = "default_servers_file")]
    pub servers_file: String,
    /// Directory receiving day-partitioned status reports
    #[serde(default = "default_report_dir")]
    pub report_dir: String,
    /// Per-service log directory is this prefix + executable name
    #[serde(default = "default_log_dir_prefix")]
    pub log_dir_prefix: String,
    /// Script invoked per service on each retention sweep
    #[serde(default = "default_cleanup_script")]
    pub cleanup_script: String,
    /// File holding the deployed `service_semver=` line
    #[serde(default = "default_project_config")]
    pub project_config: String,
}

fn default_servers_file() -> String {
    "config/server.json".to_string()
}

fn default_report_dir() -> String {
    "report_log".to_string()
}

fn default_log_dir_prefix() -> String {
    "../Log".to_string()
}

fn default_cleanup_script() -> String {
    "clean_history_log.sh".to_string()
}

fn default_project_config() -> String {
    "project_config".to_string()
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            servers_file: default_servers_file(),
            report_dir: default_report_dir(),
            log_dir_prefix: default_log_dir_prefix(),
            cleanup_script: default_cleanup_script(),
            project_config: default_project_config(),
        }
    }
}

/// Outbound alert channel
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookConfig {
    /// Webhook endpoint; alerts are log-only when empty
    #[serde(default)]
    pub url: String,
    /// Request timeout in seconds
    #[serde(default = "default_webhook_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_webhook_timeout_secs() -> u64 {
    10
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            timeout_secs: default_webhook_timeout_secs(),
        }
    }
}

impl WebhookConfig {
    pub fn enabled(&self) -> bool {
        !self.url.is_empty()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter used when RUST_LOG is unset
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl AppConfig {
    /// Load configuration from files and environment
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from("config")
    }

    /// Load configuration from a specific directory
    pub fn load_from<P: AsRef<Path>>(config_dir: P) -> Result<Self, ConfigError> {
        let config_dir = config_dir.as_ref();

        let builder = Config::builder()
            // Load default config file
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            // Load environment-specific config (e.g., config/production.toml)
            .add_source(
                File::from(config_dir.join(
                    std::env::var("SENTINEL_ENV").unwrap_or_else(|_| "development".to_string()),
                ))
                .required(false),
            )
            // Override with environment variables (SENTINEL_WEBHOOK__URL, etc.)
            .add_source(
                Environment::with_prefix("SENTINEL")
                    .separator("__")
                    .try_parsing(true),
            );

        builder.build()?.try_deserialize()
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.monitor.tick_secs == 0 {
            errors.push("monitor.tick_secs must be at least 1".to_string());
        }

        if self.monitor.window_secs == 0 {
            errors.push("monitor.window_secs must be positive".to_string());
        }

        if self.monitor.alert_threshold == 0 {
            errors.push("monitor.alert_threshold must be positive".to_string());
        }

        if self.monitor.send_interval_secs <= 0 {
            errors.push("monitor.send_interval_secs must be positive".to_string());
        }

        if self.monitor.cleanup_interval_secs <= 0 {
            errors.push("monitor.cleanup_interval_secs must be positive".to_string());
        }

        if self.launch.confirm_retries == 0 {
            errors.push("launch.confirm_retries must be positive".to_string());
        }

        if self.paths.servers_file.is_empty() {
            errors.push("paths.servers_file must not be empty".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
