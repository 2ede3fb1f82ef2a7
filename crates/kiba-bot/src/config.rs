//! Application configuration.

use crate::error::{AppError, AppResult};
use chrono::format::{Item, StrftimeItems};
use kiba_feed::{EngineConfig, ReporterConfig, DEFAULT_DISPLAY_DECIMALS, DEFAULT_WINDOW_CAPACITY};
use kiba_ws::ConnectionConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// Environment variable naming the config file.
pub const CONFIG_ENV: &str = "KIBA_CONFIG";

/// Config file picked up when present and nothing else is given.
pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Largest scale a `rust_decimal::Decimal` can carry.
const MAX_DISPLAY_DECIMALS: u32 = 28;

/// Window and rounding settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineSection {
    /// Prices kept per (source, instrument). Default: 60.
    #[serde(default = "default_window_capacity")]
    pub window_capacity: usize,
    /// Decimal places of the stored and reported aggregate. Default: 8.
    #[serde(default = "default_display_decimals")]
    pub display_decimals: u32,
}

fn default_window_capacity() -> usize {
    DEFAULT_WINDOW_CAPACITY
}

fn default_display_decimals() -> u32 {
    DEFAULT_DISPLAY_DECIMALS
}

impl Default for EngineSection {
    fn default() -> Self {
        Self {
            window_capacity: default_window_capacity(),
            display_decimals: default_display_decimals(),
        }
    }
}

/// Report cadence and line format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportSection {
    /// Report interval (ms). Default: 1,000.
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
    /// strftime pattern of the local-time prefix. Default: `%H:%M:%S`.
    #[serde(default = "default_timestamp_format")]
    pub timestamp_format: String,
}

fn default_interval_ms() -> u64 {
    1_000
}

fn default_timestamp_format() -> String {
    "%H:%M:%S".to_string()
}

impl Default for ReportSection {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            timestamp_format: default_timestamp_format(),
        }
    }
}

/// WebSocket reconnect settings shared by every source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WsConfig {
    /// 0 = retry forever.
    #[serde(default)]
    pub max_reconnect_attempts: u32,
    #[serde(default = "default_reconnect_base_delay_ms")]
    pub reconnect_base_delay_ms: u64,
    #[serde(default = "default_reconnect_max_delay_ms")]
    pub reconnect_max_delay_ms: u64,
    #[serde(default = "default_idle_timeout_ms")]
    pub idle_timeout_ms: u64,
}

fn default_reconnect_base_delay_ms() -> u64 {
    1_000
}

fn default_reconnect_max_delay_ms() -> u64 {
    60_000
}

fn default_idle_timeout_ms() -> u64 {
    30_000
}

impl Default for WsConfig {
    fn default() -> Self {
        Self {
            max_reconnect_attempts: 0,
            reconnect_base_delay_ms: default_reconnect_base_delay_ms(),
            reconnect_max_delay_ms: default_reconnect_max_delay_ms(),
            idle_timeout_ms: default_idle_timeout_ms(),
        }
    }
}

impl From<WsConfig> for ConnectionConfig {
    fn from(cfg: WsConfig) -> Self {
        Self {
            max_reconnect_attempts: cfg.max_reconnect_attempts,
            reconnect_base_delay_ms: cfg.reconnect_base_delay_ms,
            reconnect_max_delay_ms: cfg.reconnect_max_delay_ms,
            idle_timeout_ms: cfg.idle_timeout_ms,
            ..Default::default()
        }
    }
}

/// Exchange endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExchangesConfig {
    /// Raw stream base; the market stream name is appended.
    #[serde(default = "default_binance_ws_url")]
    pub binance_ws_url: String,
    #[serde(default = "default_bitfinex_ws_url")]
    pub bitfinex_ws_url: String,
}

fn default_binance_ws_url() -> String {
    "wss://stream.binance.com:9443/ws".to_string()
}

fn default_bitfinex_ws_url() -> String {
    "wss://api-pub.bitfinex.com/ws/2".to_string()
}

impl Default for ExchangesConfig {
    fn default() -> Self {
        Self {
            binance_ws_url: default_binance_ws_url(),
            bitfinex_ws_url: default_bitfinex_ws_url(),
        }
    }
}

/// Telemetry configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Default log filter, overridden by `RUST_LOG`.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub engine: EngineSection,
    #[serde(default)]
    pub report: ReportSection,
    #[serde(default)]
    pub websocket: WsConfig,
    #[serde(default)]
    pub exchanges: ExchangesConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

impl AppConfig {
    /// Load configuration: explicit path > `KIBA_CONFIG` > default file if
    /// present > built-in defaults.
    pub fn load(cli_path: Option<&str>) -> AppResult<Self> {
        let explicit = cli_path
            .map(str::to_string)
            .or_else(|| std::env::var(CONFIG_ENV).ok());

        match explicit {
            Some(path) => Self::from_file(&path),
            None if Path::new(DEFAULT_CONFIG_PATH).exists() => Self::from_file(DEFAULT_CONFIG_PATH),
            None => {
                let config = Self::default();
                config.validate()?;
                Ok(config)
            }
        }
    }

    /// Load configuration from file.
    pub fn from_file(path: &str) -> AppResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::Config(format!("Failed to read {path}: {e}")))?;
        let config = Self::from_toml(&content)?;
        info!(config_path = %path, "Configuration loaded");
        Ok(config)
    }

    /// Parse and validate TOML text.
    pub fn from_toml(content: &str) -> AppResult<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| AppError::Config(format!("Failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> AppResult<()> {
        if self.engine.window_capacity == 0 {
            return Err(AppError::Config(
                "engine.window_capacity must be at least 1".to_string(),
            ));
        }
        if self.engine.display_decimals > MAX_DISPLAY_DECIMALS {
            return Err(AppError::Config(format!(
                "engine.display_decimals must be at most {MAX_DISPLAY_DECIMALS}"
            )));
        }
        if self.report.interval_ms == 0 {
            return Err(AppError::Config(
                "report.interval_ms must be at least 1".to_string(),
            ));
        }
        if StrftimeItems::new(&self.report.timestamp_format).any(|item| matches!(item, Item::Error))
        {
            return Err(AppError::Config(format!(
                "report.timestamp_format is not a valid strftime pattern: {}",
                self.report.timestamp_format
            )));
        }
        Ok(())
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            window_capacity: self.engine.window_capacity,
            display_decimals: self.engine.display_decimals,
        }
    }

    pub fn reporter_config(&self) -> ReporterConfig {
        ReporterConfig {
            interval: Duration::from_millis(self.report.interval_ms),
            timestamp_format: self.report.timestamp_format.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.engine.window_capacity, 60);
        assert_eq!(config.engine.display_decimals, 8);
        assert_eq!(config.report.interval_ms, 1000);
        assert_eq!(config.websocket.max_reconnect_attempts, 0);
        assert_eq!(config.exchanges.binance_ws_url, "wss://stream.binance.com:9443/ws");
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = AppConfig::from_toml(
            r#"
            [engine]
            window_capacity = 10

            [exchanges]
            bitfinex_ws_url = "ws://127.0.0.1:9000"
            "#,
        )
        .unwrap();

        assert_eq!(config.engine.window_capacity, 10);
        assert_eq!(config.engine.display_decimals, 8);
        assert_eq!(config.exchanges.bitfinex_ws_url, "ws://127.0.0.1:9000");
        assert_eq!(config.report.timestamp_format, "%H:%M:%S");
        assert_eq!(config.engine_config().window_capacity, 10);
        assert_eq!(config.reporter_config().interval, Duration::from_secs(1));
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        for toml_str in [
            "[engine]\nwindow_capacity = 0",
            "[engine]\ndisplay_decimals = 29",
            "[report]\ninterval_ms = 0",
            "[report]\ntimestamp_format = \"%Q\"",
        ] {
            let err = AppConfig::from_toml(toml_str).unwrap_err();
            assert!(matches!(err, AppError::Config(_)), "{toml_str}");
        }
    }

    #[test]
    fn test_ws_config_conversion() {
        let ws = WsConfig {
            max_reconnect_attempts: 3,
            ..Default::default()
        };
        let conn: ConnectionConfig = ws.into();
        assert_eq!(conn.max_reconnect_attempts, 3);
        assert_eq!(conn.reconnect_max_delay_ms, 60_000);
        assert!(conn.url.is_empty());
    }

    #[test]
    fn test_config_serialization() {
        let toml_str = toml::to_string(&AppConfig::default()).unwrap();
        assert!(toml_str.contains("window_capacity"));
        assert!(toml_str.contains("bitfinex_ws_url"));
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let err = AppConfig::from_file("does/not/exist.toml").unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }
}
