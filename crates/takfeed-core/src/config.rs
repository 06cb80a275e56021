//! Configuration management for the takfeed event generator.
//!
//! This module provides a typed configuration system that supports:
//! - Loading from YAML files
//! - Environment variable overrides (`TAKFEED__SECTION__FIELD`)
//! - Validation of all settings
//! - Connection, queue, producer and logging sections, each with defaults

use crate::error::{ConfigError, Result};
use crate::types::{Endpoint, Protocol, TlsConfig};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::Level;

/// Prefix for environment variable overrides
pub const ENV_PREFIX: &str = "TAKFEED";

/// Main application configuration.
///
/// Every section falls back to its defaults, so an empty document is a
/// complete configuration that sends to a local TAK server over TCP.
///
/// # Examples
///
/// ```no_run
/// use takfeed_core::config::AppConfig;
///
/// // Load from file
/// let config = AppConfig::from_file("takfeed.yaml").unwrap();
///
/// // Validate before use
/// config.validate().unwrap();
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// TAK server connection
    #[serde(default)]
    pub tak: TakConfig,

    /// Transmission queue between producers and the transmit worker
    #[serde(default)]
    pub queue: QueueConfig,

    /// Incident converter settings
    #[serde(default)]
    pub incidents: IncidentConfig,

    /// Drone simulator settings
    #[serde(default)]
    pub drone: DroneConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Creates a new default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::file_not_found(path.display().to_string()).into());
        }

        let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::LoadFailed {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

        Self::from_yaml(&contents)
    }

    /// Loads configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML cannot be parsed.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(|e| {
            ConfigError::InvalidFormat {
                reason: e.to_string(),
            }
            .into()
        })
    }

    /// Loads configuration using the `config` crate: an optional file layered
    /// under `TAKFEED__*` environment variables.
    ///
    /// `TAKFEED__TAK__URL=tls://10.0.0.5:8089` overrides `tak.url`.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded or merged.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();

        if let Some(path) = path {
            if !path.exists() {
                return Err(ConfigError::file_not_found(path.display().to_string()).into());
            }
            builder = builder.add_source(config::File::from(path).required(true));
        }

        let source = path
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "environment".to_string());

        let config = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| ConfigError::LoadFailed {
                path: source,
                reason: e.to_string(),
            })?;

        config.try_deserialize().map_err(|e| {
            ConfigError::InvalidFormat {
                reason: e.to_string(),
            }
            .into()
        })
    }

    /// Validates the configuration.
    ///
    /// Checks for:
    /// - A parsable `tcp://`, `udp://` or `tls://` endpoint
    /// - Client certificate and key for TLS endpoints, present on disk
    /// - A non-zero queue capacity
    /// - Positive update interval and stale offsets for the producers
    /// - In-range drone start position
    /// - A known log level
    ///
    /// # Errors
    ///
    /// Returns the first problem found.
    pub fn validate(&self) -> Result<()> {
        self.tak.validate()?;

        if self.queue.capacity == 0 {
            let reason = "must be greater than 0";
            return Err(ConfigError::invalid_value("queue.capacity", reason).into());
        }

        self.incidents.validate()?;
        self.drone.validate()?;
        self.logging.parse_level()?;

        Ok(())
    }
}

/// TAK server connection settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TakConfig {
    /// Server endpoint, e.g. `tls://takserver.example.com:8089`
    #[serde(default = "default_url")]
    pub url: String,

    /// Client certificate settings, required for `tls://` endpoints
    #[serde(default)]
    pub tls: Option<TlsConfig>,

    /// Connection timeout in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Per-event write timeout in seconds
    #[serde(default = "default_write_timeout")]
    pub write_timeout_secs: u64,

    /// Reconnect behaviour after a failed connect or write
    #[serde(default)]
    pub reconnect: ReconnectSettings,
}

fn default_url() -> String {
    "tcp://127.0.0.1:8087".to_string()
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_write_timeout() -> u64 {
    10
}

impl Default for TakConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            tls: None,
            connect_timeout_secs: default_connect_timeout(),
            write_timeout_secs: default_write_timeout(),
            reconnect: ReconnectSettings::default(),
        }
    }
}

impl TakConfig {
    /// Parses `url` into an endpoint.
    pub fn endpoint(&self) -> Result<Endpoint> {
        Endpoint::parse(&self.url)
    }

    /// Returns the connection timeout as a Duration.
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// Returns the write timeout as a Duration.
    pub fn write_timeout(&self) -> Duration {
        Duration::from_secs(self.write_timeout_secs)
    }

    fn validate(&self) -> Result<()> {
        let endpoint = self.endpoint()?;

        if endpoint.protocol == Protocol::Tls {
            let tls = self.tls.as_ref().ok_or_else(|| ConfigError::missing_field("tak.tls"))?;
            validate_tls_config(tls)?;
        }

        if self.connect_timeout_secs == 0 {
            return Err(ConfigError::invalid_value(
                "tak.connect_timeout_secs",
                "must be greater than 0",
            )
            .into());
        }

        if self.write_timeout_secs == 0 {
            return Err(ConfigError::invalid_value(
                "tak.write_timeout_secs",
                "must be greater than 0",
            )
            .into());
        }

        self.reconnect.validate()
    }
}

/// Validates a TLS configuration.
fn validate_tls_config(tls: &TlsConfig) -> Result<()> {
    if tls.client_cert_path.as_os_str().is_empty() {
        return Err(ConfigError::missing_field("tak.tls.client_cert_path").into());
    }

    if tls.client_key_path.as_os_str().is_empty() {
        return Err(ConfigError::missing_field("tak.tls.client_key_path").into());
    }

    if !tls.client_cert_path.exists() {
        return Err(ConfigError::invalid_value(
            "tak.tls.client_cert_path",
            format!("Client certificate not found: {:?}", tls.client_cert_path),
        )
        .into());
    }

    if !tls.client_key_path.exists() {
        return Err(ConfigError::invalid_value(
            "tak.tls.client_key_path",
            format!("Client key not found: {:?}", tls.client_key_path),
        )
        .into());
    }

    if let Some(ref ca_path) = tls.ca_cert_path {
        if !ca_path.exists() {
            return Err(ConfigError::invalid_value(
                "tak.tls.ca_cert_path",
                format!("CA certificate not found: {:?}", ca_path),
            )
            .into());
        }
    }

    Ok(())
}

/// Reconnect settings as written in the configuration file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconnectSettings {
    /// Enable auto-reconnect
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// First backoff in milliseconds
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,

    /// Backoff ceiling in seconds
    #[serde(default = "default_max_backoff_secs")]
    pub max_backoff_secs: u64,

    /// Exponential growth factor
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Give up after this many attempts (unlimited when absent)
    #[serde(default)]
    pub max_attempts: Option<u32>,
}

fn default_true() -> bool {
    true
}

fn default_initial_backoff_ms() -> u64 {
    1000
}

fn default_max_backoff_secs() -> u64 {
    60
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

impl Default for ReconnectSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_secs: default_max_backoff_secs(),
            backoff_multiplier: default_backoff_multiplier(),
            max_attempts: None,
        }
    }
}

impl ReconnectSettings {
    pub fn initial_backoff(&self) -> Duration {
        Duration::from_millis(self.initial_backoff_ms)
    }

    pub fn max_backoff(&self) -> Duration {
        Duration::from_secs(self.max_backoff_secs)
    }

    fn validate(&self) -> Result<()> {
        if self.backoff_multiplier.is_nan() || self.backoff_multiplier < 1.0 {
            return Err(ConfigError::invalid_value(
                "tak.reconnect.backoff_multiplier",
                format!("must be at least 1.0, got {}", self.backoff_multiplier),
            )
            .into());
        }

        if self.initial_backoff() > self.max_backoff() {
            return Err(ConfigError::invalid_value(
                "tak.reconnect.initial_backoff_ms",
                "must not exceed max_backoff_secs",
            )
            .into());
        }

        Ok(())
    }
}

/// Transmission queue settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Events buffered before producers block
    #[serde(default = "default_queue_capacity")]
    pub capacity: usize,
}

fn default_queue_capacity() -> usize {
    1000
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            capacity: default_queue_capacity(),
        }
    }
}

/// Incident converter settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncidentConfig {
    /// Namespace in front of the incident number in every uid
    #[serde(default = "default_uid_prefix")]
    pub uid_prefix: String,

    /// CoT type stamped on every converted incident
    #[serde(default = "default_incident_type")]
    pub cot_type: String,

    /// Seconds between start and stale
    #[serde(default = "default_incident_stale")]
    pub stale_secs: u64,

    /// Iconset path of the marker icon
    #[serde(default = "default_icon_path")]
    pub icon_path: String,

    /// Group color attached to ACTIVE incidents
    #[serde(default = "default_active_group")]
    pub active_group: String,
}

fn default_uid_prefix() -> String {
    "GeoSafety".to_string()
}

fn default_incident_type() -> String {
    "a-u-G".to_string()
}

fn default_incident_stale() -> u64 {
    3600
}

fn default_icon_path() -> String {
    "6d781afb-89a6-4c07-b2b9-a89748b6a38f/Misc/Camp.png".to_string()
}

fn default_active_group() -> String {
    "Orange".to_string()
}

impl Default for IncidentConfig {
    fn default() -> Self {
        Self {
            uid_prefix: default_uid_prefix(),
            cot_type: default_incident_type(),
            stale_secs: default_incident_stale(),
            icon_path: default_icon_path(),
            active_group: default_active_group(),
        }
    }
}

impl IncidentConfig {
    fn validate(&self) -> Result<()> {
        if self.uid_prefix.is_empty() {
            return Err(ConfigError::missing_field("incidents.uid_prefix").into());
        }

        if self.stale_secs == 0 {
            return Err(
                ConfigError::invalid_value("incidents.stale_secs", "must be greater than 0").into(),
            );
        }

        Ok(())
    }
}

/// Drone simulator settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DroneConfig {
    /// Start latitude in decimal degrees
    #[serde(default = "default_start_lat")]
    pub start_lat: f64,

    /// Start longitude in decimal degrees
    #[serde(default = "default_start_lon")]
    pub start_lon: f64,

    /// Seconds between updates
    #[serde(default = "default_update_secs")]
    pub update_secs: f64,

    /// Ground speed in meters per second
    #[serde(default = "default_speed")]
    pub speed_mps: f64,

    /// Course in degrees, 0 is north and 90 is east
    #[serde(default = "default_course")]
    pub course_deg: f64,

    /// Height above ellipsoid in meters
    #[serde(default = "default_alt")]
    pub alt_hae_m: f64,

    #[serde(default = "default_drone_callsign")]
    pub callsign: String,

    #[serde(default = "default_drone_type")]
    pub cot_type: String,

    /// Stale window measured in update intervals
    #[serde(default = "default_stale_updates")]
    pub stale_updates: u32,

    /// Circular error in meters
    #[serde(default = "default_drone_error")]
    pub ce: f64,

    /// Linear error in meters
    #[serde(default = "default_drone_error")]
    pub le: f64,

    /// Value of the remoteid `standard` attribute
    #[serde(default = "default_standard")]
    pub standard: String,

    /// Value of the remoteid `msg_type` attribute
    #[serde(default = "default_msg_type")]
    pub msg_type: String,
}

fn default_start_lat() -> f64 {
    42.6064
}

fn default_start_lon() -> f64 {
    -83.1498
}

fn default_update_secs() -> f64 {
    1.0
}

fn default_speed() -> f64 {
    15.0
}

fn default_course() -> f64 {
    90.0
}

fn default_alt() -> f64 {
    120.0
}

fn default_drone_callsign() -> String {
    "DRONE-REMOTEID".to_string()
}

fn default_drone_type() -> String {
    "a-f-A-M-F-Q".to_string()
}

fn default_stale_updates() -> u32 {
    6
}

fn default_drone_error() -> f64 {
    10.0
}

fn default_standard() -> String {
    "simulated".to_string()
}

fn default_msg_type() -> String {
    "basic_id+location".to_string()
}

impl Default for DroneConfig {
    fn default() -> Self {
        Self {
            start_lat: default_start_lat(),
            start_lon: default_start_lon(),
            update_secs: default_update_secs(),
            speed_mps: default_speed(),
            course_deg: default_course(),
            alt_hae_m: default_alt(),
            callsign: default_drone_callsign(),
            cot_type: default_drone_type(),
            stale_updates: default_stale_updates(),
            ce: default_drone_error(),
            le: default_drone_error(),
            standard: default_standard(),
            msg_type: default_msg_type(),
        }
    }
}

impl DroneConfig {
    /// Returns the update interval as a Duration.
    ///
    /// Falls back to one second for values [`AppConfig::validate`] rejects.
    pub fn update_interval(&self) -> Duration {
        Duration::try_from_secs_f64(self.update_secs)
            .ok()
            .filter(|d| !d.is_zero())
            .unwrap_or_else(|| Duration::from_secs_f64(default_update_secs()))
    }

    /// Returns the stale window as a Duration, saturating on overflow.
    pub fn stale_window(&self) -> Duration {
        self.update_interval()
            .checked_mul(self.stale_updates)
            .unwrap_or(Duration::MAX)
    }

    fn validate(&self) -> Result<()> {
        if !(self.update_secs.is_finite() && self.update_secs > 0.0) {
            return Err(ConfigError::invalid_value(
                "drone.update_secs",
                format!("must be a positive number of seconds, got {}", self.update_secs),
            )
            .into());
        }

        if self.stale_updates == 0 {
            return Err(
                ConfigError::invalid_value("drone.stale_updates", "must be greater than 0").into(),
            );
        }

        if self.update_interval().checked_mul(self.stale_updates).is_none() {
            return Err(ConfigError::invalid_value(
                "drone.stale_updates",
                format!(
                    "{} updates of {}s overflows the stale window",
                    self.stale_updates, self.update_secs
                ),
            )
            .into());
        }

        if !(-90.0..=90.0).contains(&self.start_lat) {
            return Err(ConfigError::invalid_value(
                "drone.start_lat",
                format!("{} is outside -90..=90", self.start_lat),
            )
            .into());
        }

        if !(-180.0..=180.0).contains(&self.start_lon) {
            return Err(ConfigError::invalid_value(
                "drone.start_lon",
                format!("{} is outside -180..=180", self.start_lon),
            )
            .into());
        }

        if !(self.speed_mps.is_finite() && self.speed_mps >= 0.0) {
            return Err(ConfigError::invalid_value(
                "drone.speed_mps",
                format!("must be zero or positive, got {}", self.speed_mps),
            )
            .into());
        }

        Ok(())
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: "text" or "json"
    #[serde(default = "default_log_format")]
    pub format: LogFormat,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> LogFormat {
    LogFormat::Text
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::Text,
        }
    }
}

impl LoggingConfig {
    /// Parses the log level string to a tracing Level.
    pub fn parse_level(&self) -> Result<Level> {
        self.level.parse().map_err(|_| {
            ConfigError::InvalidValue {
                field: "logging.level".to_string(),
                reason: format!("Invalid log level: {}", self.level),
            }
            .into()
        })
    }
}

/// Log format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable text format
    Text,
    /// JSON format for structured logging
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TakFeedError;
    use std::io::Write;

    fn invalid_field(result: Result<()>) -> Option<String> {
        match result {
            Err(TakFeedError::Config(e)) => e.field().map(str::to_string),
            _ => None,
        }
    }

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.tak.url, "tcp://127.0.0.1:8087");
        assert_eq!(config.queue.capacity, 1000);
        assert_eq!(config.incidents.uid_prefix, "GeoSafety");
        assert_eq!(config.incidents.stale_secs, 3600);
        assert_eq!(config.drone.update_interval(), Duration::from_secs(1));
        assert_eq!(config.drone.stale_window(), Duration::from_secs(6));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_yaml_is_default() {
        let config = AppConfig::from_yaml("{}").unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn test_config_from_yaml() {
        let yaml = r#"
tak:
  url: udp://239.2.3.1:6969
  write_timeout_secs: 3
  reconnect:
    max_attempts: 5

queue:
  capacity: 16

incidents:
  uid_prefix: CAD
  active_group: Red

drone:
  start_lat: 40.0
  update_secs: 0.5
  callsign: HAWK-1

logging:
  level: debug
  format: json
"#;

        let config = AppConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.tak.endpoint().unwrap().protocol, Protocol::Udp);
        assert_eq!(config.tak.write_timeout(), Duration::from_secs(3));
        assert_eq!(config.tak.reconnect.max_attempts, Some(5));
        assert_eq!(config.queue.capacity, 16);
        assert_eq!(config.incidents.uid_prefix, "CAD");
        assert_eq!(config.incidents.active_group, "Red");
        assert_eq!(config.incidents.cot_type, "a-u-G");
        assert_eq!(config.drone.start_lat, 40.0);
        assert_eq!(config.drone.start_lon, -83.1498);
        assert_eq!(config.drone.update_interval(), Duration::from_millis(500));
        assert_eq!(config.drone.stale_window(), Duration::from_secs(3));
        assert_eq!(config.drone.callsign, "HAWK-1");
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, LogFormat::Json);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_yaml() {
        let result = AppConfig::from_yaml("queue: [1, 2");
        assert!(matches!(
            result,
            Err(TakFeedError::Config(ConfigError::InvalidFormat { .. }))
        ));
    }

    #[test]
    fn test_validation_rejects_bad_url() {
        let mut config = AppConfig::default();
        config.tak.url = "http://example.com:80".to_string();
        assert_eq!(invalid_field(config.validate()), Some("tak.url".to_string()));

        config.tak.url = "no scheme here".to_string();
        assert_eq!(invalid_field(config.validate()), Some("tak.url".to_string()));
    }

    #[test]
    fn test_validation_tls_requires_certificates() {
        let mut config = AppConfig::default();
        config.tak.url = "tls://10.0.0.5:8089".to_string();
        assert_eq!(invalid_field(config.validate()), Some("tak.tls".to_string()));

        config.tak.tls = Some(TlsConfig::new("/nonexistent/client.pem", ""));
        assert_eq!(
            invalid_field(config.validate()),
            Some("tak.tls.client_key_path".to_string())
        );

        config.tak.tls = Some(TlsConfig::new(
            "/nonexistent/client.pem",
            "/nonexistent/client.key",
        ));
        assert_eq!(
            invalid_field(config.validate()),
            Some("tak.tls.client_cert_path".to_string())
        );
    }

    #[test]
    fn test_validation_tls_with_files_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let cert = dir.path().join("client.pem");
        let key = dir.path().join("client.key");
        std::fs::write(&cert, "cert").unwrap();
        std::fs::write(&key, "key").unwrap();

        let mut config = AppConfig::default();
        config.tak.url = "ssl://10.0.0.5".to_string();
        config.tak.tls = Some(TlsConfig::new(&cert, &key));
        assert!(config.validate().is_ok());

        config.tak.tls = Some(TlsConfig::new(&cert, &key).with_ca_cert(dir.path().join("ca.pem")));
        assert_eq!(
            invalid_field(config.validate()),
            Some("tak.tls.ca_cert_path".to_string())
        );
    }

    #[test]
    fn test_validation_rejects_zero_capacity() {
        let mut config = AppConfig::default();
        config.queue.capacity = 0;
        assert_eq!(
            invalid_field(config.validate()),
            Some("queue.capacity".to_string())
        );
    }

    #[test]
    fn test_validation_rejects_bad_drone_settings() {
        let mut config = AppConfig::default();
        config.drone.update_secs = 0.0;
        assert_eq!(
            invalid_field(config.validate()),
            Some("drone.update_secs".to_string())
        );
        assert_eq!(config.drone.update_interval(), Duration::from_secs(1));

        let mut config = AppConfig::default();
        config.drone.start_lat = 91.0;
        assert_eq!(
            invalid_field(config.validate()),
            Some("drone.start_lat".to_string())
        );

        let mut config = AppConfig::default();
        config.drone.stale_updates = 0;
        assert_eq!(
            invalid_field(config.validate()),
            Some("drone.stale_updates".to_string())
        );
    }

    #[test]
    fn test_stale_window_overflow() {
        let config = AppConfig::from_yaml("drone:\n  update_secs: 1.0e18\n  stale_updates: 100\n")
            .unwrap();
        assert_eq!(config.drone.stale_window(), Duration::MAX);
        assert_eq!(
            invalid_field(config.validate()),
            Some("drone.stale_updates".to_string())
        );

        let config = AppConfig::default();
        assert_eq!(
            config.drone.stale_window(),
            config.drone.update_interval() * config.drone.stale_updates
        );
    }

    #[test]
    fn test_validation_rejects_zero_incident_stale() {
        let mut config = AppConfig::default();
        config.incidents.stale_secs = 0;
        assert_eq!(
            invalid_field(config.validate()),
            Some("incidents.stale_secs".to_string())
        );
    }

    #[test]
    fn test_validation_rejects_reconnect_settings() {
        let mut config = AppConfig::default();
        config.tak.reconnect.backoff_multiplier = 0.5;
        assert_eq!(
            invalid_field(config.validate()),
            Some("tak.reconnect.backoff_multiplier".to_string())
        );
    }

    #[test]
    fn test_logging_parse_level() {
        let logging = LoggingConfig {
            level: "debug".to_string(),
            ..Default::default()
        };
        assert_eq!(logging.parse_level().unwrap(), Level::DEBUG);

        let invalid = LoggingConfig {
            level: "invalid".to_string(),
            ..Default::default()
        };
        assert!(invalid.parse_level().is_err());
    }

    #[test]
    fn test_from_file_missing() {
        let result = AppConfig::from_file("/nonexistent/takfeed.yaml");
        assert!(matches!(
            result,
            Err(TakFeedError::Config(ConfigError::FileNotFound { .. }))
        ));
    }

    #[test]
    fn test_load_layers_environment_over_file() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(file, "incidents:\n  uid_prefix: FromFile\n  stale_secs: 60").unwrap();

        std::env::set_var("TAKFEED__INCIDENTS__STALE_SECS", "120");
        let config = AppConfig::load(Some(file.path()));
        std::env::remove_var("TAKFEED__INCIDENTS__STALE_SECS");

        let config = config.unwrap();
        assert_eq!(config.incidents.uid_prefix, "FromFile");
        assert_eq!(config.incidents.stale_secs, 120);
        assert_eq!(config.queue.capacity, 1000);
    }
}
