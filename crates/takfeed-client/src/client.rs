use anyhow::Result;
use std::time::Duration;
use takfeed_core::config::{ReconnectSettings, TakConfig};
use takfeed_core::{Endpoint, TlsConfig};
use tracing::{error, info, warn};

/// Configuration for auto-reconnect behavior
#[derive(Debug, Clone, PartialEq)]
pub struct ReconnectConfig {
    /// Enable auto-reconnect
    pub enabled: bool,
    /// Initial backoff duration
    pub initial_backoff: Duration,
    /// Maximum backoff duration
    pub max_backoff: Duration,
    /// Backoff multiplier (for exponential backoff)
    pub backoff_multiplier: f64,
    /// Maximum number of reconnect attempts (None = infinite)
    pub max_attempts: Option<u32>,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(60),
            backoff_multiplier: 2.0,
            max_attempts: None,
        }
    }
}

impl From<&ReconnectSettings> for ReconnectConfig {
    fn from(settings: &ReconnectSettings) -> Self {
        Self {
            enabled: settings.enabled,
            initial_backoff: settings.initial_backoff(),
            max_backoff: settings.max_backoff(),
            backoff_multiplier: settings.backoff_multiplier,
            max_attempts: settings.max_attempts,
        }
    }
}

/// Everything needed to open a connection to one TAK server
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub endpoint: Endpoint,
    /// Credentials, required for `tls://` endpoints
    pub tls: Option<TlsConfig>,
    pub connect_timeout: Duration,
    pub write_timeout: Duration,
    pub reconnect: ReconnectConfig,
}

impl ClientConfig {
    pub fn new(endpoint: Endpoint) -> Self {
        Self {
            endpoint,
            tls: None,
            connect_timeout: Duration::from_secs(10),
            write_timeout: Duration::from_secs(10),
            reconnect: ReconnectConfig::default(),
        }
    }

    /// Resolve the `tak` section of the application config
    pub fn from_tak_config(config: &TakConfig) -> takfeed_core::Result<Self> {
        Ok(Self {
            endpoint: config.endpoint()?,
            tls: config.tls.clone(),
            connect_timeout: config.connect_timeout(),
            write_timeout: config.write_timeout(),
            reconnect: ReconnectConfig::from(&config.reconnect),
        })
    }

    pub fn with_tls(mut self, tls: TlsConfig) -> Self {
        self.tls = Some(tls);
        self
    }

    pub fn with_reconnect(mut self, reconnect: ReconnectConfig) -> Self {
        self.reconnect = reconnect;
        self
    }
}

/// Helper function to calculate exponential backoff duration
pub fn calculate_backoff(attempt: u32, config: &ReconnectConfig) -> Duration {
    let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
    let growth = config.backoff_multiplier.powi(exponent);
    let backoff_secs = config.initial_backoff.as_secs_f64() * growth;
    let capped_secs = backoff_secs.min(config.max_backoff.as_secs_f64());
    Duration::try_from_secs_f64(capped_secs).unwrap_or(config.max_backoff)
}

/// Auto-reconnect helper that wraps connection attempts with retry logic
pub async fn connect_with_retry<T, F, Fut>(mut connect_fn: F, config: &ReconnectConfig) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T>>,
{
    if !config.enabled {
        return connect_fn().await;
    }

    let mut attempt = 0u32;

    loop {
        match connect_fn().await {
            Ok(connection) => {
                if attempt > 0 {
                    info!(
                        attempt = attempt,
                        "Successfully reconnected after {} attempts", attempt
                    );
                }
                return Ok(connection);
            }
            Err(e) => {
                attempt += 1;

                if let Some(max) = config.max_attempts {
                    if attempt >= max {
                        error!(
                            attempt = attempt,
                            error = %e,
                            "Max reconnect attempts reached"
                        );
                        return Err(e);
                    }
                }

                let backoff = calculate_backoff(attempt - 1, config);
                warn!(
                    attempt = attempt,
                    backoff_ms = u64::try_from(backoff.as_millis()).unwrap_or(u64::MAX),
                    error = %e,
                    "Connection attempt failed, retrying after backoff"
                );

                tokio::time::sleep(backoff).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_backoff_calculation() {
        let config = ReconnectConfig {
            enabled: true,
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(60),
            backoff_multiplier: 2.0,
            max_attempts: None,
        };

        assert_eq!(calculate_backoff(0, &config), Duration::from_secs(1));
        assert_eq!(calculate_backoff(1, &config), Duration::from_secs(2));
        assert_eq!(calculate_backoff(2, &config), Duration::from_secs(4));
        assert_eq!(calculate_backoff(3, &config), Duration::from_secs(8));
        assert_eq!(calculate_backoff(10, &config), Duration::from_secs(60)); // capped
        assert_eq!(calculate_backoff(u32::MAX, &config), Duration::from_secs(60));
    }

    #[test]
    fn test_from_settings() {
        let settings = ReconnectSettings::default();
        let config = ReconnectConfig::from(&settings);
        assert_eq!(config, ReconnectConfig::default());
    }

    #[test]
    fn test_from_tak_config() {
        let tak = TakConfig {
            url: "udp://239.2.3.1:6969".to_string(),
            ..TakConfig::default()
        };
        let config = ClientConfig::from_tak_config(&tak).unwrap();
        assert_eq!(config.endpoint.port, 6969);
        assert_eq!(config.connect_timeout, Duration::from_secs(10));
        assert!(config.tls.is_none());
        assert!(config.reconnect.enabled);
    }

    #[tokio::test(start_paused = true)]
    async fn test_connect_with_retry_succeeds_after_failures() {
        let attempts = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&attempts);

        let result = connect_with_retry(
            || {
                let counter = Arc::clone(&counter);
                async move {
                    if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                        Err(anyhow!("refused"))
                    } else {
                        Ok("connected")
                    }
                }
            },
            &ReconnectConfig::default(),
        )
        .await;

        assert_eq!(result.unwrap(), "connected");
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_connect_with_retry_gives_up() {
        let config = ReconnectConfig {
            max_attempts: Some(3),
            ..ReconnectConfig::default()
        };
        let attempts = AtomicU32::new(0);

        let result: Result<()> = connect_with_retry(
            || {
                attempts.fetch_add(1, Ordering::SeqCst);
                async { Err(anyhow!("refused")) }
            },
            &config,
        )
        .await;

        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_disabled_reconnect_tries_once() {
        let config = ReconnectConfig {
            enabled: false,
            ..ReconnectConfig::default()
        };
        let attempts = AtomicU32::new(0);

        let result: Result<()> = connect_with_retry(
            || {
                attempts.fetch_add(1, Ordering::SeqCst);
                async { Err(anyhow!("refused")) }
            },
            &config,
        )
        .await;

        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }
}
