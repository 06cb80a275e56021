//! # takfeed Core
//!
//! Configuration, connection types and error handling shared by the takfeed
//! producers, the transport client and the `takfeed` binary.
//!
//! - **Configuration**: [`AppConfig`] with one section per concern (TAK
//!   connection, transmission queue, incident converter, drone simulator,
//!   logging), loaded from YAML with `TAKFEED__*` environment overrides and
//!   checked by [`AppConfig::validate`].
//! - **Types**: [`Endpoint`] parsed from `tcp://`, `udp://` and `tls://` URLs,
//!   and the client certificate settings in [`TlsConfig`].
//! - **Errors**: [`TakFeedError`] and its per-concern sub-enums.
//!
//! ## Example
//!
//! ```
//! use takfeed_core::config::AppConfig;
//! use takfeed_core::types::Protocol;
//!
//! let config = AppConfig::from_yaml("tak:\n  url: udp://239.2.3.1:6969\n").unwrap();
//! assert!(config.validate().is_ok());
//!
//! let endpoint = config.tak.endpoint().unwrap();
//! assert_eq!(endpoint.protocol, Protocol::Udp);
//! assert_eq!(endpoint.port, 6969);
//! ```

pub mod config;
pub mod error;
pub mod types;

// Re-export commonly used types for convenience
pub use config::{AppConfig, DroneConfig, IncidentConfig, LogFormat, LoggingConfig};
pub use error::{ConfigError, InputError, Result, TakFeedError};
pub use types::{Endpoint, Protocol, TlsConfig};
