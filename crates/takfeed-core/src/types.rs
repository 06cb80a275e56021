//! Connection-level types shared by the configuration and the transport.

use crate::error::{ConfigError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use url::Url;

/// Transport protocol for the TAK server connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    /// Unencrypted TCP stream
    Tcp,
    /// Unencrypted UDP datagrams
    Udp,
    /// TLS-encrypted TCP stream
    Tls,
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Protocol::Tcp => write!(f, "tcp"),
            Protocol::Udp => write!(f, "udp"),
            Protocol::Tls => write!(f, "tls"),
        }
    }
}

impl Protocol {
    /// Maps a URL scheme to a protocol. `ssl` is accepted as an alias of `tls`.
    pub fn from_scheme(scheme: &str) -> Option<Self> {
        match scheme.to_ascii_lowercase().as_str() {
            "tcp" => Some(Protocol::Tcp),
            "udp" => Some(Protocol::Udp),
            "tls" | "ssl" => Some(Protocol::Tls),
            _ => None,
        }
    }

    /// Returns true if this protocol uses encryption.
    pub fn is_secure(&self) -> bool {
        matches!(self, Protocol::Tls)
    }

    /// Returns true if this protocol is connection-oriented.
    pub fn is_stream_based(&self) -> bool {
        matches!(self, Protocol::Tcp | Protocol::Tls)
    }

    /// Returns the default port for this protocol.
    pub fn default_port(&self) -> u16 {
        match self {
            Protocol::Tcp => 8087,
            Protocol::Udp => 8087,
            Protocol::Tls => 8089,
        }
    }
}

/// A parsed `scheme://host:port` connection endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub protocol: Protocol,
    pub host: String,
    pub port: u16,
}

impl Endpoint {
    /// Parses an endpoint such as `tls://takserver.example.com:8089`.
    ///
    /// The port falls back to the protocol's default when omitted.
    pub fn parse(raw: &str) -> Result<Self> {
        let url = Url::parse(raw)
            .map_err(|e| ConfigError::invalid_value("tak.url", format!("{}: {}", raw, e)))?;

        let protocol = Protocol::from_scheme(url.scheme()).ok_or_else(|| {
            ConfigError::invalid_value(
                "tak.url",
                format!("unsupported scheme '{}' (expected tcp, udp or tls)", url.scheme()),
            )
        })?;

        let host = url
            .host_str()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| ConfigError::invalid_value("tak.url", format!("{}: missing host", raw)))?
            .to_string();

        let port = url.port().unwrap_or_else(|| protocol.default_port());

        Ok(Self {
            protocol,
            host,
            port,
        })
    }

    /// Returns the `host:port` socket address string.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}:{}", self.protocol, self.host, self.port)
    }
}

/// TLS configuration for the TAK server connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TlsConfig {
    /// Path to the client certificate file (PEM format)
    pub client_cert_path: PathBuf,

    /// Path to the client private key file (PEM format, unencrypted)
    pub client_key_path: PathBuf,

    /// Path to the CA certificate file (PEM format); public roots when absent
    #[serde(default)]
    pub ca_cert_path: Option<PathBuf>,

    /// Whether to verify the server's certificate (default: true)
    #[serde(default = "default_verify_cert")]
    pub verify_cert: bool,

    /// Server name for SNI (Server Name Indication)
    #[serde(default)]
    pub server_name: Option<String>,
}

fn default_verify_cert() -> bool {
    true
}

impl TlsConfig {
    /// Creates a new TLS configuration with a client certificate and key.
    pub fn new(client_cert_path: impl Into<PathBuf>, client_key_path: impl Into<PathBuf>) -> Self {
        Self {
            client_cert_path: client_cert_path.into(),
            client_key_path: client_key_path.into(),
            ca_cert_path: None,
            verify_cert: true,
            server_name: None,
        }
    }

    /// Sets the CA certificate used to verify the server.
    pub fn with_ca_cert(mut self, ca_cert_path: impl Into<PathBuf>) -> Self {
        self.ca_cert_path = Some(ca_cert_path.into());
        self
    }

    /// Disables server certificate verification.
    pub fn insecure(mut self) -> Self {
        self.verify_cert = false;
        self
    }
}
