//! Byte sinks the transmit worker writes serialized events into

use crate::client::ClientConfig;
use crate::state::{ConnectionState, ConnectionStatus};
use crate::tls::{build_tls_config, server_name};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use rustls::ClientConfig as RustlsConfig;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;
use takfeed_core::Protocol;
use tokio::io::{AsyncWrite, AsyncWriteExt, Stdout};
use tokio::net::{lookup_host, TcpStream, UdpSocket};
use tokio::time::timeout;
use tokio_rustls::TlsConnector;
use tracing::{debug, info, instrument, warn};

/// Largest datagram that fits a 1500 byte MTU without fragmenting
const MAX_UDP_PACKET_SIZE: usize = 1472; // 1500 MTU - 20 IP header - 8 UDP header

/// Destination for serialized events.
///
/// One call to [`TakSink::send`] writes exactly one event; an error means the
/// event may not have been delivered and the sink should be discarded.
#[async_trait]
pub trait TakSink: Send {
    async fn send(&mut self, data: &[u8]) -> Result<()>;

    async fn close(&mut self) -> Result<()>;

    /// Short label for logs, e.g. `tcp://127.0.0.1:8087`
    fn describe(&self) -> String;
}

/// Opens a fresh sink; called again after every failed write
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self) -> Result<Box<dyn TakSink>>;
}

/// Stream-oriented sink for TCP and TLS connections.
///
/// Events are written back to back with no extra framing, TAK servers split
/// the stream on `</event>`.
pub struct StreamSink<S> {
    stream: S,
    label: String,
    write_timeout: Duration,
    status: ConnectionStatus,
}

impl<S> StreamSink<S>
where
    S: AsyncWrite + Unpin + Send,
{
    pub fn new(
        stream: S,
        label: impl Into<String>,
        write_timeout: Duration,
        status: ConnectionStatus,
    ) -> Self {
        Self {
            stream,
            label: label.into(),
            write_timeout,
            status,
        }
    }

    pub fn into_inner(self) -> S {
        self.stream
    }
}

#[async_trait]
impl<S> TakSink for StreamSink<S>
where
    S: AsyncWrite + Unpin + Send,
{
    async fn send(&mut self, data: &[u8]) -> Result<()> {
        timeout(self.write_timeout, self.stream.write_all(data))
            .await
            .context("Write timeout")?
            .context("Write error")?;

        timeout(self.write_timeout, self.stream.flush())
            .await
            .context("Flush timeout")?
            .context("Flush error")?;

        self.status.metrics().record_sent(data.len());
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        self.stream.shutdown().await.context("Shutdown error")
    }

    fn describe(&self) -> String {
        self.label.clone()
    }
}

/// Connected UDP socket, one datagram per event
pub struct UdpSink {
    socket: UdpSocket,
    label: String,
    write_timeout: Duration,
    status: ConnectionStatus,
}

impl UdpSink {
    /// Bind an ephemeral local port and fix the remote address
    pub async fn connect(
        remote: SocketAddr,
        label: impl Into<String>,
        write_timeout: Duration,
        status: ConnectionStatus,
    ) -> Result<Self> {
        let local: SocketAddr = if remote.is_ipv4() {
            (Ipv4Addr::UNSPECIFIED, 0).into()
        } else {
            (Ipv6Addr::UNSPECIFIED, 0).into()
        };

        let socket = UdpSocket::bind(local)
            .await
            .context("Failed to bind UDP socket")?;
        socket
            .connect(remote)
            .await
            .context("Failed to set UDP remote address")?;

        if remote.is_ipv4() && remote.ip().is_multicast() {
            socket
                .set_multicast_ttl_v4(1)
                .context("Failed to set multicast TTL")?;
        }

        Ok(Self {
            socket,
            label: label.into(),
            write_timeout,
            status,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.socket.local_addr().context("UDP socket has no local address")
    }
}

#[async_trait]
impl TakSink for UdpSink {
    async fn send(&mut self, data: &[u8]) -> Result<()> {
        if data.len() > MAX_UDP_PACKET_SIZE {
            warn!(
                size = data.len(),
                max_size = MAX_UDP_PACKET_SIZE,
                "UDP packet exceeds recommended size, may be fragmented or dropped"
            );
        }

        let sent = timeout(self.write_timeout, self.socket.send(data))
            .await
            .context("Send timeout")?
            .context("Send error")?;

        if sent != data.len() {
            return Err(anyhow!("Partial UDP packet sent: {} of {} bytes", sent, data.len()));
        }

        self.status.metrics().record_sent(sent);
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        Ok(())
    }

    fn describe(&self) -> String {
        self.label.clone()
    }
}

/// Writes each event followed by a newline; the dry-run sink
pub struct LineSink<W> {
    out: W,
}

/// [`LineSink`] over the process's standard output
pub type StdoutSink = LineSink<Stdout>;

impl StdoutSink {
    pub fn stdout() -> Self {
        Self::new(tokio::io::stdout())
    }
}

impl<W> LineSink<W>
where
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

#[async_trait]
impl<W> TakSink for LineSink<W>
where
    W: AsyncWrite + Unpin + Send,
{
    async fn send(&mut self, data: &[u8]) -> Result<()> {
        self.out.write_all(data).await.context("Write error")?;
        self.out.write_all(b"\n").await.context("Write error")?;
        self.out.flush().await.context("Flush error")
    }

    async fn close(&mut self) -> Result<()> {
        self.out.flush().await.context("Flush error")
    }

    fn describe(&self) -> String {
        "stdout".to_string()
    }
}

/// Connector for the configured TAK endpoint
pub struct TakConnector {
    config: ClientConfig,
    tls: Option<Arc<RustlsConfig>>,
    status: ConnectionStatus,
}

impl TakConnector {
    /// Prepare a connector; TLS material is loaded once, up front
    pub fn new(config: ClientConfig, status: ConnectionStatus) -> Result<Self> {
        let tls = match config.endpoint.protocol {
            Protocol::Tls => {
                let tls_config = config.tls.as_ref().ok_or_else(|| {
                    anyhow!(
                        "TLS endpoint {} has no client certificate configured",
                        config.endpoint
                    )
                })?;
                Some(Arc::new(build_tls_config(tls_config)?))
            }
            Protocol::Tcp | Protocol::Udp => None,
        };

        Ok(Self { config, tls, status })
    }

    pub fn status(&self) -> &ConnectionStatus {
        &self.status
    }

    async fn resolve(&self) -> Result<SocketAddr> {
        let address = self.config.endpoint.address();
        let resolved = lookup_host(address.as_str())
            .await
            .with_context(|| format!("Failed to resolve {address}"))?
            .next()
            .ok_or_else(|| anyhow!("{address} resolved to no addresses"));
        resolved
    }

    async fn connect_tcp(&self) -> Result<TcpStream> {
        let address = self.resolve().await?;
        let stream = timeout(self.config.connect_timeout, TcpStream::connect(address))
            .await
            .context("Connection timeout")?
            .context("Failed to connect")?;

        stream.set_nodelay(true).context("Failed to set TCP_NODELAY")?;
        Ok(stream)
    }

    async fn establish(&self) -> Result<Box<dyn TakSink>> {
        let endpoint = &self.config.endpoint;
        let label = endpoint.to_string();
        let write_timeout = self.config.write_timeout;

        let sink: Box<dyn TakSink> = match endpoint.protocol {
            Protocol::Tcp => {
                let stream = self.connect_tcp().await?;
                Box::new(StreamSink::new(stream, label, write_timeout, self.status.clone()))
            }
            Protocol::Tls => {
                let (tls_config, credentials) = self
                    .tls
                    .as_ref()
                    .zip(self.config.tls.as_ref())
                    .ok_or_else(|| anyhow!("TLS is not configured"))?;

                let stream = self.connect_tcp().await?;
                let name = server_name(credentials, &endpoint.host)?;
                let connector = TlsConnector::from(Arc::clone(tls_config));

                let handshake = connector.connect(name, stream);
                let tls_stream = timeout(self.config.connect_timeout, handshake)
                    .await
                    .context("TLS handshake timeout")?
                    .context("TLS handshake failed")?;

                debug!("TLS handshake successful");
                Box::new(StreamSink::new(tls_stream, label, write_timeout, self.status.clone()))
            }
            Protocol::Udp => {
                let remote = self.resolve().await?;
                Box::new(UdpSink::connect(remote, label, write_timeout, self.status.clone()).await?)
            }
        };

        Ok(sink)
    }
}

#[async_trait]
impl Connector for TakConnector {
    #[instrument(skip(self), fields(endpoint = %self.config.endpoint))]
    async fn connect(&self) -> Result<Box<dyn TakSink>> {
        if self.status.state() != ConnectionState::Reconnecting {
            self.status.set_state(ConnectionState::Connecting);
        }

        info!("Connecting to {}", self.config.endpoint);
        let sink = self.establish().await?;

        self.status.set_connected();
        info!("Successfully connected to {}", self.config.endpoint);
        Ok(sink)
    }
}

/// Connector that always hands out a [`StdoutSink`]
#[derive(Debug, Default, Clone, Copy)]
pub struct StdoutConnector;

#[async_trait]
impl Connector for StdoutConnector {
    async fn connect(&self) -> Result<Box<dyn TakSink>> {
        Ok(Box::new(StdoutSink::stdout()))
    }
}
