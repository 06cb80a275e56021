//! rustls client configuration for `tls://` endpoints

use anyhow::{anyhow, Context, Result};
use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::crypto::{ring, CryptoProvider};
use rustls::pki_types::{CertificateDer, PrivateKeyDer, ServerName, UnixTime};
use rustls::{ClientConfig as RustlsConfig, DigitallySignedStruct, RootCertStore, SignatureScheme};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;
use takfeed_core::TlsConfig;
use tracing::{info, warn};

/// Build the rustls configuration for a TAK client certificate.
///
/// The CA file, when given, replaces the bundled web PKI roots. With
/// `verify_cert` off any server certificate is accepted.
pub fn build_tls_config(config: &TlsConfig) -> Result<RustlsConfig> {
    info!("Building TLS configuration");

    let provider = Arc::new(ring::default_provider());
    let certs = load_certs(&config.client_cert_path).context("Failed to load client certificate")?;
    let key = load_private_key(&config.client_key_path).context("Failed to load client key")?;
    info!("Loaded {} client certificate(s)", certs.len());

    let builder = RustlsConfig::builder_with_provider(Arc::clone(&provider))
        .with_safe_default_protocol_versions()
        .context("No usable TLS protocol versions")?;

    let tls_config = if config.verify_cert {
        let roots = root_store(config.ca_cert_path.as_deref())?;
        builder
            .with_root_certificates(roots)
            .with_client_auth_cert(certs, key)
            .context("Failed to build TLS config with client auth")?
    } else {
        warn!("Server certificate verification is DISABLED - this is insecure!");
        builder
            .dangerous()
            .with_custom_certificate_verifier(Arc::new(AcceptAnyServerCert { provider }))
            .with_client_auth_cert(certs, key)
            .context("Failed to build TLS config with client auth")?
    };

    Ok(tls_config)
}

/// SNI name: the configured override, otherwise the endpoint host
pub fn server_name(config: &TlsConfig, host: &str) -> Result<ServerName<'static>> {
    let name = config.server_name.as_deref().unwrap_or(host);
    ServerName::try_from(name.to_string()).map_err(|e| anyhow!("Invalid server name {name:?}: {e}"))
}

fn root_store(ca_cert_path: Option<&Path>) -> Result<RootCertStore> {
    let mut roots = RootCertStore::empty();

    match ca_cert_path {
        Some(path) => {
            let ca_certs = load_certs(path).context("Failed to load CA certificate")?;
            let count = ca_certs.len();
            for cert in ca_certs {
                roots
                    .add(cert)
                    .context("Failed to add CA certificate to root store")?;
            }
            info!("Loaded {} custom CA certificate(s)", count);
        }
        None => {
            roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
            info!("Using bundled web PKI root certificates");
        }
    }

    Ok(roots)
}

/// Read every PEM certificate in a file
pub fn load_certs(path: &Path) -> Result<Vec<CertificateDer<'static>>> {
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let certs = rustls_pemfile::certs(&mut BufReader::new(file))
        .collect::<Result<Vec<_>, _>>()
        .with_context(|| format!("Failed to parse certificates in {}", path.display()))?;

    if certs.is_empty() {
        return Err(anyhow!("No certificates found in {}", path.display()));
    }
    Ok(certs)
}

/// Read the first unencrypted PEM private key (PKCS#1, PKCS#8 or SEC1)
pub fn load_private_key(path: &Path) -> Result<PrivateKeyDer<'static>> {
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    rustls_pemfile::private_key(&mut BufReader::new(file))
        .with_context(|| format!("Failed to read private key from {}", path.display()))?
        .ok_or_else(|| anyhow!("No private key found in {}", path.display()))
}

/// Verifier for `verify_cert: false`; signatures are still checked so the
/// handshake itself stays well-formed.
#[derive(Debug)]
struct AcceptAnyServerCert {
    provider: Arc<CryptoProvider>,
}

impl ServerCertVerifier for AcceptAnyServerCert {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        rustls::crypto::verify_tls12_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        rustls::crypto::verify_tls13_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.provider.signature_verification_algorithms.supported_schemes()
    }
}
