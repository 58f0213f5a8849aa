//! # TLS Transport
//!
//! Opens the encrypted HTTP/2 channel used by the probe.
//!
//! TLS is terminated by our own connector: a `hyper-rustls` connector built from our rustls
//! [`ClientConfig`], always dialing the `https://` form of the target. Tonic only ever sees
//! the plaintext address of the endpoint and the `https` origin used in requests, so its
//! built-in TLS (when some other crate enables it) never takes over the dial.
//!
//! Certificates are checked against the OS trust store unless the probe asks to skip
//! verification, in which case any certificate the server presents is accepted (the
//! handshake signatures are still checked).
//!
//! Targets are given as `host:port`; an `https://` prefix is accepted, any other scheme is not.
use http::Uri;
use hyper_rustls::HttpsConnectorBuilder;
use hyper_util::client::legacy::connect::HttpConnector;
use rustls::{
    ClientConfig, DigitallySignedStruct, RootCertStore, SignatureScheme,
    client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier},
    crypto::CryptoProvider,
};
use rustls_pki_types::{CertificateDer, ServerName, UnixTime};
use std::sync::{Arc, OnceLock};
use tonic::transport::{Channel, Endpoint};
use tower::ServiceExt;

/// Errors that can occur when dialing the probe target.
#[derive(Debug, thiserror::Error)]
pub enum ConnectError {
    #[error("Invalid target '{0}': {1}")]
    InvalidTarget(String, String),
    #[error("Failed to configure TLS: {0}")]
    Tls(String),
    #[error("Failed to connect to '{0}': {1}")]
    ConnectionFailed(String, #[source] tonic::transport::Error),
}

/// Dials `target` over TLS and returns the connected channel.
///
/// The connection is established eagerly, so handshake failures surface here.
pub async fn connect(target: &str, insecure_skip_verify: bool) -> Result<Channel, ConnectError> {
    let invalid = |reason: String| ConnectError::InvalidTarget(target.to_string(), reason);

    let origin: Uri = target_uri(target)?
        .parse()
        .map_err(|e: http::uri::InvalidUri| invalid(e.to_string()))?;

    let authority = origin
        .authority()
        .ok_or_else(|| invalid("missing host".to_string()))?;

    let endpoint = Endpoint::from_shared(format!("http://{authority}"))
        .map_err(|e| invalid(e.to_string()))?
        .origin(origin.clone());

    let tls_config = client_config(insecure_skip_verify)?;

    let mut http = HttpConnector::new();
    http.enforce_http(false);
    http.set_nodelay(true);

    let https = HttpsConnectorBuilder::new()
        .with_tls_config(tls_config)
        .https_only()
        .enable_http2()
        .wrap_connector(http);

    // Whatever URI tonic hands over, the stream is opened against the https origin.
    let connector = tower::service_fn(move |_: Uri| https.clone().oneshot(origin.clone()));

    endpoint
        .connect_with_connector(connector)
        .await
        .map_err(|e| ConnectError::ConnectionFailed(target.to_string(), e))
}

fn target_uri(target: &str) -> Result<String, ConnectError> {
    let target = target.trim();

    if target.is_empty() {
        return Err(ConnectError::InvalidTarget(
            target.to_string(),
            "empty target".to_string(),
        ));
    }

    match target.split_once("://") {
        None => Ok(format!("https://{target}")),
        Some(("https", rest)) if !rest.is_empty() => Ok(target.to_string()),
        Some((scheme, _)) => Err(ConnectError::InvalidTarget(
            target.to_string(),
            format!("unsupported scheme '{scheme}', the probe only speaks TLS"),
        )),
    }
}

fn client_config(insecure_skip_verify: bool) -> Result<ClientConfig, ConnectError> {
    let provider = crypto_provider();

    let builder = ClientConfig::builder_with_provider(provider.clone())
        .with_safe_default_protocol_versions()
        .map_err(|e| ConnectError::Tls(format!("failed to set TLS protocol versions: {e}")))?;

    let config = if insecure_skip_verify {
        builder
            .dangerous()
            .with_custom_certificate_verifier(Arc::new(SkipServerVerification(provider)))
            .with_no_client_auth()
    } else {
        builder
            .with_root_certificates(native_root_store()?)
            .with_no_client_auth()
    };

    Ok(config)
}

fn crypto_provider() -> Arc<CryptoProvider> {
    CryptoProvider::get_default()
        .cloned()
        .unwrap_or_else(|| Arc::new(rustls::crypto::aws_lc_rs::default_provider()))
}

/// OS root certificates, loaded once per process.
static NATIVE_ROOTS: OnceLock<Vec<CertificateDer<'static>>> = OnceLock::new();

fn native_root_store() -> Result<RootCertStore, ConnectError> {
    let certs = NATIVE_ROOTS.get_or_init(|| {
        let result = rustls_native_certs::load_native_certs();
        for err in &result.errors {
            tracing::warn!(error = %err, "error loading native root certificate");
        }
        result.certs
    });

    let mut store = RootCertStore::empty();
    let (added, ignored) = store.add_parsable_certificates(certs.iter().cloned());

    if ignored > 0 {
        tracing::warn!(added, ignored, "some native root certificates could not be parsed");
    }

    if added == 0 {
        return Err(ConnectError::Tls(
            "no usable root CA certificates found in the OS certificate store".to_string(),
        ));
    }

    Ok(store)
}

/// Accepts any server certificate. Handshake signatures are still verified so the
/// session keys belong to whoever holds the presented certificate.
#[derive(Debug)]
struct SkipServerVerification(Arc<CryptoProvider>);

impl ServerCertVerifier for SkipServerVerification {
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
            &self.0.signature_verification_algorithms,
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
            &self.0.signature_verification_algorithms,
        )
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.0.signature_verification_algorithms.supported_schemes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_host_port_becomes_https() {
        assert_eq!(
            target_uri("localhost:50051").unwrap(),
            "https://localhost:50051"
        );
        assert_eq!(
            target_uri(" 10.0.0.1:443 ").unwrap(),
            "https://10.0.0.1:443"
        );
    }

    #[test]
    fn https_targets_are_kept() {
        assert_eq!(
            target_uri("https://example.com:443").unwrap(),
            "https://example.com:443"
        );
    }

    #[test]
    fn plaintext_and_empty_targets_are_rejected() {
        assert!(matches!(
            target_uri("http://example.com:80"),
            Err(ConnectError::InvalidTarget(_, _))
        ));
        assert!(matches!(
            target_uri(""),
            Err(ConnectError::InvalidTarget(_, _))
        ));
        assert!(matches!(
            target_uri("https://"),
            Err(ConnectError::InvalidTarget(_, _))
        ));
    }

    #[test]
    fn insecure_config_builds_without_trust_store() {
        let config = client_config(true).unwrap();
        assert!(config.alpn_protocols.is_empty());
    }
}
