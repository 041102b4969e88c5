//! TLS client configuration.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rustls::pki_types::ServerName;
use rustls::{ClientConfig, RootCertStore};
use tokio_rustls::TlsConnector;

use crate::error::TlsError;

/// TLS settings for a client connection.
///
/// Without a CA path the bundled webpki root store is trusted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TlsConfig {
    /// PEM bundle with the trusted certificate authorities.
    pub ca_path: Option<PathBuf>,
}

impl TlsConfig {
    /// Create a configuration trusting the default root store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Trust the authorities in the given PEM bundle instead.
    ///
    /// An empty path keeps the default root store.
    #[must_use]
    pub fn ca_path(mut self, path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        self.ca_path = if path.as_os_str().is_empty() {
            None
        } else {
            Some(path.to_path_buf())
        };
        self
    }

    /// Build the root certificate store.
    pub fn root_store(&self) -> Result<RootCertStore, TlsError> {
        let mut roots = RootCertStore::empty();
        match &self.ca_path {
            None => roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned()),
            Some(path) => {
                let shown = path.display().to_string();
                let file = File::open(path).map_err(|source| TlsError::Io {
                    path: shown.clone(),
                    source,
                })?;
                let mut reader = BufReader::new(file);
                for cert in rustls_pemfile::certs(&mut reader) {
                    let cert = cert.map_err(|source| TlsError::Io {
                        path: shown.clone(),
                        source,
                    })?;
                    roots.add(cert)?;
                }
                if roots.is_empty() {
                    return Err(TlsError::NoCertificates(shown));
                }
                tracing::debug!(path = %shown, count = roots.len(), "loaded CA bundle");
            }
        }
        Ok(roots)
    }

    /// Build a connector usable for any number of handshakes.
    pub fn connector(&self) -> Result<TlsConnector, TlsError> {
        let provider = Arc::new(rustls::crypto::ring::default_provider());
        let config = ClientConfig::builder_with_provider(provider)
            .with_safe_default_protocol_versions()?
            .with_root_certificates(self.root_store()?)
            .with_no_client_auth();
        Ok(TlsConnector::from(Arc::new(config)))
    }
}

/// Convert a host name or IP literal into a TLS server name.
pub fn server_name(host: &str) -> Result<ServerName<'static>, TlsError> {
    ServerName::try_from(host.to_string())
        .map_err(|_| TlsError::InvalidServerName(host.to_string()))
}
