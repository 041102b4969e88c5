//! Connection options.

use std::path::PathBuf;
use std::time::Duration;

use graph_tls::TlsConfig;

/// Options applied when opening a [`Connection`](crate::Connection).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectOptions {
    /// Connect timeout and per-request channel timeout. Zero disables both.
    pub timeout: Duration,

    /// Whether to wrap the socket in TLS.
    pub enable_ssl: bool,

    /// CA bundle for TLS. `None` trusts the bundled webpki roots.
    pub ca_path: Option<PathBuf>,
}

impl ConnectOptions {
    /// Create options with no timeout and TLS disabled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the timeout.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Enable or disable TLS.
    #[must_use]
    pub fn enable_ssl(mut self, enabled: bool) -> Self {
        self.enable_ssl = enabled;
        self
    }

    /// Set the CA bundle path. An empty path means the default roots.
    #[must_use]
    pub fn ca_path(mut self, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        self.ca_path = if path.as_os_str().is_empty() {
            None
        } else {
            Some(path)
        };
        self
    }

    /// The timeout as an optional limit.
    #[must_use]
    pub fn timeout_limit(&self) -> Option<Duration> {
        (!self.timeout.is_zero()).then_some(self.timeout)
    }

    /// TLS settings derived from these options.
    #[must_use]
    pub fn tls_config(&self) -> TlsConfig {
        TlsConfig {
            ca_path: self.ca_path.clone(),
        }
    }
}
