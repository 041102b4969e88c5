//! Server addresses.

use std::fmt;
use std::net::{SocketAddr, ToSocketAddrs};
use std::str::FromStr;

use crate::error::AddressError;

/// A server endpoint: host name or IP literal plus port.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HostAddr {
    host: String,
    port: u16,
}

impl HostAddr {
    /// Create an address from its parts.
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Get the host.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Get the port.
    #[must_use]
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Resolve to the first socket address.
    ///
    /// This performs a blocking lookup.
    pub fn resolve(&self) -> std::io::Result<SocketAddr> {
        (self.host.as_str(), self.port)
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| {
                std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("no addresses found for {self}"),
                )
            })
    }
}

impl FromStr for HostAddr {
    type Err = AddressError;

    /// Parse `host:port` or `[v6-literal]:port`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (host, port) = if let Some(rest) = s.strip_prefix('[') {
            let (host, after) = rest
                .split_once(']')
                .ok_or_else(|| AddressError::MissingPort(s.to_string()))?;
            let port = after
                .strip_prefix(':')
                .ok_or_else(|| AddressError::MissingPort(s.to_string()))?;
            (host, port)
        } else {
            s.rsplit_once(':')
                .ok_or_else(|| AddressError::MissingPort(s.to_string()))?
        };

        if host.is_empty() {
            return Err(AddressError::EmptyHost(s.to_string()));
        }
        let port = port
            .parse::<u16>()
            .map_err(|_| AddressError::InvalidPort(s.to_string()))?;

        Ok(Self::new(host, port))
    }
}

impl fmt::Display for HostAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}
