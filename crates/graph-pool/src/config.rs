//! Pool configuration.

use std::path::PathBuf;
use std::time::Duration;

use graph_client::ConnectOptions;

use crate::error::PoolError;

/// How the maximum pool size is applied.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SizeScope {
    /// Each address may hold up to the maximum.
    #[default]
    PerAddress,
    /// The maximum bounds the pool as a whole.
    Total,
}

/// How many connections `init` opens.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum InitSize {
    /// `min_connection_pool_size` per address (pool-wide under
    /// [`SizeScope::Total`]), and at least one per address.
    #[default]
    Minimum,
    /// Fill the pool to `max_connection_pool_size` connections in total,
    /// spread round-robin over the addresses.
    Maximum,
}

/// Configuration for a [`ConnectionPool`](crate::ConnectionPool).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Maximum number of connections (see [`SizeScope`]).
    pub max_connection_pool_size: u32,

    /// Connections opened per address by `init`, and kept through idle checks.
    pub min_connection_pool_size: u32,

    /// Connect and per-request timeout. Zero means no timeout.
    pub timeout: Duration,

    /// Idle connections unused for longer than this are dropped by the idle
    /// check. Zero keeps them forever.
    pub idle_time: Duration,

    /// Interval of the background idle check. Zero disables it.
    pub idle_check_interval: Duration,

    /// Whether to connect over TLS.
    pub enable_ssl: bool,

    /// CA bundle for TLS. `None` uses the bundled trust roots.
    pub ssl_ca_path: Option<PathBuf>,

    /// Whether the maximum is per address or pool-wide.
    pub size_scope: SizeScope,

    /// How many connections `init` opens.
    pub init_size: InitSize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_connection_pool_size: 10,
            min_connection_pool_size: 0,
            timeout: Duration::ZERO,
            idle_time: Duration::ZERO,
            idle_check_interval: Duration::ZERO,
            enable_ssl: false,
            ssl_ca_path: None,
            size_scope: SizeScope::PerAddress,
            init_size: InitSize::Minimum,
        }
    }
}

fn parse_bool(value: &str) -> bool {
    value.eq_ignore_ascii_case("true") || value.eq_ignore_ascii_case("yes") || value == "1"
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, PoolError> {
    value
        .parse()
        .map_err(|_| PoolError::Config(format!("invalid value for {key}: {value}")))
}

impl Config {
    /// Create a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a `key=value;` options string.
    ///
    /// ```text
    /// max_pool=20;min_pool=2;timeout_ms=500;idle_time_ms=60000;enable_ssl=true
    /// ```
    ///
    /// Unknown keys are ignored. The result is not validated; `init` does that.
    pub fn from_options_string(options: &str) -> Result<Self, PoolError> {
        let mut config = Self::default();

        for part in options.split(';') {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }

            let (key, value) = part
                .split_once('=')
                .ok_or_else(|| PoolError::Config(format!("invalid key-value: {part}")))?;
            let key = key.trim().to_lowercase();
            let value = value.trim();

            match key.as_str() {
                "max_pool" | "max_connection_pool_size" => {
                    config.max_connection_pool_size = parse_number(&key, value)?;
                }
                "min_pool" | "min_connection_pool_size" => {
                    config.min_connection_pool_size = parse_number(&key, value)?;
                }
                "timeout_ms" | "timeout" => {
                    config.timeout = Duration::from_millis(parse_number(&key, value)?);
                }
                "idle_time_ms" | "idle_time" => {
                    config.idle_time = Duration::from_millis(parse_number(&key, value)?);
                }
                "idle_check_interval_ms" | "idle_check_interval" => {
                    config.idle_check_interval = Duration::from_millis(parse_number(&key, value)?);
                }
                "enable_ssl" | "ssl" => {
                    config.enable_ssl = parse_bool(value);
                }
                "ssl_ca_path" | "ca_path" => {
                    config.ssl_ca_path = (!value.is_empty()).then(|| PathBuf::from(value));
                }
                "size_scope" => {
                    config.size_scope = match value.to_lowercase().as_str() {
                        "per_address" | "address" => SizeScope::PerAddress,
                        "total" | "pool" => SizeScope::Total,
                        _ => {
                            return Err(PoolError::Config(format!("invalid size_scope: {value}")));
                        }
                    };
                }
                "init_size" => {
                    config.init_size = match value.to_lowercase().as_str() {
                        "min" | "minimum" => InitSize::Minimum,
                        "max" | "maximum" | "fill" => InitSize::Maximum,
                        _ => {
                            return Err(PoolError::Config(format!("invalid init_size: {value}")));
                        }
                    };
                }
                _ => {
                    tracing::debug!(key = key, value = value, "ignoring unknown pool option");
                }
            }
        }

        Ok(config)
    }

    /// Check the size invariants.
    pub fn validate(&self) -> Result<(), PoolError> {
        if self.max_connection_pool_size == 0 {
            return Err(PoolError::Config(
                "max_connection_pool_size must be greater than 0".into(),
            ));
        }
        if self.min_connection_pool_size > self.max_connection_pool_size {
            return Err(PoolError::Config(format!(
                "min_connection_pool_size ({}) exceeds max_connection_pool_size ({})",
                self.min_connection_pool_size, self.max_connection_pool_size
            )));
        }
        Ok(())
    }

    /// Set the maximum pool size.
    #[must_use]
    pub fn max_connection_pool_size(mut self, size: u32) -> Self {
        self.max_connection_pool_size = size;
        self
    }

    /// Set the minimum pool size.
    #[must_use]
    pub fn min_connection_pool_size(mut self, size: u32) -> Self {
        self.min_connection_pool_size = size;
        self
    }

    /// Set the connect and request timeout.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the idle expiry.
    #[must_use]
    pub fn idle_time(mut self, idle_time: Duration) -> Self {
        self.idle_time = idle_time;
        self
    }

    /// Set the idle check interval.
    #[must_use]
    pub fn idle_check_interval(mut self, interval: Duration) -> Self {
        self.idle_check_interval = interval;
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
    pub fn ssl_ca_path(mut self, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        self.ssl_ca_path = (!path.as_os_str().is_empty()).then_some(path);
        self
    }

    /// Set the size scope.
    #[must_use]
    pub fn size_scope(mut self, scope: SizeScope) -> Self {
        self.size_scope = scope;
        self
    }

    /// Set how many connections `init` opens.
    #[must_use]
    pub fn init_size(mut self, init_size: InitSize) -> Self {
        self.init_size = init_size;
        self
    }

    /// Options for opening each pooled connection.
    #[must_use]
    pub fn connect_options(&self) -> ConnectOptions {
        let options = ConnectOptions::new()
            .timeout(self.timeout)
            .enable_ssl(self.enable_ssl);
        match &self.ssl_ca_path {
            Some(path) => options.ca_path(path.clone()),
            None => options,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.max_connection_pool_size, 10);
        assert_eq!(config.min_connection_pool_size, 0);
        assert_eq!(config.timeout, Duration::ZERO);
        assert_eq!(config.size_scope, SizeScope::PerAddress);
        assert_eq!(config.init_size, InitSize::Minimum);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate() {
        assert!(Config::new().max_connection_pool_size(0).validate().is_err());
        assert!(
            Config::new()
                .min_connection_pool_size(5)
                .max_connection_pool_size(4)
                .validate()
                .is_err()
        );
        assert!(
            Config::new()
                .min_connection_pool_size(4)
                .max_connection_pool_size(4)
                .validate()
                .is_ok()
        );
    }

    #[test]
    fn test_from_options_string() {
        let config = Config::from_options_string(
            "max_pool=20; min_pool=2;timeout_ms=500;enable_ssl=yes;ssl_ca_path=/etc/ca.pem;size_scope=total;init_size=fill;color=blue",
        )
        .unwrap();
        assert_eq!(config.max_connection_pool_size, 20);
        assert_eq!(config.min_connection_pool_size, 2);
        assert_eq!(config.timeout, Duration::from_millis(500));
        assert!(config.enable_ssl);
        assert_eq!(config.ssl_ca_path, Some(PathBuf::from("/etc/ca.pem")));
        assert_eq!(config.size_scope, SizeScope::Total);
        assert_eq!(config.init_size, InitSize::Maximum);
    }

    #[test]
    fn test_from_options_string_errors() {
        assert!(Config::from_options_string("max_pool").is_err());
        assert!(Config::from_options_string("max_pool=lots").is_err());
        assert!(Config::from_options_string("size_scope=galaxy").is_err());
        assert!(Config::from_options_string("init_size=some").is_err());
    }

    #[test]
    fn test_connect_options() {
        let options = Config::new()
            .timeout(Duration::from_secs(1))
            .enable_ssl(true)
            .ssl_ca_path("")
            .connect_options();
        assert_eq!(options.timeout_limit(), Some(Duration::from_secs(1)));
        assert!(options.enable_ssl);
        assert!(options.ca_path.is_none());
    }
}
