//! Configuration management for Tollgate.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use tracing::info;

use crate::error::{Result, TollgateError};
use crate::quota::QuotaTracker;

/// Prefix of environment variables overriding file settings.
pub const ENV_PREFIX: &str = "TOLLGATE";

/// Main configuration for the Tollgate server.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TollgateConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Quota configuration
    #[serde(default)]
    pub limits: LimitsConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP listen address
    #[serde(default = "default_listen_addr")]
    pub listen_addr: SocketAddr,

    /// Key clients by `X-Forwarded-For` / `X-Real-Ip` instead of the peer
    /// address. Only enable behind a proxy that overwrites these headers.
    #[serde(default)]
    pub trust_forwarded_headers: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            trust_forwarded_headers: false,
        }
    }
}

fn default_listen_addr() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8080))
}

/// Quotas applied by the server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsConfig {
    /// Per client address quota for general routes
    #[serde(default = "default_address_quota")]
    pub address: QuotaConfig,

    /// Shared address and account quota for login attempts
    #[serde(default = "default_brute_force_quota")]
    pub brute_force: QuotaConfig,

    /// Header carrying the account identifier of a login attempt
    #[serde(default = "default_account_header")]
    pub account_header: String,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            address: default_address_quota(),
            brute_force: default_brute_force_quota(),
            account_header: default_account_header(),
        }
    }
}

fn default_address_quota() -> QuotaConfig {
    QuotaConfig {
        capacity: 60,
        window_secs: 60,
    }
}

fn default_brute_force_quota() -> QuotaConfig {
    QuotaConfig {
        capacity: 5,
        window_secs: 300,
    }
}

fn default_account_header() -> String {
    "x-account-id".to_string()
}

/// A fixed-window quota.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaConfig {
    /// Units admitted per key per window
    pub capacity: u64,
    /// Window length in seconds
    pub window_secs: u64,
}

impl QuotaConfig {
    /// Window length.
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }

    /// Build a tracker enforcing this quota.
    pub fn build_tracker(&self) -> Result<QuotaTracker> {
        QuotaTracker::new(self.capacity, self.window())
    }

    fn validate(&self, section: &str) -> Result<()> {
        if self.capacity == 0 {
            return Err(TollgateError::Config(format!(
                "{section}.capacity must be at least 1"
            )));
        }
        if self.window_secs == 0 {
            return Err(TollgateError::Config(format!(
                "{section}.window_secs must be at least 1"
            )));
        }
        Ok(())
    }
}

impl TollgateConfig {
    /// Load configuration from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!(path = %path.display(), "Loading configuration");

        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    /// Load configuration from a YAML string.
    ///
    /// Keys missing from `yaml` keep their default values, down to single
    /// fields of a quota.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let builder = Self::defaults()?
            .add_source(::config::File::from_str(yaml, ::config::FileFormat::Yaml));
        Self::build(builder)
    }

    /// Load configuration from an optional YAML file, then apply environment
    /// overrides such as `TOLLGATE__LIMITS__ADDRESS__CAPACITY=100`.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with_env(path, Self::environment())
    }

    fn load_with_env(path: Option<&Path>, env: ::config::Environment) -> Result<Self> {
        let mut builder = Self::defaults()?;

        if let Some(path) = path {
            info!(path = %path.display(), "Loading configuration");
            builder = builder.add_source(
                ::config::File::from(path).format(::config::FileFormat::Yaml),
            );
        }

        Self::build(builder.add_source(env))
    }

    fn environment() -> ::config::Environment {
        ::config::Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("__")
            .separator("__")
            .try_parsing(true)
    }

    /// Builder seeded with every default, so later sources may set single
    /// nested fields.
    fn defaults() -> Result<::config::ConfigBuilder<::config::builder::DefaultState>> {
        Ok(::config::Config::builder()
            .add_source(::config::Config::try_from(&TollgateConfig::default())?))
    }

    fn build(builder: ::config::ConfigBuilder<::config::builder::DefaultState>) -> Result<Self> {
        let config: TollgateConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Check that every quota can be enforced.
    pub fn validate(&self) -> Result<()> {
        self.limits.address.validate("limits.address")?;
        self.limits.brute_force.validate("limits.brute_force")?;

        if self.limits.account_header.trim().is_empty() {
            return Err(TollgateError::Config(
                "limits.account_header must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}
