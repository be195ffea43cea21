use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::num::NonZeroUsize;
use std::time::Duration;

use crate::errors::SchemaError;
use crate::types::ConsistencyLevel;

pub const DEFAULT_PORT: u16 = 9042;
pub const DEFAULT_POOL_SIZE: usize = 4;
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// The `CASSANDRA_*` slice of an application's configuration.
///
/// Field names follow the upper-case keys; the lower-case aliases cover
/// sources (such as environment variables read through the `config` crate)
/// that fold keys to lower case.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppSettings {
    #[serde(rename = "CASSANDRA_HOSTS", alias = "cassandra_hosts", default)]
    pub hosts: Option<HostsSetting>,

    #[serde(rename = "CASSANDRA_KEYSPACE", alias = "cassandra_keyspace", default)]
    pub keyspace: Option<String>,

    #[serde(rename = "CASSANDRA_CONSISTENCY", alias = "cassandra_consistency", default)]
    pub consistency: Option<ConsistencySetting>,

    #[serde(rename = "CASSANDRA_LAZY_CONNECT", alias = "cassandra_lazy_connect", default)]
    pub lazy_connect: Option<bool>,

    #[serde(rename = "CASSANDRA_RETRY_CONNECT", alias = "cassandra_retry_connect", default)]
    pub retry_connect: Option<bool>,

    #[serde(rename = "CASSANDRA_SETUP_KWARGS", alias = "cassandra_setup_kwargs", default)]
    pub setup_kwargs: Option<HashMap<String, serde_json::Value>>,
}

/// Hosts given either as a list or as one comma-separated string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HostsSetting {
    List(Vec<String>),
    Joined(String),
}

impl HostsSetting {
    pub fn to_vec(&self) -> Vec<String> {
        let raw: Vec<&str> = match self {
            HostsSetting::List(hosts) => hosts.iter().map(String::as_str).collect(),
            HostsSetting::Joined(joined) => joined.split(',').collect(),
        };
        raw.into_iter()
            .map(str::trim)
            .filter(|h| !h.is_empty())
            .map(str::to_string)
            .collect()
    }
}

/// Consistency given as a protocol code or as a level name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConsistencySetting {
    Code(u16),
    Name(String),
}

impl ConsistencySetting {
    pub fn level(&self) -> Result<ConsistencyLevel, SchemaError> {
        match self {
            ConsistencySetting::Code(code) => ConsistencyLevel::from_code(*code),
            ConsistencySetting::Name(name) => name.parse(),
        }
    }
}

/// Driver options carried in `CASSANDRA_SETUP_KWARGS`.
///
/// Timeouts are in seconds. Anything not recognised lands in `extra` and is
/// reported by the connector rather than rejected.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SetupOptions {
    pub port: Option<u16>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub connect_timeout: Option<f64>,
    #[serde(alias = "default_timeout")]
    pub request_timeout: Option<f64>,
    pub pool_size: Option<usize>,
    pub compression: Option<String>,
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

impl SetupOptions {
    pub fn from_kwargs(kwargs: &HashMap<String, serde_json::Value>) -> Result<Self, SchemaError> {
        let map: serde_json::Map<String, serde_json::Value> =
            kwargs.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
        let options: SetupOptions = serde_json::from_value(serde_json::Value::Object(map))
            .map_err(|e| SchemaError::ConfigError(format!("invalid CASSANDRA_SETUP_KWARGS: {}", e)))?;

        options.validate()?;
        Ok(options)
    }

    fn validate(&self) -> Result<(), SchemaError> {
        for (name, secs) in [
            ("connect_timeout", self.connect_timeout),
            ("request_timeout", self.request_timeout),
        ] {
            if let Some(secs) = secs {
                Duration::try_from_secs_f64(secs).map_err(|_| {
                    SchemaError::ConfigError(format!("{} must be a non-negative number of seconds", name))
                })?;
            }
        }
        if self.pool_size == Some(0) {
            return Err(SchemaError::ConfigError("pool_size must be at least 1".to_string()));
        }
        if let Some(ref compression) = self.compression {
            if !matches!(compression.to_ascii_lowercase().as_str(), "lz4" | "snappy") {
                return Err(SchemaError::ConfigError(format!(
                    "unsupported compression '{}'",
                    compression
                )));
            }
        }
        Ok(())
    }

    pub fn port(&self) -> u16 {
        self.port.unwrap_or(DEFAULT_PORT)
    }

    pub fn connect_timeout(&self) -> Option<Duration> {
        self.connect_timeout.and_then(|s| Duration::try_from_secs_f64(s).ok())
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
            .and_then(|s| Duration::try_from_secs_f64(s).ok())
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT)
    }

    pub fn pool_size(&self) -> NonZeroUsize {
        self.pool_size
            .and_then(NonZeroUsize::new)
            .or_else(|| NonZeroUsize::new(DEFAULT_POOL_SIZE))
            .unwrap_or(NonZeroUsize::MIN)
    }
}

/// Connection parameters resolved once at bind time.
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionConfig {
    pub hosts: Vec<String>,
    pub keyspace: String,
    pub consistency: ConsistencyLevel,
    pub lazy_connect: bool,
    pub retry_connect: bool,
    pub setup: SetupOptions,
}

impl ConnectionConfig {
    pub fn from_settings(settings: &AppSettings) -> Result<Self, SchemaError> {
        let hosts = settings
            .hosts
            .as_ref()
            .map(HostsSetting::to_vec)
            .unwrap_or_default();
        let keyspace = settings
            .keyspace
            .as_deref()
            .map(str::trim)
            .unwrap_or_default()
            .to_string();

        if hosts.is_empty() || keyspace.is_empty() {
            return Err(SchemaError::MissingConfiguration(
                "CASSANDRA_HOSTS and CASSANDRA_KEYSPACE must both be supplied".to_string(),
            ));
        }

        let consistency = match settings.consistency {
            Some(ref setting) => setting.level()?,
            None => ConsistencyLevel::default(),
        };

        let setup = match settings.setup_kwargs {
            Some(ref kwargs) => SetupOptions::from_kwargs(kwargs)?,
            None => SetupOptions::default(),
        };

        Ok(Self {
            hosts,
            keyspace,
            consistency,
            lazy_connect: settings.lazy_connect.unwrap_or(false),
            retry_connect: settings.retry_connect.unwrap_or(false),
            setup,
        })
    }

    /// Hosts as `host:port` contact points; hosts that already carry a port are kept.
    pub fn contact_points(&self) -> Vec<String> {
        let port = self.setup.port();
        self.hosts
            .iter()
            .map(|host| {
                if host.parse::<SocketAddr>().is_ok() {
                    host.clone()
                } else if let Ok(IpAddr::V6(ip)) = host.parse::<IpAddr>() {
                    format!("[{}]:{}", ip, port)
                } else if host.contains(':') {
                    host.clone()
                } else {
                    format!("{}:{}", host, port)
                }
            })
            .collect()
    }
}
