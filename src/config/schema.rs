//! Typed settings read from the layered config tree.
//!
//! # Responsibilities
//! - Define the settings structs consumed by the server subsystems
//! - Build them from a [`ConfigNode`], so file values override the embedded
//!   defaults through the layered resolver
//!
//! # Design Decisions
//! - Settings are resolved once at startup; a failed lookup or a malformed
//!   value aborts startup with the offending path
//! - Optional blocks (TLS, security scheme) are driven by presence flags,
//!   not by absent tables, so defaults can disable them explicitly

use std::path::PathBuf;
use std::time::Duration;

use crate::config::node::{ConfigError, ConfigNode};
use crate::config::path::ConfigPath;

/// Value of `security.handler` meaning "no security scheme configured".
pub const SECURITY_HANDLER_NONE: &str = "none";

/// Complete gateway settings tree.
#[derive(Debug, Clone)]
pub struct GatewaySettings {
    pub listener: ListenerSettings,
    pub transport: Option<SecureTransportSettings>,
    pub security: SecuritySettings,
    pub workers: WorkerSettings,
    pub observability: ObservabilitySettings,
}

/// Listener settings: where to bind and per-request limits.
#[derive(Debug, Clone)]
pub struct ListenerSettings {
    pub bind_address: String,
    pub request_timeout: Duration,
    pub max_body_bytes: u64,
}

/// One key or trust store reference: type, location, optional passphrase
/// file. Key material itself stays on disk until the transport loads it.
#[derive(Debug, Clone)]
pub struct StoreSettings {
    pub store_type: String,
    pub location: PathBuf,
    pub passphrase_file: Option<PathBuf>,
}

/// Encrypted-transport settings, present only when `transport.enabled`.
#[derive(Debug, Clone)]
pub struct SecureTransportSettings {
    pub key_store: StoreSettings,
    pub trust_store: Option<StoreSettings>,
    /// TLS protocol selection: "tls1.2", "tls1.3", or unset for both.
    pub protocol: Option<String>,
}

/// Security scheme selection. `handler_name` of `None` means the API is
/// served unsecured, which is valid but logged prominently.
#[derive(Debug, Clone)]
pub struct SecuritySettings {
    pub handler_name: Option<String>,
}

/// Worker pool sizing for the async runtime.
#[derive(Debug, Clone)]
pub struct WorkerSettings {
    pub count: usize,
    pub io_threads: usize,
}

/// Metrics exposition settings.
#[derive(Debug, Clone)]
pub struct ObservabilitySettings {
    pub metrics_enabled: bool,
    pub metrics_address: String,
}

impl GatewaySettings {
    /// Resolve the full settings tree from a config source.
    pub fn from_config(config: &dyn ConfigNode) -> Result<Self, ConfigError> {
        Ok(Self {
            listener: ListenerSettings::from_config(config)?,
            transport: SecureTransportSettings::from_config(config)?,
            security: SecuritySettings::from_config(config)?,
            workers: WorkerSettings::from_config(config)?,
            observability: ObservabilitySettings::from_config(config)?,
        })
    }
}

impl ListenerSettings {
    fn from_config(config: &dyn ConfigNode) -> Result<Self, ConfigError> {
        Ok(Self {
            bind_address: config.get_string(&ConfigPath::new("listener.bind_address"))?,
            request_timeout: config.get_duration(&ConfigPath::new("listener.request_timeout"))?,
            max_body_bytes: config.get_bytes_size(&ConfigPath::new("listener.max_body_size"))?,
        })
    }
}

impl StoreSettings {
    fn from_config(config: &dyn ConfigNode, base: &str) -> Result<Self, ConfigError> {
        let passphrase_path = ConfigPath::new(format!("{base}.passphrase_file"));
        let passphrase_file = if config.path_exists(&passphrase_path) {
            Some(PathBuf::from(config.get_string(&passphrase_path)?))
        } else {
            None
        };
        Ok(Self {
            store_type: config.get_string(&ConfigPath::new(format!("{base}.type")))?,
            location: PathBuf::from(
                config.get_string(&ConfigPath::new(format!("{base}.location")))?,
            ),
            passphrase_file,
        })
    }
}

impl SecureTransportSettings {
    fn from_config(config: &dyn ConfigNode) -> Result<Option<Self>, ConfigError> {
        if !config.get_bool(&ConfigPath::new("transport.enabled"))? {
            return Ok(None);
        }

        let trust_store = if config.path_exists(&ConfigPath::new("transport.trust_store")) {
            Some(StoreSettings::from_config(config, "transport.trust_store")?)
        } else {
            None
        };
        let protocol_path = ConfigPath::new("transport.protocol");
        let protocol = if config.path_exists(&protocol_path) {
            Some(config.get_string(&protocol_path)?)
        } else {
            None
        };

        Ok(Some(Self {
            key_store: StoreSettings::from_config(config, "transport.key_store")?,
            trust_store,
            protocol,
        }))
    }
}

impl SecuritySettings {
    fn from_config(config: &dyn ConfigNode) -> Result<Self, ConfigError> {
        let name = config.get_string(&ConfigPath::new("security.handler"))?;
        let handler_name = if name == SECURITY_HANDLER_NONE {
            None
        } else {
            Some(name)
        };
        Ok(Self { handler_name })
    }
}

impl WorkerSettings {
    fn from_config(config: &dyn ConfigNode) -> Result<Self, ConfigError> {
        let positive = |path: &str, n: i32| {
            usize::try_from(n).ok().filter(|n| *n > 0).ok_or_else(|| {
                ConfigError::format(&ConfigPath::new(path), n.to_string(), "positive thread count")
            })
        };
        Ok(Self {
            count: positive(
                "workers.count",
                config.get_int(&ConfigPath::new("workers.count"))?,
            )?,
            io_threads: positive(
                "workers.io_threads",
                config.get_int(&ConfigPath::new("workers.io_threads"))?,
            )?,
        })
    }
}

impl ObservabilitySettings {
    fn from_config(config: &dyn ConfigNode) -> Result<Self, ConfigError> {
        Ok(Self {
            metrics_enabled: config.get_bool(&ConfigPath::new("observability.metrics_enabled"))?,
            metrics_address: config.get_string(&ConfigPath::new("observability.metrics_address"))?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::loader;

    #[test]
    fn defaults_resolve_to_complete_settings() {
        let config = loader::defaults_only().expect("embedded defaults must parse");
        let settings = GatewaySettings::from_config(config.as_ref()).unwrap();
        assert!(settings.transport.is_none());
        assert!(settings.security.handler_name.is_none());
        assert!(settings.workers.count > 0);
    }

    #[test]
    fn file_values_override_defaults() {
        let config = loader::layered_over_defaults(
            "[listener]\nbind_address = \"0.0.0.0:9000\"\n[security]\nhandler = \"api-key\"",
        )
        .expect("test config must parse");
        let settings = GatewaySettings::from_config(config.as_ref()).unwrap();
        assert_eq!(settings.listener.bind_address, "0.0.0.0:9000");
        assert_eq!(settings.security.handler_name.as_deref(), Some("api-key"));
        // untouched keys still come from the defaults
        assert_eq!(settings.listener.request_timeout, Duration::from_secs(30));
    }

    #[test]
    fn transport_block_requires_key_store() {
        let config = loader::layered_over_defaults("[transport]\nenabled = true").unwrap();
        let err = GatewaySettings::from_config(config.as_ref()).unwrap_err();
        assert!(matches!(err, ConfigError::Missing { ref path }
            if path.as_str().starts_with("transport.key_store")));
    }

    #[test]
    fn zero_worker_count_is_rejected() {
        let config = loader::layered_over_defaults("[workers]\ncount = 0").unwrap();
        assert!(matches!(
            GatewaySettings::from_config(config.as_ref()),
            Err(ConfigError::Format { .. })
        ));
    }
}
