//! Named security scheme resolution.
//!
//! # Responsibilities
//! - Collect scheme factories contributed at startup
//! - Resolve the configured scheme name to a live handler
//!
//! # Design Decisions
//! - The registry freezes before the listener binds; nothing registers a
//!   scheme afterwards
//! - An unknown configured name is fatal at startup, not a per-request 500

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

use crate::config::node::{ConfigError, ConfigNode};
use crate::security::api_key::ApiKeyFactory;
use crate::security::SecurityHandler;

/// Error raised while resolving the configured security scheme.
#[derive(Debug, Error)]
pub enum SecuritySetupError {
    #[error("security scheme '{0}' is not registered")]
    UnknownScheme(String),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("failed to read key material from '{path}': {source}")]
    KeyMaterial {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Builds the handler for one named security scheme.
pub trait SecurityHandlerFactory: Send + Sync {
    /// Name the scheme is configured by (`security.handler`).
    fn scheme_name(&self) -> &'static str;

    /// Build the handler from the `security` config subtree.
    fn create_security_handler(
        &self,
        config: &dyn ConfigNode,
    ) -> Result<Arc<dyn SecurityHandler>, SecuritySetupError>;
}

/// Immutable name-keyed collection of scheme factories.
pub struct SecuritySchemeRegistry {
    factories: HashMap<&'static str, Arc<dyn SecurityHandlerFactory>>,
}

impl SecuritySchemeRegistry {
    /// Registry preloaded with the built-in schemes.
    pub fn with_builtin_schemes() -> Self {
        let mut registry = Self {
            factories: HashMap::new(),
        };
        registry.register(Arc::new(ApiKeyFactory));
        registry
    }

    /// Contribute a scheme factory. Later registrations under the same
    /// name replace earlier ones.
    pub fn register(&mut self, factory: Arc<dyn SecurityHandlerFactory>) {
        self.factories.insert(factory.scheme_name(), factory);
    }

    /// Resolve a configured scheme name against the contributed factories.
    pub fn resolve(
        &self,
        name: &str,
        config: &dyn ConfigNode,
    ) -> Result<Arc<dyn SecurityHandler>, SecuritySetupError> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| SecuritySetupError::UnknownScheme(name.to_string()))?;
        factory.create_security_handler(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::tree::TomlConfigNode;

    #[test]
    fn unknown_scheme_fails_resolution() {
        let registry = SecuritySchemeRegistry::with_builtin_schemes();
        let config = TomlConfigNode::parse("").unwrap();
        assert!(matches!(
            registry.resolve("kerberos", &config),
            Err(SecuritySetupError::UnknownScheme(_))
        ));
    }

    #[test]
    fn builtin_api_key_scheme_is_registered() {
        let registry = SecuritySchemeRegistry::with_builtin_schemes();
        assert!(registry.factories.contains_key("api-key"));
    }
}
