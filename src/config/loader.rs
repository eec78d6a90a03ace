//! Configuration loading from disk.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use thiserror::Error;

use crate::config::fallback::FallbackConfigNode;
use crate::config::node::ConfigNode;
use crate::config::tree::TomlConfigNode;

/// Defaults compiled into the binary; the fallback layer of every lookup.
const DEFAULTS: &str = include_str!("defaults.toml");

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Load a config file and layer it over the embedded defaults.
pub fn load(path: &Path) -> Result<Arc<dyn ConfigNode>, LoadError> {
    let content = fs::read_to_string(path)?;
    layered_over_defaults(&content)
}

/// Layer a TOML document over the embedded defaults.
pub fn layered_over_defaults(content: &str) -> Result<Arc<dyn ConfigNode>, LoadError> {
    let primary = Arc::new(TomlConfigNode::parse(content)?);
    let fallback = Arc::new(TomlConfigNode::parse(DEFAULTS)?);
    Ok(Arc::new(FallbackConfigNode::new(primary, fallback)))
}

/// The embedded defaults alone, for deployments with no config file.
pub fn defaults_only() -> Result<Arc<dyn ConfigNode>, LoadError> {
    Ok(Arc::new(TomlConfigNode::parse(DEFAULTS)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::path::ConfigPath;

    #[test]
    fn defaults_document_parses() {
        let config = defaults_only().unwrap();
        assert!(config.path_exists(&ConfigPath::new("listener.bind_address")));
    }

    #[test]
    fn broken_toml_is_a_parse_error() {
        assert!(matches!(
            layered_over_defaults("listener = ["),
            Err(LoadError::Parse(_))
        ));
    }
}
