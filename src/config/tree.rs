//! In-memory config source backed by a parsed TOML document.
//!
//! # Responsibilities
//! - Descend dotted paths through nested TOML tables
//! - Map TOML scalars onto the typed accessor contract
//!
//! # Design Decisions
//! - Durations and byte sizes accept either a string ("30s", "1MiB") or a
//!   bare integer (milliseconds / bytes), matching the parse rules in
//!   `node.rs`
//! - Subtrees are materialized by cloning the subtable; config trees are
//!   small and loaded once at startup

use std::sync::Arc;
use std::time::Duration;

use toml::Value;

use crate::config::node::{parse_bytes_size, parse_duration, ConfigError, ConfigNode};
use crate::config::path::ConfigPath;

/// A [`ConfigNode`] over a TOML table.
#[derive(Debug, Clone)]
pub struct TomlConfigNode {
    root: Value,
}

impl TomlConfigNode {
    /// Wrap an already-parsed TOML value (normally a table).
    pub fn new(root: Value) -> Self {
        Self { root }
    }

    /// Parse a TOML document into a config source.
    pub fn parse(text: &str) -> Result<Self, toml::de::Error> {
        Ok(Self::new(text.parse::<Value>()?))
    }

    fn lookup(&self, path: &ConfigPath) -> Option<&Value> {
        let mut current = &self.root;
        for segment in path.segments() {
            current = current.as_table()?.get(segment)?;
        }
        Some(current)
    }

    fn require(&self, path: &ConfigPath) -> Result<&Value, ConfigError> {
        self.lookup(path).ok_or_else(|| ConfigError::missing(path))
    }
}

impl ConfigNode for TomlConfigNode {
    fn path_exists(&self, path: &ConfigPath) -> bool {
        self.lookup(path).is_some()
    }

    fn get_string(&self, path: &ConfigPath) -> Result<String, ConfigError> {
        match self.require(path)? {
            Value::String(s) => Ok(s.clone()),
            other => Err(ConfigError::format(path, other.to_string(), "string")),
        }
    }

    fn get_int(&self, path: &ConfigPath) -> Result<i32, ConfigError> {
        match self.require(path)? {
            Value::Integer(n) => i32::try_from(*n)
                .map_err(|_| ConfigError::format(path, n.to_string(), "32-bit integer")),
            other => Err(ConfigError::format(path, other.to_string(), "integer")),
        }
    }

    fn get_long(&self, path: &ConfigPath) -> Result<i64, ConfigError> {
        match self.require(path)? {
            Value::Integer(n) => Ok(*n),
            other => Err(ConfigError::format(path, other.to_string(), "integer")),
        }
    }

    fn get_double(&self, path: &ConfigPath) -> Result<f64, ConfigError> {
        match self.require(path)? {
            Value::Float(x) => Ok(*x),
            Value::Integer(n) => Ok(*n as f64),
            other => Err(ConfigError::format(path, other.to_string(), "number")),
        }
    }

    fn get_bool(&self, path: &ConfigPath) -> Result<bool, ConfigError> {
        match self.require(path)? {
            Value::Boolean(b) => Ok(*b),
            other => Err(ConfigError::format(path, other.to_string(), "boolean")),
        }
    }

    fn get_duration(&self, path: &ConfigPath) -> Result<Duration, ConfigError> {
        match self.require(path)? {
            Value::String(s) => {
                parse_duration(s).ok_or_else(|| ConfigError::format(path, s.clone(), "duration"))
            }
            Value::Integer(n) => u64::try_from(*n)
                .map(Duration::from_millis)
                .map_err(|_| ConfigError::format(path, n.to_string(), "duration")),
            other => Err(ConfigError::format(path, other.to_string(), "duration")),
        }
    }

    fn get_bytes_size(&self, path: &ConfigPath) -> Result<u64, ConfigError> {
        match self.require(path)? {
            Value::String(s) => {
                parse_bytes_size(s).ok_or_else(|| ConfigError::format(path, s.clone(), "byte size"))
            }
            Value::Integer(n) => u64::try_from(*n)
                .map_err(|_| ConfigError::format(path, n.to_string(), "byte size")),
            other => Err(ConfigError::format(path, other.to_string(), "byte size")),
        }
    }

    fn get_subtree(&self, path: &ConfigPath) -> Result<Arc<dyn ConfigNode>, ConfigError> {
        match self.require(path)? {
            table @ Value::Table(_) => Ok(Arc::new(TomlConfigNode::new(table.clone()))),
            other => Err(ConfigError::format(path, other.to_string(), "subtree")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(text: &str) -> TomlConfigNode {
        TomlConfigNode::parse(text).expect("test config must parse")
    }

    #[test]
    fn scalar_lookups() {
        let config = node(
            r#"
            [listener]
            bind_address = "127.0.0.1:8500"
            request_timeout = "30s"
            max_body_size = "1MiB"
            backlog = 128
            "#,
        );

        let get = |p: &str| ConfigPath::new(p);
        assert_eq!(
            config.get_string(&get("listener.bind_address")).unwrap(),
            "127.0.0.1:8500"
        );
        assert_eq!(
            config.get_duration(&get("listener.request_timeout")).unwrap(),
            Duration::from_secs(30)
        );
        assert_eq!(
            config.get_bytes_size(&get("listener.max_body_size")).unwrap(),
            1024 * 1024
        );
        assert_eq!(config.get_int(&get("listener.backlog")).unwrap(), 128);
    }

    #[test]
    fn missing_path_reports_full_path() {
        let config = node("[listener]\nbacklog = 1");
        let err = config
            .get_string(&ConfigPath::new("listener.bind_address"))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Missing { ref path } if path.as_str() == "listener.bind_address"));
    }

    #[test]
    fn malformed_duration_reports_raw_value() {
        let config = node("timeout = \"soonish\"");
        let err = config.get_duration(&ConfigPath::new("timeout")).unwrap_err();
        match err {
            ConfigError::Format { raw, expected, .. } => {
                assert_eq!(raw, "soonish");
                assert_eq!(expected, "duration");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn subtree_scopes_lookups() {
        let config = node("[a.b]\nc = true");
        let subtree = config.get_subtree(&ConfigPath::new("a.b")).unwrap();
        assert!(subtree.get_bool(&ConfigPath::new("c")).unwrap());
        assert!(!subtree.path_exists(&ConfigPath::new("a.b.c")));
    }
}
