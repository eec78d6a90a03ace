//! Read-only hierarchical configuration sources.
//!
//! # Responsibilities
//! - Define the lookup contract every config source implements
//! - Typed scalar accessors with presence checks
//! - Parse duration and byte-size strings
//!
//! # Design Decisions
//! - The trait is object-safe; sources are shared as `Arc<dyn ConfigNode>`
//! - Durations and byte sizes are stored as strings ("30s", "1MiB") and
//!   parsed on access, so any source that can produce strings supports them
//! - A missing path and a malformed value are distinct errors; both carry
//!   the path so startup diagnostics can name the offending key

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::config::path::ConfigPath;

/// Error raised by configuration lookups.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The path has a value in no source.
    #[error("no value found at config path '{path}'")]
    Missing { path: ConfigPath },

    /// A value exists but cannot be interpreted as the requested type.
    #[error("malformed value at config path '{path}': '{raw}' is not a valid {expected}")]
    Format {
        path: ConfigPath,
        raw: String,
        expected: &'static str,
    },
}

impl ConfigError {
    pub fn missing(path: &ConfigPath) -> Self {
        ConfigError::Missing { path: path.clone() }
    }

    pub fn format(path: &ConfigPath, raw: impl Into<String>, expected: &'static str) -> Self {
        ConfigError::Format {
            path: path.clone(),
            raw: raw.into(),
            expected,
        }
    }
}

/// A read-only, path-addressable configuration source.
///
/// Conceptually a tree: a path either holds a scalar, is absent, or names an
/// internal node with children. `path_exists` is true exactly when a lookup
/// at that path would not fail with [`ConfigError::Missing`].
pub trait ConfigNode: Send + Sync {
    fn path_exists(&self, path: &ConfigPath) -> bool;

    fn get_string(&self, path: &ConfigPath) -> Result<String, ConfigError>;

    fn get_int(&self, path: &ConfigPath) -> Result<i32, ConfigError>;

    fn get_long(&self, path: &ConfigPath) -> Result<i64, ConfigError>;

    fn get_double(&self, path: &ConfigPath) -> Result<f64, ConfigError>;

    fn get_bool(&self, path: &ConfigPath) -> Result<bool, ConfigError>;

    fn get_duration(&self, path: &ConfigPath) -> Result<Duration, ConfigError>;

    fn get_bytes_size(&self, path: &ConfigPath) -> Result<u64, ConfigError>;

    /// Return the subtree rooted at `path` as a config source of its own.
    fn get_subtree(&self, path: &ConfigPath) -> Result<Arc<dyn ConfigNode>, ConfigError>;
}

/// A config source with no values at all.
///
/// Used as the fallback half of a layered resolver when the fallback source
/// has nothing under a subtree the primary does define.
#[derive(Debug, Default)]
pub struct EmptyConfigNode;

impl ConfigNode for EmptyConfigNode {
    fn path_exists(&self, _path: &ConfigPath) -> bool {
        false
    }

    fn get_string(&self, path: &ConfigPath) -> Result<String, ConfigError> {
        Err(ConfigError::missing(path))
    }

    fn get_int(&self, path: &ConfigPath) -> Result<i32, ConfigError> {
        Err(ConfigError::missing(path))
    }

    fn get_long(&self, path: &ConfigPath) -> Result<i64, ConfigError> {
        Err(ConfigError::missing(path))
    }

    fn get_double(&self, path: &ConfigPath) -> Result<f64, ConfigError> {
        Err(ConfigError::missing(path))
    }

    fn get_bool(&self, path: &ConfigPath) -> Result<bool, ConfigError> {
        Err(ConfigError::missing(path))
    }

    fn get_duration(&self, path: &ConfigPath) -> Result<Duration, ConfigError> {
        Err(ConfigError::missing(path))
    }

    fn get_bytes_size(&self, path: &ConfigPath) -> Result<u64, ConfigError> {
        Err(ConfigError::missing(path))
    }

    fn get_subtree(&self, path: &ConfigPath) -> Result<Arc<dyn ConfigNode>, ConfigError> {
        Err(ConfigError::missing(path))
    }
}

/// Parse a duration string: an integer count followed by an optional unit
/// (`ns`, `us`, `ms`, `s`, `m`, `h`, `d`). A bare integer is milliseconds.
pub fn parse_duration(raw: &str) -> Option<Duration> {
    let raw = raw.trim();
    let split = raw.find(|c: char| !c.is_ascii_digit()).unwrap_or(raw.len());
    let (count, unit) = raw.split_at(split);
    let count: u64 = count.parse().ok()?;

    match unit.trim() {
        "ns" => Some(Duration::from_nanos(count)),
        "us" => Some(Duration::from_micros(count)),
        "" | "ms" => Some(Duration::from_millis(count)),
        "s" => Some(Duration::from_secs(count)),
        "m" => Some(Duration::from_secs(count.checked_mul(60)?)),
        "h" => Some(Duration::from_secs(count.checked_mul(3600)?)),
        "d" => Some(Duration::from_secs(count.checked_mul(86_400)?)),
        _ => None,
    }
}

/// Parse a byte-size string: an integer count followed by an optional unit
/// (`B`, decimal `kB`/`MB`/`GB`, or binary `KiB`/`MiB`/`GiB`). A bare
/// integer is bytes.
pub fn parse_bytes_size(raw: &str) -> Option<u64> {
    let raw = raw.trim();
    let split = raw.find(|c: char| !c.is_ascii_digit()).unwrap_or(raw.len());
    let (count, unit) = raw.split_at(split);
    let count: u64 = count.parse().ok()?;

    let multiplier: u64 = match unit.trim() {
        "" | "B" => 1,
        "kB" | "K" | "k" => 1000,
        "KiB" => 1024,
        "MB" | "M" => 1000 * 1000,
        "MiB" => 1024 * 1024,
        "GB" | "G" => 1000 * 1000 * 1000,
        "GiB" => 1024 * 1024 * 1024,
        _ => return None,
    };

    count.checked_mul(multiplier)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duration_units() {
        assert_eq!(parse_duration("250ms"), Some(Duration::from_millis(250)));
        assert_eq!(parse_duration("30s"), Some(Duration::from_secs(30)));
        assert_eq!(parse_duration("5 m"), Some(Duration::from_secs(300)));
        assert_eq!(parse_duration("2h"), Some(Duration::from_secs(7200)));
        assert_eq!(parse_duration("1d"), Some(Duration::from_secs(86_400)));
    }

    #[test]
    fn bare_duration_is_milliseconds() {
        assert_eq!(parse_duration("1500"), Some(Duration::from_millis(1500)));
    }

    #[test]
    fn bad_duration_is_rejected() {
        assert_eq!(parse_duration("fast"), None);
        assert_eq!(parse_duration("10 fortnights"), None);
        assert_eq!(parse_duration(""), None);
    }

    #[test]
    fn byte_size_units() {
        assert_eq!(parse_bytes_size("512"), Some(512));
        assert_eq!(parse_bytes_size("512B"), Some(512));
        assert_eq!(parse_bytes_size("4kB"), Some(4000));
        assert_eq!(parse_bytes_size("4KiB"), Some(4096));
        assert_eq!(parse_bytes_size("1MiB"), Some(1024 * 1024));
        assert_eq!(parse_bytes_size("2GB"), Some(2_000_000_000));
    }

    #[test]
    fn bad_byte_size_is_rejected() {
        assert_eq!(parse_bytes_size("lots"), None);
        assert_eq!(parse_bytes_size("1TBish"), None);
    }
}
