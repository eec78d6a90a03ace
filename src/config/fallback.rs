//! Layered config resolution: override-first, delegate-on-absence.
//!
//! # Responsibilities
//! - Compose two config sources into one, primary winning wherever it has
//!   a value
//! - Preserve prefix semantics when descending into subtrees
//!
//! # Design Decisions
//! - Stateless wrapper over the two sources; cheap to construct, no caching
//! - Every accessor re-tests presence in the primary, so the same resolver
//!   answers consistently for mixed-origin subtrees
//! - Subtree descent is all-or-nothing at the boundary: when the primary has
//!   zero presence at a subtree root, the fallback's subtree is returned
//!   as-is and keys below it can no longer be individually overridden

use std::sync::Arc;
use std::time::Duration;

use crate::config::node::{ConfigError, ConfigNode, EmptyConfigNode};
use crate::config::path::ConfigPath;

/// Combines a primary and a fallback [`ConfigNode`] into one.
///
/// For every path `p`: if the primary has a value at `prefix + p`, all
/// accessors read the primary there; otherwise the original, unprefixed `p`
/// is delegated to the fallback and its result returned unchanged.
pub struct FallbackConfigNode {
    primary: Arc<dyn ConfigNode>,
    fallback: Arc<dyn ConfigNode>,
    prefix: ConfigPath,
}

impl FallbackConfigNode {
    pub fn new(primary: Arc<dyn ConfigNode>, fallback: Arc<dyn ConfigNode>) -> Self {
        Self {
            primary,
            fallback,
            prefix: ConfigPath::root(),
        }
    }

    fn prefixed(&self, path: &ConfigPath) -> ConfigPath {
        self.prefix.join(path)
    }

    fn in_primary(&self, path: &ConfigPath) -> Option<ConfigPath> {
        let prefixed = self.prefixed(path);
        if self.primary.path_exists(&prefixed) {
            Some(prefixed)
        } else {
            None
        }
    }
}

impl ConfigNode for FallbackConfigNode {
    fn path_exists(&self, path: &ConfigPath) -> bool {
        self.in_primary(path).is_some() || self.fallback.path_exists(path)
    }

    fn get_string(&self, path: &ConfigPath) -> Result<String, ConfigError> {
        match self.in_primary(path) {
            Some(prefixed) => self.primary.get_string(&prefixed),
            None => self.fallback.get_string(path),
        }
    }

    fn get_int(&self, path: &ConfigPath) -> Result<i32, ConfigError> {
        match self.in_primary(path) {
            Some(prefixed) => self.primary.get_int(&prefixed),
            None => self.fallback.get_int(path),
        }
    }

    fn get_long(&self, path: &ConfigPath) -> Result<i64, ConfigError> {
        match self.in_primary(path) {
            Some(prefixed) => self.primary.get_long(&prefixed),
            None => self.fallback.get_long(path),
        }
    }

    fn get_double(&self, path: &ConfigPath) -> Result<f64, ConfigError> {
        match self.in_primary(path) {
            Some(prefixed) => self.primary.get_double(&prefixed),
            None => self.fallback.get_double(path),
        }
    }

    fn get_bool(&self, path: &ConfigPath) -> Result<bool, ConfigError> {
        match self.in_primary(path) {
            Some(prefixed) => self.primary.get_bool(&prefixed),
            None => self.fallback.get_bool(path),
        }
    }

    fn get_duration(&self, path: &ConfigPath) -> Result<Duration, ConfigError> {
        match self.in_primary(path) {
            Some(prefixed) => self.primary.get_duration(&prefixed),
            None => self.fallback.get_duration(path),
        }
    }

    fn get_bytes_size(&self, path: &ConfigPath) -> Result<u64, ConfigError> {
        match self.in_primary(path) {
            Some(prefixed) => self.primary.get_bytes_size(&prefixed),
            None => self.fallback.get_bytes_size(path),
        }
    }

    fn get_subtree(&self, path: &ConfigPath) -> Result<Arc<dyn ConfigNode>, ConfigError> {
        match self.in_primary(path) {
            Some(prefixed) => {
                // Primary has presence under this subtree, so leaves below it
                // remain individually overridable: rebuild the resolver with
                // an extended prefix against the fallback's subtree.
                let fallback: Arc<dyn ConfigNode> = if self.fallback.path_exists(path) {
                    self.fallback.get_subtree(path)?
                } else {
                    Arc::new(EmptyConfigNode)
                };
                Ok(Arc::new(FallbackConfigNode {
                    primary: Arc::clone(&self.primary),
                    fallback,
                    prefix: prefixed,
                }))
            }
            None => self.fallback.get_subtree(path),
        }
    }
}
