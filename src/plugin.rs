//! Plugin contract: a pluggable backend for resolving mold/config entries
//! by id, so the core never hard-codes a storage location (§6).
//!
//! An entry id ending in `/` names a namespace (a group of entries)
//! rather than a single leaf entry.

use crate::context::Context;
use crate::error::DisirResult;

/// Six callbacks a backend implements: existence checks and read/write
/// for both molds and configs, plus listing.
pub trait Plugin {
    fn mold_entry_exists(&self, entry_id: &str) -> DisirResult<bool>;
    fn config_entry_exists(&self, entry_id: &str) -> DisirResult<bool>;
    fn read_mold(&self, entry_id: &str) -> DisirResult<Context>;
    fn read_config(&self, entry_id: &str, mold: &Context) -> DisirResult<Context>;
    fn write_config(&self, entry_id: &str, config: &Context) -> DisirResult<()>;
    fn config_entry_ids(&self) -> DisirResult<Vec<String>>;
}

/// Whether `entry_id` names a namespace rather than a leaf entry.
pub fn is_namespace_entry(entry_id: &str) -> bool {
    entry_id.ends_with('/')
}

/// An ordered set of backends consulted in registration order; the
/// first to claim an entry id services it.
#[derive(Default)]
pub struct PluginRegistry {
    plugins: Vec<(String, Box<dyn Plugin>)>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        PluginRegistry { plugins: Vec::new() }
    }

    pub fn register(&mut self, name: impl Into<String>, plugin: Box<dyn Plugin>) {
        self.plugins.push((name.into(), plugin));
    }

    pub fn find_mold(&self, entry_id: &str) -> DisirResult<Context> {
        for (_, plugin) in &self.plugins {
            if plugin.mold_entry_exists(entry_id)? {
                return plugin.read_mold(entry_id);
            }
        }
        Err(crate::error::DisirError::MoldMissing(entry_id.to_string()))
    }

    pub fn find_config(&self, entry_id: &str, mold: &Context) -> DisirResult<Context> {
        for (_, plugin) in &self.plugins {
            if plugin.config_entry_exists(entry_id)? {
                return plugin.read_config(entry_id, mold);
            }
        }
        Err(crate::error::DisirError::NotExist(entry_id.to_string()))
    }

    pub fn write_config(&self, entry_id: &str, config: &Context) -> DisirResult<()> {
        for (_, plugin) in &self.plugins {
            if plugin.config_entry_exists(entry_id).unwrap_or(false) {
                return plugin.write_config(entry_id, config);
            }
        }
        self.plugins
            .first()
            .ok_or_else(|| crate::error::DisirError::NoCanDo("no plugin registered".to_string()))?
            .1
            .write_config(entry_id, config)
    }

    pub fn names(&self) -> Vec<&str> {
        self.plugins.iter().map(|(n, _)| n.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn namespace_entries_end_in_slash() {
        assert!(is_namespace_entry("servers/"));
        assert!(!is_namespace_entry("servers/main"));
    }
}
