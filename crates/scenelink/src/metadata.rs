//! Per-scene string metadata (the host's fileInfo block).

use crate::call::{call, call_list};
use crate::error::{Result, SceneError};
use scenelink_host::{alternating_pairs, Command, HostCommand, Invocation};
use std::fmt;
use std::sync::Arc;

/// Key/value pairs saved with the open scene. Opening or creating a scene
/// clears them.
#[derive(Clone)]
pub struct MetadataStore {
    host: Arc<dyn HostCommand>,
}

impl MetadataStore {
    pub(crate) fn new(host: Arc<dyn HostCommand>) -> Self {
        Self { host }
    }

    /// All pairs in the order the host stores them.
    pub fn items(&self) -> Result<Vec<(String, String)>> {
        let flat = call_list(
            self.host.as_ref(),
            "read file info",
            "<scene>",
            Invocation::query(Command::FileInfo).flag("all", true),
        )?;
        Ok(alternating_pairs(flat))
    }

    pub fn keys(&self) -> Result<Vec<String>> {
        Ok(self.items()?.into_iter().map(|(k, _)| k).collect())
    }

    pub fn values(&self) -> Result<Vec<String>> {
        Ok(self.items()?.into_iter().map(|(_, v)| v).collect())
    }

    pub fn get(&self, key: &str) -> Result<String> {
        self.items()?
            .into_iter()
            .find_map(|(k, v)| (k == key).then_some(v))
            .ok_or_else(|| SceneError::not_found("file info key", key))
    }

    pub fn contains(&self, key: &str) -> Result<bool> {
        Ok(self.items()?.iter().any(|(k, _)| k == key))
    }

    /// Insert or overwrite `key`.
    pub fn set(&self, key: &str, value: &str) -> Result<()> {
        call(
            self.host.as_ref(),
            "write file info",
            key,
            Invocation::new(Command::FileInfo).arg(key).arg(value),
        )?;
        Ok(())
    }

    /// Remove `key` and return its value. A missing key yields `default`, or
    /// NotFound when no default is given.
    pub fn pop(&self, key: &str, default: Option<&str>) -> Result<String> {
        let value = match self.get(key) {
            Ok(value) => value,
            Err(err) if err.is_not_found() => {
                return default.map(str::to_string).ok_or(err);
            }
            Err(err) => return Err(err),
        };
        call(
            self.host.as_ref(),
            "remove file info",
            key,
            Invocation::new(Command::FileInfo).flag("remove", key),
        )?;
        tracing::debug!(key, "file info removed");
        Ok(value)
    }
}

impl fmt::Debug for MetadataStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetadataStore").finish_non_exhaustive()
    }
}
