//! Session configuration.

use serde::{Deserialize, Serialize};

/// How a [`ReferenceNode`](crate::ReferenceNode) treats its backing handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandleCaching {
    /// Resolve once, reuse until invalidated (remove/import/load/unload or
    /// an explicit `invalidate()`).
    #[default]
    Cached,
    /// Ask the host on every access.
    AlwaysResolve,
}

/// What a graph does when two references resolve to the same namespace key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollisionPolicy {
    #[default]
    LastWriteWins,
    KeepFirst,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub handle_caching: HandleCaching,
    pub namespace_collision: CollisionPolicy,
    /// Nesting levels a recursive listing descends below the top level.
    pub max_depth: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            handle_caching: HandleCaching::Cached,
            namespace_collision: CollisionPolicy::LastWriteWins,
            max_depth: 16,
        }
    }
}
