//! Reference graph resolution.
//!
//! Flat listing maps each top-level reference's namespace to its node.
//! Recursive listing also walks sub-references, keying each nested node by
//! its ancestors' keys joined with `:` (`charA:sword:gem`).

use crate::call::enumerate;
use crate::config::{CollisionPolicy, SessionConfig};
use crate::reference::ReferenceNode;
use scenelink_host::{Command, HostCommand, Invocation};
use std::collections::btree_map::{self, BTreeMap};
use std::sync::Arc;

/// Namespace key → reference, sorted by key.
#[derive(Debug, Clone, Default)]
pub struct ReferenceGraph {
    nodes: BTreeMap<String, ReferenceNode>,
    policy: CollisionPolicy,
}

impl ReferenceGraph {
    pub fn new(policy: CollisionPolicy) -> Self {
        Self {
            nodes: BTreeMap::new(),
            policy,
        }
    }

    /// Store `node` under `key`. Returns whether the node was stored; under
    /// [`CollisionPolicy::KeepFirst`] a colliding key keeps its first node.
    /// A replaced node takes its nested `key:` entries with it.
    pub fn insert(&mut self, key: String, node: ReferenceNode) -> bool {
        let replaced = match self.nodes.entry(key.clone()) {
            btree_map::Entry::Vacant(slot) => {
                slot.insert(node);
                return true;
            }
            btree_map::Entry::Occupied(mut slot) => {
                let (kept, dropped) = match self.policy {
                    CollisionPolicy::LastWriteWins => (node.to_string(), slot.get().to_string()),
                    CollisionPolicy::KeepFirst => (slot.get().to_string(), node.to_string()),
                };
                tracing::warn!(
                    namespace = %slot.key(),
                    kept = %kept,
                    dropped = %dropped,
                    "namespace collision in reference graph"
                );
                match self.policy {
                    CollisionPolicy::LastWriteWins => {
                        slot.insert(node);
                        true
                    }
                    CollisionPolicy::KeepFirst => false,
                }
            }
        };
        if replaced {
            self.drop_nested(&key);
        }
        replaced
    }

    fn drop_nested(&mut self, key: &str) {
        let prefix = format!("{key}:");
        let nested: Vec<String> = self
            .nodes
            .range(prefix.clone()..)
            .map(|(k, _)| k)
            .take_while(|k| k.starts_with(&prefix))
            .cloned()
            .collect();
        for k in nested {
            self.nodes.remove(&k);
        }
    }

    pub fn get(&self, key: &str) -> Option<&ReferenceNode> {
        self.nodes.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.nodes.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.nodes.keys().map(String::as_str)
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, ReferenceNode> {
        self.nodes.iter()
    }

    /// Insert every entry of `other`, applying this graph's collision policy.
    pub fn merge(&mut self, other: ReferenceGraph) {
        for (key, node) in other.nodes {
            self.insert(key, node);
        }
    }

    /// Entries nested directly below `key`.
    pub fn children_of<'a>(&'a self, key: &'a str) -> impl Iterator<Item = (&'a str, &'a ReferenceNode)> {
        self.nodes.iter().filter_map(move |(k, node)| {
            let rest = k.strip_prefix(key)?.strip_prefix(':')?;
            (!rest.contains(':')).then_some((k.as_str(), node))
        })
    }

    pub fn into_map(self) -> BTreeMap<String, ReferenceNode> {
        self.nodes
    }
}

impl IntoIterator for ReferenceGraph {
    type Item = (String, ReferenceNode);
    type IntoIter = btree_map::IntoIter<String, ReferenceNode>;

    fn into_iter(self) -> Self::IntoIter {
        self.nodes.into_iter()
    }
}

impl<'a> IntoIterator for &'a ReferenceGraph {
    type Item = (&'a String, &'a ReferenceNode);
    type IntoIter = btree_map::Iter<'a, String, ReferenceNode>;

    fn into_iter(self) -> Self::IntoIter {
        self.nodes.iter()
    }
}

// ============================================================================
// Resolution
// ============================================================================

fn top_level_paths(host: &dyn HostCommand) -> Vec<String> {
    enumerate(
        host,
        "list references",
        "<scene>",
        Invocation::query(Command::File).flag("reference", true),
    )
}

/// Top-level references in host order.
pub fn reference_list(host: &Arc<dyn HostCommand>, config: SessionConfig) -> Vec<ReferenceNode> {
    top_level_paths(host.as_ref())
        .iter()
        .map(|raw| ReferenceNode::from_raw(Arc::clone(host), config, raw))
        .collect()
}

/// Namespaces of the top-level references in host order. Empty when the host
/// cannot enumerate.
pub fn list_namespaces(host: &Arc<dyn HostCommand>, config: SessionConfig) -> Vec<String> {
    reference_list(host, config)
        .iter()
        .filter_map(|node| match node.namespace() {
            Ok(ns) => Some(ns),
            Err(err) => {
                tracing::debug!(reference = %node, error = %err, "namespace unavailable");
                None
            }
        })
        .collect()
}

/// Build the namespace → reference graph of the open scene.
pub fn list_references(
    host: &Arc<dyn HostCommand>,
    config: SessionConfig,
    recursive: bool,
) -> ReferenceGraph {
    let mut graph = ReferenceGraph::new(config.namespace_collision);
    for node in reference_list(host, config) {
        let namespace = match node.namespace() {
            Ok(ns) => ns,
            Err(err) => {
                tracing::debug!(reference = %node, error = %err, "skipping reference without namespace");
                continue;
            }
        };
        let parent = recursive.then(|| node.clone());
        if graph.insert(namespace.clone(), node) {
            if let Some(parent) = parent {
                absorb_children(&mut graph, &parent, &namespace, config.max_depth);
            }
        }
    }
    graph
}

/// Insert the sub-references of `parent` under `"{prefix}:{namespace}"`,
/// descending at most `levels` levels.
pub(crate) fn absorb_children(
    graph: &mut ReferenceGraph,
    parent: &ReferenceNode,
    prefix: &str,
    levels: usize,
) {
    if levels == 0 {
        return;
    }
    for raw in parent.child_paths() {
        let child = parent.child(&raw);
        let namespace = match child.namespace() {
            Ok(ns) => ns,
            Err(err) => {
                tracing::debug!(reference = %child, error = %err, "skipping sub-reference without namespace");
                continue;
            }
        };
        let key = format!("{prefix}:{namespace}");
        let descend = (levels > 1).then(|| child.clone());
        if graph.insert(key.clone(), child) {
            if let Some(child) = descend {
                absorb_children(graph, &child, &key, levels - 1);
            }
        }
    }
}
