//! Scene references as stateful entities.
//!
//! A [`ReferenceNode`] wraps one reference in the open scene. It remembers
//! its [`ReferenceIdentity`] and addresses the host by the
//! copy-number-qualified path; everything else (namespace, load and lock
//! state) is read live from the host on each call.
//!
//! The backing reference node is resolved lazily and cached. The cache is
//! dropped by `remove`, `import_contents`, `load` and `unload`, and can be
//! dropped by hand with [`ReferenceNode::invalidate`] when the scene is edited
//! behind the node's back. A node whose reference is gone is stale: path
//! addressed calls fail in the host, handle-addressed calls fail with
//! [`SceneError::StaleReference`].

use crate::call::{call, call_bool, call_list, call_string, enumerate};
use crate::config::{HandleCaching, SessionConfig};
use crate::error::{Result, SceneError};
use crate::files::FileOptions;
use crate::graph::{absorb_children, reference_list, ReferenceGraph};
use crate::identity::ReferenceIdentity;
use crate::path::PathHandle;
use parking_lot::Mutex;
use scenelink_host::{Command, HostCommand, Invocation};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Name of the host's reference node for one reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BackingHandle(String);

impl BackingHandle {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BackingHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The one thing a reference is looked up by.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReferenceSeed {
    Path(String),
    Namespace(String),
    Handle(BackingHandle),
}

impl ReferenceSeed {
    /// Build a seed from loosely supplied parts; exactly one must be present.
    /// Empty strings count as absent.
    pub fn from_parts(
        path: Option<&str>,
        namespace: Option<&str>,
        handle: Option<&str>,
    ) -> Result<Self> {
        let present = |s: Option<&str>| s.filter(|s| !s.is_empty()).map(str::to_string);
        match (present(path), present(namespace), present(handle)) {
            (Some(p), None, None) => Ok(ReferenceSeed::Path(p)),
            (None, Some(ns), None) => Ok(ReferenceSeed::Namespace(ns)),
            (None, None, Some(h)) => Ok(ReferenceSeed::Handle(BackingHandle::new(h))),
            (None, None, None) => Err(SceneError::InvalidArgument(
                "one of path, namespace or reference node is required".to_string(),
            )),
            _ => Err(SceneError::InvalidArgument(
                "only one of path, namespace or reference node may be given".to_string(),
            )),
        }
    }
}

#[derive(Debug, Clone)]
enum HandleCache {
    Unresolved,
    Resolved(Option<BackingHandle>),
}

pub struct ReferenceNode {
    host: Arc<dyn HostCommand>,
    config: SessionConfig,
    identity: ReferenceIdentity,
    handle: Mutex<HandleCache>,
}

impl ReferenceNode {
    pub fn resolve(
        host: Arc<dyn HostCommand>,
        config: SessionConfig,
        seed: ReferenceSeed,
    ) -> Result<Self> {
        match seed {
            ReferenceSeed::Path(raw) => Ok(Self::from_raw(host, config, &raw)),
            ReferenceSeed::Namespace(namespace) => {
                for node in reference_list(&host, config) {
                    match node.namespace() {
                        Ok(ns) if ns == namespace => return Ok(node),
                        Ok(_) => {}
                        Err(err) => {
                            tracing::debug!(reference = %node, error = %err, "skipping reference with unreadable namespace");
                        }
                    }
                }
                Err(SceneError::not_found("namespace", namespace))
            }
            ReferenceSeed::Handle(handle) => {
                let raw = call_string(
                    host.as_ref(),
                    "resolve reference file",
                    handle.as_str(),
                    Invocation::query(Command::ReferenceQuery)
                        .flag("filename", true)
                        .arg(handle.as_str()),
                )?;
                let node = Self::from_raw(host, config, &raw);
                *node.handle.lock() = HandleCache::Resolved(Some(handle));
                Ok(node)
            }
        }
    }

    pub(crate) fn from_raw(host: Arc<dyn HostCommand>, config: SessionConfig, raw: &str) -> Self {
        Self {
            host,
            config,
            identity: ReferenceIdentity::parse(raw),
            handle: Mutex::new(HandleCache::Unresolved),
        }
    }

    fn host(&self) -> &dyn HostCommand {
        self.host.as_ref()
    }

    pub fn identity(&self) -> &ReferenceIdentity {
        &self.identity
    }

    /// File path with the copy number stripped.
    pub fn path(&self) -> &PathHandle {
        self.identity.base()
    }

    pub fn copy_number(&self) -> Option<u32> {
        self.identity.copy_number()
    }

    pub fn with_copy_number(&self) -> String {
        self.identity.raw()
    }

    // ------------------------------------------------------------------
    // Namespace
    // ------------------------------------------------------------------

    pub fn namespace(&self) -> Result<String> {
        let raw = self.with_copy_number();
        call_string(
            self.host(),
            "query namespace",
            &raw,
            Invocation::query(Command::File)
                .flag("namespace", true)
                .arg(raw.as_str()),
        )
    }

    /// Rename this reference's namespace; collisions are reported by the host.
    pub fn set_namespace(&self, namespace: &str) -> Result<()> {
        let raw = self.with_copy_number();
        call(
            self.host(),
            "rename namespace",
            &raw,
            Invocation::edit(Command::File)
                .flag("namespace", namespace)
                .arg(raw.as_str()),
        )?;
        tracing::debug!(reference = %raw, namespace, "namespace renamed");
        Ok(())
    }

    pub fn namespace_exists(&self) -> Result<bool> {
        let namespace = self.namespace()?;
        call_bool(
            self.host(),
            "query namespace exists",
            &namespace,
            Invocation::query(Command::Namespace).flag("exists", namespace.as_str()),
        )
    }

    pub fn is_using_namespaces(&self) -> Result<bool> {
        let raw = self.with_copy_number();
        call_bool(
            self.host(),
            "query using namespaces",
            &raw,
            Invocation::query(Command::File)
                .flag("usingNamespaces", true)
                .arg(raw.as_str()),
        )
    }

    // ------------------------------------------------------------------
    // Backing handle
    // ------------------------------------------------------------------

    /// The host's reference node for this reference, or `None` when the host
    /// has none (e.g. the reference was removed).
    pub fn backing_handle(&self) -> Option<BackingHandle> {
        if self.config.handle_caching == HandleCaching::AlwaysResolve {
            return self.query_handle();
        }
        let mut cache = self.handle.lock();
        if let HandleCache::Resolved(handle) = &*cache {
            return handle.clone();
        }
        let resolved = self.query_handle();
        *cache = HandleCache::Resolved(resolved.clone());
        resolved
    }

    /// Forget the cached backing handle; the next access asks the host again.
    pub fn invalidate(&self) {
        let mut cache = self.handle.lock();
        if !matches!(*cache, HandleCache::Unresolved) {
            tracing::debug!(reference = %self.identity, "backing handle invalidated");
        }
        *cache = HandleCache::Unresolved;
    }

    fn query_handle(&self) -> Option<BackingHandle> {
        let raw = self.with_copy_number();
        let result = call_string(
            self.host(),
            "resolve reference node",
            &raw,
            Invocation::query(Command::ReferenceQuery)
                .flag("referenceNode", true)
                .arg(raw.as_str()),
        );
        match result {
            Ok(name) if !name.is_empty() => Some(BackingHandle::new(name)),
            Ok(_) => None,
            Err(err) => {
                tracing::debug!(reference = %raw, error = %err, "no backing reference node");
                None
            }
        }
    }

    fn require_handle(&self) -> Result<BackingHandle> {
        self.backing_handle()
            .ok_or_else(|| SceneError::StaleReference {
                path: self.with_copy_number(),
            })
    }

    // ------------------------------------------------------------------
    // State changes
    // ------------------------------------------------------------------

    fn path_action(&self, operation: &'static str, flag: &str, value: bool) -> Result<()> {
        let raw = self.with_copy_number();
        call(
            self.host(),
            operation,
            &raw,
            Invocation::new(Command::File).flag(flag, value).arg(raw.as_str()),
        )?;
        tracing::debug!(reference = %raw, operation, "reference updated");
        Ok(())
    }

    /// Merge the reference's contents into the scene. The node is stale
    /// afterwards.
    pub fn import_contents(&self) -> Result<()> {
        self.path_action("import reference", "importReference", true)?;
        self.invalidate();
        Ok(())
    }

    /// Remove the reference from the scene. The node is stale afterwards.
    pub fn remove(&self) -> Result<()> {
        self.path_action("remove reference", "removeReference", true)?;
        self.invalidate();
        Ok(())
    }

    /// Load the reference, optionally re-targeting it at `replacement` first.
    ///
    /// The host addresses loads by reference node, and may hand back a new
    /// copy-number-qualified path; the node's identity follows it.
    pub fn load(&mut self, replacement: Option<&str>) -> Result<()> {
        let handle = self.require_handle()?;
        let mut invocation =
            Invocation::new(Command::File).flag("loadReference", handle.as_str());
        if let Some(path) = replacement.filter(|p| !p.is_empty()) {
            invocation = invocation.arg(path);
        }
        let loaded = call_string(self.host(), "load reference", handle.as_str(), invocation)?;
        if !loaded.is_empty() {
            self.identity = ReferenceIdentity::parse(&loaded);
        }
        self.invalidate();
        tracing::debug!(reference = %self.identity, "reference loaded");
        Ok(())
    }

    pub fn unload(&self) -> Result<()> {
        self.path_action("unload reference", "unloadReference", true)?;
        self.invalidate();
        Ok(())
    }

    pub fn lock(&self) -> Result<()> {
        self.path_action("lock reference", "lockReference", true)
    }

    pub fn unlock(&self) -> Result<()> {
        self.path_action("unlock reference", "lockReference", false)
    }

    /// Drop the reference's recorded edits (host-side repair).
    pub fn clean(&self) -> Result<()> {
        let handle = self.require_handle()?;
        call(
            self.host(),
            "clean reference",
            handle.as_str(),
            Invocation::new(Command::File).flag("cleanReference", handle.as_str()),
        )?;
        Ok(())
    }

    pub fn select_all(&self) -> Result<()> {
        self.path_action("select reference contents", "selectAll", true)
    }

    // ------------------------------------------------------------------
    // State queries
    // ------------------------------------------------------------------

    fn path_query(&self, operation: &'static str, flag: &str) -> Result<bool> {
        let raw = self.with_copy_number();
        call_bool(
            self.host(),
            operation,
            &raw,
            Invocation::query(Command::File).flag(flag, true).arg(raw.as_str()),
        )
    }

    pub fn is_deferred(&self) -> Result<bool> {
        self.path_query("query deferred", "deferReference")
    }

    pub fn is_loaded(&self) -> Result<bool> {
        self.is_deferred().map(|deferred| !deferred)
    }

    pub fn is_locked(&self) -> Result<bool> {
        self.path_query("query locked", "lockReference")
    }

    /// Scene nodes contributed by this reference.
    pub fn nodes(&self) -> Result<Vec<String>> {
        let raw = self.with_copy_number();
        call_list(
            self.host(),
            "list reference nodes",
            &raw,
            Invocation::query(Command::ReferenceQuery)
                .flag("nodes", true)
                .flag("dagPath", true)
                .arg(raw.as_str()),
        )
    }

    /// Copy numbers of every load of this reference's file; the first load
    /// has none.
    pub fn copy_number_list(&self) -> Result<Vec<Option<u32>>> {
        let raws = call_list(
            self.host(),
            "list copy numbers",
            self.path().as_str(),
            Invocation::query(Command::File)
                .flag("copyNumberList", true)
                .arg(self.path().as_str()),
        )?;
        Ok(raws
            .iter()
            .map(|raw| ReferenceIdentity::parse(raw).copy_number())
            .collect())
    }

    // ------------------------------------------------------------------
    // Nesting
    // ------------------------------------------------------------------

    /// Raw paths of the references nested directly inside this one.
    pub(crate) fn child_paths(&self) -> Vec<String> {
        let raw = self.with_copy_number();
        enumerate(
            self.host(),
            "list sub-references",
            &raw,
            Invocation::query(Command::File)
                .flag("reference", true)
                .arg(raw.as_str()),
        )
    }

    pub(crate) fn child(&self, raw: &str) -> ReferenceNode {
        ReferenceNode::from_raw(Arc::clone(&self.host), self.config, raw)
    }

    /// Direct sub-references keyed `"<this namespace>:<child namespace>"`.
    /// Host failures yield an empty graph.
    pub fn sub_references(&self) -> ReferenceGraph {
        let mut graph = ReferenceGraph::new(self.config.namespace_collision);
        match self.namespace() {
            Ok(prefix) => absorb_children(&mut graph, self, &prefix, 1),
            Err(err) => {
                tracing::debug!(reference = %self.identity, error = %err, "sub-references unavailable");
            }
        }
        graph
    }

    // ------------------------------------------------------------------
    // Animation export
    // ------------------------------------------------------------------

    fn export_from_reference(
        &self,
        operation: &'static str,
        flag: &str,
        path: &str,
        options: &FileOptions,
    ) -> Result<PathHandle> {
        let handle = self.require_handle()?;
        let invocation = Invocation::new(Command::File)
            .flag(flag, true)
            .flag("referenceNode", handle.as_str())
            .arg(path);
        let invocation = options.apply(invocation, path, true);
        let written = call_string(self.host(), operation, path, invocation)?;
        Ok(if written.is_empty() {
            PathHandle::new(path)
        } else {
            PathHandle::new(written)
        })
    }

    /// Export the animation of this reference's nodes.
    pub fn export_anim(&self, path: &str, options: &FileOptions) -> Result<PathHandle> {
        self.export_from_reference("export reference animation", "exportAnimFromReference", path, options)
    }

    /// Export the animation of the selected nodes belonging to this reference.
    pub fn export_selected_anim(&self, path: &str, options: &FileOptions) -> Result<PathHandle> {
        self.export_from_reference(
            "export selected reference animation",
            "exportSelectedAnimFromReference",
            path,
            options,
        )
    }
}

impl Clone for ReferenceNode {
    fn clone(&self) -> Self {
        Self {
            host: Arc::clone(&self.host),
            config: self.config,
            identity: self.identity.clone(),
            handle: Mutex::new(self.handle.lock().clone()),
        }
    }
}

impl fmt::Debug for ReferenceNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReferenceNode")
            .field("identity", &self.identity)
            .field("handle", &*self.handle.lock())
            .finish()
    }
}

impl fmt::Display for ReferenceNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.identity)
    }
}

/// Two nodes are equal when they address the same reference.
impl PartialEq for ReferenceNode {
    fn eq(&self, other: &Self) -> bool {
        self.identity == other.identity
    }
}

impl Eq for ReferenceNode {}
