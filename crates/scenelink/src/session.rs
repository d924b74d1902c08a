//! Session context: one host handle plus configuration, handing out every
//! facade object.

use crate::config::SessionConfig;
use crate::error::Result;
use crate::files::{CurrentFile, FileOptions, FileOutcome, SceneFiles};
use crate::graph::{self, ReferenceGraph};
use crate::metadata::MetadataStore;
use crate::reference::{ReferenceNode, ReferenceSeed};
use crate::workspace::WorkspaceView;
use scenelink_host::HostCommand;
use std::fmt;
use std::sync::Arc;

#[derive(Clone)]
pub struct Session {
    host: Arc<dyn HostCommand>,
    config: SessionConfig,
}

impl Session {
    pub fn new(host: Arc<dyn HostCommand>) -> Self {
        Self::with_config(host, SessionConfig::default())
    }

    pub fn with_config(host: Arc<dyn HostCommand>, config: SessionConfig) -> Self {
        Self { host, config }
    }

    pub fn config(&self) -> SessionConfig {
        self.config
    }

    pub fn host(&self) -> &Arc<dyn HostCommand> {
        &self.host
    }

    /// Namespace → reference for the open scene; `recursive` adds nested
    /// references under `parent:child` keys.
    pub fn list_references(&self, recursive: bool) -> ReferenceGraph {
        graph::list_references(&self.host, self.config, recursive)
    }

    /// Top-level references in host order.
    pub fn reference_list(&self) -> Vec<ReferenceNode> {
        graph::reference_list(&self.host, self.config)
    }

    pub fn list_namespaces(&self) -> Vec<String> {
        graph::list_namespaces(&self.host, self.config)
    }

    pub fn reference(&self, seed: ReferenceSeed) -> Result<ReferenceNode> {
        ReferenceNode::resolve(Arc::clone(&self.host), self.config, seed)
    }

    pub fn reference_by_namespace(&self, namespace: &str) -> Result<ReferenceNode> {
        self.reference(ReferenceSeed::Namespace(namespace.to_string()))
    }

    pub fn workspace(&self) -> WorkspaceView {
        WorkspaceView::new(Arc::clone(&self.host))
    }

    pub fn file_info(&self) -> MetadataStore {
        MetadataStore::new(Arc::clone(&self.host))
    }

    pub fn files(&self) -> SceneFiles {
        SceneFiles::new(Arc::clone(&self.host), self.config)
    }

    pub fn current_file(&self) -> CurrentFile {
        CurrentFile::new(Arc::clone(&self.host))
    }

    /// Run a file operation by its table name.
    pub fn file_operation(&self, name: &str, path: Option<&str>, options: &FileOptions) -> Result<FileOutcome> {
        self.files().run(name, path, options)
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session").field("config", &self.config).finish_non_exhaustive()
    }
}
