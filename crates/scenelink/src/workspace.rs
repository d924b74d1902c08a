//! Project (workspace) configuration.
//!
//! The active project carries four rule tables. Each [`WorkspaceEntries`]
//! value is a live view of one of them: every read and write is a single
//! host call and nothing is cached, so switching projects with
//! [`WorkspaceView::open`] or [`WorkspaceView::new_project`] changes what
//! existing views resolve against.

use crate::call::{call, call_list, call_string};
use crate::error::{Result, SceneError};
use crate::path::PathHandle;
use scenelink_host::{alternating_pairs, Command, HostCommand, Invocation};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    ObjectTypes,
    FileRules,
    RenderTypes,
    Variables,
}

impl EntryKind {
    pub const ALL: [EntryKind; 4] = [
        EntryKind::ObjectTypes,
        EntryKind::FileRules,
        EntryKind::RenderTypes,
        EntryKind::Variables,
    ];

    /// Host flag stem for this table.
    pub fn flag(self) -> &'static str {
        match self {
            EntryKind::ObjectTypes => "objectType",
            EntryKind::FileRules => "fileRule",
            EntryKind::RenderTypes => "renderType",
            EntryKind::Variables => "variable",
        }
    }

    fn label(self) -> &'static str {
        match self {
            EntryKind::ObjectTypes => "object type rule",
            EntryKind::FileRules => "file rule",
            EntryKind::RenderTypes => "render type rule",
            EntryKind::Variables => "workspace variable",
        }
    }
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            EntryKind::ObjectTypes => "object-types",
            EntryKind::FileRules => "file-rules",
            EntryKind::RenderTypes => "render-types",
            EntryKind::Variables => "variables",
        })
    }
}

impl FromStr for EntryKind {
    type Err = SceneError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "object-types" | "objectType" | "object_types" => Ok(EntryKind::ObjectTypes),
            "file-rules" | "fileRule" | "file_rules" => Ok(EntryKind::FileRules),
            "render-types" | "renderType" | "render_types" => Ok(EntryKind::RenderTypes),
            "variables" | "variable" => Ok(EntryKind::Variables),
            other => Err(SceneError::InvalidArgument(format!(
                "unknown workspace table '{other}'"
            ))),
        }
    }
}

/// One rule table of the active project.
#[derive(Clone)]
pub struct WorkspaceEntries {
    host: Arc<dyn HostCommand>,
    kind: EntryKind,
}

impl WorkspaceEntries {
    pub(crate) fn new(host: Arc<dyn HostCommand>, kind: EntryKind) -> Self {
        Self { host, kind }
    }

    pub fn kind(&self) -> EntryKind {
        self.kind
    }

    /// Value for `name`. The host answers an empty string both for unknown
    /// names and for entries set to `""`; the key listing tells them apart.
    pub fn get(&self, name: &str) -> Result<String> {
        let value = call_string(
            self.host.as_ref(),
            "read workspace entry",
            name,
            Invocation::query(Command::Workspace)
                .flag(&format!("{}Entry", self.kind.flag()), true)
                .arg(name),
        )?;
        if value.is_empty() && !self.contains(name)? {
            return Err(SceneError::not_found(self.kind.label(), name));
        }
        Ok(value)
    }

    pub fn get_or(&self, name: &str, default: &str) -> Result<String> {
        match self.get(name) {
            Err(err) if err.is_not_found() => Ok(default.to_string()),
            other => other,
        }
    }

    pub fn set(&self, name: &str, value: &str) -> Result<()> {
        call(
            self.host.as_ref(),
            "write workspace entry",
            name,
            Invocation::new(Command::Workspace)
                .flag(self.kind.flag(), (name.to_string(), value.to_string())),
        )?;
        tracing::debug!(table = %self.kind, name, value, "workspace entry written");
        Ok(())
    }

    pub fn contains(&self, name: &str) -> Result<bool> {
        Ok(self.keys()?.iter().any(|k| k == name))
    }

    pub fn keys(&self) -> Result<Vec<String>> {
        call_list(
            self.host.as_ref(),
            "list workspace entries",
            self.kind.flag(),
            Invocation::query(Command::Workspace).flag(&format!("{}List", self.kind.flag()), true),
        )
    }

    pub fn items(&self) -> Result<Vec<(String, String)>> {
        let flat = call_list(
            self.host.as_ref(),
            "read workspace table",
            self.kind.flag(),
            Invocation::query(Command::Workspace).flag(self.kind.flag(), true),
        )?;
        Ok(alternating_pairs(flat))
    }

    pub fn values(&self) -> Result<Vec<String>> {
        Ok(self.items()?.into_iter().map(|(_, v)| v).collect())
    }
}

impl fmt::Debug for WorkspaceEntries {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkspaceEntries").field("kind", &self.kind).finish()
    }
}

/// The host's active project and its rule tables.
#[derive(Clone)]
pub struct WorkspaceView {
    host: Arc<dyn HostCommand>,
}

impl WorkspaceView {
    pub(crate) fn new(host: Arc<dyn HostCommand>) -> Self {
        Self { host }
    }

    pub fn entries(&self, kind: EntryKind) -> WorkspaceEntries {
        WorkspaceEntries::new(Arc::clone(&self.host), kind)
    }

    pub fn object_types(&self) -> WorkspaceEntries {
        self.entries(EntryKind::ObjectTypes)
    }

    pub fn file_rules(&self) -> WorkspaceEntries {
        self.entries(EntryKind::FileRules)
    }

    pub fn render_types(&self) -> WorkspaceEntries {
        self.entries(EntryKind::RenderTypes)
    }

    pub fn variables(&self) -> WorkspaceEntries {
        self.entries(EntryKind::Variables)
    }

    fn project_call(&self, operation: &'static str, target: &str, invocation: Invocation) -> Result<()> {
        call(self.host.as_ref(), operation, target, invocation)?;
        tracing::debug!(operation, target, "workspace updated");
        Ok(())
    }

    /// Make the project `name` active.
    pub fn open(&self, name: &str) -> Result<()> {
        self.project_call(
            "open workspace",
            name,
            Invocation::new(Command::Workspace).flag("openWorkspace", true).arg(name),
        )
    }

    /// Create the project `name` and make it active.
    pub fn new_project(&self, name: &str) -> Result<()> {
        self.project_call(
            "create workspace",
            name,
            Invocation::new(Command::Workspace).flag("newWorkspace", true).arg(name),
        )
    }

    pub fn save(&self) -> Result<()> {
        self.project_call(
            "save workspace",
            "<active>",
            Invocation::new(Command::Workspace).flag("saveWorkspace", true),
        )
    }

    /// Re-read the active project's definition.
    pub fn update(&self) -> Result<()> {
        self.project_call(
            "update workspace",
            "<active>",
            Invocation::new(Command::Workspace).flag("update", true),
        )
    }

    pub fn name(&self) -> Result<String> {
        call_string(
            self.host.as_ref(),
            "query active workspace",
            "<active>",
            Invocation::query(Command::Workspace).flag("active", true),
        )
    }

    /// Root directory of the active project.
    pub fn path(&self) -> Result<PathHandle> {
        call_string(
            self.host.as_ref(),
            "query workspace root",
            "<active>",
            Invocation::query(Command::Workspace).flag("fullName", true),
        )
        .map(PathHandle::new)
    }

    pub fn getcwd(&self) -> Result<PathHandle> {
        call_string(
            self.host.as_ref(),
            "query workspace directory",
            "<active>",
            Invocation::query(Command::Workspace).flag("directory", true),
        )
        .map(PathHandle::new)
    }

    pub fn chdir(&self, dir: &str) -> Result<()> {
        self.project_call(
            "change workspace directory",
            dir,
            Invocation::new(Command::Workspace).flag("directory", dir),
        )
    }

    pub fn mkdir(&self, dir: &str) -> Result<()> {
        self.project_call(
            "create workspace directory",
            dir,
            Invocation::new(Command::Workspace).flag("create", dir),
        )
    }
}

impl fmt::Debug for WorkspaceView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkspaceView").finish_non_exhaustive()
    }
}
