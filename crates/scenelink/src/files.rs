//! Scene-level file commands.
//!
//! Every command the facade exposes (create a reference, the export family,
//! import, open, new, rename) is one row of [`FILE_OPERATIONS`]. A row names
//! the host flag, how the target path is passed, what the host hands back
//! and whether a missing file type is inferred from the extension;
//! [`run_file_operation`] executes any row. [`SceneFiles`] wraps the rows in
//! typed methods.

use crate::call::{call, call_bool, call_string};
use crate::config::SessionConfig;
use crate::error::{Result, SceneError};
use crate::path::{FileType, PathHandle};
use crate::reference::ReferenceNode;
use scenelink_host::{Command, HostCommand, Invocation};
use std::fmt;
use std::sync::Arc;

// ============================================================================
// Operation table
// ============================================================================

/// How an operation hands its target path to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathArg {
    /// No path.
    None,
    /// Positional argument with the flag set to `true`.
    Positional,
    /// The flag's own value.
    FlagValue,
}

/// What a successful operation yields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Produces {
    Nothing,
    Path,
    Reference,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileOperation {
    pub name: &'static str,
    pub flag: &'static str,
    pub path: PathArg,
    pub produces: Produces,
    pub infers_type: bool,
}

impl FileOperation {
    const fn new(name: &'static str, flag: &'static str, path: PathArg, produces: Produces, infers_type: bool) -> Self {
        Self {
            name,
            flag,
            path,
            produces,
            infers_type,
        }
    }

    pub fn find(name: &str) -> Result<&'static FileOperation> {
        FILE_OPERATIONS
            .iter()
            .find(|op| op.name == name)
            .ok_or_else(|| SceneError::InvalidArgument(format!("unknown file operation '{name}'")))
    }
}

pub const FILE_OPERATIONS: &[FileOperation] = &[
    FileOperation::new("createReference", "reference", PathArg::Positional, Produces::Reference, false),
    FileOperation::new("exportAll", "exportAll", PathArg::Positional, Produces::Path, true),
    FileOperation::new("exportSelected", "exportSelected", PathArg::Positional, Produces::Path, true),
    FileOperation::new("exportAnim", "exportAnim", PathArg::Positional, Produces::Path, true),
    FileOperation::new("exportSelectedAnim", "exportSelectedAnim", PathArg::Positional, Produces::Path, true),
    FileOperation::new("exportAsReference", "exportAsReference", PathArg::Positional, Produces::Reference, true),
    FileOperation::new("importFile", "i", PathArg::Positional, Produces::Nothing, false),
    FileOperation::new("newFile", "newFile", PathArg::None, Produces::Nothing, false),
    FileOperation::new("openFile", "open", PathArg::Positional, Produces::Path, false),
    FileOperation::new("renameFile", "rename", PathArg::FlagValue, Produces::Path, false),
];

// ============================================================================
// Options + outcome
// ============================================================================

/// Optional flags shared by the file commands.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileOptions {
    /// Explicit file type; when absent some operations infer one.
    pub file_type: Option<FileType>,
    pub force: bool,
    pub preserve_references: bool,
    /// Namespace for a reference the operation creates.
    pub namespace: Option<String>,
}

impl FileOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn file_type(mut self, file_type: FileType) -> Self {
        self.file_type = Some(file_type);
        self
    }

    pub fn force(mut self) -> Self {
        self.force = true;
        self
    }

    pub fn preserve_references(mut self) -> Self {
        self.preserve_references = true;
        self
    }

    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Type to pass for `path`: the explicit one, else the extension's when
    /// `infer` is set.
    pub fn resolved_type(&self, path: &str, infer: bool) -> Option<FileType> {
        self.file_type
            .clone()
            .or_else(|| if infer { FileType::infer(path) } else { None })
    }

    pub(crate) fn apply(&self, mut invocation: Invocation, path: &str, infer: bool) -> Invocation {
        if let Some(file_type) = self.resolved_type(path, infer) {
            invocation = invocation.flag("type", file_type.tag());
        }
        if self.force {
            invocation = invocation.flag("force", true);
        }
        if self.preserve_references {
            invocation = invocation.flag("preserveReferences", true);
        }
        if let Some(namespace) = self.namespace.as_deref().filter(|ns| !ns.is_empty()) {
            invocation = invocation.flag("namespace", namespace);
        }
        invocation
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FileOutcome {
    Done,
    Path(PathHandle),
    Reference(ReferenceNode),
}

impl FileOutcome {
    fn kind(&self) -> &'static str {
        match self {
            FileOutcome::Done => "null",
            FileOutcome::Path(_) => "path",
            FileOutcome::Reference(_) => "reference",
        }
    }

    pub fn into_path(self, operation: &'static str) -> Result<PathHandle> {
        match self {
            FileOutcome::Path(path) => Ok(path),
            other => Err(SceneError::UnexpectedResult {
                operation,
                found: other.kind(),
            }),
        }
    }

    pub fn into_reference(self, operation: &'static str) -> Result<ReferenceNode> {
        match self {
            FileOutcome::Reference(node) => Ok(node),
            other => Err(SceneError::UnexpectedResult {
                operation,
                found: other.kind(),
            }),
        }
    }
}

impl fmt::Display for FileOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileOutcome::Done => f.write_str("ok"),
            FileOutcome::Path(path) => write!(f, "{path}"),
            FileOutcome::Reference(node) => write!(f, "{node}"),
        }
    }
}

/// Run one row of [`FILE_OPERATIONS`] by name.
pub fn run_file_operation(
    host: &Arc<dyn HostCommand>,
    config: SessionConfig,
    name: &str,
    path: Option<&str>,
    options: &FileOptions,
) -> Result<FileOutcome> {
    let op = FileOperation::find(name)?;
    let target = path.unwrap_or_default();
    if op.path != PathArg::None && target.is_empty() {
        return Err(SceneError::InvalidArgument(format!("{} needs a path", op.name)));
    }

    let invocation = match op.path {
        PathArg::None => Invocation::new(Command::File).flag(op.flag, true),
        PathArg::Positional => Invocation::new(Command::File).flag(op.flag, true).arg(target),
        PathArg::FlagValue => Invocation::new(Command::File).flag(op.flag, target),
    };
    let invocation = options.apply(invocation, target, op.infers_type);

    let returned = call_string(host.as_ref(), op.name, target, invocation)?;
    tracing::debug!(operation = op.name, path = target, returned = %returned, "file operation done");
    Ok(match op.produces {
        Produces::Nothing => FileOutcome::Done,
        Produces::Path if returned.is_empty() => FileOutcome::Path(PathHandle::new(target)),
        Produces::Path => FileOutcome::Path(PathHandle::new(returned)),
        Produces::Reference if returned.is_empty() => {
            return Err(SceneError::UnexpectedResult {
                operation: op.name,
                found: "null",
            });
        }
        Produces::Reference => {
            FileOutcome::Reference(ReferenceNode::from_raw(Arc::clone(host), config, &returned))
        }
    })
}

// ============================================================================
// Typed wrappers
// ============================================================================

/// Typed entry points over [`FILE_OPERATIONS`].
#[derive(Clone)]
pub struct SceneFiles {
    host: Arc<dyn HostCommand>,
    config: SessionConfig,
}

impl SceneFiles {
    pub(crate) fn new(host: Arc<dyn HostCommand>, config: SessionConfig) -> Self {
        Self { host, config }
    }

    pub fn run(&self, name: &str, path: Option<&str>, options: &FileOptions) -> Result<FileOutcome> {
        run_file_operation(&self.host, self.config, name, path, options)
    }

    fn to_path(&self, name: &'static str, path: &str, options: &FileOptions) -> Result<PathHandle> {
        self.run(name, Some(path), options)?.into_path(name)
    }

    pub fn create_reference(&self, path: &str, options: &FileOptions) -> Result<ReferenceNode> {
        self.run("createReference", Some(path), options)?
            .into_reference("createReference")
    }

    pub fn export_all(&self, path: &str, options: &FileOptions) -> Result<PathHandle> {
        self.to_path("exportAll", path, options)
    }

    pub fn export_selected(&self, path: &str, options: &FileOptions) -> Result<PathHandle> {
        self.to_path("exportSelected", path, options)
    }

    pub fn export_anim(&self, path: &str, options: &FileOptions) -> Result<PathHandle> {
        self.to_path("exportAnim", path, options)
    }

    pub fn export_selected_anim(&self, path: &str, options: &FileOptions) -> Result<PathHandle> {
        self.to_path("exportSelectedAnim", path, options)
    }

    /// Export the selection and reference the written file in its place.
    pub fn export_as_reference(&self, path: &str, options: &FileOptions) -> Result<ReferenceNode> {
        self.run("exportAsReference", Some(path), options)?
            .into_reference("exportAsReference")
    }

    pub fn import_file(&self, path: &str, options: &FileOptions) -> Result<()> {
        self.run("importFile", Some(path), options).map(|_| ())
    }

    pub fn new_file(&self, options: &FileOptions) -> Result<()> {
        self.run("newFile", None, options).map(|_| ())
    }

    pub fn open_file(&self, path: &str, options: &FileOptions) -> Result<PathHandle> {
        self.to_path("openFile", path, options)
    }

    pub fn rename_file(&self, path: &str) -> Result<PathHandle> {
        self.to_path("renameFile", path, &FileOptions::default())
    }

    /// Rename the open scene to `path` and save it there.
    pub fn save_as(&self, path: &str, options: &FileOptions) -> Result<PathHandle> {
        self.rename_file(path)?;
        let invocation = options.apply(Invocation::new(Command::File).flag("save", true), path, true);
        let saved = call_string(self.host.as_ref(), "save scene", path, invocation)?;
        tracing::debug!(path, "scene saved");
        Ok(if saved.is_empty() {
            PathHandle::new(path)
        } else {
            PathHandle::new(saved)
        })
    }

    /// Path of the open scene; empty for an untitled scene.
    pub fn scene_name(&self) -> Result<PathHandle> {
        scene_name(self.host.as_ref())
    }

    pub fn current(&self) -> CurrentFile {
        CurrentFile::new(Arc::clone(&self.host))
    }
}

impl fmt::Debug for SceneFiles {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SceneFiles").field("config", &self.config).finish_non_exhaustive()
    }
}

fn scene_name(host: &dyn HostCommand) -> Result<PathHandle> {
    call_string(
        host,
        "query scene name",
        "<scene>",
        Invocation::query(Command::File).flag("sceneName", true),
    )
    .map(PathHandle::new)
}

// ============================================================================
// Current file
// ============================================================================

/// State flags of the open scene file.
#[derive(Clone)]
pub struct CurrentFile {
    host: Arc<dyn HostCommand>,
}

impl CurrentFile {
    pub(crate) fn new(host: Arc<dyn HostCommand>) -> Self {
        Self { host }
    }

    fn query(&self, operation: &'static str, flag: &str) -> Result<bool> {
        call_bool(
            self.host.as_ref(),
            operation,
            "<scene>",
            Invocation::query(Command::File).flag(flag, true),
        )
    }

    fn set(&self, operation: &'static str, flag: &str, on: bool) -> Result<()> {
        call(
            self.host.as_ref(),
            operation,
            "<scene>",
            Invocation::new(Command::File).flag(flag, on),
        )?;
        Ok(())
    }

    pub fn name(&self) -> Result<PathHandle> {
        scene_name(self.host.as_ref())
    }

    pub fn is_modified(&self) -> Result<bool> {
        self.query("query modified", "modified")
    }

    pub fn set_modified(&self, on: bool) -> Result<()> {
        self.set("set modified", "modified", on)
    }

    /// Whether the scene or any of its references carries unsaved changes.
    pub fn any_modified(&self) -> Result<bool> {
        self.query("query any modified", "anyModified")
    }

    pub fn rename_to_save(&self) -> Result<bool> {
        self.query("query rename to save", "renameToSave")
    }

    pub fn set_rename_to_save(&self, on: bool) -> Result<()> {
        self.set("set rename to save", "renameToSave", on)
    }

    pub fn is_locked(&self) -> Result<bool> {
        self.query("query file lock", "lockFile")
    }

    pub fn lock(&self) -> Result<()> {
        self.set("lock file", "lockFile", true)
    }

    pub fn unlock(&self) -> Result<()> {
        self.set("unlock file", "lockFile", false)
    }
}

impl fmt::Debug for CurrentFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CurrentFile").finish_non_exhaustive()
    }
}
