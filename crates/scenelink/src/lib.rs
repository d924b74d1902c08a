//! scenelink: typed facade over a host scene/file command
//!
//! Everything here is a thin, typed layer over [`HostCommand::invoke`]. The
//! core is the reference model:
//!
//! ```text
//!   raw path "rig.ma{2}"
//!          │ ReferenceIdentity::parse
//!          ▼
//!   (rig.ma, Some(2)) ──► ReferenceNode ──► namespace / load / lock (live)
//!                              │
//!                              ▼ sub_references()
//!   ReferenceGraph { "charA": …, "charA:sword": …, "charB": … }
//! ```
//!
//! Around it sit the workspace rule tables ([`WorkspaceView`]), per-scene
//! metadata ([`MetadataStore`]), the file command table ([`FILE_OPERATIONS`])
//! and the open file's flags ([`CurrentFile`]). A [`Session`] owns the host
//! handle and [`SessionConfig`] and hands all of them out.
//!
//! ## Failure model
//!
//! - Enumerations (`list_references`, `list_namespaces`, `sub_references`)
//!   treat host failure as "nothing there" and return empty collections.
//! - Everything else returns [`SceneError`].

mod call;
pub mod config;
pub mod error;
pub mod files;
pub mod graph;
pub mod identity;
pub mod metadata;
pub mod path;
pub mod reference;
pub mod session;
pub mod workspace;

#[cfg(test)]
mod tests;

pub use config::{CollisionPolicy, HandleCaching, SessionConfig};
pub use error::{Result, SceneError};
pub use files::{
    run_file_operation, CurrentFile, FileOperation, FileOptions, FileOutcome, PathArg, Produces,
    SceneFiles, FILE_OPERATIONS,
};
pub use graph::{list_namespaces, list_references, reference_list, ReferenceGraph};
pub use identity::ReferenceIdentity;
pub use metadata::MetadataStore;
pub use path::{FileType, PathHandle, ASCII_SCENE_TAG, BINARY_SCENE_TAG};
pub use reference::{BackingHandle, ReferenceNode, ReferenceSeed};
pub use scenelink_host::{HostCommand, HostError, HostValue, Invocation};
pub use session::Session;
pub use workspace::{EntryKind, WorkspaceEntries, WorkspaceView};
