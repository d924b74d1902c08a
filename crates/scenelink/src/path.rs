//! Filesystem paths as the host hands them out.
//!
//! [`PathHandle`] is a plain string value: comparison and hashing follow the
//! string, and any case/separator normalization is left to the host. The few
//! queries that need the host (writability, scene file type) take it as an
//! argument.

use crate::call::{call_bool, call_string};
use crate::error::Result;
use scenelink_host::{Command, HostCommand, Invocation};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Host tag for the ASCII scene format.
pub const ASCII_SCENE_TAG: &str = "mayaAscii";
/// Host tag for the binary scene format.
pub const BINARY_SCENE_TAG: &str = "mayaBinary";

#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PathHandle(String);

impl PathHandle {
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn as_path(&self) -> &Path {
        Path::new(&self.0)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Extension without the leading dot.
    pub fn extension(&self) -> Option<&str> {
        self.as_path().extension().and_then(|e| e.to_str())
    }

    pub fn file_name(&self) -> Option<&str> {
        self.as_path().file_name().and_then(|n| n.to_str())
    }

    pub fn stem(&self) -> Option<&str> {
        self.as_path().file_stem().and_then(|s| s.to_str())
    }

    pub fn parent(&self) -> Option<PathHandle> {
        self.as_path()
            .parent()
            .map(|p| PathHandle::new(p.to_string_lossy().into_owned()))
    }

    pub fn join(&self, part: impl AsRef<Path>) -> PathHandle {
        let joined: PathBuf = self.as_path().join(part);
        PathHandle::new(joined.to_string_lossy().into_owned())
    }

    pub fn into_string(self) -> String {
        self.0
    }

    pub fn is_writable(&self, host: &dyn HostCommand) -> Result<bool> {
        call_bool(
            host,
            "query writable",
            &self.0,
            Invocation::query(Command::File)
                .flag("writable", true)
                .arg(self.0.as_str()),
        )
    }

    /// Scene file type as reported by the host; `None` when it has no opinion.
    pub fn file_type(&self, host: &dyn HostCommand) -> Result<Option<FileType>> {
        let tag = call_string(
            host,
            "query file type",
            &self.0,
            Invocation::query(Command::File)
                .flag("type", true)
                .arg(self.0.as_str()),
        )?;
        Ok((!tag.is_empty()).then(|| FileType::from(tag)))
    }

    pub fn sub_type(&self, host: &dyn HostCommand) -> Result<Option<String>> {
        let sub = call_string(
            host,
            "query file subtype",
            &self.0,
            Invocation::query(Command::File)
                .flag("subType", true)
                .arg(self.0.as_str()),
        )?;
        Ok((!sub.is_empty()).then_some(sub))
    }
}

impl fmt::Display for PathHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<Path> for PathHandle {
    fn as_ref(&self) -> &Path {
        self.as_path()
    }
}

impl AsRef<str> for PathHandle {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for PathHandle {
    fn from(value: &str) -> Self {
        PathHandle::new(value)
    }
}

impl From<String> for PathHandle {
    fn from(value: String) -> Self {
        PathHandle(value)
    }
}

impl PartialEq<str> for PathHandle {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for PathHandle {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

// ============================================================================
// File types
// ============================================================================

/// Scene file format tag passed through the host's `type` flag.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FileType {
    MayaAscii,
    MayaBinary,
    Other(String),
}

impl FileType {
    pub fn tag(&self) -> &str {
        match self {
            FileType::MayaAscii => ASCII_SCENE_TAG,
            FileType::MayaBinary => BINARY_SCENE_TAG,
            FileType::Other(tag) => tag,
        }
    }

    /// `.ma` and `.mb` map to the scene formats; anything else is left for
    /// the host to decide.
    pub fn infer(path: impl AsRef<Path>) -> Option<FileType> {
        match path.as_ref().extension().and_then(|e| e.to_str()) {
            Some("ma") => Some(FileType::MayaAscii),
            Some("mb") => Some(FileType::MayaBinary),
            _ => None,
        }
    }
}

impl From<String> for FileType {
    fn from(tag: String) -> Self {
        match tag.as_str() {
            ASCII_SCENE_TAG => FileType::MayaAscii,
            BINARY_SCENE_TAG => FileType::MayaBinary,
            _ => FileType::Other(tag),
        }
    }
}

impl From<FileType> for String {
    fn from(value: FileType) -> Self {
        value.tag().to_string()
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}
