//! scenelink host boundary
//!
//! Every scene query or edit made by `scenelink` funnels through a single
//! primitive: [`HostCommand::invoke`]. An [`Invocation`] names one of the
//! host's commands (`file`, `workspace`, `fileInfo`, `referenceQuery`,
//! `namespace`), a mode (action / query / edit), positional arguments and an
//! ordered list of named flags. The host answers with a loosely shaped
//! [`HostValue`]:
//!
//! ```text
//! ┌──────────────┐   Invocation    ┌────────────────────┐
//! │  scenelink   │────────────────►│   HostCommand      │
//! │  (facade)    │◄────────────────│  (host app / sim)  │
//! └──────────────┘ HostValue|Error └────────────────────┘
//! ```
//!
//! The crate also ships [`SimulatedHost`], an in-memory scene that honours the
//! same contract. It backs the test suites and the `scenelink` CLI.

pub mod simulated;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

pub use simulated::{
    FileRecord, ProjectRules, ReferenceRecord, SceneSnapshot, SimulatedHost, SnapshotError,
    WorkspaceState, WriteRecord,
};

// ============================================================================
// Invocation
// ============================================================================

/// The host commands the facade talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Command {
    File,
    Workspace,
    FileInfo,
    ReferenceQuery,
    Namespace,
}

impl Command {
    pub fn as_str(self) -> &'static str {
        match self {
            Command::File => "file",
            Command::Workspace => "workspace",
            Command::FileInfo => "fileInfo",
            Command::ReferenceQuery => "referenceQuery",
            Command::Namespace => "namespace",
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Query / edit / action selection. Action is the host default (no `-q`/`-e`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    #[default]
    Action,
    Query,
    Edit,
}

/// Value carried by a named flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FlagValue {
    Bool(bool),
    Int(i64),
    Str(String),
    Pair(String, String),
}

impl FlagValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FlagValue::Bool(b) => Some(*b),
            FlagValue::Int(i) => Some(*i != 0),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FlagValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_pair(&self) -> Option<(&str, &str)> {
        match self {
            FlagValue::Pair(k, v) => Some((k, v)),
            _ => None,
        }
    }
}

impl From<bool> for FlagValue {
    fn from(value: bool) -> Self {
        FlagValue::Bool(value)
    }
}

impl From<i64> for FlagValue {
    fn from(value: i64) -> Self {
        FlagValue::Int(value)
    }
}

impl From<&str> for FlagValue {
    fn from(value: &str) -> Self {
        FlagValue::Str(value.to_string())
    }
}

impl From<String> for FlagValue {
    fn from(value: String) -> Self {
        FlagValue::Str(value)
    }
}

impl From<(String, String)> for FlagValue {
    fn from((k, v): (String, String)) -> Self {
        FlagValue::Pair(k, v)
    }
}

impl fmt::Display for FlagValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlagValue::Bool(b) => write!(f, "{}", *b as u8),
            FlagValue::Int(i) => write!(f, "{i}"),
            FlagValue::Str(s) => write!(f, "\"{s}\""),
            FlagValue::Pair(k, v) => write!(f, "\"{k}\" \"{v}\""),
        }
    }
}

/// One call into the host command layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invocation {
    pub command: Command,
    pub mode: Mode,
    pub args: Vec<String>,
    pub flags: Vec<(String, FlagValue)>,
}

impl Invocation {
    pub fn new(command: Command) -> Self {
        Self {
            command,
            mode: Mode::Action,
            args: Vec::new(),
            flags: Vec::new(),
        }
    }

    pub fn query(command: Command) -> Self {
        Self {
            mode: Mode::Query,
            ..Self::new(command)
        }
    }

    pub fn edit(command: Command) -> Self {
        Self {
            mode: Mode::Edit,
            ..Self::new(command)
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn flag(mut self, name: &str, value: impl Into<FlagValue>) -> Self {
        self.flags.push((name.to_string(), value.into()));
        self
    }

    /// Last value given for `name` (later flags override earlier ones).
    pub fn flag_value(&self, name: &str) -> Option<&FlagValue> {
        self.flags
            .iter()
            .rev()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    pub fn has_flag(&self, name: &str) -> bool {
        self.flag_value(name).is_some()
    }

    pub fn first_arg(&self) -> Option<&str> {
        self.args.first().map(String::as_str)
    }

    pub fn is_query(&self) -> bool {
        self.mode == Mode::Query
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.command)?;
        match self.mode {
            Mode::Query => write!(f, " -q")?,
            Mode::Edit => write!(f, " -e")?,
            Mode::Action => {}
        }
        for (name, value) in &self.flags {
            match value {
                FlagValue::Bool(true) if self.mode == Mode::Query => write!(f, " -{name}")?,
                _ => write!(f, " -{name} {value}")?,
            }
        }
        for arg in &self.args {
            write!(f, " \"{arg}\"")?;
        }
        Ok(())
    }
}

// ============================================================================
// Results
// ============================================================================

/// Shape-polymorphic host answer: scalar, flat list, or nothing.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HostValue {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Str(String),
    List(Vec<String>),
}

impl HostValue {
    pub fn is_null(&self) -> bool {
        matches!(self, HostValue::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            HostValue::Bool(b) => Some(*b),
            HostValue::Int(i) => Some(*i != 0),
            _ => None,
        }
    }

    pub fn into_string(self) -> Option<String> {
        match self {
            HostValue::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Lists come back as-is; `Null` is the host's empty list and a lone
    /// string is a one-element list.
    pub fn into_list(self) -> Option<Vec<String>> {
        match self {
            HostValue::Null => Some(Vec::new()),
            HostValue::Str(s) => Some(vec![s]),
            HostValue::List(items) => Some(items),
            HostValue::Bool(_) | HostValue::Int(_) => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            HostValue::Null => "null",
            HostValue::Bool(_) => "bool",
            HostValue::Int(_) => "int",
            HostValue::Str(_) => "string",
            HostValue::List(_) => "list",
        }
    }
}

/// Fold a flat alternating `[k0, v0, k1, v1, ...]` list into pairs.
///
/// A dangling trailing key has no value and is dropped.
pub fn alternating_pairs(flat: Vec<String>) -> Vec<(String, String)> {
    let mut out = Vec::with_capacity(flat.len() / 2);
    let mut iter = flat.into_iter();
    while let (Some(k), Some(v)) = (iter.next(), iter.next()) {
        out.push((k, v));
    }
    out
}

// ============================================================================
// Errors + trait
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HostError {
    #[error("{command}: {message}")]
    Failed { command: Command, message: String },
    #[error("{command}: unsupported invocation `{invocation}`")]
    Unsupported { command: Command, invocation: String },
}

impl HostError {
    pub fn failed(command: Command, message: impl Into<String>) -> Self {
        HostError::Failed {
            command,
            message: message.into(),
        }
    }

    pub fn unsupported(call: &Invocation) -> Self {
        HostError::Unsupported {
            command: call.command,
            invocation: call.to_string(),
        }
    }
}

/// The single primitive the facade calls to query or mutate scene state.
pub trait HostCommand: Send + Sync {
    fn invoke(&self, call: &Invocation) -> Result<HostValue, HostError>;
}

impl<T: HostCommand + ?Sized> HostCommand for Arc<T> {
    fn invoke(&self, call: &Invocation) -> Result<HostValue, HostError> {
        (**self).invoke(call)
    }
}

impl<T: HostCommand + ?Sized> HostCommand for &T {
    fn invoke(&self, call: &Invocation) -> Result<HostValue, HostError> {
        (**self).invoke(call)
    }
}
