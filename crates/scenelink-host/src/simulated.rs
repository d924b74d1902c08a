//! In-memory scene implementing the host command contract.
//!
//! `SimulatedHost` keeps a whole scene (references, workspace projects,
//! fileInfo block, current-file flags) in a [`SceneSnapshot`] behind a mutex
//! and answers [`Invocation`]s the way the real host does, including its
//! failure modes (unknown reference, namespace collision, read-only target).
//! Snapshots serialize to JSON so a scene can be saved, edited and reloaded.

use crate::{Command, FlagValue, HostCommand, HostError, HostValue, Invocation, Mode};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

const ENTRY_KINDS: [&str; 4] = ["objectType", "fileRule", "renderType", "variable"];

// ============================================================================
// Snapshot model
// ============================================================================

/// One reference as the host stores it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceRecord {
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub copy_number: Option<u32>,
    pub namespace: String,
    /// Name of the reference node in the scene (the backing handle).
    pub node: String,
    #[serde(default)]
    pub deferred: bool,
    #[serde(default)]
    pub locked: bool,
    /// Scene nodes contributed by this reference.
    #[serde(default)]
    pub nodes: Vec<String>,
    /// Reference edits recorded against this reference.
    #[serde(default)]
    pub edits: Vec<String>,
    #[serde(default)]
    pub children: Vec<ReferenceRecord>,
}

impl ReferenceRecord {
    pub fn new(path: &str, namespace: &str, node: &str) -> Self {
        Self {
            path: path.to_string(),
            copy_number: None,
            namespace: namespace.to_string(),
            node: node.to_string(),
            deferred: false,
            locked: false,
            nodes: Vec::new(),
            edits: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn with_copy_number(mut self, copy_number: u32) -> Self {
        self.copy_number = Some(copy_number);
        self
    }

    pub fn with_children(mut self, children: Vec<ReferenceRecord>) -> Self {
        self.children = children;
        self
    }

    pub fn with_nodes(mut self, nodes: &[&str]) -> Self {
        self.nodes = nodes.iter().map(|n| n.to_string()).collect();
        self
    }

    pub fn deferred(mut self) -> Self {
        self.deferred = true;
        self
    }

    /// Copy-number-qualified path, the form the host hands out.
    pub fn raw(&self) -> String {
        match self.copy_number {
            Some(n) => format!("{}{{{}}}", self.path, n),
            None => self.path.clone(),
        }
    }
}

/// Per-file facts answered by `file -q -writable/-type/-subType`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FileRecord {
    pub writable: bool,
    pub file_type: Option<String>,
    pub sub_type: Option<String>,
}

/// Log entry for anything the host wrote to disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteRecord {
    pub operation: String,
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_type: Option<String>,
    /// Reference node an animation export was sourced from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectRules {
    pub root: String,
    pub object_types: BTreeMap<String, String>,
    pub file_rules: BTreeMap<String, String>,
    pub render_types: BTreeMap<String, String>,
    pub variables: BTreeMap<String, String>,
    pub directories: Vec<String>,
    pub saved: bool,
}

impl ProjectRules {
    pub fn rooted(root: &str) -> Self {
        Self {
            root: root.to_string(),
            ..Default::default()
        }
    }

    fn entries(&self, kind: &str) -> Option<&BTreeMap<String, String>> {
        match kind {
            "objectType" => Some(&self.object_types),
            "fileRule" => Some(&self.file_rules),
            "renderType" => Some(&self.render_types),
            "variable" => Some(&self.variables),
            _ => None,
        }
    }

    fn entries_mut(&mut self, kind: &str) -> Option<&mut BTreeMap<String, String>> {
        match kind {
            "objectType" => Some(&mut self.object_types),
            "fileRule" => Some(&mut self.file_rules),
            "renderType" => Some(&mut self.render_types),
            "variable" => Some(&mut self.variables),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkspaceState {
    pub active: String,
    pub cwd: String,
    pub projects: BTreeMap<String, ProjectRules>,
}

impl Default for WorkspaceState {
    fn default() -> Self {
        let mut projects = BTreeMap::new();
        projects.insert("default".to_string(), ProjectRules::rooted("default"));
        Self {
            active: "default".to_string(),
            cwd: "default".to_string(),
            projects,
        }
    }
}

/// Everything the simulated host knows about its session.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneSnapshot {
    pub scene_name: Option<String>,
    pub modified: bool,
    pub rename_to_save: bool,
    pub file_locked: bool,
    pub references: Vec<ReferenceRecord>,
    pub scene_nodes: Vec<String>,
    pub selection: Vec<String>,
    pub file_info: Vec<(String, String)>,
    pub workspace: WorkspaceState,
    pub files: BTreeMap<String, FileRecord>,
    pub writes: Vec<WriteRecord>,
}

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("snapshot io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("snapshot json error: {0}")]
    Json(#[from] serde_json::Error),
}

// ============================================================================
// Host
// ============================================================================

/// A scene held in memory that answers host invocations.
#[derive(Debug, Default)]
pub struct SimulatedHost {
    state: Mutex<SceneSnapshot>,
    failures: Mutex<Vec<(Command, String)>>,
    calls: Mutex<Vec<Invocation>>,
}

impl SimulatedHost {
    pub fn new(snapshot: SceneSnapshot) -> Self {
        Self {
            state: Mutex::new(snapshot),
            failures: Mutex::new(Vec::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn from_json(text: &str) -> Result<Self, SnapshotError> {
        Ok(Self::new(serde_json::from_str(text)?))
    }

    pub fn load(path: &Path) -> Result<Self, SnapshotError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    pub fn save(&self, path: &Path) -> Result<(), SnapshotError> {
        let json = serde_json::to_string_pretty(&*self.state.lock())?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn snapshot(&self) -> SceneSnapshot {
        self.state.lock().clone()
    }

    /// Make every `command` invocation carrying `flag` fail until cleared.
    pub fn fail_on(&self, command: Command, flag: &str) {
        self.failures.lock().push((command, flag.to_string()));
    }

    pub fn clear_failures(&self) {
        self.failures.lock().clear();
    }

    /// Every invocation received so far, in order.
    pub fn calls(&self) -> Vec<Invocation> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self, command: Command, flag: &str) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|c| c.command == command && c.has_flag(flag))
            .count()
    }
}

impl HostCommand for SimulatedHost {
    fn invoke(&self, call: &Invocation) -> Result<HostValue, HostError> {
        self.calls.lock().push(call.clone());

        let injected = self
            .failures
            .lock()
            .iter()
            .any(|(command, flag)| *command == call.command && call.has_flag(flag));
        if injected {
            return Err(HostError::failed(call.command, format!("injected failure for `{call}`")));
        }

        let mut state = self.state.lock();
        let result = match call.command {
            Command::File => match call.mode {
                Mode::Query => state.file_query(call),
                Mode::Edit => state.file_edit(call),
                Mode::Action => state.file_action(call),
            },
            Command::ReferenceQuery => state.reference_query(call),
            Command::Namespace => state.namespace_cmd(call),
            Command::Workspace => state.workspace_cmd(call),
            Command::FileInfo => state.file_info_cmd(call),
        };
        if let Err(err) = &result {
            tracing::debug!(invocation = %call, error = %err, "simulated host call failed");
        }
        result
    }
}

// ============================================================================
// Command semantics
// ============================================================================

fn failed(message: impl Into<String>) -> HostError {
    HostError::failed(Command::File, message)
}

fn bool_flag(call: &Invocation, name: &str) -> Option<bool> {
    call.flag_value(name).and_then(FlagValue::as_bool)
}

fn str_flag<'a>(call: &'a Invocation, name: &str) -> Option<&'a str> {
    call.flag_value(name).and_then(FlagValue::as_str)
}

fn required_arg(call: &Invocation) -> Result<&str, HostError> {
    call.first_arg()
        .ok_or_else(|| HostError::failed(call.command, format!("`{call}` needs a target")))
}

fn type_from_extension(path: &str) -> Option<&'static str> {
    match Path::new(path).extension().and_then(|e| e.to_str()) {
        Some("ma") => Some("mayaAscii"),
        Some("mb") => Some("mayaBinary"),
        _ => None,
    }
}

fn stem_of(path: &str) -> String {
    Path::new(path)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("ref")
        .to_string()
}

fn index_path(list: &[ReferenceRecord], pred: &dyn Fn(&ReferenceRecord) -> bool) -> Option<Vec<usize>> {
    for (i, record) in list.iter().enumerate() {
        if pred(record) {
            return Some(vec![i]);
        }
        if let Some(mut rest) = index_path(&record.children, pred) {
            rest.insert(0, i);
            return Some(rest);
        }
    }
    None
}

fn qualified_namespaces(list: &[ReferenceRecord], prefix: &str, out: &mut Vec<String>) {
    for record in list {
        let name = if prefix.is_empty() {
            record.namespace.clone()
        } else {
            format!("{prefix}:{}", record.namespace)
        };
        qualified_namespaces(&record.children, &name, out);
        out.push(name);
    }
}

impl SceneSnapshot {
    fn list_at_mut(&mut self, parent: &[usize]) -> &mut Vec<ReferenceRecord> {
        let mut list = &mut self.references;
        for &i in parent {
            list = &mut list[i].children;
        }
        list
    }

    fn locate(&self, target: &str) -> Result<Vec<usize>, HostError> {
        index_path(&self.references, &|r: &ReferenceRecord| r.raw() == target)
            .ok_or_else(|| failed(format!("'{target}' is not a reference in the scene")))
    }

    fn locate_node(&self, node: &str) -> Result<Vec<usize>, HostError> {
        index_path(&self.references, &|r: &ReferenceRecord| r.node == node).ok_or_else(|| {
            HostError::failed(Command::ReferenceQuery, format!("'{node}' is not a reference node"))
        })
    }

    fn record(&self, path: &[usize]) -> &ReferenceRecord {
        let mut list = &self.references;
        let (last, parent) = path.split_last().expect("index path is never empty");
        for &i in parent {
            list = &list[i].children;
        }
        &list[*last]
    }

    fn record_mut(&mut self, path: &[usize]) -> &mut ReferenceRecord {
        let (last, parent) = path.split_last().expect("index path is never empty");
        &mut self.list_at_mut(parent)[*last]
    }

    fn take_record(&mut self, path: &[usize]) -> ReferenceRecord {
        let (last, parent) = path.split_last().expect("index path is never empty");
        self.list_at_mut(parent).remove(*last)
    }

    /// Every reference at every nesting level, depth first.
    fn flattened(&self) -> Vec<&ReferenceRecord> {
        fn walk<'a>(list: &'a [ReferenceRecord], out: &mut Vec<&'a ReferenceRecord>) {
            for record in list {
                out.push(record);
                walk(&record.children, out);
            }
        }
        let mut out = Vec::new();
        walk(&self.references, &mut out);
        out
    }

    /// Copy numbers are unique per file across the whole reference tree.
    fn next_copy_number(&self, path: &str, skip: Option<&str>) -> Option<u32> {
        let loads: Vec<Option<u32>> = self
            .flattened()
            .into_iter()
            .filter(|r| r.path == path && Some(r.node.as_str()) != skip)
            .map(|r| r.copy_number)
            .collect();
        if loads.is_empty() {
            return None;
        }
        Some(loads.iter().map(|c| c.unwrap_or(0)).max().unwrap_or(0) + 1)
    }

    fn unique_namespace(&self, wanted: &str) -> String {
        let taken = |ns: &str| self.references.iter().any(|r| r.namespace == ns);
        if !taken(wanted) {
            return wanted.to_string();
        }
        (1..)
            .map(|i| format!("{wanted}{i}"))
            .find(|candidate| !taken(candidate))
            .unwrap_or_else(|| wanted.to_string())
    }

    fn unique_node(&self, namespace: &str) -> String {
        let nodes: Vec<String> = self.flattened().iter().map(|r| r.node.clone()).collect();
        let base = format!("{namespace}RN");
        if !nodes.contains(&base) {
            return base;
        }
        (1..)
            .map(|i| format!("{base}{i}"))
            .find(|candidate| !nodes.contains(candidate))
            .unwrap_or(base)
    }

    fn add_reference(&mut self, path: &str, namespace: Option<&str>) -> String {
        let wanted = namespace
            .filter(|ns| !ns.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| stem_of(path));
        let namespace = self.unique_namespace(&wanted);
        let node = self.unique_node(&namespace);
        let mut record = ReferenceRecord::new(path, &namespace, &node);
        record.copy_number = self.next_copy_number(path, None);
        let raw = record.raw();
        self.references.push(record);
        self.modified = true;
        raw
    }

    fn guard_writable(&self, path: &str, call: &Invocation) -> Result<(), HostError> {
        let read_only = self.files.get(path).map_or(false, |f| !f.writable);
        if read_only && !bool_flag(call, "force").unwrap_or(false) {
            return Err(failed(format!("'{path}' is read-only")));
        }
        Ok(())
    }

    fn record_write(&mut self, operation: &str, path: &str, file_type: Option<&str>, source: Option<&str>) {
        self.writes.push(WriteRecord {
            operation: operation.to_string(),
            path: path.to_string(),
            file_type: file_type.map(str::to_string),
            source: source.map(str::to_string),
        });
        let entry = self.files.entry(path.to_string()).or_insert(FileRecord {
            writable: true,
            ..Default::default()
        });
        if let Some(t) = file_type {
            entry.file_type = Some(t.to_string());
        }
    }

    fn reset_scene(&mut self, call: &Invocation) -> Result<(), HostError> {
        if self.modified && !bool_flag(call, "force").unwrap_or(false) {
            return Err(failed("current scene has unsaved changes"));
        }
        self.references.clear();
        self.scene_nodes.clear();
        self.selection.clear();
        self.file_info.clear();
        self.modified = false;
        self.rename_to_save = false;
        Ok(())
    }

    // ------------------------------------------------------------------
    // file -q
    // ------------------------------------------------------------------

    fn file_query(&mut self, call: &Invocation) -> Result<HostValue, HostError> {
        if call.has_flag("reference") {
            let raws = match call.first_arg() {
                None => self.references.iter().map(ReferenceRecord::raw).collect(),
                Some(target) => {
                    let at = self.locate(target)?;
                    self.record(&at).children.iter().map(ReferenceRecord::raw).collect()
                }
            };
            return Ok(HostValue::List(raws));
        }
        if call.has_flag("namespace") {
            let at = self.locate(required_arg(call)?)?;
            return Ok(HostValue::Str(self.record(&at).namespace.clone()));
        }
        if call.has_flag("deferReference") {
            let at = self.locate(required_arg(call)?)?;
            return Ok(HostValue::Bool(self.record(&at).deferred));
        }
        if call.has_flag("lockReference") {
            let at = self.locate(required_arg(call)?)?;
            return Ok(HostValue::Bool(self.record(&at).locked));
        }
        if call.has_flag("usingNamespaces") {
            let at = self.locate(required_arg(call)?)?;
            return Ok(HostValue::Bool(!self.record(&at).namespace.is_empty()));
        }
        if call.has_flag("copyNumberList") {
            let path = required_arg(call)?;
            let raws: Vec<String> = self
                .flattened()
                .into_iter()
                .filter(|r| r.path == path)
                .map(ReferenceRecord::raw)
                .collect();
            if raws.is_empty() {
                return Err(failed(format!("'{path}' is not referenced in the scene")));
            }
            return Ok(HostValue::List(raws));
        }
        if call.has_flag("sceneName") {
            return Ok(HostValue::Str(self.scene_name.clone().unwrap_or_default()));
        }
        if call.has_flag("anyModified") {
            let edited = self.references.iter().any(|r| !r.edits.is_empty());
            return Ok(HostValue::Bool(self.modified || edited));
        }
        if call.has_flag("modified") {
            return Ok(HostValue::Bool(self.modified));
        }
        if call.has_flag("renameToSave") {
            return Ok(HostValue::Bool(self.rename_to_save));
        }
        if call.has_flag("lockFile") {
            return Ok(HostValue::Bool(self.file_locked));
        }
        if call.has_flag("writable") {
            let path = required_arg(call)?;
            let writable = self.files.get(path).map_or(true, |f| f.writable);
            return Ok(HostValue::Bool(writable));
        }
        if call.has_flag("type") {
            let path = required_arg(call)?;
            let known = self.files.get(path).and_then(|f| f.file_type.clone());
            let file_type = known.or_else(|| type_from_extension(path).map(str::to_string));
            return Ok(HostValue::Str(file_type.unwrap_or_default()));
        }
        if call.has_flag("subType") {
            let path = required_arg(call)?;
            let sub = self.files.get(path).and_then(|f| f.sub_type.clone());
            return Ok(HostValue::Str(sub.unwrap_or_default()));
        }
        Err(HostError::unsupported(call))
    }

    // ------------------------------------------------------------------
    // file -e
    // ------------------------------------------------------------------

    fn file_edit(&mut self, call: &Invocation) -> Result<HostValue, HostError> {
        if let Some(wanted) = str_flag(call, "namespace") {
            let at = self.locate(required_arg(call)?)?;
            if wanted.is_empty() || wanted.contains(char::is_whitespace) {
                return Err(failed(format!("'{wanted}' is not a valid namespace")));
            }
            let (last, parent) = at.split_last().expect("index path is never empty");
            let siblings = self.list_at_mut(parent);
            let collides = siblings
                .iter()
                .enumerate()
                .any(|(i, r)| i != *last && r.namespace == wanted);
            if collides {
                return Err(failed(format!("namespace '{wanted}' is already in use")));
            }
            siblings[*last].namespace = wanted.to_string();
            self.modified = true;
            return Ok(HostValue::Null);
        }
        Err(HostError::unsupported(call))
    }

    // ------------------------------------------------------------------
    // file (action)
    // ------------------------------------------------------------------

    fn file_action(&mut self, call: &Invocation) -> Result<HostValue, HostError> {
        let file_type = str_flag(call, "type");

        if bool_flag(call, "reference") == Some(true) {
            let path = required_arg(call)?;
            return Ok(HostValue::Str(self.add_reference(path, str_flag(call, "namespace"))));
        }
        if call.has_flag("importReference") {
            let at = self.locate(required_arg(call)?)?;
            let record = self.take_record(&at);
            let prefix = record.namespace.clone();
            let mut stack = vec![record];
            while let Some(r) = stack.pop() {
                self.scene_nodes
                    .extend(r.nodes.iter().map(|n| format!("{prefix}:{n}")));
                stack.extend(r.children);
            }
            self.modified = true;
            return Ok(HostValue::Null);
        }
        if call.has_flag("removeReference") {
            let at = self.locate(required_arg(call)?)?;
            self.take_record(&at);
            self.modified = true;
            return Ok(HostValue::Null);
        }
        if call.has_flag("unloadReference") {
            let at = self.locate(required_arg(call)?)?;
            let record = self.record_mut(&at);
            record.deferred = true;
            let raw = record.raw();
            self.modified = true;
            return Ok(HostValue::Str(raw));
        }
        if let Some(node) = str_flag(call, "loadReference") {
            let at = self.locate_node(node)?;
            if let Some(replacement) = call.first_arg() {
                let copy_number = self.next_copy_number(replacement, Some(node));
                let record = self.record_mut(&at);
                record.path = replacement.to_string();
                record.copy_number = copy_number;
            }
            let record = self.record_mut(&at);
            record.deferred = false;
            let raw = record.raw();
            self.modified = true;
            return Ok(HostValue::Str(raw));
        }
        if let Some(node) = str_flag(call, "cleanReference") {
            let at = self.locate_node(node)?;
            let record = self.record_mut(&at);
            if !record.deferred {
                return Err(failed(format!("'{node}' must be unloaded before it can be cleaned")));
            }
            record.edits.clear();
            return Ok(HostValue::Null);
        }
        if let Some(lock) = bool_flag(call, "lockReference") {
            let at = self.locate(required_arg(call)?)?;
            self.record_mut(&at).locked = lock;
            return Ok(HostValue::Null);
        }
        if call.has_flag("selectAll") {
            let at = self.locate(required_arg(call)?)?;
            let record = self.record(&at);
            let ns = record.namespace.clone();
            self.selection = record.nodes.iter().map(|n| format!("{ns}:{n}")).collect();
            return Ok(HostValue::Null);
        }
        for operation in ["exportAnimFromReference", "exportSelectedAnimFromReference"] {
            if call.has_flag(operation) {
                let path = required_arg(call)?.to_string();
                let node = str_flag(call, "referenceNode")
                    .ok_or_else(|| failed(format!("{operation} needs -referenceNode")))?
                    .to_string();
                let at = self.locate_node(&node)?;
                if self.record(&at).deferred {
                    return Err(failed(format!("'{node}' is not loaded")));
                }
                self.guard_writable(&path, call)?;
                self.record_write(operation, &path, file_type, Some(&node));
                return Ok(HostValue::Str(path));
            }
        }
        for operation in ["exportAll", "exportSelected", "exportAnim", "exportSelectedAnim"] {
            if call.has_flag(operation) {
                let path = required_arg(call)?.to_string();
                self.guard_writable(&path, call)?;
                self.record_write(operation, &path, file_type, None);
                return Ok(HostValue::Str(path));
            }
        }
        if call.has_flag("exportAsReference") {
            let path = required_arg(call)?.to_string();
            self.guard_writable(&path, call)?;
            self.record_write("exportAsReference", &path, file_type, None);
            let selected = std::mem::take(&mut self.selection);
            self.scene_nodes.retain(|n| !selected.contains(n));
            let raw = self.add_reference(&path, str_flag(call, "namespace"));
            return Ok(HostValue::Str(raw));
        }
        if call.has_flag("i") {
            let path = required_arg(call)?.to_string();
            self.scene_nodes.push(format!("{}:root", stem_of(&path)));
            self.modified = true;
            return Ok(HostValue::Str(path));
        }
        if call.has_flag("newFile") {
            self.reset_scene(call)?;
            self.scene_name = None;
            return Ok(HostValue::Str(String::new()));
        }
        if call.has_flag("open") {
            let path = required_arg(call)?.to_string();
            self.reset_scene(call)?;
            self.scene_name = Some(path.clone());
            return Ok(HostValue::Str(path));
        }
        if let Some(path) = str_flag(call, "rename") {
            self.scene_name = Some(path.to_string());
            return Ok(HostValue::Str(path.to_string()));
        }
        if bool_flag(call, "save") == Some(true) {
            let path = self
                .scene_name
                .clone()
                .ok_or_else(|| failed("scene has no name; rename it before saving"))?;
            self.guard_writable(&path, call)?;
            self.record_write("save", &path, file_type, None);
            self.modified = false;
            return Ok(HostValue::Str(path));
        }
        if let Some(on) = bool_flag(call, "renameToSave") {
            self.rename_to_save = on;
            return Ok(HostValue::Null);
        }
        if let Some(on) = bool_flag(call, "modified") {
            self.modified = on;
            return Ok(HostValue::Null);
        }
        if let Some(on) = bool_flag(call, "lockFile") {
            self.file_locked = on;
            return Ok(HostValue::Null);
        }
        Err(HostError::unsupported(call))
    }

    // ------------------------------------------------------------------
    // referenceQuery / namespace
    // ------------------------------------------------------------------

    fn reference_query(&mut self, call: &Invocation) -> Result<HostValue, HostError> {
        let target = required_arg(call)?;
        let not_a_reference =
            || HostError::failed(Command::ReferenceQuery, format!("'{target}' is not a reference"));
        if call.has_flag("referenceNode") {
            let at = index_path(&self.references, &|r: &ReferenceRecord| r.raw() == target).ok_or_else(not_a_reference)?;
            return Ok(HostValue::Str(self.record(&at).node.clone()));
        }
        if call.has_flag("filename") {
            let at = self.locate_node(target)?;
            return Ok(HostValue::Str(self.record(&at).raw()));
        }
        if call.has_flag("nodes") {
            let at = index_path(&self.references, &|r: &ReferenceRecord| r.raw() == target).ok_or_else(not_a_reference)?;
            let record = self.record(&at);
            let nodes = record
                .nodes
                .iter()
                .map(|n| format!("{}:{n}", record.namespace))
                .collect();
            return Ok(HostValue::List(nodes));
        }
        Err(HostError::unsupported(call))
    }

    fn namespace_cmd(&mut self, call: &Invocation) -> Result<HostValue, HostError> {
        if let Some(name) = str_flag(call, "exists") {
            let mut names = Vec::new();
            qualified_namespaces(&self.references, "", &mut names);
            return Ok(HostValue::Bool(names.iter().any(|n| n == name)));
        }
        Err(HostError::unsupported(call))
    }

    // ------------------------------------------------------------------
    // workspace
    // ------------------------------------------------------------------

    fn active_project(&self) -> Result<&ProjectRules, HostError> {
        self.workspace
            .projects
            .get(&self.workspace.active)
            .ok_or_else(|| HostError::failed(Command::Workspace, "no active workspace"))
    }

    fn active_project_mut(&mut self) -> Result<&mut ProjectRules, HostError> {
        let active = self.workspace.active.clone();
        self.workspace
            .projects
            .get_mut(&active)
            .ok_or_else(|| HostError::failed(Command::Workspace, "no active workspace"))
    }

    fn workspace_cmd(&mut self, call: &Invocation) -> Result<HostValue, HostError> {
        if call.mode == Mode::Query {
            for kind in ENTRY_KINDS {
                let project = self.active_project()?;
                let entries = project.entries(kind).expect("known entry kind");
                if call.has_flag(&format!("{kind}Entry")) {
                    let name = required_arg(call)?;
                    return Ok(HostValue::Str(entries.get(name).cloned().unwrap_or_default()));
                }
                if call.has_flag(&format!("{kind}List")) {
                    return Ok(HostValue::List(entries.keys().cloned().collect()));
                }
                if call.has_flag(kind) {
                    let flat = entries
                        .iter()
                        .flat_map(|(k, v)| [k.clone(), v.clone()])
                        .collect();
                    return Ok(HostValue::List(flat));
                }
            }
            if call.has_flag("active") {
                return Ok(HostValue::Str(self.workspace.active.clone()));
            }
            if call.has_flag("fullName") {
                return Ok(HostValue::Str(self.active_project()?.root.clone()));
            }
            if call.has_flag("directory") {
                return Ok(HostValue::Str(self.workspace.cwd.clone()));
            }
            return Err(HostError::unsupported(call));
        }

        for kind in ENTRY_KINDS {
            if let Some((name, value)) = call.flag_value(kind).and_then(FlagValue::as_pair) {
                let (name, value) = (name.to_string(), value.to_string());
                let project = self.active_project_mut()?;
                project.entries_mut(kind).expect("known entry kind").insert(name, value);
                project.saved = false;
                return Ok(HostValue::Null);
            }
        }
        if call.has_flag("openWorkspace") {
            let name = required_arg(call)?;
            let project = self.workspace.projects.get(name).ok_or_else(|| {
                HostError::failed(Command::Workspace, format!("workspace '{name}' does not exist"))
            })?;
            self.workspace.cwd = project.root.clone();
            self.workspace.active = name.to_string();
            return Ok(HostValue::Null);
        }
        if call.has_flag("newWorkspace") {
            let name = required_arg(call)?;
            if self.workspace.projects.contains_key(name) {
                return Err(HostError::failed(
                    Command::Workspace,
                    format!("workspace '{name}' already exists"),
                ));
            }
            self.workspace
                .projects
                .insert(name.to_string(), ProjectRules::rooted(name));
            self.workspace.active = name.to_string();
            self.workspace.cwd = name.to_string();
            return Ok(HostValue::Null);
        }
        if call.has_flag("saveWorkspace") {
            self.active_project_mut()?.saved = true;
            return Ok(HostValue::Null);
        }
        if call.has_flag("update") {
            self.active_project()?;
            return Ok(HostValue::Null);
        }
        if let Some(dir) = str_flag(call, "directory") {
            self.workspace.cwd = dir.to_string();
            return Ok(HostValue::Null);
        }
        if let Some(dir) = str_flag(call, "create") {
            let dir = dir.to_string();
            let project = self.active_project_mut()?;
            if !project.directories.contains(&dir) {
                project.directories.push(dir);
            }
            return Ok(HostValue::Null);
        }
        Err(HostError::unsupported(call))
    }

    // ------------------------------------------------------------------
    // fileInfo
    // ------------------------------------------------------------------

    fn file_info_cmd(&mut self, call: &Invocation) -> Result<HostValue, HostError> {
        if call.mode == Mode::Query {
            let flat = self
                .file_info
                .iter()
                .flat_map(|(k, v)| [k.clone(), v.clone()])
                .collect();
            return Ok(HostValue::List(flat));
        }
        if let Some(key) = str_flag(call, "remove") {
            self.file_info.retain(|(k, _)| k != key);
            self.modified = true;
            return Ok(HostValue::Null);
        }
        if let [key, value] = call.args.as_slice() {
            match self.file_info.iter_mut().find(|(k, _)| k == key) {
                Some(entry) => entry.1 = value.clone(),
                None => self.file_info.push((key.clone(), value.clone())),
            }
            self.modified = true;
            return Ok(HostValue::Null);
        }
        Err(HostError::unsupported(call))
    }
}
