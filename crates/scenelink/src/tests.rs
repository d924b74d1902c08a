//! Scenario tests for the facade against the simulated host.

use super::*;
use scenelink_host::{Command, FileRecord, ReferenceRecord, SceneSnapshot, SimulatedHost};
use std::sync::Arc;

/// Two characters; charA carries a sword which carries a gem.
fn rig_scene() -> SceneSnapshot {
    SceneSnapshot {
        references: vec![
            ReferenceRecord::new("a.ma", "charA", "charARN")
                .with_nodes(&["root", "spine"])
                .with_children(vec![ReferenceRecord::new("prop.ma", "sword", "swordRN")
                    .with_nodes(&["blade"])
                    .with_children(vec![ReferenceRecord::new("gem.ma", "gem", "gemRN")])]),
            ReferenceRecord::new("b.mb", "charB", "charBRN"),
        ],
        ..Default::default()
    }
}

fn open(snapshot: SceneSnapshot) -> (Arc<SimulatedHost>, Session) {
    open_with(snapshot, SessionConfig::default())
}

fn open_with(snapshot: SceneSnapshot, config: SessionConfig) -> (Arc<SimulatedHost>, Session) {
    let host = Arc::new(SimulatedHost::new(snapshot));
    let session = Session::with_config(host.clone(), config);
    (host, session)
}

fn keys(graph: &ReferenceGraph) -> Vec<&str> {
    graph.keys().collect()
}

// ============================================================================
// Graph resolution
// ============================================================================

#[test]
fn test_flat_listing_maps_namespaces_to_references() {
    let (_host, session) = open(rig_scene());
    let graph = session.list_references(false);

    assert_eq!(keys(&graph), vec!["charA", "charB"]);
    let a = graph.get("charA").unwrap();
    assert_eq!(a.path(), "a.ma");
    assert_eq!(a.copy_number(), None);
    assert_eq!(graph.get("charB").unwrap().path(), "b.mb");
}

#[test]
fn test_copy_numbered_reference_splits_identity() {
    let mut scene = rig_scene();
    scene
        .references
        .push(ReferenceRecord::new("a.ma", "charA1", "charA1RN").with_copy_number(1));
    let (_host, session) = open(scene);

    let graph = session.list_references(false);
    let second = graph.get("charA1").unwrap();
    assert_eq!(second.path(), "a.ma");
    assert_eq!(second.copy_number(), Some(1));
    assert_eq!(second.with_copy_number(), "a.ma{1}");
    assert_eq!(second.copy_number_list().unwrap(), vec![None, Some(1)]);
}

#[test]
fn test_recursive_listing_prefixes_nested_namespaces() {
    let (_host, session) = open(rig_scene());
    let graph = session.list_references(true);

    assert_eq!(
        keys(&graph),
        vec!["charA", "charA:sword", "charA:sword:gem", "charB"]
    );
    assert_eq!(graph.get("charA:sword").unwrap().path(), "prop.ma");
    assert_eq!(graph.get("charA:sword:gem").unwrap().path(), "gem.ma");

    let direct: Vec<&str> = graph.children_of("charA").map(|(k, _)| k).collect();
    assert_eq!(direct, vec!["charA:sword"]);
}

#[test]
fn test_sub_references_are_one_level_deep() {
    let (_host, session) = open(rig_scene());
    let char_a = session.reference_by_namespace("charA").unwrap();

    let subs = char_a.sub_references();
    assert_eq!(keys(&subs), vec!["charA:sword"]);
    assert!(session
        .reference_by_namespace("charB")
        .unwrap()
        .sub_references()
        .is_empty());
}

#[test]
fn test_max_depth_bounds_recursion() {
    let config = SessionConfig {
        max_depth: 1,
        ..SessionConfig::default()
    };
    let (_host, session) = open_with(rig_scene(), config);
    assert_eq!(
        keys(&session.list_references(true)),
        vec!["charA", "charA:sword", "charB"]
    );
}

#[test]
fn test_empty_scene_yields_empty_graph_every_time() {
    let (_host, session) = open(SceneSnapshot::default());
    assert!(session.list_references(true).is_empty());
    assert!(session.list_references(true).is_empty());
    assert!(session.list_namespaces().is_empty());
}

#[test]
fn test_enumeration_failure_degrades_to_empty() {
    let (host, session) = open(rig_scene());
    host.fail_on(Command::File, "reference");

    assert!(session.list_references(false).is_empty());
    assert!(session.list_namespaces().is_empty());
    assert!(session.reference_list().is_empty());
}

#[test]
fn test_namespaces_follow_host_order() {
    let mut scene = rig_scene();
    scene.references.reverse();
    let (_host, session) = open(scene);
    assert_eq!(session.list_namespaces(), vec!["charB", "charA"]);
    let paths: Vec<String> = session
        .reference_list()
        .iter()
        .map(|r| r.path().to_string())
        .collect();
    assert_eq!(paths, vec!["b.mb", "a.ma"]);
}

fn colliding_scene() -> SceneSnapshot {
    SceneSnapshot {
        references: vec![
            ReferenceRecord::new("a.ma", "dup", "aRN"),
            ReferenceRecord::new("b.mb", "dup", "bRN"),
        ],
        ..Default::default()
    }
}

#[test]
fn test_namespace_collision_last_write_wins_by_default() {
    let (_host, session) = open(colliding_scene());
    let graph = session.list_references(false);
    assert_eq!(graph.len(), 1);
    assert_eq!(graph.get("dup").unwrap().path(), "b.mb");
}

#[test]
fn test_replaced_reference_takes_its_nested_entries_along() {
    let scene = SceneSnapshot {
        references: vec![
            ReferenceRecord::new("a.ma", "dup", "aRN").with_children(vec![
                ReferenceRecord::new("c.ma", "c", "cRN")
                    .with_children(vec![ReferenceRecord::new("e.ma", "e", "eRN")]),
            ]),
            ReferenceRecord::new("b.mb", "dup", "bRN")
                .with_children(vec![ReferenceRecord::new("d.ma", "d", "dRN")]),
        ],
        ..Default::default()
    };
    let (_host, session) = open(scene);

    let graph = session.list_references(true);
    assert_eq!(keys(&graph), vec!["dup", "dup:d"]);
    assert_eq!(graph.get("dup").unwrap().path(), "b.mb");
    let children: Vec<&str> = graph.children_of("dup").map(|(k, _)| k).collect();
    assert_eq!(children, vec!["dup:d"]);
    assert_eq!(graph.get("dup").unwrap().sub_references().len(), children.len());
}

#[test]
fn test_namespace_collision_can_keep_first() {
    let config = SessionConfig {
        namespace_collision: CollisionPolicy::KeepFirst,
        ..SessionConfig::default()
    };
    let (_host, session) = open_with(colliding_scene(), config);
    let graph = session.list_references(false);
    assert_eq!(graph.len(), 1);
    assert_eq!(graph.get("dup").unwrap().path(), "a.ma");
}

// ============================================================================
// Construction
// ============================================================================

#[test]
fn test_seed_requires_exactly_one_part() {
    assert_eq!(
        ReferenceSeed::from_parts(Some("a.ma"), None, Some("")).unwrap(),
        ReferenceSeed::Path("a.ma".into())
    );
    assert!(matches!(
        ReferenceSeed::from_parts(None, None, None),
        Err(SceneError::InvalidArgument(_))
    ));
    assert!(matches!(
        ReferenceSeed::from_parts(Some(""), Some(""), None),
        Err(SceneError::InvalidArgument(_))
    ));
    assert!(matches!(
        ReferenceSeed::from_parts(Some("a.ma"), Some("charA"), None),
        Err(SceneError::InvalidArgument(_))
    ));
}

#[test]
fn test_namespace_seed_matches_top_level_only() {
    let (_host, session) = open(rig_scene());
    assert_eq!(session.reference_by_namespace("charB").unwrap().path(), "b.mb");

    let err = session.reference_by_namespace("ghost").unwrap_err();
    assert!(err.is_not_found());
    assert!(session.reference_by_namespace("sword").unwrap_err().is_not_found());
}

#[test]
fn test_handle_seed_caches_the_handle() {
    let (host, session) = open(rig_scene());
    let node = session
        .reference(ReferenceSeed::Handle(BackingHandle::new("charBRN")))
        .unwrap();

    assert_eq!(node.path(), "b.mb");
    assert_eq!(node.backing_handle(), Some(BackingHandle::new("charBRN")));
    assert_eq!(host.call_count(Command::ReferenceQuery, "referenceNode"), 0);
}

// ============================================================================
// Handle cache
// ============================================================================

#[test]
fn test_backing_handle_is_resolved_once_when_cached() {
    let (host, session) = open(rig_scene());
    let node = session.reference_by_namespace("charA").unwrap();

    assert_eq!(node.backing_handle(), Some(BackingHandle::new("charARN")));
    assert_eq!(node.backing_handle(), Some(BackingHandle::new("charARN")));
    assert_eq!(host.call_count(Command::ReferenceQuery, "referenceNode"), 1);

    node.invalidate();
    node.backing_handle();
    assert_eq!(host.call_count(Command::ReferenceQuery, "referenceNode"), 2);
}

#[test]
fn test_always_resolve_skips_the_cache() {
    let config = SessionConfig {
        handle_caching: HandleCaching::AlwaysResolve,
        ..SessionConfig::default()
    };
    let (host, session) = open_with(rig_scene(), config);
    let node = session.reference_by_namespace("charA").unwrap();

    node.backing_handle();
    node.backing_handle();
    assert_eq!(host.call_count(Command::ReferenceQuery, "referenceNode"), 2);
}

#[test]
fn test_removed_reference_is_stale_for_handle_operations() {
    let (_host, session) = open(rig_scene());
    let mut node = session.reference_by_namespace("charB").unwrap();
    assert!(node.backing_handle().is_some());

    node.remove().unwrap();
    assert_eq!(node.backing_handle(), None);
    assert!(matches!(
        node.load(None),
        Err(SceneError::StaleReference { .. })
    ));
    assert!(matches!(node.clean(), Err(SceneError::StaleReference { .. })));
    assert!(matches!(
        node.export_anim("b.anim", &FileOptions::new()),
        Err(SceneError::StaleReference { .. })
    ));
    // Path-addressed calls report what the host says.
    assert!(matches!(
        node.namespace(),
        Err(SceneError::HostOperationFailed { .. })
    ));
    assert!(session.list_namespaces() == vec!["charA"]);
}

// ============================================================================
// State changes
// ============================================================================

#[test]
fn test_loaded_and_deferred_are_exclusive() {
    let (_host, session) = open(rig_scene());
    let mut node = session.reference_by_namespace("charA").unwrap();

    assert!(node.is_loaded().unwrap());
    assert_ne!(node.is_loaded().unwrap(), node.is_deferred().unwrap());

    node.unload().unwrap();
    assert!(node.is_deferred().unwrap());
    assert_ne!(node.is_loaded().unwrap(), node.is_deferred().unwrap());

    node.load(None).unwrap();
    assert!(node.is_loaded().unwrap());
    assert_eq!(node.with_copy_number(), "a.ma");
}

#[test]
fn test_load_with_replacement_refreshes_identity() {
    let mut scene = rig_scene();
    scene.references[1].deferred = true;
    let (host, session) = open(scene);
    let mut node = session.reference_by_namespace("charB").unwrap();

    node.load(Some("a.ma")).unwrap();
    assert_eq!(node.path(), "a.ma");
    assert_eq!(node.copy_number(), Some(1));
    assert_eq!(node.namespace().unwrap(), "charB");
    assert!(node.is_loaded().unwrap());
    assert_eq!(host.snapshot().references[1].raw(), "a.ma{1}");
}

#[test]
fn test_lock_and_unlock() {
    let (_host, session) = open(rig_scene());
    let node = session.reference_by_namespace("charA").unwrap();
    assert!(!node.is_locked().unwrap());
    node.lock().unwrap();
    assert!(node.is_locked().unwrap());
    node.unlock().unwrap();
    assert!(!node.is_locked().unwrap());
}

#[test]
fn test_state_change_failures_propagate() {
    let (host, session) = open(rig_scene());
    let node = session.reference_by_namespace("charA").unwrap();
    host.fail_on(Command::File, "lockReference");

    let err = node.lock().unwrap_err();
    assert!(matches!(
        err,
        SceneError::HostOperationFailed { operation: "lock reference", .. }
    ));
}

#[test]
fn test_clean_needs_an_unloaded_reference() {
    let mut scene = rig_scene();
    scene.references[0].edits = vec!["setAttr root.tx 1".into()];
    let (host, session) = open(scene);
    let node = session.reference_by_namespace("charA").unwrap();

    assert!(node.clean().is_err());
    node.unload().unwrap();
    node.clean().unwrap();
    assert!(host.snapshot().references[0].edits.is_empty());
}

#[test]
fn test_rename_namespace_rejects_collisions() {
    let (_host, session) = open(rig_scene());
    let node = session.reference_by_namespace("charB").unwrap();

    let err = node.set_namespace("charA").unwrap_err();
    assert!(matches!(err, SceneError::HostOperationFailed { .. }));
    assert!(err.to_string().contains("already in use"));

    node.set_namespace("hero").unwrap();
    assert_eq!(node.namespace().unwrap(), "hero");
    assert_eq!(keys(&session.list_references(false)), vec!["charA", "hero"]);
}

#[test]
fn test_import_merges_nodes_into_the_scene() {
    let (host, session) = open(rig_scene());
    let node = session.reference_by_namespace("charA").unwrap();
    assert!(node.namespace_exists().unwrap());

    node.import_contents().unwrap();
    assert_eq!(node.backing_handle(), None);
    let snapshot = host.snapshot();
    assert!(snapshot.scene_nodes.contains(&"charA:root".to_string()));
    assert!(snapshot.scene_nodes.contains(&"charA:blade".to_string()));
    assert_eq!(session.list_namespaces(), vec!["charB"]);
}

#[test]
fn test_reference_queries() {
    let (host, session) = open(rig_scene());
    let node = session.reference_by_namespace("charA").unwrap();

    assert!(node.is_using_namespaces().unwrap());
    assert_eq!(node.nodes().unwrap(), vec!["charA:root", "charA:spine"]);

    node.select_all().unwrap();
    assert_eq!(host.snapshot().selection, vec!["charA:root", "charA:spine"]);
}

#[test]
fn test_reference_animation_export_names_its_source() {
    let (host, session) = open(rig_scene());
    let node = session.reference_by_namespace("charA").unwrap();

    let written = node.export_anim("anim/charA.ma", &FileOptions::new()).unwrap();
    assert_eq!(written, "anim/charA.ma");
    let write = host.snapshot().writes.pop().unwrap();
    assert_eq!(write.operation, "exportAnimFromReference");
    assert_eq!(write.source.as_deref(), Some("charARN"));
    assert_eq!(write.file_type.as_deref(), Some(ASCII_SCENE_TAG));

    node.unload().unwrap();
    assert!(matches!(
        node.export_selected_anim("anim/sel.ma", &FileOptions::new()),
        Err(SceneError::HostOperationFailed { .. })
    ));
}

// ============================================================================
// File operations
// ============================================================================

#[test]
fn test_export_infers_file_type_from_extension() {
    let (host, session) = open(rig_scene());
    let files = session.files();
    let plain = FileOptions::new();

    files.export_all("out.ma", &plain).unwrap();
    files.export_all("out.mb", &plain).unwrap();
    files.export_all("out.txt", &plain).unwrap();
    files
        .export_all("out.obj", &FileOptions::new().file_type(FileType::Other("OBJexport".into())))
        .unwrap();

    let types: Vec<Option<String>> = host
        .snapshot()
        .writes
        .into_iter()
        .map(|w| w.file_type)
        .collect();
    assert_eq!(
        types,
        vec![
            Some("mayaAscii".to_string()),
            Some("mayaBinary".to_string()),
            None,
            Some("OBJexport".to_string()),
        ]
    );
}

#[test]
fn test_read_only_targets_need_force() {
    let mut scene = rig_scene();
    scene.files.insert(
        "locked.ma".into(),
        FileRecord {
            writable: false,
            ..Default::default()
        },
    );
    let (_host, session) = open(scene);
    let files = session.files();

    assert!(files.export_selected("locked.ma", &FileOptions::new()).is_err());
    assert_eq!(
        files
            .export_selected("locked.ma", &FileOptions::new().force())
            .unwrap(),
        "locked.ma"
    );
}

#[test]
fn test_create_reference_returns_a_live_node() {
    let (_host, session) = open(rig_scene());
    let node = session
        .files()
        .create_reference("a.ma", &FileOptions::new().namespace("hero"))
        .unwrap();

    assert_eq!(node.with_copy_number(), "a.ma{1}");
    assert_eq!(node.namespace().unwrap(), "hero");
    assert_eq!(node.backing_handle(), Some(BackingHandle::new("heroRN")));
    assert_eq!(
        session.list_namespaces(),
        vec!["charA", "charB", "hero"]
    );
}

/// Accepts every call and answers nothing.
struct SilentHost;

impl HostCommand for SilentHost {
    fn invoke(&self, _call: &Invocation) -> std::result::Result<HostValue, HostError> {
        Ok(HostValue::Null)
    }
}

#[test]
fn test_reference_operations_reject_an_empty_answer() {
    let session = Session::new(Arc::new(SilentHost));
    let files = session.files();

    let err = files.create_reference("a.ma", &FileOptions::new()).unwrap_err();
    assert!(matches!(
        err,
        SceneError::UnexpectedResult {
            operation: "createReference",
            found: "null"
        }
    ));
    assert!(matches!(
        files.export_as_reference("b.mb", &FileOptions::new()),
        Err(SceneError::UnexpectedResult { found: "null", .. })
    ));
    // Path-producing rows fall back to the requested path.
    assert_eq!(files.export_all("c.ma", &FileOptions::new()).unwrap(), "c.ma");
}

#[test]
fn test_export_as_reference_swaps_selection_for_a_reference() {
    let mut scene = rig_scene();
    scene.scene_nodes = vec!["lamp".into(), "desk".into()];
    scene.selection = vec!["lamp".into()];
    let (host, session) = open(scene);

    let node = session
        .files()
        .export_as_reference("props/lamp.mb", &FileOptions::new())
        .unwrap();
    assert_eq!(node.namespace().unwrap(), "lamp");

    let snapshot = host.snapshot();
    assert_eq!(snapshot.scene_nodes, vec!["desk"]);
    assert_eq!(snapshot.writes[0].file_type.as_deref(), Some(BINARY_SCENE_TAG));
}

#[test]
fn test_file_operations_by_name() {
    let (_host, session) = open(rig_scene());

    assert!(matches!(
        session.file_operation("explode", Some("x.ma"), &FileOptions::new()),
        Err(SceneError::InvalidArgument(_))
    ));
    assert!(matches!(
        session.file_operation("exportAll", None, &FileOptions::new()),
        Err(SceneError::InvalidArgument(_))
    ));
    let outcome = session
        .file_operation("renameFile", Some("shot010.ma"), &FileOptions::new())
        .unwrap();
    assert_eq!(outcome, FileOutcome::Path(PathHandle::new("shot010.ma")));
    assert_eq!(session.files().scene_name().unwrap(), "shot010.ma");
}

#[test]
fn test_every_table_row_is_reachable_by_name() {
    for op in FILE_OPERATIONS {
        assert_eq!(FileOperation::find(op.name).unwrap(), op);
    }
}

#[test]
fn test_open_and_new_reset_the_scene() {
    let (host, session) = open(rig_scene());
    let files = session.files();
    session.file_info().set("shot", "010").unwrap();

    assert!(files.open_file("next.ma", &FileOptions::new()).is_err());
    assert_eq!(
        files.open_file("next.ma", &FileOptions::new().force()).unwrap(),
        "next.ma"
    );
    assert!(session.list_references(true).is_empty());
    assert!(session.file_info().items().unwrap().is_empty());

    files.import_file("lib/lamp.ma", &FileOptions::new()).unwrap();
    files.new_file(&FileOptions::new().force()).unwrap();
    assert!(host.snapshot().scene_nodes.is_empty());
    assert_eq!(files.scene_name().unwrap(), "");
}

#[test]
fn test_save_as_renames_and_saves_with_inferred_type() {
    let (host, session) = open(rig_scene());
    let current = session.current_file();
    current.set_modified(true).unwrap();

    let saved = session.files().save_as("shots/s01.mb", &FileOptions::new()).unwrap();
    assert_eq!(saved, "shots/s01.mb");
    assert_eq!(current.name().unwrap(), "shots/s01.mb");
    assert!(!current.is_modified().unwrap());

    let write = host.snapshot().writes.pop().unwrap();
    assert_eq!(write.operation, "save");
    assert_eq!(write.file_type.as_deref(), Some(BINARY_SCENE_TAG));
}

#[test]
fn test_current_file_flags() {
    let mut scene = rig_scene();
    scene.references[1].edits = vec!["parent sword charB:hand".into()];
    let (_host, session) = open(scene);
    let current = session.current_file();

    assert!(!current.is_modified().unwrap());
    assert!(current.any_modified().unwrap());

    current.set_rename_to_save(true).unwrap();
    assert!(current.rename_to_save().unwrap());

    current.lock().unwrap();
    assert!(current.is_locked().unwrap());
    current.unlock().unwrap();
    assert!(!current.is_locked().unwrap());
}

// ============================================================================
// Workspace + metadata
// ============================================================================

#[test]
fn test_workspace_rule_roundtrip() {
    let (_host, session) = open(rig_scene());
    let rules = session.workspace().file_rules();

    rules.set("DXF", "data").unwrap();
    assert_eq!(rules.get("DXF").unwrap(), "data");
    assert!(rules.contains("DXF").unwrap());
    assert_eq!(rules.keys().unwrap(), vec!["DXF"]);
    assert_eq!(rules.items().unwrap(), vec![("DXF".to_string(), "data".to_string())]);
    assert!(rules.get("OBJ").unwrap_err().is_not_found());
    assert_eq!(rules.get_or("OBJ", "objects").unwrap(), "objects");

    // Tables are independent.
    assert!(session.workspace().variables().keys().unwrap().is_empty());
}

#[test]
fn test_workspace_entry_with_empty_value_is_present() {
    let (_host, session) = open(rig_scene());
    let rules = session.workspace().file_rules();

    rules.set("EMPTY", "").unwrap();
    assert!(rules.contains("EMPTY").unwrap());
    assert_eq!(rules.get("EMPTY").unwrap(), "");
    assert_eq!(rules.get_or("EMPTY", "fallback").unwrap(), "");
    assert!(rules.get("MISSING").unwrap_err().is_not_found());
}

#[test]
fn test_switching_projects_changes_what_tables_resolve_against() {
    let (host, session) = open(rig_scene());
    let workspace = session.workspace();
    let rules = workspace.file_rules();
    rules.set("DXF", "data").unwrap();

    workspace.new_project("shotA").unwrap();
    assert_eq!(workspace.name().unwrap(), "shotA");
    assert!(rules.get("DXF").unwrap_err().is_not_found());

    assert!(workspace.open("nowhere").is_err());
    workspace.open("default").unwrap();
    assert_eq!(rules.get("DXF").unwrap(), "data");
    assert_eq!(workspace.path().unwrap(), "default");

    workspace.chdir("scenes").unwrap();
    assert_eq!(workspace.getcwd().unwrap(), "scenes");
    workspace.mkdir("cache").unwrap();
    workspace.update().unwrap();
    workspace.save().unwrap();

    let project = host.snapshot().workspace.projects["default"].clone();
    assert!(project.saved);
    assert_eq!(project.directories, vec!["cache"]);
}

#[test]
fn test_metadata_store() {
    let (_host, session) = open(rig_scene());
    let info = session.file_info();

    info.set("shot", "010").unwrap();
    info.set("artist", "kim").unwrap();
    info.set("shot", "020").unwrap();
    assert_eq!(
        info.items().unwrap(),
        vec![
            ("shot".to_string(), "020".to_string()),
            ("artist".to_string(), "kim".to_string()),
        ]
    );
    assert_eq!(info.keys().unwrap(), vec!["shot", "artist"]);
    assert_eq!(info.values().unwrap(), vec!["020", "kim"]);
    assert!(info.contains("artist").unwrap());

    assert_eq!(info.pop("artist", None).unwrap(), "kim");
    assert!(!info.contains("artist").unwrap());
    assert_eq!(info.pop("artist", Some("nobody")).unwrap(), "nobody");
    assert!(info.pop("artist", None).unwrap_err().is_not_found());
    assert!(info.get("artist").unwrap_err().is_not_found());
}
