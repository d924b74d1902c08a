use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use scenelink_host::{ReferenceRecord, SceneSnapshot, SimulatedHost};

fn scenelink_bin() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_scenelink"))
}

fn write_scene(dir: &Path) -> PathBuf {
    let snapshot = SceneSnapshot {
        references: vec![
            ReferenceRecord::new("a.ma", "charA", "charARN")
                .with_nodes(&["root"])
                .with_children(vec![ReferenceRecord::new("prop.ma", "sword", "swordRN")]),
            ReferenceRecord::new("b.mb", "charB", "charBRN"),
        ],
        ..Default::default()
    };
    let path = dir.join("scene.json");
    SimulatedHost::new(snapshot).save(&path).expect("write scene");
    path
}

fn scenelink(scene: &Path, args: &[&str]) -> Output {
    Command::new(scenelink_bin())
        .arg("--scene")
        .arg(scene)
        .args(args)
        .env("NO_COLOR", "1")
        .output()
        .expect("run scenelink")
}

fn stdout(output: &Output) -> String {
    assert!(
        output.status.success(),
        "scenelink failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn refs_json_lists_recursive_keys() {
    let dir = tempfile::tempdir().unwrap();
    let scene = write_scene(dir.path());

    let out = stdout(&scenelink(&scene, &["refs", "--recursive", "--json"]));
    let rows: serde_json::Value = serde_json::from_str(&out).expect("json output");
    let keys: Vec<&str> = rows
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["key"].as_str().unwrap())
        .collect();
    assert_eq!(keys, vec!["charA", "charA:sword", "charB"]);
    assert_eq!(rows[0]["path"], "a.ma");
    assert_eq!(rows[0]["loaded"], true);
}

#[test]
fn unload_is_written_back_to_the_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    let scene = write_scene(dir.path());

    stdout(&scenelink(&scene, &["unload", "charB"]));
    let reloaded = SimulatedHost::load(&scene).unwrap().snapshot();
    assert!(reloaded.references[1].deferred);

    let out = stdout(&scenelink(&scene, &["ref", "charB", "--json"]));
    let detail: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(detail["loaded"], false);
    assert_eq!(detail["handle"], "charBRN");
}

#[test]
fn rename_collision_fails_without_touching_the_scene() {
    let dir = tempfile::tempdir().unwrap();
    let scene = write_scene(dir.path());
    let before = std::fs::read_to_string(&scene).unwrap();

    let output = scenelink(&scene, &["rename", "charB", "charA"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("already in use"));
    assert_eq!(std::fs::read_to_string(&scene).unwrap(), before);

    stdout(&scenelink(&scene, &["rename", "charB", "hero"]));
    let out = stdout(&scenelink(&scene, &["namespaces"]));
    assert_eq!(out.lines().collect::<Vec<_>>(), vec!["charA", "hero"]);
}

#[test]
fn rules_and_info_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let scene = write_scene(dir.path());

    stdout(&scenelink(&scene, &["rules", "file-rules", "DXF", "data"]));
    assert_eq!(stdout(&scenelink(&scene, &["rules", "file-rules", "DXF"])).trim(), "data");

    stdout(&scenelink(&scene, &["info", "shot", "010"]));
    assert_eq!(stdout(&scenelink(&scene, &["info", "shot"])).trim(), "010");
    assert_eq!(stdout(&scenelink(&scene, &["info-pop", "shot"])).trim(), "010");
    assert!(!scenelink(&scene, &["info", "shot"]).status.success());
}

#[test]
fn export_records_the_inferred_type() {
    let dir = tempfile::tempdir().unwrap();
    let scene = write_scene(dir.path());

    stdout(&scenelink(&scene, &["export", "exportAll", "out.mb"]));
    stdout(&scenelink(&scene, &["create-ref", "a.ma", "--namespace", "hero"]));
    let snapshot = SimulatedHost::load(&scene).unwrap().snapshot();
    assert_eq!(snapshot.writes[0].file_type.as_deref(), Some("mayaBinary"));
    assert_eq!(snapshot.references[2].raw(), "a.ma{1}");
    assert_eq!(snapshot.references[2].namespace, "hero");

    assert!(!scenelink(&scene, &["export", "explode", "out.ma"]).status.success());
}

#[test]
fn parse_ref_needs_no_scene() {
    let output = Command::new(scenelink_bin())
        .args(["parse-ref", "rig.ma{12}"])
        .output()
        .expect("run scenelink");
    let out = stdout(&output);
    assert_eq!(out.lines().collect::<Vec<_>>(), vec!["rig.ma", "12"]);
}

#[test]
fn config_file_selects_collision_policy() {
    let dir = tempfile::tempdir().unwrap();
    let snapshot = SceneSnapshot {
        references: vec![
            ReferenceRecord::new("a.ma", "dup", "aRN"),
            ReferenceRecord::new("b.mb", "dup", "bRN"),
        ],
        ..Default::default()
    };
    let scene = dir.path().join("dup.json");
    SimulatedHost::new(snapshot).save(&scene).unwrap();
    let config = dir.path().join("config.json");
    std::fs::write(&config, r#"{ "namespace_collision": "keep_first" }"#).unwrap();

    let out = stdout(&scenelink(
        &scene,
        &["--config", config.to_str().unwrap(), "refs", "--json"],
    ));
    let rows: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(rows[0]["path"], "a.ma");
}

#[test]
fn info_pop_of_a_missing_key_leaves_the_scene_alone() {
    let dir = tempfile::tempdir().unwrap();
    let scene = write_scene(dir.path());
    let before = std::fs::read_to_string(&scene).unwrap();

    let out = stdout(&scenelink(&scene, &["info-pop", "shot", "--default", "none"]));
    assert_eq!(out.trim(), "none");
    assert_eq!(std::fs::read_to_string(&scene).unwrap(), before);
}
