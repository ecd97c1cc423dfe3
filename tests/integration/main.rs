//! Integration tests for Grove
//!
//! These drive the command layer against a temporary repository root, so
//! every step goes through the on-disk snapshot.

use grove::{cache, commands, Workspace};
use tempfile::TempDir;

fn workspace(dir: &TempDir) -> Workspace {
    Workspace::open(dir.path()).unwrap()
}

/// index.js -> app.js -> util.js, plus a stray file
fn seeded(dir: &TempDir) -> Workspace {
    let ws = workspace(dir);
    commands::add(&ws, "index.js", true, None).unwrap();
    commands::add(&ws, "app.js", false, Some("index.js")).unwrap();
    commands::add(&ws, "util.js", false, Some("app.js")).unwrap();
    commands::add(&ws, "stray.js", false, None).unwrap();
    ws
}

#[test]
fn test_commands_persist_between_loads() {
    let dir = TempDir::new().unwrap();
    let ws = seeded(&dir);

    assert!(cache::snapshot_path(dir.path()).exists());
    insta::assert_snapshot!(commands::stats(&ws).unwrap(), @r###"
    {
      "files": 4,
      "dependencies": 2,
      "entries": 1,
      "cycles": 0
    }
    "###);
}

#[test]
fn test_order_and_deps() {
    let dir = TempDir::new().unwrap();
    let ws = seeded(&dir);

    assert_eq!(commands::order(&ws, false).unwrap(), "index.js\napp.js\nutil.js\nstray.js");
    let topo = commands::order(&ws, true).unwrap();
    let pos = |name: &str| topo.lines().position(|l| l == name).unwrap();
    assert!(pos("util.js") < pos("app.js"));
    assert!(pos("app.js") < pos("index.js"));

    assert_eq!(commands::deps(&ws, "index.js", true, false).unwrap(), "app.js\nutil.js");
    assert_eq!(commands::deps(&ws, "util.js", false, true).unwrap(), "app.js");
    assert_eq!(commands::entries(&ws, Some("util.js")).unwrap(), "index.js");
    assert!(commands::deps(&ws, "missing.js", false, false).is_err());
}

#[test]
fn test_prune_from_entries() {
    let dir = TempDir::new().unwrap();
    let ws = seeded(&dir);

    assert_eq!(commands::prune(&ws, &[]).unwrap(), "stray.js");
    assert_eq!(commands::prune(&ws, &[]).unwrap(), "");
    assert_eq!(ws.load().unwrap().len(), 3);
}

#[test]
fn test_break_cycles_makes_order_available() {
    let dir = TempDir::new().unwrap();
    let ws = seeded(&dir);
    commands::add(&ws, "index.js", false, Some("util.js")).unwrap();

    assert!(commands::order(&ws, true).is_err());
    let report = commands::break_cycles(&ws, 5).unwrap();
    assert!(report.ends_with("acyclic"), "{report}");
    assert!(commands::order(&ws, true).is_ok());
}

#[test]
fn test_diff_against_saved_snapshot() {
    let dir = TempDir::new().unwrap();
    let ws = seeded(&dir);
    let before = dir.path().join("before.json");
    std::fs::copy(ws.snapshot_path(), &before).unwrap();

    commands::remove(&ws, "stray.js", false).unwrap();
    commands::add(&ws, "log.js", false, Some("util.js")).unwrap();

    let diff: serde_json::Value = serde_json::from_str(&commands::diff(&ws, &before).unwrap()).unwrap();
    assert_eq!(diff["added_files"], serde_json::json!(["log.js"]));
    assert_eq!(diff["removed_files"], serde_json::json!(["stray.js"]));
}

#[test]
fn test_remove_with_edges_needs_force() {
    let dir = TempDir::new().unwrap();
    let ws = seeded(&dir);

    assert!(commands::remove(&ws, "app.js", false).is_err());
    assert_eq!(commands::remove(&ws, "app.js", true).unwrap(), "app.js");
    assert_eq!(ws.load().unwrap().dependency_count(), 0);
}

#[test]
fn test_add_entry_with_parent_is_rejected() {
    let dir = TempDir::new().unwrap();
    let ws = seeded(&dir);

    assert!(commands::add(&ws, "extra.js", true, Some("index.js")).is_err());
    assert!(!ws.load().unwrap().has_file("extra.js"));
}

#[test]
fn test_config_file_applies() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("grove.toml"), "snapshot = \"deps.json\"\n[tree]\ngc_orphans = true\n").unwrap();
    let ws = seeded(&dir);
    assert!(dir.path().join("deps.json").exists());

    let mut tree = ws.load().unwrap();
    tree.remove_dependency("app.js", "util.js").unwrap();
    assert!(!tree.has_file("util.js"));
}

#[test]
fn test_clear_removes_cache() {
    let dir = TempDir::new().unwrap();
    let ws = seeded(&dir);

    commands::clear(&ws).unwrap();
    assert!(!cache::cache_dir(dir.path()).exists());
    assert!(ws.load().unwrap().is_empty());
}
