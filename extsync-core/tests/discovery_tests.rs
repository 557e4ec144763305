//! Discovery integration tests against a fake extensions tree and instance
//! metadata file.

use assert_fs::prelude::*;
use extsync_core::{
    catalog::{ContentLayout, ReferencePattern},
    discovery::{read_app_extensions, Discovery},
    ChannelId, Commit, ExtensionRef, NodeId,
};
use predicates::prelude::predicate;

const PREFIX: &str = "org.learningequality.Kolibri.Content";

fn discovery_for(root: &assert_fs::TempDir) -> Discovery {
    Discovery::new(
        root.path().join("flatpak-info"),
        ContentLayout::new(root.path().join("extensions")),
        ReferencePattern::new(PREFIX).expect("pattern"),
    )
}

fn install_extension(root: &assert_fs::TempDir, name: &str, index: &str) {
    root.child("extensions")
        .child(name)
        .child("content")
        .child("content.json")
        .write_str(index)
        .expect("write content index");
}

#[test]
fn discovers_complete_content_extensions_only() {
    let root = assert_fs::TempDir::new().expect("tempdir");
    install_extension(
        &root,
        "Demo",
        r#"{"channels": [{"channel_id": "c1", "node_ids": ["a", "b"], "exclude_node_ids": []}]}"#,
    );
    // Directory without an index is incomplete.
    root.child("extensions/Partial/content")
        .create_dir_all()
        .expect("mkdir");
    root.child("flatpak-info")
        .write_str(&format!(
            "[Instance]\napp-extensions={p}.Demo=111;{p}.Partial=222;{p}.Missing=333;org.freedesktop.Platform.GL=444\n",
            p = PREFIX
        ))
        .expect("write info");

    let set = discovery_for(&root).discover();
    assert_eq!(set.len(), 1);

    let demo = set
        .get(&ExtensionRef::from(format!("{PREFIX}.Demo")))
        .expect("Demo discovered");
    assert_eq!(demo.name().as_str(), "Demo");
    assert_eq!(demo.commit(), &Commit::from("111"));
    let c1 = demo.channel(&ChannelId::from("c1")).expect("c1");
    assert!(c1.include_node_ids.contains(&NodeId::from("b")));
}

#[test]
fn corrupt_index_gives_extension_without_channels() {
    let root = assert_fs::TempDir::new().expect("tempdir");
    install_extension(&root, "Broken", "{ definitely not json");
    root.child("flatpak-info")
        .write_str(&format!("[Instance]\napp-extensions={PREFIX}.Broken=1\n"))
        .expect("write info");

    let set = discovery_for(&root).discover();
    let broken = set.iter().next().expect("extension kept");
    assert_eq!(broken.channels().len(), 0);
}

#[test]
fn missing_instance_info_is_empty() {
    let root = assert_fs::TempDir::new().expect("tempdir");
    root.child("flatpak-info").assert(predicate::path::missing());
    assert!(read_app_extensions(root.child("flatpak-info").path())
        .expect("read")
        .is_empty());
    assert!(discovery_for(&root).discover().is_empty());
}

#[test]
fn fallback_dirs_follow_discovered_extensions() {
    let root = assert_fs::TempDir::new().expect("tempdir");
    install_extension(&root, "A", r#"{"channels": []}"#);
    install_extension(&root, "B", r#"{"channels": []}"#);
    root.child("flatpak-info")
        .write_str(&format!("[Instance]\napp-extensions={PREFIX}.B=2;{PREFIX}.A=1\n"))
        .expect("write info");

    let discovery = discovery_for(&root);
    let dirs = discovery.discover().content_fallback_dirs(discovery.layout());
    assert_eq!(dirs.len(), 2);
    assert!(dirs[0].ends_with("A/content"));
    assert!(dirs[1].ends_with("B/content"));
}
