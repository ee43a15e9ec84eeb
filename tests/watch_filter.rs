// tests/watch_filter.rs

use std::path::Path;
use std::sync::Arc;

use notify::EventKind;
use notify::event::{
    AccessKind, CreateKind, DataChange, MetadataKind, ModifyKind, RemoveKind, RenameMode,
};
use tokio::sync::mpsc;

use buildloop::engine::RuntimeEvent;
use buildloop::fs::mock::MockFileSystem;
use buildloop::fs::FileSystem;
use buildloop::session::{self, SessionState, SourceFileCache};
use buildloop::types::WatchTarget;
use buildloop::watch::{
    ChangeFilter, WatchProfiles, compute_file_hash, is_content_event, process_file_change,
};
use buildloop_test_utils::builders::BuildConfigBuilder;

fn profiles() -> WatchProfiles {
    WatchProfiles::from_config(&BuildConfigBuilder::new().build()).unwrap()
}

#[test]
fn classify_routes_paths_to_targets() {
    let profiles = profiles();
    let empty = SourceFileCache::new();

    assert_eq!(profiles.classify("src/index.html", &empty), vec![WatchTarget::Markup]);
    assert_eq!(profiles.classify("src/app.js", &empty), vec![WatchTarget::Scripts]);
    assert_eq!(
        profiles.classify("src/theme/base.scss", &empty),
        vec![WatchTarget::Styles]
    );
    assert_eq!(profiles.classify("server.js", &empty), vec![WatchTarget::Server]);
    assert_eq!(profiles.classify("routes/api.json", &empty), vec![WatchTarget::Server]);

    // Ignored by the server list, or never watched at all.
    assert!(profiles.classify("package.json", &empty).is_empty());
    assert!(profiles.classify("Buildloop.toml", &empty).is_empty());
    assert!(profiles.classify("dist/app.min.js", &empty).is_empty());
    assert!(profiles.classify(".buildloop/app.meta.json", &empty).is_empty());
    assert!(profiles.classify("node_modules/x/index.js", &empty).is_empty());
    assert!(profiles.classify("README.md", &empty).is_empty());
}

#[test]
fn cached_module_graph_files_rebuild_scripts() {
    let profiles = profiles();
    let mut cache = SourceFileCache::new();
    cache.observe("lib/card.ts");

    assert!(profiles.classify("lib/card.ts", &SourceFileCache::new()).is_empty());
    // Outside every glob, but part of the module graph.
    assert_eq!(
        profiles.classify("./lib/card.ts", &cache),
        vec![WatchTarget::Scripts]
    );
}

#[test]
fn hashing_uses_file_contents() {
    let fs = MockFileSystem::new();
    fs.add_file("test.txt", b"hello world".to_vec());

    let hash = compute_file_hash(&fs, Path::new("test.txt")).unwrap();
    // blake3 hash of "hello world"
    assert_eq!(
        hash,
        "d74981efa70a0c880b8d8c1985d075dbcbf679b99a5f9914e5aaf96b831a9e24"
    );
}

fn filter(fs: &MockFileSystem, use_hash: bool) -> ChangeFilter {
    let fs: Arc<dyn FileSystem> = Arc::new(fs.clone());
    ChangeFilter::new(fs, ".", profiles(), SessionState::shared(), use_hash)
}

#[tokio::test]
async fn unchanged_content_is_ignored_with_hashing() {
    let fs = MockFileSystem::new();
    fs.add_file("./src/app.js", "let a = 1;");
    let mut filter = filter(&fs, true);
    let path = Path::new("./src/app.js");

    assert_eq!(filter.targets_for(path).await, vec![WatchTarget::Scripts]);
    // Second event for the same save.
    assert!(filter.targets_for(path).await.is_empty());

    fs.add_file("./src/app.js", "let a = 2;");
    assert_eq!(filter.targets_for(path).await, vec![WatchTarget::Scripts]);

    // Removal always counts.
    fs.remove_file("./src/app.js");
    assert_eq!(filter.targets_for(path).await, vec![WatchTarget::Scripts]);
}

#[tokio::test]
async fn without_hashing_every_event_counts() {
    let fs = MockFileSystem::new();
    fs.add_file("./src/app.scss", ".a{}");
    let mut filter = filter(&fs, false);
    let path = Path::new("./src/app.scss");

    assert_eq!(filter.targets_for(path).await, vec![WatchTarget::Styles]);
    assert_eq!(filter.targets_for(path).await, vec![WatchTarget::Styles]);
}

#[tokio::test]
async fn process_file_change_sends_root_relative_events() {
    let fs = MockFileSystem::new();
    fs.add_file("./src/index.html", "<html></html>");
    let mut filter = filter(&fs, true);
    let (tx, mut rx) = mpsc::channel(8);

    assert!(process_file_change(&mut filter, Path::new("./src/index.html"), &tx).await);
    assert!(process_file_change(&mut filter, Path::new("./README.md"), &tx).await);

    assert_eq!(
        rx.try_recv().unwrap(),
        RuntimeEvent::Changed {
            target: WatchTarget::Markup,
            path: "src/index.html".to_string(),
        }
    );
    assert!(rx.try_recv().is_err());

    drop(rx);
    fs.add_file("./src/index.html", "<html><body></body></html>");
    assert!(!process_file_change(&mut filter, Path::new("./src/index.html"), &tx).await);
}

#[test]
fn session_cache_feeds_the_filter() {
    let session = SessionState::shared();
    session::lock(&session).sources_mut().observe("lib/util.js");
    assert!(session::lock(&session).sources().contains(Path::new("lib/util.js")));
}

#[test]
fn metadata_only_events_are_not_content_changes() {
    for kind in [
        MetadataKind::Any,
        MetadataKind::AccessTime,
        MetadataKind::WriteTime,
        MetadataKind::Permissions,
        MetadataKind::Ownership,
    ] {
        assert!(
            !is_content_event(&EventKind::Modify(ModifyKind::Metadata(kind))),
            "{kind:?} should be ignored"
        );
    }
    assert!(!is_content_event(&EventKind::Access(AccessKind::Read)));
    assert!(!is_content_event(&EventKind::Other));

    assert!(is_content_event(&EventKind::Modify(ModifyKind::Data(DataChange::Content))));
    assert!(is_content_event(&EventKind::Modify(ModifyKind::Name(RenameMode::To))));
    assert!(is_content_event(&EventKind::Modify(ModifyKind::Any)));
    assert!(is_content_event(&EventKind::Create(CreateKind::File)));
    assert!(is_content_event(&EventKind::Remove(RemoveKind::File)));
    assert!(is_content_event(&EventKind::Any));
}
