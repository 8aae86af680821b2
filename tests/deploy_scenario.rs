use std::{
    collections::HashSet,
    path::{Path, PathBuf},
    sync::Arc,
};

use modshelf::{
    deploy::{log_notifier, DeploymentState, DeploymentTarget},
    metadata::MOD_FILE,
    CatalogOptions, DeployOperation, FileSystemGateway, LocalFs, ModCatalog, ModStatus, Reconciler,
};
use tempfile::TempDir;

struct Shelf {
    _tmp: TempDir,
    source: PathBuf,
    target: PathBuf,
    fs: Arc<dyn FileSystemGateway>,
    catalog: ModCatalog,
}

fn write_mod(source: &Path, folder: &str, id: &str, tags: &[&str]) {
    let dir = source.join(folder);
    std::fs::create_dir_all(&dir).unwrap();
    let document = serde_json::json!({ "id": id, "modName": folder, "tags": tags });
    std::fs::write(dir.join(MOD_FILE), document.to_string()).unwrap();
    std::fs::write(dir.join(format!("{folder}.package")), folder).unwrap();
}

async fn shelf() -> Shelf {
    let tmp = tempfile::tempdir().unwrap();
    let source = tmp.path().join("mods");
    let target = tmp.path().join("game");
    std::fs::create_dir_all(&source).unwrap();
    std::fs::create_dir_all(&target).unwrap();
    write_mod(&source, "A", "a", &["ui"]);
    write_mod(&source, "B", "b", &["ui", "combat"]);

    let fs: Arc<dyn FileSystemGateway> = Arc::new(LocalFs::new());
    let mut catalog = ModCatalog::new(Arc::clone(&fs), CatalogOptions::default());
    catalog.add_source_folder(&source).await.unwrap();
    catalog.scan().await;
    Shelf {
        _tmp: tmp,
        source,
        target,
        fs,
        catalog,
    }
}

fn selection(ids: &[&str]) -> HashSet<String> {
    ids.iter().map(|id| id.to_string()).collect()
}

#[tokio::test]
async fn scan_indexes_tags() {
    let shelf = shelf().await;

    assert_eq!(shelf.catalog.len(), 2);
    assert_eq!(shelf.catalog.index().by_tag("ui"), vec!["a", "b"]);
    assert_eq!(
        shelf.catalog.index().by_all_tags(&["ui".into(), "combat".into()]),
        vec!["b"]
    );
}

#[cfg(unix)]
#[tokio::test]
async fn switching_selection_swaps_links() {
    let mut shelf = shelf().await;
    let reconciler = Reconciler::new(Arc::clone(&shelf.fs), log_notifier());
    let target = DeploymentTarget::Symlink {
        directory: shelf.target.clone(),
    };

    let first = reconciler
        .reconcile(&shelf.catalog, &target, &selection(&["a"]))
        .await
        .unwrap();
    assert_eq!(first.operations.len(), 1);
    assert!(matches!(first.operations[0], DeployOperation::Link { .. }));
    assert_eq!(
        std::fs::read_link(shelf.target.join("A")).unwrap(),
        shelf.source.join("A")
    );

    let second = reconciler
        .reconcile(&shelf.catalog, &target, &selection(&["b"]))
        .await
        .unwrap();
    assert_eq!(second.operations.len(), 2);
    assert!(second.is_clean());
    assert!(!shelf.target.join("A").exists());
    assert_eq!(
        std::fs::read_link(shelf.target.join("B")).unwrap(),
        shelf.source.join("B")
    );
    assert!(shelf.source.join("A").join(MOD_FILE).is_file());

    reconciler.refresh(&mut shelf.catalog, &target).await;
    assert_eq!(shelf.catalog.get_by_id("a").unwrap().status(), ModStatus::Inactive);
    assert_eq!(shelf.catalog.get_by_id("b").unwrap().status(), ModStatus::Active);
}

#[cfg(unix)]
#[tokio::test]
async fn repeated_deploy_changes_nothing() {
    let shelf = shelf().await;
    let reconciler = Reconciler::new(Arc::clone(&shelf.fs), log_notifier());
    let target = DeploymentTarget::Symlink {
        directory: shelf.target.clone(),
    };
    let wanted = selection(&["a", "b"]);

    reconciler
        .reconcile(&shelf.catalog, &target, &wanted)
        .await
        .unwrap();
    let again = reconciler
        .reconcile(&shelf.catalog, &target, &wanted)
        .await
        .unwrap();

    assert!(again.operations.is_empty());
    assert_eq!(again.unchanged.len(), 2);
    assert_eq!(again.to_string(), "already up to date, 2 unchanged");
}

#[cfg(unix)]
#[tokio::test]
async fn foreign_entries_survive_deployment() {
    let shelf = shelf().await;
    std::fs::create_dir_all(shelf.target.join("Other")).unwrap();
    std::fs::write(shelf.target.join("Other").join("keep.txt"), "mine").unwrap();
    let reconciler = Reconciler::new(Arc::clone(&shelf.fs), log_notifier());
    let target = DeploymentTarget::Symlink {
        directory: shelf.target.clone(),
    };

    reconciler
        .reconcile(&shelf.catalog, &target, &selection(&["a"]))
        .await
        .unwrap();
    reconciler
        .reconcile(&shelf.catalog, &target, &HashSet::new())
        .await
        .unwrap();

    assert!(shelf.target.join("Other").join("keep.txt").is_file());
    assert!(!shelf.target.join("A").exists());
}

#[tokio::test]
async fn traditional_mode_disables_and_restores() {
    let mut shelf = shelf().await;
    let reconciler = Reconciler::new(Arc::clone(&shelf.fs), log_notifier());
    let target = DeploymentTarget::Traditional {
        directory: shelf.source.clone(),
    };

    let report = reconciler
        .reconcile(&shelf.catalog, &target, &selection(&["a"]))
        .await
        .unwrap();
    assert!(report.is_clean());
    assert!(shelf.source.join("disable_B").is_dir());
    assert!(!shelf.source.join("B").exists());

    let state = reconciler.deployment_state(&shelf.catalog, &target).await;
    assert_eq!(state["a"], DeploymentState::Deployed);
    assert_eq!(state["b"], DeploymentState::Undeployed);

    reconciler
        .reconcile(&shelf.catalog, &target, &selection(&["a", "b"]))
        .await
        .unwrap();
    assert!(shelf.source.join("B").join(MOD_FILE).is_file());
    assert!(!shelf.source.join("disable_B").exists());

    // A fresh scan finds the restored folder under the same id.
    shelf.catalog.scan().await;
    assert_eq!(
        shelf.catalog.get_by_id("b").unwrap().location(),
        shelf.source.join("B")
    );
}
