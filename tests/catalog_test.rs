use appmenu::catalog::{CatalogBuild, CatalogOptions, LoadOutcome, LoadRequest, LoadStatus, MenuCatalog};
use appmenu::error::SourceError;
use appmenu::sources::desktop::DesktopMenuSource;
use appmenu::sources::{
    ChangeListener, MenuDirectory, MenuElement, MenuEntry, MenuNode, MenuSource, Subscription,
};
use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

fn unique_temp_dir(label: &str) -> PathBuf {
    let unique = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    let dir = std::env::temp_dir()
        .join("appmenu-tests")
        .join(format!("{label}-{}-{unique}", std::process::id()));
    fs::create_dir_all(&dir).unwrap();
    dir
}

fn write_desktop_file(dir: &PathBuf, file: &str, name: &str, exec: &str, categories: &str) {
    let content = format!(
        "[Desktop Entry]\nType=Application\nName={name}\nExec={exec}\nCategories={categories}\n"
    );
    fs::write(dir.join(file), content).unwrap();
}

fn catalog_with(sources: Vec<Arc<dyn MenuSource>>) -> (MenuCatalog, mpsc::Receiver<CatalogBuild>) {
    let (tx, rx) = mpsc::channel();
    let tx = Mutex::new(tx);
    let catalog = MenuCatalog::new(
        sources,
        CatalogOptions::default(),
        Arc::new(move |build| {
            let _ = tx.lock().unwrap().send(build);
        }),
        Arc::new(|| {}),
    );
    (catalog, rx)
}

fn load(catalog: &mut MenuCatalog, rx: &mpsc::Receiver<CatalogBuild>) {
    assert_eq!(catalog.request_load(), LoadRequest::Started);
    assert_eq!(catalog.finish_load(rx.recv().unwrap()), LoadOutcome::Published);
    assert_eq!(catalog.status(), LoadStatus::Loaded);
}

fn snapshot(catalog: &MenuCatalog) -> (Vec<String>, Vec<String>) {
    let categories = catalog
        .categories()
        .iter()
        .map(|category| category.display_name().to_string())
        .collect();
    let all_items = catalog
        .all_items()
        .launcher_ids()
        .into_iter()
        .map(|id| catalog.launcher(id).unwrap().desktop_id().to_string())
        .collect();
    (categories, all_items)
}

#[test]
fn loading_twice_gives_identical_catalogs() {
    let dir = unique_temp_dir("idempotent");
    write_desktop_file(&dir, "gimp.desktop", "GIMP", "gimp %U", "Graphics;");
    write_desktop_file(&dir, "firefox.desktop", "Firefox", "firefox %u", "Network;");
    write_desktop_file(&dir, "calc.desktop", "Calculator", "calc", "Utility;");
    write_desktop_file(&dir, "atlas.desktop", "Atlas", "atlas", "Education;Science;");

    let source: Arc<dyn MenuSource> = Arc::new(DesktopMenuSource::new(vec![dir.clone()]));
    let (mut first, rx1) = catalog_with(vec![source.clone()]);
    let (mut second, rx2) = catalog_with(vec![source]);
    load(&mut first, &rx1);
    load(&mut second, &rx2);

    let (categories, all_items) = snapshot(&first);
    assert_eq!(snapshot(&first), snapshot(&second));
    assert_eq!(categories, ["Accessories", "Education", "Graphics", "Internet", "Science"]);
    assert_eq!(
        all_items,
        ["atlas.desktop", "calc.desktop", "firefox.desktop", "gimp.desktop"]
    );

    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn entry_in_two_directories_is_indexed_once() {
    let dir = unique_temp_dir("duplicate");
    write_desktop_file(&dir, "atlas.desktop", "Atlas", "atlas", "Education;Science;");

    let (mut catalog, rx) = catalog_with(vec![Arc::new(DesktopMenuSource::new(vec![dir.clone()]))]);
    load(&mut catalog, &rx);

    assert_eq!(catalog.launchers().len(), 1);
    let id = catalog.id_of("atlas.desktop").unwrap();
    assert!(catalog.category("Education").unwrap().contains(id));
    assert!(catalog.category("Science").unwrap().contains(id));

    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn earlier_data_directory_shadows_later_one() {
    let user = unique_temp_dir("user");
    let system = unique_temp_dir("system");
    write_desktop_file(&user, "editor.desktop", "My Editor", "myedit", "Development;");
    write_desktop_file(&system, "editor.desktop", "Editor", "edit", "Development;");

    let (mut catalog, rx) = catalog_with(vec![Arc::new(DesktopMenuSource::new(vec![
        user.clone(),
        system.clone(),
    ]))]);
    load(&mut catalog, &rx);

    assert_eq!(catalog.launchers().len(), 1);
    assert_eq!(catalog.get_item("editor.desktop").unwrap().display_name(), "My Editor");

    fs::remove_dir_all(&user).unwrap();
    fs::remove_dir_all(&system).unwrap();
}

/// Blocks every load until the test opens the gate. The first load sees
/// the old menu, later loads the new one.
struct GatedSource {
    loads: AtomicUsize,
    gate: Mutex<mpsc::Receiver<()>>,
}

impl MenuSource for GatedSource {
    fn name(&self) -> &str {
        "gated"
    }

    fn load(&self, _desktop: Option<&str>) -> Result<MenuNode, SourceError> {
        let n = self.loads.fetch_add(1, Ordering::SeqCst);
        self.gate.lock().unwrap().recv().unwrap();

        let entry = if n == 0 {
            MenuEntry::new("old.desktop", "Old", "old")
        } else {
            MenuEntry::new("new.desktop", "New", "new")
        };
        Ok(MenuNode {
            elements: vec![MenuElement::Menu(MenuNode {
                directory: Some(MenuDirectory::new("Apps", None)),
                elements: vec![MenuElement::Item(entry)],
                origin: None,
            })],
            ..MenuNode::default()
        })
    }

    fn watch(&self, _targets: &[PathBuf], _listener: ChangeListener) -> Result<Subscription, SourceError> {
        Ok(Subscription::inert())
    }
}

#[test]
fn invalidating_during_load_never_publishes_stale_build() {
    let (gate_tx, gate_rx) = mpsc::channel();
    let source = Arc::new(GatedSource {
        loads: AtomicUsize::new(0),
        gate: Mutex::new(gate_rx),
    });
    let (mut catalog, rx) = catalog_with(vec![source.clone()]);

    assert_eq!(catalog.request_load(), LoadRequest::Started);
    assert_eq!(catalog.status(), LoadStatus::Loading);
    assert_eq!(catalog.request_load(), LoadRequest::InProgress);

    catalog.invalidate();
    assert_eq!(catalog.status(), LoadStatus::LoadingReload);
    assert_eq!(catalog.request_load(), LoadRequest::InProgress);

    gate_tx.send(()).unwrap();
    assert_eq!(catalog.finish_load(rx.recv().unwrap()), LoadOutcome::Discarded);
    assert_eq!(catalog.status(), LoadStatus::Loading);
    assert!(catalog.get_item("old.desktop").is_none());

    gate_tx.send(()).unwrap();
    assert_eq!(catalog.finish_load(rx.recv().unwrap()), LoadOutcome::Published);
    assert_eq!(catalog.status(), LoadStatus::Loaded);
    assert_eq!(source.loads.load(Ordering::SeqCst), 2);
    assert!(catalog.get_item("old.desktop").is_none());
    assert!(catalog.get_item("new.desktop").is_some());
}

#[test]
fn repeated_invalidations_during_load_rebuild_once() {
    let (gate_tx, gate_rx) = mpsc::channel();
    let source = Arc::new(GatedSource {
        loads: AtomicUsize::new(0),
        gate: Mutex::new(gate_rx),
    });
    let (mut catalog, rx) = catalog_with(vec![source.clone()]);

    assert_eq!(catalog.request_load(), LoadRequest::Started);
    for _ in 0..5 {
        catalog.invalidate();
        assert_eq!(catalog.status(), LoadStatus::LoadingReload);
    }

    gate_tx.send(()).unwrap();
    assert_eq!(catalog.finish_load(rx.recv().unwrap()), LoadOutcome::Discarded);
    gate_tx.send(()).unwrap();
    assert_eq!(catalog.finish_load(rx.recv().unwrap()), LoadOutcome::Published);

    assert_eq!(catalog.status(), LoadStatus::Loaded);
    assert_eq!(source.loads.load(Ordering::SeqCst), 2);
    assert!(rx.try_recv().is_err());
    assert!(catalog.get_item("new.desktop").is_some());
}

#[test]
fn invalidating_loaded_catalog_allows_reload() {
    let root = MenuNode {
        elements: vec![MenuElement::Menu(MenuNode {
            directory: Some(MenuDirectory::new("Apps", None)),
            elements: vec![MenuElement::Item(MenuEntry::new("a.desktop", "A", "a"))],
            origin: None,
        })],
        ..MenuNode::default()
    };

    struct Fixed(MenuNode);
    impl MenuSource for Fixed {
        fn name(&self) -> &str {
            "fixed"
        }
        fn load(&self, _desktop: Option<&str>) -> Result<MenuNode, SourceError> {
            Ok(self.0.clone())
        }
        fn watch(&self, _targets: &[PathBuf], _listener: ChangeListener) -> Result<Subscription, SourceError> {
            Ok(Subscription::inert())
        }
    }

    let (mut catalog, rx) = catalog_with(vec![Arc::new(Fixed(root))]);
    load(&mut catalog, &rx);
    let revision = catalog.revision();
    assert_eq!(catalog.request_load(), LoadRequest::AlreadyLoaded);

    catalog.invalidate();
    assert_eq!(catalog.status(), LoadStatus::Invalid);
    load(&mut catalog, &rx);
    assert!(catalog.revision() > revision);
    assert!(catalog.get_item("a.desktop").is_some());
}

#[test]
fn failing_source_loads_as_empty() {
    struct Broken;
    impl MenuSource for Broken {
        fn name(&self) -> &str {
            "broken"
        }
        fn load(&self, _desktop: Option<&str>) -> Result<MenuNode, SourceError> {
            Err(SourceError::Io {
                path: PathBuf::from("/nonexistent"),
                source: std::io::Error::from(std::io::ErrorKind::NotFound),
            })
        }
        fn watch(&self, _targets: &[PathBuf], _listener: ChangeListener) -> Result<Subscription, SourceError> {
            Ok(Subscription::inert())
        }
    }

    let (mut catalog, rx) = catalog_with(vec![Arc::new(Broken)]);
    load(&mut catalog, &rx);
    assert!(catalog.categories().is_empty());
    assert!(catalog.launchers().is_empty());
}
