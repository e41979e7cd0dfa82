use crate::category::{Category, CategoryEntry};
use crate::launcher::Launcher;
use crate::model::LauncherId;
use crate::query::normalize;
use crate::sources::{ChangeListener, MenuElement, MenuEntry, MenuNode, MenuSource, Subscription};
use log::{debug, info, warn};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadStatus {
    Invalid,
    Loading,
    /// Invalidated while loading; the running build will be thrown away.
    LoadingReload,
    Loaded,
}

/// What `request_load` did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadRequest {
    AlreadyLoaded,
    InProgress,
    Started,
}

/// What `finish_load` did with a build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    Published,
    /// The build was stale and a new one has been started.
    Discarded,
}

#[derive(Debug, Clone, Default)]
pub struct CatalogOptions {
    /// Current desktop environment, passed on to the menu sources.
    pub desktop: Option<String>,
    pub nested_categories: bool,
}

/// Result of one background build, handed to the interactive thread.
#[derive(Debug)]
pub struct CatalogBuild {
    generation: u64,
    launchers: Vec<Launcher>,
    index: HashMap<String, LauncherId>,
    categories: Vec<Category>,
    subscriptions: Vec<Subscription>,
}

/// Receives finished builds. Called on the worker thread; implementations
/// forward the build to the thread that owns the catalog.
pub type CompletionHandler = Arc<dyn Fn(CatalogBuild) + Send + Sync>;

pub struct MenuCatalog {
    sources: Vec<Arc<dyn MenuSource>>,
    options: CatalogOptions,
    on_complete: CompletionHandler,
    on_change: ChangeListener,

    status: LoadStatus,
    generation: u64,
    revision: u64,

    launchers: Vec<Launcher>,
    index: HashMap<String, LauncherId>,
    categories: Vec<Category>,
    all_items: Category,
    subscriptions: Vec<Subscription>,
}

impl MenuCatalog {
    /// `on_change` is handed to every source and should end up calling
    /// `invalidate` on the interactive thread.
    pub fn new(
        sources: Vec<Arc<dyn MenuSource>>,
        options: CatalogOptions,
        on_complete: CompletionHandler,
        on_change: ChangeListener,
    ) -> Self {
        Self {
            sources,
            options,
            on_complete,
            on_change,
            status: LoadStatus::Invalid,
            generation: 0,
            revision: 0,
            launchers: Vec::new(),
            index: HashMap::new(),
            categories: Vec::new(),
            all_items: Category::all_items(),
            subscriptions: Vec::new(),
        }
    }

    pub fn status(&self) -> LoadStatus {
        self.status
    }

    /// Changes every time the catalog contents are cleared or replaced.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Starts a background build unless one is running or the catalog is
    /// current. Never blocks.
    pub fn request_load(&mut self) -> LoadRequest {
        match self.status {
            LoadStatus::Loaded => return LoadRequest::AlreadyLoaded,
            LoadStatus::Loading | LoadStatus::LoadingReload => return LoadRequest::InProgress,
            LoadStatus::Invalid => {}
        }

        self.status = LoadStatus::Loading;
        self.clear();
        self.generation += 1;

        let builder = Builder {
            sources: self.sources.clone(),
            options: self.options.clone(),
            on_change: self.on_change.clone(),
            generation: self.generation,
        };
        let on_complete = self.on_complete.clone();
        debug!("MenuCatalog: starting build {}", self.generation);
        thread::spawn(move || {
            let build = builder.build();
            on_complete(build);
        });

        LoadRequest::Started
    }

    pub fn invalidate(&mut self) {
        match self.status {
            LoadStatus::Loaded => {
                debug!("MenuCatalog: invalidated");
                self.status = LoadStatus::Invalid;
            }
            LoadStatus::Loading => {
                debug!("MenuCatalog: invalidated during build {}", self.generation);
                self.status = LoadStatus::LoadingReload;
            }
            LoadStatus::Invalid | LoadStatus::LoadingReload => {}
        }
    }

    /// Publishes a finished build, or drops it and starts over when the
    /// catalog was invalidated while it ran.
    pub fn finish_load(&mut self, build: CatalogBuild) -> LoadOutcome {
        if build.generation != self.generation {
            debug!("MenuCatalog: ignoring build {} (current is {})", build.generation, self.generation);
            return LoadOutcome::Discarded;
        }

        match self.status {
            LoadStatus::Loading => {}
            LoadStatus::LoadingReload => {
                info!("MenuCatalog: menu changed during build {}, reloading", build.generation);
                drop(build);
                self.status = LoadStatus::Invalid;
                self.request_load();
                return LoadOutcome::Discarded;
            }
            LoadStatus::Invalid | LoadStatus::Loaded => return LoadOutcome::Discarded,
        }

        let CatalogBuild {
            launchers,
            index,
            mut categories,
            subscriptions,
            ..
        } = build;

        for category in &mut categories {
            category.sort(&launchers);
            category.merge();
        }
        categories.sort_by_cached_key(|category| normalize(category.display_name()));

        let mut all_items = Category::all_items();
        for i in 0..launchers.len() {
            all_items.append_item(LauncherId(i));
        }
        all_items.sort(&launchers);
        all_items.merge();

        info!(
            "MenuCatalog: loaded {} launchers in {} categories",
            launchers.len(),
            categories.len()
        );

        self.launchers = launchers;
        self.index = index;
        self.categories = categories;
        self.all_items = all_items;
        self.subscriptions = subscriptions;
        self.revision += 1;
        self.status = LoadStatus::Loaded;
        LoadOutcome::Published
    }

    fn clear(&mut self) {
        self.revision += 1;
        self.subscriptions.clear();
        self.categories.clear();
        self.all_items = Category::all_items();
        self.index.clear();
        self.launchers.clear();
    }

    pub fn get_item(&self, desktop_id: &str) -> Option<&Launcher> {
        self.index
            .get(desktop_id)
            .and_then(|id| self.launchers.get(id.index()))
    }

    pub fn id_of(&self, desktop_id: &str) -> Option<LauncherId> {
        self.index.get(desktop_id).copied()
    }

    pub fn launcher(&self, id: LauncherId) -> Option<&Launcher> {
        self.launchers.get(id.index())
    }

    /// The flat index, in catalog order.
    pub fn launchers(&self) -> &[Launcher] {
        &self.launchers
    }

    /// Top-level categories sorted by name.
    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn category(&self, name: &str) -> Option<&Category> {
        self.categories
            .iter()
            .find(|category| category.display_name() == name)
    }

    /// Every launcher, sorted by name.
    pub fn all_items(&self) -> &Category {
        &self.all_items
    }
}

/// Everything the worker thread needs; owns no catalog state.
struct Builder {
    sources: Vec<Arc<dyn MenuSource>>,
    options: CatalogOptions,
    on_change: ChangeListener,
    generation: u64,
}

#[derive(Default)]
struct BuildState {
    launchers: Vec<Launcher>,
    index: HashMap<String, LauncherId>,
    categories: Vec<Category>,
    watch_targets: Vec<PathBuf>,
}

impl Builder {
    fn build(&self) -> CatalogBuild {
        let mut state = BuildState::default();
        let mut subscriptions = Vec::new();

        for source in &self.sources {
            let root = match source.load(self.options.desktop.as_deref()) {
                Ok(root) => root,
                Err(e) => {
                    warn!("Failed to load menu '{}': {}", source.name(), e);
                    continue;
                }
            };

            state.watch_targets.clear();
            self.load_root(&root, &mut state);

            match source.watch(&state.watch_targets, self.on_change.clone()) {
                Ok(subscription) => subscriptions.push(subscription),
                Err(e) => warn!("Failed to watch menu '{}': {}", source.name(), e),
            }
        }

        debug!(
            "MenuCatalog: build {} found {} launchers",
            self.generation,
            state.launchers.len()
        );
        CatalogBuild {
            generation: self.generation,
            launchers: state.launchers,
            index: state.index,
            categories: state.categories,
            subscriptions,
        }
    }

    /// Direct children of the root become top-level categories; anything
    /// deeper folds into its top-level ancestor.
    fn load_root(&self, root: &MenuNode, state: &mut BuildState) {
        if let Some(origin) = &root.origin {
            state.watch_targets.push(origin.clone());
        }

        for element in &root.elements {
            match element {
                MenuElement::Item(entry) => {
                    self.load_item(entry, None, state);
                }
                MenuElement::Menu(menu) => {
                    let Some(directory) = &menu.directory else {
                        self.load_root(menu, state);
                        continue;
                    };
                    if !directory.visible {
                        continue;
                    }

                    let mut category = Category::new(&directory.name, directory.icon.as_deref());
                    self.load_menu(menu, &mut category, state);
                    if !category.is_empty() {
                        state.categories.push(category);
                    }
                }
            }
        }
    }

    fn load_menu(&self, menu: &MenuNode, category: &mut Category, state: &mut BuildState) {
        if let Some(origin) = &menu.origin {
            state.watch_targets.push(origin.clone());
        }

        for element in &menu.elements {
            match element {
                MenuElement::Item(entry) => self.load_item(entry, Some(&mut *category), state),
                MenuElement::Menu(submenu) => {
                    if submenu.directory.as_ref().is_some_and(|d| !d.visible) {
                        continue;
                    }
                    match &submenu.directory {
                        Some(directory) if self.options.nested_categories => {
                            let mut nested = Category::new(&directory.name, directory.icon.as_deref());
                            self.load_menu(submenu, &mut nested, state);
                            category.append_menu(nested);
                        }
                        _ => self.load_menu(submenu, category, state),
                    }
                }
            }
        }
    }

    fn load_item(&self, entry: &MenuEntry, category: Option<&mut Category>, state: &mut BuildState) {
        if let Some(source) = &entry.source {
            state.watch_targets.push(source.clone());
        }
        if !entry.visible {
            return;
        }

        let id = match state.index.get(&entry.desktop_id) {
            Some(id) => *id,
            None => {
                let id = LauncherId(state.launchers.len());
                state.launchers.push(Launcher::new(entry));
                state.index.insert(entry.desktop_id.clone(), id);
                id
            }
        };

        if let Some(category) = category {
            if !direct_child(category, id) {
                category.append_item(id);
            }
        }
    }
}

/// Only direct children count; a nested subcategory may list it again.
fn direct_child(category: &Category, id: LauncherId) -> bool {
    category
        .entries()
        .iter()
        .any(|entry| *entry == CategoryEntry::Launcher(id))
}
