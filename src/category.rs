use crate::launcher::Launcher;
use crate::model::LauncherId;
use crate::query::normalize;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CategoryEntry {
    Launcher(LauncherId),
    Separator,
    Category(Category),
}

/// A named group of launchers, separators and nested groups.
///
/// Launchers are referenced by id; the catalog's flat index owns them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Category {
    name: Option<String>,
    icon: Option<String>,
    entries: Vec<CategoryEntry>,
    has_separators: bool,
    has_subcategories: bool,
}

/// One line of the model handed to a list or tree view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Row {
    Header {
        name: String,
        icon: Option<String>,
        depth: usize,
    },
    Launcher {
        id: LauncherId,
        depth: usize,
    },
    Separator,
}

impl Category {
    pub fn new(name: &str, icon: Option<&str>) -> Self {
        Self {
            name: Some(name.to_string()),
            icon: icon.map(str::to_string),
            ..Self::default()
        }
    }

    /// The unnamed category holding every launcher.
    pub fn all_items() -> Self {
        Self::default()
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("")
    }

    pub fn icon(&self) -> Option<&str> {
        self.icon.as_deref()
    }

    pub fn entries(&self) -> &[CategoryEntry] {
        &self.entries
    }

    pub fn append_item(&mut self, id: LauncherId) {
        self.entries.push(CategoryEntry::Launcher(id));
    }

    /// Leading and repeated separators are ignored.
    pub fn append_separator(&mut self) {
        if matches!(self.entries.last(), None | Some(CategoryEntry::Separator)) {
            return;
        }
        self.entries.push(CategoryEntry::Separator);
    }

    /// Adds `menu` as a nested subcategory.
    pub fn append_menu(&mut self, menu: Category) {
        self.entries.push(CategoryEntry::Category(menu));
    }

    /// True when no launcher is reachable from this category.
    pub fn is_empty(&self) -> bool {
        self.entries.iter().all(|entry| match entry {
            CategoryEntry::Launcher(_) => false,
            CategoryEntry::Separator => true,
            CategoryEntry::Category(category) => category.is_empty(),
        })
    }

    /// Every launcher reachable from this category, in display order.
    pub fn launcher_ids(&self) -> Vec<LauncherId> {
        let mut ids = Vec::new();
        self.collect_ids(&mut ids);
        ids
    }

    fn collect_ids(&self, ids: &mut Vec<LauncherId>) {
        for entry in &self.entries {
            match entry {
                CategoryEntry::Launcher(id) => ids.push(*id),
                CategoryEntry::Separator => {}
                CategoryEntry::Category(category) => category.collect_ids(ids),
            }
        }
    }

    pub fn contains(&self, id: LauncherId) -> bool {
        self.entries.iter().any(|entry| match entry {
            CategoryEntry::Launcher(other) => *other == id,
            CategoryEntry::Separator => false,
            CategoryEntry::Category(category) => category.contains(id),
        })
    }

    /// Sorts launchers and subcategories by display name within each run
    /// between separators. Equal names keep their insertion order.
    pub fn sort(&mut self, launchers: &[Launcher]) {
        for entry in &mut self.entries {
            if let CategoryEntry::Category(category) = entry {
                category.sort(launchers);
            }
        }

        for run in self
            .entries
            .split_mut(|entry| matches!(entry, CategoryEntry::Separator))
        {
            run.sort_by_cached_key(|entry| sort_key(entry, launchers));
        }
    }

    /// Drops empty subcategories and stray separators, then caches whether
    /// the category needs the tree layout.
    pub fn merge(&mut self) {
        for entry in &mut self.entries {
            if let CategoryEntry::Category(category) = entry {
                category.merge();
            }
        }

        let entries = std::mem::take(&mut self.entries);
        for entry in entries {
            match entry {
                CategoryEntry::Category(category) if category.is_empty() => {}
                CategoryEntry::Separator => self.append_separator(),
                entry => self.entries.push(entry),
            }
        }
        if matches!(self.entries.last(), Some(CategoryEntry::Separator)) {
            self.entries.pop();
        }

        self.has_subcategories = self
            .entries
            .iter()
            .any(|entry| matches!(entry, CategoryEntry::Category(_)));
        self.has_separators = self.has_subcategories
            || self
                .entries
                .iter()
                .any(|entry| matches!(entry, CategoryEntry::Separator));
    }

    /// Valid after `merge`.
    pub fn has_separators(&self) -> bool {
        self.has_separators
    }

    /// Valid after `merge`.
    pub fn has_subcategories(&self) -> bool {
        self.has_subcategories
    }

    /// Flat lists can use fixed-height rows; trees cannot.
    pub fn fixed_height_mode(&self) -> bool {
        !self.has_separators
    }

    pub fn rows(&self) -> Vec<Row> {
        let mut rows = Vec::new();
        self.push_rows(0, &mut rows);
        rows
    }

    fn push_rows(&self, depth: usize, rows: &mut Vec<Row>) {
        let mut after_group = false;
        for entry in &self.entries {
            match entry {
                CategoryEntry::Launcher(id) => {
                    if after_group {
                        rows.push(Row::Separator);
                        after_group = false;
                    }
                    rows.push(Row::Launcher { id: *id, depth });
                }
                CategoryEntry::Separator => {
                    rows.push(Row::Separator);
                    after_group = false;
                }
                CategoryEntry::Category(category) => {
                    if !matches!(rows.last(), None | Some(Row::Separator)) {
                        rows.push(Row::Separator);
                    }
                    rows.push(Row::Header {
                        name: category.display_name().to_string(),
                        icon: category.icon.clone(),
                        depth,
                    });
                    category.push_rows(depth + 1, rows);
                    after_group = true;
                }
            }
        }
    }
}

fn sort_key(entry: &CategoryEntry, launchers: &[Launcher]) -> String {
    match entry {
        CategoryEntry::Launcher(id) => launchers
            .get(id.index())
            .map(|launcher| normalize(launcher.display_name()))
            .unwrap_or_default(),
        CategoryEntry::Category(category) => normalize(category.display_name()),
        CategoryEntry::Separator => String::new(),
    }
}
