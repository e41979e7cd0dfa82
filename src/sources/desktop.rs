use crate::error::SourceError;
use crate::sources::{
    ChangeListener, MenuDirectory, MenuElement, MenuEntry, MenuEntryAction, MenuNode, MenuSource,
    Subscription,
};
use directories::BaseDirs;
use log::{debug, info, warn};
use notify::{Config, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

struct MainCategory {
    keys: &'static [&'static str],
    name: &'static str,
    icon: &'static str,
}

const MAIN_CATEGORIES: &[MainCategory] = &[
    MainCategory { keys: &["Utility"], name: "Accessories", icon: "applications-accessories" },
    MainCategory { keys: &["Development"], name: "Development", icon: "applications-development" },
    MainCategory { keys: &["Education"], name: "Education", icon: "applications-education" },
    MainCategory { keys: &["Game"], name: "Games", icon: "applications-games" },
    MainCategory { keys: &["Graphics"], name: "Graphics", icon: "applications-graphics" },
    MainCategory { keys: &["Network"], name: "Internet", icon: "applications-internet" },
    MainCategory { keys: &["AudioVideo", "Audio", "Video"], name: "Multimedia", icon: "applications-multimedia" },
    MainCategory { keys: &["Office"], name: "Office", icon: "applications-office" },
    MainCategory { keys: &["Science"], name: "Science", icon: "applications-science" },
    MainCategory { keys: &["Settings"], name: "Settings", icon: "preferences-desktop" },
    MainCategory { keys: &["System"], name: "System", icon: "applications-system" },
];

const OTHER: MainCategory = MainCategory { keys: &[], name: "Other", icon: "applications-other" };

/// Installed applications, read from `.desktop` files and grouped by their
/// main freedesktop category.
#[derive(Debug, Clone)]
pub struct DesktopMenuSource {
    dirs: Vec<PathBuf>,
}

impl DesktopMenuSource {
    /// Earlier directories shadow entries with the same desktop-id in later ones.
    pub fn new(dirs: Vec<PathBuf>) -> Self {
        Self { dirs }
    }

    /// Extra directories first, then the user data directory, then
    /// `$XDG_DATA_DIRS` when `scan_system` is set.
    pub fn from_xdg(extra_dirs: &[PathBuf], scan_system: bool) -> Self {
        let mut dirs: Vec<PathBuf> = extra_dirs.to_vec();

        if let Some(base_dirs) = BaseDirs::new() {
            dirs.push(base_dirs.data_dir().join("applications"));
        }

        if scan_system {
            let data_dirs = env::var("XDG_DATA_DIRS")
                .ok()
                .filter(|value| !value.is_empty())
                .unwrap_or_else(|| "/usr/local/share:/usr/share".to_string());
            dirs.extend(
                data_dirs
                    .split(':')
                    .filter(|dir| !dir.is_empty())
                    .map(|dir| Path::new(dir).join("applications")),
            );
        }

        let mut seen = HashSet::new();
        dirs.retain(|dir| seen.insert(dir.clone()));
        Self { dirs }
    }

    pub fn dirs(&self) -> &[PathBuf] {
        &self.dirs
    }
}

impl MenuSource for DesktopMenuSource {
    fn name(&self) -> &str {
        "applications"
    }

    fn load(&self, desktop: Option<&str>) -> Result<MenuNode, SourceError> {
        let mut groups: Vec<MenuNode> = MAIN_CATEGORIES
            .iter()
            .chain(std::iter::once(&OTHER))
            .map(|category| MenuNode {
                directory: Some(MenuDirectory::new(category.name, Some(category.icon))),
                ..MenuNode::default()
            })
            .collect();
        let mut seen = HashSet::new();
        let mut count = 0;

        for dir in &self.dirs {
            if !dir.is_dir() {
                continue;
            }
            debug!("Scanning desktop files in {:?}", dir);

            let files = WalkDir::new(dir)
                .follow_links(true)
                .sort_by_file_name()
                .into_iter()
                .filter_map(Result::ok)
                .filter(|entry| entry.file_type().is_file())
                .filter(|entry| entry.path().extension().and_then(|s| s.to_str()) == Some("desktop"));

            for file in files {
                let path = file.path();
                let Some(desktop_id) = desktop_id(dir, path) else {
                    continue;
                };
                if !seen.insert(desktop_id.clone()) {
                    continue;
                }

                let content = match read_entry(path) {
                    Ok(content) => content,
                    Err(e) => {
                        debug!("Skipping desktop file: {}", e);
                        continue;
                    }
                };
                let Some(parsed) = DesktopFile::parse(&content) else {
                    debug!("Skipping {:?}: not an application entry", path);
                    continue;
                };
                // Hidden means deleted, and still shadows later directories
                if parsed.hidden {
                    continue;
                }

                let indices = parsed.main_categories();
                let entry = parsed.into_menu_entry(desktop_id, path, desktop);
                for index in indices {
                    groups[index].elements.push(MenuElement::Item(entry.clone()));
                }
                count += 1;
            }
        }

        info!("DesktopMenuSource: found {} entries", count);
        Ok(MenuNode {
            directory: None,
            elements: groups.into_iter().map(MenuElement::Menu).collect(),
            origin: None,
        })
    }

    fn watch(&self, targets: &[PathBuf], listener: ChangeListener) -> Result<Subscription, SourceError> {
        let mut dirs: BTreeSet<PathBuf> = self.dirs.iter().filter(|dir| dir.is_dir()).cloned().collect();
        for target in targets {
            let dir = if target.is_dir() {
                Some(target.as_path())
            } else {
                target.parent()
            };
            if let Some(dir) = dir.filter(|dir| dir.is_dir()) {
                dirs.insert(dir.to_path_buf());
            }
        }

        if dirs.is_empty() {
            return Ok(Subscription::inert());
        }

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<notify::Event>| match res {
                Ok(ev) => {
                    if matches!(
                        ev.kind,
                        EventKind::Modify(_) | EventKind::Create(_) | EventKind::Remove(_)
                    ) {
                        listener();
                    }
                }
                Err(e) => warn!("watch error: {:?}", e),
            },
            Config::default(),
        )?;
        for dir in &dirs {
            watcher.watch(dir, RecursiveMode::NonRecursive)?;
        }
        debug!("Watching {} application directories", dirs.len());
        Ok(Subscription::new(watcher))
    }
}

fn read_entry(path: &Path) -> Result<Vec<u8>, SourceError> {
    fs::read(path).map_err(|source| SourceError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// `kde/konsole.desktop` under a data dir becomes `kde-konsole.desktop`.
fn desktop_id(dir: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(dir).ok()?;
    let parts: Option<Vec<&str>> = relative.components().map(|c| c.as_os_str().to_str()).collect();
    Some(parts?.join("-"))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section<'a> {
    None,
    Entry,
    Action(&'a str),
    Other,
}

#[derive(Debug, Default)]
struct DesktopFile {
    entry_type: Option<String>,
    name: Option<String>,
    generic_name: Option<String>,
    comment: Option<String>,
    icon: Option<String>,
    exec: Option<String>,
    path: Option<String>,
    terminal: bool,
    no_display: bool,
    hidden: bool,
    startup_notify: bool,
    only_show_in: Vec<String>,
    not_show_in: Vec<String>,
    categories: Vec<String>,
    actions: Vec<String>,
    action_groups: HashMap<String, MenuEntryAction>,
}

impl DesktopFile {
    /// `None` unless the file has a `[Desktop Entry]` group of type
    /// Application. Values that are not valid UTF-8 are treated as absent.
    fn parse(content: &[u8]) -> Option<Self> {
        let mut file = DesktopFile::default();
        let mut section = Section::None;
        let mut has_entry = false;

        for line in content.split(|&b| b == b'\n') {
            let line = line.trim_ascii();
            if line.is_empty() || line.starts_with(b"#") {
                continue;
            }

            if line.starts_with(b"[") {
                let header = std::str::from_utf8(line).unwrap_or("");
                section = if header == "[Desktop Entry]" {
                    has_entry = true;
                    Section::Entry
                } else if let Some(id) = header
                    .strip_prefix("[Desktop Action ")
                    .and_then(|rest| rest.strip_suffix(']'))
                {
                    Section::Action(id)
                } else {
                    Section::Other
                };
                continue;
            }

            let Some(eq) = line.iter().position(|&b| b == b'=') else {
                continue;
            };
            let Ok(key) = std::str::from_utf8(line[..eq].trim_ascii()) else {
                continue;
            };
            // Localized keys are not used
            if key.contains('[') {
                continue;
            }
            let value = std::str::from_utf8(line[eq + 1..].trim_ascii())
                .ok()
                .map(unescape);

            match section {
                Section::Entry => file.set(key, value),
                Section::Action(id) => {
                    let action = file.action_groups.entry(id.to_string()).or_default();
                    match key {
                        "Name" => action.name = value,
                        "Icon" => action.icon = value,
                        "Exec" => action.command = value,
                        _ => {}
                    }
                }
                Section::None | Section::Other => {}
            }
        }

        if !has_entry {
            return None;
        }
        match file.entry_type.as_deref() {
            None | Some("Application") => Some(file),
            Some(_) => None,
        }
    }

    fn set(&mut self, key: &str, value: Option<String>) {
        let flag = |value: &Option<String>| value.as_deref() == Some("true");
        match key {
            "Type" => self.entry_type = value,
            "Name" => self.name = value,
            "GenericName" => self.generic_name = value,
            "Comment" => self.comment = value,
            "Icon" => self.icon = value,
            "Exec" => self.exec = value,
            "Path" => self.path = value,
            "Terminal" => self.terminal = flag(&value),
            "NoDisplay" => self.no_display = flag(&value),
            "Hidden" => self.hidden = flag(&value),
            "StartupNotify" => self.startup_notify = flag(&value),
            "OnlyShowIn" => self.only_show_in = split_list(value),
            "NotShowIn" => self.not_show_in = split_list(value),
            "Categories" => self.categories = split_list(value),
            "Actions" => self.actions = split_list(value),
            _ => {}
        }
    }

    /// With no desktop environment configured, per-desktop keys are ignored.
    fn is_visible(&self, desktop: Option<&str>) -> bool {
        if self.no_display {
            return false;
        }
        let Some(desktop) = desktop else {
            return true;
        };

        let current: Vec<&str> = desktop.split(':').filter(|d| !d.is_empty()).collect();
        let shown_here = |list: &[String]| list.iter().any(|d| current.contains(&d.as_str()));

        if !self.only_show_in.is_empty() && !shown_here(&self.only_show_in) {
            return false;
        }
        !shown_here(&self.not_show_in)
    }

    /// Indices into the main category table; falls back to "Other".
    fn main_categories(&self) -> Vec<usize> {
        let mut indices = Vec::new();
        for category in &self.categories {
            if let Some(index) = MAIN_CATEGORIES
                .iter()
                .position(|main| main.keys.contains(&category.as_str()))
            {
                if !indices.contains(&index) {
                    indices.push(index);
                }
            }
        }
        if indices.is_empty() {
            indices.push(MAIN_CATEGORIES.len());
        }
        indices
    }

    fn into_menu_entry(mut self, desktop_id: String, path: &Path, desktop: Option<&str>) -> MenuEntry {
        let visible = self.is_visible(desktop);
        let actions = self
            .actions
            .iter()
            .filter_map(|id| self.action_groups.remove(id))
            .collect();

        MenuEntry {
            desktop_id,
            name: self.name,
            generic_name: self.generic_name,
            comment: self.comment,
            icon: self.icon,
            command: self.exec,
            working_dir: self.path.filter(|p| !p.is_empty()).map(PathBuf::from),
            uri: Some(format!("file://{}", path.display())),
            source: Some(path.to_path_buf()),
            requires_terminal: self.terminal,
            startup_notify: self.startup_notify,
            visible,
            actions,
        }
    }
}

fn split_list(value: Option<String>) -> Vec<String> {
    value
        .map(|value| {
            value
                .split(';')
                .map(str::trim)
                .filter(|item| !item.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Undoes the `\s \n \t \r \\` escapes of desktop entry string values.
fn unescape(value: &str) -> String {
    let mut result = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            result.push(c);
            continue;
        }
        match chars.next() {
            Some('s') => result.push(' '),
            Some('n') => result.push('\n'),
            Some('t') => result.push('\t'),
            Some('r') => result.push('\r'),
            Some('\\') => result.push('\\'),
            Some(other) => {
                result.push('\\');
                result.push(other);
            }
            None => result.push('\\'),
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn unique_temp_dir(label: &str) -> PathBuf {
        let unique = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock should be after unix epoch")
            .as_nanos();
        let dir = env::temp_dir().join(format!(
            "appmenu-{label}-{}-{unique}",
            std::process::id()
        ));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn items(node: &MenuNode) -> Vec<(String, String)> {
        let mut found = Vec::new();
        for element in &node.elements {
            if let MenuElement::Menu(menu) = element {
                let group = menu.directory.as_ref().unwrap().name.clone();
                for element in &menu.elements {
                    if let MenuElement::Item(item) = element {
                        found.push((group.clone(), item.desktop_id.clone()));
                    }
                }
            }
        }
        found
    }

    const FIREFOX: &str = "[Desktop Entry]
Type=Application
Name=Firefox
Name[de]=Feuerfuchs
GenericName=Web Browser
Comment=Browse\\sthe Web
Icon=firefox.png
Exec=firefox %u
Categories=Network;WebBrowser;
Actions=new-window;missing;

[Desktop Action new-window]
Name=New Window
Exec=firefox --new-window %u
";

    #[test]
    fn parses_entry_fields_and_actions() {
        let file = DesktopFile::parse(FIREFOX.as_bytes()).unwrap();
        assert_eq!(file.name.as_deref(), Some("Firefox"));
        assert_eq!(file.comment.as_deref(), Some("Browse the Web"));
        assert_eq!(file.categories, ["Network", "WebBrowser"]);
        assert_eq!(file.main_categories(), [5]);

        let entry = file.into_menu_entry(
            "firefox.desktop".to_string(),
            Path::new("/usr/share/applications/firefox.desktop"),
            None,
        );
        assert!(entry.visible);
        assert_eq!(entry.actions.len(), 1);
        assert_eq!(entry.actions[0].name.as_deref(), Some("New Window"));
        assert_eq!(
            entry.uri.as_deref(),
            Some("file:///usr/share/applications/firefox.desktop")
        );
    }

    #[test]
    fn rejects_non_applications() {
        assert!(DesktopFile::parse(b"[Desktop Entry]\nType=Link\nName=Site\n").is_none());
        assert!(DesktopFile::parse(b"Name=No group\n").is_none());
    }

    #[test]
    fn invalid_utf8_values_are_absent() {
        let content = b"[Desktop Entry]\nName=\xff\xfe\nExec=tool\n";
        let file = DesktopFile::parse(content).unwrap();
        assert!(file.name.is_none());
        assert_eq!(file.exec.as_deref(), Some("tool"));
    }

    #[test]
    fn visibility_follows_desktop_environment() {
        let file = DesktopFile::parse(b"[Desktop Entry]\nName=A\nOnlyShowIn=XFCE;\n").unwrap();
        assert!(file.is_visible(Some("XFCE")));
        assert!(file.is_visible(Some("ubuntu:XFCE")));
        assert!(!file.is_visible(Some("GNOME")));
        assert!(file.is_visible(None));

        let file = DesktopFile::parse(b"[Desktop Entry]\nName=B\nNotShowIn=KDE;\n").unwrap();
        assert!(!file.is_visible(Some("KDE")));
        assert!(file.is_visible(Some("XFCE")));

        let file = DesktopFile::parse(b"[Desktop Entry]\nName=C\nNoDisplay=true\n").unwrap();
        assert!(!file.is_visible(None));
    }

    #[test]
    fn uncategorized_entries_go_to_other() {
        let file = DesktopFile::parse(b"[Desktop Entry]\nName=A\nCategories=Audio;Video;Game;\n").unwrap();
        assert_eq!(file.main_categories(), [6, 3]);
        let file = DesktopFile::parse(b"[Desktop Entry]\nName=B\n").unwrap();
        assert_eq!(file.main_categories(), [MAIN_CATEGORIES.len()]);
    }

    #[test]
    fn scans_directories_with_shadowing() {
        let user = unique_temp_dir("user-apps");
        let system = unique_temp_dir("system-apps");
        fs::create_dir_all(system.join("kde")).unwrap();

        fs::write(user.join("firefox.desktop"), FIREFOX).unwrap();
        fs::write(
            system.join("firefox.desktop"),
            "[Desktop Entry]\nName=Old Firefox\nExec=firefox\nCategories=Network;\n",
        )
        .unwrap();
        fs::write(
            system.join("kde").join("konsole.desktop"),
            "[Desktop Entry]\nName=Konsole\nExec=konsole\nCategories=System;Utility;\n",
        )
        .unwrap();
        fs::write(user.join("gone.desktop"), "[Desktop Entry]\nName=Gone\nHidden=true\n").unwrap();
        fs::write(system.join("gone.desktop"), "[Desktop Entry]\nName=Gone\nExec=gone\n").unwrap();
        fs::write(system.join("notes.txt"), "not an entry").unwrap();

        let source = DesktopMenuSource::new(vec![user.clone(), system.clone()]);
        let root = source.load(Some("XFCE")).unwrap();
        assert!(root.directory.is_none());

        assert_eq!(
            items(&root),
            [
                ("Accessories".to_string(), "kde-konsole.desktop".to_string()),
                ("Internet".to_string(), "firefox.desktop".to_string()),
                ("System".to_string(), "kde-konsole.desktop".to_string()),
            ]
        );

        fs::remove_dir_all(user).unwrap();
        fs::remove_dir_all(system).unwrap();
    }

    #[test]
    fn missing_directories_load_as_empty() {
        let source = DesktopMenuSource::new(vec![PathBuf::from("/nonexistent/appmenu/applications")]);
        let root = source.load(None).unwrap();
        assert!(items(&root).is_empty());
        let subscription = source.watch(&[], std::sync::Arc::new(|| {})).unwrap();
        assert!(!subscription.is_active());
    }

    #[test]
    fn unescapes_string_values() {
        assert_eq!(unescape(r"a\sb\\c\td\q"), "a b\\c\td\\q");
    }
}
