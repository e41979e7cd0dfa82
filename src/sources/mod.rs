use crate::error::SourceError;
use std::path::PathBuf;
use std::sync::Arc;

pub mod custom;
pub mod desktop;

/// Called from whatever thread notices a change in a menu source.
pub type ChangeListener = Arc<dyn Fn() + Send + Sync>;

/// Provider of a menu hierarchy.
pub trait MenuSource: Send + Sync {
    fn name(&self) -> &str;

    /// Loads the hierarchy root. `desktop` is the current desktop
    /// environment, used to evaluate per-desktop visibility.
    fn load(&self, desktop: Option<&str>) -> Result<MenuNode, SourceError>;

    /// Starts delivering change notifications for `targets` until the
    /// returned subscription is dropped.
    fn watch(&self, targets: &[PathBuf], listener: ChangeListener) -> Result<Subscription, SourceError>;
}

/// Cancellation handle for a change listener; dropping it unregisters.
pub struct Subscription {
    guard: Option<Box<dyn Send>>,
}

impl Subscription {
    pub fn new(guard: impl Send + 'static) -> Self {
        Self {
            guard: Some(Box::new(guard)),
        }
    }

    /// A subscription for sources that never change.
    pub fn inert() -> Self {
        Self { guard: None }
    }

    pub fn is_active(&self) -> bool {
        self.guard.is_some()
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.is_active())
            .finish()
    }
}

#[derive(Debug, Clone, Default)]
pub struct MenuNode {
    /// `None` for the hierarchy root.
    pub directory: Option<MenuDirectory>,
    pub elements: Vec<MenuElement>,
    /// Location to watch for changes to this node, if it has one.
    pub origin: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub enum MenuElement {
    Menu(MenuNode),
    Item(MenuEntry),
}

#[derive(Debug, Clone)]
pub struct MenuDirectory {
    pub name: String,
    pub icon: Option<String>,
    pub visible: bool,
}

impl MenuDirectory {
    pub fn new(name: &str, icon: Option<&str>) -> Self {
        Self {
            name: name.to_string(),
            icon: icon.map(str::to_string),
            visible: true,
        }
    }
}

/// One leaf item of a menu hierarchy. Text fields are `None` when absent or
/// not valid UTF-8.
#[derive(Debug, Clone, Default)]
pub struct MenuEntry {
    pub desktop_id: String,
    pub name: Option<String>,
    pub generic_name: Option<String>,
    pub comment: Option<String>,
    pub icon: Option<String>,
    pub command: Option<String>,
    pub working_dir: Option<PathBuf>,
    /// Location of the entry, e.g. `file:///usr/share/applications/x.desktop`.
    pub uri: Option<String>,
    pub source: Option<PathBuf>,
    pub requires_terminal: bool,
    pub startup_notify: bool,
    pub visible: bool,
    pub actions: Vec<MenuEntryAction>,
}

impl MenuEntry {
    pub fn new(desktop_id: &str, name: &str, command: &str) -> Self {
        Self {
            desktop_id: desktop_id.to_string(),
            name: Some(name.to_string()),
            command: Some(command.to_string()),
            visible: true,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct MenuEntryAction {
    pub name: Option<String>,
    pub icon: Option<String>,
    pub command: Option<String>,
}
