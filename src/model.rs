use crate::error::LaunchError;
use crate::executor::SpawnRequest;
use crate::launcher::{DesktopAction, Launcher};
use crate::run_action::RunAction;
use crate::search_action::SearchAction;

/// Position of a launcher in the catalog's flat index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LauncherId(pub(crate) usize);

impl LauncherId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Anything that can show up in a menu or result list and be run.
#[derive(Debug, Clone, Copy)]
pub enum Item<'a> {
    Launcher(&'a Launcher),
    Run(&'a RunAction),
    Search(&'a SearchAction),
}

impl<'a> Item<'a> {
    pub fn display_text(&self) -> &'a str {
        match *self {
            Item::Launcher(launcher) => launcher.display_name(),
            Item::Run(action) => action.display_text(),
            Item::Search(action) => action.name(),
        }
    }

    pub fn tooltip(&self) -> &'a str {
        match *self {
            Item::Launcher(launcher) => launcher.description(),
            Item::Run(action) => action.display_text(),
            Item::Search(_) => "Search Action",
        }
    }

    pub fn icon(&self) -> Option<&'a str> {
        match *self {
            Item::Launcher(launcher) => launcher.icon(),
            Item::Run(action) => Some(action.icon()),
            Item::Search(action) => Some(action.icon()),
        }
    }

    /// Command shown to the user when running the item fails.
    pub fn display_command(&self) -> &'a str {
        match *self {
            Item::Launcher(launcher) => launcher.command(),
            Item::Run(action) => action.command_line(),
            Item::Search(action) => action.expanded_command(),
        }
    }

    /// `action` only applies to launchers; `terminal` prefixes commands of
    /// entries that need a terminal.
    pub fn spawn_request(
        &self,
        action: Option<&DesktopAction>,
        terminal: Option<&str>,
    ) -> Result<SpawnRequest, LaunchError> {
        match *self {
            Item::Launcher(launcher) => launcher.spawn_request(action, terminal),
            Item::Run(run) => run.spawn_request(),
            Item::Search(search) => search.spawn_request(),
        }
    }
}
