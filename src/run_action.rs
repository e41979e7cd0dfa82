use crate::error::LaunchError;
use crate::executor::SpawnRequest;
use crate::launcher::RUN_TIER;
use crate::query::{Query, NO_MATCH};
use crate::shell::{self, PathLookup};

/// Offers to run the raw query text when it starts with a known program.
#[derive(Debug, Clone, Default)]
pub struct RunAction {
    command_line: String,
    display_text: String,
}

impl RunAction {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn icon(&self) -> &str {
        "system-run"
    }

    pub fn command_line(&self) -> &str {
        &self.command_line
    }

    pub fn display_text(&self) -> &str {
        &self.display_text
    }

    /// Sorts after name and generic-name matches, before comment and
    /// command matches.
    pub fn search(&mut self, query: &Query, lookup: &dyn PathLookup) -> u32 {
        if !shell::is_runnable(query.raw(), lookup) {
            return NO_MATCH;
        }

        self.command_line = query.raw().to_string();
        self.display_text = format!("Run {}", self.command_line);
        RUN_TIER
    }

    pub fn spawn_request(&self) -> Result<SpawnRequest, LaunchError> {
        SpawnRequest::from_command_line(&self.command_line)
    }
}
