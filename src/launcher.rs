use crate::error::LaunchError;
use crate::executor::SpawnRequest;
use crate::query::{normalize, Query, NO_MATCH};
use crate::shell;
use crate::sources::{MenuEntry, MenuEntryAction};
use std::path::{Path, PathBuf};

/// Width of one priority band. Raw match ranks are clamped below it so a
/// match in a better field always wins over any match in a worse one.
pub const TIER_SPAN: u32 = 0x1_0000;
pub const NAME_TIER: u32 = TIER_SPAN;
pub const GENERIC_NAME_TIER: u32 = 2 * TIER_SPAN;
/// Reserved for the run-command fallback, between generic names and comments.
pub const RUN_TIER: u32 = 3 * TIER_SPAN;
pub const COMMENT_TIER: u32 = 4 * TIER_SPAN;
pub const COMMAND_TIER: u32 = 5 * TIER_SPAN;

/// A named alternative way of starting an application, e.g. "New Window".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DesktopAction {
    name: String,
    icon: Option<String>,
    command: String,
}

impl DesktopAction {
    fn new(action: &MenuEntryAction) -> Self {
        Self {
            name: action.name.clone().unwrap_or_default(),
            icon: action.icon.as_deref().map(icon_name),
            command: action.command.clone().unwrap_or_default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn icon(&self) -> Option<&str> {
        self.icon.as_deref()
    }

    pub fn command(&self) -> &str {
        &self.command
    }
}

#[derive(Debug, Clone)]
pub struct Launcher {
    desktop_id: String,
    display_name: String,
    generic_name: String,
    description: String,
    icon: Option<String>,
    command: String,
    working_dir: Option<PathBuf>,
    uri: Option<String>,
    requires_terminal: bool,
    startup_notify: bool,
    actions: Vec<DesktopAction>,

    search_name: String,
    search_generic_name: String,
    search_comment: String,
    search_command: String,
}

impl Launcher {
    pub fn new(entry: &MenuEntry) -> Self {
        let display_name = entry.name.clone().unwrap_or_default();
        let generic_name = entry.generic_name.clone().unwrap_or_default();
        let description = entry
            .comment
            .clone()
            .unwrap_or_else(|| generic_name.clone());
        let command = entry.command.clone().unwrap_or_default();

        Self {
            search_name: normalize(&display_name),
            search_generic_name: normalize(&generic_name),
            search_comment: normalize(&description),
            search_command: normalize(&command),

            desktop_id: entry.desktop_id.clone(),
            display_name,
            generic_name,
            description,
            icon: entry.icon.as_deref().map(icon_name),
            command,
            working_dir: entry.working_dir.clone(),
            uri: entry.uri.clone(),
            requires_terminal: entry.requires_terminal,
            startup_notify: entry.startup_notify,
            actions: entry.actions.iter().map(DesktopAction::new).collect(),
        }
    }

    pub fn desktop_id(&self) -> &str {
        &self.desktop_id
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn generic_name(&self) -> &str {
        &self.generic_name
    }

    /// Comment, or the generic name when the entry has none.
    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn icon(&self) -> Option<&str> {
        self.icon.as_deref()
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn requires_terminal(&self) -> bool {
        self.requires_terminal
    }

    pub fn actions(&self) -> &[DesktopAction] {
        &self.actions
    }

    /// Checks name, generic name, description and command in that order;
    /// the first field that matches decides the tier.
    pub fn search(&self, query: &Query) -> u32 {
        let fields = [
            (&self.search_name, NAME_TIER),
            (&self.search_generic_name, GENERIC_NAME_TIER),
            (&self.search_comment, COMMENT_TIER),
            (&self.search_command, COMMAND_TIER),
        ];

        for (text, tier) in fields {
            let rank = query.match_text(text);
            if rank != NO_MATCH {
                return tier + rank.min(TIER_SPAN - 1);
            }
        }

        NO_MATCH
    }

    /// Builds the process request for the launcher itself, or for one of
    /// its sub-actions. `terminal` prefixes commands of terminal entries.
    pub fn spawn_request(
        &self,
        action: Option<&DesktopAction>,
        terminal: Option<&str>,
    ) -> Result<SpawnRequest, LaunchError> {
        let command_line = match action {
            Some(action) => self.action_command_line(action),
            None => self.command_line(terminal),
        }
        .ok_or(LaunchError::EmptyCommand)?;

        let argv = shell::split(&command_line)?;
        Ok(SpawnRequest {
            argv,
            display_command: match action {
                Some(action) => action.command.clone(),
                None => self.command.clone(),
            },
            working_dir: self.working_dir.clone(),
            startup_notify: self.startup_notify,
            icon: action
                .and_then(DesktopAction::icon)
                .or(self.icon())
                .map(str::to_string),
        })
    }

    /// Expanded command line, or `None` if the entry has no command.
    pub fn command_line(&self, terminal: Option<&str>) -> Option<String> {
        if self.command.trim().is_empty() {
            return None;
        }

        let template = match terminal {
            Some(terminal) if self.requires_terminal && !terminal.trim().is_empty() => {
                format!("{} {}", terminal.trim(), self.command)
            }
            _ => self.command.clone(),
        };

        Some(expand_field_codes(
            &template,
            self.icon(),
            &self.display_name,
            self.uri.as_deref(),
        ))
    }

    pub fn action_command_line(&self, action: &DesktopAction) -> Option<String> {
        if action.command.trim().is_empty() {
            return None;
        }
        Some(expand_field_codes(
            &action.command,
            action.icon(),
            &action.name,
            self.uri.as_deref(),
        ))
    }
}

/// Expands desktop-entry field codes in one left-to-right pass.
///
/// `%i`, `%c` and `%k` become quoted icon, name and location (or vanish when
/// the value is missing), `%%` becomes `%`, and every other code, including
/// the file and URL codes, is dropped.
pub fn expand_field_codes(
    template: &str,
    icon: Option<&str>,
    name: &str,
    uri: Option<&str>,
) -> String {
    let mut expanded = String::with_capacity(template.len());
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '%' {
            expanded.push(c);
            continue;
        }

        match chars.next() {
            Some('i') => {
                if let Some(icon) = icon.filter(|icon| !icon.is_empty()) {
                    expanded.push_str("--icon ");
                    expanded.push_str(&shell::quote(icon));
                }
            }
            Some('c') => {
                if !name.is_empty() {
                    expanded.push_str(&shell::quote(name));
                }
            }
            Some('k') => {
                if let Some(uri) = uri.filter(|uri| !uri.is_empty()) {
                    expanded.push_str(&shell::quote(uri));
                }
            }
            Some('%') => expanded.push('%'),
            // %f %F %u %U and unknown codes
            Some(_) => {}
            None => expanded.push('%'),
        }
    }

    expanded
}

/// Icon theme names never carry an image suffix; absolute paths keep theirs.
fn icon_name(icon: &str) -> String {
    if Path::new(icon).is_absolute() {
        return icon.to_string();
    }

    if let Some(pos) = icon.rfind('.') {
        let suffix = icon[pos..].to_lowercase();
        if matches!(suffix.as_str(), ".png" | ".xpm" | ".svg" | ".svgz") {
            return icon[..pos].to_string();
        }
    }
    icon.to_string()
}
