use serde::Deserialize;
use std::path::PathBuf;
use directories::ProjectDirs;
use anyhow::Result;
use std::fs;
use crate::search_action::SearchAction;
use crate::shell::CommandCheck;

#[derive(Deserialize, Debug, Clone)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub sources: SourceConfig,
    #[serde(default = "default_search_actions")]
    pub search_actions: Vec<SearchActionConfig>,
    #[serde(default)]
    pub items: Vec<StaticEntry>,
    #[serde(default)]
    pub commands: CommandsConfig,
}

#[derive(Deserialize, Debug, Clone)]
pub struct GeneralConfig {
    /// Prefix for entries that ask for a terminal.
    #[serde(default = "default_terminal")]
    pub terminal: Option<String>,
    /// Desktop environment name(s), colon separated. Falls back to
    /// `XDG_CURRENT_DESKTOP` when unset.
    #[serde(default)]
    pub desktop: Option<String>,
    /// Keep second-level menu directories as nested subcategories.
    #[serde(default)]
    pub nested_categories: bool,
}

fn default_terminal() -> Option<String> { Some("x-terminal-emulator -e".to_string()) }

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            terminal: default_terminal(),
            desktop: None,
            nested_categories: false,
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct SourceConfig {
    #[serde(default)]
    pub application_dirs: Vec<PathBuf>,
    #[serde(default = "default_true")]
    pub scan_system: bool,
}

fn default_true() -> bool { true }

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            application_dirs: Vec::new(),
            scan_system: true,
        }
    }
}

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct SearchActionConfig {
    pub name: String,
    pub pattern: String,
    pub command: String,
}

impl SearchActionConfig {
    fn new(name: &str, pattern: &str, command: &str) -> Self {
        Self {
            name: name.to_string(),
            pattern: pattern.to_string(),
            command: command.to_string(),
        }
    }

    pub fn to_action(&self) -> SearchAction {
        SearchAction::new(&self.name, &self.pattern, &self.command)
    }
}

fn default_search_actions() -> Vec<SearchActionConfig> {
    vec![
        SearchActionConfig::new("Man Pages", r"^#(.+)$", r"x-terminal-emulator -e man \1"),
        SearchActionConfig::new("Web Search", r"^\?(.+)$", r"xdg-open https://duckduckgo.com/?q=\1"),
        SearchActionConfig::new("Wikipedia", r"^!w (.+)$", r"xdg-open https://en.wikipedia.org/wiki/\1"),
        SearchActionConfig::new("Run in Terminal", r"^!([^w].*|w\S.*|w)$", r"x-terminal-emulator -e \1"),
        SearchActionConfig::new("Open URI", r"^(file|http|https)://(.*)$", r"xdg-open \0"),
    ]
}

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct StaticEntry {
    pub name: String,
    pub command: String,
    pub icon: Option<String>,
    pub comment: Option<String>,
    #[serde(default)]
    pub terminal: bool,
}

/// Session and settings commands offered next to the menu.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct CommandsConfig {
    pub lock_screen: String,
    pub shut_down: String,
    pub software: String,
    pub settings: String,
    pub appearance: String,
    pub edit_profile: String,
    pub menu_editor: String,
}

impl Default for CommandsConfig {
    fn default() -> Self {
        Self {
            lock_screen: "xflock4".to_string(),
            shut_down: "xfce4-session-logout".to_string(),
            software: "gnome-software".to_string(),
            settings: "xfce4-settings-manager".to_string(),
            appearance: "zorin-appearance".to_string(),
            edit_profile: "mugshot".to_string(),
            menu_editor: "menulibre".to_string(),
        }
    }
}

impl CommandsConfig {
    /// Every command with its key, label, icon and failure message.
    pub fn checks(&self) -> Vec<(&'static str, CommandCheck)> {
        let command = |command: &str, label: &str, icon: &str, error: &str| {
            CommandCheck::new(command)
                .with_label(label, Some(icon))
                .with_error_text(error)
        };
        vec![
            ("lock_screen", command(&self.lock_screen, "Lock Screen", "changes-prevent-symbolic", "Failed to lock screen.")),
            ("shut_down", command(&self.shut_down, "Shut Down", "system-shutdown-symbolic", "Failed to shut down.")),
            ("software", command(&self.software, "Software", "gnome-software-symbolic", "Failed to open Software.")),
            ("settings", command(&self.settings, "Settings", "preferences-system-symbolic", "Failed to open settings manager.")),
            ("appearance", command(&self.appearance, "Appearance", "preferences-desktop-theme-symbolic", "Failed to open Appearance.")),
            ("edit_profile", command(&self.edit_profile, "Edit Profile", "avatar-default-symbolic", "Failed to edit profile.")),
            ("menu_editor", command(&self.menu_editor, "Edit Applications", "xfce4-menueditor", "Failed to launch menu editor.")),
        ]
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            general: GeneralConfig::default(),
            sources: SourceConfig::default(),
            search_actions: default_search_actions(),
            items: Vec::new(),
            commands: CommandsConfig::default(),
        }
    }
}

impl Config {
    pub fn search_actions(&self) -> Vec<SearchAction> {
        self.search_actions.iter().map(SearchActionConfig::to_action).collect()
    }
}

pub fn config_path() -> PathBuf {
    match ProjectDirs::from("org", "appmenu", "appmenu") {
        Some(dirs) => dirs.config_dir().join("config.toml"),
        None => PathBuf::from("config.toml"),
    }
}

pub fn load_config() -> Result<Config> {
    let config_path = config_path();
    if !config_path.exists() {
        return Ok(Config::default());
    }

    let content = fs::read_to_string(config_path)?;
    parse_config(&content)
}

pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content)?;
    Ok(config)
}
