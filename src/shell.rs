use crate::error::ShellError;
use crate::executor::{self, ErrorDialog, SpawnRequest, Spawner};
use log::debug;
use std::env;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

/// Splits a command line into an argument vector the way a POSIX shell
/// would, without expanding variables, globs or substitutions.
pub fn split(command_line: &str) -> Result<Vec<String>, ShellError> {
    let mut argv = Vec::new();
    let mut current: Option<String> = None;
    let mut chars = command_line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            ' ' | '\t' | '\n' => {
                if let Some(word) = current.take() {
                    argv.push(word);
                }
            }
            '#' if current.is_none() => {
                // Comment runs to the end of the line
                for c in chars.by_ref() {
                    if c == '\n' {
                        break;
                    }
                }
            }
            '\'' => {
                let word = current.get_or_insert_with(String::new);
                loop {
                    match chars.next() {
                        Some('\'') => break,
                        Some(c) => word.push(c),
                        None => return Err(ShellError::UnmatchedQuote('\'')),
                    }
                }
            }
            '"' => {
                let word = current.get_or_insert_with(String::new);
                loop {
                    match chars.next() {
                        Some('"') => break,
                        Some('\\') => match chars.next() {
                            Some(c @ ('"' | '\\' | '$' | '`')) => word.push(c),
                            Some('\n') => {}
                            Some(c) => {
                                word.push('\\');
                                word.push(c);
                            }
                            None => return Err(ShellError::UnmatchedQuote('"')),
                        },
                        Some(c) => word.push(c),
                        None => return Err(ShellError::UnmatchedQuote('"')),
                    }
                }
            }
            '\\' => match chars.next() {
                Some('\n') => {}
                Some(c) => current.get_or_insert_with(String::new).push(c),
                None => return Err(ShellError::TrailingBackslash),
            },
            c => current.get_or_insert_with(String::new).push(c),
        }
    }

    if let Some(word) = current.take() {
        argv.push(word);
    }

    if argv.is_empty() {
        return Err(ShellError::Empty);
    }
    Ok(argv)
}

/// Quotes text so that `split` returns it as a single unchanged word.
pub fn quote(text: &str) -> String {
    let mut quoted = String::with_capacity(text.len() + 2);
    quoted.push('\'');
    for c in text.chars() {
        if c == '\'' {
            quoted.push_str("'\\''");
        } else {
            quoted.push(c);
        }
    }
    quoted.push('\'');
    quoted
}

/// Resolves program names against the executable search path.
pub trait PathLookup {
    fn find_program(&self, program: &str) -> Option<PathBuf>;
}

/// Looks programs up in `$PATH`, or in a fixed list of directories.
#[derive(Debug, Clone, Default)]
pub struct SearchPath {
    dirs: Option<Vec<PathBuf>>,
}

impl SearchPath {
    /// Reads `$PATH` on every lookup.
    pub fn from_env() -> Self {
        Self { dirs: None }
    }

    pub fn with_dirs(dirs: Vec<PathBuf>) -> Self {
        Self { dirs: Some(dirs) }
    }

    fn search_dirs(&self) -> Vec<PathBuf> {
        match &self.dirs {
            Some(dirs) => dirs.clone(),
            None => env::var_os("PATH")
                .map(|path| env::split_paths(&path).collect())
                .unwrap_or_default(),
        }
    }
}

impl PathLookup for SearchPath {
    fn find_program(&self, program: &str) -> Option<PathBuf> {
        if program.is_empty() {
            return None;
        }

        if program.contains('/') {
            let path = Path::new(program);
            return is_executable(path).then(|| path.to_path_buf());
        }

        self.search_dirs()
            .into_iter()
            .map(|dir| dir.join(program))
            .find(|candidate| is_executable(candidate))
    }
}

fn is_executable(path: &Path) -> bool {
    match fs::metadata(path) {
        Ok(metadata) => metadata.is_file() && metadata.permissions().mode() & 0o111 != 0,
        Err(_) => false,
    }
}

/// True if the first word of `command_line` resolves on the search path.
pub fn is_runnable(command_line: &str, lookup: &dyn PathLookup) -> bool {
    match split(command_line) {
        Ok(argv) => argv.first().is_some_and(|program| lookup.find_program(program).is_some()),
        Err(_) => false,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandStatus {
    Unchecked,
    Invalid,
    Valid,
}

/// A configured command whose validity is checked once and cached.
///
/// Controls bound to an invalid command are disabled, not hidden.
#[derive(Debug, Clone)]
pub struct CommandCheck {
    label: String,
    icon: Option<String>,
    command: String,
    error_text: Option<String>,
    status: CommandStatus,
}

impl CommandCheck {
    pub fn new(command: &str) -> Self {
        Self {
            label: command.to_string(),
            icon: None,
            command: command.to_string(),
            error_text: None,
            status: CommandStatus::Unchecked,
        }
    }

    pub fn with_label(mut self, label: &str, icon: Option<&str>) -> Self {
        self.label = label.to_string();
        self.icon = icon.map(str::to_string);
        self
    }

    /// Message shown when the command fails to start.
    pub fn with_error_text(mut self, error_text: &str) -> Self {
        self.error_text = Some(error_text.to_string());
        self
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn icon(&self) -> Option<&str> {
        self.icon.as_deref()
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn error_text(&self) -> String {
        match &self.error_text {
            Some(text) => text.clone(),
            None => format!("Failed to execute command \"{}\".", self.command),
        }
    }

    pub fn status(&self) -> CommandStatus {
        self.status
    }

    pub fn set(&mut self, command: &str) {
        if command == self.command {
            return;
        }
        self.command = command.to_string();
        self.status = CommandStatus::Unchecked;
    }

    pub fn check(&mut self, lookup: &dyn PathLookup) -> bool {
        if self.status == CommandStatus::Unchecked {
            self.status = if is_runnable(&self.command, lookup) {
                CommandStatus::Valid
            } else {
                CommandStatus::Invalid
            };
        }
        self.status == CommandStatus::Valid
    }

    /// Starts the command unless it is disabled. Spawn failures go to
    /// `dialog` with this command's error text.
    pub fn activate(
        &mut self,
        lookup: &dyn PathLookup,
        spawner: &dyn Spawner,
        dialog: &dyn ErrorDialog,
    ) -> bool {
        if !self.check(lookup) {
            debug!("Command '{}' is disabled", self.command);
            return false;
        }
        let request = SpawnRequest::from_command_line(&self.command);
        executor::launch_with_message(request, &self.error_text(), spawner, dialog)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LaunchError;
    use std::cell::{Cell, RefCell};
    use std::io;

    struct CountingLookup {
        known: &'static [&'static str],
        calls: Cell<usize>,
    }

    impl PathLookup for CountingLookup {
        fn find_program(&self, program: &str) -> Option<PathBuf> {
            self.calls.set(self.calls.get() + 1);
            self.known
                .contains(&program)
                .then(|| PathBuf::from("/usr/bin").join(program))
        }
    }

    #[test]
    fn splits_plain_words() {
        assert_eq!(split("ls  -la\t/tmp").unwrap(), ["ls", "-la", "/tmp"]);
    }

    #[test]
    fn honors_quotes_and_escapes() {
        assert_eq!(
            split(r#"echo 'a b' "c \"d\" \x" e\ f"#).unwrap(),
            ["echo", "a b", r#"c "d" \x"#, "e f"]
        );
        assert_eq!(split("a''b").unwrap(), ["ab"]);
        assert_eq!(split("''").unwrap(), [""]);
    }

    #[test]
    fn skips_comments_at_word_start() {
        assert_eq!(split("run # trailing words").unwrap(), ["run"]);
        assert_eq!(split("a#b").unwrap(), ["a#b"]);
    }

    #[test]
    fn reports_malformed_input() {
        assert_eq!(split("   "), Err(ShellError::Empty));
        assert_eq!(split("echo 'oops"), Err(ShellError::UnmatchedQuote('\'')));
        assert_eq!(split("echo \"oops"), Err(ShellError::UnmatchedQuote('"')));
        assert_eq!(split("echo \\"), Err(ShellError::TrailingBackslash));
    }

    #[test]
    fn quoted_text_survives_split() {
        for text in ["App One", "it's", "", "$HOME \"x\""] {
            assert_eq!(split(&quote(text)).unwrap(), [text]);
        }
    }

    #[test]
    fn lookup_in_fixed_dirs() {
        let lookup = SearchPath::with_dirs(vec![PathBuf::from("/nonexistent-appmenu-dir")]);
        assert!(lookup.find_program("ls").is_none());
        assert!(lookup.find_program("").is_none());
    }

    #[test]
    fn command_check_is_cached_until_set() {
        let lookup = CountingLookup {
            known: &["menulibre"],
            calls: Cell::new(0),
        };
        let mut check = CommandCheck::new("menulibre --edit");
        assert_eq!(check.status(), CommandStatus::Unchecked);
        assert!(check.check(&lookup));
        assert!(check.check(&lookup));
        assert_eq!(lookup.calls.get(), 1);

        check.set("missing-editor");
        assert_eq!(check.status(), CommandStatus::Unchecked);
        assert!(!check.check(&lookup));
        assert_eq!(check.status(), CommandStatus::Invalid);
    }

    #[test]
    fn unparsable_command_is_not_runnable() {
        let lookup = CountingLookup {
            known: &["ls"],
            calls: Cell::new(0),
        };
        assert!(is_runnable("ls -l", &lookup));
        assert!(!is_runnable("'ls", &lookup));
        assert_eq!(lookup.calls.get(), 1);
    }

    #[derive(Default)]
    struct Recorder {
        spawned: RefCell<Vec<Vec<String>>>,
        errors: RefCell<Vec<String>>,
        fail: bool,
    }

    impl Spawner for Recorder {
        fn spawn(&self, request: &SpawnRequest) -> Result<(), LaunchError> {
            self.spawned.borrow_mut().push(request.argv.clone());
            if self.fail {
                return Err(LaunchError::Spawn {
                    program: request.argv[0].clone(),
                    source: io::Error::from(io::ErrorKind::PermissionDenied),
                });
            }
            Ok(())
        }
    }

    impl ErrorDialog for Recorder {
        fn show_error(&self, message: &str, _error: &LaunchError) {
            self.errors.borrow_mut().push(message.to_string());
        }
    }

    #[test]
    fn invalid_command_is_disabled() {
        let lookup = CountingLookup {
            known: &["xflock4"],
            calls: Cell::new(0),
        };
        let recorder = Recorder::default();
        let mut command = CommandCheck::new("mugshot")
            .with_label("Edit Profile", Some("avatar-default-symbolic"))
            .with_error_text("Failed to edit profile.");

        assert!(!command.activate(&lookup, &recorder, &recorder));
        assert_eq!(command.status(), CommandStatus::Invalid);
        assert!(recorder.spawned.borrow().is_empty());
        assert!(recorder.errors.borrow().is_empty());
    }

    #[test]
    fn valid_command_is_spawned() {
        let lookup = CountingLookup {
            known: &["xflock4"],
            calls: Cell::new(0),
        };
        let recorder = Recorder::default();
        let mut command = CommandCheck::new("xflock4 --now");

        assert!(command.activate(&lookup, &recorder, &recorder));
        assert_eq!(recorder.spawned.borrow().as_slice(), [vec!["xflock4", "--now"]]);
    }

    #[test]
    fn failed_spawn_reports_command_error_text() {
        let lookup = CountingLookup {
            known: &["xfce4-session-logout"],
            calls: Cell::new(0),
        };
        let recorder = Recorder {
            fail: true,
            ..Recorder::default()
        };
        let mut command = CommandCheck::new("xfce4-session-logout")
            .with_label("Shut Down", Some("system-shutdown-symbolic"))
            .with_error_text("Failed to shut down.");

        assert!(!command.activate(&lookup, &recorder, &recorder));
        assert_eq!(recorder.errors.borrow().as_slice(), ["Failed to shut down."]);

        let mut plain = CommandCheck::new("xfce4-session-logout");
        assert!(!plain.activate(&lookup, &recorder, &recorder));
        assert_eq!(
            recorder.errors.borrow().last().map(String::as_str),
            Some("Failed to execute command \"xfce4-session-logout\".")
        );
    }
}
