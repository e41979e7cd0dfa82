use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::time::{SystemTime, UNIX_EPOCH};
use log::{debug, error};
use crate::error::LaunchError;
use crate::shell;

/// Everything needed to start one process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpawnRequest {
    pub argv: Vec<String>,
    /// Unexpanded command, used in error messages.
    pub display_command: String,
    pub working_dir: Option<PathBuf>,
    pub startup_notify: bool,
    pub icon: Option<String>,
}

impl SpawnRequest {
    /// Parses a plain shell command line.
    pub fn from_command_line(command_line: &str) -> Result<Self, LaunchError> {
        if command_line.trim().is_empty() {
            return Err(LaunchError::EmptyCommand);
        }
        Ok(Self {
            argv: shell::split(command_line)?,
            display_command: command_line.to_string(),
            working_dir: None,
            startup_notify: false,
            icon: None,
        })
    }
}

pub trait Spawner {
    fn spawn(&self, request: &SpawnRequest) -> Result<(), LaunchError>;
}

/// Starts detached child processes on the current display.
#[derive(Debug, Default, Clone)]
pub struct ProcessSpawner;

impl Spawner for ProcessSpawner {
    fn spawn(&self, request: &SpawnRequest) -> Result<(), LaunchError> {
        let (program, args) = request
            .argv
            .split_first()
            .ok_or(LaunchError::EmptyCommand)?;

        let mut command = Command::new(program);
        command.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());

        if let Some(dir) = request.working_dir.as_ref().filter(|dir| dir.is_dir()) {
            command.current_dir(dir);
        }

        if request.startup_notify {
            command.env("DESKTOP_STARTUP_ID", startup_id(program));
        }

        debug!("Spawning {:?}", request.argv);
        command.spawn().map_err(|source| LaunchError::Spawn {
            program: program.clone(),
            source,
        })?;

        Ok(())
    }
}

fn startup_id(program: &str) -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    format!("appmenu-{}-{}-{}_TIME0", std::process::id(), program, nanos)
}

/// Where launch failures end up for the user to see.
pub trait ErrorDialog {
    fn show_error(&self, message: &str, error: &LaunchError);
}

/// Logs failures and prints them to stderr.
#[derive(Debug, Default, Clone)]
pub struct LogDialog;

impl ErrorDialog for LogDialog {
    fn show_error(&self, message: &str, error: &LaunchError) {
        error!("{}: {}", message, error);
        eprintln!("{}\n{}", message, error);
    }
}

/// Spawns `request` and reports any failure through `dialog`.
///
/// Failures are never retried and never propagate past this point.
pub fn launch(
    request: Result<SpawnRequest, LaunchError>,
    display_command: &str,
    spawner: &dyn Spawner,
    dialog: &dyn ErrorDialog,
) -> bool {
    let message = format!("Failed to execute command \"{}\".", display_command);
    launch_with_message(request, &message, spawner, dialog)
}

/// Like `launch`, with a caller-provided dialog message.
pub fn launch_with_message(
    request: Result<SpawnRequest, LaunchError>,
    message: &str,
    spawner: &dyn Spawner,
    dialog: &dyn ErrorDialog,
) -> bool {
    let result = request.and_then(|request| spawner.spawn(&request));
    match result {
        Ok(()) => true,
        // Nothing to run is not worth a dialog
        Err(LaunchError::EmptyCommand) => false,
        Err(e) => {
            dialog.show_error(message, &e);
            false
        }
    }
}
