use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ShellError {
    #[error("text was empty (or contained only whitespace)")]
    Empty,
    #[error("text ended before matching quote was found for {0}")]
    UnmatchedQuote(char),
    #[error("text ended right after a backslash")]
    TrailingBackslash,
}

#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("no command to run")]
    EmptyCommand,
    #[error("failed to parse command line: {0}")]
    Parse(#[from] ShellError),
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to watch menu directories: {0}")]
    Watch(#[from] notify::Error),
}
