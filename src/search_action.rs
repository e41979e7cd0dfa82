use crate::error::LaunchError;
use crate::executor::SpawnRequest;
use crate::query::{Query, NO_MATCH};
use log::warn;
use regex::{Captures, Regex};

#[derive(Debug, Clone)]
enum Pattern {
    Pending,
    Compiled(Regex),
    Invalid,
}

/// A user-defined rule turning queries that match a regex into a command.
///
/// The command template refers to capture groups as `\0`..`\9` or
/// `\g<name>`; `\\` is a literal backslash.
#[derive(Debug, Clone)]
pub struct SearchAction {
    name: String,
    pattern: String,
    command: String,
    regex: Pattern,
    expanded_command: String,
}

impl SearchAction {
    pub fn new(name: &str, pattern: &str, command: &str) -> Self {
        Self {
            name: name.to_string(),
            pattern: pattern.to_string(),
            command: command.to_string(),
            regex: Pattern::Pending,
            expanded_command: String::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn icon(&self) -> &str {
        "folder-saved-search"
    }

    /// Command produced by the last successful match.
    pub fn expanded_command(&self) -> &str {
        &self.expanded_command
    }

    /// Matches the raw query text. The rank is the pattern length.
    pub fn search(&mut self, query: &Query) -> u32 {
        if self.pattern.is_empty() || self.command.is_empty() {
            return NO_MATCH;
        }

        if matches!(self.regex, Pattern::Pending) {
            self.regex = match Regex::new(&self.pattern) {
                Ok(regex) => Pattern::Compiled(regex),
                Err(e) => {
                    warn!("Search action '{}' has an invalid pattern: {}", self.name, e);
                    Pattern::Invalid
                }
            };
        }

        let Pattern::Compiled(regex) = &self.regex else {
            return NO_MATCH;
        };

        match regex.captures(query.raw()) {
            Some(captures) => {
                self.expanded_command = expand_references(&self.command, &captures);
                u32::try_from(self.pattern.len()).unwrap_or(NO_MATCH - 1)
            }
            None => NO_MATCH,
        }
    }

    pub fn spawn_request(&self) -> Result<SpawnRequest, LaunchError> {
        SpawnRequest::from_command_line(&self.expanded_command)
    }
}

fn expand_references(template: &str, captures: &Captures<'_>) -> String {
    let mut expanded = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(pos) = rest.find('\\') {
        expanded.push_str(&rest[..pos]);
        rest = &rest[pos + 1..];

        let mut chars = rest.chars();
        match chars.next() {
            Some(digit @ '0'..='9') => {
                let group = digit as usize - '0' as usize;
                if let Some(m) = captures.get(group) {
                    expanded.push_str(m.as_str());
                }
                rest = chars.as_str();
            }
            Some('g') if chars.as_str().starts_with('<') => {
                let body = &chars.as_str()[1..];
                match body.find('>') {
                    Some(end) => {
                        let reference = &body[..end];
                        let value = match reference.parse::<usize>() {
                            Ok(group) => captures.get(group),
                            Err(_) => captures.name(reference),
                        };
                        if let Some(m) = value {
                            expanded.push_str(m.as_str());
                        }
                        rest = &body[end + 1..];
                    }
                    None => {
                        expanded.push('\\');
                    }
                }
            }
            Some('\\') => {
                expanded.push('\\');
                rest = chars.as_str();
            }
            _ => expanded.push('\\'),
        }
    }

    expanded.push_str(rest);
    expanded
}
