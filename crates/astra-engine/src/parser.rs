//! Command parsing and batch-file validation.
//!
//! A directive is `"NAME: parameters"` or bare `"NAME"`; names are
//! case-insensitive and normalized to uppercase. Batch files are
//! newline-separated directives where blank lines and `#` comments are
//! ignored.

use crate::registry::CommandRegistry;

/// A parsed directive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCommand {
    /// Uppercased command name.
    pub name: String,
    /// Parameter string (may be empty).
    pub parameters: String,
}

/// Parse a raw directive. Returns `None` for blank input.
///
/// The text left of the first ':' is the name; everything right of it is the
/// parameter string. Without a ':' the whole text is the name.
pub fn parse(raw: &str) -> Option<ParsedCommand> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    match trimmed.split_once(':') {
        Some((name, parameters)) => Some(ParsedCommand {
            name: name.trim().to_ascii_uppercase(),
            parameters: parameters.trim().to_string(),
        }),
        None => Some(ParsedCommand {
            name: trimmed.to_ascii_uppercase(),
            parameters: String::new(),
        }),
    }
}

/// Outcome of validating a batch command file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileValidation {
    /// True iff no line failed validation.
    pub is_valid: bool,
    /// The validated command lines, in file order.
    pub commands: Vec<String>,
    /// One `"Invalid command: <line>"` entry per failing line.
    pub errors: Vec<String>,
}

/// Validate a newline-separated command file against the registry.
///
/// Blank lines and lines starting with `#` are skipped.
pub fn validate_command_file(content: &str, registry: &CommandRegistry) -> FileValidation {
    let mut commands = Vec::new();
    let mut errors = Vec::new();

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        match parse(line) {
            Some(cmd) if registry.contains(&cmd.name) => commands.push(line.to_string()),
            _ => errors.push(format!("Invalid command: {line}")),
        }
    }

    FileValidation {
        is_valid: errors.is_empty(),
        commands,
        errors,
    }
}
