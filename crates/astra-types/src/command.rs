//! Command catalogue entry types.

use serde::{Deserialize, Serialize};

use crate::error::AstraError;

/// Category a command belongs to, used for grouped reference listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommandCategory {
    System,
    File,
    Memory,
    Brain,
    Module,
}

impl CommandCategory {
    /// All categories in display order.
    pub const ALL: [CommandCategory; 5] = [
        CommandCategory::System,
        CommandCategory::File,
        CommandCategory::Memory,
        CommandCategory::Brain,
        CommandCategory::Module,
    ];
}

impl std::fmt::Display for CommandCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::System => write!(f, "system"),
            Self::File => write!(f, "file"),
            Self::Memory => write!(f, "memory"),
            Self::Brain => write!(f, "brain"),
            Self::Module => write!(f, "module"),
        }
    }
}

impl std::str::FromStr for CommandCategory {
    type Err = AstraError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "system" => Ok(Self::System),
            "file" => Ok(Self::File),
            "memory" => Ok(Self::Memory),
            "brain" => Ok(Self::Brain),
            "module" => Ok(Self::Module),
            other => Err(AstraError::InvalidParameters(format!(
                "no such category: {other}"
            ))),
        }
    }
}

/// One entry in the static command catalogue.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct CommandDefinition {
    /// Canonical uppercased name (what the caller submits).
    pub name: &'static str,
    pub category: CommandCategory,
    /// One-line description for reference listings.
    pub description: &'static str,
    /// Parameter spec, e.g. "key=value".
    pub parameters: &'static str,
    /// Worked example, e.g. "UPDATE_MEMORY: mode=active".
    pub example: &'static str,
    /// Owning subsystem label reported in execution results.
    pub module: &'static str,
}
