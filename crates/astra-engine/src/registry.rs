//! Static catalogue of supported commands.
//!
//! The catalogue is read-only: there is no registration API, and changing
//! the command set means redeploying the gateway.

use astra_types::command::{CommandCategory, CommandDefinition};

const CATALOGUE: &[CommandDefinition] = &[
    CommandDefinition {
        name: "PRINT",
        category: CommandCategory::System,
        description: "Echo a message through the output log channel",
        parameters: "text",
        example: "PRINT: Hello from the gateway",
        module: "core",
    },
    CommandDefinition {
        name: "SYSTEM_STATUS",
        category: CommandCategory::System,
        description: "Report overall system status",
        parameters: "(none)",
        example: "SYSTEM_STATUS",
        module: "system",
    },
    CommandDefinition {
        name: "VOICE_SPEAK",
        category: CommandCategory::System,
        description: "Emit text on the voice channel",
        parameters: "text",
        example: "VOICE_SPEAK: Startup complete",
        module: "voice",
    },
    CommandDefinition {
        name: "RUN_PROCESS",
        category: CommandCategory::System,
        description: "Start a virtual background process",
        parameters: "process name",
        example: "RUN_PROCESS: indexer",
        module: "process",
    },
    CommandDefinition {
        name: "KILL_PROCESS",
        category: CommandCategory::System,
        description: "Terminate a virtual process by pid",
        parameters: "pid",
        example: "KILL_PROCESS: 1712345678901",
        module: "process",
    },
    CommandDefinition {
        name: "LIST_PROCESSES",
        category: CommandCategory::System,
        description: "List virtual processes with status and uptime",
        parameters: "(none)",
        example: "LIST_PROCESSES",
        module: "process",
    },
    CommandDefinition {
        name: "CREATE_FILE",
        category: CommandCategory::File,
        description: "Create or overwrite a virtual file",
        parameters: "name content...",
        example: "CREATE_FILE: notes.txt remember the milk",
        module: "vfs",
    },
    CommandDefinition {
        name: "READ_FILE",
        category: CommandCategory::File,
        description: "Read a virtual file's content",
        parameters: "name",
        example: "READ_FILE: notes.txt",
        module: "vfs",
    },
    CommandDefinition {
        name: "DELETE_FILE",
        category: CommandCategory::File,
        description: "Delete a virtual file",
        parameters: "name",
        example: "DELETE_FILE: notes.txt",
        module: "vfs",
    },
    CommandDefinition {
        name: "LIST_FILES",
        category: CommandCategory::File,
        description: "List virtual files with sizes",
        parameters: "(none)",
        example: "LIST_FILES",
        module: "vfs",
    },
    CommandDefinition {
        name: "UPDATE_MEMORY",
        category: CommandCategory::Memory,
        description: "Store a key=value fact in persistent memory",
        parameters: "key=value",
        example: "UPDATE_MEMORY: mode=active",
        module: "memory",
    },
    CommandDefinition {
        name: "EXECUTE_JS",
        category: CommandCategory::Brain,
        description: "Evaluate an expression in the restricted sandbox",
        parameters: "expression",
        example: "EXECUTE_JS: 6 * 7",
        module: "sandbox",
    },
    CommandDefinition {
        name: "GENERATE_CODE",
        category: CommandCategory::Brain,
        description: "Generate code from a template into the virtual file system",
        parameters: "kind name",
        example: "GENERATE_CODE: function greeter",
        module: "codegen",
    },
    CommandDefinition {
        name: "COMPILE_CODE",
        category: CommandCategory::Brain,
        description: "Syntax-check a generated virtual file",
        parameters: "filename",
        example: "COMPILE_CODE: function_greeter_1712345678901.rs",
        module: "codegen",
    },
    CommandDefinition {
        name: "SELF_MODIFY",
        category: CommandCategory::Brain,
        description: "Apply an audited no-op self-modification action",
        parameters: "action",
        example: "SELF_MODIFY: optimize_performance",
        module: "codegen",
    },
    CommandDefinition {
        name: "ACTIVATE_MODULE",
        category: CommandCategory::Module,
        description: "Mark a module as activated",
        parameters: "module name",
        example: "ACTIVATE_MODULE: telemetry",
        module: "module_manager",
    },
];

/// Read-only registry over the static catalogue.
#[derive(Debug, Default)]
pub struct CommandRegistry;

impl CommandRegistry {
    pub fn new() -> Self {
        Self
    }

    /// Find a definition by (case-insensitive) name.
    pub fn lookup(&self, name: &str) -> Option<&'static CommandDefinition> {
        CATALOGUE
            .iter()
            .find(|def| def.name.eq_ignore_ascii_case(name))
    }

    /// Membership test used by the parser's batch validation.
    pub fn contains(&self, name: &str) -> bool {
        self.lookup(name).is_some()
    }

    /// All definitions in a category, in catalogue order.
    pub fn by_category(&self, category: CommandCategory) -> Vec<&'static CommandDefinition> {
        CATALOGUE
            .iter()
            .filter(|def| def.category == category)
            .collect()
    }

    /// The full catalogue.
    pub fn definitions(&self) -> &'static [CommandDefinition] {
        CATALOGUE
    }

    /// Owning subsystem label for a command, "system" if unknown.
    pub fn module_for(&self, name: &str) -> &'static str {
        self.lookup(name).map_or("system", |def| def.module)
    }
}
