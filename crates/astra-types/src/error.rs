//! Error types for the ASTRA command gateway.

use std::io;

/// Errors produced by the ASTRA gateway.
///
/// The first eight variants are the command failure taxonomy: every handler
/// either succeeds or fails with exactly one of them, and the executor folds
/// them into a uniform failure result at the dispatch boundary. The rest
/// cover the surrounding stack (storage, I/O, serialization, config).
#[derive(Debug, thiserror::Error)]
pub enum AstraError {
    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    #[error("invalid parameter format: {0}")]
    InvalidParameters(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("missing identifier: {0}")]
    MissingIdentifier(String),

    #[error("evaluation failed: {0}")]
    Evaluation(String),

    #[error("compilation failed: {0}")]
    Compilation(String),

    #[error("unknown code template: {0}")]
    UnknownTemplate(String),

    #[error("unknown self-modification: {0}")]
    UnknownModification(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, AstraError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_command_display() {
        let e = AstraError::UnknownCommand("FOO".into());
        assert_eq!(format!("{e}"), "Unknown command: FOO");
    }

    #[test]
    fn invalid_parameters_display() {
        let e = AstraError::InvalidParameters("use key=value".into());
        assert_eq!(format!("{e}"), "invalid parameter format: use key=value");
    }

    #[test]
    fn not_found_display() {
        let e = AstraError::NotFound("file 'a.txt'".into());
        assert_eq!(format!("{e}"), "file 'a.txt' not found");
    }

    #[test]
    fn missing_identifier_display() {
        let e = AstraError::MissingIdentifier("filename".into());
        assert_eq!(format!("{e}"), "missing identifier: filename");
    }

    #[test]
    fn evaluation_display() {
        let e = AstraError::Evaluation("unknown name 'window'".into());
        assert_eq!(format!("{e}"), "evaluation failed: unknown name 'window'");
    }

    #[test]
    fn compilation_display() {
        let e = AstraError::Compilation("unbalanced '}'".into());
        assert_eq!(format!("{e}"), "compilation failed: unbalanced '}'");
    }

    #[test]
    fn unknown_template_display() {
        let e = AstraError::UnknownTemplate("widget".into());
        assert_eq!(format!("{e}"), "unknown code template: widget");
    }

    #[test]
    fn unknown_modification_display() {
        let e = AstraError::UnknownModification("delete_everything".into());
        assert_eq!(
            format!("{e}"),
            "unknown self-modification: delete_everything"
        );
    }

    #[test]
    fn storage_display() {
        let e = AstraError::Storage("namespace unreadable".into());
        assert_eq!(format!("{e}"), "storage error: namespace unreadable");
    }

    #[test]
    fn io_error_from_conversion() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "gone");
        let e: AstraError = io_err.into();
        let msg = format!("{e}");
        assert!(msg.contains("I/O error"));
        assert!(msg.contains("gone"));
    }

    #[test]
    fn json_error_from_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("not json").unwrap_err();
        let e: AstraError = json_err.into();
        assert!(format!("{e}").contains("JSON error"));
    }

    #[test]
    fn toml_error_from_conversion() {
        let toml_err = toml::from_str::<toml::Value>("this is [[[not valid toml").unwrap_err();
        let e: AstraError = toml_err.into();
        assert!(format!("{e}").contains("TOML parse error"));
    }

    #[test]
    fn result_alias_ok() {
        let r: Result<i32> = Ok(42);
        assert_eq!(r.unwrap(), 42);
    }
}
