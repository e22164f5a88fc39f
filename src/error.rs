// Odoo MCP Gate - Error Taxonomy
// Copyright 2026 Joseph Stone - All Rights Reserved
//
// Every failure a tool call can hit. The dispatcher converts all of these
// into an isError tool result; none of them terminate the server.
// Messages always name the offending profile, tool, field, or path.

use std::path::PathBuf;
use thiserror::Error;

use crate::tools::ArgKind;

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Unknown Odoo version: {id}. Available versions: {}", .known.join(", "))]
    UnknownProfile { id: String, known: Vec<String> },

    #[error("Odoo root directory not found: {}", .0.display())]
    ProfileRootMissing(PathBuf),

    #[error("Unknown tool: {0}")]
    UnknownOperation(String),

    #[error("Missing required argument: {0}")]
    MissingArgument(String),

    #[error("Invalid type for argument '{field}': expected {expected}")]
    InvalidArgumentType { field: String, expected: ArgKind },

    #[error("Command failed: {command}: {reason}")]
    CommandLaunchFailure { command: String, reason: String },

    #[error("Command timed out after {secs}s with no output: {command}")]
    CommandTimeout { command: String, secs: u64 },

    #[error("Configuration file not found: {0}")]
    ConfigNotFound(String),

    #[error("Invalid backup archive: {0}")]
    ArchiveInvalid(String),

    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

impl ToolError {
    /// Wrap an I/O error with the operation and path it came from
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        ToolError::Io { context: context.into(), source }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_profile_lists_every_known_id() {
        let err = ToolError::UnknownProfile {
            id: "odoo12".to_string(),
            known: vec!["odoo17".to_string(), "odoo18".to_string()],
        };
        let msg = err.to_string();
        assert!(msg.contains("odoo12"));
        assert!(msg.ends_with("odoo17, odoo18"), "got: {}", msg);
    }

    #[test]
    fn messages_name_the_offending_identifier() {
        assert!(ToolError::MissingArgument("project".into()).to_string().contains("project"));
        assert!(ToolError::UnknownOperation("odoo_fly".into()).to_string().contains("odoo_fly"));
        let err = ToolError::InvalidArgumentType { field: "lines".into(), expected: ArgKind::Number };
        assert_eq!(err.to_string(), "Invalid type for argument 'lines': expected number");
        let err = ToolError::ProfileRootMissing(PathBuf::from("/nope/odoo18"));
        assert!(err.to_string().contains("/nope/odoo18"));
    }
}
