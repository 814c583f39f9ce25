//! Fatal error taxonomy and process exit codes.
//!
//! Every variant is fatal: the engine aborts rather than producing a partial
//! report, since a silently-skipped class would mean a silently-missed
//! incompatibility. Warnings (empty archive, missing parameter names) are
//! printed to stderr and never change the exit code.

use thiserror::Error;

pub const EXIT_COMPATIBLE: i32 = 0;
pub const EXIT_INCOMPATIBLE: i32 = 1;
pub const EXIT_ERROR: i32 = 2;
pub const EXIT_TOOL_NOT_FOUND: i32 = 3;
pub const EXIT_ACCESS: i32 = 4;
pub const EXIT_INVALID_DUMP: i32 = 7;
pub const EXIT_DUMP_VERSION: i32 = 8;

#[derive(Debug, Error)]
pub enum CheckError {
    /// Input path unreadable or not a recognized archive.
    #[error("cannot access input: {0}")]
    Access(String),

    /// Required external tool (javap) is missing.
    #[error("external tool not found: {0}")]
    ToolNotFound(String),

    /// Serialized API dump is unreadable or structurally invalid.
    #[error("invalid API dump: {0}")]
    InvalidDump(String),

    /// API dump was written by an incompatible format major version.
    #[error("incompatible API dump version: {0}")]
    DumpVersion(String),

    /// Disassembly contract violation (e.g. method signature line missing).
    #[error("internal error: {0}")]
    Internal(String),
}

impl CheckError {
    pub fn exit_code(&self) -> i32 {
        match self {
            CheckError::Access(_) => EXIT_ACCESS,
            CheckError::ToolNotFound(_) => EXIT_TOOL_NOT_FOUND,
            CheckError::InvalidDump(_) => EXIT_INVALID_DUMP,
            CheckError::DumpVersion(_) => EXIT_DUMP_VERSION,
            CheckError::Internal(_) => EXIT_ERROR,
        }
    }
}

/// Exit code for an error chain: the innermost `CheckError` decides,
/// everything else is a generic failure.
pub fn exit_code_for(err: &anyhow::Error) -> i32 {
    for cause in err.chain() {
        if let Some(check) = cause.downcast_ref::<CheckError>() {
            return check.exit_code();
        }
    }
    EXIT_ERROR
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_match_error_table() {
        assert_eq!(CheckError::Access("x".into()).exit_code(), 4);
        assert_eq!(CheckError::ToolNotFound("javap".into()).exit_code(), 3);
        assert_eq!(CheckError::InvalidDump("x".into()).exit_code(), 7);
        assert_eq!(CheckError::DumpVersion("2.0 vs 1.0".into()).exit_code(), 8);
        assert_eq!(CheckError::Internal("x".into()).exit_code(), 2);
    }

    #[test]
    fn exit_code_survives_context_wrapping() {
        let err = anyhow::Error::from(CheckError::ToolNotFound("javap".into()))
            .context("while ingesting old version");
        assert_eq!(exit_code_for(&err), EXIT_TOOL_NOT_FOUND);

        let plain = anyhow::anyhow!("boom");
        assert_eq!(exit_code_for(&plain), EXIT_ERROR);
    }
}
