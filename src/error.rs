//! Fatal error types. Everything here aborts the run.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("line {line}: couldn't get method name from `{text}`")]
    MissingMethodName { line: usize, text: String },
}

#[derive(Debug, Error)]
pub enum PostProcessError {
    #[error("{}: not well-formed after repair: {}", page.display(), errors.join("; "))]
    Malformed { page: PathBuf, errors: Vec<String> },

    #[error("inherited member table has {found} signature names, expected one")]
    AmbiguousSignature { found: usize },

    #[error("member `{member}` has {found} `inherited` labels, expected one")]
    InheritedLabel { member: String, found: usize },

    #[error("failed to serialize page: {0}")]
    Serialize(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("failed to start `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{command}` did not finish within {secs}s")]
    Timeout { command: String, secs: u64 },

    #[error("`{command}` exited with {status}")]
    Failed { command: String, status: String },
}
