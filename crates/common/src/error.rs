//! Error types for the Zypin Selenium plugin

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using the shared plugin Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while preparing a run
///
/// Only input problems that make a run impossible surface here. Per-file
/// failures and unreachable servers are reported as structured outcomes.
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(
        "No package.json found in {}. Make sure you are in a Zypin project directory.",
        .0.display()
    )]
    ProjectManifestMissing(PathBuf),

    #[error("Invalid project manifest {}: {reason}", .path.display())]
    InvalidProjectManifest { path: PathBuf, reason: String },

    #[error("Template runner not found: {0}. Available templates: basic-webdriver, cucumber-bdd")]
    UnknownTemplate(String),

    #[error("No {kind} files found to execute")]
    NoFilesFound { kind: &'static str },
}
